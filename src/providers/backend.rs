//! HTTP client for the xconv service, used by the terminal front ends.

use crate::core::conversion::{Ack, ConversionRecorder, NewConversion, RecordError};
use crate::core::rates::{GatewayError, RateDocument, RateGateway};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, instrument};

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    details: Option<String>,
}

pub struct BackendClient {
    base_url: String,
    client: reqwest::Client,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("xconv/0.1")
            .build()
            .context("Failed to build HTTP client")?;

        Ok(BackendClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn endpoint(&self, route: &str) -> String {
        format!("{}/api/{}", self.base_url, route)
    }
}

#[async_trait]
impl RateGateway for BackendClient {
    #[instrument(name = "BackendRatesFetch", skip(self), fields(base = %base))]
    async fn get_rates(&self, base: &str) -> Result<RateDocument, GatewayError> {
        let url = Url::parse_with_params(&self.endpoint("rates"), &[("base", base)])
            .map_err(|e| GatewayError::Upstream(format!("Invalid server URL: {e}")))?;
        debug!("Requesting rates from {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| GatewayError::Upstream(format!("Request error: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body: ErrorBody = response.json().await.unwrap_or_default();
            return Err(GatewayError::Upstream(
                body.error.unwrap_or_else(|| format!("HTTP error: {status}")),
            ));
        }

        let text = response
            .text()
            .await
            .map_err(|e| GatewayError::Upstream(format!("Failed to read rates response: {e}")))?;
        RateDocument::from_body(text)
            .map_err(|e| GatewayError::Upstream(format!("Failed to parse rates response: {e}")))
    }
}

#[async_trait]
impl ConversionRecorder for BackendClient {
    #[instrument(name = "BackendRecord", skip_all)]
    async fn record(&self, conversion: NewConversion) -> Result<Ack, RecordError> {
        let response = self
            .client
            .post(self.endpoint("convert"))
            .json(&conversion)
            .send()
            .await
            .map_err(|e| RecordError::Write {
                details: format!("Request error: {e}"),
            })?;

        let status = response.status();
        if status.is_success() {
            return response.json::<Ack>().await.map_err(|e| RecordError::Write {
                details: format!("Failed to parse response: {e}"),
            });
        }

        let body: ErrorBody = response.json().await.unwrap_or_default();
        debug!(%status, ?body, "Record rejected");
        Err(match status {
            StatusCode::BAD_REQUEST => RecordError::Validation(
                body.error
                    .unwrap_or_else(|| "Missing required fields".to_string()),
            ),
            StatusCode::SERVICE_UNAVAILABLE => RecordError::StoreUnavailable,
            _ => RecordError::Write {
                details: body
                    .details
                    .or(body.error)
                    .unwrap_or_else(|| format!("HTTP error: {status}")),
            },
        })
    }
}
