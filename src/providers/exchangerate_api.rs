use crate::core::rates::{GatewayError, RateDocument, RateGateway};
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// Relays rate tables from an exchangerate-api.com compatible service
/// (`GET {base_url}/v4/latest/{base}`).
pub struct ExchangeRateApiProvider {
    base_url: String,
    client: reqwest::Client,
}

impl ExchangeRateApiProvider {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent("xconv/0.1");
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(ExchangeRateApiProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl RateGateway for ExchangeRateApiProvider {
    #[instrument(
        name = "UpstreamRatesFetch",
        skip(self),
        fields(base = %base)
    )]
    async fn get_rates(&self, base: &str) -> Result<RateDocument, GatewayError> {
        let url = format!("{}/v4/latest/{}", self.base_url, base);
        debug!("Requesting rates from {}", url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            GatewayError::Upstream(format!("Request error: {e} for base currency: {base}"))
        })?;

        if !response.status().is_success() {
            return Err(GatewayError::Upstream(format!(
                "HTTP error: {} for base currency: {}",
                response.status(),
                base
            )));
        }

        let text = response.text().await.map_err(|e| {
            GatewayError::Upstream(format!("Failed to read response for {base}: {e}"))
        })?;

        RateDocument::from_body(text).map_err(|e| {
            GatewayError::Upstream(format!("Failed to parse rates response for {base}: {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_mock_server(base: &str, template: ResponseTemplate) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!("/v4/latest/{base}")))
            .respond_with(template)
            .mount(&mock_server)
            .await;

        mock_server
    }

    #[tokio::test]
    async fn test_successful_rates_fetch() {
        let mock_response = r#"{
            "provider": "https://www.exchangerate-api.com",
            "base": "USD",
            "date": "2026-10-18",
            "rates": {"USD": 1, "INR": 83.1, "EUR": 0.92}
        }"#;
        let mock_server = create_mock_server(
            "USD",
            ResponseTemplate::new(200).set_body_string(mock_response),
        )
        .await;

        let provider = ExchangeRateApiProvider::new(&mock_server.uri(), None).unwrap();
        let document = provider.get_rates("USD").await.unwrap();
        assert_eq!(document.as_str(), mock_response);

        let snapshot = document.snapshot().unwrap();
        assert_eq!(snapshot.rates.len(), 3);
        assert_eq!(snapshot.rate("INR"), Some(83.1));
        assert_eq!(snapshot.rate("EUR"), Some(0.92));
        assert_eq!(snapshot.base(), Some("USD"));
        assert_eq!(
            snapshot.extra.get("provider").and_then(|v| v.as_str()),
            Some("https://www.exchangerate-api.com")
        );
    }

    #[tokio::test]
    async fn test_base_is_forwarded_as_is() {
        let mock_server = create_mock_server(
            "usd",
            ResponseTemplate::new(200).set_body_string(r#"{"rates": {"inr": 83.1}}"#),
        )
        .await;

        let provider = ExchangeRateApiProvider::new(&mock_server.uri(), None).unwrap();
        let snapshot = provider.get_rates("usd").await.unwrap().snapshot().unwrap();
        assert_eq!(snapshot.rate("inr"), Some(83.1));
        assert_eq!(snapshot.rate("INR"), None);
    }

    #[tokio::test]
    async fn test_upstream_error_response() {
        let mock_server = create_mock_server("USD", ResponseTemplate::new(500)).await;

        let provider = ExchangeRateApiProvider::new(&mock_server.uri(), None).unwrap();
        let result = provider.get_rates("USD").await;
        assert_eq!(
            result.unwrap_err(),
            GatewayError::Upstream(
                "HTTP error: 500 Internal Server Error for base currency: USD".to_string()
            )
        );
    }

    #[tokio::test]
    async fn test_unknown_base_not_found() {
        let mock_server = MockServer::start().await;

        let provider = ExchangeRateApiProvider::new(&mock_server.uri(), None).unwrap();
        let result = provider.get_rates("XYZ").await;
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("404 Not Found for base currency: XYZ")
        );
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let mock_server = create_mock_server(
            "USD",
            ResponseTemplate::new(200).set_body_string(r#"{"result": "error"}"#),
        )
        .await;

        let provider = ExchangeRateApiProvider::new(&mock_server.uri(), None).unwrap();
        let result = provider.get_rates("USD").await;
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse rates response for USD")
        );
    }

    #[tokio::test]
    async fn test_unusual_rates_are_passed_through() {
        let mock_response = r#"{"base": "USD", "rates": {"USD": 1.0, "VES": "n/a"}}"#;
        let mock_server = create_mock_server(
            "USD",
            ResponseTemplate::new(200).set_body_string(mock_response),
        )
        .await;

        let provider = ExchangeRateApiProvider::new(&mock_server.uri(), None).unwrap();
        let document = provider.get_rates("USD").await.unwrap();
        assert_eq!(document.into_body(), mock_response);
    }

    #[tokio::test]
    async fn test_timeout_is_reported_as_upstream_failure() {
        let mock_server = create_mock_server(
            "USD",
            ResponseTemplate::new(200)
                .set_body_string(r#"{"rates": {"INR": 83.1}}"#)
                .set_delay(Duration::from_millis(500)),
        )
        .await;

        let provider =
            ExchangeRateApiProvider::new(&mock_server.uri(), Some(Duration::from_millis(50)))
                .unwrap();
        let result = provider.get_rates("USD").await;
        assert!(
            result
                .unwrap_err()
                .to_string()
                .starts_with("Rate provider unavailable: Request error")
        );
    }
}
