//! Exchange rate tables and the gateway abstraction

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::Error as _;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

/// Currency code to rate, relative to the base the table was fetched for.
pub type RateTable = BTreeMap<String, f64>;

/// A rate document exactly as the provider sent it.
///
/// The relay answers with [`RateDocument::as_str`] byte for byte; only
/// clients interpret it, through [`RateDocument::snapshot`].
#[derive(Debug, Clone, PartialEq)]
pub struct RateDocument {
    body: String,
}

impl RateDocument {
    /// Accepts `body` when it is a JSON object carrying a `rates` object.
    /// The individual rates are not checked.
    pub fn from_body(body: String) -> serde_json::Result<Self> {
        let document: Map<String, Value> = serde_json::from_str(&body)?;
        match document.get("rates") {
            Some(Value::Object(_)) => Ok(Self { body }),
            Some(_) => Err(serde_json::Error::custom("`rates` is not an object")),
            None => Err(serde_json::Error::missing_field("rates")),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.body
    }

    pub fn into_body(self) -> String {
        self.body
    }

    pub fn snapshot(&self) -> serde_json::Result<RateSnapshot> {
        serde_json::from_str(&self.body)
    }
}

/// The interpreted form of a [`RateDocument`].
///
/// Only `rates` is typed; every other field (`base`, `date`,
/// `time_last_updated`, ...) is kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RateSnapshot {
    pub rates: RateTable,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RateSnapshot {
    pub fn new(rates: RateTable) -> Self {
        Self {
            rates,
            extra: Map::new(),
        }
    }

    pub fn rate(&self, code: &str) -> Option<f64> {
        self.rates.get(code).copied()
    }

    /// The `base` field reported by the provider, if any.
    pub fn base(&self) -> Option<&str> {
        self.extra.get("base").and_then(|v| v.as_str())
    }

    /// The `date` field reported by the provider, if any.
    pub fn date(&self) -> Option<&str> {
        self.extra.get("date").and_then(|v| v.as_str())
    }
}

impl FromIterator<(String, f64)> for RateSnapshot {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GatewayError {
    #[error("Rate provider unavailable: {0}")]
    Upstream(String),
}

#[async_trait]
pub trait RateGateway: Send + Sync {
    /// Fetches the current rate document for `base`. The code is forwarded
    /// unvalidated.
    async fn get_rates(&self, base: &str) -> Result<RateDocument, GatewayError>;
}
