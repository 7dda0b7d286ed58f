//! Conversion arithmetic, conversion records and the recorder abstraction

use crate::core::rates::RateTable;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Converts `amount` into `target` using a table fetched for the source
/// currency. Returns `None` when the table has no rate for `target`.
pub fn convert(amount: f64, target: &str, rates: &RateTable) -> Option<f64> {
    rates.get(target).map(|rate| amount * rate)
}

/// A conversion as submitted for recording. Every field is optional so that
/// incomplete submissions can be rejected before anything is written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewConversion {
    pub from: Option<String>,
    pub to: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub result: Option<f64>,
}

impl NewConversion {
    pub fn new(from: &str, to: &str, amount: f64, result: f64) -> Self {
        Self {
            from: Some(from.to_string()),
            to: Some(to.to_string()),
            amount: Some(amount),
            result: Some(result),
        }
    }

    /// Validates the submission and stamps it with `date`.
    pub fn into_record(self, date: DateTime<Utc>) -> Result<ConversionRecord, RecordError> {
        let from = self.from.filter(|code| !code.is_empty());
        let to = self.to.filter(|code| !code.is_empty());
        let amount = self.amount.filter(|n| n.is_finite());
        let result = self.result.filter(|n| n.is_finite());

        match (from, to, amount, result) {
            (Some(from), Some(to), Some(amount), Some(result)) => Ok(ConversionRecord {
                from,
                to,
                amount,
                result,
                date,
            }),
            (from, to, amount, result) => {
                let missing: Vec<&str> = [
                    ("from", from.is_none()),
                    ("to", to.is_none()),
                    ("amount", amount.is_none()),
                    ("result", result.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, absent)| absent.then_some(name))
                .collect();
                Err(RecordError::Validation(format!(
                    "Missing required fields: {}",
                    missing.join(", ")
                )))
            }
        }
    }
}

// Form inputs arrive as strings, so numeric strings are accepted as numbers.
// "NaN" and "inf" parse as f64 but have no JSON form, so they are refused.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(f64),
        Text(String),
    }

    match Option::<NumberOrText>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrText::Number(n)) => Ok(Some(n)),
        Some(NumberOrText::Text(text)) => text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid number: {text:?}"))),
    }
}

/// A persisted conversion. Records are append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionRecord {
    pub from: String,
    pub to: String,
    pub amount: f64,
    pub result: f64,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ack {
    pub message: String,
}

impl Ack {
    pub fn saved() -> Self {
        Self {
            message: "Conversion saved".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("{0}")]
    Validation(String),
    #[error("Database not available")]
    StoreUnavailable,
    #[error("Failed to save conversion: {details}")]
    Write { details: String },
}

#[async_trait]
pub trait ConversionRecorder: Send + Sync {
    async fn record(&self, conversion: NewConversion) -> Result<Ack, RecordError>;
}
