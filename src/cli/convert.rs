use super::ui;
use crate::client::{ConverterSession, ConverterState};
use crate::core::config::AppConfig;
use crate::providers::BackendClient;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

/// How long a one-shot run waits for its record to be saved before exiting.
/// The result has already been printed by then.
pub const RECORD_FLUSH_TIMEOUT: Duration = Duration::from_secs(3);

/// Parses an amount typed by the user. Only finite numbers are accepted.
pub fn parse_amount(value: &str) -> Result<f64, String> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite())
        .ok_or_else(|| format!("Not a number: {value}"))
}

#[derive(Debug, Clone, Default)]
pub struct ConvertArgs {
    pub amount: Option<f64>,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl ConvertArgs {
    pub fn initial_state(&self, config: &AppConfig) -> ConverterState {
        ConverterState::new(
            self.from.as_deref().unwrap_or(&config.client.default_from),
            self.to.as_deref().unwrap_or(&config.client.default_to),
            self.amount.unwrap_or(config.client.default_amount),
        )
    }
}

/// Runs the conversion flow once: load rates, convert, print, record.
pub async fn convert(config: &AppConfig, args: &ConvertArgs) -> Result<()> {
    let client = Arc::new(BackendClient::new(&config.client.server_url)?);
    let mut session = ConverterSession::new(args.initial_state(config), client.clone(), client);

    let spinner = ui::new_spinner(&format!(
        "Fetching {} rates...",
        session.state().from()
    ));
    session.start();
    session.settle().await;
    spinner.finish_and_clear();

    if let Some(error) = session.state().error() {
        anyhow::bail!("{error}");
    }

    let Some(outcome) = session.convert() else {
        anyhow::bail!(
            "No exchange rate from {} to {}",
            session.state().from(),
            session.state().to()
        );
    };
    println!(
        "{}",
        ui::style_text(&outcome.to_string(), ui::StyleType::Result)
    );

    session.flush_records(RECORD_FLUSH_TIMEOUT).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_uses_config_defaults() {
        let config = AppConfig::default();
        let state = ConvertArgs::default().initial_state(&config);
        assert_eq!(state.from(), "USD");
        assert_eq!(state.to(), "INR");
        assert_eq!(state.amount(), 1.0);
    }

    #[test]
    fn test_initial_state_prefers_arguments() {
        let config = AppConfig::default();
        let args = ConvertArgs {
            amount: Some(25.0),
            from: Some("EUR".to_string()),
            to: Some("GBP".to_string()),
        };
        let state = args.initial_state(&config);
        assert_eq!(state.from(), "EUR");
        assert_eq!(state.to(), "GBP");
        assert_eq!(state.amount(), 25.0);
    }

    #[test]
    fn test_parse_amount_rejects_non_finite() {
        assert_eq!(parse_amount("12.5"), Ok(12.5));
        assert_eq!(parse_amount(" 10 "), Ok(10.0));
        for value in ["NaN", "nan", "inf", "-inf", "infinity", "ten", ""] {
            assert!(parse_amount(value).is_err(), "{value} should be rejected");
        }
    }
}
