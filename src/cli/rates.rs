use super::ui;
use crate::core::config::AppConfig;
use crate::core::rates::{RateGateway, RateSnapshot};
use crate::providers::BackendClient;
use anyhow::{Context, Result};
use comfy_table::Cell;

impl RateSnapshot {
    pub fn display_as_table(&self, base: &str) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![ui::header_cell("Currency"), ui::header_cell("Rate")]);

        for (code, rate) in &self.rates {
            table.add_row(vec![Cell::new(code), ui::number_cell(*rate, 4)]);
        }

        let mut output = format!(
            "Rates for 1 {}\n\n",
            ui::style_text(base, ui::StyleType::Title)
        );
        output.push_str(&table.to_string());
        if let Some(date) = self.date() {
            output.push_str(&format!(
                "\n\n{}",
                ui::style_text(&format!("As of {date}"), ui::StyleType::Subtle)
            ));
        }
        output
    }
}

/// Prints the relayed rate table for `base`.
pub async fn show_rates(config: &AppConfig, base: Option<&str>) -> Result<()> {
    let base = base.unwrap_or(&config.client.default_from);
    let client = BackendClient::new(&config.client.server_url)?;

    let spinner = ui::new_spinner(&format!("Fetching {base} rates..."));
    let result = client.get_rates(base).await;
    spinner.finish_and_clear();

    let snapshot = result?
        .snapshot()
        .with_context(|| format!("Failed to parse {base} rates"))?;
    println!("{}", snapshot.display_as_table(base));
    Ok(())
}
