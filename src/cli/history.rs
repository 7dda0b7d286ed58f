use super::ui;
use crate::core::config::AppConfig;
use crate::core::conversion::ConversionRecord;
use crate::store::ConversionLog;
use crate::store::disk::DiskConversionLog;
use anyhow::{Context, Result};
use comfy_table::Cell;

pub fn display_records(records: &[ConversionRecord]) -> String {
    if records.is_empty() {
        return ui::style_text("No conversions recorded yet", ui::StyleType::Subtle);
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Date"),
        ui::header_cell("From"),
        ui::header_cell("To"),
        ui::header_cell("Amount"),
        ui::header_cell("Result"),
    ]);

    for record in records {
        table.add_row(vec![
            Cell::new(record.date.format("%Y-%m-%d %H:%M:%S")),
            Cell::new(&record.from),
            Cell::new(&record.to),
            ui::number_cell(record.amount, 2),
            ui::number_cell(record.result, 2),
        ]);
    }
    table.to_string()
}

/// Lists conversions from the local disk store, most recent last. The store
/// is locked while `xconv serve` runs against it.
pub async fn show_history(config: &AppConfig, limit: Option<usize>) -> Result<()> {
    let path = config.data_path()?;
    let log = DiskConversionLog::open(&path)
        .with_context(|| format!("Failed to open conversion store at {}", path.display()))?;

    let records = log.records().await?;
    let skip = limit.map_or(0, |limit| records.len().saturating_sub(limit));
    println!("{}", display_records(&records[skip..]));
    Ok(())
}
