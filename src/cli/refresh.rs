use super::ui;
use crate::core::refresh::{RefreshOutcome, Refresher};
use crate::core::summary::{TOP_COUNTRIES, top_by_gdp};
use anyhow::Result;
use chrono::SecondsFormat;
use comfy_table::{Cell, CellAlignment};
use std::path::Path;

impl RefreshOutcome {
    pub fn display_as_table(&self) -> String {
        let mut table =
            ui::country_table(&["#", "Country", "Region", "Currency", "Rate", "Estimated GDP"]);

        for (rank, record) in top_by_gdp(&self.records, TOP_COUNTRIES).into_iter().enumerate() {
            table.add_row(vec![
                Cell::new(rank + 1).set_alignment(CellAlignment::Right),
                Cell::new(&record.name),
                Cell::new(record.region.as_deref().unwrap_or("")),
                Cell::new(record.currency_code.as_deref().unwrap_or("")),
                ui::rate_cell(record.exchange_rate),
                ui::gdp_cell(record.estimated_gdp),
            ]);
        }

        let mut output = format!(
            "{}\n\n",
            ui::paint(
                &format!("Top {TOP_COUNTRIES} Countries by Estimated GDP"),
                ui::Tone::Heading
            )
        );
        output.push_str(&table.to_string());

        output.push_str(&format!(
            "\n\n{}: {}",
            ui::paint("Total Countries", ui::Tone::Label),
            ui::paint(
                &self.status.total_countries.to_string(),
                ui::Tone::Figure
            )
        ));
        output.push_str(&format!(
            "\n{}",
            ui::paint(
                &format!(
                    "Last refreshed {}",
                    self.status
                        .last_refreshed_at
                        .to_rfc3339_opts(SecondsFormat::Millis, true)
                ),
                ui::Tone::Muted
            )
        ));

        output
    }
}

/// Runs a single refresh behind a spinner and prints the result.
pub async fn run(refresher: &Refresher, summary_path: &Path) -> Result<()> {
    let spinner = ui::refresh_spinner();
    let result = refresher.refresh().await;
    spinner.finish_and_clear();

    let outcome = result?;
    println!("{}", outcome.display_as_table());

    match &outcome.render_error {
        Some(e) => println!(
            "{}",
            ui::paint(
                &format!("Summary image was not updated: {e}"),
                ui::Tone::Warning
            )
        ),
        None => println!(
            "{}",
            ui::paint(
                &format!("Summary image: {}", summary_path.display()),
                ui::Tone::Muted
            )
        ),
    }
    Ok(())
}
