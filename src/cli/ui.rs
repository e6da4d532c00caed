//! Terminal presentation for `cgdp refresh`.

use crate::core::summary::format_gdp;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub enum Tone {
    Heading,
    Label,
    Figure,
    Warning,
    Muted,
}

pub fn paint(text: &str, tone: Tone) -> String {
    let styled = match tone {
        Tone::Heading => style(text).bold().underlined(),
        Tone::Label => style(text).bold(),
        Tone::Figure => style(text).green().bold(),
        Tone::Warning => style(text).yellow(),
        Tone::Muted => style(text).dim(),
    };
    styled.to_string()
}

/// Rounded-corner table with bold cyan headers.
pub fn country_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.iter().map(|h| {
            Cell::new(h)
                .fg(Color::Cyan)
                .add_attribute(Attribute::Bold)
        }));
    table
}

fn missing_cell() -> Cell {
    Cell::new("N/A")
        .fg(Color::DarkGrey)
        .set_alignment(CellAlignment::Right)
}

pub fn rate_cell(rate: Option<f64>) -> Cell {
    rate.map_or_else(missing_cell, |r| {
        Cell::new(format!("{r:.4}")).set_alignment(CellAlignment::Right)
    })
}

pub fn gdp_cell(gdp: Option<f64>) -> Cell {
    match gdp {
        Some(_) => Cell::new(format_gdp(gdp)).set_alignment(CellAlignment::Right),
        None => missing_cell(),
    }
}

/// Spinner shown while a refresh is in flight.
pub fn refresh_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("Refreshing countries...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
