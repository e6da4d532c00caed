//! PNG rendering of the post-refresh summary card.

use crate::core::country::CountryRecord;
use crate::core::summary::{SummaryRenderer, TOP_COUNTRIES, ranked_line, top_by_gdp};
use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, SecondsFormat, Utc};
use plotters::prelude::*;
use plotters::style::FontStyle;
use plotters_bitmap::BitMapBackend;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Once;
use tracing::{debug, instrument};

pub const IMAGE_WIDTH: u32 = 1200;
pub const IMAGE_HEIGHT: u32 = 630;

const BACKGROUND: RGBColor = RGBColor(0xf9, 0xf9, 0xf9);
const TEXT: RGBColor = RGBColor(0x33, 0x33, 0x33);
const BAR: RGBColor = RGBColor(0x46, 0x82, 0xb4);
const FONT: &str = "sans-serif";

const LEFT: i32 = 50;
const BAR_LEFT: i32 = 700;
const BAR_MAX_WIDTH: f64 = 450.0;
const ROW_TOP: i32 = 270;
const ROW_HEIGHT: i32 = 50;

static INIT_FONTS: Once = Once::new();

// ab_glyph does not discover system fonts, so ship our own.
fn ensure_fonts_registered() {
    INIT_FONTS.call_once(|| {
        let _ = plotters::style::register_font(
            FONT,
            FontStyle::Normal,
            include_bytes!("../assets/DejaVuSans.ttf"),
        );
        let _ = plotters::style::register_font(
            FONT,
            FontStyle::Bold,
            include_bytes!("../assets/DejaVuSans-Bold.ttf"),
        );
    });
}

fn draw_error<E: Debug>(e: E) -> anyhow::Error {
    anyhow!("{e:?}")
}

/// Writes the summary card to a fixed path, replacing any previous card.
#[derive(Debug, Clone)]
pub struct PngSummaryRenderer {
    path: PathBuf,
}

impl PngSummaryRenderer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SummaryRenderer for PngSummaryRenderer {
    #[instrument(name = "RenderSummary", skip(self, records), fields(path = %self.path.display()))]
    fn render(
        &self,
        records: &[CountryRecord],
        total_countries: usize,
        refreshed_at: DateTime<Utc>,
    ) -> Result<()> {
        ensure_fonts_registered();

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create image directory: {}", dir.display()))?;

        // Draw next to the target, then swap it in so readers never see a partial file.
        let staging = tempfile::Builder::new()
            .prefix(".summary-")
            .suffix(".png")
            .tempfile_in(dir)
            .context("Failed to create temporary image file")?;

        draw_summary(staging.path(), records, total_countries, refreshed_at)
            .context("Failed to draw summary image")?;

        staging
            .persist(&self.path)
            .with_context(|| format!("Failed to write summary image: {}", self.path.display()))?;

        debug!(total_countries, "Summary image written");
        Ok(())
    }
}

fn draw_summary(
    path: &Path,
    records: &[CountryRecord],
    total_countries: usize,
    refreshed_at: DateTime<Utc>,
) -> Result<()> {
    let root = BitMapBackend::new(path, (IMAGE_WIDTH, IMAGE_HEIGHT)).into_drawing_area();
    root.fill(&BACKGROUND).map_err(draw_error)?;

    let title = (FONT, 36.0, FontStyle::Bold).into_font().color(&TEXT);
    let heading = (FONT, 24.0, FontStyle::Bold).into_font().color(&TEXT);
    let body = (FONT, 24.0).into_font().color(&TEXT);
    let row = (FONT, 20.0).into_font().color(&TEXT);

    root.draw(&Text::new("Country Summary Report", (LEFT, 50), title))
        .map_err(draw_error)?;
    root.draw(&Text::new(
        format!("Total Countries: {total_countries}"),
        (LEFT, 120),
        body.clone(),
    ))
    .map_err(draw_error)?;
    root.draw(&Text::new(
        format!(
            "Last Refreshed: {}",
            refreshed_at.to_rfc3339_opts(SecondsFormat::Millis, true)
        ),
        (LEFT, 160),
        body.clone(),
    ))
    .map_err(draw_error)?;
    root.draw(&Text::new(
        format!("Top {TOP_COUNTRIES} Countries by Estimated GDP:"),
        (LEFT, 220),
        heading,
    ))
    .map_err(draw_error)?;

    let top = top_by_gdp(records, TOP_COUNTRIES);
    if top.is_empty() {
        root.draw(&Text::new(
            "No countries available",
            (LEFT, ROW_TOP),
            row.clone(),
        ))
        .map_err(draw_error)?;
    }

    let max_gdp = top
        .iter()
        .filter_map(|r| r.estimated_gdp)
        .fold(0.0_f64, f64::max);

    for (rank, record) in top.iter().enumerate() {
        let y = ROW_TOP + rank as i32 * ROW_HEIGHT;
        root.draw(&Text::new(ranked_line(rank + 1, record), (LEFT, y), row.clone()))
            .map_err(draw_error)?;

        let gdp = record.estimated_gdp.unwrap_or(0.0);
        if max_gdp > 0.0 && gdp > 0.0 {
            let width = ((gdp / max_gdp) * BAR_MAX_WIDTH).round().max(1.0) as i32;
            root.draw(&Rectangle::new(
                [(BAR_LEFT, y), (BAR_LEFT + width, y + 28)],
                BAR.filled(),
            ))
            .map_err(draw_error)?;
        }
    }

    root.present().map_err(draw_error)?;
    Ok(())
}
