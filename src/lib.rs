//! # PQ Report
//!
//! Report export for the PQ Dashboard.
//!
//! The dashboard renders production counts, quality rates and line status as
//! summary cards and tables. This crate reads that rendered page back, reduces
//! it to a [`ReportSnapshot`], and encodes the snapshot as either a paginated
//! PDF or a multi-sheet XLSX workbook.
//!
//! ## Architecture
//!
//! ```text
//! Rendered page (HTML)          Snapshot JSON
//!       ↓                            ↓
//!   [extract]  — cards + tables → ReportSnapshot
//!       ↓
//!   ┌───────────────────────┬──────────────────────┐
//!   [layout] + [raster]      [xlsx]
//!       ↓                        ↓
//!   [pdf]                    rust_xlsxwriter
//!       ↓                        ↓
//!   ReportArtifact           ReportArtifact
//! ```
//!
//! Every export builds a fresh snapshot. A failed surface capture never fails
//! the PDF export: the document is produced without the chart pages.

pub mod config;
pub mod error;
pub mod extract;
pub mod font;
pub mod layout;
pub mod model;
pub mod pdf;
pub mod raster;
pub mod style;
pub mod xlsx;

#[cfg(feature = "wasm")]
pub mod wasm;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

pub use config::ExportConfig;
pub use error::{RasterError, ReportError};
pub use extract::{extract_snapshot, ReportSurface};
pub use model::{DataTable, Metric, ReportSnapshot};
pub use raster::{CaptureFileRasterizer, NoCapture, RasterOptions, Rasterizer};

use font::StandardFont;
use layout::{BlockKind, LayoutEngine, ReportLayout};
use model::Metadata;
use pdf::PdfWriter;
use style::Color;

pub const PDF_MIME: &str = "application/pdf";
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const TITLE_SIZE: f64 = 18.0;
const SUBTITLE_SIZE: f64 = 10.0;
const SECTION_SIZE: f64 = 13.0;
const LABEL_SIZE: f64 = 11.0;

/// A finished export, ready to be saved or handed to a browser.
#[derive(Debug, Clone)]
pub struct ReportArtifact {
    pub filename: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

impl ReportArtifact {
    /// Write the artifact into `dir` under its own filename.
    pub fn save_to(&self, dir: &Path) -> Result<PathBuf, ReportError> {
        let path = dir.join(&self.filename);
        std::fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

/// `<prefix>_<YYYY-MM-DD>.<ext>` for the local date of `now`.
pub fn report_filename(prefix: &str, now: &DateTime<Local>, ext: &str) -> String {
    format!("{}_{}.{}", prefix, now.format("%Y-%m-%d"), ext)
}

/// Read a snapshot emitted directly by the dashboard as JSON.
pub fn snapshot_from_json(json: &str) -> Result<ReportSnapshot, ReportError> {
    Ok(serde_json::from_str(json)?)
}

/// Extract a snapshot from rendered HTML, using the configured root and selectors.
pub fn snapshot_from_html(html: &str, config: &ExportConfig) -> ReportSnapshot {
    let surface = ReportSurface::parse(html);
    extract_snapshot(&surface, &config.root_id, &config.extractor)
}

// ─── PDF ───────────────────────────────────────────────────────────

/// Export the rendered page as a PDF.
pub fn export_pdf<R: Rasterizer + ?Sized>(
    html: &str,
    rasterizer: &R,
    config: &ExportConfig,
) -> ReportArtifact {
    export_pdf_at(html, rasterizer, config, Local::now())
}

/// [`export_pdf`] as of a fixed point in time.
pub fn export_pdf_at<R: Rasterizer + ?Sized>(
    html: &str,
    rasterizer: &R,
    config: &ExportConfig,
    now: DateTime<Local>,
) -> ReportArtifact {
    let surface = ReportSurface::parse(html);
    let snapshot = extract_snapshot(&surface, &config.root_id, &config.extractor);
    render_pdf(&snapshot, &surface, rasterizer, config, now)
}

/// Export an already-built snapshot as a PDF.
///
/// There is no page to look at, so the rasterizer is handed an empty
/// surface; capture-file rasterizers don't need one.
pub fn export_pdf_snapshot<R: Rasterizer + ?Sized>(
    snapshot: &ReportSnapshot,
    rasterizer: &R,
    config: &ExportConfig,
) -> ReportArtifact {
    render_pdf(snapshot, &ReportSurface::empty(), rasterizer, config, Local::now())
}

fn render_pdf<R: Rasterizer + ?Sized>(
    snapshot: &ReportSnapshot,
    surface: &ReportSurface,
    rasterizer: &R,
    config: &ExportConfig,
    now: DateTime<Local>,
) -> ReportArtifact {
    let generated = now.format("%Y-%m-%d %H:%M:%S").to_string();
    let layout = layout_report(snapshot, surface, rasterizer, config, &generated);

    let metadata = Metadata {
        title: Some(config.title.clone()),
        creation_date: Some(now.format("D:%Y%m%d%H%M%S").to_string()),
    };
    let bytes = PdfWriter::new().write(&layout.pages, &metadata);
    let filename = report_filename(&config.filename_prefix, &now, "pdf");
    tracing::debug!(%filename, pages = layout.pages.len(), bytes = bytes.len(), "pdf export built");

    ReportArtifact {
        filename,
        mime_type: PDF_MIME,
        bytes,
    }
}

/// Lay the report out into pages: title block, metrics table, data tables,
/// then the chart section with the surface capture sliced across pages.
pub fn layout_report<R: Rasterizer + ?Sized>(
    snapshot: &ReportSnapshot,
    surface: &ReportSurface,
    rasterizer: &R,
    config: &ExportConfig,
    generated: &str,
) -> ReportLayout {
    let mut engine = LayoutEngine::new(&config.page);

    engine.text_line(&config.title, StandardFont::HelveticaBold, TITLE_SIZE, Color::hex("#111827"));
    engine.text_line(
        &format!("Generated: {}", generated),
        StandardFont::Helvetica,
        SUBTITLE_SIZE,
        Color::hex("#6b7280"),
    );
    engine.gap();

    if !snapshot.metrics.is_empty() {
        let headers = vec!["Metric".to_string(), "Value".to_string()];
        let rows: Vec<Vec<String>> = snapshot
            .metrics
            .iter()
            .map(|m| vec![m.label.clone(), m.value.clone()])
            .collect();
        engine.table(&headers, &rows, BlockKind::MetricsTable);
    }

    for (i, table) in snapshot.tables.iter().enumerate() {
        engine.labeled_table(i + 1, LABEL_SIZE, config.min_table_space, &table.headers, &table.rows);
    }

    engine.ensure_space(config.min_chart_space);
    engine.heading("Charts & Visualizations", SECTION_SIZE, Some(BlockKind::ChartHeading));

    let options = RasterOptions {
        scale: config.raster_scale,
        ..Default::default()
    };
    match rasterizer.rasterize(surface, &options) {
        Ok(image) => {
            tracing::debug!(width = image.width(), height = image.height(), "surface captured");
            engine.image_slices(&image, config.min_slice_height);
        }
        Err(e) => {
            tracing::warn!(error = %e, "surface capture failed, exporting without chart pages");
        }
    }

    engine.finish()
}

// ─── XLSX ──────────────────────────────────────────────────────────

/// Export the rendered page as an XLSX workbook.
pub fn export_xlsx(html: &str, config: &ExportConfig) -> Result<ReportArtifact, ReportError> {
    export_xlsx_at(html, config, Local::now())
}

/// [`export_xlsx`] as of a fixed point in time.
pub fn export_xlsx_at(
    html: &str,
    config: &ExportConfig,
    now: DateTime<Local>,
) -> Result<ReportArtifact, ReportError> {
    let snapshot = snapshot_from_html(html, config);
    render_xlsx(&snapshot, config, now)
}

/// Export an already-built snapshot as an XLSX workbook.
pub fn export_xlsx_snapshot(
    snapshot: &ReportSnapshot,
    config: &ExportConfig,
) -> Result<ReportArtifact, ReportError> {
    render_xlsx(snapshot, config, Local::now())
}

fn render_xlsx(
    snapshot: &ReportSnapshot,
    config: &ExportConfig,
    now: DateTime<Local>,
) -> Result<ReportArtifact, ReportError> {
    let generated = now.format("%Y-%m-%d %H:%M:%S").to_string();
    let sheets = xlsx::plan_workbook(snapshot, &config.title, &generated);
    let bytes = xlsx::write_workbook(&sheets)?;
    let filename = report_filename(&config.filename_prefix, &now, "xlsx");
    tracing::debug!(%filename, sheets = sheets.len(), bytes = bytes.len(), "xlsx export built");

    Ok(ReportArtifact {
        filename,
        mime_type: XLSX_MIME,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_report_filename() {
        let now = Local.with_ymd_and_hms(2026, 3, 7, 14, 5, 0).unwrap();
        assert_eq!(
            report_filename("PQ_Dashboard_Report", &now, "pdf"),
            "PQ_Dashboard_Report_2026-03-07.pdf"
        );
    }

    #[test]
    fn test_snapshot_from_json_hint() {
        let err = snapshot_from_json(r#"{ "metrics": 3 }"#).unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("Failed to parse snapshot"));
        assert!(msg.contains("Hint:"));
    }

    #[test]
    fn test_empty_snapshot_still_has_chart_heading() {
        let layout = layout_report(
            &ReportSnapshot::default(),
            &ReportSurface::empty(),
            &NoCapture,
            &ExportConfig::default(),
            "now",
        );
        assert_eq!(layout.pages.len(), 1);
        assert_eq!(layout.placements.len(), 1);
        assert_eq!(layout.placements[0].kind, BlockKind::ChartHeading);
    }
}
