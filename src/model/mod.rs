//! # Report Model
//!
//! The intermediate representation between the rendered dashboard and the
//! two export encoders. A [`ReportSnapshot`] is what the extractor reads off
//! the page and what both the PDF and XLSX paths consume.
//!
//! The snapshot is a plain owned value: once produced it has no link back
//! to the surface it came from. It is also serde-friendly, so a dashboard
//! that already knows its own numbers can hand a snapshot over as JSON and
//! skip DOM scraping entirely.

use serde::{Deserialize, Serialize};

/// Everything an export needs to know about the report, in page order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSnapshot {
    /// Summary-card metrics in visual scan order (top-to-bottom, left-to-right).
    #[serde(default)]
    pub metrics: Vec<Metric>,
    /// Tabular datasets in document order.
    #[serde(default)]
    pub tables: Vec<DataTable>,
}

impl ReportSnapshot {
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty() && self.tables.is_empty()
    }
}

/// A single labelled value from a summary card.
///
/// The value is kept as the visible text ("1,247", "98.2%"); no numeric
/// parsing or unit normalization happens anywhere in the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
    pub label: String,
    pub value: String,
}

impl Metric {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// A table lifted from the page.
///
/// Row widths are whatever the source had. A row may be shorter or longer
/// than `headers`; consumers must cope with either.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataTable {
    #[serde(default)]
    pub headers: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<String>>,
}

impl DataTable {
    /// Number of columns needed to show every cell of the table.
    pub fn column_count(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.headers.len()))
            .max()
            .unwrap_or(0)
    }
}

/// Document metadata embedded in the PDF Info dictionary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    pub title: Option<String>,
    /// Already formatted as a PDF date string (`D:YYYYMMDDHHmmSS`).
    pub creation_date: Option<String>,
}

/// Page configuration for the PDF export: size and margins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageConfig {
    /// Page size. Defaults to A4.
    #[serde(default)]
    pub size: PageSize,

    /// Page margins in points (1/72 inch).
    #[serde(default = "default_margin")]
    pub margin: Edges,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            size: PageSize::A4,
            margin: default_margin(),
        }
    }
}

fn default_margin() -> Edges {
    Edges::uniform(40.0)
}

/// Standard page sizes in points.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub enum PageSize {
    #[default]
    A4,
    Letter,
    Custom {
        width: f64,
        height: f64,
    },
}

impl PageSize {
    /// Returns (width, height) in points.
    pub fn dimensions(&self) -> (f64, f64) {
        match self {
            PageSize::A4 => (595.28, 841.89),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Custom { width, height } => (*width, *height),
        }
    }
}

/// Edge values (top, right, bottom, left) used for margins and cell padding.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Edges {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Edges {
    pub fn uniform(v: f64) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }

    pub fn horizontal(&self) -> f64 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f64 {
        self.top + self.bottom
    }
}
