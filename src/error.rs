//! Structured error types for the report exporter.
//!
//! Extraction has no error type at all: a surface with nothing to read is an
//! empty snapshot. What can fail is reading input, serializing a workbook,
//! and writing the artifact. Rasterization has its own error because the PDF
//! path swallows it instead of propagating it.

use thiserror::Error;

/// The unified error type returned by the public export API.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Snapshot JSON failed to parse.
    #[error("Failed to parse snapshot: {source}{}", hint_suffix(.hint))]
    Snapshot {
        source: serde_json::Error,
        hint: String,
    },
    /// Export configuration was unreadable or invalid.
    #[error("Config error: {0}")]
    Config(String),
    /// The workbook writer rejected a sheet or failed to serialize.
    #[error("XLSX error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
    /// Reading input or writing the artifact failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn hint_suffix(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {}", hint)
    }
}

impl From<serde_json::Error> for ReportError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but isn't a report snapshot. Expected `metrics` and `tables` arrays.".to_string()
            }
            serde_json::error::Category::Eof => {
                "Unexpected end of input. Is the JSON truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        ReportError::Snapshot { source: e, hint }
    }
}

/// Why a surface capture could not be produced.
#[derive(Debug, Error)]
pub enum RasterError {
    /// No capture source is configured for this export.
    #[error("no surface capture available")]
    Unavailable,
    /// The capture bytes could not be read from their source.
    #[error("failed to read capture: {0}")]
    Source(String),
    /// The capture bytes were read but could not be decoded.
    #[error("failed to decode capture: {0}")]
    Decode(String),
}
