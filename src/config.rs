//! Export configuration.
//!
//! Every field has a default, so an empty JSON object (or no config file at
//! all) gives the stock PQ Dashboard export. The page-break thresholds are
//! tuning knobs, not contracts: they only decide when a block is pushed to
//! a fresh page instead of being started near the bottom of the current one.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ReportError;
use crate::extract::ExtractorConfig;
use crate::model::PageConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportConfig {
    /// Title line at the top of the PDF and the Summary sheet.
    pub title: String,
    /// Artifact filenames are `<prefix>_<YYYY-MM-DD>.<ext>`.
    pub filename_prefix: String,
    /// Element id of the report root on the rendered page.
    pub root_id: String,
    pub page: PageConfig,
    /// Oversampling factor requested from the rasterizer.
    pub raster_scale: f64,
    /// Minimum space (pt) left on a page before a data table starts there.
    pub min_table_space: f64,
    /// Minimum space (pt) left on a page before the chart section starts there.
    pub min_chart_space: f64,
    /// Raster slices shorter than this (pt) are dropped instead of drawn.
    pub min_slice_height: f64,
    pub extractor: ExtractorConfig,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            title: "PQ Dashboard Report".to_string(),
            filename_prefix: "PQ_Dashboard_Report".to_string(),
            root_id: "dashboard-content".to_string(),
            page: PageConfig::default(),
            raster_scale: 2.0,
            min_table_space: 80.0,
            min_chart_space: 200.0,
            min_slice_height: 20.0,
            extractor: ExtractorConfig::default(),
        }
    }
}

impl ExportConfig {
    /// Parse a config from JSON text and check it for values that can't work.
    pub fn from_json(json: &str) -> Result<Self, ReportError> {
        let config: ExportConfig =
            serde_json::from_str(json).map_err(|e| ReportError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ReportError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    fn validate(&self) -> Result<(), ReportError> {
        let (width, height) = self.page.size.dimensions();
        if self.page.margin.horizontal() >= width || self.page.margin.vertical() >= height {
            return Err(ReportError::Config(
                "page margins leave no room for content".to_string(),
            ));
        }
        if self.raster_scale.is_nan() || self.raster_scale <= 0.0 {
            return Err(ReportError::Config(format!(
                "rasterScale must be positive, got {}",
                self.raster_scale
            )));
        }
        if self.filename_prefix.trim().is_empty() {
            return Err(ReportError::Config("filenamePrefix must not be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_is_default() {
        let config = ExportConfig::from_json("{}").unwrap();
        assert_eq!(config.filename_prefix, "PQ_Dashboard_Report");
        assert_eq!(config.root_id, "dashboard-content");
        assert!((config.raster_scale - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_partial_override() {
        let config =
            ExportConfig::from_json(r#"{ "title": "Line 3 Report", "minTableSpace": 90 }"#).unwrap();
        assert_eq!(config.title, "Line 3 Report");
        assert!((config.min_table_space - 90.0).abs() < f64::EPSILON);
        assert!((config.min_chart_space - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rejects_oversized_margins() {
        let err = ExportConfig::from_json(
            r#"{ "page": { "margin": { "top": 500, "right": 10, "bottom": 500, "left": 10 } } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ReportError::Config(_)));
    }

    #[test]
    fn test_rejects_zero_scale() {
        assert!(ExportConfig::from_json(r#"{ "rasterScale": 0 }"#).is_err());
    }
}
