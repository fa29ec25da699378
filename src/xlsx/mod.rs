//! # Workbook Export
//!
//! Turns a [`ReportSnapshot`] into a multi-sheet XLSX workbook:
//!
//! - **Summary**: title, generated timestamp, and the KPI table.
//! - **Data 1..N**: one sheet per extracted table, rows verbatim.
//! - **Chart Info**: a note that charts aren't reproduced, then the metrics
//!   as a bullet list.
//!
//! Sheets are planned as plain rows first ([`plan_workbook`]) and handed to
//! `rust_xlsxwriter` in one go at the end ([`write_workbook`]). Nothing is
//! written until every sheet has been built.

use rust_xlsxwriter::{Format, Workbook, Worksheet};

use crate::error::ReportError;
use crate::model::{DataTable, ReportSnapshot};

pub const SUMMARY_SHEET: &str = "Summary";
pub const CHART_INFO_SHEET: &str = "Chart Info";

const SUMMARY_LABEL_WIDTH: f64 = 30.0;
const SUMMARY_VALUE_WIDTH: f64 = 20.0;
const DATA_MAX_WIDTH: usize = 50;
const DATA_WIDTH_PADDING: usize = 2;
const CHART_INFO_WIDTH: f64 = 80.0;

const CHART_NOTE: &str = "Charts and visualizations are not reproduced in this workbook. \
                          See the PDF export for a visual snapshot of the dashboard.";

/// One worksheet, fully planned.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetSpec {
    pub name: String,
    /// Cell text by row. Rows may differ in length; an empty row is a blank line.
    pub rows: Vec<Vec<String>>,
    /// Width per column, in Excel character units.
    pub column_widths: Vec<f64>,
    /// Row indices written in bold.
    pub bold_rows: Vec<usize>,
}

impl SheetSpec {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
            column_widths: Vec::new(),
            bold_rows: Vec::new(),
        }
    }

    fn push_row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }

    fn push_bold_row(&mut self, cells: Vec<String>) {
        self.bold_rows.push(self.rows.len());
        self.rows.push(cells);
    }
}

/// Plan every sheet of the workbook, in order.
///
/// Always returns `tables.len() + 2` sheets.
pub fn plan_workbook(snapshot: &ReportSnapshot, title: &str, generated: &str) -> Vec<SheetSpec> {
    let mut sheets = Vec::with_capacity(snapshot.tables.len() + 2);

    let mut summary = SheetSpec::new(SUMMARY_SHEET);
    summary.push_bold_row(vec![title.to_string()]);
    summary.push_row(vec![format!("Generated: {}", generated)]);
    summary.push_row(Vec::new());
    summary.push_bold_row(vec!["Key Performance Indicators".to_string()]);
    summary.push_bold_row(vec!["Metric".to_string(), "Value".to_string()]);
    for metric in &snapshot.metrics {
        summary.push_row(vec![metric.label.clone(), metric.value.clone()]);
    }
    summary.column_widths = vec![SUMMARY_LABEL_WIDTH, SUMMARY_VALUE_WIDTH];
    sheets.push(summary);

    for (i, table) in snapshot.tables.iter().enumerate() {
        sheets.push(plan_data_sheet(i + 1, table));
    }

    let mut chart_info = SheetSpec::new(CHART_INFO_SHEET);
    chart_info.push_row(vec![CHART_NOTE.to_string()]);
    chart_info.push_row(Vec::new());
    chart_info.push_bold_row(vec!["Metric Reference".to_string()]);
    for metric in &snapshot.metrics {
        chart_info.push_row(vec![format!("\u{2022} {}: {}", metric.label, metric.value)]);
    }
    chart_info.column_widths = vec![CHART_INFO_WIDTH];
    sheets.push(chart_info);

    sheets
}

fn plan_data_sheet(position: usize, table: &DataTable) -> SheetSpec {
    let mut sheet = SheetSpec::new(format!("Data {}", position));
    if !table.headers.is_empty() {
        sheet.push_bold_row(table.headers.clone());
    }
    for row in &table.rows {
        sheet.push_row(row.clone());
    }

    let mut longest = vec![0usize; table.column_count()];
    for row in &sheet.rows {
        for (col, text) in row.iter().enumerate() {
            longest[col] = longest[col].max(text.chars().count());
        }
    }
    sheet.column_widths = longest
        .into_iter()
        .map(|len| (len.min(DATA_MAX_WIDTH) + DATA_WIDTH_PADDING) as f64)
        .collect();
    sheet
}

/// Serialize planned sheets to XLSX bytes.
pub fn write_workbook(sheets: &[SheetSpec]) -> Result<Vec<u8>, ReportError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    for spec in sheets {
        let mut worksheet = Worksheet::new();
        worksheet.set_name(spec.name.as_str())?;

        for (col, width) in spec.column_widths.iter().enumerate() {
            worksheet.set_column_width(col as u16, *width)?;
        }

        for (row, cells) in spec.rows.iter().enumerate() {
            let is_bold = spec.bold_rows.contains(&row);
            for (col, text) in cells.iter().enumerate() {
                if text.is_empty() {
                    continue;
                }
                if is_bold {
                    worksheet.write_string_with_format(row as u32, col as u16, text.as_str(), &bold)?;
                } else {
                    worksheet.write_string(row as u32, col as u16, text.as_str())?;
                }
            }
        }

        tracing::debug!(sheet = %spec.name, rows = spec.rows.len(), "planned sheet written");
        workbook.push_worksheet(worksheet);
    }

    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Metric;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    fn scenario() -> ReportSnapshot {
        ReportSnapshot {
            metrics: vec![
                Metric::new("Daily Production", "1,247"),
                Metric::new("Quality Rate", "98.2%"),
            ],
            tables: vec![DataTable {
                headers: strings(&["Line", "Status"]),
                rows: vec![strings(&["Line A", "Running"]), strings(&["Line B", "Idle"])],
            }],
        }
    }

    #[test]
    fn test_sheet_order_and_count() {
        let mut snapshot = scenario();
        snapshot.tables.push(DataTable::default());
        snapshot.tables.push(DataTable::default());
        let names: Vec<_> = plan_workbook(&snapshot, "PQ Dashboard Report", "now")
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Summary", "Data 1", "Data 2", "Data 3", "Chart Info"]);
    }

    #[test]
    fn test_summary_rows() {
        let sheets = plan_workbook(&scenario(), "PQ Dashboard Report", "2026-10-16 09:30:00");
        let summary = &sheets[0];
        assert_eq!(summary.rows[0], strings(&["PQ Dashboard Report"]));
        assert_eq!(summary.rows[1], strings(&["Generated: 2026-10-16 09:30:00"]));
        assert!(summary.rows[2].is_empty());
        assert_eq!(summary.rows[3], strings(&["Key Performance Indicators"]));
        assert_eq!(summary.rows[4], strings(&["Metric", "Value"]));
        assert_eq!(summary.rows[5], strings(&["Daily Production", "1,247"]));
        assert_eq!(summary.rows[6], strings(&["Quality Rate", "98.2%"]));
        assert_eq!(summary.column_widths, vec![30.0, 20.0]);
        assert_eq!(summary.bold_rows, vec![0, 3, 4]);
    }

    #[test]
    fn test_data_sheet_rows_and_widths() {
        let sheets = plan_workbook(&scenario(), "t", "g");
        let data = &sheets[1];
        assert_eq!(data.rows.len(), 3);
        assert_eq!(data.rows[0], strings(&["Line", "Status"]));
        // "Line A" = 6, "Running" = 7
        assert_eq!(data.column_widths, vec![8.0, 9.0]);
    }

    #[test]
    fn test_data_sheet_width_capped() {
        let table = DataTable {
            headers: Vec::new(),
            rows: vec![vec!["x".repeat(120)]],
        };
        let sheet = plan_data_sheet(1, &table);
        assert_eq!(sheet.column_widths, vec![52.0]);
        assert!(sheet.bold_rows.is_empty());
    }

    #[test]
    fn test_ragged_rows_kept_verbatim() {
        let table = DataTable {
            headers: strings(&["A", "B", "C"]),
            rows: vec![strings(&["1"]), strings(&["1", "2", "3", "4"])],
        };
        let sheet = plan_data_sheet(2, &table);
        assert_eq!(sheet.name, "Data 2");
        assert_eq!(sheet.rows[1], strings(&["1"]));
        assert_eq!(sheet.rows[2].len(), 4);
        assert_eq!(sheet.column_widths.len(), 4);
    }

    #[test]
    fn test_chart_info_bullets_in_order() {
        let sheets = plan_workbook(&scenario(), "t", "g");
        let info = sheets.last().unwrap();
        let bullets: Vec<_> = info
            .rows
            .iter()
            .filter_map(|r| r.first())
            .filter(|t| t.starts_with('\u{2022}'))
            .cloned()
            .collect();
        assert_eq!(
            bullets,
            vec!["\u{2022} Daily Production: 1,247", "\u{2022} Quality Rate: 98.2%"]
        );
        assert_eq!(info.column_widths, vec![80.0]);
    }

    #[test]
    fn test_write_workbook_produces_zip() {
        let sheets = plan_workbook(&scenario(), "t", "g");
        let bytes = write_workbook(&sheets).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }
}
