//! # Page Data Extraction
//!
//! Reads an already-rendered report surface and reduces it to a
//! [`ReportSnapshot`]. The surface is an HTML document; the only thing we
//! ask of it is "give me the elements matching this selector", so the same
//! code works on a server-side render, a saved page, or a headless-browser
//! dump.
//!
//! Extraction is a heuristic scan, not a schema. Summary cards are found by
//! class-name patterns and tables by their native `<table>` structure. The
//! scan never fails: a missing root, a card without a value, or a table
//! without rows simply contributes nothing.

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

use crate::model::{DataTable, Metric, ReportSnapshot};

/// A parsed, rendered report page.
pub struct ReportSurface {
    html: Html,
}

impl ReportSurface {
    pub fn parse(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
        }
    }

    /// A surface with no content. Used when the snapshot arrives as JSON
    /// and only the rasterizer still needs something to look at.
    pub fn empty() -> Self {
        Self {
            html: Html::new_document(),
        }
    }

    /// Locate the element with the given `id`, in document order.
    pub fn root(&self, id: &str) -> Option<ElementRef<'_>> {
        self.html
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().id() == Some(id))
    }
}

impl std::fmt::Debug for ReportSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportSurface").finish_non_exhaustive()
    }
}

/// CSS selectors describing what a summary card looks like.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractorConfig {
    /// Containers that might be summary cards.
    pub card_selector: String,
    /// Candidates for the card's short label, in preference order of the DOM.
    pub label_selector: String,
    /// Candidates for the card's large/bold value.
    pub value_selector: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            card_selector: "[class*='card'], [class*='kpi'], [class*='metric'], \
                            [class*='stat'], .bg-white.rounded-lg"
                .to_string(),
            label_selector: "[class*='label'], [class*='title'], .text-sm, h3, h4, p"
                .to_string(),
            value_selector: "[class*='value'], .text-2xl, .text-3xl, .font-bold, strong"
                .to_string(),
        }
    }
}

/// Compiled selectors. Invalid user selectors fall back to the defaults.
struct Selectors {
    card: Selector,
    label: Selector,
    value: Selector,
    table: Selector,
    row: Selector,
}

impl Selectors {
    fn compile(config: &ExtractorConfig) -> Self {
        let defaults = ExtractorConfig::default();
        Self {
            card: compile_or_default(&config.card_selector, &defaults.card_selector),
            label: compile_or_default(&config.label_selector, &defaults.label_selector),
            value: compile_or_default(&config.value_selector, &defaults.value_selector),
            table: compile_or_default("table", "table"),
            row: compile_or_default("tr", "tr"),
        }
    }
}

fn compile_or_default(selector: &str, fallback: &str) -> Selector {
    match Selector::parse(selector) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(selector, error = %e, "invalid extractor selector, using default");
            Selector::parse(fallback).expect("default selectors must parse")
        }
    }
}

/// Produce a snapshot of the report rooted at the element with `root_id`.
///
/// A missing root yields an empty snapshot.
pub fn extract_snapshot(surface: &ReportSurface, root_id: &str, config: &ExtractorConfig) -> ReportSnapshot {
    let Some(root) = surface.root(root_id) else {
        tracing::debug!(root_id, "report root not found, returning empty snapshot");
        return ReportSnapshot::default();
    };

    let selectors = Selectors::compile(config);
    let snapshot = ReportSnapshot {
        metrics: extract_metrics(root, &selectors),
        tables: extract_tables(root, &selectors),
    };
    tracing::debug!(
        metrics = snapshot.metrics.len(),
        tables = snapshot.tables.len(),
        "extracted report snapshot"
    );
    snapshot
}

// ── Metrics ─────────────────────────────────────────────────────

fn extract_metrics(root: ElementRef<'_>, selectors: &Selectors) -> Vec<Metric> {
    let candidates: Vec<(ElementRef<'_>, Option<Metric>)> = root
        .select(&selectors.card)
        .filter(|card| !has_ancestor_named(*card, root, "table"))
        .filter(|card| card.select(&selectors.table).next().is_none())
        .map(|card| (card, read_card(card, selectors)))
        .collect();

    // A card that wraps other metric-bearing cards is a section, not a card.
    candidates
        .iter()
        .filter_map(|(card, metric)| {
            let metric = metric.as_ref()?;
            let wraps_another = candidates.iter().any(|(other, other_metric)| {
                other_metric.is_some() && other.id() != card.id() && is_descendant(*other, *card)
            });
            (!wraps_another).then(|| metric.clone())
        })
        .collect()
}

fn read_card(card: ElementRef<'_>, selectors: &Selectors) -> Option<Metric> {
    let value_el = card
        .select(&selectors.value)
        .find(|el| !visible_text(*el).is_empty())?;

    let label_el = card.select(&selectors.label).find(|el| {
        el.id() != value_el.id()
            && !is_descendant(value_el, *el)
            && !is_descendant(*el, value_el)
            && !visible_text(*el).is_empty()
    })?;

    Some(Metric::new(visible_text(label_el), visible_text(value_el)))
}

// ── Tables ──────────────────────────────────────────────────────

fn extract_tables(root: ElementRef<'_>, selectors: &Selectors) -> Vec<DataTable> {
    root.select(&selectors.table)
        .map(|table| read_table(table, selectors))
        .collect()
}

fn read_table(table: ElementRef<'_>, selectors: &Selectors) -> DataTable {
    // Rows of nested tables belong to those tables, not this one.
    let rows: Vec<ElementRef<'_>> = table
        .select(&selectors.row)
        .filter(|tr| nearest_table(*tr).map(|t| t.id()) == Some(table.id()))
        .collect();

    let header_row = rows
        .iter()
        .copied()
        .find(|tr| parent_named(*tr, "thead"))
        .or_else(|| rows.first().copied().filter(|tr| is_th_only(*tr)));

    let headers = header_row.map(row_cells).unwrap_or_default();

    let body = rows
        .iter()
        .copied()
        .filter(|tr| Some(tr.id()) != header_row.map(|h| h.id()))
        .filter(|tr| !parent_named(*tr, "thead"))
        .map(row_cells)
        .filter(|cells| cells.iter().any(|c| !c.is_empty()))
        .collect();

    DataTable {
        headers,
        rows: body,
    }
}

fn cells_of(tr: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    tr.children()
        .filter_map(ElementRef::wrap)
        .filter(|el| matches!(el.value().name(), "td" | "th"))
}

fn row_cells(tr: ElementRef<'_>) -> Vec<String> {
    cells_of(tr).map(visible_text).collect()
}

fn is_th_only(tr: ElementRef<'_>) -> bool {
    let mut cells = cells_of(tr).peekable();
    cells.peek().is_some() && cells.all(|c| c.value().name() == "th")
}

// ── Tree helpers ────────────────────────────────────────────────

/// Text content with runs of whitespace collapsed and the ends trimmed.
fn visible_text(el: ElementRef<'_>) -> String {
    let raw: String = el.text().collect();
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_descendant(el: ElementRef<'_>, ancestor: ElementRef<'_>) -> bool {
    el.ancestors().any(|node| node.id() == ancestor.id())
}

fn nearest_table(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| a.value().name() == "table")
}

fn parent_named(el: ElementRef<'_>, name: &str) -> bool {
    el.parent()
        .and_then(ElementRef::wrap)
        .is_some_and(|p| p.value().name() == name)
}

/// Whether `el` sits inside a `name` element below `root`.
fn has_ancestor_named(el: ElementRef<'_>, root: ElementRef<'_>, name: &str) -> bool {
    el.ancestors()
        .take_while(|node| node.id() != root.id())
        .filter_map(ElementRef::wrap)
        .any(|a| a.value().name() == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_of(html: &str) -> ReportSnapshot {
        let surface = ReportSurface::parse(html);
        extract_snapshot(&surface, "dashboard-content", &ExtractorConfig::default())
    }

    fn page(body: &str) -> String {
        format!(
            "<html><body><nav>menu</nav><div id=\"dashboard-content\">{}</div></body></html>",
            body
        )
    }

    #[test]
    fn test_missing_root_is_empty() {
        let snapshot = snapshot_of("<html><body><table><tr><td>x</td></tr></table></body></html>");
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_empty_root_is_empty() {
        let snapshot = snapshot_of(&page("<h1>Nothing here</h1>"));
        assert_eq!(snapshot, ReportSnapshot::default());
    }

    #[test]
    fn test_cards_in_document_order() {
        let html = page(
            r#"<div class="grid">
                 <div class="metric-card"><span class="metric-label">A</span><span class="metric-value">1</span></div>
                 <div class="metric-card"><span class="metric-label">B</span><span class="metric-value">2</span></div>
                 <div class="metric-card"><span class="metric-label">C</span><span class="metric-value">3</span></div>
               </div>"#,
        );
        let snapshot = snapshot_of(&html);
        assert_eq!(
            snapshot.metrics,
            vec![Metric::new("A", "1"), Metric::new("B", "2"), Metric::new("C", "3")]
        );
    }

    #[test]
    fn test_tailwind_card() {
        let html = page(
            r#"<div class="bg-white rounded-lg shadow p-6">
                 <p class="text-sm text-gray-600">Daily Production</p>
                 <p class="text-2xl font-bold text-gray-900">1,247</p>
               </div>"#,
        );
        assert_eq!(snapshot_of(&html).metrics, vec![Metric::new("Daily Production", "1,247")]);
    }

    #[test]
    fn test_card_without_value_is_skipped() {
        let html = page(
            r#"<div class="kpi-card"><span class="kpi-label">Defects</span></div>
               <div class="kpi-card"><span class="kpi-label">OEE</span><strong>  </strong></div>"#,
        );
        assert!(snapshot_of(&html).metrics.is_empty());
    }

    #[test]
    fn test_wrapping_section_not_counted() {
        let html = page(
            r#"<section class="stats-panel">
                 <h3>Overview</h3>
                 <div class="stat-card"><p>Quality Rate</p><strong>98.2%</strong></div>
               </section>"#,
        );
        assert_eq!(snapshot_of(&html).metrics, vec![Metric::new("Quality Rate", "98.2%")]);
    }

    #[test]
    fn test_table_headers_and_rows() {
        let html = page(
            r#"<table>
                 <thead><tr><th> Line </th><th>Status</th></tr></thead>
                 <tbody>
                   <tr><td>Line A</td><td>Running</td></tr>
                   <tr><td>Line B</td><td>
                       Idle
                   </td></tr>
                 </tbody>
               </table>"#,
        );
        let snapshot = snapshot_of(&html);
        assert_eq!(snapshot.tables.len(), 1);
        let table = &snapshot.tables[0];
        assert_eq!(table.headers, vec!["Line", "Status"]);
        assert_eq!(
            table.rows,
            vec![vec!["Line A", "Running"], vec!["Line B", "Idle"]]
        );
    }

    #[test]
    fn test_short_row_kept_unpadded() {
        let html = page(
            r#"<table>
                 <thead><tr><th>Batch</th><th>Metal</th><th>Yield</th></tr></thead>
                 <tbody><tr><td>B-101</td><td>18k Gold</td></tr></tbody>
               </table>"#,
        );
        let table = &snapshot_of(&html).tables[0];
        assert_eq!(table.rows, vec![vec!["B-101", "18k Gold"]]);
    }

    #[test]
    fn test_blank_rows_dropped() {
        let html = page(
            r#"<table><tbody>
                 <tr><td> </td><td></td></tr>
                 <tr><td>Ring</td><td></td></tr>
                 <tr></tr>
               </tbody></table>"#,
        );
        let table = &snapshot_of(&html).tables[0];
        assert!(table.headers.is_empty());
        assert_eq!(table.rows, vec![vec!["Ring".to_string(), String::new()]]);
    }

    #[test]
    fn test_th_only_first_row_is_header_without_thead() {
        let html = page(
            r#"<table>
                 <tr><th>Station</th><th>Defects</th></tr>
                 <tr><td>Polish</td><td>3</td></tr>
               </table>"#,
        );
        let table = &snapshot_of(&html).tables[0];
        assert_eq!(table.headers, vec!["Station", "Defects"]);
        assert_eq!(table.rows, vec![vec!["Polish", "3"]]);
    }

    #[test]
    fn test_nested_table_rows_stay_with_inner_table() {
        let html = page(
            r#"<table><tbody>
                 <tr><td>outer</td><td><table><tbody><tr><td>inner</td></tr></tbody></table></td></tr>
               </tbody></table>"#,
        );
        let snapshot = snapshot_of(&html);
        assert_eq!(snapshot.tables.len(), 2);
        assert_eq!(snapshot.tables[0].rows.len(), 1);
        assert_eq!(snapshot.tables[0].rows[0][0], "outer");
        assert_eq!(snapshot.tables[1].rows, vec![vec!["inner"]]);
    }

    #[test]
    fn test_status_badge_in_table_is_not_a_metric() {
        let html = page(
            r#"<table><tbody>
                 <tr><td><div class="status-badge"><p>State</p><strong>Running</strong></div></td></tr>
               </tbody></table>"#,
        );
        assert!(snapshot_of(&html).metrics.is_empty());
    }

    #[test]
    fn test_invalid_selector_falls_back() {
        let surface = ReportSurface::parse(&page(
            r#"<div class="metric-card"><span class="metric-label">A</span><span class="metric-value">1</span></div>"#,
        ));
        let config = ExtractorConfig {
            card_selector: "[[nope".to_string(),
            ..Default::default()
        };
        let snapshot = extract_snapshot(&surface, "dashboard-content", &config);
        assert_eq!(snapshot.metrics, vec![Metric::new("A", "1")]);
    }
}
