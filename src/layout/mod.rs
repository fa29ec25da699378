//! # Report Page Layout
//!
//! Places the report's blocks (title, metric table, data tables, chart
//! heading, raster slices) onto fixed-size pages, top to bottom, with a
//! single vertical cursor.
//!
//! The page is the unit of layout. Before a block starts, the engine asks
//! whether enough of the page is left for it; if not, it opens a new page
//! and the block begins at the top margin. Tables continue across pages at
//! row boundaries only and repeat their header row on each continuation.
//! The raster capture is the one thing that is sliced: it is cut into
//! horizontal strips that each fill the rest of a page.

use crate::font::{wrap_text, StandardFont};
use crate::model::PageConfig;
use crate::style::{Color, TableStyle};
use image::RgbImage;

/// Rows a table must be able to show before it is allowed to start on a page.
const MIN_ORPHAN_ROWS: usize = 2;
/// Rows a table must carry over when it continues on the next page.
const MIN_WIDOW_ROWS: usize = 2;
/// Vertical gap after a table, a heading, or the title block.
const BLOCK_GAP: f64 = 12.0;
/// Narrowest a column is squeezed to when another column has long text.
const MIN_COLUMN_WIDTH: f64 = 40.0;
/// Kept free above an oversized row so a table label still fits with it.
const ROW_HEADROOM: f64 = 24.0;

/// A finished page.
#[derive(Debug, Clone)]
pub struct LayoutPage {
    pub width: f64,
    pub height: f64,
    pub elements: Vec<LayoutElement>,
}

/// A positioned element on a page. Coordinates are top-left origin, points.
#[derive(Debug, Clone)]
pub struct LayoutElement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub draw: DrawCommand,
}

#[derive(Debug, Clone)]
pub enum DrawCommand {
    /// A filled rectangle (header band, row band).
    Rect { background: Color },
    /// One or more lines of text in a single font.
    Text {
        lines: Vec<TextLine>,
        font: StandardFont,
        font_size: f64,
        color: Color,
    },
    /// A strip of the surface capture, scaled into the element box.
    Image { image: RgbImage },
}

/// A line of text positioned by its baseline.
#[derive(Debug, Clone)]
pub struct TextLine {
    pub x: f64,
    pub y: f64,
    pub text: String,
}

/// What kind of block started at a [`Placement`].
#[derive(Debug, Clone, PartialEq)]
pub enum BlockKind {
    MetricsTable,
    /// The "Data Table N" label line above table N.
    TableLabel(usize),
    /// First fragment of data table N (1-based).
    DataTable(usize),
    /// A later fragment of data table N, after a page break.
    DataTableContinued(usize),
    ChartHeading,
    ImageSlice,
}

/// Where a block began. Used to check pagination.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub kind: BlockKind,
    pub page_index: usize,
    pub y: f64,
}

/// Output of the layout pass.
#[derive(Debug, Clone)]
pub struct ReportLayout {
    pub pages: Vec<LayoutPage>,
    pub placements: Vec<Placement>,
}

/// Page-aware, cursor-driven layout engine.
pub struct LayoutEngine {
    page_width: f64,
    page_height: f64,
    margin: crate::model::Edges,
    table_style: TableStyle,
    pages: Vec<LayoutPage>,
    cursor_y: f64,
    placements: Vec<Placement>,
}

/// A table measured against the content width, ready to place.
struct MeasuredTable {
    column_widths: Vec<f64>,
    header: Option<MeasuredRow>,
    rows: Vec<MeasuredRow>,
}

impl MeasuredTable {
    fn header_height(&self) -> f64 {
        self.header.as_ref().map_or(0.0, |h| h.height)
    }
}

struct MeasuredRow {
    cells: Vec<Vec<String>>,
    height: f64,
}

impl LayoutEngine {
    /// Open the first page.
    pub fn new(page: &PageConfig) -> Self {
        let (page_width, page_height) = page.size.dimensions();
        let mut engine = Self {
            page_width,
            page_height,
            margin: page.margin,
            table_style: TableStyle::default(),
            pages: Vec::new(),
            cursor_y: 0.0,
            placements: Vec::new(),
        };
        engine.new_page();
        engine
    }

    pub fn content_width(&self) -> f64 {
        self.page_width - self.margin.horizontal()
    }

    /// Vertical space left on the current page.
    pub fn remaining(&self) -> f64 {
        self.page_height - self.margin.bottom - self.cursor_y
    }

    pub fn cursor_y(&self) -> f64 {
        self.cursor_y
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn at_page_top(&self) -> bool {
        (self.cursor_y - self.margin.top).abs() < 0.001
    }

    pub fn new_page(&mut self) {
        self.pages.push(LayoutPage {
            width: self.page_width,
            height: self.page_height,
            elements: Vec::new(),
        });
        self.cursor_y = self.margin.top;
    }

    /// Start a new page unless at least `needed` points are left.
    /// Returns whether a break was inserted.
    pub fn ensure_space(&mut self, needed: f64) -> bool {
        if self.remaining() < needed && !self.at_page_top() {
            self.new_page();
            true
        } else {
            false
        }
    }

    fn push(&mut self, element: LayoutElement) {
        if let Some(page) = self.pages.last_mut() {
            page.elements.push(element);
        }
    }

    fn place(&mut self, kind: BlockKind) {
        self.placements.push(Placement {
            kind,
            page_index: self.pages.len() - 1,
            y: self.cursor_y,
        });
    }

    /// A single line of text at the cursor. Advances by the line height.
    pub fn text_line(&mut self, text: &str, font: StandardFont, font_size: f64, color: Color) {
        let line_height = font_size * 1.4;
        let baseline = self.cursor_y + (line_height - font_size) / 2.0 + font_size * 0.8;
        let element = LayoutElement {
            x: self.margin.left,
            y: self.cursor_y,
            width: self.content_width(),
            height: line_height,
            draw: DrawCommand::Text {
                lines: vec![TextLine {
                    x: self.margin.left,
                    y: baseline,
                    text: text.to_string(),
                }],
                font,
                font_size,
                color,
            },
        };
        self.push(element);
        self.cursor_y += line_height;
    }

    /// A section heading. Marks a chart-section placement when asked to.
    pub fn heading(&mut self, text: &str, font_size: f64, kind: Option<BlockKind>) {
        if let Some(kind) = kind {
            self.place(kind);
        }
        self.text_line(text, StandardFont::HelveticaBold, font_size, Color::hex("#111827"));
        self.cursor_y += BLOCK_GAP / 3.0;
    }

    pub fn gap(&mut self) {
        self.cursor_y += BLOCK_GAP;
    }

    /// Height a heading of `font_size` takes, gap included.
    fn heading_height(font_size: f64) -> f64 {
        font_size * 1.4 + BLOCK_GAP / 3.0
    }

    /// A labelled data table: "Data Table N" followed by the table.
    ///
    /// The label only starts on this page if the label, the header and the
    /// first rows the table needs (its orphan minimum) all fit below it, or
    /// at least `min_space` points are left, whichever is larger.
    pub fn labeled_table(
        &mut self,
        n: usize,
        label_size: f64,
        min_space: f64,
        headers: &[String],
        rows: &[Vec<String>],
    ) {
        let measured = self.measure_table(headers, rows);
        // A table too short to split without leaving an orphan or a widow
        // has to start here whole.
        let leading_rows = if measured.rows.len() < MIN_ORPHAN_ROWS + MIN_WIDOW_ROWS {
            measured.rows.len()
        } else {
            MIN_ORPHAN_ROWS
        };
        let lead = Self::heading_height(label_size)
            + measured.header_height()
            + measured
                .rows
                .iter()
                .take(leading_rows)
                .map(|r| r.height)
                .sum::<f64>();
        self.ensure_space(min_space.max(lead));
        self.heading(&format!("Data Table {}", n), label_size, Some(BlockKind::TableLabel(n)));
        self.place_table(measured, BlockKind::DataTable(n));
    }

    /// Lay out a banded table. Empty `headers` omits the header row.
    ///
    /// Rows are placed whole. When the rest don't fit, the table continues
    /// on a new page, starting at the top margin with the header repeated.
    pub fn table(&mut self, headers: &[String], rows: &[Vec<String>], kind: BlockKind) {
        let measured = self.measure_table(headers, rows);
        self.place_table(measured, kind);
    }

    fn place_table(&mut self, measured: MeasuredTable, kind: BlockKind) {
        if measured.header.is_none() && measured.rows.is_empty() {
            return;
        }

        let header_height = measured.header_height();
        let heights: Vec<f64> = measured.rows.iter().map(|r| r.height).collect();
        let mut next = 0usize;
        let mut continued = false;

        loop {
            let rest = &heights[next..];
            let available = self.remaining() - header_height;
            let count = match rows_that_fit(available, rest) {
                Some(count) => count,
                None if !self.at_page_top() => {
                    self.new_page();
                    continue;
                }
                // Already on a fresh page: place at least one row so we progress.
                None => fit_count(available, rest).max(1).min(rest.len()),
            };

            let fragment_kind = match (&kind, continued) {
                (BlockKind::DataTable(n), true) => BlockKind::DataTableContinued(*n),
                (other, _) => other.clone(),
            };
            self.place(fragment_kind);

            if let Some(header) = &measured.header {
                self.draw_row(header, &measured.column_widths, None, true);
            }
            for (i, row) in measured.rows[next..next + count].iter().enumerate() {
                let band = self.table_style.band_for(next + i);
                self.draw_row(row, &measured.column_widths, band, false);
            }

            next += count;
            if next >= heights.len() {
                break;
            }
            self.new_page();
            continued = true;
        }

        self.cursor_y += BLOCK_GAP;
    }

    fn draw_row(&mut self, row: &MeasuredRow, widths: &[f64], band: Option<Color>, is_header: bool) {
        let style = self.table_style;
        let top = self.cursor_y;
        let total_width: f64 = widths.iter().sum();

        let background = if is_header {
            Some(style.header_background)
        } else {
            band
        };
        if let Some(background) = background {
            self.push(LayoutElement {
                x: self.margin.left,
                y: top,
                width: total_width,
                height: row.height,
                draw: DrawCommand::Rect { background },
            });
        }

        let (font, color) = if is_header {
            (StandardFont::HelveticaBold, style.header_text)
        } else {
            (StandardFont::Helvetica, style.body_text)
        };
        let line_height = style.text_line_height();

        let mut x = self.margin.left;
        for (col, width) in widths.iter().enumerate() {
            if let Some(cell_lines) = row.cells.get(col) {
                let text_x = x + style.cell_padding_x;
                let lines: Vec<TextLine> = cell_lines
                    .iter()
                    .enumerate()
                    .filter(|(_, text)| !text.is_empty())
                    .map(|(i, text)| TextLine {
                        x: text_x,
                        y: top
                            + style.cell_padding_y
                            + i as f64 * line_height
                            + (line_height - style.font_size) / 2.0
                            + style.font_size * 0.8,
                        text: text.clone(),
                    })
                    .collect();
                if !lines.is_empty() {
                    self.push(LayoutElement {
                        x,
                        y: top,
                        width: *width,
                        height: row.height,
                        draw: DrawCommand::Text {
                            lines,
                            font,
                            font_size: style.font_size,
                            color,
                        },
                    });
                }
            }
            x += width;
        }

        self.cursor_y += row.height;
    }

    fn measure_table(&self, headers: &[String], rows: &[Vec<String>]) -> MeasuredTable {
        let style = self.table_style;
        let columns = rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(headers.len()))
            .max()
            .unwrap_or(0)
            .max(1);

        // Natural width per column: widest cell text plus padding.
        let mut natural = vec![2.0 * style.cell_padding_x; columns];
        for (col, text) in headers.iter().enumerate() {
            let w = StandardFont::HelveticaBold.measure_string(text, style.font_size);
            natural[col] = natural[col].max(w + 2.0 * style.cell_padding_x);
        }
        for row in rows {
            for (col, text) in row.iter().enumerate() {
                let w = StandardFont::Helvetica.measure_string(text, style.font_size);
                natural[col] = natural[col].max(w + 2.0 * style.cell_padding_x);
            }
        }

        let content_width = self.content_width();
        let min_column = (content_width / columns as f64).min(MIN_COLUMN_WIDTH);
        let column_widths = fit_columns(&natural, content_width, min_column);

        let line_height = style.text_line_height();
        let content_height = self.page_height - self.margin.vertical();
        let lines_within = |budget: f64| -> usize {
            (((budget - 2.0 * style.cell_padding_y) / line_height).floor() as usize).max(1)
        };

        let measure_row = |cells: &[String], font: StandardFont, max_lines: usize| -> MeasuredRow {
            let wrapped: Vec<Vec<String>> = cells
                .iter()
                .zip(&column_widths)
                .map(|(text, width)| {
                    let inner = (width - 2.0 * style.cell_padding_x).max(1.0);
                    let lines = wrap_text(text, font, style.font_size, inner);
                    clamp_lines(lines, max_lines, font, style.font_size, inner)
                })
                .collect();
            let line_count = wrapped.iter().map(Vec::len).max().unwrap_or(1).max(1);
            MeasuredRow {
                cells: wrapped,
                height: line_count as f64 * line_height + 2.0 * style.cell_padding_y,
            }
        };

        let header = if headers.is_empty() {
            None
        } else {
            Some(measure_row(
                headers,
                StandardFont::HelveticaBold,
                lines_within(content_height / 4.0),
            ))
        };
        let header_height = header.as_ref().map_or(0.0, |h| h.height);
        let row_lines = lines_within(content_height - header_height - ROW_HEADROOM);
        let rows: Vec<MeasuredRow> = rows
            .iter()
            .map(|row| measure_row(row, StandardFont::Helvetica, row_lines))
            .collect();

        MeasuredTable {
            column_widths,
            header,
            rows,
        }
    }

    /// Slice `image` into strips at content width, one strip per page.
    ///
    /// Each strip fills whatever is left of the current page. A remainder
    /// shorter than `min_slice_height` points is dropped rather than given
    /// a page of its own.
    pub fn image_slices(&mut self, image: &RgbImage, min_slice_height: f64) {
        let (width_px, height_px) = image.dimensions();
        if width_px == 0 || height_px == 0 {
            return;
        }
        let content_width = self.content_width();
        let pt_per_px = content_width / width_px as f64;
        let mut offset_px = 0u32;

        while offset_px < height_px {
            let rest_pt = (height_px - offset_px) as f64 * pt_per_px;
            if rest_pt < min_slice_height {
                tracing::debug!(rest_pt, "dropping trailing capture sliver");
                break;
            }

            let available_px = (self.remaining().max(0.0) / pt_per_px).floor() as u32;
            let slice_px = (height_px - offset_px).min(available_px);
            let slice_pt = slice_px as f64 * pt_per_px;

            if slice_pt < min_slice_height && !self.at_page_top() {
                self.new_page();
                continue;
            }
            if slice_px == 0 {
                break;
            }

            let strip = image::imageops::crop_imm(image, 0, offset_px, width_px, slice_px).to_image();
            self.place(BlockKind::ImageSlice);
            self.push(LayoutElement {
                x: self.margin.left,
                y: self.cursor_y,
                width: content_width,
                height: slice_pt,
                draw: DrawCommand::Image { image: strip },
            });
            self.cursor_y += slice_pt;
            offset_px += slice_px;

            let rest_pt = (height_px - offset_px) as f64 * pt_per_px;
            if offset_px < height_px && rest_pt >= min_slice_height {
                self.new_page();
            }
        }
    }

    pub fn finish(self) -> ReportLayout {
        ReportLayout {
            pages: self.pages,
            placements: self.placements,
        }
    }
}

/// How many rows of `heights` go on a page with `available` points left.
///
/// `None` means the table should start on the next page instead: fewer than
/// the orphan minimum fit here. When only a few rows would be carried over,
/// rows are pulled back so the next page gets the widow minimum.
fn rows_that_fit(available: f64, heights: &[f64]) -> Option<usize> {
    if available < 0.0 {
        return None;
    }
    let fit = fit_count(available, heights);
    if fit == heights.len() {
        return Some(fit);
    }
    if fit < MIN_ORPHAN_ROWS {
        return None;
    }
    let carried = heights.len() - fit;
    let keep = if carried < MIN_WIDOW_ROWS {
        fit - (MIN_WIDOW_ROWS - carried)
    } else {
        fit
    };
    (keep >= MIN_ORPHAN_ROWS).then_some(keep)
}

/// Rows that fit from the start of `heights`, ignoring orphans and widows.
fn fit_count(available: f64, heights: &[f64]) -> usize {
    let mut running = 0.0;
    heights
        .iter()
        .take_while(|h| {
            running += *h;
            running <= available + 1e-6
        })
        .count()
}

/// Scale natural column widths to fill `content_width`, keeping every column
/// at least `min_column` wide. Columns that would fall under the floor are
/// pinned to it and the rest share what is left in proportion.
fn fit_columns(natural: &[f64], content_width: f64, min_column: f64) -> Vec<f64> {
    let mut pinned = vec![false; natural.len()];
    loop {
        let pinned_total = pinned.iter().filter(|p| **p).count() as f64 * min_column;
        let free_natural: f64 = natural
            .iter()
            .zip(&pinned)
            .filter(|(_, p)| !**p)
            .map(|(w, _)| *w)
            .sum();
        if free_natural <= 0.0 {
            return vec![min_column; natural.len()];
        }
        let scale = (content_width - pinned_total) / free_natural;

        let mut changed = false;
        for (w, p) in natural.iter().zip(pinned.iter_mut()) {
            if !*p && w * scale < min_column {
                *p = true;
                changed = true;
            }
        }
        if !changed {
            return natural
                .iter()
                .zip(&pinned)
                .map(|(w, p)| if *p { min_column } else { w * scale })
                .collect();
        }
    }
}

/// Keep at most `max_lines` lines; a cut cell ends in an ellipsis.
fn clamp_lines(
    mut lines: Vec<String>,
    max_lines: usize,
    font: StandardFont,
    font_size: f64,
    max_width: f64,
) -> Vec<String> {
    if lines.len() <= max_lines {
        return lines;
    }
    lines.truncate(max_lines);
    if let Some(last) = lines.last_mut() {
        let mut text = last.trim_end().to_string();
        while !text.is_empty()
            && font.measure_string(&format!("{}\u{2026}", text), font_size) > max_width
        {
            text.pop();
        }
        text.push('\u{2026}');
        *last = text;
    }
    lines
}
