//! # Report Styling
//!
//! Colors and the table look used by the PDF export. The report has one
//! visual style: a dark header band with white bold text and alternating
//! light row fills underneath.

use serde::{Deserialize, Serialize};

/// An RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64, // 0.0 - 1.0
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };

    pub fn hex(hex: &str) -> Self {
        let hex = hex.trim_start_matches('#');
        let (r, g, b) = match hex.len() {
            3 => {
                let r = u8::from_str_radix(&hex[0..1].repeat(2), 16).unwrap_or(0);
                let g = u8::from_str_radix(&hex[1..2].repeat(2), 16).unwrap_or(0);
                let b = u8::from_str_radix(&hex[2..3].repeat(2), 16).unwrap_or(0);
                (r, g, b)
            }
            6 => {
                let r = u8::from_str_radix(&hex[0..2], 16).unwrap_or(0);
                let g = u8::from_str_radix(&hex[2..4], 16).unwrap_or(0);
                let b = u8::from_str_radix(&hex[4..6], 16).unwrap_or(0);
                (r, g, b)
            }
            _ => (0, 0, 0),
        };
        Self {
            r: r as f64 / 255.0,
            g: g as f64 / 255.0,
            b: b as f64 / 255.0,
            a: 1.0,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

/// Visual parameters for a banded table.
#[derive(Debug, Clone, Copy)]
pub struct TableStyle {
    pub font_size: f64,
    pub header_background: Color,
    pub header_text: Color,
    pub body_text: Color,
    /// Fill for every other body row, starting with the second.
    pub band_background: Color,
    pub cell_padding_x: f64,
    pub cell_padding_y: f64,
    pub line_height: f64,
}

impl Default for TableStyle {
    fn default() -> Self {
        Self {
            font_size: 9.0,
            header_background: Color::hex("#1e3a5f"),
            header_text: Color::WHITE,
            body_text: Color::hex("#1f2937"),
            band_background: Color::hex("#f3f4f6"),
            cell_padding_x: 4.0,
            cell_padding_y: 3.0,
            line_height: 1.25,
        }
    }
}

impl TableStyle {
    /// Height of one line of cell text, in points.
    pub fn text_line_height(&self) -> f64 {
        self.font_size * self.line_height
    }

    /// Body row fill for the zero-based row index.
    pub fn band_for(&self, row_index: usize) -> Option<Color> {
        if row_index % 2 == 1 {
            Some(self.band_background)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_parsing() {
        let c = Color::hex("#ff0000");
        assert!((c.r - 1.0).abs() < 0.001);
        assert!(c.g.abs() < 0.001);
        let short = Color::hex("fff");
        assert_eq!(short, Color::WHITE);
    }

    #[test]
    fn test_bands_alternate() {
        let style = TableStyle::default();
        assert!(style.band_for(0).is_none());
        assert!(style.band_for(1).is_some());
        assert!(style.band_for(2).is_none());
    }
}
