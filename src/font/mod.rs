//! # Font Metrics
//!
//! The report only uses the standard PDF Helvetica faces, which need no
//! embedding. Widths come from the Adobe AFM files (units per 1000 em) and
//! are used to wrap table cells before the PDF writer sees them.

/// The standard PDF fonts the report draws with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
}

impl StandardFont {
    pub const ALL: [StandardFont; 2] = [StandardFont::Helvetica, StandardFont::HelveticaBold];

    /// The PDF name for this font.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
        }
    }

    /// Resource name used inside content streams (`/F0`, `/F1`).
    pub fn resource_name(&self) -> &'static str {
        match self {
            Self::Helvetica => "F0",
            Self::HelveticaBold => "F1",
        }
    }

    /// Get the advance width of a single character in points.
    pub fn char_width(&self, ch: char, font_size: f64) -> f64 {
        let table = match self {
            Self::Helvetica => &HELVETICA_WIDTHS,
            Self::HelveticaBold => &HELVETICA_BOLD_WIDTHS,
        };
        let code = ch as u32;
        let units = if (32..=126).contains(&code) {
            table[(code - 32) as usize]
        } else {
            DEFAULT_WIDTH
        };
        units as f64 / 1000.0 * font_size
    }

    /// Measure the width of a string in points.
    pub fn measure_string(&self, text: &str, font_size: f64) -> f64 {
        text.chars().map(|ch| self.char_width(ch, font_size)).sum()
    }
}

const DEFAULT_WIDTH: u16 = 556;

// ASCII 32..=126
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Break `text` into lines no wider than `max_width` points.
///
/// Breaks at spaces where possible; a single word wider than the column is
/// broken between characters. Never returns an empty vector.
pub fn wrap_text(text: &str, font: StandardFont, font_size: f64, max_width: f64) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_width = 0.0;
    let space_width = font.char_width(' ', font_size);

    for word in text.split_whitespace() {
        let word_width = font.measure_string(word, font_size);
        let needed = if current.is_empty() {
            word_width
        } else {
            current_width + space_width + word_width
        };

        if needed <= max_width {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
            current_width = needed;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
            current_width = 0.0;
        }

        if word_width <= max_width {
            current.push_str(word);
            current_width = word_width;
            continue;
        }

        // Word wider than the column: hard-break it.
        for ch in word.chars() {
            let w = font.char_width(ch, font_size);
            if current_width + w > max_width && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current_width = 0.0;
            }
            current.push(ch);
            current_width += w;
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helvetica_space_width() {
        let w = StandardFont::Helvetica.char_width(' ', 12.0);
        assert!((w - 3.336).abs() < 0.001);
    }

    #[test]
    fn test_bold_wider() {
        let regular = StandardFont::Helvetica.measure_string("Quality", 12.0);
        let bold = StandardFont::HelveticaBold.measure_string("Quality", 12.0);
        assert!(bold > regular, "Bold should be wider than regular");
    }

    #[test]
    fn test_wrap_fits_on_one_line() {
        let lines = wrap_text("Line A", StandardFont::Helvetica, 9.0, 200.0);
        assert_eq!(lines, vec!["Line A".to_string()]);
    }

    #[test]
    fn test_wrap_breaks_at_spaces() {
        let lines = wrap_text(
            "Casting Polishing Setting Plating",
            StandardFont::Helvetica,
            10.0,
            60.0,
        );
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(StandardFont::Helvetica.measure_string(line, 10.0) <= 60.0);
        }
    }

    #[test]
    fn test_wrap_hard_breaks_long_word() {
        let lines = wrap_text("WWWWWWWWWWWWWWWW", StandardFont::Helvetica, 10.0, 30.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), "WWWWWWWWWWWWWWWW");
    }

    #[test]
    fn test_wrap_empty_text() {
        assert_eq!(wrap_text("   ", StandardFont::Helvetica, 10.0, 30.0), vec![String::new()]);
    }
}
