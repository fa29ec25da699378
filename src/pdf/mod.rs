//! # PDF Serializer
//!
//! Takes the laid-out report pages and writes a valid PDF file.
//!
//! This is a from-scratch PDF 1.7 writer. The report needs a small subset:
//! two standard Type1 fonts, filled rectangles, text, and RGB image
//! XObjects for the surface capture strips.
//!
//! ## PDF Structure (simplified)
//!
//! ```text
//! %PDF-1.7            <- header
//! 1 0 obj ... endobj  <- objects (fonts, pages, content streams, images)
//! 2 0 obj ... endobj
//! ...
//! xref                <- cross-reference table (byte offsets of each object)
//! trailer             <- points to the root object
//! %%EOF
//! ```

use std::fmt::Write as FmtWrite; // for write! on String
use std::io::Write as IoWrite; // for write! on Vec<u8>

use image::RgbImage;
use miniz_oxide::deflate::compress_to_vec_zlib;

use crate::font::StandardFont;
use crate::layout::{DrawCommand, LayoutElement, LayoutPage};
use crate::model::Metadata;

pub struct PdfWriter;

/// Tracks allocated PDF objects during writing.
struct PdfBuilder {
    objects: Vec<PdfObject>,
    /// Font object ids, in `StandardFont::ALL` order.
    font_objects: Vec<(StandardFont, usize)>,
}

struct PdfObject {
    data: Vec<u8>,
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfWriter {
    pub fn new() -> Self {
        Self
    }

    /// Write laid-out pages to a PDF byte vector.
    pub fn write(&self, pages: &[LayoutPage], metadata: &Metadata) -> Vec<u8> {
        let mut builder = PdfBuilder {
            objects: Vec::new(),
            font_objects: Vec::new(),
        };

        // Reserve object IDs:
        // 0 = placeholder (PDF objects are 1-indexed)
        // 1 = Catalog
        // 2 = Pages (page tree root)
        // 3+ = fonts, then per page: images, content stream, page object
        builder.objects.push(PdfObject { data: vec![] });
        builder.objects.push(PdfObject { data: vec![] });
        builder.objects.push(PdfObject { data: vec![] });

        self.register_fonts(&mut builder);

        let mut page_obj_ids: Vec<usize> = Vec::new();

        for page in pages {
            let image_ids = self.register_page_images(&mut builder, page);
            let content = self.build_content_stream(page);
            let compressed = compress_to_vec_zlib(content.as_bytes(), 6);

            let content_obj_id = builder.objects.len();
            let mut content_data: Vec<u8> = Vec::new();
            let _ = write!(
                content_data,
                "<< /Length {} /Filter /FlateDecode >>\nstream\n",
                compressed.len()
            );
            content_data.extend_from_slice(&compressed);
            content_data.extend_from_slice(b"\nendstream");
            builder.objects.push(PdfObject { data: content_data });

            let page_obj_id = builder.objects.len();
            let font_resources = self.build_font_resource_dict(&builder.font_objects);
            let resources = if image_ids.is_empty() {
                format!("/Font << {} >>", font_resources)
            } else {
                let xobjects = image_ids
                    .iter()
                    .enumerate()
                    .map(|(i, id)| format!("/Im{} {} 0 R", i, id))
                    .collect::<Vec<_>>()
                    .join(" ");
                format!("/Font << {} >> /XObject << {} >>", font_resources, xobjects)
            };
            let page_dict = format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                 /Contents {} 0 R /Resources << {} >> >>",
                page.width, page.height, content_obj_id, resources
            );
            builder.objects.push(PdfObject {
                data: page_dict.into_bytes(),
            });
            page_obj_ids.push(page_obj_id);
        }

        // Write Catalog (object 1)
        builder.objects[1].data = b"<< /Type /Catalog /Pages 2 0 R >>".to_vec();

        // Write Pages tree (object 2)
        let kids: String = page_obj_ids
            .iter()
            .map(|id| format!("{} 0 R", id))
            .collect::<Vec<_>>()
            .join(" ");
        builder.objects[2].data = format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids,
            page_obj_ids.len()
        )
        .into_bytes();

        let info_obj_id = {
            let id = builder.objects.len();
            let mut info = String::from("<< ");
            if let Some(ref title) = metadata.title {
                let _ = write!(info, "/Title {} ", Self::info_string(title));
            }
            if let Some(ref date) = metadata.creation_date {
                let _ = write!(info, "/CreationDate {} ", Self::info_string(date));
            }
            let _ = write!(info, "/Producer (pq-report) /Creator (PQ Dashboard) >>");
            builder.objects.push(PdfObject {
                data: info.into_bytes(),
            });
            id
        };

        self.serialize(&builder, info_obj_id)
    }

    /// Build the PDF content stream for a single page.
    fn build_content_stream(&self, page: &LayoutPage) -> String {
        let mut stream = String::new();
        let mut image_counter = 0usize;

        for element in &page.elements {
            self.write_element(&mut stream, element, page.height, &mut image_counter);
        }

        stream
    }

    /// Write a single layout element as PDF operators.
    fn write_element(
        &self,
        stream: &mut String,
        element: &LayoutElement,
        page_height: f64,
        image_counter: &mut usize,
    ) {
        match &element.draw {
            DrawCommand::Rect { background } => {
                let y = page_height - element.y - element.height;
                let _ = write!(
                    stream,
                    "q\n{:.3} {:.3} {:.3} rg\n{:.2} {:.2} {:.2} {:.2} re\nf\nQ\n",
                    background.r, background.g, background.b,
                    element.x, y, element.width, element.height
                );
            }

            DrawCommand::Text {
                lines,
                font,
                font_size,
                color,
            } => {
                let _ = write!(
                    stream,
                    "BT\n{:.3} {:.3} {:.3} rg\n/{} {:.1} Tf\n",
                    color.r,
                    color.g,
                    color.b,
                    font.resource_name(),
                    font_size
                );
                for line in lines {
                    let pdf_y = page_height - line.y;
                    let _ = write!(
                        stream,
                        "1 0 0 1 {:.2} {:.2} Tm\n({}) Tj\n",
                        line.x,
                        pdf_y,
                        Self::encode_text(&line.text)
                    );
                }
                let _ = write!(stream, "ET\n");
            }

            DrawCommand::Image { .. } => {
                let y = page_height - element.y - element.height;
                let _ = write!(
                    stream,
                    "q\n{:.4} 0 0 {:.4} {:.2} {:.2} cm\n/Im{} Do\nQ\n",
                    element.width, element.height, element.x, y, image_counter
                );
                *image_counter += 1;
            }
        }
    }

    fn register_fonts(&self, builder: &mut PdfBuilder) {
        for font in StandardFont::ALL {
            let obj_id = builder.objects.len();
            let font_dict = format!(
                "<< /Type /Font /Subtype /Type1 /BaseFont /{} \
                 /Encoding /WinAnsiEncoding >>",
                font.pdf_name()
            );
            builder.objects.push(PdfObject {
                data: font_dict.into_bytes(),
            });
            builder.font_objects.push((font, obj_id));
        }
    }

    fn build_font_resource_dict(&self, font_objects: &[(StandardFont, usize)]) -> String {
        font_objects
            .iter()
            .map(|(font, obj_id)| format!("/{} {} 0 R", font.resource_name(), obj_id))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Write every image on the page as an XObject, in drawing order.
    /// The returned ids line up with `/Im0`, `/Im1`, ... in the content stream.
    fn register_page_images(&self, builder: &mut PdfBuilder, page: &LayoutPage) -> Vec<usize> {
        page.elements
            .iter()
            .filter_map(|el| match &el.draw {
                DrawCommand::Image { image } => Some(image),
                _ => None,
            })
            .map(|image| Self::write_image_xobject(builder, image))
            .collect()
    }

    /// Write an RGB bitmap as a Flate-compressed image XObject.
    fn write_image_xobject(builder: &mut PdfBuilder, image: &RgbImage) -> usize {
        let compressed = compress_to_vec_zlib(image.as_raw(), 6);
        let obj_id = builder.objects.len();
        let mut obj_data: Vec<u8> = Vec::new();
        let _ = write!(
            obj_data,
            "<< /Type /XObject /Subtype /Image \
             /Width {} /Height {} \
             /ColorSpace /DeviceRGB \
             /BitsPerComponent 8 \
             /Filter /FlateDecode \
             /Length {} >>\nstream\n",
            image.width(),
            image.height(),
            compressed.len()
        );
        obj_data.extend_from_slice(&compressed);
        obj_data.extend_from_slice(b"\nendstream");
        builder.objects.push(PdfObject { data: obj_data });
        obj_id
    }

    /// Encode text for a literal string under WinAnsiEncoding.
    ///
    /// Delimiters are escaped, bytes outside printable ASCII become octal
    /// escapes, and characters WinAnsi can't represent become `?`.
    fn encode_text(s: &str) -> String {
        let mut out = String::with_capacity(s.len());
        for ch in s.chars() {
            match ch {
                '\\' => out.push_str("\\\\"),
                '(' => out.push_str("\\("),
                ')' => out.push_str("\\)"),
                _ => match Self::unicode_to_winansi(ch) {
                    Some(b) if (0x20..=0x7E).contains(&b) => out.push(b as char),
                    Some(b) => {
                        let _ = write!(out, "\\{:03o}", b);
                    }
                    None => out.push('?'),
                },
            }
        }
        out
    }

    /// Encode a document-information string.
    ///
    /// Info strings are text strings, not content-stream strings: they are
    /// read as PDFDocEncoding, which disagrees with WinAnsi above 0x7F. Plain
    /// ASCII stays a literal; anything else is written as UTF-16BE with a BOM.
    fn info_string(s: &str) -> String {
        if s.chars().all(|c| (' '..='~').contains(&c)) {
            let escaped = s
                .replace('\\', "\\\\")
                .replace('(', "\\(")
                .replace(')', "\\)");
            return format!("({})", escaped);
        }
        let mut hex = String::from("<FEFF");
        for unit in s.encode_utf16() {
            let _ = write!(hex, "{:04X}", unit);
        }
        hex.push('>');
        hex
    }

    /// Map a Unicode codepoint to a WinAnsiEncoding byte value.
    ///
    /// WinAnsiEncoding is based on Windows-1252. Most codepoints in
    /// 0x20..=0x7E and 0xA0..=0xFF map directly. The 0x80..=0x9F range
    /// contains special mappings for smart quotes, bullets, dashes, etc.
    fn unicode_to_winansi(ch: char) -> Option<u8> {
        let cp = ch as u32;
        if (0x20..=0x7E).contains(&cp) || (0xA0..=0xFF).contains(&cp) {
            return Some(cp as u8);
        }
        match cp {
            0x20AC => Some(0x80), // Euro sign
            0x201A => Some(0x82), // Single low-9 quotation mark
            0x0192 => Some(0x83), // Latin small letter f with hook
            0x201E => Some(0x84), // Double low-9 quotation mark
            0x2026 => Some(0x85), // Horizontal ellipsis
            0x2020 => Some(0x86), // Dagger
            0x2021 => Some(0x87), // Double dagger
            0x02C6 => Some(0x88), // Modifier letter circumflex accent
            0x2030 => Some(0x89), // Per mille sign
            0x0160 => Some(0x8A), // Latin capital letter S with caron
            0x2039 => Some(0x8B), // Single left-pointing angle quotation
            0x0152 => Some(0x8C), // Latin capital ligature OE
            0x017D => Some(0x8E), // Latin capital letter Z with caron
            0x2018 => Some(0x91), // Left single quotation mark
            0x2019 => Some(0x92), // Right single quotation mark
            0x201C => Some(0x93), // Left double quotation mark
            0x201D => Some(0x94), // Right double quotation mark
            0x2022 => Some(0x95), // Bullet
            0x2013 => Some(0x96), // En dash
            0x2014 => Some(0x97), // Em dash
            0x02DC => Some(0x98), // Small tilde
            0x2122 => Some(0x99), // Trade mark sign
            0x0161 => Some(0x9A), // Latin small letter s with caron
            0x203A => Some(0x9B), // Single right-pointing angle quotation
            0x0153 => Some(0x9C), // Latin small ligature oe
            0x017E => Some(0x9E), // Latin small letter z with caron
            0x0178 => Some(0x9F), // Latin capital letter Y with diaeresis
            _ => None,
        }
    }

    /// Serialize all objects into the final PDF byte stream.
    fn serialize(&self, builder: &PdfBuilder, info_obj_id: usize) -> Vec<u8> {
        let mut output: Vec<u8> = Vec::new();
        let mut offsets: Vec<usize> = vec![0; builder.objects.len()];

        // Header
        output.extend_from_slice(b"%PDF-1.7\n");
        output.extend_from_slice(b"%\xe2\xe3\xcf\xd3\n");

        for (i, obj) in builder.objects.iter().enumerate().skip(1) {
            offsets[i] = output.len();
            let header = format!("{} 0 obj\n", i);
            output.extend_from_slice(header.as_bytes());
            output.extend_from_slice(&obj.data);
            output.extend_from_slice(b"\nendobj\n\n");
        }

        let xref_offset = output.len();
        let _ = write!(output, "xref\n0 {}\n", builder.objects.len());
        let _ = write!(output, "0000000000 65535 f \n");
        for offset in offsets.iter().skip(1) {
            let _ = write!(output, "{:010} 00000 n \n", offset);
        }

        let _ = write!(
            output,
            "trailer\n<< /Size {} /Root 1 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            builder.objects.len(),
            info_obj_id,
            xref_offset
        );

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::TextLine;
    use crate::style::Color;

    fn a4(elements: Vec<LayoutElement>) -> LayoutPage {
        LayoutPage {
            width: 595.28,
            height: 841.89,
            elements,
        }
    }

    fn text_element(text: &str, font: StandardFont) -> LayoutElement {
        LayoutElement {
            x: 40.0,
            y: 40.0,
            width: 100.0,
            height: 14.0,
            draw: DrawCommand::Text {
                lines: vec![TextLine {
                    x: 40.0,
                    y: 52.0,
                    text: text.to_string(),
                }],
                font,
                font_size: 10.0,
                color: Color::BLACK,
            },
        }
    }

    #[test]
    fn test_encode_text_escapes() {
        assert_eq!(PdfWriter::encode_text("Hello (World)"), "Hello \\(World\\)");
        assert_eq!(PdfWriter::encode_text("back\\slash"), "back\\\\slash");
    }

    #[test]
    fn test_encode_text_winansi() {
        // Bullet is 0x95 in WinAnsi, e-acute is 0xE9.
        assert_eq!(PdfWriter::encode_text("\u{2022} caf\u{e9}"), "\\225 caf\\351");
        assert_eq!(PdfWriter::encode_text("\u{4e2d}"), "?");
    }

    #[test]
    fn test_empty_document_produces_valid_pdf() {
        let bytes = PdfWriter::new().write(&[a4(vec![])], &Metadata::default());

        assert!(bytes.starts_with(b"%PDF-1.7"));
        assert!(bytes.windows(5).any(|w| w == b"%%EOF"));
        assert!(bytes.windows(4).any(|w| w == b"xref"));
        assert!(bytes.windows(7).any(|w| w == b"trailer"));
    }

    #[test]
    fn test_metadata_in_pdf() {
        let metadata = Metadata {
            title: Some("PQ Dashboard Report".to_string()),
            creation_date: Some("D:20261016120000".to_string()),
        };
        let bytes = PdfWriter::new().write(&[a4(vec![])], &metadata);
        let text = String::from_utf8_lossy(&bytes);

        assert!(text.contains("/Title (PQ Dashboard Report)"));
        assert!(text.contains("/CreationDate (D:20261016120000)"));
    }

    #[test]
    fn test_info_string_ascii_literal() {
        assert_eq!(PdfWriter::info_string("Line (3) Report"), "(Line \\(3\\) Report)");
    }

    #[test]
    fn test_info_string_non_ascii_is_utf16() {
        // Bullet U+2022 must not become WinAnsi 0x95 in the Info dictionary.
        assert_eq!(PdfWriter::info_string("\u{2022} Caf\u{e9}"), "<FEFF2022002000430061006600E9>");

        let metadata = Metadata {
            title: Some("R\u{e9}sum\u{e9}".to_string()),
            ..Default::default()
        };
        let bytes = PdfWriter::new().write(&[a4(vec![])], &metadata);
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/Title <FEFF005200E900730075006D00E9>"));
    }

    #[test]
    fn test_both_fonts_registered() {
        let pages = vec![a4(vec![
            text_element("Metric", StandardFont::HelveticaBold),
            text_element("Quality Rate", StandardFont::Helvetica),
        ])];
        let bytes = PdfWriter::new().write(&pages, &Metadata::default());
        let text = String::from_utf8_lossy(&bytes);

        assert!(text.contains("/BaseFont /Helvetica "));
        assert!(text.contains("/BaseFont /Helvetica-Bold"));
    }

    #[test]
    fn test_page_count_matches() {
        let pages = vec![a4(vec![]), a4(vec![]), a4(vec![])];
        let bytes = PdfWriter::new().write(&pages, &Metadata::default());
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/Count 3"));
    }

    #[test]
    fn test_image_xobject_written_per_page() {
        let strip = RgbImage::from_pixel(4, 2, image::Rgb([10, 20, 30]));
        let image_el = LayoutElement {
            x: 40.0,
            y: 40.0,
            width: 515.28,
            height: 257.64,
            draw: DrawCommand::Image { image: strip },
        };
        let pages = vec![a4(vec![image_el.clone()]), a4(vec![image_el])];
        let bytes = PdfWriter::new().write(&pages, &Metadata::default());
        let text = String::from_utf8_lossy(&bytes);

        assert_eq!(text.matches("/Subtype /Image").count(), 2);
        assert!(text.contains("/Width 4 /Height 2"));
        assert!(text.contains("/XObject << /Im0"));
    }
}
