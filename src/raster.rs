//! # Surface Rasterization
//!
//! The PDF export ends with a picture of the whole report surface, sliced
//! across pages. Producing that picture is the host's job (a browser, a
//! headless renderer, a screenshot service), so it sits behind the
//! [`Rasterizer`] trait. What comes back is always an opaque RGB bitmap:
//! transparent pixels are flattened onto the requested background before
//! the PDF writer ever sees them.
//!
//! Bundled implementations:
//! - [`CaptureFileRasterizer`] loads an existing capture (PNG or JPEG) from
//!   a file path, a `data:image/...;base64,` URI, or raw base64.
//! - [`NoCapture`] always reports [`RasterError::Unavailable`].
//! - Any `Fn(&ReportSurface, &RasterOptions) -> Result<RgbImage, RasterError>`
//!   closure.

use std::io::Cursor;
use std::path::Path;

use image::{Rgb, RgbImage};

use crate::error::RasterError;
use crate::extract::ReportSurface;
use crate::style::Color;

/// What the export asks of a rasterizer.
#[derive(Debug, Clone, Copy)]
pub struct RasterOptions {
    /// Oversampling factor relative to CSS pixels.
    pub scale: f64,
    /// Fill for anything transparent.
    pub background: Color,
    /// Capture the full scrollable extent, not just the viewport.
    pub full_extent: bool,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            scale: 2.0,
            background: Color::WHITE,
            full_extent: true,
        }
    }
}

/// Turns a report surface into a single bitmap.
pub trait Rasterizer {
    fn rasterize(
        &self,
        surface: &ReportSurface,
        options: &RasterOptions,
    ) -> Result<RgbImage, RasterError>;
}

impl<F> Rasterizer for F
where
    F: Fn(&ReportSurface, &RasterOptions) -> Result<RgbImage, RasterError>,
{
    fn rasterize(
        &self,
        surface: &ReportSurface,
        options: &RasterOptions,
    ) -> Result<RgbImage, RasterError> {
        self(surface, options)
    }
}

/// A rasterizer for exports that have no capture to offer.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCapture;

impl Rasterizer for NoCapture {
    fn rasterize(&self, _: &ReportSurface, _: &RasterOptions) -> Result<RgbImage, RasterError> {
        Err(RasterError::Unavailable)
    }
}

/// Uses a capture of the surface taken ahead of time.
#[derive(Debug, Clone)]
pub struct CaptureFileRasterizer {
    src: String,
}

impl CaptureFileRasterizer {
    /// `src` is a file path, a `data:image/...;base64,` URI, or raw base64.
    pub fn new(src: impl Into<String>) -> Self {
        Self { src: src.into() }
    }
}

impl Rasterizer for CaptureFileRasterizer {
    fn rasterize(
        &self,
        _surface: &ReportSurface,
        options: &RasterOptions,
    ) -> Result<RgbImage, RasterError> {
        let bytes = read_source_bytes(&self.src)?;
        let image = decode_capture(&bytes, options.background)?;
        tracing::debug!(
            width = image.width(),
            height = image.height(),
            requested_scale = options.scale,
            "loaded surface capture"
        );
        Ok(image)
    }
}

/// Resolve the source string to raw image bytes.
fn read_source_bytes(src: &str) -> Result<Vec<u8>, RasterError> {
    // Data URI: data:image/png;base64,iVBOR...
    if src.starts_with("data:image/") {
        let comma_pos = src
            .find(',')
            .ok_or_else(|| RasterError::Source("invalid data URI: missing comma".to_string()))?;
        return base64_decode(&src[comma_pos + 1..]);
    }

    // Explicit path prefixes, or any name that exists on disk. Base64 may
    // contain '/', so other strings are decoded.
    let explicit = src.starts_with('/') || src.starts_with("./") || src.starts_with("../");
    if explicit || Path::new(src).is_file() {
        return std::fs::read(src)
            .map_err(|e| RasterError::Source(format!("'{}': {}", src, e)));
    }

    base64_decode(src)
}

fn base64_decode(input: &str) -> Result<Vec<u8>, RasterError> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(input.trim())
        .map_err(|e| RasterError::Source(format!("base64 decode error: {}", e)))
}

/// Decode PNG or JPEG bytes into an opaque RGB bitmap over `background`.
pub fn decode_capture(data: &[u8], background: Color) -> Result<RgbImage, RasterError> {
    if !(is_png(data) || is_jpeg(data)) {
        return Err(RasterError::Decode(
            "unsupported image format (expected JPEG or PNG)".to_string(),
        ));
    }

    let decoded = image::io::Reader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| RasterError::Decode(e.to_string()))?
        .decode()
        .map_err(|e| RasterError::Decode(e.to_string()))?;

    if decoded.width() == 0 || decoded.height() == 0 {
        return Err(RasterError::Decode("capture has no pixels".to_string()));
    }

    Ok(flatten_onto(&decoded.to_rgba8(), background))
}

fn is_jpeg(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0xFF && data[1] == 0xD8
}

fn is_png(data: &[u8]) -> bool {
    data.len() >= 4 && data[0] == 0x89 && data[1] == 0x50 && data[2] == 0x4E && data[3] == 0x47
}

/// Alpha-composite every pixel onto a solid background.
fn flatten_onto(rgba: &image::RgbaImage, background: Color) -> RgbImage {
    let bg = [
        (background.r * 255.0).round() as f64,
        (background.g * 255.0).round() as f64,
        (background.b * 255.0).round() as f64,
    ];
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let p = rgba.get_pixel(x, y);
        let a = p[3] as f64 / 255.0;
        let mix = |c: u8, b: f64| (c as f64 * a + b * (1.0 - a)).round() as u8;
        Rgb([mix(p[0], bg[0]), mix(p[1], bg[1]), mix(p[2], bg[2])])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(img: &image::RgbaImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ColorType::Rgba8,
        )
        .unwrap();
        buf
    }

    #[test]
    fn test_is_png_and_jpeg() {
        assert!(is_png(&[0x89, 0x50, 0x4E, 0x47]));
        assert!(!is_png(&[0xFF, 0xD8, 0xFF, 0xE0]));
        assert!(is_jpeg(&[0xFF, 0xD8, 0xFF, 0xE0]));
        assert!(!is_jpeg(&[0xFF]));
    }

    #[test]
    fn test_transparent_pixel_becomes_white() {
        let mut img = image::RgbaImage::new(2, 1);
        img.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        img.put_pixel(1, 0, image::Rgba([0, 0, 0, 0]));

        let rgb = decode_capture(&png_bytes(&img), Color::WHITE).unwrap();
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([255, 0, 0]));
        assert_eq!(rgb.get_pixel(1, 0), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_bare_relative_path_read_from_disk() {
        let name = format!("capture-{}.png", std::process::id());
        let img = image::RgbaImage::from_pixel(3, 2, image::Rgba([30, 58, 95, 255]));
        std::fs::write(&name, png_bytes(&img)).unwrap();

        let result = CaptureFileRasterizer::new(name.as_str())
            .rasterize(&ReportSurface::empty(), &RasterOptions::default());
        std::fs::remove_file(&name).unwrap();

        let rgb = result.unwrap();
        assert_eq!(rgb.dimensions(), (3, 2));
        assert_eq!(rgb.get_pixel(2, 1), &Rgb([30, 58, 95]));
    }

    #[test]
    fn test_missing_bare_name_falls_back_to_base64() {
        let err = read_source_bytes("no-such-capture.png").unwrap_err();
        assert!(err.to_string().contains("base64"));
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let err = decode_capture(&[0, 1, 2, 3, 4], Color::WHITE).unwrap_err();
        assert!(matches!(err, RasterError::Decode(_)));
    }

    #[test]
    fn test_data_uri_capture() {
        use base64::Engine;
        let img = image::RgbaImage::from_pixel(3, 2, image::Rgba([0, 128, 0, 255]));
        let b64 = base64::engine::general_purpose::STANDARD.encode(png_bytes(&img));
        let rasterizer = CaptureFileRasterizer::new(format!("data:image/png;base64,{}", b64));

        let surface = ReportSurface::parse("<html></html>");
        let rgb = rasterizer.rasterize(&surface, &RasterOptions::default()).unwrap();
        assert_eq!((rgb.width(), rgb.height()), (3, 2));
    }

    #[test]
    fn test_missing_file_is_source_error() {
        let rasterizer = CaptureFileRasterizer::new("/definitely/not/here.png");
        let surface = ReportSurface::parse("<html></html>");
        let err = rasterizer.rasterize(&surface, &RasterOptions::default()).unwrap_err();
        assert!(matches!(err, RasterError::Source(_)));
    }

    #[test]
    fn test_no_capture_is_unavailable() {
        let surface = ReportSurface::parse("<html></html>");
        assert!(matches!(
            NoCapture.rasterize(&surface, &RasterOptions::default()),
            Err(RasterError::Unavailable)
        ));
    }
}
