//! Placeholder images for image layers whose picture is unavailable.

use image::{Rgba, RgbaImage, imageops};

use crate::template::Color;
use crate::text::{FontBook, FontSpec};

/// Light-gray placeholder fill.
pub const PLACEHOLDER_FILL: Rgba<u8> = Rgba([224, 224, 224, 255]);

/// Dark-gray placeholder label color.
pub const PLACEHOLDER_LABEL: Color = Color::rgb(102, 102, 102);

/// A flat light-gray image with `label` centered in dark-gray text.
///
/// Sizes round up to whole pixels and are never smaller than 1×1. Boxes
/// larger than `max_pixels` are rendered at a reduced resolution with the
/// same aspect ratio; callers scale the result to the box anyway.
pub fn placeholder(
    width: f64,
    height: f64,
    label: &str,
    fonts: &FontBook,
    max_pixels: u64,
) -> RgbaImage {
    let (w, h) = raster_size(width, height, max_pixels);
    let mut image = RgbaImage::from_pixel(w, h, PLACEHOLDER_FILL);

    let size = (w.min(h) as f64 / 8.0).clamp(12.0, 48.0);
    let spec = FontSpec::new(size);
    if let Ok(Some(line)) = fonts.rasterize_line(label, &spec, PLACEHOLDER_LABEL, max_pixels) {
        let x = (w as i64 - line.image.width() as i64) / 2;
        let y = (h as i64 - line.image.height() as i64) / 2;
        imageops::overlay(&mut image, &line.image, x, y);
    }
    image
}

/// Whole-pixel raster size for a `width` × `height` box within `max_pixels`.
fn raster_size(width: f64, height: f64, max_pixels: u64) -> (u32, u32) {
    let budget = (max_pixels.max(1) as f64).min(u32::MAX as f64);
    let w = clean(width);
    let h = clean(height);
    let scale = if w * h > budget { (budget / (w * h)).sqrt() } else { 1.0 };
    let w = (w * scale).round().clamp(1.0, budget);
    let h = (h * scale).round().clamp(1.0, (budget / w).floor().max(1.0));
    (w as u32, h as u32)
}

fn clean(extent: f64) -> f64 {
    if extent.is_finite() { extent.ceil().max(1.0) } else { 1.0 }
}
