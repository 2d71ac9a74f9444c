//! Fonts for text layers.
//!
//! Outline fonts (TTF/OTF) are loaded with ab_glyph from the paths in the
//! render configuration. Without a configured regular face, text uses the
//! Spleen 12×24 bitmap font scaled to the requested size, so rendering never
//! depends on fonts installed on the host.
//!
//! Missing bold or italic faces are synthesized: bold by smearing coverage
//! horizontally, italic by shearing rows around the baseline.

use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};
use spleen_font::{FONT_12X24, PSF2Font};
use std::fmt;
use std::path::Path;

use super::{LINE_HEIGHT_FACTOR, TextMeasure};
use crate::config::FontPaths;
use crate::error::{CartelError, Result};
use crate::template::Color;

const BITMAP_CELL_WIDTH: usize = 12;
const BITMAP_CELL_HEIGHT: usize = 24;

/// Horizontal shear applied to synthesized italics.
const ITALIC_SHEAR: f64 = 0.2;

/// Font selection for a text layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontSpec {
    /// Font size in pixels.
    pub size: f64,
    pub bold: bool,
    pub italic: bool,
}

impl FontSpec {
    pub fn new(size: f64) -> Self {
        Self {
            size,
            bold: false,
            italic: false,
        }
    }

    pub fn bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }

    pub fn italic(mut self, italic: bool) -> Self {
        self.italic = italic;
        self
    }

    /// CSS-style font shorthand, e.g. `italic bold 24px sans-serif`.
    pub fn css(&self) -> String {
        let mut parts = Vec::new();
        if self.italic {
            parts.push("italic".to_string());
        }
        if self.bold {
            parts.push("bold".to_string());
        }
        parts.push(format!("{}px", self.size));
        parts.push("sans-serif".to_string());
        parts.join(" ")
    }

    /// Extra advance added by synthetic bold.
    fn bold_offset(&self) -> usize {
        ((self.size / 24.0).round() as usize).max(1)
    }
}

/// A rasterized line of text.
#[derive(Debug, Clone)]
pub struct LineRaster {
    /// Colored glyphs with coverage in the alpha channel.
    pub image: RgbaImage,
    /// X offset of the text origin inside `image` (room for italic overhang).
    pub origin_x: f64,
}

enum Face<'a> {
    Outline(&'a FontArc),
    Bitmap,
}

/// The set of faces available to text layers.
#[derive(Clone, Default)]
pub struct FontBook {
    regular: Option<FontArc>,
    bold: Option<FontArc>,
    italic: Option<FontArc>,
    bold_italic: Option<FontArc>,
}

impl fmt::Debug for FontBook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontBook")
            .field("regular", &self.regular.is_some())
            .field("bold", &self.bold.is_some())
            .field("italic", &self.italic.is_some())
            .field("bold_italic", &self.bold_italic.is_some())
            .finish()
    }
}

fn load_face(path: &Option<std::path::PathBuf>) -> Result<Option<FontArc>> {
    let Some(path) = path else {
        return Ok(None);
    };
    load_font_file(path).map(Some)
}

fn load_font_file(path: &Path) -> Result<FontArc> {
    let bytes = std::fs::read(path)
        .map_err(|e| CartelError::Font(format!("{}: {}", path.display(), e)))?;
    FontArc::try_from_vec(bytes)
        .map_err(|e| CartelError::Font(format!("{}: {}", path.display(), e)))
}

impl FontBook {
    /// Bitmap-only font book.
    pub fn bitmap() -> Self {
        Self::default()
    }

    /// Load the configured faces.
    pub fn from_paths(paths: &FontPaths) -> Result<Self> {
        Ok(Self {
            regular: load_face(&paths.regular)?,
            bold: load_face(&paths.bold)?,
            italic: load_face(&paths.italic)?,
            bold_italic: load_face(&paths.bold_italic)?,
        })
    }

    /// Whether any outline font is loaded.
    pub fn has_outline_fonts(&self) -> bool {
        self.regular.is_some()
    }

    /// Pick a face; returns the face plus whether bold/italic must be synthesized.
    fn face(&self, spec: &FontSpec) -> (Face<'_>, bool, bool) {
        let Some(regular) = &self.regular else {
            return (Face::Bitmap, spec.bold, spec.italic);
        };
        match (spec.bold, spec.italic) {
            (true, true) => match (&self.bold_italic, &self.bold, &self.italic) {
                (Some(f), _, _) => (Face::Outline(f), false, false),
                (None, Some(f), _) => (Face::Outline(f), false, true),
                (None, None, Some(f)) => (Face::Outline(f), true, false),
                (None, None, None) => (Face::Outline(regular), true, true),
            },
            (true, false) => match &self.bold {
                Some(f) => (Face::Outline(f), false, false),
                None => (Face::Outline(regular), true, false),
            },
            (false, true) => match &self.italic {
                Some(f) => (Face::Outline(f), false, false),
                None => (Face::Outline(regular), false, true),
            },
            (false, false) => (Face::Outline(regular), false, false),
        }
    }

    /// Rasterize one line of text in `color`.
    ///
    /// The image is `font.size * 1.2` tall with the text's vertical middle on
    /// the image's vertical center (a "middle" baseline). Empty text or a
    /// non-positive size gives `Ok(None)`; a raster above `max_pixels` is a
    /// [`CartelError::Canvas`] and nothing is allocated.
    pub fn rasterize_line(
        &self,
        text: &str,
        spec: &FontSpec,
        color: Color,
        max_pixels: u64,
    ) -> Result<Option<LineRaster>> {
        if text.is_empty() || !(spec.size > 0.0) || !spec.size.is_finite() {
            return Ok(None);
        }
        let (face, synth_bold, synth_italic) = self.face(spec);
        let advance = self.measure(text, spec);
        let height = (spec.size * LINE_HEIGHT_FACTOR).ceil().max(1.0);
        let shear = if synth_italic { ITALIC_SHEAR } else { 0.0 };
        let overhang = (shear * height / 2.0).ceil();
        let width = advance.ceil() + 2.0 * overhang + 1.0;
        let too_wide = width > u32::MAX as f64 || height > u32::MAX as f64;
        if too_wide || !(width * height <= max_pixels as f64) {
            return Err(CartelError::Canvas(format!(
                "Text raster {:.0}x{:.0} exceeds the limit of {} pixels",
                width, height, max_pixels
            )));
        }
        let (width, height) = (width as usize, height as usize);
        let origin_x = overhang;

        let mut coverage = Coverage::new(width, height);
        let middle = height as f64 / 2.0;
        match face {
            Face::Outline(font) => {
                draw_outline(font, text, spec.size, origin_x, middle, shear, &mut coverage)
            }
            Face::Bitmap => draw_bitmap(text, spec.size, origin_x, middle, shear, &mut coverage),
        }
        if synth_bold {
            coverage.embolden(spec.bold_offset());
        }

        let image = RgbaImage::from_fn(width as u32, height as u32, |x, y| {
            let c = coverage.get(x as usize, y as usize);
            Rgba([color.r, color.g, color.b, (color.a as f32 * c).round() as u8])
        });
        Ok(Some(LineRaster { image, origin_x }))
    }
}

impl TextMeasure for FontBook {
    fn measure(&self, text: &str, spec: &FontSpec) -> f64 {
        let (face, synth_bold, _) = self.face(spec);
        let base = match face {
            Face::Outline(font) => {
                let scaled = font.as_scaled(px_scale(font, spec.size));
                let mut width = 0.0f32;
                let mut prev = None;
                for ch in text.chars() {
                    let id = scaled.glyph_id(ch);
                    if let Some(p) = prev {
                        width += scaled.kern(p, id);
                    }
                    width += scaled.h_advance(id);
                    prev = Some(id);
                }
                width as f64
            }
            Face::Bitmap => text.chars().count() as f64 * spec.size * 0.5,
        };
        if synth_bold && !text.is_empty() {
            base + spec.bold_offset() as f64
        } else {
            base
        }
    }
}

/// Scale such that one em equals `size` pixels.
fn px_scale(font: &FontArc, size: f64) -> PxScale {
    let upem = font.units_per_em().unwrap_or(1000.0);
    PxScale::from(size as f32 * font.height_unscaled() / upem)
}

/// Anti-aliased coverage buffer, 0.0 (empty) to 1.0 (full).
struct Coverage {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl Coverage {
    fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width * height],
        }
    }

    fn add(&mut self, x: i64, y: i64, value: f32) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let idx = y as usize * self.width + x as usize;
        self.data[idx] = (self.data[idx] + value).min(1.0);
    }

    fn get(&self, x: usize, y: usize) -> f32 {
        self.data.get(y * self.width + x).copied().unwrap_or(0.0)
    }

    /// Smear coverage `offset` pixels to the right.
    fn embolden(&mut self, offset: usize) {
        let source = self.data.clone();
        for y in 0..self.height {
            let row = y * self.width;
            for x in 0..self.width {
                let mut value = source[row + x];
                for d in 1..=offset.min(x) {
                    value = value.max(source[row + x - d]);
                }
                self.data[row + x] = value;
            }
        }
    }
}

fn draw_outline(
    font: &FontArc,
    text: &str,
    size: f64,
    origin_x: f64,
    middle: f64,
    shear: f64,
    coverage: &mut Coverage,
) {
    let scale = px_scale(font, size);
    let scaled = font.as_scaled(scale);
    // Center the ascent..descent band on the middle line.
    let baseline = middle as f32 + (scaled.ascent() + scaled.descent()) / 2.0;

    let mut caret = origin_x as f32;
    let mut prev = None;
    for ch in text.chars() {
        let id = scaled.glyph_id(ch);
        if let Some(p) = prev {
            caret += scaled.kern(p, id);
        }
        let glyph = id.with_scale_and_position(scale, ab_glyph::point(caret, baseline));
        caret += scaled.h_advance(id);
        prev = Some(id);

        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|px, py, c| {
                let y = bounds.min.y + py as f32;
                let slant = shear as f32 * (baseline - y);
                let x = bounds.min.x + px as f32 + slant;
                coverage.add(x.round() as i64, y as i64, c);
            });
        }
    }
}

/// Outline box used for characters the bitmap font lacks.
fn draw_box(cell: &mut [bool]) {
    let (w, h) = (BITMAP_CELL_WIDTH, BITMAP_CELL_HEIGHT);
    for x in 1..w - 1 {
        cell[3 * w + x] = true;
        cell[(h - 4) * w + x] = true;
    }
    for y in 3..h - 3 {
        cell[y * w + 1] = true;
        cell[y * w + w - 2] = true;
    }
}

fn draw_bitmap(
    text: &str,
    size: f64,
    origin_x: f64,
    middle: f64,
    shear: f64,
    coverage: &mut Coverage,
) {
    let mut font = PSF2Font::new(FONT_12X24).ok();
    let scale = size / BITMAP_CELL_HEIGHT as f64;
    let cell_w = BITMAP_CELL_WIDTH as f64 * scale;
    let top = middle - size / 2.0;
    // Spleen cells put the baseline roughly 5 rows above the bottom.
    let baseline = top + 19.0 * scale;

    for (i, ch) in text.chars().enumerate() {
        let mut cell = vec![false; BITMAP_CELL_WIDTH * BITMAP_CELL_HEIGHT];
        let utf8_bytes = ch.to_string();
        let found = match font.as_mut() {
            Some(spleen) => match spleen.glyph_for_utf8(utf8_bytes.as_bytes()) {
                Some(spleen_glyph) => {
                    for (row_y, row) in spleen_glyph.enumerate() {
                        for (col_x, on) in row.enumerate() {
                            let idx = row_y * BITMAP_CELL_WIDTH + col_x;
                            if col_x < BITMAP_CELL_WIDTH && idx < cell.len() {
                                cell[idx] = on;
                            }
                        }
                    }
                    true
                }
                None => false,
            },
            None => false,
        };
        if !found && !ch.is_whitespace() {
            draw_box(&mut cell);
        }

        let left = origin_x + i as f64 * cell_w;
        let x0 = left.floor() as i64;
        let x1 = (left + cell_w).ceil() as i64;
        let y0 = top.floor() as i64;
        let y1 = (top + size).ceil() as i64;

        for py in y0..y1 {
            let gy = ((py as f64 + 0.5 - top) / scale).floor();
            if gy < 0.0 || gy >= BITMAP_CELL_HEIGHT as f64 {
                continue;
            }
            let slant = (shear * (baseline - (py as f64 + 0.5))).round() as i64;
            for px in x0..x1 {
                let gx = ((px as f64 + 0.5 - left) / scale).floor();
                if gx < 0.0 || gx >= BITMAP_CELL_WIDTH as f64 {
                    continue;
                }
                if cell[gy as usize * BITMAP_CELL_WIDTH + gx as usize] {
                    coverage.add(px + slant, py, 1.0);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inked(raster: &LineRaster) -> usize {
        raster.image.pixels().filter(|p| p[3] > 0).count()
    }

    #[test]
    fn test_css_string() {
        assert_eq!(FontSpec::new(20.0).css(), "20px sans-serif");
        assert_eq!(
            FontSpec::new(32.0).bold(true).italic(true).css(),
            "italic bold 32px sans-serif"
        );
    }

    #[test]
    fn test_bitmap_measure_is_half_em_per_char() {
        let book = FontBook::bitmap();
        assert_eq!(book.measure("abcd", &FontSpec::new(20.0)), 40.0);
        assert_eq!(book.measure("", &FontSpec::new(20.0)), 0.0);
        // synthetic bold widens by the smear offset
        assert_eq!(book.measure("abcd", &FontSpec::new(24.0).bold(true)), 49.0);
    }

    #[test]
    fn test_rasterize_bitmap_line() {
        let book = FontBook::bitmap();
        let raster = book
            .rasterize_line("Hello", &FontSpec::new(24.0), Color::BLACK, u64::MAX)
            .unwrap()
            .unwrap();
        assert_eq!(raster.image.height(), 29);
        assert!(raster.image.width() >= 60);
        assert!(inked(&raster) > 0);
        assert!(raster.image.pixels().all(|p| p[0] == 0 && p[1] == 0 && p[2] == 0));
    }

    #[test]
    fn test_rasterize_uses_color() {
        let book = FontBook::bitmap();
        let raster = book
            .rasterize_line("X", &FontSpec::new(48.0), Color::RED, u64::MAX)
            .unwrap()
            .unwrap();
        assert!(raster.image.pixels().any(|p| p[3] == 255 && p[0] == 255 && p[1] == 0));
    }

    #[test]
    fn test_bold_and_italic_change_ink() {
        let book = FontBook::bitmap();
        let line = |spec: FontSpec| {
            book.rasterize_line("Mile", &spec, Color::BLACK, u64::MAX)
                .unwrap()
                .unwrap()
        };
        let regular = line(FontSpec::new(24.0));
        let bold = line(FontSpec::new(24.0).bold(true));
        let italic = line(FontSpec::new(24.0).italic(true));
        assert!(inked(&bold) > inked(&regular));
        assert!(italic.origin_x > 0.0);
        assert_eq!(regular.origin_x, 0.0);
    }

    #[test]
    fn test_rasterize_rejects_empty() {
        let book = FontBook::bitmap();
        let black = Color::BLACK;
        assert!(book.rasterize_line("", &FontSpec::new(24.0), black, u64::MAX).unwrap().is_none());
        assert!(book.rasterize_line("a", &FontSpec::new(0.0), black, u64::MAX).unwrap().is_none());
    }

    #[test]
    fn test_rasterize_refuses_oversized_line() {
        let book = FontBook::bitmap();
        let err = book
            .rasterize_line("Corolla", &FontSpec::new(1e9), Color::BLACK, 64_000_000)
            .unwrap_err();
        assert!(matches!(err, CartelError::Canvas(_)));
        assert!(err.to_string().contains("exceeds the limit"), "{}", err);

        // the same line fits once the limit allows it
        let raster = book
            .rasterize_line("Corolla", &FontSpec::new(24.0), Color::BLACK, 64_000_000)
            .unwrap();
        assert!(raster.is_some());
    }

    #[test]
    fn test_missing_font_file() {
        let paths = FontPaths {
            regular: Some("/nonexistent/font.ttf".into()),
            ..Default::default()
        };
        let err = FontBook::from_paths(&paths).unwrap_err();
        assert!(matches!(err, CartelError::Font(_)));
    }

    #[test]
    fn test_default_paths_give_bitmap_book() {
        let book = FontBook::from_paths(&FontPaths::default()).unwrap();
        assert!(!book.has_outline_fonts());
    }
}
