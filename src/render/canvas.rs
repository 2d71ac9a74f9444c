//! RGBA drawing surface with a save/restore transform stack.
//!
//! The canvas mirrors the small subset of a 2D context the compositor needs:
//! `translate`, `rotate`, rectangular clips, image blits into a destination
//! rectangle, and solid rectangle fills. All drawing goes through the current
//! transform; every painted pixel is inverse-mapped into local space and
//! tested against the destination and every active clip.
//!
//! State changes are scoped with [`Canvas::save`], which hands back a guard
//! that restores the previous transform and clip set when dropped.

use image::{ImageFormat, Rgba, RgbaImage, imageops};
use kurbo::{Affine, Point, Rect};
use rayon::prelude::*;
use std::borrow::Cow;
use std::io::Cursor;
use std::ops::{Deref, DerefMut};

use crate::error::{CartelError, Result};
use crate::template::Color;

/// Sources bigger than this multiple of their on-canvas size are resized
/// before sampling; bilinear sampling alone would alias.
const DOWNSAMPLE_RATIO: f64 = 2.0;

/// A rectangular clip in the local space that was current when it was set.
#[derive(Debug, Clone, Copy)]
struct Clip {
    /// Canvas space → clip space.
    inverse: Affine,
    rect: Rect,
}

impl Clip {
    #[inline]
    fn contains(&self, device: Point) -> bool {
        self.rect.contains(self.inverse * device)
    }
}

#[derive(Debug, Clone)]
struct DrawState {
    transform: Affine,
    clips: Vec<Clip>,
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            transform: Affine::IDENTITY,
            clips: Vec::new(),
        }
    }
}

/// The drawing surface of one render.
#[derive(Debug)]
pub struct Canvas {
    pixels: RgbaImage,
    max_pixels: u64,
    state: DrawState,
    stack: Vec<DrawState>,
}

impl Canvas {
    /// Allocate a white canvas, refusing empty sizes and anything above
    /// `max_pixels`.
    pub fn new(width: u32, height: u32, max_pixels: u64) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(CartelError::Canvas(format!(
                "Invalid canvas size {}x{}",
                width, height
            )));
        }
        let area = width as u64 * height as u64;
        if area > max_pixels {
            return Err(CartelError::Canvas(format!(
                "Canvas {}x{} exceeds the limit of {} pixels",
                width, height, max_pixels
            )));
        }
        Ok(Self {
            pixels: RgbaImage::from_pixel(width, height, Color::WHITE.to_rgba()),
            max_pixels,
            state: DrawState::default(),
            stack: Vec::new(),
        })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Allocation limit this canvas was created with; it also bounds the
    /// intermediate rasters drawn onto it.
    #[inline]
    pub fn max_pixels(&self) -> u64 {
        self.max_pixels
    }

    /// Number of pixels on the canvas.
    #[inline]
    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    /// Current local → canvas transform.
    #[inline]
    pub fn transform(&self) -> Affine {
        self.state.transform
    }

    /// Number of saved states.
    #[inline]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn into_image(self) -> RgbaImage {
        self.pixels
    }

    /// Save the drawing state; it is restored when the guard drops.
    pub fn save(&mut self) -> CanvasGuard<'_> {
        self.stack.push(self.state.clone());
        CanvasGuard { canvas: self }
    }

    fn restore(&mut self) {
        if let Some(state) = self.stack.pop() {
            self.state = state;
        }
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.state.transform = self.state.transform * Affine::translate((dx, dy));
    }

    /// Rotate by `degrees`, clockwise on screen.
    pub fn rotate_degrees(&mut self, degrees: f64) {
        if degrees != 0.0 && degrees.is_finite() {
            self.state.transform = self.state.transform * Affine::rotate(degrees.to_radians());
        }
    }

    /// Intersect the clip region with `rect` in local space.
    pub fn clip_rect(&mut self, rect: Rect) {
        // A singular transform collapses the clip to nothing.
        let clip = match invert(self.state.transform) {
            Some(inverse) => Clip { inverse, rect },
            None => Clip {
                inverse: Affine::IDENTITY,
                rect: Rect::ZERO,
            },
        };
        self.state.clips.push(clip);
    }

    /// Draw `image` stretched into `dest` (local space).
    pub fn draw_image(&mut self, image: &RgbaImage, dest: Rect) {
        if image.width() == 0 || image.height() == 0 || !is_drawable(dest) {
            return;
        }
        let scale = self.state.transform.determinant().abs().sqrt();
        let source = downsample(image, dest.width() * scale, dest.height() * scale);
        let (sw, sh) = (source.width() as f64, source.height() as f64);
        let source = source.as_ref();

        self.paint(dest, |local| {
            let u = (local.x - dest.x0) / dest.width() * sw - 0.5;
            let v = (local.y - dest.y0) / dest.height() * sh - 0.5;
            sample_bilinear(source, u, v)
        });
    }

    /// Fill `rect` (local space) with a solid color.
    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        if !is_drawable(rect) || color.a == 0 {
            return;
        }
        let premultiplied = premultiply(color.to_rgba());
        self.paint(rect, |_| premultiplied);
    }

    /// Paint every pixel whose center maps into `dest`, using `shade` to get
    /// the premultiplied source color at a local-space point.
    fn paint<F>(&mut self, dest: Rect, shade: F)
    where
        F: Fn(Point) -> [f32; 4] + Sync,
    {
        let transform = self.state.transform;
        let Some(inverse) = invert(transform) else {
            return;
        };
        let bounds = transform
            .transform_rect_bbox(dest)
            .intersect(Rect::new(0.0, 0.0, self.width() as f64, self.height() as f64));
        if bounds.width() <= 0.0 || bounds.height() <= 0.0 {
            return;
        }

        let x0 = bounds.x0.floor().max(0.0) as usize;
        let x1 = (bounds.x1.ceil() as usize).min(self.width() as usize);
        let y0 = bounds.y0.floor().max(0.0) as usize;
        let y1 = (bounds.y1.ceil() as usize).min(self.height() as usize);
        let stride = self.width() as usize * 4;
        let clips = &self.state.clips;

        let data: &mut [u8] = &mut self.pixels;
        data[y0 * stride..y1 * stride]
            .par_chunks_mut(stride)
            .enumerate()
            .for_each(|(row, line)| {
                let y = (y0 + row) as f64 + 0.5;
                for x in x0..x1 {
                    let device = Point::new(x as f64 + 0.5, y);
                    let local = inverse * device;
                    if !dest.contains(local) || !clips.iter().all(|c| c.contains(device)) {
                        continue;
                    }
                    let src = shade(local);
                    if src[3] <= 0.0 {
                        continue;
                    }
                    blend_over(&mut line[x * 4..x * 4 + 4], src);
                }
            });
    }

    /// Encode the canvas as PNG.
    pub fn encode_png(&self) -> Result<Vec<u8>> {
        encode_png(&self.pixels)
    }
}

/// Encode an RGBA image as PNG.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| CartelError::Image(format!("PNG encoding failed: {}", e)))?;
    Ok(bytes)
}

/// Scoped drawing state; restores the canvas on drop.
pub struct CanvasGuard<'a> {
    canvas: &'a mut Canvas,
}

impl Deref for CanvasGuard<'_> {
    type Target = Canvas;

    fn deref(&self) -> &Canvas {
        self.canvas
    }
}

impl DerefMut for CanvasGuard<'_> {
    fn deref_mut(&mut self) -> &mut Canvas {
        self.canvas
    }
}

impl Drop for CanvasGuard<'_> {
    fn drop(&mut self) {
        self.canvas.restore();
    }
}

fn invert(transform: Affine) -> Option<Affine> {
    let det = transform.determinant();
    if det == 0.0 || !det.is_finite() {
        None
    } else {
        Some(transform.inverse())
    }
}

fn is_drawable(rect: Rect) -> bool {
    rect.width() > 0.0
        && rect.height() > 0.0
        && rect.x0.is_finite()
        && rect.y0.is_finite()
        && rect.x1.is_finite()
        && rect.y1.is_finite()
}

fn downsample(image: &RgbaImage, target_w: f64, target_h: f64) -> Cow<'_, RgbaImage> {
    let (w, h) = (image.width() as f64, image.height() as f64);
    if w <= target_w * DOWNSAMPLE_RATIO || h <= target_h * DOWNSAMPLE_RATIO {
        return Cow::Borrowed(image);
    }
    let nw = target_w.ceil().max(1.0) as u32;
    let nh = target_h.ceil().max(1.0) as u32;
    Cow::Owned(imageops::resize(image, nw, nh, imageops::FilterType::Triangle))
}

#[inline]
fn premultiply(px: Rgba<u8>) -> [f32; 4] {
    let a = px[3] as f32 / 255.0;
    [
        px[0] as f32 / 255.0 * a,
        px[1] as f32 / 255.0 * a,
        px[2] as f32 / 255.0 * a,
        a,
    ]
}

/// Premultiplied bilinear sample with clamp-to-edge addressing.
fn sample_bilinear(image: &RgbaImage, u: f64, v: f64) -> [f32; 4] {
    let max_x = image.width() as i64 - 1;
    let max_y = image.height() as i64 - 1;
    let fx = u.floor();
    let fy = v.floor();
    let tx = (u - fx) as f32;
    let ty = (v - fy) as f32;
    let x0 = (fx as i64).clamp(0, max_x) as u32;
    let y0 = (fy as i64).clamp(0, max_y) as u32;
    let x1 = (fx as i64 + 1).clamp(0, max_x) as u32;
    let y1 = (fy as i64 + 1).clamp(0, max_y) as u32;

    let p00 = premultiply(*image.get_pixel(x0, y0));
    let p10 = premultiply(*image.get_pixel(x1, y0));
    let p01 = premultiply(*image.get_pixel(x0, y1));
    let p11 = premultiply(*image.get_pixel(x1, y1));

    let mut out = [0.0f32; 4];
    for i in 0..4 {
        let top = p00[i] + (p10[i] - p00[i]) * tx;
        let bottom = p01[i] + (p11[i] - p01[i]) * tx;
        out[i] = top + (bottom - top) * ty;
    }
    out
}

/// Source-over blend of a premultiplied color onto a straight-alpha pixel.
#[inline]
fn blend_over(dst: &mut [u8], src: [f32; 4]) {
    let da = dst[3] as f32 / 255.0;
    let inv = 1.0 - src[3];
    let out_a = src[3] + da * inv;
    if out_a <= 0.0 {
        dst.copy_from_slice(&[0, 0, 0, 0]);
        return;
    }
    for i in 0..3 {
        let dc = dst[i] as f32 / 255.0 * da;
        let c = (src[i] + dc * inv) / out_a;
        dst[i] = (c * 255.0).round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}
