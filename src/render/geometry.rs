//! Fit math for placing images in boxes.
//!
//! | Fit | Scale | Result |
//! |-----|-------|--------|
//! | cover | `max(bw/iw, bh/ih)` | fills the box, overflow cropped |
//! | contain | `min(bw/iw, bh/ih)` | whole image visible, letterboxed |
//!
//! Both preserve the image's aspect ratio.

use kurbo::{Point, Rect, Size};

fn fit_scale(image: Size, bounds: Size, cover: bool) -> Option<f64> {
    if !(image.width > 0.0 && image.height > 0.0) {
        return None;
    }
    let sx = bounds.width / image.width;
    let sy = bounds.height / image.height;
    let scale = if cover { sx.max(sy) } else { sx.min(sy) };
    (scale.is_finite() && scale > 0.0).then_some(scale)
}

/// Size of `image` scaled to cover `bounds`.
pub fn cover_size(image: Size, bounds: Size) -> Option<Size> {
    fit_scale(image, bounds, true).map(|s| Size::new(image.width * s, image.height * s))
}

/// Size of `image` scaled to fit inside `bounds`.
pub fn contain_size(image: Size, bounds: Size) -> Option<Size> {
    fit_scale(image, bounds, false).map(|s| Size::new(image.width * s, image.height * s))
}

/// A rectangle of `size` centered on `center`.
#[inline]
pub fn centered(size: Size, center: Point) -> Rect {
    Rect::from_center_size(center, size)
}

/// Cover-fit rectangle for a full-canvas background.
pub fn cover_canvas(image: Size, canvas: Size) -> Option<Rect> {
    let size = cover_size(image, canvas)?;
    Some(centered(size, Point::new(canvas.width / 2.0, canvas.height / 2.0)))
}
