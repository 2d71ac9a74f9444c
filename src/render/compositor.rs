//! # Layer Compositor
//!
//! Draws one layer onto the shared canvas. Every branch works inside a
//! scoped [`Canvas::save`] guard, so a layer can never leak its transform or
//! clip into the next one.
//!
//! | Layer | Fit | Transform | Clip | On missing image |
//! |-------|-----|-----------|------|------------------|
//! | design | cover, canvas | none | canvas | skip |
//! | image | cover, box | center, rotate | rotated box | placeholder |
//! | picture | contain, box | center, rotate | none | skip |
//! | text | wrap into box | origin, rotate about center | none | n/a |

use image::RgbaImage;
use kurbo::{Point, Rect, Size};
use tracing::debug;

use super::canvas::Canvas;
use super::geometry::{centered, contain_size, cover_canvas, cover_size};
use crate::assets::{AssetLoader, placeholder, truncate_reference};
use crate::record::{FieldResolver, Record};
use crate::template::{
    Color, DesignProps, Frame, ImageProps, LayerProperties, PictureProps, TextAlign, TextProps,
};
use crate::text::{
    FontBook, FontSpec, TextMeasure, layout_lines, line_anchor_x, line_offsets, line_start_x,
};

/// What happened to a layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerOutcome {
    /// Drawn as described.
    Drawn,
    /// Intentionally drew nothing.
    Skipped(String),
    /// Image unavailable; a placeholder was drawn instead.
    Placeholder(String),
    /// Could not be drawn.
    Failed(String),
}

/// Per-render drawing context.
pub struct Compositor<'a> {
    pub fonts: &'a FontBook,
    pub fields: &'a FieldResolver,
    pub loader: &'a dyn AssetLoader,
}

impl Compositor<'_> {
    /// Draw one layer's properties onto `canvas`.
    pub async fn draw(
        &self,
        canvas: &mut Canvas,
        properties: &LayerProperties,
        record: &Record,
    ) -> LayerOutcome {
        match properties {
            LayerProperties::Design(props) => self.draw_design(canvas, props).await,
            LayerProperties::Image(props) => self.draw_image(canvas, props, record).await,
            LayerProperties::Picture(props) => self.draw_picture(canvas, props).await,
            LayerProperties::Text(props) => self.draw_text(canvas, props, record),
            LayerProperties::Invalid { reason, .. } => LayerOutcome::Failed(reason.clone()),
        }
    }

    async fn acquire(&self, reference: &str) -> Result<RgbaImage, String> {
        self.loader
            .load(reference)
            .await
            .map(|image| image.to_rgba8())
            .map_err(|e| e.to_string())
    }

    async fn draw_design(&self, canvas: &mut Canvas, props: &DesignProps) -> LayerOutcome {
        let Some(reference) = non_empty(&props.image_data) else {
            return LayerOutcome::Skipped("no imageData".into());
        };
        let image = match self.acquire(reference).await {
            Ok(image) => image,
            Err(e) => return LayerOutcome::Failed(e),
        };
        let canvas_size = Size::new(canvas.width() as f64, canvas.height() as f64);
        let Some(dest) = cover_canvas(image_size(&image), canvas_size) else {
            return LayerOutcome::Failed("image has no pixels".into());
        };

        let mut guard = canvas.save();
        guard.draw_image(&image, dest);
        debug!(reference = %truncate_reference(reference), "drew design layer");
        LayerOutcome::Drawn
    }

    async fn draw_image(
        &self,
        canvas: &mut Canvas,
        props: &ImageProps,
        record: &Record,
    ) -> LayerOutcome {
        let frame = &props.frame;
        if frame.is_degenerate() {
            return LayerOutcome::Skipped("empty box".into());
        }
        if props.image_index < 0 {
            return LayerOutcome::Skipped(format!("negative imageIndex {}", props.image_index));
        }
        let count = record.image_count();
        if count == 0 {
            return LayerOutcome::Skipped("record has no images".into());
        }
        let index = (props.image_index as usize).min(count - 1);
        let box_size = Size::new(frame.effective_width(), frame.effective_height());

        let (image, outcome) = match record.image_url(index) {
            Some(url) => match self.acquire(url).await {
                Ok(image) => (image, LayerOutcome::Drawn),
                Err(e) => (
                    self.placeholder(canvas, box_size, index),
                    LayerOutcome::Placeholder(e),
                ),
            },
            None => (
                self.placeholder(canvas, box_size, index),
                LayerOutcome::Placeholder(format!("image {} has no url", index)),
            ),
        };
        let Some(fit) = cover_size(image_size(&image), box_size) else {
            return LayerOutcome::Failed("image has no pixels".into());
        };

        let mut guard = canvas.save();
        enter_box(&mut guard, frame);
        guard.clip_rect(centered(box_size, Point::ORIGIN));
        guard.draw_image(&image, centered(fit, Point::ORIGIN));
        outcome
    }

    /// Never rasterized finer than the canvas itself.
    fn placeholder(&self, canvas: &Canvas, box_size: Size, index: usize) -> RgbaImage {
        let label = format!("Image {}", index + 1);
        placeholder(box_size.width, box_size.height, &label, self.fonts, canvas.area())
    }

    async fn draw_picture(&self, canvas: &mut Canvas, props: &PictureProps) -> LayerOutcome {
        let frame = &props.frame;
        let Some(reference) = non_empty(&props.image_data) else {
            return LayerOutcome::Skipped("no imageData".into());
        };
        if frame.is_degenerate() {
            return LayerOutcome::Skipped("empty box".into());
        }
        let image = match self.acquire(reference).await {
            Ok(image) => image,
            Err(e) => return LayerOutcome::Failed(e),
        };
        let box_size = Size::new(frame.effective_width(), frame.effective_height());
        let Some(fit) = contain_size(image_size(&image), box_size) else {
            return LayerOutcome::Failed("image has no pixels".into());
        };

        let mut guard = canvas.save();
        enter_box(&mut guard, frame);
        guard.draw_image(&image, centered(fit, Point::ORIGIN));
        LayerOutcome::Drawn
    }

    fn draw_text(&self, canvas: &mut Canvas, props: &TextProps, record: &Record) -> LayerOutcome {
        let Some(block) = TextBlock::prepare(props, record, self.fields, self.fonts) else {
            return LayerOutcome::Skipped("no text".into());
        };

        let max_pixels = canvas.max_pixels();
        let mut guard = canvas.save();
        guard.translate(props.frame.left, props.frame.top);
        if props.frame.angle != 0.0 {
            let (w, h) = (block.box_size.width, block.box_size.height);
            guard.translate(w / 2.0, h / 2.0);
            guard.rotate_degrees(props.frame.angle);
            guard.translate(-w / 2.0, -h / 2.0);
        }

        for (line, y) in block.lines.iter().zip(&block.offsets) {
            let width = self.fonts.measure(line, &block.font);
            let start_x = line_start_x(block.align, block.anchor_x, width);
            match self.fonts.rasterize_line(line, &block.font, block.color, max_pixels) {
                Ok(Some(raster)) => {
                    let (w, h) = (raster.image.width() as f64, raster.image.height() as f64);
                    let origin = (start_x - raster.origin_x, y - h / 2.0);
                    guard.draw_image(&raster.image, Rect::from_origin_size(origin, (w, h)));
                }
                Ok(None) => {}
                Err(e) => return LayerOutcome::Failed(e.to_string()),
            }
            if block.underline {
                let (top, bottom) = block.underline_span(*y);
                guard.fill_rect(Rect::new(start_x, top, start_x + width, bottom), block.color);
            }
        }
        LayerOutcome::Drawn
    }
}

/// Translate to the box center and apply its rotation.
fn enter_box(canvas: &mut Canvas, frame: &Frame) {
    let (cx, cy) = frame.center();
    canvas.translate(cx, cy);
    canvas.rotate_degrees(frame.angle);
}

fn image_size(image: &RgbaImage) -> Size {
    Size::new(image.width() as f64, image.height() as f64)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Laid-out content of a text layer, in box-local coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub lines: Vec<String>,
    /// Vertical center of each line.
    pub offsets: Vec<f64>,
    /// Alignment anchor shared by every line.
    pub anchor_x: f64,
    pub align: TextAlign,
    pub font: FontSpec,
    pub color: Color,
    pub underline: bool,
    pub box_size: Size,
}

impl TextBlock {
    /// Resolve and lay out a text layer; `None` when there is nothing to draw.
    ///
    /// A bound `variable` wins over literal `text`, even when it resolves to
    /// nothing.
    pub fn prepare(
        props: &TextProps,
        record: &Record,
        fields: &FieldResolver,
        fonts: &FontBook,
    ) -> Option<Self> {
        let content = match props.variable.as_deref().filter(|v| !v.is_empty()) {
            Some(variable) => fields.resolve(record, variable)?,
            None => props.text.clone()?,
        };
        if content.trim().is_empty() {
            return None;
        }

        let font = FontSpec::new(props.font_size)
            .bold(props.bold)
            .italic(props.italic);
        let box_size = Size::new(props.frame.effective_width(), props.frame.effective_height());
        let lines = layout_lines(&content, box_size.width, box_size.height, &font, fonts);
        if lines.is_empty() {
            return None;
        }
        let align = props.alignment();
        Some(Self {
            offsets: line_offsets(lines.len(), box_size.height, font.size),
            anchor_x: line_anchor_x(align, box_size.width),
            lines,
            align,
            font,
            color: props.color,
            underline: props.underline,
            box_size,
        })
    }

    /// Vertical extent of the underline of the line centered at `y`.
    pub fn underline_span(&self, y: f64) -> (f64, f64) {
        let thickness = (self.font.size / 20.0).max(1.0);
        let top = y + self.font.size / 2.0;
        (top, top + thickness)
    }
}
