//! # Renderer
//!
//! Orchestrates one render: canvas allocation, layers bottom to top, PNG
//! persistence. A layer that cannot be drawn is reported as a
//! [`LayerDiagnostic`] and the render carries on. Anything that stops the
//! render itself (canvas allocation, encoding, writing) switches to a fixed
//! size fallback image that carries the error message in red, written to the
//! same path.
//!
//! ## Example
//!
//! ```no_run
//! use cartel::config::RenderConfig;
//! use cartel::record::Record;
//! use cartel::render::Renderer;
//! use cartel::template::Template;
//! use std::path::Path;
//!
//! # async fn demo() -> cartel::Result<()> {
//! let renderer = Renderer::new(RenderConfig::default())?;
//! let template = Template::load(Path::new("card.json"))?;
//! let record = Record::load(Path::new("listing.json"))?;
//! let report = renderer.render(&template, &record, Path::new("out/card.png")).await;
//! assert!(report.success());
//! # Ok(())
//! # }
//! ```

use image::RgbaImage;
use kurbo::Rect;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::canvas::{Canvas, encode_png};
use super::compositor::{Compositor, LayerOutcome};
use crate::assets::{AssetFetcher, AssetLoader, ImageCache};
use crate::config::RenderConfig;
use crate::error::Result;
use crate::record::{FieldFormat, FieldResolver, Record};
use crate::template::{Color, Template, TextAlign};
use crate::text::{
    FontBook, FontSpec, LINE_HEIGHT_FACTOR, TextMeasure, layout_lines, line_start_x,
};

/// Font size of the fallback error message.
const FALLBACK_FONT_SIZE: f64 = 32.0;

/// Margin around the fallback error message.
const FALLBACK_MARGIN: f64 = 40.0;

/// A layer that did not draw as described.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerDiagnostic {
    /// Position in the template's layer list.
    pub index: usize,
    pub id: Option<String>,
    /// Layer type as written in the template.
    pub kind: String,
    pub outcome: LayerOutcome,
}

impl fmt::Display for LayerDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layer {} ({}", self.index, self.kind)?;
        if let Some(id) = &self.id {
            write!(f, " '{}'", id)?;
        }
        match &self.outcome {
            LayerOutcome::Drawn => write!(f, "): drawn"),
            LayerOutcome::Skipped(reason) => write!(f, "): skipped, {}", reason),
            LayerOutcome::Placeholder(reason) => write!(f, "): placeholder, {}", reason),
            LayerOutcome::Failed(reason) => write!(f, "): failed, {}", reason),
        }
    }
}

/// A rendered raster that has not been written anywhere.
#[derive(Debug, Clone)]
pub struct RenderedImage {
    pub image: RgbaImage,
    pub diagnostics: Vec<LayerDiagnostic>,
}

/// How a render to file ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The template was rendered and written.
    Rendered,
    /// The render failed; the fallback error image was written instead.
    Fallback { error: String },
    /// Nothing was written.
    Failed { error: String },
}

/// Result of [`Renderer::render`].
#[derive(Debug, Clone)]
pub struct RenderReport {
    pub output: PathBuf,
    pub outcome: RenderOutcome,
    pub diagnostics: Vec<LayerDiagnostic>,
}

impl RenderReport {
    /// Whether a file was written at `output` (rendered or fallback).
    pub fn success(&self) -> bool {
        !matches!(self.outcome, RenderOutcome::Failed { .. })
    }
}

/// Renders templates against records.
pub struct Renderer {
    config: RenderConfig,
    fonts: FontBook,
    fields: FieldResolver,
    loader: Arc<dyn AssetLoader>,
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("config", &self.config)
            .field("fonts", &self.fonts)
            .finish_non_exhaustive()
    }
}

impl Renderer {
    /// Renderer with the default loader and configured fonts.
    pub fn new(config: RenderConfig) -> Result<Self> {
        let loader = AssetFetcher::new(&config)?;
        Self::with_parts(config, Arc::new(loader))
    }

    /// Renderer whose loader keeps decoded images in `cache`. Use one per
    /// batch.
    pub fn with_image_cache(config: RenderConfig, cache: ImageCache) -> Result<Self> {
        let loader = AssetFetcher::new(&config)?.with_cache(cache);
        Self::with_parts(config, Arc::new(loader))
    }

    fn with_parts(config: RenderConfig, loader: Arc<dyn AssetLoader>) -> Result<Self> {
        let fonts = FontBook::from_paths(&config.fonts)?;
        if !fonts.has_outline_fonts() {
            debug!("No outline font configured, using bitmap font");
        }
        Ok(Self {
            fields: FieldResolver::new(FieldFormat::from_config(&config)),
            config,
            fonts,
            loader,
        })
    }

    /// Replace the image loader.
    pub fn with_loader(mut self, loader: Arc<dyn AssetLoader>) -> Self {
        self.loader = loader;
        self
    }

    /// Replace the font book.
    pub fn with_fonts(mut self, fonts: FontBook) -> Self {
        self.fonts = fonts;
        self
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn fonts(&self) -> &FontBook {
        &self.fonts
    }

    pub fn fields(&self) -> &FieldResolver {
        &self.fields
    }

    /// Canvas size for `template`.
    pub fn dimensions(&self, template: &Template) -> (u32, u32) {
        template.design_size.dimensions(self.config.base_width)
    }

    /// Render `template` against `record` in memory.
    ///
    /// Layer problems end up in the diagnostics; only canvas allocation can
    /// fail.
    pub async fn render_image(&self, template: &Template, record: &Record) -> Result<RenderedImage> {
        let (width, height) = self.dimensions(template);
        let mut canvas = Canvas::new(width, height, self.config.max_canvas_pixels)?;
        debug!(width, height, layers = template.layers.len(), "Canvas allocated");

        let compositor = Compositor {
            fonts: &self.fonts,
            fields: &self.fields,
            loader: self.loader.as_ref(),
        };
        let mut diagnostics = Vec::new();

        for (index, layer) in template.layers.iter().enumerate() {
            if !layer.visible {
                continue;
            }
            let Some(properties) = &layer.properties else {
                continue;
            };
            let outcome = compositor.draw(&mut canvas, properties, record).await;
            if outcome == LayerOutcome::Drawn {
                continue;
            }
            let diagnostic = LayerDiagnostic {
                index,
                id: layer.id.clone(),
                kind: properties.kind().to_string(),
                outcome,
            };
            match diagnostic.outcome {
                LayerOutcome::Skipped(_) => debug!("{}", diagnostic),
                _ => warn!("{}", diagnostic),
            }
            diagnostics.push(diagnostic);
        }

        Ok(RenderedImage {
            image: canvas.into_image(),
            diagnostics,
        })
    }

    /// Render to a PNG file at `output`, creating parent directories.
    ///
    /// Never fails: see [`RenderReport::success`].
    pub async fn render(&self, template: &Template, record: &Record, output: &Path) -> RenderReport {
        let rendered = match self.render_image(template, record).await {
            Ok(rendered) => rendered,
            Err(e) => return self.recover(e.to_string(), Vec::new(), output).await,
        };
        let written = match encode_png(&rendered.image) {
            Ok(png) => write_output(output, &png).await,
            Err(e) => Err(e),
        };
        match written {
            Ok(()) => {
                info!(
                    output = %output.display(),
                    diagnostics = rendered.diagnostics.len(),
                    "Rendered"
                );
                RenderReport {
                    output: output.to_path_buf(),
                    outcome: RenderOutcome::Rendered,
                    diagnostics: rendered.diagnostics,
                }
            }
            Err(e) => self.recover(e.to_string(), rendered.diagnostics, output).await,
        }
    }

    async fn recover(
        &self,
        message: String,
        diagnostics: Vec<LayerDiagnostic>,
        output: &Path,
    ) -> RenderReport {
        error!(output = %output.display(), "Render failed: {}", message);
        let outcome = match self.write_fallback(&message, output).await {
            Ok(()) => RenderOutcome::Fallback { error: message },
            Err(e) => {
                error!(output = %output.display(), "Fallback image not written: {}", e);
                RenderOutcome::Failed {
                    error: format!("{}; fallback: {}", message, e),
                }
            }
        };
        RenderReport {
            output: output.to_path_buf(),
            outcome,
            diagnostics,
        }
    }

    async fn write_fallback(&self, message: &str, output: &Path) -> Result<()> {
        let png = self.fallback_image(message)?.encode_png()?;
        write_output(output, &png).await
    }

    /// White canvas with `message` centered in red.
    pub fn fallback_image(&self, message: &str) -> Result<Canvas> {
        let width = self.config.fallback_width.max(1);
        let height = self.config.fallback_height.max(1);
        let mut canvas = Canvas::new(width, height, u64::MAX)?;

        let font = FontSpec::new(FALLBACK_FONT_SIZE);
        let box_w = (width as f64 - 2.0 * FALLBACK_MARGIN).max(FALLBACK_FONT_SIZE);
        let box_h = (height as f64 - 2.0 * FALLBACK_MARGIN).max(FALLBACK_FONT_SIZE);
        let text = format!("Error rendering image: {}", message);
        let lines = layout_lines(&text, box_w, box_h, &font, &self.fonts);

        let line_height = font.size * LINE_HEIGHT_FACTOR;
        let top = (height as f64 - lines.len() as f64 * line_height) / 2.0;
        let center_x = width as f64 / 2.0;
        for (i, line) in lines.iter().enumerate() {
            let raster = self.fonts.rasterize_line(line, &font, Color::RED, canvas.max_pixels());
            let Ok(Some(raster)) = raster else {
                continue;
            };
            let line_width = self.fonts.measure(line, &font);
            let x = line_start_x(TextAlign::Center, center_x, line_width) - raster.origin_x;
            let y = top + i as f64 * line_height;
            let (w, h) = (raster.image.width() as f64, raster.image.height() as f64);
            canvas.draw_image(&raster.image, Rect::from_origin_size((x, y), (w, h)));
        }
        Ok(canvas)
    }
}

async fn write_output(output: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(output, bytes).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{Frame, Layer, LayerProperties, TextProps};
    use image::Rgba;
    use serde_json::json;

    fn renderer() -> Renderer {
        Renderer::new(RenderConfig::default()).unwrap()
    }

    fn text_layer(text: &str) -> Layer {
        let mut props = TextProps::new(Frame::new(0.0, 0.0, 400.0, 100.0), 20.0);
        props.text = Some(text.into());
        Layer::new(LayerProperties::Text(props))
    }

    #[tokio::test]
    async fn test_empty_template_is_white() {
        let template = Template::default();
        let rendered = renderer().render_image(&template, &Record::default()).await.unwrap();
        assert_eq!(rendered.image.dimensions(), (1000, 1000));
        assert!(rendered.diagnostics.is_empty());
        assert!(rendered.image.pixels().all(|p| *p == Rgba([255, 255, 255, 255])));
    }

    #[tokio::test]
    async fn test_diagnostics_name_layers() {
        let template = Template {
            layers: vec![
                text_layer("drawn"),
                Layer::new(LayerProperties::Invalid {
                    kind: "video".into(),
                    reason: "unknown layer type 'video'".into(),
                })
                .with_id("v1"),
                text_layer("").with_id("blank"),
                text_layer("hidden but invalid").hidden(),
            ],
            ..Default::default()
        };
        let rendered = renderer().render_image(&template, &Record::default()).await.unwrap();
        assert_eq!(rendered.diagnostics.len(), 2);
        assert_eq!(rendered.diagnostics[0].index, 1);
        assert_eq!(
            rendered.diagnostics[0].to_string(),
            "layer 1 (video 'v1'): failed, unknown layer type 'video'"
        );
        assert_eq!(rendered.diagnostics[1].id.as_deref(), Some("blank"));
        assert!(matches!(rendered.diagnostics[1].outcome, LayerOutcome::Skipped(_)));
    }

    #[tokio::test]
    async fn test_canvas_limit_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let config = RenderConfig {
            max_canvas_pixels: 100,
            fallback_width: 300,
            fallback_height: 200,
            ..Default::default()
        };
        let renderer = Renderer::new(config).unwrap();
        let output = dir.path().join("nested/dir/card.png");
        let record = Record::new(json!({}));

        let report = renderer.render(&Template::default(), &record, &output).await;
        assert!(report.success());
        assert!(matches!(report.outcome, RenderOutcome::Fallback { .. }));
        let written = image::open(&output).unwrap().to_rgba8();
        assert_eq!(written.dimensions(), (300, 200));
        assert!(written.pixels().any(|p| p[0] > 200 && p[1] < 80 && p[2] < 80));
    }

    #[test]
    fn test_fallback_text_is_centered_red() {
        let renderer = renderer();
        let canvas = renderer.fallback_image("boom").unwrap();
        let red: Vec<(u32, u32)> = canvas
            .pixels()
            .enumerate_pixels()
            .filter(|(_, _, p)| p[0] > 200 && p[1] < 80 && p[2] < 80)
            .map(|(x, y, _)| (x, y))
            .collect();
        assert!(!red.is_empty());
        let min_x = red.iter().map(|(x, _)| *x).min().unwrap();
        let max_x = red.iter().map(|(x, _)| *x).max().unwrap();
        let min_y = red.iter().map(|(_, y)| *y).min().unwrap();
        let max_y = red.iter().map(|(_, y)| *y).max().unwrap();
        let cx = (min_x + max_x) as f64 / 2.0;
        let cy = (min_y + max_y) as f64 / 2.0;
        assert!((cx - 500.0).abs() < 20.0, "center x {}", cx);
        assert!((cy - 500.0).abs() < 20.0, "center y {}", cy);
    }

    #[tokio::test]
    async fn test_unwritable_output_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let output = blocker.join("card.png");

        let report = renderer()
            .render(&Template::default(), &Record::default(), &output)
            .await;
        assert!(!report.success());
        assert!(matches!(report.outcome, RenderOutcome::Failed { .. }));
    }
}
