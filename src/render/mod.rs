//! # Rendering Module
//!
//! Composites a [`Template`](crate::template::Template) and a
//! [`Record`](crate::record::Record) into an RGBA raster.
//!
//! ## Modules
//!
//! - [`canvas`]: RGBA surface with a save/restore transform and clip stack
//! - [`geometry`]: cover and contain fit math
//! - [`compositor`]: per-layer drawing (design, image, picture, text)
//! - [`renderer`]: orchestration, PNG output, fallback error image
//! - [`batch`]: many records, bounded concurrency, shared image cache
//!
//! ## Pipeline
//!
//! ```text
//! designSize ──► canvas (white) ──► layer 0 ──► layer 1 ──► ... ──► PNG
//!                                     │
//!                                     └─ failure: diagnostic, next layer
//! ```

pub mod batch;
pub mod canvas;
pub mod compositor;
pub mod geometry;
pub mod renderer;

pub use batch::{BatchJob, render_batch};
pub use canvas::{Canvas, CanvasGuard};
pub use compositor::{LayerOutcome, TextBlock};
pub use renderer::{
    LayerDiagnostic, RenderOutcome, RenderReport, RenderedImage, Renderer,
};
