//! # Cartel - Listing Card Renderer
//!
//! Cartel turns an editor-made template and a listing record into a PNG
//! card. It provides:
//!
//! - **Template model**: ordered layers (background design, data-bound
//!   images, static pictures, text) with typed properties
//! - **Field binding**: computed variables, per-listing text overrides,
//!   dotted-path lookup and value formatting
//! - **Image acquisition**: data URIs, static files, HTTP(S), placeholders
//! - **Text layout**: greedy word wrap with ellipsis truncation
//! - **Compositing**: rotation about box centers, clipping, cover/contain fit
//!
//! ## Quick Start
//!
//! ```no_run
//! use cartel::{config::RenderConfig, record::Record, render::Renderer, template::Template};
//! use serde_json::json;
//! use std::path::Path;
//!
//! # async fn demo() -> cartel::Result<()> {
//! let template = Template::from_json(r#"{
//!     "designSize": "1:1",
//!     "layers": [{"type": "text", "visible": true, "properties": {
//!         "left": 0, "top": 0, "width": 200, "height": 50,
//!         "fontSize": 20, "variable": "title", "textAlign": "center"}}]
//! }"#)?;
//! let record = Record::new(json!({"year": 2020, "make": "Toyota", "model": "Corolla"}));
//!
//! let renderer = Renderer::new(RenderConfig::default())?;
//! let report = renderer.render(&template, &record, Path::new("out/card.png")).await;
//! println!("written: {}", report.success());
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`template`] | Template and layer model, design sizes |
//! | [`record`] | Listing records and field resolution |
//! | [`assets`] | Image loading and placeholders |
//! | [`text`] | Fonts, measurement and line layout |
//! | [`render`] | Canvas, compositor, renderer, batches |
//! | [`config`] | Render configuration |
//! | [`error`] | Error types |

pub mod assets;
pub mod config;
pub mod error;
pub mod record;
pub mod render;
pub mod template;
pub mod text;

// Re-exports for convenience
pub use config::RenderConfig;
pub use error::{CartelError, Result};
pub use record::Record;
pub use render::{RenderReport, Renderer};
pub use template::Template;
