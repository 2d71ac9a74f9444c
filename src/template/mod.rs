//! # Template Model
//!
//! A template is an ordered list of layers plus a design size. It is a plain
//! JSON document produced by the editor:
//!
//! ```json
//! {
//!   "designSize": "4:5",
//!   "layers": [
//!     {"id": "bg", "type": "design", "visible": true,
//!      "properties": {"imageData": "data:image/png;base64,..."}},
//!     {"id": 7, "type": "text", "visible": true,
//!      "properties": {"left": 40, "top": 900, "width": 920, "height": 80,
//!                     "fontSize": 48, "variable": "title", "textAlign": "center"}}
//!   ]
//! }
//! ```
//!
//! Sequence position in `layers` is the stacking order: the first layer is
//! drawn first (bottom), the last is drawn on top. Layer ids are opaque and
//! never used for ordering.
//!
//! Layers are parsed leniently: a layer whose `type` is unknown or whose
//! properties do not fit its type becomes [`LayerProperties::Invalid`], which
//! the renderer reports and skips. Only a non-object entry in `layers` makes
//! the whole document invalid.

pub mod design_size;
pub mod types;

pub use design_size::{DesignSize, resolve_dimensions};
pub use types::*;

use serde::Deserialize;
use std::path::Path;

use crate::error::{CartelError, Result};

/// A renderable template.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    #[serde(default)]
    pub design_size: DesignSize,
    #[serde(default, deserialize_with = "deserialize_layers")]
    pub layers: Vec<Layer>,
}

impl Template {
    /// Parse a template from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| CartelError::Template(e.to_string()))
    }

    /// Read and parse a template file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
            .map_err(|e| CartelError::Template(format!("{}: {}", path.display(), e)))
    }
}

/// One compositing step.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    /// Opaque identity, kept for diagnostics.
    pub id: Option<String>,
    pub visible: bool,
    /// `None` when the document carries no properties for this layer.
    pub properties: Option<LayerProperties>,
}

impl Layer {
    pub fn new(properties: LayerProperties) -> Self {
        Self {
            id: None,
            visible: true,
            properties: Some(properties),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Whether the renderer should look at this layer at all.
    pub fn is_renderable(&self) -> bool {
        self.visible && self.properties.is_some()
    }
}

/// Typed layer payload, one variant per layer `type`.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerProperties {
    Design(DesignProps),
    Image(ImageProps),
    Picture(PictureProps),
    Text(TextProps),
    /// The document described a layer that could not be understood.
    Invalid { kind: String, reason: String },
}

impl LayerProperties {
    /// Layer type name as written in the template.
    pub fn kind(&self) -> &str {
        match self {
            LayerProperties::Design(_) => "design",
            LayerProperties::Image(_) => "image",
            LayerProperties::Picture(_) => "picture",
            LayerProperties::Text(_) => "text",
            LayerProperties::Invalid { kind, .. } => kind,
        }
    }

    /// Parse the `properties` object of a layer of type `kind`.
    pub fn parse(kind: &str, properties: serde_json::Value) -> Self {
        let parsed = match kind {
            "design" => serde_json::from_value(properties).map(LayerProperties::Design),
            "image" => serde_json::from_value(properties).map(LayerProperties::Image),
            "picture" => serde_json::from_value(properties).map(LayerProperties::Picture),
            "text" => serde_json::from_value(properties).map(LayerProperties::Text),
            other => {
                return LayerProperties::Invalid {
                    kind: other.to_string(),
                    reason: format!("unknown layer type '{}'", other),
                };
            }
        };
        parsed.unwrap_or_else(|e| LayerProperties::Invalid {
            kind: kind.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Stringify a layer id; ids may be strings or numbers in editor output.
fn id_to_string(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// Deserialize the `layers` array.
///
/// Each element is first parsed as raw JSON so that one bad layer degrades
/// to [`LayerProperties::Invalid`] instead of failing the whole template.
fn deserialize_layers<'de, D>(deserializer: D) -> std::result::Result<Vec<Layer>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let values: Option<Vec<serde_json::Value>> = Option::deserialize(deserializer)?;
    values
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(i, v)| {
            let mut obj = match v {
                serde_json::Value::Object(map) => map,
                other => {
                    return Err(serde::de::Error::custom(format!(
                        "layers[{}]: expected object, got {}",
                        i, other
                    )));
                }
            };

            let id = obj.remove("id").and_then(id_to_string);
            let visible = obj
                .remove("visible")
                .and_then(|v| v.as_bool())
                .unwrap_or(true);
            let kind = obj
                .remove("type")
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default();
            let properties = match obj.remove("properties") {
                None | Some(serde_json::Value::Null) => None,
                Some(props) => Some(LayerProperties::parse(&kind, props)),
            };

            Ok(Layer {
                id,
                visible,
                properties,
            })
        })
        .collect()
}
