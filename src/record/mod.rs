//! # Listing Records
//!
//! A record is the data a template binds against: a listing document as JSON.
//! The renderer never looks at concrete listing types; it reads the record
//! through [`FieldResolver`] (text layers) and [`Record::image_url`] (image
//! layers).
//!
//! ## Shape
//!
//! ```json
//! {
//!   "price": 250000,
//!   "year": 2020, "make": "Toyota", "model": "Corolla", "variant": "1.8 XS",
//!   "fullDescription": "One owner, full service history.",
//!   "images": [{"url": "https://cdn.example.com/a.jpg"}, {"url": "/uploads/b.png"}],
//!   "texts": {"headline": "Just in!"},
//!   "organization": {"registeredName": "Acme Motors (Pty) Ltd"}
//! }
//! ```

mod fields;
mod format;

pub use fields::{FieldFormat, FieldResolver};
pub use format::{format_date, format_grouped, stringify_value};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::error::Result;

/// A listing document. Read-only for the duration of a render.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    root: Value,
}

impl From<Value> for Record {
    fn from(root: Value) -> Self {
        Self { root }
    }
}

impl Record {
    pub fn new(root: Value) -> Self {
        Self { root }
    }

    /// Read a record from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// The underlying JSON tree.
    pub fn as_value(&self) -> &Value {
        &self.root
    }

    /// Top-level field, treating `null` as absent.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.root.get(key).filter(|v| !v.is_null())
    }

    /// Walk a dotted path (`organization.registeredName`, `images.0.url`).
    ///
    /// Returns `None` when any segment is missing or the walk reaches a
    /// scalar before the path is exhausted.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        if path.is_empty() {
            return None;
        }
        let mut current = &self.root;
        for segment in path.split('.') {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        if current.is_null() { None } else { Some(current) }
    }

    /// Per-field text override from the `texts` mapping.
    pub fn text_override(&self, key: &str) -> Option<&str> {
        self.root.get("texts")?.get(key)?.as_str()
    }

    /// Number of entries in the `images` collection (0 when absent).
    pub fn image_count(&self) -> usize {
        self.root
            .get("images")
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    }

    /// URL of the image at `index`. Entries are `{"url": ...}` objects or
    /// plain strings; empty URLs count as missing.
    pub fn image_url(&self, index: usize) -> Option<&str> {
        let entry = self.root.get("images")?.as_array()?.get(index)?;
        let url = match entry {
            Value::String(s) => s.as_str(),
            Value::Object(map) => map.get("url")?.as_str()?,
            _ => return None,
        };
        if url.trim().is_empty() { None } else { Some(url) }
    }

    /// Identifier used to name batch outputs: `id`, then `_id` (including
    /// the `{"$oid": ...}` form).
    pub fn identifier(&self) -> Option<String> {
        let value = self.field("id").or_else(|| self.field("_id"))?;
        match value {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Object(map) => map.get("$oid")?.as_str().map(str::to_string),
            _ => None,
        }
    }
}
