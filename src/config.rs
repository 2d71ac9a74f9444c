//! # Render Configuration
//!
//! Settings shared by every render call: canvas base width, value formatting,
//! where static assets and fonts live, and the limits of the fallback path.
//!
//! ## File Format
//!
//! Configuration is read from TOML. Every key is optional:
//!
//! ```toml
//! base_width = 1000
//! currency_prefix = "R"
//! date_format = "%-m/%-d/%Y"
//! static_root = "public"
//! user_agent = "cartel/0.1"
//! fetch_timeout_secs = 20
//!
//! [fonts]
//! regular = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf"
//! bold = "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf"
//! ```
//!
//! ## Usage
//!
//! ```
//! use cartel::config::RenderConfig;
//!
//! let config = RenderConfig::from_toml_str("base_width = 1080").unwrap();
//! assert_eq!(config.base_width, 1080);
//! assert_eq!(config.currency_prefix, "R");
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{CartelError, Result};

/// Font files used for text layers. Unset faces fall back to the built-in
/// bitmap face (regular) or are synthesized from the regular face.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontPaths {
    pub regular: Option<PathBuf>,
    pub bold: Option<PathBuf>,
    pub italic: Option<PathBuf>,
    pub bold_italic: Option<PathBuf>,
}

/// # Render Configuration
///
/// | Key | Default | Meaning |
/// |-----|---------|---------|
/// | `base_width` | 1000 | Canvas width in pixels for every design size |
/// | `currency_prefix` | `R` | Prefix of the computed `price` variable |
/// | `date_format` | `%-m/%-d/%Y` | chrono format for date values |
/// | `static_root` | `public` | Root for references starting with `/` |
/// | `user_agent` | `cartel/0.1` | HTTP user agent for remote images |
/// | `fetch_timeout_secs` | none | Per-request timeout for remote images |
/// | `fallback_width` × `fallback_height` | 1000 × 1000 | Error image size |
/// | `max_canvas_pixels` | 64 000 000 | Allocation limit for one canvas |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub base_width: u32,
    pub currency_prefix: String,
    pub date_format: String,
    pub static_root: PathBuf,
    pub fonts: FontPaths,
    pub user_agent: String,
    pub fetch_timeout_secs: Option<u64>,
    pub fallback_width: u32,
    pub fallback_height: u32,
    pub max_canvas_pixels: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            base_width: 1000,
            currency_prefix: "R".into(),
            date_format: "%-m/%-d/%Y".into(),
            static_root: PathBuf::from("public"),
            fonts: FontPaths::default(),
            user_agent: "cartel/0.1".into(),
            fetch_timeout_secs: None,
            fallback_width: 1000,
            fallback_height: 1000,
            max_canvas_pixels: 64_000_000,
        }
    }
}

impl RenderConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| CartelError::Config(e.to_string()))
    }

    /// Read a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CartelError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Read `path` when given, otherwise use defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    #[inline]
    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RenderConfig::default();
        assert_eq!(config.base_width, 1000);
        assert_eq!(config.fallback_width, 1000);
        assert_eq!(config.fallback_height, 1000);
        assert!(config.fetch_timeout().is_none());
        assert!(config.fonts.regular.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RenderConfig::from_toml_str(
            r#"
            currency_prefix = "$"
            fetch_timeout_secs = 5

            [fonts]
            bold = "fonts/Bold.ttf"
            "#,
        )
        .unwrap();
        assert_eq!(config.currency_prefix, "$");
        assert_eq!(config.fetch_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.fonts.bold, Some(PathBuf::from("fonts/Bold.ttf")));
        assert_eq!(config.base_width, 1000);
        assert_eq!(config.date_format, "%-m/%-d/%Y");
    }

    #[test]
    fn test_invalid_toml() {
        let err = RenderConfig::from_toml_str("base_width = \"wide\"").unwrap_err();
        assert!(matches!(err, CartelError::Config(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = RenderConfig::load(Path::new("/nonexistent/cartel.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/cartel.toml"));
    }
}
