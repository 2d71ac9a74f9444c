//! Design size tags and their canvas dimensions.
//!
//! Every design size shares the configured base width; only the height
//! varies with the aspect ratio.
//!
//! | Tag | Alias | Canvas (base 1000) |
//! |-----|-------|--------------------|
//! | `1:1` | `square` | 1000 × 1000 |
//! | `4:5` | `portrait` | 1000 × 1250 |
//! | `9:16` | `story` | 1000 × 1777 |
//! | `16:9` | `landscape` | 1000 × 562 |

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Aspect-ratio tag of a template.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DesignSize {
    /// 1:1, the default for missing or unrecognized tags.
    #[default]
    Square,
    /// 4:5
    Portrait,
    /// 9:16
    Story,
    /// 16:9
    Landscape,
}

impl DesignSize {
    /// Parse a tag. Unknown tags map to [`DesignSize::Square`].
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "4:5" | "portrait" => DesignSize::Portrait,
            "9:16" | "story" => DesignSize::Story,
            "16:9" | "landscape" => DesignSize::Landscape,
            _ => DesignSize::Square,
        }
    }

    /// Canonical tag for this size.
    pub fn tag(self) -> &'static str {
        match self {
            DesignSize::Square => "1:1",
            DesignSize::Portrait => "4:5",
            DesignSize::Story => "9:16",
            DesignSize::Landscape => "16:9",
        }
    }

    /// Canvas dimensions `(width, height)` for a base width.
    ///
    /// Fractional heights are truncated, the same way a canvas element
    /// truncates a fractional size.
    pub fn dimensions(self, base_width: u32) -> (u32, u32) {
        let base = base_width as u64;
        let height = match self {
            DesignSize::Square => base,
            DesignSize::Portrait => base * 5 / 4,
            DesignSize::Story => base * 16 / 9,
            DesignSize::Landscape => base * 9 / 16,
        };
        (base_width, height as u32)
    }
}

/// Resolve a raw tag straight to canvas dimensions.
pub fn resolve_dimensions(tag: Option<&str>, base_width: u32) -> (u32, u32) {
    tag.map(DesignSize::from_tag)
        .unwrap_or_default()
        .dimensions(base_width)
}

impl Serialize for DesignSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.tag())
    }
}

impl<'de> Deserialize<'de> for DesignSize {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Anything that is not a string (null, numbers) falls back to the default.
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(value.as_str().map(DesignSize::from_tag).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_tags() {
        assert_eq!(DesignSize::from_tag("1:1").dimensions(1000), (1000, 1000));
        assert_eq!(DesignSize::from_tag("4:5").dimensions(1000), (1000, 1250));
        assert_eq!(DesignSize::from_tag("9:16").dimensions(1000), (1000, 1777));
        assert_eq!(DesignSize::from_tag("16:9").dimensions(1000), (1000, 562));
    }

    #[test]
    fn test_unknown_and_missing_default_to_square() {
        assert_eq!(resolve_dimensions(Some("3:2"), 1000), (1000, 1000));
        assert_eq!(resolve_dimensions(Some(""), 1000), (1000, 1000));
        assert_eq!(resolve_dimensions(None, 1000), (1000, 1000));
    }

    #[test]
    fn test_aliases() {
        assert_eq!(DesignSize::from_tag("Portrait"), DesignSize::Portrait);
        assert_eq!(DesignSize::from_tag("story"), DesignSize::Story);
        assert_eq!(DesignSize::from_tag(" landscape "), DesignSize::Landscape);
    }

    #[test]
    fn test_custom_base_width() {
        assert_eq!(DesignSize::Portrait.dimensions(1080), (1080, 1350));
        assert_eq!(DesignSize::Landscape.dimensions(1920), (1920, 1080));
    }

    #[test]
    fn test_deserialize_lenient() {
        let size: DesignSize = serde_json::from_str("\"9:16\"").unwrap();
        assert_eq!(size, DesignSize::Story);
        let size: DesignSize = serde_json::from_str("42").unwrap();
        assert_eq!(size, DesignSize::Square);
        assert_eq!(serde_json::to_string(&DesignSize::Landscape).unwrap(), "\"16:9\"");
    }
}
