//! Layer property payloads.
//!
//! Each layer type has its own typed property struct. Field names follow the
//! editor's camelCase JSON (`scaleX`, `imageIndex`, `fontSize`, ...).

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

fn default_scale() -> f64 {
    1.0
}

/// Box placement shared by image, picture and text layers.
///
/// `left`/`top` is the unrotated top-left corner in canvas pixels. The
/// effective size is `width * scale_x` by `height * scale_y`; rotation is
/// in degrees, clockwise, about the box center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    #[serde(default)]
    pub left: f64,
    #[serde(default)]
    pub top: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default = "default_scale")]
    pub scale_x: f64,
    #[serde(default = "default_scale")]
    pub scale_y: f64,
    #[serde(default)]
    pub angle: f64,
}

impl Frame {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
            scale_x: 1.0,
            scale_y: 1.0,
            angle: 0.0,
        }
    }

    pub fn with_angle(mut self, angle: f64) -> Self {
        self.angle = angle;
        self
    }

    pub fn with_scale(mut self, scale_x: f64, scale_y: f64) -> Self {
        self.scale_x = scale_x;
        self.scale_y = scale_y;
        self
    }

    /// Effective width after scaling.
    #[inline]
    pub fn effective_width(&self) -> f64 {
        self.width * self.scale_x
    }

    /// Effective height after scaling.
    #[inline]
    pub fn effective_height(&self) -> f64 {
        self.height * self.scale_y
    }

    /// Box center in canvas space (the rotation pivot).
    #[inline]
    pub fn center(&self) -> (f64, f64) {
        (
            self.left + self.effective_width() / 2.0,
            self.top + self.effective_height() / 2.0,
        )
    }

    /// A box with no drawable area.
    pub fn is_degenerate(&self) -> bool {
        !(self.effective_width() > 0.0 && self.effective_height() > 0.0)
            || !self.effective_width().is_finite()
            || !self.effective_height().is_finite()
    }
}

/// Full-canvas background image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignProps {
    #[serde(default)]
    pub image_data: Option<String>,
}

/// Data-bound image container filled from the record's `images`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageProps {
    #[serde(flatten)]
    pub frame: Frame,
    #[serde(default)]
    pub image_index: i64,
}

/// Static embedded picture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PictureProps {
    #[serde(flatten)]
    pub frame: Frame,
    #[serde(default)]
    pub image_data: Option<String>,
}

fn default_font_size() -> f64 {
    16.0
}

/// Literal or data-bound text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextProps {
    #[serde(flatten)]
    pub frame: Frame,
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default)]
    pub color: Color,
    /// Text alignment: "left", "center", "right".
    #[serde(default)]
    pub text_align: Option<String>,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub underline: bool,
    /// Record variable to bind; takes precedence over `text`.
    #[serde(default)]
    pub variable: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl TextProps {
    pub fn new(frame: Frame, font_size: f64) -> Self {
        Self {
            frame,
            font_size,
            color: Color::BLACK,
            text_align: None,
            bold: false,
            italic: false,
            underline: false,
            variable: None,
            text: None,
        }
    }

    /// Parsed alignment; unknown values align left.
    pub fn alignment(&self) -> TextAlign {
        match self.text_align.as_deref() {
            Some("center") | Some("centre") => TextAlign::Center,
            Some("right") | Some("end") => TextAlign::Right,
            _ => TextAlign::Left,
        }
    }
}

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// An sRGB color with straight alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const RED: Color = Color::rgb(255, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn to_rgba(self) -> image::Rgba<u8> {
        image::Rgba([self.r, self.g, self.b, self.a])
    }

    fn named(name: &str) -> Option<Self> {
        Some(match name {
            "black" => Color::BLACK,
            "white" => Color::WHITE,
            "red" => Color::RED,
            "green" => Color::rgb(0, 128, 0),
            "blue" => Color::rgb(0, 0, 255),
            "yellow" => Color::rgb(255, 255, 0),
            "orange" => Color::rgb(255, 165, 0),
            "gray" | "grey" => Color::rgb(128, 128, 128),
            "transparent" => Color { r: 0, g: 0, b: 0, a: 0 },
            _ => return None,
        })
    }
}

fn hex_pair(s: &str) -> Option<u8> {
    u8::from_str_radix(s, 16).ok()
}

fn parse_hex(hex: &str) -> Option<Color> {
    if !hex.is_ascii() {
        return None;
    }
    let expanded: String = match hex.len() {
        3 | 4 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 | 8 => hex.to_string(),
        _ => return None,
    };
    let r = hex_pair(&expanded[0..2])?;
    let g = hex_pair(&expanded[2..4])?;
    let b = hex_pair(&expanded[4..6])?;
    let a = if expanded.len() == 8 {
        hex_pair(&expanded[6..8])?
    } else {
        255
    };
    Some(Color { r, g, b, a })
}

fn parse_functional(args: &str) -> Option<Color> {
    let parts: Vec<&str> = args.split(',').map(str::trim).collect();
    if parts.len() != 3 && parts.len() != 4 {
        return None;
    }
    let channel = |s: &str| s.parse::<f64>().ok().map(|v| v.clamp(0.0, 255.0).round() as u8);
    let r = channel(parts[0])?;
    let g = channel(parts[1])?;
    let b = channel(parts[2])?;
    let a = match parts.get(3) {
        Some(s) => (s.parse::<f64>().ok()?.clamp(0.0, 1.0) * 255.0).round() as u8,
        None => 255,
    };
    Some(Color { r, g, b, a })
}

impl FromStr for Color {
    type Err = String;

    /// Accepts `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, `rgb(r, g, b)`,
    /// `rgba(r, g, b, a)` and a handful of named colors.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        let parsed = if let Some(hex) = s.strip_prefix('#') {
            parse_hex(hex)
        } else if let Some(args) = s.strip_prefix("rgba(").and_then(|r| r.strip_suffix(')')) {
            parse_functional(args)
        } else if let Some(args) = s.strip_prefix("rgb(").and_then(|r| r.strip_suffix(')')) {
            parse_functional(args)
        } else {
            Color::named(&s)
        };
        parsed.ok_or_else(|| format!("unrecognized color '{}'", s))
    }
}

impl Serialize for Color {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let hex = if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        };
        serializer.serialize_str(&hex)
    }
}

struct ColorVisitor;

impl<'de> Visitor<'de> for ColorVisitor {
    type Value = Color;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a CSS color string such as #RRGGBB or rgb(r, g, b)")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        v.parse::<Color>().map_err(E::custom)
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Color::default())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Color, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ColorVisitor)
    }
}
