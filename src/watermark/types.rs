use chrono::NaiveDate;
use image::{DynamicImage, Rgba};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::date_format::DEFAULT_DATE_FORMAT;
use super::error::WatermarkError;

/// An opaque RGB color. Opacity comes from [`WatermarkSettings::transparency`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    pub const WHITE: Rgb = Rgb([255, 255, 255]);
    pub const BLACK: Rgb = Rgb([0, 0, 0]);

    /// Combine with an alpha byte.
    pub fn with_alpha(self, alpha: u8) -> Rgba<u8> {
        let [r, g, b] = self.0;
        Rgba([r, g, b, alpha])
    }

    fn named(name: &str) -> Option<Rgb> {
        let rgb = match name.to_ascii_lowercase().as_str() {
            "white" => [255, 255, 255],
            "black" => [0, 0, 0],
            "red" => [255, 0, 0],
            "blue" => [0, 0, 255],
            "yellow" => [255, 255, 0],
            "gray" | "grey" => [128, 128, 128],
            "green" => [0, 128, 0],
            _ => return None,
        };
        Some(Rgb(rgb))
    }
}

impl FromStr for Rgb {
    type Err = WatermarkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(rgb) = Rgb::named(s) {
            return Ok(rgb);
        }

        let hex = s.strip_prefix('#').unwrap_or(s);
        let invalid = || WatermarkError::InvalidSettings(format!("invalid color: {s:?}"));
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| invalid());
        match hex.len() {
            6 => Ok(Rgb([
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            ])),
            // #RGB shorthand, each digit doubled
            3 => {
                let mut out = [0u8; 3];
                for (slot, digit) in out.iter_mut().zip(hex.chars()) {
                    *slot = channel(&digit.to_string())? * 17;
                }
                Ok(Rgb(out))
            }
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for Rgb {
    type Error = WatermarkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "#{r:02X}{g:02X}{b:02X}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalAlign {
    Top,
    Middle,
    Bottom,
}

/// Where the text box sits relative to the image bounds and margins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AnchorPosition {
    TopLeft,
    TopCenter,
    TopRight,
    MiddleLeft,
    MiddleCenter,
    MiddleRight,
    BottomLeft,
    #[default]
    BottomCenter,
    BottomRight,
}

impl AnchorPosition {
    pub const ALL: [AnchorPosition; 9] = [
        AnchorPosition::TopLeft,
        AnchorPosition::TopCenter,
        AnchorPosition::TopRight,
        AnchorPosition::MiddleLeft,
        AnchorPosition::MiddleCenter,
        AnchorPosition::MiddleRight,
        AnchorPosition::BottomLeft,
        AnchorPosition::BottomCenter,
        AnchorPosition::BottomRight,
    ];

    pub fn horizontal(&self) -> HorizontalAlign {
        match self {
            AnchorPosition::TopLeft | AnchorPosition::MiddleLeft | AnchorPosition::BottomLeft => {
                HorizontalAlign::Left
            }
            AnchorPosition::TopCenter
            | AnchorPosition::MiddleCenter
            | AnchorPosition::BottomCenter => HorizontalAlign::Center,
            AnchorPosition::TopRight
            | AnchorPosition::MiddleRight
            | AnchorPosition::BottomRight => HorizontalAlign::Right,
        }
    }

    pub fn vertical(&self) -> VerticalAlign {
        match self {
            AnchorPosition::TopLeft | AnchorPosition::TopCenter | AnchorPosition::TopRight => {
                VerticalAlign::Top
            }
            AnchorPosition::MiddleLeft
            | AnchorPosition::MiddleCenter
            | AnchorPosition::MiddleRight => VerticalAlign::Middle,
            AnchorPosition::BottomLeft
            | AnchorPosition::BottomCenter
            | AnchorPosition::BottomRight => VerticalAlign::Bottom,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AnchorPosition::TopLeft => "top-left",
            AnchorPosition::TopCenter => "top-center",
            AnchorPosition::TopRight => "top-right",
            AnchorPosition::MiddleLeft => "middle-left",
            AnchorPosition::MiddleCenter => "middle-center",
            AnchorPosition::MiddleRight => "middle-right",
            AnchorPosition::BottomLeft => "bottom-left",
            AnchorPosition::BottomCenter => "bottom-center",
            AnchorPosition::BottomRight => "bottom-right",
        }
    }
}

impl FromStr for AnchorPosition {
    type Err = WatermarkError;

    /// Accepts "bottom-right", "bottom_right", "BottomRight" and "Bottom Right".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .map(|c| c.to_ascii_lowercase())
            .collect();

        AnchorPosition::ALL
            .into_iter()
            .find(|anchor| anchor.name().replace('-', "") == normalized)
            .ok_or_else(|| WatermarkError::InvalidSettings(format!("unknown position: {s:?}")))
    }
}

impl TryFrom<String> for AnchorPosition {
    type Error = WatermarkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AnchorPosition> for String {
    fn from(value: AnchorPosition) -> Self {
        value.name().to_string()
    }
}

impl fmt::Display for AnchorPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Style configuration for a date stamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkSettings {
    pub font_family: String,
    /// Font size in points, rendered at 96 DPI
    pub font_size: f32,
    pub bold: bool,
    pub italic: bool,
    pub text_color: Rgb,
    pub shadow_color: Rgb,
    /// Opacity applied to both text and shadow, in [0, 1]
    pub transparency: f32,
    pub has_drop_shadow: bool,
    pub shadow_offset_x: f32,
    pub shadow_offset_y: f32,
    pub position: AnchorPosition,
    pub date_format: String,
    pub margin_x: f32,
    pub margin_y: f32,
}

impl Default for WatermarkSettings {
    fn default() -> Self {
        Self {
            font_family: "Arial".to_string(),
            font_size: 24.0,
            bold: false,
            italic: false,
            text_color: Rgb::WHITE,
            shadow_color: Rgb::BLACK,
            transparency: 0.8,
            has_drop_shadow: true,
            shadow_offset_x: 2.0,
            shadow_offset_y: 2.0,
            position: AnchorPosition::default(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            margin_x: 10.0,
            margin_y: 10.0,
        }
    }
}

impl WatermarkSettings {
    pub fn validate(&self) -> Result<(), WatermarkError> {
        if !(0.0..=1.0).contains(&self.transparency) {
            return Err(WatermarkError::InvalidSettings(format!(
                "transparency must be within [0, 1], got {}",
                self.transparency
            )));
        }
        if !self.font_size.is_finite() || self.font_size <= 0.0 {
            return Err(WatermarkError::InvalidSettings(format!(
                "font size must be positive, got {}",
                self.font_size
            )));
        }
        for (name, margin) in [("margin_x", self.margin_x), ("margin_y", self.margin_y)] {
            if !margin.is_finite() || margin < 0.0 {
                return Err(WatermarkError::InvalidSettings(format!(
                    "{name} must be non-negative, got {margin}"
                )));
            }
        }
        if !self.shadow_offset_x.is_finite() || !self.shadow_offset_y.is_finite() {
            return Err(WatermarkError::InvalidSettings(
                "shadow offset must be finite".to_string(),
            ));
        }
        Ok(())
    }

    /// Alpha byte shared by the text and shadow layers.
    pub fn alpha(&self) -> u8 {
        (255.0 * self.transparency.clamp(0.0, 1.0)).round() as u8
    }

    pub fn text_rgba(&self) -> Rgba<u8> {
        self.text_color.with_alpha(self.alpha())
    }

    pub fn shadow_rgba(&self) -> Rgba<u8> {
        self.shadow_color.with_alpha(self.alpha())
    }

    pub fn font(&self) -> FontDescriptor {
        FontDescriptor {
            family: self.font_family.clone(),
            size: self.font_size,
            bold: self.bold,
            italic: self.italic,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FontDescriptor {
    pub family: String,
    /// Size in points
    pub size: f32,
    pub bold: bool,
    pub italic: bool,
}

/// Pixel extent of a laid-out line of text
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextExtent {
    pub width: f32,
    pub height: f32,
}

impl TextExtent {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Top-left corner of the text box. May be negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

/// One render call's inputs. Nothing here outlives the call.
#[derive(Debug, Clone, Copy)]
pub struct CompositeRequest<'a> {
    pub source: &'a DynamicImage,
    pub date: NaiveDate,
    pub settings: &'a WatermarkSettings,
}

impl<'a> CompositeRequest<'a> {
    pub fn new(source: &'a DynamicImage, date: NaiveDate, settings: &'a WatermarkSettings) -> Self {
        Self {
            source,
            date,
            settings,
        }
    }
}
