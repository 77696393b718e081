//! Configuration schema types for `rigatlas.toml`
//!
//! Defines the import settings and their validation rules.

use clap::ValueEnum;
use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::atlas::MAX_ATLAS_SIZE;

/// Where a pixel's coordinate sits within the pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PixelOrigin {
    /// Coordinates refer to the pixel center (adds half a pixel)
    #[default]
    Center,
    /// Coordinates refer to the pixel's bottom-left corner
    Corner,
}

impl PixelOrigin {
    /// Offset added to a pixel coordinate before normalization
    pub fn half_pixel(self) -> f32 {
        match self {
            PixelOrigin::Center => 0.5,
            PixelOrigin::Corner => 0.0,
        }
    }
}

/// Anchor used as the pivot of targets with no pivot layer anywhere up their
/// path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Alignment {
    TopLeft,
    #[serde(alias = "top-center")]
    Top,
    TopRight,
    Left,
    Center,
    Right,
    BottomLeft,
    #[default]
    #[serde(alias = "bottom-center")]
    Bottom,
    BottomRight,
    /// Fraction of the canvas, `(0, 0)` is bottom-left
    Custom { x: f32, y: f32 },
}

/// The named anchors of [`Alignment`], as accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NamedAlignment {
    TopLeft,
    #[value(alias = "top-center")]
    Top,
    TopRight,
    Left,
    Center,
    Right,
    BottomLeft,
    #[value(alias = "bottom-center")]
    Bottom,
    BottomRight,
}

impl From<NamedAlignment> for Alignment {
    fn from(name: NamedAlignment) -> Self {
        match name {
            NamedAlignment::TopLeft => Alignment::TopLeft,
            NamedAlignment::Top => Alignment::Top,
            NamedAlignment::TopRight => Alignment::TopRight,
            NamedAlignment::Left => Alignment::Left,
            NamedAlignment::Center => Alignment::Center,
            NamedAlignment::Right => Alignment::Right,
            NamedAlignment::BottomLeft => Alignment::BottomLeft,
            NamedAlignment::Bottom => Alignment::Bottom,
            NamedAlignment::BottomRight => Alignment::BottomRight,
        }
    }
}

impl Alignment {
    /// Fraction of the canvas in bottom-left-origin space
    pub fn fraction(self) -> Vec2 {
        match self {
            Alignment::TopLeft => Vec2::new(0.0, 1.0),
            Alignment::Top => Vec2::new(0.5, 1.0),
            Alignment::TopRight => Vec2::new(1.0, 1.0),
            Alignment::Left => Vec2::new(0.0, 0.5),
            Alignment::Center => Vec2::new(0.5, 0.5),
            Alignment::Right => Vec2::new(1.0, 0.5),
            Alignment::BottomLeft => Vec2::new(0.0, 0.0),
            Alignment::Bottom => Vec2::new(0.5, 0.0),
            Alignment::BottomRight => Vec2::new(1.0, 0.0),
            Alignment::Custom { x, y } => Vec2::new(x, y),
        }
    }
}

/// Import settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Padding between packed sprites in pixels
    #[serde(default = "default_border")]
    pub border: u32,
    /// Pivot used when no pivot layer exists up a target's path
    #[serde(default)]
    pub default_alignment: Alignment,
    #[serde(default)]
    pub pixel_origin: PixelOrigin,
    /// Trim frames to their content; when false every frame occupies the full canvas
    #[serde(default = "default_true")]
    pub dense_packed: bool,
    /// Pixels per world unit for offset conversion
    #[serde(default = "default_pixels_per_unit")]
    pub pixels_per_unit: f32,
    /// Atlas size above which a capacity warning is raised
    #[serde(default = "default_atlas_warn_size")]
    pub atlas_warn_size: u32,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            border: default_border(),
            default_alignment: Alignment::default(),
            pixel_origin: PixelOrigin::default(),
            dense_packed: default_true(),
            pixels_per_unit: default_pixels_per_unit(),
            atlas_warn_size: default_atlas_warn_size(),
        }
    }
}

fn default_border() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

fn default_pixels_per_unit() -> f32 {
    32.0
}

fn default_atlas_warn_size() -> u32 {
    2048
}

/// Top-level `rigatlas.toml` document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RigatlasConfig {
    #[serde(default)]
    pub import: ImportConfig,
}

impl ImportConfig {
    /// Validate settings, returning every problem found
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if let Alignment::Custom { x, y } = self.default_alignment {
            if !(0.0..=1.0).contains(&x) || !(0.0..=1.0).contains(&y) {
                errors.push(format!(
                    "import.default_alignment: custom fraction ({}, {}) must be within 0..1",
                    x, y
                ));
            }
        }
        if self.border >= MAX_ATLAS_SIZE {
            errors.push(format!(
                "import.border: must be below the atlas limit {}, got {}",
                MAX_ATLAS_SIZE, self.border
            ));
        }
        if self.pixels_per_unit.is_nan() || self.pixels_per_unit <= 0.0 {
            errors.push(format!(
                "import.pixels_per_unit: must be positive, got {}",
                self.pixels_per_unit
            ));
        }
        if !self.atlas_warn_size.is_power_of_two() {
            errors.push(format!(
                "import.atlas_warn_size: must be a power of two, got {}",
                self.atlas_warn_size
            ));
        }

        errors
    }
}
