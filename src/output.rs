//! Atlas PNG + JSON metadata output and file path generation

use glam::{UVec2, Vec2};
use image::RgbaImage;
use serde::Serialize;
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::FrameTag;
use crate::normalize::PackedSprite;
use crate::pipeline::ImportResult;
use crate::target::Target;

/// Error type for output operations
#[derive(Debug, Error)]
pub enum OutputError {
    /// IO error during file operations
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Image encoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    /// Metadata encoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Per-frame rigging data of one target
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameMetadata {
    pub frame: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pivot: Option<Vec2>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<Vec2>,
    /// Offset in world units
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset_units: Option<Vec2>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pivot_norm: Option<Vec2>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<UVec2>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetMetadata {
    pub path: String,
    pub sprite_base_name: String,
    pub pivot_source: String,
    pub frames: Vec<FrameMetadata>,
}

impl TargetMetadata {
    pub fn from_target(target: &Target, pixels_per_unit: f32) -> Self {
        let frames: BTreeSet<usize> = target
            .pivots
            .keys()
            .chain(target.offsets.keys())
            .chain(target.pivot_norms.keys())
            .chain(target.dimensions.keys())
            .copied()
            .collect();

        Self {
            path: target.path.clone(),
            sprite_base_name: target.sprite_base_name.clone(),
            pivot_source: target.pivot_source.to_string(),
            frames: frames
                .into_iter()
                .map(|frame| FrameMetadata {
                    frame,
                    pivot: target.pivots.get(&frame).copied(),
                    offset: target.offsets.get(&frame).copied(),
                    offset_units: target.offset_in_units(frame, pixels_per_unit),
                    pivot_norm: target.pivot_norms.get(&frame).copied(),
                    dimensions: target.dimensions.get(&frame).copied(),
                })
                .collect(),
        }
    }
}

/// Everything written next to the atlas image
#[derive(Debug, Clone, Serialize)]
pub struct AtlasMetadata<'a> {
    pub name: &'a str,
    /// File name of the atlas image, relative to the metadata file
    pub image: String,
    pub size: u32,
    pub pixels_per_unit: f32,
    pub sprites: &'a [PackedSprite],
    pub targets: Vec<TargetMetadata>,
    pub tags: &'a [FrameTag],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl<'a> AtlasMetadata<'a> {
    pub fn new(result: &'a ImportResult, image: &Path, pixels_per_unit: f32) -> Self {
        let image = image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            name: &result.name,
            image,
            size: result.atlas_size,
            pixels_per_unit,
            sprites: &result.sprites,
            targets: result
                .registry
                .iter()
                .map(|t| TargetMetadata::from_target(t, pixels_per_unit))
                .collect(),
            tags: &result.tags,
            warnings: result.warnings.iter().map(|w| w.to_string()).collect(),
        }
    }
}

/// Create the parent directory of `path` if it doesn't exist
fn ensure_parent(path: &Path) -> Result<(), OutputError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Save an RGBA image to a PNG file, creating parent directories.
pub fn save_png(image: &RgbaImage, path: &Path) -> Result<(), OutputError> {
    ensure_parent(path)?;
    image.save(path)?;
    Ok(())
}

/// Write pretty-printed metadata JSON
pub fn save_metadata(metadata: &AtlasMetadata, path: &Path) -> Result<(), OutputError> {
    ensure_parent(path)?;
    let json = serde_json::to_string_pretty(metadata)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Paths of the atlas image and its metadata.
///
/// | Scenario | Output |
/// |----------|--------|
/// | No `-o` | `{input_dir}/{name}.png`, `{input_dir}/{name}.atlas.json` |
/// | `-o dir` | `dir/{name}.png`, `dir/{name}.atlas.json` |
pub fn generate_output_paths(input: &Path, name: &str, output_dir: Option<&Path>) -> (PathBuf, PathBuf) {
    let dir = match output_dir {
        Some(dir) => dir.to_path_buf(),
        None => input.parent().map(Path::to_path_buf).unwrap_or_default(),
    };
    (dir.join(format!("{}.png", name)), dir.join(format!("{}.atlas.json", name)))
}

/// Write the atlas and its metadata; returns the two paths written.
pub fn write_result(
    result: &ImportResult,
    input: &Path,
    output_dir: Option<&Path>,
    pixels_per_unit: f32,
) -> Result<(PathBuf, PathBuf), OutputError> {
    let (png, json) = generate_output_paths(input, &result.name, output_dir);
    save_png(&result.atlas, &png)?;
    save_metadata(&AtlasMetadata::new(result, &png, pixels_per_unit), &json)?;
    log::info!("wrote {} and {}", png.display(), json.display());
    Ok((png, json))
}
