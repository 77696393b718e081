//! Source model: frames, layers and cels as supplied by the drawing-file parser
//!
//! The model is read-only for the whole import. Cel origins and pixel rows use
//! the source file's top-left-origin convention; conversion into bottom-left
//! texture space happens in [`crate::geometry`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;

use crate::error::ImportError;

/// RGBA color with channels in `0.0..=1.0`
pub type Color = [f32; 4];

/// What a layer is in the source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    /// Pixel-bearing layer
    #[default]
    Content,
    /// Folder of other layers
    Group,
    /// Annotation-only layer (pivot, event, data, ...)
    Meta,
}

/// An argument inside an annotation, e.g. `"arm"` or `2` in `@event("step", 2)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnnotationParam {
    Number(f64),
    Text(String),
}

impl AnnotationParam {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AnnotationParam::Text(s) => Some(s),
            AnnotationParam::Number(_) => None,
        }
    }
}

/// A layer annotation: a name plus positional parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<AnnotationParam>,
}

impl Annotation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.params.push(AnnotationParam::Text(text.into()));
        self
    }

    /// First text parameter, used as a target path
    pub fn path_param(&self) -> Option<&str> {
        self.params.iter().find_map(AnnotationParam::as_text)
    }
}

/// A layer definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub index: usize,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<usize>,
    /// Nesting depth, 0 for top-level layers
    #[serde(default)]
    pub depth: u32,
    #[serde(default)]
    pub kind: LayerKind,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    /// Explicit annotation; when absent, `@name(...)` layer names are parsed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<Annotation>,
}

impl Layer {
    pub fn new(index: usize, name: impl Into<String>, kind: LayerKind) -> Self {
        Self {
            index,
            name: name.into(),
            parent: None,
            depth: 0,
            kind,
            visible: true,
            opacity: 1.0,
            annotation: None,
        }
    }

    pub fn with_parent(mut self, parent: usize, depth: u32) -> Self {
        self.parent = Some(parent);
        self.depth = depth;
        self
    }

    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotation = Some(annotation);
        self
    }
}

fn default_true() -> bool {
    true
}

fn default_opacity() -> f32 {
    1.0
}

/// One layer's pixel contribution to one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cel {
    /// Left edge on the canvas
    pub x: i32,
    /// Top edge on the canvas (top-left origin)
    pub y: i32,
    pub width: u32,
    pub height: u32,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    /// Row-major, top row first
    pub pixels: Vec<Color>,
}

impl Cel {
    pub fn new(x: i32, y: i32, width: u32, height: u32, pixels: Vec<Color>) -> Self {
        Self {
            x,
            y,
            width,
            height,
            opacity: 1.0,
            pixels,
        }
    }

    /// A cel filled with a single color
    pub fn filled(x: i32, y: i32, width: u32, height: u32, color: Color) -> Self {
        Self::new(x, y, width, height, vec![color; (width * height) as usize])
    }

    /// Read the pixel at `(col, row)` in cel-local coordinates.
    ///
    /// Out-of-range reads are fatal for the import.
    pub fn pixel(&self, col: u32, row: u32, layer: usize, frame: usize) -> Result<Color, ImportError> {
        let out_of_range = || ImportError::PixelOutOfRange {
            layer,
            frame,
            x: col,
            y: row,
            width: self.width,
            height: self.height,
        };
        if col >= self.width || row >= self.height {
            return Err(out_of_range());
        }
        self.pixels
            .get((row * self.width + col) as usize)
            .copied()
            .ok_or_else(out_of_range)
    }
}

/// A frame: duration plus the cels present in it, keyed by layer index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub index: usize,
    /// Duration in milliseconds
    #[serde(default = "default_duration")]
    pub duration: u32,
    #[serde(default)]
    pub cels: BTreeMap<usize, Cel>,
}

fn default_duration() -> u32 {
    100
}

impl Frame {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            duration: default_duration(),
            cels: BTreeMap::new(),
        }
    }

    pub fn with_cel(mut self, layer: usize, cel: Cel) -> Self {
        self.cels.insert(layer, cel);
        self
    }
}

/// A named, inclusive frame range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameTag {
    pub name: String,
    pub from: usize,
    pub to: usize,
}

impl FrameTag {
    pub fn contains(&self, frame: usize) -> bool {
        frame >= self.from && frame <= self.to
    }
}

/// The whole source asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceModel {
    /// Asset name, used as the sprite name prefix
    #[serde(default = "default_name")]
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub frames: Vec<Frame>,
    pub layers: Vec<Layer>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<FrameTag>,
}

fn default_name() -> String {
    "sprite".to_string()
}

impl SourceModel {
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            frames: Vec::new(),
            layers: Vec::new(),
            tags: Vec::new(),
        }
    }

    /// Read a JSON-encoded model and check its structural consistency.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ImportError> {
        let model: SourceModel = serde_json::from_reader(reader)?;
        model.validate()?;
        Ok(model)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ImportError> {
        let model: SourceModel = serde_json::from_str(json)?;
        model.validate()?;
        Ok(model)
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.iter().find(|l| l.index == index)
    }

    /// Check canvas size, cel buffer sizes and cel layer references.
    pub fn validate(&self) -> Result<(), ImportError> {
        if self.width == 0 || self.height == 0 {
            return Err(ImportError::InvalidCanvas {
                width: self.width,
                height: self.height,
            });
        }

        for (position, frame) in self.frames.iter().enumerate() {
            if frame.index != position {
                return Err(ImportError::FrameOutOfOrder {
                    position,
                    index: frame.index,
                });
            }
            for (&layer, cel) in &frame.cels {
                if self.layer(layer).is_none() {
                    return Err(ImportError::UnknownCelLayer {
                        frame: frame.index,
                        layer,
                    });
                }
                let expected = cel.width as usize * cel.height as usize;
                if cel.pixels.len() != expected {
                    return Err(ImportError::CelSizeMismatch {
                        layer,
                        frame: frame.index,
                        expected,
                        actual: cel.pixels.len(),
                    });
                }
            }
        }

        Ok(())
    }
}
