//! Error and warning types for atlas imports
//!
//! Three tiers:
//! - [`ImportError`]: fatal for the current import run, no output is valid
//! - [`TargetError`]: structural problems that skip a single layer
//! - [`Warning`]: non-fatal diagnostics accumulated into the result

use std::fmt;
use thiserror::Error;

/// Category of a non-fatal diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// Layer hierarchy or annotation problem; the offending layer was skipped
    Structural,
    /// Pivot data that will likely mis-position a rendered part
    Geometric,
    /// Atlas grew past the soft size threshold
    Capacity,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarningKind::Structural => write!(f, "structural"),
            WarningKind::Geometric => write!(f, "geometric"),
            WarningKind::Capacity => write!(f, "capacity"),
        }
    }
}

/// A warning generated during an import
#[derive(Debug, Clone, PartialEq)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn structural(message: impl Into<String>) -> Self {
        Self::new(WarningKind::Structural, message)
    }

    pub fn geometric(message: impl Into<String>) -> Self {
        Self::new(WarningKind::Geometric, message)
    }

    pub fn capacity(message: impl Into<String>) -> Self {
        Self::new(WarningKind::Capacity, message)
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl From<TargetError> for Warning {
    fn from(e: TargetError) -> Self {
        Warning::structural(e.to_string())
    }
}

/// Structural problem while mapping a layer onto a target.
///
/// These never abort an import: the layer is skipped and the error is
/// downgraded to a [`Warning`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    /// Parent layer has not been resolved (or was skipped itself)
    #[error("layer {layer} ('{name}'): parent layer {parent} has no resolved target")]
    UnresolvedParent {
        layer: usize,
        name: String,
        parent: usize,
    },
    /// Layer was already resolved to a different path
    #[error("layer {layer}: already mapped to '{existing}', refusing to remap to '{requested}'")]
    PathConflict {
        layer: usize,
        existing: String,
        requested: String,
    },
    /// A second pivot layer was found for one target
    #[error("target '{path}': pivot layer {layer} ignored, layer {existing} is already its pivot")]
    DuplicatePivot {
        path: String,
        layer: usize,
        existing: usize,
    },
    /// Annotation name is not in the annotation table
    #[error("layer {layer} ('{name}'): unknown annotation '@{annotation}'")]
    UnknownAnnotation {
        layer: usize,
        name: String,
        annotation: String,
    },
    /// Annotation text could not be parsed
    #[error("layer {layer} ('{name}'): malformed annotation: {reason}")]
    MalformedAnnotation {
        layer: usize,
        name: String,
        reason: String,
    },
    /// Referenced layer does not exist in the model
    #[error("layer {0} does not exist")]
    UnknownLayer(usize),
}

/// Fatal error for a single import run.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ImportError {
    /// Pixel read outside a cel's buffer
    #[error("layer {layer}, frame {frame}: pixel ({x}, {y}) is outside the {width}x{height} cel")]
    PixelOutOfRange {
        layer: usize,
        frame: usize,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
    /// Cel pixel buffer does not match its declared size
    #[error("layer {layer}, frame {frame}: cel declares {expected} pixels but holds {actual}")]
    CelSizeMismatch {
        layer: usize,
        frame: usize,
        expected: usize,
        actual: usize,
    },
    /// A cel references a layer the model does not define
    #[error("frame {frame}: cel references unknown layer {layer}")]
    UnknownCelLayer { frame: usize, layer: usize },
    /// Frames must be listed in index order
    #[error("frame at position {position} has index {index}")]
    FrameOutOfOrder { position: usize, index: usize },
    /// Canvas has a zero dimension
    #[error("canvas size {width}x{height} is invalid")]
    InvalidCanvas { width: u32, height: u32 },
    /// An image cannot fit even in the largest supported atlas
    #[error("images do not fit in an atlas of {max_size}x{max_size}")]
    AtlasTooLarge { max_size: u32 },
    /// Model could not be read
    #[error("failed to read source model: {0}")]
    Model(#[from] serde_json::Error),
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_error_downgrades_to_structural_warning() {
        let err = TargetError::DuplicatePivot {
            path: "/body".to_string(),
            layer: 7,
            existing: 3,
        };
        let warning: Warning = err.into();
        assert_eq!(warning.kind, WarningKind::Structural);
        assert!(warning.message.contains("/body"));
        assert!(warning.message.contains("layer 3"));
    }

    #[test]
    fn test_warning_display() {
        let warning = Warning::capacity("atlas is 4096x4096");
        assert_eq!(warning.to_string(), "[capacity] atlas is 4096x4096");
    }

    #[test]
    fn test_import_error_display() {
        let err = ImportError::PixelOutOfRange {
            layer: 2,
            frame: 0,
            x: 5,
            y: 9,
            width: 4,
            height: 4,
        };
        assert_eq!(
            err.to_string(),
            "layer 2, frame 0: pixel (5, 9) is outside the 4x4 cel"
        );
    }
}
