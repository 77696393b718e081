//! Rigatlas - layered frame art to a packed sprite atlas plus per-frame
//! pivot and parent-offset rigging data
//!
//! The entry point is [`pipeline::import`]: it maps layers onto targets,
//! computes pivots and offsets, composites and deduplicates frame images,
//! packs them and normalizes the pivots against the packed sprites.

pub mod annotation;
pub mod atlas;
pub mod cli;
pub mod compositor;
pub mod config;
pub mod error;
pub mod geometry;
pub mod models;
pub mod normalize;
pub mod offset;
pub mod output;
pub mod pipeline;
pub mod pivot;
pub mod target;

pub use error::{ImportError, TargetError, Warning, WarningKind};
pub use pipeline::{import, ImportResult};
