//! Target registry - maps layers onto slash-delimited target paths
//!
//! The registry is a flat map keyed by path. There is no tree: the parent of a
//! path is found lexically by truncating at the last `/` until a registered
//! path (ultimately the always-present root `/`) is reached.

use glam::{UVec2, Vec2};
use std::collections::{BTreeMap, HashMap};

use crate::error::TargetError;
use crate::models::Layer;

/// Path of the root target, always registered
pub const ROOT_PATH: &str = "/";

/// Where a target's pivot data came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PivotSource {
    /// Not resolved yet
    Unresolved,
    /// Computed from the target's own pivot layer
    Own,
    /// Copied from the nearest ancestor with its own pivot layer
    Inherited { from: String },
    /// No pivot layer anywhere up the path; the configured alignment is used
    Default,
}

impl std::fmt::Display for PivotSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PivotSource::Unresolved => write!(f, "unresolved"),
            PivotSource::Own => write!(f, "own"),
            PivotSource::Inherited { from } => write!(f, "inherited from {}", from),
            PivotSource::Default => write!(f, "default"),
        }
    }
}

/// A named render destination and everything computed for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub path: String,
    /// Prefix of packed sprite names (`{base}_{frame}`)
    pub sprite_base_name: String,
    /// Pivot layer, own or inherited
    pub pivot_layer: Option<usize>,
    pub pivot_source: PivotSource,
    /// Texture-space pivots, keyed by frame
    pub pivots: BTreeMap<usize, Vec2>,
    /// Parent-relative pivot offsets in pixels, keyed by frame
    pub offsets: BTreeMap<usize, Vec2>,
    /// Pivots normalized against the packed sprite, keyed by frame
    pub pivot_norms: BTreeMap<usize, Vec2>,
    /// Packed sprite size in pixels, keyed by frame
    pub dimensions: BTreeMap<usize, UVec2>,
    /// Content layers mapped to this path, ascending index
    pub content_layers: Vec<usize>,
    /// Number of pivot layers that resolved to this path (accepted or not)
    pub pivot_layer_count: usize,
}

impl Target {
    pub fn new(path: &str, asset_name: &str) -> Self {
        Self {
            path: path.to_string(),
            sprite_base_name: sprite_base_name(asset_name, path),
            pivot_layer: None,
            pivot_source: PivotSource::Unresolved,
            pivots: BTreeMap::new(),
            offsets: BTreeMap::new(),
            pivot_norms: BTreeMap::new(),
            dimensions: BTreeMap::new(),
            content_layers: Vec::new(),
            pivot_layer_count: 0,
        }
    }

    /// Whether the target has a pivot layer of its own
    pub fn has_own_pivot(&self) -> bool {
        self.pivot_source == PivotSource::Own
    }

    /// Pivot for a frame, holding the most recent earlier pivot when the frame
    /// has none of its own.
    pub fn pivot_at(&self, frame: usize) -> Option<Vec2> {
        self.pivots.range(..=frame).next_back().map(|(_, p)| *p)
    }

    /// Packed sprite name for a frame
    pub fn sprite_name(&self, frame: usize) -> String {
        format!("{}_{}", self.sprite_base_name, frame)
    }

    /// Offset for a frame converted to world units
    pub fn offset_in_units(&self, frame: usize, pixels_per_unit: f32) -> Option<Vec2> {
        self.offsets.get(&frame).map(|o| *o / pixels_per_unit)
    }
}

/// Build the sprite name prefix for a path: separators become `_`.
///
/// The root target uses the asset name alone.
pub fn sprite_base_name(asset_name: &str, path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        asset_name.to_string()
    } else {
        format!("{}_{}", asset_name, trimmed.replace('/', "_"))
    }
}

/// Lexical parent of a path; `None` for the root
pub fn parent_path(path: &str) -> Option<&str> {
    if path == ROOT_PATH || path.is_empty() {
        return None;
    }
    match path.rfind('/') {
        Some(0) | None => Some(ROOT_PATH),
        Some(i) => Some(&path[..i]),
    }
}

/// Resolve a path parameter against a parent path.
///
/// Absolute parameters (leading `/`) are used verbatim after trimming a single
/// trailing slash; relative ones are appended to the parent.
pub fn join_path(parent: &str, param: &str) -> String {
    let trimmed = |p: &str| -> String {
        match p.strip_suffix('/') {
            Some(rest) if !rest.is_empty() => rest.to_string(),
            _ => p.to_string(),
        }
    };

    if param.starts_with('/') {
        return trimmed(param);
    }

    let relative = trimmed(param);
    if parent == ROOT_PATH {
        format!("/{}", relative)
    } else {
        format!("{}/{}", parent, relative)
    }
}

/// Registry of targets for one import run.
#[derive(Debug, Clone)]
pub struct TargetRegistry {
    asset_name: String,
    targets: HashMap<String, Target>,
    /// Paths in discovery order
    order: Vec<String>,
    /// Resolved path per layer index
    layer_paths: HashMap<usize, String>,
}

impl TargetRegistry {
    pub fn new(asset_name: &str) -> Self {
        let mut registry = Self {
            asset_name: asset_name.to_string(),
            targets: HashMap::new(),
            order: Vec::new(),
            layer_paths: HashMap::new(),
        };
        registry.upsert(ROOT_PATH);
        registry
    }

    /// Get or create the target for a path
    pub fn upsert(&mut self, path: &str) -> &mut Target {
        if !self.targets.contains_key(path) {
            log::debug!("registering target '{}'", path);
            self.order.push(path.to_string());
        }
        let asset_name = &self.asset_name;
        self.targets
            .entry(path.to_string())
            .or_insert_with(|| Target::new(path, asset_name))
    }

    /// Resolve a layer to its target path and register the target.
    ///
    /// Without a path parameter the path is inherited from the parent layer,
    /// which must already be resolved. Top-level layers default to the root.
    pub fn resolve(&mut self, layer: &Layer, path_param: Option<&str>) -> Result<String, TargetError> {
        let parent = match layer.parent {
            Some(parent) => self
                .layer_paths
                .get(&parent)
                .cloned()
                .ok_or_else(|| TargetError::UnresolvedParent {
                    layer: layer.index,
                    name: layer.name.clone(),
                    parent,
                })?,
            None => ROOT_PATH.to_string(),
        };

        let path = match path_param {
            Some(param) => join_path(&parent, param),
            None => parent,
        };

        if let Some(existing) = self.layer_paths.get(&layer.index) {
            if *existing != path {
                return Err(TargetError::PathConflict {
                    layer: layer.index,
                    existing: existing.clone(),
                    requested: path,
                });
            }
        }

        self.layer_paths.insert(layer.index, path.clone());
        self.upsert(&path);
        Ok(path)
    }

    /// Record a pixel-bearing layer for a target
    pub fn add_content_layer(&mut self, path: &str, layer: usize) {
        let target = self.upsert(path);
        if let Err(pos) = target.content_layers.binary_search(&layer) {
            target.content_layers.insert(pos, layer);
        }
    }

    /// Make `layer` the pivot layer of `path`; a second one is rejected.
    pub fn register_pivot(&mut self, path: &str, layer: usize) -> Result<(), TargetError> {
        let target = self.upsert(path);
        target.pivot_layer_count += 1;
        match target.pivot_layer {
            Some(existing) => Err(TargetError::DuplicatePivot {
                path: path.to_string(),
                layer,
                existing,
            }),
            None => {
                target.pivot_layer = Some(layer);
                Ok(())
            }
        }
    }

    /// Nearest registered ancestor of `path`.
    ///
    /// Strips one segment at a time; always terminates at the root. Returns
    /// `None` only for the root itself.
    pub fn find_parent_target(&self, path: &str) -> Option<&str> {
        let mut current = parent_path(path)?;
        loop {
            if let Some((key, _)) = self.targets.get_key_value(current) {
                return Some(key.as_str());
            }
            current = parent_path(current)?;
        }
    }

    /// Nearest ancestor (excluding `path`) whose pivot comes from its own layer
    pub fn nearest_pivot_ancestor(&self, path: &str) -> Option<&Target> {
        let mut current = self.find_parent_target(path)?;
        loop {
            let target = self.targets.get(current)?;
            if target.has_own_pivot() {
                return Some(target);
            }
            current = self.find_parent_target(current)?;
        }
    }

    pub fn get(&self, path: &str) -> Option<&Target> {
        self.targets.get(path)
    }

    pub fn get_mut(&mut self, path: &str) -> Option<&mut Target> {
        self.targets.get_mut(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.targets.contains_key(path)
    }

    pub fn root(&self) -> Option<&Target> {
        self.targets.get(ROOT_PATH)
    }

    /// Resolved path of a layer
    pub fn layer_path(&self, layer: usize) -> Option<&str> {
        self.layer_paths.get(&layer).map(String::as_str)
    }

    /// Paths in discovery order
    pub fn paths(&self) -> &[String] {
        &self.order
    }

    /// Targets in discovery order
    pub fn iter(&self) -> impl Iterator<Item = &Target> {
        self.order.iter().filter_map(|p| self.targets.get(p))
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
