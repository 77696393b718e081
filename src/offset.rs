//! Pivot inheritance and parent-relative offsets
//!
//! Resolution runs in two explicit phases so no target's offset is computed
//! before every pivot exists:
//! 1. [`resolve_pivots`]: own pivots from pivot layers, then inheritance
//! 2. [`resolve_offsets`]: per-frame offsets against the nearest pivot ancestor

use glam::Vec2;
use std::collections::BTreeMap;

use crate::config::Alignment;
use crate::error::{ImportError, Warning};
use crate::models::SourceModel;
use crate::pivot::compute_pivots;
use crate::target::{PivotSource, TargetRegistry};

/// Default pivot in texture pixels for a canvas of `width x height`
pub fn default_pivot(alignment: Alignment, width: u32, height: u32) -> Vec2 {
    alignment.fraction() * Vec2::new(width as f32, height as f32)
}

/// Compute per-frame offsets of a target against its parent's pivots.
///
/// - parent pivot present for the frame: `target - parent`
/// - parent has pivots, but not for this frame: zero, with a warning if the
///   target's own pivot moved since its previous frame (frame 0 compares
///   against the last frame)
/// - parent has no pivots at all: `target - default_pivot`
pub fn compute_offsets(
    parent_pivots: &BTreeMap<usize, Vec2>,
    target_pivots: &BTreeMap<usize, Vec2>,
    target_path: &str,
    frame_count: usize,
    default_pivot: Vec2,
) -> (BTreeMap<usize, Vec2>, Vec<Warning>) {
    let mut offsets = BTreeMap::new();
    let mut warnings = Vec::new();

    if parent_pivots.is_empty() {
        for (&frame, &pivot) in target_pivots {
            offsets.insert(frame, pivot - default_pivot);
        }
        return (offsets, warnings);
    }

    for (&frame, &pivot) in target_pivots {
        if let Some(parent) = parent_pivots.get(&frame) {
            offsets.insert(frame, pivot - *parent);
            continue;
        }

        let previous = if frame == 0 {
            frame_count.saturating_sub(1)
        } else {
            frame - 1
        };
        if previous != frame {
            if let Some(prev_pivot) = target_pivots.get(&previous) {
                if *prev_pivot != pivot {
                    warnings.push(Warning::geometric(format!(
                        "target '{}': pivot moves in frame {} but its parent has no pivot there; the part will drift",
                        target_path, frame
                    )));
                }
            }
        }

        offsets.insert(frame, Vec2::ZERO);
    }

    (offsets, warnings)
}

/// Phase 1: compute own pivots, then let every other target inherit.
///
/// Targets without a pivot layer copy the pivot map and layer of the nearest
/// ancestor that has one. With no such ancestor (not even the root), every
/// frame gets `default_pivot`.
pub fn resolve_pivots(
    registry: &mut TargetRegistry,
    model: &SourceModel,
    default_pivot: Vec2,
) -> Result<Vec<Warning>, ImportError> {
    let mut warnings = Vec::new();
    let paths = registry.paths().to_vec();

    for path in &paths {
        let Some(layer) = registry.get(path).and_then(|t| t.pivot_layer) else {
            continue;
        };
        let (pivots, pivot_warnings) = compute_pivots(model, layer)?;
        warnings.extend(pivot_warnings);

        if let Some(target) = registry.get_mut(path) {
            target.pivots = pivots;
            target.pivot_source = PivotSource::Own;
        }
    }

    for path in &paths {
        if registry.get(path).is_some_and(|t| t.has_own_pivot()) {
            continue;
        }

        let inherited = registry
            .nearest_pivot_ancestor(path)
            .map(|a| (a.path.clone(), a.pivot_layer, a.pivots.clone()));

        let Some(target) = registry.get_mut(path) else {
            continue;
        };
        match inherited {
            Some((from, layer, pivots)) => {
                log::debug!("target '{}' inherits pivot from '{}'", path, from);
                target.pivot_layer = layer;
                target.pivots = pivots;
                target.pivot_source = PivotSource::Inherited { from };
            }
            None => {
                log::debug!("target '{}' uses the default pivot", path);
                target.pivot_layer = None;
                target.pivots = (0..model.frame_count())
                    .map(|frame| (frame, default_pivot))
                    .collect();
                target.pivot_source = PivotSource::Default;
            }
        }
    }

    Ok(warnings)
}

/// Phase 2: offsets for every target.
///
/// Targets with their own pivot are measured against the nearest ancestor
/// that also has one. Targets sharing an ancestor's pivot (or the default)
/// sit exactly on it, so their offsets are zero.
pub fn resolve_offsets(
    registry: &mut TargetRegistry,
    frame_count: usize,
    default_pivot: Vec2,
) -> Vec<Warning> {
    let mut warnings = Vec::new();
    let empty = BTreeMap::new();

    for path in registry.paths().to_vec() {
        let Some(target) = registry.get(&path) else {
            continue;
        };

        let offsets = if target.has_own_pivot() {
            let parent_pivots = registry
                .nearest_pivot_ancestor(&path)
                .map(|a| &a.pivots)
                .unwrap_or(&empty);
            let (offsets, offset_warnings) = compute_offsets(
                parent_pivots,
                &target.pivots,
                &path,
                frame_count,
                default_pivot,
            );
            warnings.extend(offset_warnings);
            offsets
        } else {
            target.pivots.keys().map(|&frame| (frame, Vec2::ZERO)).collect()
        };

        if let Some(target) = registry.get_mut(&path) {
            target.offsets = offsets;
        }
    }

    warnings
}
