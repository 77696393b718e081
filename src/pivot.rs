//! Pivot calculation - centroid of marked pixels on a pivot layer

use glam::{DVec2, IVec2, Vec2};
use std::collections::BTreeMap;

use crate::error::{ImportError, Warning};
use crate::geometry::cel_to_texture;
use crate::models::SourceModel;

/// Pixels at or below this alpha are not part of a pivot marker
pub const PIVOT_ALPHA_THRESHOLD: f32 = 0.1;

/// Compute the texture-space pivot of `layer` for every frame.
///
/// The pivot is the mean position of all pixels whose alpha exceeds
/// [`PIVOT_ALPHA_THRESHOLD`]. Frames without a cel on the layer are left out
/// silently (the pivot is unchanged there). Frames whose cel has no qualifying
/// pixel are left out with a warning.
pub fn compute_pivots(
    model: &SourceModel,
    layer: usize,
) -> Result<(BTreeMap<usize, Vec2>, Vec<Warning>), ImportError> {
    let mut pivots = BTreeMap::new();
    let mut warnings = Vec::new();

    for frame in &model.frames {
        let Some(cel) = frame.cels.get(&layer) else {
            continue;
        };

        let origin = IVec2::new(cel.x, cel.y);
        let mut sum = DVec2::ZERO;
        let mut count = 0u32;

        for row in 0..cel.height {
            for col in 0..cel.width {
                let pixel = cel.pixel(col, row, layer, frame.index)?;
                if pixel[3] <= PIVOT_ALPHA_THRESHOLD {
                    continue;
                }
                if let Some(p) = cel_to_texture(model.height, origin, col, row) {
                    sum += p.as_dvec2();
                    count += 1;
                }
            }
        }

        if count == 0 {
            warnings.push(Warning::geometric(format!(
                "pivot layer {} has a cel in frame {} but no marked pixels; the frame keeps its previous pivot",
                layer, frame.index
            )));
            continue;
        }

        pivots.insert(frame.index, (sum / count as f64).as_vec2());
    }

    log::debug!("pivot layer {}: {} frame pivot(s)", layer, pivots.len());
    Ok((pivots, warnings))
}
