//! Normalization - packed sprite descriptors with 0..1 pivots

use glam::{IVec2, UVec2, Vec2};
use serde::Serialize;

use crate::atlas::{flip_y, Packing};
use crate::compositor::Image;
use crate::config::PixelOrigin;
use crate::geometry::{denormalize_pivot, normalize_pivot};
use crate::target::TargetRegistry;

/// A rectangle in the atlas, bottom-left origin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SpriteRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl SpriteRect {
    pub fn size(&self) -> UVec2 {
        UVec2::new(self.width, self.height)
    }
}

/// One packed sprite, per target/frame pair.
///
/// Deduplicated frames share `rect` and `image` but keep their own `crop`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackedSprite {
    /// `{sprite_base_name}_{frame}`
    pub name: String,
    pub target: String,
    pub frame: usize,
    pub rect: SpriteRect,
    /// Normalized pivot; may lie outside `0..1` when the pivot is off-sprite
    pub pivot: Vec2,
    /// Texture-space crop offset of the frame's trimmed image
    #[serde(skip)]
    pub crop: IVec2,
    /// Index of the distinct image backing this sprite
    #[serde(skip)]
    pub image: usize,
}

impl PackedSprite {
    /// Recover the texture-space pivot this sprite was normalized from
    pub fn texture_pivot(&self, origin: PixelOrigin) -> Vec2 {
        denormalize_pivot(self.pivot, self.crop, self.rect.size(), origin)
    }
}

/// Build sprite descriptors and fill each target's `pivot_norms` and
/// `dimensions`.
///
/// The pivot for a record is the target's pivot for that frame (held from an
/// earlier frame if missing, zero if there is none at all), shifted by the
/// record's own crop offset and divided by the packed size.
pub fn normalize(
    images: &[Image],
    packing: &Packing,
    registry: &mut TargetRegistry,
    origin: PixelOrigin,
) -> Vec<PackedSprite> {
    let mut sprites = Vec::new();

    for (index, (image, &(x, y))) in images.iter().zip(&packing.positions).enumerate() {
        let size = image.size();
        let rect = SpriteRect {
            x,
            y: flip_y(y, size.y, packing.size),
            width: size.x,
            height: size.y,
        };

        for record in &image.records {
            let Some(target) = registry.get_mut(&record.target) else {
                log::warn!("frame record for unknown target '{}'", record.target);
                continue;
            };

            let pivot = target.pivot_at(record.frame).unwrap_or(Vec2::ZERO);
            let norm = normalize_pivot(pivot, record.offset, size, origin);

            target.pivot_norms.insert(record.frame, norm);
            target.dimensions.insert(record.frame, size);

            sprites.push(PackedSprite {
                name: target.sprite_name(record.frame),
                target: record.target.clone(),
                frame: record.frame,
                rect,
                pivot: norm,
                crop: record.offset,
                image: index,
            });
        }
    }

    sprites
}
