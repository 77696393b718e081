//! Geometry helpers: alpha compositing, bounding boxes and coordinate spaces
//!
//! Three coordinate spaces are used throughout the import:
//! - cel space: top-left origin, as stored in the source file
//! - texture space: whole canvas, bottom-left origin (pivots live here)
//! - sprite space: normalized `0..1` fraction of a packed sprite rectangle

use glam::{IVec2, UVec2, Vec2};
use image::Rgba;

use crate::config::PixelOrigin;
use crate::models::Color;

/// Fully transparent color
pub const TRANSPARENT: Color = [0.0, 0.0, 0.0, 0.0];

/// Composite `src` over `dst` (both straight alpha).
///
/// The combined alpha is `a_dst + a_src * (1 - a_dst)`; color channels are
/// un-premultiplied by dividing by it.
pub fn blend_over(dst: Color, src: Color) -> Color {
    let src_alpha = src[3].clamp(0.0, 1.0);
    let dst_alpha = dst[3].clamp(0.0, 1.0);
    let out_alpha = dst_alpha + src_alpha * (1.0 - dst_alpha);

    if out_alpha <= 0.0 {
        return TRANSPARENT;
    }

    let composite = |s: f32, d: f32| -> f32 {
        let result = (s * src_alpha + d * dst_alpha * (1.0 - src_alpha)) / out_alpha;
        result.clamp(0.0, 1.0)
    };

    [
        composite(src[0], dst[0]),
        composite(src[1], dst[1]),
        composite(src[2], dst[2]),
        out_alpha,
    ]
}

/// Quantize a float color to 8-bit RGBA
pub fn to_rgba8(color: Color) -> Rgba<u8> {
    let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    Rgba([
        channel(color[0]),
        channel(color[1]),
        channel(color[2]),
        channel(color[3]),
    ])
}

/// Axis-aligned bounding box over integer pixel coordinates (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    min: IVec2,
    max: IVec2,
    empty: bool,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::new()
    }
}

impl BoundingBox {
    /// An empty box that contains no pixels
    pub fn new() -> Self {
        Self {
            min: IVec2::ZERO,
            max: IVec2::ZERO,
            empty: true,
        }
    }

    /// A box covering `width x height` pixels starting at `(x, y)`
    pub fn from_rect(x: i32, y: i32, width: u32, height: u32) -> Self {
        if width == 0 || height == 0 {
            return Self::new();
        }
        Self {
            min: IVec2::new(x, y),
            max: IVec2::new(x + width as i32 - 1, y + height as i32 - 1),
            empty: false,
        }
    }

    /// Grow the box to contain `(x, y)`
    pub fn include(&mut self, x: i32, y: i32) {
        let p = IVec2::new(x, y);
        if self.empty {
            self.min = p;
            self.max = p;
            self.empty = false;
        } else {
            self.min = self.min.min(p);
            self.max = self.max.max(p);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    /// Smallest corner; `(0, 0)` for an empty box
    pub fn min(&self) -> IVec2 {
        self.min
    }

    /// Width and height in pixels.
    ///
    /// An empty box collapses to a single pixel at the origin.
    pub fn size(&self) -> UVec2 {
        if self.empty {
            UVec2::ONE
        } else {
            (self.max - self.min + IVec2::ONE).as_uvec2()
        }
    }
}

/// Convert a cel-local pixel into texture space.
///
/// `cel_origin` is the cel's top-left corner on the canvas (top-left origin).
/// Returns `None` when the result does not fit an `i32`; such a pixel is far
/// outside any canvas.
pub fn cel_to_texture(canvas_height: u32, cel_origin: IVec2, col: u32, row: u32) -> Option<IVec2> {
    let canvas_x = i64::from(cel_origin.x) + i64::from(col);
    let canvas_y = i64::from(cel_origin.y) + i64::from(row);
    let texture_y = i64::from(canvas_height) - 1 - canvas_y;
    Some(IVec2::new(
        i32::try_from(canvas_x).ok()?,
        i32::try_from(texture_y).ok()?,
    ))
}

/// Map a texture-space point into a trimmed image's local pixel space
pub fn texture_to_local(point: Vec2, crop: IVec2) -> Vec2 {
    point - crop.as_vec2()
}

/// Normalize a texture-space pivot against a trimmed sprite.
///
/// The result is not clamped: pivots outside the sprite are valid.
pub fn normalize_pivot(pivot: Vec2, crop: IVec2, size: UVec2, origin: PixelOrigin) -> Vec2 {
    let local = texture_to_local(pivot, crop) + Vec2::splat(origin.half_pixel());
    local / size.as_vec2()
}

/// Inverse of [`normalize_pivot`]
pub fn denormalize_pivot(norm: Vec2, crop: IVec2, size: UVec2, origin: PixelOrigin) -> Vec2 {
    norm * size.as_vec2() - Vec2::splat(origin.half_pixel()) + crop.as_vec2()
}
