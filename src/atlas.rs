//! Atlas packing - places composited frame images into one square texture
//!
//! Implements shelf bin packing. Images are placed in the order given (no
//! sorting, no rotation) so identical input always yields an identical atlas.

use image::{Rgba, RgbaImage};

use crate::compositor::Image;
use crate::error::ImportError;

/// Side length of the first atlas size tried
pub const INITIAL_ATLAS_SIZE: u32 = 128;

/// Largest atlas side length attempted before giving up
pub const MAX_ATLAS_SIZE: u32 = 16384;

/// Transparent color for atlas background
const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Result of packing: atlas side length and one position per input.
///
/// Positions are image-space top-left corners (y grows downward).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packing {
    pub size: u32,
    pub positions: Vec<(u32, u32)>,
}

/// The shelf currently being filled
#[derive(Debug, Default)]
struct Shelf {
    y: u32,
    height: u32,
    width_used: u32,
}

/// Pack `sizes` (width, height) into the smallest power-of-two square that
/// fits, starting at [`INITIAL_ATLAS_SIZE`] and doubling on failure.
///
/// `border` pixels are left between neighbouring images. Zero-width or
/// zero-height entries are placed at `(0, 0)` without using any space.
pub fn pack(sizes: &[(u32, u32)], border: u32) -> Result<Packing, ImportError> {
    let mut size = INITIAL_ATLAS_SIZE;

    loop {
        if let Some(positions) = try_pack(sizes, border, size) {
            log::debug!("packed {} image(s) into {}x{}", sizes.len(), size, size);
            return Ok(Packing { size, positions });
        }
        if size >= MAX_ATLAS_SIZE {
            return Err(ImportError::AtlasTooLarge {
                max_size: MAX_ATLAS_SIZE,
            });
        }
        log::debug!("images do not fit in {}x{}, doubling", size, size);
        size *= 2;
    }
}

/// Try to place every image in an atlas of side `size`
fn try_pack(sizes: &[(u32, u32)], border: u32, size: u32) -> Option<Vec<(u32, u32)>> {
    let mut positions = Vec::with_capacity(sizes.len());
    let mut shelf = Shelf::default();

    for &(w, h) in sizes {
        if w == 0 || h == 0 {
            positions.push((0, 0));
            continue;
        }
        if w > size {
            return None;
        }

        // Start a new shelf below the tallest image of the current one
        if shelf.width_used.checked_add(w)? > size {
            shelf = Shelf {
                y: shelf.y.checked_add(shelf.height)?.checked_add(border)?,
                height: 0,
                width_used: 0,
            };
        }
        if shelf.y.checked_add(h)? > size {
            return None;
        }

        positions.push((shelf.width_used, shelf.y));
        // Saturates; an image after a huge border then never fits this shelf
        shelf.width_used = shelf.width_used.saturating_add(w).saturating_add(border);
        shelf.height = shelf.height.max(h);
    }

    Some(positions)
}

/// Draw every image at its packed position into a fresh atlas
pub fn render_atlas(images: &[Image], packing: &Packing) -> RgbaImage {
    let mut atlas = RgbaImage::from_pixel(packing.size, packing.size, TRANSPARENT);
    for (image, &(x, y)) in images.iter().zip(&packing.positions) {
        copy_sprite_to_atlas(&mut atlas, &image.pixels, x, y);
    }
    atlas
}

/// Copy a sprite image to the atlas at the given position
fn copy_sprite_to_atlas(atlas: &mut RgbaImage, sprite: &RgbaImage, x: u32, y: u32) {
    for sy in 0..sprite.height() {
        for sx in 0..sprite.width() {
            let pixel = *sprite.get_pixel(sx, sy);
            if x + sx < atlas.width() && y + sy < atlas.height() {
                atlas.put_pixel(x + sx, y + sy, pixel);
            }
        }
    }
}

/// Convert an image-space top edge into a bottom-left-origin y coordinate
pub fn flip_y(y: u32, height: u32, atlas_size: u32) -> u32 {
    atlas_size - y - height
}
