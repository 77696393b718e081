//! Image compositing - merges a target's layers per frame, trims, deduplicates

use glam::{IVec2, UVec2};
use image::RgbaImage;

use crate::error::ImportError;
use crate::geometry::{blend_over, cel_to_texture, to_rgba8, BoundingBox, TRANSPARENT};
use crate::models::{Color, SourceModel};
use crate::target::TargetRegistry;

/// One target/frame pair that uses an [`Image`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRecord {
    pub frame: usize,
    pub target: String,
    /// Crop offset of this frame's image within the canvas (texture space)
    pub offset: IVec2,
}

/// A composited, trimmed frame image.
#[derive(Debug, Clone)]
pub struct Image {
    /// Pixels of the trimmed region, top row first
    pub pixels: RgbaImage,
    /// Bottom-left corner of the trimmed region in texture space
    pub crop: IVec2,
    /// Whether any pixel was touched
    pub has_content: bool,
    /// Every target/frame that resolved to these pixels
    pub records: Vec<FrameRecord>,
}

impl Image {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn size(&self) -> UVec2 {
        UVec2::new(self.width(), self.height())
    }

    /// Exact pixel equality, dimensions included
    pub fn same_pixels(&self, other: &Image) -> bool {
        self.pixels.dimensions() == other.pixels.dimensions()
            && self.pixels.as_raw() == other.pixels.as_raw()
    }
}

/// Composite every content layer of `path` present in `frame`.
///
/// Layers are drawn in ascending index order (later on top). Pixels outside
/// the canvas are dropped. With `dense` the result is trimmed to the touched
/// pixels; otherwise it always spans the full canvas.
pub fn composite(
    model: &SourceModel,
    registry: &TargetRegistry,
    path: &str,
    frame: usize,
    dense: bool,
) -> Result<Image, ImportError> {
    let width = model.width;
    let height = model.height;
    let mut canvas: Vec<Color> = vec![TRANSPARENT; (width * height) as usize];
    let mut bounds = BoundingBox::new();

    let layers = registry
        .get(path)
        .map(|t| t.content_layers.as_slice())
        .unwrap_or_default();
    let source_frame = model.frames.get(frame);

    for &layer_index in layers {
        let Some(layer) = model.layer(layer_index) else {
            continue;
        };
        if !layer.visible {
            continue;
        }
        let Some(cel) = source_frame.and_then(|f| f.cels.get(&layer_index)) else {
            continue;
        };

        let opacity = (layer.opacity * cel.opacity).clamp(0.0, 1.0);
        let origin = IVec2::new(cel.x, cel.y);

        for row in 0..cel.height {
            for col in 0..cel.width {
                let mut src = cel.pixel(col, row, layer_index, frame)?;
                src[3] *= opacity;
                if src[3] <= 0.0 {
                    continue;
                }

                let Some(p) = cel_to_texture(height, origin, col, row) else {
                    continue;
                };
                if p.x < 0 || p.y < 0 || p.x >= width as i32 || p.y >= height as i32 {
                    continue;
                }

                let idx = (p.y as u32 * width + p.x as u32) as usize;
                canvas[idx] = blend_over(canvas[idx], src);
                bounds.include(p.x, p.y);
            }
        }
    }

    let has_content = !bounds.is_empty();
    let region = if dense {
        bounds
    } else {
        BoundingBox::from_rect(0, 0, width, height)
    };

    let crop = region.min();
    let size = region.size();
    let mut pixels = RgbaImage::new(size.x, size.y);
    if has_content {
        for ly in 0..size.y {
            for lx in 0..size.x {
                let tx = (crop.x as u32 + lx) as usize;
                let ty = (crop.y as u32 + ly) as usize;
                let color = canvas[ty * width as usize + tx];
                // Texture rows grow upward, image rows downward
                pixels.put_pixel(lx, size.y - 1 - ly, to_rgba8(color));
            }
        }
    }

    Ok(Image {
        pixels,
        crop,
        has_content,
        records: vec![FrameRecord {
            frame,
            target: path.to_string(),
            offset: crop,
        }],
    })
}

/// Distinct images in discovery order.
#[derive(Debug, Default)]
pub struct ImageSet {
    images: Vec<Image>,
    duplicates: usize,
}

impl ImageSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an image, merging its frame records into an identical existing one.
    ///
    /// Returns the index of the image that now holds the records.
    pub fn insert(&mut self, image: Image) -> usize {
        if let Some(idx) = self.images.iter().position(|i| i.same_pixels(&image)) {
            self.images[idx].records.extend(image.records);
            self.duplicates += 1;
            return idx;
        }
        self.images.push(image);
        self.images.len() - 1
    }

    pub fn images(&self) -> &[Image] {
        &self.images
    }

    pub fn into_images(self) -> Vec<Image> {
        self.images
    }

    /// Number of images merged into an earlier one
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Composite every target that has content layers, for every frame.
///
/// Empty images are dropped and never reach the deduplicator.
pub fn composite_all(
    model: &SourceModel,
    registry: &TargetRegistry,
    dense: bool,
) -> Result<ImageSet, ImportError> {
    let mut set = ImageSet::new();

    for target in registry.iter() {
        if target.content_layers.is_empty() {
            continue;
        }
        for frame in 0..model.frame_count() {
            let image = composite(model, registry, &target.path, frame, dense)?;
            if !image.has_content {
                log::debug!("target '{}' frame {}: empty, skipped", target.path, frame);
                continue;
            }
            set.insert(image);
        }
    }

    log::info!(
        "composited {} distinct image(s), {} duplicate(s) merged",
        set.len(),
        set.duplicates()
    );
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Cel, Frame, Layer, LayerKind};
    use image::Rgba;

    const RED: Color = [1.0, 0.0, 0.0, 1.0];
    const BLUE: Color = [0.0, 0.0, 1.0, 1.0];

    fn setup(frames: Vec<Frame>, layer_count: usize) -> (SourceModel, TargetRegistry) {
        let mut model = SourceModel::new("hero", 64, 64);
        let mut registry = TargetRegistry::new("hero");
        for i in 0..layer_count {
            model.layers.push(Layer::new(i, format!("layer{}", i), LayerKind::Content));
            registry.add_content_layer("/", i);
        }
        model.frames = frames;
        (model, registry)
    }

    #[test]
    fn test_trim_to_content() {
        // Texture (8..=11, 44..=47) is canvas rows 16..=19
        let (model, registry) = setup(
            vec![Frame::new(0).with_cel(0, Cel::filled(8, 16, 4, 4, RED))],
            1,
        );
        let image = composite(&model, &registry, "/", 0, true).unwrap();
        assert!(image.has_content);
        assert_eq!(image.size(), UVec2::new(4, 4));
        assert_eq!(image.crop, IVec2::new(8, 44));
        assert_eq!(image.records[0].offset, IVec2::new(8, 44));
        assert_eq!(*image.pixels.get_pixel(0, 0), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_rows_keep_source_orientation() {
        // Top row red, bottom row blue
        let cel = Cel::new(0, 0, 1, 2, vec![RED, BLUE]);
        let (model, registry) = setup(vec![Frame::new(0).with_cel(0, cel)], 1);
        let image = composite(&model, &registry, "/", 0, true).unwrap();
        assert_eq!(image.crop, IVec2::new(0, 62));
        assert_eq!(*image.pixels.get_pixel(0, 0), Rgba([255, 0, 0, 255]));
        assert_eq!(*image.pixels.get_pixel(0, 1), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_later_layers_draw_on_top() {
        let (model, registry) = setup(
            vec![Frame::new(0)
                .with_cel(1, Cel::filled(0, 0, 1, 1, BLUE))
                .with_cel(0, Cel::filled(0, 0, 1, 1, RED))],
            2,
        );
        let image = composite(&model, &registry, "/", 0, true).unwrap();
        assert_eq!(*image.pixels.get_pixel(0, 0), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_invisible_layer_and_opacity() {
        let (mut model, registry) = setup(
            vec![Frame::new(0)
                .with_cel(0, Cel::filled(0, 0, 1, 1, BLUE))
                .with_cel(1, Cel::filled(0, 0, 1, 1, RED))],
            2,
        );
        model.layers[1].visible = false;
        let image = composite(&model, &registry, "/", 0, true).unwrap();
        assert_eq!(*image.pixels.get_pixel(0, 0), Rgba([0, 0, 255, 255]));

        model.layers[1].visible = true;
        model.layers[1].opacity = 0.5;
        let image = composite(&model, &registry, "/", 0, true).unwrap();
        assert_eq!(*image.pixels.get_pixel(0, 0), Rgba([128, 0, 128, 255]));
    }

    #[test]
    fn test_out_of_canvas_pixels_discarded() {
        let (model, registry) = setup(
            vec![Frame::new(0).with_cel(0, Cel::filled(-2, -2, 4, 4, RED))],
            1,
        );
        let image = composite(&model, &registry, "/", 0, true).unwrap();
        assert_eq!(image.size(), UVec2::new(2, 2));
        assert_eq!(image.crop, IVec2::new(0, 62));
    }

    #[test]
    fn test_empty_frame_collapses_to_origin_pixel() {
        let (model, registry) = setup(vec![Frame::new(0)], 1);
        let image = composite(&model, &registry, "/", 0, true).unwrap();
        assert!(!image.has_content);
        assert_eq!(image.size(), UVec2::ONE);
        assert_eq!(image.crop, IVec2::ZERO);
    }

    #[test]
    fn test_sparse_mode_uses_full_canvas() {
        let (model, registry) = setup(
            vec![Frame::new(0).with_cel(0, Cel::filled(8, 16, 4, 4, RED))],
            1,
        );
        let image = composite(&model, &registry, "/", 0, false).unwrap();
        assert_eq!(image.size(), UVec2::new(64, 64));
        assert_eq!(image.crop, IVec2::ZERO);
        assert_eq!(*image.pixels.get_pixel(8, 16), Rgba([255, 0, 0, 255]));
        assert_eq!(*image.pixels.get_pixel(0, 0), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_dedup_merges_identical_pixels_across_positions() {
        let (model, registry) = setup(
            vec![
                Frame::new(0).with_cel(0, Cel::filled(0, 0, 2, 2, RED)),
                Frame::new(1).with_cel(0, Cel::filled(10, 10, 2, 2, RED)),
                Frame::new(2).with_cel(0, Cel::filled(0, 0, 2, 2, BLUE)),
                Frame::new(3),
            ],
            1,
        );
        let set = composite_all(&model, &registry, true).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.duplicates(), 1);

        let first = &set.images()[0];
        assert_eq!(first.records.len(), 2);
        assert_eq!(first.records[0].frame, 0);
        assert_eq!(first.records[1].frame, 1);
        // Each record keeps its own crop offset
        assert_ne!(first.records[0].offset, first.records[1].offset);
        assert_eq!(set.images()[1].records[0].frame, 2);
    }

    #[test]
    fn test_dedup_requires_equal_dimensions() {
        let mut set = ImageSet::new();
        let a = Image {
            pixels: RgbaImage::new(2, 1),
            crop: IVec2::ZERO,
            has_content: true,
            records: vec![],
        };
        let b = Image {
            pixels: RgbaImage::new(1, 2),
            ..a.clone()
        };
        assert_eq!(set.insert(a), 0);
        assert_eq!(set.insert(b), 1);
    }

    #[test]
    fn test_target_without_content_layers_skipped() {
        let (model, mut registry) = setup(
            vec![Frame::new(0).with_cel(0, Cel::filled(0, 0, 1, 1, RED))],
            1,
        );
        registry.upsert("/empty");
        let set = composite_all(&model, &registry, true).unwrap();
        assert!(set.images().iter().all(|i| i.records.iter().all(|r| r.target == "/")));
    }
}
