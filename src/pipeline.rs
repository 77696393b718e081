//! Import pipeline - runs every stage in order for one source model
//!
//! Stages: target resolution (content/group layers, then pivot and other
//! annotation layers), pivots, offsets, compositing + deduplication, atlas
//! packing, normalization. Any [`ImportError`] aborts the run and nothing
//! from it should be used.

use image::RgbaImage;

use crate::annotation::{classify, LayerRole};
use crate::atlas::{pack, render_atlas};
use crate::compositor::composite_all;
use crate::config::ImportConfig;
use crate::error::{ImportError, TargetError, Warning};
use crate::models::{FrameTag, Layer, SourceModel};
use crate::normalize::{normalize, PackedSprite};
use crate::offset::{default_pivot, resolve_offsets, resolve_pivots};
use crate::target::{Target, TargetRegistry};

/// Everything an import produces.
#[derive(Debug)]
pub struct ImportResult {
    /// Asset name the sprite names are built from
    pub name: String,
    /// Packed atlas, top row first
    pub atlas: RgbaImage,
    pub atlas_size: u32,
    /// One descriptor per target/frame, in packing order
    pub sprites: Vec<PackedSprite>,
    pub registry: TargetRegistry,
    pub tags: Vec<FrameTag>,
    pub warnings: Vec<Warning>,
}

impl ImportResult {
    pub fn target(&self, path: &str) -> Option<&Target> {
        self.registry.get(path)
    }

    pub fn sprite(&self, name: &str) -> Option<&PackedSprite> {
        self.sprites.iter().find(|s| s.name == name)
    }

    /// Sprites whose frame lies inside the named tag
    pub fn sprites_for_tag(&self, tag: &str) -> Vec<&PackedSprite> {
        let Some(tag) = self.tags.iter().find(|t| t.name == tag) else {
            return Vec::new();
        };
        self.sprites.iter().filter(|s| tag.contains(s.frame)).collect()
    }
}

/// Log and keep a warning
fn record(warnings: &mut Vec<Warning>, warning: Warning) {
    log::warn!("{}", warning);
    warnings.push(warning);
}

/// Run a full import.
pub fn import(model: &SourceModel, config: &ImportConfig) -> Result<ImportResult, ImportError> {
    model.validate()?;
    log::info!(
        "importing '{}': {}x{}, {} frame(s), {} layer(s)",
        model.name,
        model.width,
        model.height,
        model.frame_count(),
        model.layers.len()
    );

    let mut warnings = Vec::new();
    let mut registry = TargetRegistry::new(&model.name);
    resolve_targets(model, &mut registry, &mut warnings);

    let default = default_pivot(config.default_alignment, model.width, model.height);
    for warning in resolve_pivots(&mut registry, model, default)? {
        record(&mut warnings, warning);
    }
    for warning in resolve_offsets(&mut registry, model.frame_count(), default) {
        record(&mut warnings, warning);
    }

    let images = composite_all(model, &registry, config.dense_packed)?.into_images();
    let sizes: Vec<(u32, u32)> = images.iter().map(|i| (i.width(), i.height())).collect();
    let packing = pack(&sizes, config.border)?;

    if packing.size > config.atlas_warn_size {
        record(
            &mut warnings,
            Warning::capacity(format!(
                "atlas is {}x{}, larger than {}; some runtimes downsample or reject it",
                packing.size, packing.size, config.atlas_warn_size
            )),
        );
    }

    let atlas = render_atlas(&images, &packing);
    let sprites = normalize(&images, &packing, &mut registry, config.pixel_origin);
    log::info!(
        "packed {} sprite(s) from {} image(s) into {}x{}",
        sprites.len(),
        images.len(),
        packing.size,
        packing.size
    );

    Ok(ImportResult {
        name: model.name.clone(),
        atlas,
        atlas_size: packing.size,
        sprites,
        registry,
        tags: model.tags.clone(),
        warnings,
    })
}

/// Map every layer onto a target path.
///
/// Content and group layers go first, parents before children (by depth,
/// then index); pivot and other annotation layers follow. Structural problems
/// skip the layer with a warning.
pub fn resolve_targets(model: &SourceModel, registry: &mut TargetRegistry, warnings: &mut Vec<Warning>) {
    let mut roles: Vec<(&Layer, LayerRole)> = Vec::new();
    for layer in &model.layers {
        if let Some(parent) = layer.parent.filter(|&p| model.layer(p).is_none()) {
            record(warnings, TargetError::UnknownLayer(parent).into());
            continue;
        }
        match classify(layer) {
            Ok(role) => roles.push((layer, role)),
            Err(e) => record(warnings, e.into()),
        }
    }
    roles.sort_by_key(|(layer, _)| (layer.depth, layer.index));

    let (structural, annotations): (Vec<_>, Vec<_>) =
        roles.into_iter().partition(|(_, role)| role.is_structural());

    for (layer, role) in structural.into_iter().chain(annotations) {
        let path = match registry.resolve(layer, role.path()) {
            Ok(path) => path,
            Err(e) => {
                record(warnings, e.into());
                continue;
            }
        };

        match role {
            LayerRole::Content { .. } => registry.add_content_layer(&path, layer.index),
            LayerRole::Pivot { .. } => {
                if let Err(e) = registry.register_pivot(&path, layer.index) {
                    record(warnings, e.into());
                }
            }
            LayerRole::Group { .. } | LayerRole::Passive { .. } => {}
        }
    }

    log::debug!("resolved {} target(s)", registry.len());
}
