//! End-to-end tests of the import pipeline
//!
//! `hero_rig.json` is a 32x32, two-frame rig: a root pivot, a `/body` group
//! with its own pivot and a torso, and a `/body/arm` child with its own pivot
//! whose cel moves down one pixel in frame 1.

use std::fs::File;
use std::path::PathBuf;

use glam::{UVec2, Vec2};
use rigatlas::config::{Alignment, ImportConfig, PixelOrigin};
use rigatlas::models::{Cel, Frame, FrameTag, Layer, LayerKind, SourceModel};
use rigatlas::target::PivotSource;
use rigatlas::{import, ImportError, ImportResult, WarningKind};

const RED: [f32; 4] = [1.0, 0.0, 0.0, 1.0];
const MARK: [f32; 4] = [0.0, 1.0, 0.0, 1.0];
const CLEAR: [f32; 4] = [0.0, 0.0, 0.0, 0.0];

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn load(name: &str) -> SourceModel {
    let file = File::open(fixture(name)).expect("fixture should exist");
    SourceModel::from_reader(file).expect("fixture should parse")
}

fn import_hero(config: &ImportConfig) -> ImportResult {
    import(&load("hero_rig.json"), config).expect("import should succeed")
}

fn assert_close(a: Vec2, b: Vec2) {
    assert!((a - b).abs().max_element() < 1e-4, "{:?} != {:?}", a, b);
}

#[test]
fn test_hero_targets_resolved() {
    let result = import_hero(&ImportConfig::default());

    assert_eq!(result.registry.paths(), &["/", "/body", "/body/arm"]);
    assert!(result.warnings.is_empty(), "{:?}", result.warnings);

    let root = result.target("/").unwrap();
    assert_eq!(root.pivot_source, PivotSource::Own);
    assert!(root.content_layers.is_empty());

    let body = result.target("/body").unwrap();
    assert_eq!(body.content_layers, vec![2]);
    assert_eq!(body.pivot_layer, Some(3));

    let arm = result.target("/body/arm").unwrap();
    assert_eq!(arm.content_layers, vec![4]);
    assert_eq!(arm.pivot_layer, Some(5));
}

#[test]
fn test_hero_pivots_in_texture_space() {
    let result = import_hero(&ImportConfig::default());

    assert_eq!(result.target("/").unwrap().pivots[&0], Vec2::new(16.0, 1.0));
    assert_eq!(result.target("/body").unwrap().pivots[&1], Vec2::new(14.0, 17.0));

    let arm = result.target("/body/arm").unwrap();
    assert_eq!(arm.pivots[&0], Vec2::new(17.0, 19.0));
    assert_eq!(arm.pivots[&1], Vec2::new(17.0, 18.0));
}

#[test]
fn test_offsets_measured_against_nearest_pivot_ancestor() {
    let result = import_hero(&ImportConfig::default());

    // Root has no ancestor: measured against the bottom-center default (16, 0)
    assert_eq!(result.target("/").unwrap().offsets[&0], Vec2::new(0.0, 1.0));

    let body = result.target("/body").unwrap();
    assert_eq!(body.offsets[&0], Vec2::new(-2.0, 16.0));

    // pivot(arm) - pivot(body), not pivot(arm) - pivot(root)
    let arm = result.target("/body/arm").unwrap();
    assert_eq!(arm.offsets[&0], Vec2::new(3.0, 2.0));
    assert_eq!(arm.offsets[&1], Vec2::new(3.0, 1.0));
    assert_eq!(arm.offset_in_units(0, 32.0), Some(Vec2::new(3.0 / 32.0, 2.0 / 32.0)));
}

#[test]
fn test_hero_sprites_and_dedup() {
    let result = import_hero(&ImportConfig::default());

    let names: Vec<&str> = result.sprites.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["hero_body_0", "hero_body_1", "hero_body_arm_0", "hero_body_arm_1"]
    );

    // The torso never changes and the arm only moves, so two images remain
    let body0 = result.sprite("hero_body_0").unwrap();
    let body1 = result.sprite("hero_body_1").unwrap();
    assert_eq!(body0.rect, body1.rect);
    assert_eq!(body0.image, body1.image);
    assert_eq!(body0.rect.size(), UVec2::new(4, 4));
    assert_close(body0.pivot, Vec2::new(0.625, 0.375));

    let arm0 = result.sprite("hero_body_arm_0").unwrap();
    let arm1 = result.sprite("hero_body_arm_1").unwrap();
    assert_eq!(arm0.rect, arm1.rect);
    assert_ne!(arm0.crop, arm1.crop);
    assert_close(arm0.pivot, Vec2::new(0.75, 0.75));
    assert_close(arm1.pivot, arm0.pivot);

    // Packed left to right with a 1px border, reported bottom-left origin
    assert_eq!(result.atlas_size, 128);
    assert_eq!((body0.rect.x, body0.rect.y), (0, 124));
    assert_eq!((arm0.rect.x, arm0.rect.y), (5, 126));

    let arm = result.target("/body/arm").unwrap();
    assert_eq!(arm.dimensions[&0], UVec2::new(2, 2));
    assert_eq!(arm.dimensions[&1], UVec2::new(2, 2));
}

#[test]
fn test_pivot_round_trip() {
    for origin in [PixelOrigin::Center, PixelOrigin::Corner] {
        let config = ImportConfig {
            pixel_origin: origin,
            ..Default::default()
        };
        let result = import_hero(&config);
        for sprite in &result.sprites {
            let target = result.target(&sprite.target).unwrap();
            assert_close(sprite.texture_pivot(origin), target.pivots[&sprite.frame]);
        }
    }
}

#[test]
fn test_import_is_idempotent() {
    let model = load("hero_rig.json");
    let config = ImportConfig::default();
    let a = import(&model, &config).unwrap();
    let b = import(&model, &config).unwrap();

    assert_eq!(a.atlas.as_raw(), b.atlas.as_raw());
    assert_eq!(a.sprites, b.sprites);
}

#[test]
fn test_packed_rects_valid() {
    let result = import_hero(&ImportConfig::default());
    let size = result.atlas_size;
    assert!(size.is_power_of_two() && size >= 128);

    let mut rects: Vec<(usize, _)> = result.sprites.iter().map(|s| (s.image, s.rect)).collect();
    rects.dedup_by_key(|(image, _)| *image);

    for (_, r) in &rects {
        assert!(r.x + r.width <= size && r.y + r.height <= size);
    }
    for i in 0..rects.len() {
        for j in (i + 1)..rects.len() {
            let (a, b) = (rects[i].1, rects[j].1);
            let overlap = a.x < b.x + b.width
                && a.x + a.width > b.x
                && a.y < b.y + b.height
                && a.y + a.height > b.y;
            assert!(!overlap, "{:?} overlaps {:?}", a, b);
        }
    }
}

#[test]
fn test_atlas_pixels_match_sprites() {
    let result = import_hero(&ImportConfig::default());
    let body = result.sprite("hero_body_0").unwrap();
    // Rect y is bottom-left; the image is stored top row first
    let top = result.atlas_size - body.rect.y - body.rect.height;
    assert_eq!(result.atlas.get_pixel(body.rect.x, top).0, [255, 0, 0, 255]);

    let arm = result.sprite("hero_body_arm_0").unwrap();
    let top = result.atlas_size - arm.rect.y - arm.rect.height;
    assert_eq!(result.atlas.get_pixel(arm.rect.x + 1, top + 1).0, [0, 0, 255, 255]);

    // Border column between the two sprites stays transparent
    assert_eq!(result.atlas.get_pixel(4, 0).0, [0, 0, 0, 0]);
}

#[test]
fn test_no_trim_keeps_full_canvas() {
    let config = ImportConfig {
        dense_packed: false,
        ..Default::default()
    };
    let result = import_hero(&config);

    for sprite in &result.sprites {
        assert_eq!(sprite.rect.size(), UVec2::new(32, 32));
        assert_eq!(sprite.crop, glam::IVec2::ZERO);
    }
    // Untrimmed, the moving arm no longer deduplicates
    let arm0 = result.sprite("hero_body_arm_0").unwrap();
    let arm1 = result.sprite("hero_body_arm_1").unwrap();
    assert_ne!(arm0.image, arm1.image);

    let body = result.sprite("hero_body_0").unwrap();
    assert_close(body.pivot, Vec2::new(14.5 / 32.0, 17.5 / 32.0));
}

#[test]
fn test_sprites_for_tag() {
    let result = import_hero(&ImportConfig::default());
    assert_eq!(result.sprites_for_tag("walk").len(), 4);

    let idle: Vec<&str> = result
        .sprites_for_tag("idle")
        .iter()
        .map(|s| s.name.as_str())
        .collect();
    assert_eq!(idle, vec!["hero_body_0", "hero_body_arm_0"]);
    assert!(result.sprites_for_tag("attack").is_empty());
}

#[test]
fn test_target_empty_in_tag_is_never_packed_there() {
    let mut model = SourceModel::new("hero", 16, 16);
    model.layers = vec![
        Layer::new(0, "body", LayerKind::Content),
        Layer::new(1, "@target(\"fx\")", LayerKind::Content),
    ];
    model.frames = vec![
        Frame::new(0)
            .with_cel(0, Cel::filled(4, 4, 4, 4, RED))
            .with_cel(1, Cel::filled(0, 0, 2, 2, CLEAR)),
        Frame::new(1).with_cel(0, Cel::filled(4, 4, 4, 4, RED)),
        Frame::new(2)
            .with_cel(0, Cel::filled(4, 4, 4, 4, RED))
            .with_cel(1, Cel::filled(0, 0, 2, 2, MARK)),
    ];
    model.tags = vec![FrameTag {
        name: "idle".to_string(),
        from: 0,
        to: 1,
    }];

    let result = import(&model, &ImportConfig::default()).unwrap();
    assert!(result
        .sprites_for_tag("idle")
        .iter()
        .all(|s| s.target != "/fx"));

    let fx = result.target("/fx").unwrap();
    let packed: Vec<usize> = fx.dimensions.keys().copied().collect();
    assert_eq!(packed, vec![2]);
    assert!(result.sprite("hero_fx_2").is_some());
}

#[test]
fn test_default_pivot_without_pivot_layers() {
    let mut model = SourceModel::new("box", 32, 32);
    model.layers = vec![Layer::new(0, "body", LayerKind::Content)];
    model.frames = vec![
        Frame::new(0).with_cel(0, Cel::filled(8, 8, 16, 16, RED)),
        Frame::new(1).with_cel(0, Cel::filled(8, 8, 16, 16, RED)),
    ];

    let config = ImportConfig {
        default_alignment: Alignment::Center,
        ..Default::default()
    };
    let result = import(&model, &config).unwrap();

    let root = result.target("/").unwrap();
    assert_eq!(root.pivot_source, PivotSource::Default);
    assert_eq!(root.pivots[&1], Vec2::new(16.0, 16.0));
    assert_eq!(root.offsets[&1], Vec2::ZERO);

    let sprite = result.sprite("box_0").unwrap();
    assert_close(sprite.pivot, Vec2::new(0.53125, 0.53125));
}

#[test]
fn test_unknown_annotation_warns_and_continues() {
    let result = import(&load("unknown_annotation.json"), &ImportConfig::default()).unwrap();
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].kind, WarningKind::Structural);
    assert_eq!(result.sprites.len(), 1);
    assert_eq!(result.sprites[0].name, "crate_0");
}

#[test]
fn test_hidden_layer_contributes_nothing() {
    let mut model = SourceModel::new("hero", 8, 8);
    let mut hidden = Layer::new(1, "overlay", LayerKind::Content);
    hidden.visible = false;
    model.layers = vec![Layer::new(0, "body", LayerKind::Content), hidden];
    model.frames = vec![Frame::new(0)
        .with_cel(0, Cel::filled(2, 2, 2, 2, RED))
        .with_cel(1, Cel::filled(0, 0, 8, 8, MARK))];

    let result = import(&model, &ImportConfig::default()).unwrap();
    assert_eq!(result.sprites[0].rect.size(), UVec2::new(2, 2));
}

#[test]
fn test_malformed_model_is_rejected() {
    let file = File::open(fixture("malformed.json")).unwrap();
    assert!(matches!(
        SourceModel::from_reader(file),
        Err(ImportError::Model(_))
    ));
}
