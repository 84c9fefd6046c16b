//! End-to-end scenarios for the terrain index, river outlines and island
//! placement, plus boundary behavior of the placement engine.

use bevy::math::Vec2;
use worldgen::definitions::DefinitionRegistry;
use worldgen::floor::{FloorType, Layer};
use worldgen::geometry::{Hitbox, RectHitbox};
use worldgen::map::definition::{IslandSpawn, MapDefinition};
use worldgen::map::{GameMap, IslandGroup, MapError, PositionParams, Sampler};
use worldgen::river::{River, RiverParams};
use worldgen::terrain::{IslandDefinition, Terrain};

// ============================================================
// Helpers
// ============================================================

fn island(beach: f32, interior: f32) -> IslandDefinition {
    IslandDefinition {
        beach_size: beach,
        interior_size: Vec2::splat(interior),
        ..Default::default()
    }
}

// ============================================================
// Terrain
// ============================================================

#[test]
fn build_floor_over_ocean() {
    let mut terrain = Terrain::new(1000.0, 1000.0, 42, Some(FloorType::Water));
    terrain.add_floor(
        FloorType::Grass,
        Hitbox::rect(Vec2::new(100.0, 100.0), Vec2::new(200.0, 200.0)),
        Layer::Ground,
        true,
    );
    assert_eq!(terrain.get_floor(Vec2::new(150.0, 150.0), Layer::Ground), FloorType::Grass);
    assert_eq!(terrain.get_floor(Vec2::new(50.0, 50.0), Layer::Ground), FloorType::Water);
}

#[test]
fn building_floor_beats_river() {
    let mut terrain = Terrain::new(1024.0, 1024.0, 3, Some(FloorType::Grass));
    terrain.add_rivers([River::new(RiverParams {
        width: 16.0,
        points: vec![Vec2::new(100.0, 500.0), Vec2::new(500.0, 500.0), Vec2::new(900.0, 500.0)],
        other_rivers: &[],
        bounds: RectHitbox::new(Vec2::ZERO, Vec2::splat(1024.0)),
        is_trail: false,
        floor: FloorType::Water,
        outline: FloorType::Sand,
        hitboxes: None,
    })]);
    assert_eq!(terrain.get_floor(Vec2::new(500.0, 500.0), Layer::Ground), FloorType::Water);

    terrain.add_floor(
        FloorType::Wood,
        Hitbox::rect(Vec2::new(480.0, 460.0), Vec2::new(520.0, 540.0)),
        Layer::Ground,
        true,
    );
    assert_eq!(terrain.get_floor(Vec2::new(500.0, 500.0), Layer::Ground), FloorType::Wood);
    // the bridge deck only covers the ground layer
    assert_eq!(terrain.get_floor(Vec2::new(500.0, 500.0), Layer::Upstairs), FloorType::Void);
}

// ============================================================
// Rivers
// ============================================================

#[test]
fn water_outline_spans_twice_the_width() {
    let river = River::new(RiverParams {
        width: 10.0,
        points: vec![Vec2::new(0.0, 0.0), Vec2::new(100.0, 0.0), Vec2::new(200.0, 0.0)],
        other_rivers: &[],
        bounds: RectHitbox::new(Vec2::splat(-10_000.0), Vec2::splat(10_000.0)),
        is_trail: false,
        floor: FloorType::Water,
        outline: FloorType::Sand,
        hitboxes: None,
    });
    let water = river.water_hitbox().unwrap();
    assert!(water.is_point_inside(Vec2::new(100.0, 9.0)));
    assert!(water.is_point_inside(Vec2::new(100.0, -9.0)));
    assert!(!water.is_point_inside(Vec2::new(100.0, 11.0)));
    assert!(!water.is_point_inside(Vec2::new(100.0, -11.0)));

    let bank = river.bank_hitbox();
    assert!(bank.is_point_inside(Vec2::new(100.0, 20.0)));
    assert!(!bank.is_point_inside(Vec2::new(100.0, 23.0)));
}

// ============================================================
// Islands
// ============================================================

#[test]
fn full_map_island_leaves_no_room_for_another() {
    let mut definition = MapDefinition::new("crowded", 600.0, 600.0);
    let mut first = IslandGroup::new(island(50.0, 500.0));
    first.spawn = IslandSpawn::Center;
    definition.islands.push(first);

    let mut second = IslandGroup::new(island(20.0, 100.0));
    second.spawn_attempts = 1;
    definition.islands.push(second);

    let map = GameMap::new(definition, DefinitionRegistry::default(), 42).unwrap();
    assert_eq!(map.islands().len(), 1);
    assert_eq!(map.islands()[0].geometry.beach_rect.min, Vec2::ZERO);
}

#[test]
fn smart_islands_tile_without_overlap() {
    let mut definition = MapDefinition::new("tiles", 2048.0, 2048.0);
    let mut group = IslandGroup::new(island(24.0, 192.0));
    group.spawn = IslandSpawn::Smart {
        row: Some(1),
        column: None,
    };
    group.count = Some(worldgen::map::definition::CountRange::exactly(5));
    definition.islands.push(group);

    let map = GameMap::new(definition, DefinitionRegistry::default(), 9).unwrap();
    let rects: Vec<RectHitbox> = map.islands().iter().map(|i| i.geometry.beach_rect).collect();
    assert_eq!(rects.len(), 5);
    for (i, a) in rects.iter().enumerate() {
        // second row: one island height plus two gaps from the top
        assert!(a.min.y > 240.0);
        for b in &rects[i + 1..] {
            assert!(!a.overlaps(b));
        }
    }
}

#[test]
fn island_larger_than_map_is_skipped() {
    let mut definition = MapDefinition::new("tiny", 256.0, 256.0);
    definition.islands.push(IslandGroup::new(island(32.0, 512.0)));
    let map = GameMap::new(definition, DefinitionRegistry::default(), 1).unwrap();
    assert!(map.islands().is_empty());
    assert_eq!(map.grid().len(), 0);
}

// ============================================================
// Placement boundaries
// ============================================================

#[test]
fn no_islands_means_no_position() {
    let definition = MapDefinition::new("empty", 512.0, 512.0);
    let mut map = GameMap::new(definition, DefinitionRegistry::default(), 5).unwrap();
    let footprint = Hitbox::circle(4.0, Vec2::ZERO);
    assert!(map
        .get_random_position(&footprint, &PositionParams::default())
        .is_none());

    // an explicit sampler works without any island
    let params = PositionParams {
        sampler: Some(Sampler::Within(Hitbox::rect(
            Vec2::new(100.0, 100.0),
            Vec2::new(200.0, 200.0),
        ))),
        ..Default::default()
    };
    let spot = map.get_random_position(&footprint, &params).unwrap();
    assert!(RectHitbox::new(Vec2::splat(100.0), Vec2::splat(200.0)).contains(spot.position));
}

#[test]
fn zero_attempts_finds_nothing() {
    let mut definition = MapDefinition::new("one", 1024.0, 1024.0);
    definition.islands.push(IslandGroup::new(island(32.0, 512.0)));
    let mut map = GameMap::new(definition, DefinitionRegistry::default(), 5).unwrap();
    let params = PositionParams {
        max_attempts: 0,
        ..Default::default()
    };
    assert!(map
        .get_random_position(&Hitbox::circle(4.0, Vec2::ZERO), &params)
        .is_none());
}

#[test]
fn unknown_ids_are_fatal() {
    let mut definition = MapDefinition::new("bad", 1024.0, 1024.0);
    let mut group = IslandGroup::new(island(32.0, 512.0));
    group.obstacles.insert("missing".into(), 1);
    definition.islands.push(group);
    let err = GameMap::new(definition, DefinitionRegistry::default(), 5).unwrap_err();
    assert!(matches!(err, MapError::Definition(_)));
}
