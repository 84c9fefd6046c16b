//! Whole-world generation from the shipped configuration: determinism,
//! placement invariants, snapshot contents and config loading.

use std::io::Write;
use std::path::PathBuf;

use bevy::math::Vec2;
use worldgen::constants::LANDMARK_MIN_DIST_SQ;
use worldgen::engine::{ConfigError, WorldConfig};
use worldgen::floor::Layer;
use worldgen::geometry::Hitbox;
use worldgen::grid::{ObjectCategory, ObjectKind};
use worldgen::map::{GameMap, PositionParams, WorldSnapshot};

// ============================================================
// Helpers
// ============================================================

fn config_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config/world.ron")
}

fn generate(seed: u32) -> GameMap {
    let config = WorldConfig::load(config_path()).unwrap();
    let map = config.load_map().unwrap();
    let registry = config.load_definitions().unwrap();
    GameMap::new(map, registry, seed).unwrap()
}

fn buildings<'a>(map: &'a GameMap, id: &'a str) -> impl Iterator<Item = Vec2> + 'a {
    map.grid().objects().filter_map(move |object| match &object.kind {
        ObjectKind::Building { definition, .. } if definition == id => Some(object.position),
        _ => None,
    })
}

// ============================================================
// Determinism
// ============================================================

#[test]
fn same_seed_same_world() {
    let a = generate(1234);
    let b = generate(1234);
    assert_eq!(a.snapshot_bytes(), b.snapshot_bytes());
    assert_eq!(a.terrain().all_floors(), b.terrain().all_floors());
    assert_eq!(a.terrain().rivers(), b.terrain().rivers());
    assert_eq!(a.grid().len(), b.grid().len());
    for (x, y) in a.grid().objects().zip(b.grid().objects()) {
        assert_eq!(x, y);
    }
}

#[test]
fn different_seeds_differ() {
    assert_ne!(generate(1).snapshot_bytes(), generate(2).snapshot_bytes());
}

// ============================================================
// Placement invariants
// ============================================================

#[test]
fn quadrant_limits_hold() {
    for seed in [3, 17, 99] {
        let map = generate(seed);
        for (id, limit) in &map.definition().quad_building_limit {
            let mut counts = [0u32; 4];
            for position in buildings(&map, id) {
                counts[map.quadrant(position)] += 1;
            }
            assert!(counts.iter().all(|c| c <= limit), "{id} exceeds {limit}: {counts:?}");
        }
    }
}

#[test]
fn bridge_quadrant_limit_holds() {
    let config = WorldConfig::load(config_path()).unwrap();
    let registry = config.load_definitions().unwrap();
    let mut definition = config.load_map().unwrap();
    definition.quad_building_limit.insert("bridge".into(), 1);

    for seed in 0..10 {
        let map = GameMap::new(definition.clone(), registry.clone(), seed).unwrap();
        let mut counts = [0u32; 4];
        for position in buildings(&map, "bridge") {
            counts[map.quadrant(position)] += 1;
        }
        assert!(counts.iter().all(|&c| c <= 1), "seed {seed}: {counts:?}");
    }
}

#[test]
fn major_buildings_spread_out() {
    for seed in [3, 17, 99] {
        let map = generate(seed);
        let mut positions = Vec::new();
        for id in &map.definition().major_buildings {
            positions.extend(buildings(&map, id));
        }

        let mut per_quadrant = [0u32; 4];
        for position in &positions {
            per_quadrant[map.quadrant(*position)] += 1;
        }
        assert!(per_quadrant.iter().all(|&c| c <= 1), "{per_quadrant:?}");

        for (i, a) in positions.iter().enumerate() {
            for b in &positions[i + 1..] {
                assert!(a.distance_squared(*b) >= LANDMARK_MIN_DIST_SQ);
            }
        }
    }
}

#[test]
fn accepted_positions_never_collide() {
    let mut map = generate(5);
    let footprint = Hitbox::circle(12.0, Vec2::ZERO);
    let mut accepted: Vec<Hitbox> = Vec::new();

    for _ in 0..40 {
        let Some(spot) = map.get_random_position(&footprint, &PositionParams::default()) else {
            continue;
        };
        let placed = footprint.transform(spot.position, 1.0, spot.orientation);
        assert!(!map.collides_with_objects(&placed, Layer::Ground));
        assert!(accepted.iter().all(|other| !other.collides_with(&placed)));
        map.generate_obstacle("rock", spot.position, spot.orientation, 0.0, 12.0 / 5.0, 0, Layer::Ground)
            .unwrap();
        accepted.push(placed);
    }
    assert!(!accepted.is_empty());
}

#[test]
fn river_spawn_modes_respect_water() {
    let map = generate(11);
    let mut reeds = 0;
    for object in map.grid().objects() {
        let ObjectKind::Obstacle { definition, .. } = &object.kind else {
            continue;
        };
        match definition.as_str() {
            "reed" => {
                reeds += 1;
                let rivers = map.terrain().get_rivers_in_hitbox(&object.spawn_hitbox, object.layer);
                assert!(!rivers
                    .iter()
                    .any(|r| r.water_hitbox().is_some_and(|w| w.collides_with(&object.spawn_hitbox))));
            }
            "tree" | "bush" => {
                let rivers = map.terrain().get_rivers_in_position(object.position, object.layer);
                assert!(!rivers
                    .iter()
                    .any(|r| r.water_hitbox().is_some_and(|w| w.is_point_inside(object.position))));
            }
            _ => {}
        }
    }
    if map.terrain().rivers().iter().any(|r| r.is_river()) {
        assert!(reeds > 0);
    }
}

// ============================================================
// Snapshot
// ============================================================

#[test]
fn snapshot_lists_visible_world() {
    let map = generate(21);
    let snapshot = WorldSnapshot::from_bytes(&map.snapshot_bytes()).unwrap();
    assert_eq!(snapshot.seed, 21);
    assert_eq!((snapshot.width, snapshot.height), (2048, 2048));
    assert_eq!(snapshot.rivers.len(), map.terrain().rivers().len());
    assert_eq!(snapshot.floors.len(), map.terrain().all_floors().len());
    assert_eq!(snapshot.places.len(), 2);
    assert_eq!(snapshot.places[0].position, Vec2::new(1024.0, 1024.0));

    let visible = map
        .grid()
        .objects()
        .filter(|o| !o.hidden && o.category() != ObjectCategory::Loot)
        .count();
    assert_eq!(snapshot.objects.len(), visible);
    assert!(snapshot
        .objects
        .iter()
        .all(|o| o.category != ObjectCategory::Loot));
}

#[test]
fn post_start_runs_once() {
    let mut map = generate(8);
    let mut tagged = 0;
    let seen = map.run_post_start(|building| {
        if building.tags.iter().any(|t| t == "lookout") {
            tagged += 1;
        }
    });
    assert_eq!(seen, map.grid().count(ObjectCategory::Building));
    assert_eq!(tagged, buildings(&map, "watchtower").count());
    assert_eq!(map.run_post_start(|_| {}), 0);
}

// ============================================================
// Config loading
// ============================================================

#[test]
fn config_paths_resolve_next_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let config_file = dir.path().join("world.ron");
    std::fs::copy(
        config_path().with_file_name("map.ron"),
        dir.path().join("map.ron"),
    )
    .unwrap();
    std::fs::copy(
        config_path().with_file_name("definitions.ron"),
        dir.path().join("definitions.ron"),
    )
    .unwrap();
    let mut file = std::fs::File::create(&config_file).unwrap();
    writeln!(file, "(seed: 77, map_path: \"map.ron\", definitions_path: \"definitions.ron\")").unwrap();

    let config = WorldConfig::load(&config_file).unwrap();
    assert_eq!(config.seed, 77);
    assert_eq!(config.map_path, dir.path().join("map.ron"));
    let map = config.load_map().unwrap();
    assert_eq!(map.name, "archipelago");
    assert!(config.load_definitions().unwrap().buildings.contains_key("bridge"));
}

#[test]
fn broken_definitions_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("world.ron"), "(definitions_path: \"defs.ron\")").unwrap();
    std::fs::write(
        dir.path().join("defs.ron"),
        "(buildings: { \"a\": (spawn_hitbox: Circle((radius: 1.0)), hitbox: Circle((radius: 1.0)), sub_buildings: [(id: \"a\")]) })",
    )
    .unwrap();

    let config = WorldConfig::load(dir.path().join("world.ron")).unwrap();
    assert!(matches!(config.load_definitions(), Err(ConfigError::Definition(_))));
}
