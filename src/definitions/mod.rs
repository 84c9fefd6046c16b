//! Building, obstacle and loot definition registry.
//!
//! Definitions are immutable tagged records loaded once at startup (RON) and
//! referenced by id. `validate` resolves every cross-reference up front so
//! generation can treat a missing id as a configuration error.

pub mod loot;

use std::collections::{BTreeMap, BTreeSet};

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

use crate::floor::FloorType;
use crate::geometry::{Hitbox, Orientation};
use crate::random::SeededRandom;

pub use loot::{LootEntry, LootItem, LootTable};

#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
    #[error("unknown building definition: {0}")]
    UnknownBuilding(String),

    #[error("unknown obstacle definition: {0}")]
    UnknownObstacle(String),

    #[error("unknown loot table: {0}")]
    UnknownLootTable(String),

    #[error("unknown object definition: {0}")]
    UnknownObject(String),

    #[error("sub-building cycle through: {0}")]
    CyclicSubBuilding(String),

    #[error("loot table references itself: {0}")]
    CyclicLootTable(String),

    #[error("loot table has no weighted entries: {0}")]
    EmptyLootTable(String),

    #[error("definition parse error: {0}")]
    Parse(String),
}

/// Where an object may be sampled on an island
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpawnMode {
    /// Inside the grass polygon, away from every river and trail bank
    #[default]
    Grass,
    /// Anywhere on the island, off trail banks and river water
    GrassAndSand,
    /// Beach band outside the grass footprint
    Sand,
    /// One of the four beach-edge bands
    Beach,
    /// On river water
    River,
    /// On a river bank, off the water
    RiverBank,
    /// On a trail
    Trail,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RotationMode {
    /// Any angle
    Full,
    /// Any quarter turn
    #[default]
    Limited,
    /// East or north
    Binary,
    None,
}

impl RotationMode {
    /// Roll an orientation and a free rotation angle
    pub fn roll(self, rng: &mut SeededRandom) -> (Orientation, f32) {
        match self {
            RotationMode::Full => (Orientation::East, rng.next_rotation()),
            RotationMode::Limited => (rng.next_orientation(), 0.0),
            RotationMode::Binary => (Orientation::from_index(rng.next_int(0, 1) as u8), 0.0),
            RotationMode::None => (Orientation::East, 0.0),
        }
    }
}

/// Floor polygon carried by a building, in building-local space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingFloor {
    pub floor_type: FloorType,
    pub hitbox: Hitbox,
    #[serde(default)]
    pub layer_offset: i8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubObstacle {
    pub id: String,
    #[serde(default)]
    pub position: Vec2,
    #[serde(default)]
    pub orientation: Orientation,
    #[serde(default)]
    pub layer_offset: i8,
    #[serde(default)]
    pub scale: Option<f32>,
    #[serde(default)]
    pub variation: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubBuilding {
    pub id: String,
    #[serde(default)]
    pub position: Vec2,
    #[serde(default)]
    pub orientation: Orientation,
    #[serde(default)]
    pub layer_offset: i8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LootSpawner {
    pub table: String,
    #[serde(default)]
    pub position: Vec2,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingDefinition {
    /// Filled from the registry key on load
    #[serde(default)]
    pub id: String,
    pub spawn_hitbox: Hitbox,
    pub hitbox: Hitbox,
    /// Present only for bridges
    #[serde(default)]
    pub bridge_hitbox: Option<Hitbox>,
    #[serde(default)]
    pub spawn_mode: SpawnMode,
    #[serde(default)]
    pub rotation_mode: RotationMode,
    #[serde(default)]
    pub floors: Vec<BuildingFloor>,
    #[serde(default)]
    pub obstacles: Vec<SubObstacle>,
    #[serde(default)]
    pub sub_buildings: Vec<SubBuilding>,
    #[serde(default)]
    pub loot_spawners: Vec<LootSpawner>,
    #[serde(default)]
    pub hide_on_map: bool,
    /// Tags surfaced to the post-start pass (e.g. NPC rosters)
    #[serde(default)]
    pub post_start_tags: Vec<String>,
}

impl BuildingDefinition {
    pub fn is_bridge(&self) -> bool {
        self.bridge_hitbox.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleRange {
    pub min: f32,
    pub max: f32,
}

impl Default for ScaleRange {
    fn default() -> Self {
        Self { min: 1.0, max: 1.0 }
    }
}

impl ScaleRange {
    pub fn roll(&self, rng: &mut SeededRandom) -> f32 {
        rng.next(self.min, self.max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObstacleDefinition {
    #[serde(default)]
    pub id: String,
    pub hitbox: Hitbox,
    /// Defaults to `hitbox`
    #[serde(default)]
    pub spawn_hitbox: Option<Hitbox>,
    #[serde(default)]
    pub scale: ScaleRange,
    #[serde(default = "default_obstacle_rotation")]
    pub rotation_mode: RotationMode,
    /// Number of visual variations; 0 means a single look
    #[serde(default)]
    pub variations: u8,
    #[serde(default)]
    pub spawn_mode: SpawnMode,
    #[serde(default)]
    pub hide_on_map: bool,
}

fn default_obstacle_rotation() -> RotationMode {
    RotationMode::Full
}

impl ObstacleDefinition {
    pub fn spawn_hitbox(&self) -> &Hitbox {
        self.spawn_hitbox.as_ref().unwrap_or(&self.hitbox)
    }
}

/// Resolved definition for an id of unknown kind
#[derive(Debug, Clone, Copy)]
pub enum ObjectRef<'a> {
    Building(&'a BuildingDefinition),
    Obstacle(&'a ObstacleDefinition),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefinitionRegistry {
    pub buildings: BTreeMap<String, BuildingDefinition>,
    pub obstacles: BTreeMap<String, ObstacleDefinition>,
    pub loot_tables: BTreeMap<String, LootTable>,
}

impl DefinitionRegistry {
    /// Parse a RON registry, fill ids from keys and validate it
    pub fn from_ron_str(source: &str) -> Result<Self, DefinitionError> {
        let mut registry: Self =
            ron::from_str(source).map_err(|e| DefinitionError::Parse(e.to_string()))?;
        registry.assign_ids();
        registry.validate()?;
        Ok(registry)
    }

    pub fn assign_ids(&mut self) {
        for (key, building) in self.buildings.iter_mut() {
            building.id.clone_from(key);
        }
        for (key, obstacle) in self.obstacles.iter_mut() {
            obstacle.id.clone_from(key);
        }
    }

    pub fn insert_building(&mut self, id: &str, mut definition: BuildingDefinition) {
        definition.id = id.to_string();
        self.buildings.insert(id.to_string(), definition);
    }

    pub fn insert_obstacle(&mut self, id: &str, mut definition: ObstacleDefinition) {
        definition.id = id.to_string();
        self.obstacles.insert(id.to_string(), definition);
    }

    pub fn reify_building(&self, id: &str) -> Result<&BuildingDefinition, DefinitionError> {
        self.buildings
            .get(id)
            .ok_or_else(|| DefinitionError::UnknownBuilding(id.to_string()))
    }

    pub fn reify_obstacle(&self, id: &str) -> Result<&ObstacleDefinition, DefinitionError> {
        self.obstacles
            .get(id)
            .ok_or_else(|| DefinitionError::UnknownObstacle(id.to_string()))
    }

    pub fn classify(&self, id: &str) -> Result<ObjectRef<'_>, DefinitionError> {
        if let Some(building) = self.buildings.get(id) {
            return Ok(ObjectRef::Building(building));
        }
        if let Some(obstacle) = self.obstacles.get(id) {
            return Ok(ObjectRef::Obstacle(obstacle));
        }
        Err(DefinitionError::UnknownObject(id.to_string()))
    }

    /// Check every cross-reference: sub-obstacles, sub-buildings, loot
    /// spawners and nested loot tables must resolve, and neither buildings
    /// nor loot tables may form cycles.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        for building in self.buildings.values() {
            for sub in &building.obstacles {
                self.reify_obstacle(&sub.id)?;
            }
            for sub in &building.sub_buildings {
                self.reify_building(&sub.id)?;
            }
            for spawner in &building.loot_spawners {
                self.loot_table(&spawner.table)?;
            }
        }

        for (name, table) in &self.loot_tables {
            if !table.entries.iter().any(|e| e.weight() > 0.0) {
                return Err(DefinitionError::EmptyLootTable(name.clone()));
            }
            for reference in table.references() {
                self.loot_table(reference)?;
            }
        }

        let mut done = BTreeSet::new();
        for id in self.buildings.keys() {
            self.check_building_cycle(id, &mut Vec::new(), &mut done)?;
        }
        let mut done = BTreeSet::new();
        for name in self.loot_tables.keys() {
            self.check_table_cycle(name, &mut Vec::new(), &mut done)?;
        }
        Ok(())
    }

    fn loot_table(&self, name: &str) -> Result<&LootTable, DefinitionError> {
        self.loot_tables
            .get(name)
            .ok_or_else(|| DefinitionError::UnknownLootTable(name.to_string()))
    }

    fn check_building_cycle<'a>(
        &'a self,
        id: &'a str,
        path: &mut Vec<&'a str>,
        done: &mut BTreeSet<&'a str>,
    ) -> Result<(), DefinitionError> {
        if done.contains(id) {
            return Ok(());
        }
        if path.contains(&id) {
            return Err(DefinitionError::CyclicSubBuilding(id.to_string()));
        }
        path.push(id);
        for sub in &self.reify_building(id)?.sub_buildings {
            self.check_building_cycle(&sub.id, path, done)?;
        }
        path.pop();
        done.insert(id);
        Ok(())
    }

    fn check_table_cycle<'a>(
        &'a self,
        name: &'a str,
        path: &mut Vec<&'a str>,
        done: &mut BTreeSet<&'a str>,
    ) -> Result<(), DefinitionError> {
        if done.contains(name) {
            return Ok(());
        }
        if path.contains(&name) {
            return Err(DefinitionError::CyclicLootTable(name.to_string()));
        }
        path.push(name);
        for reference in self.loot_table(name)?.references() {
            self.check_table_cycle(reference, path, done)?;
        }
        path.pop();
        done.insert(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGISTRY: &str = r#"(
        buildings: {
            "shed": (
                spawn_hitbox: Rect((min: (-20.0, -20.0), max: (20.0, 20.0))),
                hitbox: Rect((min: (-16.0, -16.0), max: (16.0, 16.0))),
                floors: [(floor_type: Wood, hitbox: Rect((min: (-16.0, -16.0), max: (16.0, 16.0))))],
                obstacles: [(id: "barrel", position: (8.0, 8.0))],
                loot_spawners: [(table: "ground")],
            ),
        },
        obstacles: {
            "barrel": (hitbox: Circle((radius: 4.0))),
        },
        loot_tables: {
            "ground": (min: 1, max: 2, entries: [Item(id: "bandage")]),
        },
    )"#;

    fn building(sub_buildings: Vec<&str>) -> BuildingDefinition {
        BuildingDefinition {
            id: String::new(),
            spawn_hitbox: Hitbox::rect(Vec2::splat(-10.0), Vec2::splat(10.0)),
            hitbox: Hitbox::rect(Vec2::splat(-8.0), Vec2::splat(8.0)),
            bridge_hitbox: None,
            spawn_mode: SpawnMode::Grass,
            rotation_mode: RotationMode::Limited,
            floors: Vec::new(),
            obstacles: Vec::new(),
            sub_buildings: sub_buildings
                .into_iter()
                .map(|id| SubBuilding {
                    id: id.into(),
                    position: Vec2::ZERO,
                    orientation: Orientation::East,
                    layer_offset: 0,
                })
                .collect(),
            loot_spawners: Vec::new(),
            hide_on_map: false,
            post_start_tags: Vec::new(),
        }
    }

    #[test]
    fn test_parse_ron_registry() {
        let registry = DefinitionRegistry::from_ron_str(REGISTRY).unwrap();
        let shed = registry.reify_building("shed").unwrap();
        assert_eq!(shed.id, "shed");
        assert_eq!(shed.rotation_mode, RotationMode::Limited);
        let barrel = registry.reify_obstacle("barrel").unwrap();
        assert_eq!(barrel.rotation_mode, RotationMode::Full);
        assert_eq!(barrel.spawn_hitbox(), &barrel.hitbox);
        assert!(matches!(registry.classify("barrel"), Ok(ObjectRef::Obstacle(_))));
        assert!(matches!(
            registry.classify("nope"),
            Err(DefinitionError::UnknownObject(_))
        ));
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            DefinitionRegistry::from_ron_str("(buildings: {"),
            Err(DefinitionError::Parse(_))
        ));
    }

    #[test]
    fn test_unresolved_sub_obstacle() {
        let source = REGISTRY.replace("id: \"barrel\"", "id: \"keg\"");
        assert!(matches!(
            DefinitionRegistry::from_ron_str(&source),
            Err(DefinitionError::UnknownObstacle(id)) if id == "keg"
        ));
    }

    #[test]
    fn test_sub_building_cycle() {
        let mut registry = DefinitionRegistry::default();
        registry.insert_building("a", building(vec!["b"]));
        registry.insert_building("b", building(vec!["c"]));
        registry.insert_building("c", building(vec!["a"]));
        assert!(matches!(
            registry.validate(),
            Err(DefinitionError::CyclicSubBuilding(_))
        ));

        let mut registry = DefinitionRegistry::default();
        registry.insert_building("a", building(vec!["b", "b"]));
        registry.insert_building("b", building(vec![]));
        assert!(registry.validate().is_ok());
    }

    #[test]
    fn test_empty_loot_table_rejected() {
        let mut registry = DefinitionRegistry::default();
        registry.loot_tables.insert(
            "empty".into(),
            LootTable {
                min: 1,
                max: 1,
                entries: Vec::new(),
            },
        );
        assert!(matches!(
            registry.validate(),
            Err(DefinitionError::EmptyLootTable(_))
        ));
    }

    #[test]
    fn test_rotation_modes() {
        let mut rng = SeededRandom::new(4);
        for _ in 0..50 {
            let (o, r) = RotationMode::Binary.roll(&mut rng);
            assert!(matches!(o, Orientation::East | Orientation::North));
            assert_eq!(r, 0.0);
            let (o, r) = RotationMode::Full.roll(&mut rng);
            assert_eq!(o, Orientation::East);
            assert!((0.0..std::f32::consts::TAU).contains(&r));
        }
        assert_eq!(RotationMode::None.roll(&mut rng), (Orientation::East, 0.0));
    }
}
