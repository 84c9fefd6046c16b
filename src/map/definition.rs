//! Declarative map definitions.
//!
//! A `MapDefinition` names everything generation should attempt; it does not
//! guarantee it. Counts are targets and individual placements may be skipped
//! when their attempt budget runs out.

use std::collections::BTreeMap;

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

use super::MapError;
use crate::constants::DEFAULT_ISLAND_ATTEMPTS;
use crate::definitions::{DefinitionError, DefinitionRegistry};
use crate::floor::FloorType;
use crate::random::SeededRandom;

pub use crate::terrain::IslandDefinition;

/// Inclusive integer range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRange {
    pub min: u32,
    pub max: u32,
}

impl CountRange {
    pub fn exactly(n: u32) -> Self {
        Self { min: n, max: n }
    }

    pub fn roll(&self, rng: &mut SeededRandom) -> u32 {
        rng.next_int(self.min as i32, self.max as i32).max(0) as u32
    }
}

/// How candidate island positions are chosen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum IslandSpawn {
    /// Map center
    Center,
    /// Row/column tiling; explicit cells override the running cursor
    Smart {
        #[serde(default)]
        row: Option<u32>,
        #[serde(default)]
        column: Option<u32>,
    },
    #[default]
    Random,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiverDefinition {
    pub min_amount: u32,
    pub max_amount: u32,
    #[serde(default)]
    pub wide_chance: f32,
    pub min_width: f32,
    pub max_width: f32,
    #[serde(default)]
    pub min_wide_width: f32,
    #[serde(default)]
    pub max_wide_width: f32,
    #[serde(default = "default_river_floor")]
    pub floor: FloorType,
    #[serde(default = "default_river_outline")]
    pub outline: FloorType,
}

fn default_river_floor() -> FloorType {
    FloorType::Water
}

fn default_river_outline() -> FloorType {
    FloorType::Sand
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClearingObstacle {
    pub id: String,
    pub count: CountRange,
}

/// Open rectangles inside the grass where only listed objects may spawn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClearingDefinition {
    pub count: CountRange,
    pub min_size: Vec2,
    pub max_size: Vec2,
    #[serde(default)]
    pub allowed: Vec<String>,
    #[serde(default)]
    pub obstacles: Vec<ClearingObstacle>,
}

/// Obstacles scattered in a ring around one validated anchor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObstacleClump {
    pub count: u32,
    pub min_amount: u32,
    pub max_amount: u32,
    pub radius: f32,
    #[serde(default)]
    pub jitter: f32,
    pub obstacles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedSpawn {
    pub id: String,
    pub weight: f32,
}

/// `count` picks from a weighted list of buildings and obstacles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedBatch {
    pub count: u32,
    pub items: Vec<WeightedSpawn>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LootSpawn {
    pub table: String,
    pub count: u32,
}

/// Named label; `position` is a fraction of the map size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceDefinition {
    pub name: String,
    pub position: Vec2,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IslandGroup {
    #[serde(default)]
    pub count: Option<CountRange>,
    #[serde(default)]
    pub spawn: IslandSpawn,
    #[serde(default = "default_spawn_attempts")]
    pub spawn_attempts: u32,
    #[serde(default)]
    pub island: IslandDefinition,
    #[serde(default)]
    pub rivers: Option<RiverDefinition>,
    #[serde(default)]
    pub trails: Option<RiverDefinition>,
    #[serde(default)]
    pub clearings: Vec<ClearingDefinition>,
    #[serde(default)]
    pub weighted: Vec<WeightedBatch>,
    #[serde(default)]
    pub buildings: BTreeMap<String, u32>,
    #[serde(default)]
    pub obstacles: BTreeMap<String, u32>,
    #[serde(default)]
    pub obstacle_clumps: Vec<ObstacleClump>,
    #[serde(default)]
    pub loots: Vec<LootSpawn>,
}

fn default_spawn_attempts() -> u32 {
    DEFAULT_ISLAND_ATTEMPTS
}

impl IslandGroup {
    pub fn new(island: IslandDefinition) -> Self {
        Self {
            count: None,
            spawn: IslandSpawn::default(),
            spawn_attempts: DEFAULT_ISLAND_ATTEMPTS,
            island,
            rivers: None,
            trails: None,
            clearings: Vec::new(),
            weighted: Vec::new(),
            buildings: BTreeMap::new(),
            obstacles: BTreeMap::new(),
            obstacle_clumps: Vec::new(),
            loots: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapDefinition {
    pub name: String,
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub ocean_size: f32,
    #[serde(default)]
    pub beach_size: f32,
    #[serde(default)]
    pub ocean_floor: Option<FloorType>,
    #[serde(default)]
    pub islands: Vec<IslandGroup>,
    #[serde(default)]
    pub places: Vec<PlaceDefinition>,
    /// Max copies of a building id per quadrant
    #[serde(default)]
    pub quad_building_limit: BTreeMap<String, u32>,
    /// One per quadrant, spaced apart
    #[serde(default)]
    pub major_buildings: Vec<String>,
}

impl MapDefinition {
    pub fn new(name: &str, width: f32, height: f32) -> Self {
        Self {
            name: name.to_string(),
            width,
            height,
            ocean_size: 0.0,
            beach_size: 0.0,
            ocean_floor: Some(FloorType::Water),
            islands: Vec::new(),
            places: Vec::new(),
            quad_building_limit: BTreeMap::new(),
            major_buildings: Vec::new(),
        }
    }

    pub fn from_ron_str(source: &str) -> Result<Self, MapError> {
        ron::from_str(source).map_err(|e| MapError::Parse(e.to_string()))
    }

    pub fn is_major(&self, id: &str) -> bool {
        self.major_buildings.iter().any(|m| m == id)
    }

    /// Resolve every id the map references. Anything unresolvable is fatal.
    pub fn validate(&self, registry: &DefinitionRegistry) -> Result<(), MapError> {
        if !(self.width > 0.0 && self.height > 0.0) {
            return Err(MapError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }

        for (index, group) in self.islands.iter().enumerate() {
            let invalid = |reason: &str| MapError::InvalidIsland {
                index,
                reason: reason.to_string(),
            };
            let island = &group.island;
            if island.interior_size.x <= 0.0 || island.interior_size.y <= 0.0 {
                return Err(invalid("interior size must be positive"));
            }
            if island.beach_size < 0.0 {
                return Err(invalid("beach size must not be negative"));
            }
            if group.count.is_some_and(|c| c.min > c.max) {
                return Err(invalid("count min exceeds max"));
            }
            for river in group.rivers.iter().chain(&group.trails) {
                if river.min_amount > river.max_amount {
                    return Err(invalid("river min_amount exceeds max_amount"));
                }
            }

            for id in group.buildings.keys() {
                registry.reify_building(id)?;
            }
            for id in group.obstacles.keys() {
                registry.reify_obstacle(id)?;
            }
            for batch in &group.weighted {
                for item in &batch.items {
                    registry.classify(&item.id)?;
                }
            }
            for clump in &group.obstacle_clumps {
                if clump.obstacles.is_empty() {
                    return Err(invalid("obstacle clump lists no obstacles"));
                }
                for id in &clump.obstacles {
                    registry.reify_obstacle(id)?;
                }
            }
            for clearing in &group.clearings {
                for obstacle in &clearing.obstacles {
                    registry.reify_obstacle(&obstacle.id)?;
                }
            }
            for loot in &group.loots {
                if !registry.loot_tables.contains_key(&loot.table) {
                    return Err(DefinitionError::UnknownLootTable(loot.table.clone()).into());
                }
            }
        }

        for id in self.quad_building_limit.keys().chain(&self.major_buildings) {
            registry.reify_building(id)?;
        }
        Ok(())
    }
}
