//! World layout: the `GameMap` placement engine.
//!
//! `GameMap::new` lays out one world from a `MapDefinition`:
//! 1. Islands (attempt-bounded placement, then terrain carving)
//! 2. Rivers and trails grown across each island
//! 3. Clearings, weighted batches, buildings (bridges on rivers), obstacles,
//!    obstacle clumps and loot, all through `get_random_position`
//! 4. Named places and the cached client snapshot
//!
//! All randomness flows through one `SeededRandom`, so the same seed and
//! definition always produce the same world.

pub mod bridges;
pub mod definition;
pub mod islands;
pub mod placement;
pub mod snapshot;

use std::collections::BTreeMap;
use std::sync::Arc;

use bevy::math::Vec2;
use bevy::prelude::Resource;
use tracing::{debug, info, warn};

use crate::constants::LOOT_RADIUS;
use crate::definitions::{DefinitionError, DefinitionRegistry, ObjectRef};
use crate::floor::Layer;
use crate::geometry::{Hitbox, Orientation, RectHitbox};
use crate::grid::{GameObject, ObjectCategory, ObjectGrid, ObjectId, ObjectKind};
use crate::logging::TimingSpan;
use crate::random::SeededRandom;
use crate::terrain::{IslandReturn, Terrain};

pub use definition::{IslandGroup, MapDefinition};
pub use placement::{BuildingConstraint, PositionParams, Sampler, SpawnPoint};
pub use snapshot::WorldSnapshot;

#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error("invalid map dimensions {width}x{height}")]
    InvalidDimensions { width: f32, height: f32 },

    #[error("invalid island group {index}: {reason}")]
    InvalidIsland { index: usize, reason: String },

    #[error("snapshot encoding failed: {0}")]
    Snapshot(String),

    #[error("map parse error: {0}")]
    Parse(String),
}

/// A generated island and the rivers carved across it
#[derive(Debug, Clone)]
pub struct Island {
    pub geometry: IslandReturn,
    /// Indices into `Terrain::rivers`
    pub rivers: Vec<usize>,
}

/// Rectangle where only allow-listed objects may spawn
#[derive(Debug, Clone, PartialEq)]
pub struct Clearing {
    pub rect: RectHitbox,
    pub allowed: Vec<String>,
}

impl Clearing {
    pub fn allows(&self, id: Option<&str>) -> bool {
        id.is_some_and(|id| self.allowed.iter().any(|a| a == id))
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Place {
    pub name: String,
    pub position: Vec2,
}

/// A building placed during generation, kept for the post-start pass
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedBuilding {
    pub object: ObjectId,
    pub definition: String,
    pub position: Vec2,
    pub orientation: Orientation,
    pub layer: Layer,
    pub tags: Vec<String>,
}

#[derive(Resource)]
pub struct GameMap {
    definition: MapDefinition,
    registry: Arc<DefinitionRegistry>,
    rng: SeededRandom,
    terrain: Terrain,
    grid: ObjectGrid,
    islands: Vec<Island>,
    clearings: Vec<Clearing>,
    places: Vec<Place>,
    /// Per building id, placements in each quadrant
    quadrant_counts: BTreeMap<String, [u32; 4]>,
    major_positions: Vec<Vec2>,
    major_quadrants: [bool; 4],
    bridge_positions: Vec<Vec2>,
    smart_cursor: (u32, u32),
    placed_buildings: Vec<PlacedBuilding>,
    snapshot: Arc<[u8]>,
}

impl GameMap {
    /// Lay out a complete world. Only configuration problems are errors;
    /// placements that run out of attempts are logged and skipped.
    pub fn new(
        definition: MapDefinition,
        registry: DefinitionRegistry,
        seed: u32,
    ) -> Result<Self, MapError> {
        definition.validate(&registry)?;
        info!(map = %definition.name, seed, "Generating world");

        let terrain = Terrain::new(
            definition.width,
            definition.height,
            seed,
            definition.ocean_floor,
        );
        let mut map = Self {
            grid: ObjectGrid::new(definition.width, definition.height),
            registry: Arc::new(registry),
            rng: SeededRandom::new(seed),
            terrain,
            islands: Vec::new(),
            clearings: Vec::new(),
            places: Vec::new(),
            quadrant_counts: BTreeMap::new(),
            major_positions: Vec::new(),
            major_quadrants: [false; 4],
            bridge_positions: Vec::new(),
            smart_cursor: (0, 0),
            placed_buildings: Vec::new(),
            snapshot: Arc::from(Vec::new()),
            definition,
        };

        let groups = map.definition.islands.clone();
        for (group_index, group) in groups.iter().enumerate() {
            map.generate_island_group(group_index, group)?;
        }

        map.places = map
            .definition
            .places
            .iter()
            .map(|p| Place {
                name: p.name.clone(),
                position: p.position * Vec2::new(map.definition.width, map.definition.height),
            })
            .collect();

        {
            let _span = TimingSpan::new("snapshot");
            map.snapshot = Arc::from(WorldSnapshot::capture(&map).to_bytes()?);
        }

        info!(
            islands = map.islands.len(),
            rivers = map.terrain.rivers().len(),
            buildings = map.grid.count(ObjectCategory::Building),
            obstacles = map.grid.count(ObjectCategory::Obstacle),
            loot = map.grid.count(ObjectCategory::Loot),
            snapshot_bytes = map.snapshot.len(),
            "World generated"
        );
        Ok(map)
    }

    fn generate_island_group(
        &mut self,
        group_index: usize,
        group: &IslandGroup,
    ) -> Result<(), MapError> {
        let count = match group.count {
            Some(range) => range.roll(&mut self.rng),
            None => 1,
        };
        if let definition::IslandSpawn::Smart { row, column } = group.spawn {
            self.smart_cursor = (
                row.unwrap_or(self.smart_cursor.0),
                column.unwrap_or(self.smart_cursor.1),
            );
        }

        for _ in 0..count {
            let island = {
                let _span = TimingSpan::new("islands");
                match self.place_island(group) {
                    Some(index) => index,
                    None => {
                        warn!(
                            group = group_index,
                            attempts = group.spawn_attempts,
                            "No room for island, skipping"
                        );
                        continue;
                    }
                }
            };

            {
                let _span = TimingSpan::new("rivers");
                if let Some(rivers) = &group.rivers {
                    self.generate_rivers(island, rivers, false);
                }
                if let Some(trails) = &group.trails {
                    self.generate_rivers(island, trails, true);
                }
            }

            for clearing in &group.clearings {
                self.generate_clearings(island, clearing)?;
            }

            {
                let _span = TimingSpan::new("buildings");
                for batch in &group.weighted {
                    self.generate_weighted(island, batch)?;
                }
                for (id, count) in &group.buildings {
                    self.generate_buildings(island, id, *count)?;
                }
            }

            {
                let _span = TimingSpan::new("obstacles");
                for (id, count) in &group.obstacles {
                    for _ in 0..*count {
                        self.generate_random_obstacle(island, id)?;
                    }
                }
                for clump in &group.obstacle_clumps {
                    self.generate_obstacle_clumps(island, clump)?;
                }
            }

            {
                let _span = TimingSpan::new("loot");
                for loot in &group.loots {
                    for _ in 0..loot.count {
                        self.generate_random_loot(island, &loot.table)?;
                    }
                }
            }
        }
        Ok(())
    }

    // =====================================================
    // Accessors
    // =====================================================

    pub fn definition(&self) -> &MapDefinition {
        &self.definition
    }

    pub fn registry(&self) -> &DefinitionRegistry {
        &self.registry
    }

    pub fn seed(&self) -> u32 {
        self.rng.seed()
    }

    pub fn width(&self) -> f32 {
        self.definition.width
    }

    pub fn height(&self) -> f32 {
        self.definition.height
    }

    pub fn terrain(&self) -> &Terrain {
        &self.terrain
    }

    pub fn grid(&self) -> &ObjectGrid {
        &self.grid
    }

    pub fn islands(&self) -> &[Island] {
        &self.islands
    }

    pub fn clearings(&self) -> &[Clearing] {
        &self.clearings
    }

    pub fn places(&self) -> &[Place] {
        &self.places
    }

    pub fn placed_buildings(&self) -> &[PlacedBuilding] {
        &self.placed_buildings
    }

    /// Serialized world snapshot, computed once at the end of generation
    pub fn snapshot_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.snapshot)
    }

    /// Quadrant index of a position: 0 top-left, 1 top-right, 2 bottom-left,
    /// 3 bottom-right
    pub fn quadrant(&self, position: Vec2) -> usize {
        let right = position.x >= self.definition.width / 2.0;
        let bottom = position.y >= self.definition.height / 2.0;
        right as usize + 2 * bottom as usize
    }

    pub fn quadrant_count(&self, id: &str, quadrant: usize) -> u32 {
        self.quadrant_counts
            .get(id)
            .and_then(|counts| counts.get(quadrant))
            .copied()
            .unwrap_or(0)
    }

    /// Hand each placed building to `hook` once. Later calls see nothing.
    pub fn run_post_start(&mut self, mut hook: impl FnMut(&PlacedBuilding)) -> usize {
        let placed = std::mem::take(&mut self.placed_buildings);
        for building in &placed {
            hook(building);
        }
        placed.len()
    }

    // =====================================================
    // Object creation
    // =====================================================

    /// Place building `id` at an exact position, with its floors, sub-objects
    /// and loot spawners.
    pub fn generate_building(
        &mut self,
        id: &str,
        position: Vec2,
        orientation: Orientation,
        layer: Layer,
    ) -> Result<ObjectId, MapError> {
        let registry = Arc::clone(&self.registry);
        let definition = registry.reify_building(id)?;

        let object = self.grid.add_object(GameObject {
            id: 0,
            kind: ObjectKind::Building {
                definition: id.to_string(),
                orientation,
            },
            layer,
            position,
            hitbox: definition.hitbox.transform(position, 1.0, orientation),
            spawn_hitbox: definition.spawn_hitbox.transform(position, 1.0, orientation),
            hidden: definition.hide_on_map,
        });

        for floor in &definition.floors {
            self.terrain.add_floor(
                floor.floor_type,
                floor.hitbox.transform(position, 1.0, orientation),
                layer.offset(floor.layer_offset),
                true,
            );
        }

        for sub in &definition.obstacles {
            self.generate_obstacle(
                &sub.id,
                position + orientation.rotate(sub.position),
                orientation.add(sub.orientation),
                0.0,
                sub.scale.unwrap_or(1.0),
                sub.variation.unwrap_or(0),
                layer.offset(sub.layer_offset),
            )?;
        }

        for sub in &definition.sub_buildings {
            let sub_position = position + orientation.rotate(sub.position);
            let constraint = PositionParams {
                building: Some(BuildingConstraint {
                    id: &sub.id,
                    major: self.definition.is_major(&sub.id),
                }),
                ..Default::default()
            };
            if !self.building_allows(sub_position, &constraint) {
                warn!(parent = id, id = %sub.id, "Sub-building breaks a quadrant or landmark rule, skipped");
                continue;
            }
            self.generate_building(
                &sub.id,
                sub_position,
                orientation.add(sub.orientation),
                layer.offset(sub.layer_offset),
            )?;
        }

        for spawner in &definition.loot_spawners {
            self.generate_loot(
                &spawner.table,
                position + orientation.rotate(spawner.position),
                layer,
            )?;
        }

        let quadrant = self.quadrant(position);
        if self.definition.quad_building_limit.contains_key(id) {
            self.quadrant_counts.entry(id.to_string()).or_insert([0; 4])[quadrant] += 1;
        }
        if self.definition.is_major(id) {
            self.major_quadrants[quadrant] = true;
            self.major_positions.push(position);
        }

        self.placed_buildings.push(PlacedBuilding {
            object,
            definition: id.to_string(),
            position,
            orientation,
            layer,
            tags: definition.post_start_tags.clone(),
        });
        debug!(id, x = position.x, y = position.y, ?orientation, "Placed building");
        Ok(object)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn generate_obstacle(
        &mut self,
        id: &str,
        position: Vec2,
        orientation: Orientation,
        rotation: f32,
        scale: f32,
        variation: u8,
        layer: Layer,
    ) -> Result<ObjectId, MapError> {
        let registry = Arc::clone(&self.registry);
        let definition = registry.reify_obstacle(id)?;
        Ok(self.grid.add_object(GameObject {
            id: 0,
            kind: ObjectKind::Obstacle {
                definition: id.to_string(),
                orientation,
                rotation,
                scale,
                variation,
            },
            layer,
            position,
            hitbox: definition.hitbox.transform(position, scale, orientation),
            spawn_hitbox: definition.spawn_hitbox().transform(position, scale, orientation),
            hidden: definition.hide_on_map,
        }))
    }

    /// Roll a loot table and drop every item at `position`
    pub fn generate_loot(
        &mut self,
        table: &str,
        position: Vec2,
        layer: Layer,
    ) -> Result<Vec<ObjectId>, MapError> {
        let items = self.registry.get_loot_from_table(table, &mut self.rng)?;
        let hitbox = Hitbox::circle(LOOT_RADIUS, position);
        Ok(items
            .into_iter()
            .map(|item| {
                self.grid.add_object(GameObject {
                    id: 0,
                    kind: ObjectKind::Loot {
                        id_string: item.id_string,
                        count: item.count,
                    },
                    layer,
                    position,
                    hitbox: hitbox.clone(),
                    spawn_hitbox: hitbox.clone(),
                    hidden: false,
                })
            })
            .collect())
    }

    // =====================================================
    // Random placement
    // =====================================================

    /// Pick a spot for building `id` on `island` and place it
    pub fn generate_random_building(
        &mut self,
        island: usize,
        id: &str,
    ) -> Result<Option<ObjectId>, MapError> {
        let registry = Arc::clone(&self.registry);
        let definition = registry.reify_building(id)?;
        let (orientation, _) = definition.rotation_mode.roll(&mut self.rng);

        let params = PositionParams {
            spawn_mode: definition.spawn_mode,
            island: Some(island),
            orientation,
            object_id: Some(id),
            building: Some(BuildingConstraint {
                id,
                major: self.definition.is_major(id),
            }),
            ..Default::default()
        };
        match self.get_random_position(&definition.spawn_hitbox, &params) {
            Some(spot) => self
                .generate_building(id, spot.position, spot.orientation, params.layer)
                .map(Some),
            None => {
                warn!(id, island, attempts = params.max_attempts, "No valid position for building");
                Ok(None)
            }
        }
    }

    pub fn generate_random_obstacle(
        &mut self,
        island: usize,
        id: &str,
    ) -> Result<Option<ObjectId>, MapError> {
        self.generate_random_obstacle_with(island, id, None, false)
    }

    fn generate_random_obstacle_with(
        &mut self,
        island: usize,
        id: &str,
        sampler: Option<Sampler>,
        ignore_clearings: bool,
    ) -> Result<Option<ObjectId>, MapError> {
        let registry = Arc::clone(&self.registry);
        let definition = registry.reify_obstacle(id)?;
        let scale = definition.scale.roll(&mut self.rng);
        let (orientation, rotation) = definition.rotation_mode.roll(&mut self.rng);
        let variation = if definition.variations > 0 {
            self.rng.next_int(0, definition.variations as i32 - 1) as u8
        } else {
            0
        };

        let params = PositionParams {
            spawn_mode: definition.spawn_mode,
            island: Some(island),
            sampler,
            scale,
            orientation,
            ignore_clearings,
            object_id: Some(id),
            ..Default::default()
        };
        match self.get_random_position(definition.spawn_hitbox(), &params) {
            Some(spot) => self
                .generate_obstacle(
                    id,
                    spot.position,
                    spot.orientation,
                    rotation,
                    scale,
                    variation,
                    params.layer,
                )
                .map(Some),
            None => {
                warn!(id, island, attempts = params.max_attempts, "No valid position for obstacle");
                Ok(None)
            }
        }
    }

    pub fn generate_random_loot(
        &mut self,
        island: usize,
        table: &str,
    ) -> Result<Vec<ObjectId>, MapError> {
        let params = PositionParams {
            spawn_mode: crate::definitions::SpawnMode::GrassAndSand,
            island: Some(island),
            ..Default::default()
        };
        let footprint = Hitbox::circle(LOOT_RADIUS, Vec2::ZERO);
        match self.get_random_position(&footprint, &params) {
            Some(spot) => self.generate_loot(table, spot.position, params.layer),
            None => {
                warn!(table, island, attempts = params.max_attempts, "No valid position for loot");
                Ok(Vec::new())
            }
        }
    }

    fn generate_buildings(&mut self, island: usize, id: &str, count: u32) -> Result<(), MapError> {
        if self.registry.reify_building(id)?.is_bridge() {
            self.generate_bridges(island, id, count)?;
            return Ok(());
        }
        for _ in 0..count {
            self.generate_random_building(island, id)?;
        }
        Ok(())
    }

    fn generate_weighted(
        &mut self,
        island: usize,
        batch: &definition::WeightedBatch,
    ) -> Result<(), MapError> {
        let weighted: Vec<(&str, f32)> = batch
            .items
            .iter()
            .map(|item| (item.id.as_str(), item.weight))
            .collect();
        let registry = Arc::clone(&self.registry);
        for _ in 0..batch.count {
            let Some(id) = self.rng.pick_weighted(&weighted).copied() else {
                break;
            };
            match registry.classify(id)? {
                ObjectRef::Building(building) if building.is_bridge() => {
                    self.generate_bridges(island, id, 1)?;
                }
                ObjectRef::Building(_) => {
                    self.generate_random_building(island, id)?;
                }
                ObjectRef::Obstacle(_) => {
                    self.generate_random_obstacle(island, id)?;
                }
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for GameMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameMap")
            .field("name", &self.definition.name)
            .field("seed", &self.rng.seed())
            .field("islands", &self.islands.len())
            .field("objects", &self.grid.len())
            .finish()
    }
}
