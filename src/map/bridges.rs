//! Bridge placement.
//!
//! Bridges are buildings with a `bridge_hitbox`. Candidates are sampled along
//! each true river of the island inside two parameter windows, aligned with
//! the quarter turn closest to the local flow direction. A window yields at
//! most one bridge.

use bevy::math::Vec2;
use tracing::{debug, warn};

use super::placement::{BuildingConstraint, PositionParams};
use super::{GameMap, MapError};
use crate::constants::{BRIDGE_STEP, BRIDGE_WINDOWS};
use crate::floor::Layer;
use crate::geometry::{angle_between, Orientation};
use crate::grid::ObjectId;

/// Positions closer than this count as the same bridge site
const DUPLICATE_DIST_SQ: f32 = 1.0;

/// Quarter turn whose angle is nearest to `direction`
pub fn closest_orientation(direction: Vec2) -> Orientation {
    let angle = direction.y.atan2(direction.x);
    Orientation::ALL
        .into_iter()
        .min_by(|a, b| {
            angle_between(a.angle(), angle).total_cmp(&angle_between(b.angle(), angle))
        })
        .unwrap_or_default()
}

/// Angular distance from `direction` to its nearest quarter turn
fn misalignment(direction: Vec2) -> f32 {
    let angle = direction.y.atan2(direction.x);
    angle_between(closest_orientation(direction).angle(), angle)
}

/// Parameters scanned inside one window, ends included
fn window_steps(start: f32, end: f32) -> impl Iterator<Item = f32> {
    let steps = ((end - start) / BRIDGE_STEP).round() as u32;
    (0..=steps).map(move |i| start + i as f32 * BRIDGE_STEP)
}

impl GameMap {
    /// Place up to `count` copies of bridge `id` across the island's rivers.
    ///
    /// Each window of each true river offers one site: the step whose flow
    /// direction is closest to a quarter turn. The site is dropped if its
    /// footprint hits an object, it repeats an earlier bridge, or it breaks a
    /// quadrant limit or landmark rule. Falling short is logged, not an error.
    pub fn generate_bridges(
        &mut self,
        island: usize,
        id: &str,
        count: u32,
    ) -> Result<Vec<ObjectId>, MapError> {
        let registry = std::sync::Arc::clone(&self.registry);
        let definition = registry.reify_building(id)?;
        let Some(bridge_hitbox) = &definition.bridge_hitbox else {
            return Ok(Vec::new());
        };
        let constraint = PositionParams {
            building: Some(BuildingConstraint {
                id,
                major: self.definition.is_major(id),
            }),
            ..Default::default()
        };

        let rivers: Vec<usize> = self
            .islands
            .get(island)
            .map(|i| i.rivers.clone())
            .unwrap_or_default();

        let mut placed = Vec::new();
        'rivers: for river_index in rivers {
            for (start, end) in BRIDGE_WINDOWS {
                if placed.len() as u32 >= count {
                    break 'rivers;
                }
                let Some(river) = self.terrain.rivers().get(river_index) else {
                    continue 'rivers;
                };
                if river.is_trail {
                    continue 'rivers;
                }

                let Some(t) = window_steps(start, end).min_by(|&a, &b| {
                    misalignment(river.tangent(a)).total_cmp(&misalignment(river.tangent(b)))
                }) else {
                    continue;
                };
                let position = river.position(t);
                let orientation = closest_orientation(river.tangent(t));
                let footprint = bridge_hitbox.transform(position, 1.0, orientation);

                if self.collides_with_objects(&footprint, Layer::Ground) {
                    continue;
                }
                if self
                    .bridge_positions
                    .iter()
                    .any(|p| p.distance_squared(position) < DUPLICATE_DIST_SQ)
                {
                    continue;
                }
                if !self.building_allows(position, &constraint) {
                    continue;
                }

                let object = self.generate_building(id, position, orientation, Layer::Ground)?;
                self.bridge_positions.push(position);
                placed.push(object);
                debug!(id, river = river_index, t, "Placed bridge");
            }
        }

        if (placed.len() as u32) < count {
            warn!(
                id,
                island,
                requested = count,
                placed = placed.len(),
                "Not enough bridge sites"
            );
        }
        Ok(placed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definitions::{BuildingDefinition, DefinitionRegistry};
    use crate::floor::FloorType;
    use crate::geometry::{Hitbox, RectHitbox};
    use crate::grid::ObjectCategory;
    use crate::map::definition::IslandSpawn;
    use crate::map::{IslandGroup, MapDefinition};
    use crate::river::{River, RiverParams};
    use crate::terrain::IslandDefinition;

    /// River from `(x, y0)` to `(x, y1)` with evenly spaced points
    fn vertical(x: f32, y0: f32, y1: f32, is_trail: bool) -> River {
        let points = (0..5)
            .map(|i| Vec2::new(x, y0 + (y1 - y0) * i as f32 / 4.0))
            .collect();
        River::new(RiverParams {
            width: 12.0,
            points,
            other_rivers: &[],
            bounds: RectHitbox::new(Vec2::splat(-10_000.0), Vec2::splat(10_000.0)),
            is_trail,
            floor: if is_trail { FloorType::Dirt } else { FloorType::Water },
            outline: FloorType::Sand,
            hitboxes: None,
        })
    }

    fn bridge() -> BuildingDefinition {
        BuildingDefinition {
            id: String::new(),
            spawn_hitbox: Hitbox::rect(Vec2::new(-10.0, -30.0), Vec2::new(10.0, 30.0)),
            hitbox: Hitbox::rect(Vec2::new(-8.0, -28.0), Vec2::new(8.0, 28.0)),
            bridge_hitbox: Some(Hitbox::rect(Vec2::new(-10.0, -30.0), Vec2::new(10.0, 30.0))),
            spawn_mode: Default::default(),
            rotation_mode: Default::default(),
            floors: Vec::new(),
            obstacles: Vec::new(),
            sub_buildings: Vec::new(),
            loot_spawners: Vec::new(),
            hide_on_map: false,
            post_start_tags: Vec::new(),
        }
    }

    /// One bare island with the given rivers attached to it
    fn map_with_rivers(rivers: Vec<River>, configure: impl FnOnce(&mut MapDefinition)) -> GameMap {
        let mut registry = DefinitionRegistry::default();
        registry.insert_building("bridge", bridge());
        let mut definition = MapDefinition::new("bridges", 1024.0, 1024.0);
        let mut group = IslandGroup::new(IslandDefinition {
            beach_size: 32.0,
            interior_size: Vec2::new(800.0, 800.0),
            ..Default::default()
        });
        group.spawn = IslandSpawn::Center;
        definition.islands.push(group);
        configure(&mut definition);

        let mut map = GameMap::new(definition, registry, 5).unwrap();
        let first = map.terrain.rivers().len();
        let added = rivers.len();
        map.terrain.add_rivers(rivers);
        map.islands[0].rivers = (first..first + added).collect();
        map
    }

    fn bridge_positions(map: &GameMap) -> Vec<Vec2> {
        map.grid()
            .objects()
            .filter(|o| o.category() == ObjectCategory::Building)
            .map(|o| o.position)
            .collect()
    }

    #[test]
    fn test_one_bridge_per_window_and_none_on_trails() {
        let mut map = map_with_rivers(
            vec![vertical(700.0, 150.0, 850.0, true), vertical(300.0, 150.0, 850.0, false)],
            |_| {},
        );
        let placed = map.generate_bridges(0, "bridge", 5).unwrap();
        assert_eq!(placed.len(), 2);

        let positions = bridge_positions(&map);
        assert!(positions.iter().all(|p| (p.x - 300.0).abs() < 1.0), "{positions:?}");
        // parameter windows 0.1..0.4 and 0.6..0.9, roughly y = 150 + 700 t
        let in_window = |y: f32, start: f32, end: f32| {
            y >= 150.0 + 700.0 * start - 20.0 && y <= 150.0 + 700.0 * end + 20.0
        };
        assert_eq!(positions.iter().filter(|p| in_window(p.y, 0.1, 0.4)).count(), 1);
        assert_eq!(positions.iter().filter(|p| in_window(p.y, 0.6, 0.9)).count(), 1);
    }

    #[test]
    fn test_stops_at_count_and_rejects_repeats() {
        let mut map = map_with_rivers(vec![vertical(300.0, 150.0, 850.0, false)], |_| {});
        assert_eq!(map.generate_bridges(0, "bridge", 1).unwrap().len(), 1);
        // the first window's site is taken, the second window is still free
        assert_eq!(map.generate_bridges(0, "bridge", 1).unwrap().len(), 1);
        assert!(map.generate_bridges(0, "bridge", 3).unwrap().is_empty());
        assert_eq!(bridge_positions(&map).len(), 2);
    }

    #[test]
    fn test_bridges_respect_quadrant_limit() {
        // both windows fall in the top-left quadrant
        let mut map = map_with_rivers(vec![vertical(300.0, 100.0, 480.0, false)], |definition| {
            definition.quad_building_limit.insert("bridge".into(), 1);
        });
        assert_eq!(map.generate_bridges(0, "bridge", 2).unwrap().len(), 1);
        assert_eq!(map.quadrant_count("bridge", 0), 1);
    }

    #[test]
    fn test_major_bridges_keep_landmark_spacing() {
        let mut map = map_with_rivers(vec![vertical(300.0, 100.0, 480.0, false)], |definition| {
            definition.major_buildings.push("bridge".into());
        });
        assert_eq!(map.generate_bridges(0, "bridge", 2).unwrap().len(), 1);
    }

    #[test]
    fn test_closest_orientation() {
        assert_eq!(closest_orientation(Vec2::new(1.0, 0.1)), Orientation::East);
        // y-down: negative y is north
        assert_eq!(closest_orientation(Vec2::new(0.1, -1.0)), Orientation::North);
        assert_eq!(closest_orientation(Vec2::new(-1.0, 0.2)), Orientation::West);
        assert_eq!(closest_orientation(Vec2::new(0.0, 1.0)), Orientation::South);
    }

    #[test]
    fn test_window_steps_include_ends() {
        let steps: Vec<f32> = window_steps(0.1, 0.4).collect();
        assert_eq!(steps.len(), 7);
        assert!((steps[0] - 0.1).abs() < 1e-6);
        assert!((steps[6] - 0.4).abs() < 1e-5);
    }
}
