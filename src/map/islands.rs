//! Island placement, river growth, clearings and obstacle clumps.

use std::f32::consts::{FRAC_PI_4, TAU};

use bevy::math::Vec2;
use tracing::{debug, warn};

use super::definition::{ClearingDefinition, IslandGroup, IslandSpawn, ObstacleClump, RiverDefinition};
use super::placement::{PositionParams, Sampler};
use super::{Clearing, GameMap, Island, MapError};
use crate::constants::{
    CLEARING_ATTEMPTS, RIVER_MAX_ACCEPTED_POINTS, RIVER_MAX_POINTS, RIVER_MIN_ACCEPTED_POINTS,
    RIVER_SPAWN_ATTEMPTS, RIVER_STEP_MAX, RIVER_STEP_MIN, SMART_ISLAND_GAP, TRAIL_MAX_POINTS,
};
use crate::floor::Layer;
use crate::geometry::{polar, Hitbox, RectHitbox};
use crate::river::{River, RiverParams};

impl GameMap {
    // =====================================================
    // Islands
    // =====================================================

    /// Try up to `spawn_attempts` positions for one island of `group`. On
    /// success the island is carved into the terrain and its index returned.
    pub(super) fn place_island(&mut self, group: &IslandGroup) -> Option<usize> {
        let size = group.island.total_size();
        let map_rect = RectHitbox::new(Vec2::ZERO, Vec2::new(self.width(), self.height()));

        for _ in 0..group.spawn_attempts {
            let position = match group.spawn {
                IslandSpawn::Center => {
                    (Vec2::new(self.width(), self.height()) - size) / 2.0
                }
                IslandSpawn::Smart { .. } => self.next_smart_position(size),
                IslandSpawn::Random => self.rng.point_in_rect(
                    Vec2::ZERO,
                    (Vec2::new(self.width(), self.height()) - size).max(Vec2::ZERO),
                ),
            };

            let rect = RectHitbox::new(position, position + size);
            if !map_rect.contains_rect(&rect) {
                continue;
            }
            if self
                .islands
                .iter()
                .any(|island| island.geometry.beach_rect.overlaps(&rect))
            {
                continue;
            }

            let geometry = self
                .terrain
                .generate_island(&group.island, position, &mut self.rng);
            self.islands.push(Island {
                geometry,
                rivers: Vec::new(),
            });
            return Some(self.islands.len() - 1);
        }
        None
    }

    /// Next cell of the row/column tiling, wrapping to a new row at the map's
    /// right edge
    fn next_smart_position(&mut self, size: Vec2) -> Vec2 {
        let stride = size + Vec2::splat(SMART_ISLAND_GAP);
        let (mut row, mut column) = self.smart_cursor;
        let mut position = Vec2::splat(SMART_ISLAND_GAP) + stride * Vec2::new(column as f32, row as f32);
        if column > 0 && position.x + size.x > self.width() {
            row += 1;
            column = 0;
            position = Vec2::splat(SMART_ISLAND_GAP) + stride * Vec2::new(0.0, row as f32);
        }
        self.smart_cursor = (row, column + 1);
        position
    }

    // =====================================================
    // Rivers
    // =====================================================

    /// Grow `min_amount..=max_amount` rivers (or trails) across an island,
    /// widest first
    pub(super) fn generate_rivers(&mut self, island: usize, definition: &RiverDefinition, is_trail: bool) {
        let amount = self
            .rng
            .next_int(definition.min_amount as i32, definition.max_amount as i32);
        let mut widths: Vec<f32> = (0..amount)
            .map(|_| {
                if self.rng.chance(definition.wide_chance) {
                    self.rng.next(definition.min_wide_width, definition.max_wide_width)
                } else {
                    self.rng.next(definition.min_width, definition.max_width)
                }
            })
            .collect();
        widths.sort_by(|a, b| b.total_cmp(a));

        let geometry = &self.islands[island].geometry;
        let bounds = if is_trail {
            geometry.grass_rect
        } else {
            geometry.beach_rect
        };

        for width in widths {
            match self.generate_river(bounds, width, is_trail, definition) {
                Some(river) => {
                    let index = self.terrain.rivers().len();
                    self.terrain.add_rivers([river]);
                    self.islands[island].rivers.push(index);
                }
                None => warn!(
                    island,
                    width,
                    trail = is_trail,
                    attempts = RIVER_SPAWN_ATTEMPTS,
                    "Could not grow river, skipping"
                ),
            }
        }
    }

    /// Grow one polyline from a random edge point of `bounds`, heading for the
    /// center with seeded angular drift that narrows as it gets close. Stops on
    /// touching a river of the same kind or on leaving `bounds`.
    fn generate_river(
        &mut self,
        bounds: RectHitbox,
        width: f32,
        is_trail: bool,
        definition: &RiverDefinition,
    ) -> Option<River> {
        let center = bounds.center();
        let reach = (bounds.size() / 2.0).length().max(1.0);
        let max_points = if is_trail {
            TRAIL_MAX_POINTS
        } else {
            RIVER_MAX_POINTS
        };

        for _ in 0..RIVER_SPAWN_ATTEMPTS {
            let start = self.random_edge_point(&bounds);
            let heading = center - start;
            let mut angle = heading.y.atan2(heading.x);
            let mut points = vec![start];

            while points.len() < max_points {
                let current = points[points.len() - 1];
                let closeness = ((current - center).length() / reach).clamp(0.0, 1.0);
                let deviation = FRAC_PI_4 * closeness;
                angle += self.rng.next(-deviation, deviation);
                let step = self.rng.next_int(RIVER_STEP_MIN, RIVER_STEP_MAX) as f32;
                let next = current + polar(angle, step);

                if !bounds.contains(next) {
                    points.push(next.clamp(bounds.min, bounds.max));
                    break;
                }
                points.push(next);
                let joined = self.terrain.rivers().iter().any(|other| {
                    other.is_trail == is_trail && other.distance_to(next) < other.width
                });
                if joined {
                    break;
                }
            }

            if points.len() < RIVER_MIN_ACCEPTED_POINTS || points.len() > RIVER_MAX_ACCEPTED_POINTS {
                continue;
            }

            debug!(width, trail = is_trail, points = points.len(), "Grew river");
            return Some(River::new(RiverParams {
                width,
                points,
                other_rivers: self.terrain.rivers(),
                bounds,
                is_trail,
                floor: definition.floor,
                outline: definition.outline,
                hitboxes: None,
            }));
        }
        None
    }

    fn random_edge_point(&mut self, bounds: &RectHitbox) -> Vec2 {
        let (min, max) = (bounds.min, bounds.max);
        match self.rng.next_orientation().index() {
            0 => Vec2::new(max.x, self.rng.next(min.y, max.y)),
            1 => Vec2::new(self.rng.next(min.x, max.x), min.y),
            2 => Vec2::new(min.x, self.rng.next(min.y, max.y)),
            _ => Vec2::new(self.rng.next(min.x, max.x), max.y),
        }
    }

    // =====================================================
    // Clearings
    // =====================================================

    /// Reserve clearing rectangles inside the grass and fill them with their
    /// own obstacles
    pub(super) fn generate_clearings(
        &mut self,
        island: usize,
        definition: &ClearingDefinition,
    ) -> Result<(), MapError> {
        let count = definition.count.roll(&mut self.rng);
        for _ in 0..count {
            let Some(rect) = self.find_clearing(island, definition) else {
                warn!(island, attempts = CLEARING_ATTEMPTS, "No room for clearing, skipping");
                continue;
            };
            self.clearings.push(Clearing {
                rect,
                allowed: definition.allowed.clone(),
            });

            for obstacle in &definition.obstacles {
                for _ in 0..obstacle.count.roll(&mut self.rng) {
                    self.generate_random_obstacle_with(
                        island,
                        &obstacle.id,
                        Some(Sampler::Within(Hitbox::Rect(rect))),
                        true,
                    )?;
                }
            }
        }
        Ok(())
    }

    fn find_clearing(&mut self, island: usize, definition: &ClearingDefinition) -> Option<RectHitbox> {
        let grass = self.islands[island].geometry.grass_rect;
        for _ in 0..CLEARING_ATTEMPTS {
            let size = Vec2::new(
                self.rng.next(definition.min_size.x, definition.max_size.x),
                self.rng.next(definition.min_size.y, definition.max_size.y),
            );
            if size.x > grass.width() || size.y > grass.height() {
                continue;
            }
            let min = self.rng.point_in_rect(grass.min, grass.max - size);
            let rect = RectHitbox::new(min, min + size);
            let hitbox = Hitbox::Rect(rect);

            if self.clearings.iter().any(|c| c.rect.overlaps(&rect)) {
                continue;
            }
            if self
                .terrain
                .get_rivers_in_hitbox(&hitbox, Layer::Ground)
                .iter()
                .any(|river| river.bank_hitbox().collides_with(&hitbox))
            {
                continue;
            }
            if self.collides_with_objects(&hitbox, Layer::Ground) {
                continue;
            }
            return Some(rect);
        }
        None
    }

    // =====================================================
    // Obstacle clumps
    // =====================================================

    /// Validate one anchor per clump, then ring it with obstacles. Ring
    /// members are not re-validated.
    pub(super) fn generate_obstacle_clumps(
        &mut self,
        island: usize,
        clump: &ObstacleClump,
    ) -> Result<(), MapError> {
        for _ in 0..clump.count {
            let Some(id) = self.rng.pick(&clump.obstacles).cloned() else {
                return Ok(());
            };
            let definition = self.registry.reify_obstacle(&id)?.clone();

            let anchor = Hitbox::circle(clump.radius, Vec2::ZERO);
            let params = PositionParams {
                spawn_mode: definition.spawn_mode,
                island: Some(island),
                object_id: Some(id.as_str()),
                ..Default::default()
            };
            let Some(spot) = self.get_random_position(&anchor, &params) else {
                warn!(
                    id = %id,
                    island,
                    attempts = params.max_attempts,
                    "No valid position for obstacle clump"
                );
                continue;
            };

            let amount = self
                .rng
                .next_int(clump.min_amount as i32, clump.max_amount as i32)
                .max(0);
            let offset = self.rng.next_rotation();
            for k in 0..amount {
                let angle = offset + k as f32 * TAU / amount as f32;
                let jitter = Vec2::new(
                    self.rng.next(-clump.jitter, clump.jitter),
                    self.rng.next(-clump.jitter, clump.jitter),
                );
                let position = spot.position + polar(angle, clump.radius) + jitter;
                let scale = definition.scale.roll(&mut self.rng);
                let (orientation, rotation) = definition.rotation_mode.roll(&mut self.rng);
                self.generate_obstacle(&id, position, orientation, rotation, scale, 0, Layer::Ground)?;
            }
        }
        Ok(())
    }
}
