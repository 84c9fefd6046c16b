//! Generic rejection-sampling placement.
//!
//! Each attempt samples a candidate from the spawn mode's region, transforms
//! the caller's hitbox there and rejects it on object collision, a forbidden
//! river relationship, an unlisted clearing or a building constraint.
//! Exhausting the budget yields `None`; callers log and skip.

use bevy::math::Vec2;

use super::{GameMap, Island};
use crate::constants::{DEFAULT_MAX_ATTEMPTS, LANDMARK_MIN_DIST_SQ};
use crate::floor::Layer;
use crate::geometry::{Hitbox, Orientation, RectHitbox};
use crate::grid::ObjectCategory;
use crate::random::SeededRandom;
use crate::river::River;
use crate::terrain::Terrain;

pub use crate::definitions::SpawnMode;

/// Overrides the spawn mode's sampling region
#[derive(Debug, Clone, PartialEq)]
pub enum Sampler {
    /// Uniform point inside a hitbox
    Within(Hitbox),
}

/// Placement rules that only apply to buildings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildingConstraint<'a> {
    pub id: &'a str,
    pub major: bool,
}

#[derive(Debug, Clone)]
pub struct PositionParams<'a> {
    pub spawn_mode: SpawnMode,
    /// Island to sample on; `None` picks one per attempt
    pub island: Option<usize>,
    pub sampler: Option<Sampler>,
    pub layer: Layer,
    pub scale: f32,
    pub orientation: Orientation,
    pub max_attempts: u32,
    pub ignore_clearings: bool,
    /// Checked against clearing allow-lists
    pub object_id: Option<&'a str>,
    pub building: Option<BuildingConstraint<'a>>,
}

impl Default for PositionParams<'_> {
    fn default() -> Self {
        Self {
            spawn_mode: SpawnMode::Grass,
            island: None,
            sampler: None,
            layer: Layer::Ground,
            scale: 1.0,
            orientation: Orientation::East,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            ignore_clearings: false,
            object_id: None,
            building: None,
        }
    }
}

/// Accepted position. Beach placements face the side they were sampled on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnPoint {
    pub position: Vec2,
    pub orientation: Orientation,
}

impl GameMap {
    /// Find a position where `hitbox` (in local space) can be placed, or
    /// `None` after `max_attempts` rejected candidates.
    pub fn get_random_position(
        &mut self,
        hitbox: &Hitbox,
        params: &PositionParams<'_>,
    ) -> Option<SpawnPoint> {
        if self.islands.is_empty() && params.sampler.is_none() {
            return None;
        }

        for _ in 0..params.max_attempts {
            let island = match params.island {
                Some(index) => self.islands.get(index),
                None => self.rng.pick(&self.islands),
            };
            let Some((position, orientation)) = sample(
                island,
                &self.terrain,
                &mut self.rng,
                params,
                hitbox,
            ) else {
                continue;
            };

            let footprint = hitbox.transform(position, params.scale, orientation);
            if self.collides_with_objects(&footprint, params.layer)
                || !self.river_allows(&footprint, params)
                || !self.clearing_allows(&footprint, params)
                || !self.building_allows(position, params)
            {
                continue;
            }
            return Some(SpawnPoint {
                position,
                orientation,
            });
        }
        None
    }

    /// True if `footprint` overlaps a building or obstacle on `layer`
    pub fn collides_with_objects(&self, footprint: &Hitbox, layer: Layer) -> bool {
        self.grid
            .intersects_hitbox(footprint, Some(layer))
            .into_iter()
            .filter(|object| {
                matches!(
                    object.category(),
                    ObjectCategory::Building | ObjectCategory::Obstacle
                )
            })
            .any(|object| object.spawn_hitbox.collides_with(footprint))
    }

    fn river_allows(&self, footprint: &Hitbox, params: &PositionParams<'_>) -> bool {
        let rivers = self.terrain.get_rivers_in_hitbox(footprint, params.layer);
        let on_bank = |river: &&River| river.bank_hitbox().collides_with(footprint);
        let in_water = |river: &&River| {
            river
                .water_hitbox()
                .is_some_and(|water| water.collides_with(footprint))
        };

        match params.spawn_mode {
            SpawnMode::Grass | SpawnMode::Sand | SpawnMode::Beach => {
                !rivers.iter().any(on_bank)
            }
            SpawnMode::GrassAndSand => !rivers
                .iter()
                .any(|river| (river.is_trail && on_bank(river)) || in_water(river)),
            SpawnMode::RiverBank => !rivers.iter().any(in_water),
            SpawnMode::River | SpawnMode::Trail => true,
        }
    }

    fn clearing_allows(&self, footprint: &Hitbox, params: &PositionParams<'_>) -> bool {
        if params.ignore_clearings {
            return true;
        }
        self.clearings.iter().all(|clearing| {
            clearing.allows(params.object_id)
                || !footprint.collides_with(&Hitbox::Rect(clearing.rect))
        })
    }

    pub(crate) fn building_allows(&self, position: Vec2, params: &PositionParams<'_>) -> bool {
        let Some(building) = params.building else {
            return true;
        };
        let quadrant = self.quadrant(position);
        if let Some(limit) = self.definition.quad_building_limit.get(building.id) {
            if self.quadrant_count(building.id, quadrant) >= *limit {
                return false;
            }
        }
        if building.major {
            if self.major_quadrants[quadrant] {
                return false;
            }
            if self
                .major_positions
                .iter()
                .any(|other| other.distance_squared(position) < LANDMARK_MIN_DIST_SQ)
            {
                return false;
            }
        }
        true
    }
}

/// Draw one candidate position for the spawn mode
fn sample(
    island: Option<&Island>,
    terrain: &Terrain,
    rng: &mut SeededRandom,
    params: &PositionParams<'_>,
    hitbox: &Hitbox,
) -> Option<(Vec2, Orientation)> {
    if let Some(Sampler::Within(region)) = &params.sampler {
        return Some((region.random_point(rng), params.orientation));
    }

    let island = island?;
    let geometry = &island.geometry;
    let rivers_of_kind = |trail: bool| -> Vec<&River> {
        island
            .rivers
            .iter()
            .filter_map(|&i| terrain.rivers().get(i))
            .filter(|river| river.is_trail == trail)
            .collect()
    };

    match params.spawn_mode {
        SpawnMode::Grass => Some((geometry.grass_hitbox.random_point(rng), params.orientation)),
        SpawnMode::GrassAndSand => {
            Some((geometry.beach_hitbox.random_point(rng), params.orientation))
        }
        SpawnMode::Sand => {
            let point = geometry.beach_hitbox.random_point(rng);
            (!geometry.grass_hitbox.is_point_inside(point)).then_some((point, params.orientation))
        }
        SpawnMode::Beach => {
            let side = rng.next_orientation();
            let band = geometry.beach_side(side);
            let orientation = side.add(params.orientation);
            let extent = hitbox
                .transform(Vec2::ZERO, params.scale, orientation)
                .to_rectangle();
            let region = reserve_margin(&band, &extent, side)?;
            Some((rng.point_in_rect(region.min, region.max), orientation))
        }
        SpawnMode::River => {
            let rivers = rivers_of_kind(false);
            let river = rng.pick(&rivers)?;
            let water = river.water_hitbox()?;
            Some((water.random_point(rng), params.orientation))
        }
        SpawnMode::RiverBank => {
            let rivers = rivers_of_kind(false);
            let river = rng.pick(&rivers)?;
            Some((river.bank_hitbox().random_point(rng), params.orientation))
        }
        SpawnMode::Trail => {
            let trails = rivers_of_kind(true);
            let trail = rng.pick(&trails)?;
            Some((trail.bank_hitbox().random_point(rng), params.orientation))
        }
    }
}

/// Shrink a beach band along its length so a footprint with local bounds
/// `extent` stays within the band's span. Bands too short for the footprint
/// yield `None`.
fn reserve_margin(band: &RectHitbox, extent: &RectHitbox, side: Orientation) -> Option<RectHitbox> {
    let (min, max) = match side {
        Orientation::East | Orientation::West => (
            Vec2::new(band.min.x, band.min.y - extent.min.y),
            Vec2::new(band.max.x, band.max.y - extent.max.y),
        ),
        Orientation::North | Orientation::South => (
            Vec2::new(band.min.x - extent.min.x, band.min.y),
            Vec2::new(band.max.x - extent.max.x, band.max.y),
        ),
    };
    (min.x <= max.x && min.y <= max.y).then(|| RectHitbox::new(min, max))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_margin_along_band() {
        let band = RectHitbox::new(Vec2::new(0.0, 0.0), Vec2::new(32.0, 400.0));
        let extent = RectHitbox::new(Vec2::splat(-20.0), Vec2::splat(20.0));
        let region = reserve_margin(&band, &extent, Orientation::West).unwrap();
        assert_eq!(region.min, Vec2::new(0.0, 20.0));
        assert_eq!(region.max, Vec2::new(32.0, 380.0));

        let short = RectHitbox::new(Vec2::ZERO, Vec2::new(30.0, 32.0));
        assert!(reserve_margin(&short, &extent, Orientation::North).is_none());
    }

    #[test]
    fn test_default_params() {
        let params = PositionParams::default();
        assert_eq!(params.max_attempts, DEFAULT_MAX_ATTEMPTS);
        assert_eq!(params.scale, 1.0);
        assert_eq!(params.layer, Layer::Ground);
        assert!(!params.ignore_clearings);
    }
}
