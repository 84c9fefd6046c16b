//! Deterministic PRNG shared by every generation step.
//!
//! One `SeededRandom` is created per game from the map seed and threaded
//! through terrain, river and placement code, so the same seed and map
//! definition always produce the same world.

use bevy::math::Vec2;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use std::f32::consts::TAU;

use crate::geometry::Orientation;

/// Seeded xoshiro256++ generator with range helpers
#[derive(Debug, Clone)]
pub struct SeededRandom {
    seed: u32,
    rng: Xoshiro256PlusPlus,
}

impl SeededRandom {
    pub fn new(seed: u32) -> Self {
        Self {
            seed,
            rng: Xoshiro256PlusPlus::seed_from_u64(seed as u64),
        }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Uniform float in `[min, max)`. An empty range yields `min`.
    pub fn next(&mut self, min: f32, max: f32) -> f32 {
        if max <= min {
            return min;
        }
        self.rng.gen_range(min..max)
    }

    /// Uniform integer in `[min, max]` (inclusive). An empty range yields `min`.
    pub fn next_int(&mut self, min: i32, max: i32) -> i32 {
        if max <= min {
            return min;
        }
        self.rng.gen_range(min..=max)
    }

    pub fn next_bool(&mut self) -> bool {
        self.rng.gen_bool(0.5)
    }

    /// True with probability `p` (clamped to [0, 1])
    pub fn chance(&mut self, p: f32) -> bool {
        self.next(0.0, 1.0) < p.clamp(0.0, 1.0)
    }

    pub fn next_orientation(&mut self) -> Orientation {
        Orientation::from_index(self.next_int(0, 3) as u8)
    }

    /// Random angle in radians, `[0, 2π)`
    pub fn next_rotation(&mut self) -> f32 {
        self.next(0.0, TAU)
    }

    pub fn point_in_rect(&mut self, min: Vec2, max: Vec2) -> Vec2 {
        Vec2::new(self.next(min.x, max.x), self.next(min.y, max.y))
    }

    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let index = self.next_int(0, items.len() as i32 - 1) as usize;
        items.get(index)
    }

    /// Weighted pick. Non-positive weights are never chosen.
    pub fn pick_weighted<'a, T>(&mut self, items: &'a [(T, f32)]) -> Option<&'a T> {
        let total: f32 = items.iter().map(|(_, w)| w.max(0.0)).sum();
        if total <= 0.0 {
            return None;
        }
        let mut roll = self.next(0.0, total);
        for (item, weight) in items {
            let weight = weight.max(0.0);
            if weight <= 0.0 {
                continue;
            }
            if roll < weight {
                return Some(item);
            }
            roll -= weight;
        }
        // float drift: fall back to the last positive entry
        items.iter().rev().find(|(_, w)| *w > 0.0).map(|(item, _)| item)
    }
}
