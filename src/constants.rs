//! Centralized world-layout constants.
//!
//! Values shared between the terrain index, the river builder and the
//! placement engine. Per-module tuning that nothing else reads stays in its
//! own module.

// =====================================================
// Terrain
// =====================================================

/// Side length of one terrain grid cell, in world units
pub const TERRAIN_CELL_SIZE: f32 = 64.0;

/// Spacing between perturbed vertices on a jagged island edge
pub const JAGGED_SPACING: f32 = 16.0;

/// Upper bound on jagged edge variation (the real value is also capped at beach_size / 2)
pub const JAGGED_MAX_VARIATION: f32 = 16.0;

// =====================================================
// Object grid
// =====================================================

/// Side length of one object grid cell, in world units
pub const OBJECT_CELL_SIZE: f32 = 32.0;

// =====================================================
// Rivers
// =====================================================

/// Minimum bank width of a true river
pub const RIVER_MIN_BANK_WIDTH: f32 = 12.0;

/// Maximum bank width of a true river
pub const RIVER_MAX_BANK_WIDTH: f32 = 20.0;

/// Bank width as a fraction of the water half-width
pub const RIVER_BANK_RATIO: f32 = 0.75;

/// Sample points this close to either endpoint are clipped against the
/// nearest river of the same kind
pub const RIVER_CONFLUENCE_DIST: f32 = 48.0;

/// Flare strength of a river mouth: width *= 1 + f^3 * RIVER_MOUTH_FLARE
pub const RIVER_MOUTH_FLARE: f32 = 1.5;

/// Maximum sample points for a generated river
pub const RIVER_MAX_POINTS: usize = 60;

/// Maximum sample points for a generated trail
pub const TRAIL_MAX_POINTS: usize = 25;

/// A generated path shorter than this is discarded
pub const RIVER_MIN_ACCEPTED_POINTS: usize = 3;

/// A generated path longer than this is discarded
pub const RIVER_MAX_ACCEPTED_POINTS: usize = 99;

/// Step length range when growing a river polyline
pub const RIVER_STEP_MIN: i32 = 30;
pub const RIVER_STEP_MAX: i32 = 80;

/// Start-point attempts per requested river
pub const RIVER_SPAWN_ATTEMPTS: u32 = 100;

// =====================================================
// Placement
// =====================================================

/// Default rejection-sampling budget for `GameMap::get_random_position`
pub const DEFAULT_MAX_ATTEMPTS: u32 = 200;

/// Default candidate budget when placing an island
pub const DEFAULT_ISLAND_ATTEMPTS: u32 = 20;

/// Gap between islands laid out with `IslandSpawn::Smart`
pub const SMART_ISLAND_GAP: f32 = 64.0;

/// Squared minimum distance between two major buildings
pub const LANDMARK_MIN_DIST_SQ: f32 = 150_000.0;

/// Attempt budget for placing a single clearing
pub const CLEARING_ATTEMPTS: u32 = 500;

/// Parameter windows scanned along a river when looking for bridge sites
pub const BRIDGE_WINDOWS: [(f32, f32); 2] = [(0.1, 0.4), (0.6, 0.9)];

/// Step between bridge candidates along a river
pub const BRIDGE_STEP: f32 = 0.05;

/// Radius of the footprint reserved for a loose loot item
pub const LOOT_RADIUS: f32 = 3.0;
