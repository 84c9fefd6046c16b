//! Worldgen - Procedural World Layout Core
//!
//! This crate lays out deterministic island worlds for a multiplayer server:
//! - Seeded randomness and 2D hitbox geometry
//! - Terrain floor index (islands, jagged beaches, building floors)
//! - Catmull-Rom rivers and trails with water/bank outlines
//! - Object grid and constrained random placement
//! - Buildings, bridges, obstacles, clumps, clearings and loot tables
//! - One-shot binary world snapshot for clients
//! - Bevy plugin wiring for headless servers

pub mod constants;
pub mod definitions;
pub mod engine;
pub mod floor;
pub mod geometry;
pub mod grid;
pub mod logging;
pub mod map;
pub mod random;
pub mod river;
pub mod terrain;
