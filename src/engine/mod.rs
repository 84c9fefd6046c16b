//! World Engine — Integration Layer
//!
//! Wires world generation into a headless Bevy `App`:
//!   WorldConfig (RON) → WorldSetup resource → WorldLayoutPlugin (Startup)
//!   → GameMap + WorldSnapshotBuffer resources, WorldGeneratedEvent
//!
//! A fatal generation error is logged and turned into `AppExit::error()`.

pub mod config;
pub mod plugin;

pub use config::{ConfigError, WorldConfig};
pub use plugin::{WorldGeneratedEvent, WorldLayoutPlugin, WorldSetup, WorldSnapshotBuffer};

// =====================================================
// Tests
// =====================================================
