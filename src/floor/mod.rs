//! Floor types, layers and floor regions.
//!
//! `FloorType::definition` is the immutable global lookup table the
//! simulation consults every tick for movement and hazard effects.

use serde::{Deserialize, Serialize};

use crate::geometry::Hitbox;

/// Ground material under a point
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum FloorType {
    Grass,
    Dirt,
    Stone,
    Wood,
    Sand,
    Metal,
    Carpet,
    Water,
    #[default]
    Void,
    Snow,
    SnowSand,
    Ice,
}

/// Static attributes of a floor type
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FloorDefinition {
    /// 0xRRGGBB
    pub color: u32,
    pub speed_multiplier: Option<f32>,
    pub overlay: bool,
    pub particles: bool,
    pub insta_kill: bool,
}

impl FloorDefinition {
    const fn plain(color: u32) -> Self {
        Self {
            color,
            speed_multiplier: None,
            overlay: false,
            particles: false,
            insta_kill: false,
        }
    }
}

impl FloorType {
    pub fn all() -> &'static [FloorType] {
        &[
            FloorType::Grass,
            FloorType::Dirt,
            FloorType::Stone,
            FloorType::Wood,
            FloorType::Sand,
            FloorType::Metal,
            FloorType::Carpet,
            FloorType::Water,
            FloorType::Void,
            FloorType::Snow,
            FloorType::SnowSand,
            FloorType::Ice,
        ]
    }

    pub fn definition(self) -> FloorDefinition {
        match self {
            Self::Grass => FloorDefinition::plain(0x5a8939),
            Self::Dirt => FloorDefinition::plain(0x604320),
            Self::Stone => FloorDefinition::plain(0x121212),
            Self::Wood => FloorDefinition::plain(0x7f5500),
            Self::Sand => FloorDefinition::plain(0xb39c57),
            Self::Metal => FloorDefinition::plain(0x808080),
            Self::Carpet => FloorDefinition::plain(0x9c3c3c),
            Self::Water => FloorDefinition {
                color: 0x2b90b1,
                speed_multiplier: Some(0.7),
                overlay: true,
                particles: true,
                insta_kill: false,
            },
            Self::Void => FloorDefinition::plain(0x1b1d1e),
            Self::Snow => FloorDefinition {
                speed_multiplier: Some(0.85),
                particles: true,
                ..FloorDefinition::plain(0xe8eef0)
            },
            Self::SnowSand => FloorDefinition {
                speed_multiplier: Some(0.9),
                ..FloorDefinition::plain(0xcfd3c8)
            },
            Self::Ice => FloorDefinition {
                speed_multiplier: Some(1.2),
                overlay: true,
                ..FloorDefinition::plain(0xa6dbf0)
            },
        }
    }

    pub fn speed_multiplier(self) -> f32 {
        self.definition().speed_multiplier.unwrap_or(1.0)
    }

    pub fn is_liquid(self) -> bool {
        self.definition().overlay && self.definition().particles
    }
}

/// Vertical layer of the world. Stairs live on the `To*` transition layers.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Layer {
    Basement,
    ToBasement,
    #[default]
    Ground,
    ToUpstairs,
    Upstairs,
}

impl Layer {
    pub fn as_i8(self) -> i8 {
        match self {
            Self::Basement => -2,
            Self::ToBasement => -1,
            Self::Ground => 0,
            Self::ToUpstairs => 1,
            Self::Upstairs => 2,
        }
    }

    pub fn from_i8(value: i8) -> Self {
        match value.clamp(-2, 2) {
            -2 => Self::Basement,
            -1 => Self::ToBasement,
            0 => Self::Ground,
            1 => Self::ToUpstairs,
            _ => Self::Upstairs,
        }
    }

    /// Layer shifted by `delta` (saturating at basement/upstairs)
    pub fn offset(self, delta: i8) -> Self {
        Self::from_i8(self.as_i8().saturating_add(delta))
    }
}

/// A floor polygon registered with the terrain. `build` regions (building
/// floors) outrank ambient terrain and rivers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorRegion {
    pub floor_type: FloorType,
    pub hitbox: Hitbox,
    pub layer: Layer,
    pub build: bool,
}
