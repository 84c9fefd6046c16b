//! One-shot world snapshot sent to every connecting client.
//!
//! Encoded once with bincode at the end of generation and cached as an
//! immutable buffer for the lifetime of the map.

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

use super::{GameMap, MapError, Place};
use crate::floor::{FloorRegion, FloorType, Layer};
use crate::geometry::Orientation;
use crate::grid::{ObjectCategory, ObjectKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiverSnapshot {
    pub width: f32,
    pub points: Vec<Vec2>,
    pub is_trail: bool,
    pub floor: FloorType,
    pub outline: FloorType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSnapshot {
    pub id: u32,
    pub category: ObjectCategory,
    pub definition: String,
    pub position: Vec2,
    pub orientation: Orientation,
    pub rotation: f32,
    pub scale: f32,
    pub variation: u8,
    pub layer: Layer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub width: u32,
    pub height: u32,
    pub seed: u32,
    pub ocean_size: f32,
    pub beach_size: f32,
    pub rivers: Vec<RiverSnapshot>,
    pub floors: Vec<FloorRegion>,
    pub places: Vec<Place>,
    /// Visible buildings and obstacles only
    pub objects: Vec<ObjectSnapshot>,
}

impl WorldSnapshot {
    pub fn capture(map: &GameMap) -> Self {
        let definition = map.definition();
        let rivers = map
            .terrain()
            .rivers()
            .iter()
            .map(|river| RiverSnapshot {
                width: river.width,
                points: river.points.clone(),
                is_trail: river.is_trail,
                floor: river.floor,
                outline: river.outline,
            })
            .collect();

        let objects = map
            .grid()
            .objects()
            .filter(|object| !object.hidden)
            .filter_map(|object| {
                let (orientation, rotation, scale, variation) = match &object.kind {
                    ObjectKind::Building { orientation, .. } => (*orientation, 0.0, 1.0, 0),
                    ObjectKind::Obstacle {
                        orientation,
                        rotation,
                        scale,
                        variation,
                        ..
                    } => (*orientation, *rotation, *scale, *variation),
                    ObjectKind::Loot { .. } => return None,
                };
                Some(ObjectSnapshot {
                    id: object.id,
                    category: object.category(),
                    definition: object.kind.definition_id().to_string(),
                    position: object.position,
                    orientation,
                    rotation,
                    scale,
                    variation,
                    layer: object.layer,
                })
            })
            .collect();

        Self {
            width: definition.width.max(0.0) as u32,
            height: definition.height.max(0.0) as u32,
            seed: map.seed(),
            ocean_size: definition.ocean_size,
            beach_size: definition.beach_size,
            rivers,
            floors: map.terrain().all_floors().to_vec(),
            places: map.places().to_vec(),
            objects,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, MapError> {
        bincode::serialize(self).map_err(|e| MapError::Snapshot(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MapError> {
        bincode::deserialize(bytes).map_err(|e| MapError::Snapshot(e.to_string()))
    }
}
