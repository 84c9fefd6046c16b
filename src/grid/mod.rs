//! Spatial object index.
//!
//! Uniform-cell broadphase over every placed building, obstacle and loot
//! item. Objects are bucketed by the bounding rectangle of their hitbox and
//! spawn hitbox; `intersects_hitbox` returns candidates for the caller to
//! test exactly.

use std::collections::{BTreeMap, BTreeSet};

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

use crate::constants::OBJECT_CELL_SIZE;
use crate::floor::Layer;
use crate::geometry::{Hitbox, Orientation, RectHitbox};

pub type ObjectId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectCategory {
    Building,
    Obstacle,
    Loot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ObjectKind {
    Building {
        definition: String,
        orientation: Orientation,
    },
    Obstacle {
        definition: String,
        orientation: Orientation,
        /// Free rotation in radians, for fully rotatable obstacles
        rotation: f32,
        scale: f32,
        variation: u8,
    },
    Loot {
        id_string: String,
        count: u32,
    },
}

impl ObjectKind {
    pub fn category(&self) -> ObjectCategory {
        match self {
            ObjectKind::Building { .. } => ObjectCategory::Building,
            ObjectKind::Obstacle { .. } => ObjectCategory::Obstacle,
            ObjectKind::Loot { .. } => ObjectCategory::Loot,
        }
    }

    pub fn definition_id(&self) -> &str {
        match self {
            ObjectKind::Building { definition, .. } | ObjectKind::Obstacle { definition, .. } => {
                definition
            }
            ObjectKind::Loot { id_string, .. } => id_string,
        }
    }
}

/// A placed world object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameObject {
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub layer: Layer,
    pub position: Vec2,
    /// World-space collision shape
    pub hitbox: Hitbox,
    /// World-space footprint reserved against later placements
    pub spawn_hitbox: Hitbox,
    /// Omitted from the client snapshot
    pub hidden: bool,
}

impl GameObject {
    pub fn category(&self) -> ObjectCategory {
        self.kind.category()
    }

    fn bounds(&self) -> RectHitbox {
        self.hitbox.to_rectangle().union(&self.spawn_hitbox.to_rectangle())
    }
}

#[derive(Debug, Clone)]
pub struct ObjectGrid {
    width_cells: usize,
    height_cells: usize,
    cells: Vec<Vec<ObjectId>>,
    objects: BTreeMap<ObjectId, GameObject>,
    next_id: ObjectId,
}

impl ObjectGrid {
    pub fn new(width: f32, height: f32) -> Self {
        let width_cells = (width / OBJECT_CELL_SIZE).ceil().max(0.0) as usize;
        let height_cells = (height / OBJECT_CELL_SIZE).ceil().max(0.0) as usize;
        Self {
            width_cells,
            height_cells,
            cells: vec![Vec::new(); (width_cells + 1) * (height_cells + 1)],
            objects: BTreeMap::new(),
            next_id: 1,
        }
    }

    fn cell_coord(&self, position: Vec2) -> (usize, usize) {
        let x = (position.x / OBJECT_CELL_SIZE).floor().clamp(0.0, self.width_cells as f32);
        let y = (position.y / OBJECT_CELL_SIZE).floor().clamp(0.0, self.height_cells as f32);
        (x as usize, y as usize)
    }

    fn covered_cells(&self, rect: &RectHitbox) -> Vec<usize> {
        let (x0, y0) = self.cell_coord(rect.min);
        let (x1, y1) = self.cell_coord(rect.max);
        let stride = self.width_cells + 1;
        (y0..=y1)
            .flat_map(|y| (x0..=x1).map(move |x| y * stride + x))
            .collect()
    }

    /// Insert an object, assigning it a fresh id. The id field of `object`
    /// is overwritten.
    pub fn add_object(&mut self, mut object: GameObject) -> ObjectId {
        let id = self.next_id;
        self.next_id += 1;
        object.id = id;
        for cell in self.covered_cells(&object.bounds()) {
            self.cells[cell].push(id);
        }
        self.objects.insert(id, object);
        id
    }

    pub fn remove_object(&mut self, id: ObjectId) -> Option<GameObject> {
        let object = self.objects.remove(&id)?;
        for cell in self.covered_cells(&object.bounds()) {
            self.cells[cell].retain(|other| *other != id);
        }
        Some(object)
    }

    pub fn get(&self, id: ObjectId) -> Option<&GameObject> {
        self.objects.get(&id)
    }

    /// Broadphase candidates near `hitbox`, each once, in id order
    pub fn intersects_hitbox(&self, hitbox: &Hitbox, layer: Option<Layer>) -> Vec<&GameObject> {
        let ids: BTreeSet<ObjectId> = self
            .covered_cells(&hitbox.to_rectangle())
            .into_iter()
            .flat_map(|cell| self.cells[cell].iter().copied())
            .collect();
        ids.into_iter()
            .filter_map(|id| self.objects.get(&id))
            .filter(|object| layer.map_or(true, |l| object.layer == l))
            .collect()
    }

    pub fn objects(&self) -> impl Iterator<Item = &GameObject> {
        self.objects.values()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn count(&self, category: ObjectCategory) -> usize {
        self.objects.values().filter(|o| o.category() == category).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crate_at(position: Vec2, layer: Layer) -> GameObject {
        let hitbox = Hitbox::rect(position - Vec2::splat(5.0), position + Vec2::splat(5.0));
        GameObject {
            id: 0,
            kind: ObjectKind::Obstacle {
                definition: "crate".into(),
                orientation: Orientation::East,
                rotation: 0.0,
                scale: 1.0,
                variation: 0,
            },
            layer,
            position,
            spawn_hitbox: hitbox.clone(),
            hitbox,
            hidden: false,
        }
    }

    #[test]
    fn test_add_assigns_increasing_ids() {
        let mut grid = ObjectGrid::new(512.0, 512.0);
        let a = grid.add_object(crate_at(Vec2::splat(50.0), Layer::Ground));
        let b = grid.add_object(crate_at(Vec2::splat(60.0), Layer::Ground));
        assert!(b > a);
        assert_eq!(grid.get(a).map(|o| o.id), Some(a));
        assert_eq!(grid.len(), 2);
    }

    #[test]
    fn test_intersects_hitbox_dedups_and_filters_layer() {
        let mut grid = ObjectGrid::new(512.0, 512.0);
        // spans four cells
        let ground = grid.add_object(crate_at(Vec2::splat(64.0), Layer::Ground));
        grid.add_object(crate_at(Vec2::splat(64.0), Layer::Upstairs));
        grid.add_object(crate_at(Vec2::splat(400.0), Layer::Ground));

        let probe = Hitbox::rect(Vec2::splat(40.0), Vec2::splat(90.0));
        let hits = grid.intersects_hitbox(&probe, Some(Layer::Ground));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, ground);
        assert_eq!(grid.intersects_hitbox(&probe, None).len(), 2);
    }

    #[test]
    fn test_remove_object() {
        let mut grid = ObjectGrid::new(512.0, 512.0);
        let id = grid.add_object(crate_at(Vec2::splat(100.0), Layer::Ground));
        assert!(grid.remove_object(id).is_some());
        assert!(grid.remove_object(id).is_none());
        let probe = Hitbox::circle(20.0, Vec2::splat(100.0));
        assert!(grid.intersects_hitbox(&probe, None).is_empty());
        assert!(grid.is_empty());
    }

    #[test]
    fn test_out_of_bounds_objects_clamp_to_edge_cells() {
        let mut grid = ObjectGrid::new(128.0, 128.0);
        grid.add_object(crate_at(Vec2::new(-20.0, 500.0), Layer::Ground));
        let probe = Hitbox::rect(Vec2::new(-40.0, 480.0), Vec2::new(0.0, 520.0));
        assert_eq!(grid.intersects_hitbox(&probe, Some(Layer::Ground)).len(), 1);
        assert_eq!(grid.count(ObjectCategory::Obstacle), 1);
    }
}
