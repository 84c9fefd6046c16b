//! Terrain floor index.
//!
//! Uniform 64-unit cell grid per layer over floor regions and rivers. Cells
//! are filled by bounding-box overlap at insertion time; exact containment is
//! resolved at query time. The index only grows during generation and is
//! read-only afterwards.

use std::collections::BTreeSet;

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{JAGGED_MAX_VARIATION, JAGGED_SPACING, TERRAIN_CELL_SIZE};
use crate::floor::{FloorRegion, FloorType, Layer};
use crate::geometry::{Hitbox, Orientation, RectHitbox};
use crate::random::SeededRandom;
use crate::river::River;

/// Island generation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IslandDefinition {
    pub grass_floor: FloorType,
    pub beach_floor: FloorType,
    pub beach_size: f32,
    pub interior_size: Vec2,
}

impl Default for IslandDefinition {
    fn default() -> Self {
        Self {
            grass_floor: FloorType::Grass,
            beach_floor: FloorType::Sand,
            beach_size: 32.0,
            interior_size: Vec2::new(512.0, 512.0),
        }
    }
}

impl IslandDefinition {
    /// Outer size, beach included on both sides
    pub fn total_size(&self) -> Vec2 {
        self.interior_size + Vec2::splat(self.beach_size * 2.0)
    }
}

/// Geometry of a generated island, consumed by placement
#[derive(Debug, Clone, PartialEq)]
pub struct IslandReturn {
    pub beach_hitbox: Hitbox,
    pub grass_hitbox: Hitbox,
    /// One band per side, indexed by `Orientation::index`
    pub beach_sides: [RectHitbox; 4],
    pub beach_rect: RectHitbox,
    pub grass_rect: RectHitbox,
}

impl IslandReturn {
    pub fn beach_side(&self, orientation: Orientation) -> RectHitbox {
        self.beach_sides[orientation.index()]
    }

    pub fn beach_sides_hitbox(&self) -> Hitbox {
        Hitbox::group(self.beach_sides.iter().copied().map(Hitbox::Rect).collect())
    }
}

#[derive(Debug, Clone, Default)]
struct GridCell {
    floors: Vec<usize>,
    rivers: Vec<usize>,
}

#[derive(Debug, Clone)]
struct TerrainLayer {
    cells: Vec<GridCell>,
}

#[derive(Debug, Clone)]
pub struct Terrain {
    width: f32,
    height: f32,
    seed: u32,
    width_cells: usize,
    height_cells: usize,
    layers: Vec<TerrainLayer>,
    floors: Vec<FloorRegion>,
    rivers: Vec<River>,
}

const LAYERS: [Layer; 5] = [
    Layer::Basement,
    Layer::ToBasement,
    Layer::Ground,
    Layer::ToUpstairs,
    Layer::Upstairs,
];

fn layer_slot(layer: Layer) -> usize {
    (layer.as_i8() + 2) as usize
}

impl Terrain {
    pub fn new(width: f32, height: f32, seed: u32, ocean_floor: Option<FloorType>) -> Self {
        let width_cells = (width / TERRAIN_CELL_SIZE).ceil().max(0.0) as usize;
        let height_cells = (height / TERRAIN_CELL_SIZE).ceil().max(0.0) as usize;
        let cell_count = (width_cells + 1) * (height_cells + 1);

        let mut terrain = Self {
            width,
            height,
            seed,
            width_cells,
            height_cells,
            layers: LAYERS
                .iter()
                .map(|_| TerrainLayer {
                    cells: vec![GridCell::default(); cell_count],
                })
                .collect(),
            floors: Vec::new(),
            rivers: Vec::new(),
        };

        if let Some(ocean) = ocean_floor {
            terrain.add_floor(
                ocean,
                Hitbox::rect(Vec2::ZERO, Vec2::new(width, height)),
                Layer::Ground,
                false,
            );
        }
        terrain
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn layers(&self) -> &'static [Layer] {
        &LAYERS
    }

    // =====================================================
    // Cell mapping
    // =====================================================

    fn cell_coord(&self, position: Vec2) -> (usize, usize) {
        let x = (position.x / TERRAIN_CELL_SIZE).floor().clamp(0.0, self.width_cells as f32);
        let y = (position.y / TERRAIN_CELL_SIZE).floor().clamp(0.0, self.height_cells as f32);
        (x as usize, y as usize)
    }

    fn cell_index(&self, x: usize, y: usize) -> usize {
        y * (self.width_cells + 1) + x
    }

    fn cell_rect(x: usize, y: usize) -> RectHitbox {
        let min = Vec2::new(x as f32, y as f32) * TERRAIN_CELL_SIZE;
        RectHitbox::new(min, min + Vec2::splat(TERRAIN_CELL_SIZE))
    }

    /// Inclusive cell range covered by a rectangle
    fn cell_range(&self, rect: &RectHitbox) -> impl Iterator<Item = (usize, usize)> {
        let (x0, y0) = self.cell_coord(rect.min);
        let (x1, y1) = self.cell_coord(rect.max);
        (y0..=y1).flat_map(move |y| (x0..=x1).map(move |x| (x, y)))
    }

    fn cell(&self, position: Vec2, layer: Layer) -> &GridCell {
        let (x, y) = self.cell_coord(position);
        &self.layers[layer_slot(layer)].cells[self.cell_index(x, y)]
    }

    // =====================================================
    // Insertion
    // =====================================================

    pub fn add_floor(&mut self, floor_type: FloorType, hitbox: Hitbox, layer: Layer, build: bool) {
        let index = self.floors.len();
        let rect = hitbox.to_rectangle();
        let cells: Vec<usize> = self
            .cell_range(&rect)
            .map(|(x, y)| self.cell_index(x, y))
            .collect();
        let grid = &mut self.layers[layer_slot(layer)];
        for cell in cells {
            grid.cells[cell].floors.push(index);
        }
        self.floors.push(FloorRegion {
            floor_type,
            hitbox,
            layer,
            build,
        });
    }

    /// Register rivers into every ground cell their bank polygon touches
    pub fn add_rivers(&mut self, rivers: impl IntoIterator<Item = River>) {
        for river in rivers {
            let index = self.rivers.len();
            let cells: Vec<usize> = self
                .cell_range(&river.bounds())
                .filter(|&(x, y)| {
                    river
                        .bank_hitbox()
                        .collides_with(&Hitbox::Rect(Self::cell_rect(x, y)))
                })
                .map(|(x, y)| self.cell_index(x, y))
                .collect();
            debug!(
                river = index,
                trail = river.is_trail,
                points = river.points.len(),
                cells = cells.len(),
                "Registered river"
            );
            let grid = &mut self.layers[layer_slot(Layer::Ground)];
            for cell in cells {
                grid.cells[cell].rivers.push(index);
            }
            self.rivers.push(river);
        }
    }

    // =====================================================
    // Queries
    // =====================================================

    /// Floor under `position`. Building floors win over rivers, rivers win
    /// over ambient terrain. Within a tier the last registered match wins.
    pub fn get_floor(&self, position: Vec2, layer: Layer) -> FloorType {
        let cell = self.cell(position, layer);
        let regions = || cell.floors.iter().map(|&i| &self.floors[i]);

        let build = regions()
            .filter(|f| f.build && f.hitbox.is_point_inside(position))
            .last();
        if let Some(floor) = build {
            return floor.floor_type;
        }

        for &i in &cell.rivers {
            let river = &self.rivers[i];
            if river
                .water_hitbox()
                .is_some_and(|water| water.is_point_inside(position))
            {
                return river.floor;
            }
            if river.bank_hitbox().is_point_inside(position) {
                return river.outline;
            }
        }

        regions()
            .filter(|f| f.hitbox.is_point_inside(position))
            .last()
            .map(|f| f.floor_type)
            .unwrap_or_default()
    }

    pub fn get_rivers_in_position(&self, position: Vec2, layer: Layer) -> Vec<&River> {
        self.cell(position, layer)
            .rivers
            .iter()
            .map(|&i| &self.rivers[i])
            .collect()
    }

    pub fn get_rivers_in_hitbox(&self, hitbox: &Hitbox, layer: Layer) -> Vec<&River> {
        self.rivers_in_rect(&hitbox.to_rectangle(), layer)
    }

    /// Rivers registered in any cell overlapping `rect`, each once
    pub fn rivers_in_rect(&self, rect: &RectHitbox, layer: Layer) -> Vec<&River> {
        let grid = &self.layers[layer_slot(layer)];
        let found: BTreeSet<usize> = self
            .cell_range(rect)
            .flat_map(|(x, y)| grid.cells[self.cell_index(x, y)].rivers.iter().copied())
            .collect();
        found.into_iter().map(|i| &self.rivers[i]).collect()
    }

    pub fn floors(&self, layer: Layer) -> impl Iterator<Item = &FloorRegion> {
        self.floors.iter().filter(move |f| f.layer == layer)
    }

    /// Every registered floor region, in insertion order
    pub fn all_floors(&self) -> &[FloorRegion] {
        &self.floors
    }

    pub fn rivers(&self) -> &[River] {
        &self.rivers
    }

    // =====================================================
    // Islands
    // =====================================================

    /// Carve a beach and grass polygon pair with its top-left corner at
    /// `position` and register both floors.
    pub fn generate_island(
        &mut self,
        island: &IslandDefinition,
        position: Vec2,
        rng: &mut SeededRandom,
    ) -> IslandReturn {
        let beach = island.beach_size;
        let beach_rect = RectHitbox::new(position, position + island.total_size());
        let grass_rect = RectHitbox::new(
            position + Vec2::splat(beach),
            position + Vec2::splat(beach) + island.interior_size,
        );

        let variation = JAGGED_MAX_VARIATION.min(beach / 2.0);
        let beach_hitbox = Hitbox::polygon(jagged_rectangle(
            beach_rect.min,
            beach_rect.max,
            JAGGED_SPACING,
            variation,
            rng,
        ));
        let grass_hitbox = Hitbox::polygon(jagged_rectangle(
            grass_rect.min,
            grass_rect.max,
            JAGGED_SPACING,
            variation,
            rng,
        ));

        self.add_floor(island.beach_floor, beach_hitbox.clone(), Layer::Ground, false);
        self.add_floor(island.grass_floor, grass_hitbox.clone(), Layer::Ground, false);

        let (min, max) = (beach_rect.min, beach_rect.max);
        let beach_sides = [
            RectHitbox::new(Vec2::new(max.x - beach, min.y), max),
            RectHitbox::new(min, Vec2::new(max.x, min.y + beach)),
            RectHitbox::new(min, Vec2::new(min.x + beach, max.y)),
            RectHitbox::new(Vec2::new(min.x, max.y - beach), max),
        ];

        debug!(
            x = position.x,
            y = position.y,
            width = beach_rect.width(),
            height = beach_rect.height(),
            "Generated island"
        );

        IslandReturn {
            beach_hitbox,
            grass_hitbox,
            beach_sides,
            beach_rect,
            grass_rect,
        }
    }
}

/// Rectangle outline with every edge subdivided at `spacing` and each vertex
/// pushed perpendicular to its edge by up to `variation / 2`. Corners are
/// not emitted.
pub fn jagged_rectangle(
    min: Vec2,
    max: Vec2,
    spacing: f32,
    variation: f32,
    rng: &mut SeededRandom,
) -> Vec<Vec2> {
    let mut points = Vec::new();
    if spacing <= 0.0 {
        return RectHitbox::new(min, max).corners().to_vec();
    }
    let variation = variation / 2.0;

    let mut x = min.x + spacing;
    while x < max.x {
        points.push(Vec2::new(x, min.y + rng.next(-variation, variation)));
        x += spacing;
    }
    let mut y = min.y + spacing;
    while y < max.y {
        points.push(Vec2::new(max.x + rng.next(-variation, variation), y));
        y += spacing;
    }
    let mut x = max.x - spacing;
    while x > min.x {
        points.push(Vec2::new(x, max.y + rng.next(-variation, variation)));
        x -= spacing;
    }
    let mut y = max.y - spacing;
    while y > min.y {
        points.push(Vec2::new(min.x + rng.next(-variation, variation), y));
        y -= spacing;
    }
    points
}
