//! Rivers and trails.
//!
//! A river is a Catmull-Rom spline through its sample points plus two offset
//! polygons: the water (true rivers only) and the wider bank halo. Rivers are
//! immutable once built; the terrain index and the placement engine share
//! them read-only.

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

use crate::constants::{
    RIVER_BANK_RATIO, RIVER_CONFLUENCE_DIST, RIVER_MAX_BANK_WIDTH, RIVER_MIN_BANK_WIDTH,
    RIVER_MOUTH_FLARE,
};
use crate::floor::FloorType;
use crate::geometry::{distance_to_segment_squared, project_on_segment, Hitbox, RectHitbox};

/// Catmull-Rom interpolation of one axis
pub fn catmull_rom(t: f32, p0: f32, p1: f32, p2: f32, p3: f32) -> f32 {
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * (2.0 * p1
        + t * (-p0 + p2)
        + t2 * (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3)
        + t3 * (-p0 + 3.0 * p1 - 3.0 * p2 + p3))
}

/// Derivative of `catmull_rom` with respect to `t`
pub fn catmull_rom_derivative(t: f32, p0: f32, p1: f32, p2: f32, p3: f32) -> f32 {
    0.5 * (-p0
        + p2
        + 2.0 * t * (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3)
        + 3.0 * t * t * (-p0 + 3.0 * p1 - 3.0 * p2 + p3))
}

/// Four control points and the local parameter for a spline position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlPoints {
    pub local_t: f32,
    pub p0: Vec2,
    pub p1: Vec2,
    pub p2: Vec2,
    pub p3: Vec2,
}

/// Previously computed outline polygons, reused instead of re-deriving them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiverHitboxes {
    pub water: Option<Hitbox>,
    pub bank: Hitbox,
}

/// Construction parameters for `River::new`
#[derive(Debug, Clone)]
pub struct RiverParams<'a> {
    pub width: f32,
    pub points: Vec<Vec2>,
    /// Already built rivers, consulted for confluences
    pub other_rivers: &'a [River],
    /// Region the river was generated in; endpoints on its edge are mouths
    pub bounds: RectHitbox,
    pub is_trail: bool,
    pub floor: FloorType,
    pub outline: FloorType,
    pub hitboxes: Option<RiverHitboxes>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct River {
    pub width: f32,
    pub points: Vec<Vec2>,
    pub is_trail: bool,
    pub floor: FloorType,
    pub outline: FloorType,
    pub bank_width: f32,
    water_hitbox: Option<Hitbox>,
    bank_hitbox: Hitbox,
    bounds: RectHitbox,
}

impl River {
    pub fn new(params: RiverParams<'_>) -> Self {
        let RiverParams {
            width,
            points,
            other_rivers,
            bounds,
            is_trail,
            floor,
            outline,
            hitboxes,
        } = params;

        let bank_width = if is_trail {
            width
        } else {
            (width * RIVER_BANK_RATIO).clamp(RIVER_MIN_BANK_WIDTH, RIVER_MAX_BANK_WIDTH)
        };

        let mut river = River {
            width,
            points,
            is_trail,
            floor,
            outline,
            bank_width,
            water_hitbox: None,
            bank_hitbox: Hitbox::polygon(Vec::new()),
            bounds: RectHitbox::new(Vec2::ZERO, Vec2::ZERO),
        };

        let (water, bank) = match hitboxes {
            Some(precomputed) => (precomputed.water.filter(|_| !is_trail), precomputed.bank),
            None => river.build_outlines(other_rivers, &bounds),
        };
        river.bounds = bank.to_rectangle();
        river.water_hitbox = water;
        river.bank_hitbox = bank;
        river
    }

    pub fn is_river(&self) -> bool {
        !self.is_trail
    }

    /// Water polygon; `None` for trails
    pub fn water_hitbox(&self) -> Option<&Hitbox> {
        self.water_hitbox.as_ref()
    }

    pub fn bank_hitbox(&self) -> &Hitbox {
        &self.bank_hitbox
    }

    /// Bounding rectangle of the bank polygon
    pub fn bounds(&self) -> RectHitbox {
        self.bounds
    }

    pub fn hitboxes(&self) -> RiverHitboxes {
        RiverHitboxes {
            water: self.water_hitbox.clone(),
            bank: self.bank_hitbox.clone(),
        }
    }

    fn build_outlines(&self, other_rivers: &[River], bounds: &RectHitbox) -> (Option<Hitbox>, Hitbox) {
        let n = self.points.len();
        let length = n.saturating_sub(1).max(1) as f32;
        let inner = bounds.expanded(-1.0);
        let start_is_mouth = self.points.first().is_some_and(|p| !inner.contains(*p));
        let end_is_mouth = self.points.last().is_some_and(|p| !inner.contains(*p));

        let mut water_left = Vec::with_capacity(n);
        let mut water_right = Vec::with_capacity(n);
        let mut bank_left = Vec::with_capacity(n);
        let mut bank_right = Vec::with_capacity(n);

        for (i, &current) in self.points.iter().enumerate() {
            let t = i as f32 / length;
            let normal = self.normal(t);
            let near_endpoint = current.distance(self.points[0]) < RIVER_CONFLUENCE_DIST
                || current.distance(self.points[n - 1]) < RIVER_CONFLUENCE_DIST;

            let mut bank_width = self.bank_width;
            let mut colliding: Option<(&River, f32)> = None;
            for other in other_rivers.iter().filter(|r| r.is_trail == self.is_trail) {
                let dist = (other.position(other.closest_t(current)) - current).length();
                if dist < other.width * 2.0 {
                    bank_width = bank_width.max(other.bank_width);
                }
                if near_endpoint && colliding.map_or(true, |(_, best)| dist < best) {
                    colliding = Some((other, dist));
                }
            }
            let colliding = colliding.map(|(river, _)| river);

            let mut width = self.width;
            if self.is_river() {
                let mut flare: f32 = 0.0;
                if start_is_mouth {
                    flare = flare.max(1.0 - 2.0 * t);
                }
                if end_is_mouth {
                    flare = flare.max(2.0 * t - 1.0);
                }
                width *= 1.0 + flare.powi(3) * RIVER_MOUTH_FLARE;
            }

            let rays = |half_width: f32, clip: Option<&Hitbox>| -> (Vec2, Vec2) {
                let mut left = current + normal * half_width;
                let mut right = current - normal * half_width;
                if let Some(hitbox) = clip {
                    if let Some(hit) = hitbox.intersects_line(current, left) {
                        left = current + normal * (hit - current).length();
                    }
                    if let Some(hit) = hitbox.intersects_line(current, right) {
                        right = current - normal * (hit - current).length();
                    }
                }
                (left, right)
            };

            let (wl, wr) = rays(width, colliding.and_then(|r| r.water_hitbox.as_ref()));
            water_left.push(wl);
            water_right.push(wr);

            let (bl, br) = rays(width + bank_width, colliding.map(|r| &r.bank_hitbox));
            bank_left.push(bl);
            bank_right.push(br);
        }

        let close = |mut left: Vec<Vec2>, right: Vec<Vec2>| {
            left.extend(right.into_iter().rev());
            Hitbox::polygon(left)
        };

        let water = self.is_river().then(|| close(water_left, water_right));
        (water, close(bank_left, bank_right))
    }

    /// Control points for spline parameter `t` in [0, 1]
    pub fn control_points(&self, t: f32) -> ControlPoints {
        let count = self.points.len();
        if count < 2 {
            let p = self.points.first().copied().unwrap_or(Vec2::ZERO);
            return ControlPoints {
                local_t: 0.0,
                p0: p,
                p1: p,
                p2: p,
                p3: p,
            };
        }
        let t = t.clamp(0.0, 1.0);
        let last = count - 1;
        let i = ((t * last as f32) as usize).min(last);
        let i1 = if i == last { i - 1 } else { i };
        let i2 = i1 + 1;
        let i0 = if i1 > 0 { i1 - 1 } else { i1 };
        let i3 = if i2 < last { i2 + 1 } else { i2 };

        ControlPoints {
            local_t: t * last as f32 - i1 as f32,
            p0: self.points[i0],
            p1: self.points[i1],
            p2: self.points[i2],
            p3: self.points[i3],
        }
    }

    pub fn tangent(&self, t: f32) -> Vec2 {
        let c = self.control_points(t);
        Vec2::new(
            catmull_rom_derivative(c.local_t, c.p0.x, c.p1.x, c.p2.x, c.p3.x),
            catmull_rom_derivative(c.local_t, c.p0.y, c.p1.y, c.p2.y, c.p3.y),
        )
    }

    pub fn normal(&self, t: f32) -> Vec2 {
        let dir = self.tangent(t).try_normalize().unwrap_or(Vec2::X);
        Vec2::new(-dir.y, dir.x)
    }

    pub fn position(&self, t: f32) -> Vec2 {
        let c = self.control_points(t);
        Vec2::new(
            catmull_rom(c.local_t, c.p0.x, c.p1.x, c.p2.x, c.p3.x),
            catmull_rom(c.local_t, c.p0.y, c.p1.y, c.p2.y, c.p3.y),
        )
    }

    /// Spline parameter of the point closest to `position`.
    ///
    /// Catmull-Rom has no closed-form inverse: a coarse pass over the
    /// polyline picks a segment, nine samples in a ±0.1 window refine it, and
    /// a final step along the tangent is kept only if it gets closer.
    pub fn closest_t(&self, position: Vec2) -> f32 {
        let count = self.points.len();
        if count < 2 {
            return 0.0;
        }
        let len = (count - 1) as f32;

        let mut best_seg = 0;
        let mut best_dist = f32::MAX;
        for (i, pair) in self.points.windows(2).enumerate() {
            let dist = distance_to_segment_squared(position, pair[0], pair[1]);
            if dist < best_dist {
                best_dist = dist;
                best_seg = i;
            }
        }

        let local = project_on_segment(position, self.points[best_seg], self.points[best_seg + 1]);
        let base = best_seg as f32 + local;
        let t_min = ((base - 0.1) / len).clamp(0.0, 1.0);
        let t_max = ((base + 0.1) / len).clamp(0.0, 1.0);

        let mut nearest_t = base / len;
        let mut nearest_dist = f32::MAX;
        for i in 0..=8 {
            let test_t = t_min + (t_max - t_min) * (i as f32 / 8.0);
            let dist = (self.position(test_t) - position).length_squared();
            if dist < nearest_dist {
                nearest_t = test_t;
                nearest_dist = dist;
            }
        }

        let tangent = self.tangent(nearest_t);
        let tan_len = tangent.length();
        if tan_len > 0.0 {
            let nearest = self.position(nearest_t);
            let offset = tangent.dot(position - nearest) / tan_len;
            let offset_t = (nearest_t + offset / (tan_len * len)).clamp(0.0, 1.0);
            if (position - self.position(offset_t)).length_squared()
                < (position - nearest).length_squared()
            {
                nearest_t = offset_t;
            }
        }
        nearest_t
    }

    /// Distance from `position` to the centerline
    pub fn distance_to(&self, position: Vec2) -> f32 {
        (self.position(self.closest_t(position)) - position).length()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn large_bounds() -> RectHitbox {
        RectHitbox::new(Vec2::splat(-10_000.0), Vec2::splat(10_000.0))
    }

    fn straight(width: f32, is_trail: bool) -> River {
        River::new(RiverParams {
            width,
            points: vec![Vec2::new(0.0, 0.0), Vec2::new(100.0, 0.0), Vec2::new(200.0, 0.0)],
            other_rivers: &[],
            bounds: large_bounds(),
            is_trail,
            floor: FloorType::Water,
            outline: FloorType::Sand,
            hitboxes: None,
        })
    }

    #[test]
    fn test_catmull_rom_endpoints() {
        assert!((catmull_rom(0.0, 0.0, 1.0, 2.0, 3.0) - 1.0).abs() < 1e-6);
        assert!((catmull_rom(1.0, 0.0, 1.0, 2.0, 3.0) - 2.0).abs() < 1e-6);
        // evenly spaced control points give a unit-slope line
        assert!((catmull_rom_derivative(0.5, 0.0, 1.0, 2.0, 3.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_bank_width() {
        assert_eq!(straight(10.0, false).bank_width, 12.0); // 7.5 clamped up
        assert_eq!(straight(20.0, false).bank_width, 15.0);
        assert_eq!(straight(40.0, false).bank_width, 20.0); // 30 clamped down
        assert_eq!(straight(10.0, true).bank_width, 10.0);
    }

    #[test]
    fn test_trail_has_no_water() {
        let trail = straight(10.0, true);
        assert!(trail.water_hitbox().is_none());
        assert!(trail.bank_hitbox().is_point_inside(Vec2::new(100.0, 0.0)));
        let river = straight(10.0, false);
        assert!(river.water_hitbox().is_some());
    }

    #[test]
    fn test_water_spans_width_at_midpoint() {
        let river = straight(10.0, false);
        let Some(Hitbox::Polygon(water)) = river.water_hitbox() else {
            panic!("river must have a polygon water hitbox");
        };
        let mid: Vec<Vec2> = water
            .points()
            .iter()
            .copied()
            .filter(|p| (p.x - 100.0).abs() < 1.0)
            .collect();
        assert_eq!(mid.len(), 2);
        let ys: Vec<f32> = mid.iter().map(|p| p.y).collect();
        assert!(ys.iter().any(|y| (y - 10.0).abs() < 1e-3));
        assert!(ys.iter().any(|y| (y + 10.0).abs() < 1e-3));
    }

    #[test]
    fn test_closest_t_on_straight_river() {
        let river = straight(10.0, false);
        let t = river.closest_t(Vec2::new(50.0, 30.0));
        assert!((river.position(t) - Vec2::new(50.0, 0.0)).length() < 1.0);
        assert!(river.closest_t(Vec2::new(-50.0, 0.0)) < 0.01);
        assert!(river.closest_t(Vec2::new(500.0, 0.0)) > 0.99);
    }

    #[test]
    fn test_control_points_clamp_ends() {
        let river = straight(10.0, false);
        let start = river.control_points(0.0);
        assert_eq!(start.p0, start.p1);
        let end = river.control_points(1.0);
        assert_eq!(end.p2, end.p3);
        assert!((end.local_t - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_precomputed_hitboxes_reused() {
        let original = straight(10.0, false);
        let copy = River::new(RiverParams {
            width: 10.0,
            points: original.points.clone(),
            other_rivers: &[],
            bounds: large_bounds(),
            is_trail: false,
            floor: FloorType::Water,
            outline: FloorType::Sand,
            hitboxes: Some(original.hitboxes()),
        });
        assert_eq!(copy, original);
    }

    #[test]
    fn test_mouth_flares_at_bounds_edge() {
        let bounds = RectHitbox::new(Vec2::new(0.0, -100.0), Vec2::new(200.0, 100.0));
        let river = River::new(RiverParams {
            width: 10.0,
            points: vec![Vec2::new(0.0, 0.0), Vec2::new(100.0, 0.0), Vec2::new(200.0, 0.0)],
            other_rivers: &[],
            bounds,
            is_trail: false,
            floor: FloorType::Water,
            outline: FloorType::Sand,
            hitboxes: None,
        });
        let water = river.water_hitbox().unwrap();
        // full flare at the mouth: 10 * (1 + 1.5)
        assert!(water.is_point_inside(Vec2::new(1.0, 20.0)));
        assert!(!water.is_point_inside(Vec2::new(100.0, 20.0)));
    }

    #[test]
    fn test_confluence_clips_points_near_the_junction() {
        let main = River::new(RiverParams {
            width: 30.0,
            points: vec![Vec2::new(0.0, 0.0), Vec2::new(200.0, 0.0), Vec2::new(400.0, 0.0)],
            other_rivers: &[],
            bounds: large_bounds(),
            is_trail: false,
            floor: FloorType::Water,
            outline: FloorType::Sand,
            hitboxes: None,
        });
        let others = [main];
        // diagonal tributary; its third point sits 42 units from the junction
        let tributary = River::new(RiverParams {
            width: 30.0,
            points: vec![
                Vec2::new(295.0, 115.0),
                Vec2::new(265.0, 85.0),
                Vec2::new(235.0, 55.0),
                Vec2::new(205.0, 25.0),
            ],
            other_rivers: &others,
            bounds: large_bounds(),
            is_trail: false,
            floor: FloorType::Water,
            outline: FloorType::Sand,
            hitboxes: None,
        });
        // unclipped, the bank ray of (235, 55) would reach (270.4, 19.6) inside
        // the main bank; clipped it stops at the main bank edge y = 50
        assert!(!tributary.bank_hitbox().is_point_inside(Vec2::new(262.0, 28.0)));
        assert!(tributary.bank_hitbox().is_point_inside(Vec2::new(238.0, 40.0)));
    }

    #[test]
    fn test_confluence_widens_bank() {
        let main = River::new(RiverParams {
            width: 30.0,
            points: vec![Vec2::new(0.0, 0.0), Vec2::new(200.0, 0.0), Vec2::new(400.0, 0.0)],
            other_rivers: &[],
            bounds: large_bounds(),
            is_trail: false,
            floor: FloorType::Water,
            outline: FloorType::Sand,
            hitboxes: None,
        });
        let others = [main];
        let tributary = River::new(RiverParams {
            width: 10.0,
            points: vec![Vec2::new(200.0, 300.0), Vec2::new(200.0, 150.0), Vec2::new(200.0, 20.0)],
            other_rivers: &others,
            bounds: large_bounds(),
            is_trail: false,
            floor: FloorType::Water,
            outline: FloorType::Sand,
            hitboxes: None,
        });
        // near the junction the bank matches the main river's wider bank
        assert!(tributary
            .bank_hitbox()
            .is_point_inside(Vec2::new(200.0 + 10.0 + 20.0 - 1.0, 25.0)));
        // far upstream it keeps its own bank width of 12
        assert!(!tributary
            .bank_hitbox()
            .is_point_inside(Vec2::new(200.0 + 10.0 + 12.0 + 2.0, 290.0)));
    }
}
