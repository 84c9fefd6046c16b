//! 2D geometry primitives for world layout.
//!
//! World space is y-down (screen convention). Orientations are quarter turns;
//! orientation 1 maps +x onto -y, i.e. "north" on screen.

pub mod hitbox;

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_2, PI, TAU};

pub use hitbox::{CircleHitbox, GroupHitbox, Hitbox, PolygonHitbox, RectHitbox};

/// Quarter-turn orientation of a placed object
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Orientation {
    #[default]
    East,
    North,
    West,
    South,
}

impl Orientation {
    pub const ALL: [Orientation; 4] = [
        Orientation::East,
        Orientation::North,
        Orientation::West,
        Orientation::South,
    ];

    pub fn from_index(index: u8) -> Self {
        match index % 4 {
            0 => Self::East,
            1 => Self::North,
            2 => Self::West,
            _ => Self::South,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::East => 0,
            Self::North => 1,
            Self::West => 2,
            Self::South => 3,
        }
    }

    /// Angle (radians, atan2 convention) that +x points to after this rotation
    pub fn angle(self) -> f32 {
        wrap_angle(-(self.index() as f32) * FRAC_PI_2)
    }

    /// Rotate a vector by this orientation
    pub fn rotate(self, v: Vec2) -> Vec2 {
        match self {
            Self::East => v,
            Self::North => Vec2::new(v.y, -v.x),
            Self::West => Vec2::new(-v.x, -v.y),
            Self::South => Vec2::new(-v.y, v.x),
        }
    }

    /// Compose two orientations (apply `self`, then `other`)
    pub fn add(self, other: Orientation) -> Orientation {
        Orientation::from_index((self.index() + other.index()) as u8)
    }
}

/// Wrap an angle into `(-π, π]`
pub fn wrap_angle(angle: f32) -> f32 {
    let mut a = angle % TAU;
    if a <= -PI {
        a += TAU;
    } else if a > PI {
        a -= TAU;
    }
    a
}

/// Smallest absolute angular distance between two angles, in `[0, π]`
pub fn angle_between(a: f32, b: f32) -> f32 {
    wrap_angle(a - b).abs()
}

/// Vector of length `length` pointing at `angle`
pub fn polar(angle: f32, length: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin()) * length
}

/// Parameter of the projection of `p` onto segment `ab`, clamped to [0, 1]
pub fn project_on_segment(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return 0.0;
    }
    ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0)
}

/// Squared distance from `p` to segment `ab`
pub fn distance_to_segment_squared(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let t = project_on_segment(p, a, b);
    let closest = a + (b - a) * t;
    (p - closest).length_squared()
}

/// Intersection point of segments `a1a2` and `b1b2`, if any
pub fn segment_intersection(a1: Vec2, a2: Vec2, b1: Vec2, b2: Vec2) -> Option<Vec2> {
    let r = a2 - a1;
    let s = b2 - b1;
    let denom = r.perp_dot(s);
    if denom.abs() <= f32::EPSILON {
        return None;
    }
    let qp = b1 - a1;
    let t = qp.perp_dot(s) / denom;
    let u = qp.perp_dot(r) / denom;
    if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
        Some(a1 + r * t)
    } else {
        None
    }
}

/// Even-odd point-in-polygon test. Works for non-convex simple polygons.
pub fn point_in_polygon(p: Vec2, points: &[Vec2]) -> bool {
    let n = points.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let pi = points[i];
        let pj = points[j];
        if (pi.y > p.y) != (pj.y > p.y) {
            let x_cross = (pj.x - pi.x) * (p.y - pi.y) / (pj.y - pi.y) + pi.x;
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}
