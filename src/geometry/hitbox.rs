//! Hitbox shapes used by terrain, rivers and placed objects.
//!
//! Polygons may be concave (jagged coastlines, river outlines), so polygon
//! collision is edge intersection plus containment rather than SAT.

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

use super::{distance_to_segment_squared, point_in_polygon, segment_intersection, Orientation};
use crate::random::SeededRandom;

/// Rejection-sampling budget for `PolygonHitbox::random_point`
const POLYGON_SAMPLE_ATTEMPTS: u32 = 64;

/// Collision / containment shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Hitbox {
    Circle(CircleHitbox),
    Rect(RectHitbox),
    Polygon(PolygonHitbox),
    Group(GroupHitbox),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CircleHitbox {
    pub radius: f32,
    #[serde(default)]
    pub center: Vec2,
}

/// Axis-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RectHitbox {
    pub min: Vec2,
    pub max: Vec2,
}

/// Simple polygon, serialized as its point list. Bounds are cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Vec2>", into = "Vec<Vec2>")]
pub struct PolygonHitbox {
    points: Vec<Vec2>,
    bounds: RectHitbox,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupHitbox {
    pub hitboxes: Vec<Hitbox>,
}

// =====================================================
// Circle
// =====================================================

impl CircleHitbox {
    pub fn new(radius: f32, center: Vec2) -> Self {
        Self { radius, center }
    }

    pub fn bounds(&self) -> RectHitbox {
        let r = Vec2::splat(self.radius);
        RectHitbox::new(self.center - r, self.center + r)
    }

    pub fn contains(&self, p: Vec2) -> bool {
        (p - self.center).length_squared() < self.radius * self.radius
    }

    fn intersects_line(&self, a: Vec2, b: Vec2) -> Option<Vec2> {
        let d = b - a;
        let f = a - self.center;
        let qa = d.dot(d);
        if qa <= f32::EPSILON {
            return None;
        }
        let qb = 2.0 * f.dot(d);
        let qc = f.dot(f) - self.radius * self.radius;
        let disc = qb * qb - 4.0 * qa * qc;
        if disc < 0.0 {
            return None;
        }
        let sqrt = disc.sqrt();
        let t1 = (-qb - sqrt) / (2.0 * qa);
        let t2 = (-qb + sqrt) / (2.0 * qa);
        [t1, t2]
            .into_iter()
            .find(|t| (0.0..=1.0).contains(t))
            .map(|t| a + d * t)
    }
}

// =====================================================
// Rectangle
// =====================================================

impl RectHitbox {
    /// Build from two corners in any order
    pub fn new(a: Vec2, b: Vec2) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn from_center(center: Vec2, size: Vec2) -> Self {
        let half = size / 2.0;
        Self::new(center - half, center + half)
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) / 2.0
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// True if `other` lies entirely within this rectangle
    pub fn contains_rect(&self, other: &RectHitbox) -> bool {
        self.contains(other.min) && self.contains(other.max)
    }

    pub fn overlaps(&self, other: &RectHitbox) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    /// Grow (or shrink, for negative amounts) on every side
    pub fn expanded(&self, amount: f32) -> RectHitbox {
        RectHitbox {
            min: self.min - Vec2::splat(amount),
            max: self.max + Vec2::splat(amount),
        }
    }

    pub fn union(&self, other: &RectHitbox) -> RectHitbox {
        RectHitbox {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn corners(&self) -> [Vec2; 4] {
        [
            self.min,
            Vec2::new(self.max.x, self.min.y),
            self.max,
            Vec2::new(self.min.x, self.max.y),
        ]
    }

    fn collides_circle(&self, circle: &CircleHitbox) -> bool {
        let closest = circle.center.clamp(self.min, self.max);
        (circle.center - closest).length_squared() < circle.radius * circle.radius
    }
}

// =====================================================
// Polygon
// =====================================================

impl From<Vec<Vec2>> for PolygonHitbox {
    fn from(points: Vec<Vec2>) -> Self {
        Self::new(points)
    }
}

impl From<PolygonHitbox> for Vec<Vec2> {
    fn from(polygon: PolygonHitbox) -> Self {
        polygon.points
    }
}

impl PolygonHitbox {
    pub fn new(points: Vec<Vec2>) -> Self {
        let bounds = bounds_of(&points);
        Self { points, bounds }
    }

    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    pub fn bounds(&self) -> RectHitbox {
        self.bounds
    }

    pub fn contains(&self, p: Vec2) -> bool {
        self.bounds.contains(p) && point_in_polygon(p, &self.points)
    }

    /// Vertex average
    pub fn center(&self) -> Vec2 {
        if self.points.is_empty() {
            return Vec2::ZERO;
        }
        self.points.iter().copied().sum::<Vec2>() / self.points.len() as f32
    }

    fn edges(&self) -> impl Iterator<Item = (Vec2, Vec2)> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }

    fn collides_circle(&self, circle: &CircleHitbox) -> bool {
        if !self.bounds.collides_circle(circle) {
            return false;
        }
        if point_in_polygon(circle.center, &self.points) {
            return true;
        }
        let r_sq = circle.radius * circle.radius;
        self.edges()
            .any(|(a, b)| distance_to_segment_squared(circle.center, a, b) < r_sq)
    }

    fn collides_points(&self, other: &[Vec2], other_bounds: &RectHitbox) -> bool {
        if !self.bounds.overlaps(other_bounds) || other.is_empty() || self.points.is_empty() {
            return false;
        }
        let m = other.len();
        for (a, b) in self.edges() {
            for j in 0..m {
                if segment_intersection(a, b, other[j], other[(j + 1) % m]).is_some() {
                    return true;
                }
            }
        }
        point_in_polygon(other[0], &self.points) || point_in_polygon(self.points[0], other)
    }

    fn intersects_line(&self, a: Vec2, b: Vec2) -> Option<Vec2> {
        closest_hit(a, self.edges().filter_map(|(p, q)| segment_intersection(a, b, p, q)))
    }
}

fn bounds_of(points: &[Vec2]) -> RectHitbox {
    let Some(first) = points.first() else {
        return RectHitbox::new(Vec2::ZERO, Vec2::ZERO);
    };
    points.iter().fold(RectHitbox::new(*first, *first), |acc, p| RectHitbox {
        min: acc.min.min(*p),
        max: acc.max.max(*p),
    })
}

fn closest_hit(origin: Vec2, hits: impl Iterator<Item = Vec2>) -> Option<Vec2> {
    hits.min_by(|a, b| {
        (*a - origin)
            .length_squared()
            .total_cmp(&(*b - origin).length_squared())
    })
}

// =====================================================
// Group
// =====================================================

impl GroupHitbox {
    pub fn new(hitboxes: Vec<Hitbox>) -> Self {
        Self { hitboxes }
    }

    pub fn bounds(&self) -> RectHitbox {
        let mut iter = self.hitboxes.iter().map(Hitbox::to_rectangle);
        match iter.next() {
            Some(first) => iter.fold(first, |acc, r| acc.union(&r)),
            None => RectHitbox::new(Vec2::ZERO, Vec2::ZERO),
        }
    }
}

// =====================================================
// Hitbox
// =====================================================

impl Hitbox {
    pub fn circle(radius: f32, center: Vec2) -> Self {
        Hitbox::Circle(CircleHitbox::new(radius, center))
    }

    pub fn rect(min: Vec2, max: Vec2) -> Self {
        Hitbox::Rect(RectHitbox::new(min, max))
    }

    pub fn polygon(points: Vec<Vec2>) -> Self {
        Hitbox::Polygon(PolygonHitbox::new(points))
    }

    pub fn group(hitboxes: Vec<Hitbox>) -> Self {
        Hitbox::Group(GroupHitbox::new(hitboxes))
    }

    /// Axis-aligned bounding rectangle
    pub fn to_rectangle(&self) -> RectHitbox {
        match self {
            Hitbox::Circle(c) => c.bounds(),
            Hitbox::Rect(r) => *r,
            Hitbox::Polygon(p) => p.bounds(),
            Hitbox::Group(g) => g.bounds(),
        }
    }

    pub fn center(&self) -> Vec2 {
        match self {
            Hitbox::Circle(c) => c.center,
            Hitbox::Rect(r) => r.center(),
            Hitbox::Polygon(p) => p.center(),
            Hitbox::Group(g) => g.bounds().center(),
        }
    }

    pub fn is_point_inside(&self, p: Vec2) -> bool {
        match self {
            Hitbox::Circle(c) => c.contains(p),
            Hitbox::Rect(r) => r.contains(p),
            Hitbox::Polygon(poly) => poly.contains(p),
            Hitbox::Group(g) => g.hitboxes.iter().any(|h| h.is_point_inside(p)),
        }
    }

    pub fn collides_with(&self, other: &Hitbox) -> bool {
        match (self, other) {
            (Hitbox::Group(g), _) => g.hitboxes.iter().any(|h| h.collides_with(other)),
            (_, Hitbox::Group(g)) => g.hitboxes.iter().any(|h| self.collides_with(h)),
            (Hitbox::Circle(a), Hitbox::Circle(b)) => {
                let r = a.radius + b.radius;
                (a.center - b.center).length_squared() < r * r
            }
            (Hitbox::Circle(c), Hitbox::Rect(r)) | (Hitbox::Rect(r), Hitbox::Circle(c)) => {
                r.collides_circle(c)
            }
            (Hitbox::Rect(a), Hitbox::Rect(b)) => a.overlaps(b),
            (Hitbox::Circle(c), Hitbox::Polygon(p)) | (Hitbox::Polygon(p), Hitbox::Circle(c)) => {
                p.collides_circle(c)
            }
            (Hitbox::Rect(r), Hitbox::Polygon(p)) | (Hitbox::Polygon(p), Hitbox::Rect(r)) => {
                p.collides_points(&r.corners(), r)
            }
            (Hitbox::Polygon(a), Hitbox::Polygon(b)) => a.collides_points(&b.points, &b.bounds),
        }
    }

    /// Rotate by `orientation`, scale by `scale`, then translate to `position`
    pub fn transform(&self, position: Vec2, scale: f32, orientation: Orientation) -> Hitbox {
        let map = |v: Vec2| orientation.rotate(v) * scale + position;
        match self {
            Hitbox::Circle(c) => Hitbox::Circle(CircleHitbox::new(c.radius * scale, map(c.center))),
            Hitbox::Rect(r) => Hitbox::Rect(RectHitbox::new(map(r.min), map(r.max))),
            Hitbox::Polygon(p) => Hitbox::polygon(p.points.iter().copied().map(map).collect()),
            Hitbox::Group(g) => Hitbox::group(
                g.hitboxes
                    .iter()
                    .map(|h| h.transform(position, scale, orientation))
                    .collect(),
            ),
        }
    }

    /// Closest point where segment `a -> b` crosses this hitbox's outline
    pub fn intersects_line(&self, a: Vec2, b: Vec2) -> Option<Vec2> {
        match self {
            Hitbox::Circle(c) => c.intersects_line(a, b),
            Hitbox::Rect(r) => PolygonHitbox::new(r.corners().to_vec()).intersects_line(a, b),
            Hitbox::Polygon(p) => p.intersects_line(a, b),
            Hitbox::Group(g) => closest_hit(
                a,
                g.hitboxes.iter().filter_map(|h| h.intersects_line(a, b)),
            ),
        }
    }

    /// Random point inside the shape. Polygons fall back to their center when
    /// rejection sampling runs out of attempts.
    pub fn random_point(&self, rng: &mut SeededRandom) -> Vec2 {
        match self {
            Hitbox::Circle(c) => {
                let angle = rng.next_rotation();
                let dist = rng.next(0.0, 1.0).sqrt() * c.radius;
                c.center + super::polar(angle, dist)
            }
            Hitbox::Rect(r) => rng.point_in_rect(r.min, r.max),
            Hitbox::Polygon(p) => {
                for _ in 0..POLYGON_SAMPLE_ATTEMPTS {
                    let candidate = rng.point_in_rect(p.bounds.min, p.bounds.max);
                    if point_in_polygon(candidate, &p.points) {
                        return candidate;
                    }
                }
                p.center()
            }
            Hitbox::Group(g) => match rng.pick(&g.hitboxes) {
                Some(h) => h.random_point(rng),
                None => Vec2::ZERO,
            },
        }
    }
}

impl From<RectHitbox> for Hitbox {
    fn from(r: RectHitbox) -> Self {
        Hitbox::Rect(r)
    }
}

impl From<PolygonHitbox> for Hitbox {
    fn from(p: PolygonHitbox) -> Self {
        Hitbox::Polygon(p)
    }
}
