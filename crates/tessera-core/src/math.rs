//! Math utilities
//!
//! Re-exports from glam and the bounding volumes used by mesh queries.

pub use glam::{DVec3, Vec2, Vec3};

/// Direction used when a normal cannot be derived from degenerate geometry
pub const FALLBACK_NORMAL: Vec3 = Vec3::Y;

/// Normalize `v`, or return [`FALLBACK_NORMAL`] when its length is not above
/// `f32::EPSILON` (tiny slivers and zero-area triangles).
#[inline]
pub fn normalize_or_up(v: Vec3) -> Vec3 {
    let len = v.length();
    if len > f32::EPSILON {
        v / len
    } else {
        FALLBACK_NORMAL
    }
}

/// Lexicographic ordering on positions, x first.
#[inline]
pub fn lexicographic_cmp(a: Vec3, b: Vec3) -> std::cmp::Ordering {
    a.x.total_cmp(&b.x)
        .then(a.y.total_cmp(&b.y))
        .then(a.z.total_cmp(&b.z))
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl Aabb {
    /// Create an empty AABB
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Smallest AABB containing every point
    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Self {
        let mut aabb = Self::EMPTY;
        for p in points {
            aabb.expand_to_include(p);
        }
        aabb
    }

    /// Check if the AABB is empty
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Expand the AABB to include a point
    pub fn expand_to_include(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Bounding sphere
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    /// Center of the sphere
    pub center: Vec3,
    /// Radius of the sphere
    pub radius: f32,
}

impl BoundingSphere {
    /// Sphere around `center` reaching the farthest of `points`
    pub fn enclosing<I: IntoIterator<Item = Vec3>>(center: Vec3, points: I) -> Self {
        let radius = points
            .into_iter()
            .map(|p| p.distance(center))
            .fold(0.0f32, f32::max);
        Self { center, radius }
    }
}
