//! Axis-aligned bounding boxes of patches and subpatches.
//!
//! Used as a broadphase filter: only patch pairs with overlapping boxes,
//! and within them only subpatch pairs with overlapping boxes, reach the
//! triangle intersection tests.

use metasurf_math::Point3;
use metasurf_topo::{Geometry, Patch};

/// Growth applied to every patch and subpatch box.
pub const BOX_MARGIN: f64 = 1.0 / 1024.0;

/// Axis-aligned bounding box in 3D.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb3 {
    /// Minimum corner.
    pub min: Point3,
    /// Maximum corner.
    pub max: Point3,
}

impl Aabb3 {
    /// Create an AABB from min and max corners.
    pub fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    /// Create an empty (inverted) AABB suitable for expansion.
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Whether no point has been included yet.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x
    }

    /// Expand this AABB to include a point.
    pub fn include_point(&mut self, p: &Point3) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    /// Expand this AABB to include another one.
    pub fn include(&mut self, other: &Aabb3) {
        if !other.is_empty() {
            self.include_point(&other.min);
            self.include_point(&other.max);
        }
    }

    /// Test if two AABBs overlap (touching counts as overlap).
    pub fn overlaps(&self, other: &Aabb3) -> bool {
        (0..3).all(|i| self.min[i] <= other.max[i] && self.max[i] >= other.min[i])
    }

    /// Expand the AABB by a tolerance in all directions.
    pub fn expand(&mut self, tol: f64) {
        for i in 0..3 {
            self.min[i] -= tol;
            self.max[i] += tol;
        }
    }

    /// Largest side length.
    pub fn extent(&self) -> f64 {
        (self.max - self.min).max()
    }

    /// Index of the longest side.
    pub fn longest_axis(&self) -> usize {
        (self.max - self.min).imax()
    }

    /// Center point.
    pub fn center(&self) -> Point3 {
        Point3::from((self.min.coords + self.max.coords) * 0.5)
    }
}

/// Box around every vertex of `patch`, grown by [`BOX_MARGIN`].
pub fn patch_aabb(patch: &Patch) -> Aabb3 {
    let mut aabb = Aabb3::empty();
    for v in &patch.vertices {
        aabb.include_point(&v.pos);
    }
    aabb.expand(BOX_MARGIN);
    aabb
}

/// Box around the boundary of subpatch `sp`, grown by [`BOX_MARGIN`].
pub fn subpatch_aabb(patch: &Patch, sp: usize) -> Aabb3 {
    let mut aabb = Aabb3::empty();
    let (ids, _) = patch.boundary(&patch.subpatches[sp]);
    for v in ids {
        aabb.include_point(&patch.vertices[v].pos);
    }
    aabb.expand(BOX_MARGIN);
    aabb
}

/// Union of the boxes of every visible subdivided patch.
pub fn geometry_aabb(geometry: &Geometry) -> Aabb3 {
    let mut aabb = Aabb3::empty();
    for patch in geometry.patches.iter().filter(|p| !p.hidden && p.is_subdivided()) {
        aabb.include(&patch_aabb(patch));
    }
    aabb
}
