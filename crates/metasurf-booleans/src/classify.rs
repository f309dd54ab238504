//! Inside/outside classification by ray casting.
//!
//! A sample point is pushed back by `4·e` along the dominant axis of its
//! normal, then a ray is shot along that axis against the visible
//! triangles of the other operand. Back-facing hits count −1 and
//! front-facing hits +1; a non-zero sum means the point is inside. A hit
//! closer than `8·e` to the ray origin puts the point on the boundary.

use std::ops::BitOr;

use metasurf_math::{dominant_axis, Point3, Tolerance, Vec3};
use metasurf_tessellate::patch_triangles;
use metasurf_topo::Geometry;

use crate::bbox::{Aabb3, BOX_MARGIN};
use crate::hgrid::HGrid;

/// Reach of classification rays along their axis.
const RAY_REACH: f64 = 1.0e4;

/// Slack on barycentric coordinates so hits on shared edges count.
const BARY_EPSILON: f64 = 1e-9;

/// Where a sample point lies relative to a closed geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Strictly inside.
    VolumeIn,
    /// Strictly outside.
    VolumeOut,
    /// On the boundary, with the surface seen from inside.
    BoundaryIn,
    /// On the boundary, with no net crossing.
    BoundaryOut,
}

impl Classification {
    fn bits(self) -> u8 {
        match self {
            Classification::VolumeIn => 1,
            Classification::VolumeOut => 2,
            Classification::BoundaryIn => 4,
            Classification::BoundaryOut => 8,
        }
    }
}

/// Set of classifications an operation keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassMask(u8);

impl ClassMask {
    /// Keeps [`Classification::VolumeIn`].
    pub const VOLUME_IN: Self = Self(1);
    /// Keeps [`Classification::VolumeOut`].
    pub const VOLUME_OUT: Self = Self(2);
    /// Keeps [`Classification::BoundaryIn`].
    pub const BOUNDARY_IN: Self = Self(4);
    /// Keeps [`Classification::BoundaryOut`].
    pub const BOUNDARY_OUT: Self = Self(8);

    /// Whether `class` is kept.
    pub fn accepts(self, class: Classification) -> bool {
        self.0 & class.bits() != 0
    }
}

impl BitOr for ClassMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Visible triangles of a geometry, indexed for ray queries.
#[derive(Debug, Clone, Default)]
pub struct RayTarget {
    grid: HGrid,
    triangles: Vec<Vec<[Point3; 3]>>,
}

impl RayTarget {
    /// Triangulate every visible patch of `geometry`.
    pub fn new(geometry: &Geometry) -> Self {
        let mut target = Self::default();
        for patch in &geometry.patches {
            let tris = patch_triangles(patch);
            if tris.is_empty() {
                continue;
            }
            let mut aabb = Aabb3::empty();
            for p in tris.iter().flatten() {
                aabb.include_point(p);
            }
            aabb.expand(BOX_MARGIN);
            target.grid.insert(target.triangles.len(), aabb);
            target.triangles.push(tris);
        }
        target
    }

    /// Number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.triangles.iter().map(Vec::len).sum()
    }

    /// Classify `pos`, a point on a surface facing `normal`.
    pub fn classify_point(&self, pos: &Point3, normal: &Vec3, tol: &Tolerance) -> Classification {
        let axis = dominant_axis(normal);
        let sign = if normal[axis] < 0.0 { -1.0 } else { 1.0 };
        let shift = 4.0 * tol.linear;

        let mut origin = *pos;
        origin[axis] -= sign * shift;
        let mut dir = Vec3::zeros();
        dir[axis] = sign;

        let mut region = Aabb3::new(*pos, *pos);
        if sign < 0.0 {
            region.min[axis] = -RAY_REACH;
            region.max[axis] += shift;
        } else {
            region.max[axis] = RAY_REACH;
            region.min[axis] -= shift;
        }

        let mut hits: Vec<(f64, i32)> = Vec::new();
        for id in self.grid.query(&region) {
            for tri in &self.triangles[id] {
                if let Some((t, back)) = ray_hit(&origin, &dir, tri) {
                    hits.push((t, if back { -1 } else { 1 }));
                }
            }
        }
        hits.sort_by(|a, b| a.0.total_cmp(&b.0));
        // A ray through a shared edge hits both triangles.
        hits.dedup_by(|b, a| (b.0 - a.0).abs() <= tol.linear && a.1 == b.1);

        let count: i32 = hits.iter().map(|h| h.1).sum();
        let boundary = hits.iter().any(|h| h.0 < 8.0 * tol.linear);
        match (count == 0, boundary) {
            (true, false) => Classification::VolumeOut,
            (true, true) => Classification::BoundaryOut,
            (false, false) => Classification::VolumeIn,
            (false, true) => Classification::BoundaryIn,
        }
    }
}

/// Ray/triangle intersection (Möller–Trumbore), inclusive of edges.
/// Returns the ray parameter and whether the triangle faces away from
/// the ray origin.
fn ray_hit(origin: &Point3, dir: &Vec3, [a, b, c]: &[Point3; 3]) -> Option<(f64, bool)> {
    let e1 = b - a;
    let e2 = c - a;
    let h = dir.cross(&e2);
    let det = e1.dot(&h);
    if det.abs() < 1e-12 {
        return None;
    }
    let f = 1.0 / det;
    let s = origin - a;
    let u = f * s.dot(&h);
    if !(-BARY_EPSILON..=1.0 + BARY_EPSILON).contains(&u) {
        return None;
    }
    let q = s.cross(&e1);
    let v = f * dir.dot(&q);
    if v < -BARY_EPSILON || u + v > 1.0 + BARY_EPSILON {
        return None;
    }
    let t = f * e2.dot(&q);
    (t >= 0.0).then_some((t, det < 0.0))
}
