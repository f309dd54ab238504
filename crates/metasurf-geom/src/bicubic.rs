//! Bicubic patch built from corner one-rings.
//!
//! Each corner contributes a limit position and two tangent points computed
//! from the control points surrounding it; the four inner points are the
//! face points of the patch itself. The 16 resulting Bézier points are laid
//! out row by row along `u`:
//!
//! ```text
//! 12 13 14 15      (v = 1)
//!  8  9 10 11
//!  4  5  6  7
//!  0  1  2  3      (v = 0)
//! ```

use std::f64::consts::TAU;

use metasurf_math::{Point2, Point3, Vec3};

use crate::{ParametricPatch, PatchKind};

/// Largest corner valence accepted by the ring walk.
pub const MAX_VALENCE: usize = 64;

/// Control points around one patch corner, gathered by walking the
/// neighboring patches counter-clockwise.
///
/// Entry `i` describes the `i`-th patch of the ring: `ring[i]` is the
/// control point following the corner along that patch's boundary,
/// `diag[i]` the opposite corner, and `creased[i]` whether the edge from the
/// corner to `ring[i]` is a crease.
#[derive(Debug, Clone, Default)]
pub struct CornerRing {
    /// The corner control point.
    pub center: Point3,
    /// Edge-adjacent control points.
    pub ring: Vec<Point3>,
    /// Diagonal control points.
    pub diag: Vec<Point3>,
    /// Crease flag per ring edge.
    pub creased: Vec<bool>,
}

impl CornerRing {
    fn valence(&self) -> usize {
        self.ring.len()
    }
}

struct CornerFrame {
    limit: Point3,
    t0: Point3,
    t1: Point3,
    face: Point3,
}

fn corner_frame(r: &CornerRing) -> CornerFrame {
    let n = r.valence();
    let v = r.center.coords;
    let nf = n as f64;

    let f: Vec<Vec3> = (0..n)
        .map(|i| {
            v * (4.0 / 9.0)
                + (r.ring[i].coords + r.ring[(i + 1) % n].coords) * (2.0 / 9.0)
                + r.diag[i].coords * (1.0 / 9.0)
        })
        .collect();

    let crease_ids: Vec<usize> = (0..n).filter(|&i| r.creased[i]).collect();

    let (limit, t0, t1) = if crease_ids.is_empty() {
        let sum: Vec3 = f.iter().sum();
        let limit = (sum * 9.0 / nf + v * (nf - 4.0)) / (nf + 5.0);

        let mut e0 = Vec3::zeros();
        let mut e1 = Vec3::zeros();
        for i in 0..n {
            let angle = TAU * i as f64 / nf;
            let e = (f[i] + f[(i + n - 1) % n]) * 0.5;
            e0 += e * angle.cos();
            e1 += e * angle.sin();
        }
        let cn = (TAU / nf).cos();
        let sn = (TAU / nf).sin();
        let lambda = if n == 4 {
            0.5
        } else {
            (cn + 5.0 + ((cn + 9.0) * (cn + 1.0)).sqrt()) / 16.0
        };
        let k = 1.0 / (lambda * nf);
        e0 *= k;
        e1 *= k;
        (limit, limit + e0, limit + e0 * cn + e1 * sn)
    } else {
        let limit = match crease_ids.len() {
            1 => {
                let sum: Vec3 = (0..n)
                    .map(|i| v * nf + r.ring[i].coords * 4.0 + r.diag[i].coords)
                    .sum();
                sum / (nf * nf + 5.0 * nf)
            }
            2 => (v * 4.0 + r.ring[crease_ids[0]].coords + r.ring[crease_ids[1]].coords) / 6.0,
            _ => v,
        };
        let t0 = if r.creased[0] {
            (v * 2.0 + r.ring[0].coords) / 3.0
        } else {
            (f[0] + f[n - 1]) * 0.5
        };
        let t1 = if r.creased[1 % n] {
            (v * 2.0 + r.ring[1 % n].coords) / 3.0
        } else {
            (f[0] + f[1 % n]) * 0.5
        };
        (limit, t0, t1)
    };

    CornerFrame {
        limit: Point3::from(limit),
        t0: Point3::from(t0),
        t1: Point3::from(t1),
        face: Point3::from(f[0]),
    }
}

/// A bicubic Bézier patch with 16 control points.
#[derive(Debug, Clone)]
pub struct BicubicPatch {
    /// Bézier control points, row-major along `u`.
    pub b: [Point3; 16],
}

impl BicubicPatch {
    /// Build the patch from the rings of its four corners, given in corner
    /// order `(0,0)`, `(1,0)`, `(1,1)`, `(0,1)`.
    ///
    /// Returns `None` if a ring is empty or exceeds [`MAX_VALENCE`].
    pub fn from_rings(rings: &[CornerRing; 4]) -> Option<Self> {
        if rings.iter().any(|r| {
            r.valence() < 2
                || r.valence() > MAX_VALENCE
                || r.diag.len() != r.valence()
                || r.creased.len() != r.valence()
        }) {
            return None;
        }
        let fr: Vec<CornerFrame> = rings.iter().map(corner_frame).collect();
        let b = [
            fr[0].limit, fr[0].t0, fr[1].t1, fr[1].limit,
            fr[0].t1, fr[0].face, fr[1].face, fr[1].t0,
            fr[3].t0, fr[3].face, fr[2].face, fr[2].t1,
            fr[3].limit, fr[3].t1, fr[2].t0, fr[2].limit,
        ];
        Some(Self { b })
    }

    /// Limit position of corner `i`.
    pub fn corner(&self, i: usize) -> Point3 {
        const REG: [usize; 4] = [0, 3, 15, 12];
        self.b[REG[i % 4]]
    }
}

fn bernstein(t: f64) -> ([f64; 4], [f64; 4]) {
    let m1 = 1.0 - t;
    let m2 = m1 * m1;
    let t2 = t * t;
    let c = [m2 * m1, m2 * t * 3.0, m1 * t2 * 3.0, t2 * t];
    let d = [m2 * -3.0, m1 * (3.0 - 9.0 * t), (6.0 - 9.0 * t) * t, t2 * 3.0];
    (c, d)
}

impl ParametricPatch for BicubicPatch {
    fn parameters(&self, uv: &Point2) -> (Point3, Vec3) {
        let (uc, ud) = bernstein(uv.x);
        let (vc, vd) = bernstein(uv.y);

        let mut p = Vec3::zeros();
        let mut su = Vec3::zeros();
        let mut sv = Vec3::zeros();
        for j in 0..4 {
            let mut cp = Vec3::zeros();
            let mut csu = Vec3::zeros();
            for i in 0..4 {
                let b = self.b[j * 4 + i].coords;
                cp += b * uc[i];
                csu += b * ud[i];
            }
            p += cp * vc[j];
            su += csu * vc[j];
            sv += cp * vd[j];
        }

        let dir = su.cross(&sv);
        let len = dir.norm();
        let normal = if len < 1e-5 {
            // Collapsed corner: fall back on the diagonal against the u tangent.
            (self.b[10] - self.b[15])
                .cross(&su)
                .try_normalize(0.0)
                .unwrap_or_else(Vec3::z)
        } else {
            dir / len
        };
        (Point3::from(p), normal)
    }

    fn kind(&self) -> PatchKind {
        PatchKind::Bicubic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Rings of the +z face of an all-creased axis-aligned unit cube.
    fn creased_cube_face() -> [CornerRing; 4] {
        let c = [
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(1.0, 0.0, 1.0),
            Point3::new(1.0, 1.0, 1.0),
            Point3::new(0.0, 1.0, 1.0),
        ];
        std::array::from_fn(|i| {
            let below = Point3::new(c[i].x, c[i].y, 0.0);
            CornerRing {
                center: c[i],
                ring: vec![c[(i + 1) % 4], c[(i + 3) % 4], below],
                diag: vec![
                    c[(i + 2) % 4],
                    Point3::new(c[(i + 3) % 4].x, c[(i + 3) % 4].y, 0.0),
                    Point3::new(c[(i + 1) % 4].x, c[(i + 1) % 4].y, 0.0),
                ],
                creased: vec![true, true, true],
            }
        })
    }

    #[test]
    fn creased_face_is_planar_and_linear() {
        let patch = BicubicPatch::from_rings(&creased_cube_face()).unwrap();
        for &(u, v) in &[(0.0, 0.0), (0.5, 0.5), (0.25, 0.75), (1.0, 1.0)] {
            let (p, n) = patch.parameters(&Point2::new(u, v));
            assert!((p - Point3::new(u, v, 1.0)).norm() < 1e-12, "({u},{v}) -> {p:?}");
            assert!((n - Vec3::z()).norm() < 1e-9, "normal {n:?}");
        }
    }

    #[test]
    fn corners_are_limit_points() {
        let patch = BicubicPatch::from_rings(&creased_cube_face()).unwrap();
        assert!((patch.corner(2) - Point3::new(1.0, 1.0, 1.0)).norm() < 1e-12);
    }

    #[test]
    fn smooth_regular_grid_is_flat() {
        // Valence-4 corners inside a flat regular grid evaluate in-plane.
        let grid = |x: f64, y: f64| Point3::new(x, y, 0.0);
        let corners = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
        let rings: [CornerRing; 4] = std::array::from_fn(|i| {
            let (x, y) = corners[i];
            // Ring order starts along the patch boundary, rotated per corner.
            let dirs = [(1.0, 0.0), (0.0, 1.0), (-1.0, 0.0), (0.0, -1.0)];
            let start = i;
            let ring: Vec<Point3> = (0..4)
                .map(|k| {
                    let (dx, dy) = dirs[(start + k) % 4];
                    grid(x + dx, y + dy)
                })
                .collect();
            let diag: Vec<Point3> = (0..4)
                .map(|k| {
                    let (ax, ay) = dirs[(start + k) % 4];
                    let (bx, by) = dirs[(start + k + 1) % 4];
                    grid(x + ax + bx, y + ay + by)
                })
                .collect();
            CornerRing {
                center: grid(x, y),
                ring,
                diag,
                creased: vec![false; 4],
            }
        });
        let patch = BicubicPatch::from_rings(&rings).unwrap();
        let (p, n) = patch.parameters(&Point2::new(0.3, 0.6));
        assert!(p.z.abs() < 1e-12);
        assert!((n - Vec3::z()).norm() < 1e-9);
    }

    #[test]
    fn rejects_empty_ring() {
        let rings: [CornerRing; 4] = Default::default();
        assert!(BicubicPatch::from_rings(&rings).is_none());
    }
}
