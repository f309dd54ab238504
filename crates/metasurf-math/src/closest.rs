//! Closest-point queries gated by a squared distance.
//!
//! Each query succeeds only when the closest features lie strictly inside
//! the primitives and within `error` (squared distance) of each other.

use crate::{Point3, Vec3};

/// Closest point on the open segment `v0 v1` to `pt`.
///
/// Returns the point and its parameter `t` in `(0, 1)`.
pub fn closest_pt_segment(pt: &Point3, v0: &Point3, v1: &Point3, error: f64) -> Option<(Point3, f64)> {
    let e10 = v1 - v0;
    let ptv0 = pt - v0;
    let e = ptv0.dot(&e10);
    if e <= 0.0 {
        return None;
    }
    let f = e10.dot(&e10);
    if e >= f {
        return None;
    }
    let t = e / f;
    let d = ptv0.dot(&ptv0) - e * t;
    if d > error {
        return None;
    }
    Some((v0 + e10 * t, t))
}

/// Closest points between segments `v0 v1` and `v2 v3`.
///
/// Returns `(r1, s, r2, t)` with `r1 = v0 + s(v1-v0)` and `r2 = v2 + t(v3-v2)`.
/// Parallel segments are rejected.
pub fn closest_pt_segment_segment(
    v0: &Point3,
    v1: &Point3,
    v2: &Point3,
    v3: &Point3,
    error: f64,
) -> Option<(Point3, f64, Point3, f64)> {
    let e10 = v1 - v0;
    let e32 = v3 - v2;
    let r = v0 - v2;

    let a = e10.dot(&e10);
    let b = e10.dot(&e32);
    let c = e10.dot(&r);
    let e = e32.dot(&e32);
    let f = e32.dot(&r);

    let denom = a * e - b * b;
    if denom.abs() < 1e-12 {
        return None;
    }

    let s = (b * f - c * e) / denom;
    if !(0.0..=1.0).contains(&s) {
        return None;
    }
    let t = (b * s + f) / e;
    if !(0.0..=1.0).contains(&t) {
        return None;
    }

    let r1 = v0 + e10 * s;
    let r2 = v2 + e32 * t;
    if (r2 - r1).norm_squared() > error {
        return None;
    }
    Some((r1, s, r2, t))
}

/// Projection of `pt` strictly inside triangle `v0 v1 v2`.
///
/// Returns the projected point and its barycentric coordinates.
pub fn closest_pt_triangle(pt: &Point3, v0: &Point3, v1: &Point3, v2: &Point3) -> Option<(Point3, Vec3)> {
    let v10 = v1 - v0;
    let v20 = v2 - v0;
    let ptv0 = pt - v0;
    let ptv1 = pt - v1;

    let d1 = v10.dot(&ptv0);
    let d2 = v20.dot(&ptv0);
    let d3 = v10.dot(&ptv1);
    let d4 = v20.dot(&ptv1);
    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 {
        return None;
    }

    let ptv2 = pt - v2;
    let d5 = v10.dot(&ptv2);
    let d6 = v20.dot(&ptv2);
    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 {
        return None;
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 {
        return None;
    }

    let denom = 1.0 / (va + vb + vc);
    let by = vb * denom;
    let bz = vc * denom;
    let bary = Vec3::new(1.0 - by - bz, by, bz);
    Some((v0 + v10 * by + v20 * bz, bary))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_interior_only() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(2.0, 0.0, 0.0);
        let (p, t) = closest_pt_segment(&Point3::new(0.5, 1e-4, 0.0), &a, &b, 1e-6).unwrap();
        assert!((t - 0.25).abs() < 1e-12);
        assert!((p.x - 0.5).abs() < 1e-12);
        assert!(closest_pt_segment(&Point3::new(-0.1, 0.0, 0.0), &a, &b, 1e-6).is_none());
        assert!(closest_pt_segment(&Point3::new(1.0, 0.1, 0.0), &a, &b, 1e-6).is_none());
    }

    #[test]
    fn crossing_segments() {
        let (r1, s, r2, t) = closest_pt_segment_segment(
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(1.0, 0.0, 0.0),
            &Point3::new(0.25, -1.0, 0.0),
            &Point3::new(0.25, 1.0, 0.0),
            1e-8,
        )
        .unwrap();
        assert!((s - 0.25).abs() < 1e-12);
        assert!((t - 0.5).abs() < 1e-12);
        assert!((r1 - r2).norm() < 1e-12);
    }

    #[test]
    fn parallel_segments_rejected() {
        assert!(closest_pt_segment_segment(
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(1.0, 0.0, 0.0),
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(2.0, 0.0, 0.0),
            1.0,
        )
        .is_none());
    }

    #[test]
    fn triangle_barycentrics() {
        let (p, bary) = closest_pt_triangle(
            &Point3::new(0.25, 0.25, 3.0),
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(1.0, 0.0, 0.0),
            &Point3::new(0.0, 1.0, 0.0),
        )
        .unwrap();
        assert!((p - Point3::new(0.25, 0.25, 0.0)).norm() < 1e-12);
        assert!((bary.x - 0.5).abs() < 1e-12);
        assert!((bary.y - 0.25).abs() < 1e-12);
        assert!((bary.z - 0.25).abs() < 1e-12);
    }
}
