//! 2D orientation predicates over projected points.
//!
//! The sign convention follows the projection chosen by
//! [`projection_axes`]: a triangle is counter-clockwise when its signed
//! area is negative, which corresponds to a positive winding about the
//! normal the axes were chosen from.

use crate::{Point2, Point3, Vec3};

/// Signed area (times two) of the projected triangle `abc`.
pub fn tri_area(a: &Point2, b: &Point2, c: &Point2) -> f64 {
    let u = b - a;
    let v = c - a;
    u.y * v.x - u.x * v.y
}

/// Counter-clockwise test.
pub fn ccw(a: &Point2, b: &Point2, c: &Point2) -> bool {
    tri_area(a, b, c) < 0.0
}

/// Inclusive point-in-triangle test for a counter-clockwise triangle.
pub fn point_in_triangle(p: &Point2, a: &Point2, b: &Point2, c: &Point2) -> bool {
    !(ccw(a, p, b) || ccw(b, p, c) || ccw(c, p, a))
}

/// Lexicographic order on 2D points: by `x`, then by `y`.
pub fn lexicographic_lt(a: &Point2, b: &Point2) -> bool {
    a.x < b.x || (a.x == b.x && a.y < b.y)
}

/// Project a 3D point onto the two axes `x` and `y`.
pub fn project(p: &Point3, x: usize, y: usize) -> Point2 {
    Point2::new(p[x], p[y])
}

/// Index of the component with the largest magnitude.
pub fn dominant_axis(v: &Vec3) -> usize {
    let a = v.abs();
    if a.x >= a.y && a.x >= a.z {
        0
    } else if a.y >= a.z {
        1
    } else {
        2
    }
}

/// Projection axes `[x, y, z]` for geometry facing `n`: `z` is the dominant
/// axis, and `x`/`y` are swapped when `n` points down that axis so that
/// projected windings keep their orientation.
pub fn projection_axes(n: &Vec3) -> [usize; 3] {
    let z = dominant_axis(n);
    let (x, y) = ((z + 1) % 3, (z + 2) % 3);
    if n[z] < 0.0 {
        [y, x, z]
    } else {
        [x, y, z]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ccw_matches_positive_winding() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(1.0, 0.0);
        let c = Point2::new(0.0, 1.0);
        assert!(ccw(&a, &b, &c));
        assert!(!ccw(&a, &c, &b));
        assert!((tri_area(&a, &b, &c) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn point_in_triangle_is_inclusive() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(1.0, 0.0);
        let c = Point2::new(0.0, 1.0);
        assert!(point_in_triangle(&Point2::new(0.25, 0.25), &a, &b, &c));
        assert!(point_in_triangle(&Point2::new(0.5, 0.0), &a, &b, &c));
        assert!(!point_in_triangle(&Point2::new(0.75, 0.75), &a, &b, &c));
    }

    #[test]
    fn projection_keeps_orientation_for_flipped_normals() {
        // Same square seen from +z and -z: windings are reversed in 3D, so
        // the projected triangle must stay counter-clockwise in both.
        let p0 = Point3::new(0.0, 0.0, 0.0);
        let p1 = Point3::new(1.0, 0.0, 0.0);
        let p2 = Point3::new(0.0, 1.0, 0.0);

        let [x, y, _] = projection_axes(&Vec3::z());
        assert!(ccw(&project(&p0, x, y), &project(&p1, x, y), &project(&p2, x, y)));

        let [x, y, z] = projection_axes(&-Vec3::z());
        assert_eq!(z, 2);
        assert!(ccw(&project(&p0, x, y), &project(&p2, x, y), &project(&p1, x, y)));
    }

    #[test]
    fn dominant_axis_uses_magnitude() {
        assert_eq!(dominant_axis(&Vec3::new(0.1, -0.9, 0.3)), 1);
        assert_eq!(dominant_axis(&Vec3::new(-2.0, 1.0, 1.0)), 0);
    }
}
