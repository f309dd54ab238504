//! Oriented planes with signed distance evaluation.

use crate::{Point3, Vec3};

/// A plane `n·p + d = 0` with unit normal `n`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Unit normal.
    pub normal: Vec3,
    /// Offset along the normal.
    pub d: f64,
}

impl Plane {
    /// Plane through `point` with normal `normal`. The normal is normalized;
    /// a degenerate normal yields a zero plane that evaluates to 0 everywhere.
    pub fn from_normal(normal: Vec3, point: &Point3) -> Self {
        let n = normal.try_normalize(0.0).unwrap_or_else(Vec3::zeros);
        Self {
            normal: n,
            d: -n.dot(&point.coords),
        }
    }

    /// Plane through three points, oriented by `(b-a) × (c-a)`.
    pub fn from_points(a: &Point3, b: &Point3, c: &Point3) -> Self {
        Self::from_normal((b - a).cross(&(c - a)), a)
    }

    /// Signed distance from `p` to the plane.
    pub fn evaluate(&self, p: &Point3) -> f64 {
        self.normal.dot(&p.coords) + self.d
    }
}

impl Default for Plane {
    fn default() -> Self {
        Self {
            normal: Vec3::z(),
            d: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_distance() {
        let p = Plane::from_points(
            &Point3::new(0.0, 0.0, 1.0),
            &Point3::new(1.0, 0.0, 1.0),
            &Point3::new(0.0, 1.0, 1.0),
        );
        assert!((p.evaluate(&Point3::new(3.0, -2.0, 3.0)) - 2.0).abs() < 1e-12);
        assert!((p.evaluate(&Point3::origin()) + 1.0).abs() < 1e-12);
    }
}
