#![warn(missing_docs)]

//! Math types for the metasurf patch engine.
//!
//! Thin wrappers around nalgebra providing the types shared by every
//! stage of the pipeline: points, vectors, affine transforms, planes,
//! the engine tolerances, and the 2D/3D predicates used by trimming,
//! loop building and triangulation.

mod closest;
mod earclip;
mod plane;
mod predicates;

pub use closest::{closest_pt_segment, closest_pt_segment_segment, closest_pt_triangle};
pub use earclip::{Ear, EarClipper};
pub use plane::Plane;
pub use predicates::{
    ccw, dominant_axis, lexicographic_lt, point_in_triangle, project, projection_axes, tri_area,
};

use nalgebra::{Matrix4, Unit, Vector2, Vector3, Vector4};
use serde::{Deserialize, Serialize};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A unit (normalized) direction vector in 3D space.
pub type Dir3 = Unit<Vector3<f64>>;

/// A point in 2D parameter or projection space.
pub type Point2 = nalgebra::Point2<f64>;

/// A vector in 2D space.
pub type Vec2 = Vector2<f64>;

/// A 4x4 affine transformation matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// The underlying 4x4 matrix.
    pub matrix: Matrix4<f64>,
}

impl Transform {
    /// Identity transform.
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Translation by `(dx, dy, dz)`.
    pub fn translation(dx: f64, dy: f64, dz: f64) -> Self {
        let mut m = Matrix4::identity();
        m[(0, 3)] = dx;
        m[(1, 3)] = dy;
        m[(2, 3)] = dz;
        Self { matrix: m }
    }

    /// Non-uniform scale by `(sx, sy, sz)`.
    pub fn scale(sx: f64, sy: f64, sz: f64) -> Self {
        let mut m = Matrix4::identity();
        m[(0, 0)] = sx;
        m[(1, 1)] = sy;
        m[(2, 2)] = sz;
        Self { matrix: m }
    }

    /// Rotation about the Z axis by `angle` radians.
    pub fn rotation_z(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let mut m = Matrix4::identity();
        m[(0, 0)] = c;
        m[(0, 1)] = -s;
        m[(1, 0)] = s;
        m[(1, 1)] = c;
        Self { matrix: m }
    }

    /// Rotation about an arbitrary axis through the origin by `angle` radians.
    ///
    /// Uses Rodrigues' rotation formula.
    pub fn rotation_about_axis(axis: &Dir3, angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let t = 1.0 - c;
        let (x, y, z) = (axis.as_ref().x, axis.as_ref().y, axis.as_ref().z);
        let mut m = Matrix4::identity();
        m[(0, 0)] = t * x * x + c;
        m[(0, 1)] = t * x * y - s * z;
        m[(0, 2)] = t * x * z + s * y;
        m[(1, 0)] = t * x * y + s * z;
        m[(1, 1)] = t * y * y + c;
        m[(1, 2)] = t * y * z - s * x;
        m[(2, 0)] = t * x * z - s * y;
        m[(2, 1)] = t * y * z + s * x;
        m[(2, 2)] = t * z * z + c;
        Self { matrix: m }
    }

    /// Compose: `self` then `other` (self * other).
    pub fn then(&self, other: &Transform) -> Self {
        Self {
            matrix: self.matrix * other.matrix,
        }
    }

    /// Transform a point.
    pub fn apply_point(&self, p: &Point3) -> Point3 {
        let v = self.matrix * Vector4::new(p.x, p.y, p.z, 1.0);
        Point3::new(v.x, v.y, v.z)
    }

    /// Transform a direction vector (ignores translation).
    pub fn apply_vec(&self, v: &Vec3) -> Vec3 {
        let r = self.matrix * Vector4::new(v.x, v.y, v.z, 0.0);
        Vec3::new(r.x, r.y, r.z)
    }

    /// Transform a normal vector (inverse transpose of the upper-left 3x3),
    /// renormalized.
    pub fn apply_normal(&self, n: &Vec3) -> Vec3 {
        let m3 = self.matrix.fixed_view::<3, 3>(0, 0);
        match m3.try_inverse() {
            Some(inv) => (inv.transpose() * n).try_normalize(0.0).unwrap_or(*n),
            None => *n,
        }
    }

    /// Whether this transform mirrors space (negative determinant).
    pub fn is_mirroring(&self) -> bool {
        self.matrix.fixed_view::<3, 3>(0, 0).determinant() < 0.0
    }

    /// Inverse of this transform, if it exists.
    pub fn inverse(&self) -> Option<Self> {
        self.matrix.try_inverse().map(|matrix| Self { matrix })
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Tolerances used by the trimming, loop and tessellation passes.
///
/// Every threshold is derived from `linear`, the maximum geometric error
/// tolerated when deciding that two features coincide.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    /// Maximum coincidence distance (world units).
    pub linear: f64,
}

impl Tolerance {
    /// Default engine tolerance of `1/4096` world units.
    pub const DEFAULT: Self = Self {
        linear: 1.0 / 4096.0,
    };

    /// UV distance under which two parameter values are the same.
    pub const UV_EPSILON: f64 = 1.0 / 65536.0;

    /// Smallest UV extent an interior criterion may still split.
    pub const MIN_SPLIT_EXTENT: f64 = 1.0 / 16.0;

    /// Squared linear tolerance, used for plane-distance snapping and
    /// point coincidence.
    pub fn error2(&self) -> f64 {
        self.linear * self.linear
    }

    /// Squared distance under which a vertex coincides with an edge.
    pub fn edge2(&self) -> f64 {
        2.0 * self.error2()
    }

    /// Squared distance under which two vertices coincide.
    pub fn vertex2(&self) -> f64 {
        4.0 * self.error2()
    }

    /// Squared distance under which a new feature point duplicates an
    /// already found one.
    pub fn feature2(&self) -> f64 {
        8.0 * self.error2()
    }

    /// Check if two points are coincident within tolerance.
    pub fn points_equal(&self, a: &Point3, b: &Point3) -> bool {
        (a - b).norm_squared() < self.error2()
    }

    /// Check if a scalar distance is effectively zero.
    pub fn is_zero(&self, d: f64) -> bool {
        d.abs() < self.linear
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Bilinear blend of four values laid out as `a + (b-a)u` on the first row
/// and `c + (d-c)u` on the second, then interpolated along `v`.
pub fn bilinear(a: &Point2, b: &Point2, c: &Point2, d: &Point2, u: f64, v: f64) -> Point2 {
    let r0 = a + (b - a) * u;
    let r1 = c + (d - c) * u;
    r0 + (r1 - r0) * v
}

/// Smallest power of two greater than or equal to `v` (1 for `v <= 1`).
pub fn next_pow2(v: u32) -> u32 {
    v.max(1).next_power_of_two()
}
