use metasurf_math::{Point2, Point3, Vec3};

use crate::{ParametricPatch, PatchKind};

/// A bilinear patch over four corners laid out counter-clockwise:
/// `c[0]` at `(0,0)`, `c[1]` at `(1,0)`, `c[2]` at `(1,1)`, `c[3]` at `(0,1)`.
///
/// ```text
/// P(u, v) = (1-u)(1-v)*c0 + u*(1-v)*c1 + u*v*c2 + (1-u)*v*c3
/// ```
#[derive(Debug, Clone)]
pub struct BilinearPatch {
    /// Corner positions.
    pub corners: [Point3; 4],
}

impl BilinearPatch {
    /// Create a bilinear patch from its four corners.
    pub fn new(corners: [Point3; 4]) -> Self {
        Self { corners }
    }

    /// Check if the four corners are coplanar.
    pub fn is_planar(&self) -> bool {
        let [c0, c1, _, c3] = &self.corners;
        let n = (c1 - c0).cross(&(c3 - c0));
        if n.norm() < 1e-12 {
            return true;
        }
        ((self.corners[2] - c0).dot(&n).abs() / n.norm()) < 1e-10
    }

    fn d_du(&self, v: f64) -> Vec3 {
        let [c0, c1, c2, c3] = &self.corners;
        (c1 - c0) * (1.0 - v) + (c2 - c3) * v
    }

    fn d_dv(&self, u: f64) -> Vec3 {
        let [c0, c1, c2, c3] = &self.corners;
        (c3 - c0) * (1.0 - u) + (c2 - c1) * u
    }
}

impl ParametricPatch for BilinearPatch {
    fn parameters(&self, uv: &Point2) -> (Point3, Vec3) {
        let (u, v) = (uv.x, uv.y);
        let [c0, c1, c2, c3] = &self.corners;
        let bottom = c0.coords.lerp(&c1.coords, u);
        let top = c3.coords.lerp(&c2.coords, u);
        let pos = Point3::from(bottom.lerp(&top, v));

        let n = self.d_du(v).cross(&self.d_dv(u));
        let normal = n
            .try_normalize(1e-12)
            .or_else(|| (c2 - c0).cross(&(c3 - c1)).try_normalize(1e-12))
            .unwrap_or_else(Vec3::z);
        (pos, normal)
    }

    fn kind(&self) -> PatchKind {
        PatchKind::Bilinear
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skewed() -> BilinearPatch {
        BilinearPatch::new([
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(2.0, 1.0, 1.0),
            Point3::new(0.0, 1.0, 0.0),
        ])
    }

    #[test]
    fn corners_interpolated() {
        let p = skewed();
        let uvs = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
        for (c, (u, v)) in uvs.iter().enumerate() {
            let (pos, _) = p.parameters(&Point2::new(*u, *v));
            assert!((pos - p.corners[c]).norm() < 1e-12, "corner {c} mismatch");
        }
    }

    #[test]
    fn normal_of_flat_square_is_z() {
        let p = BilinearPatch::new([
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ]);
        assert!(p.is_planar());
        let (_, n) = p.parameters(&Point2::new(0.3, 0.7));
        assert!((n - Vec3::z()).norm() < 1e-12);
    }

    #[test]
    fn twisted_patch_is_not_planar() {
        assert!(!skewed().is_planar());
    }
}
