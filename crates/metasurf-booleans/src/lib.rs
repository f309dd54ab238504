#![warn(missing_docs)]

//! CSG boolean operations on subdivided patch geometries.
//!
//! The boolean pipeline has 4 stages:
//! 1. **Broad phase**: a hierarchical grid over patch boxes, then an AABB
//!    tree per patch over its subpatch boxes
//! 2. **Trimming**: every overlapping subpatch pair is cut along its
//!    intersection polyline
//! 3. **Loops**: the cut subpatches rebuild their trimming loops
//! 4. **Classification**: one sample point per subpatch or loop is ray
//!    cast against the other operand and hidden unless the operation
//!    keeps its class
//!
//! Nothing is deleted: removed surface is only hidden, and the
//! tessellator skips it.

mod api;
pub mod bbox;
pub mod classify;
pub mod hgrid;
mod pipeline;
pub mod tree;

pub use api::{boolean_op, BooleanOp};
pub use classify::{ClassMask, Classification, RayTarget};

#[cfg(test)]
mod tests {
    use super::*;
    use metasurf_math::{Point3, Transform};
    use metasurf_tessellate::{tessellate, MeshParams, SurfaceMesh};
    use metasurf_topo::{Geometry, SubdivisionParams};

    /// Unit cube at `offset`, every edge creased, subdivided.
    fn unit_box(offset: (f64, f64, f64)) -> Geometry {
        let mut g = Geometry::new();
        for z in [0.0, 1.0] {
            for (x, y) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
                g.add_control_point(Point3::new(x, y, z));
            }
        }
        for [a, b, c, d] in [
            [0, 3, 2, 1],
            [4, 5, 6, 7],
            [0, 1, 5, 4],
            [1, 2, 6, 5],
            [2, 3, 7, 6],
            [3, 0, 4, 7],
        ] {
            g.add_patch(a, b, c, d, 0xf).unwrap();
        }
        g.compute_neighbors();
        g.subdivide(&SubdivisionParams::default());
        g.transformed(&Transform::translation(offset.0, offset.1, offset.2))
    }

    /// Signed volume enclosed by the mesh (divergence theorem).
    fn mesh_volume(mesh: &SurfaceMesh) -> f64 {
        mesh.indices
            .chunks(3)
            .map(|t| {
                let [a, b, c] = [0, 1, 2].map(|k| {
                    let p = mesh.position(t[k]);
                    Point3::new(p[0] as f64, p[1] as f64, p[2] as f64)
                });
                a.coords.dot(&b.coords.cross(&c.coords)) / 6.0
            })
            .sum()
    }

    fn result_volume(a: &Geometry, b: &Geometry, op: BooleanOp) -> f64 {
        let mut result = boolean_op(a, b, op);
        let mesh = tessellate(&mut result, &MeshParams::default());
        let v = mesh_volume(&mesh);
        eprintln!("{op:?}: {} triangles, volume {v:.6}", mesh.num_triangles());
        v
    }

    #[test]
    fn unit_box_encloses_unit_volume() {
        let mut g = unit_box((0.0, 0.0, 0.0));
        let mesh = tessellate(&mut g, &MeshParams::default());
        approx::assert_relative_eq!(mesh_volume(&mesh), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn intersect_with_itself_keeps_first_operand() {
        let a = unit_box((0.0, 0.0, 0.0));
        let result = boolean_op(&a, &a, BooleanOp::Intersection);
        assert_eq!(result.num_patches(), 12);
        for (pid, patch) in result.patches.iter().enumerate() {
            let visible = !patch.hidden && patch.subpatches.iter().any(|s| !s.hidden);
            assert_eq!(visible, pid < 6, "patch {pid} visibility");
        }
        let mut result = result;
        let mesh = tessellate(&mut result, &MeshParams::default());
        approx::assert_relative_eq!(mesh_volume(&mesh), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn overlapping_boxes() {
        // Overlap is 0.6 x 0.7 x 0.55.
        let a = unit_box((0.0, 0.0, 0.0));
        let b = unit_box((0.4, 0.3, 0.45));
        let overlap = 0.6 * 0.7 * 0.55;
        let union = result_volume(&a, &b, BooleanOp::Union);
        let difference = result_volume(&a, &b, BooleanOp::Difference);
        let intersection = result_volume(&a, &b, BooleanOp::Intersection);
        assert!((union - (2.0 - overlap)).abs() < 1e-4, "union volume {union}");
        assert!((difference - (1.0 - overlap)).abs() < 1e-4, "difference volume {difference}");
        assert!((intersection - overlap).abs() < 1e-4, "intersection volume {intersection}");
    }

    #[test]
    fn disjoint_boxes_take_shortcuts() {
        let a = unit_box((0.0, 0.0, 0.0));
        let b = unit_box((3.0, 0.0, 0.0));
        approx::assert_relative_eq!(result_volume(&a, &b, BooleanOp::Union), 2.0, epsilon = 1e-6);
        approx::assert_relative_eq!(result_volume(&a, &b, BooleanOp::Difference), 1.0, epsilon = 1e-6);
        assert_eq!(result_volume(&a, &b, BooleanOp::Intersection), 0.0);
    }

    #[test]
    fn difference_flips_the_tool() {
        let a = unit_box((0.0, 0.0, 0.0));
        let b = unit_box((0.5, 0.25, 0.25));
        let result = boolean_op(&a, &b, BooleanOp::Difference);
        assert!(result.patches[..6].iter().all(|p| !p.flipped));
        assert!(result.patches[6..].iter().all(|p| p.flipped));
    }
}
