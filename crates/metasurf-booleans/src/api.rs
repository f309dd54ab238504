//! Public API types and entry point for boolean operations.

use metasurf_topo::Geometry;

use crate::bbox::geometry_aabb;
use crate::classify::ClassMask;
use crate::pipeline::merge_and_clip;

/// CSG boolean operation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOp {
    /// Union: combine both geometries.
    Union,
    /// Difference: subtract the tool from the target.
    Difference,
    /// Intersection: keep only the overlapping region.
    Intersection,
}

impl BooleanOp {
    /// Classes kept on the target (`a`) and on the tool (`b`).
    ///
    /// Union keeps target surface outside the tool or on its boundary
    /// seen from inside, and tool surface outside the target. Difference
    /// keeps target surface outside the tool and tool surface inside the
    /// target or on its boundary with no net crossing. Intersection keeps
    /// target surface inside the tool or on its boundary seen from
    /// inside, and tool surface inside the target.
    pub fn masks(self) -> (ClassMask, ClassMask) {
        match self {
            BooleanOp::Union => (ClassMask::VOLUME_OUT | ClassMask::BOUNDARY_IN, ClassMask::VOLUME_OUT),
            BooleanOp::Difference => (ClassMask::VOLUME_OUT, ClassMask::VOLUME_IN | ClassMask::BOUNDARY_OUT),
            BooleanOp::Intersection => (ClassMask::VOLUME_IN | ClassMask::BOUNDARY_IN, ClassMask::VOLUME_IN),
        }
    }
}

/// Apply `op` to subdivided geometries `a` and `b`.
///
/// The result holds the patches of both operands; removed surface is
/// hidden, not deleted. For a difference the tool's patches are flipped
/// so they face out of the result. When the operands' boxes do not
/// overlap the result is assembled without trimming.
pub fn boolean_op(a: &Geometry, b: &Geometry, op: BooleanOp) -> Geometry {
    let mut result = a.clone();
    if !geometry_aabb(a).overlaps(&geometry_aabb(b)) {
        non_overlapping_boolean(&mut result, b, op);
        return result;
    }

    let (mask_a, mask_b) = op.masks();
    let first_b = merge_and_clip(&mut result, b, mask_a, mask_b);
    if op == BooleanOp::Difference {
        for patch in &mut result.patches[first_b..] {
            patch.flip();
        }
    }
    result
}

/// Handle boolean operations on non-overlapping geometries.
fn non_overlapping_boolean(a: &mut Geometry, b: &Geometry, op: BooleanOp) {
    match op {
        // Union of disjoint operands keeps both.
        BooleanOp::Union => {
            a.append(b);
        }
        // Nothing to subtract.
        BooleanOp::Difference => {}
        BooleanOp::Intersection => {
            for patch in &mut a.patches {
                patch.hidden = true;
            }
        }
    }
}
