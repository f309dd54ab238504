#![warn(missing_docs)]

//! Trimming of subdivided patches.
//!
//! Two subpatches are cut against each other by approximating each with
//! two triangles and intersecting the triangle pairs. Intersection points
//! become vertices of the patch grids (on a subpatch side) or of the
//! subpatch trimming (in its interior), and intersection segments become
//! trimming edges. Loops are then traced from the subpatch boundary and
//! the trimming edges so every region can be classified on its own.

mod crossings;
mod intersect;
mod loops;
mod point;

pub use intersect::trim_subpatches;
pub use loops::{compute_loops, update_loops};
pub use point::{loop_point, point_in_loop, surface_point};
