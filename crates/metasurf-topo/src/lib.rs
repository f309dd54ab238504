#![warn(missing_docs)]

//! Patch store and per-patch vertex grids for the metasurf engine.
//!
//! A [`Geometry`] owns a shared array of control points and a list of
//! [`Patch`]es. Each patch owns its own arenas:
//!
//! - `vertices`: a quad-edge grid of [`Vertex`] nodes linked through
//!   `next[4]` (`0 = -v`, `1 = +u`, `2 = +v`, `3 = -u`);
//! - `subpatches`: the leaf quads of the adaptive subdivision;
//! - `trimmings`: the cut records of subpatches touched by a boolean.
//!
//! All cross references are indices into those arenas, so growing a
//! vector never invalidates a link.

mod error;
mod geometry;
mod grid;
mod linearize;
mod patch;
mod subdivide;
mod trimming;
mod vertex;

pub use error::GeometryError;
pub use geometry::Geometry;
pub use patch::{Patch, Subpatch};
pub use subdivide::{EdgeSamples, SubdivisionParams};
pub use trimming::{Loop, Trimming};
pub use vertex::{Vertex, FACE_VERTEX};

/// Index of a patch in [`Geometry::patches`].
pub type PatchId = usize;

/// Index of a vertex in [`Patch::vertices`].
pub type VertexId = usize;
