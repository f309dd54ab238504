#![warn(missing_docs)]

//! Triangle mesh extraction for the metasurf engine.
//!
//! Converts subdivided (and possibly trimmed) patches into an indexed
//! triangle mesh by:
//! 1. Walking the boundary of every visible untrimmed subpatch and
//!    stitching its four sides with a corner-aware strip
//! 2. Ear clipping every visible loop of trimmed subpatches
//! 3. Merging output vertices that coincide in position, texture
//!    coordinate and normal
//!
//! Triangles are grouped by material into [`MeshRange`]s.

mod dedup;
mod mesh;
mod polygon;
mod quad;

pub use dedup::VertexGrid;
pub use mesh::{patch_triangles, tessellate, MeshParams, MeshRange, SurfaceMesh};
pub use polygon::triangulate_polygon;
pub use quad::triangulate_quad;
