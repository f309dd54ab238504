use std::sync::Arc;

use metasurf_geom::{Displacement, UvMapping};
use metasurf_math::{Point2, Point3};

use crate::{PatchId, Trimming, Vertex, VertexId};

/// A leaf quad of a patch's subdivision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subpatch {
    /// Corner vertices, counter-clockwise from `(u0, v0)`.
    pub corners: [VertexId; 4],
    /// Bit `i` set while edge `i` is still considered curved.
    pub curved: u8,
    /// Removed by classification.
    pub hidden: bool,
    /// Index into [`Patch::trimmings`] once cut by a boolean.
    pub trimming: Option<usize>,
}

impl Subpatch {
    /// An untrimmed subpatch with all edges curved.
    pub fn new(corners: [VertexId; 4]) -> Self {
        Self {
            corners,
            curved: 0xf,
            hidden: false,
            trimming: None,
        }
    }

    /// First and last vertex of edge `edge` in increasing parameter
    /// order.
    pub fn edge_span(&self, edge: usize) -> (VertexId, VertexId) {
        let c = &self.corners;
        match edge & 3 {
            0 => (c[0], c[1]),
            1 => (c[1], c[2]),
            2 => (c[3], c[2]),
            _ => (c[0], c[3]),
        }
    }
}

/// A curved quad surface element.
///
/// Control points are shared through the owning geometry; the vertex grid,
/// subpatches and trimmings are owned by the patch.
#[derive(Debug, Clone)]
pub struct Patch {
    /// Material (face) ID.
    pub material: u32,
    /// Control point indices, counter-clockwise.
    pub controls: [u32; 4],
    /// Texture coordinates of the four corners.
    pub uv: [Point2; 4],
    /// Neighbor patch across each edge.
    pub neighbors: [Option<PatchId>; 4],
    /// Matching edge index on each neighbor.
    pub neighbor_edges: [u8; 4],
    /// Bit `i` set when edge `i` is a crease.
    pub creases: u8,
    /// At least one subpatch carries a trimming.
    pub trimmed: bool,
    /// Removed by classification.
    pub hidden: bool,
    /// Emit triangles with reversed winding.
    pub flipped: bool,
    /// Texture coordinate procedure.
    pub mapping: Option<Arc<dyn UvMapping>>,
    /// Displacement procedure.
    pub displacement: Option<Arc<dyn Displacement>>,
    /// Vertex grid.
    pub vertices: Vec<Vertex>,
    /// Leaf quads.
    pub subpatches: Vec<Subpatch>,
    /// Cut records, referenced by [`Subpatch::trimming`].
    pub trimmings: Vec<Trimming>,
}

/// Parameters of the four corners of the unit square.
pub(crate) fn unit_uv() -> [Point2; 4] {
    [
        Point2::new(0.0, 0.0),
        Point2::new(1.0, 0.0),
        Point2::new(1.0, 1.0),
        Point2::new(0.0, 1.0),
    ]
}

impl Patch {
    /// An unsubdivided patch over control points `controls`.
    pub fn new(controls: [u32; 4], creases: u8) -> Self {
        Self {
            material: 0,
            controls,
            uv: unit_uv(),
            neighbors: [None; 4],
            neighbor_edges: [0; 4],
            creases: creases & 0xf,
            trimmed: false,
            hidden: false,
            flipped: false,
            mapping: None,
            displacement: None,
            vertices: Vec::new(),
            subpatches: Vec::new(),
            trimmings: Vec::new(),
        }
    }

    /// Whether edge `edge` is a crease.
    pub fn crease(&self, edge: usize) -> bool {
        self.creases & (1 << (edge & 3)) != 0
    }

    /// Whether the vertex grid has been built.
    pub fn is_subdivided(&self) -> bool {
        !self.subpatches.is_empty()
    }

    /// Corner positions of subpatch `sp`.
    pub fn corner_positions(&self, sp: usize) -> [Point3; 4] {
        self.subpatches[sp].corners.map(|c| self.vertices[c].pos)
    }

    /// Trimming of subpatch `sp`, if any.
    pub fn trimming(&self, sp: usize) -> Option<&Trimming> {
        self.subpatches[sp].trimming.map(|t| &self.trimmings[t])
    }

    /// Reset the scratch output index of every vertex.
    pub fn reset_indices(&mut self) {
        for v in &mut self.vertices {
            v.index = None;
        }
    }

    /// Reverse the emitted winding.
    pub fn flip(&mut self) {
        self.flipped = !self.flipped;
    }

    /// Texture coordinate of a vertex with local parameter `uv`.
    pub fn texture_uv(&self, uv: &Point2) -> Point2 {
        metasurf_math::bilinear(&self.uv[0], &self.uv[1], &self.uv[3], &self.uv[2], uv.x, uv.y)
    }
}
