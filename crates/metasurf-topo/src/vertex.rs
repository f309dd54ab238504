use metasurf_math::{Point2, Point3, Vec3};

use crate::VertexId;

/// Flag bit of a vertex created inside a subpatch face by trimming.
pub const FACE_VERTEX: u8 = 0x10;

/// A node of a patch's vertex grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    /// World-space position.
    pub pos: Point3,
    /// Patch-local parameter in `[0,1]²`.
    pub uv: Point2,
    /// Unit normal.
    pub normal: Vec3,
    /// Grid links: `0 = -v`, `1 = +u`, `2 = +v`, `3 = -u`.
    pub next: [Option<VertexId>; 4],
    /// Bit `i` set when the vertex lies on patch edge `i`;
    /// [`FACE_VERTEX`] for trimming face vertices.
    pub flags: u8,
    /// Output index, only meaningful during one triangulation pass.
    pub index: Option<u32>,
}

impl Vertex {
    /// An unlinked vertex.
    pub fn new(pos: Point3, normal: Vec3, uv: Point2) -> Self {
        Self {
            pos,
            uv,
            normal,
            next: [None; 4],
            flags: 0,
            index: None,
        }
    }

    /// Whether the vertex was created inside a face by trimming.
    pub fn is_face_vertex(&self) -> bool {
        self.flags & FACE_VERTEX != 0
    }

    /// Whether the vertex lies on patch edge `edge`.
    pub fn on_edge(&self, edge: usize) -> bool {
        self.flags & (1 << edge) != 0
    }
}
