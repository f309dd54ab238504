//! Edits of a patch's vertex grid.
//!
//! Vertices on a grid line are chained through `next`; walking a subpatch
//! edge means following `next[axis + 1]` from the corner with the smaller
//! parameter. Vertices are found by parameter (subdivision) or by position
//! (trimming), and new ones are spliced into the chain.

use metasurf_math::{lexicographic_lt, Point2, Point3, Tolerance, Vec3};

use crate::{Patch, Subpatch, Trimming, Vertex, VertexId, FACE_VERTEX};

impl Patch {
    /// Create the four corner vertices and the root subpatch.
    pub fn init_grid(&mut self, pos: [Point3; 4], normals: [Vec3; 4]) {
        let uv = crate::patch::unit_uv();
        // Links and patch-edge flags per corner.
        let links: [[Option<VertexId>; 4]; 4] = [
            [None, Some(1), Some(3), None],
            [None, None, Some(2), Some(0)],
            [Some(1), None, None, Some(3)],
            [Some(0), Some(2), None, None],
        ];
        let flags = [0b1001, 0b0011, 0b0110, 0b1100];

        self.vertices.clear();
        self.subpatches.clear();
        self.trimmings.clear();
        for c in 0..4 {
            let mut v = Vertex::new(pos[c], normals[c], uv[c]);
            v.next = links[c];
            v.flags = flags[c];
            self.vertices.push(v);
        }
        self.subpatches.push(Subpatch::new([0, 1, 2, 3]));
    }

    /// Walk from `start` toward `end` along `axis` and return the last
    /// vertex whose parameter does not exceed `val`.
    pub fn prev_vertex(&self, start: VertexId, end: VertexId, axis: usize, val: f64) -> VertexId {
        let mut vs = start;
        let mut steps = self.vertices.len();
        while self.vertices[vs].uv[axis] <= val && vs != end {
            match self.vertices[vs].next[axis + 1] {
                Some(n) if steps > 0 => vs = n,
                _ => {
                    log::warn!("grid walk from {start} fell off the edge at {vs}");
                    return vs;
                }
            }
            steps -= 1;
        }
        self.vertices[vs].next[(axis + 3) % 4].unwrap_or(vs)
    }

    /// Splice a new vertex after `pv` in direction `dir`.
    pub(crate) fn insert_after(&mut self, pv: VertexId, dir: usize, pos: Point3, n: Vec3, uv: Point2) -> VertexId {
        let id = self.vertices.len();
        let idir = (dir + 2) % 4;
        let nv = self.vertices[pv].next[dir];

        let mut v = Vertex::new(pos, n, uv);
        v.flags = match nv {
            Some(nv) => self.vertices[pv].flags & self.vertices[nv].flags,
            None => 0,
        };
        v.next[idir] = Some(pv);
        v.next[dir] = nv;
        self.vertices.push(v);

        self.vertices[pv].next[dir] = Some(id);
        if let Some(nv) = nv {
            self.vertices[nv].next[idir] = Some(id);
        }
        id
    }

    /// Vertex at parameter `uv` on edge `edge` of subpatch `sp`, reusing
    /// one already inserted by a neighboring subpatch.
    pub fn subdivide_edge(&mut self, sp: usize, edge: usize, pos: Point3, n: Vec3, uv: Point2) -> VertexId {
        let axis = edge & 1;
        let (start, end) = self.subpatches[sp].edge_span(edge);
        let eps = Tolerance::UV_EPSILON;
        let pv = self.prev_vertex(start, end, axis, uv[axis] + eps);
        if (self.vertices[pv].uv[axis] - uv[axis]).abs() <= eps {
            return pv;
        }
        self.insert_after(pv, axis + 1, pos, n, uv)
    }

    /// Vertex at `pos` on edge `edge` of subpatch `sp`, `t` being the
    /// parameter along the edge from corner `edge` to corner `edge + 1`.
    /// A vertex already within tolerance is reused.
    pub fn insert_edge_vertex(&mut self, sp: usize, edge: usize, pos: &Point3, t: f64, tol: &Tolerance) -> VertexId {
        let axis = edge & 1;
        let corners = self.subpatches[sp].corners;
        let c0 = &self.vertices[corners[edge]];
        let c1 = &self.vertices[corners[(edge + 1) % 4]];

        let uv = c0.uv + (c1.uv - c0.uv) * t;
        let n = c0.normal.lerp(&c1.normal, t).try_normalize(1e-12).unwrap_or(c0.normal);

        let (start, end) = self.subpatches[sp].edge_span(edge);
        let pv = self.prev_vertex(start, end, axis, uv[axis]);
        if (self.vertices[pv].pos - pos).norm() <= tol.linear {
            return pv;
        }
        if let Some(nx) = self.vertices[pv].next[axis + 1] {
            if (self.vertices[nx].pos - pos).norm() <= tol.linear {
                return nx;
            }
        }
        self.insert_after(pv, axis + 1, *pos, n, uv)
    }

    /// Face vertex of trimming `trim` at `pos`, reusing one within
    /// tolerance.
    pub fn insert_face_vertex(&mut self, trim: usize, pos: &Point3, n: &Vec3, uv: &Point2, tol: &Tolerance) -> VertexId {
        let e2 = tol.error2();
        let found = self.trimmings[trim]
            .vertices
            .iter()
            .copied()
            .find(|&v| (self.vertices[v].pos - pos).norm_squared() < e2);
        if let Some(v) = found {
            return v;
        }

        let id = self.vertices.len();
        let mut v = Vertex::new(*pos, *n, *uv);
        v.flags = FACE_VERTEX;
        self.vertices.push(v);
        self.trimmings[trim].vertices.push(id);
        id
    }

    /// Trimming of subpatch `sp`, created on first use.
    pub fn trimming_of(&mut self, sp: usize) -> usize {
        if let Some(t) = self.subpatches[sp].trimming {
            return t;
        }
        let [a, b, c, d] = self.corner_positions(sp);
        let id = self.trimmings.len();
        self.trimmings.push(Trimming::new([&a, &b, &c, &d]));
        self.subpatches[sp].trimming = Some(id);
        self.trimmed = true;
        id
    }

    /// Add the interior edge `v0 v1` to trimming `trim`.
    pub fn add_edge(&mut self, trim: usize, v0: VertexId, v1: VertexId) {
        if v0 == v1 {
            return;
        }
        let t = &mut self.trimmings[trim];
        let p0 = t.project(&self.vertices[v0].pos);
        let p1 = t.project(&self.vertices[v1].pos);
        let edge = if lexicographic_lt(&p1, &p0) { (v1, v0) } else { (v0, v1) };
        t.edges.insert(edge);
        t.invalidate();
    }

    /// Vertices of side `edge` of subpatch `sp` in counter-clockwise
    /// order, from corner `edge` up to but excluding corner `edge + 1`.
    pub fn side_vertices(&self, sp: &Subpatch, edge: usize) -> Vec<VertexId> {
        let dir = (edge + 1) % 4;
        let end = sp.corners[(edge + 1) % 4];
        let mut out = Vec::new();
        let mut v = sp.corners[edge];
        while v != end {
            out.push(v);
            match self.vertices[v].next[dir] {
                Some(n) if out.len() <= self.vertices.len() => v = n,
                _ => {
                    log::warn!("side {edge} walk fell off the grid at vertex {v}");
                    break;
                }
            }
        }
        out
    }

    /// Counter-clockwise boundary of subpatch `sp`, with the number of
    /// vertices contributed by each side.
    pub fn boundary(&self, sp: &Subpatch) -> (Vec<VertexId>, [usize; 4]) {
        let mut out = Vec::new();
        let mut counts = [0; 4];
        for (e, count) in counts.iter_mut().enumerate() {
            let side = self.side_vertices(sp, e);
            *count = side.len();
            out.extend(side);
        }
        (out, counts)
    }
}
