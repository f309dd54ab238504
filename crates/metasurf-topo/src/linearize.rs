use metasurf_math::Point3;

use crate::{Geometry, Patch};

/// Direction pointing into a subpatch from each of its sides.
const INWARD: [usize; 4] = [2, 3, 0, 1];

impl Geometry {
    /// Make the subdivided surface watertight at corners and T-junctions.
    ///
    /// Every patch corner is copied to the matching corner of each patch in
    /// its ring, so patches evaluated independently meet exactly. Then every
    /// vertex hanging on the side of a subpatch (no link into it) is moved
    /// onto the straight side between the subpatch corners.
    pub fn make_bilinear(&mut self) {
        for pid in 0..self.patches.len() {
            if !self.patches[pid].is_subdivided() {
                continue;
            }
            for c in 0..4 {
                let pos = self.patches[pid].vertices[c].pos;
                let mut cp = self.patches[pid].neighbors[c];
                let mut ce = self.patches[pid].neighbor_edges[c] as usize;
                let mut steps = 0;
                while let Some(p) = cp {
                    if p == pid || steps > metasurf_geom::MAX_VALENCE {
                        break;
                    }
                    let patch = &mut self.patches[p];
                    ce = (ce + 1) % 4;
                    if patch.is_subdivided() {
                        patch.vertices[ce].pos = pos;
                    }
                    cp = patch.neighbors[ce];
                    ce = patch.neighbor_edges[ce] as usize;
                    steps += 1;
                }
            }
        }

        for patch in &mut self.patches {
            linearize_hanging(patch);
        }
    }
}

fn linearize_hanging(patch: &mut Patch) {
    for sp in 0..patch.subpatches.len() {
        for edge in 0..4 {
            let (start, end) = patch.subpatches[sp].edge_span(edge);
            let axis = edge & 1;
            let inward = INWARD[edge];
            let (a, b) = (&patch.vertices[start], &patch.vertices[end]);
            let (u0, u1) = (a.uv[axis], b.uv[axis]);
            let (p0, p1): (Point3, Point3) = (a.pos, b.pos);
            if u1 <= u0 {
                continue;
            }

            let mut v = patch.vertices[start].next[axis + 1];
            let mut steps = 0;
            while let Some(id) = v {
                if id == end || steps > patch.vertices.len() {
                    break;
                }
                if patch.vertices[id].next[inward].is_none() {
                    let t = (patch.vertices[id].uv[axis] - u0) / (u1 - u0);
                    patch.vertices[id].pos = Point3::from(p0.coords.lerp(&p1.coords, t));
                }
                v = patch.vertices[id].next[axis + 1];
                steps += 1;
            }
        }
    }
}
