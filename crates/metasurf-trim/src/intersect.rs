//! Intersection of two subpatches.
//!
//! Each subpatch is approximated by the two triangles of its trimming
//! pattern. Every triangle of one is intersected with every triangle of the
//! other: corners, edges and interiors are tested against each other in a
//! fixed order, the first two features found on each side are turned into
//! grid or trimming vertices, and the segment between them becomes a
//! trimming edge. Triangle edges 0 and 1 lie on subpatch sides; edge 2 is
//! the quad diagonal and only ever produces trimming vertices.

use metasurf_math::{
    closest_pt_segment, closest_pt_segment_segment, closest_pt_triangle, Point2, Point3, Tolerance, Vec3,
};
use metasurf_topo::{Patch, VertexId};

/// Triangle edges touching each triangle corner, bit `k` being edge `k`.
const CORNER_MASK: [u8; 3] = [0x5, 0x3, 0x6];
/// Feature strictly inside the triangle.
const FACE_MASK: u8 = 0x8;

/// One approximating triangle of a subpatch.
struct Side<'a> {
    patch: &'a mut Patch,
    sp: usize,
    trim: usize,
    /// Subpatch corner slot of each triangle corner.
    slots: [usize; 3],
    ids: [VertexId; 3],
    pos: [Point3; 3],
    normal: [Vec3; 3],
    uv: [Point2; 3],
    /// Signed distances of the corners to the other triangle's plane.
    dist: [f64; 3],
    corner_hit: [bool; 3],
    edge_hit: [bool; 3],
    /// Feature vertices with their edge masks.
    found: Vec<(VertexId, u8)>,
}

impl<'a> Side<'a> {
    fn new(patch: &'a mut Patch, sp: usize, trim: usize, slots: [usize; 3], dist: &[f64; 4]) -> Self {
        let ids = slots.map(|s| patch.subpatches[sp].corners[s]);
        Self {
            pos: ids.map(|v| patch.vertices[v].pos),
            normal: ids.map(|v| patch.vertices[v].normal),
            uv: ids.map(|v| patch.vertices[v].uv),
            dist: slots.map(|s| dist[s]),
            patch,
            sp,
            trim,
            slots,
            ids,
            corner_hit: [false; 3],
            edge_hit: [false; 3],
            found: Vec::new(),
        }
    }

    /// Whether the other triangle's plane cuts this triangle.
    fn straddles(&self) -> bool {
        let [d0, d1, d2] = self.dist;
        let one_side = d0 * d1 > 0.0 && d0 * d2 > 0.0;
        let coplanar = d0 == 0.0 && d1 == 0.0 && d2 == 0.0;
        !(one_side || coplanar)
    }

    fn edge(&self, k: usize) -> (&Point3, &Point3) {
        (&self.pos[k], &self.pos[(k + 1) % 3])
    }

    fn triangle(&self) -> (&Point3, &Point3, &Point3) {
        (&self.pos[0], &self.pos[1], &self.pos[2])
    }

    /// Where edge `k` crosses the other triangle's plane.
    fn plane_crossing(&self, k: usize) -> (Point3, f64) {
        let (d0, d1) = (self.dist[k], self.dist[(k + 1) % 3]);
        let t = d0 / (d0 - d1);
        let (a, b) = self.edge(k);
        (a + (b - a) * t, t)
    }

    /// Vertex at `pos`, parameter `t` along triangle edge `k`.
    fn on_edge(&mut self, k: usize, pos: &Point3, t: f64, tol: &Tolerance) -> VertexId {
        if k < 2 {
            return self.patch.insert_edge_vertex(self.sp, self.slots[k], pos, t, tol);
        }
        let n = self.normal[2].lerp(&self.normal[0], t);
        let n = n.try_normalize(1e-12).unwrap_or(self.normal[2]);
        let uv = self.uv[2] + (self.uv[0] - self.uv[2]) * t;
        self.patch.insert_face_vertex(self.trim, pos, &n, &uv, tol)
    }

    /// Trimming vertex at `pos` with barycentric coordinates `bary`.
    fn in_face(&mut self, pos: &Point3, bary: &Vec3, tol: &Tolerance) -> VertexId {
        let n = self.normal[0] * bary.x + self.normal[1] * bary.y + self.normal[2] * bary.z;
        let n = n.try_normalize(1e-12).unwrap_or(self.normal[0]);
        let uv = Point2::from(self.uv[0].coords * bary.x + self.uv[1].coords * bary.y + self.uv[2].coords * bary.z);
        self.patch.insert_face_vertex(self.trim, pos, &n, &uv, tol)
    }

    fn push(&mut self, v: VertexId, mask: u8) {
        self.found.push((v, mask));
    }

    /// Whether `pt` is clear of every corner already used as a feature.
    fn clear_of_corners(&self, pt: &Point3, corners: [usize; 2], feature2: f64) -> bool {
        corners
            .iter()
            .all(|&c| !self.corner_hit[c] || (pt - self.pos[c]).norm_squared() > feature2)
    }
}

/// Cut subpatch `spa` of `pa` against subpatch `spb` of `pb`.
///
/// Intersection features are inserted into both grids and trimmings; the
/// loops of both trimmings are invalidated when edges are added.
pub fn trim_subpatches(pa: &mut Patch, spa: usize, pb: &mut Patch, spb: usize, tol: &Tolerance) {
    if pa.subpatches[spa].hidden || pb.subpatches[spb].hidden {
        return;
    }
    let ta = pa.trimming_of(spa);
    let tb = pb.trimming_of(spb);

    let e2 = tol.error2();
    let snap = |d: f64| if d * d < e2 { 0.0 } else { d };
    let ca = pa.corner_positions(spa);
    let cb = pb.corner_positions(spb);
    // da[j]: A's corners against B's plane j, db[i]: B's corners against A's plane i.
    let da = pb.trimmings[tb].planes.map(|pl| ca.map(|c| snap(pl.evaluate(&c))));
    let db = pa.trimmings[ta].planes.map(|pl| cb.map(|c| snap(pl.evaluate(&c))));
    let tris_a = pa.trimmings[ta].triangles();
    let tris_b = pb.trimmings[tb].triangles();

    for (i, tri_a) in tris_a.into_iter().enumerate() {
        for (j, tri_b) in tris_b.into_iter().enumerate() {
            let mut a = Side::new(pa, spa, ta, tri_a, &da[j]);
            let mut b = Side::new(pb, spb, tb, tri_b, &db[i]);
            intersect_triangles(&mut a, &mut b, tol);
        }
    }
}

fn intersect_triangles(a: &mut Side, b: &mut Side, tol: &Tolerance) {
    if !a.straddles() || !b.straddles() {
        return;
    }
    corners_on_plane(a, b, tol);
    edges_of_first(a, b, tol);
    edges_crossing_face(b, a, tol);

    if a.found.len() > 2 {
        log::debug!("triangle pair produced {} features, using the first two", a.found.len());
    }
    if a.found.len() >= 2 && b.found.len() >= 2 {
        connect_features(a, b, tol);
    }
}

/// Corners of either triangle lying on the other triangle's plane.
fn corners_on_plane(a: &mut Side, b: &mut Side, tol: &Tolerance) {
    for i in 0..3 {
        if a.dist[i] != 0.0 {
            continue;
        }
        let p = a.pos[i];
        let twin = (0..3).find(|&j| b.dist[j] == 0.0 && (p - b.pos[j]).norm_squared() < tol.vertex2());
        if let Some(j) = twin {
            a.push(a.ids[i], CORNER_MASK[i]);
            b.push(b.ids[j], CORNER_MASK[j]);
            a.corner_hit[i] = true;
            b.corner_hit[j] = true;
        } else if corner_against(a, i, b, tol) {
            a.corner_hit[i] = true;
        }
    }

    for j in 0..3 {
        if b.dist[j] == 0.0 && !b.corner_hit[j] && corner_against(b, j, a, tol) {
            b.corner_hit[j] = true;
        }
    }
}

/// Corner `i` of `s` against the edges, then the interior, of `o`.
fn corner_against(s: &mut Side, i: usize, o: &mut Side, tol: &Tolerance) -> bool {
    let p = s.pos[i];
    for k in 0..3 {
        let (v0, v1) = o.edge(k);
        if let Some((q, t)) = closest_pt_segment(&p, v0, v1, tol.edge2()) {
            s.push(s.ids[i], CORNER_MASK[i]);
            let v = o.on_edge(k, &q, t, tol);
            o.push(v, 1 << k);
            o.edge_hit[k] = true;
            return true;
        }
    }

    let (v0, v1, v2) = o.triangle();
    if let Some((q, bary)) = closest_pt_triangle(&p, v0, v1, v2) {
        s.push(s.ids[i], CORNER_MASK[i]);
        let v = o.in_face(&q, &bary, tol);
        o.push(v, FACE_MASK);
        return true;
    }
    false
}

/// Edges of `a` against the edges, then the interior, of `b`.
fn edges_of_first(a: &mut Side, b: &mut Side, tol: &Tolerance) {
    for k in 0..3 {
        let (k0, k1) = (k, (k + 1) % 3);
        let prod = a.dist[k0] * a.dist[k1];
        if prod < 0.0 && !a.edge_hit[k] {
            let (v0, v1) = (a.pos[k0], a.pos[k1]);
            let hit = (0..3).find_map(|m| {
                let (w0, w1) = b.edge(m);
                closest_pt_segment_segment(&v0, &v1, w0, w1, tol.error2()).map(|r| (m, r))
            });
            match hit {
                Some((m, (p0, s, p1, t))) => {
                    if b.clear_of_corners(&p1, [m, (m + 1) % 3], tol.feature2()) {
                        edge_edge(a, k, &p0, s, b, m, &p1, t, tol);
                    }
                }
                None => {
                    let (p0, t) = a.plane_crossing(k);
                    let (w0, w1, w2) = b.triangle();
                    if let Some((p1, bary)) = closest_pt_triangle(&p0, w0, w1, w2) {
                        let va = a.on_edge(k, &p0, t, tol);
                        a.push(va, 1 << k);
                        let vb = b.in_face(&p1, &bary, tol);
                        b.push(vb, FACE_MASK);
                        a.edge_hit[k] = true;
                    }
                }
            }
        } else if prod == 0.0 {
            // One end on the plane: every touching edge of `b` counts.
            let (v0, v1) = (a.pos[k0], a.pos[k1]);
            for m in 0..3 {
                let (w0, w1) = (b.pos[m], b.pos[(m + 1) % 3]);
                if let Some((p0, s, p1, t)) = closest_pt_segment_segment(&v0, &v1, &w0, &w1, tol.error2()) {
                    if a.clear_of_corners(&p1, [k0, k1], tol.feature2()) {
                        edge_edge(a, k, &p0, s, b, m, &p1, t, tol);
                    }
                }
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn edge_edge(a: &mut Side, k: usize, p0: &Point3, s: f64, b: &mut Side, m: usize, p1: &Point3, t: f64, tol: &Tolerance) {
    let va = a.on_edge(k, p0, s, tol);
    a.push(va, 1 << k);
    let vb = b.on_edge(m, p1, t, tol);
    b.push(vb, 1 << m);
    a.edge_hit[k] = true;
    b.edge_hit[m] = true;
}

/// Edges of `s` crossing the interior of `o`.
fn edges_crossing_face(s: &mut Side, o: &mut Side, tol: &Tolerance) {
    for k in 0..3 {
        if s.dist[k] * s.dist[(k + 1) % 3] >= 0.0 || s.edge_hit[k] {
            continue;
        }
        let (p0, t) = s.plane_crossing(k);
        let (w0, w1, w2) = o.triangle();
        if let Some((p1, bary)) = closest_pt_triangle(&p0, w0, w1, w2) {
            let vs = s.on_edge(k, &p0, t, tol);
            s.push(vs, 1 << k);
            let vo = o.in_face(&p1, &bary, tol);
            o.push(vo, FACE_MASK);
            s.edge_hit[k] = true;
        }
    }
}

/// Shared subpatch side of two features, as a triangle edge index.
fn shared_side(m0: u8, m1: u8) -> Option<usize> {
    match m0 & m1 {
        1 => Some(0),
        2 => Some(1),
        _ => None,
    }
}

/// Turn the first two features on each side into trimming edges.
fn connect_features(a: &mut Side, b: &mut Side, tol: &Tolerance) {
    let (a0, am0) = a.found[0];
    let (a1, am1) = a.found[1];
    let (b0, bm0) = b.found[0];
    let (b1, bm1) = b.found[1];

    match (shared_side(am0, am1), shared_side(bm0, bm1)) {
        (None, None) => {
            a.patch.add_edge(a.trim, a0, a1);
            b.patch.add_edge(b.trim, b0, b1);
        }
        (None, Some(kb)) => trace_side_through_face(b, kb, (b0, b1), a, (a0, a1), tol),
        (Some(ka), None) => trace_side_through_face(a, ka, (a0, a1), b, (b0, b1), tol),
        (Some(ka), Some(kb)) => {
            if a0 == a1 || b0 == b1 {
                return;
            }
            let between_b = walk_side(b, kb, b0, b1);
            for cb in between_b {
                let p = b.patch.vertices[cb].pos;
                let (v0, v1) = a.edge(ka);
                if let Some((q, t)) = closest_pt_segment(&p, v0, v1, tol.error2()) {
                    a.on_edge(ka, &q, t, tol);
                }
            }
            let between_a = walk_side(a, ka, a0, a1);
            for ca in between_a {
                let p = a.patch.vertices[ca].pos;
                let (v0, v1) = b.edge(kb);
                if let Some((q, t)) = closest_pt_segment(&p, v0, v1, tol.error2()) {
                    b.on_edge(kb, &q, t, tol);
                }
            }
        }
    }
}

/// The cut runs along side `k` of `s` and across the face of `o`: the
/// side needs no edge, while `o` gets a polyline through every grid vertex
/// of the side that projects into it.
fn trace_side_through_face(
    s: &mut Side,
    k: usize,
    (s0, s1): (VertexId, VertexId),
    o: &mut Side,
    (o0, o1): (VertexId, VertexId),
    tol: &Tolerance,
) {
    if s0 == s1 {
        return;
    }
    let mut current = o0;
    for cs in walk_side(s, k, s0, s1) {
        let p = s.patch.vertices[cs].pos;
        let (w0, w1, w2) = o.triangle();
        if let Some((q, bary)) = closest_pt_triangle(&p, w0, w1, w2) {
            let next = o.in_face(&q, &bary, tol);
            o.patch.add_edge(o.trim, current, next);
            current = next;
        }
    }
    o.patch.add_edge(o.trim, current, o1);
}

/// Grid vertices strictly between `from` and `to` on triangle edge `k`.
fn walk_side(s: &Side, k: usize, from: VertexId, to: VertexId) -> Vec<VertexId> {
    let axis = s.slots[k] & 1;
    let vertices = &s.patch.vertices;
    let dir = if vertices[from].uv[axis] < vertices[to].uv[axis] {
        axis + 1
    } else {
        (axis + 3) % 4
    };

    let mut out = Vec::new();
    let mut v = vertices[from].next[dir];
    while let Some(id) = v {
        if id == to {
            return out;
        }
        if out.len() > vertices.len() {
            break;
        }
        out.push(id);
        v = vertices[id].next[dir];
    }
    log::warn!("side walk from {from} never reached {to}");
    out
}
