//! Loop tracing for trimmed subpatches.
//!
//! The subpatch boundary (one half-edge per side segment, counter-clockwise)
//! and the split trimming edges (two opposite half-edges each) form a
//! planar graph. Components not touching the boundary are bridged to it,
//! then every half-edge is walked once, always taking the sharpest left
//! turn, which yields the faces of the graph as counter-clockwise loops.

use std::collections::HashMap;

use metasurf_math::{ccw, lexicographic_lt, project, Point2, Tolerance, Vec2};
use metasurf_topo::{Loop, Patch, VertexId};

use crate::crossings::split_edges;
use crate::point::{loop_point, point_in_loop};

#[derive(Debug, Clone, Copy)]
struct HalfEdge {
    from: usize,
    to: usize,
    component: usize,
    used: bool,
}

struct LoopGraph {
    vertices: Vec<VertexId>,
    pts: Vec<Point2>,
    local: HashMap<VertexId, usize>,
    edges: Vec<HalfEdge>,
    /// Outgoing half-edges of each vertex.
    star: Vec<Vec<usize>>,
}

impl LoopGraph {
    fn new() -> Self {
        Self {
            vertices: Vec::new(),
            pts: Vec::new(),
            local: HashMap::new(),
            edges: Vec::new(),
            star: Vec::new(),
        }
    }

    fn add_vertex(&mut self, v: VertexId, p: Point2) -> usize {
        if let Some(&i) = self.local.get(&v) {
            return i;
        }
        let i = self.vertices.len();
        self.vertices.push(v);
        self.pts.push(p);
        self.star.push(Vec::new());
        self.local.insert(v, i);
        i
    }

    fn add_half_edge(&mut self, from: usize, to: usize, component: usize) {
        self.star[from].push(self.edges.len());
        self.edges.push(HalfEdge {
            from,
            to,
            component,
            used: false,
        });
    }

    fn add_twin(&mut self, a: usize, b: usize, component: usize) {
        self.add_half_edge(a, b, component);
        self.add_half_edge(b, a, component);
    }

    /// Tag every half-edge reachable from `start`; returns the
    /// lexicographically smallest vertex met.
    fn tag(&mut self, start: usize, component: usize) -> usize {
        let mut min = self.edges[start].from;
        let mut stack = vec![start];
        while let Some(e) = stack.pop() {
            if self.edges[e].component != 0 {
                continue;
            }
            self.edges[e].component = component;
            let to = self.edges[e].to;
            if lexicographic_lt(&self.pts[to], &self.pts[min]) {
                min = to;
            }
            stack.extend(self.star[to].iter().copied().filter(|&n| self.edges[n].component == 0));
        }
        min
    }

    /// Connect every component that does not contain the boundary to a
    /// vertex on its left, so it gets traced as a hole of the face around
    /// it.
    fn bridge_components(&mut self) {
        let mut mins = Vec::new();
        for e in 0..self.edges.len() {
            if self.edges[e].component == 0 {
                let min = self.tag(e, mins.len() + 1);
                mins.push(min);
            }
        }

        for (g, &m) in mins.iter().enumerate().skip(1) {
            let pm = self.pts[m];
            let mut candidates: Vec<usize> = (0..self.pts.len())
                .filter(|&v| self.pts[v].x < pm.x && !self.star[v].is_empty())
                .collect();
            candidates.sort_by(|&a, &b| {
                let da = (self.pts[a] - pm).norm_squared();
                let db = (self.pts[b] - pm).norm_squared();
                da.total_cmp(&db)
            });
            match candidates.into_iter().find(|&c| self.bridge_is_clear(c, m)) {
                Some(c) => self.add_twin(m, c, g + 1),
                None => log::warn!("trimming component {} could not be bridged", g + 1),
            }
        }
    }

    /// Whether segment `c m` crosses no edge of the graph.
    fn bridge_is_clear(&self, c: usize, m: usize) -> bool {
        let (v0, v1) = (self.pts[c], self.pts[m]);
        self.edges.iter().all(|e| {
            if e.from == c || e.to == c || e.from == m || e.to == m {
                return true;
            }
            let (mut v2, mut v3) = (self.pts[e.from], self.pts[e.to]);
            if v2.x > v3.x {
                std::mem::swap(&mut v2, &mut v3);
            }
            if v2.x >= v1.x || v3.x <= v0.x {
                return true;
            }

            let d0 = v1 - v0;
            let d1 = v3 - v2;
            let d2 = v0 - v2;
            let den = d1.y * d0.x - d1.x * d0.y;
            let num0 = d1.x * d2.y - d1.y * d2.x;
            let num1 = d0.x * d2.y - d0.y * d2.x;
            if den.abs() < 1e-12 {
                return !(num0.abs() < 1e-12 && num1.abs() < 1e-12);
            }
            let (t0, t1) = (num0 / den, num1 / den);
            !((0.0..=1.0).contains(&t0) && (0.0..=1.0).contains(&t1))
        })
    }

    /// Half-edge leaving the end of `e` with the sharpest left turn, or
    /// `None` once that one has been walked.
    fn next_edge(&self, e: usize) -> Option<usize> {
        let HalfEdge { from: v0, to: v1, .. } = self.edges[e];
        let (p0, p1) = (self.pts[v0], self.pts[v1]);
        let d0 = (p0 - p1).try_normalize(0.0).unwrap_or_else(Vec2::zeros);

        let mut best = None;
        let mut best_angle = f64::INFINITY;
        for &c in &self.star[v1] {
            let v2 = self.edges[c].to;
            let angle = if v2 == v0 {
                2.0
            } else {
                let p2 = self.pts[v2];
                let a = d0.dot(&(p2 - p1).try_normalize(0.0).unwrap_or_else(Vec2::zeros));
                if ccw(&p0, &p1, &p2) {
                    -2.0 - a
                } else {
                    a
                }
            };
            if angle < best_angle {
                best_angle = angle;
                best = Some(c);
            }
        }
        best.filter(|&c| !self.edges[c].used)
    }

    fn trace(&mut self) -> Vec<Vec<VertexId>> {
        let mut loops = Vec::new();
        for start in 0..self.edges.len() {
            if self.edges[start].used {
                continue;
            }
            self.edges[start].used = true;
            let mut vertices = vec![self.vertices[self.edges[start].from]];
            let mut e = start;
            while let Some(n) = self.next_edge(e) {
                self.edges[n].used = true;
                vertices.push(self.vertices[self.edges[n].from]);
                e = n;
            }
            loops.push(vertices);
        }
        loops
    }
}

/// Rebuild the loops of subpatch `sp` if its trimming changed.
///
/// New loops inherit the visibility of the old loop containing them, so
/// regions already classified stay removed when a later operation adds
/// edges.
pub fn compute_loops(patch: &mut Patch, sp: usize, tol: &Tolerance) {
    let Some(trim) = patch.subpatches[sp].trimming else {
        return;
    };
    if !patch.trimmings[trim].is_invalid() {
        return;
    }

    let segments = split_edges(patch, trim, tol);
    let t = &patch.trimmings[trim];
    let (x, y) = (t.x(), t.y());
    let at = |v: VertexId| project(&patch.vertices[v].pos, x, y);

    let mut graph = LoopGraph::new();
    let (boundary, _) = patch.boundary(&patch.subpatches[sp]);
    let ring: Vec<usize> = boundary.iter().map(|&v| graph.add_vertex(v, at(v))).collect();
    for (i, &a) in ring.iter().enumerate() {
        graph.add_half_edge(a, ring[(i + 1) % ring.len()], 0);
    }
    for &v in &t.vertices {
        graph.add_vertex(v, at(v));
    }
    for (a, b) in segments {
        match (graph.local.get(&a), graph.local.get(&b)) {
            (Some(&la), Some(&lb)) => graph.add_twin(la, lb, 0),
            _ => log::warn!("trimming edge ({a}, {b}) leaves subpatch {sp}"),
        }
    }
    graph.bridge_components();

    let loops: Vec<Loop> = graph
        .trace()
        .into_iter()
        .map(|vertices| {
            let (pos, _) = loop_point(patch, &vertices, x, y);
            let mut l = Loop::new(vertices);
            for old in &t.loops {
                if point_in_loop(patch, &old.vertices, x, y, &pos) {
                    l.hidden = old.hidden;
                }
            }
            l
        })
        .collect();
    log::trace!("subpatch {sp}: {} loops", loops.len());

    let t = &mut patch.trimmings[trim];
    t.loops = loops;
    t.validate();
}

/// Rebuild the stale loops of every trimmed subpatch of `patch`.
pub fn update_loops(patch: &mut Patch, tol: &Tolerance) {
    if !patch.trimmed {
        return;
    }
    for sp in 0..patch.subpatches.len() {
        compute_loops(patch, sp, tol);
    }
}
