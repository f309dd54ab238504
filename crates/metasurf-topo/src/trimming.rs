use std::collections::BTreeSet;

use metasurf_math::{project, projection_axes, Plane, Point2, Point3};

use crate::VertexId;

/// A closed cycle of vertices bounding a region of a trimmed subpatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loop {
    /// Vertices in order; the last one connects back to the first.
    pub vertices: Vec<VertexId>,
    /// Set when classification removed the region.
    pub hidden: bool,
}

impl Loop {
    /// A visible loop.
    pub fn new(vertices: Vec<VertexId>) -> Self {
        Self {
            vertices,
            hidden: false,
        }
    }
}

/// How a boolean operation has cut a subpatch.
///
/// The subpatch is approximated by two triangles chosen by `pattern`
/// (`0`: `(0,1,2),(2,3,0)`; `1`: `(3,0,1),(1,2,3)`), whose supporting
/// planes are `planes`. 2D predicates run in the projection onto
/// `axes[0]`, `axes[1]`.
///
/// `edges` is the source of truth; `loops` is derived from it and goes
/// stale whenever an edge is added.
#[derive(Debug, Clone)]
pub struct Trimming {
    /// Projection axes `[x, y, z]`; `z` is dropped.
    pub axes: [usize; 3],
    /// Planes of the two approximating triangles.
    pub planes: [Plane; 2],
    /// Diagonal used to split the quad.
    pub pattern: u8,
    /// Face vertices created by intersections.
    pub vertices: Vec<VertexId>,
    /// Unique interior edges, endpoints in lexicographic 2D order.
    pub edges: BTreeSet<(VertexId, VertexId)>,
    /// Loops built from the boundary and `edges`.
    pub loops: Vec<Loop>,
    dirty: bool,
}

// Each triangle starts so that its third edge is the quad diagonal.
const PATTERNS: [[[usize; 3]; 2]; 2] = [[[0, 1, 2], [2, 3, 0]], [[3, 0, 1], [1, 2, 3]]];

impl Trimming {
    /// A trimming for the quad with corner positions `c`.
    pub fn new(c: [&Point3; 4]) -> Self {
        let mut t = Self {
            axes: [0, 1, 2],
            planes: [Plane::default(), Plane::default()],
            pattern: 0,
            vertices: Vec::new(),
            edges: BTreeSet::new(),
            loops: Vec::new(),
            dirty: false,
        };
        t.reframe(c);
        t
    }

    /// Recompute pattern, planes and projection axes from corner
    /// positions.
    pub fn reframe(&mut self, c: [&Point3; 4]) {
        let ab = c[1] - c[0];
        let ac = c[2] - c[0];
        let ad = c[3] - c[0];
        let n0 = ab.cross(&ac);
        let n1 = ac.cross(&ad);

        if n0.dot(&n1) > 0.0 {
            self.pattern = 0;
            self.planes = [Plane::from_normal(n0, c[0]), Plane::from_normal(n1, c[0])];
        } else {
            self.pattern = 1;
            self.planes = [
                Plane::from_normal(ab.cross(&ad), c[0]),
                Plane::from_points(c[1], c[2], c[3]),
            ];
        }

        let [p0, p1] = &self.planes;
        let m0 = p0.normal.amax();
        let m1 = p1.normal.amax();
        self.axes = if m0 > m1 {
            projection_axes(&p0.normal)
        } else {
            projection_axes(&p1.normal)
        };
    }

    /// Corner indices of the two approximating triangles.
    pub fn triangles(&self) -> [[usize; 3]; 2] {
        PATTERNS[(self.pattern & 1) as usize]
    }

    /// First projection axis.
    pub fn x(&self) -> usize {
        self.axes[0]
    }

    /// Second projection axis.
    pub fn y(&self) -> usize {
        self.axes[1]
    }

    /// Project `p` onto the trimming plane axes.
    pub fn project(&self, p: &Point3) -> Point2 {
        project(p, self.axes[0], self.axes[1])
    }

    /// Mark the loops stale.
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    /// Whether the loops must be rebuilt.
    pub fn is_invalid(&self) -> bool {
        self.dirty
    }

    /// Mark the loops as matching the edges.
    pub fn validate(&mut self) {
        self.dirty = false;
    }

    /// Drop the loops when every one of them is visible; the subpatch then
    /// renders as an untrimmed quad.
    pub fn clean(&mut self) {
        if !self.loops.is_empty() && self.loops.iter().all(|l| !l.hidden) {
            self.loops.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_square_uses_first_pattern() {
        let c = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let t = Trimming::new([&c[0], &c[1], &c[2], &c[3]]);
        assert_eq!(t.pattern, 0);
        assert_eq!(t.axes, [0, 1, 2]);
        assert!((t.planes[0].normal.z - 1.0).abs() < 1e-12);
    }

    #[test]
    fn folded_quad_switches_diagonal() {
        // Folded along the 0-2 diagonal so the two halves face apart.
        let c = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, -1.0),
        ];
        let t = Trimming::new([&c[0], &c[1], &c[2], &c[3]]);
        assert_eq!(t.pattern, 1, "fold along 0-2 must split along 1-3");
        assert_eq!(t.triangles(), [[3, 0, 1], [1, 2, 3]]);
    }

    #[test]
    fn clean_drops_all_visible_loops() {
        let c = [Point3::origin(); 4];
        let mut t = Trimming::new([&c[0], &c[1], &c[2], &c[3]]);
        t.loops = vec![Loop::new(vec![0, 1, 2]), Loop::new(vec![2, 3, 0])];
        t.clean();
        assert!(t.loops.is_empty());

        t.loops = vec![Loop::new(vec![0, 1, 2]), Loop::new(vec![2, 3, 0])];
        t.loops[1].hidden = true;
        t.clean();
        assert_eq!(t.loops.len(), 2, "mixed visibility keeps loops");
    }
}
