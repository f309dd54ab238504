//! Cost-driven ear clipping of simple polygons.

use crate::{point_in_triangle, tri_area, Point2};

/// One clipped triangle, as indices into the polygon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ear {
    /// `[prev, tip, next]` in polygon order.
    pub corners: [usize; 3],
    /// Quality cost; lower is better, infinite for a non-ear.
    pub cost: f64,
}

/// Ear clipping over a counter-clockwise polygon.
///
/// Yields `n - 2` triangles, always clipping the cheapest ear next to the
/// previous one. A polygon may visit the same vertex more than once (loops
/// bridged to their holes); `keys` identifies such repeats so they never
/// block an ear they belong to.
pub struct EarClipper<'a> {
    pts: &'a [Point2],
    keys: &'a [usize],
    prev: Vec<usize>,
    next: Vec<usize>,
    cost: Vec<f64>,
    remaining: usize,
    cursor: usize,
}

impl<'a> EarClipper<'a> {
    /// Start clipping `pts`; `keys[i]` identifies the vertex at `pts[i]`.
    pub fn new(pts: &'a [Point2], keys: &'a [usize]) -> Self {
        let n = pts.len();
        let mut clipper = Self {
            pts,
            keys,
            prev: (0..n).map(|i| (i + n - 1) % n.max(1)).collect(),
            next: (0..n).map(|i| (i + 1) % n.max(1)).collect(),
            cost: vec![f64::INFINITY; n],
            remaining: n,
            cursor: 0,
        };
        if n > 3 {
            for i in 0..n {
                clipper.cost[i] = clipper.ear_cost(i);
            }
        }
        clipper
    }

    fn ear_cost(&self, i: usize) -> f64 {
        let (pi, ni) = (self.prev[i], self.next[i]);
        let (a, b, c) = (&self.pts[pi], &self.pts[i], &self.pts[ni]);

        let area = tri_area(a, b, c);
        if area >= 0.0 {
            return f64::INFINITY;
        }

        let tri = [self.keys[pi], self.keys[i], self.keys[ni]];
        let mut j = self.next[ni];
        while j != pi {
            if !tri.contains(&self.keys[j]) && point_in_triangle(&self.pts[j], a, b, c) {
                return f64::INFINITY;
            }
            j = self.next[j];
        }

        if area > -1e-7 {
            return -1.0 / area;
        }
        (b - a).dot(&(c - a)).abs() + (c - b).dot(&(a - b)).abs() + (b - c).dot(&(a - c)).abs()
    }
}

impl Iterator for EarClipper<'_> {
    type Item = Ear;

    fn next(&mut self) -> Option<Ear> {
        if self.remaining < 3 {
            return None;
        }
        if self.remaining == 3 {
            self.remaining = 0;
            let i = self.cursor;
            return Some(Ear {
                corners: [self.prev[i], i, self.next[i]],
                cost: self.ear_cost(i),
            });
        }

        let mut best = self.cursor;
        let mut j = self.next[best];
        while j != self.cursor {
            if self.cost[j] < self.cost[best] {
                best = j;
            }
            j = self.next[j];
        }

        let (pi, ni) = (self.prev[best], self.next[best]);
        let ear = Ear {
            corners: [pi, best, ni],
            cost: self.cost[best],
        };
        self.next[pi] = ni;
        self.prev[ni] = pi;
        self.remaining -= 1;
        self.cursor = pi;
        if self.remaining > 3 {
            self.cost[pi] = self.ear_cost(pi);
            self.cost[ni] = self.ear_cost(ni);
        }
        Some(ear)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_gives_two_triangles() {
        let pts = [
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ];
        let keys = [0, 1, 2, 3];
        let ears: Vec<Ear> = EarClipper::new(&pts, &keys).collect();
        assert_eq!(ears.len(), 2);
        let mut used: Vec<usize> = ears.iter().flat_map(|e| e.corners).collect();
        used.sort_unstable();
        used.dedup();
        assert_eq!(used, vec![0, 1, 2, 3]);
    }

    #[test]
    fn reflex_vertex_is_never_an_ear_tip() {
        // Arrow shape with a reflex vertex at index 3.
        let pts = [
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(2.0, 2.0),
            Point2::new(1.0, 0.5),
            Point2::new(0.0, 2.0),
        ];
        let keys = [0, 1, 2, 3, 4];
        let ears: Vec<Ear> = EarClipper::new(&pts, &keys).collect();
        assert_eq!(ears.len(), 3);
        assert!(ears[0].corners[1] != 3, "first clipped tip must be convex");
        let area: f64 = ears
            .iter()
            .map(|e| -tri_area(&pts[e.corners[0]], &pts[e.corners[1]], &pts[e.corners[2]]))
            .sum();
        // Polygon area is 4 - 1.5 = 2.5, doubled by tri_area.
        assert!((area - 5.0).abs() < 1e-9, "area {area}");
    }

    #[test]
    fn degenerate_inputs_yield_nothing() {
        let pts = [Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)];
        assert_eq!(EarClipper::new(&pts, &[0, 1]).count(), 0);
    }
}
