use std::collections::HashMap;

use metasurf_math::Point3;

/// Side of a grid cell (world units).
const CELL: f64 = 1.0 / 128.0;

/// Uniform spatial hash of emitted vertices.
///
/// A lookup visits every cell within `radius` of the query and hands each
/// candidate closer than `radius` to a caller predicate, so attribute
/// checks stay with the owner of the vertex data.
#[derive(Debug, Clone)]
pub struct VertexGrid {
    radius: f64,
    cell: f64,
    cells: HashMap<[i64; 3], Vec<(Point3, u32)>>,
}

impl VertexGrid {
    /// An empty grid merging points closer than `radius`.
    pub fn new(radius: f64) -> Self {
        Self {
            radius,
            cell: CELL.max(radius),
            cells: HashMap::new(),
        }
    }

    fn key(&self, p: &Point3) -> [i64; 3] {
        [0, 1, 2].map(|i| (p[i] / self.cell).floor() as i64)
    }

    /// First stored index near `p` accepted by `accept`.
    pub fn find(&self, p: &Point3, mut accept: impl FnMut(u32) -> bool) -> Option<u32> {
        let k = self.key(p);
        let r2 = self.radius * self.radius;
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(bucket) = self.cells.get(&[k[0] + dx, k[1] + dy, k[2] + dz]) else {
                        continue;
                    };
                    for &(q, id) in bucket {
                        if (q - p).norm_squared() <= r2 && accept(id) {
                            return Some(id);
                        }
                    }
                }
            }
        }
        None
    }

    /// Record index `id` at `p`.
    pub fn insert(&mut self, p: Point3, id: u32) {
        let k = self.key(&p);
        self.cells.entry(k).or_default().push((p, id));
    }

    /// Number of stored points.
    pub fn len(&self) -> usize {
        self.cells.values().map(Vec::len).sum()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_neighbors_across_cell_borders() {
        let mut g = VertexGrid::new(1e-3);
        g.insert(Point3::new(CELL - 1e-4, 0.0, 0.0), 7);
        assert_eq!(g.find(&Point3::new(CELL + 1e-4, 0.0, 0.0), |_| true), Some(7));
        assert_eq!(g.find(&Point3::new(CELL + 1e-2, 0.0, 0.0), |_| true), None);
        assert_eq!(g.len(), 1);
    }

    #[test]
    fn predicate_can_reject_candidates() {
        let mut g = VertexGrid::new(1e-3);
        let p = Point3::new(0.5, 0.5, 0.5);
        g.insert(p, 1);
        g.insert(p, 2);
        assert_eq!(g.find(&p, |id| id == 2), Some(2));
        assert_eq!(g.find(&p, |_| false), None);
    }
}
