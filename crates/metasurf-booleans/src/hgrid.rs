//! Hierarchical uniform grid over object boxes.
//!
//! Level `l` has cells of side `BASE_CELL * 2^l`. An object lives on the
//! lowest level whose cells are at least as large as its box, so it
//! touches at most eight cells there. Queries visit every populated
//! level.

use std::collections::HashMap;

use crate::bbox::Aabb3;

const BASE_CELL: f64 = 1.0 / 128.0;
const MAX_LEVEL: usize = 40;

type Cell = [i64; 3];

/// Broad-phase grid of `(id, box)` entries.
#[derive(Debug, Clone, Default)]
pub struct HGrid {
    entries: Vec<(usize, Aabb3)>,
    levels: Vec<HashMap<Cell, Vec<usize>>>,
}

fn cell_size(level: usize) -> f64 {
    BASE_CELL * (1u64 << level) as f64
}

fn cell_range(b: &Aabb3, size: f64) -> (Cell, Cell) {
    let lo = [0, 1, 2].map(|i| (b.min[i] / size).floor() as i64);
    let hi = [0, 1, 2].map(|i| (b.max[i] / size).floor() as i64);
    (lo, hi)
}

impl HGrid {
    /// An empty grid.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the grid holds nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add object `id` with box `aabb`.
    pub fn insert(&mut self, id: usize, aabb: Aabb3) {
        if aabb.is_empty() {
            return;
        }
        let mut level = 0;
        while level < MAX_LEVEL && cell_size(level) < aabb.extent() {
            level += 1;
        }
        if self.levels.len() <= level {
            self.levels.resize_with(level + 1, HashMap::new);
        }

        let entry = self.entries.len();
        self.entries.push((id, aabb));
        let (lo, hi) = cell_range(&aabb, cell_size(level));
        for x in lo[0]..=hi[0] {
            for y in lo[1]..=hi[1] {
                for z in lo[2]..=hi[2] {
                    self.levels[level].entry([x, y, z]).or_default().push(entry);
                }
            }
        }
    }

    /// IDs of every object whose box overlaps `region`, each once.
    pub fn query(&self, region: &Aabb3) -> Vec<usize> {
        let mut found = Vec::new();
        for (level, cells) in self.levels.iter().enumerate() {
            if cells.is_empty() {
                continue;
            }
            let (lo, hi) = cell_range(region, cell_size(level));
            let span = (0..3)
                .map(|i| (hi[i] as i128 - lo[i] as i128 + 1) as f64)
                .product::<f64>();
            if span > cells.len() as f64 {
                // Long query: scan populated cells instead.
                let inside = |c: &Cell| (0..3).all(|i| lo[i] <= c[i] && c[i] <= hi[i]);
                for (_, bucket) in cells.iter().filter(|(c, _)| inside(c)) {
                    found.extend_from_slice(bucket);
                }
            } else {
                for x in lo[0]..=hi[0] {
                    for y in lo[1]..=hi[1] {
                        for z in lo[2]..=hi[2] {
                            if let Some(bucket) = cells.get(&[x, y, z]) {
                                found.extend_from_slice(bucket);
                            }
                        }
                    }
                }
            }
        }
        found.sort_unstable();
        found.dedup();
        found
            .into_iter()
            .filter(|&e| self.entries[e].1.overlaps(region))
            .map(|e| self.entries[e].0)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metasurf_math::Point3;

    fn cube(x: f64, size: f64) -> Aabb3 {
        Aabb3::new(Point3::new(x, 0.0, 0.0), Point3::new(x + size, size, size))
    }

    #[test]
    fn small_and_large_objects_are_found() {
        let mut g = HGrid::new();
        g.insert(0, cube(0.0, 0.001));
        g.insert(1, cube(0.0, 10.0));
        g.insert(2, cube(50.0, 1.0));
        let hits = g.query(&cube(0.0005, 0.0001));
        assert_eq!(hits, vec![0, 1]);
        assert_eq!(g.query(&cube(50.5, 0.1)), vec![2]);
        assert!(g.query(&cube(-5.0, 1.0)).is_empty());
    }

    #[test]
    fn long_ray_region_scans_populated_cells() {
        let mut g = HGrid::new();
        for i in 0..10 {
            g.insert(i, cube(i as f64 * 2.0, 0.5));
        }
        let ray = Aabb3::new(Point3::new(-1.0e4, 0.25, 0.25), Point3::new(1.0e4, 0.25, 0.25));
        assert_eq!(g.query(&ray).len(), 10);
    }
}
