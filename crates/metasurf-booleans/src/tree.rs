//! Bounding volume tree over the subpatches of one patch.

use crate::bbox::{subpatch_aabb, Aabb3};
use metasurf_topo::Patch;

#[derive(Debug, Clone)]
enum Node {
    Leaf { aabb: Aabb3, item: usize },
    Branch { aabb: Aabb3, left: usize, right: usize },
}

impl Node {
    fn aabb(&self) -> &Aabb3 {
        match self {
            Node::Leaf { aabb, .. } | Node::Branch { aabb, .. } => aabb,
        }
    }
}

/// Binary AABB tree, split at the median of the longest axis.
#[derive(Debug, Clone, Default)]
pub struct AabbTree {
    nodes: Vec<Node>,
    root: Option<usize>,
}

impl AabbTree {
    /// Build a tree over `(item, box)` pairs.
    pub fn build(mut items: Vec<(usize, Aabb3)>) -> Self {
        let mut tree = Self::default();
        if !items.is_empty() {
            tree.root = Some(tree.build_node(&mut items));
        }
        tree
    }

    /// Tree over the visible subpatches of `patch`.
    pub fn for_patch(patch: &Patch) -> Self {
        let items = (0..patch.subpatches.len())
            .filter(|&sp| !patch.subpatches[sp].hidden)
            .map(|sp| (sp, subpatch_aabb(patch, sp)))
            .collect();
        Self::build(items)
    }

    fn build_node(&mut self, items: &mut [(usize, Aabb3)]) -> usize {
        let mut aabb = Aabb3::empty();
        for (_, b) in items.iter() {
            aabb.include(b);
        }
        if let [(item, _)] = items {
            self.nodes.push(Node::Leaf { aabb, item: *item });
            return self.nodes.len() - 1;
        }

        let axis = aabb.longest_axis();
        items.sort_by(|a, b| a.1.center()[axis].total_cmp(&b.1.center()[axis]));
        let (lo, hi) = items.split_at_mut(items.len() / 2);
        let left = self.build_node(lo);
        let right = self.build_node(hi);
        self.nodes.push(Node::Branch { aabb, left, right });
        self.nodes.len() - 1
    }

    /// Number of leaves.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| matches!(n, Node::Leaf { .. })).count()
    }

    /// Whether the tree has no leaves.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Every `(mine, theirs)` pair of items whose boxes overlap.
    pub fn overlapping_pairs(&self, other: &AabbTree) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        let (Some(a), Some(b)) = (self.root, other.root) else {
            return out;
        };
        let mut stack = vec![(a, b)];
        while let Some((i, j)) = stack.pop() {
            let (na, nb) = (&self.nodes[i], &other.nodes[j]);
            if !na.aabb().overlaps(nb.aabb()) {
                continue;
            }
            match (na, nb) {
                (Node::Leaf { item: x, .. }, Node::Leaf { item: y, .. }) => out.push((*x, *y)),
                (Node::Branch { left, right, .. }, Node::Leaf { .. }) => {
                    stack.push((*left, j));
                    stack.push((*right, j));
                }
                (Node::Leaf { .. }, Node::Branch { left, right, .. }) => {
                    stack.push((i, *left));
                    stack.push((i, *right));
                }
                (Node::Branch { left: l0, right: r0, .. }, Node::Branch { left: l1, right: r1, .. }) => {
                    for p in [*l0, *r0] {
                        for q in [*l1, *r1] {
                            stack.push((p, q));
                        }
                    }
                }
            }
        }
        out.sort_unstable();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metasurf_math::Point3;

    fn row(n: usize, y: f64) -> Vec<(usize, Aabb3)> {
        (0..n)
            .map(|i| {
                let x = i as f64;
                (i, Aabb3::new(Point3::new(x, y, 0.0), Point3::new(x + 0.9, y + 0.9, 0.1)))
            })
            .collect()
    }

    #[test]
    fn matches_brute_force_pairs() {
        let a = row(7, 0.0);
        let mut b = row(5, 0.5);
        for (_, bb) in &mut b {
            bb.min.x += 0.45;
            bb.max.x += 0.45;
        }
        let mut expected = Vec::new();
        for (i, ba) in &a {
            for (j, bb) in &b {
                if ba.overlaps(bb) {
                    expected.push((*i, *j));
                }
            }
        }
        let ta = AabbTree::build(a);
        let tb = AabbTree::build(b);
        assert_eq!(ta.len(), 7);
        assert_eq!(ta.overlapping_pairs(&tb), expected);
    }

    #[test]
    fn empty_tree_has_no_pairs() {
        let t = AabbTree::build(row(3, 0.0));
        assert!(t.overlapping_pairs(&AabbTree::default()).is_empty());
    }
}
