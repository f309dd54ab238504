//! Boolean pipeline: pair trimming, loop rebuilding and classification.

use std::collections::HashMap;
use std::ops::Range;

use metasurf_math::{Point3, Tolerance, Vec3};
use metasurf_topo::{Geometry, PatchId};
use metasurf_trim::{loop_point, surface_point, trim_subpatches, update_loops};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::bbox::patch_aabb;
use crate::classify::{ClassMask, RayTarget};
use crate::hgrid::HGrid;
use crate::tree::AabbTree;

/// Debug logging macro - only prints when debug-boolean feature is enabled
#[allow(unused_macros)]
#[cfg(feature = "debug-boolean")]
macro_rules! debug_bool {
    ($($arg:tt)*) => {
        eprintln!($($arg)*)
    };
}

/// No-op version when debug-boolean feature is disabled
#[allow(unused_macros)]
#[cfg(not(feature = "debug-boolean"))]
macro_rules! debug_bool {
    ($($arg:tt)*) => {};
}

/// What a classification sample stands for.
#[derive(Debug, Clone, Copy)]
enum Sample {
    /// An untrimmed patch, sampled on its first subpatch.
    Patch(PatchId),
    /// A visible subpatch without loops.
    Subpatch(PatchId, usize),
    /// Loop `l` of trimming `t`.
    Loop(PatchId, usize, usize),
}

/// Append `b` to `a`, cut both along their intersection and hide what
/// the masks reject.
///
/// Each side is classified against the other side as it was before the
/// operation. Returns the ID of the first patch that came from `b`.
pub(crate) fn merge_and_clip(a: &mut Geometry, b: &Geometry, mask_a: ClassMask, mask_b: ClassMask) -> PatchId {
    let tol = a.tolerance;
    debug_bool!("\n========== PATCH BOOLEAN START ==========");
    debug_bool!("A: {} patches, B: {} patches", a.num_patches(), b.num_patches());

    let target_a = RayTarget::new(a);
    let target_b = RayTarget::new(b);
    debug_bool!("Ray targets: A {} triangles, B {} triangles", target_a.num_triangles(), target_b.num_triangles());

    let first_b = a.append(b);
    let pairs = trim_overlaps(a, first_b, &tol);
    debug_bool!("Trimmed {} subpatch pairs", pairs);

    for patch in &mut a.patches {
        update_loops(patch, &tol);
    }

    let n = a.patches.len();
    classify(a, first_b..n, mask_b, &target_a, &tol);
    classify(a, 0..first_b, mask_a, &target_b, &tol);
    log::debug!("boolean trimmed {pairs} subpatch pairs over {n} patches");
    first_b
}

/// Trim every overlapping subpatch pair between patches `..first_b` and
/// `first_b..`. Returns the number of pairs tested.
fn trim_overlaps(g: &mut Geometry, first_b: PatchId, tol: &Tolerance) -> usize {
    let usable = |g: &Geometry, p: PatchId| !g.patches[p].hidden && g.patches[p].is_subdivided();

    let mut grid = HGrid::new();
    for pa in (0..first_b).filter(|&p| usable(g, p)) {
        grid.insert(pa, patch_aabb(&g.patches[pa]));
    }

    let mut trees: HashMap<PatchId, AabbTree> = HashMap::new();
    let mut count = 0;
    for pb in first_b..g.patches.len() {
        if !usable(g, pb) {
            continue;
        }
        let candidates = grid.query(&patch_aabb(&g.patches[pb]));
        if candidates.is_empty() {
            continue;
        }
        let tree_b = AabbTree::for_patch(&g.patches[pb]);
        for pa in candidates {
            let tree_a = trees.entry(pa).or_insert_with(|| AabbTree::for_patch(&g.patches[pa]));
            let pairs = tree_a.overlapping_pairs(&tree_b);
            debug_bool!("  patch {} x patch {}: {} subpatch pairs", pa, pb, pairs.len());
            for (spa, spb) in pairs {
                let (patch_a, patch_b) = g.pair_mut(pa, pb);
                trim_subpatches(patch_a, spa, patch_b, spb, tol);
                count += 1;
            }
        }
    }
    count
}

/// Hide every part of `range` whose sample `target` classifies outside
/// `mask`.
fn classify(g: &mut Geometry, range: Range<PatchId>, mask: ClassMask, target: &RayTarget, tol: &Tolerance) {
    let mut samples: Vec<(Sample, Point3, Vec3)> = Vec::new();
    for pid in range {
        let patch = &g.patches[pid];
        if patch.hidden || !patch.is_subdivided() {
            continue;
        }
        if !patch.trimmed {
            let (pos, n) = surface_point(patch, 0);
            samples.push((Sample::Patch(pid), pos, n));
            continue;
        }
        for sp in 0..patch.subpatches.len() {
            if patch.subpatches[sp].hidden {
                continue;
            }
            match patch.subpatches[sp].trimming {
                Some(t) if !patch.trimmings[t].loops.is_empty() => {
                    let trim = &patch.trimmings[t];
                    for (l, lp) in trim.loops.iter().enumerate() {
                        let (pos, n) = loop_point(patch, &lp.vertices, trim.x(), trim.y());
                        samples.push((Sample::Loop(pid, t, l), pos, n));
                    }
                }
                _ => {
                    let (pos, n) = surface_point(patch, sp);
                    samples.push((Sample::Subpatch(pid, sp), pos, n));
                }
            }
        }
    }

    // Queries only read the target; with `parallel` they run on rayon.
    #[cfg(feature = "parallel")]
    let iter = samples.par_iter();
    #[cfg(not(feature = "parallel"))]
    let iter = samples.iter();
    let rejected: Vec<Sample> = iter
        .filter(|(_, pos, n)| !mask.accepts(target.classify_point(pos, n, tol)))
        .map(|(s, _, _)| *s)
        .collect();
    debug_bool!("  classified {} samples, {} hidden", samples.len(), rejected.len());

    for s in rejected {
        match s {
            Sample::Patch(pid) => g.patches[pid].hidden = true,
            Sample::Subpatch(pid, sp) => g.patches[pid].subpatches[sp].hidden = true,
            Sample::Loop(pid, t, l) => g.patches[pid].trimmings[t].loops[l].hidden = true,
        }
    }
    // Trimmings whose loops all stayed visible collapse back to a quad.
    let mut touched: Vec<(PatchId, usize)> = samples
        .iter()
        .filter_map(|(s, _, _)| match *s {
            Sample::Loop(pid, t, _) => Some((pid, t)),
            _ => None,
        })
        .collect();
    touched.sort_unstable();
    touched.dedup();
    for (pid, t) in touched {
        g.patches[pid].trimmings[t].clean();
    }
}
