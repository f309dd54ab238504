//! Splitting of trimming edges where they cross or overlap.
//!
//! Edges coming from different intersection passes may cross each other,
//! end on each other, or lie on the same line. Before loops are traced
//! every such contact becomes a shared vertex, so the edge set forms a
//! planar graph in the trimming projection.

use std::collections::BTreeSet;
use std::iter;

use metasurf_math::{project, Point2, Point3, Tolerance};
use metasurf_topo::{Patch, VertexId};

fn projected(patch: &Patch, v: VertexId, x: usize, y: usize) -> Point2 {
    project(&patch.vertices[v].pos, x, y)
}

/// Edges of trimming `trim` split at every mutual contact.
///
/// Crossings in the interior of two edges create trimming vertices. The
/// result holds each segment once, smaller vertex ID first.
pub(crate) fn split_edges(patch: &mut Patch, trim: usize, tol: &Tolerance) -> Vec<(VertexId, VertexId)> {
    let t = &patch.trimmings[trim];
    let (x, y) = (t.x(), t.y());
    let mut edges: Vec<(VertexId, VertexId)> = t.edges.iter().copied().collect();
    edges.sort_by(|a, b| {
        let (pa, pb) = (projected(patch, a.0, x, y), projected(patch, b.0, x, y));
        pa.x.total_cmp(&pb.x).then(pa.y.total_cmp(&pb.y))
    });

    let near = |a: &Point2, b: &Point2| (a - b).norm() <= tol.linear;
    let mut splits: Vec<Vec<(f64, VertexId)>> = vec![Vec::new(); edges.len()];

    for i in 0..edges.len() {
        for j in i + 1..edges.len() {
            let (v0p, v1p) = edges[i];
            let (v2p, v3p) = edges[j];
            let v0 = projected(patch, v0p, x, y);
            let v1 = projected(patch, v1p, x, y);
            let v2 = projected(patch, v2p, x, y);
            let v3 = projected(patch, v3p, x, y);
            // Sorted by start: no later edge can reach this one.
            if v1.x + tol.linear < v2.x {
                break;
            }

            let d0 = v1 - v0;
            let d1 = v3 - v2;
            let d2 = v0 - v2;
            let den = d1.y * d0.x - d1.x * d0.y;
            let num0 = d1.x * d2.y - d1.y * d2.x;
            let num1 = d0.x * d2.y - d0.y * d2.x;
            let (l0, l1) = (d0.norm(), d1.norm());

            if den.abs() <= 1e-9 * l0 * l1 {
                if num0.abs() <= tol.linear * l1 && num1.abs() <= tol.linear * l0 {
                    splice_overlap(&mut splits, (i, j), [v0p, v1p, v2p, v3p], [v0, v1, v2, v3], tol);
                }
                continue;
            }

            let t0 = num0 / den;
            let t1 = num1 / den;
            let a = &patch.vertices[v2p];
            let b = &patch.vertices[v3p];
            let pos: Point3 = a.pos + (b.pos - a.pos) * t1;
            let p = project(&pos, x, y);

            if near(&v0, &p) || near(&v1, &p) {
                // An end of edge i touches edge j.
                if near(&v2, &p) || near(&v3, &p) || !(0.0..=1.0).contains(&t1) {
                    continue;
                }
                let v = if near(&v0, &p) { v0p } else { v1p };
                splits[j].push((t1, v));
            } else if 0.0 < t0 && t0 < 1.0 {
                if near(&v2, &p) {
                    splits[i].push((t0, v2p));
                } else if near(&v3, &p) {
                    splits[i].push((t0, v3p));
                } else if 0.0 < t1 && t1 < 1.0 {
                    let n = a.normal.lerp(&b.normal, t1);
                    let n = n.try_normalize(1e-12).unwrap_or(a.normal);
                    let uv = a.uv + (b.uv - a.uv) * t1;
                    let nv = patch.insert_face_vertex(trim, &pos, &n, &uv, tol);
                    log::trace!("trimming edges {i} and {j} cross at {pos:?}");
                    splits[i].push((t0, nv));
                    splits[j].push((t1, nv));
                }
            }
        }
    }

    let mut out = BTreeSet::new();
    for (k, &(a, b)) in edges.iter().enumerate() {
        let mut points = std::mem::take(&mut splits[k]);
        points.sort_by(|p, q| p.0.total_cmp(&q.0));
        let mut prev = a;
        for (_, v) in points.into_iter().chain(iter::once((1.0, b))) {
            if v != prev {
                out.insert((prev.min(v), prev.max(v)));
                prev = v;
            }
        }
    }
    out.into_iter().collect()
}

/// Colinear edges `i` and `j`: each gets the other's ends that fall inside
/// it, so the shared stretch ends up as identical segments.
fn splice_overlap(
    splits: &mut [Vec<(f64, VertexId)>],
    (i, j): (usize, usize),
    ids: [VertexId; 4],
    pts: [Point2; 4],
    tol: &Tolerance,
) {
    let [v0p, v1p, v2p, v3p] = ids;
    let [v0, v1, v2, v3] = pts;

    let inside = |s: f64, len: f64| s * len > tol.linear && (1.0 - s) * len > tol.linear;
    let d0 = v1 - v0;
    let d1 = v3 - v2;
    let (l0, l1) = (d0.norm(), d1.norm());
    if l0 == 0.0 || l1 == 0.0 {
        return;
    }

    let s2 = (v2 - v0).dot(&d0) / (l0 * l0);
    let s3 = (v3 - v0).dot(&d0) / (l0 * l0);
    if s2.max(s3) <= 0.0 || s2.min(s3) >= 1.0 {
        return;
    }
    log::debug!("trimming edges {i} and {j} overlap");

    for (s, v) in [(s2, v2p), (s3, v3p)] {
        if v != v0p && v != v1p && inside(s, l0) {
            splits[i].push((s, v));
        }
    }
    let r0 = (v0 - v2).dot(&d1) / (l1 * l1);
    let r1 = (v1 - v2).dot(&d1) / (l1 * l1);
    for (s, v) in [(r0, v0p), (r1, v1p)] {
        if v != v2p && v != v3p && inside(s, l1) {
            splits[j].push((s, v));
        }
    }
}
