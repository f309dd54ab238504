//! Triangulation of untrimmed subpatches.
//!
//! The boundary of a subpatch is its four sides, each possibly carrying
//! extra vertices from finer neighbors. The strip starts at corner 0 with
//! a left front walking backwards and a right front walking forwards, and
//! at every step advances the front whose new diagonal is shorter. A front
//! never steps onto the corner the other one is heading for, so the
//! strip cannot fold across a side.

use metasurf_math::{ccw, project, projection_axes, tri_area, Point2, Point3};

use crate::triangulate_polygon;

/// Area above which a clockwise strip triangle means the strip failed.
const AREA_EPSILON: f64 = 1e-12;

/// Triangulate a subpatch boundary.
///
/// `pts` walks the four sides counter-clockwise starting at corner 0;
/// `sides[i]` is the number of vertices on side `i`, counting its first
/// corner but not its last. `keys` identifies the vertices for the ear
/// clipping fallback.
pub fn triangulate_quad(pts: &[Point3], sides: [usize; 4], keys: &[usize], flip: bool) -> Vec<[usize; 3]> {
    let n = pts.len();
    let start = [0, sides[0], sides[0] + sides[1], sides[0] + sides[1] + sides[2]];
    if n < 4 || start[3] >= n {
        let flat: Vec<Point2> = pts.iter().map(|p| project(p, 0, 1)).collect();
        return triangulate_polygon(&flat, keys, flip);
    }

    let o = pts[0];
    let (ab, ac, ad) = (pts[start[1]] - o, pts[start[2]] - o, pts[start[3]] - o);
    let (n0, n1) = (ab.cross(&ac), ac.cross(&ad));
    let normal = if n0.dot(&n1) > 0.0 { n0 + n1 } else { ab.cross(&ad) };
    let [x, y, _] = projection_axes(&normal);
    let flat: Vec<Point2> = pts.iter().map(|p| project(p, x, y)).collect();

    match strip(pts, &flat, start) {
        Some(tris) if flip => tris.into_iter().map(|[a, b, c]| [a, c, b]).collect(),
        Some(tris) => tris,
        None => {
            log::debug!("quad strip folded, ear clipping {n} boundary vertices");
            triangulate_polygon(&flat, keys, flip)
        }
    }
}

fn strip(pts: &[Point3], flat: &[Point2], start: [usize; 4]) -> Option<Vec<[usize; 3]>> {
    let n = pts.len();
    let mut tris = Vec::with_capacity(n - 2);
    let mut add = |a: usize, b: usize, c: usize| -> Option<()> {
        if ccw(&flat[a], &flat[b], &flat[c]) {
            tris.push([a, b, c]);
        } else if tri_area(&flat[a], &flat[b], &flat[c]) > AREA_EPSILON {
            return None;
        }
        Some(())
    };
    let dist = |a: usize, b: usize| (pts[a] - pts[b]).norm_squared();

    let (mut lc, mut rc) = (3, 1);
    let (mut li, mut ri) = (n - 1, 1);
    let (mut lj, mut rj) = (li - 1, ri + 1);
    add(0, ri, li)?;

    if lj != rj {
        if li == start[lc] {
            lc = (lc + 3) % 4;
        }
        if ri == start[rc] {
            rc = (rc + 1) % 4;
        }
        let left = |ri: usize, lj: usize, rc: usize| if lj == start[rc] { f64::INFINITY } else { dist(ri, lj) };
        let right = |li: usize, rj: usize, lc: usize| if rj == start[lc] { f64::INFINITY } else { dist(li, rj) };
        let mut lv = left(ri, lj, rc);
        let mut rv = right(li, rj, lc);

        while lj != rj {
            if lv < rv {
                add(li, ri, lj)?;
                li = lj;
                lj = li - 1;
                if li == start[lc] {
                    lc = (lc + 3) % 4;
                }
                lv = left(ri, lj, rc);
            } else {
                add(ri, rj, li)?;
                ri = rj;
                rj = ri + 1;
                if ri == start[rc] {
                    rc = (rc + 1) % 4;
                }
                rv = right(li, rj, lc);
            }
        }
    }
    add(li, ri, lj)?;
    Some(tris)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(extra: &[(f64, f64)]) -> Vec<Point3> {
        let mut pts: Vec<Point3> = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
        pts.extend(extra.iter().map(|&(x, y)| Point3::new(x, y, 0.0)));
        pts
    }

    fn doubled_area(pts: &[Point3], tris: &[[usize; 3]]) -> f64 {
        tris.iter()
            .map(|t| {
                let f = t.map(|i| project(&pts[i], 0, 1));
                tri_area(&f[0], &f[1], &f[2])
            })
            .sum()
    }

    #[test]
    fn plain_quad_gives_two_triangles() {
        let pts = square(&[(1.0, 1.0), (0.0, 1.0)]);
        let tris = triangulate_quad(&pts, [1, 1, 1, 1], &[0, 1, 2, 3], false);
        assert_eq!(tris, vec![[0, 1, 3], [3, 1, 2]]);
    }

    #[test]
    fn split_sides_are_fully_covered() {
        // Sides 1 and 2 carry a midpoint each.
        let pts = square(&[(1.0, 0.5), (1.0, 1.0), (0.5, 1.0), (0.0, 1.0)]);
        let keys: Vec<usize> = (0..pts.len()).collect();
        let tris = triangulate_quad(&pts, [1, 2, 2, 1], &keys, false);
        assert_eq!(tris.len(), pts.len() - 2);
        approx::assert_relative_eq!(doubled_area(&pts, &tris), -2.0, epsilon = 1e-12);
        for t in &tris {
            let f = t.map(|i| project(&pts[i], 0, 1));
            assert!(ccw(&f[0], &f[1], &f[2]), "clockwise triangle {t:?}");
        }
    }

    #[test]
    fn flipped_quad_reverses_winding() {
        let pts = square(&[(1.0, 1.0), (0.0, 1.0)]);
        let tris = triangulate_quad(&pts, [1, 1, 1, 1], &[0, 1, 2, 3], true);
        approx::assert_relative_eq!(doubled_area(&pts, &tris), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn downward_facing_quad_is_counter_clockwise_about_its_normal() {
        let pts = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
        ];
        let tris = triangulate_quad(&pts, [1, 1, 1, 1], &[0, 1, 2, 3], false);
        assert_eq!(tris.len(), 2);
        for [a, b, c] in tris {
            let n = (pts[b] - pts[a]).cross(&(pts[c] - pts[a]));
            assert!(n.z < 0.0, "triangle must face -z");
        }
    }
}
