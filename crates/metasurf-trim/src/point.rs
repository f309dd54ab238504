//! Representative points of subpatches and loops, used to classify them
//! against the other operand.

use metasurf_math::{project, EarClipper, Point2, Point3, Vec3};
use metasurf_topo::{Patch, VertexId};

/// A point on subpatch `sp` away from its sides, with its normal.
///
/// The midpoint of the diagonal the quad is folded along, which lies on
/// both approximating triangles.
pub fn surface_point(patch: &Patch, sp: usize) -> (Point3, Vec3) {
    let c = patch.subpatches[sp].corners.map(|v| &patch.vertices[v]);
    let ab = c[1].pos - c[0].pos;
    let ac = c[2].pos - c[0].pos;
    let ad = c[3].pos - c[0].pos;

    let (a, b) = if ab.cross(&ac).dot(&ac.cross(&ad)) > 0.0 {
        (c[0], c[2])
    } else {
        (c[1], c[3])
    };
    let pos = Point3::from((a.pos.coords + b.pos.coords) * 0.5);
    (pos, normalized(a.normal + b.normal, a.normal))
}

/// A point strictly inside loop `vertices`, with its normal.
///
/// Taken inside the best-shaped ear of the loop polygon projected onto
/// axes `x`, `y`, weighted toward the ear's far corner.
pub fn loop_point(patch: &Patch, vertices: &[VertexId], x: usize, y: usize) -> (Point3, Vec3) {
    let vx = |i: usize| &patch.vertices[vertices[i]];
    match vertices.len() {
        0 => (Point3::origin(), Vec3::z()),
        1 | 2 => (vx(0).pos, vx(0).normal),
        3 => ear_point(patch, [vertices[0], vertices[1], vertices[2]]),
        n => {
            let pts: Vec<Point2> = vertices.iter().map(|&v| project(&patch.vertices[v].pos, x, y)).collect();
            let mut clipper = EarClipper::new(&pts, vertices);
            let best = if n == 4 {
                clipper.next()
            } else {
                clipper.min_by(|a, b| a.cost.total_cmp(&b.cost))
            };
            match best {
                Some(ear) => ear_point(patch, ear.corners.map(|i| vertices[i])),
                None => (vx(0).pos, vx(0).normal),
            }
        }
    }
}

fn ear_point(patch: &Patch, ear: [VertexId; 3]) -> (Point3, Vec3) {
    let [a, b, c] = ear.map(|v| &patch.vertices[v]);
    let pos = a.pos.coords * 0.25 + b.pos.coords * 0.25 + c.pos.coords * 0.5;
    let n = a.normal * 0.25 + b.normal * 0.25 + c.normal * 0.5;
    (Point3::from(pos), normalized(n, c.normal))
}

fn normalized(n: Vec3, fallback: Vec3) -> Vec3 {
    n.try_normalize(1e-12).unwrap_or(fallback)
}

/// Crossing-number test of `pt` against loop `vertices` projected onto
/// axes `x`, `y`.
pub fn point_in_loop(patch: &Patch, vertices: &[VertexId], x: usize, y: usize, pt: &Point3) -> bool {
    let n = vertices.len();
    let mut inside = false;
    for i in 0..n {
        let v0 = &patch.vertices[vertices[(i + n - 1) % n]].pos;
        let v1 = &patch.vertices[vertices[i]].pos;
        if (v0[y] <= pt[y]) != (v1[y] <= pt[y]) {
            let t = (pt[y] - v0[y]) / (v1[y] - v0[y]);
            if pt[x] < v0[x] + t * (v1[x] - v0[x]) {
                inside = !inside;
            }
        }
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square_patch() -> Patch {
        let mut p = Patch::new([0, 1, 2, 3], 0);
        p.init_grid(
            [
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(2.0, 0.0, 0.0),
                Point3::new(2.0, 2.0, 0.0),
                Point3::new(0.0, 2.0, 0.0),
            ],
            [Vec3::z(); 4],
        );
        p
    }

    #[test]
    fn surface_point_is_quad_center_when_flat() {
        let p = square_patch();
        let (pos, n) = surface_point(&p, 0);
        assert_relative_eq!(pos, Point3::new(1.0, 1.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(n, Vec3::z(), epsilon = 1e-12);
    }

    #[test]
    fn loop_point_lies_inside_its_loop() {
        let p = square_patch();
        let quad = [0, 1, 2, 3];
        let (pos, _) = loop_point(&p, &quad, 0, 1);
        assert!(point_in_loop(&p, &quad, 0, 1, &pos), "{pos:?}");

        let tri = [0, 1, 2];
        let (pos, _) = loop_point(&p, &tri, 0, 1);
        assert_relative_eq!(pos, Point3::new(1.5, 1.0, 0.0), epsilon = 1e-12);
        assert!(point_in_loop(&p, &tri, 0, 1, &pos));
        assert!(!point_in_loop(&p, &tri, 0, 1, &Point3::new(0.5, 1.5, 0.0)));
    }

    #[test]
    fn point_in_loop_rejects_outside() {
        let p = square_patch();
        let quad = [0, 1, 2, 3];
        assert!(point_in_loop(&p, &quad, 0, 1, &Point3::new(1.0, 1.0, 0.0)));
        assert!(!point_in_loop(&p, &quad, 0, 1, &Point3::new(3.0, 1.0, 0.0)));
        assert!(!point_in_loop(&p, &quad, 0, 1, &Point3::new(1.0, -0.5, 0.0)));
    }
}
