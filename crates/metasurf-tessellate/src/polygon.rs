use metasurf_math::{EarClipper, Point2};

/// Ear clip the counter-clockwise polygon `pts`.
///
/// `keys[i]` identifies the vertex behind `pts[i]`; bridged loops repeat
/// keys. Returns triangles as indices into `pts`, with their winding
/// reversed when `flip` is set. Polygons with fewer than three vertices
/// produce nothing.
pub fn triangulate_polygon(pts: &[Point2], keys: &[usize], flip: bool) -> Vec<[usize; 3]> {
    let orient = |[a, b, c]: [usize; 3]| if flip { [a, c, b] } else { [a, b, c] };
    match pts.len() {
        0..=2 => {
            log::warn!("skipping degenerate polygon with {} vertices", pts.len());
            Vec::new()
        }
        3 => vec![orient([0, 1, 2])],
        _ => EarClipper::new(pts, keys).map(|ear| orient(ear.corners)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metasurf_math::tri_area;

    fn area(pts: &[Point2], tris: &[[usize; 3]]) -> f64 {
        tris.iter().map(|t| tri_area(&pts[t[0]], &pts[t[1]], &pts[t[2]])).sum()
    }

    #[test]
    fn l_shape_is_covered_exactly() {
        let pts = [
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(2.0, 1.0),
            Point2::new(1.0, 1.0),
            Point2::new(1.0, 2.0),
            Point2::new(0.0, 2.0),
        ];
        let keys: Vec<usize> = (0..pts.len()).collect();
        let tris = triangulate_polygon(&pts, &keys, false);
        assert_eq!(tris.len(), 4);
        // Doubled signed area of a 3-unit L, negative for counter-clockwise.
        approx::assert_relative_eq!(area(&pts, &tris), -6.0, epsilon = 1e-12);
        assert!(tris.iter().all(|t| metasurf_math::ccw(&pts[t[0]], &pts[t[1]], &pts[t[2]])));
    }

    #[test]
    fn flip_reverses_every_triangle() {
        let pts = [
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ];
        let keys = [0, 1, 2, 3];
        let tris = triangulate_polygon(&pts, &keys, true);
        assert_eq!(tris.len(), 2);
        approx::assert_relative_eq!(area(&pts, &tris), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn too_few_vertices_emit_nothing() {
        let pts = [Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)];
        assert!(triangulate_polygon(&pts, &[0, 1], false).is_empty());
        let tri = [Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(0.0, 1.0)];
        assert_eq!(triangulate_polygon(&tri, &[0, 1, 2], false), vec![[0, 1, 2]]);
    }
}
