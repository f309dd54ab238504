//! Boolean operation benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use metasurf_booleans::{boolean_op, BooleanOp};
use metasurf_math::{Point3, Transform};
use metasurf_topo::{Geometry, SubdivisionParams};

fn rounded_box(offset: f64) -> Geometry {
    let mut g = Geometry::new();
    for z in [0.0, 1.0] {
        for (x, y) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
            g.add_control_point(Point3::new(x, y, z));
        }
    }
    for [a, b, c, d] in [
        [0, 3, 2, 1],
        [4, 5, 6, 7],
        [0, 1, 5, 4],
        [1, 2, 6, 5],
        [2, 3, 7, 6],
        [3, 0, 4, 7],
    ] {
        g.add_patch(a, b, c, d, 0).expect("valid patch");
    }
    g.compute_neighbors();
    g.subdivide(&SubdivisionParams {
        geometric_error: 0.005,
        ..Default::default()
    });
    g.transformed(&Transform::translation(offset, offset * 0.7, offset * 0.4))
}

fn union_smooth_boxes(c: &mut Criterion) {
    let a = rounded_box(0.0);
    let b = rounded_box(0.35);
    c.bench_function("union_smooth_boxes", |bench| {
        bench.iter(|| boolean_op(black_box(&a), black_box(&b), BooleanOp::Union))
    });
}

fn difference_smooth_boxes(c: &mut Criterion) {
    let a = rounded_box(0.0);
    let b = rounded_box(0.35);
    c.bench_function("difference_smooth_boxes", |bench| {
        bench.iter(|| boolean_op(black_box(&a), black_box(&b), BooleanOp::Difference))
    });
}

criterion_group!(benches, union_smooth_boxes, difference_smooth_boxes);
criterion_main!(benches);
