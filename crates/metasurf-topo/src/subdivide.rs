//! Adaptive subdivision of patches into subpatches.
//!
//! Each subpatch samples its four edge midpoints and its center. An edge
//! still flagged curved whose true midpoint strays more than the geometric
//! error from the chord requests a split across it; the center compared to
//! the two mid-edge chords requests interior splits, but only while the
//! subpatch is wider than [`Tolerance::MIN_SPLIT_EXTENT`] along the split
//! axis. Children are appended to the subpatch list and the iteration
//! index advances only past subpatches that did not split.

use metasurf_geom::{DisplacementImage, ParametricPatch, SampleContext, SplitDecision};
use metasurf_math::{Point2, Point3, Tolerance, Vec3};
use serde::{Deserialize, Serialize};

use crate::{Geometry, Patch, PatchId, Subpatch};

/// Subdivision settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubdivisionParams {
    /// Maximum chordal deviation (world units).
    pub geometric_error: f64,
    /// Texel size of displacement rasters (world units).
    pub displacement_precision: f64,
}

impl Default for SubdivisionParams {
    fn default() -> Self {
        Self {
            geometric_error: 0.025,
            displacement_precision: 0.04,
        }
    }
}

/// Samples of a subpatch split: the midpoints of edges 0..4 followed by
/// the center.
#[derive(Debug, Clone, Copy)]
pub struct EdgeSamples {
    /// Positions.
    pub pos: [Point3; 5],
    /// Normals.
    pub normal: [Vec3; 5],
    /// Patch-local parameters.
    pub uv: [Point2; 5],
}

impl EdgeSamples {
    /// Midpoint parameters of the quad `v0..v3`.
    fn parameters(c: &[Point2; 4]) -> [Point2; 5] {
        let mid = |a: &Point2, b: &Point2| Point2::from((a.coords + b.coords) * 0.5);
        [
            mid(&c[0], &c[1]),
            mid(&c[1], &c[2]),
            mid(&c[2], &c[3]),
            mid(&c[3], &c[0]),
            mid(&c[0], &c[2]),
        ]
    }

    /// Linear samples of the quad `p` with normal `n` everywhere.
    pub fn linear(p: &[Point3; 4], uv: &[Point2; 4], n: Vec3) -> Self {
        let mid = |a: &Point3, b: &Point3| Point3::from((a.coords + b.coords) * 0.5);
        Self {
            pos: [
                mid(&p[0], &p[1]),
                mid(&p[1], &p[2]),
                mid(&p[2], &p[3]),
                mid(&p[3], &p[0]),
                mid(&p[0], &p[2]),
            ],
            normal: [n; 5],
            uv: Self::parameters(uv),
        }
    }
}

fn midpoint(a: &Point3, b: &Point3) -> Point3 {
    Point3::from((a.coords + b.coords) * 0.5)
}

impl Patch {
    /// Split subpatch `sp` across `u`: new vertices on edges 0 and 2.
    pub fn split_u(&mut self, sp: usize, s: &EdgeSamples) {
        let nv0 = self.subdivide_edge(sp, 0, s.pos[0], s.normal[0], s.uv[0]);
        let nv2 = self.subdivide_edge(sp, 2, s.pos[2], s.normal[2], s.uv[2]);
        self.vertices[nv0].next[2] = Some(nv2);
        self.vertices[nv2].next[0] = Some(nv0);

        let sp0 = &mut self.subpatches[sp];
        let [_, c1, c2, _] = sp0.corners;
        let mut child = Subpatch::new([nv0, c1, c2, nv2]);
        child.curved = sp0.curved | 0b1000;
        sp0.curved |= 0b0010;
        sp0.corners[1] = nv0;
        sp0.corners[2] = nv2;
        self.subpatches.push(child);
    }

    /// Split subpatch `sp` across `v`: new vertices on edges 1 and 3.
    pub fn split_v(&mut self, sp: usize, s: &EdgeSamples) {
        let nv1 = self.subdivide_edge(sp, 1, s.pos[1], s.normal[1], s.uv[1]);
        let nv3 = self.subdivide_edge(sp, 3, s.pos[3], s.normal[3], s.uv[3]);
        self.vertices[nv1].next[3] = Some(nv3);
        self.vertices[nv3].next[1] = Some(nv1);

        let sp0 = &mut self.subpatches[sp];
        let [_, _, c2, c3] = sp0.corners;
        let mut child = Subpatch::new([nv3, nv1, c2, c3]);
        child.curved = sp0.curved | 0b0001;
        sp0.curved |= 0b0100;
        sp0.corners[2] = nv1;
        sp0.corners[3] = nv3;
        self.subpatches.push(child);
    }

    /// Split subpatch `sp` into four around a new center vertex.
    pub fn split_uv(&mut self, sp: usize, s: &EdgeSamples) {
        let nv: [usize; 4] = std::array::from_fn(|e| self.subdivide_edge(sp, e, s.pos[e], s.normal[e], s.uv[e]));

        let center = self.vertices.len();
        let mut v = crate::Vertex::new(s.pos[4], s.normal[4], s.uv[4]);
        v.next = nv.map(Some);
        self.vertices.push(v);
        self.vertices[nv[0]].next[2] = Some(center);
        self.vertices[nv[1]].next[3] = Some(center);
        self.vertices[nv[2]].next[0] = Some(center);
        self.vertices[nv[3]].next[1] = Some(center);

        let sp0 = &mut self.subpatches[sp];
        let [_, c1, c2, c3] = sp0.corners;
        let curved = sp0.curved;
        sp0.corners = [sp0.corners[0], nv[0], center, nv[3]];
        sp0.curved |= 0b0110;

        let children = [
            ([nv[0], c1, nv[1], center], 0b1100),
            ([center, nv[1], c2, nv[2]], 0b1001),
            ([nv[3], center, nv[2], c3], 0b0011),
        ];
        for (corners, bits) in children {
            let mut child = Subpatch::new(corners);
            child.curved = curved | bits;
            self.subpatches.push(child);
        }
    }

    fn apply_split(&mut self, sp: usize, split: &SplitDecision, s: &EdgeSamples) -> bool {
        self.subpatches[sp].curved = split.curved;
        match (split.split_u, split.split_v) {
            (false, false) => return false,
            (true, false) => self.split_u(sp, s),
            (false, true) => self.split_v(sp, s),
            (true, true) => self.split_uv(sp, s),
        }
        true
    }

    /// Test subpatch `sp` against the true surface and split it if needed.
    /// Returns whether a split happened.
    fn refine(&mut self, sp: usize, eval: &dyn ParametricPatch, error: f64) -> bool {
        let corners = self.subpatches[sp].corners;
        let curved = self.subpatches[sp].curved;
        let p = corners.map(|c| self.vertices[c].pos);
        let uv = EdgeSamples::parameters(&corners.map(|c| self.vertices[c].uv));

        let mut rpos = [Point3::origin(); 5];
        let mut normal = [Vec3::zeros(); 5];
        for i in 0..5 {
            (rpos[i], normal[i]) = eval.parameters(&uv[i]);
        }

        let error2 = error * error;
        let mut split = SplitDecision::default();
        let mut pos = rpos;
        for e in 0..4 {
            let lin = midpoint(&p[e], &p[(e + 1) % 4]);
            if curved & (1 << e) != 0 && (rpos[e] - lin).norm_squared() > error2 {
                if e % 2 == 0 {
                    split.split_u = true;
                } else {
                    split.split_v = true;
                }
                split.curved |= 1 << e;
            } else {
                pos[e] = lin;
            }
        }

        let extent = uv_extent(self, &corners);
        if !split.split_v
            && (rpos[4] - midpoint(&rpos[0], &rpos[2])).norm_squared() > error2
            && extent.y > Tolerance::MIN_SPLIT_EXTENT
        {
            split.split_v = true;
        }
        if !split.split_u
            && (rpos[4] - midpoint(&rpos[1], &rpos[3])).norm_squared() > error2
            && extent.x > Tolerance::MIN_SPLIT_EXTENT
        {
            split.split_u = true;
        }

        self.apply_split(sp, &split, &EdgeSamples { pos, normal, uv })
    }

    /// Raster-driven variant of [`Patch::refine`].
    fn refine_displaced(&mut self, sp: usize, image: &DisplacementImage, error: f64, fallback: &Vec3) -> bool {
        let corners = self.subpatches[sp].corners;
        let v = corners.map(|c| &self.vertices[c]);
        let split = image.flatness(&v[0].uv, &v[2].uv, self.subpatches[sp].curved, error);
        if !split.any() {
            self.subpatches[sp].curved = split.curved;
            return false;
        }

        let uv = EdgeSamples::parameters(&[v[0].uv, v[1].uv, v[2].uv, v[3].uv]);
        let mut pos = [Point3::origin(); 5];
        for e in 0..4 {
            pos[e] = if split.curved & (1 << e) != 0 {
                image.displace(&uv[e])
            } else {
                midpoint(&v[e].pos, &v[(e + 1) % 4].pos)
            };
        }
        pos[4] = image.displace(&uv[4]);
        let normal = uv.map(|t| image.normal(&t, fallback));

        self.apply_split(sp, &split, &EdgeSamples { pos, normal, uv })
    }
}

fn uv_extent(patch: &Patch, corners: &[usize; 4]) -> Point2 {
    let a = patch.vertices[corners[0]].uv;
    let b = patch.vertices[corners[2]].uv;
    Point2::new(b.x - a.x, b.y - a.y)
}

impl Geometry {
    /// Subdivide every patch, then snap shared corners and hanging
    /// vertices so neighboring quads meet.
    pub fn subdivide(&mut self, params: &SubdivisionParams) {
        for pid in 0..self.patches.len() {
            self.subdivide_patch(pid, params);
        }
        self.make_bilinear();
    }

    /// Build and refine the vertex grid of patch `pid`. Patches that are
    /// already subdivided are left alone.
    pub fn subdivide_patch(&mut self, pid: PatchId, params: &SubdivisionParams) {
        if self.patches[pid].is_subdivided() {
            return;
        }
        let eval = self.evaluator(pid);
        let controls = self.control_quad(pid);
        let patch = &mut self.patches[pid];

        let unit = crate::patch::unit_uv();
        let samples = unit.map(|uv| eval.parameters(&uv));
        let mut pos = samples.map(|s| s.0);
        let mut normals = samples.map(|s| s.1);
        let face_normal = normals.iter().sum::<Vec3>().try_normalize(1e-12).unwrap_or_else(Vec3::z);

        let base = SampleContext {
            material: patch.material,
            uv: Point2::origin(),
            position: Point3::origin(),
            normal: face_normal,
            face_normal,
        };

        if let Some(mapping) = patch.mapping.clone() {
            for c in 0..4 {
                let ctx = SampleContext {
                    uv: patch.uv[c],
                    position: pos[c],
                    normal: normals[c],
                    ..base
                };
                patch.uv[c] = mapping.map(&ctx);
            }
        }

        let error = params.geometric_error;
        match patch.displacement.clone() {
            Some(d) => {
                let image = DisplacementImage::build(
                    eval.as_ref(),
                    &controls,
                    params.displacement_precision,
                    d.as_ref(),
                    &base,
                );
                for c in 0..4 {
                    pos[c] = image.displace(&unit[c]);
                    normals[c] = image.normal(&unit[c], &normals[c]);
                }
                patch.init_grid(pos, normals);
                let mut i = 0;
                while i < patch.subpatches.len() {
                    if !patch.refine_displaced(i, &image, error, &face_normal) {
                        i += 1;
                    }
                }
            }
            None => {
                patch.init_grid(pos, normals);
                let mut i = 0;
                while i < patch.subpatches.len() {
                    if !patch.refine(i, eval.as_ref(), error) {
                        i += 1;
                    }
                }
            }
        }
        log::debug!("patch {pid}: {} subpatches", patch.subpatches.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::tests::creased_cube;
    use metasurf_geom::Displacement;
    use std::sync::Arc;

    fn flat_square() -> Geometry {
        let mut g = Geometry::new();
        for (x, y) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
            g.add_control_point(Point3::new(x, y, 0.0));
        }
        g.add_patch(0, 1, 2, 3, 0).unwrap();
        g
    }

    fn params(error: f64) -> SubdivisionParams {
        SubdivisionParams {
            geometric_error: error,
            ..Default::default()
        }
    }

    #[test]
    fn flat_patch_keeps_single_subpatch() {
        let mut g = flat_square();
        g.subdivide(&params(1.0));
        assert_eq!(g.num_subpatches(), 1);
        assert_eq!(g.patches[0].vertices.len(), 4);
    }

    #[test]
    fn planar_patches_never_split() {
        for error in [1.0, 1e-3, 1e-6] {
            let mut g = creased_cube();
            g.subdivide(&params(error));
            assert_eq!(g.num_subpatches(), 6, "error {error} split a planar face");
        }
    }

    #[test]
    fn split_uv_shares_center() {
        let mut g = flat_square();
        g.subdivide(&params(1.0));
        let patch = &mut g.patches[0];
        let corners = patch.corner_positions(0);
        let uv = crate::patch::unit_uv();
        let samples = EdgeSamples::linear(&corners, &uv, Vec3::z());
        patch.split_uv(0, &samples);

        assert_eq!(patch.subpatches.len(), 4);
        let center = patch.vertices.len() - 1;
        for sp in &patch.subpatches {
            assert!(sp.corners.contains(&center), "child {sp:?} misses the center");
        }
        let links: Vec<usize> = patch.vertices[center].next.iter().map(|n| n.unwrap()).collect();
        for (dir, &v) in links.iter().enumerate() {
            let back = patch.vertices[v].next[(dir + 2) % 4];
            assert_eq!(back, Some(center), "edge midpoint {v} does not link back");
        }
        assert!((patch.vertices[center].pos - Point3::new(0.5, 0.5, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn neighbouring_splits_share_edge_vertices() {
        let mut g = flat_square();
        g.subdivide(&params(1.0));
        let patch = &mut g.patches[0];
        let uv = crate::patch::unit_uv();
        let s = EdgeSamples::linear(&patch.corner_positions(0), &uv, Vec3::z());
        patch.split_u(0, &s);
        // Split both halves across v: the shared middle edge gets one vertex.
        for sp in 0..2 {
            let c = patch.subpatches[sp].corners;
            let p = c.map(|v| patch.vertices[v].pos);
            let uv = c.map(|v| patch.vertices[v].uv);
            let s = EdgeSamples::linear(&p, &uv, Vec3::z());
            patch.split_v(sp, &s);
        }
        assert_eq!(patch.subpatches.len(), 4);
        assert_eq!(patch.vertices.len(), 9, "3x3 grid expected");
    }

    #[derive(Debug)]
    struct Dome;

    impl metasurf_geom::Displacement for Dome {
        fn displace(&self, ctx: &SampleContext) -> Point3 {
            let h = (ctx.uv.x * std::f64::consts::PI).sin() * (ctx.uv.y * std::f64::consts::PI).sin();
            ctx.position + ctx.normal * (0.2 * h)
        }
    }

    #[test]
    fn displacement_refines_curved_region() {
        let mut g = flat_square();
        let dome: Arc<dyn Displacement> = Arc::new(Dome);
        g.patches[0].displacement = Some(dome);
        g.subdivide(&SubdivisionParams {
            geometric_error: 0.01,
            displacement_precision: 0.05,
        });
        let n = g.num_subpatches();
        assert!(n > 1, "dome must split, got {n}");
        let patch = &g.patches[0];
        let top = patch.vertices.iter().map(|v| v.pos.z).fold(0.0, f64::max);
        assert!(top > 0.1, "displaced vertices expected, max z {top}");
        for sp in &patch.subpatches {
            let a = patch.vertices[sp.corners[0]].uv;
            let b = patch.vertices[sp.corners[2]].uv;
            assert!(b.x > a.x && b.y > a.y, "degenerate child {sp:?}");
        }
    }
}
