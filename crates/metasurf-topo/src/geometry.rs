use std::collections::HashMap;

use metasurf_geom::{BicubicPatch, BilinearPatch, CornerRing, ParametricPatch, MAX_VALENCE};
use metasurf_math::{Point2, Point3, Tolerance, Transform};

use crate::{GeometryError, Patch, PatchId};

/// A set of patches over a shared array of control points.
#[derive(Debug, Clone, Default)]
pub struct Geometry {
    /// Control points referenced by [`Patch::controls`].
    pub control_points: Vec<Point3>,
    /// Patches in authoring order.
    pub patches: Vec<Patch>,
    /// Coincidence tolerance used by trimming and triangulation.
    pub tolerance: Tolerance,
}

impl Geometry {
    /// Create an empty geometry with the default tolerance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a control point and return its index.
    pub fn add_control_point(&mut self, p: Point3) -> u32 {
        self.control_points.push(p);
        (self.control_points.len() - 1) as u32
    }

    /// Add a patch over four control points given counter-clockwise.
    /// Bit `i` of `creases` marks edge `i` as a crease.
    pub fn add_patch(&mut self, v0: u32, v1: u32, v2: u32, v3: u32, creases: u8) -> Result<PatchId, GeometryError> {
        let uv = crate::patch::unit_uv();
        self.add_patch_with([v0, v1, v2, v3], uv, 0, creases)
    }

    /// Add a patch with explicit corner texture coordinates and material.
    pub fn add_patch_with(
        &mut self,
        controls: [u32; 4],
        uv: [Point2; 4],
        material: u32,
        creases: u8,
    ) -> Result<PatchId, GeometryError> {
        if creases > 0xf {
            return Err(GeometryError::InvalidCreases(creases));
        }
        if let Some(&bad) = controls.iter().find(|&&c| c as usize >= self.control_points.len()) {
            return Err(GeometryError::UnknownControlPoint(bad));
        }
        let mut patch = Patch::new(controls, creases);
        patch.uv = uv;
        patch.material = material;
        self.patches.push(patch);
        Ok(self.patches.len() - 1)
    }

    /// Patch `id`.
    pub fn patch(&self, id: PatchId) -> Result<&Patch, GeometryError> {
        self.patches.get(id).ok_or(GeometryError::UnknownPatch(id))
    }

    /// Mutable patch `id`.
    pub fn patch_mut(&mut self, id: PatchId) -> Result<&mut Patch, GeometryError> {
        self.patches.get_mut(id).ok_or(GeometryError::UnknownPatch(id))
    }

    /// Two distinct patches borrowed mutably at once.
    pub fn pair_mut(&mut self, a: PatchId, b: PatchId) -> (&mut Patch, &mut Patch) {
        assert_ne!(a, b, "pair_mut needs two distinct patches");
        if a < b {
            let (lo, hi) = self.patches.split_at_mut(b);
            (&mut lo[a], &mut hi[0])
        } else {
            let (lo, hi) = self.patches.split_at_mut(a);
            (&mut hi[0], &mut lo[b])
        }
    }

    /// Link edge `e0` of patch `p0` with edge `e1` of patch `p1`.
    pub fn neighbors(&mut self, p0: PatchId, e0: usize, p1: PatchId, e1: usize, crease: bool) -> Result<(), GeometryError> {
        for e in [e0, e1] {
            if e > 3 {
                return Err(GeometryError::InvalidEdge(e));
            }
        }
        for p in [p0, p1] {
            if p >= self.patches.len() {
                return Err(GeometryError::UnknownPatch(p));
            }
        }
        self.link(p0, e0, p1, e1, crease);
        Ok(())
    }

    fn link(&mut self, p0: PatchId, e0: usize, p1: PatchId, e1: usize, crease: bool) {
        for (p, e, other, oe) in [(p0, e0, p1, e1), (p1, e1, p0, e0)] {
            let patch = &mut self.patches[p];
            patch.neighbors[e] = Some(other);
            patch.neighbor_edges[e] = oe as u8;
            if crease {
                patch.creases |= 1 << e;
            } else {
                patch.creases &= !(1 << e);
            }
        }
    }

    /// Link every pair of patches sharing an edge with opposite
    /// orientation. An edge is a crease if either side marks it.
    pub fn compute_neighbors(&mut self) {
        let mut edges: HashMap<(u32, u32), (PatchId, usize)> = HashMap::new();
        let mut pairs = Vec::new();
        for (pid, patch) in self.patches.iter().enumerate() {
            for e in 0..4 {
                let a = patch.controls[e];
                let b = patch.controls[(e + 1) % 4];
                if let Some(&(other, oe)) = edges.get(&(b, a)) {
                    pairs.push((other, oe, pid, e));
                }
                edges.insert((a, b), (pid, e));
            }
        }
        for (p0, e0, p1, e1) in pairs {
            let crease = self.patches[p0].crease(e0) || self.patches[p1].crease(e1);
            self.link(p0, e0, p1, e1, crease);
        }
    }

    fn control_point(&self, id: u32) -> Point3 {
        self.control_points[id as usize]
    }

    /// Control point positions of patch `pid`.
    pub fn control_quad(&self, pid: PatchId) -> [Point3; 4] {
        self.patches[pid].controls.map(|c| self.control_point(c))
    }

    /// One-rings of the four corners of `pid`, or `None` when a ring is
    /// open or exceeds the maximum valence.
    fn corner_rings(&self, pid: PatchId) -> Option<[CornerRing; 4]> {
        let mut rings: [CornerRing; 4] = Default::default();
        for (c, ring) in rings.iter_mut().enumerate() {
            ring.center = self.control_point(self.patches[pid].controls[c]);
            let mut cp = pid;
            let mut cc = c;
            loop {
                let patch = &self.patches[cp];
                ring.creased.push(patch.crease(cc));
                ring.ring.push(self.control_point(patch.controls[(cc + 1) % 4]));
                ring.diag.push(self.control_point(patch.controls[(cc + 2) % 4]));

                let ne = (cc + 3) % 4;
                cp = patch.neighbors[ne]?;
                cc = patch.neighbor_edges[ne] as usize;
                if cp == pid {
                    break;
                }
                if ring.ring.len() >= MAX_VALENCE {
                    return None;
                }
            }
        }
        Some(rings)
    }

    /// Surface evaluator of patch `pid`: bicubic when every corner ring
    /// closes, bilinear over the control quad otherwise.
    pub fn evaluator(&self, pid: PatchId) -> Box<dyn ParametricPatch> {
        match self.corner_rings(pid).and_then(|r| BicubicPatch::from_rings(&r)) {
            Some(b) => Box::new(b),
            None => Box::new(BilinearPatch::new(self.control_quad(pid))),
        }
    }

    /// Copy of the geometry under `t`.
    ///
    /// Positions use the full matrix and normals its inverse transpose;
    /// trimming frames are recomputed. A mirroring transform flips every
    /// patch so emitted windings stay outward.
    pub fn transformed(&self, t: &Transform) -> Geometry {
        let mut g = self.clone();
        for c in &mut g.control_points {
            *c = t.apply_point(c);
        }
        let mirror = t.is_mirroring();
        for patch in &mut g.patches {
            for v in &mut patch.vertices {
                v.pos = t.apply_point(&v.pos);
                v.normal = t.apply_normal(&v.normal);
            }
            for sp in 0..patch.subpatches.len() {
                if let Some(tid) = patch.subpatches[sp].trimming {
                    let [a, b, c, d] = patch.corner_positions(sp);
                    patch.trimmings[tid].reframe([&a, &b, &c, &d]);
                }
            }
            if mirror {
                patch.flip();
            }
        }
        g
    }

    /// Hide patch `pid`.
    pub fn hide(&mut self, pid: PatchId) -> Result<(), GeometryError> {
        self.patch_mut(pid)?.hidden = true;
        Ok(())
    }

    /// Reverse the winding of patch `pid`.
    pub fn flip(&mut self, pid: PatchId) -> Result<(), GeometryError> {
        self.patch_mut(pid)?.flip();
        Ok(())
    }

    /// Number of patches.
    pub fn num_patches(&self) -> usize {
        self.patches.len()
    }

    /// Number of subpatches over all patches.
    pub fn num_subpatches(&self) -> usize {
        self.patches.iter().map(|p| p.subpatches.len()).sum()
    }

    /// Append the patches and control points of `other`, remapping their
    /// indices. Returns the ID of the first appended patch.
    pub fn append(&mut self, other: &Geometry) -> PatchId {
        let cp_base = self.control_points.len() as u32;
        let p_base = self.patches.len();
        self.control_points.extend_from_slice(&other.control_points);
        for patch in &other.patches {
            let mut p = patch.clone();
            for c in &mut p.controls {
                *c += cp_base;
            }
            for n in p.neighbors.iter_mut().flatten() {
                *n += p_base;
            }
            self.patches.push(p);
        }
        p_base
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use metasurf_geom::PatchKind;
    use metasurf_math::Vec3;

    /// Unit cube with every edge creased, outward facing patches.
    pub(crate) fn creased_cube() -> Geometry {
        let mut g = Geometry::new();
        for z in [0.0, 1.0] {
            for (x, y) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
                g.add_control_point(Point3::new(x, y, z));
            }
        }
        let faces = [
            [0, 3, 2, 1],
            [4, 5, 6, 7],
            [0, 1, 5, 4],
            [1, 2, 6, 5],
            [2, 3, 7, 6],
            [3, 0, 4, 7],
        ];
        for [a, b, c, d] in faces {
            g.add_patch(a, b, c, d, 0xf).unwrap();
        }
        g.compute_neighbors();
        g
    }

    #[test]
    fn add_patch_validates_inputs() {
        let mut g = Geometry::new();
        let a = g.add_control_point(Point3::origin());
        assert_eq!(g.add_patch(a, a, a, 7, 0), Err(GeometryError::UnknownControlPoint(7)));
        assert_eq!(g.add_patch(a, a, a, a, 0x1f), Err(GeometryError::InvalidCreases(0x1f)));
        assert!(g.add_patch(a, a, a, a, 0).is_ok());
    }

    #[test]
    fn cube_neighbors_are_symmetric() {
        let g = creased_cube();
        for (pid, p) in g.patches.iter().enumerate() {
            for e in 0..4 {
                let n = p.neighbors[e].expect("closed cube has no open edge");
                let ne = p.neighbor_edges[e] as usize;
                assert_eq!(g.patches[n].neighbors[ne], Some(pid), "patch {pid} edge {e}");
                assert_eq!(g.patches[n].controls[ne], p.controls[(e + 1) % 4]);
            }
        }
    }

    #[test]
    fn closed_cube_evaluates_bicubic_faces() {
        let g = creased_cube();
        let top = g.evaluator(1);
        assert_eq!(top.kind(), PatchKind::Bicubic);
        let (p, n) = top.parameters(&Point2::new(0.25, 0.5));
        assert!((p - Point3::new(0.25, 0.5, 1.0)).norm() < 1e-9, "creased face stays flat: {p:?}");
        assert!((n - Vec3::z()).norm() < 1e-9);
    }

    #[test]
    fn open_patch_falls_back_to_bilinear() {
        let mut g = Geometry::new();
        for (x, y) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
            g.add_control_point(Point3::new(x, y, 0.0));
        }
        let p = g.add_patch(0, 1, 2, 3, 0).unwrap();
        assert_eq!(g.evaluator(p).kind(), PatchKind::Bilinear);
    }

    #[test]
    fn transformed_moves_controls_and_keeps_source() {
        let g = creased_cube();
        let moved = g.transformed(&Transform::translation(2.0, 0.0, 0.0));
        assert!((moved.control_points[0].x - 2.0).abs() < 1e-12);
        assert!(g.control_points[0].x.abs() < 1e-12);
        let mirrored = g.transformed(&Transform::scale(-1.0, 1.0, 1.0));
        assert!(mirrored.patches.iter().all(|p| p.flipped));
    }

    #[test]
    fn append_remaps_indices() {
        let mut a = creased_cube();
        let b = creased_cube();
        let first = a.append(&b);
        assert_eq!(first, 6);
        assert_eq!(a.patches[6].controls, [8, 11, 10, 9]);
        assert!(a.patches[6..].iter().all(|p| p.neighbors.iter().all(|n| n.unwrap() >= 6)));
    }
}
