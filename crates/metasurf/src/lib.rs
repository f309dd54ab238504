#![warn(missing_docs)]

//! metasurf: curved-patch CSG and adaptive tessellation.
//!
//! A [`MetaSurface`] holds quad patches over a shared control point
//! array. Patches are subdivided adaptively until their chordal deviation
//! drops below the configured error, combined with union, difference and
//! intersection, and tessellated into an indexed mesh ready for the GPU.
//!
//! # Example
//!
//! ```rust,no_run
//! use metasurf::{MetaSurface, Point3};
//!
//! let a = MetaSurface::cuboid(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0))?;
//! let b = a.translate(0.5, 0.5, 0.5);
//! let mut result = &a - &b;
//! let mesh = result.to_mesh();
//! println!("{} triangles", mesh.num_triangles());
//! # Ok::<(), metasurf::SurfaceError>(())
//! ```

mod config;

use metasurf_booleans::{boolean_op, BooleanOp};
use metasurf_gpu::{GpuBackend, MeshUpload};
use thiserror::Error;

pub use config::SurfaceConfig;
pub use metasurf_booleans as booleans;
pub use metasurf_gpu as gpu;
pub use metasurf_math::{Point2, Point3, Tolerance, Transform, Vec3};
pub use metasurf_tessellate::{MeshParams, MeshRange, SurfaceMesh};
pub use metasurf_topo::{Geometry, GeometryError, Patch, SubdivisionParams};

/// Errors returned by the surface API.
#[derive(Debug, Error)]
pub enum SurfaceError {
    /// Invalid patch construction.
    #[error("geometry error: {0}")]
    Geometry(#[from] GeometryError),
    /// The configuration document could not be parsed.
    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),
    /// Upload to the GPU failed.
    #[error("GPU error: {0}")]
    Gpu(#[from] metasurf_gpu::GpuError),
}

/// A patch geometry with its subdivision and mesh settings.
///
/// Booleans subdivide their operands on demand and return a new surface
/// carrying the settings of the left operand. Removed surface is hidden,
/// never deleted, so results keep the patches of both operands.
#[derive(Debug, Clone, Default)]
pub struct MetaSurface {
    geometry: Geometry,
    config: SurfaceConfig,
}

impl MetaSurface {
    /// Wrap `geometry` with default settings.
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            config: SurfaceConfig::default(),
        }
    }

    /// Replace the settings.
    pub fn with_config(mut self, config: SurfaceConfig) -> Self {
        self.config = config;
        self
    }

    /// Build patches from quads of indices into `points`.
    ///
    /// `creases` applies to every edge of every face (bit `i` for edge
    /// `i`). Neighbors are linked through shared edges.
    pub fn from_quads(points: &[Point3], faces: &[[u32; 4]], creases: u8) -> Result<Self, SurfaceError> {
        let mut g = Geometry::new();
        for p in points {
            g.add_control_point(*p);
        }
        for &[a, b, c, d] in faces {
            g.add_patch(a, b, c, d, creases)?;
        }
        g.compute_neighbors();
        Ok(Self::new(g))
    }

    /// Unit square in the `z = 0` plane, facing `+z`.
    pub fn quad() -> Result<Self, SurfaceError> {
        let points = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        Self::from_quads(&points, &[[0, 1, 2, 3]], 0)
    }

    /// Axis-aligned box from `min` to `max` with every edge creased and
    /// outward facing patches.
    pub fn cuboid(min: Point3, max: Point3) -> Result<Self, SurfaceError> {
        let mut points = Vec::with_capacity(8);
        for z in [min.z, max.z] {
            for (x, y) in [(min.x, min.y), (max.x, min.y), (max.x, max.y), (min.x, max.y)] {
                points.push(Point3::new(x, y, z));
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
        Self::from_quads(&points, &faces, 0xf)
    }

    /// The patch geometry.
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Mutable access to the patch geometry.
    pub fn geometry_mut(&mut self) -> &mut Geometry {
        &mut self.geometry
    }

    /// Consume the surface, returning its geometry.
    pub fn into_geometry(self) -> Geometry {
        self.geometry
    }

    /// The current settings.
    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    /// Whether every patch has a vertex grid.
    pub fn is_subdivided(&self) -> bool {
        self.geometry.patches.iter().all(Patch::is_subdivided)
    }

    /// Subdivide the patches that have no grid yet.
    pub fn subdivide(&mut self) {
        if self.is_subdivided() {
            return;
        }
        self.geometry.subdivide(&self.config.subdivision);
        log::debug!(
            "subdivided {} patches into {} subpatches",
            self.geometry.num_patches(),
            self.geometry.num_subpatches()
        );
    }

    fn subdivided(&self) -> Geometry {
        let mut s = self.clone();
        s.subdivide();
        s.geometry
    }

    fn boolean(&self, other: &MetaSurface, op: BooleanOp) -> MetaSurface {
        let geometry = boolean_op(&self.subdivided(), &other.subdivided(), op);
        MetaSurface {
            geometry,
            config: self.config,
        }
    }

    /// Union of `self` and `other`.
    pub fn union(&self, other: &MetaSurface) -> MetaSurface {
        self.boolean(other, BooleanOp::Union)
    }

    /// `self` minus `other`.
    pub fn difference(&self, other: &MetaSurface) -> MetaSurface {
        self.boolean(other, BooleanOp::Difference)
    }

    /// Volume shared by `self` and `other`.
    pub fn intersection(&self, other: &MetaSurface) -> MetaSurface {
        self.boolean(other, BooleanOp::Intersection)
    }

    /// Copy under `t`.
    pub fn transformed(&self, t: &Transform) -> MetaSurface {
        MetaSurface {
            geometry: self.geometry.transformed(t),
            config: self.config,
        }
    }

    /// Copy moved by `(x, y, z)`.
    pub fn translate(&self, x: f64, y: f64, z: f64) -> MetaSurface {
        self.transformed(&Transform::translation(x, y, z))
    }

    /// Subdivide if needed and tessellate the visible surface.
    pub fn to_mesh(&mut self) -> SurfaceMesh {
        self.subdivide();
        metasurf_tessellate::tessellate(&mut self.geometry, &self.config.mesh)
    }

    /// Tessellate and hand the buffers to `backend`.
    pub fn upload<B: GpuBackend>(&mut self, backend: &B) -> Result<B::Geometry, SurfaceError> {
        let mesh = self.to_mesh();
        let upload = MeshUpload::from_mesh(&mesh)?;
        Ok(backend.create_geometry(&upload)?)
    }
}

// =============================================================================
// Operator overloads
// =============================================================================

impl std::ops::Add for &MetaSurface {
    type Output = MetaSurface;
    fn add(self, rhs: &MetaSurface) -> MetaSurface {
        self.union(rhs)
    }
}

impl std::ops::Sub for &MetaSurface {
    type Output = MetaSurface;
    fn sub(self, rhs: &MetaSurface) -> MetaSurface {
        self.difference(rhs)
    }
}

impl std::ops::BitAnd for &MetaSurface {
    type Output = MetaSurface;
    fn bitand(self, rhs: &MetaSurface) -> MetaSurface {
        self.intersection(rhs)
    }
}

// =============================================================================
// Mesh inspection
// =============================================================================

impl MetaSurface {
    /// Signed volume of the tessellated surface (divergence theorem).
    ///
    /// Positive for closed surfaces whose patches face outward.
    pub fn volume(&mut self) -> f64 {
        let mesh = self.to_mesh();
        let mut vol = 0.0;
        for tri in mesh.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| {
                let p = mesh.position(i);
                Vec3::new(p[0] as f64, p[1] as f64, p[2] as f64)
            });
            vol += a.dot(&b.cross(&c));
        }
        vol / 6.0
    }

    /// Number of triangles in the tessellated surface.
    pub fn num_triangles(&mut self) -> usize {
        self.to_mesh().num_triangles()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_cube() -> MetaSurface {
        MetaSurface::cuboid(Point3::origin(), Point3::new(1.0, 1.0, 1.0)).unwrap()
    }

    #[test]
    fn flat_quad_is_two_triangles() {
        let config = SurfaceConfig {
            subdivision: SubdivisionParams {
                geometric_error: 1.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut quad = MetaSurface::quad().unwrap().with_config(config);
        quad.subdivide();
        assert_eq!(quad.geometry().num_subpatches(), 1);
        let mesh = quad.to_mesh();
        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.indices.len(), 6);
    }

    #[test]
    fn bad_quad_is_rejected() {
        let points = [Point3::origin(); 3];
        let err = MetaSurface::from_quads(&points, &[[0, 1, 2, 3]], 0).unwrap_err();
        assert!(matches!(err, SurfaceError::Geometry(GeometryError::UnknownControlPoint(3))));
    }

    #[test]
    fn cuboid_volume() {
        let mut b = MetaSurface::cuboid(Point3::new(-1.0, 0.0, 0.0), Point3::new(1.0, 0.5, 3.0)).unwrap();
        assert_relative_eq!(b.volume(), 3.0, epsilon = 1e-5);
    }

    #[test]
    fn mirrored_cuboid_stays_outward() {
        let mut m = unit_cube().transformed(&Transform::scale(-1.0, 1.0, 1.0));
        assert_relative_eq!(m.volume(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn operators_match_methods() {
        let a = unit_cube();
        let b = a.translate(0.4, 0.3, 0.45);
        let overlap = 0.6 * 0.7 * 0.55;

        let mut union = &a + &b;
        let mut diff = &a - &b;
        let mut isect = &a & &b;
        assert_relative_eq!(union.volume(), 2.0 - overlap, epsilon = 1e-4);
        assert_relative_eq!(diff.volume(), 1.0 - overlap, epsilon = 1e-4);
        assert_relative_eq!(isect.volume(), overlap, epsilon = 1e-4);
        assert_eq!(union.geometry().num_patches(), 12);
    }

    #[test]
    fn operands_are_left_untouched() {
        let a = unit_cube();
        let b = a.translate(0.5, 0.5, 0.5);
        let _ = a.difference(&b);
        assert!(!a.is_subdivided(), "boolean subdivides a copy");
        assert!(a.geometry().patches.iter().all(|p| !p.hidden));
    }

    /// Backend that keeps the uploaded bytes in memory.
    struct RecordingBackend;

    impl GpuBackend for RecordingBackend {
        type Buffer = Vec<u8>;
        type Geometry = MeshUpload;

        fn create_vertex_buffer(&self, bytes: &[u8], _: &gpu::VertexLayout) -> Result<Vec<u8>, gpu::GpuError> {
            Ok(bytes.to_vec())
        }

        fn create_index_buffer(&self, bytes: &[u8], _: gpu::IndexFormat) -> Result<Vec<u8>, gpu::GpuError> {
            Ok(bytes.to_vec())
        }

        fn create_geometry(&self, upload: &MeshUpload) -> Result<MeshUpload, gpu::GpuError> {
            Ok(upload.clone())
        }
    }

    #[test]
    fn upload_packs_narrow_indices() {
        let mut cube = unit_cube();
        let upload = cube.upload(&RecordingBackend).unwrap();
        let mesh = cube.to_mesh();
        assert_eq!(upload.index_format, gpu::IndexFormat::U8, "{} vertices", mesh.num_vertices());
        assert_eq!(upload.indices(), mesh.indices);
        assert_eq!(upload.layout.stride, 32);
        assert_eq!(upload.ranges, mesh.ranges);
    }

    #[test]
    fn result_keeps_left_config() {
        let config = SurfaceConfig {
            mesh: MeshParams {
                normals: false,
                ..Default::default()
            },
            ..Default::default()
        };
        let a = unit_cube().with_config(config);
        let b = unit_cube().translate(3.0, 0.0, 0.0);
        let mut u = a.union(&b);
        assert_eq!(u.config().mesh, config.mesh);
        let mesh = u.to_mesh();
        assert_eq!(mesh.stride, 5);
        assert_relative_eq!(u.volume(), 2.0, epsilon = 1e-5);
    }
}
