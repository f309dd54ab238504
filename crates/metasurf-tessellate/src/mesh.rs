use metasurf_math::{project, Point2, Point3, Vec3};
use metasurf_topo::{Geometry, Patch, VertexId};
use serde::{Deserialize, Serialize};

use crate::{triangulate_polygon, triangulate_quad, VertexGrid};

/// Largest per-component difference of texture coordinates or normals
/// still considered the same vertex.
const ATTRIBUTE_EPSILON: f32 = 1e-6;

/// Mesh extraction settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshParams {
    /// Emit per-vertex normals (stride 8 instead of 5).
    pub normals: bool,
    /// Record the material ID of every triangle.
    pub face_infos: bool,
}

impl Default for MeshParams {
    fn default() -> Self {
        Self {
            normals: true,
            face_infos: false,
        }
    }
}

/// A run of indices drawn with one material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshRange {
    /// First index.
    pub start: u32,
    /// Number of indices.
    pub count: u32,
    /// Material ID of the patches in the run.
    pub material: u32,
}

/// Output triangle mesh of a geometry.
#[derive(Debug, Clone)]
pub struct SurfaceMesh {
    /// Interleaved `[x, y, z, u, v, (nx, ny, nz)]` per vertex.
    pub vertices: Vec<f32>,
    /// Floats per vertex, 5 or 8.
    pub stride: usize,
    /// Triangle indices into `vertices`.
    pub indices: Vec<u32>,
    /// Index ranges, one per material, in ascending material order.
    pub ranges: Vec<MeshRange>,
    /// Material ID of every triangle, when requested.
    pub face_infos: Vec<u32>,
    /// Axis-aligned bounds `[min, max]` of the vertex positions.
    pub bounds: Option<[[f32; 3]; 2]>,
}

impl SurfaceMesh {
    /// Create an empty mesh.
    pub fn new(normals: bool) -> Self {
        Self {
            vertices: Vec::new(),
            stride: if normals { 8 } else { 5 },
            indices: Vec::new(),
            ranges: Vec::new(),
            face_infos: Vec::new(),
            bounds: None,
        }
    }

    /// Number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.indices.len() / 3
    }

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len() / self.stride
    }

    /// Position of vertex `i`.
    pub fn position(&self, i: u32) -> [f32; 3] {
        let o = i as usize * self.stride;
        [self.vertices[o], self.vertices[o + 1], self.vertices[o + 2]]
    }

    /// Whether the mesh has per-vertex normals.
    pub fn has_normals(&self) -> bool {
        self.stride == 8
    }

    fn grow_bounds(&mut self, p: [f32; 3]) {
        let b = self.bounds.get_or_insert([p, p]);
        for i in 0..3 {
            b[0][i] = b[0][i].min(p[i]);
            b[1][i] = b[1][i].max(p[i]);
        }
    }
}

impl Default for SurfaceMesh {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Triangulate every visible subpatch and loop of `geometry`.
///
/// Patches are visited stably sorted by material, so each material owns
/// one contiguous [`MeshRange`]. Output vertices closer than twice the
/// geometry tolerance with equal texture coordinate and normal are
/// shared. The per-vertex scratch indices of every patch are reset
/// first, so repeated calls give identical meshes.
pub fn tessellate(geometry: &mut Geometry, params: &MeshParams) -> SurfaceMesh {
    let mut order: Vec<usize> = (0..geometry.patches.len()).collect();
    order.sort_by_key(|&p| geometry.patches[p].material);

    let mut builder = MeshBuilder {
        mesh: SurfaceMesh::new(params.normals),
        grid: VertexGrid::new(2.0 * geometry.tolerance.linear),
        params: *params,
    };

    let mut i = 0;
    while i < order.len() {
        let material = geometry.patches[order[i]].material;
        let start = builder.mesh.indices.len();
        while i < order.len() && geometry.patches[order[i]].material == material {
            builder.add_patch(&mut geometry.patches[order[i]]);
            i += 1;
        }
        let count = builder.mesh.indices.len() - start;
        if count > 0 {
            builder.mesh.ranges.push(MeshRange {
                start: start as u32,
                count: count as u32,
                material,
            });
        }
    }

    log::debug!(
        "tessellated {} patches into {} triangles, {} vertices",
        order.len(),
        builder.mesh.num_triangles(),
        builder.mesh.num_vertices()
    );
    builder.mesh
}

/// Triangles of a visible subpatch, grouped by polygon: the polygon's
/// vertex IDs and triangles indexing into them.
fn subpatch_polygons(patch: &Patch, sp: usize) -> Vec<(Vec<VertexId>, Vec<[usize; 3]>)> {
    let flip = patch.flipped;
    match patch.trimming(sp) {
        Some(t) if !t.loops.is_empty() => t
            .loops
            .iter()
            .filter(|l| !l.hidden)
            .map(|l| {
                let pts: Vec<Point2> = l.vertices.iter().map(|&v| project(&patch.vertices[v].pos, t.x(), t.y())).collect();
                (l.vertices.clone(), triangulate_polygon(&pts, &l.vertices, flip))
            })
            .collect(),
        _ => {
            let (ids, sides) = patch.boundary(&patch.subpatches[sp]);
            let pts: Vec<Point3> = ids.iter().map(|&v| patch.vertices[v].pos).collect();
            let tris = triangulate_quad(&pts, sides, &ids, flip);
            vec![(ids, tris)]
        }
    }
}

/// World-space triangles of the visible part of `patch`, wound like the
/// mesh output.
pub fn patch_triangles(patch: &Patch) -> Vec<[Point3; 3]> {
    if patch.hidden {
        return Vec::new();
    }
    let mut out = Vec::new();
    for sp in 0..patch.subpatches.len() {
        if patch.subpatches[sp].hidden {
            continue;
        }
        for (ids, tris) in subpatch_polygons(patch, sp) {
            out.extend(tris.iter().map(|t| t.map(|k| patch.vertices[ids[k]].pos)));
        }
    }
    out
}

struct MeshBuilder {
    mesh: SurfaceMesh,
    grid: VertexGrid,
    params: MeshParams,
}

impl MeshBuilder {
    fn add_patch(&mut self, patch: &mut Patch) {
        if patch.hidden {
            return;
        }
        patch.reset_indices();

        for sp in 0..patch.subpatches.len() {
            if patch.subpatches[sp].hidden {
                continue;
            }
            for (ids, tris) in subpatch_polygons(patch, sp) {
                for tri in tris {
                    for k in tri {
                        let index = self.vertex(patch, ids[k]);
                        self.mesh.indices.push(index);
                    }
                    if self.params.face_infos {
                        self.mesh.face_infos.push(patch.material);
                    }
                }
            }
        }
    }

    /// Output index of vertex `v`, emitting it on first use.
    fn vertex(&mut self, patch: &mut Patch, v: VertexId) -> u32 {
        if let Some(index) = patch.vertices[v].index {
            return index;
        }
        let vertex = &patch.vertices[v];
        let pos = vertex.pos;
        let uv = patch.texture_uv(&vertex.uv);
        let normal: Vec3 = if patch.flipped { -vertex.normal } else { vertex.normal };

        let mut attrs = vec![uv.x as f32, uv.y as f32];
        if self.params.normals {
            attrs.extend([normal.x as f32, normal.y as f32, normal.z as f32]);
        }

        let stride = self.mesh.stride;
        let stored = &self.mesh.vertices;
        let found = self.grid.find(&pos, |id| {
            let o = id as usize * stride + 3;
            stored[o..o + attrs.len()]
                .iter()
                .zip(&attrs)
                .all(|(a, b)| (a - b).abs() <= ATTRIBUTE_EPSILON)
        });

        let index = found.unwrap_or_else(|| {
            let id = self.mesh.num_vertices() as u32;
            let p = [pos.x as f32, pos.y as f32, pos.z as f32];
            self.mesh.vertices.extend(p);
            self.mesh.vertices.extend(&attrs);
            self.mesh.grow_bounds(p);
            self.grid.insert(pos, id);
            id
        });
        patch.vertices[v].index = Some(index);
        index
    }
}
