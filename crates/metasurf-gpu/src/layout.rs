//! Vertex and index buffer layout of tessellated meshes.

use metasurf_tessellate::{MeshRange, SurfaceMesh};

use crate::GpuError;

/// Width of the indices in an index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexFormat {
    /// 8-bit indices, for fewer than 256 vertices.
    U8,
    /// 16-bit indices, for fewer than 65536 vertices.
    U16,
    /// 32-bit indices.
    U32,
}

impl IndexFormat {
    /// Narrowest format able to address `count` vertices.
    pub fn for_vertex_count(count: usize) -> Self {
        if count < 1 << 8 {
            IndexFormat::U8
        } else if count < 1 << 16 {
            IndexFormat::U16
        } else {
            IndexFormat::U32
        }
    }

    /// Bytes per index.
    pub fn size(self) -> usize {
        match self {
            IndexFormat::U8 => 1,
            IndexFormat::U16 => 2,
            IndexFormat::U32 => 4,
        }
    }
}

/// Pack `indices` into little-endian bytes of width `format`.
///
/// Indices must fit the format; use [`IndexFormat::for_vertex_count`].
pub fn pack_indices(indices: &[u32], format: IndexFormat) -> Vec<u8> {
    match format {
        IndexFormat::U8 => indices.iter().map(|&i| i as u8).collect(),
        IndexFormat::U16 => {
            let narrow: Vec<u16> = indices.iter().map(|&i| i as u16).collect();
            bytemuck::cast_slice(&narrow).to_vec()
        }
        IndexFormat::U32 => bytemuck::cast_slice(indices).to_vec(),
    }
}

/// Meaning of a vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexSemantic {
    /// Position, 3 floats.
    Position,
    /// Texture coordinate, 2 floats.
    TexCoord,
    /// Normal, 3 floats.
    Normal,
}

/// One attribute of an interleaved vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    /// What the attribute holds.
    pub semantic: VertexSemantic,
    /// Byte offset inside the vertex.
    pub offset: usize,
    /// Number of `f32` components.
    pub components: usize,
}

/// Interleaved vertex layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexLayout {
    /// Bytes per vertex.
    pub stride: usize,
    /// Attributes in buffer order.
    pub attributes: Vec<VertexAttribute>,
}

impl VertexLayout {
    /// Layout of a mesh with `floats` floats per vertex: position and
    /// texture coordinate, plus the normal when `floats` is 8.
    pub fn for_stride(floats: usize) -> Result<Self, GpuError> {
        let f = std::mem::size_of::<f32>();
        let mut attributes = vec![
            VertexAttribute {
                semantic: VertexSemantic::Position,
                offset: 0,
                components: 3,
            },
            VertexAttribute {
                semantic: VertexSemantic::TexCoord,
                offset: 3 * f,
                components: 2,
            },
        ];
        match floats {
            5 => {}
            8 => attributes.push(VertexAttribute {
                semantic: VertexSemantic::Normal,
                offset: 5 * f,
                components: 3,
            }),
            other => return Err(GpuError::UnsupportedStride(other)),
        }
        Ok(Self {
            stride: floats * f,
            attributes,
        })
    }
}

/// Everything a backend needs to create a drawable mesh.
#[derive(Debug, Clone)]
pub struct MeshUpload {
    /// Vertex layout.
    pub layout: VertexLayout,
    /// Interleaved vertex bytes.
    pub vertex_bytes: Vec<u8>,
    /// Index width.
    pub index_format: IndexFormat,
    /// Packed index bytes.
    pub index_bytes: Vec<u8>,
    /// Number of indices.
    pub index_count: usize,
    /// Per-material index ranges.
    pub ranges: Vec<MeshRange>,
}

impl MeshUpload {
    /// Pack `mesh` with the narrowest index format it allows.
    pub fn from_mesh(mesh: &SurfaceMesh) -> Result<Self, GpuError> {
        let layout = VertexLayout::for_stride(mesh.stride)?;
        let index_format = IndexFormat::for_vertex_count(mesh.num_vertices());
        Ok(Self {
            layout,
            vertex_bytes: bytemuck::cast_slice(&mesh.vertices).to_vec(),
            index_format,
            index_bytes: pack_indices(&mesh.indices, index_format),
            index_count: mesh.indices.len(),
            ranges: mesh.ranges.clone(),
        })
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertex_bytes.len() / self.layout.stride
    }

    /// Indices widened back to 32 bits.
    pub fn indices(&self) -> Vec<u32> {
        match self.index_format {
            IndexFormat::U8 => self.index_bytes.iter().map(|&b| b as u32).collect(),
            IndexFormat::U16 => self
                .index_bytes
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]) as u32)
                .collect(),
            IndexFormat::U32 => self
                .index_bytes
                .chunks_exact(4)
                .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        }
    }
}
