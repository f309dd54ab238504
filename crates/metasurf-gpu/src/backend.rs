use crate::{GpuError, IndexFormat, MeshUpload, VertexLayout};

/// A graphics API able to hold mesh buffers.
pub trait GpuBackend {
    /// Device buffer handle.
    type Buffer;
    /// Ready-to-draw geometry handle.
    type Geometry;

    /// Upload interleaved vertex bytes laid out as `layout`.
    fn create_vertex_buffer(&self, bytes: &[u8], layout: &VertexLayout) -> Result<Self::Buffer, GpuError>;

    /// Upload packed indices of width `format`.
    fn create_index_buffer(&self, bytes: &[u8], format: IndexFormat) -> Result<Self::Buffer, GpuError>;

    /// Upload a whole mesh with its material ranges.
    fn create_geometry(&self, upload: &MeshUpload) -> Result<Self::Geometry, GpuError>;
}
