//! wgpu implementation of [`GpuBackend`].

use metasurf_tessellate::MeshRange;
use wgpu::util::DeviceExt;

use crate::{pack_indices, GpuBackend, GpuContext, GpuError, IndexFormat, MeshUpload, VertexLayout, VertexSemantic};

/// Buffers of an uploaded mesh.
pub struct WgpuGeometry {
    /// Interleaved vertices.
    pub vertex_buffer: wgpu::Buffer,
    /// Indices, 16 or 32 bits wide.
    pub index_buffer: wgpu::Buffer,
    /// Width of `index_buffer`.
    pub index_format: wgpu::IndexFormat,
    /// Number of indices.
    pub index_count: u32,
    /// Vertex layout of `vertex_buffer`.
    pub layout: VertexLayout,
    /// Per-material index ranges.
    pub ranges: Vec<MeshRange>,
}

impl WgpuGeometry {
    /// Attributes for a render pipeline; shader locations follow
    /// buffer order.
    pub fn vertex_attributes(&self) -> Vec<wgpu::VertexAttribute> {
        self.layout
            .attributes
            .iter()
            .enumerate()
            .map(|(location, a)| wgpu::VertexAttribute {
                format: match a.semantic {
                    VertexSemantic::TexCoord => wgpu::VertexFormat::Float32x2,
                    VertexSemantic::Position | VertexSemantic::Normal => wgpu::VertexFormat::Float32x3,
                },
                offset: a.offset as u64,
                shader_location: location as u32,
            })
            .collect()
    }
}

/// Mesh upload through a wgpu device.
pub struct WgpuBackend {
    ctx: GpuContext,
}

impl WgpuBackend {
    /// Use an existing context.
    pub fn new(ctx: GpuContext) -> Self {
        Self { ctx }
    }

    /// The underlying context.
    pub fn context(&self) -> &GpuContext {
        &self.ctx
    }

    fn device_format(format: IndexFormat) -> wgpu::IndexFormat {
        match format {
            // No 8-bit index buffers on the device.
            IndexFormat::U8 | IndexFormat::U16 => wgpu::IndexFormat::Uint16,
            IndexFormat::U32 => wgpu::IndexFormat::Uint32,
        }
    }
}

impl GpuBackend for WgpuBackend {
    type Buffer = wgpu::Buffer;
    type Geometry = WgpuGeometry;

    fn create_vertex_buffer(&self, bytes: &[u8], layout: &VertexLayout) -> Result<wgpu::Buffer, GpuError> {
        if bytes.len() % layout.stride != 0 {
            return Err(GpuError::UnsupportedStride(layout.stride / std::mem::size_of::<f32>()));
        }
        Ok(self.ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Surface Vertex Buffer"),
            contents: bytes,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        }))
    }

    fn create_index_buffer(&self, bytes: &[u8], format: IndexFormat) -> Result<wgpu::Buffer, GpuError> {
        let widened;
        let contents = if format == IndexFormat::U8 {
            let wide: Vec<u32> = bytes.iter().map(|&b| b as u32).collect();
            widened = pack_indices(&wide, IndexFormat::U16);
            &widened[..]
        } else {
            bytes
        };
        // Buffer sizes must be 4-byte aligned.
        let mut padded = contents.to_vec();
        padded.resize(contents.len().next_multiple_of(4), 0);
        Ok(self.ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Surface Index Buffer"),
            contents: &padded,
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
        }))
    }

    fn create_geometry(&self, upload: &MeshUpload) -> Result<WgpuGeometry, GpuError> {
        let vertex_buffer = self.create_vertex_buffer(&upload.vertex_bytes, &upload.layout)?;
        let index_buffer = self.create_index_buffer(&upload.index_bytes, upload.index_format)?;
        log::debug!(
            "uploaded {} vertices, {} indices as {:?}",
            upload.vertex_count(),
            upload.index_count,
            upload.index_format
        );
        Ok(WgpuGeometry {
            vertex_buffer,
            index_buffer,
            index_format: Self::device_format(upload.index_format),
            index_count: upload.index_count as u32,
            layout: upload.layout.clone(),
            ranges: upload.ranges.clone(),
        })
    }
}
