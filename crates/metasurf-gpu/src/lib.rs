//! GPU upload of metasurf meshes.
//!
//! This crate defines the buffer contract between the tessellator and a
//! graphics backend:
//! - Interleaved vertex layout of stride 5 or 8 floats
//! - Index width chosen from the vertex count (8, 16 or 32 bits)
//! - Per-material index ranges
//!
//! and a wgpu implementation of the [`GpuBackend`] trait.

#![warn(missing_docs)]

mod backend;
mod context;
mod layout;
mod wgpu_backend;

pub use backend::GpuBackend;
pub use context::{GpuContext, GpuError};
pub use layout::{pack_indices, IndexFormat, MeshUpload, VertexAttribute, VertexLayout, VertexSemantic};
pub use wgpu_backend::{WgpuBackend, WgpuGeometry};
