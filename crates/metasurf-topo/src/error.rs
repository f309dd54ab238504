use thiserror::Error;

use crate::PatchId;

/// Errors raised while authoring a geometry.
///
/// Only construction can fail; subdivision, trimming and triangulation
/// degrade locally instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GeometryError {
    /// A patch references a control point that does not exist.
    #[error("unknown control point {0}")]
    UnknownControlPoint(u32),

    /// A patch ID is out of range.
    #[error("unknown patch {0}")]
    UnknownPatch(PatchId),

    /// A patch edge index is not in `0..4`.
    #[error("invalid patch edge {0}")]
    InvalidEdge(usize),

    /// Crease bits outside the low nibble.
    #[error("invalid crease mask {0:#x}")]
    InvalidCreases(u8),
}
