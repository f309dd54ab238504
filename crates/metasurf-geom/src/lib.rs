#![warn(missing_docs)]

//! Parametric patch evaluation for the metasurf engine.
//!
//! A patch evaluator maps a `(u, v)` pair in `[0,1]²` to a world-space
//! position and unit normal. Evaluators are pure: the subdivider queries
//! them any number of times without side effects.
//!
//! Two evaluators are provided:
//! - [`BicubicPatch`], built from the one-ring of control points around
//!   each patch corner, with crease handling;
//! - [`BilinearPatch`], the fallback for open patches whose corner rings
//!   do not close.
//!
//! The [`displacement`] module adds the raster used by
//! displacement-driven subdivision.

mod bicubic;
mod bilinear;
pub mod displacement;

pub use bicubic::{BicubicPatch, CornerRing, MAX_VALENCE};
pub use bilinear::BilinearPatch;
pub use displacement::{Displacement, DisplacementImage, SampleContext, SplitDecision, UvMapping};

use metasurf_math::{Point2, Point3, Vec3};

// =============================================================================
// Evaluator trait
// =============================================================================

/// The kind of a patch evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchKind {
    /// Four-corner interpolation.
    Bilinear,
    /// Sixteen-point Bézier patch built from corner rings.
    Bicubic,
}

/// A parametric quad patch.
pub trait ParametricPatch: std::fmt::Debug {
    /// Position and unit normal at `uv`.
    fn parameters(&self, uv: &Point2) -> (Point3, Vec3);

    /// Position at `uv`.
    fn position(&self, uv: &Point2) -> Point3 {
        self.parameters(uv).0
    }

    /// The kind of this evaluator.
    fn kind(&self) -> PatchKind;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trait_objects_dispatch() {
        let patches: Vec<Box<dyn ParametricPatch>> = vec![Box::new(BilinearPatch::new([
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ]))];
        for p in &patches {
            assert_eq!(p.kind(), PatchKind::Bilinear);
            let pos = p.position(&Point2::new(0.5, 0.5));
            assert!((pos - Point3::new(0.5, 0.5, 0.0)).norm() < 1e-12);
        }
    }
}
