//! Subdivision and meshing settings.

use metasurf_tessellate::MeshParams;
use metasurf_topo::SubdivisionParams;
use serde::{Deserialize, Serialize};

use crate::SurfaceError;

/// Settings applied by a [`MetaSurface`](crate::MetaSurface).
///
/// ```toml
/// [subdivision]
/// geometric_error = 0.01
///
/// [mesh]
/// normals = false
/// ```
///
/// Missing tables and keys keep their defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    /// Adaptive subdivision.
    pub subdivision: SubdivisionParams,
    /// Mesh output.
    pub mesh: MeshParams,
}

impl SurfaceConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, SurfaceError> {
        Ok(toml::from_str(s)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_document_keeps_defaults() {
        let config = SurfaceConfig::from_toml_str(
            r#"
            [subdivision]
            geometric_error = 0.01

            [mesh]
            normals = false
            "#,
        )
        .unwrap();
        assert_eq!(config.subdivision.geometric_error, 0.01);
        assert_eq!(
            config.subdivision.displacement_precision,
            SubdivisionParams::default().displacement_precision
        );
        assert!(!config.mesh.normals);
        assert!(!config.mesh.face_infos);
    }

    #[test]
    fn empty_document_is_default() {
        assert_eq!(SurfaceConfig::from_toml_str("").unwrap(), SurfaceConfig::default());
    }

    #[test]
    fn bad_value_is_reported() {
        let err = SurfaceConfig::from_toml_str("[subdivision]\ngeometric_error = \"fine\"").unwrap_err();
        assert!(matches!(err, SurfaceError::Config(_)), "{err}");
    }
}
