//! Operation settings
//!
//! Every geometry operation takes its knobs from one of these structs so the
//! CLI (or any host application) can load them from a single JSON document.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be a finite positive number, got {value}")]
    NotPositive { field: &'static str, value: f32 },

    #[error("{field} must be finite, got {value}")]
    NotFinite { field: &'static str, value: f32 },
}

fn check_positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

/// Edge-length driven subdivision settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubdivisionConfig {
    /// Edges strictly longer than this are split at their midpoint
    pub max_edge_length: f32,
    /// Extra passes allowed after the first one
    pub max_depth: usize,
}

impl Default for SubdivisionConfig {
    fn default() -> Self {
        Self {
            max_edge_length: 0.1,
            max_depth: 4,
        }
    }
}

impl SubdivisionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_positive("max_edge_length", self.max_edge_length)
    }
}

/// Umbrella (Laplacian) smoothing settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Number of Jacobi passes
    pub iterations: u32,
    /// Regenerate flat normals once smoothing is done
    pub update_normals: bool,
    /// Keep vertices lying on a boundary edge in place
    pub lock_boundary: bool,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            iterations: 5,
            update_normals: true,
            lock_boundary: true,
        }
    }
}

/// Cotangent-weighted smoothing settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaubinConfig {
    /// Number of Jacobi passes
    pub iterations: u32,
    /// Fraction of the delta toward the weighted neighbour mean applied per pass
    pub step: f32,
    /// Added to `tan(angle)` before inverting it
    pub cotan_epsilon: f32,
    /// Regenerate flat normals once smoothing is done
    pub update_normals: bool,
    /// Replace vertex colors with the neighbourhood color variance
    pub write_color_variance: bool,
}

impl Default for TaubinConfig {
    fn default() -> Self {
        Self {
            iterations: 5,
            step: 0.25,
            cotan_epsilon: 1e-5,
            update_normals: true,
            write_color_variance: true,
        }
    }
}

impl TaubinConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_positive("step", self.step)?;
        if !self.cotan_epsilon.is_finite() {
            return Err(ConfigError::NotFinite {
                field: "cotan_epsilon",
                value: self.cotan_epsilon,
            });
        }
        Ok(())
    }
}

/// Vertex normal generation settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalConfig {
    /// 1-ring propagation passes for smooth normals
    pub smoothing_iterations: u32,
    /// Positions closer than this are treated as one vertex when merging seams
    pub merge_distance: f32,
}

impl Default for NormalConfig {
    fn default() -> Self {
        Self {
            smoothing_iterations: 0,
            merge_distance: 1e-6,
        }
    }
}

impl NormalConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_positive("merge_distance", self.merge_distance)
    }
}

/// What to emit for a triangle edge that has no opposite triangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjacencyPolicy {
    /// Refuse meshes with boundary or non-manifold edges
    #[default]
    Strict,
    /// Substitute the triangle's own opposite vertex
    Sentinel,
}

/// All geometry settings in one document
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    pub subdivision: SubdivisionConfig,
    pub smoothing: SmoothingConfig,
    pub taubin: TaubinConfig,
    pub normals: NormalConfig,
    pub adjacency: AdjacencyPolicy,
}

impl GeometryConfig {
    /// Check every section
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.subdivision.validate()?;
        self.taubin.validate()?;
        self.normals.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(GeometryConfig::default().validate().is_ok());
        assert_eq!(TaubinConfig::default().step, 0.25);
        assert_eq!(AdjacencyPolicy::default(), AdjacencyPolicy::Strict);
    }

    #[test]
    fn test_rejects_non_positive_threshold() {
        let config = SubdivisionConfig {
            max_edge_length: 0.0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::NotPositive { field: "max_edge_length", value: 0.0 })
        );

        let config = SubdivisionConfig {
            max_edge_length: f32::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "subdivision": { "max_edge_length": 0.5 }, "adjacency": "sentinel" }"#;
        let config: GeometryConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.subdivision.max_edge_length, 0.5);
        assert_eq!(config.subdivision.max_depth, 4);
        assert_eq!(config.adjacency, AdjacencyPolicy::Sentinel);
        assert_eq!(config.smoothing, SmoothingConfig::default());
    }
}
