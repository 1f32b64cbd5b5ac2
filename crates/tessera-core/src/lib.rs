//! # Tessera Core
//!
//! Foundation shared by the Tessera mesh crates:
//! - **Math**: glam re-exports, bounding boxes and spheres
//! - **Config**: serializable settings for every geometry operation
//! - **Change tracking**: explicit dirty values instead of a global upload flag

pub mod change;
pub mod config;
pub mod math;

pub use change::{Dirty, UploadState};
pub use config::{
    AdjacencyPolicy, ConfigError, GeometryConfig, NormalConfig, SmoothingConfig,
    SubdivisionConfig, TaubinConfig,
};
pub use math::{Aabb, BoundingSphere};
