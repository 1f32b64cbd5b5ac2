//! # Tessera Mesh
//!
//! Indexed triangle mesh storage and the operations that rewrite its topology.
//!
//! ## Modules
//! - [`mesh`] - [`Mesh`], the owner of positions, optional per-vertex
//!   attributes and the triangle list
//! - [`adjacency`] - directed edge map, GPU adjacency index buffers, 1-ring
//!   and vertex/triangle incidence
//! - [`subdivide`] - edge-length driven midpoint subdivision
//! - [`normals`] - flat, smooth and seam-merged vertex normals
//! - [`smoothing`] - Laplacian and cotangent-weighted position smoothing
//! - [`components`] - connected component flood fill
//! - [`topology`] - double-sided meshes, submesh extraction, merging
//! - [`generators`] - deterministic test shapes

pub mod adjacency;
pub mod components;
pub mod generators;
pub mod mesh;
pub mod normals;
pub mod smoothing;
pub mod subdivide;
pub mod topology;

pub use adjacency::{EdgeMap, VertexNeighbors, VertexTriangles, index_buffer};
pub use mesh::{Attributes, Mesh, SphereCenter};
pub use subdivide::{SubdivisionStats, subdivide, subdivide_with_stats};
pub use tessera_core::{Dirty, UploadState};
pub use topology::{SubMesh, VertexSelection};

use thiserror::Error;

/// Geometry errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Triangle {triangle} references vertex {index} but the mesh has {vertex_count} vertices")]
    IndexOutOfRange {
        triangle: usize,
        index: u32,
        vertex_count: usize,
    },

    #[error("Triangle {triangle} repeats a vertex: {indices:?}")]
    DegenerateTriangle { triangle: usize, indices: [u32; 3] },

    #[error("Attribute '{attribute}' has {len} entries for {vertex_count} vertices")]
    AttributeLength {
        attribute: &'static str,
        len: usize,
        vertex_count: usize,
    },

    #[error("{len} material ids for {triangle_count} triangles")]
    MaterialLength { len: usize, triangle_count: usize },

    #[error("Edge ({0}, {1}) has no opposite triangle")]
    BoundaryEdge(u32, u32),

    #[error("Directed edge ({0}, {1}) is used by more than one triangle")]
    NonManifoldEdge(u32, u32),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] tessera_core::ConfigError),
}

/// Result type for geometry operations
pub type GeometryResult<T> = Result<T, GeometryError>;
