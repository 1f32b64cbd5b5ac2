//! # Tessera CLI
//!
//! Command-line front end for the Tessera mesh engine. Loads a mesh from a
//! JSON dump (or generates a test shape), runs one geometry operation and
//! prints a JSON report.
//!
//! ## Commands
//! - `info` - Summarize the mesh
//! - `subdivide` - Split long edges
//! - `normals` - Regenerate vertex normals
//! - `smooth` - Laplacian or cotangent-weighted smoothing
//! - `adjacency` - Build the GPU index buffer
//! - `components` - List connected components
//! - `double-sided` - Duplicate every face with reversed winding
//! - `extract` - Keep or remove a list of vertices
//! - `clean` - Drop small connected components

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tessera_core::{AdjacencyPolicy, Dirty, GeometryConfig, UploadState};
use tessera_mesh::generators::{cube, quad_grid, uv_sphere};
use tessera_mesh::{EdgeMap, Mesh, VertexSelection, index_buffer, subdivide_with_stats};

/// Tessera mesh engine CLI
#[derive(Parser)]
#[command(name = "tessera")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Mesh to load (JSON dump of a mesh)
    #[arg(short, long, conflicts_with = "shape")]
    pub input: Option<PathBuf>,

    /// Generated shape used when no input is given
    #[arg(short, long, value_enum, default_value_t = Shape::Cube)]
    pub shape: Shape,

    /// Resolution of the generated shape
    #[arg(short, long, default_value = "16")]
    pub resolution: u32,

    /// Geometry settings (JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write the resulting mesh here (JSON)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Built-in test shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Shape {
    Cube,
    Grid,
    Sphere,
}

/// Normal generation flavours
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NormalMode {
    Flat,
    Smooth,
    Disconnected,
}

/// Smoothing flavours
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SmoothMethod {
    Laplacian,
    Taubin,
}

/// Boundary handling for adjacency buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Policy {
    Strict,
    Sentinel,
}

impl From<Policy> for AdjacencyPolicy {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::Strict => AdjacencyPolicy::Strict,
            Policy::Sentinel => AdjacencyPolicy::Sentinel,
        }
    }
}

/// CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Summarize the mesh
    Info,

    /// Split edges longer than a threshold
    Subdivide {
        /// Maximum edge length
        #[arg(short = 'l', long)]
        max_edge_length: Option<f32>,

        /// Extra passes after the first one
        #[arg(short = 'd', long)]
        max_depth: Option<usize>,
    },

    /// Regenerate vertex normals
    Normals {
        /// Generation mode
        #[arg(short, long, value_enum, default_value_t = NormalMode::Smooth)]
        mode: NormalMode,

        /// Propagation passes for smooth modes
        #[arg(short = 'n', long)]
        iterations: Option<u32>,
    },

    /// Smooth vertex positions
    Smooth {
        /// Smoothing method
        #[arg(short, long, value_enum, default_value_t = SmoothMethod::Laplacian)]
        method: SmoothMethod,

        /// Number of passes
        #[arg(short = 'n', long)]
        iterations: Option<u32>,

        /// Let boundary vertices move (Laplacian only)
        #[arg(long)]
        unlock_boundary: bool,
    },

    /// Build the index buffer, with adjacency when a policy is given
    Adjacency {
        /// Boundary policy
        #[arg(short, long, value_enum)]
        policy: Option<Policy>,

        /// Plain three-index triangles
        #[arg(long, conflicts_with = "policy")]
        plain: bool,
    },

    /// List connected components
    Components,

    /// Duplicate every face with reversed winding
    DoubleSided,

    /// Keep or remove a list of vertices
    Extract {
        /// Vertex ids
        #[arg(required = true, num_args = 1..)]
        ids: Vec<u32>,

        /// Remove the listed vertices instead of keeping them
        #[arg(long)]
        remove: bool,
    },

    /// Drop small connected components
    Clean {
        /// Components with fewer vertices are dropped
        #[arg(short, long, default_value = "3")]
        min_vertices: usize,

        /// Keep only the largest component
        #[arg(long, conflicts_with = "min_vertices")]
        largest: bool,
    },
}

/// Shape of a mesh, as printed in reports
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeshSummary {
    pub vertices: usize,
    pub triangles: usize,
    pub attributes: Vec<String>,
    pub bounds: Option<[[f32; 3]; 2]>,
    pub mean_edge_length: Option<f32>,
    pub components: usize,
    pub closed: bool,
    pub manifold: bool,
}

impl MeshSummary {
    pub fn of(mesh: &Mesh) -> Self {
        let edges = EdgeMap::build(mesh);
        let aabb = mesh.bounding_box();
        Self {
            vertices: mesh.vertex_count(),
            triangles: mesh.triangle_count(),
            attributes: mesh
                .attributes()
                .iter_names()
                .map(|(name, _)| name.to_lowercase())
                .collect(),
            bounds: (!aabb.is_empty()).then(|| [aabb.min.to_array(), aabb.max.to_array()]),
            mean_edge_length: mesh.mean_edge_length(),
            components: mesh.components().len(),
            closed: !edges.is_empty() && edges.is_closed(),
            manifold: !edges.is_empty() && edges.is_manifold(),
        }
    }
}

/// Result of one command
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub command: &'static str,
    /// Buffers would need a re-upload
    pub changed: bool,
    pub before: MeshSummary,
    pub after: MeshSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_sizes: Option<Vec<usize>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complementary_vertices: Option<Vec<u32>>,
}

/// Parse and validate a geometry config document
pub fn parse_config(text: &str) -> Result<GeometryConfig> {
    let config: GeometryConfig = serde_json::from_str(text).context("Malformed geometry config")?;
    config.validate()?;
    Ok(config)
}

fn load_config(path: Option<&Path>) -> Result<GeometryConfig> {
    let Some(path) = path else {
        return Ok(GeometryConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    parse_config(&text).with_context(|| format!("Invalid config {}", path.display()))
}

fn load_mesh(cli: &Cli, state: &mut UploadState) -> Result<Mesh> {
    let Some(path) = &cli.input else {
        let n = cli.resolution.max(1);
        log::info!("Generating {:?} at resolution {}", cli.shape, n);
        return Ok(match cli.shape {
            Shape::Cube => cube(),
            Shape::Grid => quad_grid(n, n, 1.0, 1.0),
            Shape::Sphere => uv_sphere(n, (n / 2).max(2), 1.0),
        });
    };

    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut mesh: Mesh = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse mesh {}", path.display()))?;
    if let Err(e) = mesh.validate() {
        log::warn!("{}: {}", path.display(), e);
        state.mark(mesh.sanitize());
    }
    log::info!(
        "Loaded {} ({} vertices, {} triangles)",
        path.display(),
        mesh.vertex_count(),
        mesh.triangle_count()
    );
    Ok(mesh)
}

fn save_mesh(mesh: &Mesh, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), mesh)
        .with_context(|| format!("Failed to write mesh {}", path.display()))?;
    log::info!("Wrote {}", path.display());
    Ok(())
}

/// Run `command` on `mesh` in place
pub fn apply(
    command: &Commands,
    mesh: &mut Mesh,
    config: &GeometryConfig,
    state: &mut UploadState,
) -> Result<Report> {
    let before = MeshSummary::of(mesh);
    let mut index_count = None;
    let mut component_sizes = None;
    let mut complementary_vertices = None;

    let name = match command {
        Commands::Info => "info",

        Commands::Subdivide { max_edge_length, max_depth } => {
            let mut settings = config.subdivision;
            settings.max_edge_length = max_edge_length.unwrap_or(settings.max_edge_length);
            settings.max_depth = max_depth.unwrap_or(settings.max_depth);
            let (refined, stats) = subdivide_with_stats(mesh, &settings)?;
            log::info!(
                "Split {} edge(s) in {} pass(es): +{} vertices, +{} triangles",
                stats.split_edges,
                stats.passes,
                stats.vertices_added,
                stats.triangles_added
            );
            state.mark(Dirty::from_changed(refined != *mesh));
            *mesh = refined;
            "subdivide"
        }

        Commands::Normals { mode, iterations } => {
            let mut settings = config.normals;
            settings.smoothing_iterations = iterations.unwrap_or(settings.smoothing_iterations);
            let change = match mode {
                NormalMode::Flat => mesh.generate_normals(),
                NormalMode::Smooth => mesh.generate_smooth_normals(settings.smoothing_iterations),
                NormalMode::Disconnected => mesh.generate_smooth_normals_disconnected(&settings)?,
            };
            state.mark(change);
            "normals"
        }

        Commands::Smooth { method, iterations, unlock_boundary } => {
            let change = match method {
                SmoothMethod::Laplacian => {
                    let mut settings = config.smoothing;
                    settings.iterations = iterations.unwrap_or(settings.iterations);
                    settings.lock_boundary &= !unlock_boundary;
                    mesh.laplacian_smoothing(&settings)
                }
                SmoothMethod::Taubin => {
                    let mut settings = config.taubin;
                    settings.iterations = iterations.unwrap_or(settings.iterations);
                    mesh.adaptive_taubin_smoothing(&settings)?
                }
            };
            state.mark(change);
            "smooth"
        }

        Commands::Adjacency { policy, plain } => {
            let policy = match (policy, plain) {
                (_, true) => None,
                (Some(policy), false) => Some((*policy).into()),
                (None, false) => Some(config.adjacency),
            };
            let indices = index_buffer(mesh, policy)?;
            log::info!("Index buffer: {} indices ({:?})", indices.len(), policy);
            index_count = Some(indices.len());
            "adjacency"
        }

        Commands::Components => {
            component_sizes = Some(mesh.components().iter().map(Vec::len).collect());
            "components"
        }

        Commands::DoubleSided => {
            *mesh = mesh.double_sided();
            state.mark(Dirty::CHANGED);
            "double-sided"
        }

        Commands::Extract { ids, remove } => {
            let selection = if *remove { VertexSelection::Remove } else { VertexSelection::Keep };
            let sub = mesh.extract_vertices(ids, selection);
            complementary_vertices = Some(sub.complementary_vertices);
            *mesh = sub.mesh;
            state.mark(Dirty::CHANGED);
            "extract"
        }

        Commands::Clean { min_vertices, largest } => {
            let cleaned = if *largest {
                mesh.largest_component()
            } else {
                mesh.remove_small_components(*min_vertices)
            };
            state.mark(Dirty::from_changed(cleaned != *mesh));
            *mesh = cleaned;
            "clean"
        }
    };

    Ok(Report {
        command: name,
        changed: state.needs_upload(),
        before,
        after: MeshSummary::of(mesh),
        index_count,
        component_sizes,
        complementary_vertices,
    })
}

/// Load, apply and save without touching the logger
pub fn run(cli: &Cli) -> Result<Report> {
    let config = load_config(cli.config.as_deref())?;
    let mut state = UploadState::new();
    let mut mesh = load_mesh(cli, &mut state)?;

    let report = apply(&cli.command, &mut mesh, &config, &mut state)?;

    if let Some(output) = &cli.output {
        save_mesh(&mesh, output)?;
    }
    if state.take() {
        log::debug!("Mesh buffers changed over {} edit(s)", state.edit_count());
    }
    Ok(report)
}

/// Execute the CLI command
pub fn execute(cli: Cli) -> Result<()> {
    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    let report = run(&cli)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
