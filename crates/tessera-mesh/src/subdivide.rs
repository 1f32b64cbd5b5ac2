//! Edge-length driven midpoint subdivision
//!
//! Every pass splits each edge longer than the threshold at its midpoint and
//! re-triangulates each triangle according to how many of its edges were
//! split. Midpoints are keyed by the sorted vertex id pair of their edge, so
//! two triangles sharing an edge share its midpoint and no crack can open.

use ahash::AHashMap;
use tessera_core::SubdivisionConfig;
use tessera_core::math::{Vec3, normalize_or_up};

use crate::GeometryResult;
use crate::mesh::{Mesh, report_dropped};

/// Summary of a subdivision run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubdivisionStats {
    /// Passes executed, the last one possibly splitting nothing
    pub passes: usize,
    /// Edges split over all passes
    pub split_edges: usize,
    pub vertices_added: usize,
    pub triangles_added: usize,
}

/// Subdivide until no edge exceeds `config.max_edge_length` or the depth
/// budget runs out. `max_depth = 0` runs exactly one pass.
pub fn subdivide(mesh: &Mesh, config: &SubdivisionConfig) -> GeometryResult<Mesh> {
    subdivide_with_stats(mesh, config).map(|(mesh, _)| mesh)
}

/// [`subdivide`], also reporting what was added
pub fn subdivide_with_stats(
    mesh: &Mesh,
    config: &SubdivisionConfig,
) -> GeometryResult<(Mesh, SubdivisionStats)> {
    config.validate()?;
    mesh.debug_assert_attributes();

    let mut stats = SubdivisionStats::default();
    let mut depth = config.max_depth;
    let mut current = split_pass(mesh, config.max_edge_length, &mut stats);
    while current.1 > 0 && depth > 0 {
        depth -= 1;
        current = split_pass(&current.0, config.max_edge_length, &mut stats);
    }
    let result = current.0;

    stats.vertices_added = result.vertex_count() - mesh.vertex_count();
    stats.triangles_added = result.triangle_count().saturating_sub(mesh.triangle_count());
    log::debug!(
        "Subdivided {} -> {} vertices, {} -> {} triangles in {} pass(es)",
        mesh.vertex_count(),
        result.vertex_count(),
        mesh.triangle_count(),
        result.triangle_count(),
        stats.passes
    );
    Ok((result, stats))
}

/// One refinement pass. Returns the refined mesh and the number of edges
/// split by this pass.
fn split_pass(mesh: &Mesh, max_edge_length: f32, stats: &mut SubdivisionStats) -> (Mesh, usize) {
    let _span = tracing::debug_span!("subdivide_pass", pass = stats.passes).entered();

    let present = |len: usize| len == mesh.vertex_count();
    let mut out = Mesh {
        positions: mesh.positions.clone(),
        normals: if present(mesh.normals.len()) { mesh.normals.clone() } else { Vec::new() },
        colors: if present(mesh.colors.len()) { mesh.colors.clone() } else { Vec::new() },
        uvs: if present(mesh.uvs.len()) { mesh.uvs.clone() } else { Vec::new() },
        mesh_ids: if present(mesh.mesh_ids.len()) { mesh.mesh_ids.clone() } else { Vec::new() },
        triangles: Vec::with_capacity(mesh.triangle_count() * 2),
        material_ids: Vec::new(),
        material_names: mesh.material_names.clone(),
        max_mesh_id: mesh.max_mesh_id,
    };
    let inherit_materials = mesh.has_material_ids();

    let mut midpoints: AHashMap<(u32, u32), u32> = AHashMap::new();
    let mut dropped = 0;

    for (t, &tri) in mesh.triangles.iter().enumerate() {
        if !mesh.is_usable(tri) {
            dropped += 1;
            continue;
        }

        let mut mids = [None; 3];
        for (k, mid) in mids.iter_mut().enumerate() {
            let (a, b) = (tri[k], tri[(k + 1) % 3]);
            let length = mesh.positions[a as usize].distance(mesh.positions[b as usize]);
            if length > max_edge_length {
                let key = (a.min(b), a.max(b));
                *mid = Some(*midpoints.entry(key).or_insert_with(|| push_midpoint(&mut out, key)));
            }
        }

        retriangulate(&mut out.triangles, &out.positions, tri, mids);
        if inherit_materials {
            out.material_ids.resize(out.triangles.len(), mesh.material_ids[t]);
        }
    }

    report_dropped("subdivide", dropped);
    log::debug!(
        "Subdivision pass {}: split {} edge(s), {} vertices, {} triangles",
        stats.passes,
        midpoints.len(),
        out.vertex_count(),
        out.triangle_count()
    );

    stats.passes += 1;
    stats.split_edges += midpoints.len();
    (out, midpoints.len())
}

/// Append the midpoint of edge `(a, b)` with `a < b`; attributes present on
/// `out` are interpolated, the submesh id comes from `a`.
fn push_midpoint(out: &mut Mesh, (a, b): (u32, u32)) -> u32 {
    let (a, b) = (a as usize, b as usize);
    let id = out.positions.len() as u32;

    out.positions.push((out.positions[a] + out.positions[b]) * 0.5);
    if !out.normals.is_empty() {
        out.normals.push(normalize_or_up(out.normals[a] + out.normals[b]));
    }
    if !out.colors.is_empty() {
        out.colors.push((out.colors[a] + out.colors[b]) * 0.5);
    }
    if !out.uvs.is_empty() {
        out.uvs.push((out.uvs[a] + out.uvs[b]) * 0.5);
    }
    if !out.mesh_ids.is_empty() {
        out.mesh_ids.push(out.mesh_ids[a]);
    }
    id
}

/// Emit the children of `tri`. `mids[k]` is the midpoint of the edge running
/// from corner `k` to corner `k + 1`, if that edge was split.
fn retriangulate(
    triangles: &mut Vec<[u32; 3]>,
    positions: &[Vec3],
    tri: [u32; 3],
    mids: [Option<u32>; 3],
) {
    // Rotate so a lone split edge, or the lone unsplit edge, comes first.
    let r = match mids.iter().flatten().count() {
        1 => mids.iter().position(Option::is_some),
        2 => mids.iter().position(Option::is_none),
        _ => None,
    }
    .unwrap_or(0);
    let c = [tri[r], tri[(r + 1) % 3], tri[(r + 2) % 3]];
    let m = [mids[r], mids[(r + 1) % 3], mids[(r + 2) % 3]];

    match m {
        [None, None, None] => triangles.push(tri),
        [Some(m0), None, None] => {
            triangles.push([m0, c[1], c[2]]);
            triangles.push([m0, c[2], c[0]]);
        }
        [None, Some(m1), Some(m2)] => {
            // Cut the quad c0 c1 m1 m2 along its shorter diagonal
            let pos = |v: u32| positions[v as usize];
            if pos(c[0]).distance(pos(m1)) < pos(c[1]).distance(pos(m2)) {
                triangles.push([c[0], c[1], m1]);
                triangles.push([m1, m2, c[0]]);
            } else {
                triangles.push([c[1], m2, c[0]]);
                triangles.push([c[1], m1, m2]);
            }
            triangles.push([m1, c[2], m2]);
        }
        [Some(m0), Some(m1), Some(m2)] => {
            triangles.push([c[0], m0, m2]);
            triangles.push([c[1], m1, m0]);
            triangles.push([c[2], m2, m1]);
            triangles.push([m0, m1, m2]);
        }
        _ => unreachable!("split pattern {m:?} is rotated into canonical form"),
    }
}
