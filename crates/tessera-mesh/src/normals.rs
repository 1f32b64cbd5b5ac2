//! Vertex normal generation
//!
//! Three flavours:
//! - [`Mesh::generate_normals`]: averaged unit face normals
//! - [`Mesh::generate_smooth_normals`]: area-weighted face normals, then
//!   optional 1-ring propagation passes
//! - [`Mesh::generate_smooth_normals_disconnected`]: the same after welding
//!   co-located vertices, so seams and poles get one shared normal
//!
//! Per-vertex work reads only the previous pass, so every loop runs on rayon.

use rayon::prelude::*;
use tessera_core::math::{Vec3, lexicographic_cmp, normalize_or_up};
use tessera_core::{Dirty, NormalConfig};

use crate::GeometryResult;
use crate::adjacency::VertexTriangles;
use crate::mesh::Mesh;

impl Mesh {
    /// Flat-shaded style normals.
    ///
    /// Each vertex sums the unit normals `normalize(cross(a - c, a - b))` of
    /// its triangles, divides by the vertex count of the whole mesh, then
    /// stores the negated, normalized sum. A vertex used by no triangle ends
    /// up with `(0, -1, 0)`.
    pub fn generate_normals(&mut self) -> Dirty {
        let normals = {
            let triangles = self.usable_triangles("generate_normals");
            let positions = &self.positions;
            let vertex_count = positions.len();

            let face_normals: Vec<Vec3> = triangles
                .par_iter()
                .map(|&[a, b, c]| {
                    let (pa, pb, pc) = (positions[a as usize], positions[b as usize], positions[c as usize]);
                    normalize_or_up((pa - pc).cross(pa - pb))
                })
                .collect();

            let incidence = VertexTriangles::build(vertex_count, &triangles);
            let scale = 1.0 / vertex_count.max(1) as f32;
            (0..vertex_count)
                .into_par_iter()
                .map(|v| {
                    let sum: Vec3 = incidence.of(v).iter().map(|&t| face_normals[t as usize]).sum();
                    -normalize_or_up(sum * scale)
                })
                .collect()
        };

        self.normals = normals;
        Dirty::CHANGED
    }

    /// Smooth normals from area-weighted face normals.
    ///
    /// `iterations` extra passes replace every normal with the sum of the
    /// neighbouring corners' normals over its triangles, rescaled by the
    /// largest magnitude between passes and normalized after the last one.
    pub fn generate_smooth_normals(&mut self, iterations: u32) -> Dirty {
        let _span = tracing::debug_span!("smooth_normals", iterations).entered();
        let normals = {
            let triangles = self.usable_triangles("generate_smooth_normals");
            let face_normals = area_weighted_normals(&self.positions, &triangles);
            propagate(self.positions.len(), &triangles, &face_normals, iterations)
        };

        self.normals = normals;
        Dirty::CHANGED
    }

    /// [`Mesh::generate_smooth_normals`] on a welded copy of the topology.
    ///
    /// Vertices within `config.merge_distance` of their lexicographic
    /// predecessor share a canonical id. Normals are accumulated and
    /// propagated per canonical id, then copied to every duplicate.
    pub fn generate_smooth_normals_disconnected(&mut self, config: &NormalConfig) -> GeometryResult<Dirty> {
        config.validate()?;
        let _span = tracing::debug_span!(
            "smooth_normals_disconnected",
            iterations = config.smoothing_iterations
        )
        .entered();

        let canonical = canonical_ids(&self.positions, config.merge_distance);
        let duplicates = canonical.iter().enumerate().filter(|&(v, &c)| v != c as usize).count();
        log::debug!("Welded {duplicates} co-located vertex(es) for normal generation");

        let welded_normals = {
            let triangles = self.usable_triangles("generate_smooth_normals_disconnected");
            let face_normals = area_weighted_normals(&self.positions, &triangles);
            let welded: Vec<[u32; 3]> = triangles
                .iter()
                .map(|tri| tri.map(|v| canonical[v as usize]))
                .collect();
            propagate(
                self.positions.len(),
                &welded,
                &face_normals,
                config.smoothing_iterations,
            )
        };

        self.normals = canonical
            .par_iter()
            .map(|&c| welded_normals[c as usize])
            .collect();
        Ok(Dirty::CHANGED)
    }
}

/// Unnormalized `(b - a) x (c - a)` per triangle
fn area_weighted_normals(positions: &[Vec3], triangles: &[[u32; 3]]) -> Vec<Vec3> {
    triangles
        .par_iter()
        .map(|&[a, b, c]| {
            let pa = positions[a as usize];
            (positions[b as usize] - pa).cross(positions[c as usize] - pa)
        })
        .collect()
}

/// Sum face normals per vertex, then run `iterations` Jacobi passes over the
/// triangle 1-ring. `triangles` may repeat a vertex once welded; each corner
/// still counts separately.
fn propagate(
    vertex_count: usize,
    triangles: &[[u32; 3]],
    face_normals: &[Vec3],
    iterations: u32,
) -> Vec<Vec3> {
    let incidence = VertexTriangles::build(vertex_count, triangles);
    let mut normals: Vec<Vec3> = (0..vertex_count)
        .into_par_iter()
        .map(|v| incidence.of(v).iter().map(|&t| face_normals[t as usize]).sum())
        .collect();

    if iterations == 0 {
        normals.par_iter_mut().for_each(|n| *n = normalize_or_up(*n));
        return normals;
    }

    for pass in 0..iterations {
        let previous = &normals;
        let mut next: Vec<Vec3> = (0..vertex_count)
            .into_par_iter()
            .map(|v| {
                let v = v as u32;
                incidence
                    .of(v as usize)
                    .iter()
                    .map(|&t| {
                        let [a, b, c] = triangles[t as usize];
                        let n = |i: u32| previous[i as usize];
                        if v == a {
                            n(b) + n(c)
                        } else if v == b {
                            n(a) + n(c)
                        } else {
                            n(a) + n(b)
                        }
                    })
                    .sum()
            })
            .collect();

        if pass + 1 == iterations {
            next.par_iter_mut().for_each(|n| *n = normalize_or_up(*n));
        } else {
            let max = next.par_iter().map(|n| n.length()).reduce(|| 0.0, f32::max);
            if max > 0.0 {
                next.par_iter_mut().for_each(|n| *n /= max);
            }
        }
        normals = next;
    }
    normals
}

/// Canonical id per vertex: sort by position (ties by id) and reuse the
/// predecessor's canonical id when within `merge_distance` of it.
pub(crate) fn canonical_ids(positions: &[Vec3], merge_distance: f32) -> Vec<u32> {
    let mut order: Vec<u32> = (0..positions.len() as u32).collect();
    order.par_sort_unstable_by(|&a, &b| {
        lexicographic_cmp(positions[a as usize], positions[b as usize]).then(a.cmp(&b))
    });

    let mut canonical: Vec<u32> = (0..positions.len() as u32).collect();
    for pair in order.windows(2) {
        let (prev, cur) = (pair[0] as usize, pair[1] as usize);
        if positions[cur].distance(positions[prev]) <= merge_distance {
            canonical[cur] = canonical[prev];
        }
    }
    canonical
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::{cube, quad_grid, triangle, uv_sphere};

    fn referenced(mesh: &Mesh) -> Vec<bool> {
        let mut used = vec![false; mesh.vertex_count()];
        for tri in mesh.triangles() {
            for &v in tri {
                used[v as usize] = true;
            }
        }
        used
    }

    #[test]
    fn test_flat_normals_follow_winding() {
        let mut mesh = triangle();
        assert!(mesh.generate_normals().is_dirty());
        for n in mesh.normals() {
            assert!((*n - Vec3::Z).length() < 1e-6);
        }
    }

    #[test]
    fn test_flat_normals_point_out_of_cube() {
        let mut mesh = cube();
        let _ = mesh.generate_normals();
        assert!(mesh.has_normals());
        for (p, n) in mesh.positions().iter().zip(mesh.normals()) {
            assert!((n.length() - 1.0).abs() < 1e-5);
            assert!(n.dot(*p) > 0.0);
        }
        // Corner (1, 1, 1) touches two triangles on each of three faces.
        assert!((mesh.normals()[0] - Vec3::ONE.normalize()).length() < 1e-5);
    }

    #[test]
    fn test_isolated_vertex_gets_negated_fallback() {
        let mut mesh = triangle();
        let mut positions = mesh.positions().to_vec();
        positions.push(Vec3::splat(5.0));
        let _ = mesh.set_positions(positions);
        let _ = mesh.generate_normals();
        assert_eq!(mesh.normals()[3], Vec3::NEG_Y);
    }

    #[test]
    fn test_smooth_normals_on_flat_grid() {
        for iterations in [0, 1, 3] {
            let mut grid = quad_grid(3, 3, 1.0, 1.0);
            let _ = grid.set_normals(Vec::new());
            let _ = grid.generate_smooth_normals(iterations);
            assert!(grid.has_normals());
            for n in grid.normals() {
                assert!((*n - Vec3::Z).length() < 1e-5, "{iterations}: {n}");
            }
        }
    }

    #[test]
    fn test_smooth_normals_on_cube() {
        for iterations in [0, 1] {
            let mut mesh = cube();
            let _ = mesh.generate_smooth_normals(iterations);
            for (p, n) in mesh.positions().iter().zip(mesh.normals()) {
                assert!((n.length() - 1.0).abs() < 1e-5);
                assert!(n.dot(*p) > 0.0);
            }
        }
    }

    #[test]
    fn test_smooth_normals_on_sphere_are_radial() {
        let mut mesh = uv_sphere(16, 12, 1.0);
        let used = referenced(&mesh);
        let _ = mesh.generate_smooth_normals(0);
        for (v, (p, n)) in mesh.positions().iter().zip(mesh.normals()).enumerate() {
            if used[v] {
                assert!(n.dot(p.normalize()) > 0.95);
            }
        }
    }

    #[test]
    fn test_canonical_ids() {
        let positions = vec![
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::ZERO,
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 5e-7),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        assert_eq!(canonical_ids(&positions, 1e-6), vec![0, 1, 0, 1, 4]);
    }

    #[test]
    fn test_disconnected_normals_weld_seams() {
        let config = NormalConfig::default();
        for iterations in [0, 2] {
            let mut mesh = uv_sphere(16, 12, 1.0);
            let config = NormalConfig {
                smoothing_iterations: iterations,
                ..config
            };
            let _ = mesh.generate_smooth_normals_disconnected(&config).unwrap();

            for (p, n) in mesh.positions().iter().zip(mesh.normals()) {
                assert!(n.dot(p.normalize()) > 0.98);
            }
            // Seam copies on every ring and all pole copies agree.
            let stride = 17;
            for ring in 0..=12 {
                assert_eq!(mesh.normals()[ring * stride], mesh.normals()[ring * stride + 16]);
            }
            assert!(mesh.normals()[..stride].iter().all(|&n| n == mesh.normals()[0]));
        }
    }

    #[test]
    fn test_disconnected_matches_connected_away_from_seams() {
        let mut connected = uv_sphere(16, 12, 1.0);
        let mut welded = connected.clone();
        let _ = connected.generate_smooth_normals(0);
        let _ = welded.generate_smooth_normals_disconnected(&NormalConfig::default()).unwrap();

        let canonical = canonical_ids(connected.positions(), 1e-6);
        for v in 0..connected.vertex_count() {
            let shared = canonical.iter().filter(|&&c| c == canonical[v]).count() > 1;
            if !shared {
                assert!((connected.normals()[v] - welded.normals()[v]).length() < 1e-5);
            }
        }
    }

    #[test]
    fn test_disconnected_rejects_bad_distance() {
        let mut mesh = cube();
        let config = NormalConfig {
            merge_distance: -1.0,
            ..NormalConfig::default()
        };
        assert!(mesh.generate_smooth_normals_disconnected(&config).is_err());
    }
}
