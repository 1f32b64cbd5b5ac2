//! Position smoothing
//!
//! Both smoothers are Jacobi iterations: every pass computes all new
//! positions from the previous pass in parallel, then swaps buffers.

use rayon::prelude::*;
use tessera_core::math::Vec3;
use tessera_core::{Dirty, SmoothingConfig, TaubinConfig};

use crate::GeometryResult;
use crate::adjacency::{VertexNeighbors, boundary_vertices};
use crate::mesh::Mesh;

/// Cotangent weight per (vertex, neighbour) pair, laid out alongside
/// [`VertexNeighbors`]
struct CotanWeights {
    rings: VertexNeighbors,
    weights: Vec<f32>,
}

impl CotanWeights {
    /// For each directed edge `(vs[i], vs[i+1])` of every triangle the weight
    /// `0.5 / (tan(angle at vs[i+2]) + epsilon)` is added to both orderings
    /// of the pair, so interior edges sum the contributions of both sides.
    fn build(positions: &[Vec3], triangles: &[[u32; 3]], epsilon: f32) -> Self {
        let rings = VertexNeighbors::build(positions.len(), triangles);
        let mut weights = vec![0.0f32; rings.pair_count()];

        for vs in triangles {
            for i in 0..3 {
                let (u, v, apex) = (vs[i], vs[(i + 1) % 3], vs[(i + 2) % 3]);
                let origin = positions[apex as usize];
                let e1 = (positions[u as usize] - origin).normalize_or_zero();
                let e2 = (positions[v as usize] - origin).normalize_or_zero();
                let angle = e1.dot(e2).clamp(-1.0, 1.0).acos();
                let w = 0.5 / (angle.tan() + epsilon);

                for (from, to) in [(u, v), (v, u)] {
                    let range = rings.range(from as usize);
                    if let Ok(slot) = rings.of(from as usize).binary_search(&to) {
                        weights[range.start + slot] += w;
                    }
                }
            }
        }

        Self { rings, weights }
    }

    /// Neighbours of `v` with their summed weights
    fn of(&self, v: usize) -> impl Iterator<Item = (u32, f32)> + '_ {
        let range = self.rings.range(v);
        self.rings
            .of(v)
            .iter()
            .copied()
            .zip(self.weights[range].iter().copied())
    }
}

impl Mesh {
    /// Umbrella smoothing: every vertex moves to the plain mean of its
    /// distinct neighbours. Vertices without neighbours stay put, as do
    /// boundary vertices when `config.lock_boundary` is set.
    ///
    /// Boundary locking is on by default. Turn it off for the plain umbrella
    /// operator, which also pulls open borders inward.
    pub fn laplacian_smoothing(&mut self, config: &SmoothingConfig) -> Dirty {
        if config.iterations == 0 {
            return Dirty::CLEAN;
        }
        let _span = tracing::debug_span!("laplacian_smoothing", iterations = config.iterations).entered();

        let (rings, locked) = {
            let triangles = self.usable_triangles("laplacian_smoothing");
            let rings = VertexNeighbors::build(self.vertex_count(), &triangles);
            let locked = if config.lock_boundary {
                boundary_vertices(self.vertex_count(), &triangles)
            } else {
                vec![false; self.vertex_count()]
            };
            (rings, locked)
        };
        log::debug!(
            "Laplacian smoothing: {} pass(es), {} locked vertex(es)",
            config.iterations,
            locked.iter().filter(|&&l| l).count()
        );

        for _ in 0..config.iterations {
            let current = &self.positions;
            let next: Vec<Vec3> = current
                .par_iter()
                .enumerate()
                .map(|(v, &p)| {
                    let ring = rings.of(v);
                    if locked[v] || ring.is_empty() {
                        return p;
                    }
                    let sum: Vec3 = ring.iter().map(|&u| current[u as usize]).sum();
                    sum / ring.len() as f32
                })
                .collect();
            self.positions = next;
        }

        if config.update_normals {
            let _ = self.generate_normals();
        }
        Dirty::CHANGED
    }

    /// Cotangent-weighted smoothing: every vertex moves `config.step` of the
    /// way toward the weighted mean of its neighbours. Vertices whose weights
    /// do not sum to a positive value stay put.
    ///
    /// With colors present and `config.write_color_variance` set, the colors
    /// are replaced by the per-channel variance of each vertex's color and
    /// its neighbours' colors.
    pub fn adaptive_taubin_smoothing(&mut self, config: &TaubinConfig) -> GeometryResult<Dirty> {
        config.validate()?;
        if config.iterations == 0 {
            return Ok(Dirty::CLEAN);
        }
        let _span = tracing::debug_span!("taubin_smoothing", iterations = config.iterations).entered();

        let weights = {
            let triangles = self.usable_triangles("adaptive_taubin_smoothing");
            CotanWeights::build(&self.positions, &triangles, config.cotan_epsilon)
        };

        if config.write_color_variance && self.has_colors() {
            self.colors = neighbourhood_variance(&self.colors, &weights.rings);
        }

        let step = config.step;
        for _ in 0..config.iterations {
            let current = &self.positions;
            let next: Vec<Vec3> = current
                .par_iter()
                .enumerate()
                .map(|(v, &p)| {
                    let (weighted, total) = weights
                        .of(v)
                        .fold((Vec3::ZERO, 0.0f32), |(acc, total), (u, w)| {
                            (acc + current[u as usize] * w, total + w)
                        });
                    if total > 0.0 {
                        p + (weighted / total - p) * step
                    } else {
                        p
                    }
                })
                .collect();
            self.positions = next;
        }

        if config.update_normals {
            let _ = self.generate_normals();
        }
        Ok(Dirty::CHANGED)
    }
}

/// Population variance per channel over each vertex and its 1-ring
fn neighbourhood_variance(colors: &[Vec3], rings: &VertexNeighbors) -> Vec<Vec3> {
    (0..colors.len())
        .into_par_iter()
        .map(|v| {
            let ring = rings.of(v);
            let count = (ring.len() + 1) as f32;
            let mean = (colors[v] + ring.iter().map(|&u| colors[u as usize]).sum::<Vec3>()) / count;
            let spread = |c: Vec3| (c - mean) * (c - mean);
            (spread(colors[v]) + ring.iter().map(|&u| spread(colors[u as usize])).sum::<Vec3>()) / count
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::{cube, quad_grid, triangle};

    fn laplacian(iterations: u32, lock_boundary: bool) -> SmoothingConfig {
        SmoothingConfig {
            iterations,
            update_normals: false,
            lock_boundary,
        }
    }

    fn taubin(iterations: u32) -> TaubinConfig {
        TaubinConfig {
            iterations,
            update_normals: false,
            ..TaubinConfig::default()
        }
    }

    /// 3x3 vertex grid with the centre lifted off the plane
    fn bumped_grid() -> Mesh {
        let mut grid = quad_grid(2, 2, 2.0, 2.0);
        let mut positions = grid.positions().to_vec();
        positions[4].z = 1.0;
        let _ = grid.set_positions(positions);
        grid
    }

    #[test]
    fn test_zero_iterations_is_noop() {
        let mut mesh = bumped_grid();
        let before = mesh.clone();
        assert!(!mesh.laplacian_smoothing(&laplacian(0, false)).is_dirty());
        assert!(!mesh.adaptive_taubin_smoothing(&taubin(0)).unwrap().is_dirty());
        assert_eq!(mesh, before);
    }

    #[test]
    fn test_single_triangle_is_fixed() {
        let mut mesh = triangle();
        let before = mesh.positions().to_vec();
        assert!(mesh.laplacian_smoothing(&laplacian(1, true)).is_dirty());
        assert_eq!(mesh.positions(), before.as_slice());
    }

    #[test]
    fn test_unlocked_triangle_rotates_neighbours() {
        let mut mesh = triangle();
        let _ = mesh.laplacian_smoothing(&laplacian(1, false));
        assert_eq!(mesh.position(0), (Vec3::X + Vec3::Y) * 0.5);
        assert_eq!(mesh.position(1), Vec3::Y * 0.5);
        assert_eq!(mesh.position(2), Vec3::X * 0.5);
    }

    #[test]
    fn test_laplacian_flattens_interior() {
        let mut mesh = bumped_grid();
        let _ = mesh.laplacian_smoothing(&laplacian(1, true));
        // The centre sees its 6 neighbours, all on the plane.
        assert_eq!(mesh.position(4), Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(mesh.position(0), Vec3::ZERO);
    }

    #[test]
    fn test_laplacian_shrinks_closed_mesh() {
        let mut mesh = cube();
        let _ = mesh.laplacian_smoothing(&laplacian(3, true));
        for p in mesh.positions() {
            assert!(p.length() < 3.0f32.sqrt());
        }
    }

    #[test]
    fn test_laplacian_updates_normals() {
        let mut mesh = bumped_grid();
        let _ = mesh.set_normals(Vec::new());
        let config = SmoothingConfig {
            iterations: 2,
            ..SmoothingConfig::default()
        };
        let _ = mesh.laplacian_smoothing(&config);
        assert!(mesh.has_normals());
    }

    #[test]
    fn test_isolated_vertex_stays() {
        let mut mesh = triangle();
        let mut positions = mesh.positions().to_vec();
        positions.push(Vec3::splat(3.0));
        let _ = mesh.set_positions(positions);
        let _ = mesh.laplacian_smoothing(&laplacian(2, false));
        assert_eq!(mesh.position(3), Vec3::splat(3.0));
    }

    #[test]
    fn test_cotan_weights_are_symmetric() {
        let grid = quad_grid(2, 2, 1.0, 1.0);
        let weights = CotanWeights::build(grid.positions(), grid.triangles(), 1e-5);
        for v in 0..grid.vertex_count() {
            for (u, w) in weights.of(v) {
                let back = weights.of(u as usize).find(|&(x, _)| x as usize == v).map(|(_, w)| w);
                assert_eq!(back, Some(w));
            }
        }
    }

    #[test]
    fn test_cotan_weight_of_right_angle() {
        // Legs meet at the origin with a right angle, so the hypotenuse
        // weight is ~0 and each leg gets 0.5 / tan(45 deg).
        let mesh = triangle();
        let weights = CotanWeights::build(mesh.positions(), mesh.triangles(), 1e-5);
        let w = |a: usize, b: u32| weights.of(a).find(|&(x, _)| x == b).map(|(_, w)| w).unwrap();
        assert!(w(1, 2).abs() < 1e-3);
        assert!((w(0, 1) - 0.5).abs() < 1e-3);
        assert!((w(0, 2) - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_taubin_pulls_bump_down() {
        let mut mesh = bumped_grid();
        let _ = mesh.adaptive_taubin_smoothing(&taubin(1)).unwrap();
        let z = mesh.position(4).z;
        assert!(z < 1.0 && z > 0.0, "z = {z}");
    }

    #[test]
    fn test_taubin_keeps_flat_grid_flat() {
        let mut mesh = quad_grid(4, 4, 1.0, 1.0);
        let _ = mesh.adaptive_taubin_smoothing(&taubin(3)).unwrap();
        assert!(mesh.positions().iter().all(|p| p.z == 0.0));
    }

    #[test]
    fn test_taubin_writes_color_variance() {
        let mut mesh = triangle();
        let _ = mesh.set_colors(vec![Vec3::ZERO, Vec3::ONE, Vec3::ZERO]);
        let _ = mesh.adaptive_taubin_smoothing(&taubin(1)).unwrap();
        // Every vertex sees all three colors: mean 1/3, variance 2/9.
        for c in mesh.colors() {
            assert!((*c - Vec3::splat(2.0 / 9.0)).length() < 1e-6);
        }

        let mut untouched = triangle();
        let _ = untouched.set_colors(vec![Vec3::ZERO, Vec3::ONE, Vec3::ZERO]);
        let config = TaubinConfig {
            write_color_variance: false,
            ..taubin(1)
        };
        let _ = untouched.adaptive_taubin_smoothing(&config).unwrap();
        assert_eq!(untouched.colors()[1], Vec3::ONE);
    }

    #[test]
    fn test_taubin_rejects_bad_step() {
        let mut mesh = triangle();
        let config = TaubinConfig {
            step: 0.0,
            ..taubin(1)
        };
        assert!(mesh.adaptive_taubin_smoothing(&config).is_err());
    }
}
