//! Mesh Benchmarks
//!
//! Subdivision, adjacency, normal generation and smoothing on grids and
//! spheres of increasing resolution

use std::hint::black_box;

use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use tessera_core::{AdjacencyPolicy, NormalConfig, SmoothingConfig, SubdivisionConfig, TaubinConfig};
use tessera_mesh::generators::{cube, quad_grid, uv_sphere};
use tessera_mesh::{index_buffer, subdivide};

fn bench_subdivide(c: &mut Criterion) {
    let mut group = c.benchmark_group("subdivide");

    for threshold in [0.5f32, 0.25, 0.125].iter() {
        let config = SubdivisionConfig {
            max_edge_length: *threshold,
            max_depth: 8,
        };
        group.bench_with_input(BenchmarkId::from_parameter(threshold), &config, |b, config| {
            let mesh = cube();
            b.iter(|| black_box(subdivide(&mesh, config)));
        });
    }

    group.finish();
}

fn bench_adjacency(c: &mut Criterion) {
    let mut group = c.benchmark_group("adjacency_index_buffer");

    for segments in [16u32, 64, 256].iter() {
        let mesh = uv_sphere(*segments, *segments / 2, 1.0);
        group.bench_with_input(BenchmarkId::from_parameter(segments), &mesh, |b, mesh| {
            b.iter(|| black_box(index_buffer(mesh, Some(AdjacencyPolicy::Sentinel))));
        });
    }

    group.finish();
}

fn bench_normals(c: &mut Criterion) {
    let mut group = c.benchmark_group("normals");

    for segments in [16u32, 64, 256].iter() {
        let mesh = uv_sphere(*segments, *segments / 2, 1.0);

        group.bench_with_input(BenchmarkId::new("flat", segments), &mesh, |b, mesh| {
            b.iter_batched(
                || mesh.clone(),
                |mut mesh| {
                    let _ = mesh.generate_normals();
                    mesh
                },
                BatchSize::LargeInput,
            );
        });

        group.bench_with_input(BenchmarkId::new("smooth_3", segments), &mesh, |b, mesh| {
            b.iter_batched(
                || mesh.clone(),
                |mut mesh| {
                    let _ = mesh.generate_smooth_normals(3);
                    mesh
                },
                BatchSize::LargeInput,
            );
        });

        let config = NormalConfig::default();
        group.bench_with_input(BenchmarkId::new("disconnected", segments), &mesh, |b, mesh| {
            b.iter_batched(
                || mesh.clone(),
                |mut mesh| {
                    let _ = mesh.generate_smooth_normals_disconnected(&config);
                    mesh
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

fn bench_smoothing(c: &mut Criterion) {
    let mut group = c.benchmark_group("smoothing");

    for cells in [32u32, 128, 512].iter() {
        let mesh = quad_grid(*cells, *cells, 1.0, 1.0);

        let laplacian = SmoothingConfig {
            update_normals: false,
            ..SmoothingConfig::default()
        };
        group.bench_with_input(BenchmarkId::new("laplacian", cells), &mesh, |b, mesh| {
            b.iter_batched(
                || mesh.clone(),
                |mut mesh| {
                    let _ = mesh.laplacian_smoothing(&laplacian);
                    mesh
                },
                BatchSize::LargeInput,
            );
        });

        let taubin = TaubinConfig {
            update_normals: false,
            ..TaubinConfig::default()
        };
        group.bench_with_input(BenchmarkId::new("taubin", cells), &mesh, |b, mesh| {
            b.iter_batched(
                || mesh.clone(),
                |mut mesh| {
                    let _ = mesh.adaptive_taubin_smoothing(&taubin);
                    mesh
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_subdivide, bench_adjacency, bench_normals, bench_smoothing);
criterion_main!(benches);
