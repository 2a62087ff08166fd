//! Benchmarks for mesh-decimate operations.
//!
//! Run with: cargo bench -p mesh-decimate
//!
//! To compare against baseline:
//! 1. First run: cargo bench -p mesh-decimate -- --save-baseline main
//! 2. After changes: cargo bench -p mesh-decimate -- --baseline main

#![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mesh_decimate::{decimate_mesh, DecimateParams};
use mesh_types::{IndexedMesh, Point3};

// =============================================================================
// Test Mesh Generation
// =============================================================================

/// Latitude/longitude sphere with `2 * segments * (rings - 1)` faces.
fn create_sphere(rings: u32, segments: u32) -> IndexedMesh {
    let mut vertices = vec![Point3::new(0.0, 0.0, 1.0)];
    for r in 1..rings {
        let theta = std::f64::consts::PI * f64::from(r) / f64::from(rings);
        for s in 0..segments {
            let phi = std::f64::consts::TAU * f64::from(s) / f64::from(segments);
            vertices.push(Point3::new(
                theta.sin() * phi.cos(),
                theta.sin() * phi.sin(),
                theta.cos(),
            ));
        }
    }
    let south = vertices.len() as u32;
    vertices.push(Point3::new(0.0, 0.0, -1.0));

    let ring = |r: u32, s: u32| 1 + (r - 1) * segments + (s % segments);
    let mut faces = Vec::new();
    for s in 0..segments {
        faces.push([0, ring(1, s), ring(1, s + 1)]);
    }
    for r in 1..rings - 1 {
        for s in 0..segments {
            let (a, b) = (ring(r, s), ring(r, s + 1));
            let (c, d) = (ring(r + 1, s), ring(r + 1, s + 1));
            faces.push([a, c, d]);
            faces.push([a, d, b]);
        }
    }
    for s in 0..segments {
        faces.push([south, ring(rings - 1, s + 1), ring(rings - 1, s)]);
    }
    IndexedMesh::from_parts(vertices, faces)
}

/// Open height-field patch with gentle waves, `2 * n * n` faces.
fn create_terrain(n: u32) -> IndexedMesh {
    let mut vertices = Vec::new();
    for y in 0..=n {
        for x in 0..=n {
            let (fx, fy) = (f64::from(x) / f64::from(n), f64::from(y) / f64::from(n));
            let z = 0.05 * (fx * 12.0).sin() * (fy * 9.0).cos();
            vertices.push(Point3::new(fx, fy, z));
        }
    }
    let row = n + 1;
    let mut faces = Vec::new();
    for y in 0..n {
        for x in 0..n {
            let i = y * row + x;
            faces.push([i, i + 1, i + row + 1]);
            faces.push([i, i + row + 1, i + row]);
        }
    }
    IndexedMesh::from_parts(vertices, faces)
}

// =============================================================================
// Decimation Benchmarks
// =============================================================================

fn bench_decimation(c: &mut Criterion) {
    let mut group = c.benchmark_group("Decimation");
    group.sample_size(20); // Decimation is slower, reduce samples

    let test_cases = [
        ("sphere_1k", create_sphere(24, 24)),
        ("sphere_8k", create_sphere(64, 64)),
        ("terrain_20k", create_terrain(100)),
    ];

    for (name, mesh) in &test_cases {
        group.throughput(Throughput::Elements(mesh.faces.len() as u64));

        let half = DecimateParams::with_target_ratio(0.5);
        group.bench_with_input(BenchmarkId::new("decimate_50pct", name), mesh, |b, mesh| {
            b.iter(|| decimate_mesh(black_box(mesh), black_box(&half)));
        });

        // Heavy reduction stresses requeueing around high-valence vertices
        let tenth = DecimateParams::with_target_ratio(0.1);
        group.bench_with_input(BenchmarkId::new("decimate_90pct", name), mesh, |b, mesh| {
            b.iter(|| decimate_mesh(black_box(mesh), black_box(&tenth)));
        });

        let aggressive = DecimateParams::aggressive();
        group.bench_with_input(BenchmarkId::new("aggressive", name), mesh, |b, mesh| {
            b.iter(|| decimate_mesh(black_box(mesh), black_box(&aggressive)));
        });
    }

    group.finish();
}

// =============================================================================
// Criterion Setup
// =============================================================================

criterion_group!(benches, bench_decimation);
criterion_main!(benches);
