//! Benchmarks for mesh-repair operations.
//!
//! Run with: cargo bench -p mesh-repair
//!
//! To compare against baseline:
//! 1. First run: cargo bench -p mesh-repair -- --save-baseline main
//! 2. After changes: cargo bench -p mesh-repair -- --baseline main

#![allow(missing_docs, clippy::cast_possible_truncation, clippy::unwrap_used)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mesh_repair::{
    keep_largest_component, merge_coincident_vertices, repair_mesh, weld_vertices, RepairParams,
};
use mesh_types::{IndexedMesh, Point3, Vector3};

// =============================================================================
// Test Mesh Generation
// =============================================================================

/// Triangle soup as STL delivers it: an `n x n` grid with every face
/// owning its own three vertices, plus `specks` single-triangle floaters.
fn create_soup(n: u32, specks: u32) -> IndexedMesh {
    let corner = |x: u32, y: u32| Point3::new(f64::from(x), f64::from(y), 0.0);
    let mut vertices = Vec::new();
    for y in 0..n {
        for x in 0..n {
            vertices.extend([corner(x, y), corner(x + 1, y), corner(x + 1, y + 1)]);
            vertices.extend([corner(x, y), corner(x + 1, y + 1), corner(x, y + 1)]);
        }
    }
    for s in 0..specks {
        let base = Point3::new(f64::from(s) * 3.0, -10.0, 5.0);
        vertices.extend([
            base,
            base + Vector3::new(0.5, 0.0, 0.0),
            base + Vector3::new(0.0, 0.5, 0.0),
        ]);
    }
    let faces = (0..vertices.len() as u32 / 3)
        .map(|i| [3 * i, 3 * i + 1, 3 * i + 2])
        .collect();
    IndexedMesh::from_parts(vertices, faces)
}

// =============================================================================
// Repair Benchmarks
// =============================================================================

fn bench_repair(c: &mut Criterion) {
    let mut group = c.benchmark_group("Repair");

    let test_cases = [
        ("soup_2k", create_soup(32, 16)),
        ("soup_20k", create_soup(100, 64)),
    ];

    for (name, mesh) in &test_cases {
        group.throughput(Throughput::Elements(mesh.faces.len() as u64));

        group.bench_with_input(BenchmarkId::new("merge_coincident", name), mesh, |b, mesh| {
            b.iter_batched(
                || mesh.clone(),
                |mut m| merge_coincident_vertices(black_box(&mut m)),
                criterion::BatchSize::LargeInput,
            );
        });

        group.bench_with_input(BenchmarkId::new("weld_vertices", name), mesh, |b, mesh| {
            b.iter_batched(
                || mesh.clone(),
                |mut m| weld_vertices(black_box(&mut m), 1e-6),
                criterion::BatchSize::LargeInput,
            );
        });

        let mut welded = mesh.clone();
        merge_coincident_vertices(&mut welded);
        group.bench_with_input(BenchmarkId::new("keep_largest", name), &welded, |b, mesh| {
            b.iter_batched(
                || mesh.clone(),
                |mut m| keep_largest_component(black_box(&mut m), None),
                criterion::BatchSize::LargeInput,
            );
        });

        let params = RepairParams::default();
        group.bench_with_input(BenchmarkId::new("full_repair", name), mesh, |b, mesh| {
            b.iter_batched(
                || mesh.clone(),
                |m| repair_mesh(black_box(m), &params).unwrap(),
                criterion::BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

// =============================================================================
// Criterion Setup
// =============================================================================

criterion_group!(benches, bench_repair);
criterion_main!(benches);
