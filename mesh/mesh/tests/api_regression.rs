//! API Regression Tests for Mesh Crate Ecosystem
//!
//! These tests serve as a regression suite to ensure the public API remains
//! stable and consistent across the mesh crate ecosystem. They are organized
//! in 4 tiers of increasing complexity:
//!
//! - Tier 1: Foundation (mesh-types)
//! - Tier 2: Core Operations (mesh-measure, mesh-decimate, mesh-repair)
//! - Tier 3: File I/O (mesh-io)
//! - Tier 4: Orchestration (mesh-pipeline)
//!
//! If any of these tests fail after API changes, it indicates a breaking change
//! that needs a version bump.

// Allow test-specific patterns
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::float_cmp)]

use mesh::{decimate, io, measure, pipeline, prelude::*, repair, types};

fn cube_with_floater() -> IndexedMesh {
    let mut mesh = types::unit_cube();
    let tetra = IndexedMesh::from_parts(
        vec![
            Point3::new(3.0, 0.0, 0.0),
            Point3::new(4.0, 0.0, 0.0),
            Point3::new(3.0, 1.0, 0.0),
            Point3::new(3.0, 0.0, 1.0),
        ],
        vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]],
    );
    mesh.merge(&tetra);
    mesh
}

// =============================================================================
// TIER 1: Foundation - Basic Types and Primitives
// =============================================================================

mod tier1_foundation {
    use super::*;

    #[test]
    fn indexed_mesh_construction() {
        // Empty mesh
        let mesh = types::IndexedMesh::new();
        assert!(mesh.vertices.is_empty());
        assert!(mesh.faces.is_empty());
        assert!(!mesh.has_normals());
        assert!(!mesh.has_uvs());
        assert!(mesh.texture.is_none());

        // From parts
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let mesh = types::IndexedMesh::from_parts(vertices, vec![[0, 1, 2]]);
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.face_count(), 1);
        assert!(mesh.validate_indices().is_ok());
    }

    #[test]
    fn invalid_indices_are_reported() {
        let mesh = types::IndexedMesh::from_parts(vec![Point3::origin()], vec![[0, 0, 4]]);
        let err = mesh.validate_indices().unwrap_err();
        assert_eq!(err.face, 0);
        assert_eq!(err.index, 4);
        assert_eq!(err.vertex_count, 1);
    }

    #[test]
    fn primitive_unit_cube() {
        let cube = types::unit_cube();
        assert_eq!(cube.vertex_count(), 8);
        assert_eq!(cube.face_count(), 12); // 6 faces × 2 triangles
        assert!((cube.signed_volume() - 1.0).abs() < 1e-12);
        assert!((cube.surface_area() - 6.0).abs() < 1e-12);
    }

    #[test]
    fn mesh_bounds_calculation() {
        let cube = types::unit_cube();
        let bounds = cube.bounds();

        // Unit cube spans 0,0,0 to 1,1,1
        assert!((bounds.min.x - 0.0).abs() < f64::EPSILON);
        assert!((bounds.max.x - 1.0).abs() < f64::EPSILON);
        assert!((bounds.diagonal() - 3.0_f64.sqrt()).abs() < 1e-12);
        assert!(IndexedMesh::new().bounds_opt().is_none());
    }

    #[test]
    fn mesh_topology_traits() {
        let cube = types::unit_cube();
        // IndexedMesh implements MeshTopology trait
        let count = <types::IndexedMesh as types::MeshTopology>::face_count(&cube);
        assert_eq!(count, 12);

        let tri = cube.triangle(0).unwrap();
        assert!(tri.normal().is_some());
        assert!((tri.area() - 0.5).abs() < 1e-12);
        assert!(cube.triangle(12).is_none());
    }

    #[test]
    fn normals_follow_recompute() {
        let mut cube = types::unit_cube();
        cube.recompute_normals();
        assert!(cube.has_normals());
        assert!(matches!(cube.normals, Some(types::Normals::PerVertex(_))));
    }
}

// =============================================================================
// TIER 2: Core Operations - Statistics, Decimation, Repair
// =============================================================================

mod tier2_core_operations {
    use super::*;
    use mesh::decimate::{CancelFlag, DecimateWarning};
    use mesh::repair::{RepairWarning, merge_coincident_vertices};

    #[test]
    fn statistics_report_usage() {
        let stats = measure::mesh_statistics(&cube_with_floater()).unwrap();
        assert_eq!(stats.report.face_count, 16);
        assert_eq!(stats.report.component_count, 2);
        assert!(stats.report.is_watertight);
        assert_eq!(stats.components.count(), 2);

        // Display trait
        let display = format!("{}", stats.report);
        assert!(display.contains("components"));
    }

    #[test]
    fn repair_params_builder_pattern() {
        // Default params
        let params = RepairParams::default();
        assert!(params.keep_largest_component);
        assert!((params.relative_area_epsilon - 1e-12).abs() < f64::EPSILON);

        // Builder pattern
        let params = RepairParams::default()
            .with_weld_epsilon(1e-5)
            .with_relative_area_epsilon(1e-10)
            .with_keep_largest_component(false)
            .with_remove_unreferenced(true);

        assert!((params.weld_epsilon - 1e-5).abs() < f64::EPSILON);
        assert!(!params.keep_largest_component);
    }

    #[test]
    fn repair_summary_usage() {
        // RepairSummary API
        let summary = RepairSummary::default();
        assert!(!summary.had_changes());
        assert!(!summary.is_empty_result());

        // Display trait
        let display = format!("{}", summary);
        assert!(display.contains("verts"));
    }

    #[test]
    fn repair_mesh_operations() {
        let (mesh, summary) = repair::repair_mesh(cube_with_floater(), &RepairParams::default()).unwrap();
        assert_eq!(mesh.face_count(), 12);
        assert_eq!(summary.components_removed, 1);
        assert!(summary.warnings.is_empty());

        // Components from statistics can be reused
        let input = cube_with_floater();
        let stats = measure::mesh_statistics(&input).unwrap();
        let (reused, _) = repair::repair_mesh_with_components(
            input,
            &RepairParams::default(),
            Some(&stats.components),
        )
        .unwrap();
        assert_eq!(reused, mesh);
    }

    #[test]
    fn repair_warning_shape() {
        assert_eq!(
            RepairWarning::EmptyResult.to_string(),
            "repair removed every face, result is empty"
        );
        let mut mesh = types::unit_cube();
        assert_eq!(merge_coincident_vertices(&mut mesh), 0);
    }

    #[test]
    fn decimate_params_presets() {
        // Target ratio
        let params = DecimateParams::with_target_ratio(0.5);
        assert_eq!(params.target, DecimateTarget::Ratio(0.5));

        // Aggressive preset
        let aggressive = DecimateParams::aggressive();
        assert!(matches!(aggressive.target, DecimateTarget::Ratio(r) if r < 0.5));

        // Builder pattern
        let params = DecimateParams::default()
            .with_preserve_boundary(true)
            .with_max_normal_flip_angle(0.5);
        assert!(params.preserve_boundary);
        assert!((params.max_normal_flip_angle - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn decimate_mesh_operation() {
        let cube = types::unit_cube();
        let result = decimate_mesh(&cube, &DecimateParams::default()).unwrap();

        // Result provides stats
        assert!(result.final_triangles <= cube.face_count());
        assert_eq!(result.target_triangles, 6);
        let display = format!("{}", result);
        assert!(display.contains("→")); // Shows before → after
    }

    #[test]
    fn decimate_rejects_bad_targets() {
        let cube = types::unit_cube();
        let err = decimate_mesh(&cube, &DecimateParams::with_target_ratio(0.0)).unwrap_err();
        assert!(matches!(err, decimate::DecimateError::InvalidRatio(_)));
    }

    #[test]
    fn decimate_cancellation() {
        let flag = CancelFlag::new();
        flag.cancel();
        let result = decimate::decimate_mesh_cancellable(
            &types::unit_cube(),
            &DecimateParams::with_target_faces(4),
            &flag,
        )
        .unwrap();
        assert!(result
            .warnings
            .contains(&DecimateWarning::Cancelled { achieved: 12 }));
    }
}

// =============================================================================
// TIER 3: File I/O
// =============================================================================

mod tier3_io {
    use super::*;
    use mesh::io::{IoError, IoErrorKind, Rgba, StlEncoding};

    #[test]
    fn io_format_detection() {
        // Format detection
        assert_eq!(MeshFormat::from_path("model.stl"), Some(MeshFormat::Stl));
        assert_eq!(MeshFormat::from_path("model.glb"), Some(MeshFormat::Glb));
        assert_eq!(MeshFormat::from_path("model.3mf"), Some(MeshFormat::ThreeMf));
        assert_eq!(MeshFormat::from_path("model.obj"), None);

        // Extensions
        assert_eq!(MeshFormat::Stl.extension(), "stl");
        assert_eq!(MeshFormat::ThreeMf.extension(), "3mf");
        assert!(!MeshFormat::Glb.is_exportable());
    }

    #[test]
    fn export_options_builder() {
        let opts = ExportOptions::default()
            .with_stl_encoding(StlEncoding::Ascii)
            .with_object_color(Rgba::opaque(10, 20, 30));
        assert_eq!(opts.stl_encoding, StlEncoding::Ascii);
        assert!(opts.object_color.is_some());
    }

    #[test]
    fn binary_stl_size() {
        let bytes = io::export_mesh(&types::unit_cube(), MeshFormat::Stl, &ExportOptions::default()).unwrap();
        assert_eq!(bytes.len(), 684);
        let back = io::load_mesh_bytes(&bytes, MeshFormat::Stl).unwrap();
        assert_eq!(back.face_count(), 12);
    }

    #[test]
    fn error_taxonomy() {
        let err = io::export_mesh(&types::unit_cube(), MeshFormat::Glb, &ExportOptions::default())
            .unwrap_err();
        assert_eq!(err.kind(), IoErrorKind::UnsupportedFeature);

        let err = io::load_mesh_bytes(b"glTF", MeshFormat::Glb).unwrap_err();
        assert_eq!(err.kind(), IoErrorKind::Format);

        assert!(matches!(
            MeshFormat::detect("model.ply"),
            Err(IoError::UnknownFormat { .. })
        ));
    }

    #[test]
    fn save_and_load_3mf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cube.3mf");
        let written = save_mesh(&types::unit_cube(), &path, MeshFormat::ThreeMf, &ExportOptions::default()).unwrap();
        assert!(written > 0);

        let mesh = load_mesh(&path).unwrap();
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.face_count(), 12);
    }

    #[test]
    fn palette_split_and_parts_package() {
        use mesh::io::{ColorPalette, DEFAULT_TOLERANCE, save_parts, split_by_palette};

        let palette: ColorPalette = "WHITE=#FFFFFF,RED=#FF0000".parse().unwrap();
        assert_eq!(palette.tolerance, DEFAULT_TOLERANCE);

        let mut cube = types::unit_cube();
        cube.colors = Some(vec![[255, 0, 0, 255]; 8]);
        let parts = split_by_palette(&cube, &palette).unwrap();
        assert_eq!(parts.parts.len(), 1);
        assert_eq!(parts.parts[0].name, "RED");
        assert_eq!(parts.parts[0].material_index, 1);
        assert_eq!(parts.unmatched_faces, 0);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parts.3mf");
        assert!(save_parts(&parts, &path, &ExportOptions::default()).unwrap() > 0);
        assert_eq!(load_mesh(&path).unwrap().face_count(), 12);
    }
}

// =============================================================================
// TIER 4: Orchestration - Pipeline and Batches
// =============================================================================

mod tier4_pipeline {
    use super::*;
    use mesh::pipeline::{PipelineError, PipelineWarning, Stage, format_duration, format_size};
    use std::time::Duration;

    #[test]
    fn pipeline_config_presets() {
        let config = PipelineConfig::default();
        assert!(config.decimate.is_none());
        assert!(config.repair.is_some());

        let stats = PipelineConfig::statistics_only();
        assert!(stats.is_statistics_only());

        let printing = PipelineConfig::simplified_for_printing();
        assert_eq!(printing.output_suffix, "_simplified");
    }

    #[test]
    fn in_memory_run() {
        let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let (mesh, report) = pipeline.run_mesh(cube_with_floater()).unwrap();
        assert_eq!(mesh, types::unit_cube());
        assert_eq!(report.before.face_count, 16);
        assert_eq!(report.final_statistics().face_count, 12);
        assert!(report.timings.iter().any(|t| t.stage == Stage::Repair));
        assert!(!report.has_warnings());
    }

    #[test]
    fn degenerate_input_exit_code() {
        let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let err = pipeline.run_mesh(IndexedMesh::new()).unwrap_err();
        assert!(matches!(err, PipelineError::DegenerateInput { .. }));
        assert_eq!(err.exit_code(), pipeline::EXIT_INVALID_INPUT);
    }

    #[test]
    fn warnings_are_values() {
        let w = PipelineWarning::DecimationIncomplete {
            target: 10,
            achieved: 12,
        };
        assert!(w.to_string().contains("target 10"));
    }

    #[test]
    fn formatting_helpers() {
        assert_eq!(format_duration(Duration::from_millis(1230)), "1.23s");
        assert_eq!(format_size(2048), "2.0 KB");
    }

    #[test]
    fn batch_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut jobs = Vec::new();
        for name in ["a.stl", "b.stl"] {
            let path = dir.path().join(name);
            save_mesh(&types::unit_cube(), &path, MeshFormat::Stl, &ExportOptions::default()).unwrap();
            jobs.push(PipelineJob::new(path));
        }

        let pipeline = Pipeline::new(PipelineConfig::statistics_only()).unwrap();
        let outcomes = pipeline::run_batch(&pipeline, jobs, 2).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(pipeline::BatchOutcome::is_success));
        assert_eq!(pipeline::batch_exit_code(&outcomes), 0);
    }
}
