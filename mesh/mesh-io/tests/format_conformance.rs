//! Conformance tests for the on-disk formats.
//!
//! Fixtures are generated in-process so the suite has no external data:
//! - Multiple disconnected components
//! - Both ASCII and binary STL
//! - 3MF packages with and without a display colour
//!
//! To run: cargo test -p mesh-io --test format_conformance

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]

use std::io::Read;

use approx::assert_relative_eq;
use mesh_io::{
    export_mesh, load_mesh, load_mesh_bytes, save_mesh, ExportOptions, IoError, IoErrorKind,
    MeshFormat, Rgba, StlEncoding,
};
use mesh_types::{unit_cube, IndexedMesh, MeshBounds, MeshTopology, Point3};
use tempfile::tempdir;

/// Two cubes side by side, the second shifted by 3 units in x.
fn two_cubes() -> IndexedMesh {
    let mut mesh = unit_cube();
    let mut shifted = unit_cube();
    for v in &mut shifted.vertices {
        v.x += 3.0;
    }
    mesh.merge(&shifted);
    mesh
}

#[test]
fn binary_stl_layout() {
    let mesh = two_cubes();
    let bytes = export_mesh(&mesh, MeshFormat::Stl, &ExportOptions::default()).unwrap();
    assert_eq!(bytes.len(), 84 + 50 * 24);
    let count = u32::from_le_bytes([bytes[80], bytes[81], bytes[82], bytes[83]]);
    assert_eq!(count, 24);
    // Attribute byte count of every record is zero.
    for record in bytes[84..].chunks_exact(50) {
        assert_eq!(&record[48..50], &[0, 0]);
    }
}

#[test]
fn stl_preserves_geometry_not_topology() {
    let mesh = two_cubes();
    for encoding in [StlEncoding::Binary, StlEncoding::Ascii] {
        let opts = ExportOptions::default().with_stl_encoding(encoding);
        let bytes = export_mesh(&mesh, MeshFormat::Stl, &opts).unwrap();
        let back = load_mesh_bytes(&bytes, MeshFormat::Stl).unwrap();

        assert_eq!(back.face_count(), mesh.face_count());
        // STL stores corners, not shared vertices.
        assert_eq!(back.vertex_count(), 3 * mesh.face_count());
        let (a, b) = (mesh.bounds(), back.bounds());
        assert_relative_eq!(a.min, b.min, epsilon = 1e-6);
        assert_relative_eq!(a.max, b.max, epsilon = 1e-6);
        assert_relative_eq!(back.signed_volume(), 2.0, epsilon = 1e-5);
    }
}

#[test]
fn threemf_preserves_indexed_topology() {
    let mesh = two_cubes();
    let bytes = export_mesh(&mesh, MeshFormat::ThreeMf, &ExportOptions::default()).unwrap();
    let back = load_mesh_bytes(&bytes, MeshFormat::ThreeMf).unwrap();
    assert_eq!(back.vertex_count(), mesh.vertex_count());
    assert_eq!(back.faces, mesh.faces);
    for (p, q) in mesh.vertices.iter().zip(&back.vertices) {
        assert_relative_eq!(p, q, epsilon = 1e-12);
    }
}

#[test]
fn threemf_package_is_a_valid_zip() {
    let opts = ExportOptions::default().with_object_color(Rgba::opaque(10, 20, 30));
    let bytes = export_mesh(&unit_cube(), MeshFormat::ThreeMf, &opts).unwrap();

    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
    let names: Vec<String> = archive.file_names().map(str::to_string).collect();
    assert!(names.iter().any(|n| n == "[Content_Types].xml"));
    assert!(names.iter().any(|n| n == "_rels/.rels"));

    let mut model = String::new();
    archive
        .by_name("3D/3dmodel.model")
        .unwrap()
        .read_to_string(&mut model)
        .unwrap();
    assert!(model.contains("displaycolor=\"#0A141EFF\""));
    assert!(model.contains("unit=\"millimeter\""));
}

#[test]
fn exports_are_deterministic() {
    let mesh = two_cubes();
    for format in [MeshFormat::Stl, MeshFormat::ThreeMf] {
        let a = export_mesh(&mesh, format, &ExportOptions::default()).unwrap();
        let b = export_mesh(&mesh, format, &ExportOptions::default()).unwrap();
        assert_eq!(a, b, "{format} output differs between runs");
    }
}

#[test]
fn file_roundtrip_through_disk() {
    let dir = tempdir().unwrap();
    let mesh = two_cubes();
    let path = dir.path().join("parts.3MF");
    save_mesh(&mesh, &path, MeshFormat::ThreeMf, &ExportOptions::default()).unwrap();
    let back = load_mesh(&path).unwrap();
    assert_eq!(back.face_count(), 24);
}

#[test]
fn format_is_not_sniffed_across_extensions() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("actually_3mf.stl");
    let bytes = export_mesh(&unit_cube(), MeshFormat::ThreeMf, &ExportOptions::default()).unwrap();
    std::fs::write(&path, bytes).unwrap();

    let err = load_mesh(&path).unwrap_err();
    assert_eq!(err.kind(), IoErrorKind::Format);
}

#[test]
fn unknown_extension_is_reported() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("model.obj");
    std::fs::write(&path, b"v 0 0 0\n").unwrap();
    assert!(matches!(
        load_mesh(&path),
        Err(IoError::UnknownFormat { extension }) if extension == "obj"
    ));
}

#[test]
fn color_and_texture_requests_fail_loudly_for_stl() {
    let colored = ExportOptions::default().with_object_color(Rgba::opaque(255, 0, 0));
    let err = export_mesh(&unit_cube(), MeshFormat::Stl, &colored).unwrap_err();
    assert_eq!(err.kind(), IoErrorKind::UnsupportedFeature);

    let mut textured = unit_cube();
    textured.texture = Some(mesh_types::TextureRef::new(
        Some("image/png".to_string()),
        vec![1u8, 2, 3],
    ));
    let embed = ExportOptions::default().with_embedded_texture(true);
    for format in [MeshFormat::Stl, MeshFormat::ThreeMf] {
        let err = export_mesh(&textured, format, &embed).unwrap_err();
        assert!(matches!(err, IoError::UnsupportedFeature { .. }));
    }

    // Without the request the texture is dropped silently.
    let bytes = export_mesh(&textured, MeshFormat::Stl, &ExportOptions::default()).unwrap();
    assert_eq!(bytes.len(), 684);
}

#[test]
fn invalid_index_fails_before_writing() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.stl");
    let mesh = IndexedMesh::from_parts(
        vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)],
        vec![[0, 1, 2]],
    );
    let err = save_mesh(&mesh, &path, MeshFormat::Stl, &ExportOptions::default()).unwrap_err();
    assert!(matches!(err, IoError::IndexOutOfBounds(_)));
    assert!(!path.exists());
}
