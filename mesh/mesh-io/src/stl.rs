//! STL (Stereolithography) reading and writing.
//!
//! # Binary Format
//!
//! ```text
//! UINT8[80]    – Header (signature, zero-padded)
//! UINT32       – Number of triangles (little-endian)
//! foreach triangle
//!     REAL32[3] – Normal vector (recomputed on write, ignored on read)
//!     REAL32[3] – Vertex 1
//!     REAL32[3] – Vertex 2
//!     REAL32[3] – Vertex 3
//!     UINT16    – Attribute byte count (written as 0, ignored on read)
//! end
//! ```
//!
//! # ASCII Format
//!
//! ```text
//! solid name
//!   facet normal ni nj nk
//!     outer loop
//!       vertex v1x v1y v1z
//!       vertex v2x v2y v2z
//!       vertex v3x v3y v3z
//!     endloop
//!   endfacet
//! endsolid name
//! ```
//!
//! STL has no shared vertices: loading yields one vertex per corner
//! occurrence, three per face.

use std::io::{BufRead, Write};

use mesh_types::{IndexedMesh, MeshTopology, Point3, Triangle, Vector3};
use tracing::debug;

use crate::error::{IoError, IoResult};
use crate::{ExportOptions, MeshFormat, StlEncoding};

/// STL binary header size in bytes.
pub const HEADER_SIZE: usize = 80;

/// Size of one triangle in binary STL (normal + 3 vertices + attribute).
pub const TRIANGLE_SIZE: usize = 50;

/// Signature written at the start of the binary header.
const SIGNATURE: &[u8] = b"binary STL written by mesh-io";

/// Parse STL bytes, detecting ASCII versus binary.
///
/// # Errors
///
/// - [`IoError::InvalidHeader`] if binary data is shorter than 84 bytes.
/// - [`IoError::InvalidFaceCount`] if the data ends before the declared
///   number of records.
/// - [`IoError::InvalidContent`] for malformed ASCII, including text that
///   starts with `solid` but never declares a `facet`.
pub fn load_stl_bytes(data: &[u8]) -> IoResult<IndexedMesh> {
    let mesh = if is_ascii_stl(data) {
        load_stl_ascii(data)?
    } else {
        load_stl_binary(data)?
    };
    debug!(faces = mesh.face_count(), "parsed STL");
    Ok(mesh)
}

/// ASCII files start with `solid`. Binary writers sometimes put `solid` in
/// the header too, so a byte length matching the declared record count, or
/// a NUL in the header, wins for binary.
fn is_ascii_stl(data: &[u8]) -> bool {
    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(data.len());
    if !data[start..].starts_with(b"solid") {
        return false;
    }
    if data.len() >= HEADER_SIZE + 4 {
        if binary_size_matches(data) {
            return false;
        }
        if data[..HEADER_SIZE].contains(&0) {
            return false;
        }
    }
    true
}

fn binary_size_matches(data: &[u8]) -> bool {
    let count = read_u32(data, HEADER_SIZE);
    (HEADER_SIZE as u64 + 4 + u64::from(count) * TRIANGLE_SIZE as u64) == data.len() as u64
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&data[offset..offset + 4]);
    u32::from_le_bytes(word)
}

fn read_f32(data: &[u8], offset: usize) -> f32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&data[offset..offset + 4]);
    f32::from_le_bytes(word)
}

fn read_point(record: &[u8], offset: usize) -> Point3<f64> {
    Point3::new(
        f64::from(read_f32(record, offset)),
        f64::from(read_f32(record, offset + 4)),
        f64::from(read_f32(record, offset + 8)),
    )
}

fn load_stl_binary(data: &[u8]) -> IoResult<IndexedMesh> {
    if data.len() < HEADER_SIZE + 4 {
        return Err(IoError::InvalidHeader {
            expected: HEADER_SIZE + 4,
            got: data.len(),
        });
    }

    let face_count = read_u32(data, HEADER_SIZE);
    let body = &data[HEADER_SIZE + 4..];
    let available = body.len() / TRIANGLE_SIZE;
    if (available as u64) < u64::from(face_count) {
        return Err(IoError::InvalidFaceCount {
            expected: face_count,
            got: u32::try_from(available).unwrap_or(u32::MAX),
        });
    }

    let face_count = face_count as usize;
    let mut mesh = IndexedMesh::with_capacity(face_count * 3, face_count);
    for (i, record) in body.chunks_exact(TRIANGLE_SIZE).take(face_count).enumerate() {
        // Normal at 0..12 is ignored; the attribute word at 48..50 too.
        mesh.vertices.push(read_point(record, 12));
        mesh.vertices.push(read_point(record, 24));
        mesh.vertices.push(read_point(record, 36));

        #[allow(clippy::cast_possible_truncation)]
        // Truncation: face_count is a u32, so 3 * i + 2 fits unless the file lies about its size
        let base = (i * 3) as u32;
        mesh.faces.push([base, base + 1, base + 2]);
    }

    Ok(mesh)
}

fn load_stl_ascii(data: &[u8]) -> IoResult<IndexedMesh> {
    let mut mesh = IndexedMesh::new();
    let mut in_loop = false;
    let mut corners: Vec<Point3<f64>> = Vec::with_capacity(3);
    let mut saw_facet = false;

    for (line_no, line) in data.lines().enumerate() {
        let line =
            line.map_err(|e| IoError::invalid_content(format!("line {}: {e}", line_no + 1)))?;
        let mut parts = line.split_whitespace();
        let Some(keyword) = parts.next() else {
            continue;
        };

        match keyword.to_ascii_lowercase().as_str() {
            "facet" => saw_facet = true,
            "outer" => {
                in_loop = true;
                corners.clear();
            }
            "vertex" if in_loop => {
                let mut coord = || -> IoResult<f64> {
                    parts
                        .next()
                        .ok_or_else(|| {
                            IoError::invalid_content(format!(
                                "line {}: vertex needs three coordinates",
                                line_no + 1
                            ))
                        })?
                        .parse::<f64>()
                        .map_err(|e| {
                            IoError::invalid_content(format!("line {}: {e}", line_no + 1))
                        })
                };
                let (x, y, z) = (coord()?, coord()?, coord()?);
                corners.push(Point3::new(x, y, z));
            }
            "endloop" => in_loop = false,
            "endfacet" => {
                if corners.len() != 3 {
                    return Err(IoError::invalid_content(format!(
                        "line {}: facet has {} vertices, expected 3",
                        line_no + 1,
                        corners.len()
                    )));
                }
                #[allow(clippy::cast_possible_truncation)]
                // Truncation: mesh indices are u32, meshes with >4B vertices unsupported
                let base = mesh.vertices.len() as u32;
                mesh.vertices.append(&mut corners);
                mesh.faces.push([base, base + 1, base + 2]);
            }
            "endsolid" => break,
            _ => {}
        }
    }

    if !saw_facet {
        return Err(IoError::invalid_content(
            "starts with `solid` but holds no facet records",
        ));
    }
    Ok(mesh)
}

/// Serialize a mesh as STL into `writer`.
///
/// Face normals are recomputed from the positions; any normals stored on
/// the mesh are not trusted. Degenerate faces get a zero normal.
///
/// # Errors
///
/// - [`IoError::UnsupportedFeature`] if `options` requests a colour or an
///   embedded texture.
/// - [`IoError::IndexOutOfBounds`] for an invalid face index.
/// - [`IoError::InvalidContent`] if the face count exceeds `u32`.
/// - [`IoError::Io`] if the writer fails.
pub fn write_stl<W: Write>(
    mesh: &IndexedMesh,
    mut writer: W,
    options: &ExportOptions,
) -> IoResult<()> {
    if options.object_color.is_some() {
        return Err(IoError::unsupported("per-object color", MeshFormat::Stl));
    }
    if options.embed_texture && mesh.texture.is_some() {
        return Err(IoError::unsupported("embedded textures", MeshFormat::Stl));
    }
    mesh.validate_indices()?;

    match options.stl_encoding {
        StlEncoding::Binary => write_stl_binary(mesh, &mut writer),
        StlEncoding::Ascii => write_stl_ascii(mesh, &mut writer),
    }?;
    writer.flush()?;
    Ok(())
}

fn write_stl_binary<W: Write>(mesh: &IndexedMesh, writer: &mut W) -> IoResult<()> {
    let mut header = [0u8; HEADER_SIZE];
    header[..SIGNATURE.len()].copy_from_slice(SIGNATURE);
    writer.write_all(&header)?;

    let face_count = u32::try_from(mesh.faces.len())
        .map_err(|_| IoError::invalid_content("binary STL holds at most u32::MAX faces"))?;
    writer.write_all(&face_count.to_le_bytes())?;

    let mut record = [0u8; TRIANGLE_SIZE];
    for tri in mesh.triangles() {
        let normal = tri.normal().unwrap_or_else(Vector3::zeros);
        put_vec(&mut record[0..12], normal.x, normal.y, normal.z);
        put_vec(&mut record[12..24], tri.v0.x, tri.v0.y, tri.v0.z);
        put_vec(&mut record[24..36], tri.v1.x, tri.v1.y, tri.v1.z);
        put_vec(&mut record[36..48], tri.v2.x, tri.v2.y, tri.v2.z);
        // record[48..50] stays zero: attribute byte count.
        writer.write_all(&record)?;
    }

    Ok(())
}

#[allow(clippy::cast_possible_truncation)]
// Truncation: f64 to f32 is intentional for STL format which uses f32
fn put_vec(slot: &mut [u8], x: f64, y: f64, z: f64) {
    slot[0..4].copy_from_slice(&(x as f32).to_le_bytes());
    slot[4..8].copy_from_slice(&(y as f32).to_le_bytes());
    slot[8..12].copy_from_slice(&(z as f32).to_le_bytes());
}

fn write_stl_ascii<W: Write>(mesh: &IndexedMesh, writer: &mut W) -> IoResult<()> {
    writeln!(writer, "solid mesh")?;
    for tri in mesh.triangles() {
        let n = tri.normal().unwrap_or_else(Vector3::zeros);
        writeln!(writer, "  facet normal {:e} {:e} {:e}", n.x, n.y, n.z)?;
        writeln!(writer, "    outer loop")?;
        for p in corners(&tri) {
            writeln!(writer, "      vertex {:e} {:e} {:e}", p.x, p.y, p.z)?;
        }
        writeln!(writer, "    endloop")?;
        writeln!(writer, "  endfacet")?;
    }
    writeln!(writer, "endsolid mesh")?;
    Ok(())
}

const fn corners(tri: &Triangle) -> [Point3<f64>; 3] {
    [tri.v0, tri.v1, tri.v2]
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    clippy::unnecessary_raw_string_hashes
)]
mod tests {
    use super::*;
    use crate::Rgba;
    use mesh_types::{unit_cube, MeshBounds};

    fn encode(mesh: &IndexedMesh, options: &ExportOptions) -> Vec<u8> {
        let mut out = Vec::new();
        write_stl(mesh, &mut out, options).unwrap();
        out
    }

    #[test]
    fn cube_has_exact_binary_size() {
        let bytes = encode(&unit_cube(), &ExportOptions::default());
        assert_eq!(bytes.len(), 80 + 4 + 12 * 50);
        assert_eq!(read_u32(&bytes, HEADER_SIZE), 12);
        assert!(bytes[SIGNATURE.len()..HEADER_SIZE].iter().all(|&b| b == 0));
        // Attribute bytes are zero on every record.
        for record in bytes[84..].chunks_exact(TRIANGLE_SIZE) {
            assert_eq!(&record[48..50], &[0, 0]);
        }
    }

    #[test]
    fn written_normals_are_recomputed() {
        let mut cube = unit_cube();
        cube.normals = Some(mesh_types::Normals::PerFace(vec![
            mesh_types::Vector3::x();
            12
        ]));
        let bytes = encode(&cube, &ExportOptions::default());
        // First face is on the bottom: normal must be -Z regardless of stored normals.
        let first = &bytes[84..84 + TRIANGLE_SIZE];
        assert_eq!(read_f32(first, 0), 0.0);
        assert_eq!(read_f32(first, 4), 0.0);
        assert_eq!(read_f32(first, 8), -1.0);
    }

    #[test]
    fn binary_roundtrip_preserves_counts_and_bounds() {
        let cube = unit_cube();
        let loaded = load_stl_bytes(&encode(&cube, &ExportOptions::default())).unwrap();
        assert_eq!(loaded.face_count(), 12);
        assert_eq!(loaded.vertex_count(), 36);
        assert_eq!(loaded.bounds(), cube.bounds());
    }

    #[test]
    fn repeated_export_is_byte_identical() {
        let cube = unit_cube();
        let opts = ExportOptions::default();
        assert_eq!(encode(&cube, &opts), encode(&cube, &opts));
    }

    #[test]
    fn truncated_body_is_a_format_error() {
        let mut bytes = encode(&unit_cube(), &ExportOptions::default());
        bytes.truncate(84 + 5 * 50 + 10);
        match load_stl_bytes(&bytes) {
            Err(IoError::InvalidFaceCount { expected, got }) => {
                assert_eq!(expected, 12);
                assert_eq!(got, 5);
            }
            other => panic!("expected InvalidFaceCount, got {other:?}"),
        }
    }

    #[test]
    fn short_header_is_a_format_error() {
        let err = load_stl_bytes(&[0u8; 40]).unwrap_err();
        assert!(matches!(err, IoError::InvalidHeader { got: 40, .. }));
    }

    #[test]
    fn binary_with_solid_header_is_not_mistaken_for_ascii() {
        let mut bytes = encode(&unit_cube(), &ExportOptions::default());
        bytes[..5].copy_from_slice(b"solid");
        let mesh = load_stl_bytes(&bytes).unwrap();
        assert_eq!(mesh.face_count(), 12);
    }

    #[test]
    fn ascii_roundtrip() {
        let opts = ExportOptions::default().with_stl_encoding(StlEncoding::Ascii);
        let text = encode(&unit_cube(), &opts);
        assert!(text.starts_with(b"solid mesh"));
        let mesh = load_stl_bytes(&text).unwrap();
        assert_eq!(mesh.face_count(), 12);
        assert_eq!(mesh.bounds(), unit_cube().bounds());
    }

    #[test]
    fn ascii_parsing() {
        let ascii_stl = br#"solid test
  facet normal 0 0 1
    outer loop
      vertex 0 0 0
      vertex 1 0 0
      vertex 0 1 0
    endloop
  endfacet
endsolid test"#;
        let mesh = load_stl_bytes(ascii_stl).unwrap();
        assert_eq!(mesh.face_count(), 1);
        assert_eq!(mesh.vertices[1], Point3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn ascii_facet_with_two_vertices_is_rejected() {
        let ascii_stl = b"solid t\nfacet normal 0 0 1\nouter loop\nvertex 0 0 0\nvertex 1 0 0\nendloop\nendfacet\nendsolid t\n";
        assert!(matches!(
            load_stl_bytes(ascii_stl),
            Err(IoError::InvalidContent { .. })
        ));
    }

    #[test]
    fn solid_without_facets_is_a_format_error() {
        assert!(matches!(
            load_stl_bytes(b"solid empty\nendsolid empty\n"),
            Err(IoError::InvalidContent { .. })
        ));
    }

    #[test]
    fn truncated_binary_with_solid_header_is_a_format_error() {
        // A header with no NUL and a record count the body cannot hold
        // falls through to the ASCII parser, which must not report an
        // empty mesh.
        let mut bytes = vec![b' '; HEADER_SIZE];
        bytes[..5].copy_from_slice(b"solid");
        bytes.extend_from_slice(&12u32.to_le_bytes());
        bytes.extend_from_slice(&[b'A'; 3 * TRIANGLE_SIZE]);
        assert!(is_ascii_stl(&bytes));
        assert!(matches!(
            load_stl_bytes(&bytes),
            Err(IoError::InvalidContent { .. })
        ));
    }

    #[test]
    fn color_request_is_unsupported() {
        let opts = ExportOptions::default().with_object_color(Rgba::opaque(255, 0, 0));
        let err = write_stl(&unit_cube(), Vec::new(), &opts).unwrap_err();
        assert!(matches!(
            err,
            IoError::UnsupportedFeature {
                format: MeshFormat::Stl,
                ..
            }
        ));
    }

    #[test]
    fn bad_index_is_rejected_before_writing() {
        let mut mesh = unit_cube();
        mesh.faces.push([0, 1, 99]);
        let mut out = Vec::new();
        let err = write_stl(&mesh, &mut out, &ExportOptions::default()).unwrap_err();
        assert!(matches!(err, IoError::IndexOutOfBounds(_)));
        assert!(out.is_empty());
    }
}
