//! Mesh file I/O.
//!
//! Loading and saving of triangle meshes:
//!
//! | Format | Load | Save |
//! |--------|------|------|
//! | **GLB** (binary glTF 2.0) | yes | no |
//! | **STL** (binary and ASCII) | yes | yes |
//! | **3MF** (ZIP + XML core profile) | yes | yes |
//!
//! Loading always yields a single [`IndexedMesh`]: multi-object inputs are
//! concatenated in document order. Saving is deterministic, so the same
//! mesh and options produce byte-identical output.
//!
//! A vertex-coloured mesh can be split into one part per palette colour
//! with [`split_by_palette`] and written as a multi-object 3MF with
//! [`save_parts`], or as one STL per part.
//!
//! # Layer 0 Crate
//!
//! This is a Layer 0 crate with no rendering or UI dependencies. It can be
//! used from CLI tools, servers, and batch jobs alike.
//!
//! # Example
//!
//! ```no_run
//! use mesh_io::{load_mesh, save_mesh, ExportOptions, MeshFormat};
//!
//! let mesh = load_mesh("scan.glb").unwrap();
//! save_mesh(&mesh, "scan.3mf", MeshFormat::ThreeMf, &ExportOptions::default()).unwrap();
//! ```
//!
//! # Format Detection
//!
//! [`MeshFormat::from_path`] maps extensions case-insensitively. Content is
//! never sniffed across formats: a `.stl` that is really a GLB is a format
//! error, not a silent success.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod error;
mod glb;
mod options;
mod palette;
mod stl;
mod threemf;

pub use error::{IoError, IoErrorKind, IoResult};
pub use glb::load_glb_bytes;
pub use options::{ExportOptions, Rgba, StlEncoding};
pub use palette::{
    color_distance, split_by_palette, ColorPalette, ColorParts, MeshPart, PaletteColor,
    DEFAULT_TOLERANCE,
};
pub use stl::{load_stl_bytes, write_stl};
pub use threemf::{load_3mf_bytes, write_3mf, write_3mf_parts};

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Cursor, Read, Write};
use std::path::Path;

use mesh_types::{IndexedMesh, MeshTopology};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Supported mesh file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeshFormat {
    /// Binary glTF 2.0. Input only.
    Glb,
    /// STL (Stereolithography), binary or ASCII.
    Stl,
    /// 3MF (3D Manufacturing Format) core profile.
    #[serde(rename = "3mf")]
    ThreeMf,
}

impl MeshFormat {
    /// Detect format from file extension.
    ///
    /// Returns `None` if the extension is missing or not recognized.
    #[must_use]
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "glb" => Some(Self::Glb),
            "stl" => Some(Self::Stl),
            "3mf" => Some(Self::ThreeMf),
            _ => None,
        }
    }

    /// Like [`from_path`](Self::from_path), but reports the offending
    /// extension.
    ///
    /// # Errors
    ///
    /// [`IoError::UnknownFormat`] when the extension is missing or unknown.
    pub fn detect<P: AsRef<Path>>(path: P) -> IoResult<Self> {
        let path = path.as_ref();
        Self::from_path(path).ok_or_else(|| IoError::UnknownFormat {
            extension: path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("(none)")
                .to_string(),
        })
    }

    /// Get the canonical file extension for this format.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Glb => "glb",
            Self::Stl => "stl",
            Self::ThreeMf => "3mf",
        }
    }

    /// Whether [`export_mesh`] can produce this format.
    #[must_use]
    pub const fn is_exportable(&self) -> bool {
        matches!(self, Self::Stl | Self::ThreeMf)
    }
}

impl fmt::Display for MeshFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Glb => "GLB",
            Self::Stl => "STL",
            Self::ThreeMf => "3MF",
        })
    }
}

// =============================================================================
// Loading
// =============================================================================

/// Load a mesh from a file, detecting format from extension.
///
/// # Errors
///
/// Returns an error if:
/// - The file format cannot be determined from the extension
/// - The file does not exist or cannot be read
/// - The file content is invalid for the detected format
///
/// # Example
///
/// ```no_run
/// use mesh_io::load_mesh;
///
/// let mesh = load_mesh("model.stl").unwrap();
/// ```
pub fn load_mesh<P: AsRef<Path>>(path: P) -> IoResult<IndexedMesh> {
    let path = path.as_ref();
    let format = MeshFormat::detect(path)?;
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => IoError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => IoError::Io(e),
    })?;
    let mesh = load_mesh_from_reader(file, format)?;
    info!(
        path = %path.display(),
        %format,
        vertices = mesh.vertex_count(),
        faces = mesh.face_count(),
        "loaded mesh"
    );
    Ok(mesh)
}

/// Load a mesh from any reader.
///
/// The reader is consumed to its end before parsing.
///
/// # Errors
///
/// Read failures and format errors, as for [`load_mesh_bytes`].
pub fn load_mesh_from_reader<R: Read>(mut reader: R, format: MeshFormat) -> IoResult<IndexedMesh> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    load_mesh_bytes(&data, format)
}

/// Load a mesh from an in-memory buffer of the given format.
///
/// # Errors
///
/// Any format error the selected parser reports.
pub fn load_mesh_bytes(data: &[u8], format: MeshFormat) -> IoResult<IndexedMesh> {
    match format {
        MeshFormat::Glb => load_glb_bytes(data),
        MeshFormat::Stl => load_stl_bytes(data),
        MeshFormat::ThreeMf => load_3mf_bytes(data),
    }
}

// =============================================================================
// Saving
// =============================================================================

/// Serialize a mesh to bytes.
///
/// # Errors
///
/// - [`IoError::UnsupportedFeature`] for GLB output, or for options the
///   target format cannot carry.
/// - [`IoError::IndexOutOfBounds`] if a face references a missing vertex.
pub fn export_mesh(
    mesh: &IndexedMesh,
    format: MeshFormat,
    options: &ExportOptions,
) -> IoResult<Vec<u8>> {
    match format {
        MeshFormat::Glb => Err(IoError::unsupported("export", MeshFormat::Glb)),
        MeshFormat::Stl => {
            let mut out = Vec::new();
            write_stl(mesh, &mut out, options)?;
            Ok(out)
        }
        MeshFormat::ThreeMf => {
            let mut cursor = Cursor::new(Vec::new());
            write_3mf(mesh, &mut cursor, options)?;
            Ok(cursor.into_inner())
        }
    }
}

/// Serialize a mesh and write it to `path`.
///
/// The mesh is fully serialized before the file is created, so a format
/// error never leaves a partial file behind.
///
/// # Errors
///
/// Everything [`export_mesh`] reports, plus [`IoError::Write`] when the
/// destination cannot be created or written.
pub fn save_mesh<P: AsRef<Path>>(
    mesh: &IndexedMesh,
    path: P,
    format: MeshFormat,
    options: &ExportOptions,
) -> IoResult<u64> {
    let bytes = export_mesh(mesh, format, options)?;
    write_file(path.as_ref(), &bytes, format)
}

/// Serialize colour parts as a multi-object 3MF package.
///
/// # Errors
///
/// As for [`write_3mf_parts`].
pub fn export_parts(parts: &ColorParts, options: &ExportOptions) -> IoResult<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    write_3mf_parts(parts, &mut cursor, options)?;
    Ok(cursor.into_inner())
}

/// Serialize colour parts as a multi-object 3MF and write it to `path`.
///
/// # Errors
///
/// Everything [`export_parts`] reports, plus [`IoError::Write`].
pub fn save_parts<P: AsRef<Path>>(
    parts: &ColorParts,
    path: P,
    options: &ExportOptions,
) -> IoResult<u64> {
    let bytes = export_parts(parts, options)?;
    write_file(path.as_ref(), &bytes, MeshFormat::ThreeMf)
}

fn write_file(path: &Path, bytes: &[u8], format: MeshFormat) -> IoResult<u64> {
    let write_err = |source| IoError::Write {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(write_err)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(bytes).map_err(write_err)?;
    writer.flush().map_err(write_err)?;

    info!(
        path = %path.display(),
        %format,
        bytes = bytes.len(),
        "saved mesh"
    );
    Ok(bytes.len() as u64)
}
