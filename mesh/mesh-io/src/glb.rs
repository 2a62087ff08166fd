//! GLB (binary glTF 2.0) loading.
//!
//! # Container Layout
//!
//! ```text
//! UINT32  magic    = 0x46546C67 ("glTF")
//! UINT32  version  = 2
//! UINT32  length   – total byte length, header included
//! chunk*  { UINT32 length; UINT32 type; UINT8[length] data }
//! ```
//!
//! The first chunk is the JSON document, the optional second chunk the
//! binary buffer that buffer 0 refers to.
//!
//! # Supported Subset
//!
//! - Every triangle-mode primitive of every mesh, concatenated in document
//!   order. Node transforms are not applied.
//! - `POSITION` and `NORMAL` as float `VEC3`; `TEXCOORD_0` as float or
//!   normalized unsigned `VEC2`; `COLOR_0` as float or normalized unsigned
//!   `VEC3`/`VEC4`, quantized to 8 bits per channel.
//! - Indices as unsigned byte, short, or int; primitives without indices
//!   are read as sequential triangles.
//! - The base-colour image, if it lives in a buffer view.
//!
//! Normals, UVs, and colours are kept only when every primitive has them.

use std::collections::HashMap;

use mesh_types::{IndexedMesh, MeshTopology, Normals, Point3, TextureRef, Vector3};
use serde::Deserialize;
use tracing::debug;

use crate::error::{IoError, IoResult};
use crate::MeshFormat;

const GLB_MAGIC: u32 = 0x4654_6C67; // "glTF"
const GLB_VERSION: u32 = 2;
const CHUNK_JSON: u32 = 0x4E4F_534A; // "JSON"
const CHUNK_BIN: u32 = 0x004E_4942; // "BIN\0"
const HEADER_LEN: usize = 12;

const UNSIGNED_BYTE: u32 = 5121;
const UNSIGNED_SHORT: u32 = 5123;
const UNSIGNED_INT: u32 = 5125;
const FLOAT: u32 = 5126;

const MODE_TRIANGLES: u32 = 4;

// =============================================================================
// Document model (only the fields the loader reads)
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Document {
    #[serde(default)]
    accessors: Vec<Accessor>,
    #[serde(default)]
    buffer_views: Vec<BufferView>,
    #[serde(default)]
    buffers: Vec<Buffer>,
    #[serde(default)]
    meshes: Vec<Mesh>,
    #[serde(default)]
    materials: Vec<Material>,
    #[serde(default)]
    textures: Vec<Texture>,
    #[serde(default)]
    images: Vec<Image>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Accessor {
    buffer_view: Option<usize>,
    #[serde(default)]
    byte_offset: usize,
    component_type: u32,
    #[serde(default)]
    normalized: bool,
    count: usize,
    #[serde(rename = "type")]
    element: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BufferView {
    buffer: usize,
    #[serde(default)]
    byte_offset: usize,
    byte_length: usize,
    byte_stride: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct Buffer {
    uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Mesh {
    #[serde(default)]
    primitives: Vec<Primitive>,
}

#[derive(Debug, Deserialize)]
struct Primitive {
    attributes: HashMap<String, usize>,
    indices: Option<usize>,
    material: Option<usize>,
    #[serde(default = "default_mode")]
    mode: u32,
}

const fn default_mode() -> u32 {
    MODE_TRIANGLES
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Material {
    pbr_metallic_roughness: Option<PbrMetallicRoughness>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PbrMetallicRoughness {
    base_color_texture: Option<TextureInfo>,
}

#[derive(Debug, Deserialize)]
struct TextureInfo {
    index: usize,
}

#[derive(Debug, Deserialize)]
struct Texture {
    source: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Image {
    buffer_view: Option<usize>,
    mime_type: Option<String>,
}

// =============================================================================
// Container parsing
// =============================================================================

fn read_u32(data: &[u8], offset: usize) -> IoResult<u32> {
    let bytes = data
        .get(offset..offset + 4)
        .ok_or(IoError::UnexpectedEof {
            position: offset as u64,
        })?;
    let mut word = [0u8; 4];
    word.copy_from_slice(bytes);
    Ok(u32::from_le_bytes(word))
}

/// Split a GLB container into its JSON and BIN chunks.
fn split_chunks(data: &[u8]) -> IoResult<(&[u8], Option<&[u8]>)> {
    if data.len() < HEADER_LEN {
        return Err(IoError::InvalidHeader {
            expected: HEADER_LEN,
            got: data.len(),
        });
    }
    let magic = read_u32(data, 0)?;
    if magic != GLB_MAGIC {
        return Err(IoError::invalid_content(format!(
            "not a GLB container (magic 0x{magic:08X}, expected 0x{GLB_MAGIC:08X})"
        )));
    }
    let version = read_u32(data, 4)?;
    if version != GLB_VERSION {
        return Err(IoError::invalid_content(format!(
            "unsupported GLB version {version}, expected {GLB_VERSION}"
        )));
    }
    let declared = read_u32(data, 8)? as usize;
    if declared > data.len() {
        return Err(IoError::UnexpectedEof {
            position: data.len() as u64,
        });
    }
    let data = &data[..declared];

    let mut json = None;
    let mut bin = None;
    let mut offset = HEADER_LEN;
    while offset < data.len() {
        let chunk_len = read_u32(data, offset)? as usize;
        let chunk_type = read_u32(data, offset + 4)?;
        let start = offset + 8;
        let end = start.checked_add(chunk_len).filter(|&e| e <= data.len()).ok_or(
            IoError::UnexpectedEof {
                position: data.len() as u64,
            },
        )?;
        let body = &data[start..end];
        match chunk_type {
            CHUNK_JSON if json.is_none() => json = Some(body),
            CHUNK_BIN if bin.is_none() => bin = Some(body),
            _ => {} // extension chunks are skipped
        }
        offset = end;
    }

    let json = json.ok_or_else(|| IoError::invalid_content("GLB has no JSON chunk"))?;
    Ok((json, bin))
}

// =============================================================================
// Accessor reads
// =============================================================================

struct Buffers<'a> {
    doc: &'a Document,
    bin: Option<&'a [u8]>,
}

/// Byte window of one accessor: where each element starts and how large it is.
struct Window<'a> {
    bytes: &'a [u8],
    stride: usize,
    element_size: usize,
    count: usize,
}

impl Window<'_> {
    fn element(&self, i: usize) -> &[u8] {
        let start = i * self.stride;
        &self.bytes[start..start + self.element_size]
    }
}

const fn component_size(component_type: u32) -> Option<usize> {
    match component_type {
        UNSIGNED_BYTE => Some(1),
        UNSIGNED_SHORT => Some(2),
        UNSIGNED_INT | FLOAT => Some(4),
        _ => None,
    }
}

fn component_count(element: &str) -> Option<usize> {
    match element {
        "SCALAR" => Some(1),
        "VEC2" => Some(2),
        "VEC3" => Some(3),
        "VEC4" => Some(4),
        _ => None,
    }
}

impl<'a> Buffers<'a> {
    fn view_bytes(&self, index: usize) -> IoResult<(&'a [u8], &'a BufferView)> {
        let view = self.doc.buffer_views.get(index).ok_or_else(|| {
            IoError::invalid_content(format!("bufferView {index} does not exist"))
        })?;
        let buffer = self.doc.buffers.get(view.buffer).ok_or_else(|| {
            IoError::invalid_content(format!("buffer {} does not exist", view.buffer))
        })?;
        if view.buffer != 0 || buffer.uri.is_some() {
            return Err(IoError::unsupported("external buffers", MeshFormat::Glb));
        }
        let bin = self
            .bin
            .ok_or_else(|| IoError::invalid_content("GLB references a missing BIN chunk"))?;
        let bytes = view
            .byte_offset
            .checked_add(view.byte_length)
            .and_then(|end| bin.get(view.byte_offset..end))
            .ok_or(IoError::BufferOverrun {
                what: "bufferView",
                index,
            })?;
        Ok((bytes, view))
    }

    fn window(&self, index: usize, allowed: &[u32], components: usize) -> IoResult<Window<'a>> {
        let acc = self.doc.accessors.get(index).ok_or_else(|| {
            IoError::invalid_content(format!("accessor {index} does not exist"))
        })?;
        if !allowed.contains(&acc.component_type) {
            return Err(IoError::unsupported(
                format!(
                    "component type {} on accessor {index}",
                    acc.component_type
                ),
                MeshFormat::Glb,
            ));
        }
        if component_count(&acc.element) != Some(components) {
            return Err(IoError::invalid_content(format!(
                "accessor {index} has type {}, expected {components} components",
                acc.element
            )));
        }
        let view_index = acc
            .buffer_view
            .ok_or_else(|| IoError::unsupported("sparse accessors", MeshFormat::Glb))?;
        let (view, meta) = self.view_bytes(view_index)?;

        let element_size = component_size(acc.component_type).unwrap_or(4) * components;
        let stride = meta.byte_stride.unwrap_or(element_size);
        if stride < element_size {
            return Err(IoError::invalid_content(format!(
                "bufferView {view_index} stride {stride} is smaller than element size {element_size}"
            )));
        }
        let overrun = IoError::BufferOverrun {
            what: "accessor",
            index,
        };
        if acc.count == 0 {
            return Ok(Window {
                bytes: &[],
                stride,
                element_size,
                count: 0,
            });
        }
        let needed = (acc.count - 1)
            .checked_mul(stride)
            .and_then(|n| n.checked_add(element_size))
            .ok_or(IoError::BufferOverrun {
                what: "accessor",
                index,
            })?;
        let bytes = acc
            .byte_offset
            .checked_add(needed)
            .and_then(|end| view.get(acc.byte_offset..end))
            .ok_or(overrun)?;
        Ok(Window {
            bytes,
            stride,
            element_size,
            count: acc.count,
        })
    }

    fn read_vec3(&self, index: usize) -> IoResult<Vec<Vector3<f64>>> {
        let w = self.window(index, &[FLOAT], 3)?;
        Ok((0..w.count)
            .map(|i| {
                let e = w.element(i);
                Vector3::new(f32_at(e, 0), f32_at(e, 4), f32_at(e, 8))
            })
            .collect())
    }

    fn read_uv(&self, index: usize) -> IoResult<Vec<[f32; 2]>> {
        let acc_normalized = self.doc.accessors.get(index).is_some_and(|a| a.normalized);
        let w = self.window(index, &[FLOAT, UNSIGNED_BYTE, UNSIGNED_SHORT], 2)?;
        let component_type = self.doc.accessors[index].component_type;
        if component_type != FLOAT && !acc_normalized {
            return Err(IoError::unsupported(
                "non-normalized integer texture coordinates",
                MeshFormat::Glb,
            ));
        }
        Ok((0..w.count)
            .map(|i| {
                let e = w.element(i);
                match component_type {
                    UNSIGNED_BYTE => [f32::from(e[0]) / 255.0, f32::from(e[1]) / 255.0],
                    UNSIGNED_SHORT => [
                        f32::from(u16_at(e, 0)) / 65535.0,
                        f32::from(u16_at(e, 2)) / 65535.0,
                    ],
                    _ => [f32_le(e, 0), f32_le(e, 4)],
                }
            })
            .collect())
    }

    fn read_colors(&self, index: usize) -> IoResult<Vec<[u8; 4]>> {
        let acc = self.doc.accessors.get(index).ok_or_else(|| {
            IoError::invalid_content(format!("accessor {index} does not exist"))
        })?;
        let components = if acc.element == "VEC4" { 4 } else { 3 };
        let w = self.window(index, &[FLOAT, UNSIGNED_BYTE, UNSIGNED_SHORT], components)?;
        if acc.component_type != FLOAT && !acc.normalized {
            return Err(IoError::unsupported(
                "non-normalized integer vertex colours",
                MeshFormat::Glb,
            ));
        }
        let component_type = acc.component_type;
        Ok((0..w.count)
            .map(|i| {
                let e = w.element(i);
                let mut rgba = [255u8; 4];
                for (c, slot) in rgba.iter_mut().enumerate().take(components) {
                    *slot = match component_type {
                        UNSIGNED_BYTE => e[c],
                        UNSIGNED_SHORT => unit_to_u8(f32::from(u16_at(e, 2 * c)) / 65535.0),
                        _ => unit_to_u8(f32_le(e, 4 * c)),
                    };
                }
                rgba
            })
            .collect())
    }

    fn read_indices(&self, index: usize) -> IoResult<Vec<u32>> {
        let w = self.window(index, &[UNSIGNED_BYTE, UNSIGNED_SHORT, UNSIGNED_INT], 1)?;
        Ok((0..w.count)
            .map(|i| {
                let e = w.element(i);
                match w.element_size {
                    1 => u32::from(e[0]),
                    2 => u32::from(u16_at(e, 0)),
                    _ => u32_at(e, 0),
                }
            })
            .collect())
    }
}

fn f32_le(e: &[u8], at: usize) -> f32 {
    f32::from_le_bytes([e[at], e[at + 1], e[at + 2], e[at + 3]])
}

fn f32_at(e: &[u8], at: usize) -> f64 {
    f64::from(f32_le(e, at))
}

fn u16_at(e: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([e[at], e[at + 1]])
}

fn u32_at(e: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([e[at], e[at + 1], e[at + 2], e[at + 3]])
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
// Truncation: the value is clamped to [0, 255] first
fn unit_to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

// =============================================================================
// Mesh assembly
// =============================================================================

/// Parse a GLB container into a single concatenated mesh.
///
/// # Errors
///
/// - [`IoError::InvalidHeader`] / [`IoError::UnexpectedEof`] for a short or
///   truncated container.
/// - [`IoError::InvalidContent`] for bad magic, version, or JSON, or a
///   document with no triangle primitives.
/// - [`IoError::BufferOverrun`] when an accessor reaches past its view.
/// - [`IoError::IndexOutOfBounds`] when an index exceeds its primitive's
///   vertex count.
/// - [`IoError::UnsupportedFeature`] for external buffers, sparse
///   accessors, or component types outside the supported subset.
pub fn load_glb_bytes(data: &[u8]) -> IoResult<IndexedMesh> {
    let (json, bin) = split_chunks(data)?;
    let doc: Document = serde_json::from_slice(json)
        .map_err(|e| IoError::invalid_content(format!("invalid glTF JSON: {e}")))?;
    let buffers = Buffers { doc: &doc, bin };

    let mut mesh = IndexedMesh::new();
    let mut primitive_count = 0usize;
    let mut first_material = None;

    for prim in doc.meshes.iter().flat_map(|m| &m.primitives) {
        if prim.mode != MODE_TRIANGLES {
            debug!(mode = prim.mode, "skipping non-triangle primitive");
            continue;
        }
        let part = read_primitive(&buffers, prim, mesh.faces.len())?;
        mesh.merge(&part);
        primitive_count += 1;
        if first_material.is_none() {
            first_material = prim.material;
        }
    }

    if primitive_count == 0 || mesh.faces.is_empty() {
        return Err(IoError::invalid_content("GLB contains no triangles"));
    }

    mesh.texture = base_color_texture(&buffers, first_material)?;

    debug!(
        primitives = primitive_count,
        vertices = mesh.vertex_count(),
        faces = mesh.face_count(),
        normals = mesh.has_normals(),
        uvs = mesh.has_uvs(),
        colors = mesh.has_colors(),
        texture = mesh.texture.is_some(),
        "parsed GLB"
    );
    Ok(mesh)
}

fn read_primitive(buffers: &Buffers<'_>, prim: &Primitive, face_base: usize) -> IoResult<IndexedMesh> {
    let position_accessor = *prim
        .attributes
        .get("POSITION")
        .ok_or_else(|| IoError::invalid_content("primitive has no POSITION attribute"))?;
    let vertices: Vec<Point3<f64>> = buffers
        .read_vec3(position_accessor)?
        .into_iter()
        .map(Point3::from)
        .collect();
    let vertex_count = vertices.len();

    let indices = match prim.indices {
        Some(acc) => buffers.read_indices(acc)?,
        None => (0..u32::try_from(vertex_count)
            .map_err(|_| IoError::invalid_content("primitive too large for u32 indices"))?)
            .collect(),
    };
    if indices.len() % 3 != 0 {
        return Err(IoError::invalid_content(format!(
            "triangle primitive has {} indices, not a multiple of 3",
            indices.len()
        )));
    }
    let faces: Vec<[u32; 3]> = indices.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect();

    let mut part = IndexedMesh::from_parts(vertices, faces);
    part.validate_indices().map_err(|mut e| {
        e.face += face_base;
        e
    })?;

    if let Some(&acc) = prim.attributes.get("NORMAL") {
        let normals = buffers.read_vec3(acc)?;
        if normals.len() != vertex_count {
            return Err(IoError::invalid_content("NORMAL count differs from POSITION count"));
        }
        part.normals = Some(Normals::PerVertex(normals));
    }
    if let Some(&acc) = prim.attributes.get("TEXCOORD_0") {
        let uvs = buffers.read_uv(acc)?;
        if uvs.len() != vertex_count {
            return Err(IoError::invalid_content("TEXCOORD_0 count differs from POSITION count"));
        }
        part.uvs = Some(uvs);
    }
    if let Some(&acc) = prim.attributes.get("COLOR_0") {
        let colors = buffers.read_colors(acc)?;
        if colors.len() != vertex_count {
            return Err(IoError::invalid_content("COLOR_0 count differs from POSITION count"));
        }
        part.colors = Some(colors);
    }
    Ok(part)
}

/// Follow material → baseColorTexture → texture → image; fall back to the
/// first image stored in a buffer view.
fn base_color_texture(buffers: &Buffers<'_>, material: Option<usize>) -> IoResult<Option<TextureRef>> {
    let doc = buffers.doc;
    let linked = material
        .and_then(|m| doc.materials.get(m))
        .and_then(|m| m.pbr_metallic_roughness.as_ref())
        .and_then(|pbr| pbr.base_color_texture.as_ref())
        .and_then(|info| doc.textures.get(info.index))
        .and_then(|t| t.source)
        .and_then(|s| doc.images.get(s))
        .filter(|img| img.buffer_view.is_some());
    let image = linked.or_else(|| doc.images.iter().find(|img| img.buffer_view.is_some()));

    let Some(image) = image else {
        return Ok(None);
    };
    let Some(view) = image.buffer_view else {
        return Ok(None);
    };
    let (bytes, _) = buffers.view_bytes(view)?;
    Ok(Some(TextureRef::new(image.mime_type.clone(), bytes.to_vec())))
}
