//! 3MF (3D Manufacturing Format) support.
//!
//! A 3MF file is a ZIP package holding XML parts:
//! - `[Content_Types].xml` - MIME type mappings
//! - `_rels/.rels` - relationship pointing at the model part
//! - `3D/3dmodel.model` - the model: resources, objects, build items
//!
//! # Written Profile
//!
//! [`write_3mf`] writes one `<object>` with the full vertex and triangle
//! lists and one build `<item>` referencing it. An optional whole-object
//! colour is written as a single-entry `<basematerials>` group.
//!
//! [`write_3mf_parts`] writes one named object per colour part, all sharing
//! one `<basematerials>` group that lists the whole palette; each object
//! points at its own entry. Textures are not written.
//!
//! Output is deterministic: entries are written in a fixed order with a
//! fixed timestamp, and coordinates use Rust's shortest round-trip
//! formatting.
//!
//! # Reading
//!
//! Every `<mesh>` in the model part is concatenated. Build transforms and
//! materials are ignored.

use std::io::{Cursor, Read, Seek, Write};
use std::str::FromStr;

use mesh_types::{IndexedMesh, MeshTopology, Point3};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::error::{IoError, IoResult};
use crate::palette::ColorParts;
use crate::{ExportOptions, MeshFormat, Rgba};

/// 3MF core namespace URI.
const NAMESPACE_3MF: &str = "http://schemas.microsoft.com/3dmanufacturing/core/2015/02";

/// Package path of the model part.
pub const MODEL_PATH: &str = "3D/3dmodel.model";

/// Content types XML for 3MF.
const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="model" ContentType="application/vnd.ms-package.3dmanufacturing-3dmodel+xml"/>
</Types>"#;

/// Relationships XML for 3MF.
const RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Target="/3D/3dmodel.model" Id="rel0" Type="http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel"/>
</Relationships>"#;

/// One `<object>` to write. Objects are numbered from 1 in order.
struct ModelObject<'a> {
    mesh: &'a IndexedMesh,
    name: Option<&'a str>,
    /// Index into the `<basematerials>` group.
    material: Option<usize>,
}

/// Parse a 3MF package from memory.
///
/// # Errors
///
/// - [`IoError::InvalidContent`] if the data is not a ZIP archive, has no
///   model part, or the XML is malformed.
/// - [`IoError::IndexOutOfBounds`] if a triangle references a missing vertex.
pub fn load_3mf_bytes(data: &[u8]) -> IoResult<IndexedMesh> {
    let mut archive = ZipArchive::new(Cursor::new(data))
        .map_err(|e| IoError::invalid_content(format!("invalid ZIP archive: {e}")))?;
    let model = read_model_part(&mut archive)?;
    let mesh = parse_model(&model)?;
    mesh.validate_indices()?;
    debug!(
        vertices = mesh.vertex_count(),
        faces = mesh.face_count(),
        "parsed 3MF"
    );
    Ok(mesh)
}

fn read_model_part<R: Read + Seek>(archive: &mut ZipArchive<R>) -> IoResult<String> {
    let name = if archive.index_for_name(MODEL_PATH).is_some() {
        MODEL_PATH.to_string()
    } else {
        // Some writers vary the case or the file name; take the first *.model part.
        archive
            .file_names()
            .filter(|n| {
                std::path::Path::new(n)
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("model"))
            })
            .min()
            .map(str::to_string)
            .ok_or_else(|| IoError::invalid_content("3MF package has no model part"))?
    };

    let mut part = archive
        .by_name(&name)
        .map_err(|e| IoError::invalid_content(format!("cannot open {name}: {e}")))?;
    let mut content = String::new();
    part.read_to_string(&mut content)
        .map_err(|e| IoError::invalid_content(format!("cannot read {name}: {e}")))?;
    Ok(content)
}

fn parse_model(content: &str) -> IoResult<IndexedMesh> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut mesh = IndexedMesh::new();
    let mut in_vertices = false;
    let mut in_triangles = false;
    let mut vertex_offset: u32 = 0;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e) | Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"mesh" => {
                    vertex_offset = u32::try_from(mesh.vertices.len())
                        .map_err(|_| IoError::invalid_content("too many vertices"))?;
                }
                b"vertices" => in_vertices = true,
                b"triangles" => in_triangles = true,
                b"vertex" if in_vertices => {
                    let [x, y, z] = parsed_attrs::<f64>(e, [b"x", b"y", b"z"])?;
                    mesh.vertices.push(Point3::new(x, y, z));
                }
                b"triangle" if in_triangles => {
                    let [a, b, c] = parsed_attrs::<u32>(e, [b"v1", b"v2", b"v3"])?;
                    mesh.faces.push([a, b, c].map(|i| i.saturating_add(vertex_offset)));
                }
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"vertices" => in_vertices = false,
                b"triangles" => in_triangles = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(IoError::invalid_content(format!(
                    "XML error at byte {}: {e}",
                    reader.error_position()
                )));
            }
            _ => {}
        }
    }

    Ok(mesh)
}

fn attr_text(element: &BytesStart<'_>, key: &[u8]) -> IoResult<Option<String>> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| IoError::invalid_content(format!("bad attribute: {e}")))?;
        if attr.key.local_name().as_ref() == key {
            let value = std::str::from_utf8(&attr.value)
                .map_err(|e| IoError::invalid_content(format!("invalid UTF-8 in attribute: {e}")))?;
            return Ok(Some(value.to_string()));
        }
    }
    Ok(None)
}

fn parsed_attrs<T>(element: &BytesStart<'_>, keys: [&[u8]; 3]) -> IoResult<[T; 3]>
where
    T: FromStr + Copy + Default,
    T::Err: std::fmt::Display,
{
    let mut out = [T::default(); 3];
    for (slot, key) in out.iter_mut().zip(keys) {
        let text = attr_text(element, key)?.ok_or_else(|| missing(key))?;
        *slot = text.trim().parse().map_err(|e| {
            IoError::invalid_content(format!("invalid {}: {e}", String::from_utf8_lossy(key)))
        })?;
    }
    Ok(out)
}

fn missing(key: &[u8]) -> IoError {
    IoError::invalid_content(format!(
        "missing attribute {}",
        String::from_utf8_lossy(key)
    ))
}

/// Write a 3MF package into `writer`.
///
/// # Errors
///
/// - [`IoError::UnsupportedFeature`] if an embedded texture is requested.
/// - [`IoError::IndexOutOfBounds`] for an invalid face index.
/// - [`IoError::Io`] if the writer fails.
pub fn write_3mf<W: Write + Seek>(
    mesh: &IndexedMesh,
    writer: W,
    options: &ExportOptions,
) -> IoResult<()> {
    check_texture(mesh, options)?;
    mesh.validate_indices()?;

    let materials: Vec<(&str, Rgba)> = options
        .object_color
        .map(|color| ("object", color))
        .into_iter()
        .collect();
    let object = ModelObject {
        mesh,
        name: None,
        material: options.object_color.map(|_| 0),
    };
    let model_xml = generate_model_xml(&[object], &materials)?;
    write_package(writer, &model_xml)
}

/// Write colour parts as one 3MF package, one object per part.
///
/// Every palette entry is listed as a base material, whether or not a
/// part uses it. `options.object_color` is ignored; each part carries its
/// own colour.
///
/// # Errors
///
/// As for [`write_3mf`], for any part.
pub fn write_3mf_parts<W: Write + Seek>(
    parts: &ColorParts,
    writer: W,
    options: &ExportOptions,
) -> IoResult<()> {
    for part in &parts.parts {
        check_texture(&part.mesh, options)?;
        part.mesh.validate_indices()?;
    }

    let materials: Vec<(&str, Rgba)> = parts
        .materials
        .iter()
        .map(|entry| (entry.name.as_str(), entry.color))
        .collect();
    let objects: Vec<ModelObject<'_>> = parts
        .parts
        .iter()
        .map(|part| ModelObject {
            mesh: &part.mesh,
            name: Some(part.name.as_str()),
            material: Some(part.material_index),
        })
        .collect();
    let model_xml = generate_model_xml(&objects, &materials)?;
    write_package(writer, &model_xml)
}

fn check_texture(mesh: &IndexedMesh, options: &ExportOptions) -> IoResult<()> {
    if options.embed_texture && mesh.texture.is_some() {
        return Err(IoError::unsupported("embedded textures", MeshFormat::ThreeMf));
    }
    Ok(())
}

fn write_package<W: Write + Seek>(writer: W, model_xml: &str) -> IoResult<()> {
    let mut zip = ZipWriter::new(writer);
    let entry = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default());

    for (name, body) in [
        ("[Content_Types].xml", CONTENT_TYPES_XML.as_bytes()),
        ("_rels/.rels", RELS_XML.as_bytes()),
        (MODEL_PATH, model_xml.as_bytes()),
    ] {
        zip.start_file(name, entry).map_err(zip_error)?;
        zip.write_all(body)?;
    }

    zip.finish().map_err(zip_error)?;
    Ok(())
}

fn zip_error(e: zip::result::ZipError) -> IoError {
    match e {
        zip::result::ZipError::Io(io) => IoError::Io(io),
        other => IoError::invalid_content(format!("ZIP error: {other}")),
    }
}

fn xml_error(e: impl std::fmt::Display) -> IoError {
    IoError::invalid_content(format!("failed to write model XML: {e}"))
}

/// Generate the model part. Objects get ids `1..=n` and the material
/// group, when there is one, id `n + 1`.
fn generate_model_xml(objects: &[ModelObject<'_>], materials: &[(&str, Rgba)]) -> IoResult<String> {
    let mut buffer = Vec::new();
    let mut writer = Writer::new_with_indent(Cursor::new(&mut buffer), b' ', 1);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_error)?;

    let mut model = BytesStart::new("model");
    model.push_attribute(("xmlns", NAMESPACE_3MF));
    model.push_attribute(("unit", "millimeter"));
    model.push_attribute(("xml:lang", "en-US"));
    writer.write_event(Event::Start(model)).map_err(xml_error)?;
    writer
        .write_event(Event::Start(BytesStart::new("resources")))
        .map_err(xml_error)?;

    let materials_id = (objects.len() + 1).to_string();
    if !materials.is_empty() {
        let mut group = BytesStart::new("basematerials");
        group.push_attribute(("id", materials_id.as_str()));
        writer.write_event(Event::Start(group)).map_err(xml_error)?;
        for (name, color) in materials {
            let mut base = BytesStart::new("base");
            base.push_attribute(("name", *name));
            base.push_attribute(("displaycolor", color.to_string().as_str()));
            writer.write_event(Event::Empty(base)).map_err(xml_error)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new("basematerials")))
            .map_err(xml_error)?;
    }

    for (i, object) in objects.iter().enumerate() {
        let mut start = BytesStart::new("object");
        start.push_attribute(("id", (i + 1).to_string().as_str()));
        if let Some(name) = object.name {
            start.push_attribute(("name", name));
        }
        start.push_attribute(("type", "model"));
        if let Some(index) = object.material.filter(|&m| m < materials.len()) {
            start.push_attribute(("pid", materials_id.as_str()));
            start.push_attribute(("pindex", index.to_string().as_str()));
        }
        writer.write_event(Event::Start(start)).map_err(xml_error)?;
        write_mesh_element(&mut writer, object.mesh)?;
        writer
            .write_event(Event::End(BytesEnd::new("object")))
            .map_err(xml_error)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("resources")))
        .map_err(xml_error)?;

    writer
        .write_event(Event::Start(BytesStart::new("build")))
        .map_err(xml_error)?;
    for i in 1..=objects.len() {
        let mut item = BytesStart::new("item");
        item.push_attribute(("objectid", i.to_string().as_str()));
        writer.write_event(Event::Empty(item)).map_err(xml_error)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("build")))
        .map_err(xml_error)?;
    writer
        .write_event(Event::End(BytesEnd::new("model")))
        .map_err(xml_error)?;

    String::from_utf8(buffer).map_err(xml_error)
}

fn write_mesh_element<W: Write>(writer: &mut Writer<W>, mesh: &IndexedMesh) -> IoResult<()> {
    writer
        .write_event(Event::Start(BytesStart::new("mesh")))
        .map_err(xml_error)?;

    writer
        .write_event(Event::Start(BytesStart::new("vertices")))
        .map_err(xml_error)?;
    for p in &mesh.vertices {
        let mut vertex = BytesStart::new("vertex");
        vertex.push_attribute(("x", p.x.to_string().as_str()));
        vertex.push_attribute(("y", p.y.to_string().as_str()));
        vertex.push_attribute(("z", p.z.to_string().as_str()));
        writer.write_event(Event::Empty(vertex)).map_err(xml_error)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("vertices")))
        .map_err(xml_error)?;

    writer
        .write_event(Event::Start(BytesStart::new("triangles")))
        .map_err(xml_error)?;
    for &[v1, v2, v3] in &mesh.faces {
        let mut triangle = BytesStart::new("triangle");
        triangle.push_attribute(("v1", v1.to_string().as_str()));
        triangle.push_attribute(("v2", v2.to_string().as_str()));
        triangle.push_attribute(("v3", v3.to_string().as_str()));
        writer
            .write_event(Event::Empty(triangle))
            .map_err(xml_error)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("triangles")))
        .map_err(xml_error)?;

    writer
        .write_event(Event::End(BytesEnd::new("mesh")))
        .map_err(xml_error)?;
    Ok(())
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
    use crate::{split_by_palette, ColorPalette};
    use mesh_types::{unit_cube, MeshBounds, TextureRef};

    fn single_xml(mesh: &IndexedMesh, options: &ExportOptions) -> String {
        let materials: Vec<(&str, Rgba)> = options
            .object_color
            .map(|c| ("object", c))
            .into_iter()
            .collect();
        let object = ModelObject {
            mesh,
            name: None,
            material: options.object_color.map(|_| 0),
        };
        generate_model_xml(&[object], &materials).unwrap()
    }

    fn package(mesh: &IndexedMesh, options: &ExportOptions) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        write_3mf(mesh, &mut out, options).unwrap();
        out.into_inner()
    }

    #[test]
    fn package_has_required_entries() {
        let bytes = package(&unit_cube(), &ExportOptions::default());
        let archive = ZipArchive::new(Cursor::new(&bytes[..])).unwrap();
        let mut names: Vec<&str> = archive.file_names().collect();
        names.sort_unstable();
        assert_eq!(names, ["3D/3dmodel.model", "[Content_Types].xml", "_rels/.rels"]);
    }

    #[test]
    fn roundtrip_cube() {
        let cube = unit_cube();
        let loaded = load_3mf_bytes(&package(&cube, &ExportOptions::default())).unwrap();
        assert_eq!(loaded.vertex_count(), 8);
        assert_eq!(loaded.faces, cube.faces);
        assert_eq!(loaded.bounds(), cube.bounds());
    }

    #[test]
    fn export_is_deterministic() {
        let cube = unit_cube();
        let opts = ExportOptions::default();
        assert_eq!(package(&cube, &opts), package(&cube, &opts));
    }

    #[test]
    fn model_lists_every_vertex_and_triangle() {
        let xml = single_xml(&unit_cube(), &ExportOptions::default());
        assert_eq!(xml.matches("<vertex ").count(), 8);
        assert_eq!(xml.matches("<triangle ").count(), 12);
        assert!(xml.contains(r#"<item objectid="1"/>"#));
        assert!(!xml.contains("basematerials"));
    }

    #[test]
    fn object_color_becomes_base_material() {
        let opts = ExportOptions::default().with_object_color(Rgba::opaque(0x12, 0x34, 0x56));
        let xml = single_xml(&unit_cube(), &opts);
        assert!(xml.contains(r##"displaycolor="#123456FF""##));
        assert!(xml.contains(r#"pid="2" pindex="0""#));
        // Materials are ignored on read; geometry still loads.
        let mesh = load_3mf_bytes(&package(&unit_cube(), &opts)).unwrap();
        assert_eq!(mesh.face_count(), 12);
    }

    #[test]
    fn color_parts_share_one_material_group() {
        let mut cube = unit_cube();
        cube.colors = Some(
            (0..8)
                .map(|i| if i >= 4 { [210, 30, 45, 255] } else { [255, 255, 255, 255] })
                .collect(),
        );
        let palette: ColorPalette = "WHITE=#FFFFFF,BLUE=#191E46,RED=#D21E2D".parse().unwrap();
        let parts = split_by_palette(&cube, &palette).unwrap();
        assert_eq!(parts.parts.len(), 2);

        let mut out = Cursor::new(Vec::new());
        write_3mf_parts(&parts, &mut out, &ExportOptions::default()).unwrap();
        let bytes = out.into_inner();

        let mut archive = ZipArchive::new(Cursor::new(&bytes[..])).unwrap();
        let xml = read_model_part(&mut archive).unwrap();
        assert_eq!(xml.matches("<basematerials ").count(), 1);
        assert_eq!(xml.matches("<base ").count(), 3);
        assert!(xml.contains(r#"<basematerials id="3">"#));
        assert!(xml.contains(r#"<object id="1" name="WHITE" type="model" pid="3" pindex="0">"#));
        assert!(xml.contains(r#"<object id="2" name="RED" type="model" pid="3" pindex="2">"#));
        assert!(xml.contains(r#"<item objectid="2"/>"#));

        // Reading concatenates the parts back into every face.
        let back = load_3mf_bytes(&bytes).unwrap();
        assert_eq!(back.face_count(), 12);
        assert_eq!(back.vertex_count(), 14);
    }

    #[test]
    fn texture_embedding_is_unsupported() {
        let mut cube = unit_cube();
        cube.texture = Some(TextureRef::new(Some("image/png".into()), vec![1, 2, 3]));
        let opts = ExportOptions::default().with_embedded_texture(true);
        let err = write_3mf(&cube, Cursor::new(Vec::new()), &opts).unwrap_err();
        assert!(matches!(
            err,
            IoError::UnsupportedFeature {
                format: MeshFormat::ThreeMf,
                ..
            }
        ));
    }

    #[test]
    fn parse_concatenates_objects() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<model xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02">
  <resources>
    <object id="1" type="model">
      <mesh>
        <vertices>
          <vertex x="0" y="0" z="0"/>
          <vertex x="1" y="0" z="0"/>
          <vertex x="0" y="1" z="0"/>
        </vertices>
        <triangles>
          <triangle v1="0" v2="1" v3="2"/>
        </triangles>
      </mesh>
    </object>
    <object id="2" type="model">
      <mesh>
        <vertices>
          <vertex x="5" y="0" z="0"/>
          <vertex x="6" y="0" z="0"/>
          <vertex x="5" y="1" z="0"/>
        </vertices>
        <triangles>
          <triangle v1="0" v2="1" v3="2"/>
        </triangles>
      </mesh>
    </object>
  </resources>
</model>"#;
        let mesh = parse_model(xml).unwrap();
        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.faces, vec![[0, 1, 2], [3, 4, 5]]);
    }

    #[test]
    fn not_a_zip_is_a_format_error() {
        let err = load_3mf_bytes(b"definitely not a zip").unwrap_err();
        assert!(matches!(err, IoError::InvalidContent { .. }));
    }
}
