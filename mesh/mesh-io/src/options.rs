//! Export options.

use std::fmt;

use serde::{Deserialize, Serialize};

/// STL body encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StlEncoding {
    /// 80-byte header, u32 count, 50-byte records.
    #[default]
    Binary,
    /// `solid` / `facet` / `vertex` text.
    Ascii,
}

/// An sRGB colour with alpha, 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgba {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha, 255 is opaque.
    pub a: u8,
}

impl Rgba {
    /// Opaque colour from RGB channels.
    #[must_use]
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse `#RRGGBB` or `#RRGGBBAA` (the leading `#` is optional).
    #[must_use]
    pub fn from_hex(text: &str) -> Option<Self> {
        let hex = text.strip_prefix('#').unwrap_or(text);
        if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
            a: if hex.len() == 8 { channel(6)? } else { 255 },
        })
    }
}

/// Renders as `#RRGGBBAA`, the 3MF `displaycolor` form.
impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
    }
}

/// Options controlling serialization.
///
/// The default produces binary STL and a geometry-only 3MF package.
///
/// # Example
///
/// ```
/// use mesh_io::{ExportOptions, Rgba, StlEncoding};
///
/// let opts = ExportOptions::default()
///     .with_stl_encoding(StlEncoding::Ascii)
///     .with_object_color(Rgba::opaque(200, 120, 40));
/// assert_eq!(opts.object_color.map(|c| c.to_string()).as_deref(), Some("#C87828FF"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Encoding used for STL output.
    pub stl_encoding: StlEncoding,

    /// Single display colour for the whole object.
    ///
    /// Written as a 3MF base material. STL cannot carry it.
    pub object_color: Option<Rgba>,

    /// Request that the mesh's texture be embedded in the output.
    ///
    /// Neither STL nor the geometry-only 3MF profile can carry textures, so
    /// this always fails when the mesh has one.
    pub embed_texture: bool,
}

impl ExportOptions {
    /// Set the STL encoding.
    #[must_use]
    pub const fn with_stl_encoding(mut self, encoding: StlEncoding) -> Self {
        self.stl_encoding = encoding;
        self
    }

    /// Set a whole-object display colour.
    #[must_use]
    pub const fn with_object_color(mut self, color: Rgba) -> Self {
        self.object_color = Some(color);
        self
    }

    /// Request texture embedding.
    #[must_use]
    pub const fn with_embedded_texture(mut self, embed: bool) -> Self {
        self.embed_texture = embed;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip() {
        let c = Rgba::from_hex("#102030").unwrap_or(Rgba::opaque(0, 0, 0));
        assert_eq!(c, Rgba::opaque(0x10, 0x20, 0x30));
        assert_eq!(c.to_string(), "#102030FF");
        assert_eq!(Rgba::from_hex("a0b0c080").map(|c| c.a), Some(0x80));
    }

    #[test]
    fn hex_rejects_malformed() {
        assert!(Rgba::from_hex("#12345").is_none());
        assert!(Rgba::from_hex("#GG0000").is_none());
        assert!(Rgba::from_hex("#ééé").is_none());
    }
}
