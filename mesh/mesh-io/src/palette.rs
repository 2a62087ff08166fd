//! Splitting a vertex-coloured mesh into one part per palette colour.
//!
//! Multi-material printers take one object per filament. Each face is
//! assigned to the palette entry nearest its average vertex colour; the
//! result is one compacted mesh per entry that received faces.
//!
//! # Colour Distance
//!
//! Channels are scaled to `0..=1` and compared with green weighted twice:
//!
//! ```text
//! d = 100 * sqrt(dr² + 2·dg² + db²)
//! ```
//!
//! A face whose nearest entry is at `d >= tolerance` is still assigned to
//! it, and counted in [`ColorParts::unmatched_faces`].

use std::str::FromStr;

use mesh_types::IndexedMesh;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{IoError, IoResult};
use crate::Rgba;

/// Default matching tolerance.
pub const DEFAULT_TOLERANCE: f64 = 15.0;

/// One named palette entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaletteColor {
    /// Part name, used in 3MF object names and STL file names.
    pub name: String,
    /// Material colour.
    pub color: Rgba,
}

impl PaletteColor {
    /// Creates an entry.
    #[must_use]
    pub fn new(name: impl Into<String>, color: Rgba) -> Self {
        Self {
            name: name.into(),
            color,
        }
    }
}

/// Colours a mesh is split into.
///
/// # Example
///
/// ```
/// use mesh_io::{ColorPalette, Rgba};
///
/// let palette: ColorPalette = "WHITE=#FFFFFF,RED=#D21E2D".parse().unwrap();
/// assert_eq!(palette.colors.len(), 2);
/// assert_eq!(palette.nearest(Rgba::opaque(200, 40, 40)).map(|(i, _)| i), Some(1));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorPalette {
    /// Entries in material order.
    pub colors: Vec<PaletteColor>,
    /// Distance below which a face counts as matched. Default: 15
    pub tolerance: f64,
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self {
            colors: Vec::new(),
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl ColorPalette {
    /// A palette with the default tolerance.
    #[must_use]
    pub fn new(colors: Vec<PaletteColor>) -> Self {
        Self {
            colors,
            ..Self::default()
        }
    }

    /// Sets the matching tolerance.
    #[must_use]
    pub const fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Index of the entry nearest `color` and its distance. Ties go to the
    /// earlier entry. `None` for an empty palette.
    #[must_use]
    pub fn nearest(&self, color: Rgba) -> Option<(usize, f64)> {
        let rgb = [color.r, color.g, color.b].map(f64::from);
        self.nearest_rgb(rgb)
    }

    fn nearest_rgb(&self, rgb: [f64; 3]) -> Option<(usize, f64)> {
        self.colors
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let c = entry.color;
                (i, color_distance(rgb, [c.r, c.g, c.b].map(f64::from)))
            })
            .fold(None, |best, (i, d)| match best {
                Some((_, best_d)) if best_d <= d => best,
                _ => Some((i, d)),
            })
    }

    /// Checks that the palette can split a mesh.
    ///
    /// # Errors
    ///
    /// [`IoError::InvalidContent`] for an empty palette, a repeated or empty
    /// name, a name with a path separator, or a tolerance that is not a
    /// non-negative number.
    pub fn validate(&self) -> IoResult<()> {
        if self.colors.is_empty() {
            return Err(IoError::invalid_content("colour palette is empty"));
        }
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            return Err(IoError::invalid_content(format!(
                "invalid colour tolerance {}",
                self.tolerance
            )));
        }
        for (i, entry) in self.colors.iter().enumerate() {
            if entry.name.is_empty() {
                return Err(IoError::invalid_content("palette colour without a name"));
            }
            if entry.name.contains(['/', '\\']) {
                return Err(IoError::invalid_content(format!(
                    "palette colour name {:?} contains a path separator",
                    entry.name
                )));
            }
            if self.colors[..i].iter().any(|e| e.name == entry.name) {
                return Err(IoError::invalid_content(format!(
                    "palette colour {} listed more than once",
                    entry.name
                )));
            }
        }
        Ok(())
    }
}

/// Parses `NAME=#RRGGBB[AA]` entries separated by commas.
impl FromStr for ColorPalette {
    type Err = IoError;

    fn from_str(text: &str) -> IoResult<Self> {
        let colors = text
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                let (name, hex) = entry.split_once('=').ok_or_else(|| {
                    IoError::invalid_content(format!("palette entry {entry:?} is not NAME=HEX"))
                })?;
                let color = Rgba::from_hex(hex.trim()).ok_or_else(|| {
                    IoError::invalid_content(format!("invalid colour {hex:?} in palette"))
                })?;
                Ok(PaletteColor::new(name.trim(), color))
            })
            .collect::<IoResult<Vec<_>>>()?;
        let palette = Self::new(colors);
        palette.validate()?;
        Ok(palette)
    }
}

/// Weighted RGB distance on 0-255 channels, scaled to roughly 0-200.
#[must_use]
pub fn color_distance(a: [f64; 3], b: [f64; 3]) -> f64 {
    let d = |i: usize| (a[i] - b[i]) / 255.0;
    (d(0).powi(2) + 2.0 * d(1).powi(2) + d(2).powi(2)).sqrt() * 100.0
}

/// One colour part.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshPart {
    /// Palette entry name.
    pub name: String,
    /// Material colour.
    pub color: Rgba,
    /// Index of the entry in [`ColorParts::materials`].
    pub material_index: usize,
    /// The faces assigned to this colour, compacted.
    pub mesh: IndexedMesh,
}

/// Result of [`split_by_palette`].
#[derive(Debug, Clone, PartialEq)]
pub struct ColorParts {
    /// Every palette entry, in palette order, whether or not it got faces.
    pub materials: Vec<PaletteColor>,
    /// Non-empty parts in palette order.
    pub parts: Vec<MeshPart>,
    /// Faces assigned to their nearest colour despite exceeding the
    /// tolerance.
    pub unmatched_faces: usize,
}

/// Splits `mesh` by the average vertex colour of each face.
///
/// Vertex colours are dropped from the parts; normals, UVs, and the
/// texture reference are carried over.
///
/// # Errors
///
/// - [`IoError::InvalidContent`] if the palette is invalid or the mesh has
///   no vertex colours.
/// - [`IoError::IndexOutOfBounds`] if a face references a missing vertex.
///
/// # Example
///
/// ```
/// use mesh_io::{split_by_palette, ColorPalette};
/// use mesh_types::unit_cube;
///
/// let mut cube = unit_cube();
/// cube.colors = Some(vec![[250, 250, 250, 255]; 8]);
/// let palette: ColorPalette = "WHITE=#FFFFFF,RED=#D21E2D".parse().unwrap();
///
/// let split = split_by_palette(&cube, &palette).unwrap();
/// assert_eq!(split.parts.len(), 1);
/// assert_eq!(split.parts[0].name, "WHITE");
/// assert_eq!(split.materials.len(), 2);
/// ```
pub fn split_by_palette(mesh: &IndexedMesh, palette: &ColorPalette) -> IoResult<ColorParts> {
    palette.validate()?;
    mesh.validate_indices()?;
    let colors = mesh
        .colors
        .as_deref()
        .filter(|c| c.len() == mesh.vertices.len())
        .ok_or_else(|| IoError::invalid_content("mesh has no vertex colours to split by"))?;

    let mut owner = Vec::with_capacity(mesh.faces.len());
    let mut face_counts = vec![0usize; palette.colors.len()];
    let mut unmatched_faces = 0;
    for face in &mesh.faces {
        let mut average = [0.0; 3];
        for &v in face {
            let c = colors[v as usize];
            for (sum, channel) in average.iter_mut().zip(c) {
                *sum += f64::from(channel) / 3.0;
            }
        }
        let (best, distance) = palette.nearest_rgb(average).unwrap_or((0, 0.0));
        if distance >= palette.tolerance {
            unmatched_faces += 1;
        }
        face_counts[best] += 1;
        owner.push(best);
    }

    let mut parts = Vec::new();
    for (material_index, entry) in palette.colors.iter().enumerate() {
        if face_counts[material_index] == 0 {
            debug!(color = %entry.name, "no faces for palette colour");
            continue;
        }
        let mut part = mesh.clone();
        part.colors = None;
        part.retain_faces(|i, _| owner[i] == material_index);
        part.compact();
        debug!(
            color = %entry.name,
            vertices = part.vertices.len(),
            faces = part.faces.len(),
            "split colour part"
        );
        parts.push(MeshPart {
            name: entry.name.clone(),
            color: entry.color,
            material_index,
            mesh: part,
        });
    }

    Ok(ColorParts {
        materials: palette.colors.clone(),
        parts,
        unmatched_faces,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use mesh_types::unit_cube;

    const WHITE: [u8; 4] = [255, 255, 255, 255];
    const RED: [u8; 4] = [210, 30, 45, 255];

    fn astronaut_palette() -> ColorPalette {
        "WHITE=#FFFFFF,RED=#D21E2D,BLUE_VISOR=#191E46".parse().unwrap()
    }

    /// Unit cube whose +Z corners (4..8) are red and the rest white.
    fn two_tone_cube() -> IndexedMesh {
        let mut cube = unit_cube();
        cube.colors = Some((0..8).map(|i| if i >= 4 { RED } else { WHITE }).collect());
        cube
    }

    #[test]
    fn distance_weights_green() {
        assert_eq!(color_distance([0.0; 3], [0.0; 3]), 0.0);
        assert_relative_eq!(color_distance([0.0; 3], [255.0, 0.0, 0.0]), 100.0);
        assert_relative_eq!(
            color_distance([0.0; 3], [0.0, 255.0, 0.0]),
            100.0 * 2.0_f64.sqrt()
        );
        assert_relative_eq!(
            color_distance([0.0; 3], [255.0; 3]),
            200.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn parse_palette() {
        let palette = astronaut_palette();
        assert_eq!(palette.colors[2].name, "BLUE_VISOR");
        assert_eq!(palette.colors[2].color, Rgba::opaque(25, 30, 70));
        assert_eq!(palette.tolerance, DEFAULT_TOLERANCE);

        assert!("RED".parse::<ColorPalette>().is_err());
        assert!("RED=#GG0000".parse::<ColorPalette>().is_err());
        assert!("A=#000000,A=#FFFFFF".parse::<ColorPalette>().is_err());
        assert!("".parse::<ColorPalette>().is_err());
        assert!("../RED=#FF0000".parse::<ColorPalette>().is_err());
    }

    #[test]
    fn faces_follow_average_color() {
        let split = split_by_palette(&two_tone_cube(), &astronaut_palette()).unwrap();

        assert_eq!(split.materials.len(), 3);
        assert_eq!(split.parts.len(), 2);
        let white = &split.parts[0];
        let red = &split.parts[1];
        assert_eq!((white.name.as_str(), white.material_index), ("WHITE", 0));
        assert_eq!((red.name.as_str(), red.material_index), ("RED", 1));
        // Bottom is white and top red. Each side triangle has two corners of
        // one colour and follows the majority, about 50 away from it.
        assert_eq!(white.mesh.faces.len(), 6);
        assert_eq!(red.mesh.faces.len(), 6);
        assert_eq!(white.mesh.vertices.len(), 7);
        assert_eq!(red.mesh.vertices.len(), 7);
        assert_eq!(split.unmatched_faces, 8);
        assert!(white.mesh.colors.is_none());
        assert!(white.mesh.validate_indices().is_ok());
        assert!(red.mesh.validate_indices().is_ok());
    }

    #[test]
    fn far_colors_are_assigned_and_counted() {
        let mut cube = unit_cube();
        cube.colors = Some(vec![[0, 255, 0, 255]; 8]);
        let split = split_by_palette(&cube, &astronaut_palette()).unwrap();
        assert_eq!(split.unmatched_faces, 12);
        assert_eq!(split.parts.len(), 1);
        assert_eq!(split.parts[0].mesh.faces.len(), 12);
    }

    #[test]
    fn tolerance_decides_what_counts_as_matched() {
        let mut cube = unit_cube();
        // About 7.8 away from RED.
        cube.colors = Some(vec![[230, 30, 45, 255]; 8]);
        let strict = split_by_palette(&cube, &astronaut_palette().with_tolerance(5.0)).unwrap();
        assert_eq!(strict.unmatched_faces, 12);
        let loose = split_by_palette(&cube, &astronaut_palette()).unwrap();
        assert_eq!(loose.unmatched_faces, 0);
        assert_eq!(loose.parts[0].name, "RED");
    }

    #[test]
    fn mesh_without_colors_is_rejected() {
        let err = split_by_palette(&unit_cube(), &astronaut_palette()).unwrap_err();
        assert!(matches!(err, IoError::InvalidContent { .. }));
    }
}
