//! Pipeline configuration.

use std::path::Path;

use mesh_decimate::{DecimateParams, DecimateTarget};
use mesh_io::{ColorPalette, ExportOptions, MeshFormat};
use mesh_repair::RepairParams;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::{OutputTarget, PipelineJob};

/// Which stages a pipeline runs and how.
///
/// Statistics are always computed. Decimation runs only when
/// [`decimate`](Self::decimate) is set, repair only when
/// [`repair`](Self::repair) is set, and one output is written per entry in
/// [`formats`](Self::formats). An empty format list is a statistics-only run.
///
/// # Example
///
/// ```
/// use mesh_pipeline::PipelineConfig;
/// use mesh_decimate::DecimateTarget;
/// use mesh_io::MeshFormat;
///
/// let config = PipelineConfig::default()
///     .with_target(DecimateTarget::Ratio(0.5))
///     .with_formats(vec![MeshFormat::Stl, MeshFormat::ThreeMf]);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.formats.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Merge vertices with identical positions (and UVs) before measuring.
    /// STL stores every corner separately, so without this each triangle
    /// of an STL input is its own component. Default: true
    pub merge_vertices: bool,

    /// Decimation parameters. If None, decimation is skipped.
    pub decimate: Option<DecimateParams>,

    /// Repair parameters. If None, repair is skipped. Default: repair with
    /// [`RepairParams::default`]
    pub repair: Option<RepairParams>,

    /// Output formats, in the order they are written. Default: STL
    pub formats: Vec<MeshFormat>,

    /// Options shared by every export.
    pub export: ExportOptions,

    /// Appended to the input stem when naming outputs, e.g. `_simplified`.
    /// Default: empty
    pub output_suffix: String,

    /// When decimating, also write each format at full resolution as
    /// `<stem>.<ext>`, before decimation and repair. Needs a non-empty
    /// [`output_suffix`](Self::output_suffix). Default: false
    pub write_full_resolution: bool,

    /// Split outputs into one part per palette colour using the mesh's
    /// vertex colours. Default: None
    pub palette: Option<ColorPalette>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            merge_vertices: true,
            decimate: None,
            repair: Some(RepairParams::default()),
            formats: vec![MeshFormat::Stl],
            export: ExportOptions::default(),
            output_suffix: String::new(),
            write_full_resolution: false,
            palette: None,
        }
    }
}

impl PipelineConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Only load and measure: no decimation, no repair, no outputs.
    #[must_use]
    pub fn statistics_only() -> Self {
        Self {
            decimate: None,
            repair: None,
            formats: Vec::new(),
            ..Self::default()
        }
    }

    /// Decimation for 3D printing: halve the face count, write the full
    /// resolution STL and a `_simplified` one.
    #[must_use]
    pub fn simplified_for_printing() -> Self {
        Self {
            decimate: Some(DecimateParams::with_target_ratio(0.5)),
            repair: Some(RepairParams::for_printing()),
            output_suffix: "_simplified".to_string(),
            write_full_resolution: true,
            ..Self::default()
        }
    }

    /// Loads a configuration from a JSON file.
    ///
    /// Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Config`] if the file cannot be read or parsed.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> PipelineResult<Self> {
        let path = path.as_ref();
        let config_err = |message: String| PipelineError::Config {
            path: path.to_path_buf(),
            message,
        };
        let text = std::fs::read_to_string(path).map_err(|e| config_err(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| config_err(e.to_string()))
    }

    /// Serializes the configuration as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Propagates serializer failures.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Enables or disables merging coincident vertices after loading.
    #[must_use]
    pub const fn with_merge_vertices(mut self, merge: bool) -> Self {
        self.merge_vertices = merge;
        self
    }

    /// Sets the decimation parameters.
    #[must_use]
    pub fn with_decimation(mut self, params: DecimateParams) -> Self {
        self.decimate = Some(params);
        self
    }

    /// Sets the decimation target, keeping any other decimation parameters.
    #[must_use]
    pub fn with_target(mut self, target: DecimateTarget) -> Self {
        let params = self.decimate.take().unwrap_or_default();
        self.decimate = Some(params.with_target(target));
        self
    }

    /// Disables decimation.
    #[must_use]
    pub fn without_decimation(mut self) -> Self {
        self.decimate = None;
        self
    }

    /// Sets the repair parameters.
    #[must_use]
    pub fn with_repair(mut self, params: RepairParams) -> Self {
        self.repair = Some(params);
        self
    }

    /// Disables repair.
    #[must_use]
    pub fn without_repair(mut self) -> Self {
        self.repair = None;
        self
    }

    /// Sets the output formats.
    #[must_use]
    pub fn with_formats(mut self, formats: Vec<MeshFormat>) -> Self {
        self.formats = formats;
        self
    }

    /// Sets the export options.
    #[must_use]
    pub fn with_export_options(mut self, options: ExportOptions) -> Self {
        self.export = options;
        self
    }

    /// Sets the output name suffix.
    #[must_use]
    pub fn with_output_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.output_suffix = suffix.into();
        self
    }

    /// Enables or disables the full-resolution outputs written alongside
    /// decimated ones.
    #[must_use]
    pub const fn with_full_resolution(mut self, write: bool) -> Self {
        self.write_full_resolution = write;
        self
    }

    /// Splits outputs by `palette`.
    #[must_use]
    pub fn with_palette(mut self, palette: ColorPalette) -> Self {
        self.palette = Some(palette);
        self
    }

    /// Whether jobs get full-resolution outputs.
    #[must_use]
    pub const fn writes_full_resolution(&self) -> bool {
        self.decimate.is_some() && self.write_full_resolution
    }

    /// Whether this configuration writes no outputs.
    #[must_use]
    pub fn is_statistics_only(&self) -> bool {
        self.formats.is_empty()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::InvalidTarget`] for a decimation target out of
    ///   range.
    /// - [`PipelineError::InvalidConfig`] when a format is listed twice,
    ///   full-resolution outputs would share names with simplified ones, or
    ///   the palette is empty, has a bad tolerance or repeats a name.
    pub fn validate(&self) -> PipelineResult<()> {
        if let Some(params) = &self.decimate {
            params
                .target
                .validate()
                .map_err(PipelineError::InvalidTarget)?;
        }
        for (i, format) in self.formats.iter().enumerate() {
            if self.formats[..i].contains(format) {
                return Err(PipelineError::invalid_config(format!(
                    "output format {format} listed more than once"
                )));
            }
        }
        if self.writes_full_resolution() && self.output_suffix.is_empty() {
            return Err(PipelineError::invalid_config(
                "full-resolution outputs need an output suffix to keep their names apart",
            ));
        }
        if let Some(palette) = &self.palette {
            palette
                .validate()
                .map_err(|e| PipelineError::invalid_config(e.to_string()))?;
        }
        Ok(())
    }

    /// Builds a job that writes every configured format next to `input`,
    /// named `<stem><suffix>.<ext>`.
    ///
    /// When full-resolution outputs are enabled they come first, named
    /// `<stem>.<ext>`. One that would land on `input` itself is left out.
    #[must_use]
    pub fn job_for<P: AsRef<Path>>(&self, input: P) -> PipelineJob {
        let input = input.as_ref();
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let target = |format: MeshFormat, suffix: &str, full_resolution| OutputTarget {
            path: input.with_file_name(format!("{stem}{suffix}.{}", format.extension())),
            format,
            full_resolution,
        };

        let mut outputs = Vec::new();
        if self.writes_full_resolution() {
            outputs.extend(
                self.formats
                    .iter()
                    .map(|&f| target(f, "", true))
                    .filter(|t| t.path != input),
            );
        }
        outputs.extend(
            self.formats
                .iter()
                .map(|&f| target(f, &self.output_suffix, false)),
        );
        PipelineJob {
            input: input.to_path_buf(),
            outputs,
        }
    }
}
