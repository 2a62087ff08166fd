//! Run reports.
//!
//! A [`PipelineReport`] records what each stage did and how long it took.
//! It serializes to JSON for machine consumers and implements `Display` for
//! people.

// Counts and byte sizes are far below 2^52
#![allow(clippy::cast_precision_loss)]

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use mesh_decimate::{DecimateWarning, DecimationResult};
use mesh_io::MeshFormat;
use mesh_measure::StatisticsReport;
use mesh_repair::{RepairSummary, RepairWarning};
use serde::{Deserialize, Serialize};

use crate::pipeline::OutputTarget;

// =============================================================================
// Stages and timings
// =============================================================================

/// A pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Reading and parsing the input file.
    Load,
    /// Merging coincident vertices.
    Merge,
    /// Statistics of the input mesh.
    Statistics,
    /// Quadric edge-collapse decimation.
    Decimate,
    /// Cleanup of floaters and degenerate faces.
    Repair,
    /// Statistics of the processed mesh.
    FinalStatistics,
    /// Writing one output.
    Export(MeshFormat),
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load => f.write_str("load"),
            Self::Merge => f.write_str("merge vertices"),
            Self::Statistics => f.write_str("statistics"),
            Self::Decimate => f.write_str("decimate"),
            Self::Repair => f.write_str("repair"),
            Self::FinalStatistics => f.write_str("final statistics"),
            Self::Export(format) => write!(f, "export {format}"),
        }
    }
}

/// Wall-clock time spent in one stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageTiming {
    /// The stage.
    pub stage: Stage,
    /// Elapsed seconds.
    pub seconds: f64,
}

impl StageTiming {
    /// Creates a timing entry.
    #[must_use]
    pub fn new(stage: Stage, elapsed: Duration) -> Self {
        Self {
            stage,
            seconds: elapsed.as_secs_f64(),
        }
    }

    /// Elapsed time as a [`Duration`].
    #[must_use]
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.seconds.max(0.0))
    }
}

// =============================================================================
// Warnings and stage summaries
// =============================================================================

/// Recovered condition met during a run.
///
/// None of these abort the run. An [`EmptyResult`](Self::EmptyResult) means
/// the outputs were written from an empty mesh; callers must check for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineWarning {
    /// Singular quadric systems fell back to the edge midpoint.
    NumericInstability {
        /// Number of placements that fell back.
        occurrences: usize,
    },
    /// Decimation ran out of valid collapses above the target.
    DecimationIncomplete {
        /// Requested face count.
        target: usize,
        /// Face count reached.
        achieved: usize,
    },
    /// Decimation was cancelled part way.
    DecimationCancelled {
        /// Face count when it stopped.
        achieved: usize,
    },
    /// Repair removed every face.
    EmptyResult,
    /// Faces whose colour was outside the palette tolerance. They were
    /// assigned to the nearest palette colour.
    UnmatchedColors {
        /// Number of such faces.
        faces: usize,
    },
}

impl From<&DecimateWarning> for PipelineWarning {
    fn from(warning: &DecimateWarning) -> Self {
        match *warning {
            DecimateWarning::NumericInstability { occurrences } => {
                Self::NumericInstability { occurrences }
            }
            DecimateWarning::Incomplete { target, achieved } => {
                Self::DecimationIncomplete { target, achieved }
            }
            DecimateWarning::Cancelled { achieved } => Self::DecimationCancelled { achieved },
        }
    }
}

impl From<&RepairWarning> for PipelineWarning {
    fn from(warning: &RepairWarning) -> Self {
        match warning {
            RepairWarning::EmptyResult => Self::EmptyResult,
        }
    }
}

impl fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NumericInstability { occurrences } => write!(
                f,
                "numeric instability: {occurrences} singular placements used the edge midpoint"
            ),
            Self::DecimationIncomplete { target, achieved } => write!(
                f,
                "decimation incomplete: target {target} faces, reached {achieved}"
            ),
            Self::DecimationCancelled { achieved } => {
                write!(f, "decimation cancelled at {achieved} faces")
            }
            Self::EmptyResult => write!(f, "repair removed every face, output is empty"),
            Self::UnmatchedColors { faces } => write!(
                f,
                "{faces} faces matched no palette colour and went to the nearest one"
            ),
        }
    }
}

/// What the decimation stage did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecimationSummary {
    /// Faces before decimation.
    pub original_faces: usize,
    /// Resolved target face count.
    pub target_faces: usize,
    /// Faces after decimation.
    pub final_faces: usize,
    /// Edge collapses applied.
    pub collapses_performed: usize,
    /// Candidates rejected.
    pub collapses_rejected: usize,
}

impl From<&DecimationResult> for DecimationSummary {
    fn from(result: &DecimationResult) -> Self {
        Self {
            original_faces: result.original_triangles,
            target_faces: result.target_triangles,
            final_faces: result.final_triangles,
            collapses_performed: result.collapses_performed,
            collapses_rejected: result.collapses_rejected,
        }
    }
}

/// One written file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRecord {
    /// Destination path.
    pub path: PathBuf,
    /// Format written.
    pub format: MeshFormat,
    /// Bytes written.
    pub bytes: u64,
    /// Written before decimation and repair.
    #[serde(default)]
    pub full_resolution: bool,
    /// Palette colour, for one file of a per-colour STL split.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part: Option<String>,
}

impl OutputRecord {
    /// Record of `bytes` written to `path` for `target`.
    #[must_use]
    pub fn new(target: &OutputTarget, path: PathBuf, bytes: u64) -> Self {
        Self {
            path,
            format: target.format,
            bytes,
            full_resolution: target.full_resolution,
            part: None,
        }
    }
}

// =============================================================================
// Report
// =============================================================================

/// Everything a pipeline run produced besides the mesh itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    /// Input path, for file runs.
    pub input: Option<PathBuf>,
    /// Input size in bytes, when known.
    pub input_bytes: Option<u64>,
    /// Coincident vertices merged before measuring.
    pub merged_vertices: usize,
    /// Statistics of the loaded mesh.
    pub before: StatisticsReport,
    /// Statistics after decimation and repair, if either ran.
    pub after: Option<StatisticsReport>,
    /// Decimation stage summary, if it ran.
    pub decimation: Option<DecimationSummary>,
    /// Repair stage summary, if it ran.
    pub repair: Option<RepairSummary>,
    /// Outputs in the order they were written.
    pub outputs: Vec<OutputRecord>,
    /// Stage timings in execution order.
    pub timings: Vec<StageTiming>,
    /// Recovered conditions in the order they were met.
    pub warnings: Vec<PipelineWarning>,
}

impl PipelineReport {
    /// Statistics of the final mesh.
    #[must_use]
    pub fn final_statistics(&self) -> &StatisticsReport {
        self.after.as_ref().unwrap_or(&self.before)
    }

    /// Sum of all stage timings.
    #[must_use]
    pub fn total_duration(&self) -> Duration {
        self.timings.iter().map(StageTiming::duration).sum()
    }

    /// Time spent in `stage`, summed over its entries.
    #[must_use]
    pub fn stage_duration(&self, stage: Stage) -> Duration {
        self.timings
            .iter()
            .filter(|t| t.stage == stage)
            .map(StageTiming::duration)
            .sum()
    }

    /// Whether any warning was recorded.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Whether repair emptied the mesh.
    #[must_use]
    pub fn is_empty_result(&self) -> bool {
        self.warnings.contains(&PipelineWarning::EmptyResult)
    }

    /// Percentage of vertices removed, when decimation ran.
    #[must_use]
    pub fn vertex_reduction_percent(&self) -> Option<f64> {
        self.decimation?;
        Some(reduction_percent(
            self.before.vertex_count as f64,
            self.final_statistics().vertex_count as f64,
        ))
    }

    /// Percentage of faces removed, when decimation ran.
    #[must_use]
    pub fn face_reduction_percent(&self) -> Option<f64> {
        self.decimation?;
        Some(reduction_percent(
            self.before.face_count as f64,
            self.final_statistics().face_count as f64,
        ))
    }

    /// Size of the first simplified output relative to the full-resolution
    /// output of the same format and part, when decimation ran.
    ///
    /// Without a matching full-resolution output the input file size is the
    /// baseline.
    #[must_use]
    pub fn size_reduction_percent(&self) -> Option<f64> {
        self.decimation?;
        let simplified = self.outputs.iter().find(|o| !o.full_resolution)?;
        let baseline = self
            .outputs
            .iter()
            .find(|o| {
                o.full_resolution && o.format == simplified.format && o.part == simplified.part
            })
            .map(|o| o.bytes)
            .or(self.input_bytes)?;
        Some(reduction_percent(baseline as f64, simplified.bytes as f64))
    }

    /// Serializes the report as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Propagates serializer failures.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn reduction_percent(before: f64, after: f64) -> f64 {
    if before <= 0.0 {
        0.0
    } else {
        (1.0 - after / before) * 100.0
    }
}

fn write_mesh_line(f: &mut fmt::Formatter<'_>, label: &str, stats: &StatisticsReport) -> fmt::Result {
    writeln!(
        f,
        "{label}: {} vertices, {} faces",
        stats.vertex_count, stats.face_count
    )?;
    if let Some(volume) = stats.volume {
        writeln!(f, "  Volume: {volume:.6} cubic units")?;
    }
    if let Some(b) = &stats.bounds {
        writeln!(
            f,
            "  Bounds: [{:.4}, {:.4}, {:.4}] to [{:.4}, {:.4}, {:.4}]",
            b.min.x, b.min.y, b.min.z, b.max.x, b.max.y, b.max.z
        )?;
    }
    Ok(())
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(input) = &self.input {
            match self.input_bytes {
                Some(bytes) => writeln!(f, "Input: {} ({})", input.display(), format_size(bytes))?,
                None => writeln!(f, "Input: {}", input.display())?,
            }
        }
        if self.merged_vertices > 0 {
            writeln!(f, "Merged {} coincident vertices", self.merged_vertices)?;
        }
        write_mesh_line(f, "Original", &self.before)?;

        if let Some(d) = &self.decimation {
            writeln!(
                f,
                "Decimation: {} -> {} faces (target {}, {} collapses, {} rejected)",
                d.original_faces,
                d.final_faces,
                d.target_faces,
                d.collapses_performed,
                d.collapses_rejected
            )?;
        }
        if let Some(repair) = &self.repair {
            writeln!(f, "{repair}")?;
        }
        if let Some(after) = &self.after {
            write_mesh_line(f, "Final", after)?;
        }

        if let (Some(v), Some(fc)) = (self.vertex_reduction_percent(), self.face_reduction_percent()) {
            writeln!(f, "Reduction: {v:.1}% vertices, {fc:.1}% faces")?;
        }
        if let Some(size) = self.size_reduction_percent() {
            writeln!(f, "File size reduction: {size:.1}%")?;
        }

        if !self.outputs.is_empty() {
            writeln!(f, "Outputs:")?;
            for output in &self.outputs {
                write!(
                    f,
                    "  {:<4} {} ({})",
                    output.format.to_string(),
                    output.path.display(),
                    format_size(output.bytes)
                )?;
                if output.full_resolution {
                    write!(f, " full resolution")?;
                }
                writeln!(f)?;
            }
        }

        writeln!(f, "Timings:")?;
        for timing in &self.timings {
            writeln!(
                f,
                "  {:<18} {}",
                timing.stage.to_string(),
                format_duration(timing.duration())
            )?;
        }
        write!(f, "  {:<18} {}", "total", format_duration(self.total_duration()))?;

        for warning in &self.warnings {
            write!(f, "\nwarning: {warning}")?;
        }
        Ok(())
    }
}

// =============================================================================
// Formatting helpers
// =============================================================================

/// Formats a duration as `1.23s`, `2m 3.4s` or `1h 2m 3.4s`.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use mesh_pipeline::format_duration;
///
/// assert_eq!(format_duration(Duration::from_millis(1234)), "1.23s");
/// assert_eq!(format_duration(Duration::from_millis(123_400)), "2m 3.4s");
/// assert_eq!(format_duration(Duration::from_millis(3_723_400)), "1h 2m 3.4s");
/// ```
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let seconds = duration.as_secs_f64();
    let whole = duration.as_secs();
    if seconds < 60.0 {
        format!("{seconds:.2}s")
    } else if seconds < 3600.0 {
        format!("{}m {:.1}s", whole / 60, seconds % 60.0)
    } else {
        format!(
            "{}h {}m {:.1}s",
            whole / 3600,
            (whole % 3600) / 60,
            seconds % 60.0
        )
    }
}

/// Formats a byte count as `B`, `KB`, `MB` or `GB` with binary multiples.
///
/// # Example
///
/// ```
/// use mesh_pipeline::format_size;
///
/// assert_eq!(format_size(684), "684 B");
/// assert_eq!(format_size(1536), "1.5 KB");
/// assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
/// ```
#[must_use]
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    if bytes < KB {
        format!("{bytes} B")
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else if bytes < GB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    }
}
