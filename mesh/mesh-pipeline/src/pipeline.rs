//! Stage sequencing.

use std::path::{Path, PathBuf};
use std::time::Instant;

use mesh_decimate::{decimate_mesh_cancellable, CancelFlag};
use mesh_io::{load_mesh, save_mesh, save_parts, split_by_palette, ColorParts, MeshFormat};
use mesh_measure::{mesh_statistics, statistics_report, MeshStatistics};
use mesh_repair::{merge_coincident_vertices, remove_unreferenced_vertices, repair_mesh_with_components};
use mesh_types::IndexedMesh;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::report::{DecimationSummary, OutputRecord, PipelineReport, PipelineWarning, Stage, StageTiming};

/// One destination of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputTarget {
    /// Destination path.
    pub path: PathBuf,
    /// Format to write.
    pub format: MeshFormat,
    /// Written from the merged mesh before decimation and repair.
    #[serde(default)]
    pub full_resolution: bool,
}

/// An input file and the outputs to produce from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineJob {
    /// Mesh to load.
    pub input: PathBuf,
    /// Outputs to write. Full-resolution targets are written after
    /// statistics, the rest after the last stage. Empty for a
    /// statistics-only run.
    pub outputs: Vec<OutputTarget>,
}

impl PipelineJob {
    /// A job with no outputs.
    #[must_use]
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            outputs: Vec::new(),
        }
    }

    /// Adds an output.
    #[must_use]
    pub fn with_output(mut self, path: impl Into<PathBuf>, format: MeshFormat) -> Self {
        self.outputs.push(OutputTarget {
            path: path.into(),
            format,
            full_resolution: false,
        });
        self
    }

    /// Adds an output holding the mesh before decimation and repair.
    #[must_use]
    pub fn with_full_resolution_output(
        mut self,
        path: impl Into<PathBuf>,
        format: MeshFormat,
    ) -> Self {
        self.outputs.push(OutputTarget {
            path: path.into(),
            format,
            full_resolution: true,
        });
        self
    }
}

/// Runs the load, statistics, decimate, repair and export stages.
///
/// A pipeline holds only its configuration and a cancellation flag, so one
/// instance can serve many concurrent runs. Each run owns its mesh.
///
/// # Example
///
/// ```
/// use mesh_pipeline::{Pipeline, PipelineConfig};
/// use mesh_types::unit_cube;
///
/// let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
/// let (mesh, report) = pipeline.run_mesh(unit_cube()).unwrap();
/// assert_eq!(mesh.faces.len(), 12);
/// assert!(report.warnings.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    cancel: CancelFlag,
}

impl Pipeline {
    /// Creates a pipeline after validating `config`.
    ///
    /// # Errors
    ///
    /// As for [`PipelineConfig::validate`].
    pub fn new(config: PipelineConfig) -> PipelineResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            cancel: CancelFlag::new(),
        })
    }

    /// Uses `flag` to cancel decimation in every run of this pipeline.
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = flag;
        self
    }

    /// The configuration.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The flag that cancels decimation.
    #[must_use]
    pub const fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    /// Builds a job for `input` from the configured formats and suffix.
    #[must_use]
    pub fn job_for<P: AsRef<Path>>(&self, input: P) -> PipelineJob {
        self.config.job_for(input)
    }

    /// Processes one file end to end.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::Load`] if the input cannot be read or parsed.
    /// - [`PipelineError::DegenerateInput`] if it has no vertices or faces.
    /// - [`PipelineError::InvalidMesh`] if a face references a missing vertex.
    /// - [`PipelineError::Export`] if an output cannot be produced, or a
    ///   configured palette cannot split a mesh without vertex colours.
    ///   Outputs written before the failing one are left in place.
    pub fn run(&self, job: &PipelineJob) -> PipelineResult<PipelineReport> {
        let started = Instant::now();
        let mesh = load_mesh(&job.input).map_err(|source| PipelineError::Load {
            path: job.input.clone(),
            source,
        })?;
        let load = StageTiming::new(Stage::Load, started.elapsed());

        let full_resolution: Vec<&OutputTarget> =
            job.outputs.iter().filter(|t| t.full_resolution).collect();
        let (mesh, mut report) = self.process(mesh, vec![load], &full_resolution)?;
        report.input = Some(job.input.clone());
        report.input_bytes = std::fs::metadata(&job.input).ok().map(|m| m.len());

        let processed: Vec<&OutputTarget> =
            job.outputs.iter().filter(|t| !t.full_resolution).collect();
        let mut exports = Exports {
            timings: &mut report.timings,
            outputs: &mut report.outputs,
            warnings: &mut report.warnings,
        };
        self.write_outputs(&mesh, &processed, &mut exports)?;

        info!(
            input = %job.input.display(),
            outputs = report.outputs.len(),
            warnings = report.warnings.len(),
            seconds = report.total_duration().as_secs_f64(),
            "Pipeline complete"
        );
        Ok(report)
    }

    /// Processes an in-memory mesh: vertex merging, statistics, then
    /// decimation and repair as configured. Nothing is written.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::DegenerateInput`] if the mesh has no vertices or
    ///   faces.
    /// - [`PipelineError::InvalidMesh`] if a face references a missing vertex.
    pub fn run_mesh(&self, mesh: IndexedMesh) -> PipelineResult<(IndexedMesh, PipelineReport)> {
        self.process(mesh, Vec::new(), &[])
    }

    fn process(
        &self,
        mut mesh: IndexedMesh,
        mut timings: Vec<StageTiming>,
        full_resolution: &[&OutputTarget],
    ) -> PipelineResult<(IndexedMesh, PipelineReport)> {
        if mesh.vertices.is_empty() || mesh.faces.is_empty() {
            return Err(PipelineError::DegenerateInput {
                vertices: mesh.vertices.len(),
                faces: mesh.faces.len(),
            });
        }
        mesh.validate_indices()?;

        let merged_vertices = if self.config.merge_vertices {
            let started = Instant::now();
            let merged = merge_coincident_vertices(&mut mesh);
            if merged > 0 {
                remove_unreferenced_vertices(&mut mesh);
            }
            timings.push(StageTiming::new(Stage::Merge, started.elapsed()));
            debug!(merged, vertices = mesh.vertices.len(), "Merged coincident vertices");
            merged
        } else {
            0
        };

        let started = Instant::now();
        let MeshStatistics {
            report: before,
            components,
        } = mesh_statistics(&mesh)?;
        timings.push(StageTiming::new(Stage::Statistics, started.elapsed()));
        info!(
            vertices = before.vertex_count,
            faces = before.face_count,
            watertight = before.is_watertight,
            components = before.component_count,
            "Input statistics"
        );

        let mut warnings = Vec::new();
        let mut outputs = Vec::new();
        self.write_outputs(
            &mesh,
            full_resolution,
            &mut Exports {
                timings: &mut timings,
                outputs: &mut outputs,
                warnings: &mut warnings,
            },
        )?;

        let decimation = match &self.config.decimate {
            Some(params) => {
                let started = Instant::now();
                let result = decimate_mesh_cancellable(&mesh, params, &self.cancel)?;
                timings.push(StageTiming::new(Stage::Decimate, started.elapsed()));
                warnings.extend(result.warnings.iter().map(PipelineWarning::from));
                let summary = DecimationSummary::from(&result);
                mesh = result.mesh;
                Some(summary)
            }
            None => None,
        };

        let repair = match &self.config.repair {
            Some(params) => {
                let started = Instant::now();
                let (repaired, summary) =
                    repair_mesh_with_components(mesh, params, Some(&components))?;
                timings.push(StageTiming::new(Stage::Repair, started.elapsed()));
                warnings.extend(summary.warnings.iter().map(PipelineWarning::from));
                mesh = repaired;
                Some(summary)
            }
            None => None,
        };

        let after = if decimation.is_some() || repair.is_some() {
            let started = Instant::now();
            let after = statistics_report(&mesh)?;
            timings.push(StageTiming::new(Stage::FinalStatistics, started.elapsed()));
            info!(
                vertices = after.vertex_count,
                faces = after.face_count,
                watertight = after.is_watertight,
                "Final statistics"
            );
            Some(after)
        } else {
            None
        };

        // Colour warnings are logged where the mesh is split.
        for warning in warnings
            .iter()
            .filter(|w| !matches!(w, PipelineWarning::UnmatchedColors { .. }))
        {
            warn!(%warning, "Pipeline warning");
        }

        let report = PipelineReport {
            input: None,
            input_bytes: None,
            merged_vertices,
            before,
            after,
            decimation,
            repair,
            outputs,
            timings,
            warnings,
        };
        Ok((mesh, report))
    }

    /// Writes `mesh` to every target. With a palette configured the mesh is
    /// split once and each target gets one part per colour.
    fn write_outputs(
        &self,
        mesh: &IndexedMesh,
        targets: &[&OutputTarget],
        exports: &mut Exports<'_>,
    ) -> PipelineResult<()> {
        let Some(first) = targets.first() else {
            return Ok(());
        };
        let parts = match &self.config.palette {
            Some(palette) => {
                let parts =
                    split_by_palette(mesh, palette).map_err(|source| PipelineError::Export {
                        path: first.path.clone(),
                        format: first.format,
                        source,
                    })?;
                if parts.unmatched_faces > 0 {
                    let warning = PipelineWarning::UnmatchedColors {
                        faces: parts.unmatched_faces,
                    };
                    warn!(%warning, "Pipeline warning");
                    exports.warnings.push(warning);
                }
                Some(parts)
            }
            None => None,
        };

        for target in targets {
            let started = Instant::now();
            match &parts {
                Some(parts) => self.write_parts(parts, target, exports.outputs)?,
                None => {
                    let bytes = save_mesh(mesh, &target.path, target.format, &self.config.export)
                        .map_err(|source| export_error(target, target.path.clone(), source))?;
                    exports.outputs.push(OutputRecord::new(target, target.path.clone(), bytes));
                }
            }
            exports
                .timings
                .push(StageTiming::new(Stage::Export(target.format), started.elapsed()));
        }
        Ok(())
    }

    /// 3MF holds every part in one package; STL gets one file per part,
    /// named `<stem>_<part>.stl`.
    fn write_parts(
        &self,
        parts: &ColorParts,
        target: &OutputTarget,
        outputs: &mut Vec<OutputRecord>,
    ) -> PipelineResult<()> {
        if target.format == MeshFormat::ThreeMf {
            let bytes = save_parts(parts, &target.path, &self.config.export)
                .map_err(|source| export_error(target, target.path.clone(), source))?;
            outputs.push(OutputRecord::new(target, target.path.clone(), bytes));
            return Ok(());
        }

        let stem = target
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        for part in &parts.parts {
            let path = target.path.with_file_name(format!(
                "{stem}_{}.{}",
                part.name,
                target.format.extension()
            ));
            let bytes = save_mesh(&part.mesh, &path, target.format, &self.config.export)
                .map_err(|source| export_error(target, path.clone(), source))?;
            let mut record = OutputRecord::new(target, path, bytes);
            record.part = Some(part.name.clone());
            outputs.push(record);
        }
        Ok(())
    }
}

/// Report fields an export appends to.
struct Exports<'a> {
    timings: &'a mut Vec<StageTiming>,
    outputs: &'a mut Vec<OutputRecord>,
    warnings: &'a mut Vec<PipelineWarning>,
}

fn export_error(target: &OutputTarget, path: PathBuf, source: mesh_io::IoError) -> PipelineError {
    PipelineError::Export {
        path,
        format: target.format,
        source,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use mesh_decimate::{DecimateParams, DecimateTarget};
    use mesh_io::{ColorPalette, ExportOptions, Rgba};
    use mesh_types::{unit_cube, Point3};

    fn floater_mesh() -> IndexedMesh {
        let mut mesh = unit_cube();
        let tet = IndexedMesh::from_parts(
            vec![
                Point3::new(5.0, 0.0, 0.0),
                Point3::new(6.0, 0.0, 0.0),
                Point3::new(5.0, 1.0, 0.0),
                Point3::new(5.0, 0.0, 1.0),
            ],
            vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]],
        );
        mesh.merge(&tet);
        mesh
    }

    #[test]
    fn test_default_pipeline_removes_floater() {
        let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let (mesh, report) = pipeline.run_mesh(floater_mesh()).unwrap();

        assert_eq!(mesh.faces.len(), 12);
        assert_eq!(mesh.vertices.len(), 8);
        assert_eq!(report.before.component_count, 2);
        assert_eq!(report.after.as_ref().unwrap().component_count, 1);
        assert_eq!(report.repair.as_ref().unwrap().components_removed, 1);
        assert!(report.decimation.is_none());
    }

    #[test]
    fn test_statistics_only_leaves_mesh() {
        let pipeline = Pipeline::new(PipelineConfig::statistics_only()).unwrap();
        let input = floater_mesh();
        let (mesh, report) = pipeline.run_mesh(input.clone()).unwrap();

        assert_eq!(mesh, input);
        assert!(report.after.is_none());
        let stages: Vec<Stage> = report.timings.iter().map(|t| t.stage).collect();
        assert_eq!(stages, vec![Stage::Merge, Stage::Statistics]);
        assert_eq!(report.merged_vertices, 0);
    }

    #[test]
    fn test_degenerate_input() {
        let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let err = pipeline.run_mesh(IndexedMesh::new()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::DegenerateInput {
                vertices: 0,
                faces: 0
            }
        ));

        let points_only = IndexedMesh::from_parts(vec![Point3::origin()], Vec::new());
        assert!(matches!(
            pipeline.run_mesh(points_only),
            Err(PipelineError::DegenerateInput { vertices: 1, .. })
        ));
    }

    #[test]
    fn test_invalid_index() {
        let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let mesh = IndexedMesh::from_parts(vec![Point3::origin()], vec![[0, 1, 2]]);
        assert!(matches!(
            pipeline.run_mesh(mesh),
            Err(PipelineError::InvalidMesh(_))
        ));
    }

    #[test]
    fn test_invalid_index_behind_duplicate_vertices() {
        // Merging would compact the mesh; the bad index must be caught first.
        let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let mesh = IndexedMesh::from_parts(
            vec![Point3::origin(), Point3::origin(), Point3::new(1.0, 0.0, 0.0)],
            vec![[0, 1, 2], [1, 2, 9]],
        );
        let err = pipeline.run_mesh(mesh).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidMesh(_)));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_invalid_target_rejected_up_front() {
        let config = PipelineConfig::default().with_target(DecimateTarget::Ratio(2.0));
        let err = Pipeline::new(config).unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_unreachable_target_is_a_warning() {
        let config = PipelineConfig::default()
            .with_decimation(DecimateParams::with_target_faces(1))
            .without_repair();
        let pipeline = Pipeline::new(config).unwrap();
        let (mesh, report) = pipeline.run_mesh(unit_cube()).unwrap();

        assert!(mesh.faces.len() <= 12);
        assert!(report
            .warnings
            .iter()
            .any(|w| matches!(w, PipelineWarning::DecimationIncomplete { target: 1, .. })));
        assert!(report.face_reduction_percent().is_some());
    }

    #[test]
    fn test_cancelled_decimation_still_reports() {
        let config = PipelineConfig::default().with_target(DecimateTarget::Ratio(0.1));
        let pipeline = Pipeline::new(config).unwrap();
        pipeline.cancel_flag().cancel();

        let (mesh, report) = pipeline.run_mesh(unit_cube()).unwrap();
        assert_eq!(mesh.faces.len(), 12);
        assert!(report
            .warnings
            .iter()
            .any(|w| matches!(w, PipelineWarning::DecimationCancelled { achieved: 12 })));
    }

    #[test]
    fn test_run_writes_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("cube.stl");
        save_mesh(&unit_cube(), &input, MeshFormat::Stl, &ExportOptions::default()).unwrap();

        let config = PipelineConfig::default()
            .with_formats(vec![MeshFormat::Stl, MeshFormat::ThreeMf])
            .with_output_suffix("_clean");
        let pipeline = Pipeline::new(config).unwrap();
        let job = pipeline.job_for(&input).with_output(dir.path().join("extra.stl"), MeshFormat::Stl);
        let report = pipeline.run(&job).unwrap();

        assert_eq!(report.input.as_deref(), Some(input.as_path()));
        assert_eq!(report.input_bytes, Some(684));
        assert_eq!(report.merged_vertices, 28);
        assert_eq!(report.before.vertex_count, 8);
        assert!(report.before.is_watertight);
        assert_eq!(report.outputs.len(), 3);
        assert_eq!(report.outputs[0].bytes, 684);
        assert_eq!(report.outputs[0].path, dir.path().join("cube_clean.stl"));
        assert!(dir.path().join("cube_clean.3mf").exists());
        assert_eq!(report.timings[0].stage, Stage::Load);
        assert_eq!(
            report.timings.last().map(|t| t.stage),
            Some(Stage::Export(MeshFormat::Stl))
        );
    }

    #[test]
    fn test_palette_outputs_one_file_per_color() {
        let dir = tempfile::tempdir().unwrap();
        let mut cube = unit_cube();
        cube.colors = Some(
            (0..8)
                .map(|i| if i >= 4 { [210, 30, 45, 255] } else { [255; 4] })
                .collect(),
        );
        let palette: ColorPalette = "WHITE=#FFFFFF,RED=#D21E2D".parse().unwrap();
        let pipeline = Pipeline::new(PipelineConfig::default().with_palette(palette)).unwrap();

        let job = PipelineJob::new("cube.glb")
            .with_output(dir.path().join("cube.stl"), MeshFormat::Stl)
            .with_output(dir.path().join("cube.3mf"), MeshFormat::ThreeMf);
        let targets: Vec<&OutputTarget> = job.outputs.iter().collect();
        let (mut timings, mut outputs, mut warnings) = (Vec::new(), Vec::new(), Vec::new());
        pipeline
            .write_outputs(
                &cube,
                &targets,
                &mut Exports {
                    timings: &mut timings,
                    outputs: &mut outputs,
                    warnings: &mut warnings,
                },
            )
            .unwrap();

        let parts: Vec<(Option<&str>, u64)> =
            outputs.iter().map(|o| (o.part.as_deref(), o.bytes)).collect();
        assert_eq!(parts[0], (Some("WHITE"), 84 + 6 * 50));
        assert_eq!(parts[1], (Some("RED"), 84 + 6 * 50));
        assert_eq!(parts[2].0, None);
        assert_eq!(outputs[1].path, dir.path().join("cube_RED.stl"));
        assert!(dir.path().join("cube_WHITE.stl").exists());
        assert!(!dir.path().join("cube.stl").exists());
        assert_eq!(mesh_io::load_mesh(dir.path().join("cube.3mf")).unwrap().faces.len(), 12);
        assert_eq!(warnings, vec![PipelineWarning::UnmatchedColors { faces: 8 }]);
        assert_eq!(timings.len(), 2);
    }

    #[test]
    fn test_palette_needs_vertex_colors() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("cube.stl");
        save_mesh(&unit_cube(), &input, MeshFormat::Stl, &ExportOptions::default()).unwrap();

        let palette: ColorPalette = "WHITE=#FFFFFF".parse().unwrap();
        let pipeline = Pipeline::new(PipelineConfig::default().with_palette(palette)).unwrap();
        let job = PipelineJob::new(&input).with_output(dir.path().join("out.3mf"), MeshFormat::ThreeMf);

        let err = pipeline.run(&job).unwrap_err();
        assert!(matches!(err, PipelineError::Export { .. }));
        assert_eq!(err.exit_code(), 1);
        assert!(!dir.path().join("out.3mf").exists());
    }

    #[test]
    fn test_full_resolution_written_before_decimation() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("cube.3mf");
        save_mesh(&unit_cube(), &input, MeshFormat::ThreeMf, &ExportOptions::default()).unwrap();

        let config = PipelineConfig::default()
            .with_decimation(DecimateParams::with_target_faces(1).with_preserve_boundary(false))
            .with_output_suffix("_simplified")
            .with_full_resolution(true);
        let pipeline = Pipeline::new(config).unwrap();
        let report = pipeline.run(&pipeline.job_for(&input)).unwrap();

        let stages: Vec<Stage> = report.timings.iter().map(|t| t.stage).collect();
        let export = stages
            .iter()
            .position(|s| *s == Stage::Export(MeshFormat::Stl))
            .unwrap();
        let decimate = stages.iter().position(|s| *s == Stage::Decimate).unwrap();
        assert!(export < decimate);

        assert_eq!(report.outputs.len(), 2);
        assert_eq!(report.outputs[0].path, dir.path().join("cube.stl"));
        assert_eq!(report.outputs[0].bytes, 684);
        assert!(report.outputs[0].full_resolution);
        assert_eq!(report.outputs[1].path, dir.path().join("cube_simplified.stl"));
        let final_faces = report.final_statistics().face_count as u64;
        assert_eq!(report.outputs[1].bytes, 84 + 50 * final_faces);
    }

    #[test]
    fn test_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let err = pipeline
            .run(&PipelineJob::new(dir.path().join("absent.glb")))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Load { .. }));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_unknown_input_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.obj");
        std::fs::write(&path, "v 0 0 0\n").unwrap();
        let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let err = pipeline.run(&PipelineJob::new(path)).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_unsupported_export() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("cube.stl");
        save_mesh(&unit_cube(), &input, MeshFormat::Stl, &ExportOptions::default()).unwrap();

        let config = PipelineConfig::default()
            .with_export_options(ExportOptions::default().with_object_color(Rgba::opaque(255, 0, 0)));
        let pipeline = Pipeline::new(config).unwrap();
        let job = PipelineJob::new(&input).with_output(dir.path().join("out.stl"), MeshFormat::Stl);

        let err = pipeline.run(&job).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Export {
                format: MeshFormat::Stl,
                ..
            }
        ));
        assert_eq!(err.exit_code(), 2);
        assert!(!dir.path().join("out.stl").exists());
    }

    #[test]
    fn test_unwritable_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("cube.stl");
        save_mesh(&unit_cube(), &input, MeshFormat::Stl, &ExportOptions::default()).unwrap();

        let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let job = PipelineJob::new(&input)
            .with_output(dir.path().join("no_such_dir").join("out.stl"), MeshFormat::Stl);

        let err = pipeline.run(&job).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
