//! Parallel batch runs.
//!
//! Each job runs end to end on one worker of a dedicated thread pool.
//! Workers share nothing but the read-only [`Pipeline`]; only finished
//! reports and errors come back.

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use tracing::{info, warn};

use crate::error::{PipelineError, PipelineResult, EXIT_SUCCESS};
use crate::pipeline::{Pipeline, PipelineJob};
use crate::report::PipelineReport;

/// The result of one job in a batch.
#[derive(Debug)]
pub struct BatchOutcome {
    /// The job that ran.
    pub job: PipelineJob,
    /// Its report, or the error that stopped it.
    pub result: PipelineResult<PipelineReport>,
}

impl BatchOutcome {
    /// Whether the job completed.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Process exit code for this job alone.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match &self.result {
            Ok(_) => EXIT_SUCCESS,
            Err(e) => e.exit_code(),
        }
    }
}

/// Exit code for a whole batch: the largest code of any failed job, or 0.
#[must_use]
pub fn batch_exit_code(outcomes: &[BatchOutcome]) -> i32 {
    outcomes
        .iter()
        .map(BatchOutcome::exit_code)
        .max()
        .unwrap_or(EXIT_SUCCESS)
}

/// Run `jobs` in parallel on `workers` threads.
///
/// With `workers == 0` the pool is sized to the available parallelism.
/// Outcomes are returned in job order. A failing job does not stop the
/// others.
///
/// # Errors
///
/// [`PipelineError::WorkerPool`] if the thread pool cannot be created.
/// Per-job failures are reported in each [`BatchOutcome`].
pub fn run_batch(
    pipeline: &Pipeline,
    jobs: Vec<PipelineJob>,
    workers: usize,
) -> PipelineResult<Vec<BatchOutcome>> {
    let pool = ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("mesh-batch-{i}"))
        .build()
        .map_err(|e| PipelineError::WorkerPool(e.to_string()))?;

    info!(
        jobs = jobs.len(),
        workers = pool.current_num_threads(),
        "Starting batch"
    );

    let outcomes: Vec<BatchOutcome> = pool.install(|| {
        jobs.into_par_iter()
            .map(|job| {
                let result = pipeline.run(&job);
                if let Err(e) = &result {
                    warn!(input = %job.input.display(), error = %e, "Job failed");
                }
                BatchOutcome { job, result }
            })
            .collect()
    });

    let failed = outcomes.iter().filter(|o| !o.is_success()).count();
    info!(
        succeeded = outcomes.len() - failed,
        failed,
        "Batch complete"
    );
    Ok(outcomes)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::PipelineConfig;
    use mesh_io::{save_mesh, ExportOptions, MeshFormat};
    use mesh_types::unit_cube;
    use std::path::Path;

    fn write_cubes(dir: &Path, count: usize) -> Vec<std::path::PathBuf> {
        (0..count)
            .map(|i| {
                let path = dir.join(format!("cube_{i}.stl"));
                let mut cube = unit_cube();
                for v in &mut cube.vertices {
                    v.x += f64::from(u32::try_from(i).unwrap()) * 3.0;
                }
                save_mesh(&cube, &path, MeshFormat::Stl, &ExportOptions::default()).unwrap();
                path
            })
            .collect()
    }

    #[test]
    fn test_batch_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = write_cubes(dir.path(), 6);
        let config = PipelineConfig::default()
            .with_formats(vec![MeshFormat::ThreeMf])
            .with_output_suffix("_out");
        let pipeline = Pipeline::new(config).unwrap();
        let jobs: Vec<PipelineJob> = inputs.iter().map(|p| pipeline.job_for(p)).collect();

        let outcomes = run_batch(&pipeline, jobs, 3).unwrap();

        assert_eq!(outcomes.len(), 6);
        for (outcome, input) in outcomes.iter().zip(&inputs) {
            assert_eq!(&outcome.job.input, input);
            let report = outcome.result.as_ref().unwrap();
            assert_eq!(report.final_statistics().face_count, 12);
            assert!(report.outputs[0].path.exists());
        }
        assert_eq!(batch_exit_code(&outcomes), 0);
    }

    #[test]
    fn test_failures_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = write_cubes(dir.path(), 2);
        let pipeline = Pipeline::new(PipelineConfig::statistics_only()).unwrap();

        let jobs = vec![
            PipelineJob::new(&inputs[0]),
            PipelineJob::new(dir.path().join("missing.stl")),
            PipelineJob::new(dir.path().join("model.ply")),
            PipelineJob::new(&inputs[1]),
        ];
        let outcomes = run_batch(&pipeline, jobs, 0).unwrap();

        assert!(outcomes[0].is_success());
        assert_eq!(outcomes[1].exit_code(), 1);
        assert_eq!(outcomes[2].exit_code(), 2);
        assert!(outcomes[3].is_success());
        assert_eq!(batch_exit_code(&outcomes), 2);
    }

    #[test]
    fn test_empty_batch() {
        let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let outcomes = run_batch(&pipeline, Vec::new(), 2).unwrap();
        assert!(outcomes.is_empty());
        assert_eq!(batch_exit_code(&outcomes), 0);
    }
}
