//! Staged mesh post-processing.
//!
//! A [`Pipeline`] takes one mesh through load, vertex merging, statistics,
//! optional decimation, optional repair and export, timing every stage and
//! collecting a [`PipelineReport`]:
//!
//! ```text
//! load ─► [merge] ─► statistics ─► [decimate] ─► [repair] ─► [final statistics] ─► export*
//! ```
//!
//! Full-resolution outputs, when a job has them, are written right after
//! statistics so they hold the merged mesh before decimation and repair.
//! With a colour palette configured, every output is split into one part
//! per palette colour: one 3MF object each, or one STL file each.
//!
//! Loader and exporter failures abort the run with a [`PipelineError`].
//! Numerical edge cases in decimation and repair never do; they are
//! attached to the report as [`PipelineWarning`]s.
//!
//! # Layer 0 Crate
//!
//! This is a Layer 0 crate with no rendering or UI dependencies. It
//! installs no tracing subscriber; binaries choose their own.
//!
//! # Example
//!
//! ```no_run
//! use mesh_pipeline::{Pipeline, PipelineConfig};
//! use mesh_decimate::DecimateTarget;
//!
//! let config = PipelineConfig::default().with_target(DecimateTarget::Ratio(0.5));
//! let pipeline = Pipeline::new(config).unwrap();
//! let report = pipeline.run(&pipeline.job_for("duck_3d.glb")).unwrap();
//! println!("{report}");
//! ```
//!
//! # Batches
//!
//! [`run_batch`] runs independent jobs on a dedicated thread pool and
//! returns one [`BatchOutcome`] per job, in job order.

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod batch;
mod config;
mod error;
mod pipeline;
mod report;

pub use batch::{batch_exit_code, run_batch, BatchOutcome};
pub use config::PipelineConfig;
pub use error::{
    PipelineError, PipelineResult, EXIT_INVALID_INPUT, EXIT_SUCCESS, EXIT_UNSUPPORTED_FORMAT,
    EXIT_WRITE_FAILURE,
};
pub use pipeline::{OutputTarget, Pipeline, PipelineJob};
pub use report::{
    format_duration, format_size, DecimationSummary, OutputRecord, PipelineReport,
    PipelineWarning, Stage, StageTiming,
};
