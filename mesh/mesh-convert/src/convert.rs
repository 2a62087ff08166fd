//! Turning command-line arguments into pipeline runs.

use std::fs;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use mesh_decimate::DecimateTarget;
use mesh_io::{ColorPalette, IoError, IoErrorKind, MeshFormat, Rgba, StlEncoding};
use mesh_pipeline::{
    batch_exit_code, run_batch, Pipeline, PipelineConfig, PipelineError, PipelineJob,
    PipelineReport, EXIT_INVALID_INPUT, EXIT_SUCCESS, EXIT_UNSUPPORTED_FORMAT,
    EXIT_WRITE_FAILURE,
};
use owo_colors::OwoColorize;

use crate::Cli;

/// Run the conversion described by `cli` and return the exit code.
pub fn run(cli: &Cli) -> Result<i32> {
    let config = build_config(cli)?;
    let pipeline = Pipeline::new(config)?;
    let jobs = build_jobs(cli, &pipeline)?;

    if let [job] = jobs.as_slice() {
        run_single(cli, &pipeline, job)
    } else {
        run_many(cli, &pipeline, jobs)
    }
}

/// Exit code for an error that escaped [`run`].
pub fn exit_code(err: &anyhow::Error) -> i32 {
    if let Some(e) = err.downcast_ref::<PipelineError>() {
        return e.exit_code();
    }
    if let Some(e) = err.downcast_ref::<IoError>() {
        return match e.kind() {
            IoErrorKind::UnknownFormat | IoErrorKind::UnsupportedFeature => EXIT_UNSUPPORTED_FORMAT,
            IoErrorKind::Format | IoErrorKind::Io => EXIT_INVALID_INPUT,
        };
    }
    // The only file the tool touches outside the pipeline is the JSON report.
    if err.downcast_ref::<std::io::Error>().is_some() {
        return EXIT_WRITE_FAILURE;
    }
    EXIT_INVALID_INPUT
}

/// Configuration file (if any) overridden by flags.
pub fn build_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };

    if cli.stats_only {
        return Ok(config
            .without_decimation()
            .without_repair()
            .with_formats(Vec::new()));
    }

    let target = match (cli.ratio, cli.target_faces) {
        (Some(ratio), _) => Some(DecimateTarget::Ratio(ratio)),
        (None, Some(count)) => Some(DecimateTarget::FaceCount(count)),
        (None, None) => None,
    };
    if let Some(target) = target {
        config = config.with_target(target).with_full_resolution(true);
        if config.output_suffix.is_empty() {
            config = config.with_output_suffix("_simplified");
        }
    }
    if cli.simplified_only {
        config = config.with_full_resolution(false);
    }

    if cli.no_repair {
        config = config.without_repair();
    }

    if !cli.formats.is_empty() {
        let mut formats: Vec<MeshFormat> = Vec::new();
        for &format in &cli.formats {
            let format = MeshFormat::from(format);
            if !formats.contains(&format) {
                formats.push(format);
            }
        }
        config = config.with_formats(formats);
    } else if let Some(output) = &cli.output {
        let format = MeshFormat::detect(output)
            .with_context(|| format!("cannot choose a format for {}", output.display()))?;
        config = config.with_formats(vec![format]);
    }

    if cli.ascii {
        config.export.stl_encoding = StlEncoding::Ascii;
    }
    if let Some(hex) = &cli.color {
        let color = Rgba::from_hex(hex).ok_or_else(|| anyhow!("invalid colour {hex:?}"))?;
        config.export.object_color = Some(color);
    }
    if let Some(spec) = &cli.palette {
        let mut palette: ColorPalette = spec.parse()?;
        if let Some(tolerance) = cli.tolerance {
            palette = palette.with_tolerance(tolerance);
        }
        config = config.with_palette(palette);
    }

    Ok(config)
}

/// One job per input, refusing to overwrite any input.
///
/// An explicit `--output` names the full-resolution file when both are
/// written; the simplified one gets the suffix next to it.
pub fn build_jobs(cli: &Cli, pipeline: &Pipeline) -> Result<Vec<PipelineJob>> {
    let jobs: Vec<PipelineJob> = match &cli.output {
        Some(output) => {
            let [input] = cli.inputs.as_slice() else {
                bail!("--output needs exactly one input, got {}", cli.inputs.len());
            };
            let config = pipeline.config();
            let format = config.formats.first().copied().unwrap_or(MeshFormat::Stl);
            let job = PipelineJob::new(input);
            let job = if config.writes_full_resolution() {
                let stem = output
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let simplified = output.with_file_name(format!(
                    "{stem}{}.{}",
                    config.output_suffix,
                    format.extension()
                ));
                job.with_full_resolution_output(output, format)
                    .with_output(simplified, format)
            } else {
                job.with_output(output, format)
            };
            vec![job]
        }
        None => cli.inputs.iter().map(|input| pipeline.job_for(input)).collect(),
    };

    for job in &jobs {
        for target in &job.outputs {
            if same_file(&job.input, &target.path) {
                bail!(
                    "output {} would overwrite the input; pass --output or --format",
                    target.path.display()
                );
            }
        }
    }
    Ok(jobs)
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn run_single(cli: &Cli, pipeline: &Pipeline, job: &PipelineJob) -> Result<i32> {
    if !cli.quiet {
        println!("{} {}", "Converting".bold(), job.input.display());
    }
    let report = pipeline.run(job)?;

    if !cli.quiet {
        println!("{report}");
    }
    warn_if_empty(&report);

    if let Some(path) = &cli.report_json {
        let json = report.to_json().context("serializing report")?;
        fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(EXIT_SUCCESS)
}

fn run_many(cli: &Cli, pipeline: &Pipeline, jobs: Vec<PipelineJob>) -> Result<i32> {
    if !cli.quiet {
        println!("{} {} meshes", "Converting".bold(), jobs.len());
    }
    let outcomes = run_batch(pipeline, jobs, cli.jobs)?;

    let mut reports: Vec<&PipelineReport> = Vec::new();
    for outcome in &outcomes {
        match &outcome.result {
            Ok(report) => {
                if !cli.quiet {
                    println!();
                    println!("{} {}", "✓".green(), outcome.job.input.display());
                    println!("{report}");
                }
                warn_if_empty(report);
                reports.push(report);
            }
            Err(err) => {
                eprintln!("{} {}: {err}", "✗".red(), outcome.job.input.display());
            }
        }
    }

    if let Some(path) = &cli.report_json {
        let json = serde_json::to_string_pretty(&reports).context("serializing reports")?;
        fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    }

    let failed = outcomes.iter().filter(|o| !o.is_success()).count();
    if !cli.quiet {
        println!();
        println!(
            "{} succeeded, {} failed",
            (outcomes.len() - failed).green(),
            failed.red()
        );
    }
    Ok(batch_exit_code(&outcomes))
}

fn warn_if_empty(report: &PipelineReport) {
    if report.is_empty_result() {
        eprintln!(
            "{} repair left no faces; outputs are empty",
            "warning:".yellow().bold()
        );
    }
}
