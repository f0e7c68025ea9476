//! High-level runner API for the scatter orchestrator.
//!
//! This module provides the public interface that encapsulates the internal
//! wiring of interval parsing, command construction, the worker pool, and the
//! output-completeness check.
//!
//! This is the primary API for external users and for the CLI.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::{ARGUMENT_FILE_SUFFIX, LOG_CAPTURE_LIMIT, RUN_REPORT_SUFFIX};
use crate::error::{Result, ScatterError};
use crate::intervals;
use crate::mutect2::Mutect2Options;
use crate::scatter::{
    CommandBuilder, CompletenessReport, JobOutcome, JobSpec, RunReport, Scheduler, verify_outputs,
};

/// Arguments for one scatter run
#[derive(Debug, Clone)]
pub struct ScatterArgs {
    /// Interval-list file: one sub-job per record
    pub intervals: PathBuf,
    /// Prefix for every per-region output path
    pub output_prefix: PathBuf,
    /// Engine executable path
    pub engine_path: PathBuf,
    /// JVM heap size handed to --java-options (e.g. "4G")
    pub java_heap: String,
    /// Worker-pool size
    pub nthreads: usize,
    /// Per-job wall-clock budget in seconds; unbounded if absent
    pub timeout: Option<u64>,
    /// Also collect the per-region F1R2 orientation-bias archive
    pub f1r2_tar_gz: bool,
    /// Also write the per-region reassembly alignment file
    pub bam_output: bool,
    /// Suppress the progress display
    pub quiet: bool,
    /// Engine options forwarded through the shared argument file
    pub mutect2: Mutect2Options,
}

/// Result of a completed scatter run
#[derive(Debug)]
pub struct ScatterSummary {
    pub run_id: String,
    pub total: usize,
    pub failed: usize,
    pub completeness: CompletenessReport,
    pub duration: Duration,
}

/// Machine-readable record written next to the outputs after every run
#[derive(Debug, Serialize)]
struct RunReportFile {
    run_id: String,
    created_at: String, // ISO 8601
    total: usize,
    failed: usize,
    expected_outputs: usize,
    found_outputs: usize,
    jobs: Vec<JobRecord>,
}

#[derive(Debug, Serialize)]
struct JobRecord {
    index: usize,
    succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure_reason: Option<String>,
}

/// Run the scatter orchestrator with the specified arguments
///
/// This is the main entry point. It handles the whole flow:
/// - Writing the shared argument file from the enumerated option set
/// - Deriving one region per interval record
/// - Building one uniquely-numbered invocation per region
/// - Draining the worker pool and aggregating outcomes
/// - Verifying the output artifact count and persisting the run report
///
/// Individual job failures are captured, not thrown: every region gets its
/// chance to run, and only after the pool drains does a non-empty failure set
/// surface as [`ScatterError::JobsFailed`]. A completeness mismatch alone is
/// logged but does not fail the run.
pub async fn run_scatter(args: ScatterArgs) -> Result<ScatterSummary> {
    let start_time = Instant::now();

    let run_id = Uuid::new_v4().to_string();
    info!("Starting scatter run: {}", run_id);

    // 1. Write the shared argument file
    let arguments_file = args
        .mutect2
        .write_arguments_file(&suffixed(&args.output_prefix, ARGUMENT_FILE_SUFFIX))?;

    // 2. Derive regions; any malformed record aborts before dispatch
    let regions = intervals::read_regions(&args.intervals)?;
    info!(
        "Derived {} regions from {}",
        regions.len(),
        args.intervals.display()
    );

    // 3. Build one invocation per region, block-numbered by position
    let builder = CommandBuilder::new(
        &args.engine_path,
        &args.java_heap,
        &arguments_file,
        &args.output_prefix,
    )
    .with_f1r2_tar_gz(args.f1r2_tar_gz)
    .with_bam_output(args.bam_output)
    .with_timeout(args.timeout.map(Duration::from_secs));

    let specs: Vec<JobSpec> = regions
        .iter()
        .enumerate()
        .map(|(block, region)| builder.build(region, block))
        .collect();

    // 4. Drain the pool
    let report = Scheduler::new(args.nthreads, args.quiet).run(specs).await?;

    log_failures(&report);

    // 5. Sanity-check the artifact count; reported, never a hard gate
    let completeness = verify_outputs(&args.output_prefix, report.total).await?;

    // 6. Persist the run report
    let report_path = suffixed(&args.output_prefix, RUN_REPORT_SUFFIX);
    write_run_report(&report_path, &run_id, &report, &completeness).await?;

    let failed = report.failed_count();
    let duration = start_time.elapsed();
    info!(
        "Finished, took {:.2} seconds.",
        duration.as_secs_f64()
    );

    if failed > 0 {
        return Err(ScatterError::JobsFailed {
            failed,
            total: report.total,
        });
    }

    Ok(ScatterSummary {
        run_id,
        total: report.total,
        failed,
        completeness,
        duration,
    })
}

/// Log the full listing of failing commands with their own captured output
///
/// Each failing job's stdout/stderr comes from its own outcome, so the log
/// can never show a sibling's output against the wrong command.
fn log_failures(report: &RunReport) {
    for outcome in report.failed() {
        let reason = outcome
            .failure
            .map(|r| r.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        error!(
            job = outcome.index,
            reason = %reason,
            stdout = %tail(&outcome.stdout),
            stderr = %tail(&outcome.stderr),
            "Job failed"
        );
    }
}

fn tail(output: &str) -> &str {
    // Advance to a char boundary so the slice stays valid UTF-8
    let mut start = output.len().saturating_sub(LOG_CAPTURE_LIMIT);
    while start < output.len() && !output.is_char_boundary(start) {
        start += 1;
    }
    &output[start..]
}

async fn write_run_report(
    path: &std::path::Path,
    run_id: &str,
    report: &RunReport,
    completeness: &CompletenessReport,
) -> Result<()> {
    let mut jobs: Vec<JobRecord> = report.outcomes.iter().map(JobRecord::from).collect();
    jobs.sort_by_key(|j| j.index);

    let file = RunReportFile {
        run_id: run_id.to_string(),
        created_at: Utc::now().to_rfc3339(),
        total: report.total,
        failed: report.failed_count(),
        expected_outputs: completeness.expected,
        found_outputs: completeness.found,
        jobs,
    };

    let json = serde_json::to_string_pretty(&file)?;
    tokio::fs::write(path, json).await?;
    info!("Run report written to {}", path.display());
    Ok(())
}

impl From<&JobOutcome> for JobRecord {
    fn from(outcome: &JobOutcome) -> Self {
        Self {
            index: outcome.index,
            succeeded: outcome.succeeded,
            failure_reason: outcome.failure.map(|r| r.to_string()),
        }
    }
}

fn suffixed(prefix: &std::path::Path, suffix: &str) -> PathBuf {
    let mut name = prefix.as_os_str().to_os_string();
    name.push(format!(".{suffix}"));
    PathBuf::from(name)
}
