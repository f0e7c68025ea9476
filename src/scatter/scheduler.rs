//! Fixed-size worker pool driving jobs through the engine
//!
//! Workers pull specs from a shared queue and push outcomes over a channel
//! consumed by a single collector loop, so the outcome collection has exactly
//! one synchronized point. A job's failure or timeout never cancels a sibling:
//! partial failure of some regions must not prevent completion of the others.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::error::{Result, ScatterError};
use crate::scatter::exec;
use crate::scatter::job::{JobOutcome, JobSpec, RunReport};
use crate::telemetry::{ProgressStats, TelemetryEvent};

/// Bounded-concurrency dispatcher over an ordered job sequence
///
/// The pool is caller-owned and sized per invocation; nothing is shared across
/// runs. Dispatch order follows the queue, completion order is unconstrained.
pub struct Scheduler {
    worker_count: usize,
    quiet: bool,
}

impl Scheduler {
    pub fn new(worker_count: usize, quiet: bool) -> Self {
        Self {
            worker_count: worker_count.max(1),
            quiet,
        }
    }

    /// Dispatch every spec exactly once and block until all outcomes are in
    ///
    /// Returns the aggregated report once the pool drains. The only error path
    /// is environmental (the engine could not be spawned); job failures are
    /// recorded in the report, never raised.
    pub async fn run(&self, specs: Vec<JobSpec>) -> Result<RunReport> {
        let total = specs.len();
        info!("Dispatching {} jobs across {} workers", total, self.worker_count);

        let queue = Arc::new(Mutex::new(specs.into_iter().collect::<VecDeque<_>>()));
        let (telemetry_tx, telemetry_rx) = mpsc::unbounded_channel::<TelemetryEvent>();

        let worker_handles = self.spawn_worker_pool(&queue, &telemetry_tx);

        // Drop the scheduler's copy of the sender so the collector loop ends
        // when the last worker finishes
        drop(telemetry_tx);

        let outcomes = self.collect_outcomes(total, telemetry_rx).await;

        let worker_results = futures::future::join_all(worker_handles).await;

        let mut environment_error = None;
        for (i, result) in worker_results.into_iter().enumerate() {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!("Worker {} stopped: {}", i, e);
                    environment_error.get_or_insert(e);
                }
                Err(e) => {
                    warn!("Worker {} panicked: {}", i, e);
                }
            }
        }

        // An engine that could never start outranks any per-job bookkeeping
        if let Some(e) = environment_error {
            return Err(e);
        }

        Ok(RunReport { total, outcomes })
    }

    fn spawn_worker_pool(
        &self,
        queue: &Arc<Mutex<VecDeque<JobSpec>>>,
        telemetry_tx: &mpsc::UnboundedSender<TelemetryEvent>,
    ) -> Vec<tokio::task::JoinHandle<Result<()>>> {
        let mut worker_handles = Vec::with_capacity(self.worker_count);

        for _ in 0..self.worker_count {
            let queue = Arc::clone(queue);
            let telemetry_tx = telemetry_tx.clone();

            let handle = tokio::spawn(async move { worker_loop(queue, telemetry_tx).await });
            worker_handles.push(handle);
        }

        worker_handles
    }

    /// Single consumer of the telemetry channel; owns the progress display
    async fn collect_outcomes(
        &self,
        total: usize,
        mut telemetry_rx: mpsc::UnboundedReceiver<TelemetryEvent>,
    ) -> Vec<JobOutcome> {
        let bar = if self.quiet {
            None
        } else {
            let bar = ProgressBar::new(total as u64);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template(
                        "[{elapsed_precise}] Jobs: [{bar:30.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
                    )
                    .unwrap()
                    .progress_chars("=>-"),
            );
            Some(bar)
        };

        let mut stats = ProgressStats::new();
        let mut outcomes = Vec::with_capacity(total);

        while let Some(event) = telemetry_rx.recv().await {
            stats.update(&event);

            if let TelemetryEvent::JobFinished { outcome, .. } = event {
                outcomes.push(outcome);
            }

            if let Some(ref bar) = bar {
                bar.set_position(stats.jobs_completed as u64);
                if stats.jobs_failed > 0 {
                    bar.set_message(format!("{} failed", stats.jobs_failed));
                }
            }
        }

        if let Some(bar) = bar {
            bar.finish();
        }

        let (p50, p90, p99) = stats.get_percentiles();
        if let (Some(p50), Some(p90), Some(p99)) = (p50, p90, p99) {
            info!(
                "Job wall-clock: p50 {}ms, p90 {}ms, p99 {}ms",
                p50, p90, p99
            );
        }

        outcomes
    }
}

/// Run jobs off the shared queue until it is empty
///
/// Each worker blocks only on its own child process; the per-job timeout is
/// enforced inside the job runner. An environment error stops this worker and
/// surfaces after the pool drains; it does not tear down siblings.
async fn worker_loop(
    queue: Arc<Mutex<VecDeque<JobSpec>>>,
    telemetry_tx: mpsc::UnboundedSender<TelemetryEvent>,
) -> Result<()> {
    loop {
        let spec = {
            let mut queue = queue.lock().map_err(|_| {
                ScatterError::Io(std::io::Error::other("job queue lock poisoned"))
            })?;
            queue.pop_front()
        };

        let Some(spec) = spec else {
            return Ok(());
        };

        let _ = telemetry_tx.send(TelemetryEvent::JobStarted { index: spec.index });

        let started = Instant::now();
        let outcome = exec::run_job(&spec).await?;
        let duration_ms = started.elapsed().as_millis() as u64;

        let _ = telemetry_tx.send(TelemetryEvent::JobFinished {
            outcome,
            duration_ms,
        });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::scatter::job::FailureReason;

    fn shell_spec(index: usize, script: &str, timeout: Option<Duration>) -> JobSpec {
        JobSpec {
            index,
            argv: vec!["/bin/sh".to_string(), "-c".to_string(), script.to_string()],
            timeout,
        }
    }

    #[tokio::test]
    async fn test_every_job_yields_exactly_one_outcome() {
        let specs: Vec<JobSpec> = (0..7)
            .map(|i| shell_spec(i, &format!("echo job-{i}"), None))
            .collect();

        let report = Scheduler::new(3, true).run(specs).await.unwrap();

        assert_eq!(report.total, 7);
        assert_eq!(report.outcomes.len(), 7);

        let mut indices: Vec<usize> = report.outcomes.iter().map(|o| o.index).collect();
        indices.sort_unstable();
        assert_eq!(indices, (0..7).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_one_failure_does_not_abort_siblings() {
        let specs = vec![
            shell_spec(0, "true", None),
            shell_spec(1, "exit 3", None),
            shell_spec(2, "true", None),
            shell_spec(3, "true", None),
        ];

        let report = Scheduler::new(2, true).run(specs).await.unwrap();

        assert_eq!(report.outcomes.len(), 4);
        assert_eq!(report.failed_count(), 1);
        let failed = report.failed();
        assert_eq!(failed[0].index, 1);
        assert_eq!(failed[0].failure, Some(FailureReason::NonZeroExit(Some(3))));
    }

    #[tokio::test]
    async fn test_slow_job_times_out_while_fast_siblings_complete() {
        let timeout = Some(Duration::from_millis(300));
        let specs = vec![
            shell_spec(0, "true", timeout),
            shell_spec(1, "sleep 30", timeout),
            shell_spec(2, "true", timeout),
        ];

        let start = Instant::now();
        let report = Scheduler::new(2, true).run(specs).await.unwrap();

        assert_eq!(report.total, 3);
        assert_eq!(report.outcomes.len(), 3);

        let failed = report.failed();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].index, 1);
        assert_eq!(failed[0].failure, Some(FailureReason::Timeout));

        // The batch finished on the timeout's clock, not the sleep's
        assert!(start.elapsed() < Duration::from_secs(20));
    }

    #[tokio::test]
    async fn test_completion_order_may_differ_from_submission_order() {
        // Job 0 is slow but within budget; a 2-wide pool lets 1 and 2 pass it
        let specs = vec![
            shell_spec(0, "sleep 1", None),
            shell_spec(1, "true", None),
            shell_spec(2, "true", None),
        ];

        let report = Scheduler::new(2, true).run(specs).await.unwrap();

        assert_eq!(report.outcomes.len(), 3);
        let completion: Vec<usize> = report.outcomes.iter().map(|o| o.index).collect();
        assert_eq!(completion.last(), Some(&0));
    }

    #[tokio::test]
    async fn test_missing_engine_surfaces_environment_error() {
        let specs = vec![JobSpec {
            index: 0,
            argv: vec!["/nonexistent/engine".to_string()],
            timeout: None,
        }];

        let err = Scheduler::new(2, true).run(specs).await.unwrap_err();
        assert!(matches!(err, ScatterError::Environment { .. }));
    }

    #[tokio::test]
    async fn test_empty_job_list_drains_immediately() {
        let report = Scheduler::new(4, true).run(Vec::new()).await.unwrap();
        assert_eq!(report.total, 0);
        assert!(report.outcomes.is_empty());
    }
}
