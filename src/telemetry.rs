//! Telemetry events sent from workers to the collector for progress tracking

use crate::scatter::job::JobOutcome;

/// Events emitted by workers while the pool runs
#[derive(Debug)]
pub enum TelemetryEvent {
    /// A worker dispatched a job to the engine
    JobStarted { index: usize },
    /// A job produced its outcome
    JobFinished {
        outcome: JobOutcome,
        duration_ms: u64,
    },
}

/// Statistics aggregated from telemetry events
#[derive(Debug, Default, Clone)]
pub struct ProgressStats {
    pub jobs_started: usize,
    pub jobs_completed: usize,
    pub jobs_failed: usize,
    pub job_durations_ms: Vec<u64>,
}

impl ProgressStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update stats with a telemetry event
    pub fn update(&mut self, event: &TelemetryEvent) {
        match event {
            TelemetryEvent::JobStarted { .. } => {
                self.jobs_started += 1;
            }
            TelemetryEvent::JobFinished {
                outcome,
                duration_ms,
            } => {
                self.jobs_completed += 1;
                if !outcome.succeeded {
                    self.jobs_failed += 1;
                }
                self.job_durations_ms.push(*duration_ms);
            }
        }
    }

    /// Calculate percentile from job durations
    pub fn percentile(&self, p: f64) -> Option<u64> {
        if self.job_durations_ms.is_empty() {
            return None;
        }

        let mut sorted = self.job_durations_ms.clone();
        sorted.sort_unstable();

        let index = ((p / 100.0) * sorted.len() as f64).ceil() as usize - 1;
        let index = index.min(sorted.len() - 1);

        Some(sorted[index])
    }

    /// Get p50, p90, p99 percentiles
    pub fn get_percentiles(&self) -> (Option<u64>, Option<u64>, Option<u64>) {
        (
            self.percentile(50.0),
            self.percentile(90.0),
            self.percentile(99.0),
        )
    }
}
