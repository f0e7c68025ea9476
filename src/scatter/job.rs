//! Job descriptions and per-job outcomes

use std::time::Duration;

/// One fully-formed engine invocation, ready to dispatch
///
/// Owned by the scheduler from creation until dispatch; never mutated after
/// construction. The argv vector is the exact child-process argument list:
/// pre-splitting at build time keeps the quoted `--java-options` value a
/// single argument without a shell-quoting round trip.
#[derive(Debug, Clone)]
pub struct JobSpec {
    /// 0-based position in the region sequence; doubles as the block number
    pub index: usize,
    pub argv: Vec<String>,
    pub timeout: Option<Duration>,
}

impl JobSpec {
    /// The invocation as a single line, for logs only
    pub fn display_command(&self) -> String {
        self.argv.join(" ")
    }
}

/// Why a job failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// The process ran to completion with a non-zero status
    NonZeroExit(Option<i32>),
    /// The wall-clock budget was exceeded and the process group was killed
    Timeout,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::NonZeroExit(Some(code)) => write!(f, "non-zero exit ({code})"),
            FailureReason::NonZeroExit(None) => write!(f, "non-zero exit (killed by signal)"),
            FailureReason::Timeout => write!(f, "timeout"),
        }
    }
}

/// Result of executing one job; produced exactly once per dispatched JobSpec
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub index: usize,
    pub succeeded: bool,
    pub stdout: String,
    pub stderr: String,
    pub failure: Option<FailureReason>,
}

impl JobOutcome {
    pub fn success(index: usize, stdout: String, stderr: String) -> Self {
        Self {
            index,
            succeeded: true,
            stdout,
            stderr,
            failure: None,
        }
    }

    pub fn failure(index: usize, reason: FailureReason, stdout: String, stderr: String) -> Self {
        Self {
            index,
            succeeded: false,
            stdout,
            stderr,
            failure: Some(reason),
        }
    }
}

/// Aggregated outcomes of a drained worker pool
///
/// Outcomes arrive in completion order, not submission order; each carries its
/// originating job index so per-region results stay deterministic.
#[derive(Debug)]
pub struct RunReport {
    pub total: usize,
    pub outcomes: Vec<JobOutcome>,
}

impl RunReport {
    /// Failing outcomes, ordered by job index
    pub fn failed(&self) -> Vec<&JobOutcome> {
        let mut failed: Vec<&JobOutcome> = self.outcomes.iter().filter(|o| !o.succeeded).collect();
        failed.sort_by_key(|o| o.index);
        failed
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.succeeded).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_outcomes_ordered_by_index() {
        let report = RunReport {
            total: 4,
            outcomes: vec![
                JobOutcome::failure(3, FailureReason::Timeout, String::new(), String::new()),
                JobOutcome::success(0, String::new(), String::new()),
                JobOutcome::failure(
                    1,
                    FailureReason::NonZeroExit(Some(2)),
                    String::new(),
                    String::new(),
                ),
                JobOutcome::success(2, String::new(), String::new()),
            ],
        };

        let failed = report.failed();
        assert_eq!(report.failed_count(), 2);
        assert_eq!(failed[0].index, 1);
        assert_eq!(failed[1].index, 3);
    }

    #[test]
    fn test_failure_reason_display() {
        assert_eq!(
            FailureReason::NonZeroExit(Some(1)).to_string(),
            "non-zero exit (1)"
        );
        assert_eq!(FailureReason::Timeout.to_string(), "timeout");
    }
}
