//! Single-job execution: spawn, drain, wait, classify
//!
//! Expected failure modes (non-zero exit, timeout) are data, not errors: every
//! dispatched job comes back as a [`JobOutcome`]. The only error this module
//! raises is a spawn failure, which means the engine could never run at all.

use std::process::Stdio;

use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

use crate::config::{KILL_REAP_TIMEOUT, OUTPUT_DRAIN_TIMEOUT};
use crate::error::{Result, ScatterError};
use crate::scatter::job::{FailureReason, JobOutcome, JobSpec};

/// Execute one job to completion, bounded by its wall-clock timeout
///
/// On timeout the child's whole process group is killed (SIGKILL, not a
/// graceful signal: the target is an unresponsive or runaway computation) and
/// the child is reaped before this function returns, so no process outlives
/// the scheduler. Remaining output is drained best-effort in both the timeout
/// and normal-exit paths.
pub async fn run_job(spec: &JobSpec) -> Result<JobOutcome> {
    let (program, args) = match spec.argv.split_first() {
        Some(parts) => parts,
        None => {
            return Err(ScatterError::Environment {
                program: String::new(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
            });
        }
    };

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    // A fresh process group so a timeout kill reaches the engine's own
    // children, not just the direct child.
    #[cfg(unix)]
    command.process_group(0);

    let mut child = command.spawn().map_err(|source| ScatterError::Environment {
        program: program.clone(),
        source,
    })?;

    tracing::debug!(job = spec.index, command = %spec.display_command(), "Job started");

    let stdout_task = drain_pipe(child.stdout.take());
    let stderr_task = drain_pipe(child.stderr.take());

    let status = match spec.timeout {
        Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
            Ok(status) => Some(status?),
            Err(_) => None,
        },
        None => Some(child.wait().await?),
    };

    let outcome = match status {
        Some(status) => {
            let stdout = collect_drained(stdout_task).await;
            let stderr = collect_drained(stderr_task).await;
            if status.success() {
                JobOutcome::success(spec.index, stdout, stderr)
            } else {
                JobOutcome::failure(
                    spec.index,
                    FailureReason::NonZeroExit(status.code()),
                    stdout,
                    stderr,
                )
            }
        }
        None => {
            kill_and_reap(spec.index, &mut child).await;
            let stdout = collect_drained(stdout_task).await;
            let stderr = collect_drained(stderr_task).await;
            JobOutcome::failure(spec.index, FailureReason::Timeout, stdout, stderr)
        }
    };

    Ok(outcome)
}

/// Read a stdio pipe to EOF on its own task so the child never blocks on a
/// full pipe buffer while we wait for it to exit
fn drain_pipe<R>(pipe: Option<R>) -> JoinHandle<String>
where
    R: AsyncReadExt + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf).await;
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

async fn collect_drained(task: JoinHandle<String>) -> String {
    match tokio::time::timeout(OUTPUT_DRAIN_TIMEOUT, task).await {
        Ok(Ok(output)) => output,
        _ => String::new(),
    }
}

/// Kill the child's process group and reap it with a bounded wait
async fn kill_and_reap(index: usize, child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        // process_group(0) above made the child its own group leader
        unsafe {
            libc::killpg(pid as libc::pid_t, libc::SIGKILL);
        }
    }

    // Covers the non-unix path and a group leader that already exited
    let _ = child.start_kill();

    match tokio::time::timeout(KILL_REAP_TIMEOUT, child.wait()).await {
        Ok(Ok(_)) => {
            tracing::warn!(job = index, "Job killed after exceeding its timeout");
        }
        Ok(Err(e)) => {
            tracing::error!(job = index, error = %e, "Failed to reap killed job");
        }
        Err(_) => {
            tracing::error!(job = index, "Killed job did not exit within the reap window");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    fn shell_spec(index: usize, script: &str, timeout: Option<Duration>) -> JobSpec {
        JobSpec {
            index,
            argv: vec!["/bin/sh".to_string(), "-c".to_string(), script.to_string()],
            timeout,
        }
    }

    #[tokio::test]
    async fn test_exit_zero_is_success() {
        let spec = shell_spec(0, "echo out; echo err >&2", None);
        let outcome = run_job(&spec).await.unwrap();

        assert!(outcome.succeeded);
        assert_eq!(outcome.failure, None);
        assert_eq!(outcome.stdout, "out\n");
        assert_eq!(outcome.stderr, "err\n");
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_failure_with_output() {
        let spec = shell_spec(3, "echo partial; exit 7", None);
        let outcome = run_job(&spec).await.unwrap();

        assert!(!outcome.succeeded);
        assert_eq!(outcome.failure, Some(FailureReason::NonZeroExit(Some(7))));
        assert_eq!(outcome.index, 3);
        assert_eq!(outcome.stdout, "partial\n");
    }

    #[tokio::test]
    async fn test_timeout_kills_process() {
        let spec = shell_spec(1, "echo before; sleep 30; echo after", Some(Duration::from_millis(200)));

        let start = Instant::now();
        let outcome = run_job(&spec).await.unwrap();

        assert!(!outcome.succeeded);
        assert_eq!(outcome.failure, Some(FailureReason::Timeout));
        // Output produced before the kill is still drained
        assert_eq!(outcome.stdout, "before\n");
        // Well under the sleep: the process did not run to completion
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_whole_process_group() {
        // The grandchild sleep would survive a kill aimed only at the shell;
        // the trailing echo keeps the outer shell from exec-ing the inner one.
        let spec = shell_spec(
            0,
            "sh -c 'echo $$; exec sleep 30'; echo done",
            Some(Duration::from_millis(300)),
        );

        let outcome = run_job(&spec).await.unwrap();
        assert_eq!(outcome.failure, Some(FailureReason::Timeout));

        let pid: i32 = outcome.stdout.trim().parse().unwrap();
        // Give the kernel a beat to tear the group down
        tokio::time::sleep(Duration::from_millis(100)).await;
        let alive = unsafe { libc::kill(pid, 0) } == 0;
        assert!(!alive, "grandchild {pid} survived the group kill");
    }

    #[tokio::test]
    async fn test_missing_executable_is_environment_error() {
        let spec = JobSpec {
            index: 0,
            argv: vec!["/nonexistent/gatk".to_string(), "Mutect2".to_string()],
            timeout: None,
        };

        let err = run_job(&spec).await.unwrap_err();
        match err {
            ScatterError::Environment { program, .. } => {
                assert_eq!(program, "/nonexistent/gatk");
            }
            other => panic!("expected Environment error, got {other:?}"),
        }
    }
}
