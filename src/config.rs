//! Configuration constants for the scatter orchestrator
//!
//! This module centralizes all tunable parameters and constants used throughout
//! the application.

use std::time::Duration;

// ============================================================================
// Job Runner Configuration
// ============================================================================

/// Bounded wait for reaping a killed child process
///
/// After a timed-out job's process group is killed, the child must still be
/// waited on so the kernel can release it. A kill that is never followed by a
/// successful wait leaves a zombie behind, so the reap itself is bounded and
/// a failure to reap within this window is logged rather than hung on.
pub const KILL_REAP_TIMEOUT: Duration = Duration::from_secs(10);

/// Bounded wait for draining a finished job's remaining stdout/stderr
///
/// Once the child has exited (or been killed), its pipe ends are closed and
/// the drain tasks complete almost immediately. The bound exists so a pipe
/// held open by an unexpected survivor cannot stall the worker.
pub const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Engine Invocation Configuration
// ============================================================================

/// Serial-GC JVM flag set passed to the engine via --java-options
pub const JAVA_OPTIONS_PREFIX: &str = "-XX:+UseSerialGC -Xmx";

/// Suffix appended to the output prefix for the shared argument file
pub const ARGUMENT_FILE_SUFFIX: &str = "args";

/// Suffix appended to the output prefix for the machine-readable run report
pub const RUN_REPORT_SUFFIX: &str = "scatter.json";

// ============================================================================
// Logging Configuration
// ============================================================================

/// Maximum bytes of a failed job's captured stderr echoed into the log
///
/// Engine stderr can run to megabytes; the log listing of failing jobs only
/// needs the tail, where the engine prints its final error.
pub const LOG_CAPTURE_LIMIT: usize = 8 * 1024; // 8 KB
