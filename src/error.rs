//! Centralized error types for the scatter orchestrator, using `thiserror`.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for scatter operations
#[derive(Error, Debug)]
pub enum ScatterError {
    /// The interval file could not be parsed; raised before any job is dispatched
    #[error("malformed interval at line {line}: {message}")]
    MalformedInterval { line: usize, message: String },

    /// The engine executable could not be located or started at all.
    /// Distinct from a job failure: the job never ran.
    #[error("failed to start engine '{program}': {source}")]
    Environment {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Aggregate failure raised after every job has had a chance to complete
    #[error("{failed} of {total} jobs failed")]
    JobsFailed { failed: usize, total: usize },

    /// Output artifact count differs from job count after the pool drained.
    /// Logged as an error but non-fatal to the run.
    #[error("expected {expected} output files, found {found}")]
    CompletenessMismatch { expected: usize, found: usize },

    /// VCF/BAM header processing errors (sample renaming)
    #[error("VCF error: {message}")]
    Vcf { message: String },

    /// File not found errors
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// I/O errors (file missing, permission denied, read/write failures)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Report serialization errors
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Type alias for Results using ScatterError
pub type Result<T> = std::result::Result<T, ScatterError>;

impl ScatterError {
    /// Create a malformed-interval error with a message
    pub fn malformed_interval(line: usize, message: impl Into<String>) -> Self {
        Self::MalformedInterval {
            line,
            message: message.into(),
        }
    }

    /// Create a VCF error with a message
    pub fn vcf(message: impl Into<String>) -> Self {
        Self::Vcf {
            message: message.into(),
        }
    }
}
