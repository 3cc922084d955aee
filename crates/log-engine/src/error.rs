use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Errors raised by a single target while opening, writing or flushing.
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    #[error("failed to create parent directories: {0}")]
    CreateDir(std::io::Error),

    #[error("failed to open log file: {0}")]
    OpenFile(std::io::Error),

    #[error("failed to serialize log record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write log record: {0}")]
    Write(std::io::Error),

    #[error("failed to flush target: {0}")]
    Flush(std::io::Error),

    #[error("target task terminated unexpectedly")]
    Terminated,
}

/// A [`TargetError`] tagged with the name of the target that raised it.
#[derive(Debug)]
pub struct TargetFailure {
    pub target: String,
    pub error: TargetError,
}

impl fmt::Display for TargetFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.target, self.error)
    }
}

/// Errors reported by the logger, either returned from an operation or
/// handed to the logger-error callback.
#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    #[error("failed to read logger configuration {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse logger configuration: {0}")]
    Parse(String),

    #[error("invalid configuration for target '{target}': {reason}")]
    Config { target: String, reason: String },

    #[error("failed to construct target '{target}': {source}")]
    Target {
        target: String,
        source: TargetError,
    },

    #[error("target '{target}' failed to deliver records: {source}")]
    Write {
        target: String,
        source: TargetError,
    },

    #[error("flush failed: {}", describe(.0))]
    Flush(Vec<TargetFailure>),

    #[error("shutdown failed: {}", describe(.0))]
    Shutdown(Vec<TargetFailure>),

    #[error("{op} did not complete within {after:?}")]
    Timeout { op: &'static str, after: Duration },

    #[error("logger has been shut down")]
    Closed,
}

fn describe(failures: &[TargetFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
