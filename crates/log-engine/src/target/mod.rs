//! Log destinations.
//!
//! Every target runs in its own delivery task, so implementations only need
//! `&mut self` access and never see concurrent calls.

mod console;
mod file;

use std::future::Future;

pub use console::{ConsoleOut, ConsoleTarget};
pub use file::FileTarget;

use crate::config::{TargetConfig, TargetKind};
use crate::error::TargetError;
use crate::record::LogRec;

/// A destination that log records are delivered to.
pub trait Target: Send + 'static {
    /// Write a single record.
    fn write(&mut self, rec: &LogRec) -> impl Future<Output = Result<(), TargetError>> + Send;

    /// Push any buffered output to its destination.
    fn flush(&mut self) -> impl Future<Output = Result<(), TargetError>> + Send;

    /// Called once when the target is retired. Defaults to a final flush.
    fn shutdown(&mut self) -> impl Future<Output = Result<(), TargetError>> + Send {
        self.flush()
    }
}

/// Targets that can be built from a [`TargetConfig`].
pub(crate) enum BuiltinTarget {
    Console(ConsoleTarget),
    File(FileTarget),
}

impl BuiltinTarget {
    /// Construct the target described by an already validated config.
    pub(crate) async fn build(config: &TargetConfig) -> Result<Self, TargetError> {
        match config.kind {
            TargetKind::Console => {
                let out = match config.options.out.as_deref() {
                    Some("stderr") => ConsoleOut::Stderr,
                    _ => ConsoleOut::Stdout,
                };
                Ok(Self::Console(ConsoleTarget::new(out, config.format)))
            }
            TargetKind::File => {
                let path = config.options.filename.clone().unwrap_or_default();
                Ok(Self::File(FileTarget::open(path, config.format).await?))
            }
        }
    }
}

impl Target for BuiltinTarget {
    async fn write(&mut self, rec: &LogRec) -> Result<(), TargetError> {
        match self {
            Self::Console(t) => t.write(rec).await,
            Self::File(t) => t.write(rec).await,
        }
    }

    async fn flush(&mut self) -> Result<(), TargetError> {
        match self {
            Self::Console(t) => t.flush().await,
            Self::File(t) => t.flush().await,
        }
    }
}
