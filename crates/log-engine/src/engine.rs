use std::future::Future;

use crate::config::LoggerConfiguration;
use crate::error::LoggerError;
use crate::field::Field;
use crate::level::Level;

/// The operations a queued logger exposes to the code embedding it.
///
/// [`QueuedLogger`](crate::QueuedLogger) is the production implementation;
/// the trait exists so that callers can be exercised against a fake engine.
pub trait LogEngine: Send + Sync {
    /// Enqueue a record. Waits only if the queue is full and the queue-full
    /// policy chooses to block.
    fn submit(
        &self,
        level: Level,
        msg: String,
        fields: Vec<Field>,
    ) -> impl Future<Output = ()> + Send;

    /// Replace the current targets with the ones described by `config`.
    /// On error the existing targets are left running.
    fn configure_targets(
        &self,
        config: &LoggerConfiguration,
    ) -> impl Future<Output = Result<(), LoggerError>> + Send;

    /// Deliver everything queued so far to every target and flush them.
    fn flush(&self) -> impl Future<Output = Result<(), LoggerError>> + Send;

    /// Drain, flush and close every target, then stop accepting records.
    fn shutdown(&self) -> impl Future<Output = Result<(), LoggerError>> + Send;
}
