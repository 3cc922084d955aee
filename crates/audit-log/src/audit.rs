use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use log_engine::{Level, LogEngine, LoggerConfiguration, LoggerError, QueuedLogger};
use tracing::error;

use crate::error::AuditError;
use crate::policy::{logger_options, AuditPolicy, DefaultPolicy};
use crate::record::{Meta, Record};

/// Audit facade over a queued logger.
///
/// Owns the logger for its whole life and routes the logger's queue-full and
/// error callbacks to the injected [`AuditPolicy`]. Share it between tasks
/// behind an `Arc`; every method takes `&self`.
///
/// Shutdown is terminal. A second [`shutdown`](Self::shutdown) succeeds
/// without doing anything, records logged afterwards are discarded, and
/// [`flush`](Self::flush) fails.
pub struct Audit<E = QueuedLogger> {
    logger: E,
    policy: Arc<dyn AuditPolicy>,
}

impl Audit<QueuedLogger> {
    /// Start a [`QueuedLogger`] whose main queue holds `max_queue_size`
    /// records. Must be called from within a tokio runtime.
    pub fn init(max_queue_size: usize, policy: Arc<dyn AuditPolicy>) -> Self {
        let logger = QueuedLogger::new(logger_options(max_queue_size, &policy));
        Self { logger, policy }
    }

    /// [`init`](Self::init) with the [`DefaultPolicy`].
    pub fn with_defaults(max_queue_size: usize) -> Self {
        Self::init(max_queue_size, Arc::new(DefaultPolicy))
    }
}

impl<E: LogEngine> Audit<E> {
    /// Wrap an already constructed engine. The engine's callbacks should be
    /// wired to the same `policy` (see [`logger_options`]).
    pub fn from_engine(logger: E, policy: Arc<dyn AuditPolicy>) -> Self {
        Self { logger, policy }
    }

    pub fn engine(&self) -> &E {
        &self.logger
    }

    pub fn policy(&self) -> &Arc<dyn AuditPolicy> {
        &self.policy
    }

    /// Emit an audit record with complete info.
    pub async fn log_record(&self, level: Level, rec: &Record) {
        self.logger.submit(level, String::new(), rec.fields()).await;
    }

    /// Emit an audit record from the minimum required info.
    #[allow(clippy::too_many_arguments)]
    pub async fn log(
        &self,
        level: Level,
        path: &str,
        event: &str,
        status: &str,
        user_id: &str,
        session_id: &str,
        meta: Meta,
    ) {
        let rec = Record {
            meta,
            ..Record::new(path, event, status, user_id, session_id)
        };
        self.log_record(level, &rec).await;
    }

    /// Replace the output targets.
    ///
    /// On error the previously configured targets keep running.
    pub async fn configure(&self, config: &LoggerConfiguration) -> Result<(), AuditError> {
        self.logger
            .configure_targets(config)
            .await
            .map_err(AuditError::Configuration)
    }

    /// Write every queued audit record to every target.
    pub async fn flush(&self) -> Result<(), AuditError> {
        self.logger.flush().await.map_err(|err| {
            self.report(&err);
            AuditError::Flush(err)
        })
    }

    /// Flush all targets as far as possible, then stop the engine.
    pub async fn shutdown(&self) -> Result<(), AuditError> {
        self.logger.shutdown().await.map_err(|err| {
            self.report(&err);
            AuditError::Shutdown(err)
        })
    }

    /// A panicking policy must not keep the error from reaching the caller.
    fn report(&self, err: &LoggerError) {
        if catch_unwind(AssertUnwindSafe(|| self.policy.report_error(err))).is_err() {
            error!(%err, "audit error policy panicked");
        }
    }
}

impl<E: fmt::Debug> fmt::Debug for Audit<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Audit")
            .field("logger", &self.logger)
            .finish_non_exhaustive()
    }
}
