use log_engine::LoggerError;

/// Failures surfaced by the [`Audit`](crate::Audit) facade.
///
/// A full queue is not an error; it is settled by the
/// [`AuditPolicy`](crate::AuditPolicy).
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("invalid audit target configuration: {0}")]
    Configuration(#[source] LoggerError),

    #[error("failed to flush audit records: {0}")]
    Flush(#[source] LoggerError),

    #[error("failed to shut down audit logging: {0}")]
    Shutdown(#[source] LoggerError),
}

impl AuditError {
    /// The engine error behind this failure.
    pub fn logger_error(&self) -> &LoggerError {
        match self {
            Self::Configuration(err) | Self::Flush(err) | Self::Shutdown(err) => err,
        }
    }
}
