//! Structured audit logging on top of a queued, multi-target logger.
//!
//! [`Audit`] turns an audit [`Record`] into a flat list of log fields and
//! hands it to the logger, which queues it and fans it out to every
//! configured target in the background. What happens when a queue is full,
//! and where engine errors go, is decided by an [`AuditPolicy`] injected at
//! construction.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use audit_log::{Audit, Level, LoggerConfiguration, Record, STATUS_SUCCESS};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let audit = Audit::with_defaults(1000);
//!
//! let targets = LoggerConfiguration::load("/etc/myapp/audit-targets.yaml")?;
//! audit.configure(&targets).await?;
//!
//! let rec = Record::new("/api/v4/users/login", "login", STATUS_SUCCESS, "u1", "s1")
//!     .with_client("mobile")
//!     .with_ip_address("10.0.0.7")
//!     .with_meta("login_method", "password");
//! audit.log_record(Level::AUDIT_API, &rec).await;
//!
//! audit.shutdown().await?;
//! # Ok(())
//! # }
//! ```

mod audit;
mod error;
mod policy;
mod record;

pub use audit::Audit;
pub use error::AuditError;
pub use policy::{logger_options, AuditPolicy, CallbackPolicy, DefaultPolicy};
pub use record::{
    Meta, Record, KEY_API_PATH, KEY_CLIENT, KEY_EVENT, KEY_IP_ADDRESS, KEY_SESSION_ID,
    KEY_STATUS, KEY_USER_ID, STATUS_ATTEMPT, STATUS_FAIL, STATUS_SUCCESS,
};

// Engine types that appear in the facade's API.
pub use log_engine::{
    Level, LogEngine, LoggerConfiguration, LoggerError, QueuedLogger, Value, MAIN_QUEUE,
};
