//! Bounded, queued, multi-target structured logging.
//!
//! A [`QueuedLogger`] owns a bounded main queue drained by a background
//! dispatcher task. The dispatcher fans each record out to the configured
//! targets, and every target runs its own delivery task behind its own bounded
//! queue. When a queue is full the logger asks a callback whether to drop the
//! record or wait for space.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use log_engine::{Field, Level, LogEngine, LoggerConfiguration, LoggerOptions, QueuedLogger};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let logger = QueuedLogger::new(LoggerOptions::new().max_queue_size(500));
//!
//! let targets = LoggerConfiguration::from_yaml_str(
//!     r#"
//! audit-file:
//!   type: file
//!   levels: [audit-api]
//!   options:
//!     filename: /var/log/audit/audit.jsonl
//! "#,
//! )?;
//! logger.configure_targets(&targets).await?;
//!
//! logger
//!     .submit(Level::AUDIT_API, String::new(), vec![Field::new("event", "login")])
//!     .await;
//!
//! logger.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
mod engine;
mod error;
mod field;
pub mod format;
mod level;
mod logger;
mod record;
pub mod target;

// Re-export primary public types at the crate root for convenience.
pub use config::{LoggerConfiguration, TargetConfig, TargetKind, TargetOptions};
pub use engine::LogEngine;
pub use error::{LoggerError, TargetError, TargetFailure};
pub use field::{Field, Value};
pub use format::Format;
pub use level::Level;
pub use logger::{LoggerOptions, QueuedLogger, MAIN_QUEUE};
pub use record::LogRec;
pub use target::Target;
