use std::fmt;
use std::sync::Arc;

use log_engine::{LoggerError, LoggerOptions, MAIN_QUEUE};
use tracing::error;

/// Decides what happens when an audit queue is full and how engine errors
/// are reported.
///
/// Both methods are called from the logger's own tasks as well as from
/// callers of [`Audit::log_record`](crate::Audit::log_record), so they must
/// be cheap and must not log through the same [`Audit`](crate::Audit).
pub trait AuditPolicy: Send + Sync {
    /// `queue` is [`MAIN_QUEUE`] for the global queue, otherwise the name of
    /// the target whose queue is full. Return `true` to drop the new record,
    /// `false` to wait for room.
    fn resolve_queue_full(&self, queue: &str, max_queue_size: usize) -> bool {
        drop_with_diagnostic(queue, max_queue_size)
    }

    /// Called for every engine failure, including the ones that are also
    /// returned from [`Audit::flush`](crate::Audit::flush) and
    /// [`Audit::shutdown`](crate::Audit::shutdown).
    fn report_error(&self, err: &LoggerError) {
        log_error(err);
    }
}

/// Drops records on a full queue and logs errors through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPolicy;

impl AuditPolicy for DefaultPolicy {}

fn drop_with_diagnostic(queue: &str, max_queue_size: usize) -> bool {
    if queue == MAIN_QUEUE {
        error!(
            queue,
            queue_size = max_queue_size,
            "audit logging queue full, dropping record"
        );
    } else {
        error!(
            queue,
            queue_size = max_queue_size,
            "audit logging queue full for target, dropping record"
        );
    }
    true
}

fn log_error(err: &LoggerError) {
    error!(%err, "auditing error");
}

type QueueFullFn = Arc<dyn Fn(&str, usize) -> bool + Send + Sync>;
type ErrorFn = Arc<dyn Fn(&LoggerError) + Send + Sync>;

/// Closure-based policy. Any closure left unset falls back to the
/// [`DefaultPolicy`] behaviour.
///
/// ```rust
/// use audit_log::CallbackPolicy;
///
/// // Never lose an audit record: wait for room instead of dropping.
/// let policy = CallbackPolicy::new().on_queue_full(|_queue, _max| false);
/// ```
#[derive(Clone, Default)]
pub struct CallbackPolicy {
    on_queue_full: Option<QueueFullFn>,
    on_error: Option<ErrorFn>,
}

impl CallbackPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_queue_full<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, usize) -> bool + Send + Sync + 'static,
    {
        self.on_queue_full = Some(Arc::new(f));
        self
    }

    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&LoggerError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for CallbackPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackPolicy")
            .field("on_queue_full", &self.on_queue_full.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

impl AuditPolicy for CallbackPolicy {
    fn resolve_queue_full(&self, queue: &str, max_queue_size: usize) -> bool {
        match &self.on_queue_full {
            Some(f) => f(queue, max_queue_size),
            None => drop_with_diagnostic(queue, max_queue_size),
        }
    }

    fn report_error(&self, err: &LoggerError) {
        match &self.on_error {
            Some(f) => f(err),
            None => log_error(err),
        }
    }
}

/// Logger options with all three engine callbacks routed to `policy`.
///
/// Use this when building a [`QueuedLogger`](log_engine::QueuedLogger) by
/// hand, e.g. to change its timeouts before handing it to
/// [`Audit::from_engine`](crate::Audit::from_engine).
pub fn logger_options(max_queue_size: usize, policy: &Arc<dyn AuditPolicy>) -> LoggerOptions {
    let on_error = Arc::clone(policy);
    let on_full = Arc::clone(policy);
    let on_target_full = Arc::clone(policy);

    LoggerOptions::new()
        .max_queue_size(max_queue_size)
        .on_logger_error(move |err| on_error.report_error(err))
        .on_queue_full(move |_rec, max| on_full.resolve_queue_full(MAIN_QUEUE, max))
        .on_target_queue_full(move |target, _rec, max| {
            on_target_full.resolve_queue_full(target, max)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[test]
    fn default_policy_drops() {
        assert!(DefaultPolicy.resolve_queue_full(MAIN_QUEUE, 10));
        assert!(DefaultPolicy.resolve_queue_full("audit-file", 10));
    }

    #[test]
    fn unset_callbacks_fall_back_to_default() {
        let policy = CallbackPolicy::new();
        assert!(policy.resolve_queue_full(MAIN_QUEUE, 1));
        policy.report_error(&LoggerError::Closed);
    }

    #[test]
    fn callbacks_receive_arguments_verbatim() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let errors = Arc::new(AtomicUsize::new(0));

        let seen_in = Arc::clone(&seen);
        let errors_in = Arc::clone(&errors);
        let policy = CallbackPolicy::new()
            .on_queue_full(move |queue, max| {
                seen_in.lock().unwrap().push((queue.to_string(), max));
                false
            })
            .on_error(move |err| {
                assert!(matches!(err, LoggerError::Closed));
                errors_in.fetch_add(1, Ordering::SeqCst);
            });

        assert!(!policy.resolve_queue_full("main", 5));
        assert!(!policy.resolve_queue_full("audit-file", 7));
        policy.report_error(&LoggerError::Closed);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![("main".to_string(), 5), ("audit-file".to_string(), 7)]
        );
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn debug_shows_which_callbacks_are_set() {
        let policy = CallbackPolicy::new().on_error(|_| {});
        let repr = format!("{policy:?}");
        assert!(repr.contains("on_queue_full: false"), "{repr}");
        assert!(repr.contains("on_error: true"), "{repr}");
    }
}
