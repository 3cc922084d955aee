use std::collections::HashSet;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::config::LoggerConfiguration;
use crate::engine::LogEngine;
use crate::error::{LoggerError, TargetError, TargetFailure};
use crate::field::Field;
use crate::level::Level;
use crate::record::LogRec;
use crate::target::{BuiltinTarget, Target};

/// Queue identifier passed to queue-full callbacks for the global queue.
pub const MAIN_QUEUE: &str = "main";

const DEFAULT_MAX_QUEUE_SIZE: usize = 1000;
const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Flush a target after this long without new records.
const IDLE_FLUSH_INTERVAL: Duration = Duration::from_secs(1);

type ErrorCallback = Arc<dyn Fn(&LoggerError) + Send + Sync>;
type QueueFullCallback = Arc<dyn Fn(&LogRec, usize) -> bool + Send + Sync>;
type TargetQueueFullCallback = Arc<dyn Fn(&str, &LogRec, usize) -> bool + Send + Sync>;

/// Construction options for a [`QueuedLogger`].
///
/// Queue-full callbacks return `true` to drop the new record and `false` to
/// wait until the queue has room.
#[derive(Clone)]
pub struct LoggerOptions {
    max_queue_size: usize,
    flush_timeout: Duration,
    shutdown_timeout: Duration,
    on_logger_error: Option<ErrorCallback>,
    on_queue_full: Option<QueueFullCallback>,
    on_target_queue_full: Option<TargetQueueFullCallback>,
}

impl Default for LoggerOptions {
    fn default() -> Self {
        Self {
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
            flush_timeout: DEFAULT_FLUSH_TIMEOUT,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            on_logger_error: None,
            on_queue_full: None,
            on_target_queue_full: None,
        }
    }
}

impl fmt::Debug for LoggerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerOptions")
            .field("max_queue_size", &self.max_queue_size)
            .field("flush_timeout", &self.flush_timeout)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .field("on_logger_error", &self.on_logger_error.is_some())
            .field("on_queue_full", &self.on_queue_full.is_some())
            .field("on_target_queue_full", &self.on_target_queue_full.is_some())
            .finish()
    }
}

impl LoggerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capacity of the main queue and the default capacity of target queues.
    /// Values below 1 are raised to 1.
    pub fn max_queue_size(mut self, size: usize) -> Self {
        self.max_queue_size = size.max(1);
        self
    }

    pub fn flush_timeout(mut self, timeout: Duration) -> Self {
        self.flush_timeout = timeout;
        self
    }

    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Called for failures inside the delivery tasks, which have no caller
    /// to return an error to.
    pub fn on_logger_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&LoggerError) + Send + Sync + 'static,
    {
        self.on_logger_error = Some(Arc::new(f));
        self
    }

    /// Called when the main queue is full at submission time.
    pub fn on_queue_full<F>(mut self, f: F) -> Self
    where
        F: Fn(&LogRec, usize) -> bool + Send + Sync + 'static,
    {
        self.on_queue_full = Some(Arc::new(f));
        self
    }

    /// Called with the target name when a target's queue is full.
    pub fn on_target_queue_full<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &LogRec, usize) -> bool + Send + Sync + 'static,
    {
        self.on_target_queue_full = Some(Arc::new(f));
        self
    }

    fn report_error(&self, err: &LoggerError) {
        match &self.on_logger_error {
            Some(cb) => {
                if catch_unwind(AssertUnwindSafe(|| cb(err))).is_err() {
                    error!(%err, "logger error callback panicked");
                }
            }
            None => error!(%err, "logger error"),
        }
    }

    fn resolve_queue_full(&self, rec: &LogRec, max_queue_size: usize) -> bool {
        match &self.on_queue_full {
            Some(cb) => guarded_decision(MAIN_QUEUE, || cb(rec, max_queue_size)),
            None => {
                warn!(queue = MAIN_QUEUE, queue_size = max_queue_size, "log queue full, dropping record");
                true
            }
        }
    }

    fn resolve_target_queue_full(&self, target: &str, rec: &LogRec, max_queue_size: usize) -> bool {
        match &self.on_target_queue_full {
            Some(cb) => guarded_decision(target, || cb(target, rec, max_queue_size)),
            None => {
                warn!(queue = target, queue_size = max_queue_size, "log queue full, dropping record");
                true
            }
        }
    }
}

/// A panicking queue-full callback counts as "drop".
fn guarded_decision(queue: &str, decide: impl FnOnce() -> bool) -> bool {
    catch_unwind(AssertUnwindSafe(decide)).unwrap_or_else(|_| {
        error!(queue, "queue-full callback panicked; dropping record");
        true
    })
}

enum Command {
    Record(LogRec),
    Install {
        targets: Vec<TargetHandle>,
        replace: bool,
        done: oneshot::Sender<()>,
    },
    Flush(oneshot::Sender<Vec<TargetFailure>>),
    Shutdown(oneshot::Sender<Vec<TargetFailure>>),
}

enum TargetCommand {
    Write(Arc<LogRec>),
    Flush(oneshot::Sender<Result<(), TargetError>>),
}

/// Dispatcher-side handle of a running target task.
struct TargetHandle {
    name: String,
    /// `None` accepts every level.
    levels: Option<HashSet<Level>>,
    max_queue_size: usize,
    tx: mpsc::Sender<TargetCommand>,
    task: JoinHandle<Result<(), TargetError>>,
}

impl TargetHandle {
    fn accepts(&self, level: Level) -> bool {
        self.levels.as_ref().map_or(true, |set| set.contains(&level))
    }

    async fn deliver(&self, rec: &Arc<LogRec>, options: &LoggerOptions) {
        if !self.accepts(rec.level) {
            return;
        }
        match self.tx.try_send(TargetCommand::Write(Arc::clone(rec))) {
            Ok(()) => {}
            Err(TrySendError::Full(cmd)) => {
                if options.resolve_target_queue_full(&self.name, rec, self.max_queue_size) {
                    return;
                }
                if self.tx.send(cmd).await.is_err() {
                    debug!(log_target = %self.name, "log target stopped; record discarded");
                }
            }
            Err(TrySendError::Closed(_)) => {
                debug!(log_target = %self.name, "log target stopped; record discarded");
            }
        }
    }
}

fn spawn_target<T: Target>(
    name: String,
    target: T,
    levels: Option<HashSet<Level>>,
    max_queue_size: usize,
    options: &Arc<LoggerOptions>,
) -> TargetHandle {
    let max_queue_size = max_queue_size.max(1);
    let (tx, rx) = mpsc::channel(max_queue_size);
    let task = tokio::spawn(run_target_loop(
        name.clone(),
        target,
        rx,
        Arc::clone(options),
    ));
    TargetHandle {
        name,
        levels,
        max_queue_size,
        tx,
        task,
    }
}

/// A bounded, queued, multi-target logger.
///
/// Records go through the main queue to a dispatcher task, which copies each
/// record into the queue of every target whose level set contains it. Each
/// target has its own delivery task, so a slow target only holds up the
/// dispatcher once its own queue is full.
///
/// Shutdown is idempotent: once a call has drained and closed every target,
/// later calls return `Ok(())`. A call made after an earlier one timed out
/// waits for the drain again instead of succeeding on the spot. After shutdown, submitted records are
/// discarded and `flush` / `configure_targets` fail with
/// [`LoggerError::Closed`]. Dropping the logger without calling shutdown still
/// drains and closes the targets in the background.
pub struct QueuedLogger {
    tx: mpsc::Sender<Command>,
    options: Arc<LoggerOptions>,
    closed: AtomicBool,
    /// Set once the dispatcher has closed every target.
    stopped: AtomicBool,
}

impl QueuedLogger {
    /// Start the dispatcher task. Must be called from within a tokio runtime.
    pub fn new(options: LoggerOptions) -> Self {
        let options = Arc::new(options);
        let (tx, rx) = mpsc::channel(options.max_queue_size);
        tokio::spawn(run_dispatcher(rx, Arc::clone(&options)));
        Self {
            tx,
            options,
            closed: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        }
    }

    pub fn max_queue_size(&self) -> usize {
        self.options.max_queue_size
    }

    pub fn is_shut_down(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Add a programmatically constructed target next to the configured ones.
    ///
    /// An empty `levels` accepts every level. The target is retired the next
    /// time [`configure_targets`](LogEngine::configure_targets) succeeds.
    pub async fn add_target<T: Target>(
        &self,
        name: impl Into<String>,
        target: T,
        levels: impl IntoIterator<Item = Level>,
        max_queue_size: usize,
    ) -> Result<(), LoggerError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(LoggerError::Config {
                target: name,
                reason: "target name must not be empty".into(),
            });
        }
        if self.is_shut_down() {
            return Err(LoggerError::Closed);
        }
        let levels: HashSet<Level> = levels.into_iter().collect();
        let levels = (!levels.is_empty()).then_some(levels);
        let handle = spawn_target(name, target, levels, max_queue_size, &self.options);
        self.install(vec![handle], false).await
    }

    async fn install(&self, targets: Vec<TargetHandle>, replace: bool) -> Result<(), LoggerError> {
        if self.is_shut_down() {
            return Err(LoggerError::Closed);
        }
        let (done, rx) = oneshot::channel();
        self.tx
            .send(Command::Install {
                targets,
                replace,
                done,
            })
            .await
            .map_err(|_| LoggerError::Closed)?;
        rx.await.map_err(|_| LoggerError::Closed)
    }

    /// Send a control command through the main queue and wait for the
    /// dispatcher's answer, bounded by `timeout`.
    async fn request(
        &self,
        op: &'static str,
        timeout: Duration,
        make: impl FnOnce(oneshot::Sender<Vec<TargetFailure>>) -> Command + Send,
    ) -> Result<Vec<TargetFailure>, LoggerError> {
        let (reply, rx) = oneshot::channel();
        let exchange = async {
            self.tx
                .send(make(reply))
                .await
                .map_err(|_| LoggerError::Closed)?;
            rx.await.map_err(|_| LoggerError::Closed)
        };
        tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| LoggerError::Timeout { op, after: timeout })?
    }
}

impl fmt::Debug for QueuedLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueuedLogger")
            .field("options", &self.options)
            .field("closed", &self.is_shut_down())
            .finish()
    }
}

impl LogEngine for QueuedLogger {
    async fn submit(&self, level: Level, msg: String, fields: Vec<Field>) {
        if self.is_shut_down() {
            debug!(%level, "logger shut down; record discarded");
            return;
        }

        let cmd = Command::Record(LogRec::new(level, msg, fields));
        match self.tx.try_send(cmd) {
            Ok(()) => {}
            Err(TrySendError::Full(cmd)) => {
                if let Command::Record(rec) = &cmd {
                    if self.options.resolve_queue_full(rec, self.options.max_queue_size) {
                        return;
                    }
                }
                if self.tx.send(cmd).await.is_err() {
                    debug!(%level, "log dispatcher stopped; record discarded");
                }
            }
            Err(TrySendError::Closed(_)) => {
                debug!(%level, "log dispatcher stopped; record discarded");
            }
        }
    }

    async fn configure_targets(&self, config: &LoggerConfiguration) -> Result<(), LoggerError> {
        if self.is_shut_down() {
            return Err(LoggerError::Closed);
        }
        config.validate()?;

        // Build everything before touching the running set so a failure
        // leaves the current targets in place.
        let mut built = Vec::with_capacity(config.len());
        for (name, target_config) in &config.targets {
            let levels = target_config.level_set(name)?;
            let target = BuiltinTarget::build(target_config)
                .await
                .map_err(|source| LoggerError::Target {
                    target: name.clone(),
                    source,
                })?;
            let max_queue_size = target_config
                .max_queue_size
                .unwrap_or(self.options.max_queue_size);
            built.push((name.clone(), levels, target, max_queue_size));
        }

        let handles = built
            .into_iter()
            .map(|(name, levels, target, max_queue_size)| {
                spawn_target(name, target, Some(levels), max_queue_size, &self.options)
            })
            .collect();
        self.install(handles, true).await?;

        debug!(targets = config.len(), "log targets configured");
        Ok(())
    }

    async fn flush(&self) -> Result<(), LoggerError> {
        if self.is_shut_down() {
            return Err(LoggerError::Closed);
        }
        let failures = self
            .request("flush", self.options.flush_timeout, Command::Flush)
            .await?;
        if failures.is_empty() {
            Ok(())
        } else {
            Err(LoggerError::Flush(failures))
        }
    }

    async fn shutdown(&self) -> Result<(), LoggerError> {
        let retry = self.closed.swap(true, Ordering::AcqRel);
        if retry && self.stopped.load(Ordering::Acquire) {
            return Ok(());
        }
        let failures = match self
            .request("shutdown", self.options.shutdown_timeout, Command::Shutdown)
            .await
        {
            Ok(failures) => failures,
            // The dispatcher only goes away after closing the targets for an
            // earlier call, which owns that call's failures.
            Err(LoggerError::Closed) if retry => Vec::new(),
            Err(err) => return Err(err),
        };
        self.stopped.store(true, Ordering::Release);
        debug!("logger shut down");
        if failures.is_empty() {
            Ok(())
        } else {
            Err(LoggerError::Shutdown(failures))
        }
    }
}

/// Main-queue consumer: fans records out and serves control commands in
/// submission order.
async fn run_dispatcher(mut rx: mpsc::Receiver<Command>, options: Arc<LoggerOptions>) {
    let mut targets: Vec<TargetHandle> = Vec::new();

    while let Some(cmd) = rx.recv().await {
        match cmd {
            Command::Record(rec) => {
                let rec = Arc::new(rec);
                for target in &targets {
                    target.deliver(&rec, &options).await;
                }
            }
            Command::Install {
                targets: added,
                replace,
                done,
            } => {
                if replace {
                    let retired = std::mem::replace(&mut targets, added);
                    report_failures(&options, close_targets(retired).await);
                } else {
                    targets.extend(added);
                }
                let _ = done.send(());
            }
            Command::Flush(reply) => {
                let _ = reply.send(flush_targets(&targets).await);
            }
            Command::Shutdown(reply) => {
                let _ = reply.send(close_targets(std::mem::take(&mut targets)).await);
                debug!("log dispatcher shutting down");
                return;
            }
        }
    }

    // Every logger handle was dropped without an explicit shutdown.
    report_failures(&options, close_targets(targets).await);
    debug!("log dispatcher shutting down");
}

fn report_failures(options: &LoggerOptions, failures: Vec<TargetFailure>) {
    for failure in failures {
        options.report_error(&LoggerError::Write {
            target: failure.target,
            source: failure.error,
        });
    }
}

async fn flush_targets(targets: &[TargetHandle]) -> Vec<TargetFailure> {
    // Queue a flush marker behind each target's pending records first, then
    // collect the answers.
    let mut pending = Vec::with_capacity(targets.len());
    for target in targets {
        let (tx, rx) = oneshot::channel();
        let rx = match target.tx.send(TargetCommand::Flush(tx)).await {
            Ok(()) => Some(rx),
            Err(_) => None,
        };
        pending.push((target.name.clone(), rx));
    }

    let mut failures = Vec::new();
    for (name, rx) in pending {
        let result = match rx {
            Some(rx) => rx.await.unwrap_or(Err(TargetError::Terminated)),
            None => Err(TargetError::Terminated),
        };
        if let Err(error) = result {
            failures.push(TargetFailure {
                target: name,
                error,
            });
        }
    }
    failures
}

/// Close every target queue and wait for the delivery tasks to finish their
/// final flush.
async fn close_targets(targets: Vec<TargetHandle>) -> Vec<TargetFailure> {
    // Dropping the senders lets all targets drain concurrently.
    let tasks: Vec<(String, JoinHandle<Result<(), TargetError>>)> =
        targets.into_iter().map(|t| (t.name, t.task)).collect();

    let mut failures = Vec::new();
    for (name, task) in tasks {
        let result = match task.await {
            Ok(result) => result,
            Err(err) => {
                error!(log_target = %name, %err, "log target task failed");
                Err(TargetError::Terminated)
            }
        };
        if let Err(error) = result {
            failures.push(TargetFailure {
                target: name,
                error,
            });
        }
    }
    failures
}

/// Delivery loop executed inside each target's task.
///
/// Writes records as they arrive and flushes after [`IDLE_FLUSH_INTERVAL`]
/// without new records. When the queue closes the target is shut down and
/// the result returned to whoever awaits the task.
async fn run_target_loop<T: Target>(
    name: String,
    mut target: T,
    mut rx: mpsc::Receiver<TargetCommand>,
    options: Arc<LoggerOptions>,
) -> Result<(), TargetError> {
    let mut dirty = false;

    loop {
        match tokio::time::timeout(IDLE_FLUSH_INTERVAL, rx.recv()).await {
            Ok(Some(TargetCommand::Write(rec))) => {
                if let Err(source) = target.write(&rec).await {
                    options.report_error(&LoggerError::Write {
                        target: name.clone(),
                        source,
                    });
                } else {
                    dirty = true;
                }
            }
            Ok(Some(TargetCommand::Flush(reply))) => {
                let result = target.flush().await;
                if result.is_ok() {
                    dirty = false;
                }
                let _ = reply.send(result);
            }
            Ok(None) => {
                debug!(log_target = %name, "log target shutting down");
                return target.shutdown().await;
            }
            Err(_) => {
                if dirty {
                    match target.flush().await {
                        Ok(()) => dirty = false,
                        Err(source) => options.report_error(&LoggerError::Write {
                            target: name.clone(),
                            source,
                        }),
                    }
                }
            }
        }
    }
}
