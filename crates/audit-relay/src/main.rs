mod cli;
mod config;
mod relay;

use std::sync::Arc;

use anyhow::{Context, Result};
use audit_log::{Audit, AuditPolicy, CallbackPolicy, DefaultPolicy};
use clap::Parser;
use tokio::io::BufReader;
use tracing::{info, warn};
use tracing_subscriber::fmt::MakeWriter;

use crate::cli::Cli;
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Parse CLI args.
    let cli = Cli::parse();

    // 2. Load config, then merge CLI overrides.
    let cfg = load_config(&cli, std::io::stderr)?;

    // 3. Init tracing-subscriber with JSON format. Diagnostics go to stderr so
    //    they never interleave with a stdout audit target.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.log_level));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let default_level = cfg.default_level()?;
    let targets = cfg
        .target_config()
        .context("failed to load audit target configuration")?;

    info!(
        config_file = %cli.config.display(),
        max_queue_size = cfg.max_queue_size,
        targets = targets.len(),
        block_when_full = cfg.block_when_full,
        "audit-relay starting"
    );

    // 4. Start the audit facade.
    let policy: Arc<dyn AuditPolicy> = if cfg.block_when_full {
        Arc::new(CallbackPolicy::new().on_queue_full(|queue, max| {
            warn!(queue, queue_size = max, "audit queue full; waiting for space");
            false
        }))
    } else {
        Arc::new(DefaultPolicy)
    };
    let audit = Audit::init(cfg.max_queue_size, policy);
    audit
        .configure(&targets)
        .await
        .context("failed to configure audit targets")?;

    // 5. Relay stdin until EOF or a shutdown signal.
    let input = BufReader::new(tokio::io::stdin());
    let outcome = tokio::select! {
        r = relay::relay(&audit, default_level, input) => Some(r),
        _ = shutdown_signal() => None,
    };

    // 6. Drain and close every target, whatever stopped the relay.
    let flushed = audit.flush().await;
    let shutdown = audit.shutdown().await;

    match &outcome {
        Some(Ok(stats)) => info!(
            relayed = stats.relayed,
            skipped = stats.skipped,
            "audit-relay finished"
        ),
        Some(Err(_)) => warn!("audit-relay stopped on input error"),
        None => info!("audit-relay interrupted"),
    }

    flushed.context("failed to flush audit targets")?;
    shutdown.context("failed to shut down audit logging")?;
    if let Some(result) = outcome {
        result?;
    }

    Ok(())
}

/// Load the config file and apply CLI overrides.
///
/// Runs before the real subscriber is installed, so diagnostics emitted while
/// loading go to a provisional JSON subscriber writing to `writer`.
fn load_config<W>(cli: &Cli, writer: W) -> Result<Config>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let provisional = tracing_subscriber::fmt()
        .json()
        .with_writer(writer)
        .finish();
    let mut cfg = tracing::subscriber::with_default(provisional, || config::load(&cli.config))?;

    if let Some(ref targets) = cli.targets {
        cfg.targets_file = Some(targets.clone());
    }
    if let Some(ref level) = cli.level {
        cfg.default_level = level.clone();
    }
    if let Some(size) = cli.max_queue_size {
        cfg.max_queue_size = size;
    }

    Ok(cfg)
}

/// Resolves on ctrl-c, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(%err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(%err, "failed to register SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT (ctrl-c)"),
        _ = terminate => info!("received SIGTERM"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn missing_config_is_reported_before_tracing_init() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.yaml");
        let cli = Cli::parse_from([
            "audit-relay",
            "--config",
            missing.to_str().unwrap(),
            "--level",
            "audit-cli",
            "--max-queue-size",
            "42",
        ]);

        let captured = Captured::default();
        let sink = captured.clone();
        let cfg = load_config(&cli, move || sink.clone()).unwrap();

        assert_eq!(cfg.default_level, "audit-cli");
        assert_eq!(cfg.max_queue_size, 42);

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(
            output.contains("configuration file not found; using defaults"),
            "unexpected output: {output}"
        );
        assert!(output.contains("WARN"), "unexpected output: {output}");
    }
}
