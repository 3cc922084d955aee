use anyhow::{Context, Result};
use audit_log::{Audit, Level, LogEngine, Record};
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

/// One input line: a [`Record`] in its kebab-case JSON form plus an optional
/// `level`.
#[derive(Debug, Deserialize)]
struct InputLine {
    #[serde(default)]
    level: Option<String>,
    #[serde(flatten)]
    record: Record,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RelayStats {
    pub relayed: usize,
    pub skipped: usize,
}

/// Parse a single JSON line into the level and record to log.
pub fn parse_line(line: &str, default_level: Level) -> Result<(Level, Record)> {
    let input: InputLine = serde_json::from_str(line).context("invalid audit record JSON")?;
    let level = match input.level.as_deref() {
        Some(name) => {
            Level::from_name(name).ok_or_else(|| anyhow::anyhow!("unknown level '{name}'"))?
        }
        None => default_level,
    };
    Ok((level, input.record))
}

/// Read records line by line until EOF and log each one through `audit`.
///
/// Blank lines are ignored; malformed lines are skipped with a warning.
pub async fn relay<R, E>(audit: &Audit<E>, default_level: Level, reader: R) -> Result<RelayStats>
where
    R: AsyncBufRead + Unpin,
    E: LogEngine,
{
    let mut lines = reader.lines();
    let mut stats = RelayStats::default();
    let mut line_no = 0usize;

    while let Some(raw) = lines
        .next_line()
        .await
        .context("failed to read audit input")?
    {
        line_no += 1;
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        match parse_line(raw, default_level) {
            Ok((level, rec)) => {
                audit.log_record(level, &rec).await;
                stats.relayed += 1;
            }
            Err(err) => {
                warn!(line = line_no, err = %format!("{err:#}"), "skipping malformed audit record");
                stats.skipped += 1;
            }
        }
    }

    debug!(relayed = stats.relayed, skipped = stats.skipped, "audit input exhausted");
    Ok(stats)
}
