use audit_log::{Level, LoggerConfiguration};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,
    #[serde(default = "default_level")]
    pub default_level: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Wait for queue space instead of dropping records.
    #[serde(default)]
    pub block_when_full: bool,
    /// Inline target configuration.
    #[serde(default)]
    pub targets: Option<LoggerConfiguration>,
    /// Target configuration file; takes precedence over `targets`.
    #[serde(default)]
    pub targets_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_queue_size: default_max_queue_size(),
            default_level: default_level(),
            log_level: default_log_level(),
            block_when_full: false,
            targets: None,
            targets_file: None,
        }
    }
}

impl Config {
    /// Target configuration to apply at startup.
    ///
    /// Without any target settings, records go to stdout as JSON lines.
    pub fn target_config(&self) -> anyhow::Result<LoggerConfiguration> {
        if let Some(path) = &self.targets_file {
            return Ok(LoggerConfiguration::load(path)?);
        }
        if let Some(targets) = &self.targets {
            targets.validate()?;
            return Ok(targets.clone());
        }
        Ok(LoggerConfiguration::from_yaml_str(DEFAULT_TARGETS)?)
    }

    pub fn default_level(&self) -> anyhow::Result<Level> {
        Level::from_name(&self.default_level)
            .ok_or_else(|| anyhow::anyhow!("unknown default level '{}'", self.default_level))
    }
}

const DEFAULT_TARGETS: &str = r#"
stdout:
  type: console
  levels: [audit-api, audit-content, audit-perms, audit-cli]
  options:
    out: stdout
"#;

// ---------------------------------------------------------------------------
// Default-value functions used by serde
// ---------------------------------------------------------------------------

fn default_max_queue_size() -> usize {
    1000
}

fn default_level() -> String {
    "audit-api".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

/// Load configuration from a YAML file.
///
/// If the file does not exist a default configuration is returned and a
/// warning is emitted.
pub fn load(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() {
        warn!(
            path = %path.display(),
            "configuration file not found; using defaults"
        );
        return Ok(Config::default());
    }

    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

    let config: Config = serde_yml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("failed to parse config file {}: {e}", path.display()))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use audit_log::LoggerError;

    #[test]
    fn missing_file_yields_defaults() {
        let config = load(Path::new("/does/not/exist.yaml")).unwrap();
        assert_eq!(config.max_queue_size, 1000);
        assert_eq!(config.default_level().unwrap(), Level::AUDIT_API);
        assert!(!config.block_when_full);

        let targets = config.target_config().unwrap();
        assert_eq!(targets.len(), 1);
        assert!(targets.targets.contains_key("stdout"));
    }

    #[test]
    fn inline_targets_are_validated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.yaml");
        std::fs::write(
            &path,
            r#"
max_queue_size: 50
default_level: audit-perms
block_when_full: true
targets:
  errors:
    type: console
    levels: [bogus]
"#,
        )
        .unwrap();

        let config = load(&path).unwrap();
        assert_eq!(config.max_queue_size, 50);
        assert_eq!(config.default_level().unwrap(), Level::AUDIT_PERMS);
        assert!(config.block_when_full);

        let err = config.target_config().unwrap_err();
        assert!(
            matches!(err.downcast_ref::<LoggerError>(), Some(LoggerError::Config { .. })),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn targets_file_takes_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let targets_path = dir.path().join("targets.yaml");
        std::fs::write(
            &targets_path,
            "stderr:\n  type: console\n  levels: [error]\n  options:\n    out: stderr\n",
        )
        .unwrap();

        let config = Config {
            targets_file: Some(targets_path),
            targets: Some(LoggerConfiguration::default()),
            ..Config::default()
        };
        let targets = config.target_config().unwrap();
        assert!(targets.targets.contains_key("stderr"));
    }

    #[test]
    fn unknown_default_level_is_an_error() {
        let config = Config {
            default_level: "loud".into(),
            ..Config::default()
        };
        let err = config.default_level().unwrap_err();
        assert!(err.to_string().contains("'loud'"), "unexpected error: {err}");
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.yaml");
        std::fs::write(&path, "max_queue_size: [not, a, number]\n").unwrap();
        let err = load(&path).unwrap_err();
        assert!(
            err.to_string().contains("failed to parse config file"),
            "unexpected error: {err}"
        );
    }
}
