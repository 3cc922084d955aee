//! Declarative target configuration.
//!
//! A [`LoggerConfiguration`] maps target names to [`TargetConfig`] entries and
//! is usually loaded from YAML or JSON:
//!
//! ```yaml
//! audit-file:
//!   type: file
//!   format: json
//!   levels: [audit-api, audit-perms]
//!   max_queue_size: 1000
//!   options:
//!     filename: /var/log/audit/audit.jsonl
//! errors:
//!   type: console
//!   levels: [error]
//!   options:
//!     out: stderr
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::LoggerError;
use crate::format::Format;
use crate::level::Level;

/// Target name to target settings. Applying a configuration replaces every
/// previously configured target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoggerConfiguration {
    pub targets: BTreeMap<String, TargetConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    #[serde(rename = "type")]
    pub kind: TargetKind,
    #[serde(default)]
    pub format: Format,
    /// Names of the levels this target accepts.
    pub levels: Vec<String>,
    /// Capacity of the target's own queue; defaults to the logger's.
    #[serde(default)]
    pub max_queue_size: Option<usize>,
    #[serde(default)]
    pub options: TargetOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Console,
    File,
}

/// Type-specific settings. Which ones apply depends on [`TargetKind`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetOptions {
    /// `file`: path of the log file, opened in append mode.
    #[serde(default)]
    pub filename: Option<PathBuf>,
    /// `console`: `stdout` (default) or `stderr`.
    #[serde(default)]
    pub out: Option<String>,
}

impl LoggerConfiguration {
    /// Load and validate a configuration file. YAML is a superset of JSON,
    /// so either syntax is accepted.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoggerError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| LoggerError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Parse and validate a configuration from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, LoggerError> {
        let config: Self =
            serde_yml::from_str(yaml).map_err(|e| LoggerError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a configuration from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, LoggerError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| LoggerError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Check every target; the first problem found is returned.
    pub fn validate(&self) -> Result<(), LoggerError> {
        for (name, target) in &self.targets {
            if name.trim().is_empty() {
                return Err(LoggerError::Config {
                    target: name.clone(),
                    reason: "target name must not be empty".into(),
                });
            }
            target.validate(name)?;
        }
        Ok(())
    }
}

impl TargetConfig {
    fn validate(&self, name: &str) -> Result<(), LoggerError> {
        let invalid = |reason: String| LoggerError::Config {
            target: name.to_string(),
            reason,
        };

        self.level_set(name)?;

        if self.max_queue_size == Some(0) {
            return Err(invalid("max_queue_size must be greater than zero".into()));
        }

        match self.kind {
            TargetKind::File => {
                let filename = self.options.filename.as_ref();
                if filename.map_or(true, |p| p.as_os_str().is_empty()) {
                    return Err(invalid("file target requires options.filename".into()));
                }
                if self.options.out.is_some() {
                    return Err(invalid("options.out only applies to console targets".into()));
                }
            }
            TargetKind::Console => {
                if let Some(out) = self.options.out.as_deref() {
                    if out != "stdout" && out != "stderr" {
                        return Err(invalid(format!(
                            "options.out must be 'stdout' or 'stderr', got '{out}'"
                        )));
                    }
                }
                if self.options.filename.is_some() {
                    return Err(invalid("options.filename only applies to file targets".into()));
                }
            }
        }

        Ok(())
    }

    /// Resolve `levels` into the set of [`Level`]s this target accepts.
    pub fn level_set(&self, name: &str) -> Result<HashSet<Level>, LoggerError> {
        if self.levels.is_empty() {
            return Err(LoggerError::Config {
                target: name.to_string(),
                reason: "levels must list at least one level".into(),
            });
        }
        self.levels
            .iter()
            .map(|lvl| {
                Level::from_name(lvl).ok_or_else(|| LoggerError::Config {
                    target: name.to_string(),
                    reason: format!("unknown level '{lvl}'"),
                })
            })
            .collect()
    }
}
