//! Configuration types

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use mwatch_supervisor::{SlotSpec, WatchSpec};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Accepted values for `log.level`
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Whole mwatch configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MwatchConfig {
    /// Diagnostic logging
    #[serde(default)]
    pub log: LogConfig,
    /// Extract launcher
    #[serde(default)]
    pub extract: ExtractConfig,
    /// Supervised commands, in display order
    #[serde(default, rename = "slot")]
    pub slots: Vec<SlotConfig>,
}

/// `[log]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log file; the binary picks a cache location when unset
    #[serde(default)]
    pub file: Option<PathBuf>,
}

/// `[extract]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Terminal argv prefix; the slot's argv is appended
    #[serde(default = "default_terminal")]
    pub terminal: Vec<String>,
}

/// One `[[slot]]` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotConfig {
    /// Command line, split with shell-word rules
    pub run: String,
    #[serde(default)]
    pub workdir: Option<PathBuf>,
    /// Restart delay in seconds
    #[serde(default)]
    pub wait: Option<f64>,
    /// Directory whose content changes restart the slot
    #[serde(default)]
    pub watcher: Option<PathBuf>,
    /// File-name globs for the watcher
    #[serde(default)]
    pub watch: Option<Vec<String>>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_terminal() -> Vec<String> {
    vec!["x-terminal-emulator".to_string(), "-e".to_string()]
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            terminal: default_terminal(),
        }
    }
}

impl MwatchConfig {
    /// Check everything that can be checked without touching the filesystem
    pub fn validate(&self) -> Result<()> {
        if self.slots.is_empty() {
            return Err(ConfigError::Validation(
                "At least one [[slot]] is required".to_string(),
            ));
        }
        if !LOG_LEVELS.contains(&self.log.level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::Validation(format!(
                "Unknown log level '{}' (expected one of {})",
                self.log.level,
                LOG_LEVELS.join(", ")
            )));
        }
        if self.extract.terminal.is_empty() {
            return Err(ConfigError::Validation(
                "extract.terminal must not be empty".to_string(),
            ));
        }
        for (index, slot) in self.slots.iter().enumerate() {
            slot.validate()
                .map_err(|e| ConfigError::Validation(format!("slot {}: {}", index + 1, detail(e))))?;
        }
        Ok(())
    }

    /// Supervisor definitions for every slot
    pub fn slot_specs(&self) -> Result<Vec<SlotSpec>> {
        self.slots.iter().map(SlotConfig::to_spec).collect()
    }
}

impl SlotConfig {
    /// Minimal slot running `run`
    pub fn new(run: impl Into<String>) -> Self {
        Self {
            run: run.into(),
            workdir: None,
            wait: None,
            watcher: None,
            watch: None,
            name: None,
            env: BTreeMap::new(),
        }
    }

    /// The command as an argument vector
    pub fn argv(&self) -> Result<Vec<String>> {
        let argv = shlex::split(&self.run).ok_or_else(|| {
            ConfigError::Validation(format!("Cannot split run command '{}'", self.run))
        })?;
        if argv.is_empty() {
            return Err(ConfigError::Validation("run command is empty".to_string()));
        }
        Ok(argv)
    }

    /// Restart delay as a duration
    pub fn restart_wait(&self) -> Result<Option<Duration>> {
        self.wait
            .map(|secs| {
                Duration::try_from_secs_f64(secs).map_err(|_| {
                    ConfigError::Validation(format!(
                        "wait must be a non-negative number of seconds, got {}",
                        secs
                    ))
                })
            })
            .transpose()
    }

    pub fn validate(&self) -> Result<()> {
        self.argv()?;
        self.restart_wait()?;
        if matches!(&self.watch, Some(patterns) if patterns.is_empty()) {
            return Err(ConfigError::Validation(
                "watch must list at least one pattern".to_string(),
            ));
        }
        Ok(())
    }

    /// Convert to the supervisor's slot definition
    pub fn to_spec(&self) -> Result<SlotSpec> {
        let mut spec = SlotSpec::new(self.argv()?).name(self.display_name());
        if let Some(dir) = &self.workdir {
            spec = spec.working_dir(dir);
        }
        if let Some(wait) = self.restart_wait()? {
            spec = spec.restart_wait(wait);
        }
        for (key, value) in &self.env {
            spec = spec.env(key, value);
        }
        if let Some(root) = &self.watcher {
            let mut watch = WatchSpec::new(root);
            if let Some(patterns) = &self.watch {
                watch = watch.patterns(patterns);
            }
            spec = spec.watch(watch);
        }
        Ok(spec)
    }

    /// Configured name, else the command line as written
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.run.trim().to_string())
    }
}

fn detail(error: ConfigError) -> String {
    match error {
        ConfigError::Validation(message) | ConfigError::Parse(message) => message,
        other => other.to_string(),
    }
}
