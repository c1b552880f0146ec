//! Slot definitions, fixed at creation time

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use mwatch_process::ProcessConfig;

use crate::error::{Result, SupervisorError};
use crate::watcher::DEFAULT_WATCH_PATTERN;

/// Environment every slot child receives on top of the parent's
pub const BASE_ENV: &[(&str, &str)] = &[("PYTHONUNBUFFERED", "1")];

/// What a slot's file watcher looks at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchSpec {
    /// Root of the watched tree
    pub root: PathBuf,
    /// File-name globs that take part in the digest
    pub patterns: Vec<String>,
}

impl WatchSpec {
    /// Watch `root` with the default pattern
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            patterns: vec![DEFAULT_WATCH_PATTERN.to_string()],
        }
    }

    /// Replace the name patterns
    pub fn patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.patterns = patterns.into_iter().map(Into::into).collect();
        self
    }
}

/// Immutable definition of one supervised service
#[derive(Debug, Clone, PartialEq)]
pub struct SlotSpec {
    /// Display name
    pub name: String,
    /// Argument vector, program first
    pub command: Vec<String>,
    /// Working directory for the child
    pub working_dir: Option<PathBuf>,
    /// Environment overrides, including [`BASE_ENV`]
    pub env: BTreeMap<String, String>,
    /// Delay before relaunching after an exit
    pub restart_wait: Option<Duration>,
    /// Optional file watcher that triggers restarts
    pub watch: Option<WatchSpec>,
}

impl SlotSpec {
    /// New slot running `command`; the name defaults to the joined command
    pub fn new<I, S>(command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let command: Vec<String> = command.into_iter().map(Into::into).collect();
        let env = BASE_ENV
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            name: command.join(" "),
            command,
            working_dir: None,
            env,
            restart_wait: None,
            watch: None,
        }
    }

    /// Set the display name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the working directory
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Add an environment override
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set the relaunch delay
    pub fn restart_wait(mut self, wait: Duration) -> Self {
        self.restart_wait = Some(wait);
        self
    }

    /// Attach a file watcher
    pub fn watch(mut self, watch: WatchSpec) -> Self {
        self.watch = Some(watch);
        self
    }

    /// Command line as shown to the user
    pub fn command_line(&self) -> String {
        self.command.join(" ")
    }

    /// Spawn configuration for the slot's child
    pub fn process_config(&self) -> Result<ProcessConfig> {
        let mut config = ProcessConfig::from_argv(self.command.iter().cloned())
            .map_err(|e| SupervisorError::InvalidSpec(format!("slot '{}': {}", self.name, e)))?
            .envs(self.env.clone());
        if let Some(dir) = &self.working_dir {
            config = config.working_dir(dir);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_slot_defaults() {
        let spec = SlotSpec::new(["python", "app.py"]);
        assert_eq!(spec.name, "python app.py");
        assert_eq!(spec.env.get("PYTHONUNBUFFERED").map(String::as_str), Some("1"));
        assert!(spec.restart_wait.is_none());
        assert!(spec.watch.is_none());
    }

    #[test]
    fn test_process_config_carries_overrides() {
        let spec = SlotSpec::new(["sleep", "1"])
            .working_dir("/tmp")
            .env("MODE", "dev");
        let config = spec.process_config().unwrap();
        assert_eq!(config.command, "sleep");
        assert_eq!(config.args, vec!["1"]);
        assert_eq!(config.working_dir, Some(PathBuf::from("/tmp")));
        assert_eq!(config.env.get("MODE").map(String::as_str), Some("dev"));
        assert!(config.env.contains_key("PYTHONUNBUFFERED"));
    }

    #[test]
    fn test_empty_command_is_invalid() {
        let spec = SlotSpec::new(Vec::<String>::new());
        assert!(matches!(
            spec.process_config(),
            Err(SupervisorError::InvalidSpec(_))
        ));
    }

    #[test]
    fn test_watch_spec_default_pattern() {
        let watch = WatchSpec::new("src");
        assert_eq!(watch.patterns, vec![DEFAULT_WATCH_PATTERN.to_string()]);
        let watch = watch.patterns(["*.rs"]);
        assert_eq!(watch.patterns, vec!["*.rs".to_string()]);
    }
}
