//! Configuration manager implementation

use std::path::{Path, PathBuf};

use config::{Config, Environment};
use serde::Deserialize;
use tracing::debug;

use crate::{
    error::{ConfigError, Result},
    types::MwatchConfig,
};

/// Prefix of environment overrides (`MWATCH_LOG__LEVEL=debug`)
pub const ENV_PREFIX: &str = "MWATCH";

/// Loads the configuration file and applies environment overrides
#[derive(Debug, Clone)]
pub struct ConfigManager {
    /// Configuration file path
    config_path: PathBuf,
    /// Environment prefix
    env_prefix: String,
}

/// Scalars that may be overridden from the environment
#[derive(Debug, Default, Deserialize)]
struct EnvOverrides {
    #[serde(default)]
    log: LogOverrides,
}

#[derive(Debug, Default, Deserialize)]
struct LogOverrides {
    level: Option<String>,
    file: Option<PathBuf>,
}

impl ConfigManager {
    /// Manager for the file at `path`
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            env_prefix: ENV_PREFIX.to_string(),
        }
    }

    /// Use a different environment prefix
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Read, parse and validate the configuration
    pub fn load(&self) -> Result<MwatchConfig> {
        if !self.config_path.is_file() {
            return Err(ConfigError::NotFound(
                self.config_path.display().to_string(),
            ));
        }

        let text = std::fs::read_to_string(&self.config_path)?;
        let mut config: MwatchConfig = toml::from_str(&text)?;
        self.apply_env(&mut config)?;
        config.validate()?;

        debug!(
            path = %self.config_path.display(),
            slots = config.slots.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    // Slot tables keep their key case, so only the scalar sections go
    // through the layered source.
    fn apply_env(&self, config: &mut MwatchConfig) -> Result<()> {
        let overrides: EnvOverrides = Config::builder()
            .add_source(
                Environment::with_prefix(&self.env_prefix)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        if let Some(level) = overrides.log.level {
            debug!(level = %level, "Log level overridden from environment");
            config.log.level = level;
        }
        if let Some(file) = overrides.log.file {
            config.log.file = Some(file);
        }
        Ok(())
    }
}
