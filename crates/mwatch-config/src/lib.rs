//! mwatch configuration
//!
//! A TOML file with an optional `[log]` and `[extract]` section and one
//! `[[slot]]` table per supervised command. Scalar settings can be
//! overridden from `MWATCH_*` environment variables.

pub mod error;
pub mod manager;
pub mod types;

pub use error::{ConfigError, Result};
pub use manager::{ConfigManager, ENV_PREFIX};
pub use types::{ExtractConfig, LogConfig, MwatchConfig, SlotConfig, LOG_LEVELS};
