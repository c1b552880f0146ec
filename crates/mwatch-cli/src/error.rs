use mwatch_config::ConfigError;
use thiserror::Error;

/// Errors that end an mwatch session
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("Terminal error: {0}")]
    Terminal(#[from] std::io::Error),
}

impl CliError {
    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            CliError::Config(ConfigError::NotFound(path)) => {
                format!(
                    "Config file not found: {}\n\nPass the path of a TOML file with at least one [[slot]] table.",
                    path
                )
            }
            CliError::Config(e) => {
                format!("{}\n\nRun 'mwatch --help' for usage information.", e)
            }
            CliError::Logging(msg) => {
                format!("Could not set up logging: {}\n\nTry --log-file with a writable path.", msg)
            }
            CliError::Terminal(e) => {
                format!("Terminal error: {}\n\nmwatch needs an interactive terminal.", e)
            }
        }
    }
}

pub type CliResult<T> = Result<T, CliError>;
