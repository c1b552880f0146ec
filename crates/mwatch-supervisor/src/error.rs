//! Error types for slot supervision

use mwatch_process::ProcessError;
use thiserror::Error;

/// Supervisor internal failures
///
/// A child exiting, with any code, is never one of these.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// Spawning, polling or signalling the child failed
    #[error(transparent)]
    Process(#[from] ProcessError),

    /// A watcher name pattern does not compile
    #[error("Invalid watch pattern '{pattern}'")]
    WatchPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    /// A blocking helper task panicked or was cancelled
    #[error("Background task failed")]
    Task(#[from] tokio::task::JoinError),

    /// Terminate/kill escalation could not complete
    #[error("Escalation failed for slot '{slot}'")]
    Escalation {
        slot: String,
        #[source]
        source: ProcessError,
    },

    /// Slot definition is unusable
    #[error("Invalid slot definition: {0}")]
    InvalidSpec(String),
}

impl SupervisorError {
    /// Message plus its cause chain, one entry per line
    pub fn trace(&self) -> Vec<String> {
        let mut lines = vec![self.to_string()];
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            lines.push(format!("caused by: {}", cause));
            source = cause.source();
        }
        lines
    }
}

/// Result type for supervisor operations
pub type Result<T> = std::result::Result<T, SupervisorError>;
