//! Error types for process handling

use std::io;
use thiserror::Error;

/// Process handling errors
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Failed to spawn process
    #[error("Failed to spawn '{command}'")]
    SpawnFailed {
        command: String,
        #[source]
        source: io::Error,
    },

    /// Failed to poll or wait on a child
    #[error("Failed to wait on process {pid}")]
    WaitFailed {
        pid: u32,
        #[source]
        source: io::Error,
    },

    /// The process group no longer exists
    #[error("Process group {pgid} is gone")]
    ProcessGone { pgid: i32 },

    /// Signal delivery failed for a reason other than the group being gone
    #[error("Failed to send {signal} to process group {pgid}: {reason}")]
    SignalFailed {
        pgid: i32,
        signal: &'static str,
        reason: String,
    },

    /// Invalid configuration
    #[error("Invalid process configuration: {0}")]
    InvalidConfig(String),

    /// Signal delivery is not available on this platform
    #[error("Process group signals are not supported on this platform")]
    Unsupported,
}

impl ProcessError {
    /// Whether the error only says the target already went away
    pub fn is_gone(&self) -> bool {
        matches!(self, ProcessError::ProcessGone { .. })
    }
}

/// Result type for process operations
pub type Result<T> = std::result::Result<T, ProcessError>;
