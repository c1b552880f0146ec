//! UI-visible slot status

use std::fmt;

/// Where a slot is in its run cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SlotStatus {
    /// No live process
    #[default]
    Stopped,
    /// Process spawned and being read
    Running,
    /// SIGTERM sent, inside the grace window
    Terminating,
    /// SIGKILL sent, waiting for the exit
    Killing,
    /// Supervision halted by an internal error; terminal
    Failed,
}

impl SlotStatus {
    /// Short tag shown in the panel title
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotStatus::Stopped => "STOP",
            SlotStatus::Running => "RUN",
            SlotStatus::Terminating => "TERM",
            SlotStatus::Killing => "KILL",
            SlotStatus::Failed => "FAIL",
        }
    }

    /// Whether a terminate or kill is in flight
    pub fn is_stopping(&self) -> bool {
        matches!(self, SlotStatus::Terminating | SlotStatus::Killing)
    }
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
