//! Shareable handle to a spawned process group
//!
//! A [`ProcessHandle`] is the part of a child that other tasks may hold: it
//! can signal the whole process group and await the exit observed by the
//! owning [`crate::ManagedChild`]. It never reaps the child itself.

use std::process::ExitStatus;
use std::time::Duration;

use tokio::sync::watch;
use tracing::debug;

use crate::error::{ProcessError, Result};

/// Signals delivered to a whole process group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupSignal {
    /// Polite request to exit (SIGTERM)
    Terminate,
    /// Unconditional kill (SIGKILL)
    Kill,
}

impl GroupSignal {
    /// Conventional signal name
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupSignal::Terminate => "SIGTERM",
            GroupSignal::Kill => "SIGKILL",
        }
    }

    #[cfg(unix)]
    fn as_nix(self) -> nix::sys::signal::Signal {
        match self {
            GroupSignal::Terminate => nix::sys::signal::Signal::SIGTERM,
            GroupSignal::Kill => nix::sys::signal::Signal::SIGKILL,
        }
    }
}

/// Cloneable view of a live child: ids, signal delivery, exit waiting
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    pid: u32,
    pgid: i32,
    exit: watch::Receiver<Option<ExitStatus>>,
}

impl ProcessHandle {
    pub(crate) fn new(pid: u32, exit: watch::Receiver<Option<ExitStatus>>) -> Self {
        // Children are spawned with process_group(0), so the group id is the pid.
        Self {
            pid,
            pgid: pid as i32,
            exit,
        }
    }

    /// Process ID
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Process group ID
    pub fn pgid(&self) -> i32 {
        self.pgid
    }

    /// Exit status, once the owner has observed it
    pub fn exit_status(&self) -> Option<ExitStatus> {
        *self.exit.borrow()
    }

    /// Exit code, once known (None when killed by a signal)
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_status().and_then(|status| status.code())
    }

    /// Whether the owner has observed the exit
    pub fn has_exited(&self) -> bool {
        self.exit_status().is_some()
    }

    /// Send a signal to the whole process group
    #[cfg(unix)]
    pub fn signal(&self, signal: GroupSignal) -> Result<()> {
        use nix::errno::Errno;
        use nix::sys::signal::killpg;
        use nix::unistd::Pid;

        match killpg(Pid::from_raw(self.pgid), signal.as_nix()) {
            Ok(()) => {
                debug!(pgid = self.pgid, signal = signal.as_str(), "Signal sent to process group");
                Ok(())
            }
            Err(Errno::ESRCH) => Err(ProcessError::ProcessGone { pgid: self.pgid }),
            Err(e) => Err(ProcessError::SignalFailed {
                pgid: self.pgid,
                signal: signal.as_str(),
                reason: e.to_string(),
            }),
        }
    }

    /// Send a signal to the whole process group
    #[cfg(not(unix))]
    pub fn signal(&self, _signal: GroupSignal) -> Result<()> {
        Err(ProcessError::Unsupported)
    }

    /// SIGTERM the process group
    pub fn terminate(&self) -> Result<()> {
        self.signal(GroupSignal::Terminate)
    }

    /// SIGKILL the process group
    pub fn kill(&self) -> Result<()> {
        self.signal(GroupSignal::Kill)
    }

    /// Wait until the owner observes the exit
    ///
    /// Returns `None` only if the owning child was dropped before an exit
    /// was observed; the process is no longer supervised either way.
    pub async fn wait_exit(&self) -> Option<ExitStatus> {
        let mut exit = self.exit.clone();
        let observed = exit.wait_for(Option::is_some).await.map(|status| *status);
        match observed {
            Ok(status) => status,
            Err(_) => *exit.borrow(),
        }
    }

    /// Wait for the exit, giving up after `timeout`
    ///
    /// Returns true when the process is gone before the deadline.
    pub async fn exited_within(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.wait_exit()).await.is_ok()
    }
}
