//! Managed child process wrapper

use std::process::ExitStatus;

use tokio::process::{Child, ChildStderr, ChildStdout};
use tokio::sync::watch;
use tracing::debug;

use crate::{
    config::ProcessConfig,
    error::{ProcessError, Result},
    handle::ProcessHandle,
};

/// Wrapper around tokio::process::Child that owns reaping
///
/// Exactly one task owns a `ManagedChild`; every exit it observes is
/// published to the [`ProcessHandle`]s handed out by [`ManagedChild::handle`].
pub struct ManagedChild {
    /// Underlying tokio child process
    child: Child,
    /// Process configuration
    config: ProcessConfig,
    /// Process ID (also the process group ID)
    pid: u32,
    /// Exit publication
    exit_tx: watch::Sender<Option<ExitStatus>>,
}

impl ManagedChild {
    /// Create new managed child
    pub(crate) fn new(child: Child, config: ProcessConfig, pid: u32) -> Self {
        let (exit_tx, _) = watch::channel(None);
        Self {
            child,
            config,
            pid,
            exit_tx,
        }
    }

    /// Get process ID
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Shareable handle for signalling and exit waiting
    pub fn handle(&self) -> ProcessHandle {
        ProcessHandle::new(self.pid, self.exit_tx.subscribe())
    }

    /// Non-blocking exit poll
    pub fn try_wait(&mut self) -> Result<Option<ExitStatus>> {
        if let Some(status) = *self.exit_tx.borrow() {
            return Ok(Some(status));
        }

        match self.child.try_wait() {
            Ok(Some(status)) => {
                self.publish(status);
                Ok(Some(status))
            }
            Ok(None) => Ok(None),
            Err(source) => Err(ProcessError::WaitFailed {
                pid: self.pid,
                source,
            }),
        }
    }

    /// Wait for process to exit
    pub async fn wait(&mut self) -> Result<ExitStatus> {
        if let Some(status) = *self.exit_tx.borrow() {
            return Ok(status);
        }

        let status = self
            .child
            .wait()
            .await
            .map_err(|source| ProcessError::WaitFailed {
                pid: self.pid,
                source,
            })?;
        self.publish(status);
        Ok(status)
    }

    fn publish(&self, status: ExitStatus) {
        debug!(pid = self.pid, code = ?status.code(), "Process exited");
        self.exit_tx.send_replace(Some(status));
    }

    /// Take stdout handle
    pub fn stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    /// Take stderr handle
    pub fn stderr(&mut self) -> Option<ChildStderr> {
        self.child.stderr.take()
    }
}

impl std::fmt::Debug for ManagedChild {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedChild")
            .field("pid", &self.pid)
            .field("command", &self.config.command)
            .finish()
    }
}
