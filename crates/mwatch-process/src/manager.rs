//! Process manager - spawning into dedicated process groups

use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

use crate::{
    child::ManagedChild,
    config::ProcessConfig,
    error::{ProcessError, Result},
};

/// Spawns processes, each as the leader of a new process group
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessManager;

impl ProcessManager {
    /// Create new process manager
    pub fn new() -> Self {
        Self
    }

    /// Spawn a managed process with piped stdio
    ///
    /// The child inherits the parent environment plus `config.env`, runs in
    /// `config.working_dir`, and leads its own process group so that the
    /// whole subtree can be signalled through its [`crate::ProcessHandle`].
    ///
    /// # Examples
    /// ```no_run
    /// use mwatch_process::{ProcessManager, ProcessConfig};
    ///
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let manager = ProcessManager::new();
    /// let config = ProcessConfig::new("echo").args(["hello"]);
    /// let mut child = manager.spawn(&config)?;
    /// child.wait().await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn spawn(&self, config: &ProcessConfig) -> Result<ManagedChild> {
        debug!(
            command = %config.command,
            args = ?config.args,
            "Spawning process"
        );

        let mut cmd = Self::command(config);
        // stdin stays piped and open so children that read it block instead of seeing EOF
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let child = cmd.spawn().map_err(|source| ProcessError::SpawnFailed {
            command: config.display(),
            source,
        })?;
        let pid = child.id().ok_or_else(|| ProcessError::SpawnFailed {
            command: config.display(),
            source: std::io::Error::new(
                std::io::ErrorKind::Other,
                "process exited before its id was read",
            ),
        })?;

        info!(pid = %pid, command = %config.command, "Process spawned");

        Ok(ManagedChild::new(child, config.clone(), pid))
    }

    /// Spawn an unsupervised process with null stdio
    ///
    /// The child is placed in its own process group and handed over to the
    /// runtime for reaping; only its pid is returned.
    pub fn spawn_detached(&self, config: &ProcessConfig) -> Result<u32> {
        let mut cmd = Self::command(config);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::null());

        let child = cmd.spawn().map_err(|source| ProcessError::SpawnFailed {
            command: config.display(),
            source,
        })?;
        let pid = child.id().unwrap_or(0);

        info!(pid = %pid, command = %config.command, "Detached process spawned");
        Ok(pid)
    }

    fn command(config: &ProcessConfig) -> Command {
        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args);

        if let Some(ref dir) = config.working_dir {
            cmd.current_dir(dir);
        }

        cmd.envs(&config.env);

        #[cfg(unix)]
        cmd.process_group(0);

        cmd
    }
}
