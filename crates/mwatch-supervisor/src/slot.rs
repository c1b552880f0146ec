//! Slot supervisor
//!
//! A [`Slot`] owns one supervised command. Its loop runs as a tokio task:
//! spawn the child, read its output and poll the watcher until it exits,
//! optionally wait, and spawn again, for as long as restarts are enabled
//! and no quit was requested. Terminate and restart requests are handed to
//! the escalation task (see [`crate::escalation`]) so callers never wait.
//!
//! Crash loops are supervised forever; the only brake is `restart_wait`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mwatch_process::{ManagedChild, ProcessConfig, ProcessHandle, ProcessManager};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{Result, SupervisorError};
use crate::escalation;
use crate::log_buffer::LogBuffer;
use crate::reader::MultiplexedReader;
use crate::spec::SlotSpec;
use crate::status::SlotStatus;
use crate::watcher::FileWatcher;

/// Re-check interval while restarts are disabled
pub const IDLE_POLL: Duration = Duration::from_millis(300);

/// Completion callback run once a stopped process is confirmed gone
pub type ExitCallback = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug)]
pub(crate) struct SlotState {
    pub(crate) status: SlotStatus,
    /// Incremented on every spawn
    pub(crate) generation: u64,
    pub(crate) process: Option<ProcessHandle>,
    pub(crate) exception: Option<Vec<String>>,
}

#[derive(Debug)]
pub(crate) struct SlotShared {
    pub(crate) spec: SlotSpec,
    pub(crate) state: Mutex<SlotState>,
    pub(crate) quit_requested: AtomicBool,
    pub(crate) restart_enabled: AtomicBool,
    pub(crate) log: LogBuffer,
    /// Held by an escalation for its whole run and by the loop while spawning
    pub(crate) escalation: tokio::sync::Mutex<()>,
}

/// One supervised service
#[derive(Debug)]
pub struct Slot {
    shared: Arc<SlotShared>,
    started: AtomicBool,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Slot {
    /// Create a stopped slot; nothing runs until [`Slot::start`]
    pub fn new(spec: SlotSpec) -> Self {
        let shared = SlotShared {
            spec,
            state: Mutex::new(SlotState {
                status: SlotStatus::Stopped,
                generation: 0,
                process: None,
                exception: None,
            }),
            quit_requested: AtomicBool::new(false),
            restart_enabled: AtomicBool::new(true),
            log: LogBuffer::new(),
            escalation: tokio::sync::Mutex::new(()),
        };
        Self {
            shared: Arc::new(shared),
            started: AtomicBool::new(false),
            task: Mutex::new(None),
        }
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.shared.spec.name
    }

    /// Slot definition
    pub fn spec(&self) -> &SlotSpec {
        &self.shared.spec
    }

    /// Launch the supervisor loop on the current tokio runtime
    ///
    /// Only the first call has an effect.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            debug!(slot = %self.name(), "Slot already started");
            return;
        }
        let task = tokio::spawn(supervise(Arc::clone(&self.shared)));
        *self.task.lock() = Some(task);
    }

    /// Re-enable restarts and gracefully stop the current process
    pub fn restart(&self) {
        self.shared.request_restart();
    }

    /// Gracefully stop the current process and stay idle
    pub fn terminate(&self) {
        info!(slot = %self.name(), "Terminate requested");
        self.shared.quit_requested.store(false, Ordering::SeqCst);
        self.shared.restart_enabled.store(false, Ordering::SeqCst);
        escalation::spawn(Arc::clone(&self.shared), None);
    }

    /// Like [`Slot::terminate`], then run `on_exit` once the process is gone
    pub fn extract(&self, on_exit: ExitCallback) {
        info!(slot = %self.name(), "Extract requested");
        self.shared.quit_requested.store(false, Ordering::SeqCst);
        self.shared.restart_enabled.store(false, Ordering::SeqCst);
        escalation::spawn(Arc::clone(&self.shared), Some(on_exit));
    }

    /// Stop supervising and SIGKILL the process group right away
    ///
    /// Does not wait for the exit; see [`Slot::join`].
    pub fn kill(&self) {
        info!(slot = %self.name(), "Kill requested");
        self.shared.quit_requested.store(true, Ordering::SeqCst);
        self.shared.restart_enabled.store(false, Ordering::SeqCst);

        let process = {
            let mut state = self.shared.state.lock();
            if state.process.is_some() && state.status != SlotStatus::Failed {
                state.status = SlotStatus::Killing;
            }
            state.process.clone()
        };

        if let Some(process) = process {
            match process.kill() {
                Ok(()) => {}
                Err(e) if e.is_gone() => debug!(slot = %self.name(), "Process already gone"),
                Err(e) => warn!(slot = %self.name(), error = %e, "Failed to kill process group"),
            }
        }
    }

    /// Wait until the current process, if any, has exited
    pub async fn join(&self) {
        let process = self.shared.state.lock().process.clone();
        if let Some(process) = process {
            process.wait_exit().await;
        }
    }

    /// Wait for the supervisor loop to end (after [`Slot::kill`] or a failure)
    pub async fn wait_finished(&self) {
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(slot = %self.name(), error = %e, "Slot supervisor task ended abnormally");
            }
        }
    }

    /// Current status
    pub fn status(&self) -> SlotStatus {
        self.shared.state.lock().status
    }

    /// Last `limit` log lines, oldest first
    pub fn drain_log(&self, limit: usize) -> Vec<String> {
        self.shared.log.drain(limit)
    }

    /// Trace of the internal failure that halted this slot
    pub fn last_exception(&self) -> Option<Vec<String>> {
        self.shared.state.lock().exception.clone()
    }

    /// Pid of the live process
    pub fn pid(&self) -> Option<u32> {
        let state = self.shared.state.lock();
        state
            .process
            .as_ref()
            .filter(|process| !process.has_exited())
            .map(ProcessHandle::pid)
    }

    /// Number of processes spawned so far
    pub fn spawn_count(&self) -> u64 {
        self.shared.state.lock().generation
    }

    /// Whether restarts are currently enabled
    pub fn restart_enabled(&self) -> bool {
        self.shared.restart_enabled.load(Ordering::SeqCst)
    }

    /// Whether quit was requested
    pub fn quit_requested(&self) -> bool {
        self.shared.quit_requested.load(Ordering::SeqCst)
    }
}

impl SlotShared {
    fn quit_requested(&self) -> bool {
        self.quit_requested.load(Ordering::SeqCst)
    }

    fn restart_enabled(&self) -> bool {
        self.restart_enabled.load(Ordering::SeqCst)
    }

    pub(crate) fn request_restart(self: &Arc<Self>) {
        info!(slot = %self.spec.name, "Restart requested");
        self.quit_requested.store(false, Ordering::SeqCst);
        self.restart_enabled.store(true, Ordering::SeqCst);
        escalation::spawn(Arc::clone(self), None);
    }

    /// Live process and the generation it belongs to
    pub(crate) fn live_process(&self) -> Option<(ProcessHandle, u64)> {
        let state = self.state.lock();
        state
            .process
            .as_ref()
            .filter(|process| !process.has_exited())
            .map(|process| (process.clone(), state.generation))
    }

    /// Apply a status only while `generation` is still the current run
    pub(crate) fn set_status_if_current(&self, generation: u64, status: SlotStatus) -> bool {
        let mut state = self.state.lock();
        if state.generation != generation || state.status == SlotStatus::Failed {
            return false;
        }
        state.status = status;
        true
    }

    async fn run_cycles(self: &Arc<Self>) -> Result<()> {
        let config = self.spec.process_config()?;
        let mut watcher = self
            .spec
            .watch
            .as_ref()
            .map(FileWatcher::from_spec)
            .transpose()?;

        loop {
            if self.quit_requested() {
                return Ok(());
            }
            if !self.restart_enabled() {
                tokio::time::sleep(IDLE_POLL).await;
                continue;
            }

            let Some(child) = self.spawn_child(&config).await? else {
                continue;
            };
            self.run_child(child, &mut watcher).await?;

            if let Some(wait) = self.spec.restart_wait {
                self.pause(wait).await;
            }
        }
    }

    async fn spawn_child(self: &Arc<Self>, config: &ProcessConfig) -> Result<Option<ManagedChild>> {
        // never overlap a spawn with an escalation that is still winding down
        let _serial = self.escalation.lock().await;
        if self.quit_requested() || !self.restart_enabled() {
            return Ok(None);
        }

        self.log.clear();
        let child = ProcessManager::new().spawn(config)?;

        let (generation, killed) = {
            let mut state = self.state.lock();
            state.generation += 1;
            state.status = SlotStatus::Running;
            state.process = Some(child.handle());
            // kill() sets the flag before taking this lock: either it sees
            // the handle stored above, or this load sees its flag
            let killed = self.quit_requested();
            if killed {
                state.status = SlotStatus::Killing;
            }
            (state.generation, killed)
        };

        if killed {
            debug!(slot = %self.spec.name, pid = child.pid(), "Kill arrived during spawn");
            if let Err(e) = child.handle().kill() {
                if !e.is_gone() {
                    warn!(slot = %self.spec.name, error = %e, "Failed to kill freshly spawned process");
                }
            }
        } else {
            info!(slot = %self.spec.name, pid = child.pid(), generation, "Slot process running");
        }
        Ok(Some(child))
    }

    async fn run_child(
        self: &Arc<Self>,
        mut child: ManagedChild,
        watcher: &mut Option<FileWatcher>,
    ) -> Result<()> {
        let mut reader = MultiplexedReader::new(child.stdout(), child.stderr());

        let exit = loop {
            for line in reader.poll_once().await {
                self.log.push(line);
            }

            if let Err(e) = self.poll_watcher(watcher).await {
                self.abandon(&child);
                return Err(e);
            }

            match child.try_wait() {
                Ok(Some(exit)) => break exit,
                Ok(None) => {}
                Err(e) => {
                    self.abandon(&child);
                    return Err(e.into());
                }
            }
        };

        {
            let mut state = self.state.lock();
            state.process = None;
            if state.status == SlotStatus::Running {
                state.status = SlotStatus::Stopped;
            }
        }
        info!(slot = %self.spec.name, pid = child.pid(), code = ?exit.code(), "Slot process exited");
        Ok(())
    }

    async fn poll_watcher(self: &Arc<Self>, watcher: &mut Option<FileWatcher>) -> Result<()> {
        let Some(current) = watcher.take() else {
            return Ok(());
        };

        let (current, changed) = tokio::task::spawn_blocking(move || {
            let mut current = current;
            let changed = current.check();
            (current, changed)
        })
        .await?;
        *watcher = Some(current);

        if changed && !self.quit_requested() {
            info!(slot = %self.spec.name, "Watched files changed, restarting");
            self.request_restart();
        }
        Ok(())
    }

    /// Sleep for `wait`, cut short by a quit request
    async fn pause(&self, wait: Duration) {
        let deadline = tokio::time::Instant::now() + wait;
        while !self.quit_requested() {
            let now = tokio::time::Instant::now();
            if now >= deadline {
                break;
            }
            tokio::time::sleep((deadline - now).min(IDLE_POLL)).await;
        }
    }

    /// Do not leave an unsupervised child behind when the loop bails out
    fn abandon(&self, child: &ManagedChild) {
        if let Err(e) = child.handle().kill() {
            debug!(slot = %self.spec.name, error = %e, "Kill during abandon failed");
        }
        self.state.lock().process = None;
    }

    fn fail(&self, error: SupervisorError) {
        error!(slot = %self.spec.name, error = %error, "Slot supervision failed");

        let mut trace = vec![format!("{}: supervision stopped", self.spec.command_line())];
        trace.extend(error.trace());

        let mut state = self.state.lock();
        state.status = SlotStatus::Failed;
        state.exception = Some(trace);
        state.process = None;
    }
}

async fn supervise(shared: Arc<SlotShared>) {
    info!(slot = %shared.spec.name, command = %shared.spec.command_line(), "Slot supervisor started");

    match shared.run_cycles().await {
        Ok(()) => {
            let mut state = shared.state.lock();
            if state.status != SlotStatus::Failed {
                state.status = SlotStatus::Stopped;
            }
            drop(state);
            info!(slot = %shared.spec.name, "Slot supervisor finished");
        }
        Err(e) => shared.fail(e),
    }
}
