//! Graceful terminate, then kill
//!
//! SIGTERM goes to the slot's whole process group; if the process is not
//! gone after [`GRACE_PERIOD`] the group gets SIGKILL and the exit is awaited
//! without a further deadline. Each escalation is its own task and holds the
//! slot's escalation lock from start to finish, so requests for one slot
//! queue up instead of racing. A request that finds nothing live when its
//! turn comes only runs its callback.

use std::sync::Arc;
use std::time::Duration;

use mwatch_process::{GroupSignal, ProcessHandle};
use tracing::{debug, info, warn};

use crate::error::{Result, SupervisorError};
use crate::slot::{ExitCallback, SlotShared};
use crate::status::SlotStatus;

/// Time between SIGTERM and SIGKILL
pub const GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Run an escalation for `shared` in the background
pub(crate) fn spawn(shared: Arc<SlotShared>, on_exit: Option<ExitCallback>) {
    tokio::spawn(async move {
        if let Err(e) = escalate(&shared, on_exit).await {
            warn!(
                slot = %shared.spec.name,
                error = %e,
                cause = %e.trace().join(": "),
                "Escalation failed"
            );
        }
    });
}

async fn escalate(shared: &SlotShared, on_exit: Option<ExitCallback>) -> Result<()> {
    let _serial = shared.escalation.lock().await;

    let Some((process, generation)) = shared.live_process() else {
        debug!(slot = %shared.spec.name, "No live process to stop");
        if let Some(on_exit) = on_exit {
            on_exit();
        }
        return Ok(());
    };

    shared.set_status_if_current(generation, SlotStatus::Terminating);
    info!(slot = %shared.spec.name, pid = process.pid(), "Terminating process group");
    if let Err(e) = deliver(shared, &process, GroupSignal::Terminate) {
        // the grace wait still applies; SIGKILL follows if the process stays
        warn!(slot = %shared.spec.name, error = %e, "SIGTERM not delivered");
    }

    if !process.exited_within(GRACE_PERIOD).await {
        warn!(
            slot = %shared.spec.name,
            pid = process.pid(),
            grace_secs = GRACE_PERIOD.as_secs(),
            "Grace period expired, killing process group"
        );
        shared.set_status_if_current(generation, SlotStatus::Killing);
        if let Err(e) = deliver(shared, &process, GroupSignal::Kill) {
            if !process.has_exited() {
                shared.set_status_if_current(generation, SlotStatus::Running);
            }
            return Err(e);
        }
        process.wait_exit().await;
    }

    if shared.set_status_if_current(generation, SlotStatus::Stopped) {
        shared.log.clear();
    }
    info!(slot = %shared.spec.name, pid = process.pid(), "Process stopped");

    if let Some(on_exit) = on_exit {
        on_exit();
    }
    Ok(())
}

/// Signal the group; a group that is already gone counts as delivered
fn deliver(shared: &SlotShared, process: &ProcessHandle, signal: GroupSignal) -> Result<()> {
    match process.signal(signal) {
        Ok(()) => Ok(()),
        Err(e) if e.is_gone() => {
            debug!(slot = %shared.spec.name, signal = signal.as_str(), "Process group already gone");
            Ok(())
        }
        Err(source) => Err(SupervisorError::Escalation {
            slot: shared.spec.name.clone(),
            source,
        }),
    }
}
