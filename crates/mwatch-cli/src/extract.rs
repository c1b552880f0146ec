//! Hand a slot's command over to a separate terminal window

use mwatch_process::{ProcessConfig, ProcessManager};
use mwatch_supervisor::{ExitCallback, SlotSpec};
use tracing::{error, info};

/// Launch configuration: terminal argv followed by the slot's argv
pub fn launch_config(terminal: &[String], spec: &SlotSpec) -> mwatch_process::Result<ProcessConfig> {
    let argv = terminal.iter().chain(spec.command.iter()).cloned();
    let mut config = ProcessConfig::from_argv(argv)?.envs(spec.env.clone());
    if let Some(dir) = &spec.working_dir {
        config = config.working_dir(dir);
    }
    Ok(config)
}

/// Callback that launches the slot in a terminal once its process is gone
pub fn launcher(terminal: &[String], spec: &SlotSpec) -> ExitCallback {
    let slot = spec.name.clone();
    let config = launch_config(terminal, spec);

    Box::new(move || {
        let result = config.and_then(|config| ProcessManager::new().spawn_detached(&config));
        match result {
            Ok(pid) => info!(slot = %slot, pid, "Slot extracted to terminal"),
            Err(e) => error!(slot = %slot, error = %e, "Failed to launch extract terminal"),
        }
    })
}
