//! Ordered collection of slots with bulk operations

use tracing::{debug, info};

use crate::slot::{ExitCallback, Slot};
use crate::spec::SlotSpec;

/// Owns every slot of a session, in configuration order
#[derive(Debug, Default)]
pub struct Orchestrator {
    slots: Vec<Slot>,
}

impl Orchestrator {
    /// Build one stopped slot per spec
    pub fn new(specs: impl IntoIterator<Item = SlotSpec>) -> Self {
        Self {
            slots: specs.into_iter().map(Slot::new).collect(),
        }
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Slot at `index`, if any
    pub fn slot(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Start every slot's supervisor loop
    pub fn start_all(&self) {
        info!(slots = self.slots.len(), "Starting all slots");
        for slot in &self.slots {
            slot.start();
        }
    }

    pub fn restart(&self, index: usize) {
        self.with_slot(index, Slot::restart);
    }

    pub fn restart_all(&self) {
        self.slots.iter().for_each(Slot::restart);
    }

    pub fn terminate(&self, index: usize) {
        self.with_slot(index, Slot::terminate);
    }

    pub fn terminate_all(&self) {
        self.slots.iter().for_each(Slot::terminate);
    }

    /// Terminate the slot at `index` and run `on_exit` once its process is gone
    pub fn extract(&self, index: usize, on_exit: ExitCallback) {
        match self.slots.get(index) {
            Some(slot) => slot.extract(on_exit),
            None => debug!(index, "Extract on unknown slot ignored"),
        }
    }

    /// SIGKILL every slot without waiting
    pub fn kill_all(&self) {
        self.slots.iter().for_each(Slot::kill);
    }

    /// Kill everything, then wait for every process and supervisor loop to end
    pub async fn shutdown(&self) {
        info!("Shutting down all slots");
        self.kill_all();
        for slot in &self.slots {
            slot.join().await;
        }
        for slot in &self.slots {
            slot.wait_finished().await;
        }
        info!("All slots stopped");
    }

    fn with_slot(&self, index: usize, action: impl FnOnce(&Slot)) {
        match self.slots.get(index) {
            Some(slot) => action(slot),
            None => debug!(index, "Action on unknown slot ignored"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::SlotStatus;

    #[test]
    fn test_slots_keep_configuration_order() {
        let orchestrator = Orchestrator::new([
            SlotSpec::new(["sleep", "1"]).name("first"),
            SlotSpec::new(["sleep", "2"]).name("second"),
        ]);
        assert_eq!(orchestrator.len(), 2);
        let names: Vec<_> = orchestrator.slots().iter().map(Slot::name).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert!(orchestrator.slot(2).is_none());
        assert!(orchestrator.slots().iter().all(|s| s.status() == SlotStatus::Stopped));
    }

    #[tokio::test]
    async fn test_out_of_range_index_is_ignored() {
        let orchestrator = Orchestrator::new([SlotSpec::new(["true"])]);
        orchestrator.restart(5);
        orchestrator.terminate(5);
        orchestrator.extract(5, Box::new(|| {}));
        assert_eq!(orchestrator.slot(0).map(Slot::status), Some(SlotStatus::Stopped));
    }

    #[tokio::test]
    async fn test_shutdown_of_unstarted_slots_returns() {
        let orchestrator = Orchestrator::new([SlotSpec::new(["true"]), SlotSpec::new(["true"])]);
        orchestrator.shutdown().await;
        assert!(orchestrator.slots().iter().all(|s| s.quit_requested()));
    }
}
