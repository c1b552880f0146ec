//! # mwatch-supervisor
//!
//! **Purpose**: Keep a set of commands running, each in its own slot
//!
//! Every [`Slot`] runs a tokio task that spawns its command, captures
//! stdout/stderr into a bounded [`LogBuffer`], restarts the command when it
//! exits or when its watched files change, and stops it with SIGTERM
//! followed by SIGKILL after [`GRACE_PERIOD`]. An [`Orchestrator`] owns the
//! slots of a session and applies operations to one or all of them.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use mwatch_supervisor::{Orchestrator, SlotSpec, WatchSpec};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let orchestrator = Orchestrator::new([
//!     SlotSpec::new(["python", "server.py"])
//!         .name("server")
//!         .watch(WatchSpec::new(".")),
//!     SlotSpec::new(["python", "worker.py"]).restart_wait(Duration::from_secs(2)),
//! ]);
//! orchestrator.start_all();
//!
//! for slot in orchestrator.slots() {
//!     println!("{} {}", slot.status(), slot.name());
//! }
//!
//! orchestrator.shutdown().await;
//! # }
//! ```

pub mod error;
pub mod escalation;
pub mod log_buffer;
pub mod orchestrator;
pub mod reader;
pub mod slot;
pub mod spec;
pub mod status;
pub mod watcher;

pub use error::{Result, SupervisorError};
pub use escalation::GRACE_PERIOD;
pub use log_buffer::{LogBuffer, LOG_CAPACITY};
pub use orchestrator::Orchestrator;
pub use reader::{LineCarry, MultiplexedReader, POLL_INTERVAL, READ_CHUNK};
pub use slot::{ExitCallback, Slot, IDLE_POLL};
pub use spec::{SlotSpec, WatchSpec, BASE_ENV};
pub use status::SlotStatus;
pub use watcher::{FileWatcher, DEFAULT_WATCH_PATTERN};
