//! # mwatch-process
//!
//! **Purpose**: Child process handles for mwatch slots
//!
//! Spawns each supervised command as the leader of its own process group,
//! publishes its exit to any number of shareable handles, and delivers
//! SIGTERM/SIGKILL to the whole group.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use mwatch_process::{ProcessManager, ProcessConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ProcessManager::new();
//! let config = ProcessConfig::from_argv(["sleep", "3600"])?;
//!
//! let mut child = manager.spawn(&config)?;
//! let handle = child.handle();
//!
//! handle.terminate()?;
//! child.wait().await?;
//! assert!(handle.has_exited());
//! # Ok(())
//! # }
//! ```

pub mod child;
pub mod config;
pub mod error;
pub mod handle;
pub mod manager;

pub use child::ManagedChild;
pub use config::ProcessConfig;
pub use error::{ProcessError, Result};
pub use handle::{GroupSignal, ProcessHandle};
pub use manager::ProcessManager;
