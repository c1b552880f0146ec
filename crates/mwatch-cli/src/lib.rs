// mwatch - supervise a set of commands in one terminal panel

pub mod cli;
pub mod error;
pub mod extract;
pub mod logging;
pub mod session;
pub mod tui;

pub use cli::Cli;
pub use error::{CliError, CliResult};
