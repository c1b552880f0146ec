//! One mwatch run from parsed arguments to a restored terminal

use mwatch_config::{ConfigManager, MwatchConfig};
use mwatch_supervisor::{Orchestrator, SlotSpec};
use tracing::info;

use crate::cli::Cli;
use crate::error::CliResult;
use crate::logging;
use crate::tui::Panel;

/// Slot definitions for this run, honoring `--no-watch`
pub fn slot_specs(config: &MwatchConfig, cli: &Cli) -> CliResult<Vec<SlotSpec>> {
    let mut specs = config.slot_specs()?;
    if cli.no_watch {
        for spec in &mut specs {
            spec.watch = None;
        }
    }
    Ok(specs)
}

/// Load, supervise, show the panel, and shut everything down on quit
pub async fn run(cli: Cli) -> CliResult<()> {
    let config = ConfigManager::with_path(&cli.config).load()?;

    let log_path = logging::resolve_log_path(cli.log_file.as_deref().or(config.log.file.as_deref()));
    logging::init_logging(&config.log.level, cli.verbose, &log_path)?;
    info!(config = %cli.config.display(), slots = config.slots.len(), "mwatch starting");

    let orchestrator = Orchestrator::new(slot_specs(&config, &cli)?);
    orchestrator.start_all();

    let mut panel = match Panel::enter(config.extract.terminal.clone()) {
        Ok(panel) => panel,
        Err(e) => {
            orchestrator.shutdown().await;
            return Err(e);
        }
    };
    let result = panel.run(&orchestrator).await;

    orchestrator.shutdown().await;
    panel.restore()?;

    info!("mwatch stopped");
    result
}
