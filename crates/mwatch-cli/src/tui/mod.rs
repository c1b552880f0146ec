//! Terminal panel: one block per slot, keys mapped to supervisor operations

pub mod app;
pub mod event;
pub mod render;
pub mod terminal;

use std::io::{self, Stdout};

use mwatch_supervisor::Orchestrator;
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{debug, info};

use crate::error::CliResult;
use crate::extract;

pub use app::{Action, App};
pub use event::{Event, EventLoop, TICK_RATE};
pub use terminal::TerminalGuard;

/// Interactive panel over an orchestrator
pub struct Panel {
    guard: TerminalGuard,
    terminal: Terminal<CrosstermBackend<Stdout>>,
    events: EventLoop,
    app: App,
    extract_terminal: Vec<String>,
}

impl Panel {
    /// Take over the terminal
    pub fn enter(extract_terminal: Vec<String>) -> CliResult<Self> {
        let guard = TerminalGuard::enter()?;
        let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
        terminal.clear()?;

        Ok(Self {
            guard,
            terminal,
            events: EventLoop::new(TICK_RATE),
            app: App::new(),
            extract_terminal,
        })
    }

    /// Redraw on every event until the user quits or the process is told to stop
    pub async fn run(&mut self, orchestrator: &Orchestrator) -> CliResult<()> {
        #[cfg(unix)]
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

        loop {
            let app = &self.app;
            self.terminal
                .draw(|frame| render::render(frame, app, orchestrator))?;

            #[cfg(unix)]
            let event = tokio::select! {
                event = self.events.next() => event,
                _ = sigterm.recv() => {
                    info!("SIGTERM received, quitting");
                    break;
                }
            };
            #[cfg(not(unix))]
            let event = self.events.next().await;

            match event {
                Some(Event::Key(key)) => {
                    if let Some(action) = self.app.handle_key(key, orchestrator.len()) {
                        self.dispatch(action, orchestrator);
                    }
                }
                Some(Event::Resize) | Some(Event::Tick) => {}
                None => break,
            }

            if self.app.should_quit() {
                info!("Quit requested");
                break;
            }
        }
        Ok(())
    }

    /// Give the terminal back
    pub fn restore(mut self) -> CliResult<()> {
        self.terminal.show_cursor()?;
        self.guard.restore()?;
        Ok(())
    }

    fn dispatch(&self, action: Action, orchestrator: &Orchestrator) {
        debug!(?action, "Dispatching key action");
        match action {
            Action::Restart(index) => orchestrator.restart(index),
            Action::RestartAll => orchestrator.restart_all(),
            Action::Terminate(index) => orchestrator.terminate(index),
            Action::TerminateAll => orchestrator.terminate_all(),
            Action::Extract(index) => {
                if let Some(slot) = orchestrator.slot(index) {
                    let launch = extract::launcher(&self.extract_terminal, slot.spec());
                    orchestrator.extract(index, launch);
                }
            }
        }
    }
}
