//! Event handling for the panel

use std::thread;
use std::time::{Duration, Instant};

use crossterm::event as crossterm_event;
use crossterm::event::{KeyEvent, KeyEventKind};
use tokio::sync::mpsc::{self, UnboundedReceiver};

/// Redraw interval when no input arrives
pub const TICK_RATE: Duration = Duration::from_millis(100);

/// Panel events
#[derive(Debug, Clone)]
pub enum Event {
    /// Key press
    Key(KeyEvent),
    /// Terminal resized
    Resize,
    /// Periodic redraw
    Tick,
}

/// Terminal events read on a dedicated thread and forwarded to the async loop
pub struct EventLoop {
    rx: UnboundedReceiver<Event>,
}

impl EventLoop {
    /// Start the reader thread; it exits once the loop is dropped
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        thread::spawn(move || {
            let mut last_tick = Instant::now();
            loop {
                let timeout = tick_rate.saturating_sub(last_tick.elapsed());
                if crossterm_event::poll(timeout).unwrap_or(false) {
                    if let Ok(event) = crossterm_event::read() {
                        if let Some(event) = Self::convert(event) {
                            if tx.send(event).is_err() {
                                break;
                            }
                        }
                    }
                }

                if last_tick.elapsed() >= tick_rate {
                    if tx.send(Event::Tick).is_err() {
                        break;
                    }
                    last_tick = Instant::now();
                }
            }
        });

        Self { rx }
    }

    fn convert(event: crossterm_event::Event) -> Option<Event> {
        match event {
            // releases and repeats are reported on some platforms
            crossterm_event::Event::Key(key) if key.kind == KeyEventKind::Press => {
                Some(Event::Key(key))
            }
            crossterm_event::Event::Resize(_, _) => Some(Event::Resize),
            _ => None,
        }
    }

    /// Next event, or None once the reader thread is gone
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new(TICK_RATE)
    }
}
