//! Panel view state and key bindings

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Key help shown in the overlay, in display order
pub const KEY_HELP: &[(&str, &str)] = &[
    ("↑ / k", "select previous slot"),
    ("↓ / j", "select next slot"),
    ("r", "restart selected slot"),
    ("R", "restart all slots"),
    ("s", "stop selected slot"),
    ("S", "stop all slots"),
    ("e", "extract selected slot to a terminal"),
    ("z", "zoom selected slot"),
    ("h / ?", "toggle this help"),
    ("q / Esc", "quit"),
];

/// Supervisor operation requested by a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Restart(usize),
    RestartAll,
    Terminate(usize),
    TerminateAll,
    Extract(usize),
}

/// Renderer-owned view state
#[derive(Debug, Default)]
pub struct App {
    selected: usize,
    zoomed: bool,
    show_help: bool,
    quit: bool,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn zoomed(&self) -> bool {
        self.zoomed
    }

    pub fn show_help(&self) -> bool {
        self.show_help
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    /// Apply a key; view changes happen here, supervisor work is returned
    pub fn handle_key(&mut self, key: KeyEvent, slot_count: usize) -> Option<Action> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            if let KeyCode::Char('c') = key.code {
                self.quit = true;
            }
            return None;
        }

        let selected = self.selected;
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.select(selected.saturating_sub(1), slot_count);
                None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.select(selected + 1, slot_count);
                None
            }
            KeyCode::Char('r') => (slot_count > 0).then_some(Action::Restart(selected)),
            KeyCode::Char('R') => Some(Action::RestartAll),
            KeyCode::Char('s') => (slot_count > 0).then_some(Action::Terminate(selected)),
            KeyCode::Char('S') => Some(Action::TerminateAll),
            KeyCode::Char('e') => (slot_count > 0).then_some(Action::Extract(selected)),
            KeyCode::Char('z') => {
                self.zoomed = !self.zoomed;
                None
            }
            KeyCode::Char('h') | KeyCode::Char('H') | KeyCode::Char('?') => {
                self.show_help = !self.show_help;
                None
            }
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.quit = true;
                None
            }
            _ => None,
        }
    }

    fn select(&mut self, index: usize, slot_count: usize) {
        self.selected = index.min(slot_count.saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn shifted(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::SHIFT)
    }

    #[test]
    fn test_selection_is_clamped() {
        let mut app = App::new();
        app.handle_key(key(KeyCode::Up), 3);
        assert_eq!(app.selected(), 0);

        for _ in 0..5 {
            app.handle_key(key(KeyCode::Char('j')), 3);
        }
        assert_eq!(app.selected(), 2);

        app.handle_key(key(KeyCode::Char('k')), 3);
        assert_eq!(app.selected(), 1);
        app.handle_key(key(KeyCode::Down), 1);
        assert_eq!(app.selected(), 0);
    }

    #[test]
    fn test_slot_actions_target_selection() {
        let mut app = App::new();
        app.handle_key(key(KeyCode::Down), 4);
        app.handle_key(key(KeyCode::Down), 4);

        assert_eq!(app.handle_key(key(KeyCode::Char('r')), 4), Some(Action::Restart(2)));
        assert_eq!(app.handle_key(key(KeyCode::Char('s')), 4), Some(Action::Terminate(2)));
        assert_eq!(app.handle_key(key(KeyCode::Char('e')), 4), Some(Action::Extract(2)));
    }

    #[test]
    fn test_uppercase_keys_apply_to_all() {
        let mut app = App::new();
        assert_eq!(app.handle_key(shifted('R'), 2), Some(Action::RestartAll));
        assert_eq!(app.handle_key(shifted('S'), 2), Some(Action::TerminateAll));
    }

    #[test]
    fn test_no_slot_actions_without_slots() {
        let mut app = App::new();
        assert_eq!(app.handle_key(key(KeyCode::Char('r')), 0), None);
        assert_eq!(app.handle_key(key(KeyCode::Char('e')), 0), None);
    }

    #[test]
    fn test_view_toggles() {
        let mut app = App::new();
        app.handle_key(key(KeyCode::Char('z')), 2);
        assert!(app.zoomed());
        app.handle_key(key(KeyCode::Char('z')), 2);
        assert!(!app.zoomed());

        app.handle_key(key(KeyCode::Char('?')), 2);
        assert!(app.show_help());
        app.handle_key(shifted('H'), 2);
        assert!(!app.show_help());
    }

    #[test]
    fn test_quit_keys() {
        for code in [KeyCode::Char('q'), KeyCode::Char('Q'), KeyCode::Esc] {
            let mut app = App::new();
            assert_eq!(app.handle_key(key(code), 1), None);
            assert!(app.should_quit());
        }

        let mut app = App::new();
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL), 1);
        assert!(app.should_quit());
    }

    #[test]
    fn test_ctrl_chords_are_not_slot_actions() {
        let mut app = App::new();
        let ctrl_r = KeyEvent::new(KeyCode::Char('r'), KeyModifiers::CONTROL);
        assert_eq!(app.handle_key(ctrl_r, 2), None);
        assert!(!app.should_quit());
    }
}
