use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use lineboard_core::sync::BoardView;

pub struct App {
    pub server: String,
    pub view: BoardView,
    pub scroll: u16,
    pub help_open: bool,
}

impl App {
    pub fn new(server: String) -> Self {
        Self {
            server,
            view: BoardView::default(),
            scroll: 0,
            help_open: false,
        }
    }

    pub fn apply_view(&mut self, view: BoardView) {
        self.view = view;
        self.clamp_scroll();
    }

    fn max_scroll(&self) -> u16 {
        u16::try_from(self.view.items.len().saturating_sub(1)).unwrap_or(u16::MAX)
    }

    fn clamp_scroll(&mut self) {
        self.scroll = self.scroll.min(self.max_scroll());
    }

    /// Returns true when the app should exit.
    pub fn handle_input(&mut self, event: Event) -> bool {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key),
            _ => false,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return true;
        }
        if matches!(key.code, KeyCode::Char('?') | KeyCode::F(1)) {
            self.help_open = !self.help_open;
            return false;
        }
        if key.code == KeyCode::Esc && self.help_open {
            self.help_open = false;
            return false;
        }
        if self.help_open {
            return false;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => true,
            KeyCode::Down | KeyCode::Char('j') => {
                self.scroll = self.scroll.saturating_add(1);
                self.clamp_scroll();
                false
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.scroll = self.scroll.saturating_sub(1);
                false
            }
            KeyCode::Char('g') | KeyCode::Home => {
                self.scroll = 0;
                false
            }
            KeyCode::Char('G') | KeyCode::End => {
                self.scroll = self.max_scroll();
                false
            }
            _ => false,
        }
    }
}
