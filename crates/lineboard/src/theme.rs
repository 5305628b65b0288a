use lineboard_core::connection::ConnectionState;
use lineboard_core::{Banner, Severity};
use ratatui::style::Color;

#[derive(Clone, Copy)]
pub struct BoardTheme {
    pub bg: Color,
    pub surface: Color,
    pub border: Color,
    pub title: Color,
    pub text: Color,
    pub muted: Color,
    pub accent: Color,
    pub ok: Color,
    pub warn: Color,
    pub critical: Color,
}

pub fn board_theme() -> BoardTheme {
    BoardTheme {
        bg: Color::Rgb(11, 18, 32),
        surface: Color::Rgb(17, 26, 46),
        border: Color::Rgb(71, 85, 105),
        title: Color::Rgb(191, 219, 254),
        text: Color::Rgb(226, 232, 240),
        muted: Color::Rgb(148, 163, 184),
        accent: Color::Rgb(56, 189, 248),
        ok: Color::Rgb(34, 197, 94),
        warn: Color::Rgb(245, 158, 11),
        critical: Color::Rgb(239, 68, 68),
    }
}

impl BoardTheme {
    pub fn severity(&self, severity: Severity) -> Color {
        match severity {
            Severity::Severe => self.critical,
            Severity::Normal => self.text,
        }
    }

    pub fn connection(&self, state: ConnectionState) -> Color {
        match state {
            ConnectionState::Connected => self.ok,
            ConnectionState::Connecting => self.accent,
            ConnectionState::Reconnecting => self.warn,
            ConnectionState::Disconnected => self.critical,
        }
    }

    pub fn banner(&self, banner: Banner) -> Color {
        match banner {
            Banner::AllClear => self.ok,
            Banner::Disconnected => self.critical,
            Banner::Hidden => self.muted,
        }
    }
}
