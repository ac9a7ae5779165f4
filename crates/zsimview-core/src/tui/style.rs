//! Color scheme and styles.
//!
//! The light flag only swaps the palette; no other logic depends on it.

use ratatui::style::{Color, Modifier, Style};

/// One color palette.
pub struct Theme {
    pub fg: Color,
    pub fg_dim: Color,
    pub header_fg: Color,
    pub header_bg: Color,
    pub selected_bg: Color,
    pub accent: Color,
    pub warning: Color,
}

impl Theme {
    pub const DARK: Theme = Theme {
        fg: Color::White,
        fg_dim: Color::DarkGray,
        header_fg: Color::White,
        header_bg: Color::Blue,
        selected_bg: Color::DarkGray,
        accent: Color::Cyan,
        warning: Color::Yellow,
    };

    pub const LIGHT: Theme = Theme {
        fg: Color::Black,
        fg_dim: Color::Gray,
        header_fg: Color::Black,
        header_bg: Color::LightCyan,
        selected_bg: Color::LightBlue,
        accent: Color::Blue,
        warning: Color::Red,
    };
}

/// Pre-defined styles for the active palette.
#[derive(Clone, Copy)]
pub struct Styles {
    theme: &'static Theme,
}

impl Styles {
    pub fn new(light: bool) -> Self {
        Self {
            theme: if light { &Theme::LIGHT } else { &Theme::DARK },
        }
    }

    pub fn default(&self) -> Style {
        Style::default().fg(self.theme.fg)
    }

    /// Header and status bars.
    pub fn header(&self) -> Style {
        Style::default()
            .fg(self.theme.header_fg)
            .bg(self.theme.header_bg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn selected(&self) -> Style {
        Style::default()
            .bg(self.theme.selected_bg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn table_header(&self) -> Style {
        Style::default()
            .fg(self.theme.header_fg)
            .bg(self.theme.header_bg)
            .add_modifier(Modifier::BOLD)
    }

    /// Border of the focused pane.
    pub fn focused_border(&self) -> Style {
        Style::default().fg(self.theme.accent)
    }

    pub fn border(&self) -> Style {
        Style::default().fg(self.theme.fg_dim)
    }

    /// Current snapshot or selected record.
    pub fn active(&self) -> Style {
        Style::default()
            .fg(self.theme.accent)
            .add_modifier(Modifier::BOLD)
    }

    /// Remembered selection missing from this snapshot.
    pub fn ghost(&self) -> Style {
        Style::default()
            .fg(self.theme.fg_dim)
            .add_modifier(Modifier::ITALIC | Modifier::CROSSED_OUT)
    }

    pub fn total(&self) -> Style {
        Style::default()
            .fg(self.theme.fg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn dim(&self) -> Style {
        Style::default().fg(self.theme.fg_dim)
    }

    pub fn warning(&self) -> Style {
        Style::default().fg(self.theme.warning)
    }

    pub fn key(&self) -> Style {
        Style::default().fg(self.theme.warning)
    }
}
