//! Main TUI application.

use std::io;
use std::time::Duration;

use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tracing::{debug, warn};

use crate::session::Session;

use super::event::{Event, EventHandler};
use super::input::{KeyAction, handle_key};
use super::render::render;
use super::state::AppState;

/// Rows taken by header, status line and pane borders.
const CHROME_ROWS: u16 = 5;

/// Main TUI application.
pub struct App {
    session: Session,
    state: AppState,
    should_quit: bool,
}

impl App {
    pub fn new(session: Session) -> Self {
        let light = session.config().light_theme;
        let state = AppState::new(session.view(), light);
        Self {
            session,
            state,
            should_quit: false,
        }
    }

    /// Runs the TUI application until the user quits.
    pub fn run(mut self, tick_rate: Duration) -> io::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let events = EventHandler::new(tick_rate);
        if let Ok(size) = terminal.size() {
            self.state.page_size = size.height.saturating_sub(CHROME_ROWS) as usize;
        }

        let result = self.event_loop(&mut terminal, &events);

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;
        result
    }

    fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        events: &EventHandler,
    ) -> io::Result<()> {
        loop {
            terminal.draw(|frame| render(frame, &mut self.state))?;

            match events.next() {
                Ok(Event::Tick) => self.state.tick(),
                Ok(Event::Key(key)) => {
                    let action = handle_key(&mut self.state, key);
                    self.apply(action);
                }
                Ok(Event::Resize(height)) => {
                    self.state.page_size = height.saturating_sub(CHROME_ROWS) as usize;
                }
                Err(_) => self.should_quit = true,
            }

            if self.should_quit {
                return Ok(());
            }
        }
    }

    /// Runs the session operation behind a key action and refreshes the view.
    fn apply(&mut self, action: KeyAction) {
        match action {
            KeyAction::None => return,
            KeyAction::Quit => {
                self.should_quit = true;
                return;
            }
            KeyAction::Select(selection) => {
                if let Err(e) = self.session.select(selection) {
                    self.state.set_message(e.to_string());
                }
            }
            KeyAction::JumpSnapshot(index) => {
                if let Err(e) = self.session.switch_snapshot(index) {
                    warn!(snapshot = index, error = %e, "snapshot switch failed");
                    self.state.set_message(e.to_string());
                }
            }
            KeyAction::NextSnapshot => match self.session.advance() {
                Ok(true) => {}
                Ok(false) => self.state.set_message("already at the last snapshot"),
                Err(e) => self.state.set_message(e.to_string()),
            },
            KeyAction::PrevSnapshot => match self.session.rewind() {
                Ok(true) => {}
                Ok(false) => self.state.set_message("already at the first snapshot"),
                Err(e) => self.state.set_message(e.to_string()),
            },
            KeyAction::LoadDeferred => {
                if !self.session.load_deferred() {
                    self.state.set_message("nothing to load");
                }
            }
            KeyAction::ClearSelection => self.session.clear_selection(),
        }
        let view = self.session.view();
        debug!(status = %view.status, "view refreshed");
        self.state.sync(view);
    }
}
