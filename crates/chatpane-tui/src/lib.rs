//! chatpane-tui: Two-pane terminal UI for chatpane
//!
//! This crate provides the terminal layer, including:
//! - Sidebar with search and the conversation list
//! - Chat area with header, thread view and composer
//! - Keyboard focus and mouse hit-testing over named regions
//! - Theme, icon and border sets with `NO_COLOR` fallback

mod app;
mod event;
mod input;
pub mod layout;
#[cfg(test)]
pub mod test_utils;
pub mod theme;
mod ui;
pub mod widgets;

pub use app::{App, Focus};
pub use chatpane_engine;
pub use event::{key_to_action, Action, Event, EventHandler};
pub use input::TextInputState;

use chatpane_engine::{ClientConfig, Session};
use crossterm::{
    cursor::Show as ShowCursor,
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, stdout};
use tracing::info;

/// RAII guard for terminal state restoration.
struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(stdout(), DisableMouseCapture, LeaveAlternateScreen, ShowCursor);
    }
}

/// Run the TUI application.
///
/// This is the main entry point for the TUI. It sets up the terminal,
/// runs the event loop, and restores the terminal on exit.
pub async fn run_tui(session: Session, config: &ClientConfig) -> Result<(), Box<dyn std::error::Error>> {
    // Setup terminal with RAII guard for cleanup
    enable_raw_mode()?;
    let _guard = TerminalGuard;

    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(session, config);
    let size = terminal.size()?;
    app.resize(size.width, size.height);
    app.session.refresh_conversations();

    let mut events = EventHandler::new(config.tick_rate());
    info!("TUI started");

    let result = run_loop(&mut terminal, &mut app, &mut events).await;

    // Restore cursor before guard drops
    terminal.show_cursor()?;
    info!("TUI stopped");

    result
}

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &mut EventHandler,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        if app.needs_redraw() {
            terminal.draw(|frame| ui::render(frame, app))?;
            app.mark_rendered();
        }

        tokio::select! {
            event = events.next() => match event {
                Some(Event::Key(key)) => app.handle_key(key),
                Some(Event::Mouse(mouse)) => app.handle_mouse(mouse),
                Some(Event::Resize(width, height)) => app.resize(width, height),
                Some(Event::Tick) => app.process_completions(),
                None => break,
            },
            Some(completion) = app.session.next_completion() => {
                app.apply_completion(completion);
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

/// Get the TUI version.
pub fn tui_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tui_version() {
        assert!(!tui_version().is_empty());
    }
}
