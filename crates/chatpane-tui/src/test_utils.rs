//! Test utilities for chatpane-tui rendering and interaction tests.
//!
//! This module provides helper functions for building a demo app, rendering
//! it into a [`TestBackend`] and converting buffers to strings.

use std::sync::Arc;

use chatpane_engine::{ClientConfig, Fixture, IconStyle, MemoryTransport, Session};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{backend::TestBackend, buffer::Buffer, Terminal};

use crate::app::App;
use crate::ui;

/// Default terminal width for tests.
pub const TEST_WIDTH: u16 = 100;

/// Default terminal height for tests.
pub const TEST_HEIGHT: u16 = 30;

/// Convert a buffer to plain text, one line per row, trailing spaces trimmed.
pub fn buffer_to_string(buffer: &Buffer) -> String {
    let area = buffer.area;
    let mut result = String::new();

    for y in area.y..area.y + area.height {
        for x in area.x..area.x + area.width {
            if let Some(cell) = buffer.cell((x, y)) {
                result.push_str(cell.symbol());
            }
        }
        while result.ends_with(' ') {
            result.pop();
        }
        result.push('\n');
    }

    result
}

/// Render the app at the given size and return the screen text.
pub fn render_app(app: &App, width: u16, height: u16) -> String {
    let mut terminal = Terminal::new(TestBackend::new(width, height)).expect("test terminal");
    terminal.draw(|frame| ui::render(frame, app)).expect("draw");
    buffer_to_string(terminal.backend().buffer())
}

/// Build an app over the demo fixture with its conversation list loaded.
///
/// Icons are ASCII so assertions do not depend on the environment.
pub async fn demo_app() -> (App, MemoryTransport) {
    let transport = MemoryTransport::new();
    Fixture::demo().expect("demo fixture").seed(&transport);

    let mut config = ClientConfig::default();
    config.ui.icons = IconStyle::Ascii;

    let session = Session::new(Arc::new(transport.clone()), &config);
    let mut app = App::new(session, &config);
    app.resize(TEST_WIDTH, TEST_HEIGHT);

    app.session.refresh_conversations();
    let completion = app.session.next_completion().await.expect("conversations");
    app.apply_completion(completion);
    (app, transport)
}

/// Open the conversation at list `index` and apply its thread fetch.
pub async fn open_conversation(app: &mut App, index: usize) {
    app.list_cursor = index;
    app.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
    let completion = app.session.next_completion().await.expect("thread");
    app.apply_completion(completion);
}
