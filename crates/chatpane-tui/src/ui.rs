//! Frame rendering.
//!
//! Rendering reads the [`App`] and never mutates engine state.

use ratatui::{
    layout::{Alignment, Rect},
    style::Style,
    widgets::{Paragraph, Wrap},
    Frame,
};

use crate::app::{App, Focus};
use crate::layout::{Regions, MIN_HEIGHT, MIN_WIDTH};
use crate::theme::Theme;
use crate::widgets::composer::cursor_position;
use crate::widgets::search_bar::query_offset;
use crate::widgets::{
    hints_for_focus, ChatHeader, ConversationList, FooterHints, MessageInput, MessageList,
    SearchBar, SendButton,
};

/// Draw one frame.
pub fn render(frame: &mut Frame<'_>, app: &App) {
    let area = frame.area();
    let Some(regions) = Regions::compute(area, app.sidebar_percent) else {
        render_too_small(frame, area, &app.theme);
        return;
    };

    let state = app.session.state();
    let (theme, icons, borders) = (&app.theme, &app.icons, &app.borders);
    let has_selection = state.selected_conversation_id().is_some();

    frame.render_widget(
        SearchBar::new(app.search_input.content(), theme, icons, borders)
            .focused(app.focus == Focus::Search),
        regions.search,
    );

    let conversations = app.visible_conversations();
    frame.render_widget(
        ConversationList::new(&conversations, theme, icons, borders)
            .cursor(app.list_cursor)
            .selected(state.selected_conversation_id())
            .focused(app.focus == Focus::Conversations)
            .searching(state.search.is_active()),
        regions.conversations,
    );

    frame.render_widget(
        ChatHeader::new(state.conversations.selected(), theme, borders),
        regions.chat_header,
    );
    frame.render_widget(
        MessageList::new(app.thread_view(), theme, icons, borders),
        regions.messages,
    );

    frame.render_widget(
        MessageInput::new(&app.composer_input, theme, borders)
            .focused(app.focus == Focus::Composer)
            .enabled(has_selection),
        regions.message_input,
    );
    frame.render_widget(
        SendButton::new(theme, icons, borders)
            .enabled(has_selection && !app.composer_input.content().trim().is_empty()),
        regions.send_btn,
    );

    let hints = hints_for_focus(app.focus);
    frame.render_widget(
        FooterHints::new(&hints, app.focus, theme, icons).error(app.last_error.as_deref()),
        regions.footer,
    );

    let cursor = match app.focus {
        Focus::Search => Some((&app.search_input, query_offset(icons))),
        Focus::Composer if has_selection => Some((&app.composer_input, 0)),
        _ => None,
    };
    if let Some((input, offset)) = cursor {
        let area = regions.get(app.focus.region());
        frame.set_cursor_position(cursor_position(input, area, offset));
    }
}

fn render_too_small(frame: &mut Frame<'_>, area: Rect, theme: &Theme) {
    let text = format!(
        "Terminal too small: {}x{}\nNeed at least {MIN_WIDTH}x{MIN_HEIGHT}",
        area.width, area.height
    );
    frame.render_widget(
        Paragraph::new(text)
            .style(Style::default().fg(theme.warning))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        area,
    );
}
