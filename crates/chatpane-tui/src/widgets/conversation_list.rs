//! Sidebar conversation list.
//!
//! Each conversation takes [`ROW_HEIGHT`] lines:
//!
//! ```text
//! ▸ (N) Neha Joshi          13:37
//!       Hi Neha! Absolutely...  2
//! ```

use chatpane_engine::{Conversation, ConversationId};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};
use unicode_width::UnicodeWidthStr;

use super::{format_time, Pane};
use crate::theme::{BorderSet, IconSet, Theme};

/// Lines per conversation row.
pub const ROW_HEIGHT: u16 = 2;

/// Width of the marker and avatar columns.
const LEAD_WIDTH: usize = 6;

/// First visible row that keeps `cursor` in view.
pub fn list_offset(cursor: usize, visible_rows: usize) -> usize {
    if visible_rows == 0 {
        return cursor;
    }
    cursor.saturating_sub(visible_rows - 1)
}

/// Number of whole rows that fit in an inner area of `height` lines.
pub fn visible_rows(height: u16) -> usize {
    usize::from(height / ROW_HEIGHT)
}

/// The `conversations` region.
pub struct ConversationList<'a> {
    conversations: &'a [&'a Conversation],
    cursor: usize,
    selected: Option<&'a ConversationId>,
    focused: bool,
    searching: bool,
    theme: &'a Theme,
    icons: &'a IconSet,
    borders: &'a BorderSet,
}

impl<'a> ConversationList<'a> {
    pub fn new(
        conversations: &'a [&'a Conversation],
        theme: &'a Theme,
        icons: &'a IconSet,
        borders: &'a BorderSet,
    ) -> Self {
        Self {
            conversations,
            cursor: 0,
            selected: None,
            focused: false,
            searching: false,
            theme,
            icons,
            borders,
        }
    }

    #[must_use]
    pub fn cursor(mut self, cursor: usize) -> Self {
        self.cursor = cursor;
        self
    }

    #[must_use]
    pub fn selected(mut self, selected: Option<&'a ConversationId>) -> Self {
        self.selected = selected;
        self
    }

    #[must_use]
    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    /// Whether a search query is active (changes the empty message).
    #[must_use]
    pub fn searching(mut self, searching: bool) -> Self {
        self.searching = searching;
        self
    }

    fn row_lines(&self, conversation: &Conversation, highlighted: bool, width: usize) -> [Line<'a>; 2] {
        let theme = self.theme;
        let is_selected = self.selected == Some(&conversation.id);
        let name_style = if is_selected {
            Style::default().fg(theme.primary).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.text)
        };
        let marker = if highlighted { self.icons.selected() } else { " " };
        let time = format_time(conversation.last_activity_at);

        let name_width = width.saturating_sub(LEAD_WIDTH + time.width() + 1);
        let name = fit(&conversation.display_name, name_width);
        let gap = width.saturating_sub(LEAD_WIDTH + name.width() + time.width());

        let top = Line::from(vec![
            Span::styled(format!("{marker} "), Style::default().fg(theme.primary)),
            Span::styled(
                format!("({}) ", conversation.avatar_initial),
                Style::default().fg(theme.secondary),
            ),
            Span::styled(name, name_style),
            Span::raw(" ".repeat(gap)),
            Span::styled(time, Style::default().fg(theme.muted)),
        ]);

        let badge = if conversation.unread_count > 0 {
            format!("{} {}", self.icons.unread(), conversation.unread_count)
        } else {
            String::new()
        };
        let preview_width = width.saturating_sub(LEAD_WIDTH + badge.width() + 1);
        let preview = fit(&conversation.last_message_preview, preview_width);
        let gap = width.saturating_sub(LEAD_WIDTH + preview.width() + badge.width());

        let bottom = Line::from(vec![
            Span::raw(" ".repeat(LEAD_WIDTH)),
            Span::styled(preview, Style::default().fg(theme.subtext)),
            Span::raw(" ".repeat(gap)),
            Span::styled(badge, Style::default().fg(theme.success)),
        ]);

        if highlighted && self.focused {
            let bg = Style::default().bg(theme.surface);
            [top.patch_style(bg), bottom.patch_style(bg)]
        } else {
            [top, bottom]
        }
    }
}

impl Widget for ConversationList<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Pane::new(self.theme, self.borders)
            .title("conversations")
            .focused(self.focused)
            .block();
        let inner = block.inner(area);
        block.render(area, buf);

        if self.conversations.is_empty() {
            let message = if self.searching {
                "No conversations match"
            } else {
                "No conversations yet"
            };
            Paragraph::new(message)
                .style(Style::default().fg(self.theme.muted))
                .render(inner, buf);
            return;
        }

        let rows = visible_rows(inner.height);
        let offset = list_offset(self.cursor, rows);
        let width = usize::from(inner.width);
        let lines: Vec<Line<'_>> = self
            .conversations
            .iter()
            .enumerate()
            .skip(offset)
            .take(rows)
            .flat_map(|(index, conversation)| self.row_lines(conversation, index == self.cursor, width))
            .collect();

        Paragraph::new(lines).render(inner, buf);
    }
}

/// Truncate `text` to `width` display columns, marking the cut with `~`.
fn fit(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('~');
    out
}
