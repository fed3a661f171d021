//! Composer row: the `message-input` box and the `send-btn`.

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Position, Rect},
    style::{Modifier, Style},
    text::Line,
    widgets::{Paragraph, Widget},
};
use unicode_width::UnicodeWidthStr;

use super::Pane;
use crate::input::TextInputState;
use crate::layout::inner;
use crate::theme::{BorderSet, IconSet, Theme};

/// The `message-input` region.
pub struct MessageInput<'a> {
    input: &'a TextInputState,
    focused: bool,
    enabled: bool,
    theme: &'a Theme,
    borders: &'a BorderSet,
}

impl<'a> MessageInput<'a> {
    pub fn new(input: &'a TextInputState, theme: &'a Theme, borders: &'a BorderSet) -> Self {
        Self {
            input,
            focused: false,
            enabled: true,
            theme,
            borders,
        }
    }

    #[must_use]
    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    /// Disabled while no conversation is selected.
    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

impl Widget for MessageInput<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Pane::new(self.theme, self.borders)
            .title("message")
            .focused(self.focused)
            .block();

        if self.input.is_empty() {
            let hint = if self.enabled {
                "Type a message"
            } else {
                "Select a conversation first"
            };
            Paragraph::new(hint)
                .style(Style::default().fg(self.theme.muted))
                .block(block)
                .render(area, buf);
            return;
        }

        // Only the cursor line fits in a one-line box.
        let (line, _) = self.input.cursor_line_col();
        let text = self.input.content().split('\n').nth(line).unwrap_or_default();
        let lines_total = self.input.content().split('\n').count();
        let mut paragraph = Paragraph::new(Line::styled(text, Style::default().fg(self.theme.text)));
        if lines_total > 1 {
            paragraph = paragraph.block(block.title_bottom(
                Line::styled(
                    format!(" line {}/{lines_total} ", line + 1),
                    Style::default().fg(self.theme.muted),
                )
                .alignment(Alignment::Right),
            ));
        } else {
            paragraph = paragraph.block(block);
        }
        paragraph.render(area, buf);
    }
}

/// Terminal cursor position for an input rendered into `area` at `offset`
/// columns past the left border.
pub fn cursor_position(input: &TextInputState, area: Rect, offset: u16) -> Position {
    let inner = inner(area);
    let (line, col) = input.cursor_line_col();
    let current = input.content().split('\n').nth(line).unwrap_or_default();
    let before: String = current.chars().take(col).collect();
    let width = u16::try_from(before.width()).unwrap_or(u16::MAX);
    let max_x = inner.right().saturating_sub(1);
    Position::new(inner.x.saturating_add(offset).saturating_add(width).min(max_x), inner.y)
}

/// The `send-btn` region.
pub struct SendButton<'a> {
    enabled: bool,
    theme: &'a Theme,
    icons: &'a IconSet,
    borders: &'a BorderSet,
}

impl<'a> SendButton<'a> {
    pub fn new(theme: &'a Theme, icons: &'a IconSet, borders: &'a BorderSet) -> Self {
        Self {
            enabled: true,
            theme,
            icons,
            borders,
        }
    }

    /// Enabled when there is a draft and a selected conversation.
    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

impl Widget for SendButton<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Pane::new(self.theme, self.borders).block();
        let style = if self.enabled {
            Style::default().fg(self.theme.primary).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(self.theme.muted)
        };
        Paragraph::new(format!("{} Send", self.icons.send()))
            .style(style)
            .alignment(Alignment::Center)
            .block(block)
            .render(area, buf);
    }
}
