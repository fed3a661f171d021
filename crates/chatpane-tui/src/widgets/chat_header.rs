//! Chat header: who the open conversation is with.

use chatpane_engine::Conversation;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

use super::Pane;
use crate::theme::{BorderSet, Theme};

/// The `chat-header` region.
pub struct ChatHeader<'a> {
    conversation: Option<&'a Conversation>,
    theme: &'a Theme,
    borders: &'a BorderSet,
}

impl<'a> ChatHeader<'a> {
    pub fn new(conversation: Option<&'a Conversation>, theme: &'a Theme, borders: &'a BorderSet) -> Self {
        Self {
            conversation,
            theme,
            borders,
        }
    }
}

impl Widget for ChatHeader<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Pane::new(self.theme, self.borders).block();

        let line = match self.conversation {
            Some(conversation) => {
                let mut spans = vec![
                    Span::styled(
                        format!("({}) ", conversation.avatar_initial),
                        Style::default().fg(self.theme.secondary),
                    ),
                    Span::styled(
                        conversation.display_name.as_str(),
                        Style::default().fg(self.theme.text).add_modifier(Modifier::BOLD),
                    ),
                ];
                if let Some(address) = &conversation.address {
                    spans.push(Span::styled(
                        format!("  {address}"),
                        Style::default().fg(self.theme.muted),
                    ));
                }
                Line::from(spans)
            }
            None => Line::styled(
                "Select a conversation to start chatting",
                Style::default().fg(self.theme.muted),
            ),
        };

        Paragraph::new(line).block(block).render(area, buf);
    }
}
