//! Message thread view.
//!
//! Incoming messages hug the left edge and outgoing ones the right. Each
//! message is wrapped to at most three quarters of the pane, followed by a
//! meta line with its time (and delivery status for outgoing messages).
//! The view is bottom-anchored so the newest message is always visible.

use chatpane_engine::{Message, MessageStatus};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};
use unicode_width::UnicodeWidthStr;

use super::{format_time, Pane};
use crate::theme::{BorderSet, IconSet, Theme};

const MIN_BUBBLE_WIDTH: usize = 10;

/// What the thread pane has to show.
#[derive(Debug, Clone, Copy)]
pub enum ThreadView<'a> {
    /// No conversation is selected.
    NoSelection,
    /// The first fetch is still running.
    Loading,
    Messages(&'a [Message]),
}

/// The `messages` region.
pub struct MessageList<'a> {
    view: ThreadView<'a>,
    theme: &'a Theme,
    icons: &'a IconSet,
    borders: &'a BorderSet,
}

impl<'a> MessageList<'a> {
    pub fn new(view: ThreadView<'a>, theme: &'a Theme, icons: &'a IconSet, borders: &'a BorderSet) -> Self {
        Self {
            view,
            theme,
            icons,
            borders,
        }
    }

    fn message_lines(&self, message: &Message, width: usize) -> Vec<Line<'static>> {
        let bubble_width = (width * 3 / 4).max(MIN_BUBBLE_WIDTH).min(width);
        let wrapped = textwrap::wrap(&message.text, bubble_width);
        let text_width = wrapped.iter().map(|l| l.width()).max().unwrap_or(0);

        let (alignment, text_style) = if message.is_outgoing() {
            (Alignment::Right, Style::default().fg(self.theme.outgoing))
        } else {
            (Alignment::Left, Style::default().fg(self.theme.incoming))
        };

        let mut lines: Vec<Line<'static>> = wrapped
            .iter()
            .map(|segment| {
                // Pad so a right-aligned bubble keeps a straight left edge.
                let pad = text_width.saturating_sub(segment.width());
                let text = if message.is_outgoing() {
                    format!("{segment}{}", " ".repeat(pad))
                } else {
                    segment.to_string()
                };
                Line::styled(text, text_style).alignment(alignment)
            })
            .collect();

        lines.push(self.meta_line(message).alignment(alignment));
        lines
    }

    fn meta_line(&self, message: &Message) -> Line<'static> {
        let muted = Style::default().fg(self.theme.muted);
        let time = Span::styled(format_time(message.created_at), muted);
        if !message.is_outgoing() {
            return Line::from(time);
        }

        let (status_style, suffix) = match message.status {
            MessageStatus::Pending => (muted, None),
            MessageStatus::Sent => (Style::default().fg(self.theme.success), None),
            MessageStatus::Failed => (
                Style::default().fg(self.theme.error).add_modifier(Modifier::BOLD),
                Some(" failed, Ctrl+R to resend"),
            ),
        };
        let mut spans = vec![
            time,
            Span::raw(" "),
            Span::styled(self.icons.status(message.status), status_style),
        ];
        if let Some(suffix) = suffix {
            spans.push(Span::styled(suffix, status_style));
        }
        Line::from(spans)
    }
}

impl Widget for MessageList<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Pane::new(self.theme, self.borders).title("messages").block();
        let inner = block.inner(area);
        block.render(area, buf);

        let messages = match self.view {
            ThreadView::NoSelection => {
                placeholder("No conversation selected", self.theme).render(inner, buf);
                return;
            }
            ThreadView::Loading => {
                placeholder("Loading...", self.theme).render(inner, buf);
                return;
            }
            ThreadView::Messages([]) => {
                placeholder("No messages yet. Say hello!", self.theme).render(inner, buf);
                return;
            }
            ThreadView::Messages(messages) => messages,
        };

        let width = usize::from(inner.width);
        let mut lines: Vec<Line<'static>> = Vec::new();
        for (i, message) in messages.iter().enumerate() {
            if i > 0 {
                lines.push(Line::default());
            }
            lines.extend(self.message_lines(message, width));
        }

        let height = usize::from(inner.height);
        let skip = lines.len().saturating_sub(height);
        let visible: Vec<Line<'static>> = lines.into_iter().skip(skip).collect();

        // Bottom-anchor short threads.
        let top_pad = u16::try_from(height - visible.len()).unwrap_or(0);
        let target = Rect {
            y: inner.y + top_pad,
            height: inner.height - top_pad,
            ..inner
        };
        Paragraph::new(visible).render(target, buf);
    }
}

fn placeholder<'a>(text: &'a str, theme: &Theme) -> Paragraph<'a> {
    Paragraph::new(text)
        .style(Style::default().fg(theme.muted))
        .alignment(Alignment::Center)
}
