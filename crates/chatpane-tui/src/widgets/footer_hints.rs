//! Footer line: focus, key hints, or the last error.
//!
//! Format: `Conversations            [Enter] open │ [Tab] focus │ [Esc] quit`

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};
use unicode_width::UnicodeWidthStr;

use crate::app::Focus;
use crate::theme::{IconSet, Theme};

/// A single keybinding hint.
#[derive(Debug, Clone)]
pub struct KeyHint {
    /// The key or key combination (e.g., "Tab", "Ctrl+R").
    pub key: String,
    /// The action description (e.g., "focus", "resend").
    pub action: String,
}

impl KeyHint {
    /// Create a new key hint.
    pub fn new(key: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            action: action.into(),
        }
    }
}

/// Hints for the focused region.
pub fn hints_for_focus(focus: Focus) -> Vec<KeyHint> {
    let mut hints = match focus {
        Focus::Search => vec![KeyHint::new("Enter", "list"), KeyHint::new("Esc", "back")],
        Focus::Conversations => vec![
            KeyHint::new("j/k", "move"),
            KeyHint::new("Enter", "open"),
            KeyHint::new("Esc", "quit"),
        ],
        Focus::Composer => vec![
            KeyHint::new("Enter", "send"),
            KeyHint::new("Alt+Enter", "newline"),
            KeyHint::new("Ctrl+R", "resend"),
        ],
    };
    hints.push(KeyHint::new("Tab", "focus"));
    hints
}

/// Footer widget.
pub struct FooterHints<'a> {
    hints: &'a [KeyHint],
    focus: Focus,
    error: Option<&'a str>,
    theme: &'a Theme,
    icons: &'a IconSet,
}

impl<'a> FooterHints<'a> {
    pub fn new(hints: &'a [KeyHint], focus: Focus, theme: &'a Theme, icons: &'a IconSet) -> Self {
        Self {
            hints,
            focus,
            error: None,
            theme,
            icons,
        }
    }

    /// Show an error instead of the focus label.
    #[must_use]
    pub fn error(mut self, error: Option<&'a str>) -> Self {
        self.error = error;
        self
    }
}

impl Widget for FooterHints<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let separator = self.icons.separator();

        let mut left_spans = match self.error {
            Some(error) => vec![Span::styled(
                format!(" {error}"),
                Style::default().fg(self.theme.error).add_modifier(Modifier::BOLD),
            )],
            None => vec![Span::styled(
                format!(" {}", self.focus.label()),
                Style::default().fg(self.theme.primary),
            )],
        };

        let mut right_spans = Vec::new();
        for (i, hint) in self.hints.iter().enumerate() {
            if i > 0 {
                right_spans.push(Span::styled(separator, Style::default().fg(self.theme.muted)));
            }
            right_spans.push(Span::styled("[", Style::default().fg(self.theme.muted)));
            right_spans.push(Span::styled(hint.key.as_str(), Style::default().fg(self.theme.primary)));
            right_spans.push(Span::styled("] ", Style::default().fg(self.theme.muted)));
            right_spans.push(Span::styled(hint.action.as_str(), Style::default().fg(self.theme.subtext)));
        }
        right_spans.push(Span::raw(" "));

        let left_width = spans_width(&left_spans);
        let mut right_width = spans_width(&right_spans);
        let total_width = usize::from(area.width);

        // Errors win over hints when space runs out.
        if left_width + right_width > total_width && self.error.is_some() {
            right_spans.clear();
            right_width = 0;
        }

        let padding = total_width.saturating_sub(left_width + right_width);
        if padding > 0 {
            left_spans.push(Span::raw(" ".repeat(padding)));
        }
        left_spans.extend(right_spans);

        Paragraph::new(Line::from(left_spans))
            .style(Style::default().bg(self.theme.surface))
            .render(area, buf);
    }
}

fn spans_width(spans: &[Span<'_>]) -> usize {
    spans.iter().map(|s| s.content.width()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::buffer_to_string;
    use crate::theme::IconMode;

    fn render(focus: Focus, error: Option<&str>, width: u16) -> String {
        let theme = Theme::default();
        let icons = IconSet::new(IconMode::Ascii);
        let hints = hints_for_focus(focus);
        let area = Rect::new(0, 0, width, 1);
        let mut buf = Buffer::empty(area);
        FooterHints::new(&hints, focus, &theme, &icons)
            .error(error)
            .render(area, &mut buf);
        buffer_to_string(&buf)
    }

    #[test]
    fn test_hints_change_with_focus() {
        let list = render(Focus::Conversations, None, 100);
        assert!(list.starts_with(" Conversations"));
        assert!(list.contains("[Enter] open | [Esc] quit | [Tab] focus"));

        let composer = render(Focus::Composer, None, 100);
        assert!(composer.contains("[Ctrl+R] resend"));
    }

    #[test]
    fn test_error_replaces_focus_label() {
        let out = render(Focus::Composer, Some("Send failed: timed out after 10s"), 100);
        assert!(out.starts_with(" Send failed: timed out after 10s"));
        assert!(!out.contains("Composer"));
    }

    #[test]
    fn test_error_kept_when_narrow() {
        let out = render(Focus::Composer, Some("Send failed: network error"), 40);
        assert!(out.contains("Send failed"));
        assert!(!out.contains("[Enter]"));
    }
}
