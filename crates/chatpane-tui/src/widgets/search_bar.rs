//! Search input above the conversation list.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

use super::Pane;
use crate::theme::{BorderSet, IconSet, Theme};

const PLACEHOLDER: &str = "Search or start a new chat";

/// The `search` region.
pub struct SearchBar<'a> {
    query: &'a str,
    focused: bool,
    theme: &'a Theme,
    icons: &'a IconSet,
    borders: &'a BorderSet,
}

impl<'a> SearchBar<'a> {
    pub fn new(query: &'a str, theme: &'a Theme, icons: &'a IconSet, borders: &'a BorderSet) -> Self {
        Self {
            query,
            focused: false,
            theme,
            icons,
            borders,
        }
    }

    #[must_use]
    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }
}

impl Widget for SearchBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Pane::new(self.theme, self.borders)
            .title("search")
            .focused(self.focused)
            .block();

        let icon = Span::styled(
            format!("{} ", self.icons.search()),
            Style::default().fg(self.theme.muted),
        );
        let text = if self.query.is_empty() && !self.focused {
            Span::styled(PLACEHOLDER, Style::default().fg(self.theme.muted))
        } else {
            Span::styled(self.query, Style::default().fg(self.theme.text))
        };

        Paragraph::new(Line::from(vec![icon, text]))
            .block(block)
            .render(area, buf);
    }
}

/// Column offset of the query text inside the search box.
pub fn query_offset(icons: &IconSet) -> u16 {
    let width = unicode_width::UnicodeWidthStr::width(icons.search()) + 1;
    u16::try_from(width).unwrap_or(u16::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::buffer_to_string;
    use crate::theme::IconMode;

    fn render(query: &str, focused: bool) -> String {
        let theme = Theme::default();
        let icons = IconSet::new(IconMode::Ascii);
        let borders = BorderSet::new(IconMode::Ascii);
        let area = Rect::new(0, 0, 40, 3);
        let mut buf = Buffer::empty(area);
        SearchBar::new(query, &theme, &icons, &borders)
            .focused(focused)
            .render(area, &mut buf);
        buffer_to_string(&buf)
    }

    #[test]
    fn test_placeholder_when_empty_and_unfocused() {
        assert!(render("", false).contains(PLACEHOLDER));
        assert!(!render("", true).contains(PLACEHOLDER));
    }

    #[test]
    fn test_renders_query() {
        let out = render("neha", true);
        assert!(out.contains("/ neha"));
        assert!(out.contains(" search "));
    }

    #[test]
    fn test_query_offset() {
        assert_eq!(query_offset(&IconSet::new(IconMode::Ascii)), 2);
    }
}
