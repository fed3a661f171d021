//! Bordered pane shared by every region.
//!
//! Supports focused/unfocused states with different border styles.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    widgets::{Block, Borders, Widget},
};

use crate::theme::{BorderSet, Theme};

/// Generic pane with border and optional title.
pub struct Pane<'a> {
    title: Option<&'a str>,
    focused: bool,
    theme: &'a Theme,
    borders: &'a BorderSet,
}

impl<'a> Pane<'a> {
    /// Create a new pane widget.
    pub fn new(theme: &'a Theme, borders: &'a BorderSet) -> Self {
        Self {
            title: None,
            focused: false,
            theme,
            borders,
        }
    }

    /// Set the pane title.
    #[must_use]
    pub fn title(mut self, title: &'a str) -> Self {
        self.title = Some(title);
        self
    }

    /// Set whether the pane is focused.
    #[must_use]
    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    /// Build the styled block.
    pub fn block(&self) -> Block<'a> {
        let (border_set, border_style, title_style) = if self.focused {
            (
                self.borders.focused(),
                Style::default().fg(self.theme.border_focused),
                Style::default().fg(self.theme.primary),
            )
        } else {
            (
                self.borders.normal(),
                Style::default().fg(self.theme.border),
                Style::default().fg(self.theme.subtext),
            )
        };

        let mut block = Block::default()
            .borders(Borders::ALL)
            .border_set(border_set)
            .border_style(border_style);
        if let Some(title) = self.title {
            block = block.title(format!(" {title} ")).title_style(title_style);
        }
        block
    }
}

impl Widget for Pane<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        self.block().render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::buffer_to_string;
    use crate::theme::IconMode;

    #[test]
    fn test_pane_builder() {
        let theme = Theme::default();
        let borders = BorderSet::new(IconMode::Unicode);

        let pane = Pane::new(&theme, &borders).title("messages").focused(true);

        assert_eq!(pane.title, Some("messages"));
        assert!(pane.focused);
    }

    #[test]
    fn test_pane_renders_title_and_focus_border() {
        let theme = Theme::default();
        let borders = BorderSet::new(IconMode::Unicode);
        let area = Rect::new(0, 0, 20, 3);

        let mut buf = Buffer::empty(area);
        Pane::new(&theme, &borders).title("search").render(area, &mut buf);
        let plain = buffer_to_string(&buf);
        assert!(plain.starts_with('╭'));
        assert!(plain.contains(" search "));

        let mut buf = Buffer::empty(area);
        Pane::new(&theme, &borders).focused(true).render(area, &mut buf);
        assert!(buffer_to_string(&buf).starts_with('┏'));
    }
}
