//! Screen regions.
//!
//! ```text
//! ┌ search ─────┐┌ chat-header ─────────────────┐
//! └─────────────┘└──────────────────────────────┘
//! ┌ conversations┐┌ messages ───────────────────┐
//! │              ││                             │
//! │              │└─────────────────────────────┘
//! │              │┌ message-input ────┐┌send-btn┐
//! └──────────────┘└───────────────────┘└────────┘
//!  footer
//! ```
//!
//! Regions are a pure function of the terminal area, so rendering and mouse
//! hit-testing always agree.

use ratatui::layout::{Constraint, Direction, Layout, Margin, Position, Rect};

/// Minimum terminal width.
pub const MIN_WIDTH: u16 = 40;
/// Minimum terminal height.
pub const MIN_HEIGHT: u16 = 12;

const SEARCH_HEIGHT: u16 = 3;
const HEADER_HEIGHT: u16 = 3;
const COMPOSER_HEIGHT: u16 = 3;
const SEND_BUTTON_WIDTH: u16 = 10;

/// Named screen region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionId {
    Search,
    Conversations,
    ChatHeader,
    Messages,
    MessageInput,
    SendButton,
    Footer,
}

impl RegionId {
    /// Stable identifier of the region.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Conversations => "conversations",
            Self::ChatHeader => "chat-header",
            Self::Messages => "messages",
            Self::MessageInput => "message-input",
            Self::SendButton => "send-btn",
            Self::Footer => "footer",
        }
    }
}

/// Computed rectangles for every region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Regions {
    pub search: Rect,
    pub conversations: Rect,
    pub chat_header: Rect,
    pub messages: Rect,
    pub message_input: Rect,
    pub send_btn: Rect,
    pub footer: Rect,
}

impl Regions {
    /// Split `area` into regions, or `None` if it is below the minimum size.
    pub fn compute(area: Rect, sidebar_percent: u16) -> Option<Self> {
        if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
            return None;
        }
        let sidebar_percent = sidebar_percent.clamp(15, 60);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(area);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(sidebar_percent),
                Constraint::Percentage(100 - sidebar_percent),
            ])
            .split(rows[0]);

        let sidebar = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(SEARCH_HEIGHT), Constraint::Min(0)])
            .split(columns[0]);

        let chat = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(HEADER_HEIGHT),
                Constraint::Min(0),
                Constraint::Length(COMPOSER_HEIGHT),
            ])
            .split(columns[1]);

        let composer = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(SEND_BUTTON_WIDTH)])
            .split(chat[2]);

        Some(Self {
            search: sidebar[0],
            conversations: sidebar[1],
            chat_header: chat[0],
            messages: chat[1],
            message_input: composer[0],
            send_btn: composer[1],
            footer: rows[1],
        })
    }

    pub fn get(&self, id: RegionId) -> Rect {
        match id {
            RegionId::Search => self.search,
            RegionId::Conversations => self.conversations,
            RegionId::ChatHeader => self.chat_header,
            RegionId::Messages => self.messages,
            RegionId::MessageInput => self.message_input,
            RegionId::SendButton => self.send_btn,
            RegionId::Footer => self.footer,
        }
    }

    /// Region containing the cell at (`column`, `row`).
    pub fn hit_test(&self, column: u16, row: u16) -> Option<RegionId> {
        let position = Position::new(column, row);
        [
            RegionId::Search,
            RegionId::Conversations,
            RegionId::ChatHeader,
            RegionId::Messages,
            RegionId::MessageInput,
            RegionId::SendButton,
            RegionId::Footer,
        ]
        .into_iter()
        .find(|id| self.get(*id).contains(position))
    }
}

/// Area inside a one-cell border.
pub fn inner(area: Rect) -> Rect {
    area.inner(Margin::new(1, 1))
}
