//! UI widgets for the TUI.
//!
//! This module provides:
//! - [`Pane`] - Bordered block shared by every region
//! - [`SearchBar`] - The `search` input
//! - [`ConversationList`] - The `conversations` sidebar
//! - [`ChatHeader`] - The `chat-header` bar
//! - [`MessageList`] - The `messages` thread view
//! - [`MessageInput`] and [`SendButton`] - The composer row
//! - [`FooterHints`] - Bottom keybinding hints and errors

mod chat_header;
pub mod composer;
pub mod conversation_list;
mod footer_hints;
mod message_list;
mod pane;
pub mod search_bar;

pub use chat_header::ChatHeader;
pub use composer::{MessageInput, SendButton};
pub use conversation_list::ConversationList;
pub use footer_hints::{hints_for_focus, FooterHints, KeyHint};
pub use message_list::{MessageList, ThreadView};
pub use pane::Pane;
pub use search_bar::SearchBar;

use chrono::{DateTime, Utc};

/// Format a timestamp as `HH:MM` (UTC).
pub fn format_time(ts: DateTime<Utc>) -> String {
    ts.format("%H:%M").to_string()
}
