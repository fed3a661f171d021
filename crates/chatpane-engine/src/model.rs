//! Core data model: conversations, messages and their identifiers.
//!
//! A [`Conversation`] is a named channel with one contact or group. Each
//! conversation owns a thread of [`Message`]s, ordered by `created_at` with
//! insertion order breaking ties.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque conversation identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ConversationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Opaque message identifier, unique within its conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh local id (UUID v4).
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for MessageId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A conversation shown in the sidebar list and the chat header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation identifier.
    pub id: ConversationId,
    /// Name shown in the list and chat header.
    pub display_name: String,
    /// Single glyph for the avatar badge.
    pub avatar_initial: char,
    /// Short preview of the newest message.
    #[serde(default)]
    pub last_message_preview: String,
    /// Timestamp of the newest activity, used for ordering.
    pub last_activity_at: DateTime<Utc>,
    /// Contact address or phone number, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Incoming messages received while the conversation was not selected.
    #[serde(default)]
    pub unread_count: u32,
}

impl Conversation {
    /// Create a conversation with an avatar initial derived from the name.
    pub fn new(
        id: impl Into<ConversationId>,
        display_name: impl Into<String>,
        last_activity_at: DateTime<Utc>,
    ) -> Self {
        let display_name = display_name.into();
        Self {
            id: id.into(),
            avatar_initial: avatar_initial_for(&display_name),
            display_name,
            last_message_preview: String::new(),
            last_activity_at,
            address: None,
            unread_count: 0,
        }
    }

    /// Set the contact address.
    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Set the last message preview.
    #[must_use]
    pub fn with_preview(mut self, preview: impl Into<String>) -> Self {
        self.last_message_preview = preview.into();
        self
    }
}

/// Derive the avatar glyph: first alphanumeric character, uppercased.
pub fn avatar_initial_for(name: &str) -> char {
    name.chars()
        .find(|c| c.is_alphanumeric())
        .and_then(|c| c.to_uppercase().next())
        .unwrap_or('#')
}

/// Which side of the conversation authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Received from the contact.
    Incoming,
    /// Sent by the local user.
    Outgoing,
}

/// Delivery status of a message.
///
/// Outgoing messages start `Pending` and move to `Sent` or `Failed` exactly
/// once. Incoming messages are always `Sent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Pending,
    Sent,
    Failed,
}

impl MessageStatus {
    /// Check whether this status is final.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Sent | Self::Failed)
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Sent => write!(f, "sent"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Transport acknowledgment for a delivered outgoing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReceipt {
    /// Identifier assigned by the remote side.
    pub remote_id: String,
    /// When the remote side accepted the message.
    pub created_at: DateTime<Utc>,
}

/// A single message in a thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Identifier, unique within the conversation.
    pub id: MessageId,
    /// Owning conversation.
    pub conversation_id: ConversationId,
    /// Who authored the message.
    pub direction: Direction,
    /// Display text (never empty).
    pub text: String,
    /// Delivery status.
    pub status: MessageStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Remote acknowledgment, once the transport confirmed delivery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt: Option<SendReceipt>,
}

impl Message {
    /// Create a pending outgoing message with a fresh id.
    pub fn outgoing(
        conversation_id: ConversationId,
        text: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MessageId::generate(),
            conversation_id,
            direction: Direction::Outgoing,
            text: text.into(),
            status: MessageStatus::Pending,
            created_at,
            receipt: None,
        }
    }

    /// Create an incoming message (implicitly sent).
    pub fn incoming(
        id: impl Into<MessageId>,
        conversation_id: ConversationId,
        text: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            conversation_id,
            direction: Direction::Incoming,
            text: text.into(),
            status: MessageStatus::Sent,
            created_at,
            receipt: None,
        }
    }

    pub fn is_outgoing(&self) -> bool {
        self.direction == Direction::Outgoing
    }
}

/// Build a list preview from message text: first line, at most `max_chars`.
pub fn preview_text(text: &str, max_chars: usize) -> String {
    let first_line = text.lines().next().unwrap_or_default().trim();
    if first_line.chars().count() <= max_chars {
        return first_line.to_string();
    }
    let mut preview: String = first_line.chars().take(max_chars).collect();
    preview.push_str("...");
    preview
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_avatar_initial_for() {
        assert_eq!(avatar_initial_for("alice"), 'A');
        assert_eq!(avatar_initial_for("  +44 bob"), '4');
        assert_eq!(avatar_initial_for("ébène"), 'É');
        assert_eq!(avatar_initial_for("!!!"), '#');
        assert_eq!(avatar_initial_for(""), '#');
    }

    #[test]
    fn test_outgoing_message_starts_pending() {
        let msg = Message::outgoing("1".into(), "hi", Utc::now());
        assert_eq!(msg.direction, Direction::Outgoing);
        assert_eq!(msg.status, MessageStatus::Pending);
        assert_eq!(msg.id.as_str().len(), 36);
    }

    #[test]
    fn test_incoming_message_is_sent() {
        let msg = Message::incoming("m1", "1".into(), "hello", Utc::now());
        assert_eq!(msg.status, MessageStatus::Sent);
        assert!(!msg.is_outgoing());
    }

    #[test]
    fn test_generated_ids_are_distinct() {
        assert_ne!(MessageId::generate(), MessageId::generate());
    }

    #[test]
    fn test_preview_text_truncates() {
        assert_eq!(preview_text("short", 10), "short");
        assert_eq!(preview_text("abcdefghij", 4), "abcd...");
        assert_eq!(preview_text("line one\nline two", 40), "line one");
    }

    #[test]
    fn test_status_terminal() {
        assert!(!MessageStatus::Pending.is_terminal());
        assert!(MessageStatus::Sent.is_terminal());
        assert!(MessageStatus::Failed.is_terminal());
        assert_eq!(MessageStatus::Failed.to_string(), "failed");
    }

    #[test]
    fn test_conversation_serde_uses_plain_ids() {
        let conv = Conversation::new("c1", "Alice", Utc::now()).with_address("+100");
        let json = serde_json::to_value(&conv).unwrap();
        assert_eq!(json["id"], "c1");
        assert_eq!(json["avatar_initial"], "A");
        assert_eq!(json["address"], "+100");
    }
}
