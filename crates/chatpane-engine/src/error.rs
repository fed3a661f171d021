//! Error taxonomy for core contract violations.
//!
//! Transport failures live in [`crate::transport::TransportError`]; they are
//! recovered inside the composer and never reach callers of the stores.

use crate::model::{ConversationId, MessageId, MessageStatus};

/// A reference to an id the session does not know about.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotFound {
    #[error("conversation not found: {0}")]
    Conversation(ConversationId),

    #[error("message not found: {message_id} in conversation {conversation_id}")]
    Message {
        conversation_id: ConversationId,
        message_id: MessageId,
    },
}

/// Errors returned by the stores, the composer and the session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// Bad user input, e.g. an empty message.
    #[error("validation error: {0}")]
    Validation(String),

    /// Unknown conversation or message id.
    #[error(transparent)]
    NotFound(#[from] NotFound),

    /// Illegal message status change.
    #[error("invalid status transition for message {message_id}: {from} -> {to}")]
    InvalidTransition {
        message_id: MessageId,
        from: MessageStatus,
        to: MessageStatus,
    },
}

impl CoreError {
    pub(crate) fn conversation_not_found(id: &ConversationId) -> Self {
        Self::NotFound(NotFound::Conversation(id.clone()))
    }

    pub(crate) fn message_not_found(conversation_id: &ConversationId, message_id: &MessageId) -> Self {
        Self::NotFound(NotFound::Message {
            conversation_id: conversation_id.clone(),
            message_id: message_id.clone(),
        })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
