//! Messaging transport abstraction.
//!
//! The engine never talks to a network directly. A [`Transport`] performs
//! sends and history fetches as `'static` futures so the session can spawn
//! them, and pushes inbound messages through a registered handler.

use std::time::Duration;

use futures::future::BoxFuture;

use crate::model::{Conversation, ConversationId, Message, SendReceipt};

/// Failures reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("rejected by remote: {0}")]
    Rejected(String),

    #[error("transport closed")]
    Closed,
}

/// Callback invoked for every inbound message.
pub type IncomingHandler = Box<dyn Fn(ConversationId, Message) + Send + Sync>;

/// A messaging backend.
pub trait Transport: Send + Sync {
    /// Deliver a message; resolves with the remote acknowledgment.
    fn send_message(
        &self,
        conversation_id: ConversationId,
        text: String,
    ) -> BoxFuture<'static, Result<SendReceipt, TransportError>>;

    /// Fetch a conversation's message history.
    fn fetch_thread(
        &self,
        conversation_id: ConversationId,
    ) -> BoxFuture<'static, Result<Vec<Message>, TransportError>>;

    /// Fetch the known conversations.
    fn fetch_conversations(&self) -> BoxFuture<'static, Result<Vec<Conversation>, TransportError>>;

    /// Register the handler for inbound messages, replacing any previous one.
    fn on_incoming(&self, handler: IncomingHandler);
}
