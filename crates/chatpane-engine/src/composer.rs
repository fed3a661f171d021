//! Outgoing message lifecycle.
//!
//! Each message the user sends moves through `Pending -> Sent | Failed`. The
//! [`ComposerController`] performs the synchronous half: it validates input,
//! appends the pending message for optimistic display, and later applies the
//! transport's answer. Dispatching the send itself is the session's job.

use std::collections::HashMap;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::model::{ConversationId, Message, MessageId, MessageStatus, SendReceipt};
use crate::state::AppState;
use crate::transport::TransportError;

/// A submitted message waiting to be handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSend {
    pub conversation_id: ConversationId,
    pub message_id: MessageId,
    pub text: String,
}

/// Tracks outgoing messages between submission and acknowledgment.
#[derive(Debug, Clone, Default)]
pub struct ComposerController {
    in_flight: HashMap<MessageId, ConversationId>,
}

impl ComposerController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and append a pending outgoing message.
    ///
    /// Empty input is rejected before the conversation is looked up, and
    /// nothing is appended on failure.
    pub fn submit(
        &mut self,
        state: &mut AppState,
        conversation_id: &ConversationId,
        text: &str,
    ) -> Result<PendingSend, CoreError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CoreError::Validation("message text is empty".into()));
        }
        if !state.conversations.contains(conversation_id) {
            return Err(CoreError::conversation_not_found(conversation_id));
        }

        let message = Message::outgoing(conversation_id.clone(), text, Utc::now());
        let pending = PendingSend {
            conversation_id: conversation_id.clone(),
            message_id: message.id.clone(),
            text: text.to_string(),
        };
        state.append_message(conversation_id, message)?;
        self.in_flight
            .insert(pending.message_id.clone(), conversation_id.clone());

        info!(
            conversation_id = %conversation_id,
            message_id = %pending.message_id,
            "Message submitted"
        );
        Ok(pending)
    }

    /// Apply the transport's answer to a pending message.
    ///
    /// Returns the message's final status.
    pub fn complete(
        &mut self,
        state: &mut AppState,
        conversation_id: &ConversationId,
        message_id: &MessageId,
        result: Result<SendReceipt, TransportError>,
    ) -> Result<MessageStatus, CoreError> {
        self.in_flight.remove(message_id);
        match result {
            Ok(receipt) => {
                debug!(message_id = %message_id, remote_id = %receipt.remote_id, "Send acknowledged");
                state.confirm_sent(conversation_id, message_id, receipt)?;
                Ok(MessageStatus::Sent)
            }
            Err(error) => {
                warn!(conversation_id = %conversation_id, message_id = %message_id, %error, "Send failed");
                state.update_message_status(conversation_id, message_id, MessageStatus::Failed)?;
                Ok(MessageStatus::Failed)
            }
        }
    }

    /// Submit the text of a failed message again as a new message.
    ///
    /// The failed message stays in the thread unchanged.
    pub fn resend(
        &mut self,
        state: &mut AppState,
        conversation_id: &ConversationId,
        failed_message_id: &MessageId,
    ) -> Result<PendingSend, CoreError> {
        let message = state
            .messages
            .get_message(conversation_id, failed_message_id)
            .ok_or_else(|| CoreError::message_not_found(conversation_id, failed_message_id))?;
        if message.status != MessageStatus::Failed || !message.is_outgoing() {
            return Err(CoreError::InvalidTransition {
                message_id: failed_message_id.clone(),
                from: message.status,
                to: MessageStatus::Pending,
            });
        }
        let text = message.text.clone();
        debug!(message_id = %failed_message_id, "Resending failed message");
        self.submit(state, conversation_id, &text)
    }

    /// Number of sends still waiting for the transport.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_in_flight(&self, message_id: &MessageId) -> bool {
        self.in_flight.contains_key(message_id)
    }
}
