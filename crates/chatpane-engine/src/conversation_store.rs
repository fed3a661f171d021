//! Conversation list state.
//!
//! [`ConversationStore`] holds every known [`Conversation`] keyed by id, plus
//! the currently selected one. It never reads message threads; thread
//! activity reaches it as [`Activity`] events applied by the coordinator.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::CoreError;
use crate::message_store::Activity;
use crate::model::{preview_text, Conversation, ConversationId, Direction};

/// Default maximum preview length in characters.
pub const DEFAULT_PREVIEW_MAX_CHARS: usize = 40;

/// Result of an upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// A new conversation was added.
    Inserted,
    /// An existing conversation was replaced.
    Replaced,
    /// The update was older than the stored conversation and was ignored.
    Stale,
    /// The update was older, but it named a conversation that only had its
    /// id as a name. Name and address were taken; activity was kept.
    Named,
}

/// Known conversations and the current selection.
#[derive(Debug, Clone)]
pub struct ConversationStore {
    conversations: HashMap<ConversationId, Conversation>,
    selected: Option<ConversationId>,
    preview_max_chars: usize,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::with_preview_limit(DEFAULT_PREVIEW_MAX_CHARS)
    }

    /// Create a store that truncates previews to `preview_max_chars`.
    pub fn with_preview_limit(preview_max_chars: usize) -> Self {
        Self {
            conversations: HashMap::new(),
            selected: None,
            preview_max_chars,
        }
    }

    /// Insert or replace a conversation by id.
    ///
    /// An update whose `last_activity_at` is older than the stored value is
    /// rejected so activity stays monotonic. The one exception is a placeholder
    /// (named after its id, as created for an unknown sender): it takes the
    /// older record's name and address, nothing else.
    pub fn upsert_conversation(&mut self, conversation: Conversation) -> UpsertOutcome {
        match self.conversations.get_mut(&conversation.id) {
            Some(existing)
                if conversation.last_activity_at < existing.last_activity_at
                    && existing.display_name == existing.id.as_str()
                    && conversation.display_name != existing.display_name =>
            {
                debug!(
                    conversation_id = %conversation.id,
                    name = %conversation.display_name,
                    "Naming placeholder conversation"
                );
                existing.display_name = conversation.display_name;
                existing.avatar_initial = conversation.avatar_initial;
                if conversation.address.is_some() {
                    existing.address = conversation.address;
                }
                UpsertOutcome::Named
            }
            Some(existing) if conversation.last_activity_at < existing.last_activity_at => {
                warn!(
                    conversation_id = %conversation.id,
                    stored = %existing.last_activity_at,
                    incoming = %conversation.last_activity_at,
                    "Ignoring stale conversation update"
                );
                UpsertOutcome::Stale
            }
            Some(_) => {
                debug!(conversation_id = %conversation.id, "Replacing conversation");
                self.conversations.insert(conversation.id.clone(), conversation);
                UpsertOutcome::Replaced
            }
            None => {
                debug!(conversation_id = %conversation.id, "Inserting conversation");
                self.conversations.insert(conversation.id.clone(), conversation);
                UpsertOutcome::Inserted
            }
        }
    }

    /// Select a conversation and mark it read.
    ///
    /// Fails with `NotFound` for an unknown id, leaving the selection as is.
    pub fn select_conversation(&mut self, id: &ConversationId) -> Result<(), CoreError> {
        let conversation = self
            .conversations
            .get_mut(id)
            .ok_or_else(|| CoreError::conversation_not_found(id))?;
        conversation.unread_count = 0;
        self.selected = Some(id.clone());
        debug!(conversation_id = %id, "Selected conversation");
        Ok(())
    }

    /// Clear the current selection.
    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Id of the selected conversation, if any.
    pub fn selected_id(&self) -> Option<&ConversationId> {
        self.selected.as_ref()
    }

    /// The selected conversation, if any.
    pub fn selected(&self) -> Option<&Conversation> {
        self.selected.as_ref().and_then(|id| self.conversations.get(id))
    }

    pub fn is_selected(&self, id: &ConversationId) -> bool {
        self.selected.as_ref() == Some(id)
    }

    pub fn get(&self, id: &ConversationId) -> Option<&Conversation> {
        self.conversations.get(id)
    }

    pub fn contains(&self, id: &ConversationId) -> bool {
        self.conversations.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// All conversations, most recent activity first; ties broken by id.
    pub fn list_conversations(&self) -> Vec<&Conversation> {
        let mut list: Vec<&Conversation> = self.conversations.values().collect();
        list.sort_by(|a, b| {
            b.last_activity_at
                .cmp(&a.last_activity_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        list
    }

    /// Apply thread activity to the owning conversation.
    ///
    /// Preview and activity timestamp only move forward. Live incoming
    /// messages bump the unread count unless the conversation is selected.
    /// Returns `false` if the conversation is unknown.
    pub fn record_activity(&mut self, activity: &Activity) -> bool {
        let selected = self.is_selected(&activity.conversation_id);
        let Some(conversation) = self.conversations.get_mut(&activity.conversation_id) else {
            warn!(conversation_id = %activity.conversation_id, "Activity for unknown conversation");
            return false;
        };

        if activity.created_at >= conversation.last_activity_at {
            conversation.last_activity_at = activity.created_at;
            conversation.last_message_preview = preview_text(&activity.text, self.preview_max_chars);
        }

        if activity.direction == Direction::Incoming && !activity.historical && !selected {
            conversation.unread_count += 1;
        }

        true
    }
}
