//! Search filter over the conversation list.

use crate::conversation_store::ConversationStore;
use crate::model::Conversation;

/// Case-insensitive substring filter on conversation display names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    query: String,
}

impl SearchFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a normalized (trimmed, lowercased) query.
    pub fn set_query(&mut self, text: &str) {
        self.query = normalize(text);
    }

    /// The normalized query; empty when no filter is active.
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_active(&self) -> bool {
        !self.query.is_empty()
    }

    /// Check whether a conversation matches the current query.
    pub fn matches(&self, conversation: &Conversation) -> bool {
        self.query.is_empty() || conversation.display_name.to_lowercase().contains(&self.query)
    }

    /// Conversations matching the query, in list order.
    ///
    /// The iterator is computed fresh from the store on every call and can be
    /// cloned to restart it.
    pub fn filtered_conversations<'a>(
        &'a self,
        store: &'a ConversationStore,
    ) -> impl Iterator<Item = &'a Conversation> + Clone + 'a {
        store
            .list_conversations()
            .into_iter()
            .filter(move |c| self.matches(c))
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}
