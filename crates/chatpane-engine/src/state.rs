//! Session-wide application state.
//!
//! [`AppState`] is the single root that owns the conversation list, the
//! message threads and the search filter. It is also the coordinator between
//! the stores: thread activity reported by the [`MessageStore`] is applied to
//! the [`ConversationStore`] here, so neither store reaches into the other.
//!
//! Every mutation that changes what the renderer would draw raises the
//! [`RenderSignal`].

use tracing::debug;

use crate::conversation_store::{ConversationStore, UpsertOutcome};
use crate::error::CoreError;
use crate::message_store::{Activity, LoadOutcome, MessageStore};
use crate::model::{Conversation, ConversationId, Message, MessageId, MessageStatus, SendReceipt};
use crate::search::SearchFilter;

/// Monotonic counter bumped whenever state visible to the renderer changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderSignal {
    generation: u64,
    rendered: u64,
}

impl RenderSignal {
    /// Request a render.
    pub fn raise(&mut self) {
        self.generation += 1;
    }

    /// Current generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Check whether state changed since the last [`Self::mark_rendered`].
    pub fn is_pending(&self) -> bool {
        self.generation != self.rendered
    }

    /// Record that the current generation has been drawn.
    pub fn mark_rendered(&mut self) {
        self.rendered = self.generation;
    }
}

/// Root state for one client session.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub conversations: ConversationStore,
    pub messages: MessageStore,
    pub search: SearchFilter,
    render: RenderSignal,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create state whose conversation previews are truncated to `preview_max_chars`.
    pub fn with_preview_limit(preview_max_chars: usize) -> Self {
        Self {
            conversations: ConversationStore::with_preview_limit(preview_max_chars),
            ..Self::default()
        }
    }

    pub fn render_signal(&self) -> &RenderSignal {
        &self.render
    }

    pub fn render_signal_mut(&mut self) -> &mut RenderSignal {
        &mut self.render
    }

    /// Insert or replace a conversation and give it a thread.
    pub fn upsert_conversation(&mut self, conversation: Conversation) -> UpsertOutcome {
        let id = conversation.id.clone();
        let outcome = self.conversations.upsert_conversation(conversation);
        if outcome != UpsertOutcome::Stale {
            self.messages.register(&id);
            self.render.raise();
        }
        outcome
    }

    /// Select a conversation; fails with `NotFound` for an unknown id.
    pub fn select_conversation(&mut self, id: &ConversationId) -> Result<(), CoreError> {
        self.conversations.select_conversation(id)?;
        self.render.raise();
        Ok(())
    }

    pub fn selected_conversation_id(&self) -> Option<&ConversationId> {
        self.conversations.selected_id()
    }

    pub fn list_conversations(&self) -> Vec<&Conversation> {
        self.conversations.list_conversations()
    }

    /// Conversations matching the current search query, in list order.
    pub fn filtered_conversations(&self) -> impl Iterator<Item = &Conversation> + Clone + '_ {
        self.search.filtered_conversations(&self.conversations)
    }

    /// Update the search query.
    pub fn set_query(&mut self, text: &str) {
        self.search.set_query(text);
        self.render.raise();
    }

    /// Append a message and reflect it in the conversation list.
    ///
    /// Returns `false` if the message was a duplicate and nothing changed.
    pub fn append_message(
        &mut self,
        conversation_id: &ConversationId,
        message: Message,
    ) -> Result<bool, CoreError> {
        let Some(activity) = self.messages.append_message(conversation_id, message)? else {
            return Ok(false);
        };
        self.apply_activity(&activity);
        Ok(true)
    }

    /// Change a pending message's status (one-shot).
    pub fn update_message_status(
        &mut self,
        conversation_id: &ConversationId,
        message_id: &MessageId,
        status: MessageStatus,
    ) -> Result<(), CoreError> {
        self.messages
            .update_message_status(conversation_id, message_id, status)?;
        self.render.raise();
        Ok(())
    }

    /// Mark a pending message as sent with its transport receipt.
    pub fn confirm_sent(
        &mut self,
        conversation_id: &ConversationId,
        message_id: &MessageId,
        receipt: SendReceipt,
    ) -> Result<(), CoreError> {
        self.messages
            .confirm_sent(conversation_id, message_id, receipt)?;
        self.render.raise();
        Ok(())
    }

    /// The ordered thread of a conversation.
    pub fn get_thread(&self, conversation_id: &ConversationId) -> Result<&[Message], CoreError> {
        self.messages.get_thread(conversation_id)
    }

    /// The thread of the selected conversation, if any.
    pub fn selected_thread(&self) -> Option<&[Message]> {
        let id = self.conversations.selected_id()?;
        self.messages.get_thread(id).ok()
    }

    /// Merge fetched history into a thread waiting for `generation`.
    pub fn apply_history(
        &mut self,
        conversation_id: &ConversationId,
        generation: u64,
        history: Vec<Message>,
    ) -> Result<LoadOutcome, CoreError> {
        let outcome = self
            .messages
            .finish_load(conversation_id, generation, history)?;
        if let LoadOutcome::Applied { activity, .. } = &outcome {
            if let Some(activity) = activity {
                self.conversations.record_activity(activity);
            }
            self.render.raise();
        }
        Ok(outcome)
    }

    fn apply_activity(&mut self, activity: &Activity) {
        if !self.conversations.record_activity(activity) {
            debug!(conversation_id = %activity.conversation_id, "Activity dropped");
        }
        self.render.raise();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn state() -> AppState {
        let mut state = AppState::new();
        state.upsert_conversation(Conversation::new("1", "Alice", ts(10)));
        state.upsert_conversation(Conversation::new("2", "Bob", ts(20)));
        state
    }

    #[test]
    fn test_scenario_list_order() {
        let state = state();
        let names: Vec<&str> = state
            .list_conversations()
            .iter()
            .map(|c| c.display_name.as_str())
            .collect();
        assert_eq!(names, vec!["Bob", "Alice"]);
    }

    #[test]
    fn test_scenario_filter() {
        let mut state = state();
        state.set_query("ali");
        let names: Vec<&str> = state
            .filtered_conversations()
            .map(|c| c.display_name.as_str())
            .collect();
        assert_eq!(names, vec!["Alice"]);
    }

    #[test]
    fn test_upsert_registers_thread() {
        let state = state();
        assert!(state.get_thread(&"1".into()).unwrap().is_empty());
    }

    #[test]
    fn test_stale_upsert_does_not_render() {
        let mut state = state();
        let before = state.render_signal().generation();
        let outcome = state.upsert_conversation(Conversation::new("2", "Robert", ts(1)));
        assert_eq!(outcome, UpsertOutcome::Stale);
        assert_eq!(state.render_signal().generation(), before);
        assert_eq!(state.conversations.get(&"2".into()).unwrap().display_name, "Bob");
    }

    #[test]
    fn test_append_updates_conversation() {
        let mut state = state();
        let appended = state
            .append_message(&"1".into(), Message::incoming("m1", "1".into(), "ping", ts(30)))
            .unwrap();
        assert!(appended);

        let alice = state.conversations.get(&"1".into()).unwrap();
        assert_eq!(alice.last_message_preview, "ping");
        assert_eq!(alice.last_activity_at, ts(30));
        assert_eq!(alice.unread_count, 1);
        assert_eq!(state.list_conversations()[0].display_name, "Alice");
    }

    #[test]
    fn test_append_duplicate_reports_false() {
        let mut state = state();
        let msg = Message::incoming("m1", "1".into(), "ping", ts(30));
        assert!(state.append_message(&"1".into(), msg.clone()).unwrap());
        assert!(!state.append_message(&"1".into(), msg).unwrap());
    }

    #[test]
    fn test_select_raises_render() {
        let mut state = state();
        state.render_signal_mut().mark_rendered();
        assert!(!state.render_signal().is_pending());

        state.select_conversation(&"2".into()).unwrap();

        assert!(state.render_signal().is_pending());
        assert_eq!(state.selected_conversation_id(), Some(&"2".into()));
        assert!(state.selected_thread().unwrap().is_empty());
    }

    #[test]
    fn test_failed_select_does_not_render() {
        let mut state = state();
        state.render_signal_mut().mark_rendered();
        assert!(state.select_conversation(&"9".into()).is_err());
        assert!(!state.render_signal().is_pending());
        assert!(state.selected_conversation_id().is_none());
    }

    #[test]
    fn test_apply_history_updates_preview_without_unread() {
        let mut state = state();
        state.messages.begin_load(&"1".into(), 1).unwrap();
        let outcome = state
            .apply_history(
                &"1".into(),
                1,
                vec![
                    Message::incoming("h1", "1".into(), "older", ts(11)),
                    Message::incoming("h2", "1".into(), "newer", ts(12)),
                ],
            )
            .unwrap();
        assert!(matches!(outcome, LoadOutcome::Applied { added: 2, .. }));

        let alice = state.conversations.get(&"1".into()).unwrap();
        assert_eq!(alice.last_message_preview, "newer");
        assert_eq!(alice.unread_count, 0);
    }
}
