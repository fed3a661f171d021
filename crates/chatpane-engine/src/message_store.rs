//! Per-conversation message threads.
//!
//! [`MessageStore`] keeps one ordered thread per registered conversation.
//! Messages are ordered by `created_at`, with insertion order preserved
//! among equal timestamps. Appends report an [`Activity`] that the
//! coordinator forwards to the conversation list; the store itself never
//! touches conversations.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::CoreError;
use crate::model::{ConversationId, Direction, Message, MessageId, MessageStatus, SendReceipt};

/// Thread activity to be reflected in the conversation list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    pub conversation_id: ConversationId,
    pub direction: Direction,
    pub text: String,
    pub created_at: DateTime<Utc>,
    /// Activity came from a history fetch rather than a live delivery.
    pub historical: bool,
}

impl Activity {
    fn from_message(message: &Message, historical: bool) -> Self {
        Self {
            conversation_id: message.conversation_id.clone(),
            direction: message.direction,
            text: message.text.clone(),
            created_at: message.created_at,
            historical,
        }
    }
}

/// Whether a thread's history has been fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    /// History has not been requested.
    #[default]
    NotLoaded,
    /// A fetch with this generation is in flight.
    Loading { generation: u64 },
    /// History has been merged into the thread.
    Loaded,
}

/// Result of merging fetched history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// History was merged.
    Applied {
        /// Number of messages that were not already in the thread.
        added: usize,
        /// Activity for the newest fetched message, if any.
        activity: Option<Activity>,
    },
    /// The thread was no longer waiting for this fetch.
    Superseded,
}

#[derive(Debug, Clone, Default)]
struct Thread {
    messages: Vec<Message>,
    load: LoadState,
}

impl Thread {
    fn contains(&self, id: &MessageId) -> bool {
        self.messages.iter().any(|m| &m.id == id)
    }

    /// Also matches local messages whose receipt carries `id` as the remote id.
    fn knows(&self, id: &MessageId) -> bool {
        self.messages.iter().any(|m| {
            &m.id == id
                || m
                    .receipt
                    .as_ref()
                    .is_some_and(|r| r.remote_id == id.as_str())
        })
    }

    /// Insert after every message with `created_at <=` the new one.
    fn insert_ordered(&mut self, message: Message) {
        let pos = self
            .messages
            .partition_point(|m| m.created_at <= message.created_at);
        self.messages.insert(pos, message);
    }
}

/// Ordered message threads keyed by conversation id.
#[derive(Debug, Clone, Default)]
pub struct MessageStore {
    threads: HashMap<ConversationId, Thread>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a conversation so it can receive messages.
    ///
    /// Returns `true` if the conversation was not registered before.
    pub fn register(&mut self, conversation_id: &ConversationId) -> bool {
        if self.threads.contains_key(conversation_id) {
            return false;
        }
        self.threads
            .insert(conversation_id.clone(), Thread::default());
        true
    }

    pub fn contains(&self, conversation_id: &ConversationId) -> bool {
        self.threads.contains_key(conversation_id)
    }

    /// Append a message to a conversation's thread.
    ///
    /// Returns the resulting activity, or `None` if a message with the same
    /// id is already in the thread.
    pub fn append_message(
        &mut self,
        conversation_id: &ConversationId,
        mut message: Message,
    ) -> Result<Option<Activity>, CoreError> {
        let thread = self
            .threads
            .get_mut(conversation_id)
            .ok_or_else(|| CoreError::conversation_not_found(conversation_id))?;

        if message.text.trim().is_empty() {
            return Err(CoreError::Validation("message text is empty".into()));
        }

        if thread.contains(&message.id) {
            debug!(conversation_id = %conversation_id, message_id = %message.id, "Ignoring duplicate message");
            return Ok(None);
        }

        normalize(&mut message, conversation_id);
        let activity = Activity::from_message(&message, false);
        debug!(
            conversation_id = %conversation_id,
            message_id = %message.id,
            direction = ?message.direction,
            "Appending message"
        );
        thread.insert_ordered(message);
        Ok(Some(activity))
    }

    /// Move a pending outgoing message to `Sent` or `Failed`.
    ///
    /// Status changes are one-shot: anything but `Pending -> Sent` or
    /// `Pending -> Failed` on an outgoing message is an `InvalidTransition`.
    pub fn update_message_status(
        &mut self,
        conversation_id: &ConversationId,
        message_id: &MessageId,
        status: MessageStatus,
    ) -> Result<(), CoreError> {
        let message = self.message_mut(conversation_id, message_id)?;
        if !message.is_outgoing()
            || message.status != MessageStatus::Pending
            || status == MessageStatus::Pending
        {
            return Err(CoreError::InvalidTransition {
                message_id: message_id.clone(),
                from: message.status,
                to: status,
            });
        }
        debug!(conversation_id = %conversation_id, message_id = %message_id, %status, "Message status changed");
        message.status = status;
        Ok(())
    }

    /// Mark a pending message as sent and record the transport receipt.
    pub fn confirm_sent(
        &mut self,
        conversation_id: &ConversationId,
        message_id: &MessageId,
        receipt: SendReceipt,
    ) -> Result<(), CoreError> {
        self.update_message_status(conversation_id, message_id, MessageStatus::Sent)?;
        self.message_mut(conversation_id, message_id)?.receipt = Some(receipt);
        Ok(())
    }

    /// The ordered thread for a conversation; empty if nothing arrived yet.
    pub fn get_thread(&self, conversation_id: &ConversationId) -> Result<&[Message], CoreError> {
        self.threads
            .get(conversation_id)
            .map(|t| t.messages.as_slice())
            .ok_or_else(|| CoreError::conversation_not_found(conversation_id))
    }

    pub fn get_message(
        &self,
        conversation_id: &ConversationId,
        message_id: &MessageId,
    ) -> Option<&Message> {
        self.threads
            .get(conversation_id)?
            .messages
            .iter()
            .find(|m| &m.id == message_id)
    }

    /// Newest failed outgoing message in a thread.
    pub fn latest_failed(&self, conversation_id: &ConversationId) -> Option<&Message> {
        self.threads
            .get(conversation_id)?
            .messages
            .iter()
            .rev()
            .find(|m| m.is_outgoing() && m.status == MessageStatus::Failed)
    }

    pub fn load_state(&self, conversation_id: &ConversationId) -> Option<LoadState> {
        self.threads.get(conversation_id).map(|t| t.load)
    }

    /// Mark a thread as waiting for a history fetch.
    pub fn begin_load(
        &mut self,
        conversation_id: &ConversationId,
        generation: u64,
    ) -> Result<(), CoreError> {
        let thread = self.thread_mut(conversation_id)?;
        thread.load = LoadState::Loading { generation };
        Ok(())
    }

    /// Merge fetched history into a thread that is waiting for `generation`.
    ///
    /// Messages already present (by id or remote id) and messages with empty
    /// text are skipped.
    pub fn finish_load(
        &mut self,
        conversation_id: &ConversationId,
        generation: u64,
        history: Vec<Message>,
    ) -> Result<LoadOutcome, CoreError> {
        let thread = self.thread_mut(conversation_id)?;
        if thread.load != (LoadState::Loading { generation }) {
            return Ok(LoadOutcome::Superseded);
        }

        let mut added = 0;
        let mut newest: Option<Activity> = None;
        for mut message in history {
            if message.text.trim().is_empty() || thread.knows(&message.id) {
                continue;
            }
            normalize(&mut message, conversation_id);
            if newest
                .as_ref()
                .map_or(true, |n| message.created_at >= n.created_at)
            {
                newest = Some(Activity::from_message(&message, true));
            }
            thread.insert_ordered(message);
            added += 1;
        }
        thread.load = LoadState::Loaded;
        debug!(conversation_id = %conversation_id, added, "Thread history merged");

        Ok(LoadOutcome::Applied {
            added,
            activity: newest,
        })
    }

    /// Return a thread to `NotLoaded` if it is still waiting for `generation`.
    pub fn abandon_load(&mut self, conversation_id: &ConversationId, generation: u64) {
        if let Some(thread) = self.threads.get_mut(conversation_id) {
            if thread.load == (LoadState::Loading { generation }) {
                thread.load = LoadState::NotLoaded;
            }
        }
    }

    fn thread_mut(&mut self, conversation_id: &ConversationId) -> Result<&mut Thread, CoreError> {
        self.threads
            .get_mut(conversation_id)
            .ok_or_else(|| CoreError::conversation_not_found(conversation_id))
    }

    fn message_mut(
        &mut self,
        conversation_id: &ConversationId,
        message_id: &MessageId,
    ) -> Result<&mut Message, CoreError> {
        self.thread_mut(conversation_id)?
            .messages
            .iter_mut()
            .find(|m| &m.id == message_id)
            .ok_or_else(|| CoreError::message_not_found(conversation_id, message_id))
    }
}

/// Bind a message to its thread. Incoming messages are always `Sent`.
fn normalize(message: &mut Message, conversation_id: &ConversationId) {
    message.conversation_id = conversation_id.clone();
    if message.direction == Direction::Incoming {
        message.status = MessageStatus::Sent;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn conv() -> ConversationId {
        "1".into()
    }

    fn store() -> MessageStore {
        let mut store = MessageStore::new();
        store.register(&conv());
        store
    }

    fn incoming(id: &str, text: &str, at: i64) -> Message {
        Message::incoming(id, conv(), text, ts(at))
    }

    #[test]
    fn test_append_unknown_conversation() {
        let mut store = MessageStore::new();
        let err = store
            .append_message(&"nope".into(), incoming("m1", "hi", 1))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_append_orders_by_created_at_then_insertion() {
        let mut store = store();
        for (id, at) in [("a", 5), ("b", 3), ("c", 5), ("d", 1), ("e", 3), ("f", 9)] {
            store.append_message(&conv(), incoming(id, id, at)).unwrap();
        }

        let thread = store.get_thread(&conv()).unwrap();
        let ids: Vec<&str> = thread.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["d", "b", "e", "a", "c", "f"]);
        assert!(thread.windows(2).all(|w| w[0].created_at <= w[1].created_at));
    }

    #[test]
    fn test_append_order_holds_for_many_sequences() {
        let sequences: [&[i64]; 6] = [
            &[1, 2, 3, 4, 5],
            &[5, 4, 3, 2, 1],
            &[3, 3, 3, 3],
            &[2, 7, 2, 1, 7, 7, 0, 2],
            &[9, 1, 9, 1, 5, 5, 9],
            &[4, 0, 8, 0, 4, 8, 4],
        ];
        for timestamps in sequences {
            let mut store = store();
            for (i, &at) in timestamps.iter().enumerate() {
                let id = format!("m{i}");
                store.append_message(&conv(), incoming(&id, "x", at)).unwrap();
            }

            let thread = store.get_thread(&conv()).unwrap();
            assert_eq!(thread.len(), timestamps.len());
            for pair in thread.windows(2) {
                assert!(pair[0].created_at <= pair[1].created_at, "{timestamps:?}");
                if pair[0].created_at == pair[1].created_at {
                    let index = |m: &Message| m.id.as_str()[1..].parse::<usize>().unwrap();
                    assert!(index(&pair[0]) < index(&pair[1]), "{timestamps:?}");
                }
            }
        }
    }

    #[test]
    fn test_append_returns_activity() {
        let mut store = store();
        let activity = store
            .append_message(&conv(), incoming("m1", "hello", 7))
            .unwrap()
            .unwrap();
        assert_eq!(activity.conversation_id, conv());
        assert_eq!(activity.text, "hello");
        assert_eq!(activity.created_at, ts(7));
        assert!(!activity.historical);
    }

    #[test]
    fn test_append_duplicate_is_ignored() {
        let mut store = store();
        store.append_message(&conv(), incoming("m1", "hello", 7)).unwrap();
        let second = store.append_message(&conv(), incoming("m1", "hello", 7)).unwrap();
        assert!(second.is_none());
        assert_eq!(store.get_thread(&conv()).unwrap().len(), 1);
    }

    #[test]
    fn test_append_rejects_empty_text() {
        let mut store = store();
        let err = store.append_message(&conv(), incoming("m1", "  ", 1)).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(store.get_thread(&conv()).unwrap().is_empty());
    }

    #[test]
    fn test_get_thread_empty_for_known_conversation() {
        let store = store();
        assert!(store.get_thread(&conv()).unwrap().is_empty());
        assert!(store.get_thread(&"other".into()).is_err());
    }

    #[test]
    fn test_status_transition_is_one_shot() {
        let mut store = store();
        let msg = Message::outgoing(conv(), "hi", ts(1));
        let id = msg.id.clone();
        store.append_message(&conv(), msg).unwrap();

        store
            .update_message_status(&conv(), &id, MessageStatus::Sent)
            .unwrap();
        let err = store
            .update_message_status(&conv(), &id, MessageStatus::Failed)
            .unwrap_err();

        assert_eq!(
            err,
            CoreError::InvalidTransition {
                message_id: id.clone(),
                from: MessageStatus::Sent,
                to: MessageStatus::Failed,
            }
        );
        assert_eq!(
            store.get_message(&conv(), &id).unwrap().status,
            MessageStatus::Sent
        );
    }

    #[test]
    fn test_status_back_to_pending_rejected() {
        let mut store = store();
        let msg = Message::outgoing(conv(), "hi", ts(1));
        let id = msg.id.clone();
        store.append_message(&conv(), msg).unwrap();

        let err = store
            .update_message_status(&conv(), &id, MessageStatus::Pending)
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));
    }

    #[test]
    fn test_status_incoming_rejected() {
        let mut store = store();
        store.append_message(&conv(), incoming("m1", "hi", 1)).unwrap();
        let err = store
            .update_message_status(&conv(), &"m1".into(), MessageStatus::Failed)
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));
    }

    #[test]
    fn test_incoming_arrives_as_sent() {
        let mut store = store();
        let mut msg = incoming("m1", "hi", 1);
        msg.status = MessageStatus::Pending;
        store.append_message(&conv(), msg).unwrap();

        assert_eq!(
            store.get_message(&conv(), &"m1".into()).unwrap().status,
            MessageStatus::Sent
        );
        let err = store
            .update_message_status(&conv(), &"m1".into(), MessageStatus::Failed)
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));
        assert_eq!(
            store.get_message(&conv(), &"m1".into()).unwrap().status,
            MessageStatus::Sent
        );
    }

    #[test]
    fn test_fetched_incoming_arrives_as_sent() {
        let mut store = store();
        let mut msg = incoming("h1", "from history", 1);
        msg.status = MessageStatus::Failed;
        store.begin_load(&conv(), 1).unwrap();
        store.finish_load(&conv(), 1, vec![msg]).unwrap();

        assert_eq!(
            store.get_message(&conv(), &"h1".into()).unwrap().status,
            MessageStatus::Sent
        );
    }

    #[test]
    fn test_status_unknown_ids() {
        let mut store = store();
        let err = store
            .update_message_status(&conv(), &"ghost".into(), MessageStatus::Sent)
            .unwrap_err();
        assert!(err.is_not_found());
        let err = store
            .update_message_status(&"nope".into(), &"ghost".into(), MessageStatus::Sent)
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_confirm_sent_records_receipt() {
        let mut store = store();
        let msg = Message::outgoing(conv(), "hi", ts(1));
        let id = msg.id.clone();
        store.append_message(&conv(), msg).unwrap();

        let receipt = SendReceipt {
            remote_id: "srv-1".into(),
            created_at: ts(2),
        };
        store.confirm_sent(&conv(), &id, receipt.clone()).unwrap();

        let stored = store.get_message(&conv(), &id).unwrap();
        assert_eq!(stored.status, MessageStatus::Sent);
        assert_eq!(stored.receipt, Some(receipt));
    }

    #[test]
    fn test_latest_failed() {
        let mut store = store();
        let first = Message::outgoing(conv(), "one", ts(1));
        let second = Message::outgoing(conv(), "two", ts(2));
        let (first_id, second_id) = (first.id.clone(), second.id.clone());
        store.append_message(&conv(), first).unwrap();
        store.append_message(&conv(), second).unwrap();
        assert!(store.latest_failed(&conv()).is_none());

        store
            .update_message_status(&conv(), &first_id, MessageStatus::Failed)
            .unwrap();
        store
            .update_message_status(&conv(), &second_id, MessageStatus::Failed)
            .unwrap();
        assert_eq!(store.latest_failed(&conv()).unwrap().text, "two");
    }

    #[test]
    fn test_finish_load_merges_and_dedupes() {
        let mut store = store();
        store.append_message(&conv(), incoming("live", "live one", 50)).unwrap();
        store.begin_load(&conv(), 1).unwrap();

        let outcome = store
            .finish_load(
                &conv(),
                1,
                vec![
                    incoming("h1", "first", 10),
                    incoming("live", "live one", 50),
                    incoming("h2", "", 20),
                    incoming("h3", "third", 30),
                ],
            )
            .unwrap();

        let LoadOutcome::Applied { added, activity } = outcome else {
            panic!("expected history to apply");
        };
        assert_eq!(added, 2);
        let activity = activity.unwrap();
        assert_eq!(activity.text, "third");
        assert!(activity.historical);

        let ids: Vec<&str> = store
            .get_thread(&conv())
            .unwrap()
            .iter()
            .map(|m| m.id.as_str())
            .collect();
        assert_eq!(ids, vec!["h1", "h3", "live"]);
        assert_eq!(store.load_state(&conv()), Some(LoadState::Loaded));
    }

    #[test]
    fn test_finish_load_skips_confirmed_sends() {
        let mut store = store();
        let msg = Message::outgoing(conv(), "sent early", ts(5));
        let id = msg.id.clone();
        store.append_message(&conv(), msg).unwrap();
        store
            .confirm_sent(
                &conv(),
                &id,
                SendReceipt {
                    remote_id: "srv-9".into(),
                    created_at: ts(5),
                },
            )
            .unwrap();

        let mut echoed = Message::outgoing(conv(), "sent early", ts(5));
        echoed.id = "srv-9".into();
        echoed.status = MessageStatus::Sent;

        store.begin_load(&conv(), 1).unwrap();
        let outcome = store.finish_load(&conv(), 1, vec![echoed]).unwrap();

        assert!(matches!(outcome, LoadOutcome::Applied { added: 0, .. }));
        assert_eq!(store.get_thread(&conv()).unwrap().len(), 1);
    }

    #[test]
    fn test_finish_load_wrong_generation_superseded() {
        let mut store = store();
        store.begin_load(&conv(), 2).unwrap();
        let outcome = store
            .finish_load(&conv(), 1, vec![incoming("h1", "first", 10)])
            .unwrap();
        assert_eq!(outcome, LoadOutcome::Superseded);
        assert!(store.get_thread(&conv()).unwrap().is_empty());
        assert_eq!(
            store.load_state(&conv()),
            Some(LoadState::Loading { generation: 2 })
        );
    }

    #[test]
    fn test_abandon_load() {
        let mut store = store();
        store.begin_load(&conv(), 3).unwrap();
        store.abandon_load(&conv(), 2);
        assert_eq!(
            store.load_state(&conv()),
            Some(LoadState::Loading { generation: 3 })
        );
        store.abandon_load(&conv(), 3);
        assert_eq!(store.load_state(&conv()), Some(LoadState::NotLoaded));
    }
}
