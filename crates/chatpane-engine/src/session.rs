//! Session controller.
//!
//! A [`Session`] owns the [`AppState`], the composer and the transport. It is
//! driven from a single event loop: user actions call its methods directly,
//! while transport work runs in spawned tasks that report back as
//! [`Completion`] values over an unbounded channel. Completions are applied
//! one at a time by [`Session::handle_completion`], so state is only ever
//! mutated from the loop that owns the session.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::composer::{ComposerController, PendingSend};
use crate::config::ClientConfig;
use crate::conversation_store::UpsertOutcome;
use crate::error::CoreError;
use crate::message_store::{LoadOutcome, LoadState};
use crate::model::{Conversation, ConversationId, Message, MessageId, MessageStatus, SendReceipt};
use crate::state::AppState;
use crate::transport::{Transport, TransportError};

/// Identifies one thread fetch so a late result can be recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadToken {
    pub conversation_id: ConversationId,
    pub generation: u64,
}

/// Result of asynchronous transport work, delivered back to the session.
#[derive(Debug)]
pub enum Completion {
    /// A send finished, timed out or failed.
    Sent {
        conversation_id: ConversationId,
        message_id: MessageId,
        result: Result<SendReceipt, TransportError>,
    },
    /// A thread fetch finished.
    ThreadLoaded {
        token: LoadToken,
        result: Result<Vec<Message>, TransportError>,
    },
    /// The conversation list fetch finished.
    Conversations(Result<Vec<Conversation>, TransportError>),
    /// The transport pushed an inbound message.
    Incoming {
        conversation_id: ConversationId,
        message: Message,
    },
}

/// What applying a [`Completion`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// A pending message reached its final status.
    Sent {
        conversation_id: ConversationId,
        message_id: MessageId,
        status: MessageStatus,
        error: Option<TransportError>,
    },
    /// Fetched history was merged into the thread.
    ThreadLoaded {
        conversation_id: ConversationId,
        added: usize,
    },
    /// A fetch result arrived after the selection moved on.
    ThreadDiscarded { conversation_id: ConversationId },
    /// The thread fetch failed; a later selection retries it.
    ThreadFailed {
        conversation_id: ConversationId,
        error: TransportError,
    },
    /// Conversations from the transport were upserted.
    Conversations { applied: usize },
    ConversationsFailed(TransportError),
    /// An inbound message was appended (or ignored as a duplicate).
    Incoming {
        conversation_id: ConversationId,
        appended: bool,
    },
}

/// Single-owner controller for one client session.
pub struct Session {
    state: AppState,
    composer: ComposerController,
    transport: Arc<dyn Transport>,
    send_timeout: Duration,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
    next_generation: u64,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("composer", &self.composer)
            .field("send_timeout", &self.send_timeout)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create a session and register for inbound messages.
    pub fn new(transport: Arc<dyn Transport>, config: &ClientConfig) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();

        let incoming_tx = completions_tx.clone();
        transport.on_incoming(Box::new(move |conversation_id, message| {
            // Receiver gone means the session was dropped; nothing left to update.
            let _ = incoming_tx.send(Completion::Incoming {
                conversation_id,
                message,
            });
        }));

        info!(send_timeout_secs = config.send_timeout_secs, "Session started");
        Self {
            state: AppState::with_preview_limit(config.preview_max_chars),
            composer: ComposerController::new(),
            transport,
            send_timeout: config.send_timeout(),
            completions_tx,
            completions_rx,
            next_generation: 0,
        }
    }

    /// Override the send timeout.
    #[must_use]
    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut AppState {
        &mut self.state
    }

    pub fn composer(&self) -> &ComposerController {
        &self.composer
    }

    /// Request the conversation list from the transport.
    pub fn refresh_conversations(&self) {
        let fetch = self.transport.fetch_conversations();
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            let result = fetch.await;
            let _ = tx.send(Completion::Conversations(result));
        });
    }

    pub fn set_query(&mut self, text: &str) {
        self.state.set_query(text);
    }

    /// Select a conversation, fetching its thread on first selection.
    ///
    /// Returns the fetch token when a fetch was started.
    pub fn select_conversation(
        &mut self,
        id: &ConversationId,
    ) -> Result<Option<LoadToken>, CoreError> {
        self.state.select_conversation(id)?;
        if self.state.messages.load_state(id) != Some(LoadState::NotLoaded) {
            return Ok(None);
        }

        self.next_generation += 1;
        let token = LoadToken {
            conversation_id: id.clone(),
            generation: self.next_generation,
        };
        self.state.messages.begin_load(id, token.generation)?;
        debug!(conversation_id = %id, generation = token.generation, "Fetching thread");

        let fetch = self.transport.fetch_thread(id.clone());
        let tx = self.completions_tx.clone();
        let sent_token = token.clone();
        tokio::spawn(async move {
            let result = fetch.await;
            let _ = tx.send(Completion::ThreadLoaded {
                token: sent_token,
                result,
            });
        });
        Ok(Some(token))
    }

    /// Submit a message and dispatch it to the transport.
    pub fn submit(
        &mut self,
        conversation_id: &ConversationId,
        text: &str,
    ) -> Result<PendingSend, CoreError> {
        let pending = self.composer.submit(&mut self.state, conversation_id, text)?;
        self.dispatch(&pending);
        Ok(pending)
    }

    /// Retry a failed message as a new message.
    pub fn resend(
        &mut self,
        conversation_id: &ConversationId,
        failed_message_id: &MessageId,
    ) -> Result<PendingSend, CoreError> {
        let pending = self
            .composer
            .resend(&mut self.state, conversation_id, failed_message_id)?;
        self.dispatch(&pending);
        Ok(pending)
    }

    /// Retry the newest failed message in the selected conversation, if any.
    pub fn resend_latest_failed(&mut self) -> Result<Option<PendingSend>, CoreError> {
        let Some(conversation_id) = self.state.selected_conversation_id().cloned() else {
            return Ok(None);
        };
        let Some(failed_id) = self
            .state
            .messages
            .latest_failed(&conversation_id)
            .map(|m| m.id.clone())
        else {
            return Ok(None);
        };
        self.resend(&conversation_id, &failed_id).map(Some)
    }

    fn dispatch(&self, pending: &PendingSend) {
        let send = self
            .transport
            .send_message(pending.conversation_id.clone(), pending.text.clone());
        let timeout = self.send_timeout;
        let tx = self.completions_tx.clone();
        let conversation_id = pending.conversation_id.clone();
        let message_id = pending.message_id.clone();
        tokio::spawn(async move {
            let result = match tokio::time::timeout(timeout, send).await {
                Ok(result) => result,
                Err(_) => Err(TransportError::Timeout(timeout)),
            };
            let _ = tx.send(Completion::Sent {
                conversation_id,
                message_id,
                result,
            });
        });
    }

    /// Wait for the next completion.
    pub async fn next_completion(&mut self) -> Option<Completion> {
        self.completions_rx.recv().await
    }

    /// Take a completion if one is ready.
    pub fn try_completion(&mut self) -> Option<Completion> {
        self.completions_rx.try_recv().ok()
    }

    /// Apply every completion that is ready, in arrival order.
    pub fn drain_completions(&mut self) -> Vec<Result<CompletionOutcome, CoreError>> {
        let mut outcomes = Vec::new();
        while let Some(completion) = self.try_completion() {
            outcomes.push(self.handle_completion(completion));
        }
        outcomes
    }

    /// Apply one completion to the state.
    pub fn handle_completion(
        &mut self,
        completion: Completion,
    ) -> Result<CompletionOutcome, CoreError> {
        match completion {
            Completion::Sent {
                conversation_id,
                message_id,
                result,
            } => {
                let error = result.as_ref().err().cloned();
                let status =
                    self.composer
                        .complete(&mut self.state, &conversation_id, &message_id, result)?;
                Ok(CompletionOutcome::Sent {
                    conversation_id,
                    message_id,
                    status,
                    error,
                })
            }
            Completion::ThreadLoaded { token, result } => self.apply_thread(token, result),
            Completion::Conversations(Ok(conversations)) => {
                let mut applied = 0;
                for conversation in conversations {
                    if self.state.upsert_conversation(conversation) != UpsertOutcome::Stale {
                        applied += 1;
                    }
                }
                info!(applied, "Conversations loaded");
                Ok(CompletionOutcome::Conversations { applied })
            }
            Completion::Conversations(Err(error)) => {
                warn!(%error, "Conversation fetch failed");
                Ok(CompletionOutcome::ConversationsFailed(error))
            }
            Completion::Incoming {
                conversation_id,
                message,
            } => {
                if message.text.trim().is_empty() {
                    warn!(conversation_id = %conversation_id, message_id = %message.id, "Rejecting empty inbound message");
                    return Err(CoreError::Validation("message text is empty".into()));
                }
                if !self.state.conversations.contains(&conversation_id) {
                    info!(conversation_id = %conversation_id, "Inbound message from new conversation");
                    self.state.upsert_conversation(Conversation::new(
                        conversation_id.clone(),
                        conversation_id.as_str(),
                        message.created_at,
                    ));
                }
                let appended = self.state.append_message(&conversation_id, message)?;
                Ok(CompletionOutcome::Incoming {
                    conversation_id,
                    appended,
                })
            }
        }
    }

    fn apply_thread(
        &mut self,
        token: LoadToken,
        result: Result<Vec<Message>, TransportError>,
    ) -> Result<CompletionOutcome, CoreError> {
        let LoadToken {
            conversation_id,
            generation,
        } = token;

        if self.state.selected_conversation_id() != Some(&conversation_id) {
            debug!(conversation_id = %conversation_id, generation, "Discarding thread for deselected conversation");
            self.state.messages.abandon_load(&conversation_id, generation);
            return Ok(CompletionOutcome::ThreadDiscarded { conversation_id });
        }

        match result {
            Ok(history) => match self.state.apply_history(&conversation_id, generation, history)? {
                LoadOutcome::Applied { added, .. } => {
                    Ok(CompletionOutcome::ThreadLoaded {
                        conversation_id,
                        added,
                    })
                }
                LoadOutcome::Superseded => {
                    debug!(conversation_id = %conversation_id, generation, "Discarding superseded thread");
                    Ok(CompletionOutcome::ThreadDiscarded { conversation_id })
                }
            },
            Err(error) => {
                warn!(conversation_id = %conversation_id, %error, "Thread fetch failed");
                self.state.messages.abandon_load(&conversation_id, generation);
                Ok(CompletionOutcome::ThreadFailed {
                    conversation_id,
                    error,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTransport;
    use chrono::DateTime;

    fn ts(secs: i64) -> chrono::DateTime<chrono::Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn transport() -> MemoryTransport {
        let transport = MemoryTransport::new();
        transport.seed(
            Conversation::new("1", "Alice", ts(10)),
            vec![Message::incoming("a1", "1".into(), "hi from alice", ts(10))],
        );
        transport.seed(
            Conversation::new("2", "Bob", ts(20)),
            vec![Message::incoming("b1", "2".into(), "hi from bob", ts(20))],
        );
        transport
    }

    async fn session(transport: &MemoryTransport) -> Session {
        let mut session = Session::new(Arc::new(transport.clone()), &ClientConfig::default());
        session.refresh_conversations();
        let completion = session.next_completion().await.unwrap();
        session.handle_completion(completion).unwrap();
        session
    }

    async fn settle(session: &mut Session) -> CompletionOutcome {
        let completion = session.next_completion().await.unwrap();
        session.handle_completion(completion).unwrap()
    }

    #[tokio::test]
    async fn test_refresh_populates_list() {
        let transport = transport();
        let session = session(&transport).await;
        let names: Vec<&str> = session
            .state()
            .list_conversations()
            .iter()
            .map(|c| c.display_name.as_str())
            .collect();
        assert_eq!(names, vec!["Bob", "Alice"]);
    }

    #[tokio::test]
    async fn test_select_loads_thread_once() {
        let transport = transport();
        let mut session = session(&transport).await;

        let token = session.select_conversation(&"1".into()).unwrap();
        assert!(token.is_some());
        assert_eq!(
            settle(&mut session).await,
            CompletionOutcome::ThreadLoaded {
                conversation_id: "1".into(),
                added: 1
            }
        );
        assert_eq!(session.state().selected_thread().unwrap().len(), 1);
        assert_eq!(
            session.state().messages.load_state(&"1".into()),
            Some(LoadState::Loaded)
        );

        assert!(session.select_conversation(&"1".into()).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stale_thread_discarded() {
        let transport = transport();
        let mut session = session(&transport).await;

        session.select_conversation(&"1".into()).unwrap();
        session.select_conversation(&"2".into()).unwrap();

        let mut outcomes = vec![settle(&mut session).await, settle(&mut session).await];
        outcomes.sort_by_key(|o| matches!(o, CompletionOutcome::ThreadLoaded { .. }));

        assert_eq!(
            outcomes[0],
            CompletionOutcome::ThreadDiscarded {
                conversation_id: "1".into()
            }
        );
        assert!(matches!(outcomes[1], CompletionOutcome::ThreadLoaded { .. }));
        assert!(session.state().get_thread(&"1".into()).unwrap().is_empty());
        assert_eq!(
            session.state().messages.load_state(&"1".into()),
            Some(LoadState::NotLoaded)
        );
        assert!(session.select_conversation(&"1".into()).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_send_confirms() {
        let transport = transport();
        let mut session = session(&transport).await;

        let pending = session.submit(&"1".into(), "hello").unwrap();
        assert_eq!(
            session.state().get_thread(&"1".into()).unwrap()[0].status,
            MessageStatus::Pending
        );

        let outcome = settle(&mut session).await;
        assert!(matches!(
            outcome,
            CompletionOutcome::Sent {
                status: MessageStatus::Sent,
                error: None,
                ..
            }
        ));
        let message = session
            .state()
            .messages
            .get_message(&"1".into(), &pending.message_id)
            .unwrap();
        assert!(message.receipt.is_some());
        assert_eq!(session.composer().in_flight(), 0);
    }

    #[tokio::test]
    async fn test_send_timeout_marks_failed() {
        let transport = transport();
        transport.stall_next_sends(1);
        let mut session = session(&transport)
            .await
            .with_send_timeout(Duration::from_millis(20));

        let pending = session.submit(&"1".into(), "lost").unwrap();
        let outcome = settle(&mut session).await;

        assert_eq!(
            outcome,
            CompletionOutcome::Sent {
                conversation_id: "1".into(),
                message_id: pending.message_id.clone(),
                status: MessageStatus::Failed,
                error: Some(TransportError::Timeout(Duration::from_millis(20))),
            }
        );
    }

    #[tokio::test]
    async fn test_failed_send_can_be_resent() {
        let transport = transport();
        transport.fail_next_send(TransportError::Network("unreachable".into()));
        let mut session = session(&transport).await;
        session.select_conversation(&"1".into()).unwrap();
        settle(&mut session).await;

        let first = session.submit(&"1".into(), "again").unwrap();
        settle(&mut session).await;

        let retry = session.resend_latest_failed().unwrap().unwrap();
        assert_ne!(retry.message_id, first.message_id);
        settle(&mut session).await;

        let statuses: Vec<MessageStatus> = session
            .state()
            .selected_thread()
            .unwrap()
            .iter()
            .filter(|m| m.is_outgoing())
            .map(|m| m.status)
            .collect();
        assert_eq!(statuses, vec![MessageStatus::Failed, MessageStatus::Sent]);
    }

    #[tokio::test]
    async fn test_incoming_updates_unread() {
        let transport = transport();
        let mut session = session(&transport).await;
        session.select_conversation(&"2".into()).unwrap();
        settle(&mut session).await;

        transport.deliver_incoming(&"1".into(), "ping");
        transport.deliver_incoming(&"2".into(), "pong");
        let outcomes = session.drain_completions();
        assert_eq!(outcomes.len(), 2);

        let state = session.state();
        assert_eq!(state.conversations.get(&"1".into()).unwrap().unread_count, 1);
        assert_eq!(state.conversations.get(&"2".into()).unwrap().unread_count, 0);
        assert_eq!(
            state.conversations.get(&"1".into()).unwrap().last_message_preview,
            "ping"
        );
    }

    #[tokio::test]
    async fn test_incoming_from_unknown_conversation() {
        let transport = transport();
        let mut session = session(&transport).await;

        transport.deliver_incoming(&"3".into(), "new here");
        let outcome = settle(&mut session).await;

        assert_eq!(
            outcome,
            CompletionOutcome::Incoming {
                conversation_id: "3".into(),
                appended: true
            }
        );
        let state = session.state();
        assert_eq!(state.list_conversations()[0].display_name, "3");
        assert_eq!(state.get_thread(&"3".into()).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_blank_inbound_from_unknown_conversation_leaves_no_trace() {
        let transport = transport();
        let mut session = session(&transport).await;
        session.state_mut().render_signal_mut().mark_rendered();

        transport.deliver_incoming(&"ghost".into(), "   ");
        let completion = session.next_completion().await.unwrap();
        let err = session.handle_completion(completion).unwrap_err();

        assert!(matches!(err, CoreError::Validation(_)));
        let state = session.state();
        assert_eq!(state.conversations.len(), 2);
        assert!(!state.conversations.contains(&"ghost".into()));
        assert!(!state.render_signal().is_pending());
    }

    #[tokio::test]
    async fn test_inbound_before_refresh_is_named_by_refresh() {
        let transport = transport();
        let mut session = Session::new(Arc::new(transport.clone()), &ClientConfig::default());

        transport.deliver_incoming(&"1".into(), "early");
        settle(&mut session).await;
        assert_eq!(session.state().conversations.get(&"1".into()).unwrap().display_name, "1");

        session.refresh_conversations();
        let outcome = settle(&mut session).await;

        assert_eq!(outcome, CompletionOutcome::Conversations { applied: 2 });
        let alice = session.state().conversations.get(&"1".into()).unwrap();
        assert_eq!(alice.display_name, "Alice");
        assert_eq!(alice.last_message_preview, "early");
    }

    #[tokio::test]
    async fn test_concurrent_sends_keep_order() {
        let transport = transport();
        let mut session = session(&transport).await;

        session.submit(&"1".into(), "one").unwrap();
        session.submit(&"1".into(), "two").unwrap();
        session.submit(&"1".into(), "three").unwrap();
        for _ in 0..3 {
            settle(&mut session).await;
        }

        let thread = session.state().get_thread(&"1".into()).unwrap();
        let texts: Vec<&str> = thread.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
        assert!(thread.iter().all(|m| m.status == MessageStatus::Sent));
    }
}
