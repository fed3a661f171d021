//! In-process loopback transport.
//!
//! [`MemoryTransport`] keeps conversations and threads in memory. It backs
//! the demo client and the session tests: sends resolve after a configurable
//! latency, failures can be scripted ahead of time, and inbound traffic is
//! injected with [`MemoryTransport::deliver_incoming`].

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use futures::future::{BoxFuture, FutureExt};
use tracing::{debug, info};

use crate::model::{Conversation, ConversationId, Message, MessageId, MessageStatus, SendReceipt};
use crate::transport::{IncomingHandler, Transport, TransportError};

type SharedHandler = Arc<dyn Fn(ConversationId, Message) + Send + Sync>;

#[derive(Default)]
struct Inner {
    conversations: Vec<Conversation>,
    threads: HashMap<ConversationId, Vec<Message>>,
    failures: VecDeque<TransportError>,
    stalled_sends: usize,
    handler: Option<SharedHandler>,
    sent: u64,
}

/// Loopback [`Transport`] with seeded data.
#[derive(Clone)]
pub struct MemoryTransport {
    inner: Arc<Mutex<Inner>>,
    latency: Duration,
    auto_reply: bool,
}

impl std::fmt::Debug for MemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTransport")
            .field("latency", &self.latency)
            .field("auto_reply", &self.auto_reply)
            .finish_non_exhaustive()
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTransport {
    /// Empty transport with no latency and no auto-reply.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            latency: Duration::ZERO,
            auto_reply: false,
        }
    }

    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Echo every delivered send back as an inbound message.
    #[must_use]
    pub fn with_auto_reply(mut self, auto_reply: bool) -> Self {
        self.auto_reply = auto_reply;
        self
    }

    /// Add a conversation and its stored history.
    pub fn seed(&self, conversation: Conversation, history: Vec<Message>) {
        let mut inner = self.lock();
        inner.threads.insert(conversation.id.clone(), history);
        inner.conversations.retain(|c| c.id != conversation.id);
        inner.conversations.push(conversation);
    }

    /// Make the next send fail with `error`. Failures queue up in order.
    pub fn fail_next_send(&self, error: TransportError) {
        self.lock().failures.push_back(error);
    }

    /// Make the next `count` sends never resolve.
    pub fn stall_next_sends(&self, count: usize) {
        self.lock().stalled_sends += count;
    }

    /// Inject an inbound message and notify the registered handler.
    pub fn deliver_incoming(&self, conversation_id: &ConversationId, text: &str) -> Message {
        let message = Message::incoming(MessageId::generate(), conversation_id.clone(), text, Utc::now());
        let handler = {
            let mut inner = self.lock();
            inner
                .threads
                .entry(conversation_id.clone())
                .or_default()
                .push(message.clone());
            inner.handler.clone()
        };
        match handler {
            Some(handler) => handler(conversation_id.clone(), message.clone()),
            None => debug!(conversation_id = %conversation_id, "No incoming handler registered"),
        }
        message
    }

    /// Messages stored for a conversation, including delivered sends.
    pub fn stored_thread(&self, conversation_id: &ConversationId) -> Vec<Message> {
        self.lock()
            .threads
            .get(conversation_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of sends accepted so far.
    pub fn sent_count(&self) -> u64 {
        self.lock().sent
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // No code path panics while holding the lock; recover the data if one ever does.
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn accept_send(&self, conversation_id: &ConversationId, text: &str) -> Result<SendReceipt, TransportError> {
        let mut inner = self.lock();
        if let Some(error) = inner.failures.pop_front() {
            debug!(conversation_id = %conversation_id, %error, "Scripted send failure");
            return Err(error);
        }
        if !inner.threads.contains_key(conversation_id) {
            return Err(TransportError::Rejected(format!(
                "unknown conversation {conversation_id}"
            )));
        }

        inner.sent += 1;
        let now = Utc::now();
        let receipt = SendReceipt {
            remote_id: format!("local-{}-{:08x}", now.timestamp(), inner.sent),
            created_at: now,
        };
        let mut stored = Message::outgoing(conversation_id.clone(), text, now);
        stored.id = MessageId::new(receipt.remote_id.clone());
        stored.status = MessageStatus::Sent;
        stored.receipt = Some(receipt.clone());
        if let Some(thread) = inner.threads.get_mut(conversation_id) {
            thread.push(stored);
        }
        Ok(receipt)
    }

    fn take_stall(&self) -> bool {
        let mut inner = self.lock();
        if inner.stalled_sends == 0 {
            return false;
        }
        inner.stalled_sends -= 1;
        true
    }
}

impl Transport for MemoryTransport {
    fn send_message(
        &self,
        conversation_id: ConversationId,
        text: String,
    ) -> BoxFuture<'static, Result<SendReceipt, TransportError>> {
        let this = self.clone();
        async move {
            if this.take_stall() {
                futures::future::pending::<()>().await;
            }
            if !this.latency.is_zero() {
                tokio::time::sleep(this.latency).await;
            }
            let receipt = this.accept_send(&conversation_id, &text)?;

            if this.auto_reply {
                let replier = this.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(replier.latency).await;
                    replier.deliver_incoming(&conversation_id, &format!("re: {text}"));
                });
            }
            Ok(receipt)
        }
        .boxed()
    }

    fn fetch_thread(
        &self,
        conversation_id: ConversationId,
    ) -> BoxFuture<'static, Result<Vec<Message>, TransportError>> {
        let this = self.clone();
        async move {
            if !this.latency.is_zero() {
                tokio::time::sleep(this.latency).await;
            }
            let thread = this.lock().threads.get(&conversation_id).cloned();
            thread.ok_or_else(|| TransportError::Rejected(format!("unknown conversation {conversation_id}")))
        }
        .boxed()
    }

    fn fetch_conversations(&self) -> BoxFuture<'static, Result<Vec<Conversation>, TransportError>> {
        let this = self.clone();
        async move {
            let conversations = this.lock().conversations.clone();
            Ok(conversations)
        }
        .boxed()
    }

    fn on_incoming(&self, handler: IncomingHandler) {
        info!("Incoming handler registered");
        self.lock().handler = Some(Arc::from(handler));
    }
}
