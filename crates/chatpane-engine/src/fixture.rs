//! Seed data loader.
//!
//! Fixtures are JSON arrays of flat message records, one per message, in the
//! shape a WhatsApp-style webhook processor stores them:
//!
//! ```json
//! [{"wa_id": "919937320320", "name": "Ravi Kumar", "number": "919937320320",
//!   "text": "Hi", "timestamp": 1754400000, "direction": "in", "status": "read",
//!   "msg_id": "wamid.HBgM..."}]
//! ```
//!
//! Records are grouped by `wa_id` into conversations and time-ordered threads.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::conversation_store::DEFAULT_PREVIEW_MAX_CHARS;
use crate::memory::MemoryTransport;
use crate::model::{
    preview_text, Conversation, ConversationId, Direction, Message, MessageId, MessageStatus,
};

/// Errors that can occur when loading a fixture.
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("failed to read fixture {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse fixture: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid fixture record {index}: {reason}")]
    Invalid { index: usize, reason: String },
}

#[derive(Debug, Clone, Deserialize)]
struct FixtureRecord {
    wa_id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    number: Option<String>,
    #[serde(default)]
    text: String,
    timestamp: i64,
    #[serde(default = "default_direction")]
    direction: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    msg_id: Option<String>,
    #[serde(default)]
    id: Option<String>,
}

fn default_direction() -> String {
    "in".into()
}

/// One conversation and its history.
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureConversation {
    pub conversation: Conversation,
    pub messages: Vec<Message>,
}

/// Conversations grouped from a set of message records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fixture {
    pub conversations: Vec<FixtureConversation>,
}

impl Fixture {
    /// Load a fixture file.
    pub fn load(path: &Path) -> Result<Self, FixtureError> {
        let content = std::fs::read_to_string(path).map_err(|source| FixtureError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let fixture = Self::from_json(&content)?;
        debug!(path = %path.display(), conversations = fixture.conversations.len(), "Fixture loaded");
        Ok(fixture)
    }

    /// Parse fixture JSON.
    pub fn from_json(json: &str) -> Result<Self, FixtureError> {
        let records: Vec<FixtureRecord> = serde_json::from_str(json)?;
        Self::from_records(records)
    }

    /// The demo data shipped with the binary.
    pub fn demo() -> Result<Self, FixtureError> {
        Self::from_json(DEMO_FIXTURE)
    }

    /// Seed a memory transport with every conversation in this fixture.
    pub fn seed(&self, transport: &MemoryTransport) {
        for entry in &self.conversations {
            transport.seed(entry.conversation.clone(), entry.messages.clone());
        }
    }

    fn from_records(records: Vec<FixtureRecord>) -> Result<Self, FixtureError> {
        let mut grouped: BTreeMap<String, Vec<(usize, FixtureRecord)>> = BTreeMap::new();
        for (index, record) in records.into_iter().enumerate() {
            if record.wa_id.trim().is_empty() {
                return Err(FixtureError::Invalid {
                    index,
                    reason: "missing wa_id".into(),
                });
            }
            grouped
                .entry(record.wa_id.clone())
                .or_default()
                .push((index, record));
        }

        let mut conversations = Vec::with_capacity(grouped.len());
        for (wa_id, records) in grouped {
            conversations.push(build_conversation(wa_id, records)?);
        }
        Ok(Self { conversations })
    }
}

fn build_conversation(
    wa_id: String,
    records: Vec<(usize, FixtureRecord)>,
) -> Result<FixtureConversation, FixtureError> {
    let conversation_id = ConversationId::new(wa_id.as_str());
    let mut name = None;
    let mut number = None;
    let mut messages = Vec::with_capacity(records.len());

    for (position, (index, record)) in records.into_iter().enumerate() {
        let created_at = timestamp(index, record.timestamp)?;
        let direction = match record.direction.as_str() {
            "in" | "incoming" => Direction::Incoming,
            "out" | "outgoing" => Direction::Outgoing,
            other => {
                return Err(FixtureError::Invalid {
                    index,
                    reason: format!("unknown direction {other:?}"),
                })
            }
        };
        if name.is_none() {
            name = record.name.filter(|n| !n.trim().is_empty());
        }
        if number.is_none() {
            number = record.number.filter(|n| !n.trim().is_empty());
        }
        if record.text.trim().is_empty() {
            warn!(conversation_id = %conversation_id, index, "Skipping fixture record without text");
            continue;
        }

        let id = record
            .msg_id
            .or(record.id)
            .unwrap_or_else(|| format!("{wa_id}-{position}"));
        let status = match (direction, record.status.as_deref()) {
            (Direction::Outgoing, Some("failed")) => MessageStatus::Failed,
            _ => MessageStatus::Sent,
        };
        messages.push(Message {
            id: MessageId::new(id),
            conversation_id: conversation_id.clone(),
            direction,
            text: record.text,
            status,
            created_at,
            receipt: None,
        });
    }

    messages.sort_by_key(|m| m.created_at);

    let display_name = name.or_else(|| number.clone()).unwrap_or_else(|| wa_id.clone());
    let last_activity_at = messages
        .last()
        .map_or(DateTime::<Utc>::UNIX_EPOCH, |m| m.created_at);
    let mut conversation = Conversation::new(conversation_id, display_name, last_activity_at);
    if let Some(last) = messages.last() {
        conversation = conversation.with_preview(preview_text(&last.text, DEFAULT_PREVIEW_MAX_CHARS));
    }
    if let Some(number) = number {
        conversation = conversation.with_address(number);
    }

    Ok(FixtureConversation {
        conversation,
        messages,
    })
}

fn timestamp(index: usize, secs: i64) -> Result<DateTime<Utc>, FixtureError> {
    DateTime::from_timestamp(secs, 0).ok_or_else(|| FixtureError::Invalid {
        index,
        reason: format!("timestamp {secs} out of range"),
    })
}

const DEMO_FIXTURE: &str = r#"[
  {"wa_id": "919937320320", "name": "Ravi Kumar", "number": "919937320320",
   "text": "Hi, I'd like to know more about your services.", "timestamp": 1754400000,
   "direction": "in", "status": "read", "msg_id": "demo-ravi-1"},
  {"wa_id": "919937320320", "name": "Ravi Kumar", "number": "919937320320",
   "text": "Hi Ravi! Sure, I'd be happy to help. What would you like to know?",
   "timestamp": 1754400020, "direction": "out", "status": "read", "msg_id": "demo-ravi-2"},
  {"wa_id": "929967673820", "name": "Neha Joshi", "number": "929967673820",
   "text": "Hi, I saw your ad. Can you share more details?", "timestamp": 1754401000,
   "direction": "in", "status": "delivered", "msg_id": "demo-neha-1"},
  {"wa_id": "929967673820", "name": "Neha Joshi", "number": "929967673820",
   "text": "Hi Neha! Absolutely. We offer curated home decor pieces.",
   "timestamp": 1754401030, "direction": "out", "status": "delivered", "msg_id": "demo-neha-2"},
  {"wa_id": "918888777666", "name": "Aisha Khan", "number": "918888777666",
   "text": "Is the order shipped yet?", "timestamp": 1754399000,
   "direction": "in", "status": "read", "msg_id": "demo-aisha-1"}
]"#;
