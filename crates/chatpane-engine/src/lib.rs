//! chatpane-engine: Headless core for a two-pane messaging client
//!
//! This crate holds everything that is not rendering:
//! - Conversation list, message threads and search state
//! - The outgoing message lifecycle (pending, sent, failed)
//! - The transport abstraction and an in-memory loopback transport
//! - The session controller that applies async completions
//! - Configuration and fixture loading

pub mod composer;
pub mod config;
pub mod conversation_store;
pub mod error;
pub mod fixture;
pub mod memory;
pub mod message_store;
pub mod model;
pub mod search;
pub mod session;
pub mod state;
pub mod transport;

// Re-export commonly used types
pub use composer::{ComposerController, PendingSend};
pub use config::{ClientConfig, ConfigError, DemoConfig, IconStyle, UiConfig};
pub use conversation_store::{ConversationStore, UpsertOutcome};
pub use error::{CoreError, NotFound};
pub use fixture::{Fixture, FixtureConversation, FixtureError};
pub use memory::MemoryTransport;
pub use message_store::{Activity, LoadOutcome, LoadState, MessageStore};
pub use model::{
    Conversation, ConversationId, Direction, Message, MessageId, MessageStatus, SendReceipt,
};
pub use search::SearchFilter;
pub use session::{Completion, CompletionOutcome, LoadToken, Session};
pub use state::{AppState, RenderSignal};
pub use transport::{IncomingHandler, Transport, TransportError};

/// Returns the engine version.
pub fn engine_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
