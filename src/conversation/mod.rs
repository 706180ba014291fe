//! Conversation admission between nearby identities.
//!
//! A first message from an initiator creates a pending request. Until the
//! receiver accepts, the initiator may send only a small number of messages;
//! the receiver can reply, accept or decline at any time.
//!
//! # Architecture
//!
//! ```text
//! ConversationManager (admission rules, events)
//!     └── ConversationStore (pair uniqueness, message cap)
//! ```
//!
//! # Types
//!
//! - [`ConversationRequest`]: the request and its status
//! - [`Message`]: a user or system message
//! - [`ConversationSummary`]: a request with its unread count and last message
//! - [`ConversationSubscription`]: live events for one open conversation

mod error;
mod manager;
mod storage;
mod subscription;
pub mod types;

pub use error::{ConversationError, Result};
pub use manager::ConversationManager;
pub use storage::{AppendOutcome, ConversationStorage, ConversationStore, CreateOutcome};
pub use subscription::ConversationSubscription;
pub use types::{
    ConversationEvent, ConversationRequest, ConversationStatus, ConversationSummary, Initiated,
    Message, MessageKind,
};
