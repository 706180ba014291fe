//! Error types for conversation operations.

use thiserror::Error;

use crate::identity::Unauthenticated;
use crate::ids::ConversationId;
use crate::store::StoreError;

/// Error type for conversation operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversationError {
    /// No logged-in identity.
    #[error("Not authenticated")]
    Unauthenticated,

    /// Conversation not found.
    #[error("Conversation not found: {0}")]
    NotFound(ConversationId),

    /// The request was already accepted or declined.
    #[error("Conversation is no longer pending: {0}")]
    NoLongerPending(ConversationId),

    /// Only the receiver may respond to a request.
    #[error("Only the receiver can respond to this request")]
    NotReceiver,

    /// The caller is not one of the two participants.
    #[error("Not a participant in this conversation")]
    NotParticipant,

    /// A conversation needs two distinct identities.
    #[error("Cannot start a conversation with yourself")]
    SelfConversation,

    /// Message content was empty or whitespace only.
    #[error("Message is empty")]
    EmptyMessage,

    /// The initiator already sent the maximum number of messages while the
    /// request is pending.
    #[error("Message limit reached: at most {limit} messages before the request is accepted")]
    MessageLimitReached {
        /// Allowed message count while pending.
        limit: usize,
    },

    /// Storage operation failed.
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type alias for conversation operations.
pub type Result<T> = std::result::Result<T, ConversationError>;

impl From<Unauthenticated> for ConversationError {
    fn from(_: Unauthenticated) -> Self {
        Self::Unauthenticated
    }
}

impl From<StoreError> for ConversationError {
    fn from(err: StoreError) -> Self {
        Self::Storage(err.to_string())
    }
}
