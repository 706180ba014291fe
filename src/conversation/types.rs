//! Core types for conversation admission.
//!
//! A conversation starts as a request from an initiator to a receiver.
//! Until the receiver accepts, the initiator may only send a small number
//! of messages. The receiver may reply, accept or decline at any time.

use serde::{Deserialize, Serialize};

use crate::ids::{ConversationId, IdentityId, MessageId};

/// Body of the notice recorded when a request is accepted.
pub const ACCEPTED_NOTICE: &str = "request accepted";

/// Status of a conversation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    /// Waiting for the receiver to respond.
    Pending,
    /// The receiver accepted; messaging is unrestricted.
    Accepted,
    /// The receiver declined; no further messages.
    Declined,
}

impl ConversationStatus {
    /// Converts to string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
        }
    }

    /// Parses from string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "declined" => Some(Self::Declined),
            _ => None,
        }
    }

    /// Whether the request still blocks a new one between the same pair.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Accepted)
    }
}

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Written by a participant. Counts toward the pending cap.
    User,
    /// Generated on a state change. Never counts toward the cap.
    System,
}

impl MessageKind {
    /// Converts to string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::System => "system",
        }
    }

    /// Parses from string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "system" => Some(Self::System),
            _ => None,
        }
    }
}

/// A conversation request between two identities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationRequest {
    /// Conversation identifier.
    pub conversation_id: ConversationId,
    /// Who sent the first message.
    pub initiator_id: IdentityId,
    /// Who may accept or decline.
    pub receiver_id: IdentityId,
    /// Current status.
    pub status: ConversationStatus,
    /// When the request was created (Unix timestamp).
    pub created_at: i64,
    /// When the request last changed (Unix timestamp).
    pub updated_at: i64,
}

impl ConversationRequest {
    /// Creates a pending request with a fresh id.
    #[must_use]
    pub fn new(initiator_id: IdentityId, receiver_id: IdentityId, now: i64) -> Self {
        Self {
            conversation_id: ConversationId::generate(),
            initiator_id,
            receiver_id,
            status: ConversationStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether `id` is the initiator or the receiver.
    #[must_use]
    pub fn is_participant(&self, id: &IdentityId) -> bool {
        &self.initiator_id == id || &self.receiver_id == id
    }

    /// The participant that is not `id`.
    #[must_use]
    pub fn other_participant(&self, id: &IdentityId) -> Option<&IdentityId> {
        if &self.initiator_id == id {
            Some(&self.receiver_id)
        } else if &self.receiver_id == id {
            Some(&self.initiator_id)
        } else {
            None
        }
    }

    /// Order-independent key for the participant pair.
    #[must_use]
    pub fn pair_key(&self) -> String {
        pair_key(&self.initiator_id, &self.receiver_id)
    }
}

/// Order-independent key for an unordered pair of identities.
///
/// The lower id is length-prefixed, so ids containing the separator map to
/// distinct keys.
#[must_use]
pub fn pair_key(a: &IdentityId, b: &IdentityId) -> String {
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    format!("{}:{}|{}", low.as_str().len(), low.as_str(), high.as_str())
}

/// A message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message identifier.
    pub message_id: MessageId,
    /// Owning conversation.
    pub conversation_id: ConversationId,
    /// Author.
    pub sender_id: IdentityId,
    /// Text body.
    pub content: String,
    /// User or system message.
    pub kind: MessageKind,
    /// When the message was recorded (Unix timestamp).
    pub created_at: i64,
    /// Whether the other participant has read it.
    pub read: bool,
}

impl Message {
    /// Creates an unread user message.
    #[must_use]
    pub fn user(
        conversation_id: ConversationId,
        sender_id: IdentityId,
        content: impl Into<String>,
        now: i64,
    ) -> Self {
        Self::with_kind(conversation_id, sender_id, content, MessageKind::User, now)
    }

    /// Creates an unread system message.
    #[must_use]
    pub fn system(
        conversation_id: ConversationId,
        sender_id: IdentityId,
        content: impl Into<String>,
        now: i64,
    ) -> Self {
        Self::with_kind(conversation_id, sender_id, content, MessageKind::System, now)
    }

    fn with_kind(
        conversation_id: ConversationId,
        sender_id: IdentityId,
        content: impl Into<String>,
        kind: MessageKind,
        now: i64,
    ) -> Self {
        Self {
            message_id: MessageId::generate(),
            conversation_id,
            sender_id,
            content: content.into(),
            kind,
            created_at: now,
            read: false,
        }
    }
}

/// A conversation as shown in the conversation list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSummary {
    /// The request.
    pub request: ConversationRequest,
    /// Messages from the other participant not yet read.
    pub unread_count: usize,
    /// Most recent message.
    pub last_message: Option<Message>,
}

/// Result of [`initiate`](super::ConversationManager::initiate).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Initiated {
    /// The new or reused conversation.
    pub conversation_id: ConversationId,
    /// The stored message.
    pub message: Message,
    /// `true` when an active conversation already existed.
    pub reused: bool,
}

/// Change notifications for open conversation views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationEvent {
    /// A request was created.
    Created(ConversationRequest),
    /// A message was stored.
    MessageAdded(Message),
    /// The receiver accepted.
    Accepted(ConversationId),
    /// The receiver declined. Views of this conversation should close.
    Declined(ConversationId),
    /// `reader` marked `count` messages as read.
    Read {
        /// Conversation.
        conversation_id: ConversationId,
        /// Who read.
        reader: IdentityId,
        /// Messages marked.
        count: usize,
    },
}

impl ConversationEvent {
    /// The conversation this event belongs to.
    #[must_use]
    pub const fn conversation_id(&self) -> &ConversationId {
        match self {
            Self::Created(request) => &request.conversation_id,
            Self::MessageAdded(message) => &message.conversation_id,
            Self::Accepted(id) | Self::Declined(id) => id,
            Self::Read {
                conversation_id, ..
            } => conversation_id,
        }
    }
}
