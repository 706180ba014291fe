//! High-level conversation API.
//!
//! [`ConversationManager`] applies the admission rules on top of a
//! [`ConversationStore`] and broadcasts a [`ConversationEvent`] after every
//! committed change.
//!
//! # Admission Rules
//!
//! | Caller | Status | Send | Accept / Decline |
//! |--------|--------|------|------------------|
//! | initiator | Pending | up to the cap | `NotReceiver` |
//! | receiver | Pending | always | allowed |
//! | either | Accepted | always | `NoLongerPending` |
//! | either | Declined | `NoLongerPending` | `NoLongerPending` |

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::error::{ConversationError, Result};
use super::storage::{AppendOutcome, ConversationStore, CreateOutcome};
use super::subscription::ConversationSubscription;
use super::types::{
    ConversationEvent, ConversationRequest, ConversationStatus, ConversationSummary, Initiated,
    Message, ACCEPTED_NOTICE,
};
use crate::config::ProximityConfig;
use crate::identity::{Session, SessionIdentity};
use crate::ids::{ConversationId, IdentityId};

const EVENT_CAPACITY: usize = 256;

/// High-level API for two-party conversations.
///
/// # Example
///
/// ```ignore
/// use nearby_core::conversation::ConversationManager;
///
/// let manager = ConversationManager::new(store, &config);
/// let started = manager.initiate(&alice, &bob_id, "Hi, saw you nearby")?;
/// manager.accept(&bob, &started.conversation_id)?;
/// ```
pub struct ConversationManager {
    store: Arc<dyn ConversationStore>,
    pending_message_cap: usize,
    events: broadcast::Sender<ConversationEvent>,
}

impl ConversationManager {
    /// Creates a manager over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn ConversationStore>, config: &ProximityConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store,
            pending_message_cap: config.pending_message_cap,
            events,
        }
    }

    /// Messages the initiator may send before the receiver accepts.
    #[must_use]
    pub const fn pending_message_cap(&self) -> usize {
        self.pending_message_cap
    }

    // ==================== Admission ====================

    /// Starts a conversation with `receiver`, or continues the active one.
    ///
    /// When an active conversation between the pair already exists (found
    /// up front or reported by the store as a conflict), `content` is sent
    /// into it instead and [`Initiated::reused`] is set.
    ///
    /// # Errors
    ///
    /// - [`ConversationError::Unauthenticated`], [`ConversationError::EmptyMessage`],
    ///   [`ConversationError::SelfConversation`]
    /// - on reuse, any error of [`send`](Self::send), including
    ///   [`ConversationError::MessageLimitReached`]
    pub fn initiate(
        &self,
        session: &Session,
        receiver: &IdentityId,
        content: &str,
    ) -> Result<Initiated> {
        let local = session.require()?;
        let content = normalize(content)?;
        if &local.id == receiver {
            return Err(ConversationError::SelfConversation);
        }

        if let Some(existing) = self.store.find_active_between(&local.id, receiver)? {
            return self.continue_existing(local, receiver, &existing, content);
        }

        let now = Utc::now().timestamp();
        let request = ConversationRequest::new(local.id.clone(), receiver.clone(), now);
        let message = Message::user(
            request.conversation_id.clone(),
            local.id.clone(),
            content,
            now,
        );

        match self.store.create_conversation(&request, &message)? {
            CreateOutcome::Created => {
                info!(
                    conversation = %request.conversation_id,
                    initiator = %local.id,
                    receiver = %receiver,
                    "Conversation requested"
                );
                let conversation_id = request.conversation_id.clone();
                self.emit(ConversationEvent::Created(request));
                self.emit(ConversationEvent::MessageAdded(message.clone()));
                Ok(Initiated {
                    conversation_id,
                    message,
                    reused: false,
                })
            }
            CreateOutcome::AlreadyExists(existing) => {
                debug!(
                    conversation = %existing.conversation_id,
                    "Concurrent request detected; reusing"
                );
                self.continue_existing(local, receiver, &existing, content)
            }
        }
    }

    fn continue_existing(
        &self,
        local: &SessionIdentity,
        receiver: &IdentityId,
        existing: &ConversationRequest,
        content: &str,
    ) -> Result<Initiated> {
        if existing.other_participant(&local.id) != Some(receiver) {
            warn!(
                conversation = %existing.conversation_id,
                "Active request found for a different pair"
            );
            return Err(ConversationError::NotParticipant);
        }
        let message = self.append(local, existing, content)?;
        Ok(Initiated {
            conversation_id: existing.conversation_id.clone(),
            message,
            reused: true,
        })
    }

    /// Sends a message into a conversation.
    ///
    /// # Errors
    ///
    /// - [`ConversationError::NotFound`], [`ConversationError::NotParticipant`]
    /// - [`ConversationError::NoLongerPending`] if the request was declined
    /// - [`ConversationError::MessageLimitReached`] if the initiator already
    ///   sent the maximum while pending
    pub fn send(
        &self,
        session: &Session,
        conversation_id: &ConversationId,
        content: &str,
    ) -> Result<Message> {
        let local = session.require()?;
        let content = normalize(content)?;
        let request = self.load_for(local, conversation_id)?;
        self.append(local, &request, content)
    }

    fn append(
        &self,
        local: &SessionIdentity,
        request: &ConversationRequest,
        content: &str,
    ) -> Result<Message> {
        if !request.status.is_active() {
            return Err(ConversationError::NoLongerPending(
                request.conversation_id.clone(),
            ));
        }

        let message = Message::user(
            request.conversation_id.clone(),
            local.id.clone(),
            content,
            Utc::now().timestamp(),
        );

        match self
            .store
            .append_message(&message, Some(self.pending_message_cap))?
        {
            AppendOutcome::Appended => {
                debug!(conversation = %request.conversation_id, sender = %local.id, "Message stored");
                self.emit(ConversationEvent::MessageAdded(message.clone()));
                Ok(message)
            }
            AppendOutcome::NotActive => {
                debug!(conversation = %request.conversation_id, "Declined before the message was stored");
                Err(ConversationError::NoLongerPending(
                    request.conversation_id.clone(),
                ))
            }
            AppendOutcome::LimitReached => {
                warn!(
                    conversation = %request.conversation_id,
                    limit = self.pending_message_cap,
                    "Pending message limit reached"
                );
                Err(ConversationError::MessageLimitReached {
                    limit: self.pending_message_cap,
                })
            }
        }
    }

    /// Accepts a pending request. The system notice for the initiator is
    /// stored together with the status change.
    ///
    /// # Errors
    ///
    /// - [`ConversationError::NotFound`], [`ConversationError::NotParticipant`]
    /// - [`ConversationError::NotReceiver`] if the caller is the initiator
    /// - [`ConversationError::NoLongerPending`] if already accepted or declined
    pub fn accept(
        &self,
        session: &Session,
        conversation_id: &ConversationId,
    ) -> Result<ConversationRequest> {
        let local = session.require()?;
        let notice = Message::system(
            conversation_id.clone(),
            local.id.clone(),
            ACCEPTED_NOTICE,
            Utc::now().timestamp(),
        );
        let request = self.respond(
            local,
            conversation_id,
            ConversationStatus::Accepted,
            Some(&notice),
        )?;

        info!(conversation = %conversation_id, "Conversation accepted");
        self.emit(ConversationEvent::Accepted(conversation_id.clone()));
        self.emit(ConversationEvent::MessageAdded(notice));

        Ok(request)
    }

    /// Declines a pending request. Open views receive
    /// [`ConversationEvent::Declined`].
    ///
    /// # Errors
    ///
    /// Same as [`accept`](Self::accept).
    pub fn decline(
        &self,
        session: &Session,
        conversation_id: &ConversationId,
    ) -> Result<ConversationRequest> {
        let local = session.require()?;
        let request = self.respond(local, conversation_id, ConversationStatus::Declined, None)?;

        info!(conversation = %conversation_id, "Conversation declined");
        self.emit(ConversationEvent::Declined(conversation_id.clone()));

        Ok(request)
    }

    fn respond(
        &self,
        local: &SessionIdentity,
        conversation_id: &ConversationId,
        to: ConversationStatus,
        notice: Option<&Message>,
    ) -> Result<ConversationRequest> {
        let mut request = self.load_for(local, conversation_id)?;

        if request.receiver_id != local.id {
            return Err(ConversationError::NotReceiver);
        }
        if request.status != ConversationStatus::Pending {
            return Err(ConversationError::NoLongerPending(conversation_id.clone()));
        }
        if !self
            .store
            .update_status(conversation_id, ConversationStatus::Pending, to, notice)?
        {
            // Responded to concurrently.
            return Err(ConversationError::NoLongerPending(conversation_id.clone()));
        }

        request.status = to;
        request.updated_at = Utc::now().timestamp();
        Ok(request)
    }

    // ==================== Reading ====================

    /// Marks messages from the other participant as read.
    ///
    /// Returns how many messages changed.
    ///
    /// # Errors
    ///
    /// [`ConversationError::NotFound`] or [`ConversationError::NotParticipant`].
    pub fn mark_read(&self, session: &Session, conversation_id: &ConversationId) -> Result<usize> {
        let local = session.require()?;
        self.load_for(local, conversation_id)?;

        let count = self.store.mark_read(conversation_id, &local.id)?;
        if count > 0 {
            self.emit(ConversationEvent::Read {
                conversation_id: conversation_id.clone(),
                reader: local.id.clone(),
                count,
            });
        }
        Ok(count)
    }

    /// Unread messages from the other participant in one conversation.
    ///
    /// # Errors
    ///
    /// [`ConversationError::NotFound`] or [`ConversationError::NotParticipant`].
    pub fn unread_count(
        &self,
        session: &Session,
        conversation_id: &ConversationId,
    ) -> Result<usize> {
        let local = session.require()?;
        self.load_for(local, conversation_id)?;
        Ok(self.store.unread_count(conversation_id, &local.id)?)
    }

    /// Unread messages across all of the caller's conversations.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn total_unread(&self, session: &Session) -> Result<usize> {
        let local = session.require()?;
        let mut total = 0;
        for request in self.store.list_conversations_for(&local.id)? {
            total += self
                .store
                .unread_count(&request.conversation_id, &local.id)?;
        }
        Ok(total)
    }

    /// Messages of a conversation in order.
    ///
    /// # Errors
    ///
    /// [`ConversationError::NotFound`] or [`ConversationError::NotParticipant`].
    pub fn messages(
        &self,
        session: &Session,
        conversation_id: &ConversationId,
    ) -> Result<Vec<Message>> {
        let local = session.require()?;
        self.load_for(local, conversation_id)?;
        Ok(self.store.list_messages(conversation_id)?)
    }

    /// The caller's conversations, most recently active first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn conversations(&self, session: &Session) -> Result<Vec<ConversationSummary>> {
        let local = session.require()?;

        self.store
            .list_conversations_for(&local.id)?
            .into_iter()
            .map(|request| {
                let unread_count = self
                    .store
                    .unread_count(&request.conversation_id, &local.id)?;
                let last_message = self.store.list_messages(&request.conversation_id)?.pop();
                Ok(ConversationSummary {
                    request,
                    unread_count,
                    last_message,
                })
            })
            .collect()
    }

    /// One conversation the caller takes part in.
    ///
    /// # Errors
    ///
    /// [`ConversationError::NotFound`] or [`ConversationError::NotParticipant`].
    pub fn get_conversation(
        &self,
        session: &Session,
        conversation_id: &ConversationId,
    ) -> Result<ConversationRequest> {
        let local = session.require()?;
        self.load_for(local, conversation_id)
    }

    /// Opens a live view of one conversation's events.
    ///
    /// # Errors
    ///
    /// [`ConversationError::NotFound`] or [`ConversationError::NotParticipant`].
    pub fn subscribe(
        &self,
        session: &Session,
        conversation_id: &ConversationId,
    ) -> Result<ConversationSubscription> {
        let local = session.require()?;
        self.load_for(local, conversation_id)?;
        Ok(ConversationSubscription::new(
            conversation_id.clone(),
            self.events.subscribe(),
        ))
    }

    fn load_for(
        &self,
        local: &SessionIdentity,
        conversation_id: &ConversationId,
    ) -> Result<ConversationRequest> {
        let request = self
            .store
            .get_conversation(conversation_id)?
            .ok_or_else(|| ConversationError::NotFound(conversation_id.clone()))?;

        if !request.is_participant(&local.id) {
            return Err(ConversationError::NotParticipant);
        }
        Ok(request)
    }

    fn emit(&self, event: ConversationEvent) {
        // No open views is not an error.
        let _ = self.events.send(event);
    }
}

fn normalize(content: &str) -> Result<&str> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(ConversationError::EmptyMessage);
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::storage::ConversationStorage;
    use crate::conversation::types::MessageKind;

    fn manager() -> ConversationManager {
        ConversationManager::new(
            Arc::new(ConversationStorage::in_memory().unwrap()),
            &ProximityConfig::default(),
        )
    }

    fn alice() -> Session {
        Session::authenticated("alice", "alice")
    }

    fn bob() -> Session {
        Session::authenticated("bob", "bob")
    }

    fn bob_id() -> IdentityId {
        IdentityId::new("bob")
    }

    #[test]
    fn initiate_creates_pending_request() {
        let manager = manager();
        let started = manager.initiate(&alice(), &bob_id(), "  hi  ").unwrap();

        assert!(!started.reused);
        assert_eq!(started.message.content, "hi");
        let request = manager
            .get_conversation(&bob(), &started.conversation_id)
            .unwrap();
        assert_eq!(request.status, ConversationStatus::Pending);
        assert_eq!(request.initiator_id, IdentityId::new("alice"));
    }

    #[test]
    fn initiate_rejects_self_and_empty() {
        let manager = manager();
        assert_eq!(
            manager.initiate(&alice(), &IdentityId::new("alice"), "hi"),
            Err(ConversationError::SelfConversation)
        );
        assert_eq!(
            manager.initiate(&alice(), &bob_id(), "   "),
            Err(ConversationError::EmptyMessage)
        );
    }

    #[test]
    fn anonymous_session_is_rejected_everywhere() {
        let manager = manager();
        let anon = Session::anonymous();
        let id = ConversationId::new("c-1");

        assert_eq!(
            manager.initiate(&anon, &bob_id(), "hi"),
            Err(ConversationError::Unauthenticated)
        );
        assert_eq!(
            manager.send(&anon, &id, "hi"),
            Err(ConversationError::Unauthenticated)
        );
        assert_eq!(
            manager.total_unread(&anon),
            Err(ConversationError::Unauthenticated)
        );
        assert!(matches!(
            manager.subscribe(&anon, &id),
            Err(ConversationError::Unauthenticated)
        ));
    }

    #[test]
    fn second_initiate_reuses_and_counts_once() {
        let manager = manager();
        let first = manager.initiate(&alice(), &bob_id(), "one").unwrap();
        let second = manager.initiate(&alice(), &bob_id(), "two").unwrap();

        assert!(second.reused);
        assert_eq!(second.conversation_id, first.conversation_id);
        assert_eq!(
            manager.initiate(&alice(), &bob_id(), "three"),
            Err(ConversationError::MessageLimitReached { limit: 2 })
        );
        assert_eq!(
            manager
                .messages(&alice(), &first.conversation_id)
                .unwrap()
                .len(),
            2
        );
    }

    #[test]
    fn receiver_initiating_reuses_existing_request() {
        let manager = manager();
        let first = manager.initiate(&alice(), &bob_id(), "hi").unwrap();
        let reply = manager
            .initiate(&bob(), &IdentityId::new("alice"), "hello")
            .unwrap();

        assert!(reply.reused);
        assert_eq!(reply.conversation_id, first.conversation_id);
    }

    #[test]
    fn only_receiver_can_respond() {
        let manager = manager();
        let started = manager.initiate(&alice(), &bob_id(), "hi").unwrap();
        let carol = Session::authenticated("carol", "carol");

        assert_eq!(
            manager.accept(&alice(), &started.conversation_id),
            Err(ConversationError::NotReceiver)
        );
        assert_eq!(
            manager.decline(&carol, &started.conversation_id),
            Err(ConversationError::NotParticipant)
        );
    }

    #[test]
    fn accept_records_system_notice() {
        let manager = manager();
        let started = manager.initiate(&alice(), &bob_id(), "hi").unwrap();

        let accepted = manager.accept(&bob(), &started.conversation_id).unwrap();
        assert_eq!(accepted.status, ConversationStatus::Accepted);

        let messages = manager.messages(&alice(), &started.conversation_id).unwrap();
        let notice = messages.last().unwrap();
        assert_eq!(notice.kind, MessageKind::System);
        assert_eq!(notice.content, ACCEPTED_NOTICE);
        assert_eq!(
            manager
                .unread_count(&alice(), &started.conversation_id)
                .unwrap(),
            1
        );
    }

    #[test]
    fn responding_twice_is_no_longer_pending() {
        let manager = manager();
        let started = manager.initiate(&alice(), &bob_id(), "hi").unwrap();
        manager.decline(&bob(), &started.conversation_id).unwrap();

        assert_eq!(
            manager.accept(&bob(), &started.conversation_id),
            Err(ConversationError::NoLongerPending(
                started.conversation_id.clone()
            ))
        );
        assert_eq!(
            manager.send(&bob(), &started.conversation_id, "wait"),
            Err(ConversationError::NoLongerPending(
                started.conversation_id.clone()
            ))
        );
    }

    #[test]
    fn unknown_conversation_is_not_found() {
        let manager = manager();
        let id = ConversationId::new("missing");
        assert_eq!(
            manager.send(&alice(), &id, "hi"),
            Err(ConversationError::NotFound(id.clone()))
        );
        assert_eq!(
            manager.mark_read(&alice(), &id),
            Err(ConversationError::NotFound(id))
        );
    }

    /// Delegates to an in-memory store with scripted interference.
    struct Scripted {
        inner: ConversationStorage,
        decline_after_load: std::sync::atomic::AtomicBool,
        fail_status_change: bool,
    }

    impl Scripted {
        fn new(fail_status_change: bool) -> Self {
            Self {
                inner: ConversationStorage::in_memory().unwrap(),
                decline_after_load: std::sync::atomic::AtomicBool::new(false),
                fail_status_change,
            }
        }
    }

    impl ConversationStore for Scripted {
        fn create_conversation(
            &self,
            request: &ConversationRequest,
            first: &Message,
        ) -> crate::store::StoreResult<CreateOutcome> {
            self.inner.create_conversation(request, first)
        }
        fn get_conversation(
            &self,
            id: &ConversationId,
        ) -> crate::store::StoreResult<Option<ConversationRequest>> {
            let loaded = self.inner.get_conversation(id)?;
            // Another caller declines right after this read.
            if self
                .decline_after_load
                .swap(false, std::sync::atomic::Ordering::SeqCst)
            {
                self.inner.update_status(
                    id,
                    ConversationStatus::Pending,
                    ConversationStatus::Declined,
                    None,
                )?;
            }
            Ok(loaded)
        }
        fn find_active_between(
            &self,
            a: &IdentityId,
            b: &IdentityId,
        ) -> crate::store::StoreResult<Option<ConversationRequest>> {
            self.inner.find_active_between(a, b)
        }
        fn list_conversations_for(
            &self,
            id: &IdentityId,
        ) -> crate::store::StoreResult<Vec<ConversationRequest>> {
            self.inner.list_conversations_for(id)
        }
        fn update_status(
            &self,
            id: &ConversationId,
            from: ConversationStatus,
            to: ConversationStatus,
            notice: Option<&Message>,
        ) -> crate::store::StoreResult<bool> {
            if self.fail_status_change {
                return Err(crate::store::StoreError::Unavailable("disk full".to_string()));
            }
            self.inner.update_status(id, from, to, notice)
        }
        fn append_message(
            &self,
            message: &Message,
            cap: Option<usize>,
        ) -> crate::store::StoreResult<AppendOutcome> {
            self.inner.append_message(message, cap)
        }
        fn list_messages(&self, id: &ConversationId) -> crate::store::StoreResult<Vec<Message>> {
            self.inner.list_messages(id)
        }
        fn mark_read(
            &self,
            id: &ConversationId,
            reader: &IdentityId,
        ) -> crate::store::StoreResult<usize> {
            self.inner.mark_read(id, reader)
        }
        fn unread_count(
            &self,
            id: &ConversationId,
            reader: &IdentityId,
        ) -> crate::store::StoreResult<usize> {
            self.inner.unread_count(id, reader)
        }
    }

    #[test]
    fn decline_between_load_and_append_rejects_message() {
        let store = Arc::new(Scripted::new(false));
        let manager = ConversationManager::new(store.clone(), &ProximityConfig::default());
        let started = manager.initiate(&alice(), &bob_id(), "hi").unwrap();

        store
            .decline_after_load
            .store(true, std::sync::atomic::Ordering::SeqCst);
        assert_eq!(
            manager.send(&bob(), &started.conversation_id, "sure"),
            Err(ConversationError::NoLongerPending(
                started.conversation_id.clone()
            ))
        );
        assert_eq!(
            store.list_messages(&started.conversation_id).unwrap().len(),
            1
        );
    }

    #[test]
    fn failed_accept_leaves_request_pending() {
        let store = Arc::new(Scripted::new(true));
        let manager = ConversationManager::new(store.clone(), &ProximityConfig::default());
        let started = manager.initiate(&alice(), &bob_id(), "hi").unwrap();
        let mut view = manager.subscribe(&bob(), &started.conversation_id).unwrap();

        assert!(matches!(
            manager.accept(&bob(), &started.conversation_id),
            Err(ConversationError::Storage(_))
        ));

        let request = manager
            .get_conversation(&bob(), &started.conversation_id)
            .unwrap();
        assert_eq!(request.status, ConversationStatus::Pending);
        assert_eq!(
            store.list_messages(&started.conversation_id).unwrap().len(),
            1
        );
        assert!(view.try_recv().is_none());
    }

    #[test]
    fn colliding_looking_ids_stay_separate() {
        let manager = manager();
        let a = Session::authenticated("a", "a");
        let ab = Session::authenticated("a|b", "ab");

        let first = manager.initiate(&a, &IdentityId::new("b|c"), "hi").unwrap();
        let second = manager.initiate(&ab, &IdentityId::new("c"), "hello").unwrap();

        assert!(!second.reused);
        assert_ne!(first.conversation_id, second.conversation_id);
        assert_eq!(manager.messages(&a, &first.conversation_id).unwrap().len(), 1);
    }

    #[test]
    fn store_failures_surface_as_storage_errors() {
        use crate::store::{StoreError, StoreResult};

        struct Offline;

        impl ConversationStore for Offline {
            fn create_conversation(
                &self,
                _: &ConversationRequest,
                _: &Message,
            ) -> StoreResult<CreateOutcome> {
                Err(StoreError::Unavailable("offline".to_string()))
            }
            fn get_conversation(&self, _: &ConversationId) -> StoreResult<Option<ConversationRequest>> {
                Err(StoreError::Unavailable("offline".to_string()))
            }
            fn find_active_between(
                &self,
                _: &IdentityId,
                _: &IdentityId,
            ) -> StoreResult<Option<ConversationRequest>> {
                Err(StoreError::Unavailable("offline".to_string()))
            }
            fn list_conversations_for(&self, _: &IdentityId) -> StoreResult<Vec<ConversationRequest>> {
                Err(StoreError::Unavailable("offline".to_string()))
            }
            fn update_status(
                &self,
                _: &ConversationId,
                _: ConversationStatus,
                _: ConversationStatus,
                _: Option<&Message>,
            ) -> StoreResult<bool> {
                Err(StoreError::Unavailable("offline".to_string()))
            }
            fn append_message(&self, _: &Message, _: Option<usize>) -> StoreResult<AppendOutcome> {
                Err(StoreError::Unavailable("offline".to_string()))
            }
            fn list_messages(&self, _: &ConversationId) -> StoreResult<Vec<Message>> {
                Err(StoreError::Unavailable("offline".to_string()))
            }
            fn mark_read(&self, _: &ConversationId, _: &IdentityId) -> StoreResult<usize> {
                Err(StoreError::Unavailable("offline".to_string()))
            }
            fn unread_count(&self, _: &ConversationId, _: &IdentityId) -> StoreResult<usize> {
                Err(StoreError::Unavailable("offline".to_string()))
            }
        }

        let manager = ConversationManager::new(Arc::new(Offline), &ProximityConfig::default());
        assert_eq!(
            manager.initiate(&alice(), &bob_id(), "hi"),
            Err(ConversationError::Storage(
                "Store unavailable: offline".to_string()
            ))
        );
    }
}
