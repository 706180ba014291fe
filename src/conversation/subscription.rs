//! Per-conversation event subscriptions.

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::warn;

use super::types::ConversationEvent;
use crate::ids::ConversationId;

/// A live view of one conversation.
///
/// Receives only events for its conversation. [`close`](Self::close) drops
/// the underlying receiver immediately; later calls to
/// [`recv`](Self::recv) return `None`.
pub struct ConversationSubscription {
    conversation_id: ConversationId,
    receiver: Option<broadcast::Receiver<ConversationEvent>>,
}

impl ConversationSubscription {
    pub(crate) fn new(
        conversation_id: ConversationId,
        receiver: broadcast::Receiver<ConversationEvent>,
    ) -> Self {
        Self {
            conversation_id,
            receiver: Some(receiver),
        }
    }

    /// The conversation this subscription watches.
    #[must_use]
    pub const fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    /// Waits for the next event of this conversation.
    ///
    /// Returns `None` once closed or when the manager is gone.
    pub async fn recv(&mut self) -> Option<ConversationEvent> {
        loop {
            let receiver = self.receiver.as_mut()?;
            match receiver.recv().await {
                Ok(event) if event.conversation_id() == &self.conversation_id => {
                    return Some(event);
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(conversation = %self.conversation_id, skipped, "Subscription lagged");
                }
                Err(RecvError::Closed) => {
                    self.receiver = None;
                    return None;
                }
            }
        }
    }

    /// Returns the next already-delivered event without waiting.
    pub fn try_recv(&mut self) -> Option<ConversationEvent> {
        loop {
            let receiver = self.receiver.as_mut()?;
            match receiver.try_recv() {
                Ok(event) if event.conversation_id() == &self.conversation_id => {
                    return Some(event);
                }
                Ok(_) => {}
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(conversation = %self.conversation_id, skipped, "Subscription lagged");
                }
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Closed) => {
                    self.receiver = None;
                    return None;
                }
            }
        }
    }

    /// Tears the subscription down.
    pub fn close(&mut self) {
        self.receiver = None;
    }

    /// Whether [`close`](Self::close) was called or the manager is gone.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.receiver.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn filters_other_conversations() {
        let (tx, rx) = broadcast::channel(8);
        let mine = ConversationId::new("mine");
        let mut subscription = ConversationSubscription::new(mine.clone(), rx);

        tx.send(ConversationEvent::Accepted(ConversationId::new("other")))
            .unwrap();
        tx.send(ConversationEvent::Declined(mine.clone())).unwrap();

        assert_eq!(
            subscription.recv().await,
            Some(ConversationEvent::Declined(mine))
        );
    }

    #[test]
    fn close_is_synchronous() {
        let (tx, rx) = broadcast::channel(8);
        let id = ConversationId::new("c-1");
        let mut subscription = ConversationSubscription::new(id.clone(), rx);

        subscription.close();

        assert!(subscription.is_closed());
        assert_eq!(tx.receiver_count(), 0);
        assert!(tx.send(ConversationEvent::Accepted(id)).is_err());
        assert_eq!(subscription.try_recv(), None);
    }

    #[tokio::test]
    async fn ends_when_sender_dropped() {
        let (tx, rx) = broadcast::channel::<ConversationEvent>(8);
        let mut subscription = ConversationSubscription::new(ConversationId::new("c-1"), rx);

        drop(tx);

        assert_eq!(subscription.recv().await, None);
        assert!(subscription.is_closed());
    }
}
