//! Direct messaging with read tracking and live conversation views.
//!
//! Messages are ordered by server-assigned timestamp within a
//! conversation; clients render in that order regardless of how the
//! underlying push notifications arrive. All list views are derived
//! from the raw message log on demand — nothing denormalized is
//! stored.

use chrono::{DateTime, Utc};
use uuid::Uuid;
use vibecheck_core::types::UserId;

use crate::error::{Result, StoreError};
use crate::models::{ConversationSummary, Message};
use crate::store::{new_id, MemoryStore, StoreEvent, Subscription};

impl MemoryStore {
    /// Send a direct message. Text is trimmed and must be non-empty;
    /// the store assigns the timestamp and the message starts unread.
    pub fn send_message(&self, from: &UserId, to: &UserId, text: &str) -> Result<Message> {
        self.send_message_at(from, to, text, Utc::now())
    }

    /// Like [`send_message`](Self::send_message) with an explicit
    /// timestamp, for in-process callers that batch or replay.
    pub fn send_message_at(
        &self,
        from: &UserId,
        to: &UserId,
        text: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<Message> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(StoreError::EmptyMessage);
        }

        let message = Message {
            id: new_id(),
            from: from.clone(),
            to: to.clone(),
            text: trimmed.to_string(),
            participants: Message::pair(from, to),
            read: false,
            timestamp,
        };

        self.with_state(|state| {
            state.messages.push(message.clone());
            // Sender's counter feeds the social badge.
            if let Some(sender) = state.users.get_mut(from) {
                sender.messages_sent += 1;
            }
        });
        self.publish(StoreEvent::Messages);

        Ok(message)
    }

    /// All messages between exactly these two users, timestamp
    /// ascending (stable for equal timestamps).
    pub fn conversation(&self, a: &UserId, b: &UserId) -> Vec<Message> {
        self.with_state(|state| {
            let mut messages: Vec<Message> = state
                .messages
                .iter()
                .filter(|m| m.between(a, b))
                .cloned()
                .collect();
            messages.sort_by_key(|m| m.timestamp);
            messages
        })
    }

    /// Live view of a conversation: a snapshot is pushed on every new
    /// message or read-flag change between the two participants.
    pub fn subscribe_conversation(
        &self,
        viewer: &UserId,
        other: &UserId,
    ) -> Subscription<Vec<Message>> {
        let (viewer, other) = (viewer.clone(), other.clone());
        self.subscribe_with(
            move |store| store.conversation(&viewer, &other),
            |event| matches!(event, StoreEvent::Messages),
        )
    }

    /// Flip a message's read flag to true. Already-read messages are a
    /// no-op, never an error; the flag never reverses.
    pub fn mark_read(&self, message_id: Uuid) -> Result<()> {
        let changed = self.with_state(|state| {
            let message = state
                .messages
                .iter_mut()
                .find(|m| m.id == message_id)
                .ok_or(StoreError::MessageNotFound(message_id))?;
            if message.read {
                return Ok(false);
            }
            message.read = true;
            Ok::<_, StoreError>(true)
        })?;

        if changed {
            self.publish(StoreEvent::Messages);
        }
        Ok(())
    }

    /// Count of messages addressed to `user` that are still unread.
    pub fn unread_count(&self, user: &UserId) -> usize {
        self.with_state(|state| {
            state
                .messages
                .iter()
                .filter(|m| &m.to == user && !m.read)
                .count()
        })
    }

    /// Reactive unread count: updates as messages arrive or get read.
    pub fn subscribe_unread_count(&self, user: &UserId) -> Subscription<usize> {
        let user = user.clone();
        self.subscribe_with(
            move |store| store.unread_count(&user),
            |event| matches!(event, StoreEvent::Messages),
        )
    }

    /// Conversation list for `user`: one entry per counterpart with
    /// the most recent message's text and timestamp, newest first.
    /// `unread` is set when that latest message is inbound and unread.
    pub fn conversations(&self, user: &UserId) -> Vec<ConversationSummary> {
        self.with_state(|state| {
            let mut involving: Vec<&Message> = state
                .messages
                .iter()
                .filter(|m| m.involves(user))
                .collect();
            involving.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

            let mut summaries: Vec<ConversationSummary> = Vec::new();
            for message in involving {
                let counterpart = message.counterpart(user);
                if summaries.iter().any(|s| &s.user_id == counterpart) {
                    continue;
                }
                summaries.push(ConversationSummary {
                    user_id: counterpart.clone(),
                    last_message: message.text.clone(),
                    timestamp: message.timestamp,
                    unread: &message.to == user && !message.read,
                });
            }
            summaries
        })
    }

    /// Reactive conversation list.
    pub fn subscribe_conversations(
        &self,
        user: &UserId,
    ) -> Subscription<Vec<ConversationSummary>> {
        let user = user.clone();
        self.subscribe_with(
            move |store| store.conversations(&user),
            |event| matches!(event, StoreEvent::Messages),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn setup() -> (MemoryStore, UserId, UserId) {
        let store = MemoryStore::new();
        let alice = UserId::from("alice");
        let bob = UserId::from("bob");
        store.create_user(&alice, "alice", "US");
        store.create_user(&bob, "bob", "SE");
        (store, alice, bob)
    }

    #[test]
    fn empty_text_rejected() {
        let (store, alice, bob) = setup();
        assert_eq!(
            store.send_message(&alice, &bob, "   "),
            Err(StoreError::EmptyMessage)
        );
        assert_eq!(
            store.send_message(&alice, &bob, ""),
            Err(StoreError::EmptyMessage)
        );
    }

    #[test]
    fn send_trims_and_starts_unread() {
        let (store, alice, bob) = setup();
        let msg = store.send_message(&alice, &bob, "  hey bob  ").unwrap();
        assert_eq!(msg.text, "hey bob");
        assert!(!msg.read);
        assert_eq!(msg.participants, Message::pair(&bob, &alice));
        assert_eq!(store.get_user(&alice).unwrap().messages_sent, 1);
    }

    #[test]
    fn conversation_ordered_by_timestamp_regardless_of_insertion() {
        let (store, alice, bob) = setup();
        let base = Utc::now();
        let t1 = base;
        let t2 = base + Duration::seconds(10);
        let t3 = base + Duration::seconds(20);

        // Insert out of order.
        store.send_message_at(&alice, &bob, "second", t2).unwrap();
        store.send_message_at(&bob, &alice, "third", t3).unwrap();
        store.send_message_at(&alice, &bob, "first", t1).unwrap();

        let texts: Vec<String> = store
            .conversation(&alice, &bob)
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[test]
    fn conversation_excludes_third_parties() {
        let (store, alice, bob) = setup();
        let carol = UserId::from("carol");
        store.create_user(&carol, "carol", "DE");

        store.send_message(&alice, &bob, "to bob").unwrap();
        store.send_message(&alice, &carol, "to carol").unwrap();
        store.send_message(&carol, &bob, "carol to bob").unwrap();

        let between = store.conversation(&alice, &bob);
        assert_eq!(between.len(), 1);
        assert_eq!(between[0].text, "to bob");
    }

    #[test]
    fn unread_count_and_mark_read() {
        let (store, alice, bob) = setup();
        let m1 = store.send_message(&alice, &bob, "one").unwrap();
        let m2 = store.send_message(&alice, &bob, "two").unwrap();
        store.send_message(&bob, &alice, "reply").unwrap();

        assert_eq!(store.unread_count(&bob), 2);
        assert_eq!(store.unread_count(&alice), 1);

        store.mark_read(m1.id).unwrap();
        assert_eq!(store.unread_count(&bob), 1);

        store.mark_read(m2.id).unwrap();
        assert_eq!(store.unread_count(&bob), 0);

        // Marking again is a no-op, not an error.
        store.mark_read(m2.id).unwrap();
        assert_eq!(store.unread_count(&bob), 0);
    }

    #[test]
    fn mark_read_unknown_message() {
        let (store, _, _) = setup();
        let err = store.mark_read(Uuid::new_v4());
        assert!(matches!(err, Err(StoreError::MessageNotFound(_))));
    }

    #[test]
    fn conversations_keep_latest_per_counterpart() {
        let (store, alice, bob) = setup();
        let carol = UserId::from("carol");
        store.create_user(&carol, "carol", "DE");
        let base = Utc::now();

        store
            .send_message_at(&bob, &alice, "old from bob", base)
            .unwrap();
        store
            .send_message_at(&bob, &alice, "new from bob", base + Duration::seconds(5))
            .unwrap();
        store
            .send_message_at(&alice, &carol, "to carol", base + Duration::seconds(8))
            .unwrap();

        let convs = store.conversations(&alice);
        assert_eq!(convs.len(), 2);
        // Newest conversation first.
        assert_eq!(convs[0].user_id, carol);
        assert_eq!(convs[0].last_message, "to carol");
        // Outbound latest message: not unread.
        assert!(!convs[0].unread);

        assert_eq!(convs[1].user_id, bob);
        assert_eq!(convs[1].last_message, "new from bob");
        // Latest inbound message still unread.
        assert!(convs[1].unread);
    }

    #[test]
    fn conversations_unread_clears_after_read() {
        let (store, alice, bob) = setup();
        let msg = store.send_message(&bob, &alice, "ping").unwrap();

        assert!(store.conversations(&alice)[0].unread);
        store.mark_read(msg.id).unwrap();
        assert!(!store.conversations(&alice)[0].unread);
    }

    #[tokio::test]
    async fn conversation_subscription_pushes_updates() {
        let (store, alice, bob) = setup();
        let mut sub = store.subscribe_conversation(&alice, &bob);

        let initial = sub.next().await.unwrap();
        assert!(initial.is_empty());

        store.send_message(&alice, &bob, "hello").unwrap();
        let after_send = sub.next().await.unwrap();
        assert_eq!(after_send.len(), 1);
        assert!(!after_send[0].read);

        store.mark_read(after_send[0].id).unwrap();
        let after_read = sub.next().await.unwrap();
        assert!(after_read[0].read);
    }

    #[tokio::test]
    async fn unread_subscription_tracks_count() {
        let (store, alice, bob) = setup();
        let mut sub = store.subscribe_unread_count(&bob);
        assert_eq!(sub.next().await, Some(0));

        store.send_message(&alice, &bob, "one").unwrap();
        assert_eq!(sub.next().await, Some(1));

        let msgs = store.conversation(&alice, &bob);
        store.mark_read(msgs[0].id).unwrap();
        assert_eq!(sub.next().await, Some(0));
    }
}
