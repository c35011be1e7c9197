//! The in-memory pub/sub document store.
//!
//! [`MemoryStore`] owns four collections behind one mutex and a
//! broadcast channel of change events. Every mutation completes fully
//! under the lock before its event is published, so a subscriber never
//! observes a half-applied update (a scoring event's score fields,
//! history entry, achievements and XP land as one unit).
//!
//! Subscriptions follow an observer model: `subscribe(query)` hands
//! back a stream of freshly computed snapshots, and dropping the
//! handle unsubscribes. Nothing here depends on a vendor client
//! library; any pub/sub-capable store could sit behind the same
//! interface.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;
use vibecheck_core::types::UserId;

use crate::models::{Message, ScoreHistoryEntry, Upvote, User};

/// Change notification published after a mutation.
#[derive(Debug, Clone)]
pub enum StoreEvent {
    /// A user document changed (profile, stats, presence).
    User(UserId),
    /// The message log changed (new message or read-flag flip).
    Messages,
    /// A score history entry was appended for this user.
    ScoreHistory(UserId),
}

#[derive(Default)]
pub(crate) struct State {
    pub(crate) users: HashMap<UserId, User>,
    pub(crate) messages: Vec<Message>,
    pub(crate) upvotes: HashMap<(UserId, UserId), Upvote>,
    pub(crate) score_history: Vec<ScoreHistoryEntry>,
}

struct Inner {
    state: Mutex<State>,
    events: broadcast::Sender<StoreEvent>,
}

/// Shared handle to the store. Cloning is cheap; all clones observe
/// the same collections and event stream.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::default()),
                events,
            }),
        }
    }

    /// Run `f` with exclusive access to the collections.
    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let mut state = self
            .inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    /// Publish a change event. Send failures just mean nobody is
    /// listening right now.
    pub(crate) fn publish(&self, event: StoreEvent) {
        let _ = self.inner.events.send(event);
    }

    /// Raw event stream, for callers that want to build their own
    /// derived views.
    pub fn subscribe_events(&self) -> broadcast::Receiver<StoreEvent> {
        self.inner.events.subscribe()
    }

    /// Core subscription primitive: recompute `compute` whenever an
    /// event passes `relevant`, pushing each changed snapshot to the
    /// returned handle. The initial snapshot is delivered immediately.
    pub(crate) fn subscribe_with<T, F, P>(&self, compute: F, relevant: P) -> Subscription<T>
    where
        T: Clone + PartialEq + Send + 'static,
        F: Fn(&MemoryStore) -> T + Send + 'static,
        P: Fn(&StoreEvent) -> bool + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(16);
        let store = self.clone();
        let mut events = self.inner.events.subscribe();

        tokio::spawn(async move {
            let mut current = compute(&store);
            if tx.send(current.clone()).await.is_err() {
                return;
            }

            loop {
                // The handle dropping must end this task even while no
                // events arrive, so wait on both.
                let received = tokio::select! {
                    received = events.recv() => received,
                    _ = tx.closed() => break,
                };
                match received {
                    Ok(event) => {
                        if !relevant(&event) {
                            continue;
                        }
                    }
                    // Missed events: the snapshot recompute below
                    // catches us up, no need to replay.
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "subscription lagged, recomputing");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }

                let next = compute(&store);
                if next != current {
                    current = next.clone();
                    if tx.send(next).await.is_err() {
                        break;
                    }
                }
            }
        });

        Subscription { rx }
    }

    /// Number of user documents (test and admin convenience).
    pub fn user_count(&self) -> usize {
        self.with_state(|state| state.users.len())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// A live query handle: a stream of snapshots that updates whenever
/// the underlying data changes. Dropping it unsubscribes.
pub struct Subscription<T> {
    rx: mpsc::Receiver<T>,
}

impl<T> Subscription<T> {
    /// Wait for the next snapshot. Returns `None` once the feeding
    /// task has stopped.
    pub async fn next(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Non-blocking poll, for callers draining pending snapshots.
    pub fn try_next(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }
}

/// Generate a fresh document id.
pub(crate) fn new_id() -> Uuid {
    Uuid::new_v4()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_starts_empty() {
        let store = MemoryStore::new();
        assert_eq!(store.user_count(), 0);
    }

    #[tokio::test]
    async fn subscription_gets_initial_snapshot() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe_with(|s| s.user_count(), |_| true);
        assert_eq!(sub.next().await, Some(0));
    }

    #[tokio::test]
    async fn subscription_pushes_on_relevant_change() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe_with(
            |s| s.user_count(),
            |ev| matches!(ev, StoreEvent::User(_)),
        );
        assert_eq!(sub.next().await, Some(0));

        store.create_user(&UserId::from("alice"), "Alice", "SE");
        assert_eq!(sub.next().await, Some(1));
    }

    #[tokio::test]
    async fn irrelevant_events_do_not_push() {
        let store = MemoryStore::new();
        store.create_user(&UserId::from("a"), "A", "US");
        store.create_user(&UserId::from("b"), "B", "US");

        let mut sub = store.subscribe_with(
            |s| s.user_count(),
            |ev| matches!(ev, StoreEvent::User(_)),
        );
        assert_eq!(sub.next().await, Some(2));

        // A message event is filtered out; and even a user event with
        // an unchanged snapshot pushes nothing.
        store.publish(StoreEvent::Messages);
        store.publish(StoreEvent::User(UserId::from("a")));
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(sub.try_next(), None);
    }

    #[tokio::test]
    async fn dropped_subscription_releases_its_receiver() {
        let store = MemoryStore::new();
        let sub = store.subscribe_with(|s| s.user_count(), |_| true);
        assert_eq!(store.inner.events.receiver_count(), 1);

        // No events flow here; the drop alone must end the task.
        drop(sub);
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(store.inner.events.receiver_count(), 0);
    }
}
