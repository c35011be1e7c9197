//! Online/offline presence.
//!
//! A user is marked online when their client session starts and
//! offline when it ends. [`PresenceSession`] covers the abrupt-exit
//! path best-effort: dropping the guard flips the user offline even
//! when the session ends by unwinding. Observers use the same
//! subscription mechanism as messages — reactive, never polled.

use chrono::Utc;
use tracing::debug;
use vibecheck_core::types::UserId;

use crate::error::{Result, StoreError};
use crate::models::Presence;
use crate::store::{MemoryStore, StoreEvent, Subscription};

impl MemoryStore {
    pub fn set_online(&self, id: &UserId) -> Result<()> {
        self.set_presence(id, true)
    }

    pub fn set_offline(&self, id: &UserId) -> Result<()> {
        self.set_presence(id, false)
    }

    fn set_presence(&self, id: &UserId, is_online: bool) -> Result<()> {
        self.with_state(|state| {
            let user = state
                .users
                .get_mut(id)
                .ok_or_else(|| StoreError::UserNotFound(id.clone()))?;
            user.is_online = is_online;
            user.last_seen = Utc::now();
            Ok::<_, StoreError>(())
        })?;

        self.publish(StoreEvent::User(id.clone()));
        debug!(user = %id, is_online, "presence updated");
        Ok(())
    }

    pub fn presence(&self, id: &UserId) -> Result<Presence> {
        self.with_state(|state| {
            let user = state
                .users
                .get(id)
                .ok_or_else(|| StoreError::UserNotFound(id.clone()))?;
            Ok(Presence {
                is_online: user.is_online,
                last_seen: user.last_seen,
            })
        })
    }

    /// Live presence snapshots for one user. `None` while the user
    /// document doesn't exist.
    pub fn subscribe_presence(&self, id: &UserId) -> Subscription<Option<Presence>> {
        let target = id.clone();
        let query = id.clone();
        self.subscribe_with(
            move |store| store.presence(&query).ok(),
            move |event| matches!(event, StoreEvent::User(changed) if changed == &target),
        )
    }

    /// Start a presence session: marks the user online now and offline
    /// when the returned guard is dropped.
    pub fn start_session(&self, id: &UserId) -> Result<PresenceSession> {
        self.set_online(id)?;
        Ok(PresenceSession {
            store: self.clone(),
            user: id.clone(),
        })
    }
}

/// RAII guard for a client session's online state.
pub struct PresenceSession {
    store: MemoryStore,
    user: UserId,
}

impl PresenceSession {
    pub fn user(&self) -> &UserId {
        &self.user
    }
}

impl Drop for PresenceSession {
    fn drop(&mut self) {
        // Best effort: the user may have been removed in tests.
        let _ = self.store.set_offline(&self.user);
    }
}
