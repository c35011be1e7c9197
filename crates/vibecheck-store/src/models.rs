//! Domain model structs held in the store's collections.
//!
//! Every struct derives `Serialize` so it can be handed directly to a
//! client layer; timestamps are always UTC.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vibecheck_core::types::{AnalyzerKind, UserId};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A user document. Created at signup with numeric fields zeroed and
/// streak 1; mutated on every scoring event, upvote, login and
/// presence change; never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub country: String,
    /// Primary 0-100 quality metric; last scan's normalized score.
    pub rizz_score: f64,
    pub main_character_score: f64,
    pub npc_level: f64,
    /// Monotonically non-decreasing; level is derived, never stored.
    pub xp: u64,
    pub login_streak: u32,
    /// Derived display label for the current rizz score.
    pub rank: String,
    /// Unlocked achievement ids, append-only, no duplicates.
    pub achievements: Vec<String>,
    pub upvotes: u64,
    pub messages_sent: u64,
    pub ai_conversations: u64,
    pub last_login_date: Option<DateTime<Utc>>,
    pub last_active: DateTime<Utc>,
    pub is_online: bool,
    pub last_seen: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A direct message. The `participants` pair is stored sorted so one
/// query direction covers "messages involving me"; `from`/`to` keep
/// the direction for rendering. `read` flips false -> true exactly
/// once and never reverses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub from: UserId,
    pub to: UserId,
    pub text: String,
    /// The two participants as a sorted (unordered) pair.
    pub participants: [UserId; 2],
    pub read: bool,
    /// Server-assigned; conversation ordering key.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Canonical unordered pair for two user ids.
    pub fn pair(a: &UserId, b: &UserId) -> [UserId; 2] {
        if a <= b {
            [a.clone(), b.clone()]
        } else {
            [b.clone(), a.clone()]
        }
    }

    pub fn involves(&self, user: &UserId) -> bool {
        self.participants.contains(user)
    }

    /// Whether this message is between exactly these two users.
    pub fn between(&self, a: &UserId, b: &UserId) -> bool {
        self.participants == Self::pair(a, b)
    }

    /// The other participant from `user`'s point of view.
    pub fn counterpart(&self, user: &UserId) -> &UserId {
        if &self.from == user {
            &self.to
        } else {
            &self.from
        }
    }
}

// ---------------------------------------------------------------------------
// Upvote
// ---------------------------------------------------------------------------

/// One upvote from one user to another. Keyed by the (from, to) pair;
/// created once, never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Upvote {
    pub from: UserId,
    pub to: UserId,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Score history
// ---------------------------------------------------------------------------

/// Immutable record of one completed analysis, append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoreHistoryEntry {
    pub id: Uuid,
    pub user_id: UserId,
    pub score: f64,
    #[serde(rename = "type")]
    pub kind: AnalyzerKind,
    pub rank: String,
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Derived views
// ---------------------------------------------------------------------------

/// Conversation summary derived from the message log: the most recent
/// message per counterpart, flagged unread if that message is inbound
/// and unread. Never stored.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub user_id: UserId,
    pub last_message: String,
    pub timestamp: DateTime<Utc>,
    pub unread: bool,
}

/// Coarse online/offline presence.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Presence {
    pub is_online: bool,
    pub last_seen: DateTime<Utc>,
}
