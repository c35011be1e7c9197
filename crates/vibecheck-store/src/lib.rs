//! # vibecheck-store
//!
//! In-memory pub/sub document store for the Vibecheck core, plus the
//! layers built directly on it: per-user gamification updates (scoring
//! events, logins, upvotes), direct messaging with read tracking, and
//! online/offline presence.
//!
//! The store implements the collection contracts the core depends on
//! (`users`, `messages`, `upvotes`, `score_history`) behind an
//! observer-style subscription interface, so callers never poll: every
//! mutation publishes a change event and subscribers receive freshly
//! computed snapshots.

pub mod messaging;
pub mod models;
pub mod presence;
pub mod store;
pub mod users;

mod error;

pub use error::{Result, StoreError};
pub use models::*;
pub use store::{MemoryStore, StoreEvent, Subscription};
pub use users::ScanOutcome;
