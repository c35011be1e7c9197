use thiserror::Error;
use uuid::Uuid;
use vibecheck_core::types::UserId;

/// Errors produced by the store layer.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum StoreError {
    /// No user document for this id.
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    /// No message with this id.
    #[error("Message not found: {0}")]
    MessageNotFound(Uuid),

    /// An upvote for this (voter, target) pair already exists. Benign:
    /// callers surface it as "already done", not a failure.
    #[error("Already upvoted this user")]
    AlreadyUpvoted,

    /// Message text was empty after trimming.
    #[error("Message text cannot be empty")]
    EmptyMessage,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
