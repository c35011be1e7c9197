//! # vibecheck-core
//!
//! Pure domain logic for the Vibecheck platform: score normalization,
//! rank tiers, the achievement catalog and its unlock evaluation, XP
//! leveling, login-streak tracking, and content-moderation checks.
//!
//! Nothing in this crate performs I/O. Every function is callable from
//! both the server and the store layer, and the only nondeterminism is
//! the deliberate score jitter and randomized fallback baselines in
//! [`scoring`].

pub mod achievements;
pub mod level;
pub mod moderation;
pub mod scoring;
pub mod streak;
pub mod types;

pub use achievements::{check_achievements, Achievement, UserStats, CATALOG};
pub use level::{calculate_level, LevelInfo};
pub use scoring::{calculate_rizz_score, rank_from_score, Analysis, ScoreFactors};
pub use streak::{update_streak, StreakUpdate};
pub use types::{AnalyzerKind, Rank, Rarity, UserId};
