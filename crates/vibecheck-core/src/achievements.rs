//! Achievement catalog and unlock evaluation.
//!
//! The catalog is static reference data; evaluation is a pure function
//! over a user's cumulative stats. The caller persists the union of
//! old and new achievement ids — an id can appear at most once.

use std::collections::HashSet;

use serde::Serialize;

use crate::types::Rarity;

/// A one-time-unlockable badge tied to a stat threshold.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub rarity: Rarity,
    /// XP granted when the badge is unlocked.
    pub xp_reward: u64,
}

/// The full catalog, in evaluation/display order.
pub const CATALOG: [Achievement; 10] = [
    Achievement {
        id: "first_scan",
        name: "Getting Started",
        description: "Complete your first rizz scan",
        icon: "🎯",
        rarity: Rarity::Common,
        xp_reward: 10,
    },
    Achievement {
        id: "rizz_god",
        name: "Rizz God Status",
        description: "Achieve a score of 95 or higher",
        icon: "🔥",
        rarity: Rarity::Legendary,
        xp_reward: 100,
    },
    Achievement {
        id: "perfect_score",
        name: "Flawless",
        description: "Get a perfect 100 score",
        icon: "💯",
        rarity: Rarity::Mythic,
        xp_reward: 200,
    },
    Achievement {
        id: "top_10",
        name: "Top 10",
        description: "Reach top 10 on global leaderboard",
        icon: "🏆",
        rarity: Rarity::Epic,
        xp_reward: 75,
    },
    Achievement {
        id: "social_butterfly",
        name: "Social Butterfly",
        description: "Send 50 messages",
        icon: "🦋",
        rarity: Rarity::Rare,
        xp_reward: 30,
    },
    Achievement {
        id: "upvote_king",
        name: "Community Favorite",
        description: "Receive 100 upvotes",
        icon: "👑",
        rarity: Rarity::Epic,
        xp_reward: 50,
    },
    Achievement {
        id: "streak_7",
        name: "Weekly Warrior",
        description: "7-day login streak",
        icon: "🔥",
        rarity: Rarity::Rare,
        xp_reward: 40,
    },
    Achievement {
        id: "streak_30",
        name: "Rizz Veteran",
        description: "30-day login streak",
        icon: "💎",
        rarity: Rarity::Legendary,
        xp_reward: 150,
    },
    Achievement {
        id: "all_analyzers",
        name: "Jack of All Trades",
        description: "Try all 5 analyzer types",
        icon: "🎨",
        rarity: Rarity::Rare,
        xp_reward: 35,
    },
    Achievement {
        id: "chat_master",
        name: "Chat Master",
        description: "Have 100 AI conversations",
        icon: "💬",
        rarity: Rarity::Epic,
        xp_reward: 60,
    },
];

/// Look up a catalog entry by id.
pub fn achievement_by_id(id: &str) -> Option<&'static Achievement> {
    CATALOG.iter().find(|a| a.id == id)
}

/// Cumulative stat snapshot an unlock evaluation runs against.
#[derive(Debug, Clone, Default)]
pub struct UserStats {
    pub total_scans: u64,
    pub highest_score: f64,
    pub login_streak: u32,
    pub upvotes_received: u64,
    pub messages_sent: u64,
    /// Distinct scored analyzer kinds ever used.
    pub analyzers_used: usize,
    pub ai_conversations: u64,
    /// Current leaderboard position (1-based); `None` when unranked.
    pub leaderboard_rank: Option<u32>,
    /// Ids already unlocked.
    pub unlocked: HashSet<String>,
}

fn qualifies(achievement: &Achievement, stats: &UserStats) -> bool {
    match achievement.id {
        "first_scan" => stats.total_scans >= 1,
        "rizz_god" => stats.highest_score >= 95.0,
        // Scores are clamped to 100, so >= is exact equality at the ceiling.
        "perfect_score" => stats.highest_score >= 100.0,
        "top_10" => matches!(stats.leaderboard_rank, Some(pos) if pos <= 10),
        "social_butterfly" => stats.messages_sent >= 50,
        "upvote_king" => stats.upvotes_received >= 100,
        // Both streak badges are evaluated every time: a 30-day streak
        // unlocks streak_7 too if it was never recorded.
        "streak_7" => stats.login_streak >= 7,
        "streak_30" => stats.login_streak >= 30,
        "all_analyzers" => stats.analyzers_used >= 5,
        "chat_master" => stats.ai_conversations >= 100,
        _ => false,
    }
}

/// Return every catalog entry whose predicate is newly satisfied, in
/// catalog order. Already-unlocked ids are skipped, so merging the
/// result back into `unlocked` and re-evaluating yields nothing.
pub fn check_achievements(stats: &UserStats) -> Vec<&'static Achievement> {
    CATALOG
        .iter()
        .filter(|a| !stats.unlocked.contains(a.id))
        .filter(|a| qualifies(a, stats))
        .collect()
}
