//! User documents and the gamification updates that mutate them:
//! signup defaults, login/streak bookkeeping, the atomic scoring
//! event, upvotes, and the leaderboard query.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::info;
use vibecheck_core::achievements::{check_achievements, Achievement, UserStats};
use vibecheck_core::scoring::{rank_from_score, Analysis};
use vibecheck_core::streak::update_streak;
use vibecheck_core::types::UserId;

use crate::error::{Result, StoreError};
use crate::models::{ScoreHistoryEntry, User};
use crate::store::{new_id, MemoryStore, State, StoreEvent};

/// What one scoring event did to the user.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    /// The appended history entry.
    pub entry: ScoreHistoryEntry,
    /// XP gained from this scan.
    pub xp_gained: u64,
    /// The user's new XP total.
    pub xp: u64,
    /// Every achievement newly unlocked by this scan, in catalog
    /// order. Callers presenting one at a time take the first; none
    /// may be silently skipped.
    pub unlocked: Vec<&'static Achievement>,
}

impl MemoryStore {
    /// Create a user document with signup defaults: numeric fields
    /// zeroed, streak 1, lowest rank.
    pub fn create_user(&self, id: &UserId, username: &str, country: &str) -> User {
        let now = Utc::now();
        let user = User {
            id: id.clone(),
            username: username.to_string(),
            country: country.to_string(),
            rizz_score: 0.0,
            main_character_score: 0.0,
            npc_level: 0.0,
            xp: 0,
            login_streak: 1,
            rank: rank_from_score(0.0).name.to_string(),
            achievements: Vec::new(),
            upvotes: 0,
            messages_sent: 0,
            ai_conversations: 0,
            last_login_date: Some(now),
            last_active: now,
            is_online: false,
            last_seen: now,
        };

        self.with_state(|state| {
            state.users.insert(id.clone(), user.clone());
        });
        self.publish(StoreEvent::User(id.clone()));

        info!(user = %id, username, "user created");
        user
    }

    pub fn get_user(&self, id: &UserId) -> Result<User> {
        self.with_state(|state| {
            state
                .users
                .get(id)
                .cloned()
                .ok_or_else(|| StoreError::UserNotFound(id.clone()))
        })
    }

    /// Apply a login at `now`. Persists the new streak and last-login
    /// date only when the calendar day changed; idempotent within the
    /// same day. Returns the current streak.
    pub fn record_login(&self, id: &UserId, now: DateTime<Utc>) -> Result<u32> {
        let (streak, changed) = self.with_state(|state| {
            let user = state
                .users
                .get_mut(id)
                .ok_or_else(|| StoreError::UserNotFound(id.clone()))?;

            let update = update_streak(user.last_login_date, now);
            if update.is_new_day() {
                user.login_streak = update.next_streak(user.login_streak);
                user.last_login_date = Some(now);
            }
            user.last_active = now;
            Ok::<_, StoreError>((user.login_streak, update.is_new_day()))
        })?;

        if changed {
            self.publish(StoreEvent::User(id.clone()));
            info!(user = %id, streak, "login streak updated");
        }
        Ok(streak)
    }

    /// Apply one completed analysis as a single logical unit: score
    /// fields, rank, history entry, XP gain and newly unlocked
    /// achievements all land under one lock acquisition, so a
    /// concurrent leaderboard read never sees a half-applied state.
    ///
    /// XP gain is `10 + floor(rizz_score / 10)`, and only that: the
    /// `xp_reward` on the unlocked entries the [`ScanOutcome`] carries
    /// is announcement metadata, not a credit.
    pub fn apply_scan(
        &self,
        id: &UserId,
        analysis: &Analysis,
        now: DateTime<Utc>,
    ) -> Result<ScanOutcome> {
        let outcome = self.with_state(|state| {
            let State {
                users,
                score_history,
                ..
            } = state;

            let user = users
                .get_mut(id)
                .ok_or_else(|| StoreError::UserNotFound(id.clone()))?;

            user.rizz_score = analysis.rizz_score;
            user.main_character_score = analysis.main_character_score;
            user.npc_level = analysis.npc_level;
            user.rank = analysis.rank.name.to_string();
            user.last_active = now;

            let entry = ScoreHistoryEntry {
                id: new_id(),
                user_id: id.clone(),
                score: analysis.rizz_score,
                kind: analysis.kind,
                rank: analysis.rank.name.to_string(),
                timestamp: now,
            };
            score_history.push(entry.clone());

            let stats = stats_for(user, score_history);
            let unlocked = check_achievements(&stats);
            for achievement in &unlocked {
                user.achievements.push(achievement.id.to_string());
            }

            let xp_gained = 10 + (analysis.rizz_score / 10.0).floor() as u64;
            user.xp += xp_gained;

            Ok::<_, StoreError>(ScanOutcome {
                entry,
                xp_gained,
                xp: user.xp,
                unlocked,
            })
        })?;

        self.publish(StoreEvent::User(id.clone()));
        self.publish(StoreEvent::ScoreHistory(id.clone()));

        info!(
            user = %id,
            score = analysis.rizz_score,
            kind = %analysis.kind,
            xp_gained = outcome.xp_gained,
            unlocked = outcome.unlocked.len(),
            "scan applied"
        );
        Ok(outcome)
    }

    /// Persist achievement unlocks evaluated outside a scan and credit
    /// their XP rewards. This is the write path for badges whose
    /// predicates depend on live data a scan doesn't see, the
    /// leaderboard-rank badge in particular: callers evaluate
    /// `check_achievements(&user_stats(id)?)` and hand the result
    /// here. Already-recorded ids are skipped, so replaying a grant is
    /// a no-op; returns the entries newly recorded.
    pub fn grant_achievements(
        &self,
        id: &UserId,
        achievements: &[&'static Achievement],
    ) -> Result<Vec<&'static Achievement>> {
        let granted = self.with_state(|state| {
            let user = state
                .users
                .get_mut(id)
                .ok_or_else(|| StoreError::UserNotFound(id.clone()))?;

            let mut granted = Vec::new();
            for achievement in achievements {
                if user.achievements.iter().any(|a| a == achievement.id) {
                    continue;
                }
                user.achievements.push(achievement.id.to_string());
                user.xp += achievement.xp_reward;
                granted.push(*achievement);
            }
            Ok::<_, StoreError>(granted)
        })?;

        if !granted.is_empty() {
            self.publish(StoreEvent::User(id.clone()));
            info!(user = %id, granted = granted.len(), "achievements granted");
        }
        Ok(granted)
    }

    /// Record an upvote from `from` to `to`.
    ///
    /// Uniqueness is enforced at the point of insertion on the
    /// `(from, to)` key, under the same lock that increments the
    /// counter — two near-simultaneous attempts cannot both succeed,
    /// and the counter never double-counts.
    pub fn add_upvote(&self, from: &UserId, to: &UserId) -> Result<()> {
        self.with_state(|state| {
            if !state.users.contains_key(to) {
                return Err(StoreError::UserNotFound(to.clone()));
            }

            match state.upvotes.entry((from.clone(), to.clone())) {
                std::collections::hash_map::Entry::Occupied(_) => {
                    return Err(StoreError::AlreadyUpvoted);
                }
                std::collections::hash_map::Entry::Vacant(slot) => {
                    slot.insert(crate::models::Upvote {
                        from: from.clone(),
                        to: to.clone(),
                        created_at: Utc::now(),
                    });
                }
            }

            if let Some(target) = state.users.get_mut(to) {
                target.upvotes += 1;
            }
            Ok(())
        })?;

        self.publish(StoreEvent::User(to.clone()));
        Ok(())
    }

    /// Bump the AI-conversation counter feeding the chat badge.
    pub fn record_ai_conversation(&self, id: &UserId) -> Result<u64> {
        let count = self.with_state(|state| {
            let user = state
                .users
                .get_mut(id)
                .ok_or_else(|| StoreError::UserNotFound(id.clone()))?;
            user.ai_conversations += 1;
            Ok::<_, StoreError>(user.ai_conversations)
        })?;
        self.publish(StoreEvent::User(id.clone()));
        Ok(count)
    }

    /// Users ordered by rizz score, highest first.
    pub fn leaderboard(&self, limit: usize) -> Vec<User> {
        self.with_state(|state| {
            let mut users: Vec<User> = state.users.values().cloned().collect();
            users.sort_by(|a, b| b.rizz_score.total_cmp(&a.rizz_score));
            users.truncate(limit);
            users
        })
    }

    /// 1-based leaderboard position, or `None` for unknown users.
    pub fn leaderboard_position(&self, id: &UserId) -> Option<u32> {
        self.with_state(|state| {
            let me = state.users.get(id)?;
            let above = state
                .users
                .values()
                .filter(|u| u.rizz_score > me.rizz_score)
                .count();
            Some(above as u32 + 1)
        })
    }

    /// Cumulative stat snapshot for achievement evaluation.
    pub fn user_stats(&self, id: &UserId) -> Result<UserStats> {
        let rank = self.leaderboard_position(id);
        self.with_state(|state| {
            let user = state
                .users
                .get(id)
                .ok_or_else(|| StoreError::UserNotFound(id.clone()))?;
            let mut stats = stats_for(user, &state.score_history);
            stats.leaderboard_rank = rank;
            Ok(stats)
        })
    }

    /// Score history for a user, newest first, limited.
    pub fn score_history(&self, id: &UserId, limit: usize) -> Vec<ScoreHistoryEntry> {
        self.with_state(|state| {
            let mut entries: Vec<ScoreHistoryEntry> = state
                .score_history
                .iter()
                .filter(|e| &e.user_id == id)
                .cloned()
                .collect();
            entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
            entries.truncate(limit);
            entries
        })
    }
}

/// Derive the achievement stats from a user document plus the history
/// log. `total_scans` is the entry count, `highest_score` the max,
/// `analyzers_used` the distinct scored kinds.
fn stats_for(user: &User, score_history: &[ScoreHistoryEntry]) -> UserStats {
    let mut total_scans = 0;
    let mut highest_score: f64 = 0.0;
    let mut kinds = HashSet::new();
    for entry in score_history.iter().filter(|e| e.user_id == user.id) {
        total_scans += 1;
        highest_score = highest_score.max(entry.score);
        if entry.kind.is_scored() {
            kinds.insert(entry.kind);
        }
    }

    UserStats {
        total_scans,
        highest_score,
        login_streak: user.login_streak,
        upvotes_received: user.upvotes,
        messages_sent: user.messages_sent,
        analyzers_used: kinds.len(),
        ai_conversations: user.ai_conversations,
        leaderboard_rank: None,
        unlocked: user.achievements.iter().cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use vibecheck_core::types::AnalyzerKind;

    fn store_with(id: &str) -> (MemoryStore, UserId) {
        let store = MemoryStore::new();
        let user = UserId::from(id);
        store.create_user(&user, id, "US");
        (store, user)
    }

    /// An analysis with a pinned rizz score, for deterministic tests.
    fn fixed_analysis(kind: AnalyzerKind, score: f64) -> Analysis {
        let mut analysis = Analysis::from_ai(kind, "fine", Some(score));
        analysis.rizz_score = score;
        analysis.rank = rank_from_score(score);
        analysis
    }

    #[test]
    fn signup_defaults() {
        let (store, id) = store_with("alice");
        let user = store.get_user(&id).unwrap();
        assert_eq!(user.xp, 0);
        assert_eq!(user.rizz_score, 0.0);
        assert_eq!(user.login_streak, 1);
        assert_eq!(user.rank, "Rising Star");
        assert!(user.achievements.is_empty());
    }

    #[test]
    fn first_selfie_scan_end_to_end() {
        let (store, id) = store_with("alice");
        let analysis = fixed_analysis(AnalyzerKind::Selfie, 82.0);

        let outcome = store.apply_scan(&id, &analysis, Utc::now()).unwrap();

        // xp = 10 + floor(82 / 10) = 18
        assert_eq!(outcome.xp_gained, 18);
        assert_eq!(outcome.xp, 18);
        assert_eq!(outcome.entry.score, 82.0);
        assert_eq!(outcome.entry.kind, AnalyzerKind::Selfie);
        assert_eq!(outcome.unlocked.len(), 1);
        assert_eq!(outcome.unlocked[0].id, "first_scan");

        let user = store.get_user(&id).unwrap();
        assert_eq!(user.xp, 18);
        assert_eq!(user.rank, "A-Tier");
        assert_eq!(user.achievements, vec!["first_scan".to_string()]);

        let history = store.score_history(&id, 10);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].score, 82.0);
    }

    #[test]
    fn repeated_scans_do_not_redo_unlocks() {
        let (store, id) = store_with("alice");
        let analysis = fixed_analysis(AnalyzerKind::Selfie, 75.0);

        let first = store.apply_scan(&id, &analysis, Utc::now()).unwrap();
        assert_eq!(first.unlocked.len(), 1);

        let second = store.apply_scan(&id, &analysis, Utc::now()).unwrap();
        assert!(second.unlocked.is_empty());

        let user = store.get_user(&id).unwrap();
        assert_eq!(user.achievements.len(), 1);
    }

    #[test]
    fn xp_only_increases() {
        let (store, id) = store_with("alice");
        let mut last_xp = 0;
        for score in [90.0, 40.0, 10.0, 0.0] {
            let analysis = fixed_analysis(AnalyzerKind::Selfie, score);
            let outcome = store.apply_scan(&id, &analysis, Utc::now()).unwrap();
            assert!(outcome.xp > last_xp, "xp must be monotone");
            last_xp = outcome.xp;
        }
    }

    #[test]
    fn high_score_unlocks_rizz_god() {
        let (store, id) = store_with("alice");
        let analysis = fixed_analysis(AnalyzerKind::Dating, 96.0);
        let outcome = store.apply_scan(&id, &analysis, Utc::now()).unwrap();
        let ids: Vec<&str> = outcome.unlocked.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["first_scan", "rizz_god"]);
    }

    #[test]
    fn all_analyzers_unlocks_variety_badge() {
        let (store, id) = store_with("alice");
        let kinds = [
            AnalyzerKind::Selfie,
            AnalyzerKind::Chat,
            AnalyzerKind::Linkedin,
            AnalyzerKind::Instagram,
            AnalyzerKind::Dating,
        ];
        let mut unlocked_variety = false;
        for kind in kinds {
            let outcome = store
                .apply_scan(&id, &fixed_analysis(kind, 70.0), Utc::now())
                .unwrap();
            unlocked_variety |= outcome.unlocked.iter().any(|a| a.id == "all_analyzers");
        }
        assert!(unlocked_variety);
    }

    #[test]
    fn duplicate_upvote_rejected_and_counter_stable() {
        let (store, target) = store_with("bob");
        let voter = UserId::from("alice");
        store.create_user(&voter, "alice", "US");

        store.add_upvote(&voter, &target).unwrap();
        assert_eq!(store.get_user(&target).unwrap().upvotes, 1);

        let dup = store.add_upvote(&voter, &target);
        assert_eq!(dup, Err(StoreError::AlreadyUpvoted));
        assert_eq!(store.get_user(&target).unwrap().upvotes, 1);

        // Opposite direction is a different pair.
        store.add_upvote(&target, &voter).unwrap();
        assert_eq!(store.get_user(&voter).unwrap().upvotes, 1);
    }

    #[test]
    fn upvote_unknown_user() {
        let store = MemoryStore::new();
        let err = store.add_upvote(&UserId::from("a"), &UserId::from("ghost"));
        assert!(matches!(err, Err(StoreError::UserNotFound(_))));
    }

    #[test]
    fn login_streak_same_day_idempotent() {
        let (store, id) = store_with("alice");
        let day1 = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).single().unwrap();

        // Pin the signup login to day 1.
        store.with_state(|state| {
            if let Some(u) = state.users.get_mut(&id) {
                u.last_login_date = Some(day1);
            }
        });

        assert_eq!(store.record_login(&id, day1).unwrap(), 1);
        assert_eq!(
            store
                .record_login(&id, day1 + Duration::hours(5))
                .unwrap(),
            1
        );

        let next_day = day1 + Duration::days(1);
        assert_eq!(store.record_login(&id, next_day).unwrap(), 2);
        // Twice on the new day still yields 2.
        assert_eq!(store.record_login(&id, next_day).unwrap(), 2);
    }

    #[test]
    fn login_gap_resets_streak() {
        let (store, id) = store_with("alice");
        let day1 = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).single().unwrap();
        store.with_state(|state| {
            if let Some(u) = state.users.get_mut(&id) {
                u.last_login_date = Some(day1);
                u.login_streak = 6;
            }
        });

        assert_eq!(store.record_login(&id, day1 + Duration::days(3)).unwrap(), 1);
    }

    #[test]
    fn leaderboard_sorted_and_positioned() {
        let store = MemoryStore::new();
        for (name, score) in [("a", 50.0), ("b", 90.0), ("c", 70.0)] {
            let id = UserId::from(name);
            store.create_user(&id, name, "US");
            store
                .apply_scan(&id, &fixed_analysis(AnalyzerKind::Selfie, score), Utc::now())
                .unwrap();
        }

        let board = store.leaderboard(10);
        let names: Vec<&str> = board.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["b", "c", "a"]);

        assert_eq!(store.leaderboard_position(&UserId::from("b")), Some(1));
        assert_eq!(store.leaderboard_position(&UserId::from("a")), Some(3));
        assert_eq!(store.leaderboard_position(&UserId::from("ghost")), None);

        assert_eq!(store.leaderboard(2).len(), 2);
    }

    #[test]
    fn rank_badge_granted_via_stats_evaluation() {
        let (store, id) = store_with("alice");
        store
            .apply_scan(&id, &fixed_analysis(AnalyzerKind::Selfie, 80.0), Utc::now())
            .unwrap();

        // Scan-time evaluation has no rank; the live stats do.
        assert!(!store
            .get_user(&id)
            .unwrap()
            .achievements
            .contains(&"top_10".to_string()));
        let stats = store.user_stats(&id).unwrap();
        assert_eq!(stats.leaderboard_rank, Some(1));

        let newly = check_achievements(&stats);
        assert!(newly.iter().any(|a| a.id == "top_10"));

        let xp_before = store.get_user(&id).unwrap().xp;
        let granted = store.grant_achievements(&id, &newly).unwrap();
        let reward: u64 = granted.iter().map(|a| a.xp_reward).sum();
        assert!(granted.iter().any(|a| a.id == "top_10"));

        let user = store.get_user(&id).unwrap();
        assert!(user.achievements.contains(&"top_10".to_string()));
        assert_eq!(user.xp, xp_before + reward);

        // Replaying the grant records nothing and credits nothing.
        assert!(store.grant_achievements(&id, &newly).unwrap().is_empty());
        let user = store.get_user(&id).unwrap();
        assert_eq!(user.xp, xp_before + reward);
        assert_eq!(
            user.achievements.iter().filter(|a| *a == "top_10").count(),
            1
        );
    }

    #[test]
    fn grant_for_unknown_user() {
        let store = MemoryStore::new();
        let err = store.grant_achievements(&UserId::from("ghost"), &[]);
        assert!(matches!(err, Err(StoreError::UserNotFound(_))));
    }

    #[test]
    fn user_stats_reflects_history() {
        let (store, id) = store_with("alice");
        store
            .apply_scan(&id, &fixed_analysis(AnalyzerKind::Selfie, 60.0), Utc::now())
            .unwrap();
        store
            .apply_scan(&id, &fixed_analysis(AnalyzerKind::Dating, 88.0), Utc::now())
            .unwrap();

        let stats = store.user_stats(&id).unwrap();
        assert_eq!(stats.total_scans, 2);
        assert_eq!(stats.highest_score, 88.0);
        assert_eq!(stats.analyzers_used, 2);
        assert_eq!(stats.leaderboard_rank, Some(1));
        assert!(stats.unlocked.contains("first_scan"));
    }
}
