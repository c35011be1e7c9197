//! Login streak tracking.
//!
//! Day boundaries are calendar-day comparisons (midnight-aligned UTC),
//! not rolling 24-hour windows: a login at 23:00 followed by one at
//! 01:00 the next day counts as consecutive.

use chrono::{DateTime, Utc};

/// Outcome of comparing the current login against the last recorded one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakUpdate {
    /// First-ever login: start at streak 1.
    Start,
    /// Same calendar day as the last login: no change.
    SameDay,
    /// Exactly one calendar day elapsed: increment.
    Increment,
    /// More than one calendar day elapsed: reset to 1.
    Reset,
}

impl StreakUpdate {
    /// Whether the caller should persist a new streak value and update
    /// the last-login date.
    pub fn is_new_day(&self) -> bool {
        !matches!(self, Self::SameDay)
    }

    /// The streak value that results from applying this update to the
    /// current one.
    pub fn next_streak(&self, current: u32) -> u32 {
        match self {
            Self::Start | Self::Reset => 1,
            Self::SameDay => current,
            Self::Increment => current + 1,
        }
    }
}

/// Compare the last recorded login date against `now`.
///
/// Idempotent within a calendar day: calling twice on the same day
/// yields [`StreakUpdate::SameDay`] the second time, so the streak is
/// never double-incremented.
pub fn update_streak(last_login: Option<DateTime<Utc>>, now: DateTime<Utc>) -> StreakUpdate {
    let Some(last) = last_login else {
        return StreakUpdate::Start;
    };

    let days = (now.date_naive() - last.date_naive()).num_days();
    match days {
        0 => StreakUpdate::SameDay,
        1 => StreakUpdate::Increment,
        // Gaps and clock skew (negative) both break the streak.
        _ => StreakUpdate::Reset,
    }
}
