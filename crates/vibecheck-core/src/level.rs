//! XP leveling curve.
//!
//! Level is a pure function of cumulative XP and is never persisted:
//! `level = floor(sqrt(xp / 100)) + 1`. Recomputing from stored XP
//! always reproduces the same level, so the two can't desync.

use serde::Serialize;

/// Snapshot of a user's level progression at a given XP total.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LevelInfo {
    pub level: u32,
    pub xp: u64,
    /// XP floor of the current level.
    pub xp_for_current_level: u64,
    /// XP required to reach the next level.
    pub xp_for_next_level: u64,
    /// XP accumulated within the current level.
    pub xp_progress: u64,
    /// XP between the current and next level floors.
    pub xp_needed: u64,
    /// Integer percent through the current level, in [0, 100].
    pub progress_percent: u8,
}

pub fn calculate_level(xp: u64) -> LevelInfo {
    let level = (xp as f64 / 100.0).sqrt().floor() as u64 + 1;
    let xp_for_current_level = (level - 1) * (level - 1) * 100;
    let xp_for_next_level = level * level * 100;
    let xp_progress = xp - xp_for_current_level;
    let xp_needed = xp_for_next_level - xp_for_current_level;
    let progress_percent =
        ((xp_progress as f64 / xp_needed as f64) * 100.0).round().clamp(0.0, 100.0) as u8;

    LevelInfo {
        level: level as u32,
        xp,
        xp_for_current_level,
        xp_for_next_level,
        xp_progress,
        xp_needed,
        progress_percent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_one_at_zero_xp() {
        let info = calculate_level(0);
        assert_eq!(info.level, 1);
        assert_eq!(info.xp_for_next_level, 100);
        assert_eq!(info.progress_percent, 0);
    }

    #[test]
    fn level_always_at_least_one() {
        for xp in [0, 1, 99, 100, 101, 10_000, 1_000_000] {
            assert!(calculate_level(xp).level >= 1);
        }
    }

    #[test]
    fn level_boundaries_exact() {
        // One XP short of the next threshold is still the lower level.
        for xp in [0, 50, 100, 250, 400, 900, 12_345] {
            let info = calculate_level(xp);
            let just_below = calculate_level(info.xp_for_next_level - 1);
            assert_eq!(just_below.level, info.level, "xp={xp}");
            let at_threshold = calculate_level(info.xp_for_next_level);
            assert_eq!(at_threshold.level, info.level + 1, "xp={xp}");
        }
    }

    #[test]
    fn known_curve_points() {
        assert_eq!(calculate_level(100).level, 2);
        assert_eq!(calculate_level(399).level, 2);
        assert_eq!(calculate_level(400).level, 3);
        assert_eq!(calculate_level(900).level, 4);
    }

    #[test]
    fn progress_percent_in_range() {
        for xp in 0..2_000 {
            let p = calculate_level(xp).progress_percent;
            assert!(p <= 100, "xp={xp} percent={p}");
        }
    }

    #[test]
    fn progress_midway() {
        // Level 2 spans 100..400; 250 is halfway.
        let info = calculate_level(250);
        assert_eq!(info.level, 2);
        assert_eq!(info.xp_progress, 150);
        assert_eq!(info.xp_needed, 300);
        assert_eq!(info.progress_percent, 50);
    }
}
