//! XP ledger - award computation, atomic application and the level curve.

use questlog_core::{AchievementDefinition, Difficulty, UserId, XpAction};
use questlog_storage::GamificationStore;
use std::sync::Arc;

use crate::error::{GamifyError, Result};

/// Streak days counted toward the bonus are capped here, which also caps
/// the multiplier at 2.5x.
pub const MAX_STREAK_BONUS_DAYS: u32 = 30;

const STREAK_BONUS_PER_DAY: f64 = 0.05;

/// Cumulative XP required to reach `level`.
///
/// Level 1 requires 0 XP; each level `L` opens at `50·L·(L−1)`.
pub fn xp_for_level(level: u32) -> u64 {
    let level = u64::from(level);
    50 * level * (level.saturating_sub(1))
}

/// The level a user with `xp` total XP is at: the largest `L` with
/// `xp_for_level(L) <= xp`.
pub fn level_for_xp(xp: u64) -> u32 {
    // Real root of 50·L·(L−1) = xp, then correct for float error.
    let root = (1.0 + (1.0 + 0.08 * xp as f64).sqrt()) / 2.0;
    let mut level = (root.floor() as u32).max(1);
    while xp_for_level(level + 1) <= xp {
        level += 1;
    }
    while level > 1 && xp_for_level(level) > xp {
        level -= 1;
    }
    level
}

/// The consistency bonus: +5% per streak day, capped at 30 days (2.5x).
pub fn streak_multiplier(streak_days: u32) -> f64 {
    1.0 + f64::from(streak_days.min(MAX_STREAK_BONUS_DAYS)) * STREAK_BONUS_PER_DAY
}

/// Outcome of one XP award.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XpAward {
    /// XP granted by this award
    pub xp_awarded: u64,

    /// The user's total XP after the award
    pub total_xp_after: u64,

    /// Level derived from the total before the award
    pub level_before: u32,

    /// Level derived from the total after the award
    pub level_after: u32,

    /// Whether this award crossed a level threshold
    pub leveled_up: bool,
}

/// Computes XP deltas and applies them through the store's atomic
/// increment, so concurrent awards for the same user always sum.
pub struct XpLedger<S> {
    store: Arc<S>,
}

impl<S: GamificationStore> XpLedger<S> {
    /// Create a ledger over the given store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Award XP for an action at a difficulty, with the streak bonus for
    /// `current_streak_days` applied.
    ///
    /// `XpAction::AchievementUnlock` is rejected here - unlock rewards are
    /// fixed per achievement and go through
    /// [`award_achievement`](Self::award_achievement).
    pub async fn award(
        &self,
        user_id: UserId,
        action: XpAction,
        difficulty: Difficulty,
        current_streak_days: u32,
    ) -> Result<XpAward> {
        let base = action.base_xp().ok_or_else(|| {
            GamifyError::Validation(
                "achievement unlocks carry a fixed reward; use award_achievement".to_string(),
            )
        })?;

        let amount =
            (base as f64 * difficulty.multiplier() * streak_multiplier(current_streak_days))
                .round() as u64;

        self.apply(user_id, amount).await
    }

    /// Grant an achievement's fixed reward. No multipliers apply.
    pub async fn award_achievement(
        &self,
        user_id: UserId,
        achievement: &AchievementDefinition,
    ) -> Result<XpAward> {
        self.apply(user_id, achievement.xp_reward).await
    }

    /// Apply the delta atomically and derive the level transition from the
    /// returned total. The total before is recovered by subtraction, so no
    /// stale read is involved anywhere.
    async fn apply(&self, user_id: UserId, amount: u64) -> Result<XpAward> {
        let total_after = self.store.increment_user_xp(user_id, amount).await?;
        let total_before = total_after - amount;

        let level_before = level_for_xp(total_before);
        let level_after = level_for_xp(total_after);

        self.store.raise_user_level(user_id, level_after).await?;

        if level_after > level_before {
            tracing::debug!(%user_id, level_after, "level up");
        }

        Ok(XpAward {
            xp_awarded: amount,
            total_xp_after: total_after,
            level_before,
            level_after,
            leveled_up: level_after > level_before,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use questlog_storage::MemoryStore;

    #[test]
    fn level_fixed_points() {
        assert_eq!(level_for_xp(0), 1);
        assert_eq!(level_for_xp(75), 1);
        assert_eq!(level_for_xp(99), 1);
        assert_eq!(level_for_xp(100), 2);
        assert_eq!(level_for_xp(150), 2);
        assert_eq!(level_for_xp(500), 3);
        assert_eq!(level_for_xp(990), 4);
        assert_eq!(level_for_xp(1010), 5);
    }

    #[test]
    fn level_is_monotonic() {
        let mut last = 0;
        for xp in (0..20_000).step_by(7) {
            let level = level_for_xp(xp);
            assert!(level >= last, "level regressed at {xp} XP");
            last = level;
        }
    }

    #[test]
    fn level_matches_thresholds_exactly() {
        for level in 1..200 {
            let threshold = xp_for_level(level);
            assert_eq!(level_for_xp(threshold), level);
            if threshold > 0 {
                assert_eq!(level_for_xp(threshold - 1), level - 1);
            }
        }
    }

    #[test]
    fn streak_multiplier_caps_at_30_days() {
        assert_eq!(streak_multiplier(0), 1.0);
        assert_eq!(streak_multiplier(7), 1.35);
        assert_eq!(streak_multiplier(30), 2.5);
        assert_eq!(streak_multiplier(365), 2.5);
    }

    #[tokio::test]
    async fn streak_bonus_is_non_decreasing() {
        let store = Arc::new(MemoryStore::new());
        let ledger = XpLedger::new(Arc::clone(&store));
        let user = store.create_user("alba").await.unwrap();

        for difficulty in [
            Difficulty::Easy,
            Difficulty::Medium,
            Difficulty::Hard,
            Difficulty::Expert,
        ] {
            let mut last = 0;
            for streak in 0..40 {
                let award = ledger
                    .award(user.id, XpAction::UpdateProgress, difficulty, streak)
                    .await
                    .unwrap();
                assert!(award.xp_awarded >= last);
                last = award.xp_awarded;
            }
        }
    }

    #[tokio::test]
    async fn expert_beats_easy_at_fixed_streak() {
        let store = Arc::new(MemoryStore::new());
        let ledger = XpLedger::new(Arc::clone(&store));
        let user = store.create_user("beto").await.unwrap();

        for streak in [0, 7, 30] {
            let easy = ledger
                .award(user.id, XpAction::CompleteGoal, Difficulty::Easy, streak)
                .await
                .unwrap();
            let expert = ledger
                .award(user.id, XpAction::CompleteGoal, Difficulty::Expert, streak)
                .await
                .unwrap();
            assert!(expert.xp_awarded > easy.xp_awarded);
        }
    }

    #[tokio::test]
    async fn medium_update_with_week_streak_rounds_to_20() {
        let store = Arc::new(MemoryStore::new());
        let ledger = XpLedger::new(Arc::clone(&store));
        let user = store.create_user("cara").await.unwrap();
        store.increment_user_xp(user.id, 990).await.unwrap();

        // 10 * 1.5 * 1.35 = 20.25 -> 20
        let award = ledger
            .award(user.id, XpAction::UpdateProgress, Difficulty::Medium, 7)
            .await
            .unwrap();

        assert_eq!(award.xp_awarded, 20);
        assert_eq!(award.total_xp_after, 1010);
        assert_eq!(award.level_before, 4);
        assert_eq!(award.level_after, 5);
        assert!(award.leveled_up);
    }

    #[tokio::test]
    async fn achievement_reward_bypasses_multipliers() {
        let store = Arc::new(MemoryStore::new());
        let ledger = XpLedger::new(Arc::clone(&store));
        let user = store.create_user("dina").await.unwrap();

        let def = AchievementDefinition {
            id: questlog_core::AchievementId::new("week-streak"),
            name: "Week Streak".to_string(),
            description: "Keep a 7-day streak".to_string(),
            xp_reward: 100,
            condition: questlog_core::Condition::StreakDays { days: 7 },
        };

        let award = ledger.award_achievement(user.id, &def).await.unwrap();
        assert_eq!(award.xp_awarded, 100);
    }

    #[tokio::test]
    async fn achievement_unlock_action_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let ledger = XpLedger::new(Arc::clone(&store));
        let user = store.create_user("eryk").await.unwrap();

        let err = ledger
            .award(user.id, XpAction::AchievementUnlock, Difficulty::Easy, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, GamifyError::Validation(_)));
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let store = Arc::new(MemoryStore::new());
        let ledger = XpLedger::new(store);

        let err = ledger
            .award(UserId::new(), XpAction::UpdateProgress, Difficulty::Easy, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, GamifyError::NotFound(_)));
    }
}
