//! Achievement definitions, unlock conditions and per-user progress.

use crate::id::{AchievementId, ModuleId, UserId};
use crate::Time;
use serde::{Deserialize, Serialize};

/// A condition that must be satisfied for an achievement to unlock.
///
/// This is a closed set on purpose: the evaluator matches exhaustively, so
/// a new condition kind cannot silently evaluate to nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    /// User has created at least `count` goals (any module).
    GoalsCreated {
        /// Threshold, must be > 0
        count: u64,
    },

    /// User has completed at least `count` goals (any module).
    GoalsCompleted {
        /// Threshold, must be > 0
        count: u64,
    },

    /// User has completed at least `count` goals in one specific module.
    ModuleGoalsCompleted {
        /// The module the goals must belong to
        module: ModuleId,
        /// Threshold, must be > 0
        count: u64,
    },

    /// User's current streak is at least `days` long.
    StreakDays {
        /// Threshold, must be > 0
        days: u32,
    },

    /// User has earned at least `amount` total XP.
    XpEarned {
        /// Threshold, must be > 0
        amount: u64,
    },
}

/// An entry in the immutable achievement catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AchievementDefinition {
    /// Stable slug identifying this achievement
    pub id: AchievementId,

    /// Display name
    pub name: String,

    /// How to unlock it
    pub description: String,

    /// Fixed XP granted on unlock (no multipliers apply)
    pub xp_reward: u64,

    /// Unlock condition
    pub condition: Condition,
}

/// Per-user progress toward one achievement.
///
/// Unique per (user, achievement). `progress` only moves upward, and once
/// `is_completed` is set the row is never touched again - that flag is the
/// idempotency anchor for unlock rewards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAchievementProgress {
    /// The user
    pub user_id: UserId,

    /// The achievement
    pub achievement_id: AchievementId,

    /// Completion ratio in [0, 1]
    pub progress: f64,

    /// Whether the achievement has been unlocked
    pub is_completed: bool,

    /// When it was unlocked, if it was
    pub completed_at: Option<Time>,
}

impl UserAchievementProgress {
    /// A fresh, empty progress row.
    pub fn new(user_id: UserId, achievement_id: AchievementId) -> Self {
        Self {
            user_id,
            achievement_id,
            progress: 0.0,
            is_completed: false,
            completed_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_serializes_tagged() {
        let cond = Condition::ModuleGoalsCompleted {
            module: ModuleId::new("fitness"),
            count: 5,
        };
        let json = serde_json::to_string(&cond).unwrap();
        assert!(json.contains("\"kind\":\"module_goals_completed\""));

        let back: Condition = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cond);
    }

    #[test]
    fn fresh_progress_is_empty() {
        let p = UserAchievementProgress::new(UserId::new(), AchievementId::new("first-goal"));
        assert_eq!(p.progress, 0.0);
        assert!(!p.is_completed);
        assert!(p.completed_at.is_none());
    }
}
