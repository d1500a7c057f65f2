//! Gamification events and the consolidated result returned to callers.

use crate::achievement::AchievementDefinition;
use crate::goal::Difficulty;
use serde::{Deserialize, Serialize};

/// The XP-earning actions the ledger knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XpAction {
    /// A progress entry was recorded against a goal
    UpdateProgress,
    /// A goal was completed
    CompleteGoal,
    /// An achievement unlocked (fixed reward, bypasses multipliers)
    AchievementUnlock,
}

impl XpAction {
    /// Base XP for the action, before multipliers.
    ///
    /// `AchievementUnlock` has no base - the reward comes from the
    /// achievement definition itself.
    pub fn base_xp(&self) -> Option<u64> {
        match self {
            Self::UpdateProgress => Some(10),
            Self::CompleteGoal => Some(50),
            Self::AchievementUnlock => None,
        }
    }
}

/// A domain event the facade converts into rewards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamificationEvent {
    /// A progress entry was recorded
    ProgressRecorded {
        /// Difficulty of the goal the progress was recorded against
        difficulty: Difficulty,
    },

    /// A goal was completed
    GoalCompleted {
        /// Difficulty of the completed goal
        difficulty: Difficulty,
    },
}

impl GamificationEvent {
    /// The ledger action this event maps to.
    pub fn action(&self) -> XpAction {
        match self {
            Self::ProgressRecorded { .. } => XpAction::UpdateProgress,
            Self::GoalCompleted { .. } => XpAction::CompleteGoal,
        }
    }

    /// The difficulty carried by the event.
    pub fn difficulty(&self) -> Difficulty {
        match self {
            Self::ProgressRecorded { difficulty } => *difficulty,
            Self::GoalCompleted { difficulty } => *difficulty,
        }
    }
}

/// Everything the caller needs to display after handling one event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GamificationResult {
    /// XP granted for the event itself (achievement rewards not included)
    pub xp_awarded: u64,

    /// Whether the event pushed the user over a level threshold
    pub leveled_up: bool,

    /// The user's level after the event
    pub new_level: u32,

    /// Achievements that unlocked during this event
    pub newly_unlocked: Vec<AchievementDefinition>,

    /// The user's streak after the event
    pub current_streak: u32,
}
