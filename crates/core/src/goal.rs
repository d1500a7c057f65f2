//! Goal model - the domain record the modules share.

use crate::id::{GoalId, ModuleId, UserId};
use crate::Time;
use serde::{Deserialize, Serialize};

/// A goal a user is working toward inside one of the domain modules.
///
/// Module-specific semantics (what a "fitness goal" means) live with the
/// modules; the engine only cares about counts, difficulty and status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    /// Unique identifier
    pub id: GoalId,

    /// Owning user
    pub user_id: UserId,

    /// Domain module this goal belongs to
    pub module: ModuleId,

    /// Goal title
    pub title: String,

    /// Difficulty, which scales XP rewards
    pub difficulty: Difficulty,

    /// Goal status
    pub status: GoalStatus,

    /// When created
    pub created_at: Time,

    /// When completed, if completed
    pub completed_at: Option<Time>,
}

impl Goal {
    /// Create a new active goal.
    pub fn new(
        user_id: UserId,
        module: ModuleId,
        title: impl Into<String>,
        difficulty: Difficulty,
    ) -> Self {
        Self {
            id: GoalId::new(),
            user_id,
            module,
            title: title.into(),
            difficulty,
            status: GoalStatus::Active,
            created_at: chrono::Utc::now(),
            completed_at: None,
        }
    }
}

/// Goal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GoalStatus {
    /// Goal is being worked on
    Active,
    /// Goal completed
    Completed,
    /// Goal abandoned
    Abandoned,
}

/// Difficulty rating of a goal or progress entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// No multiplier
    Easy,
    /// 1.5x XP
    Medium,
    /// 2x XP
    Hard,
    /// 3x XP
    Expert,
}

impl Difficulty {
    /// The XP multiplier applied to base awards.
    pub fn multiplier(&self) -> f64 {
        match self {
            Self::Easy => 1.0,
            Self::Medium => 1.5,
            Self::Hard => 2.0,
            Self::Expert => 3.0,
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
            Self::Expert => "expert",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Difficulty {
    type Err = UnknownDifficulty;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            "expert" => Ok(Self::Expert),
            other => Err(UnknownDifficulty(other.to_string())),
        }
    }
}

/// Error returned when parsing an unrecognized difficulty string.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown difficulty: {0}")]
pub struct UnknownDifficulty(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multipliers_are_ordered() {
        assert!(Difficulty::Easy.multiplier() < Difficulty::Medium.multiplier());
        assert!(Difficulty::Medium.multiplier() < Difficulty::Hard.multiplier());
        assert!(Difficulty::Hard.multiplier() < Difficulty::Expert.multiplier());
    }

    #[test]
    fn parse_round_trips() {
        for d in [
            Difficulty::Easy,
            Difficulty::Medium,
            Difficulty::Hard,
            Difficulty::Expert,
        ] {
            assert_eq!(d.to_string().parse::<Difficulty>().unwrap(), d);
        }
        assert!("legendary".parse::<Difficulty>().is_err());
    }
}
