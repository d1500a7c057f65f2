//! Condition evaluation - completion ratios from a stats snapshot.

use questlog_core::{Condition, UserStatsSnapshot};

use crate::error::{GamifyError, Result};

/// How far along a condition is, as a ratio in [0, 1].
///
/// Exhaustive over the closed [`Condition`] set - a new variant cannot
/// compile without deciding its ratio here. A module missing from the
/// snapshot map counts as zero completed goals.
pub fn completion_ratio(condition: &Condition, stats: &UserStatsSnapshot) -> Result<f64> {
    match condition {
        Condition::GoalsCreated { count } => fraction(stats.goals_created, *count),
        Condition::GoalsCompleted { count } => fraction(stats.goals_completed, *count),
        Condition::ModuleGoalsCompleted { module, count } => {
            fraction(stats.completed_in_module(module), *count)
        }
        Condition::StreakDays { days } => {
            fraction(u64::from(stats.current_streak), u64::from(*days))
        }
        Condition::XpEarned { amount } => fraction(stats.total_xp, *amount),
    }
}

fn fraction(have: u64, need: u64) -> Result<f64> {
    if need == 0 {
        return Err(GamifyError::Validation(
            "condition threshold must be positive".to_string(),
        ));
    }
    Ok((have as f64 / need as f64).min(1.0))
}
