//! Questlog gamification engine.
//!
//! Converts raw activity events (progress entries, goal completions) into
//! experience points, levels, continuous-activity streaks and unlocked
//! achievements. Correctness under concurrent writes comes from the
//! storage contract: XP is applied as an atomic increment and achievement
//! completion is an atomic check-and-set, so rewards are granted exactly
//! once despite retries and races.

#![warn(missing_docs)]

mod achievements;
mod catalog;
mod condition;
mod error;
mod facade;
mod streak;
mod xp;

pub use achievements::{AchievementEngine, AchievementOutcome};
pub use catalog::default_catalog;
pub use condition::completion_ratio;
pub use error::{GamifyError, Result};
pub use facade::{Gamification, GamificationFacade};
pub use streak::{streak_from_days, StreakStatus, StreakTracker, ACTIVITY_LOOKBACK_DAYS};
pub use xp::{level_for_xp, streak_multiplier, xp_for_level, XpAward, XpLedger, MAX_STREAK_BONUS_DAYS};
