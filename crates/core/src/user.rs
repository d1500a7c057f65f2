//! User profile - the per-user gamification state.

use crate::id::UserId;
use crate::Time;
use serde::{Deserialize, Serialize};

/// A user of the application, with the accumulated gamification state.
///
/// `current_level` is always the level derived from `total_xp`, and
/// `total_xp` only ever grows; the XP ledger is the sole writer of both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    /// Unique identifier
    pub id: UserId,

    /// Display name
    pub name: String,

    /// Cumulative experience points
    pub total_xp: u64,

    /// Level derived from total XP (>= 1)
    pub current_level: u32,

    /// Length of the current continuous-activity streak in days
    pub streak_count: u32,

    /// Most recent recorded activity, if any
    pub last_activity_at: Option<Time>,

    /// When the user was created
    pub created_at: Time,
}

impl UserProfile {
    /// Create a fresh user with no XP, level 1 and no streak.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: UserId::new(),
            name: name.into(),
            total_xp: 0,
            current_level: 1,
            streak_count: 0,
            last_activity_at: None,
            created_at: chrono::Utc::now(),
        }
    }
}
