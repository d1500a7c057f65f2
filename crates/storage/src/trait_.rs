//! Storage trait abstraction.

use async_trait::async_trait;
use chrono::NaiveDate;
use questlog_core::{
    AchievementDefinition, AchievementId, Goal, GoalId, Time, UserAchievementProgress, UserId,
    UserProfile, UserStatsSnapshot,
};

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Item not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Storage abstraction for Questlog gamification data.
///
/// This trait allows different storage backends to be plugged in. All
/// methods take `&self`: the engine is called from many requests at once,
/// so atomicity is a backend obligation, not something an outer lock
/// provides. In particular:
///
/// - [`increment_user_xp`](GamificationStore::increment_user_xp) must be
///   an atomic increment, never a read-modify-write on a stale value.
/// - [`try_complete_achievement`](GamificationStore::try_complete_achievement)
///   must be an atomic check-and-set; exactly one concurrent caller wins.
/// - Progress and level writes only ever move values upward.
#[async_trait]
pub trait GamificationStore: Send + Sync {
    // === User operations ===

    /// Create a new user with the given display name.
    async fn create_user(&self, name: &str) -> Result<UserProfile>;

    /// Load a user by ID.
    async fn load_user(&self, id: UserId) -> Result<Option<UserProfile>>;

    /// List all users.
    async fn list_users(&self) -> Result<Vec<UserProfile>>;

    // === Activity operations ===

    /// Append one activity timestamp for the user.
    async fn record_activity(&self, user_id: UserId, occurred_at: Time) -> Result<()>;

    /// Distinct UTC calendar days with activity within the lookback window.
    async fn recent_activity_days(
        &self,
        user_id: UserId,
        lookback_days: u32,
    ) -> Result<Vec<NaiveDate>>;

    /// Persist the derived streak summary on the user row.
    async fn save_user_streak(
        &self,
        user_id: UserId,
        streak: u32,
        last_activity_at: Time,
    ) -> Result<()>;

    // === Goal operations ===

    /// Save a goal (create or update).
    async fn save_goal(&self, goal: &Goal) -> Result<()>;

    /// Load a goal by ID.
    async fn load_goal(&self, id: GoalId) -> Result<Option<Goal>>;

    /// List a user's goals.
    async fn list_goals(&self, user_id: UserId) -> Result<Vec<Goal>>;

    // === Statistics ===

    /// Compute the statistics snapshot achievement conditions evaluate
    /// against. Fails with [`StorageError::NotFound`] for unknown users.
    async fn user_stats_snapshot(&self, user_id: UserId) -> Result<UserStatsSnapshot>;

    // === XP operations ===

    /// Atomically add `delta` to the user's XP and return the new total.
    ///
    /// Concurrent calls for the same user must all be applied; none may be
    /// lost to a stale read.
    async fn increment_user_xp(&self, user_id: UserId, delta: u64) -> Result<u64>;

    /// Raise the stored level to `level` if it is currently lower.
    ///
    /// A conditional write, so racing award paths can only move the level
    /// forward.
    async fn raise_user_level(&self, user_id: UserId, level: u32) -> Result<()>;

    // === Achievement operations ===

    /// Upsert catalog definitions by ID. Idempotent.
    async fn seed_achievement_definitions(&self, defs: &[AchievementDefinition]) -> Result<()>;

    /// The achievement catalog. Immutable once seeded; cacheable.
    async fn list_achievement_definitions(&self) -> Result<Vec<AchievementDefinition>>;

    /// Fetch the user's progress row for one achievement, creating an
    /// empty row on first evaluation.
    async fn get_or_create_achievement_progress(
        &self,
        user_id: UserId,
        achievement_id: &AchievementId,
    ) -> Result<UserAchievementProgress>;

    /// Store a new progress ratio. The write is monotonic (the stored
    /// value never decreases) and a no-op once the row is completed.
    async fn update_achievement_progress(
        &self,
        user_id: UserId,
        achievement_id: &AchievementId,
        progress: f64,
    ) -> Result<()>;

    /// Atomically mark the achievement completed.
    ///
    /// Returns `true` if this call performed the completion, `false` if
    /// another caller already had - the caller must treat `false` as
    /// "already awarded", not as an error.
    async fn try_complete_achievement(
        &self,
        user_id: UserId,
        achievement_id: &AchievementId,
        completed_at: Time,
    ) -> Result<bool>;
}
