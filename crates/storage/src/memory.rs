//! In-memory storage implementation.
//!
//! All state lives behind a single mutex, so every operation - including
//! the XP increment and the achievement check-and-set - is atomic with
//! respect to concurrent callers sharing the store. This is the backend
//! the engine tests run against and a reasonable dev-mode default.

use async_trait::async_trait;
use chrono::NaiveDate;
use questlog_core::{
    AchievementDefinition, AchievementId, Goal, GoalId, GoalStatus, Time, UserAchievementProgress,
    UserId, UserProfile, UserStatsSnapshot,
};
use std::collections::{BTreeSet, HashMap};
use tokio::sync::Mutex;

use super::trait_::{GamificationStore, Result, StorageError};

#[derive(Default)]
struct Inner {
    users: HashMap<UserId, UserProfile>,
    goals: HashMap<GoalId, Goal>,
    activity: HashMap<UserId, Vec<Time>>,
    definitions: Vec<AchievementDefinition>,
    progress: HashMap<(UserId, AchievementId), UserAchievementProgress>,
}

/// Mutex-guarded in-memory backend.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn user_not_found(id: UserId) -> StorageError {
    StorageError::NotFound(format!("user {id}"))
}

#[async_trait]
impl GamificationStore for MemoryStore {
    // === User operations ===

    async fn create_user(&self, name: &str) -> Result<UserProfile> {
        let user = UserProfile::new(name);
        self.inner.lock().await.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn load_user(&self, id: UserId) -> Result<Option<UserProfile>> {
        Ok(self.inner.lock().await.users.get(&id).cloned())
    }

    async fn list_users(&self) -> Result<Vec<UserProfile>> {
        let mut users: Vec<_> = self.inner.lock().await.users.values().cloned().collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    // === Activity operations ===

    async fn record_activity(&self, user_id: UserId, occurred_at: Time) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if !inner.users.contains_key(&user_id) {
            return Err(user_not_found(user_id));
        }
        inner.activity.entry(user_id).or_default().push(occurred_at);
        Ok(())
    }

    async fn recent_activity_days(
        &self,
        user_id: UserId,
        lookback_days: u32,
    ) -> Result<Vec<NaiveDate>> {
        let inner = self.inner.lock().await;
        let cutoff = chrono::Utc::now() - chrono::Duration::days(i64::from(lookback_days));
        let days: BTreeSet<NaiveDate> = inner
            .activity
            .get(&user_id)
            .into_iter()
            .flatten()
            .filter(|ts| **ts >= cutoff)
            .map(|ts| ts.date_naive())
            .collect();
        Ok(days.into_iter().collect())
    }

    async fn save_user_streak(
        &self,
        user_id: UserId,
        streak: u32,
        last_activity_at: Time,
    ) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let user = inner.users.get_mut(&user_id).ok_or_else(|| user_not_found(user_id))?;
        user.streak_count = streak;
        user.last_activity_at = Some(last_activity_at);
        Ok(())
    }

    // === Goal operations ===

    async fn save_goal(&self, goal: &Goal) -> Result<()> {
        self.inner.lock().await.goals.insert(goal.id, goal.clone());
        Ok(())
    }

    async fn load_goal(&self, id: GoalId) -> Result<Option<Goal>> {
        Ok(self.inner.lock().await.goals.get(&id).cloned())
    }

    async fn list_goals(&self, user_id: UserId) -> Result<Vec<Goal>> {
        let mut goals: Vec<_> = self
            .inner
            .lock()
            .await
            .goals
            .values()
            .filter(|g| g.user_id == user_id)
            .cloned()
            .collect();
        goals.sort_by_key(|g| g.created_at);
        Ok(goals)
    }

    // === Statistics ===

    async fn user_stats_snapshot(&self, user_id: UserId) -> Result<UserStatsSnapshot> {
        let inner = self.inner.lock().await;
        let user = inner.users.get(&user_id).ok_or_else(|| user_not_found(user_id))?;

        let mut snapshot = UserStatsSnapshot {
            total_xp: user.total_xp,
            current_streak: user.streak_count,
            ..Default::default()
        };

        for goal in inner.goals.values().filter(|g| g.user_id == user_id) {
            snapshot.goals_created += 1;
            if goal.status == GoalStatus::Completed {
                snapshot.goals_completed += 1;
                *snapshot
                    .module_goals_completed
                    .entry(goal.module.clone())
                    .or_insert(0) += 1;
            }
        }

        Ok(snapshot)
    }

    // === XP operations ===

    async fn increment_user_xp(&self, user_id: UserId, delta: u64) -> Result<u64> {
        let mut inner = self.inner.lock().await;
        let user = inner.users.get_mut(&user_id).ok_or_else(|| user_not_found(user_id))?;
        user.total_xp += delta;
        Ok(user.total_xp)
    }

    async fn raise_user_level(&self, user_id: UserId, level: u32) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let user = inner.users.get_mut(&user_id).ok_or_else(|| user_not_found(user_id))?;
        if level > user.current_level {
            user.current_level = level;
        }
        Ok(())
    }

    // === Achievement operations ===

    async fn seed_achievement_definitions(&self, defs: &[AchievementDefinition]) -> Result<()> {
        let mut inner = self.inner.lock().await;
        for def in defs {
            match inner.definitions.iter_mut().find(|d| d.id == def.id) {
                Some(existing) => *existing = def.clone(),
                None => inner.definitions.push(def.clone()),
            }
        }
        Ok(())
    }

    async fn list_achievement_definitions(&self) -> Result<Vec<AchievementDefinition>> {
        Ok(self.inner.lock().await.definitions.clone())
    }

    async fn get_or_create_achievement_progress(
        &self,
        user_id: UserId,
        achievement_id: &AchievementId,
    ) -> Result<UserAchievementProgress> {
        let mut inner = self.inner.lock().await;
        let row = inner
            .progress
            .entry((user_id, achievement_id.clone()))
            .or_insert_with(|| UserAchievementProgress::new(user_id, achievement_id.clone()));
        Ok(row.clone())
    }

    async fn update_achievement_progress(
        &self,
        user_id: UserId,
        achievement_id: &AchievementId,
        progress: f64,
    ) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let row = inner
            .progress
            .entry((user_id, achievement_id.clone()))
            .or_insert_with(|| UserAchievementProgress::new(user_id, achievement_id.clone()));
        if !row.is_completed && progress > row.progress {
            row.progress = progress;
        }
        Ok(())
    }

    async fn try_complete_achievement(
        &self,
        user_id: UserId,
        achievement_id: &AchievementId,
        completed_at: Time,
    ) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        let row = inner
            .progress
            .entry((user_id, achievement_id.clone()))
            .or_insert_with(|| UserAchievementProgress::new(user_id, achievement_id.clone()));
        if row.is_completed {
            return Ok(false);
        }
        row.is_completed = true;
        row.progress = 1.0;
        row.completed_at = Some(completed_at);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use questlog_core::{Difficulty, ModuleId};
    use std::sync::Arc;

    #[tokio::test]
    async fn increment_is_never_lost_under_concurrency() {
        let store = Arc::new(MemoryStore::new());
        let user = store.create_user("alba").await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..50 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.increment_user_xp(user.id, 10).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let user = store.load_user(user.id).await.unwrap().unwrap();
        assert_eq!(user.total_xp, 500);
    }

    #[tokio::test]
    async fn increment_unknown_user_is_not_found() {
        let store = MemoryStore::new();
        let err = store.increment_user_xp(UserId::new(), 10).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn only_one_concurrent_completion_wins() {
        let store = Arc::new(MemoryStore::new());
        let user = store.create_user("beto").await.unwrap();
        let ach = AchievementId::new("first-goal");
        let now = chrono::Utc::now();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let store = Arc::clone(&store);
            let ach = ach.clone();
            handles.push(tokio::spawn(async move {
                store.try_complete_achievement(user.id, &ach, now).await.unwrap()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn progress_updates_are_monotonic() {
        let store = MemoryStore::new();
        let user = store.create_user("cara").await.unwrap();
        let ach = AchievementId::new("goal-getter");

        store.update_achievement_progress(user.id, &ach, 0.6).await.unwrap();
        store.update_achievement_progress(user.id, &ach, 0.4).await.unwrap();

        let row = store
            .get_or_create_achievement_progress(user.id, &ach)
            .await
            .unwrap();
        assert_eq!(row.progress, 0.6);
    }

    #[tokio::test]
    async fn snapshot_counts_goals_by_module() {
        let store = MemoryStore::new();
        let user = store.create_user("dina").await.unwrap();

        let fitness = ModuleId::new("fitness");
        let learning = ModuleId::new("learning");

        let mut g1 = Goal::new(user.id, fitness.clone(), "run 5k", Difficulty::Medium);
        g1.status = GoalStatus::Completed;
        store.save_goal(&g1).await.unwrap();

        let g2 = Goal::new(user.id, fitness.clone(), "run 10k", Difficulty::Hard);
        store.save_goal(&g2).await.unwrap();

        let mut g3 = Goal::new(user.id, learning.clone(), "read a book", Difficulty::Easy);
        g3.status = GoalStatus::Completed;
        store.save_goal(&g3).await.unwrap();

        let stats = store.user_stats_snapshot(user.id).await.unwrap();
        assert_eq!(stats.goals_created, 3);
        assert_eq!(stats.goals_completed, 2);
        assert_eq!(stats.completed_in_module(&fitness), 1);
        assert_eq!(stats.completed_in_module(&learning), 1);
    }

    #[tokio::test]
    async fn activity_days_are_distinct() {
        let store = MemoryStore::new();
        let user = store.create_user("eryk").await.unwrap();

        let now = chrono::Utc::now();
        store.record_activity(user.id, now).await.unwrap();
        store.record_activity(user.id, now - chrono::Duration::hours(2)).await.unwrap();
        store
            .record_activity(user.id, now - chrono::Duration::days(1))
            .await
            .unwrap();

        let days = store.recent_activity_days(user.id, 30).await.unwrap();
        assert_eq!(days.len(), 2);
    }
}
