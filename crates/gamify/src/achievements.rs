//! Achievement engine - decides which achievements newly complete and
//! grants their rewards exactly once.

use questlog_core::{AchievementDefinition, UserAchievementProgress, UserId, UserStatsSnapshot};
use questlog_storage::GamificationStore;
use std::sync::Arc;

use crate::condition::completion_ratio;
use crate::error::Result;
use crate::xp::XpLedger;

/// What one evaluation pass produced.
#[derive(Debug, Clone, Default)]
pub struct AchievementOutcome {
    /// Achievements this pass unlocked (reward granted by this pass)
    pub newly_unlocked: Vec<AchievementDefinition>,

    /// Progress rows this pass moved forward
    pub updated_progress: Vec<UserAchievementProgress>,

    /// XP granted for the unlocks in `newly_unlocked`
    pub xp_from_achievements: u64,
}

/// Evaluates the achievement catalog against user statistics.
///
/// The stored `is_completed` flag is the idempotency guard: a completed
/// row is never evaluated again, and the store's check-and-set is the
/// last line of defense when two evaluations race to complete the same
/// achievement - exactly one wins and awards the XP.
pub struct AchievementEngine<S> {
    store: Arc<S>,
    ledger: XpLedger<S>,
    catalog: Vec<AchievementDefinition>,
}

impl<S: GamificationStore> AchievementEngine<S> {
    /// Build an engine with the catalog loaded from the store.
    pub async fn load(store: Arc<S>) -> Result<Self> {
        let catalog = store.list_achievement_definitions().await?;
        Ok(Self::with_catalog(store, catalog))
    }

    /// Build an engine over an explicit catalog.
    pub fn with_catalog(store: Arc<S>, catalog: Vec<AchievementDefinition>) -> Self {
        Self {
            ledger: XpLedger::new(Arc::clone(&store)),
            store,
            catalog,
        }
    }

    /// The catalog this engine evaluates.
    pub fn catalog(&self) -> &[AchievementDefinition] {
        &self.catalog
    }

    /// Evaluate every not-yet-completed achievement against `stats`.
    ///
    /// Re-running with identical inputs is a no-op: nothing new unlocks
    /// and stored progress is unchanged.
    pub async fn evaluate(
        &self,
        user_id: UserId,
        stats: &UserStatsSnapshot,
    ) -> Result<AchievementOutcome> {
        let now = chrono::Utc::now();
        let mut outcome = AchievementOutcome::default();

        for def in &self.catalog {
            let existing = self
                .store
                .get_or_create_achievement_progress(user_id, &def.id)
                .await?;
            if existing.is_completed {
                continue;
            }

            let ratio = completion_ratio(&def.condition, stats)?;

            if ratio >= 1.0 {
                if self.store.try_complete_achievement(user_id, &def.id, now).await? {
                    let award = self.ledger.award_achievement(user_id, def).await?;
                    outcome.xp_from_achievements += award.xp_awarded;
                    outcome.newly_unlocked.push(def.clone());
                    tracing::debug!(%user_id, achievement = %def.id, "achievement unlocked");
                } else {
                    // Another evaluation completed it between our read and
                    // the check-and-set; it awarded the XP, not us.
                    tracing::debug!(%user_id, achievement = %def.id, "lost completion race");
                }
            } else if ratio > existing.progress {
                self.store
                    .update_achievement_progress(user_id, &def.id, ratio)
                    .await?;
                outcome.updated_progress.push(UserAchievementProgress {
                    progress: ratio,
                    ..existing
                });
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use questlog_core::{AchievementId, Condition, ModuleId};
    use questlog_storage::MemoryStore;

    fn definition(slug: &str, xp: u64, condition: Condition) -> AchievementDefinition {
        AchievementDefinition {
            id: AchievementId::new(slug),
            name: slug.to_string(),
            description: String::new(),
            xp_reward: xp,
            condition,
        }
    }

    fn stats(completed: u64, streak: u32, xp: u64) -> UserStatsSnapshot {
        UserStatsSnapshot {
            goals_created: completed,
            goals_completed: completed,
            total_xp: xp,
            current_streak: streak,
            ..Default::default()
        }
    }

    async fn engine_with(
        defs: Vec<AchievementDefinition>,
    ) -> (Arc<MemoryStore>, AchievementEngine<MemoryStore>, UserId) {
        let store = Arc::new(MemoryStore::new());
        let user = store.create_user("alba").await.unwrap();
        let engine = AchievementEngine::with_catalog(Arc::clone(&store), defs);
        (store, engine, user.id)
    }

    #[tokio::test]
    async fn unlock_awards_xp_once() {
        let defs = vec![definition("finisher", 50, Condition::GoalsCompleted { count: 1 })];
        let (store, engine, user) = engine_with(defs).await;

        let outcome = engine.evaluate(user, &stats(1, 0, 0)).await.unwrap();
        assert_eq!(outcome.newly_unlocked.len(), 1);
        assert_eq!(outcome.xp_from_achievements, 50);

        let profile = store.load_user(user).await.unwrap().unwrap();
        assert_eq!(profile.total_xp, 50);

        // Second pass with the same snapshot: nothing new, no double XP.
        let outcome = engine.evaluate(user, &stats(1, 0, 0)).await.unwrap();
        assert!(outcome.newly_unlocked.is_empty());
        assert!(outcome.updated_progress.is_empty());
        assert_eq!(outcome.xp_from_achievements, 0);

        let profile = store.load_user(user).await.unwrap().unwrap();
        assert_eq!(profile.total_xp, 50);
    }

    #[tokio::test]
    async fn partial_progress_is_stored_and_monotonic() {
        let defs = vec![definition("goal-getter", 150, Condition::GoalsCompleted { count: 10 })];
        let (store, engine, user) = engine_with(defs).await;

        let outcome = engine.evaluate(user, &stats(4, 0, 0)).await.unwrap();
        assert_eq!(outcome.updated_progress.len(), 1);
        assert_eq!(outcome.updated_progress[0].progress, 0.4);

        // A snapshot that momentarily looks lower must not regress it.
        let outcome = engine.evaluate(user, &stats(2, 0, 0)).await.unwrap();
        assert!(outcome.updated_progress.is_empty());

        let row = store
            .get_or_create_achievement_progress(user, &AchievementId::new("goal-getter"))
            .await
            .unwrap();
        assert_eq!(row.progress, 0.4);
        assert!(!row.is_completed);
    }

    #[tokio::test]
    async fn lost_race_awards_nothing() {
        let defs = vec![definition("finisher", 50, Condition::GoalsCompleted { count: 1 })];
        let (store, engine, user) = engine_with(defs).await;

        // Another evaluation already completed it.
        store
            .try_complete_achievement(user, &AchievementId::new("finisher"), chrono::Utc::now())
            .await
            .unwrap();

        let outcome = engine.evaluate(user, &stats(1, 0, 0)).await.unwrap();
        assert!(outcome.newly_unlocked.is_empty());
        assert_eq!(outcome.xp_from_achievements, 0);

        let profile = store.load_user(user).await.unwrap().unwrap();
        assert_eq!(profile.total_xp, 0);
    }

    #[tokio::test]
    async fn streak_and_xp_conditions_unlock_together() {
        let defs = vec![
            definition("week-streak", 100, Condition::StreakDays { days: 7 }),
            definition("century", 100, Condition::XpEarned { amount: 1000 }),
            definition(
                "fitness-five",
                100,
                Condition::ModuleGoalsCompleted {
                    module: ModuleId::new("fitness"),
                    count: 5,
                },
            ),
        ];
        let (_store, engine, user) = engine_with(defs).await;

        let outcome = engine.evaluate(user, &stats(0, 8, 1200)).await.unwrap();
        let unlocked: Vec<_> = outcome
            .newly_unlocked
            .iter()
            .map(|d| d.id.as_str().to_string())
            .collect();
        assert_eq!(unlocked, vec!["week-streak", "century"]);
        assert_eq!(outcome.xp_from_achievements, 200);
    }
}
