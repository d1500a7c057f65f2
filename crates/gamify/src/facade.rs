//! The facade domain modules call after recording an event.

use async_trait::async_trait;
use questlog_core::{GamificationEvent, GamificationResult, UserId};
use questlog_storage::GamificationStore;
use std::sync::Arc;

use crate::achievements::AchievementEngine;
use crate::error::Result;
use crate::streak::StreakTracker;
use crate::xp::XpLedger;

/// The single inbound operation the rest of the application consumes.
#[async_trait]
pub trait Gamification: Send + Sync {
    /// Convert one domain event into XP, streak and achievement updates.
    async fn handle_event(
        &self,
        user_id: UserId,
        event: GamificationEvent,
    ) -> Result<GamificationResult>;
}

/// Sequences streak tracking, the XP ledger and the achievement engine.
///
/// Step order is load-bearing: the XP award uses the streak computed for
/// this event (a streak that becomes active today is rewarded
/// immediately), and achievements are evaluated against a snapshot taken
/// after the award so `XpEarned`/`StreakDays` conditions see post-award
/// values.
pub struct GamificationFacade<S> {
    store: Arc<S>,
    streaks: StreakTracker<S>,
    ledger: XpLedger<S>,
    achievements: AchievementEngine<S>,
}

impl<S: GamificationStore> GamificationFacade<S> {
    /// Build a facade with the achievement catalog loaded from the store.
    pub async fn load(store: Arc<S>) -> Result<Self> {
        let achievements = AchievementEngine::load(Arc::clone(&store)).await?;
        Ok(Self {
            streaks: StreakTracker::new(Arc::clone(&store)),
            ledger: XpLedger::new(Arc::clone(&store)),
            achievements,
            store,
        })
    }

    /// Build a facade over an explicit catalog.
    pub fn with_catalog(
        store: Arc<S>,
        catalog: Vec<questlog_core::AchievementDefinition>,
    ) -> Self {
        Self {
            streaks: StreakTracker::new(Arc::clone(&store)),
            ledger: XpLedger::new(Arc::clone(&store)),
            achievements: AchievementEngine::with_catalog(Arc::clone(&store), catalog),
            store,
        }
    }

    /// The streak tracker, for read-only display paths.
    pub fn streaks(&self) -> &StreakTracker<S> {
        &self.streaks
    }

    /// The achievement engine, for read-only display paths.
    pub fn achievements(&self) -> &AchievementEngine<S> {
        &self.achievements
    }
}

#[async_trait]
impl<S: GamificationStore> Gamification for GamificationFacade<S> {
    async fn handle_event(
        &self,
        user_id: UserId,
        event: GamificationEvent,
    ) -> Result<GamificationResult> {
        let now = chrono::Utc::now();

        // 1. This event is itself activity; record it before deriving the
        //    streak so today counts.
        self.store.record_activity(user_id, now).await?;

        // 2. Derive and persist the new streak.
        let streak = self.streaks.current(user_id).await?;
        self.store
            .save_user_streak(user_id, streak.current_streak, now)
            .await?;

        // 3. Award base + bonus XP using the new streak.
        let award = self
            .ledger
            .award(user_id, event.action(), event.difficulty(), streak.current_streak)
            .await?;

        // 4. Re-snapshot so conditions see the post-award XP and streak,
        //    then evaluate achievements.
        let stats = self.store.user_stats_snapshot(user_id).await?;
        let outcome = self.achievements.evaluate(user_id, &stats).await?;

        tracing::debug!(
            %user_id,
            xp = award.xp_awarded,
            streak = streak.current_streak,
            unlocked = outcome.newly_unlocked.len(),
            "handled gamification event"
        );

        Ok(GamificationResult {
            xp_awarded: award.xp_awarded,
            leveled_up: award.leveled_up,
            new_level: award.level_after,
            newly_unlocked: outcome.newly_unlocked,
            current_streak: streak.current_streak,
        })
    }
}
