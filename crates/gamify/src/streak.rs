//! Streak tracking - consecutive-calendar-day activity runs.

use chrono::NaiveDate;
use questlog_core::UserId;
use questlog_storage::GamificationStore;
use std::collections::HashSet;
use std::sync::Arc;

use crate::error::Result;

/// How far back activity is fetched when deriving a streak. Anything
/// older cannot extend a streak that is still alive today.
pub const ACTIVITY_LOOKBACK_DAYS: u32 = 400;

/// A derived streak: length and whether it is still alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakStatus {
    /// Consecutive days with activity, ending today or yesterday
    pub current_streak: u32,

    /// False once a full calendar day has passed with no activity
    pub is_active: bool,
}

impl StreakStatus {
    /// The broken/empty streak.
    pub fn broken() -> Self {
        Self {
            current_streak: 0,
            is_active: false,
        }
    }
}

/// Derive the streak from the set of distinct activity days.
///
/// Walks backward from `today`: the streak starts at today (or yesterday,
/// when today has no activity yet) and counts consecutive days until the
/// first gap. A most-recent activity day before yesterday means the
/// streak is broken.
///
/// Pure - calling it redundantly has no effect beyond whatever the caller
/// persists.
pub fn streak_from_days(today: NaiveDate, days: &HashSet<NaiveDate>) -> StreakStatus {
    let yesterday = today - chrono::Duration::days(1);

    let start = if days.contains(&today) {
        today
    } else if days.contains(&yesterday) {
        yesterday
    } else {
        return StreakStatus::broken();
    };

    let mut streak = 0u32;
    let mut day = start;
    while days.contains(&day) {
        streak += 1;
        day = day - chrono::Duration::days(1);
    }

    StreakStatus {
        current_streak: streak,
        is_active: true,
    }
}

/// Storage-backed streak derivation.
pub struct StreakTracker<S> {
    store: Arc<S>,
}

impl<S: GamificationStore> StreakTracker<S> {
    /// Create a tracker over the given store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Compute the user's current streak from recorded activity.
    ///
    /// Does not persist anything; the caller decides what to store.
    pub async fn current(&self, user_id: UserId) -> Result<StreakStatus> {
        let days = self
            .store
            .recent_activity_days(user_id, ACTIVITY_LOOKBACK_DAYS)
            .await?;
        let days: HashSet<NaiveDate> = days.into_iter().collect();
        Ok(streak_from_days(chrono::Utc::now().date_naive(), &days))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn days(today: NaiveDate, offsets: &[i64]) -> HashSet<NaiveDate> {
        offsets
            .iter()
            .map(|o| today - chrono::Duration::days(*o))
            .collect()
    }

    #[test]
    fn no_activity_means_no_streak() {
        let today = date("2026-08-07");
        assert_eq!(streak_from_days(today, &HashSet::new()), StreakStatus::broken());
    }

    #[test]
    fn three_consecutive_days_ending_today() {
        let today = date("2026-08-07");
        let status = streak_from_days(today, &days(today, &[0, 1, 2]));
        assert_eq!(status.current_streak, 3);
        assert!(status.is_active);
    }

    #[test]
    fn streak_can_end_yesterday_and_stay_active() {
        let today = date("2026-08-07");
        let status = streak_from_days(today, &days(today, &[1, 2, 3, 4]));
        assert_eq!(status.current_streak, 4);
        assert!(status.is_active);
    }

    #[test]
    fn last_activity_before_yesterday_breaks_the_streak() {
        let today = date("2026-08-07");
        let status = streak_from_days(today, &days(today, &[3]));
        assert_eq!(status.current_streak, 0);
        assert!(!status.is_active);
    }

    #[test]
    fn gap_stops_the_walk() {
        let today = date("2026-08-07");
        // today, yesterday, then a hole at day-2, more activity beyond
        let status = streak_from_days(today, &days(today, &[0, 1, 3, 4, 5]));
        assert_eq!(status.current_streak, 2);
        assert!(status.is_active);
    }

    #[test]
    fn single_day_today_counts_as_one() {
        let today = date("2026-08-07");
        let status = streak_from_days(today, &days(today, &[0]));
        assert_eq!(status.current_streak, 1);
        assert!(status.is_active);
    }

    #[test]
    fn month_boundaries_do_not_matter() {
        let today = date("2026-03-02");
        let status = streak_from_days(today, &days(today, &[0, 1, 2, 3]));
        assert_eq!(status.current_streak, 4);
        assert!(status.is_active);
    }

    #[tokio::test]
    async fn tracker_reads_recorded_activity() {
        use questlog_storage::MemoryStore;

        let store = Arc::new(MemoryStore::new());
        let tracker = StreakTracker::new(Arc::clone(&store));
        let user = store.create_user("alba").await.unwrap();

        let now = chrono::Utc::now();
        for offset in 0..3 {
            store
                .record_activity(user.id, now - chrono::Duration::days(offset))
                .await
                .unwrap();
        }

        let status = tracker.current(user.id).await.unwrap();
        assert_eq!(status.current_streak, 3);
        assert!(status.is_active);
    }
}
