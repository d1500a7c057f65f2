//! SQLite storage backend for Questlog.
//!
//! The durable backend. XP and achievement state live in real columns so
//! the two contracts the engine depends on are enforced by the database
//! itself: `UPDATE ... SET total_xp = total_xp + ?` for increments, and a
//! conditional update guarded by `is_completed = 0` (backed by the
//! `UNIQUE(user_id, achievement_id)` constraint) for completions.

use async_trait::async_trait;
use chrono::NaiveDate;
use questlog_core::{
    AchievementDefinition, AchievementId, Condition, Goal, GoalId, GoalStatus, Time,
    UserAchievementProgress, UserId, UserProfile, UserStatsSnapshot,
};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::collections::BTreeSet;
use std::path::Path;

use super::trait_::{GamificationStore, Result, StorageError};

/// SQLite storage implementation.
#[derive(Clone)]
pub struct SqliteStore {
    /// Database connection pool
    pool: sqlx::SqlitePool,
}

fn sqlx_err(e: sqlx::Error) -> StorageError {
    StorageError::Other(e.to_string())
}

fn user_not_found(id: UserId) -> StorageError {
    StorageError::NotFound(format!("user {id}"))
}

impl SqliteStore {
    /// Open (creating if missing) a database file at the given path.
    pub async fn open(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(sqlx_err)?;

        let store = Self { pool };
        store.init_schema().await?;

        Ok(store)
    }

    /// Create an in-memory SQLite store for testing.
    ///
    /// Capped at one connection: every pooled `:memory:` connection would
    /// otherwise get its own private database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .map_err(sqlx_err)?;

        let store = Self { pool };
        store.init_schema().await?;

        Ok(store)
    }

    /// Initialize the database schema.
    async fn init_schema(&self) -> Result<()> {
        let statements = [
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                total_xp INTEGER NOT NULL DEFAULT 0,
                current_level INTEGER NOT NULL DEFAULT 1,
                streak_count INTEGER NOT NULL DEFAULT 0,
                last_activity_at TEXT,
                created_at TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS goals (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                module TEXT NOT NULL,
                title TEXT NOT NULL,
                difficulty TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                completed_at TEXT
            )",
            "CREATE INDEX IF NOT EXISTS idx_goals_user ON goals(user_id)",
            "CREATE TABLE IF NOT EXISTS activity_log (
                user_id TEXT NOT NULL,
                occurred_at TEXT NOT NULL
            )",
            "CREATE INDEX IF NOT EXISTS idx_activity_user ON activity_log(user_id, occurred_at)",
            "CREATE TABLE IF NOT EXISTS achievement_definitions (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                xp_reward INTEGER NOT NULL,
                condition TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS user_achievements (
                user_id TEXT NOT NULL,
                achievement_id TEXT NOT NULL,
                progress REAL NOT NULL DEFAULT 0,
                is_completed INTEGER NOT NULL DEFAULT 0,
                completed_at TEXT,
                UNIQUE(user_id, achievement_id)
            )",
        ];

        for sql in statements {
            sqlx::query(sql).execute(&self.pool).await.map_err(sqlx_err)?;
        }

        Ok(())
    }

    fn user_from_row(row: &SqliteRow) -> Result<UserProfile> {
        Ok(UserProfile {
            id: parse_user_id(&row.try_get::<String, _>("id").map_err(sqlx_err)?)?,
            name: row.try_get("name").map_err(sqlx_err)?,
            total_xp: row.try_get::<i64, _>("total_xp").map_err(sqlx_err)? as u64,
            current_level: row.try_get::<i64, _>("current_level").map_err(sqlx_err)? as u32,
            streak_count: row.try_get::<i64, _>("streak_count").map_err(sqlx_err)? as u32,
            last_activity_at: row
                .try_get::<Option<String>, _>("last_activity_at")
                .map_err(sqlx_err)?
                .map(|s| parse_time(&s))
                .transpose()?,
            created_at: parse_time(&row.try_get::<String, _>("created_at").map_err(sqlx_err)?)?,
        })
    }

    fn goal_from_row(row: &SqliteRow) -> Result<Goal> {
        Ok(Goal {
            id: parse_goal_id(&row.try_get::<String, _>("id").map_err(sqlx_err)?)?,
            user_id: parse_user_id(&row.try_get::<String, _>("user_id").map_err(sqlx_err)?)?,
            module: questlog_core::ModuleId::new(
                row.try_get::<String, _>("module").map_err(sqlx_err)?,
            ),
            title: row.try_get("title").map_err(sqlx_err)?,
            difficulty: row
                .try_get::<String, _>("difficulty")
                .map_err(sqlx_err)?
                .parse()
                .map_err(|e: questlog_core::UnknownDifficulty| StorageError::Other(e.to_string()))?,
            status: status_from_str(&row.try_get::<String, _>("status").map_err(sqlx_err)?)?,
            created_at: parse_time(&row.try_get::<String, _>("created_at").map_err(sqlx_err)?)?,
            completed_at: row
                .try_get::<Option<String>, _>("completed_at")
                .map_err(sqlx_err)?
                .map(|s| parse_time(&s))
                .transpose()?,
        })
    }

    fn definition_from_row(row: &SqliteRow) -> Result<AchievementDefinition> {
        let condition: Condition =
            serde_json::from_str(&row.try_get::<String, _>("condition").map_err(sqlx_err)?)?;
        Ok(AchievementDefinition {
            id: AchievementId::new(row.try_get::<String, _>("id").map_err(sqlx_err)?),
            name: row.try_get("name").map_err(sqlx_err)?,
            description: row.try_get("description").map_err(sqlx_err)?,
            xp_reward: row.try_get::<i64, _>("xp_reward").map_err(sqlx_err)? as u64,
            condition,
        })
    }

    fn progress_from_row(row: &SqliteRow) -> Result<UserAchievementProgress> {
        Ok(UserAchievementProgress {
            user_id: parse_user_id(&row.try_get::<String, _>("user_id").map_err(sqlx_err)?)?,
            achievement_id: AchievementId::new(
                row.try_get::<String, _>("achievement_id").map_err(sqlx_err)?,
            ),
            progress: row.try_get("progress").map_err(sqlx_err)?,
            is_completed: row.try_get::<i64, _>("is_completed").map_err(sqlx_err)? != 0,
            completed_at: row
                .try_get::<Option<String>, _>("completed_at")
                .map_err(sqlx_err)?
                .map(|s| parse_time(&s))
                .transpose()?,
        })
    }
}

fn parse_time(s: &str) -> Result<Time> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&chrono::Utc))
        .map_err(|e| StorageError::Other(format!("bad timestamp {s:?}: {e}")))
}

fn parse_user_id(s: &str) -> Result<UserId> {
    s.parse().map_err(|_| StorageError::Other(format!("bad user id {s:?}")))
}

fn parse_goal_id(s: &str) -> Result<GoalId> {
    s.parse().map_err(|_| StorageError::Other(format!("bad goal id {s:?}")))
}

fn status_to_str(status: GoalStatus) -> &'static str {
    match status {
        GoalStatus::Active => "active",
        GoalStatus::Completed => "completed",
        GoalStatus::Abandoned => "abandoned",
    }
}

fn status_from_str(s: &str) -> Result<GoalStatus> {
    match s {
        "active" => Ok(GoalStatus::Active),
        "completed" => Ok(GoalStatus::Completed),
        "abandoned" => Ok(GoalStatus::Abandoned),
        other => Err(StorageError::Other(format!("bad goal status {other:?}"))),
    }
}

#[async_trait]
impl GamificationStore for SqliteStore {
    // === User operations ===

    async fn create_user(&self, name: &str) -> Result<UserProfile> {
        let user = UserProfile::new(name);

        sqlx::query(
            "INSERT INTO users (id, name, total_xp, current_level, streak_count, created_at)
            VALUES (?, ?, 0, 1, 0, ?)",
        )
        .bind(user.id.to_string())
        .bind(&user.name)
        .bind(user.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(sqlx_err)?;

        Ok(user)
    }

    async fn load_user(&self, id: UserId) -> Result<Option<UserProfile>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(sqlx_err)?;

        row.map(|r| Self::user_from_row(&r)).transpose()
    }

    async fn list_users(&self) -> Result<Vec<UserProfile>> {
        let rows = sqlx::query("SELECT * FROM users ORDER BY created_at")
            .fetch_all(&self.pool)
            .await
            .map_err(sqlx_err)?;

        rows.iter().map(Self::user_from_row).collect()
    }

    // === Activity operations ===

    async fn record_activity(&self, user_id: UserId, occurred_at: Time) -> Result<()> {
        if self.load_user(user_id).await?.is_none() {
            return Err(user_not_found(user_id));
        }

        sqlx::query("INSERT INTO activity_log (user_id, occurred_at) VALUES (?, ?)")
            .bind(user_id.to_string())
            .bind(occurred_at.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(sqlx_err)?;

        Ok(())
    }

    async fn recent_activity_days(
        &self,
        user_id: UserId,
        lookback_days: u32,
    ) -> Result<Vec<NaiveDate>> {
        let cutoff = chrono::Utc::now() - chrono::Duration::days(i64::from(lookback_days));

        // RFC 3339 in UTC sorts lexicographically, so a string compare is
        // a correct cutoff filter.
        let rows = sqlx::query(
            "SELECT occurred_at FROM activity_log WHERE user_id = ? AND occurred_at >= ?",
        )
        .bind(user_id.to_string())
        .bind(cutoff.to_rfc3339())
        .fetch_all(&self.pool)
        .await
        .map_err(sqlx_err)?;

        let mut days = BTreeSet::new();
        for row in rows {
            let ts: String = row.try_get("occurred_at").map_err(sqlx_err)?;
            days.insert(parse_time(&ts)?.date_naive());
        }

        Ok(days.into_iter().collect())
    }

    async fn save_user_streak(
        &self,
        user_id: UserId,
        streak: u32,
        last_activity_at: Time,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE users SET streak_count = ?, last_activity_at = ? WHERE id = ?",
        )
        .bind(i64::from(streak))
        .bind(last_activity_at.to_rfc3339())
        .bind(user_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(user_not_found(user_id));
        }
        Ok(())
    }

    // === Goal operations ===

    async fn save_goal(&self, goal: &Goal) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO goals
                (id, user_id, module, title, difficulty, status, created_at, completed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(goal.id.to_string())
        .bind(goal.user_id.to_string())
        .bind(goal.module.as_str())
        .bind(&goal.title)
        .bind(goal.difficulty.to_string())
        .bind(status_to_str(goal.status))
        .bind(goal.created_at.to_rfc3339())
        .bind(goal.completed_at.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await
        .map_err(sqlx_err)?;

        Ok(())
    }

    async fn load_goal(&self, id: GoalId) -> Result<Option<Goal>> {
        let row = sqlx::query("SELECT * FROM goals WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(sqlx_err)?;

        row.map(|r| Self::goal_from_row(&r)).transpose()
    }

    async fn list_goals(&self, user_id: UserId) -> Result<Vec<Goal>> {
        let rows = sqlx::query("SELECT * FROM goals WHERE user_id = ? ORDER BY created_at")
            .bind(user_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(sqlx_err)?;

        rows.iter().map(Self::goal_from_row).collect()
    }

    // === Statistics ===

    async fn user_stats_snapshot(&self, user_id: UserId) -> Result<UserStatsSnapshot> {
        let user = self.load_user(user_id).await?.ok_or_else(|| user_not_found(user_id))?;

        let created: i64 = sqlx::query("SELECT COUNT(*) AS n FROM goals WHERE user_id = ?")
            .bind(user_id.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(sqlx_err)?
            .try_get("n")
            .map_err(sqlx_err)?;

        let rows = sqlx::query(
            "SELECT module, COUNT(*) AS n FROM goals
            WHERE user_id = ? AND status = 'completed'
            GROUP BY module",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(sqlx_err)?;

        let mut snapshot = UserStatsSnapshot {
            goals_created: created as u64,
            total_xp: user.total_xp,
            current_streak: user.streak_count,
            ..Default::default()
        };

        for row in rows {
            let module: String = row.try_get("module").map_err(sqlx_err)?;
            let count: i64 = row.try_get("n").map_err(sqlx_err)?;
            snapshot.goals_completed += count as u64;
            snapshot
                .module_goals_completed
                .insert(questlog_core::ModuleId::new(module), count as u64);
        }

        Ok(snapshot)
    }

    // === XP operations ===

    async fn increment_user_xp(&self, user_id: UserId, delta: u64) -> Result<u64> {
        let row = sqlx::query(
            "UPDATE users SET total_xp = total_xp + ? WHERE id = ? RETURNING total_xp",
        )
        .bind(delta as i64)
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(sqlx_err)?;

        let row = row.ok_or_else(|| user_not_found(user_id))?;
        let total: i64 = row.try_get("total_xp").map_err(sqlx_err)?;
        Ok(total as u64)
    }

    async fn raise_user_level(&self, user_id: UserId, level: u32) -> Result<()> {
        sqlx::query("UPDATE users SET current_level = ? WHERE id = ? AND current_level < ?")
            .bind(i64::from(level))
            .bind(user_id.to_string())
            .bind(i64::from(level))
            .execute(&self.pool)
            .await
            .map_err(sqlx_err)?;

        Ok(())
    }

    // === Achievement operations ===

    async fn seed_achievement_definitions(&self, defs: &[AchievementDefinition]) -> Result<()> {
        for def in defs {
            sqlx::query(
                "INSERT OR REPLACE INTO achievement_definitions
                    (id, name, description, xp_reward, condition)
                VALUES (?, ?, ?, ?, ?)",
            )
            .bind(def.id.as_str())
            .bind(&def.name)
            .bind(&def.description)
            .bind(def.xp_reward as i64)
            .bind(serde_json::to_string(&def.condition)?)
            .execute(&self.pool)
            .await
            .map_err(sqlx_err)?;
        }

        Ok(())
    }

    async fn list_achievement_definitions(&self) -> Result<Vec<AchievementDefinition>> {
        let rows = sqlx::query("SELECT * FROM achievement_definitions ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(sqlx_err)?;

        rows.iter().map(Self::definition_from_row).collect()
    }

    async fn get_or_create_achievement_progress(
        &self,
        user_id: UserId,
        achievement_id: &AchievementId,
    ) -> Result<UserAchievementProgress> {
        sqlx::query(
            "INSERT OR IGNORE INTO user_achievements (user_id, achievement_id, progress, is_completed)
            VALUES (?, ?, 0, 0)",
        )
        .bind(user_id.to_string())
        .bind(achievement_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(sqlx_err)?;

        let row = sqlx::query(
            "SELECT * FROM user_achievements WHERE user_id = ? AND achievement_id = ?",
        )
        .bind(user_id.to_string())
        .bind(achievement_id.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(sqlx_err)?;

        Self::progress_from_row(&row)
    }

    async fn update_achievement_progress(
        &self,
        user_id: UserId,
        achievement_id: &AchievementId,
        progress: f64,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE user_achievements SET progress = MAX(progress, ?)
            WHERE user_id = ? AND achievement_id = ? AND is_completed = 0",
        )
        .bind(progress)
        .bind(user_id.to_string())
        .bind(achievement_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(sqlx_err)?;

        Ok(())
    }

    async fn try_complete_achievement(
        &self,
        user_id: UserId,
        achievement_id: &AchievementId,
        completed_at: Time,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE user_achievements SET is_completed = 1, progress = 1.0, completed_at = ?
            WHERE user_id = ? AND achievement_id = ? AND is_completed = 0",
        )
        .bind(completed_at.to_rfc3339())
        .bind(user_id.to_string())
        .bind(achievement_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(sqlx_err)?;

        Ok(result.rows_affected() == 1)
    }
}
