//! SQLite-backed progression storage.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use emberrpg_domain::{PlayerId, PlayerProgression};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::connection::{bounded, connect_pool};
use crate::infrastructure::config::DatabaseConfig;
use crate::infrastructure::ports::{ClockPort, ProgressionRepo, RepoError, SaveOutcome};

/// SQLite implementation of [`ProgressionRepo`].
///
/// `last_ability_at` is stored as fixed-width RFC 3339 (microseconds, `Z`)
/// so string comparison in SQL matches time order.
pub struct SqliteProgressionRepo {
    pool: SqlitePool,
    clock: Arc<dyn ClockPort>,
    query_timeout: Duration,
}

impl SqliteProgressionRepo {
    pub fn new(pool: SqlitePool, clock: Arc<dyn ClockPort>, query_timeout: Duration) -> Self {
        Self {
            pool,
            clock,
            query_timeout,
        }
    }

    pub async fn connect(
        config: &DatabaseConfig,
        clock: Arc<dyn ClockPort>,
    ) -> Result<Self, RepoError> {
        let pool = connect_pool(config).await?;
        Ok(Self::new(pool, clock, config.query_timeout()))
    }

    /// Number of players with a stored row.
    pub async fn count_players(&self) -> Result<u64, RepoError> {
        let count: i64 = bounded(
            "count_players",
            self.query_timeout,
            sqlx::query_scalar("SELECT COUNT(*) FROM player_progression").fetch_one(&self.pool),
        )
        .await?;
        Ok(count.max(0) as u64)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn fetch(&self, id: PlayerId) -> Result<Option<PlayerProgression>, RepoError> {
        let row = bounded(
            "load_progression",
            self.query_timeout,
            sqlx::query(
                "SELECT player_id, xp, level, last_ability_at FROM player_progression WHERE player_id = ?",
            )
            .bind(id.to_storage_key())
            .fetch_optional(&self.pool),
        )
        .await?;

        row.as_ref().map(row_to_record).transpose()
    }
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RepoError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepoError::serialization(format!("Invalid datetime {raw:?}: {e}")))
}

fn row_to_record(row: &SqliteRow) -> Result<PlayerProgression, RepoError> {
    let column = |name: &str, e: sqlx::Error| RepoError::serialization(format!("{name}: {e}"));

    let key: i64 = row.try_get("player_id").map_err(|e| column("player_id", e))?;
    let id = PlayerId::from_storage_key(key);

    let xp: i64 = row.try_get("xp").map_err(|e| column("xp", e))?;
    let xp = u32::try_from(xp)
        .map_err(|_| RepoError::serialization(format!("player {id} has invalid xp {xp}")))?;

    let level: i64 = row.try_get("level").map_err(|e| column("level", e))?;
    let level = u32::try_from(level)
        .map_err(|_| RepoError::serialization(format!("player {id} has invalid level {level}")))?;

    let last_ability_at: Option<String> = row
        .try_get("last_ability_at")
        .map_err(|e| column("last_ability_at", e))?;
    let last_ability_at = last_ability_at.as_deref().map(parse_timestamp).transpose()?;

    PlayerProgression::restore(id, xp, level, last_ability_at)
        .map_err(|e| RepoError::serialization(e.to_string()))
}

#[async_trait]
impl ProgressionRepo for SqliteProgressionRepo {
    async fn ensure_schema(&self) -> Result<(), RepoError> {
        bounded(
            "ensure_schema",
            self.query_timeout,
            sqlx::query(
                r#"
                CREATE TABLE IF NOT EXISTS player_progression (
                    player_id INTEGER PRIMARY KEY,
                    xp INTEGER NOT NULL DEFAULT 0,
                    level INTEGER NOT NULL DEFAULT 1,
                    last_ability_at TEXT,
                    updated_at TEXT NOT NULL
                )
                "#,
            )
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn load_or_create(&self, id: PlayerId) -> Result<PlayerProgression, RepoError> {
        if let Some(record) = self.fetch(id).await? {
            return Ok(record);
        }

        // Losing an insert race is fine: the re-select returns the winner's row.
        let inserted = bounded(
            "create_progression",
            self.query_timeout,
            sqlx::query(
                r#"
                INSERT INTO player_progression (player_id, xp, level, last_ability_at, updated_at)
                VALUES (?, 0, 1, NULL, ?)
                ON CONFLICT(player_id) DO NOTHING
                "#,
            )
            .bind(id.to_storage_key())
            .bind(format_timestamp(self.clock.now()))
            .execute(&self.pool),
        )
        .await?;

        if inserted.rows_affected() > 0 {
            tracing::debug!(player_id = %id, "Created progression row");
        }

        self.fetch(id)
            .await?
            .ok_or_else(|| RepoError::not_found("PlayerProgression", id))
    }

    async fn save(&self, record: &PlayerProgression) -> Result<SaveOutcome, RepoError> {
        let result = bounded(
            "save_progression",
            self.query_timeout,
            sqlx::query(
                r#"
                INSERT INTO player_progression (player_id, xp, level, last_ability_at, updated_at)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(player_id) DO UPDATE SET
                    xp = excluded.xp,
                    level = excluded.level,
                    last_ability_at = excluded.last_ability_at,
                    updated_at = excluded.updated_at
                WHERE excluded.level > player_progression.level
                   OR (excluded.level = player_progression.level
                       AND excluded.xp > player_progression.xp)
                   OR (excluded.level = player_progression.level
                       AND excluded.xp = player_progression.xp
                       AND COALESCE(excluded.last_ability_at, '')
                           >= COALESCE(player_progression.last_ability_at, ''))
                "#,
            )
            .bind(record.id().to_storage_key())
            .bind(i64::from(record.xp()))
            .bind(i64::from(record.level()))
            .bind(record.last_ability_at().map(format_timestamp))
            .bind(format_timestamp(self.clock.now()))
            .execute(&self.pool),
        )
        .await?;

        if result.rows_affected() > 0 {
            Ok(SaveOutcome::Written)
        } else {
            Ok(SaveOutcome::Superseded)
        }
    }
}
