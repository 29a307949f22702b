use std::{path::Path, str::FromStr};

use cardio_tracker_lib::SessionSummary;
use const_format::concatcp;
use sqlx::{query, query_as, sqlite::{SqliteConnectOptions, SqlitePoolOptions}, Executor, Pool, Sqlite, SqlitePool};

use crate::DataManagerError;

use super::constants::*;

#[derive(sqlx::FromRow)]
struct StoredSummary {
    summary_id: i64,
    #[sqlx(flatten)]
    summary: SessionSummary,
}

#[derive(Clone)]
pub struct HistoryDatabase {
    pool: Pool<Sqlite>,
}

impl HistoryDatabase {
    pub async fn connect(path: &Path) -> Result<Self, DataManagerError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(options).await
            .map_err(|err| DataManagerError::Database(format!("Failed to connect to database {path:?}: {err}")))?;

        let db = Self {
            pool
        };

        db.init().await?;

        Ok(db)
    }

    /// A private database that disappears with the pool.
    pub async fn in_memory() -> Result<Self, DataManagerError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|err| DataManagerError::Database(format!("Invalid database url: {err}")))?;

        // Every connection to :memory: is a fresh database, so keep exactly one alive.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options).await
            .map_err(|err| DataManagerError::Database(format!("Failed to open in-memory database: {err}")))?;

        let db = Self {
            pool
        };

        db.init().await?;

        Ok(db)
    }

    async fn init(&self) -> Result<(), DataManagerError> {
        self.pool.execute(concatcp!("
            CREATE TABLE IF NOT EXISTS ", SUMMARIES_TABLE_NAME, "(",
                SUMMARY_ID,   " INTEGER PRIMARY KEY AUTOINCREMENT,",
                DISTANCE_M,   " REAL NOT NULL,",
                ELAPSED_S,    " REAL NOT NULL,",
                ROUTE_POINTS, " INTEGER NOT NULL,",
                ELEVATION_M,  " REAL,",
                STARTED_AT,   " TIMESTAMP NOT NULL,",
                COMPLETED_AT, " TIMESTAMP NOT NULL
            )")).await
            .map_err(|err| DataManagerError::Database(format!("Failed to create tables: {err}")))
            .map(|_| ())
    }

    pub async fn insert_summary(&self, summary: &SessionSummary) -> Result<i64, DataManagerError> {
        query_as::<_, (i64,)>(concatcp!("
            INSERT INTO ", SUMMARIES_TABLE_NAME, "(",
            SUMMARY_ID, ", ", DISTANCE_M, ", ", ELAPSED_S, ", ", ROUTE_POINTS, ", ", ELEVATION_M, ", ", STARTED_AT, ", ", COMPLETED_AT, ")
            VALUES (NULL, ?1, ?2, ?3, ?4, ?5, ?6) RETURNING ", SUMMARY_ID))
                .bind(summary.distance_m)
                .bind(summary.elapsed_s)
                .bind(summary.route_points as i64)
                .bind(summary.elevation_m)
                .bind(summary.started_at)
                .bind(summary.completed_at)
                .fetch_one(&self.pool).await
                .map_err(|err| DataManagerError::Database(format!("Failed to insert session summary: {err}")))
                .map(|row| row.0)
    }

    pub async fn get_summary(&self, summary_id: i64) -> Result<SessionSummary, DataManagerError> {
        query_as::<_, SessionSummary>(concatcp!("SELECT * FROM ", SUMMARIES_TABLE_NAME, " WHERE ", SUMMARY_ID, " = ?1"))
            .bind(summary_id)
            .fetch_one(&self.pool).await
            .map_err(|err| DataManagerError::Database(format!("Failed to get session summary {summary_id}: {err}")))
    }

    /// Newest first.
    pub async fn get_summaries(&self) -> Result<Vec<SessionSummary>, DataManagerError> {
        query_as::<_, SessionSummary>(concatcp!("SELECT * FROM ", SUMMARIES_TABLE_NAME, " ORDER BY ", COMPLETED_AT, " DESC, ", SUMMARY_ID, " DESC"))
            .fetch_all(&self.pool).await
            .map_err(|err| DataManagerError::Database(format!("Failed to get session summaries: {err}")))
    }

    /// Newest first, with the id each summary is stored under.
    pub async fn get_entries(&self) -> Result<Vec<(i64, SessionSummary)>, DataManagerError> {
        query_as::<_, StoredSummary>(concatcp!("SELECT * FROM ", SUMMARIES_TABLE_NAME, " ORDER BY ", COMPLETED_AT, " DESC, ", SUMMARY_ID, " DESC"))
            .fetch_all(&self.pool).await
            .map_err(|err| DataManagerError::Database(format!("Failed to get session summaries: {err}")))
            .map(|rows| rows.into_iter().map(|row| (row.summary_id, row.summary)).collect())
    }

    pub async fn delete_summary(&self, summary_id: i64) -> Result<bool, DataManagerError> {
        query(concatcp!("DELETE FROM ", SUMMARIES_TABLE_NAME, " WHERE ", SUMMARY_ID, " = ?1"))
            .bind(summary_id)
            .execute(&self.pool).await
            .map_err(|err| DataManagerError::Database(format!("Failed to delete session summary {summary_id}: {err}")))
            .map(|result| result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, TimeZone, Utc};

    use super::*;

    fn summary(minute: u32, distance_m: f64, elevation_m: Option<f64>) -> SessionSummary {
        let completed_at = Utc.with_ymd_and_hms(2025, 5, 3, 18, minute, 0).unwrap();
        SessionSummary::new(distance_m, 300., 17, elevation_m, completed_at - TimeDelta::minutes(5), completed_at)
    }

    #[tokio::test]
    async fn insert_and_get() {
        let db = HistoryDatabase::in_memory().await.unwrap();
        let stored = summary(10, 1234.5, Some(12.));

        let id = db.insert_summary(&stored).await.unwrap();
        assert_eq!(db.get_summary(id).await.unwrap(), stored);
    }

    #[tokio::test]
    async fn summaries_are_newest_first() {
        let db = HistoryDatabase::in_memory().await.unwrap();
        db.insert_summary(&summary(10, 100., None)).await.unwrap();
        db.insert_summary(&summary(30, 300., Some(1.))).await.unwrap();
        db.insert_summary(&summary(20, 200., None)).await.unwrap();

        let distances: Vec<f64> = db.get_summaries().await.unwrap().iter().map(|s| s.distance_m).collect();
        assert_eq!(distances, vec![300., 200., 100.]);
    }

    #[tokio::test]
    async fn delete_summary() {
        let db = HistoryDatabase::in_memory().await.unwrap();
        let id = db.insert_summary(&summary(10, 100., None)).await.unwrap();

        assert!(db.delete_summary(id).await.unwrap());
        assert!(!db.delete_summary(id).await.unwrap());
        assert!(db.get_summaries().await.unwrap().is_empty());
        assert!(db.get_summary(id).await.is_err());
    }

    #[tokio::test]
    async fn entries_carry_ids() {
        let db = HistoryDatabase::in_memory().await.unwrap();
        let old = db.insert_summary(&summary(10, 100., None)).await.unwrap();
        let new = db.insert_summary(&summary(20, 200., Some(4.))).await.unwrap();

        let entries = db.get_entries().await.unwrap();
        assert_eq!(entries, vec![(new, summary(20, 200., Some(4.))), (old, summary(10, 100., None))]);
    }
}
