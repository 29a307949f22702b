use std::path::{Path, PathBuf};

use cardio_tracker_lib::SessionSummary;

use crate::{database::db::HistoryDatabase, DataManagerError, HistoryStore, DATABASE_FILE, DATA_DIR};

#[derive(Clone)]
pub struct DataManager {
    pub(crate) database: HistoryDatabase,
}

/// The public interface for the persisted workout history.
impl DataManager {
    pub async fn start(data_dir: &Path) -> Result<Self, DataManagerError> {
        // Create data dir if it doesn't exist
        if !data_dir.exists() {
            std::fs::create_dir_all(data_dir)
                .map_err(|err| DataManagerError::Io(format!("Failed to create data directory {data_dir:?}: {err}")))?;
        }

        let database = HistoryDatabase::connect(&data_dir.join(DATABASE_FILE)).await?;
        tracing::debug!("History database opened in {:?}", data_dir);

        Ok(DataManager {
            database,
        })
    }

    /// Keeps the data next to the workspace, like the rest of the tooling expects.
    pub async fn start_in_project() -> Result<Self, DataManagerError> {
        Self::start(&default_data_dir()?).await
    }

    pub async fn in_memory() -> Result<Self, DataManagerError> {
        Ok(DataManager {
            database: HistoryDatabase::in_memory().await?,
        })
    }

    pub async fn record_session(&self, summary: &SessionSummary) -> Result<i64, DataManagerError> {
        self.database.insert_summary(summary).await
    }

    pub async fn get_session(&self, summary_id: i64) -> Result<SessionSummary, DataManagerError> {
        self.database.get_summary(summary_id).await
    }

    pub async fn get_sessions(&self) -> Result<Vec<SessionSummary>, DataManagerError> {
        self.database.get_summaries().await
    }

    /// Newest first, paired with the id to pass to `get_session` or `forget_session`.
    pub async fn get_session_entries(&self) -> Result<Vec<(i64, SessionSummary)>, DataManagerError> {
        self.database.get_entries().await
    }

    pub async fn forget_session(&self, summary_id: i64) -> Result<bool, DataManagerError> {
        self.database.delete_summary(summary_id).await
    }
}

#[async_trait::async_trait]
impl HistoryStore for DataManager {
    async fn record(&self, summary: &SessionSummary) -> Result<(), DataManagerError> {
        self.record_session(summary).await.map(|_| ())
    }

    async fn list(&self) -> Result<Vec<SessionSummary>, DataManagerError> {
        self.get_sessions().await
    }
}

pub fn default_data_dir() -> Result<PathBuf, DataManagerError> {
    project_root::get_project_root()
        .map(|root| root.join(DATA_DIR))
        .map_err(|err| DataManagerError::Io(format!("Failed to locate project root: {err}")))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, TimeZone, Utc};

    use super::*;

    #[tokio::test]
    async fn records_through_history_store() {
        let data_manager = DataManager::in_memory().await.unwrap();
        let summary = SessionSummary::new(321., 90., 4, Some(2.), Utc::now(), Utc::now());

        data_manager.record(&summary).await.unwrap();

        let sessions = data_manager.list().await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].distance_m, 321.);
        assert_eq!(sessions[0].route_points, 4);
    }

    #[tokio::test]
    async fn get_and_forget_by_id() {
        let data_manager = DataManager::in_memory().await.unwrap();
        let completed_at = Utc.with_ymd_and_hms(2025, 6, 1, 7, 8, 0).unwrap();
        let summary = SessionSummary::new(1609.34, 480., 12, None, completed_at - TimeDelta::minutes(8), completed_at);

        let id = data_manager.record_session(&summary).await.unwrap();
        assert_eq!(data_manager.get_session(id).await.unwrap(), summary);
        assert_eq!(data_manager.get_session_entries().await.unwrap(), vec![(id, summary)]);

        assert!(data_manager.forget_session(id).await.unwrap());
        assert!(!data_manager.forget_session(id).await.unwrap());
        assert!(data_manager.get_session(id).await.is_err());
    }

    #[tokio::test]
    async fn start_creates_data_dir() {
        let dir = std::env::temp_dir().join(format!("cardio_tracker_{}_{}", std::process::id(), Utc::now().timestamp_nanos_opt().unwrap_or_default()));
        let data_manager = DataManager::start(&dir).await.unwrap();

        assert!(dir.join(DATABASE_FILE).exists());
        assert!(data_manager.get_sessions().await.unwrap().is_empty());

        drop(data_manager);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
