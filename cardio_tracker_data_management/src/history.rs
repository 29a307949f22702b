use std::sync::Arc;

use cardio_tracker_lib::SessionSummary;
use tokio::{sync::{mpsc::UnboundedReceiver, Mutex}, task::JoinHandle};

use crate::DataManagerError;

/// Somewhere finished sessions are kept.
#[async_trait::async_trait]
pub trait HistoryStore: Send + Sync {
    async fn record(&self, summary: &SessionSummary) -> Result<(), DataManagerError>;

    /// Newest first.
    async fn list(&self) -> Result<Vec<SessionSummary>, DataManagerError>;
}

/// History kept in memory for the lifetime of the app.
#[derive(Clone, Default)]
pub struct LocalHistory {
    summaries: Arc<Mutex<Vec<SessionSummary>>>,
}

impl LocalHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl HistoryStore for LocalHistory {
    async fn record(&self, summary: &SessionSummary) -> Result<(), DataManagerError> {
        self.summaries.lock().await.insert(0, summary.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<SessionSummary>, DataManagerError> {
        Ok(self.summaries.lock().await.clone())
    }
}

pub struct HistoryRecorder;

impl HistoryRecorder {
    /// Drains finished sessions from a tracker's history sink into `store`.
    /// The task ends once every sender is gone, yielding how many sessions were recorded.
    pub fn spawn<S: HistoryStore + 'static>(store: S, mut summaries: UnboundedReceiver<SessionSummary>) -> JoinHandle<usize> {
        tokio::spawn(async move {
            let mut recorded = 0;
            while let Some(summary) = summaries.recv().await {
                match store.record(&summary).await {
                    Ok(()) => {
                        recorded += 1;
                        tracing::info!("Recorded session completed at {}", summary.completed_at);
                    },
                    Err(err) => tracing::error!("Failed to record session: {err}"),
                }
            }
            recorded
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tokio::sync::mpsc;

    use super::*;

    fn summary(distance_m: f64) -> SessionSummary {
        SessionSummary::new(distance_m, 60., 3, None, Utc::now(), Utc::now())
    }

    #[tokio::test]
    async fn local_history_lists_newest_first() {
        let history = LocalHistory::new();
        history.record(&summary(1.)).await.unwrap();
        history.record(&summary(2.)).await.unwrap();

        let distances: Vec<f64> = history.list().await.unwrap().iter().map(|s| s.distance_m).collect();
        assert_eq!(distances, vec![2., 1.]);
    }

    #[tokio::test]
    async fn recorder_drains_until_senders_close() {
        let history = LocalHistory::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let recorder = HistoryRecorder::spawn(history.clone(), rx);

        tx.send(summary(10.)).unwrap();
        tx.send(summary(20.)).unwrap();
        drop(tx);

        assert_eq!(recorder.await.unwrap(), 2);
        assert_eq!(history.list().await.unwrap().len(), 2);
    }
}
