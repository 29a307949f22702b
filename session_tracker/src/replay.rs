use std::sync::{atomic::{AtomicU64, Ordering}, Arc};

use cardio_tracker_lib::RawFix;
use chrono::Utc;
use tokio::sync::mpsc;

use crate::{LocationSource, ManualClock, Permission, Subscription, TrackerError};

/// Plays back a recorded list of fixes as if they were arriving live.
///
/// The attached [`ManualClock`] is moved to each fix's timestamp when the
/// subscriber receives it, so a tracker using that clock measures the
/// recorded duration rather than how long the replay took.
#[derive(Debug, Clone)]
pub struct ReplayLocationSource {
    fixes: Arc<Vec<RawFix>>,
    clock: ManualClock,
    next_id: Arc<AtomicU64>,
}

impl ReplayLocationSource {
    pub fn new(fixes: Vec<RawFix>) -> Self {
        let start = fixes.first().map(|fix| fix.timestamp).unwrap_or_else(Utc::now);

        Self {
            fixes: Arc::new(fixes),
            clock: ManualClock::new(start),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn clock(&self) -> ManualClock {
        self.clock.clone()
    }

    pub fn len(&self) -> usize {
        self.fixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixes.is_empty()
    }
}

#[async_trait::async_trait]
impl LocationSource for ReplayLocationSource {
    async fn request_permission(&self) -> Permission {
        Permission::Granted
    }

    async fn subscribe(&self) -> Result<Subscription, TrackerError> {
        let (tx, rx) = mpsc::channel(1);
        let fixes = self.fixes.clone();

        tokio::spawn(async move {
            for fix in fixes.iter() {
                if tx.send(fix.clone()).await.is_err() {
                    tracing::debug!("Replay unsubscribed, stopping playback");
                    return;
                }
            }
            tracing::debug!("Replay finished after {} fixes", fixes.len());
        });

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        Ok(Subscription::new(id, rx).following_clock(self.clock.clone()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;
    use crate::Clock;

    #[tokio::test]
    async fn replays_in_order_and_moves_clock() {
        let t0 = Utc::now();
        let fixes: Vec<RawFix> = (0..3)
            .map(|i| RawFix::new(56., 10. + i as f64, 5., t0 + TimeDelta::seconds(i * 10)))
            .collect();

        let source = ReplayLocationSource::new(fixes);
        assert_eq!(source.len(), 3);
        assert!(!source.is_empty());
        assert_eq!(source.clock().now(), t0);

        let mut subscription = source.subscribe().await.unwrap();
        let mut longitudes = Vec::new();
        while let Some(fix) = subscription.next().await {
            longitudes.push(fix.longitude.unwrap());
        }

        assert_eq!(longitudes, vec![10., 11., 12.]);
        assert_eq!(source.clock().now(), t0 + TimeDelta::seconds(20));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn clock_waits_for_the_subscriber() {
        let t0 = Utc::now();
        let fixes: Vec<RawFix> = (0..3)
            .map(|i| RawFix::new(56., 10. + i as f64, 5., t0 + TimeDelta::seconds(i * 30)))
            .collect();

        let source = ReplayLocationSource::new(fixes);
        let mut subscription = source.subscribe().await.unwrap();

        assert_eq!(subscription.next().await.unwrap().timestamp, t0);
        // Give playback time to queue the rest.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(source.clock().now(), t0);

        subscription.next().await.unwrap();
        assert_eq!(source.clock().now(), t0 + TimeDelta::seconds(30));
    }

    #[test]
    fn empty_replay_starts_now() {
        let source = ReplayLocationSource::new(Vec::new());
        assert!(source.is_empty());
        assert!(source.clock().now() <= Utc::now());
    }
}
