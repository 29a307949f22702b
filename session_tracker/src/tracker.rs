use std::sync::Arc;

use cardio_tracker_lib::{FixDecision, FixError, FixFilter, GeoFix, RawFix, SessionMetrics, SessionState, SessionSummary, TrackRoute, units};
use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};

use crate::{Clock, LocationSource, Permission, Subscription, SystemClock, TrackerError};

/// Where finished sessions are sent. Whoever holds the receiver owns them from then on.
pub type HistorySink = mpsc::UnboundedSender<SessionSummary>;

/// What happened to a single fix handed to the tracker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FixOutcome {
    /// The tracker was not tracking.
    Ignored,
    Malformed(FixError),
    Processed(FixDecision),
}

/// Owns one cardio session at a time: Idle -> Tracking -> Stopped -> Idle.
///
/// All mutation goes through `&mut self`, so fixes are processed one at a
/// time by whoever drives [`SessionTracker::next_fix`]. Other tasks can follow
/// the session through [`SessionTracker::watch_metrics`].
///
/// A typical driver selects between fixes and user commands:
///
/// ```ignore
/// loop {
///     tokio::select! {
///         Some(_) = tracker.next_fix() => {}
///         Some(command) = commands.recv() => match command {
///             Command::Stop => tracker.stop(),
///             Command::Finish => { tracker.finish()?; }
///         },
///     }
/// }
/// ```
pub struct SessionTracker<L: LocationSource> {
    source: L,
    history: HistorySink,
    filter: FixFilter,
    clock: Arc<dyn Clock>,

    state: SessionState,
    route: TrackRoute,
    speed_mps: Option<f64>,
    elevation_m: Option<f64>,
    started_at: Option<DateTime<Utc>>,
    stopped_at: Option<DateTime<Utc>>,
    error: Option<String>,

    subscription: Option<Subscription>,
    metrics_tx: watch::Sender<SessionMetrics>,
}

impl<L: LocationSource> SessionTracker<L> {
    pub fn new(source: L, history: HistorySink) -> Self {
        let (metrics_tx, _) = watch::channel(SessionMetrics::default());

        Self {
            source,
            history,
            filter: FixFilter::default(),
            clock: Arc::new(SystemClock),
            state: SessionState::Idle,
            route: TrackRoute::new(),
            speed_mps: None,
            elevation_m: None,
            started_at: None,
            stopped_at: None,
            error: None,
            subscription: None,
            metrics_tx,
        }
    }

    pub fn with_filter(mut self, filter: FixFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Starts a new session. A stopped session that was never finished is
    /// discarded once permission is granted, and kept if it is denied.
    pub async fn start(&mut self) -> Result<(), TrackerError> {
        if self.state == SessionState::Tracking {
            return Err(TrackerError::AlreadyTracking);
        }

        if self.source.request_permission().await == Permission::Denied {
            tracing::warn!("Location permission denied");
            return Err(self.fail_start(TrackerError::PermissionDenied));
        }

        if self.state == SessionState::Stopped {
            tracing::info!("Discarding unfinished session with {} points", self.route.len());
            self.state = SessionState::Idle;
        }

        self.clear();
        self.started_at = Some(self.clock.now());

        let subscription = match self.source.subscribe().await {
            Ok(subscription) => subscription,
            Err(err) => {
                tracing::error!("Failed to subscribe to location updates: {err}");
                self.started_at = None;
                return Err(self.fail_start(err));
            },
        };

        self.subscription = Some(subscription);
        self.state = SessionState::Tracking;
        tracing::info!("Tracking started");
        self.publish();

        Ok(())
    }

    /// Stops listening for fixes. The route stays readable until reset or finish.
    pub fn stop(&mut self) {
        if self.state != SessionState::Tracking {
            return;
        }

        if let Some(subscription) = self.subscription.take() {
            self.source.unsubscribe(subscription);
        }

        self.stopped_at = Some(self.clock.now());
        self.state = SessionState::Stopped;
        tracing::info!("Tracking stopped after {} points, {:.1} m", self.route.len(), self.route.distance_m());
        self.publish();
    }

    pub fn reset(&mut self) {
        self.stop();
        self.clear();
        self.state = SessionState::Idle;
        self.publish();
    }

    /// Records the session in the history and returns to Idle.
    ///
    /// Fails without touching the session when nothing was started or no
    /// fix was ever accepted. If the history has gone away the session is
    /// left stopped so it can still be read.
    pub fn finish(&mut self) -> Result<SessionSummary, TrackerError> {
        if self.state == SessionState::Idle {
            return Err(TrackerError::NotStarted);
        }
        if self.route.is_empty() {
            return Err(TrackerError::EmptySession);
        }

        self.stop();

        let now = self.clock.now();
        let summary = SessionSummary::new(
            self.route.distance_m(),
            self.elapsed_s(now),
            self.route.len(),
            self.elevation_m,
            self.started_at.unwrap_or(now),
            now,
        );

        self.history.send(summary.clone()).map_err(|_| {
            tracing::error!("History store dropped, keeping session");
            TrackerError::HistoryClosed
        })?;

        tracing::info!("Session finished: {}, {} points", units::format_distance(summary.distance_m), summary.route_points);
        self.reset();

        Ok(summary)
    }

    /// Waits for the next fix and processes it.
    /// Returns `None` right away when not tracking, and stops the session if the source ends the stream.
    pub async fn next_fix(&mut self) -> Option<FixOutcome> {
        let fix = match self.subscription.as_mut() {
            Some(subscription) => subscription.next().await,
            None => return None,
        };

        match fix {
            Some(fix) => Some(self.handle_fix(fix)),
            None => {
                tracing::warn!("Location stream ended");
                self.stop();
                None
            },
        }
    }

    pub fn handle_fix(&mut self, raw: RawFix) -> FixOutcome {
        if self.state != SessionState::Tracking {
            return FixOutcome::Ignored;
        }

        let fix = match GeoFix::try_from(raw) {
            Ok(fix) => fix,
            Err(err) => {
                tracing::debug!("Dropping malformed fix: {err}");
                return FixOutcome::Malformed(err);
            },
        };

        let (speed, altitude) = (fix.speed, fix.altitude);
        let decision = self.route.offer(fix, &self.filter);

        match decision {
            FixDecision::Accepted { distance_m } => {
                // A fix without speed keeps the last known speed.
                if let Some(speed) = speed.filter(|s| *s > 0.) {
                    self.speed_mps = Some(speed);
                }
                self.elevation_m = altitude;
                tracing::trace!("Accepted fix, +{distance_m:.1} m");
                self.publish();
            },
            FixDecision::LowAccuracy { accuracy } => tracing::trace!("Rejected fix with accuracy {accuracy:?}"),
            FixDecision::Jitter { distance_m } => tracing::trace!("Rejected jitter of {distance_m:.2} m"),
        }

        FixOutcome::Processed(decision)
    }

    pub fn metrics(&self) -> SessionMetrics {
        let elapsed_s = self.elapsed_s(self.clock.now());

        SessionMetrics {
            state: self.state,
            distance_m: self.route.distance_m(),
            elapsed_s,
            speed_mps: self.speed_mps,
            pace: units::pace_min_per_mile(elapsed_s, self.route.distance_m()),
            elevation_m: self.elevation_m,
            route_points: self.route.len(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn route(&self) -> &TrackRoute {
        &self.route
    }

    /// The message to show the user, if the last start failed.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Snapshots published after every state change and accepted fix.
    pub fn watch_metrics(&self) -> watch::Receiver<SessionMetrics> {
        self.metrics_tx.subscribe()
    }

    fn elapsed_s(&self, now: DateTime<Utc>) -> f64 {
        let end = match self.state {
            SessionState::Idle => return 0.,
            SessionState::Tracking => now,
            SessionState::Stopped => self.stopped_at.unwrap_or(now),
        };

        self.started_at
            .map(|start| (end - start).num_milliseconds().max(0) as f64 / 1000.)
            .unwrap_or(0.)
    }

    fn fail_start(&mut self, err: TrackerError) -> TrackerError {
        self.error = Some(err.to_string());
        self.publish();
        err
    }

    fn clear(&mut self) {
        self.route.clear();
        self.speed_mps = None;
        self.elevation_m = None;
        self.started_at = None;
        self.stopped_at = None;
        self.error = None;
    }

    fn publish(&self) {
        self.metrics_tx.send_replace(self.metrics());
    }
}
