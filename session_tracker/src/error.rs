use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    #[error("Permission to access location was denied")]
    PermissionDenied,
    #[error("Failed to subscribe to location updates: {0}")]
    Subscription(String),
    #[error("A session is already being tracked")]
    AlreadyTracking,
    #[error("No session has been started")]
    NotStarted,
    #[error("The session has no route points to record")]
    EmptySession,
    #[error("The history store is no longer accepting sessions")]
    HistoryClosed,
}
