pub mod geo_fix;
pub mod geodesy;
pub mod session_metrics;
pub mod session_summary;
pub mod track_route;
pub mod units;

pub use geo_fix::{FixError, GeoFix, RawFix};
pub use session_metrics::{SessionMetrics, SessionState};
pub use session_summary::SessionSummary;
pub use track_route::{FixDecision, FixFilter, TrackRoute};
