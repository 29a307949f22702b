pub const SUMMARIES_TABLE_NAME: &str = "SessionSummaries";
pub const SUMMARY_ID: &str = "summary_id";
pub const DISTANCE_M: &str = "distance_m";
pub const ELAPSED_S: &str = "elapsed_s";
pub const ROUTE_POINTS: &str = "route_points";
pub const ELEVATION_M: &str = "elevation_m";
pub const STARTED_AT: &str = "started_at";
pub const COMPLETED_AT: &str = "completed_at";
