use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::units;

/// The record of a finished session, handed over to the history store.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub distance_m: f64,
    pub elapsed_s: f64,

    #[cfg_attr(feature = "sqlx", sqlx(try_from = "i64"))]
    pub route_points: usize,

    pub elevation_m: Option<f64>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl SessionSummary {
    pub fn new(distance_m: f64, elapsed_s: f64, route_points: usize, elevation_m: Option<f64>, started_at: DateTime<Utc>, completed_at: DateTime<Utc>) -> Self {
        Self {
            distance_m,
            elapsed_s,
            route_points,
            elevation_m,
            started_at,
            completed_at,
        }
    }

    pub fn pace(&self) -> Option<f64> {
        units::pace_min_per_mile(self.elapsed_s, self.distance_m)
    }

    /// One line per field, the way the history screen lists a workout.
    pub fn describe(&self) -> String {
        format!(
            "Date: {}\nDistance: {}\nTime: {}\nPace: {}\nRoute Points: {}\nElevation: {}",
            self.completed_at.format("%Y-%m-%d %H:%M"),
            units::format_distance(self.distance_m),
            units::format_elapsed(self.elapsed_s),
            units::format_pace(self.pace()),
            self.route_points,
            units::format_elevation(self.elevation_m),
        )
    }
}
