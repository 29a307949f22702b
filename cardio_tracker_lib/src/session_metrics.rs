use serde::{Deserialize, Serialize};

use crate::units;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    #[default]
    Idle,
    Tracking,
    Stopped,
}

/// Point-in-time view of a session, derived from the tracker's state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionMetrics {
    pub state: SessionState,
    pub distance_m: f64,
    pub elapsed_s: f64,
    /// Last positive speed reported by an accepted fix, in m/s.
    pub speed_mps: Option<f64>,
    /// Minutes per mile.
    pub pace: Option<f64>,
    pub elevation_m: Option<f64>,
    pub route_points: usize,
}

impl SessionMetrics {
    pub fn display_distance(&self) -> String {
        units::format_distance(self.distance_m)
    }

    pub fn display_elapsed(&self) -> String {
        units::format_elapsed(self.elapsed_s)
    }

    pub fn display_speed(&self) -> String {
        units::format_speed(self.speed_mps)
    }

    pub fn display_pace(&self) -> String {
        units::format_pace(self.pace)
    }

    pub fn display_elevation(&self) -> String {
        units::format_elevation(self.elevation_m)
    }
}
