use serde::{Deserialize, Serialize};

use crate::{geo_fix::GeoFix, geodesy::distance_between};

pub const MAX_ACCURACY_M: f64 = 25.;
pub const JITTER_THRESHOLD_M: f64 = 3.;

/// Thresholds deciding which fixes make it into a route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixFilter {
    /// Fixes reporting a worse horizontal accuracy than this are dropped.
    pub max_accuracy_m: f64,
    /// Moves shorter than this from the last accepted fix are treated as stationary noise.
    pub jitter_threshold_m: f64,
}

impl Default for FixFilter {
    fn default() -> Self {
        Self {
            max_accuracy_m: MAX_ACCURACY_M,
            jitter_threshold_m: JITTER_THRESHOLD_M,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FixDecision {
    /// Appended. `distance_m` is how far it lies from the previous accepted fix (0 for the first one).
    Accepted { distance_m: f64 },
    LowAccuracy { accuracy: Option<f64> },
    Jitter { distance_m: f64 },
}

impl FixDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, FixDecision::Accepted { .. })
    }
}

/// The accepted fixes of a session, in arrival order, together with the
/// distance accumulated along them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackRoute {
    fixes: Vec<GeoFix>,
    distance_m: f64,
}

impl TrackRoute {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs a fix through the filter and appends it when it passes.
    pub fn offer(&mut self, fix: GeoFix, filter: &FixFilter) -> FixDecision {
        match fix.accuracy {
            Some(accuracy) if accuracy <= filter.max_accuracy_m => {}
            accuracy => return FixDecision::LowAccuracy { accuracy },
        }

        let distance_m = match self.fixes.last() {
            Some(last) => distance_between(last, &fix),
            None => 0.,
        };

        if !self.fixes.is_empty() && distance_m < filter.jitter_threshold_m {
            return FixDecision::Jitter { distance_m };
        }

        self.fixes.push(fix);
        self.distance_m += distance_m;

        FixDecision::Accepted { distance_m }
    }

    pub fn clear(&mut self) {
        self.fixes.clear();
        self.distance_m = 0.;
    }

    pub fn distance_m(&self) -> f64 {
        self.distance_m
    }

    pub fn len(&self) -> usize {
        self.fixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixes.is_empty()
    }

    pub fn last(&self) -> Option<&GeoFix> {
        self.fixes.last()
    }

    pub fn fixes(&self) -> &[GeoFix] {
        &self.fixes
    }
}
