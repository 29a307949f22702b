//! Conversions from the canonical SI units to the imperial units shown to the user.

pub const FEET_PER_METER: f64 = 3.28084;
pub const FEET_PER_MILE: f64 = 5280.;
pub const METERS_PER_MILE: f64 = 1609.34;
pub const MPH_PER_MPS: f64 = 2.23694;

const NOT_AVAILABLE: &str = "N/A";

pub fn meters_to_feet(meters: f64) -> f64 {
    meters * FEET_PER_METER
}

pub fn meters_to_miles(meters: f64) -> f64 {
    meters / METERS_PER_MILE
}

pub fn mps_to_mph(mps: f64) -> f64 {
    mps * MPH_PER_MPS
}

/// Minutes per mile, undefined until some distance has been covered.
pub fn pace_min_per_mile(elapsed_s: f64, distance_m: f64) -> Option<f64> {
    if distance_m <= 0. {
        return None;
    }
    Some((elapsed_s / 60.) / meters_to_miles(distance_m))
}

/// Whole feet below a mile, miles with two decimals from there on.
/// The switch happens on the rounded foot count so a distance never reads "5280 ft".
pub fn format_distance(meters: f64) -> String {
    let feet = meters_to_feet(meters);
    if feet.round() >= FEET_PER_MILE {
        format!("{:.2} mi", feet / FEET_PER_MILE)
    } else {
        format!("{:.0} ft", feet)
    }
}

pub fn format_elevation(meters: Option<f64>) -> String {
    match meters {
        Some(m) => format!("{:.1} ft", meters_to_feet(m)),
        None => NOT_AVAILABLE.into(),
    }
}

pub fn format_speed(mps: Option<f64>) -> String {
    match mps {
        Some(s) => format!("{:.2} mph", mps_to_mph(s)),
        None => NOT_AVAILABLE.into(),
    }
}

pub fn format_pace(min_per_mile: Option<f64>) -> String {
    match min_per_mile {
        Some(p) => format!("{:.2} min/mi", p),
        None => NOT_AVAILABLE.into(),
    }
}

/// mm:ss, minutes keep counting past the hour.
pub fn format_elapsed(seconds: f64) -> String {
    let total = seconds.max(0.).floor() as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}
