use chrono::{DateTime, Utc};
use geo_types::Point;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A position sample exactly as a location source reports it.
/// Sensors may leave any field out, so everything but the timestamp is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFix {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,
    pub accuracy: Option<f64>,
    pub speed: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl RawFix {
    pub fn new(latitude: f64, longitude: f64, accuracy: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude: Some(latitude),
            longitude: Some(longitude),
            altitude: None,
            accuracy: Some(accuracy),
            speed: None,
            timestamp,
        }
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = Some(altitude);
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum FixError {
    #[error("fix is missing its {0}")]
    MissingCoordinate(&'static str),
    #[error("{name} {value} is out of range")]
    CoordinateOutOfRange { name: &'static str, value: f64 },
    #[error("accuracy {0} is not a non-negative number")]
    InvalidAccuracy(f64),
}

/// One validated GPS sample. Coordinates are in degrees, altitude and
/// accuracy in meters, speed in meters per second.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoFix {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
    pub accuracy: Option<f64>,
    pub speed: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl GeoFix {
    pub fn new(latitude: f64, longitude: f64, accuracy: Option<f64>, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            altitude: None,
            accuracy,
            speed: None,
            timestamp,
        }
    }

    /// x = longitude, y = latitude
    pub fn point(&self) -> Point {
        Point::new(self.longitude, self.latitude)
    }
}

impl TryFrom<RawFix> for GeoFix {
    type Error = FixError;

    fn try_from(raw: RawFix) -> Result<Self, Self::Error> {
        let latitude = coordinate("latitude", raw.latitude, 90.)?;
        let longitude = coordinate("longitude", raw.longitude, 180.)?;

        if let Some(accuracy) = raw.accuracy {
            if !accuracy.is_finite() || accuracy < 0. {
                return Err(FixError::InvalidAccuracy(accuracy));
            }
        }

        Ok(Self {
            latitude,
            longitude,
            altitude: raw.altitude.filter(|a| a.is_finite()),
            accuracy: raw.accuracy,
            speed: raw.speed.filter(|s| s.is_finite()),
            timestamp: raw.timestamp,
        })
    }
}

fn coordinate(name: &'static str, value: Option<f64>, limit: f64) -> Result<f64, FixError> {
    let value = value.ok_or(FixError::MissingCoordinate(name))?;
    if !value.is_finite() || value.abs() > limit {
        return Err(FixError::CoordinateOutOfRange { name, value });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> RawFix {
        RawFix::new(56.15, 10.2, 4., Utc::now())
    }

    #[test]
    fn converts_complete_fix() {
        let fix = GeoFix::try_from(raw().with_altitude(12.5).with_speed(2.)).unwrap();
        assert_eq!(fix.latitude, 56.15);
        assert_eq!(fix.longitude, 10.2);
        assert_eq!(fix.altitude, Some(12.5));
        assert_eq!(fix.accuracy, Some(4.));
        assert_eq!(fix.speed, Some(2.));
        assert_eq!(fix.point().x(), 10.2);
    }

    #[test]
    fn missing_coordinate_is_malformed() {
        let mut fix = raw();
        fix.longitude = None;
        assert_eq!(GeoFix::try_from(fix), Err(FixError::MissingCoordinate("longitude")));
    }

    #[test]
    fn out_of_range_coordinate_is_malformed() {
        let mut fix = raw();
        fix.latitude = Some(91.);
        assert!(matches!(GeoFix::try_from(fix), Err(FixError::CoordinateOutOfRange { name: "latitude", .. })));

        let mut fix = raw();
        fix.longitude = Some(f64::NAN);
        assert!(GeoFix::try_from(fix).is_err());
    }

    #[test]
    fn negative_accuracy_is_malformed() {
        let mut fix = raw();
        fix.accuracy = Some(-1.);
        assert_eq!(GeoFix::try_from(fix), Err(FixError::InvalidAccuracy(-1.)));
    }

    #[test]
    fn missing_accuracy_is_kept_for_the_filter() {
        let mut fix = raw();
        fix.accuracy = None;
        assert_eq!(GeoFix::try_from(fix).unwrap().accuracy, None);
    }
}
