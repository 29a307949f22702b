use std::{fs::File, io::{BufReader, BufWriter, Read}, path::Path, str::FromStr};

use cardio_tracker_lib::{GeoFix, RawFix};
use chrono::{DateTime, Utc};
use gpx::{Gpx, GpxVersion, Track, TrackSegment, Waypoint};
use time::OffsetDateTime;

use crate::DataManagerError;

/// Accuracy assumed per unit of HDOP, in meters.
const METERS_PER_HDOP: f64 = 5.;
/// Accuracy given to points from files that carry no HDOP at all.
const NOMINAL_ACCURACY_M: f64 = 5.;

pub fn read_gpx(path: &Path) -> Result<Vec<RawFix>, DataManagerError> {
    let file = File::open(path)
        .map_err(|err| DataManagerError::Io(format!("Failed to open {path:?}: {err}")))?;
    parse_gpx(BufReader::new(file))
}

/// Flattens every track segment into one list of fixes.
/// Points without a timestamp cannot be replayed and are skipped.
pub fn parse_gpx<R: Read>(reader: R) -> Result<Vec<RawFix>, DataManagerError> {
    let gpx = gpx::read(reader).map_err(|err| DataManagerError::Gpx(format!("Failed to parse gpx: {err}")))?;

    let mut fixes = Vec::new();
    let mut skipped = 0;
    for track in gpx.tracks {
        for segment in track.segments {
            for point in segment.points {
                let Some(timestamp) = point.time.and_then(|time| time.format().ok()).and_then(|time| DateTime::<Utc>::from_str(&time).ok()) else {
                    skipped += 1;
                    continue;
                };

                let position = point.point();
                fixes.push(RawFix {
                    latitude: Some(position.y()),
                    longitude: Some(position.x()),
                    altitude: point.elevation,
                    accuracy: Some(point.hdop.map(|hdop| hdop * METERS_PER_HDOP).unwrap_or(NOMINAL_ACCURACY_M)),
                    speed: point.speed,
                    timestamp,
                });
            }
        }
    }

    if skipped > 0 {
        tracing::warn!("Skipped {} gpx points without a timestamp", skipped);
    }

    Ok(fixes)
}

/// Writes a route as a single-segment track.
pub fn write_gpx(route: &[GeoFix], name: &str, path: &Path) -> Result<(), DataManagerError> {
    let mut segment = TrackSegment::new();
    for fix in route {
        let mut waypoint = Waypoint::new(fix.point());
        waypoint.elevation = fix.altitude;
        waypoint.speed = fix.speed;
        waypoint.time = Some(to_gpx_time(fix.timestamp)?.into());
        segment.points.push(waypoint);
    }

    let mut track = Track::new();
    track.name = Some(name.to_string());
    track.segments.push(segment);

    let mut gpx = Gpx::default();
    gpx.version = GpxVersion::Gpx11;
    gpx.creator = Some("cardio_tracker".into());
    gpx.tracks.push(track);

    let file = File::create(path)
        .map_err(|err| DataManagerError::Io(format!("Failed to create {path:?}: {err}")))?;
    gpx::write(&gpx, BufWriter::new(file))
        .map_err(|err| DataManagerError::Gpx(format!("Failed to write gpx: {err}")))
}

fn to_gpx_time(timestamp: DateTime<Utc>) -> Result<OffsetDateTime, DataManagerError> {
    let nanos = timestamp.timestamp_nanos_opt()
        .ok_or_else(|| DataManagerError::Gpx(format!("Timestamp {timestamp} out of range")))?;
    OffsetDateTime::from_unix_timestamp_nanos(nanos as i128)
        .map_err(|err| DataManagerError::Gpx(format!("Timestamp {timestamp} out of range: {err}")))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use chrono::TimeZone;

    use super::*;

    const TRACK: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <name>Morning run</name>
    <trkseg>
      <trkpt lat="56.158405" lon="10.206034">
        <ele>42.5</ele>
        <time>2025-04-12T06:30:00Z</time>
        <hdop>1.2</hdop>
      </trkpt>
      <trkpt lat="56.158500" lon="10.206100">
        <time>2025-04-12T06:30:05Z</time>
      </trkpt>
      <trkpt lat="56.158600" lon="10.206200">
      </trkpt>
    </trkseg>
  </trk>
</gpx>"#;

    #[test]
    fn parses_track_points() {
        let fixes = parse_gpx(Cursor::new(TRACK)).unwrap();
        assert_eq!(fixes.len(), 2);

        let first = &fixes[0];
        assert_eq!(first.latitude, Some(56.158405));
        assert_eq!(first.longitude, Some(10.206034));
        assert_eq!(first.altitude, Some(42.5));
        assert!((first.accuracy.unwrap() - 6.).abs() < 1e-9);
        assert_eq!(first.timestamp, Utc.with_ymd_and_hms(2025, 4, 12, 6, 30, 0).unwrap());

        assert_eq!(fixes[1].accuracy, Some(NOMINAL_ACCURACY_M));
        assert_eq!(fixes[1].altitude, None);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(parse_gpx(Cursor::new("not a gpx file")), Err(DataManagerError::Gpx(_))));
    }

    #[test]
    fn exported_route_reads_back() {
        let route: Vec<GeoFix> = parse_gpx(Cursor::new(TRACK)).unwrap()
            .into_iter()
            .map(|fix| GeoFix::try_from(fix).unwrap())
            .collect();

        let path = std::env::temp_dir().join(format!("cardio_tracker_export_{}.gpx", std::process::id()));
        write_gpx(&route, "Morning run", &path).unwrap();
        let fixes = read_gpx(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(fixes.len(), 2);
        assert_eq!(fixes[0].latitude, Some(56.158405));
        assert_eq!(fixes[0].altitude, Some(42.5));
        assert_eq!(fixes[1].timestamp, route[1].timestamp);
    }
}
