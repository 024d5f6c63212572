// src/gps/data.rs
//! Navigation state snapshot and unit conversions

use super::nmea::FixQuality;
use crate::zone::DisplayZone;
use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

pub const KNOTS_TO_MPH: f64 = 1.15078;
pub const KNOTS_TO_KMH: f64 = 1.852;
pub const METERS_TO_FEET: f64 = 3.28084;

pub const COMPASS_POINTS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];

/// Last known position, fed by GGA sentences only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Position {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude_m: Option<f64>,
}

/// Last known motion, fed by RMC sentences only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Velocity {
    pub speed_knots: Option<f64>,
    pub course_deg: Option<f64>,
}

/// Value copy of the aggregated navigation state.
///
/// Every field is independently optional. Derived units are computed on
/// demand from the stored knots and meters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct NavigationSnapshot {
    pub position: Position,
    pub velocity: Velocity,
    /// UTC date and time from the latest RMC that carried both.
    pub timestamp: Option<DateTime<Utc>>,
    pub satellites: Option<u8>,
    pub fix_quality: Option<FixQuality>,
    pub hdop: Option<f64>,
    /// When a valid sentence was last applied.
    #[serde(skip)]
    pub last_update: Option<Instant>,
}

impl NavigationSnapshot {
    /// Check if the snapshot holds a position
    pub fn has_fix(&self) -> bool {
        self.position.latitude.is_some() && self.position.longitude.is_some()
    }

    pub fn speed_mph(&self) -> Option<f64> {
        self.velocity.speed_knots.map(|knots| knots * KNOTS_TO_MPH)
    }

    pub fn speed_kmh(&self) -> Option<f64> {
        self.velocity.speed_knots.map(|knots| knots * KNOTS_TO_KMH)
    }

    pub fn altitude_ft(&self) -> Option<f64> {
        self.position.altitude_m.map(|meters| meters * METERS_TO_FEET)
    }

    /// Time since a valid sentence was last applied.
    pub fn age(&self, now: Instant) -> Option<Duration> {
        self.last_update
            .map(|updated| now.saturating_duration_since(updated))
    }

    /// True before the first valid sentence, or once the silence exceeds
    /// `threshold`.
    pub fn is_stale(&self, now: Instant, threshold: Duration) -> bool {
        self.age(now).map_or(true, |age| age > threshold)
    }

    /// Timestamp shifted into the presentation timezone.
    pub fn local_timestamp(&self, zone: DisplayZone) -> Option<DateTime<FixedOffset>> {
        self.timestamp.map(|ts| zone.localize(ts))
    }

    /// True when the latest GGA reported a usable solution.
    ///
    /// Position fields keep their last known values after the fix is lost,
    /// so this tells current coordinates from retained ones.
    pub fn fix_is_current(&self) -> bool {
        self.fix_quality.is_some_and(|quality| quality.is_fix())
    }

    /// Eight-point compass label for the true course, e.g. `NE`.
    pub fn compass_point(&self) -> Option<&'static str> {
        self.velocity.course_deg.map(|course| {
            let sector = ((course.rem_euclid(360.0) + 22.5) / 45.0) as usize % 8;
            COMPASS_POINTS[sector]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn moving(knots: f64, course: f64) -> NavigationSnapshot {
        NavigationSnapshot {
            velocity: Velocity {
                speed_knots: Some(knots),
                course_deg: Some(course),
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_speed_conversions() {
        for knots in [0.0, 1.0, 22.4, 103.7] {
            let snapshot = moving(knots, 0.0);
            assert!((snapshot.speed_mph().unwrap() - knots * 1.15078).abs() < 1e-6);
            assert!((snapshot.speed_kmh().unwrap() - knots * 1.852).abs() < 1e-6);
        }
        assert_eq!(NavigationSnapshot::default().speed_mph(), None);
    }

    #[test]
    fn test_altitude_in_feet() {
        let snapshot = NavigationSnapshot {
            position: Position {
                altitude_m: Some(545.4),
                ..Default::default()
            },
            ..Default::default()
        };

        assert!((snapshot.altitude_ft().unwrap() - 1789.370_136).abs() < 1e-6);
    }

    #[test]
    fn test_has_fix_needs_both_coordinates() {
        let mut snapshot = NavigationSnapshot::default();
        assert!(!snapshot.has_fix());

        snapshot.position.latitude = Some(48.1173);
        assert!(!snapshot.has_fix());

        snapshot.position.longitude = Some(11.5167);
        assert!(snapshot.has_fix());
    }

    #[test]
    fn test_staleness() {
        let threshold = Duration::from_secs(1);
        let start = Instant::now();
        let mut snapshot = NavigationSnapshot::default();

        assert!(snapshot.is_stale(start, threshold));

        snapshot.last_update = Some(start);
        assert!(!snapshot.is_stale(start + Duration::from_millis(1000), threshold));
        assert!(snapshot.is_stale(start + Duration::from_millis(1001), threshold));
    }

    #[test]
    fn test_compass_points() {
        assert_eq!(moving(0.0, 0.0).compass_point(), Some("N"));
        assert_eq!(moving(0.0, 84.4).compass_point(), Some("E"));
        assert_eq!(moving(0.0, 200.0).compass_point(), Some("S"));
        assert_eq!(moving(0.0, 337.6).compass_point(), Some("N"));
        assert_eq!(moving(0.0, 360.0).compass_point(), Some("N"));
        assert_eq!(moving(0.0, 315.0).compass_point(), Some("NW"));
        assert_eq!(NavigationSnapshot::default().compass_point(), None);
    }

    #[test]
    fn test_local_timestamp() {
        let snapshot = NavigationSnapshot {
            timestamp: Some(Utc.with_ymd_and_hms(1994, 3, 23, 23, 35, 19).unwrap()),
            ..Default::default()
        };
        let zone = DisplayZone::Fixed(FixedOffset::east_opt(2 * 3600).unwrap());

        let local = snapshot.local_timestamp(zone).unwrap();
        assert_eq!(local.format("%Y-%m-%d %H:%M:%S").to_string(), "1994-03-24 01:35:19");
    }

    #[test]
    fn test_local_timestamp_named_zone() {
        let zone: DisplayZone = "America/New_York".parse().unwrap();
        let at = |month| NavigationSnapshot {
            timestamp: Some(Utc.with_ymd_and_hms(2023, month, 1, 12, 0, 0).unwrap()),
            ..Default::default()
        };

        let january = at(1).local_timestamp(zone).unwrap();
        let july = at(7).local_timestamp(zone).unwrap();

        assert_eq!(january.format("%H:%M").to_string(), "07:00");
        assert_eq!(july.format("%H:%M").to_string(), "08:00");
    }

    #[test]
    fn test_fix_is_current() {
        let mut snapshot = NavigationSnapshot {
            position: Position {
                latitude: Some(48.1173),
                longitude: Some(11.5167),
                altitude_m: None,
            },
            ..Default::default()
        };
        assert!(!snapshot.fix_is_current());

        snapshot.fix_quality = Some(FixQuality::Gps);
        assert!(snapshot.fix_is_current());

        snapshot.fix_quality = Some(FixQuality::Invalid);
        assert!(snapshot.has_fix());
        assert!(!snapshot.fix_is_current());
    }
}
