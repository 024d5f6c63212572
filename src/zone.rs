// src/zone.rs
//! Presentation timezone for displayed times

use crate::error::{GpsError, Result};
use chrono::{DateTime, FixedOffset, Offset, Utc};
use chrono_tz::Tz;
use std::fmt;
use std::str::FromStr;

/// Where displayed times are shown.
///
/// A named zone follows its daylight saving rules; a fixed offset never
/// changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayZone {
    Named(Tz),
    Fixed(FixedOffset),
}

impl Default for DisplayZone {
    fn default() -> Self {
        DisplayZone::Named(Tz::UTC)
    }
}

impl DisplayZone {
    /// Shift a UTC timestamp into this zone.
    pub fn localize(&self, ts: DateTime<Utc>) -> DateTime<FixedOffset> {
        match self {
            DisplayZone::Named(tz) => {
                let local = ts.with_timezone(tz);
                local.with_timezone(&local.offset().fix())
            }
            DisplayZone::Fixed(offset) => ts.with_timezone(offset),
        }
    }
}

impl FromStr for DisplayZone {
    type Err = GpsError;

    /// Accepts an IANA name (`Europe/Berlin`, `UTC`) or an offset
    /// (`+05:30`, `-08:00`, `Z`).
    fn from_str(text: &str) -> Result<Self> {
        let text = text.trim();
        if let Ok(tz) = text.parse::<Tz>() {
            return Ok(DisplayZone::Named(tz));
        }

        let minutes = parse_utc_offset(text)?;
        FixedOffset::east_opt(minutes * 60)
            .map(DisplayZone::Fixed)
            .ok_or_else(|| GpsError::Config(format!("UTC offset out of range: {}", text)))
    }
}

impl fmt::Display for DisplayZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayZone::Named(tz) => write!(f, "{}", tz),
            DisplayZone::Fixed(offset) => write!(f, "UTC{}", offset),
        }
    }
}

/// Parse `+HH:MM`, `-HH:MM`, `HH:MM`, `Z` or `UTC` into minutes east of UTC.
pub fn parse_utc_offset(text: &str) -> Result<i32> {
    let text = text.trim();
    let invalid = || GpsError::Config(format!("Invalid time zone '{}'", text));

    if text.eq_ignore_ascii_case("z") || text.eq_ignore_ascii_case("utc") {
        return Ok(0);
    }

    let (sign, rest) = match text.as_bytes().first() {
        Some(b'+') => (1, &text[1..]),
        Some(b'-') => (-1, &text[1..]),
        _ => (1, text),
    };

    let (hours, minutes) = rest.split_once(':').ok_or_else(invalid)?;
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;

    if !(0..=14).contains(&hours) || !(0..60).contains(&minutes) {
        return Err(invalid());
    }

    Ok(sign * (hours * 60 + minutes))
}
