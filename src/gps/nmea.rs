// src/gps/nmea.rs
//! NMEA sentence parsing
//!
//! Only two sentence types are interpreted: GGA (fix data) and RMC
//! (speed, course, date). Everything else that passes the checksum is
//! reported as [`ParsedSentence::Unrecognized`].

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use std::fmt;

/// Quality indicator from field 6 of a GGA sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FixQuality {
    Invalid,
    Gps,
    Dgps,
    Pps,
    Rtk,
    FloatRtk,
    Estimated,
    Manual,
    Simulation,
    Unknown(u8),
}

impl FixQuality {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => FixQuality::Invalid,
            1 => FixQuality::Gps,
            2 => FixQuality::Dgps,
            3 => FixQuality::Pps,
            4 => FixQuality::Rtk,
            5 => FixQuality::FloatRtk,
            6 => FixQuality::Estimated,
            7 => FixQuality::Manual,
            8 => FixQuality::Simulation,
            other => FixQuality::Unknown(other),
        }
    }

    /// Whether the receiver reports a usable position solution.
    pub fn is_fix(&self) -> bool {
        !matches!(self, FixQuality::Invalid | FixQuality::Unknown(_))
    }
}

impl fmt::Display for FixQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixQuality::Invalid => write!(f, "No fix"),
            FixQuality::Gps => write!(f, "GPS"),
            FixQuality::Dgps => write!(f, "DGPS"),
            FixQuality::Pps => write!(f, "PPS"),
            FixQuality::Rtk => write!(f, "RTK"),
            FixQuality::FloatRtk => write!(f, "Float RTK"),
            FixQuality::Estimated => write!(f, "Estimated"),
            FixQuality::Manual => write!(f, "Manual"),
            FixQuality::Simulation => write!(f, "Simulation"),
            FixQuality::Unknown(code) => write!(f, "Unknown ({})", code),
        }
    }
}

/// Position fix data (GGA).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FixReport {
    pub time: Option<NaiveTime>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude_m: Option<f64>,
    pub fix_quality: Option<FixQuality>,
    pub satellites: Option<u8>,
    pub hdop: Option<f64>,
}

/// Velocity, course and date data (RMC).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VelocityReport {
    pub time: Option<NaiveTime>,
    pub date: Option<NaiveDate>,
    /// `A` (active) or `V` (void) status flag.
    pub active: Option<bool>,
    pub speed_knots: Option<f64>,
    pub course_deg: Option<f64>,
}

/// Why a line was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MalformedReason {
    #[error("structure")]
    Structure,
    #[error("checksum")]
    Checksum,
    #[error("missing fields")]
    MissingFields,
    #[error("field {0}")]
    Field(&'static str),
}

/// The outcome of parsing one received line.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedSentence {
    Fix(FixReport),
    Velocity(VelocityReport),
    Unrecognized {
        talker: String,
        sentence_type: String,
    },
    Malformed {
        text: String,
        reason: MalformedReason,
    },
}

type FieldResult<T> = std::result::Result<T, MalformedReason>;

const GGA_MIN_FIELDS: usize = 10;
const RMC_MIN_FIELDS: usize = 10;

/// Parse a single NMEA sentence (terminator already stripped).
pub fn parse(line: &str) -> ParsedSentence {
    match parse_checked(line) {
        Ok(sentence) => sentence,
        Err(reason) => ParsedSentence::Malformed {
            text: line.to_string(),
            reason,
        },
    }
}

fn parse_checked(line: &str) -> FieldResult<ParsedSentence> {
    let payload = verify_checksum(line)?;
    let fields: Vec<&str> = payload.split(',').collect();
    let (talker, sentence_type) = split_address(fields[0])?;

    match sentence_type {
        "GGA" => parse_gga(&fields).map(ParsedSentence::Fix),
        "RMC" => parse_rmc(&fields).map(ParsedSentence::Velocity),
        _ => Ok(ParsedSentence::Unrecognized {
            talker: talker.to_string(),
            sentence_type: sentence_type.to_string(),
        }),
    }
}

/// XOR of every byte between `$` and `*`.
pub fn checksum(payload: &str) -> u8 {
    payload.bytes().fold(0, |acc, byte| acc ^ byte)
}

/// Check framing and checksum, returning the payload between `$` and `*`.
fn verify_checksum(line: &str) -> FieldResult<&str> {
    let body = line.strip_prefix('$').ok_or(MalformedReason::Structure)?;
    let (payload, trailer) = body.rsplit_once('*').ok_or(MalformedReason::Structure)?;

    if trailer.len() != 2 || !trailer.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(MalformedReason::Structure);
    }
    let expected = u8::from_str_radix(trailer, 16).map_err(|_| MalformedReason::Structure)?;

    if checksum(payload) != expected {
        return Err(MalformedReason::Checksum);
    }
    Ok(payload)
}

/// Split an address such as `GPGGA` into talker (`GP`) and type (`GGA`).
fn split_address(address: &str) -> FieldResult<(&str, &str)> {
    if address.len() < 3 || !address.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(MalformedReason::Structure);
    }
    Ok(address.split_at(address.len() - 3))
}

/// Parse GGA (Global Positioning System Fix Data) sentence
fn parse_gga(parts: &[&str]) -> FieldResult<FixReport> {
    if parts.len() < GGA_MIN_FIELDS {
        return Err(MalformedReason::MissingFields);
    }

    Ok(FixReport {
        time: utc_time(parts[1])?,
        latitude: coordinate(parts[2], parts[3], Axis::Latitude)?,
        longitude: coordinate(parts[4], parts[5], Axis::Longitude)?,
        fix_quality: number::<u8>(parts[6], "fix quality")?.map(FixQuality::from_code),
        satellites: number::<u8>(parts[7], "satellites")?,
        hdop: non_negative(parts[8], "hdop")?,
        altitude_m: decimal(parts[9], "altitude")?,
    })
}

/// Parse RMC (Recommended Minimum Course) sentence
///
/// Position fields are not read here; position comes from GGA only.
fn parse_rmc(parts: &[&str]) -> FieldResult<VelocityReport> {
    if parts.len() < RMC_MIN_FIELDS {
        return Err(MalformedReason::MissingFields);
    }

    let active = match parts[2].trim() {
        "" => None,
        "A" => Some(true),
        "V" => Some(false),
        _ => return Err(MalformedReason::Field("status")),
    };

    let course_deg = non_negative(parts[8], "course")?;
    if course_deg.is_some_and(|course| course > 360.0) {
        return Err(MalformedReason::Field("course"));
    }

    Ok(VelocityReport {
        time: utc_time(parts[1])?,
        date: utc_date(parts[9])?,
        active,
        speed_knots: non_negative(parts[7], "speed")?,
        course_deg,
    })
}

fn number<T: std::str::FromStr>(field: &str, name: &'static str) -> FieldResult<Option<T>> {
    let field = field.trim();
    if field.is_empty() {
        return Ok(None);
    }
    field
        .parse::<T>()
        .map(Some)
        .map_err(|_| MalformedReason::Field(name))
}

fn decimal(field: &str, name: &'static str) -> FieldResult<Option<f64>> {
    match number::<f64>(field, name)? {
        Some(value) if !value.is_finite() => Err(MalformedReason::Field(name)),
        value => Ok(value),
    }
}

fn non_negative(field: &str, name: &'static str) -> FieldResult<Option<f64>> {
    match decimal(field, name)? {
        Some(value) if value < 0.0 => Err(MalformedReason::Field(name)),
        value => Ok(value),
    }
}

#[derive(Debug, Clone, Copy)]
enum Axis {
    Latitude,
    Longitude,
}

impl Axis {
    fn name(self) -> &'static str {
        match self {
            Axis::Latitude => "latitude",
            Axis::Longitude => "longitude",
        }
    }

    fn hemisphere_name(self) -> &'static str {
        match self {
            Axis::Latitude => "latitude hemisphere",
            Axis::Longitude => "longitude hemisphere",
        }
    }

    fn max_degrees(self) -> f64 {
        match self {
            Axis::Latitude => 90.0,
            Axis::Longitude => 180.0,
        }
    }

    fn sign(self, hemisphere: &str) -> Option<f64> {
        match (self, hemisphere) {
            (Axis::Latitude, "N") | (Axis::Longitude, "E") => Some(1.0),
            (Axis::Latitude, "S") | (Axis::Longitude, "W") => Some(-1.0),
            _ => None,
        }
    }
}

/// Convert `ddmm.mmmm` / `dddmm.mmmm` plus hemisphere into signed degrees.
fn coordinate(value: &str, hemisphere: &str, axis: Axis) -> FieldResult<Option<f64>> {
    let Some(raw) = non_negative(value, axis.name())? else {
        return Ok(None);
    };

    let degrees = (raw / 100.0).trunc();
    let minutes = raw - degrees * 100.0;
    if minutes >= 60.0 {
        return Err(MalformedReason::Field(axis.name()));
    }

    let magnitude = degrees + minutes / 60.0;
    if magnitude > axis.max_degrees() {
        return Err(MalformedReason::Field(axis.name()));
    }

    let sign = axis
        .sign(hemisphere.trim())
        .ok_or(MalformedReason::Field(axis.hemisphere_name()))?;
    Ok(Some(sign * magnitude))
}

fn two_digits(text: &str, at: usize) -> Option<u32> {
    text.get(at..at + 2)?.parse().ok()
}

/// `hhmmss` with optional fractional seconds.
fn utc_time(field: &str) -> FieldResult<Option<NaiveTime>> {
    let field = field.trim();
    if field.is_empty() {
        return Ok(None);
    }
    let invalid = MalformedReason::Field("time");

    let (whole, fraction) = field.split_once('.').unwrap_or((field, ""));
    if whole.len() != 6 || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid);
    }
    if !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid);
    }

    let hour = two_digits(whole, 0).ok_or(invalid)?;
    let minute = two_digits(whole, 2).ok_or(invalid)?;
    let second = two_digits(whole, 4).ok_or(invalid)?;

    let nanos = if fraction.is_empty() {
        0
    } else {
        let digits = &fraction[..fraction.len().min(9)];
        let value: u32 = digits.parse().map_err(|_| invalid)?;
        value * 10u32.pow(9 - digits.len() as u32)
    };

    NaiveTime::from_hms_nano_opt(hour, minute, second, nanos)
        .map(Some)
        .ok_or(invalid)
}

/// `ddmmyy`; two-digit years 69-99 are 19xx, 00-68 are 20xx.
fn utc_date(field: &str) -> FieldResult<Option<NaiveDate>> {
    let field = field.trim();
    if field.is_empty() {
        return Ok(None);
    }
    let invalid = MalformedReason::Field("date");

    if field.len() != 6 || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid);
    }

    let day = two_digits(field, 0).ok_or(invalid)?;
    let month = two_digits(field, 2).ok_or(invalid)?;
    let yy = two_digits(field, 4).ok_or(invalid)? as i32;
    let year = if yy >= 69 { 1900 + yy } else { 2000 + yy };

    NaiveDate::from_ymd_opt(year, month, day)
        .map(Some)
        .ok_or(invalid)
}
