// src/gps/aggregator.rs
//! Merges parsed sentences into a single navigation state

use super::data::NavigationSnapshot;
use super::nmea::{FixReport, ParsedSentence, VelocityReport};
use chrono::{TimeZone, Utc};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, trace};

/// Per-line outcome counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub applied: u64,
    pub malformed: u64,
    pub unrecognized: u64,
    pub decode_errors: u64,
    pub overflows: u64,
}

impl IngestStats {
    /// Lines that reached the aggregator but changed nothing.
    pub fn rejected(&self) -> u64 {
        self.malformed + self.unrecognized + self.decode_errors
    }
}

/// Single owner of the navigation state.
///
/// A field is only overwritten by a sentence of the matching type that
/// actually carries a value for it; empty fields never erase what is already
/// known. Callers only ever get copies of the state back.
#[derive(Debug, Default)]
pub struct FixAggregator {
    state: NavigationSnapshot,
    stats: IngestStats,
}

impl FixAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one sentence, stamping the update with the current time.
    pub fn apply(&mut self, sentence: ParsedSentence) -> NavigationSnapshot {
        self.apply_at(sentence, Instant::now())
    }

    /// Apply one sentence received at `now`.
    pub fn apply_at(&mut self, sentence: ParsedSentence, now: Instant) -> NavigationSnapshot {
        match sentence {
            ParsedSentence::Fix(report) => {
                self.apply_fix(&report);
                self.touch(now);
            }
            ParsedSentence::Velocity(report) => {
                self.apply_velocity(&report);
                self.touch(now);
            }
            ParsedSentence::Unrecognized {
                talker,
                sentence_type,
            } => {
                self.stats.unrecognized += 1;
                trace!(%talker, %sentence_type, "Ignoring sentence type");
            }
            ParsedSentence::Malformed { text, reason } => {
                self.stats.malformed += 1;
                debug!(%reason, line = %text, "Dropping malformed sentence");
            }
        }
        self.state
    }

    fn apply_fix(&mut self, report: &FixReport) {
        let position = &mut self.state.position;
        refine(&mut position.latitude, report.latitude);
        refine(&mut position.longitude, report.longitude);
        refine(&mut position.altitude_m, report.altitude_m);
        refine(&mut self.state.fix_quality, report.fix_quality);
        refine(&mut self.state.satellites, report.satellites);
        refine(&mut self.state.hdop, report.hdop);
    }

    fn apply_velocity(&mut self, report: &VelocityReport) {
        refine(&mut self.state.velocity.speed_knots, report.speed_knots);
        refine(&mut self.state.velocity.course_deg, report.course_deg);

        if let (Some(date), Some(time)) = (report.date, report.time) {
            self.state.timestamp = Some(Utc.from_utc_datetime(&date.and_time(time)));
        }
    }

    fn touch(&mut self, now: Instant) {
        self.state.last_update = Some(now);
        self.stats.applied += 1;
    }

    pub fn snapshot(&self) -> NavigationSnapshot {
        self.state
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    /// Forget every known value. Counters are kept.
    pub fn reset(&mut self) {
        self.state = NavigationSnapshot::default();
    }

    pub fn record_decode_error(&mut self) {
        self.stats.decode_errors += 1;
    }

    pub fn record_overflows(&mut self, count: u64) {
        self.stats.overflows += count;
    }
}

fn refine<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}
