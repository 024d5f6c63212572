// src/display/json.rs
//! JSON-lines output, one object per published update

use super::NavDisplay;
use crate::{error::Result, gps::data::NavigationSnapshot, publish::NavUpdate};
use serde::Serialize;
use std::io::{self, Stdout, Write};

#[derive(Serialize)]
struct Record<'a> {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fix: Option<&'a NavigationSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speed_mph: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speed_kmh: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    altitude_ft: Option<f64>,
}

impl<'a> Record<'a> {
    fn from_update(update: &'a NavUpdate) -> Self {
        let empty = Record {
            status: "",
            reason: None,
            fix: None,
            speed_mph: None,
            speed_kmh: None,
            altitude_ft: None,
        };

        match update {
            NavUpdate::Searching => Record {
                status: "searching",
                ..empty
            },
            NavUpdate::Fix(snapshot) => Record {
                status: "fix",
                fix: Some(snapshot),
                speed_mph: snapshot.speed_mph(),
                speed_kmh: snapshot.speed_kmh(),
                altitude_ft: snapshot.altitude_ft(),
                ..empty
            },
            NavUpdate::Disconnected { reason } => Record {
                status: "disconnected",
                reason: Some(reason),
                ..empty
            },
        }
    }
}

/// Writes each update as a single JSON line, for piping into loggers or
/// alerting scripts.
pub struct JsonLinesDisplay<W: Write = Stdout> {
    out: W,
}

impl JsonLinesDisplay<Stdout> {
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }
}

impl Default for JsonLinesDisplay<Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> JsonLinesDisplay<W> {
    pub fn with_writer(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> NavDisplay for JsonLinesDisplay<W> {
    fn render(&mut self, update: &NavUpdate) -> Result<()> {
        serde_json::to_writer(&mut self.out, &Record::from_update(update))?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        Ok(())
    }
}
