// src/display/terminal.rs
//! Terminal-based display implementation

use super::NavDisplay;
use crate::{
    error::Result,
    gps::data::{NavigationSnapshot, COMPASS_POINTS},
    publish::NavUpdate,
    zone::DisplayZone,
};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType, DisableLineWrap, EnableLineWrap},
};
use std::io::{self, Stdout, Write};

const SEARCHING: &str = "Searching for GPS...";
const LAST_KNOWN: &str = "POSITION (last known, no fix):";

struct Section {
    title: String,
    color: Color,
    lines: Vec<String>,
}

impl Section {
    fn new(title: impl Into<String>, color: Color) -> Self {
        Self {
            title: title.into(),
            color,
            lines: Vec::new(),
        }
    }

    fn line(mut self, label: &str, value: impl AsRef<str>) -> Self {
        self.lines.push(format!("  {:<12}{}", label, value.as_ref()));
        self
    }
}

pub struct TerminalDisplay<W: Write = Stdout> {
    out: W,
    zone: DisplayZone,
    started: bool,
}

impl TerminalDisplay<Stdout> {
    pub fn new(zone: DisplayZone) -> Self {
        Self::with_writer(io::stdout(), zone)
    }
}

impl<W: Write> TerminalDisplay<W> {
    pub fn with_writer(out: W, zone: DisplayZone) -> Self {
        Self {
            out,
            zone,
            started: false,
        }
    }

    fn write_section(&mut self, section: &Section) -> Result<()> {
        queue!(
            self.out,
            SetForegroundColor(section.color),
            Print(&section.title),
            Print("\n"),
            ResetColor
        )?;
        for line in &section.lines {
            queue!(self.out, Print(line), Print("\n"))?;
        }
        queue!(self.out, Print("\n"))?;
        Ok(())
    }
}

impl<W: Write> NavDisplay for TerminalDisplay<W> {
    fn render(&mut self, update: &NavUpdate) -> Result<()> {
        if !self.started {
            execute!(self.out, Hide, DisableLineWrap)?;
            self.started = true;
        }
        queue!(self.out, Clear(ClearType::All), MoveTo(0, 0))?;

        for section in screen(update, self.zone) {
            self.write_section(&section)?;
        }

        queue!(
            self.out,
            SetForegroundColor(Color::Green),
            Print("=".repeat(60)),
            Print("\nPress Ctrl+C to exit\n"),
            ResetColor
        )?;
        self.out.flush()?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if self.started {
            execute!(self.out, Show, EnableLineWrap)?;
            self.started = false;
        }
        Ok(())
    }
}

/// Lay out one update as titled sections.
fn screen(update: &NavUpdate, zone: DisplayZone) -> Vec<Section> {
    let header = Section::new(
        format!("{}\nGPS Compass - NMEA Serial Monitor\n{}", "=".repeat(60), "=".repeat(60)),
        Color::Green,
    );

    match update {
        NavUpdate::Fix(snapshot) => {
            let status = match snapshot.fix_quality {
                Some(quality) if quality.is_fix() => format!("Receiving ({})", quality),
                Some(quality) => format!("Receiving ({}), showing last known values", quality),
                None => "Receiving".to_string(),
            };
            let mut sections = vec![header.line("Status:", status)];
            sections.extend(fix_sections(snapshot, zone));
            sections
        }
        NavUpdate::Searching => {
            let mut sections = vec![header.line("Status:", SEARCHING)];
            sections.extend(searching_sections(zone));
            sections
        }
        NavUpdate::Disconnected { reason } => vec![
            header.line("Status:", "Disconnected"),
            Section::new("DEVICE DISCONNECTED", Color::Red)
                .line("Reason:", reason)
                .line("", "Reconnect the receiver and restart to resume."),
        ],
    }
}

fn time_title(zone: DisplayZone) -> String {
    format!("TIME ({}):", zone)
}

fn fix_sections(snapshot: &NavigationSnapshot, zone: DisplayZone) -> Vec<Section> {
    let speed = match (snapshot.speed_mph(), snapshot.velocity.speed_knots, snapshot.speed_kmh()) {
        (Some(mph), Some(knots), Some(kmh)) => {
            format!("{:.2} mph  ({:.1} kn, {:.1} km/h)", mph, knots, kmh)
        }
        _ => unknown(),
    };

    let altitude = match (snapshot.altitude_ft(), snapshot.position.altitude_m) {
        (Some(feet), Some(meters)) => format!("{:.1} ft  ({:.1} m)", feet, meters),
        _ => unknown(),
    };

    let local = snapshot.local_timestamp(zone);
    let course = snapshot.velocity.course_deg;

    let position = if snapshot.has_fix() && !snapshot.fix_is_current() {
        Section::new(LAST_KNOWN, Color::DarkGrey)
    } else {
        Section::new("POSITION:", Color::Yellow)
    };

    vec![
        Section::new("SPEED:", Color::Cyan).line("Speed:", speed),
        position
            .line("Latitude:", format_coordinate(snapshot.position.latitude))
            .line("Longitude:", format_coordinate(snapshot.position.longitude))
            .line("Altitude:", altitude),
        Section::new("QUALITY:", Color::Magenta)
            .line("Satellites:", format_value(snapshot.satellites))
            .line("HDOP:", format_value(snapshot.hdop))
            .line("Fix Type:", format_value(snapshot.fix_quality)),
        Section::new(time_title(zone), Color::Blue)
            .line("Time:", format_value(local.map(|ts| ts.format("%H:%M:%S"))))
            .line("Date:", format_value(local.map(|ts| ts.format("%Y-%m-%d")))),
        Section::new("COMPASS:", Color::Red)
            .line(
                "Course:",
                match (course, snapshot.compass_point()) {
                    (Some(degrees), Some(point)) => format!("{:05.1}° {}", degrees, point),
                    _ => unknown(),
                },
            )
            .line("", compass_rose(snapshot.compass_point())),
    ]
}

fn searching_sections(zone: DisplayZone) -> Vec<Section> {
    vec![
        Section::new("SPEED:", Color::Cyan).line("Speed:", SEARCHING),
        Section::new("POSITION:", Color::Yellow)
            .line("Latitude:", SEARCHING)
            .line("Longitude:", SEARCHING)
            .line("Altitude:", SEARCHING),
        Section::new("QUALITY:", Color::Magenta).line("Satellites:", SEARCHING),
        Section::new(time_title(zone), Color::Blue)
            .line("Time:", SEARCHING)
            .line("Date:", SEARCHING),
        Section::new("COMPASS:", Color::Red)
            .line("Course:", SEARCHING)
            .line("", compass_rose(None)),
    ]
}

/// One line of compass points with the current heading bracketed.
fn compass_rose(point: Option<&str>) -> String {
    COMPASS_POINTS
        .iter()
        .map(|p| {
            if Some(*p) == point {
                format!("[{}]", p)
            } else {
                format!(" {} ", p)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn unknown() -> String {
    "Unknown".to_string()
}

/// Format coordinate for display
fn format_coordinate(coord: Option<f64>) -> String {
    match coord {
        Some(val) => format!("{:.6}°", val),
        None => "No fix".to_string(),
    }
}

/// Format value for display
fn format_value<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(unknown, |val| val.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gps::{aggregator::FixAggregator, nmea};

    const GGA: &str = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47";
    const RMC: &str = "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A";
    const LOST_GGA: &str = "$GPGGA,123521,,,,,0,00,,,M,,M,,*60";

    fn rendered(update: &NavUpdate, zone: DisplayZone) -> String {
        let mut display = TerminalDisplay::with_writer(Vec::new(), zone);
        display.render(update).unwrap();
        display.finish().unwrap();
        String::from_utf8(display.out).unwrap()
    }

    #[test]
    fn test_renders_fix() {
        let mut aggregator = FixAggregator::new();
        aggregator.apply(nmea::parse(GGA));
        let snapshot = aggregator.apply(nmea::parse(RMC));
        let zone: DisplayZone = "+02:00".parse().unwrap();

        let text = rendered(&NavUpdate::Fix(snapshot), zone);

        assert!(text.contains("25.78 mph"));
        assert!(text.contains("22.4 kn"));
        assert!(text.contains("1789.4 ft"));
        assert!(text.contains("48.117300°"));
        assert!(text.contains("11.516667°"));
        assert!(text.contains("Satellites: 8"));
        assert!(text.contains("TIME (UTC+02:00):"));
        assert!(text.contains("14:35:19"));
        assert!(text.contains("1994-03-23"));
        assert!(text.contains("084.4° E"));
        assert!(text.contains("[E]"));
        assert!(!text.contains(SEARCHING));
        assert!(!text.contains(LAST_KNOWN));
    }

    #[test]
    fn test_lost_fix_marks_position_as_last_known() {
        let mut aggregator = FixAggregator::new();
        aggregator.apply(nmea::parse(GGA));
        let snapshot = aggregator.apply(nmea::parse(LOST_GGA));
        assert!(snapshot.has_fix());

        let text = rendered(&NavUpdate::Fix(snapshot), DisplayZone::default());

        assert!(text.contains(LAST_KNOWN));
        assert!(text.contains("48.117300°"));
        assert!(text.contains("Receiving (No fix), showing last known values"));
        assert!(text.contains("TIME (UTC):"));
    }

    #[test]
    fn test_searching_hides_numbers() {
        let text = rendered(&NavUpdate::Searching, DisplayZone::default());

        assert!(text.contains(SEARCHING));
        assert!(!text.contains("mph"));
        assert!(!text.contains("[N]"));
    }

    #[test]
    fn test_renders_disconnect() {
        let update = NavUpdate::Disconnected {
            reason: "serial stream ended".to_string(),
        };
        let text = rendered(&update, DisplayZone::default());

        assert!(text.contains("DEVICE DISCONNECTED"));
        assert!(text.contains("serial stream ended"));
    }

    #[test]
    fn test_compass_rose_marks_heading() {
        assert_eq!(compass_rose(Some("N")), "[N]  NE   E   SE   S   SW   W   NW ");
        assert!(!compass_rose(None).contains('['));
    }
}
