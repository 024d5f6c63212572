// src/lib.rs
//! GPS Compass Library
//!
//! Reads NMEA 0183 sentences from a serial GPS receiver, folds GGA and RMC
//! reports into a navigation snapshot and publishes it at a fixed rate to
//! any number of displays.

pub mod config;
pub mod display;
pub mod error;
pub mod gps;
pub mod logging;
pub mod monitor;
pub mod publish;
pub mod pump;
pub mod zone;

// Re-export main types for convenience
pub use error::{GpsError, Result};
pub use gps::data::NavigationSnapshot;
pub use monitor::{MonitorConfig, NavMonitor};
pub use publish::NavUpdate;
