// src/config.rs
//! Persistent settings stored as JSON under the user's config directory

use crate::{
    error::{GpsError, Result},
    gps::tokenizer::DEFAULT_MAX_LINE_LEN,
    monitor::MonitorConfig,
    publish::PublisherConfig,
    pump::PumpConfig,
    zone::DisplayZone,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompassConfig {
    pub serial_port: Option<String>,
    pub baudrate: u32,
    /// Presentation timezone: an IANA name such as `Europe/Berlin`, or a
    /// fixed offset such as `+05:30`
    pub time_zone: String,
    pub publish_interval_ms: u64,
    pub stale_after_ms: u64,
    pub read_timeout_ms: u64,
    pub max_line_len: usize,
}

impl Default for CompassConfig {
    fn default() -> Self {
        Self {
            serial_port: None,
            baudrate: 9600,
            time_zone: "UTC".to_string(),
            publish_interval_ms: 1000,
            stale_after_ms: 1000,
            read_timeout_ms: 1000,
            max_line_len: DEFAULT_MAX_LINE_LEN,
        }
    }
}

impl CompassConfig {
    /// Load configuration from storage
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Save configuration to storage
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Read settings from `path`, falling back to defaults when absent
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .map_err(|e| GpsError::Config(format!("Failed to read config file: {}", e)))?;

        serde_json::from_str(&contents)
            .map_err(|e| GpsError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                GpsError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .map_err(|e| GpsError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Get config file path
    pub fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .map_err(|_| GpsError::Config("HOME environment variable not set".to_string()))?;

        Ok(PathBuf::from(home)
            .join(".config")
            .join("gps-compass")
            .join("config.json"))
    }

    pub fn time_zone(&self) -> Result<DisplayZone> {
        self.time_zone.parse()
    }

    /// Update the presentation timezone, rejecting names that do not parse
    pub fn update_time_zone(&mut self, text: &str) -> Result<()> {
        let text = text.trim();
        text.parse::<DisplayZone>()?;
        self.time_zone = text.to_string();
        Ok(())
    }

    /// Update serial port settings
    pub fn update_serial(&mut self, port: String, baudrate: u32) {
        self.serial_port = Some(port);
        self.baudrate = baudrate;
    }

    pub fn to_monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            pump: PumpConfig {
                read_timeout: Duration::from_millis(self.read_timeout_ms),
                max_line_len: self.max_line_len,
            },
            publisher: PublisherConfig {
                interval: Duration::from_millis(self.publish_interval_ms.max(1)),
                stale_after: Duration::from_millis(self.stale_after_ms),
            },
        }
    }
}
