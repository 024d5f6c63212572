// src/error.rs
//! Error types for the GPS compass

pub type Result<T> = std::result::Result<T, GpsError>;

#[derive(Debug, thiserror::Error)]
pub enum GpsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serial error: {0}")]
    Serial(#[from] tokio_serial::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The serial source went away; the pump has stopped.
    #[error("Device disconnected: {0}")]
    Disconnected(String),

    #[error("Error: {0}")]
    Other(String),
}
