// src/gps/serial.rs
//! Serial byte sources

use crate::error::{GpsError, Result};
use std::future::Future;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::info;

/// A byte source the ingestion pump can drain.
///
/// `read` waits at most `timeout` and returns `Ok(0)` when nothing arrived
/// in that window; that is not an error. Any `Err` other than a transient
/// kind means the device is gone.
pub trait SerialSource: Send {
    fn read(
        &mut self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> impl Future<Output = io::Result<usize>> + Send;

    /// Release the underlying handle. Further reads fail with `NotConnected`.
    fn close(&mut self);
}

/// Adapts any async reader (a serial port, a pipe, an in-memory duplex)
/// into a [`SerialSource`].
pub struct StreamSource<R> {
    reader: Option<R>,
}

impl<R> StreamSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: Some(reader),
        }
    }
}

impl<R: AsyncRead + Unpin + Send> SerialSource for StreamSource<R> {
    async fn read(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        let reader = self.reader.as_mut().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotConnected, "serial source is closed")
        })?;

        match tokio::time::timeout(timeout, reader.read(buf)).await {
            Err(_elapsed) => Ok(0),
            Ok(Ok(0)) if !buf.is_empty() => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "serial stream ended",
            )),
            Ok(result) => result,
        }
    }

    fn close(&mut self) {
        self.reader = None;
    }
}

/// Open a serial port for reading NMEA data.
pub fn open_serial(port: &str, baudrate: u32) -> Result<StreamSource<SerialStream>> {
    info!(port, baudrate, "Opening serial port");

    let serial = tokio_serial::new(port, baudrate)
        .timeout(Duration::from_millis(1000))
        .open_native_async()
        .map_err(|e| GpsError::Connection(format!("Failed to open serial port {}: {}", port, e)))?;

    Ok(StreamSource::new(serial))
}

/// List available serial port names
pub fn list_serial_ports() -> Result<Vec<String>> {
    let ports = tokio_serial::available_ports()?;
    Ok(ports.into_iter().map(|port| port.port_name).collect())
}
