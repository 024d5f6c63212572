// src/monitor.rs
//! Wires the ingestion pump and publisher together

use crate::{
    error::{GpsError, Result},
    gps::{aggregator::IngestStats, serial::{self, SerialSource}},
    publish::{NavUpdate, Publisher, PublisherConfig},
    pump::{IngestionPump, PumpConfig, PumpReport},
};
use tokio::{sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Timing and buffering knobs for a monitor session
#[derive(Debug, Clone, Default)]
pub struct MonitorConfig {
    pub pump: PumpConfig,
    pub publisher: PublisherConfig,
}

/// A running ingestion session.
///
/// Owns the pump and publisher tasks. Consumers obtain their own receiver
/// through [`NavMonitor::subscribe`]; every receiver sees the newest update
/// only.
pub struct NavMonitor {
    updates: watch::Receiver<NavUpdate>,
    cancel: CancellationToken,
    pump: JoinHandle<Result<IngestStats>>,
    publisher: JoinHandle<()>,
}

impl NavMonitor {
    /// Connect to a GPS receiver via serial port
    pub fn connect_serial(port: &str, baudrate: u32, config: MonitorConfig) -> Result<Self> {
        let source = serial::open_serial(port, baudrate)?;
        info!(port, baudrate, "Connected to GPS receiver");
        Ok(Self::start(source, config))
    }

    /// Start monitoring an already opened source
    pub fn start<S: SerialSource + 'static>(source: S, config: MonitorConfig) -> Self {
        Self::start_with_token(source, config, CancellationToken::new())
    }

    /// Start monitoring, stopping when `cancel` fires
    pub fn start_with_token<S: SerialSource + 'static>(
        source: S,
        config: MonitorConfig,
        cancel: CancellationToken,
    ) -> Self {
        let (report_tx, report_rx) = watch::channel(PumpReport::default());
        let (update_tx, update_rx) = watch::channel(NavUpdate::Searching);

        let pump = IngestionPump::new(source, config.pump, report_tx, cancel.clone()).start();
        let publisher =
            Publisher::new(report_rx, update_tx, cancel.clone(), config.publisher).start();

        Self {
            updates: update_rx,
            cancel,
            pump,
            publisher,
        }
    }

    /// Get a receiver for published updates
    pub fn subscribe(&self) -> watch::Receiver<NavUpdate> {
        self.updates.clone()
    }

    /// Get a clone of the latest published update
    pub fn current(&self) -> NavUpdate {
        self.updates.borrow().clone()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Check if the pump is still ingesting
    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled() && !self.pump.is_finished()
    }

    /// Stop the session and wait for both tasks.
    ///
    /// Returns the pump's counters, or the error that stopped it.
    pub async fn shutdown(self) -> Result<IngestStats> {
        self.cancel.cancel();

        self.publisher
            .await
            .map_err(|e| GpsError::Other(format!("Publisher task failed: {}", e)))?;
        self.pump
            .await
            .map_err(|e| GpsError::Other(format!("Ingestion task failed: {}", e)))?
    }
}
