// src/publish.rs
//! Fixed-cadence publication of the latest navigation state

use crate::{gps::data::NavigationSnapshot, pump::PumpReport};
use std::time::Duration;
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// What consumers see on each tick.
#[derive(Debug, Clone, PartialEq)]
pub enum NavUpdate {
    /// No valid sentence yet, or none within the staleness window.
    Searching,
    Fix(NavigationSnapshot),
    /// The serial source failed; no further data will arrive.
    Disconnected { reason: String },
}

impl NavUpdate {
    pub fn snapshot(&self) -> Option<&NavigationSnapshot> {
        match self {
            NavUpdate::Fix(snapshot) => Some(snapshot),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Publication period.
    pub interval: Duration,
    /// Silence after which the state is reported as searching.
    pub stale_after: Duration,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            stale_after: Duration::from_secs(1),
        }
    }
}

/// Decide what to publish for the latest pump report.
pub fn derive_update(report: &PumpReport, now: Instant, stale_after: Duration) -> NavUpdate {
    match report {
        PumpReport::Failed { reason } => NavUpdate::Disconnected {
            reason: reason.clone(),
        },
        PumpReport::Running(snapshot) if snapshot.is_stale(now, stale_after) => {
            NavUpdate::Searching
        }
        PumpReport::Running(snapshot) => NavUpdate::Fix(*snapshot),
    }
}

/// Republishes the newest pump report at a fixed period.
///
/// Both sides are `watch` channels, so a slow consumer only ever misses
/// intermediate values; it never holds the publisher up.
pub struct Publisher {
    reports: watch::Receiver<PumpReport>,
    updates: watch::Sender<NavUpdate>,
    cancel: CancellationToken,
    config: PublisherConfig,
}

impl Publisher {
    pub fn new(
        reports: watch::Receiver<PumpReport>,
        updates: watch::Sender<NavUpdate>,
        cancel: CancellationToken,
        config: PublisherConfig,
    ) -> Self {
        Self {
            reports,
            updates,
            cancel,
            config,
        }
    }

    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(self) {
        info!(
            interval_ms = self.config.interval.as_millis() as u64,
            stale_after_ms = self.config.stale_after.as_millis() as u64,
            "Publisher started"
        );

        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut published: u64 = 0;

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let update = derive_update(&self.reports.borrow(), Instant::now(), self.config.stale_after);
            if published == 0 || !matches!(update, NavUpdate::Fix(_)) {
                debug!(?update, "Publishing update");
            }
            self.updates.send_replace(update);
            published += 1;
        }

        info!(published, "Publisher stopped");
    }
}
