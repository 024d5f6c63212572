// src/pump.rs
//! Ingestion pump: serial bytes in, navigation snapshots out

use crate::{
    error::{GpsError, Result},
    gps::{
        aggregator::{FixAggregator, IngestStats},
        data::NavigationSnapshot,
        nmea,
        serial::SerialSource,
        tokenizer::{LineSplitter, DEFAULT_MAX_LINE_LEN},
    },
};
use std::{io, time::Duration};
use tokio::{sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, trace, warn};

const READ_BUFFER_SIZE: usize = 256;
/// Pause after a transient read error, capped by the read timeout.
const TRANSIENT_BACKOFF: Duration = Duration::from_millis(50);

/// What the pump last handed over to the publisher.
#[derive(Debug, Clone, PartialEq)]
pub enum PumpReport {
    Running(NavigationSnapshot),
    Failed { reason: String },
}

impl Default for PumpReport {
    fn default() -> Self {
        PumpReport::Running(NavigationSnapshot::default())
    }
}

#[derive(Debug, Clone)]
pub struct PumpConfig {
    /// Upper bound on a single read; also bounds how long shutdown can take.
    pub read_timeout: Duration,
    pub max_line_len: usize,
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_secs(1),
            max_line_len: DEFAULT_MAX_LINE_LEN,
        }
    }
}

/// Drains a [`SerialSource`] through tokenizer, parser and aggregator.
///
/// Every applied line produces a fresh snapshot in the single-slot report
/// mailbox, in wire order. Bad lines are counted and skipped; only a failed
/// source stops the pump.
pub struct IngestionPump<S> {
    source: S,
    splitter: LineSplitter,
    aggregator: FixAggregator,
    overflows_seen: u64,
    reports: watch::Sender<PumpReport>,
    cancel: CancellationToken,
    config: PumpConfig,
}

impl<S: SerialSource + 'static> IngestionPump<S> {
    pub fn new(
        source: S,
        config: PumpConfig,
        reports: watch::Sender<PumpReport>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            source,
            splitter: LineSplitter::with_max_len(config.max_line_len),
            aggregator: FixAggregator::new(),
            overflows_seen: 0,
            reports,
            cancel,
            config,
        }
    }

    /// Spawn the pump on the tokio runtime.
    pub fn start(self) -> JoinHandle<Result<IngestStats>> {
        tokio::spawn(self.run())
    }

    /// Run until cancelled or until the source fails.
    pub async fn run(mut self) -> Result<IngestStats> {
        info!(
            read_timeout_ms = self.config.read_timeout.as_millis() as u64,
            max_line_len = self.config.max_line_len,
            "Ingestion pump started"
        );

        let mut buf = [0u8; READ_BUFFER_SIZE];
        let backoff = self.config.read_timeout.min(TRANSIENT_BACKOFF);
        let mut transient_streak: u64 = 0;
        let outcome = loop {
            let read = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break Ok(()),
                read = self.source.read(&mut buf, self.config.read_timeout) => read,
            };

            match read {
                Ok(0) => {
                    transient_streak = 0;
                    trace!("No serial data this interval");
                }
                Ok(n) => {
                    transient_streak = 0;
                    self.ingest(&buf[..n]);
                }
                Err(e) if is_transient(&e) => {
                    transient_streak += 1;
                    if transient_streak == 1 {
                        warn!(error = %e, "Transient serial read error");
                    } else {
                        trace!(error = %e, streak = transient_streak, "Transient serial read error");
                    }

                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => break Ok(()),
                        _ = tokio::time::sleep(backoff) => {}
                    }
                }
                Err(e) => break Err(e),
            }
        };

        self.source.close();
        let stats = self.aggregator.stats();

        match outcome {
            Ok(()) => {
                info!(
                    applied = stats.applied,
                    malformed = stats.malformed,
                    unrecognized = stats.unrecognized,
                    decode_errors = stats.decode_errors,
                    overflows = stats.overflows,
                    "Ingestion pump stopped"
                );
                Ok(stats)
            }
            Err(e) => {
                error!(error = %e, applied = stats.applied, "Serial source failed, pump stopping");
                self.reports.send_replace(PumpReport::Failed {
                    reason: e.to_string(),
                });
                Err(GpsError::Disconnected(e.to_string()))
            }
        }
    }

    fn ingest(&mut self, bytes: &[u8]) {
        self.splitter.push(bytes);

        let overflows = self.splitter.overflows() - self.overflows_seen;
        if overflows > 0 {
            self.overflows_seen = self.splitter.overflows();
            self.aggregator.record_overflows(overflows);
            warn!(overflows, "Discarded over-long serial line");
        }

        while let Some(line) = self.splitter.next() {
            let text = match line.as_str() {
                Ok(text) => text,
                Err(e) => {
                    self.aggregator.record_decode_error();
                    warn!(error = %e, len = line.as_bytes().len(), "Skipping undecodable line");
                    continue;
                }
            };

            let snapshot = self.aggregator.apply(nmea::parse(text));
            self.reports.send_replace(PumpReport::Running(snapshot));
        }
    }
}

fn is_transient(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gps::serial::StreamSource;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncWriteExt, DuplexStream};

    const GGA: &str = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47";
    const RMC: &str = "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A";

    fn spawn_pump(
        config: PumpConfig,
    ) -> (
        DuplexStream,
        watch::Receiver<PumpReport>,
        CancellationToken,
        JoinHandle<Result<IngestStats>>,
    ) {
        let (device, host) = tokio::io::duplex(1024);
        let (report_tx, report_rx) = watch::channel(PumpReport::default());
        let cancel = CancellationToken::new();
        let handle =
            IngestionPump::new(StreamSource::new(host), config, report_tx, cancel.clone()).start();
        (device, report_rx, cancel, handle)
    }

    async fn wait_for(
        reports: &mut watch::Receiver<PumpReport>,
        done: impl Fn(&PumpReport) -> bool,
    ) -> PumpReport {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                {
                    let report = reports.borrow_and_update();
                    if done(&report) {
                        return report.clone();
                    }
                }
                reports.changed().await.unwrap();
            }
        })
        .await
        .expect("pump did not report in time")
    }

    #[tokio::test]
    async fn test_pump_merges_sentences_in_order() {
        let (mut device, mut reports, cancel, handle) = spawn_pump(PumpConfig::default());

        device
            .write_all(format!("{}\r\n{}\r\n", GGA, RMC).as_bytes())
            .await
            .unwrap();

        let report = wait_for(&mut reports, |report| {
            matches!(report, PumpReport::Running(s) if s.timestamp.is_some())
        })
        .await;

        let PumpReport::Running(snapshot) = report else {
            panic!("expected running report");
        };
        assert!(snapshot.has_fix());
        assert_eq!(snapshot.satellites, Some(8));
        assert_eq!(snapshot.velocity.speed_knots, Some(22.4));

        cancel.cancel();
        let stats = handle.await.unwrap().unwrap();
        assert_eq!(stats.applied, 2);
    }

    #[tokio::test]
    async fn test_pump_skips_noise() {
        let (mut device, mut reports, cancel, handle) = spawn_pump(PumpConfig {
            max_line_len: 90,
            ..PumpConfig::default()
        });

        device.write_all(&[0xff, 0xfe, b'\n']).await.unwrap();
        device.write_all(&[b'x'; 200]).await.unwrap();
        device
            .write_all(b"\n$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*48\n")
            .await
            .unwrap();
        device
            .write_all(format!("{}\n", GGA).as_bytes())
            .await
            .unwrap();

        wait_for(&mut reports, |report| {
            matches!(report, PumpReport::Running(s) if s.has_fix())
        })
        .await;

        cancel.cancel();
        let stats = handle.await.unwrap().unwrap();
        assert_eq!(stats.applied, 1);
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.decode_errors, 1);
        assert_eq!(stats.overflows, 1);
    }

    #[tokio::test]
    async fn test_pump_reports_disconnect() {
        let (mut device, mut reports, _cancel, handle) = spawn_pump(PumpConfig::default());

        device
            .write_all(format!("{}\r\n", GGA).as_bytes())
            .await
            .unwrap();
        wait_for(&mut reports, |report| {
            matches!(report, PumpReport::Running(s) if s.has_fix())
        })
        .await;
        drop(device);

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(GpsError::Disconnected(_))));
        assert!(matches!(*reports.borrow(), PumpReport::Failed { .. }));
    }

    #[tokio::test]
    async fn test_cancel_interrupts_pending_read() {
        let (_device, _reports, cancel, handle) = spawn_pump(PumpConfig {
            read_timeout: Duration::from_secs(3600),
            ..PumpConfig::default()
        });

        tokio::task::yield_now().await;
        cancel.cancel();

        let stats = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("pump ignored cancellation")
            .unwrap()
            .unwrap();
        assert_eq!(stats, IngestStats::default());
    }

    /// Replays canned reads without ever waiting, then fails with
    /// `WouldBlock` forever.
    struct ScriptedSource {
        script: VecDeque<io::Result<Vec<u8>>>,
        reads: Arc<AtomicUsize>,
    }

    impl SerialSource for ScriptedSource {
        async fn read(&mut self, buf: &mut [u8], _timeout: Duration) -> io::Result<usize> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            match self.script.pop_front() {
                Some(Ok(bytes)) => {
                    buf[..bytes.len()].copy_from_slice(&bytes);
                    Ok(bytes.len())
                }
                Some(Err(e)) => Err(e),
                None => Err(io::Error::new(io::ErrorKind::WouldBlock, "not ready")),
            }
        }

        fn close(&mut self) {}
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_back_off() {
        let would_block =
            || -> io::Result<Vec<u8>> { Err(io::Error::new(io::ErrorKind::WouldBlock, "not ready")) };
        let reads = Arc::new(AtomicUsize::new(0));
        let source = ScriptedSource {
            script: VecDeque::from(vec![
                would_block(),
                Err(io::Error::new(io::ErrorKind::Interrupted, "signal")),
                would_block(),
                Ok(format!("{}\r\n", GGA).into_bytes()),
            ]),
            reads: reads.clone(),
        };
        let (report_tx, mut report_rx) = watch::channel(PumpReport::default());
        let cancel = CancellationToken::new();
        let handle =
            IngestionPump::new(source, PumpConfig::default(), report_tx, cancel.clone()).start();

        wait_for(&mut report_rx, |report| {
            matches!(report, PumpReport::Running(s) if s.has_fix())
        })
        .await;

        // The source keeps failing instantly; the pump must still pace itself.
        tokio::time::sleep(Duration::from_secs(1)).await;
        let seen = reads.load(Ordering::SeqCst);
        assert!(seen <= 40, "{} reads in one second", seen);

        cancel.cancel();
        let stats = tokio::time::timeout(Duration::from_millis(100), handle)
            .await
            .expect("pump ignored cancellation")
            .unwrap()
            .unwrap();
        assert_eq!(stats.applied, 1);
        assert!(matches!(*report_rx.borrow(), PumpReport::Running(_)));
    }
}
