//! Fixed-cadence driver for the relay.
//!
//! Runs a cycle, sleeps for the poll interval, repeats. A shutdown future
//! is raced against the sleep; a cycle that has already started always
//! runs to completion.

use std::future::Future;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::info;

use crate::domain::CycleReport;

use super::relay::Relay;
use super::store::SentRecord;

/// Owns the relay and its in-memory record across cycles
pub struct Scheduler {
    relay: Relay,
    record: SentRecord,
    interval: Duration,
}

impl Scheduler {
    /// Create a scheduler with an already-loaded record
    pub fn new(relay: Relay, record: SentRecord, interval: Duration) -> Self {
        Self {
            relay,
            record,
            interval,
        }
    }

    /// The in-memory record
    pub fn record(&self) -> &SentRecord {
        &self.record
    }

    /// Run exactly one cycle
    pub async fn run_once(&mut self) -> CycleReport {
        let report = self.relay.run_cycle(&mut self.record).await;
        log_report(&report, self.record.len());
        report
    }

    /// Run cycles until `shutdown` resolves. Returns the number of cycles run.
    pub async fn run_until<F>(&mut self, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut cycles = 0u64;

        loop {
            self.run_once().await;
            cycles += 1;

            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!(cycles, "Shutdown requested, stopping relay");
                    break;
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        cycles
    }

    /// Take the relay and record back
    pub fn into_parts(self) -> (Relay, SentRecord) {
        (self.relay, self.record)
    }
}

/// Install the interrupt handlers now and return a future that resolves
/// once one of them fires.
///
/// The handlers are registered before this returns, so a signal that
/// arrives while the first cycle is still running is caught instead of
/// terminating the process.
pub fn shutdown_signal() -> std::io::Result<impl Future<Output = ()>> {
    let (tx, rx) = oneshot::channel::<()>();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut interrupt = signal(SignalKind::interrupt())?;
        let mut terminate = signal(SignalKind::terminate())?;
        tokio::spawn(async move {
            tokio::select! {
                _ = interrupt.recv() => {}
                _ = terminate.recv() => {}
            }
            let _ = tx.send(());
        });
    }

    #[cfg(not(unix))]
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = tx.send(());
        }
    });

    Ok(async move {
        if rx.await.is_err() {
            // Handler task gone without a signal: never resolve
            std::future::pending::<()>().await;
        }
    })
}

fn log_report(report: &CycleReport, record_len: usize) {
    if report.fetch_failed() {
        return;
    }

    info!(
        fetched = report.fetched,
        delivered = report.delivered.len(),
        failed = report.failed.len(),
        already_sent = report.already_sent,
        persisted = report.persisted,
        record = record_len,
        duration_ms = report.duration_ms().unwrap_or_default(),
        "Cycle complete"
    );
}
