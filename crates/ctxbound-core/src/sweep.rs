//! Best-effort expiry sweeping.
//!
//! Managers implement [`Sweep`]; a [`PeriodicSweeper`] calls them from a
//! background thread. Individual failures are counted and logged by the
//! implementor, never raised, so one stuck artifact cannot block the rest.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Artifacts reclaimed in this pass.
    pub removed: usize,
    /// Artifacts whose deletion failed (already logged).
    pub failed: usize,
}

impl SweepReport {
    pub fn merge(&mut self, other: SweepReport) {
        self.removed += other.removed;
        self.failed += other.failed;
    }
}

pub trait Sweep: Send + Sync {
    /// Short name for log lines.
    fn name(&self) -> &'static str;

    /// Reclaim everything expired as of now.
    fn sweep(&self) -> SweepReport;
}

/// Background thread sweeping a fixed set of targets on an interval.
///
/// Stops on [`PeriodicSweeper::stop`] or when dropped.
pub struct PeriodicSweeper {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicSweeper {
    pub fn spawn(targets: Vec<Arc<dyn Sweep>>, interval: Duration) -> std::io::Result<Self> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let handle = std::thread::Builder::new()
            .name("ctxbound-sweeper".into())
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        for target in &targets {
                            let report = target.sweep();
                            if report.removed > 0 || report.failed > 0 {
                                tracing::info!(
                                    target = target.name(),
                                    removed = report.removed,
                                    failed = report.failed,
                                    "periodic sweep"
                                );
                            }
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;
        Ok(Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("sweeper thread panicked");
            }
        }
    }
}

impl Drop for PeriodicSweeper {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting(AtomicUsize);

    impl Sweep for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }
        fn sweep(&self) -> SweepReport {
            self.0.fetch_add(1, Ordering::SeqCst);
            SweepReport {
                removed: 1,
                failed: 0,
            }
        }
    }

    #[test]
    fn sweeper_runs_until_stopped() {
        let target = Arc::new(Counting(AtomicUsize::new(0)));
        let targets: Vec<Arc<dyn Sweep>> = vec![target.clone()];
        let sweeper = PeriodicSweeper::spawn(targets, Duration::from_millis(5)).unwrap();
        while target.0.load(Ordering::SeqCst) < 2 {
            std::thread::sleep(Duration::from_millis(2));
        }
        sweeper.stop();
        let after_stop = target.0.load(Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(target.0.load(Ordering::SeqCst), after_stop);
    }

    #[test]
    fn reports_merge() {
        let mut a = SweepReport {
            removed: 2,
            failed: 1,
        };
        a.merge(SweepReport {
            removed: 3,
            failed: 0,
        });
        assert_eq!(
            a,
            SweepReport {
                removed: 5,
                failed: 1
            }
        );
    }
}
