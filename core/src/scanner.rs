//! # Scan Orchestration
//!
//! The worker pool and the controller that runs it, plus the two pieces of
//! state every worker sees:
//!
//! * [`RunSignal`]: a process-wide flag that only ever goes from running to
//!   stopped. Workers poll it before taking each address, and the controller
//!   can wait for it to clear.
//! * [`ScanStats`]: lock-free counters for progress reporting.
//!
//! The address cursor is the only other shared state and lives in
//! [`crate::generator::SharedCursor`].

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::Notify;

mod controller;
mod pool;

pub use controller::{Controller, RunEnd};
pub use pool::{PoolHandle, WorkerPool};

/// Cooperative stop flag shared by the controller and every worker.
#[derive(Debug, Clone)]
pub struct RunSignal(Arc<SignalState>);

#[derive(Debug)]
struct SignalState {
    running: AtomicBool,
    cleared: Notify,
}

impl RunSignal {
    pub fn new() -> Self {
        Self(Arc::new(SignalState {
            running: AtomicBool::new(true),
            cleared: Notify::new(),
        }))
    }

    pub fn is_running(&self) -> bool {
        self.0.running.load(Ordering::Acquire)
    }

    /// Clears the flag. Returns `true` only for the call that cleared it.
    pub fn stop(&self) -> bool {
        let was_running: bool = self.0.running.swap(false, Ordering::AcqRel);
        if was_running {
            self.0.cleared.notify_waiters();
        }
        was_running
    }

    /// Resolves once the flag is cleared, immediately if it already is.
    pub async fn stopped(&self) {
        let notified = self.0.cleared.notified();
        tokio::pin!(notified);
        // Registered before the check so a concurrent stop cannot be missed.
        notified.as_mut().enable();
        if self.is_running() {
            notified.await;
        }
    }
}

impl Default for RunSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Running totals of probe outcomes.
#[derive(Debug, Default)]
pub struct ScanStats {
    probed: AtomicU64,
    skipped: AtomicU64,
    negative: AtomicU64,
    positive: AtomicU64,
    failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub probed: u64,
    pub skipped: u64,
    pub negative: u64,
    pub positive: u64,
    pub failed: u64,
}

impl ScanStats {
    pub(crate) fn record_probe(&self) {
        self.probed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_skip(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_negative(&self) {
        self.negative.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_positive(&self) {
        self.positive.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            probed: self.probed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            negative: self.negative.load(Ordering::Relaxed),
            positive: self.positive.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} probed, {} found, {} catch-all, {} negative, {} failed",
            self.probed, self.positive, self.skipped, self.negative, self.failed
        )
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
