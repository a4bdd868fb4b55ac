//! Runs a [`WorkerPool`] to completion and handles interruption.
//!
//! The first interrupt clears the [`RunSignal`] and waits for workers to
//! finish their current address. A second interrupt during that drain
//! cancels the workers outright.
//!
//! When a worker clears the signal itself after a fatal error, the others get
//! one grace period to finish and are cancelled after it.

use std::net::Ipv4Addr;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info};

use super::{PoolHandle, RunSignal, WorkerPool};
use crate::probe::Prober;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEnd {
    /// The address stream ran out.
    Completed,
    /// A worker hit a fatal error and stopped the run.
    Aborted,
    /// Interrupted once, then drained.
    Stopped,
    /// Interrupted twice, workers cancelled.
    Forced,
}

pub struct Controller {
    signal: RunSignal,
    grace: Duration,
}

impl Controller {
    /// `grace` bounds how long workers may keep running after a fatal error.
    pub fn new(signal: RunSignal, grace: Duration) -> Self {
        Self { signal, grace }
    }

    /// Starts `pool` and waits for it to end.
    ///
    /// Each message on `interrupts` is one interruption. `on_stop` runs once,
    /// right after the first interruption clears the signal.
    pub async fn run<I, P, F>(
        &self,
        pool: WorkerPool<I, P>,
        interrupts: &mut UnboundedReceiver<()>,
        on_stop: F,
    ) -> RunEnd
    where
        I: Iterator<Item = Ipv4Addr> + Send + 'static,
        P: Prober + 'static,
        F: FnOnce(),
    {
        let mut handle: PoolHandle = pool.spawn();

        tokio::select! {
            _ = handle.join() => {
                return if self.signal.is_running() {
                    debug!("address stream exhausted");
                    RunEnd::Completed
                } else {
                    RunEnd::Aborted
                };
            }
            () = self.signal.stopped() => {
                return self.abort_after_grace(&mut handle).await;
            }
            Some(()) = interrupts.recv() => {}
        }

        self.signal.stop();
        on_stop();
        info!("waiting for {} workers to finish", handle.len());

        tokio::select! {
            _ = handle.join() => RunEnd::Stopped,
            Some(()) = interrupts.recv() => {
                handle.abort();
                RunEnd::Forced
            }
        }
    }

    async fn abort_after_grace(&self, handle: &mut PoolHandle) -> RunEnd {
        if tokio::time::timeout(self.grace, handle.join()).await.is_err() {
            debug!("cancelling {} workers after {:?}", handle.len(), self.grace);
            handle.abort();
            handle.join().await;
        }
        RunEnd::Aborted
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
