//! A fixed-size pool of workers draining one shared address stream.

use std::net::Ipv4Addr;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, error, trace, warn};

use super::{RunSignal, ScanStats};
use crate::generator::SharedCursor;
use crate::probe::{Outcome, ProbeError, Prober, Severity, random_path};
use crate::report::{Hit, Reporter};

/// Everything needed to launch the workers. Consumed by [`WorkerPool::spawn`].
pub struct WorkerPool<I, P> {
    workers: usize,
    cursor: Arc<SharedCursor<I>>,
    prober: Arc<P>,
    reporter: Arc<dyn Reporter>,
    signal: RunSignal,
    stats: Arc<ScanStats>,
}

impl<I, P> WorkerPool<I, P>
where
    I: Iterator<Item = Ipv4Addr> + Send + 'static,
    P: Prober + 'static,
{
    pub fn new(
        workers: usize,
        cursor: SharedCursor<I>,
        prober: Arc<P>,
        reporter: Arc<dyn Reporter>,
        signal: RunSignal,
        stats: Arc<ScanStats>,
    ) -> Self {
        Self {
            workers: workers.max(1),
            cursor: Arc::new(cursor),
            prober,
            reporter,
            signal,
            stats,
        }
    }

    /// Launches every worker at once.
    pub fn spawn(self) -> PoolHandle {
        let mut tasks: JoinSet<()> = JoinSet::new();
        for id in 0..self.workers {
            let worker: Worker<I, P> = Worker {
                id,
                baseline_path: random_path(&mut rand::rng()),
                cursor: Arc::clone(&self.cursor),
                prober: Arc::clone(&self.prober),
                reporter: Arc::clone(&self.reporter),
                signal: self.signal.clone(),
                stats: Arc::clone(&self.stats),
            };
            tasks.spawn(worker.run());
        }
        debug!("started {} workers", self.workers);
        PoolHandle { tasks }
    }
}

/// The running pool.
pub struct PoolHandle {
    tasks: JoinSet<()>,
}

impl PoolHandle {
    /// Waits for every worker to finish. Safe to cancel and call again.
    pub async fn join(&mut self) {
        while let Some(result) = self.tasks.join_next().await {
            if let Err(err) = result
                && err.is_panic()
            {
                error!("worker panicked: {err}");
            }
        }
    }

    /// Cancels every worker at its next await point.
    pub fn abort(&mut self) {
        self.tasks.abort_all();
    }

    /// Workers still running.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

struct Worker<I, P> {
    id: usize,
    /// Fixed for the worker's lifetime.
    baseline_path: String,
    cursor: Arc<SharedCursor<I>>,
    prober: Arc<P>,
    reporter: Arc<dyn Reporter>,
    signal: RunSignal,
    stats: Arc<ScanStats>,
}

impl<I, P> Worker<I, P>
where
    I: Iterator<Item = Ipv4Addr>,
    P: Prober,
{
    async fn run(self) {
        while self.signal.is_running() {
            // The cursor lock is released before the probe starts.
            let Some(addr) = self.cursor.next() else {
                break;
            };

            self.stats.record_probe();
            match self.prober.probe(addr, &self.baseline_path).await {
                Ok(Outcome::Positive(body)) => {
                    self.stats.record_positive();
                    self.reporter.report(&Hit { addr, body });
                }
                Ok(Outcome::Negative) => self.stats.record_negative(),
                Ok(Outcome::Skip) => {
                    trace!("{addr} answers any path, skipped");
                    self.stats.record_skip();
                }
                Err(err) => self.on_error(addr, err),
            }
        }
        trace!("worker {} finished", self.id);
    }

    fn on_error(&self, addr: Ipv4Addr, err: ProbeError) {
        self.stats.record_failure();
        match err.severity() {
            Severity::Transient => trace!("{addr}: {err}"),
            Severity::Unexpected => warn!("{addr}: {err}"),
            Severity::Fatal => {
                if self.signal.stop() {
                    error!("{err}");
                } else {
                    debug!("{addr}: {err} while stopping");
                }
            }
        }
    }
}
