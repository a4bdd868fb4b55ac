use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use gmf_common::config::ScanConfig;
use gmf_core::{
    AddressGenerator, Body, Controller, HttpProber, Outcome, ProbeError, Prober, RunEnd,
    RunSignal, ScanStats, SharedCursor, WorkerPool,
};
use gmf_common::network::is_global;
use tokio::sync::mpsc;

use crate::utils::reporter::CollectingReporter;
use crate::utils::server::{self, Reply};
use crate::utils::proxy;

const GRACE: Duration = Duration::from_secs(2);

/// Records every address and baseline path it is asked about.
#[derive(Default)]
struct RecordingProber {
    seen: Mutex<Vec<Ipv4Addr>>,
    baselines: Mutex<HashSet<String>>,
}

#[async_trait]
impl Prober for RecordingProber {
    async fn probe(&self, addr: Ipv4Addr, baseline_path: &str) -> Result<Outcome, ProbeError> {
        self.seen.lock().unwrap().push(addr);
        self.baselines.lock().unwrap().insert(baseline_path.to_string());
        tokio::task::yield_now().await;
        if addr.octets()[3] % 4 == 0 {
            Ok(Outcome::Positive(Body::Text(addr.to_string())))
        } else {
            Ok(Outcome::Negative)
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn pool_probes_every_generated_address_once() {
    const LIMIT: u64 = 5_000;
    const WORKERS: usize = 32;

    let signal = RunSignal::new();
    let stats = Arc::new(ScanStats::default());
    let prober = Arc::new(RecordingProber::default());
    let reporter = Arc::new(CollectingReporter::default());
    let pool = WorkerPool::new(
        WORKERS,
        SharedCursor::new(AddressGenerator::seeded(7, LIMIT)),
        Arc::clone(&prober),
        reporter.clone(),
        signal.clone(),
        Arc::clone(&stats),
    );

    let (_tx, mut rx) = mpsc::unbounded_channel();
    let end = Controller::new(signal, GRACE).run(pool, &mut rx, || {}).await;
    assert_eq!(end, RunEnd::Completed);

    let mut seen: Vec<Ipv4Addr> = prober.seen.lock().unwrap().clone();
    let mut expected: Vec<Ipv4Addr> = AddressGenerator::seeded(7, LIMIT).collect();
    seen.sort();
    expected.sort();
    assert_eq!(seen, expected);
    assert!(seen.iter().all(|addr| is_global(*addr)));

    let baselines = prober.baselines.lock().unwrap();
    assert!(baselines.len() > 1, "workers should not share a baseline path");
    assert!(baselines.len() <= WORKERS);

    let snap = stats.snapshot();
    assert_eq!(snap.probed, LIMIT);
    assert_eq!(snap.positive + snap.negative, LIMIT);

    let hits = reporter.hits();
    assert_eq!(hits.len() as u64, snap.positive);
    assert!(hits.iter().all(|hit| hit.addr.octets()[3] % 4 == 0));
    assert!(hits.iter().all(|hit| hit.body == Body::Text(hit.addr.to_string())));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn proxy_refusal_aborts_the_run() {
    const WORKERS: usize = 8;

    let proxy = proxy::refusing(403).await.unwrap();
    let config = ScanConfig::new("/.git/HEAD")
        .unwrap()
        .with_proxy(Some(proxy.addr.clone()))
        .with_timeout(Duration::from_secs(2));
    let prober = Arc::new(HttpProber::new(Arc::new(config)).unwrap());

    let signal = RunSignal::new();
    let stats = Arc::new(ScanStats::default());
    let pool = WorkerPool::new(
        WORKERS,
        SharedCursor::new(AddressGenerator::seeded(11, 100_000)),
        prober,
        Arc::new(CollectingReporter::default()),
        signal.clone(),
        Arc::clone(&stats),
    );

    let (_tx, mut rx) = mpsc::unbounded_channel();
    let end = tokio::time::timeout(
        Duration::from_secs(10),
        Controller::new(signal.clone(), GRACE).run(pool, &mut rx, || {}),
    )
    .await
    .expect("run should end soon after the proxy refuses");

    assert_eq!(end, RunEnd::Aborted);
    assert!(!signal.is_running());

    let snap = stats.snapshot();
    assert!(snap.failed >= 1);
    assert!(
        snap.probed <= 2 * WORKERS as u64,
        "workers kept probing after the fatal error: {snap}"
    );
    assert!(proxy.tunnels() >= 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn proxy_refusal_cancels_hung_workers_within_one_timeout() {
    const WORKERS: usize = 8;
    const HUNG: usize = 4;
    const TIMEOUT: Duration = Duration::from_millis(500);
    const SLACK: Duration = Duration::from_millis(400);

    // Targets stream forever, so every worker that got a tunnel blocks on
    // a body that keeps arriving faster than the I/O timeout.
    let server = server::serve(|path: &str| {
        if path == "/.git/HEAD" {
            Reply::streaming(b"--frame\r\n")
        } else {
            Reply::not_found()
        }
    })
    .await
    .unwrap();
    let proxy = proxy::refusing_after(server.port, HUNG, 403).await.unwrap();
    let config = ScanConfig::new("/.git/HEAD")
        .unwrap()
        .with_port(server.port)
        .with_proxy(Some(proxy.addr.clone()))
        .with_timeout(TIMEOUT);
    let prober = Arc::new(HttpProber::new(Arc::new(config)).unwrap());

    let signal = RunSignal::new();
    let stats = Arc::new(ScanStats::default());
    let pool = WorkerPool::new(
        WORKERS,
        SharedCursor::new(AddressGenerator::seeded(13, 100_000)),
        prober,
        Arc::new(CollectingReporter::default()),
        signal.clone(),
        Arc::clone(&stats),
    );

    let (_tx, mut rx) = mpsc::unbounded_channel();
    let end = tokio::time::timeout(
        Duration::from_secs(10),
        Controller::new(signal.clone(), TIMEOUT).run(pool, &mut rx, || {}),
    )
    .await
    .expect("hung workers were never cancelled");
    let ended: Instant = Instant::now();

    assert_eq!(end, RunEnd::Aborted);
    let refused: Instant = proxy.first_refusal().expect("proxy never refused");
    let after: Duration = ended.duration_since(refused);
    assert!(
        after < TIMEOUT + SLACK,
        "run ended {after:?} after the first refusal"
    );
    assert!(proxy.tunnels() > HUNG);
    assert!(server.requests().len() >= HUNG);
}

#[tokio::test]
async fn interrupt_drains_in_flight_probes() {
    let signal = RunSignal::new();
    let stats = Arc::new(ScanStats::default());
    let prober = Arc::new(RecordingProber::default());
    let pool = WorkerPool::new(
        4,
        SharedCursor::new(AddressGenerator::seeded(3, u64::MAX)),
        Arc::clone(&prober),
        Arc::new(CollectingReporter::default()),
        signal.clone(),
        Arc::clone(&stats),
    );

    let (tx, mut rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let _ = tx.send(());
        // Keep the sender alive until the run is over.
        tokio::time::sleep(Duration::from_secs(30)).await;
    });

    let end = Controller::new(signal.clone(), GRACE).run(pool, &mut rx, || {}).await;

    assert_eq!(end, RunEnd::Stopped);
    let snap = stats.snapshot();
    assert!(snap.probed > 0);
    assert_eq!(snap.probed, snap.positive + snap.negative);
}
