use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use gmf_common::config::{RunConfig, ScanConfig};
use gmf_core::{
    AddressGenerator, Controller, HttpProber, Reporter, RunEnd, RunSignal, ScanStats,
    SharedCursor, WorkerPool,
};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, error};

use crate::commands::CommandLine;
use crate::terminal::output::StdoutReporter;
use crate::terminal::{print, spinner};

pub async fn scan(cmd: &CommandLine) -> anyhow::Result<ExitCode> {
    let config: Arc<ScanConfig> = Arc::new(cmd.scan_config()?);
    let run: RunConfig = cmd.run_config()?;

    print::banner();
    print::settings(&config, &run);

    let signal: RunSignal = RunSignal::new();
    let stats: Arc<ScanStats> = Arc::new(ScanStats::default());
    let prober: Arc<HttpProber> =
        Arc::new(HttpProber::new(Arc::clone(&config)).context("failed to set up TLS")?);
    let reporter: Arc<dyn Reporter> = Arc::new(StdoutReporter::new(config.show_body));
    let cursor = SharedCursor::new(AddressGenerator::new(run.limit));

    let pool = WorkerPool::new(
        run.workers,
        cursor,
        prober,
        reporter,
        signal.clone(),
        Arc::clone(&stats),
    );

    let mut interrupts: UnboundedReceiver<()> = listen_for_interrupts();

    print::working();
    spinner::start(Arc::clone(&stats), cmd.quiet);

    let end: RunEnd = Controller::new(signal, config.timeout)
        .run(pool, &mut interrupts, print::stopping)
        .await;

    spinner::finish();
    print::end(end);
    print::summary(&stats.snapshot());

    Ok(exit_code(end))
}

/// Forwards every Ctrl+C as one message.
fn listen_for_interrupts() -> UnboundedReceiver<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        loop {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!("cannot listen for Ctrl+C: {err}");
                break;
            }
            debug!("interrupt received");
            if tx.send(()).is_err() {
                break;
            }
        }
    });
    rx
}

fn exit_code(end: RunEnd) -> ExitCode {
    match end {
        RunEnd::Completed | RunEnd::Stopped => ExitCode::SUCCESS,
        RunEnd::Aborted => ExitCode::FAILURE,
        RunEnd::Forced => ExitCode::from(130),
    }
}
