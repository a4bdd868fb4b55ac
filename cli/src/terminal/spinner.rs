use std::io::{self, Write};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use colored::*;
use console::Term;
use gmf_core::{ScanStats, StatsSnapshot};
use indicatif::{ProgressBar, ProgressStyle};

const TIP_DURATION: Duration = Duration::from_secs(2);
const REFRESH_INTERVAL: Duration = Duration::from_millis(250);
const TIP: &str = "Ctrl+C stops after in-flight probes, press again to force";

pub struct SpinnerHandle {
    pub spinner: ProgressBar,
}

impl SpinnerHandle {
    pub fn println(&self, msg: &str) {
        self.spinner.println(msg);
    }

    pub fn finish_and_clear(&self) {
        self.spinner.finish_and_clear();
    }

    pub fn set_message(&self, msg: String) {
        self.spinner.set_message(msg);
    }

    /// Hides the spinner while `f` writes to the terminal.
    pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        self.spinner.suspend(f)
    }
}

static SPINNER: OnceLock<SpinnerHandle> = OnceLock::new();

/// The spinner, if one has been started and not yet finished.
pub fn active() -> Option<&'static SpinnerHandle> {
    SPINNER.get().filter(|handle| !handle.spinner.is_finished())
}

/// Starts the progress spinner on stderr, fed from `stats`.
///
/// Does nothing when stderr is not a terminal or `quiet` is set.
pub fn start(stats: Arc<ScanStats>, quiet: bool) {
    if quiet || !Term::stderr().is_term() {
        return;
    }

    let handle: &SpinnerHandle = SPINNER.get_or_init(init_spinner);
    handle.set_message(format!("{}", TIP.italic().white()));

    tokio::spawn(async move {
        let first = tokio::time::Instant::now() + TIP_DURATION;
        let mut ticker = tokio::time::interval_at(first, REFRESH_INTERVAL);
        loop {
            ticker.tick().await;
            let Some(handle) = active() else {
                break;
            };
            handle.set_message(progress_message(&stats.snapshot()));
        }
    });
}

pub fn finish() {
    if let Some(handle) = active() {
        handle.finish_and_clear();
    }
}

fn init_spinner() -> SpinnerHandle {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.blue} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&[
            "▁▁▁▁▁",
            "▁▂▂▂▁",
            "▁▄▂▄▁",
            "▂▄▆▄▂",
            "▄▆█▆▄",
            "▂▄▆▄▂",
            "▁▄▂▄▁",
            "▁▂▂▂▁",
        ]);

    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(100));

    SpinnerHandle { spinner: pb }
}

fn progress_message(snap: &StatsSnapshot) -> String {
    format!(
        "Probed {} hosts, {} found",
        snap.probed.to_string().bold(),
        snap.positive.to_string().green().bold()
    )
}

/// Log sink that prints above the spinner while it runs, and to stderr otherwise.
pub struct LogWriter;

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match active() {
            Some(handle) => {
                let msg = String::from_utf8_lossy(buf);
                handle.println(msg.trim_end());
            }
            None => io::stderr().write_all(buf)?,
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}
