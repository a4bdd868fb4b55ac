use colored::*;
use gmf_common::config::{RunConfig, ScanConfig};
use gmf_core::{RunEnd, StatsSnapshot};
use tracing::info;
use unicode_width::UnicodeWidthStr;

use super::logging::PRINT_TARGET;

pub const TOTAL_WIDTH: usize = 48;

/// Writes `msg` to the diagnostic stream exactly as given.
pub fn print(msg: &str) {
    info!(target: PRINT_TARGET, raw_msg = msg);
}

pub fn banner() {
    let text: String = "--=[ G M F ]=--".to_string();
    centerln(&format!("{}", text.bright_green().bold()), text.width());
    centerln(
        &format!("{}", format!("v{}", env!("CARGO_PKG_VERSION")).bright_black()),
        env!("CARGO_PKG_VERSION").len() + 1,
    );
}

pub fn settings(config: &ScanConfig, run: &RunConfig) {
    let scheme: &str = if config.tls { "https" } else { "http" };
    aligned_line("target", format!("{scheme}://*:{}{}", config.port, config.path));
    aligned_line("workers", run.workers.to_string());
    aligned_line("limit", run.limit.to_string());
    aligned_line("timeout", format!("{:?}", config.timeout));
    if let Some(proxy) = &config.proxy {
        aligned_line("proxy", proxy.to_string());
    }
    let exclude: String = config
        .exclude
        .as_ref()
        .map_or_else(|| "none".to_string(), |re| re.as_str().to_string());
    aligned_line("exclude", exclude);
}

pub fn working() {
    print(&format!("{}", "....working....".bright_black()));
}

pub fn stopping() {
    print(&format!("{}", "Stopping...".yellow().bold()));
}

pub fn end(end: RunEnd) {
    match end {
        RunEnd::Forced => print(&format!("{}", "-----forced-----".red().bold())),
        _ => print(&format!("{}", "----- end -----".bright_black())),
    }
}

pub fn summary(snap: &StatsSnapshot) {
    let found: ColoredString = if snap.positive > 0 {
        snap.positive.to_string().green().bold()
    } else {
        snap.positive.to_string().normal()
    };
    print(&format!(
        "{} {} found in {} probed ({} catch-all, {} negative, {} failed)",
        ">".bright_black(),
        found,
        snap.probed,
        snap.skipped,
        snap.negative,
        snap.failed
    ));
}

fn aligned_line(key: &str, value: String) {
    const KEY_WIDTH: usize = 8;
    let dots: String = ".".repeat(KEY_WIDTH.saturating_sub(key.len()));
    print(&format!(
        "{} {}{}{} {}",
        ">".bright_black(),
        key.bright_green(),
        dots.bright_black(),
        ":".bright_black(),
        value
    ));
}

fn centerln(msg: &str, width: usize) {
    let space: String = " ".repeat(TOTAL_WIDTH.saturating_sub(width) / 2);
    print(&format!("{space}{msg}"));
}
