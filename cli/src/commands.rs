pub mod scan;

use clap::Parser;
use gmf_common::config::{
    ConfigError, DEFAULT_EXCLUDE, DEFAULT_LIMIT, DEFAULT_PORT, DEFAULT_TIMEOUT_SECS,
    DEFAULT_WORKERS, ProxyAddr, RunConfig, ScanConfig,
};

#[derive(Parser, Debug)]
#[command(name = "gmf", version)]
#[command(about = "Finds hosts across the IPv4 internet that expose a given web resource.")]
pub struct CommandLine {
    /// Resource to look for, e.g. /.git/HEAD
    pub path: String,

    /// Port to probe; 443 implies --tls
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Number of concurrent workers
    #[arg(short, long, default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// Per connect/read timeout in seconds
    #[arg(short, long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: f64,

    /// Maximum number of addresses to probe
    #[arg(short, long, default_value_t = DEFAULT_LIMIT)]
    pub limit: u64,

    /// Tunnel every connection through this HTTP proxy
    #[arg(long, value_name = "HOST:PORT")]
    pub proxy: Option<ProxyAddr>,

    /// Print the response body after each match
    #[arg(short = 'b', long)]
    pub show_body: bool,

    /// Case-insensitive pattern that rejects a matching body; empty disables
    #[arg(short = 'x', long, default_value = DEFAULT_EXCLUDE, value_name = "REGEX")]
    pub exclude: String,

    /// Use TLS without certificate validation
    #[arg(long)]
    pub tls: bool,

    /// Log per-address diagnostics
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only print matches, warnings and errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn scan_config(&self) -> Result<ScanConfig, ConfigError> {
        Ok(ScanConfig::new(&self.path)?
            .with_port(self.port)
            .with_tls(self.tls)
            .with_exclude(&self.exclude)?
            .with_proxy(self.proxy.clone())
            .with_timeout_secs(self.timeout)?
            .with_show_body(self.show_body))
    }

    pub fn run_config(&self) -> Result<RunConfig, ConfigError> {
        RunConfig::new(self.workers, self.limit)
    }
}
