//! # Scan Configuration
//!
//! Immutable value objects shared read-only by every worker for the whole
//! run. They are built once from the command line and never mutated.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use regex::{Regex, RegexBuilder};
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 80;
pub const TLS_PORT: u16 = 443;
pub const DEFAULT_WORKERS: usize = 512;
pub const DEFAULT_TIMEOUT_SECS: f64 = 0.75;
pub const DEFAULT_LIMIT: u64 = 1_000_000;
pub const DEFAULT_EXCLUDE: &str = "<(!doctype|html|head|body|br)";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("target path cannot be empty")]
    EmptyPath,
    #[error("worker count must be at least 1")]
    NoWorkers,
    #[error("timeout must be a positive number of seconds, got {0}")]
    InvalidTimeout(f64),
    #[error("invalid exclusion pattern: {0}")]
    InvalidPattern(String),
    #[error("invalid proxy '{0}', expected HOST:PORT")]
    InvalidProxy(String),
}

/// An HTTP proxy used to tunnel every probe connection via `CONNECT`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyAddr {
    pub host: String,
    pub port: u16,
}

impl FromStr for ProxyAddr {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidProxy(s.to_string());
        let (host, port) = s.trim().rsplit_once(':').ok_or_else(invalid)?;
        if host.is_empty() {
            return Err(invalid());
        }
        let port: u16 = port.parse().map_err(|_| invalid())?;
        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for ProxyAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Everything a single probe needs to know about the resource it looks for.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Resource requested in the second phase. Always starts with `/`.
    pub path: String,
    pub port: u16,
    /// Wrap connections in a TLS session that does not validate certificates.
    pub tls: bool,
    /// Case-insensitive pattern whose match in a body suppresses a positive.
    pub exclude: Option<Regex>,
    pub proxy: Option<ProxyAddr>,
    /// Bound applied separately to every connect, write and read.
    pub timeout: Duration,
    pub show_body: bool,
}

impl ScanConfig {
    /// Creates a config for `path` on port 80 with the default exclusion pattern.
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        let path: String = normalize_path(path)?;
        Ok(Self {
            path,
            port: DEFAULT_PORT,
            tls: false,
            exclude: Some(compile_exclude(DEFAULT_EXCLUDE)?),
            proxy: None,
            timeout: Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS),
            show_body: false,
        })
    }

    /// Port 443 always selects TLS.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        if port == TLS_PORT {
            self.tls = true;
        }
        self
    }

    pub fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls || self.port == TLS_PORT;
        self
    }

    /// An empty pattern disables exclusion entirely.
    pub fn with_exclude(mut self, pattern: &str) -> Result<Self, ConfigError> {
        self.exclude = if pattern.is_empty() {
            None
        } else {
            Some(compile_exclude(pattern)?)
        };
        Ok(self)
    }

    pub fn with_proxy(mut self, proxy: Option<ProxyAddr>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_timeout_secs(mut self, secs: f64) -> Result<Self, ConfigError> {
        if !secs.is_finite() || secs <= 0.0 {
            return Err(ConfigError::InvalidTimeout(secs));
        }
        self.timeout = Duration::from_secs_f64(secs);
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_show_body(mut self, show_body: bool) -> Self {
        self.show_body = show_body;
        self
    }

    /// Returns `true` when `text` matches the exclusion pattern.
    pub fn is_excluded(&self, text: &str) -> bool {
        self.exclude.as_ref().is_some_and(|re| re.is_match(text))
    }
}

/// Sizing of the worker pool and the candidate stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunConfig {
    pub workers: usize,
    pub limit: u64,
}

impl RunConfig {
    pub fn new(workers: usize, limit: u64) -> Result<Self, ConfigError> {
        if workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        Ok(Self { workers, limit })
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            limit: DEFAULT_LIMIT,
        }
    }
}

fn normalize_path(path: &str) -> Result<String, ConfigError> {
    let path: &str = path.trim();
    if path.is_empty() {
        return Err(ConfigError::EmptyPath);
    }
    if path.starts_with('/') {
        Ok(path.to_string())
    } else {
        Ok(format!("/{path}"))
    }
}

fn compile_exclude(pattern: &str) -> Result<Regex, ConfigError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| ConfigError::InvalidPattern(e.to_string()))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
