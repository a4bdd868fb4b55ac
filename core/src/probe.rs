//! # Two-Phase HTTP Probe
//!
//! A probe decides whether one host actually serves the configured resource.
//!
//! 1. **Baseline**: `GET` a random 8-letter path. A success status means the
//!    host answers every path and cannot discriminate, so it is skipped. Only
//!    the response head is needed for that; the body is read only to reuse
//!    the connection.
//! 2. **Target**: `GET` the configured path, on the same connection when it
//!    can be reused, and [`classify`] the response.
//!
//! The connection is closed whenever the probe returns, on every path.

use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use async_trait::async_trait;
use gmf_common::config::{ScanConfig, TLS_PORT};
use gmf_protocols::http::{self, HttpError, Request, Response, ResponseHead};
use gmf_protocols::tunnel::TunnelError;
use rand::Rng;
use thiserror::Error;

use crate::network::{Connection, Connector};

mod classify;

pub use classify::{BINARY_SENTINEL, Body, classify, is_binary};

/// Length of the random baseline path, not counting the leading `/`.
pub const BASELINE_PATH_LEN: usize = 8;

/// Result of probing a single address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The host answers random paths with success and cannot be trusted.
    Skip,
    Negative,
    Positive(Body),
}

/// How a failed probe affects the rest of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Per-address failure, silently skipped.
    Transient,
    /// Breaks every later probe; the run must stop.
    Fatal,
    /// Logged, then skipped.
    Unexpected,
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("connect to {addr} failed: {source}")]
    Connect { addr: SocketAddr, source: io::Error },
    #[error("connect to {0} timed out")]
    ConnectTimeout(SocketAddr),
    #[error("proxy {proxy} unreachable: {source}")]
    Proxy { proxy: String, source: io::Error },
    #[error(transparent)]
    Tunnel(#[from] TunnelError),
    #[error("tls handshake failed: {0}")]
    Tls(io::Error),
    #[error(transparent)]
    Http(#[from] HttpError),
}

impl ProbeError {
    pub fn severity(&self) -> Severity {
        match self {
            ProbeError::Tunnel(TunnelError::Refused { .. }) => Severity::Fatal,
            ProbeError::Tunnel(TunnelError::Exchange(err)) | ProbeError::Http(err) => {
                http_severity(err)
            }
            ProbeError::Connect { source, .. } | ProbeError::Proxy { source, .. } => {
                io_severity(source)
            }
            ProbeError::ConnectTimeout(_) | ProbeError::Tls(_) => Severity::Transient,
        }
    }
}

fn http_severity(err: &HttpError) -> Severity {
    match err {
        HttpError::Io(source) => io_severity(source),
        _ => Severity::Transient,
    }
}

fn io_severity(err: &io::Error) -> Severity {
    use io::ErrorKind::*;
    match err.kind() {
        ConnectionRefused | ConnectionReset | ConnectionAborted | NotConnected | BrokenPipe
        | TimedOut | UnexpectedEof | HostUnreachable | NetworkUnreachable => Severity::Transient,
        _ => Severity::Unexpected,
    }
}

/// Checks one address for the configured resource.
#[async_trait]
pub trait Prober: Send + Sync {
    /// `baseline_path` is the caller's random path for the first phase.
    async fn probe(&self, addr: Ipv4Addr, baseline_path: &str) -> Result<Outcome, ProbeError>;
}

/// Builds a baseline path: `/` followed by [`BASELINE_PATH_LEN`] lowercase letters.
pub fn random_path<R: Rng>(rng: &mut R) -> String {
    let mut path: String = String::with_capacity(BASELINE_PATH_LEN + 1);
    path.push('/');
    for _ in 0..BASELINE_PATH_LEN {
        path.push(char::from(rng.random_range(b'a'..=b'z')));
    }
    path
}

/// The real HTTP(S) prober.
pub struct HttpProber {
    config: Arc<ScanConfig>,
    connector: Connector,
}

impl HttpProber {
    pub fn new(config: Arc<ScanConfig>) -> Result<Self, rustls::Error> {
        let connector: Connector = Connector::new(&config)?;
        Ok(Self { config, connector })
    }

    fn host_header(&self, addr: Ipv4Addr) -> String {
        let default_port: u16 = if self.config.tls { TLS_PORT } else { 80 };
        if self.config.port == default_port {
            addr.to_string()
        } else {
            format!("{addr}:{}", self.config.port)
        }
    }

    async fn get_head(&self, conn: &mut Connection, path: &str, host: &str) -> Result<ResponseHead, ProbeError> {
        let timeout = self.config.timeout;
        http::send(conn, &Request::get(path, host), timeout).await?;
        Ok(http::read_final_head(conn, timeout).await?)
    }

    /// Reads the baseline body off `conn` so the next request can use it.
    async fn drain(&self, conn: &mut Connection, head: ResponseHead) -> bool {
        if !head.can_reuse() {
            return false;
        }
        matches!(
            http::read_body(conn, head, self.config.timeout).await,
            Ok(Response { keep_alive: true, .. })
        )
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, addr: Ipv4Addr, baseline_path: &str) -> Result<Outcome, ProbeError> {
        let target: SocketAddr = SocketAddr::from((addr, self.config.port));
        let host: String = self.host_header(addr);

        let mut conn: Connection = self.connector.open(target).await?;
        let baseline: ResponseHead = self.get_head(&mut conn, baseline_path, &host).await?;
        if baseline.is_success() {
            return Ok(Outcome::Skip);
        }

        if !self.drain(&mut conn, baseline).await {
            conn = self.connector.open(target).await?;
        }
        let head: ResponseHead = self.get_head(&mut conn, &self.config.path, &host).await?;
        let response: Response = http::read_body(&mut conn, head, self.config.timeout).await?;

        Ok(classify(&self.config, response.status(), &response.body))
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
