//! HTTP proxy tunnels.
//!
//! After [`establish`] succeeds the stream is a raw byte pipe to the target,
//! ready for plain HTTP or a TLS handshake.

use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::trace;

use crate::http::{self, HttpError, Request, ResponseHead};

#[derive(Debug, Error)]
pub enum TunnelError {
    /// The proxy answered but refused to open the tunnel.
    #[error("tunnel connection failed: {status} {reason}")]
    Refused { status: u16, reason: String },
    /// The proxy could not be talked to at all.
    #[error("proxy exchange failed: {0}")]
    Exchange(#[from] HttpError),
}

/// Asks the proxy on `stream` to open a tunnel to `authority` (`host:port`).
pub async fn establish<S>(stream: &mut S, authority: &str, io_timeout: Duration) -> Result<(), TunnelError>
where
    S: AsyncBufRead + AsyncWrite + Unpin,
{
    http::send(stream, &Request::connect(authority), io_timeout).await?;
    let head: ResponseHead = http::read_head(stream, io_timeout).await?;
    trace!("proxy answered CONNECT {authority} with {}", head.status);

    if (200..300).contains(&head.status) {
        Ok(())
    } else {
        Err(TunnelError::Refused {
            status: head.status,
            reason: head.reason,
        })
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
