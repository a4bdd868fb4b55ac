use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use gmf_common::config::ProxyAddr;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::probe::ProbeError;

/// Connects to `addr`, giving up after `connect_timeout`.
pub async fn connect(addr: SocketAddr, connect_timeout: Duration) -> Result<TcpStream, ProbeError> {
    match timeout(connect_timeout, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => {
            let _ = stream.set_nodelay(true);
            Ok(stream)
        }
        Ok(Err(source)) => Err(ProbeError::Connect { addr, source }),
        Err(_elapsed) => Err(ProbeError::ConnectTimeout(addr)),
    }
}

/// Connects to the proxy, resolving its host name if needed.
pub async fn connect_proxy(proxy: &ProxyAddr, connect_timeout: Duration) -> Result<TcpStream, ProbeError> {
    let target = (proxy.host.as_str(), proxy.port);
    let result: io::Result<TcpStream> = match timeout(connect_timeout, TcpStream::connect(target)).await {
        Ok(result) => result,
        Err(_elapsed) => Err(io::ErrorKind::TimedOut.into()),
    };
    result.map_err(|source| ProbeError::Proxy {
        proxy: proxy.to_string(),
        source,
    })
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
