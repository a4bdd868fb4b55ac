use std::net::SocketAddr;
use std::time::Duration;

use gmf_common::config::{ProxyAddr, ScanConfig};
use gmf_protocols::tunnel;
use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;

use super::{tcp, tls};
use crate::probe::ProbeError;

/// Any bidirectional byte stream a probe can speak HTTP over.
pub trait Stream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Stream for T {}

/// An open, buffered connection to a probe target. Dropping it closes it.
pub type Connection = BufReader<Box<dyn Stream>>;

/// Opens connections to targets as the scan configuration dictates.
#[derive(Clone)]
pub struct Connector {
    proxy: Option<ProxyAddr>,
    tls: Option<TlsConnector>,
    io_timeout: Duration,
}

impl Connector {
    pub fn new(config: &ScanConfig) -> Result<Self, rustls::Error> {
        let tls: Option<TlsConnector> = match config.tls {
            true => Some(tls::insecure_connector()?),
            false => None,
        };
        Ok(Self {
            proxy: config.proxy.clone(),
            tls,
            io_timeout: config.timeout,
        })
    }

    /// Connects to `target`, through the proxy tunnel and TLS when configured.
    pub async fn open(&self, target: SocketAddr) -> Result<Connection, ProbeError> {
        let stream: Box<dyn Stream> = match &self.proxy {
            None => Box::new(tcp::connect(target, self.io_timeout).await?),
            Some(proxy) => Box::new(self.open_tunnel(proxy, target).await?),
        };

        let stream: Box<dyn Stream> = match &self.tls {
            None => stream,
            Some(connector) => {
                let server_name: ServerName<'static> = ServerName::from(target.ip());
                let handshake = connector.connect(server_name, stream);
                match timeout(self.io_timeout, handshake).await {
                    Ok(Ok(tls_stream)) => Box::new(tls_stream),
                    Ok(Err(source)) => return Err(ProbeError::Tls(source)),
                    Err(_elapsed) => return Err(ProbeError::Tls(std::io::ErrorKind::TimedOut.into())),
                }
            }
        };

        Ok(BufReader::new(stream))
    }

    async fn open_tunnel(
        &self,
        proxy: &ProxyAddr,
        target: SocketAddr,
    ) -> Result<BufReader<TcpStream>, ProbeError> {
        let mut stream: BufReader<TcpStream> =
            BufReader::new(tcp::connect_proxy(proxy, self.io_timeout).await?);
        tunnel::establish(&mut stream, &target.to_string(), self.io_timeout).await?;
        Ok(stream)
    }
}
