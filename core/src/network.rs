//! # Probe Transport
//!
//! Opens the byte streams probes talk HTTP over: direct TCP or a `CONNECT`
//! tunnel through a proxy, optionally wrapped in a TLS session that accepts
//! any certificate.

mod connection;
mod tcp;
mod tls;

pub use connection::{Connection, Connector, Stream};
pub use tls::insecure_connector;
