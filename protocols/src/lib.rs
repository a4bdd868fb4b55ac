//! Wire protocols spoken by the probe.
//!
//! * **[`http`]**: HTTP/1.1 request encoding and response parsing.
//! * **[`tunnel`]**: `CONNECT` negotiation with an HTTP proxy.

pub mod http;
pub mod tunnel;
