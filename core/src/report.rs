//! The reporting boundary between the worker pool and the outside world.

use std::net::Ipv4Addr;

use crate::probe::Body;

/// A host that serves the probed resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub addr: Ipv4Addr,
    pub body: Body,
}

/// Receives hits as soon as a worker finds them.
///
/// Called concurrently from many workers with no ordering between calls.
pub trait Reporter: Send + Sync {
    fn report(&self, hit: &Hit);
}
