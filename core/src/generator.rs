//! # Candidate Address Generation
//!
//! [`AddressGenerator`] draws uniformly random `u32` values and keeps only
//! globally routable ones, stopping after a fixed number of accepted
//! addresses. Duplicates are possible and accepted.
//!
//! [`SharedCursor`] is the single piece of mutable state shared by the worker
//! pool: a mutex around the generator, held only while the next address is
//! produced.

use std::iter::Fuse;
use std::net::Ipv4Addr;
use std::sync::Mutex;

use gmf_common::network::is_global;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Bounded, lazy stream of globally routable IPv4 addresses.
#[derive(Debug)]
pub struct AddressGenerator<R = StdRng> {
    rng: R,
    remaining: u64,
}

impl AddressGenerator<StdRng> {
    /// A generator yielding at most `limit` addresses, seeded from the OS.
    pub fn new(limit: u64) -> Self {
        Self::with_rng(StdRng::from_os_rng(), limit)
    }

    /// A reproducible generator, mostly useful in tests.
    pub fn seeded(seed: u64, limit: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), limit)
    }
}

impl<R: Rng> AddressGenerator<R> {
    pub fn with_rng(rng: R, limit: u64) -> Self {
        Self {
            rng,
            remaining: limit,
        }
    }

    /// Addresses still to be produced before exhaustion.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

impl<R: Rng> Iterator for AddressGenerator<R> {
    type Item = Ipv4Addr;

    fn next(&mut self) -> Option<Ipv4Addr> {
        if self.remaining == 0 {
            return None;
        }
        loop {
            let candidate: Ipv4Addr = Ipv4Addr::from(self.rng.random::<u32>());
            if is_global(candidate) {
                self.remaining -= 1;
                return Some(candidate);
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining: usize = usize::try_from(self.remaining).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

/// An address stream consumed by many workers under mutual exclusion.
///
/// Once the inner iterator returns `None` every later call does too.
#[derive(Debug)]
pub struct SharedCursor<I> {
    inner: Mutex<Fuse<I>>,
}

impl<I> SharedCursor<I>
where
    I: Iterator<Item = Ipv4Addr>,
{
    pub fn new(iter: I) -> Self {
        Self {
            inner: Mutex::new(iter.fuse()),
        }
    }

    /// Advances the stream. The lock is released before this returns.
    pub fn next(&self) -> Option<Ipv4Addr> {
        let mut guard = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.next()
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
