//! # Address Ranges
//!
//! Inclusive IPv4 ranges and the table of non-global address space that
//! candidate generation must never yield.
//!
//! Ranges are represented as pairs of `u32` so that membership checks are a
//! pair of integer comparisons.

use std::fmt;
use std::net::Ipv4Addr;

/// An inclusive `[start, end]` span of IPv4 addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Range {
    pub start: u32,
    pub end: u32,
}

impl Ipv4Range {
    pub const fn new(start_addr: Ipv4Addr, end_addr: Ipv4Addr) -> Self {
        Self {
            start: start_addr.to_bits(),
            end: end_addr.to_bits(),
        }
    }

    /// Builds the range covered by `addr/prefix`.
    ///
    /// Host bits in `addr` are ignored. A `prefix` above 32 is clamped.
    pub const fn cidr(addr: Ipv4Addr, prefix: u8) -> Self {
        let prefix: u32 = if prefix > 32 { 32 } else { prefix as u32 };
        let mask: u32 = if prefix == 0 { 0 } else { u32::MAX << (32 - prefix) };
        let start: u32 = addr.to_bits() & mask;
        Self {
            start,
            end: start | !mask,
        }
    }

    pub const fn contains(&self, ip: u32) -> bool {
        self.start <= ip && ip <= self.end
    }

    pub fn contains_addr(&self, addr: Ipv4Addr) -> bool {
        self.contains(u32::from(addr))
    }

    pub fn start_addr(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.start)
    }

    pub fn end_addr(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.end)
    }

    /// Number of addresses in the range.
    pub fn len(&self) -> u64 {
        u64::from(self.end) - u64::from(self.start) + 1
    }
}

impl fmt::Display for Ipv4Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start_addr(), self.end_addr())
    }
}

const fn block(a: u8, b: u8, c: u8, d: u8, prefix: u8) -> Ipv4Range {
    Ipv4Range::cidr(Ipv4Addr::new(a, b, c, d), prefix)
}

/// Address space that is not globally routable.
pub const EXCLUDED_RANGES: &[Ipv4Range] = &[
    block(0, 0, 0, 0, 8),         // "this" network
    block(10, 0, 0, 0, 8),        // private
    block(100, 64, 0, 0, 10),     // carrier-grade NAT
    block(127, 0, 0, 0, 8),       // loopback
    block(169, 254, 0, 0, 16),    // link-local
    block(172, 16, 0, 0, 12),     // private
    block(192, 0, 0, 0, 24),      // IETF protocol assignments
    block(192, 0, 2, 0, 24),      // TEST-NET-1
    block(192, 88, 99, 0, 24),    // 6to4 relay anycast
    block(192, 168, 0, 0, 16),    // private
    block(198, 18, 0, 0, 15),     // benchmarking
    block(198, 51, 100, 0, 24),   // TEST-NET-2
    block(203, 0, 113, 0, 24),    // TEST-NET-3
    block(224, 0, 0, 0, 4),       // multicast
    block(240, 0, 0, 0, 4),       // reserved, includes limited broadcast
];

/// Returns `true` when `ip` lies in one of the [`EXCLUDED_RANGES`].
pub fn is_excluded(ip: u32) -> bool {
    EXCLUDED_RANGES.iter().any(|range| range.contains(ip))
}

/// Returns `true` for addresses eligible for scanning.
pub fn is_global(addr: Ipv4Addr) -> bool {
    !addr.is_multicast() && !is_excluded(u32::from(addr))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
