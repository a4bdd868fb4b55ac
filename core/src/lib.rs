//! # GMF Core
//!
//! The concurrent probing engine behind `gmf`.
//!
//! Data flows one way:
//! [`generator`] → [`scanner`] workers → [`probe`] → [`report`].
//!
//! * **[`generator`]**: random globally routable addresses, and the mutex
//!   guarded cursor workers share.
//! * **[`probe`]**: the two-phase HTTP check and response classification.
//! * **[`network`]**: TCP, proxy tunnel and TLS transport for probes.
//! * **[`scanner`]**: worker pool, run signal and run controller.
//! * **[`report`]**: the boundary hits are handed to.

pub mod generator;
pub mod network;
pub mod probe;
pub mod report;
pub mod scanner;

pub use generator::{AddressGenerator, SharedCursor};
pub use probe::{Body, HttpProber, Outcome, ProbeError, Prober, Severity};
pub use report::{Hit, Reporter};
pub use scanner::{Controller, RunEnd, RunSignal, ScanStats, StatsSnapshot, WorkerPool};
