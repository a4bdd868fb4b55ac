//! Shared model types for `gmf`.
//!
//! * **[`config`]**: per-run probe and pool configuration.
//! * **[`network`]**: IPv4 ranges and the globally-routable predicate.

pub mod config;
pub mod network;
