pub mod range;

pub use range::{EXCLUDED_RANGES, Ipv4Range, is_global};
