//! Seed derivation from arrival time and sender address.
//!
//! The base value is the nanosecond-of-second of the arrival timestamp; every
//! digit token of the peer address is subtracted from it in order. This is a
//! cheap decorrelation step for near-simultaneous packets, not an RNG: the
//! base resets every second and no mixing is applied.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::digits::extract_digits;

/// A derived seed value. Duplicates are possible and carry no meaning.
pub type Seed = i64;

/// Nanoseconds within the current second of `time` (0..=999_999_999).
///
/// Times before the Unix epoch yield 0.
pub fn subsec_nanos(time: SystemTime) -> u32 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or_default()
}

/// Fold the digit tokens of `peer` into `base` by successive subtraction.
pub fn seed_from_base(base: u32, peer: &str) -> Seed {
    extract_digits(peer)
        .into_iter()
        .fold(Seed::from(base), |acc, n| acc.wrapping_sub(n))
}

/// Derive the seed for a message that arrived at `arrival` from `peer`.
pub fn derive_seed(arrival: SystemTime, peer: &str) -> Seed {
    seed_from_base(subsec_nanos(arrival), peer)
}
