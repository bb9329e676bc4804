//! Seed derivation for reproducible runs
//!
//! Each invocation has one base seed. Every debater argument derives its own
//! stream from it (two per debate pair), so results do not depend on how
//! tasks are scheduled.

use rand::Rng;

const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

/// Base seed for an invocation: the configured seed, or fresh entropy
pub fn invocation_seed(configured: Option<u64>) -> u64 {
    match configured {
        Some(seed) => seed,
        None => rand::thread_rng().gen(),
    }
}

/// Derive an independent seed for work item `stream` (splitmix64 finalizer)
pub fn derive_seed(base: u64, stream: u64) -> u64 {
    let mut z = base.wrapping_add(stream.wrapping_add(1).wrapping_mul(GOLDEN_GAMMA));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
