//! Deterministic per-level random streams.
//!
//! Every random draw in a migration comes from its own stream keyed by the
//! run seed, a domain tag and the level number, so re-running a migration
//! with the same seed over any sub-range reproduces the same values.

use hmac::{Hmac, Mac};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use sha2::Sha256;

/// Domain tag for random scaling.
pub const DOMAIN_RESCALE: &[u8] = b"rescale";
/// Domain tag for the easier/harder direction decision.
pub const DOMAIN_DIRECTION: &[u8] = b"direction";
/// Domain tag for weighted target redistribution.
pub const DOMAIN_REDISTRIBUTE: &[u8] = b"redistribute";
/// Domain tag for reference-copy perturbation.
pub const DOMAIN_REFERENCE: &[u8] = b"reference";
/// Domain tag for the curve generator.
pub const DOMAIN_CURVE: &[u8] = b"curve";

/// Derive the stream seed for `(domain_tag, level)` under `run_seed`.
#[must_use]
pub fn derive_level_seed(run_seed: u64, domain_tag: &[u8], level: u32) -> u64 {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(&run_seed.to_le_bytes()).expect("64-bit seed is valid key");
    mac.update(domain_tag);
    mac.update(b":");
    mac.update(&level.to_le_bytes());
    let digest = mac.finalize().into_bytes();
    digest
        .iter()
        .take(8)
        .enumerate()
        .fold(0_u64, |acc, (idx, byte)| acc | (u64::from(*byte) << (idx * 8)))
}

/// Random stream for one level and purpose.
#[must_use]
pub fn level_rng(run_seed: u64, domain_tag: &[u8], level: u32) -> ChaCha20Rng {
    ChaCha20Rng::seed_from_u64(derive_level_seed(run_seed, domain_tag, level))
}
