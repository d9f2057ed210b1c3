//! Deterministic randomness for the synthetic fallbacks.
//!
//! Seeds come from a stable FNV-1a hash of a text key so that the same
//! `(district, year)` or date reproduces the same series across runs and
//! platforms.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Exp1, StandardNormal};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

pub fn stable_seed(key: &str) -> u64 {
    key.bytes().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

pub fn seeded_rng(key: &str) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(stable_seed(key))
}

/// Sample of N(mean, sd).
pub fn normal<R: Rng + ?Sized>(rng: &mut R, mean: f64, sd: f64) -> f64 {
    let z: f64 = rng.sample(StandardNormal);
    mean + sd * z
}

/// Sample of LogNormal(0, sigma), i.e. `exp(sigma * Z)`.
pub fn lognormal<R: Rng + ?Sized>(rng: &mut R, sigma: f64) -> f64 {
    normal(rng, 0.0, sigma).exp()
}

/// Sample of an exponential distribution with the given mean.
pub fn exponential<R: Rng + ?Sized>(rng: &mut R, mean: f64) -> f64 {
    let e: f64 = rng.sample(Exp1);
    mean * e
}

pub fn uniform<R: Rng + ?Sized>(rng: &mut R, low: f64, high: f64) -> f64 {
    rng.gen_range(low..high)
}
