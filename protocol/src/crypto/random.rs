//! Randomness sources for nonces and key generation.
//!
//! Production code uses [`OsRandom`]. Tests and reproducible simulations use
//! [`SeededRandom`], which makes every "random" nonce a pure function of a
//! seed. Never ship a `SeededRandom` into a terminal.

use parking_lot::Mutex;
use rand::rngs::{OsRng, StdRng};
use rand::{RngCore, SeedableRng};

/// Something that can fill a buffer with random bytes.
pub trait RandomSource: Send + Sync {
    /// Fill `dest` completely.
    fn fill_bytes(&self, dest: &mut [u8]);
}

/// The operating system CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill_bytes(&self, dest: &mut [u8]) {
        OsRng.fill_bytes(dest);
    }
}

/// A deterministic generator seeded from a `u64`. Test use only.
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    /// Seed the generator.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn fill_bytes(&self, dest: &mut [u8]) {
        self.rng.lock().fill_bytes(dest);
    }
}
