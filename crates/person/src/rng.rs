//! The per-person random stream.
//!
//! Responsibilities:
//!
//! - Derive one deterministic random stream per person from the profile
//!   seed, so repeated exports of the same person are byte-identical.
//! - Offer the draw shapes the specialisation guides need: weighted
//!   chances, fair coins, slice indexes, bounded integers and resource ids.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A seeded random stream for one person's export.
///
/// Draw order matters: guides must consume draws in a fixed sequence, so
/// every decision point draws exactly once whether or not its outcome is
/// used.
#[derive(Debug)]
pub struct PersonRng {
    inner: StdRng,
}

impl PersonRng {
    pub fn from_seed(seed: u64) -> Self {
        PersonRng {
            inner: StdRng::seed_from_u64(seed),
        }
    }

    /// True with probability `p`. Values outside `[0, 1]` are clamped, so
    /// `chance(1.0)` is always true and `chance(0.0)` always false.
    pub fn chance(&mut self, p: f64) -> bool {
        if p <= 0.0 {
            // Consume a draw anyway to keep the stream position stable.
            self.inner.gen_bool(0.5);
            return false;
        }
        if p >= 1.0 {
            self.inner.gen_bool(0.5);
            return true;
        }
        self.inner.gen_bool(p)
    }

    /// A fair coin flip.
    pub fn coin(&mut self) -> bool {
        self.inner.gen_bool(0.5)
    }

    /// An index into a slice of length `len`. `len` must be non-zero.
    pub fn index(&mut self, len: usize) -> usize {
        self.inner.gen_range(0..len)
    }

    /// An integer drawn uniformly from `lo..=hi`.
    pub fn int_inclusive(&mut self, lo: u32, hi: u32) -> u32 {
        self.inner.gen_range(lo..=hi)
    }

    /// A fresh resource id: a version 4 UUID built from this stream.
    pub fn uuid(&mut self) -> String {
        let bytes: [u8; 16] = self.inner.gen();
        uuid::Builder::from_random_bytes(bytes)
            .into_uuid()
            .to_string()
    }
}
