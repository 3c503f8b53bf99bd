//! Seeded jitter for request pacing.
//!
//! Each account gets its own stream, derived from one master seed and the
//! account index, so adding accounts never changes an existing account's
//! delays and a run can be replayed with the same seed.

use crate::config::DelayRange;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub struct Jitter {
    inner: StdRng,
}

impl Jitter {
    pub fn new(master_seed: u64, account_index: u64) -> Self {
        let derived_seed = master_seed ^ account_index.wrapping_mul(0x9e37_79b9_7f4a_7c15);
        Self {
            inner: StdRng::seed_from_u64(derived_seed),
        }
    }

    /// Whole seconds in `[min, max]`.
    pub fn secs_in(&mut self, range: DelayRange) -> u64 {
        if range.max_secs <= range.min_secs {
            return range.min_secs;
        }
        self.inner.gen_range(range.min_secs..=range.max_secs)
    }
}
