//! Probabilistic display gate

use rand::prelude::*;
use rand::rngs::StdRng;

/// Decides whether a triggered survey is actually shown, given its display percentage.
pub struct DisplayGate {
    rng: StdRng,
}

impl DisplayGate {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Create a gate with a specific seed (for testing).
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Draw once from `[0, 100)` in hundredths and pass if the draw is below `percentage`.
    ///
    /// 100 and above always pass, 0 and below always fail.
    pub fn should_display(&mut self, percentage: f64) -> bool {
        if percentage >= 100.0 {
            return true;
        }
        if percentage <= 0.0 || percentage.is_nan() {
            return false;
        }

        let roll = f64::from(self.rng.gen_range(0..10_000u32)) / 100.0;
        roll < percentage
    }
}

impl Default for DisplayGate {
    fn default() -> Self {
        Self::new()
    }
}
