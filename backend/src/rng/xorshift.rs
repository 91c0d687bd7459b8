//! xorshift64* random number generator
//!
//! Fast, deterministic PRNG with 64-bit state. Every stochastic decision in
//! the plant (grade draws, sampled generation intervals) is made here, so a
//! seed fully determines a run.
//!
//! # Determinism
//!
//! Same seed → same sequence of draws → same heats, same routes, same
//! snapshot.

use serde::{Deserialize, Serialize};

/// Deterministic random number generator using xorshift64*
///
/// # Example
/// ```
/// use steel_plant_sim_core::RngManager;
///
/// let mut rng = RngManager::new(42);
/// let u = rng.next_f64();
/// assert!((0.0..1.0).contains(&u));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RngManager {
    state: u64,
}

impl RngManager {
    /// Create a new RNG with given seed
    ///
    /// A zero seed is mapped to 1 (xorshift has no zero state).
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Next raw 64-bit draw
    pub fn next(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    /// Uniform draw in [0.0, 1.0)
    pub fn next_f64(&mut self) -> f64 {
        let value = self.next();
        (value >> 11) as f64 * (1.0 / ((1u64 << 53) as f64))
    }

    /// Uniform draw in [min, max)
    ///
    /// Returns `min` when the interval is empty.
    pub fn uniform(&mut self, min: f64, max: f64) -> f64 {
        if max <= min {
            return min;
        }
        min + (max - min) * self.next_f64()
    }

    /// Exponential draw with the given mean (inverse-CDF method)
    pub fn exponential(&mut self, mean: f64) -> f64 {
        // 1 - u lies in (0, 1], so ln never sees zero
        let u = 1.0 - self.next_f64();
        -mean * u.ln()
    }

    /// Pick an index with probability proportional to `weights`
    ///
    /// Weights are normalized internally; negative entries count as zero.
    /// Returns `None` if the slice is empty or all weights are zero.
    ///
    /// # Example
    /// ```
    /// use steel_plant_sim_core::RngManager;
    ///
    /// let mut rng = RngManager::new(7);
    /// assert_eq!(rng.weighted_index(&[0.0, 1.0, 0.0]), Some(1));
    /// assert_eq!(rng.weighted_index(&[]), None);
    /// ```
    pub fn weighted_index(&mut self, weights: &[f64]) -> Option<usize> {
        let total: f64 = weights.iter().map(|w| w.max(0.0)).sum();
        if weights.is_empty() || total <= 0.0 {
            return None;
        }

        let target = self.next_f64() * total;
        let mut cumulative = 0.0;
        let mut last_positive = None;
        for (index, weight) in weights.iter().enumerate() {
            let weight = weight.max(0.0);
            if weight == 0.0 {
                continue;
            }
            cumulative += weight;
            last_positive = Some(index);
            if target < cumulative {
                return Some(index);
            }
        }
        // Float accumulation can leave target just above the final sum
        last_positive
    }

    /// Current RNG state (a new RNG seeded with it continues the sequence)
    pub fn get_state(&self) -> u64 {
        self.state
    }
}
