//! Seedable pseudorandom source for the step loop.
//!
//! Every draw the scheduler makes goes through [`KmcRng`], so the
//! sequence of `(dt, event)` pairs is a pure function of the seed and
//! the input records. Generators come from `rand_chacha`, seeded with
//! `SeedableRng::seed_from_u64`.

use rand::{Rng, SeedableRng};
use rand_chacha::{ChaCha12Rng, ChaCha20Rng, ChaCha8Rng};
use serde::{Deserialize, Serialize};

/// Which ChaCha variant drives the simulation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RngType {
    /// ChaCha with 8 rounds. Fastest; the default.
    #[default]
    ChaCha8,
    /// ChaCha with 12 rounds.
    ChaCha12,
    /// ChaCha with 20 rounds.
    ChaCha20,
}

#[derive(Clone, Debug)]
enum Generator {
    ChaCha8(ChaCha8Rng),
    ChaCha12(ChaCha12Rng),
    ChaCha20(ChaCha20Rng),
}

/// Seeded RNG with the draws the scheduler needs.
#[derive(Clone, Debug)]
pub struct KmcRng {
    generator: Generator,
    seed: u64,
}

impl KmcRng {
    /// Create a generator of the given type from a 64-bit seed.
    pub fn new(rng_type: RngType, seed: u64) -> Self {
        let generator = match rng_type {
            RngType::ChaCha8 => Generator::ChaCha8(ChaCha8Rng::seed_from_u64(seed)),
            RngType::ChaCha12 => Generator::ChaCha12(ChaCha12Rng::seed_from_u64(seed)),
            RngType::ChaCha20 => Generator::ChaCha20(ChaCha20Rng::seed_from_u64(seed)),
        };
        Self { generator, seed }
    }

    /// The seed this generator was created with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform draw in `[0, 1)`.
    pub fn uniform(&mut self) -> f64 {
        match &mut self.generator {
            Generator::ChaCha8(r) => r.random::<f64>(),
            Generator::ChaCha12(r) => r.random::<f64>(),
            Generator::ChaCha20(r) => r.random::<f64>(),
        }
    }

    /// Uniform draw in `(0, 1]`, safe to pass to `ln`.
    pub fn uniform_open_closed(&mut self) -> f64 {
        1.0 - self.uniform()
    }

    /// Uniform draw in `[0, upper)`.
    pub fn uniform_below(&mut self, upper: f64) -> f64 {
        // Guard against rounding up to `upper` itself.
        let u = self.uniform() * upper;
        if u >= upper {
            upper * (1.0 - f64::EPSILON)
        } else {
            u
        }
    }

    /// Exponential waiting time with the given total rate: `-ln(U) / rate`.
    pub fn exponential(&mut self, rate: f64) -> f64 {
        -self.uniform_open_closed().ln() / rate
    }
}
