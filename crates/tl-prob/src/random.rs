//! Seeded random source.
//!
//! Wraps one of the supported engines behind a single type implementing
//! [`RngCore`], so every `rand_distr` distribution can sample from it. A seed
//! of `0` asks for a fresh seed from OS entropy; the seed actually used is
//! kept so a run can be replayed.

use rand::{Rng, RngCore, SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, Gamma, LogNormal, Poisson, StandardNormal};
use rand_xoshiro::Xoshiro256PlusPlus;
use tl_core::{Error, Result, RngEngine};

#[derive(Debug, Clone)]
enum Engine {
    Std(StdRng),
    Xoshiro(Xoshiro256PlusPlus),
}

/// Pseudo-random number source shared by every draw of a run.
#[derive(Debug, Clone)]
pub struct RandomSource {
    kind: RngEngine,
    init_seed: u64,
    engine: Engine,
}

fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

impl RandomSource {
    /// Create a source. `seed == 0` draws the seed from OS entropy.
    pub fn new(kind: RngEngine, seed: u64) -> Self {
        let seed = if seed == 0 { rand::random::<u64>().max(1) } else { seed };
        Self::seeded(kind, seed)
    }

    fn seeded(kind: RngEngine, seed: u64) -> Self {
        let engine = match kind {
            RngEngine::StdRng => Engine::Std(StdRng::seed_from_u64(seed)),
            RngEngine::Xoshiro256PlusPlus => {
                Engine::Xoshiro(Xoshiro256PlusPlus::seed_from_u64(seed))
            }
        };
        Self { kind, init_seed: seed, engine }
    }

    /// Engine kind.
    pub fn engine(&self) -> RngEngine {
        self.kind
    }

    /// Seed the source was created with.
    pub fn init_seed(&self) -> u64 {
        self.init_seed
    }

    /// Independent stream `stream` of a round whose seed was drawn with
    /// [`RandomSource::next_seed`]. Same inputs, same stream.
    pub fn fork(&self, round_seed: u64, stream: u64) -> RandomSource {
        let seed = splitmix64(round_seed.wrapping_add(splitmix64(stream)));
        Self::seeded(self.kind, seed)
    }

    /// Draw a seed for a round of forked streams.
    pub fn next_seed(&mut self) -> u64 {
        self.next_u64()
    }

    /// Uniform draw in `[0, 1)`.
    pub fn uniform(&mut self) -> f64 {
        self.random::<f64>()
    }

    /// Gaussian draw.
    pub fn gaus(&mut self, mean: f64, sigma: f64) -> f64 {
        let z: f64 = self.sample(StandardNormal);
        mean + sigma * z
    }

    /// Poisson draw. Non-positive or non-finite expectations give 0.
    pub fn poisson(&mut self, expected: f64) -> Result<u64> {
        if !(expected.is_finite() && expected > 0.0) {
            return Ok(0);
        }
        let d = Poisson::new(expected).map_err(|e| {
            Error::UndefinedStatistic(format!("Poisson mean {expected} rejected: {e}"))
        })?;
        let n: f64 = d.sample(self);
        Ok(n as u64)
    }

    /// Log-normal draw with the given mean and standard deviation.
    pub fn log_normal(&mut self, mean: f64, sigma: f64) -> Result<f64> {
        let m2 = mean * mean;
        let mu = (m2 / (m2 + sigma * sigma).sqrt()).ln();
        let s = (1.0 + sigma * sigma / m2).ln().sqrt();
        let d = LogNormal::new(mu, s).map_err(|e| {
            Error::UndefinedStatistic(format!(
                "log-normal with mean {mean} and sigma {sigma} rejected: {e}"
            ))
        })?;
        Ok(d.sample(self))
    }

    /// Gamma draw with the given mean and standard deviation, the shape
    /// parameter shifted by `shift`.
    pub fn gamma(&mut self, mean: f64, sigma: f64, shift: f64) -> Result<f64> {
        let shape = mean * mean / (sigma * sigma) + shift;
        let scale = sigma * sigma / mean;
        let usable = shape > 1.0 / 3.0 && scale > 0.0;
        if !usable {
            return Err(Error::UndefinedStatistic(format!(
                "gamma shape {shape} must exceed 1/3 (mean {mean}, sigma {sigma}, shift {shift})"
            )));
        }
        let d = Gamma::new(shape, scale).map_err(|e| {
            Error::UndefinedStatistic(format!("gamma(shape={shape}, scale={scale}) rejected: {e}"))
        })?;
        Ok(d.sample(self))
    }
}

impl RngCore for RandomSource {
    fn next_u32(&mut self) -> u32 {
        match &mut self.engine {
            Engine::Std(r) => r.next_u32(),
            Engine::Xoshiro(r) => r.next_u32(),
        }
    }

    fn next_u64(&mut self) -> u64 {
        match &mut self.engine {
            Engine::Std(r) => r.next_u64(),
            Engine::Xoshiro(r) => r.next_u64(),
        }
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        match &mut self.engine {
            Engine::Std(r) => r.fill_bytes(dst),
            Engine::Xoshiro(r) => r.fill_bytes(dst),
        }
    }
}
