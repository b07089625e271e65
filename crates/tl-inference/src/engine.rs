//! Pseudo-experiment engine: random source, nuisance parameters and yield
//! sampler shared by every channel of a run.
//!
//! Loops run either sequentially on the engine's own random stream, or on
//! rayon in fixed-size chunks. In parallel mode each chunk draws from
//! [`RandomSource::fork`] of one round seed and owns a copy of the
//! nuisance-parameter state, so results depend on the seed and the chunk
//! size but not on the number of threads. Chunk results merge in chunk order.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tl_core::{CombinationMode, Result, RngEngine, StatStyle, SystStyle};
use tl_prob::{RandomSource, YieldSampler};

use crate::sample::Sample;
use crate::systematics::SystematicSet;

/// Pseudo-experiments per parallel chunk.
pub const CHUNK_SIZE: usize = 4096;

/// Engine construction parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Scale-factor interpolation style.
    pub systematics: SystStyle,
    /// Statistical model for sample yields.
    pub statistics: StatStyle,
    /// Pseudo-random engine.
    pub rng: RngEngine,
    /// Seed, `0` for a fresh one.
    pub seed: u64,
    /// How systematics on one sample combine.
    pub combination: CombinationMode,
    /// Run pseudo-experiment loops on rayon.
    pub parallel: bool,
}

/// Results accumulated over a batch of pseudo-experiments.
pub(crate) trait Accumulator: Clone + Send + Sync {
    /// Fold a later chunk into this one.
    fn merge(&mut self, other: &Self) -> Result<()>;
}

/// Mutable state one stream of pseudo-experiments draws from.
pub struct ToyContext<'a> {
    rng: &'a mut RandomSource,
    systematics: &'a mut SystematicSet,
    sampler: YieldSampler,
    additive: bool,
}

impl ToyContext<'_> {
    /// New nuisance-parameter draws.
    pub fn variate(&mut self) {
        self.systematics.variate(self.rng);
    }

    /// Poisson count with expectation `expected`.
    pub fn poisson(&mut self, expected: f64) -> Result<u64> {
        self.sampler.poisson(self.rng, expected)
    }

    /// Varied yield of `sample` scaled by `mu`: statistical draw, then the
    /// combined systematic scale factor under the current draws.
    pub fn draw_sample(&mut self, sample: &Sample, mu: f64) -> Result<f64> {
        self.draw_sample_with(sample, mu, |_, _| {})
    }

    /// Like [`ToyContext::draw_sample`], reporting each effect's scale factor.
    pub fn draw_sample_with(
        &mut self,
        sample: &Sample,
        mu: f64,
        mut on_factor: impl FnMut(usize, f64),
    ) -> Result<f64> {
        let nominal = sample.nominal() * mu;
        let varied = if sample.stat() == 0.0 {
            nominal
        } else {
            self.sampler.draw(self.rng, nominal, sample.stat() * mu)?
        };

        let mut scale = if self.additive { 0.0 } else { 1.0 };
        for (i, e) in sample.effects().iter().enumerate() {
            let f = self.systematics.scale_factor(e.id, e.low, e.high)?;
            if self.additive {
                scale += f - 1.0;
            } else {
                scale *= f;
            }
            on_factor(i, f);
        }
        if self.additive {
            scale += 1.0;
        }
        Ok(varied * scale)
    }
}

/// Random source, nuisance parameters and sampler of one run.
#[derive(Debug, Clone)]
pub struct ToyEngine {
    rng: RandomSource,
    systematics: SystematicSet,
    sampler: YieldSampler,
    additive: bool,
    parallel: bool,
}

impl ToyEngine {
    /// Build an engine from `config`.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let rng = RandomSource::new(config.rng, config.seed);
        log::info!("random engine {:?}, initial seed {}", config.rng, rng.init_seed());
        Ok(Self {
            rng,
            systematics: SystematicSet::new(config.systematics)?,
            sampler: YieldSampler::new(config.statistics),
            additive: config.combination.is_additive(config.systematics),
            parallel: config.parallel,
        })
    }

    /// Random source.
    pub fn rng(&self) -> &RandomSource {
        &self.rng
    }

    /// Seed the random source started from.
    pub fn init_seed(&self) -> u64 {
        self.rng.init_seed()
    }

    /// Nuisance-parameter registry.
    pub fn systematics(&self) -> &SystematicSet {
        &self.systematics
    }

    /// Mutable nuisance-parameter registry.
    pub fn systematics_mut(&mut self) -> &mut SystematicSet {
        &mut self.systematics
    }

    /// Yield sampler.
    pub fn sampler(&self) -> YieldSampler {
        self.sampler
    }

    /// Whether systematics on one sample combine additively.
    pub fn additive(&self) -> bool {
        self.additive
    }

    /// Whether loops run on rayon.
    pub fn parallel(&self) -> bool {
        self.parallel
    }

    /// Switch parallel loops on or off.
    pub fn set_parallel(&mut self, parallel: bool) {
        self.parallel = parallel;
    }

    /// Context drawing from the engine's own stream.
    pub fn context(&mut self) -> ToyContext<'_> {
        ToyContext {
            rng: &mut self.rng,
            systematics: &mut self.systematics,
            sampler: self.sampler,
            additive: self.additive,
        }
    }

    /// Run `nb_exp` pseudo-experiments, each calling `body` once on a copy of
    /// `template`.
    pub(crate) fn run<A, F>(&mut self, nb_exp: usize, template: &A, body: F) -> Result<A>
    where
        A: Accumulator,
        F: Fn(&mut A, &mut ToyContext<'_>) -> Result<()> + Sync,
    {
        if !self.parallel || nb_exp <= CHUNK_SIZE {
            let mut acc = template.clone();
            let mut ctx = self.context();
            for _ in 0..nb_exp {
                body(&mut acc, &mut ctx)?;
            }
            return Ok(acc);
        }

        let round_seed = self.rng.next_seed();
        let n_chunks = nb_exp.div_ceil(CHUNK_SIZE);
        log::debug!("running {nb_exp} pseudo-experiments in {n_chunks} chunks");
        let (rng, systematics, sampler, additive) =
            (&self.rng, &self.systematics, self.sampler, self.additive);
        let chunks: Vec<(A, SystematicSet)> = (0..n_chunks)
            .into_par_iter()
            .map(|k| {
                let len = CHUNK_SIZE.min(nb_exp - k * CHUNK_SIZE);
                let mut chunk_rng = rng.fork(round_seed, k as u64);
                let mut chunk_syst = systematics.clone();
                chunk_syst.clear_pulls();
                let mut acc = template.clone();
                let mut ctx = ToyContext {
                    rng: &mut chunk_rng,
                    systematics: &mut chunk_syst,
                    sampler,
                    additive,
                };
                for _ in 0..len {
                    body(&mut acc, &mut ctx)?;
                }
                Ok((acc, chunk_syst))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut merged = template.clone();
        for (acc, syst) in &chunks {
            merged.merge(acc)?;
            self.systematics.absorb_pulls(syst)?;
        }
        Ok(merged)
    }
}
