//! # tl-inference
//!
//! Monte-Carlo CLs inference for counting experiments.
//!
//! This crate provides:
//! - nuisance-parameter sampling and scale-factor interpolation
//! - per-channel and combined LLR distributions from pseudo-experiments
//! - CLs, p-values and significances read off those distributions
//! - the signal-strength search for observed and expected exclusion limits,
//!   with memoization of limits by observed counts
//!
//! ## Architecture
//!
//! A [`ToyEngine`] owns the random source and the nuisance parameters. A
//! [`Combination`] owns one engine and its channels; a single [`Channel`]
//! borrows an engine through a [`ChannelSession`]. The search in
//! [`algorithms::search`] only sees the [`tl_core::ClsGenerator`] trait.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// CLs, quantiles and the signal-strength search.
pub mod algorithms;
/// Single counting channel.
pub mod channel;
/// Multi-channel combination with limit memoization.
pub mod combination;
/// JSON analysis description.
pub mod config;
/// Pseudo-experiment engine.
pub mod engine;
/// Significance and CLs scans shared by channels and combinations.
pub mod hypotest;
/// Scale-factor interpolation styles.
pub mod interp;
/// Limit interpolation versus observed count.
pub mod mu_vs_obs;
/// Observed-count tuples.
pub mod observed;
/// Background and signal samples.
pub mod sample;
/// Nuisance-parameter registry.
pub mod systematics;
/// Yields with uncertainties.
pub mod yields;

pub use channel::{Channel, ChannelHistograms, ChannelSession, PseudoExperiment};
pub use combination::{Combination, CombinedLlr};
pub use config::{AnalysisConfig, ChannelConfig, CombinationConfig, SampleConfig, SystematicConfig};
pub use engine::{EngineConfig, ToyContext, ToyEngine};
pub use hypotest::{HypothesisTest, LimitDiagnostics};
pub use mu_vs_obs::MuVsObs;
pub use observed::Observed;
pub use sample::{Sample, SystEffect};
pub use systematics::{SystId, SystematicSet};
pub use yields::YieldWithUncert;

pub use tl_core::{Error, Result};
