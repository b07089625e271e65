//! Probability building blocks for toylim.
//!
//! This crate hosts the randomness used by the toy engine:
//! - a seeded random source with reproducible child streams
//! - the statistical models used to draw uncertain yields
//! - normal-quantile helpers for converting p-values to significances

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod math;
pub mod random;
pub mod sampler;

pub use random::RandomSource;
pub use sampler::YieldSampler;
