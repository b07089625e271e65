//! # tl-hist
//!
//! Minimal binned containers used by the toy engine: a fixed-range uniform
//! histogram with underflow/overflow slots, and an ordered list of points.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod graph;
pub mod histogram;

pub use graph::Graph;
pub use histogram::Histogram;
