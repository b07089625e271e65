//! # tl-core
//!
//! Shared vocabulary for toylim: the error type, the enums selecting limit
//! types and statistical styles, small result records, and the trait the
//! signal-strength search drives.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::ClsGenerator;
pub use types::{
    CLS_UNDEFINED, CombinationMode, Exclusion, LimitType, QUANTILE_FRACTIONS, RngEngine,
    SearchMethod, SignifType, Significance, StatStyle, SystStyle,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
