//! Histogram-level statistics and the signal-strength search.

pub mod cls;
pub mod quantiles;
pub mod search;

pub use cls::compute_cls;
pub use quantiles::{cls_from_llr_quantile, quantiles};
pub use search::sig_strength_exclusion;
