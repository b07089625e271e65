//! Quantiles of normalized distributions.
//!
//! The cumulative walk visits non-empty bins from the underflow to the
//! overflow. When the running sum first exceeds a target fraction, the
//! quantile is interpolated linearly between the low edges of the previous
//! non-empty bin and the current one; with no previous mass, the current low
//! edge is used directly.

use tl_core::{CLS_UNDEFINED, LimitType, QUANTILE_FRACTIONS};
use tl_hist::Histogram;

use super::cls::compute_cls;

fn walk(hist: &Histogram, fractions: &[f64]) -> Vec<Option<f64>> {
    let mut out = vec![None; fractions.len()];
    let mut q = 0;
    let (mut sum, mut sum_prev, mut var_prev) = (0.0, 0.0, 0.0);
    for b in 0..=hist.n_bins() + 1 {
        if q == fractions.len() {
            break;
        }
        let val = hist.bin_content(b);
        if val <= 0.0 {
            continue;
        }
        sum += val;
        let var = hist.bin_low_edge(b);
        while q < fractions.len() && sum > fractions[q] {
            out[q] = Some(if sum_prev == 0.0 {
                var
            } else {
                let distance = (fractions[q] - sum_prev) / (sum - sum_prev);
                var_prev + distance * (var - var_prev)
            });
            q += 1;
        }
        var_prev = var;
        sum_prev = sum;
    }
    out
}

/// Values at the cumulative fractions 0.0228, 0.1587, 0.5, 0.8413 and 0.9772.
/// Fractions never reached are reported as 0.
pub fn quantiles(hist: &Histogram) -> [f64; 5] {
    let mut out = [0.0; 5];
    for (slot, v) in out.iter_mut().zip(walk(hist, &QUANTILE_FRACTIONS)) {
        *slot = v.unwrap_or(0.0);
    }
    out
}

/// Expected CLs for `kind`: CLs evaluated at the matching quantile of the
/// background-only LLR distribution.
///
/// Returns [`CLS_UNDEFINED`] when the fraction is never reached and `0` for
/// [`LimitType::Observed`].
pub fn cls_from_llr_quantile(kind: LimitType, llr_sb: &Histogram, llr_b: &Histogram) -> f64 {
    let Some(q) = kind.quantile_index() else {
        return 0.0;
    };
    match walk(llr_b, &QUANTILE_FRACTIONS[q..=q])[0] {
        Some(llr) => compute_cls(llr_sb, llr_b, llr),
        None => CLS_UNDEFINED,
    }
}
