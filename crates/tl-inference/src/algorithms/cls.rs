//! CLs from normalized LLR distributions.

use tl_core::CLS_UNDEFINED;
use tl_hist::Histogram;

/// Background-side tail mass below which CLs is reported as undefined.
pub const CLB_MIN: f64 = 1e-5;

/// `CLs = CLsb / CLb`, both tails summed from the bin holding `llr` through
/// the overflow. Returns [`CLS_UNDEFINED`] when `CLb <= CLB_MIN`.
///
/// Both histograms must share the same binning.
pub fn compute_cls(llr_sb: &Histogram, llr_b: &Histogram, llr: f64) -> f64 {
    let first = llr_sb.find_bin(llr);
    let last = llr_sb.n_bins() + 1;
    let clsb = llr_sb.integral(first, last);
    let clb = llr_b.integral(first, last);
    if clb > CLB_MIN { clsb / clb } else { CLS_UNDEFINED }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn normalized(name: &str, xs: &[f64]) -> Histogram {
        let mut h = Histogram::new(name, 20, -10.0, 10.0).unwrap();
        for &x in xs {
            h.fill(x);
        }
        h.scale(1.0 / xs.len() as f64);
        h
    }

    #[test]
    fn test_identical_distributions_give_one() {
        let xs = [-3.0, -1.0, 0.5, 2.0, 4.0];
        let a = normalized("sb", &xs);
        let b = normalized("b", &xs);
        for llr in [-5.0, -1.0, 0.0, 3.9] {
            assert_relative_eq!(compute_cls(&a, &b, llr), 1.0);
        }
    }

    #[test]
    fn test_empty_tail_is_undefined() {
        let sb = normalized("sb", &[-3.0]);
        let b = normalized("b", &[-3.0]);
        assert_eq!(compute_cls(&sb, &b, 5.0), CLS_UNDEFINED);
        let empty = Histogram::new("e", 20, -10.0, 10.0).unwrap();
        assert_eq!(compute_cls(&empty, &empty, 0.0), CLS_UNDEFINED);
    }

    #[test]
    fn test_ratio() {
        let sb = normalized("sb", &[-5.0, -5.0, -5.0, 5.0]);
        let b = normalized("b", &[5.0, 5.0, 5.0, -5.0]);
        assert_relative_eq!(compute_cls(&sb, &b, 0.0), 0.25 / 0.75);
    }

    proptest! {
        #[test]
        fn prop_cls_non_increasing_in_llr(a in -9.0f64..9.0, d in 0.0f64..5.0) {
            let sb = normalized("sb", &[-6.0, -4.5, -2.0, -1.0, 0.5, 1.0]);
            let b = normalized("b", &[-2.0, 0.0, 1.5, 2.5, 4.0, 7.0]);
            let lo = compute_cls(&sb, &b, a);
            let hi = compute_cls(&sb, &b, a + d);
            if hi != CLS_UNDEFINED {
                prop_assert!(hi <= lo + 1e-12);
            }
        }
    }
}
