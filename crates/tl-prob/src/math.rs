//! Normal-quantile helpers.

use statrs::function::erf::{erf_inv, erfc};

/// One-sided significance `Z = √2 · erf⁻¹(1 - 2p)` of a p-value.
pub fn significance_from_p_value(p: f64) -> f64 {
    std::f64::consts::SQRT_2 * erf_inv(1.0 - 2.0 * p)
}

/// Upper-tail probability of a standard normal beyond `z`.
pub fn p_value_from_significance(z: f64) -> f64 {
    0.5 * erfc(z / std::f64::consts::SQRT_2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_known_values() {
        assert_relative_eq!(significance_from_p_value(0.5), 0.0, epsilon = 1e-12);
        assert_relative_eq!(significance_from_p_value(0.158655), 1.0, epsilon = 1e-4);
        assert_relative_eq!(significance_from_p_value(2.8665e-7), 5.0, epsilon = 1e-3);
    }

    proptest! {
        #[test]
        fn prop_inverse(z in -5.0f64..5.0) {
            let p = p_value_from_significance(z);
            prop_assert!((significance_from_p_value(p) - z).abs() < 1e-6);
        }
    }
}
