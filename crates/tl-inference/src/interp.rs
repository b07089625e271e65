//! Scale-factor interpolation/extrapolation for systematic uncertainties.
//!
//! Every function maps a nuisance-parameter draw `var` (in sigmas) and the
//! relative effect sizes at `-1σ` (`low`) and `+1σ` (`high`) to a
//! multiplicative scale factor. All of them return `1` at `var = 0`.

use tl_core::SystStyle;

/// Scale factor for `style`.
pub fn scale_factor(style: SystStyle, var: f64, low: f64, high: f64) -> f64 {
    match style {
        SystStyle::Mclimit => mclimit(var, low, high),
        SystStyle::Linear => linear(var, low, high),
        SystStyle::Exponential => exponential(var, low, high),
        SystStyle::PolyExpo => poly_expo(var, low, high),
    }
}

/// Quadratic match near zero blended into a linear tail at rate `1/(1+3|var|)`,
/// exponentiated when the bridge goes negative.
pub fn mclimit(var: f64, low: f64, high: f64) -> f64 {
    let sig = if var > 0.0 { high } else { -low };
    let quad_match = var * (high - low) / 2.0 + var * var * (high + low) / 2.0;
    let rf = 1.0 / (1.0 + 3.0 * var.abs());
    let bridge = var * sig * (1.0 - rf) + rf * quad_match;
    if bridge < 0.0 { bridge.exp() } else { bridge + 1.0 }
}

/// Piecewise linear, clamped at zero.
pub fn linear(var: f64, low: f64, high: f64) -> f64 {
    let sf = if var < 0.0 { 1.0 - var * low } else { 1.0 + var * high };
    sf.max(0.0)
}

/// `(1+high)^var` above zero, `(1+low)^(-var)` below; linear when the base
/// would not be positive.
pub fn exponential(var: f64, low: f64, high: f64) -> f64 {
    if var >= 0.0 && high > -1.0 {
        (1.0 + high).powf(var)
    } else if var < 0.0 && low > -1.0 {
        (1.0 + low).powf(-var)
    } else {
        linear(var, low, high)
    }
}

/// Degree-6 polynomial inside `|var| < 1`, matching [`exponential`] in value,
/// first and second derivative at `var = ±1`; exponential outside.
pub fn poly_expo(var: f64, low: f64, high: f64) -> f64 {
    if var <= -1.0 || var >= 1.0 {
        return exponential(var, low, high);
    }
    let pow_up = 1.0 + high;
    let pow_down = 1.0 + low;
    let (pow_up_log, pow_up_log2) = if pow_up <= 0.0 {
        (0.0, 0.0)
    } else {
        let l = pow_up * pow_up.ln();
        (l, l * pow_up.ln())
    };
    let (pow_down_log, pow_down_log2) = if pow_down <= 0.0 {
        (0.0, 0.0)
    } else {
        let l = -pow_down * pow_down.ln();
        (l, l * pow_down.ln())
    };

    let s0 = (pow_up + pow_down) / 2.0;
    let a0 = (pow_up - pow_down) / 2.0;
    let s1 = (pow_up_log + pow_down_log) / 2.0;
    let a1 = (pow_up_log - pow_down_log) / 2.0;
    let s2 = (pow_up_log2 + pow_down_log2) / 2.0;
    let a2 = (pow_up_log2 - pow_down_log2) / 2.0;

    let a = (15.0 * a0 - 7.0 * s1 + a2) / 8.0;
    let b = (-24.0 + 24.0 * s0 - 9.0 * a1 + s2) / 8.0;
    let c = (-5.0 * a0 + 5.0 * s1 - a2) / 4.0;
    let d = (12.0 - 12.0 * s0 + 7.0 * a1 - s2) / 4.0;
    let e = (3.0 * a0 - 3.0 * s1 + a2) / 8.0;
    let f = (-8.0 + 8.0 * s0 - 5.0 * a1 + s2) / 8.0;

    // Horner form of 1 + a v + b v^2 + ... + f v^6
    let v = var;
    1.0 + v * (a + v * (b + v * (c + v * (d + v * (e + v * f)))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    const STYLES: [SystStyle; 4] =
        [SystStyle::Mclimit, SystStyle::Linear, SystStyle::Exponential, SystStyle::PolyExpo];

    #[test]
    fn test_unity_at_zero() {
        for style in STYLES {
            assert_relative_eq!(scale_factor(style, 0.0, -0.2, 0.3), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_linear() {
        assert_relative_eq!(linear(1.0, -0.2, 0.3), 1.3);
        assert_relative_eq!(linear(-1.0, -0.2, 0.3), 0.8);
        assert_relative_eq!(linear(-2.0, 0.1, -0.1), 1.2);
        assert_eq!(linear(-10.0, -0.2, 0.3), 0.0);
    }

    #[test]
    fn test_exponential() {
        assert_relative_eq!(exponential(1.0, -0.2, 0.3), 1.3, epsilon = 1e-12);
        assert_relative_eq!(exponential(-1.0, -0.2, 0.3), 0.8, epsilon = 1e-12);
        assert_relative_eq!(exponential(2.0, -0.2, 0.3), 1.69, epsilon = 1e-12);
        // base not positive: linear fallback
        assert_relative_eq!(exponential(0.5, -0.2, -1.5), linear(0.5, -0.2, -1.5));
    }

    #[test]
    fn test_mclimit_reference_values() {
        // var=1, low=-0.2, high=0.3: sig=0.3, quad=0.3, rf=1/4, bridge=0.3
        assert_relative_eq!(mclimit(1.0, -0.2, 0.3), 1.3, epsilon = 1e-12);
        // var=2: quad=0.7, rf=1/7, bridge=0.6*6/7+0.1
        assert_relative_eq!(mclimit(2.0, -0.2, 0.3), 1.0 + 3.6 / 7.0 + 0.1, epsilon = 1e-12);
        // var=-1: sig=0.2, quad=-0.2, rf=0.25, bridge=-0.2 -> exp
        assert_relative_eq!(mclimit(-1.0, -0.2, 0.3), (-0.2f64).exp(), epsilon = 1e-12);
    }

    #[test]
    fn test_poly_expo_matches_exponential_at_boundaries() {
        let (low, high) = (-0.2, 0.3);
        let h = 1e-6;
        for edge in [-1.0f64, 1.0] {
            let inner = edge - edge.signum() * h;
            assert_relative_eq!(poly_expo(inner, low, high), exponential(edge, low, high), epsilon = 1e-5);
            let d_poly = (poly_expo(inner, low, high) - poly_expo(inner - edge.signum() * h, low, high))
                / (edge.signum() * h);
            let d_exp = (exponential(edge + edge.signum() * h, low, high) - exponential(edge, low, high))
                / (edge.signum() * h);
            assert_relative_eq!(d_poly, d_exp, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_poly_expo_outside_is_exponential() {
        assert_eq!(poly_expo(1.5, -0.2, 0.3), exponential(1.5, -0.2, 0.3));
        assert_eq!(poly_expo(-3.0, -0.2, 0.3), exponential(-3.0, -0.2, 0.3));
    }

    proptest! {
        #[test]
        fn prop_linear_non_negative(var in -5.0f64..5.0, low in -1.0f64..1.0, high in -1.0f64..1.0) {
            prop_assert!(linear(var, low, high) >= 0.0);
        }

        #[test]
        fn prop_exponential_positive(var in -5.0f64..5.0, low in -0.9f64..1.0, high in -0.9f64..1.0) {
            prop_assert!(exponential(var, low, high) > 0.0);
        }

        #[test]
        fn prop_mclimit_positive(var in -5.0f64..5.0, low in -1.0f64..1.0, high in -1.0f64..1.0) {
            prop_assert!(mclimit(var, low, high) > 0.0);
        }
    }
}
