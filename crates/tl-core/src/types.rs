//! Common data types for toylim

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Sentinel returned by CLs and quantile queries when the value is undefined.
pub const CLS_UNDEFINED: f64 = -1.0;

/// Cumulative fractions of the expected bands, from +2σ to -2σ.
pub const QUANTILE_FRACTIONS: [f64; 5] = [0.0228, 0.1587, 0.5, 0.8413, 0.9772];

/// Kind of exclusion limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitType {
    /// Expected +2σ band edge
    ExpectedP2sig,
    /// Expected +1σ band edge
    ExpectedP1sig,
    /// Expected median
    ExpectedMed,
    /// Expected -1σ band edge
    ExpectedM1sig,
    /// Expected -2σ band edge
    ExpectedM2sig,
    /// Observed
    Observed,
}

impl LimitType {
    /// All limit types, expected bands first.
    pub const ALL: [LimitType; 6] = [
        LimitType::ExpectedP2sig,
        LimitType::ExpectedP1sig,
        LimitType::ExpectedMed,
        LimitType::ExpectedM1sig,
        LimitType::ExpectedM2sig,
        LimitType::Observed,
    ];

    /// Index into [`QUANTILE_FRACTIONS`], `None` for [`LimitType::Observed`].
    pub fn quantile_index(self) -> Option<usize> {
        match self {
            LimitType::ExpectedP2sig => Some(0),
            LimitType::ExpectedP1sig => Some(1),
            LimitType::ExpectedMed => Some(2),
            LimitType::ExpectedM1sig => Some(3),
            LimitType::ExpectedM2sig => Some(4),
            LimitType::Observed => None,
        }
    }

    /// Whether this is the observed limit.
    pub fn is_observed(self) -> bool {
        self == LimitType::Observed
    }
}

/// Kind of significance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignifType {
    /// Expected +2σ band edge
    ExpectedP2sig,
    /// Expected +1σ band edge
    ExpectedP1sig,
    /// Expected median
    ExpectedMed,
    /// Expected -1σ band edge
    ExpectedM1sig,
    /// Expected -2σ band edge
    ExpectedM2sig,
    /// Observed
    Observed,
}

impl SignifType {
    /// Index into [`QUANTILE_FRACTIONS`], `None` for [`SignifType::Observed`].
    pub fn quantile_index(self) -> Option<usize> {
        match self {
            SignifType::ExpectedP2sig => Some(0),
            SignifType::ExpectedP1sig => Some(1),
            SignifType::ExpectedMed => Some(2),
            SignifType::ExpectedM1sig => Some(3),
            SignifType::ExpectedM2sig => Some(4),
            SignifType::Observed => None,
        }
    }
}

/// Interpolation/extrapolation of systematic scale factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystStyle {
    /// Quadratic core bridged to an exponential/linear tail
    #[default]
    Mclimit,
    /// Piecewise linear, clamped at zero
    Linear,
    /// Piecewise exponential
    Exponential,
    /// Degree-6 polynomial inside |var| < 1, exponential outside
    PolyExpo,
}

/// Statistical model used to draw sample yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatStyle {
    /// Truncated normal
    #[default]
    Normal,
    /// Log-normal with matching mean and variance
    LogNormal,
    /// Gamma posterior with hyperbolic prior
    GammaHyper,
    /// Gamma posterior with uniform prior
    GammaUniform,
    /// Gamma posterior with Jeffreys prior
    GammaJeffreys,
}

impl StatStyle {
    /// Shape-parameter shift of the gamma posteriors, `None` for non-gamma styles.
    pub fn gamma_shape_shift(self) -> Option<f64> {
        match self {
            StatStyle::GammaHyper => Some(0.0),
            StatStyle::GammaUniform => Some(1.0),
            StatStyle::GammaJeffreys => Some(0.5),
            StatStyle::Normal | StatStyle::LogNormal => None,
        }
    }
}

/// Pseudo-random engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RngEngine {
    /// `rand`'s standard ChaCha-based generator
    #[default]
    StdRng,
    /// xoshiro256++
    Xoshiro256PlusPlus,
}

/// How the scale factors of several systematics on one sample are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombinationMode {
    /// `1 + Σ (f_i - 1)`
    Additive,
    /// `Π f_i`
    Multiplicative,
    /// Additive for MCLimit and Linear styles, multiplicative otherwise
    #[default]
    Automatic,
}

impl CombinationMode {
    /// Whether systematics combine additively under `style`.
    pub fn is_additive(self, style: SystStyle) -> bool {
        match self {
            CombinationMode::Additive => true,
            CombinationMode::Multiplicative => false,
            CombinationMode::Automatic => matches!(style, SystStyle::Mclimit | SystStyle::Linear),
        }
    }
}

/// Refinement used once the root of `CLs(mu) = 1 - CL` is bracketed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMethod {
    /// Iterated log-linear interpolation
    #[default]
    Dichotomy,
    /// A single log-linear extrapolation
    Extrapolation,
}

/// A signal-strength exclusion limit and the CLs value reached there.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Exclusion {
    /// Excluded signal strength
    pub mu: f64,
    /// CLs at `mu`
    pub cls: f64,
}

/// A p-value and the corresponding one-sided Gaussian significance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Significance {
    /// Background-only p-value
    pub p_value: f64,
    /// Significance in standard deviations
    pub z: f64,
}

fn unknown(kind: &str, s: &str, allowed: &str) -> Error {
    Error::Configuration(format!("unknown {kind} '{s}' (expected one of: {allowed})"))
}

fn normalize(s: &str) -> String {
    s.trim().to_ascii_lowercase().replace(['-', ' '], "_")
}

impl FromStr for SystStyle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match normalize(s).as_str() {
            "mclimit" => Ok(SystStyle::Mclimit),
            "linear" => Ok(SystStyle::Linear),
            "exponential" | "expo" => Ok(SystStyle::Exponential),
            "poly_expo" | "polyexpo" => Ok(SystStyle::PolyExpo),
            _ => Err(unknown("systematics style", s, "mclimit, linear, exponential, poly_expo")),
        }
    }
}

impl FromStr for StatStyle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match normalize(s).as_str() {
            "normal" => Ok(StatStyle::Normal),
            "log_normal" | "lognormal" => Ok(StatStyle::LogNormal),
            "gamma_hyper" => Ok(StatStyle::GammaHyper),
            "gamma_uniform" | "gamma_uni" => Ok(StatStyle::GammaUniform),
            "gamma_jeffreys" => Ok(StatStyle::GammaJeffreys),
            _ => Err(unknown(
                "statistics style",
                s,
                "normal, log_normal, gamma_hyper, gamma_uniform, gamma_jeffreys",
            )),
        }
    }
}

impl FromStr for RngEngine {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match normalize(s).as_str() {
            "std_rng" | "stdrng" | "std" => Ok(RngEngine::StdRng),
            "xoshiro256_plus_plus" | "xoshiro256plusplus" | "xoshiro" => {
                Ok(RngEngine::Xoshiro256PlusPlus)
            }
            _ => Err(unknown("random engine", s, "std_rng, xoshiro256_plus_plus")),
        }
    }
}

impl FromStr for CombinationMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match normalize(s).as_str() {
            "additive" => Ok(CombinationMode::Additive),
            "multiplicative" => Ok(CombinationMode::Multiplicative),
            "automatic" | "auto" => Ok(CombinationMode::Automatic),
            _ => Err(unknown("combination mode", s, "additive, multiplicative, automatic")),
        }
    }
}

impl FromStr for SearchMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match normalize(s).as_str() {
            "dichotomy" => Ok(SearchMethod::Dichotomy),
            "extrapolation" | "extrapol" => Ok(SearchMethod::Extrapolation),
            _ => Err(unknown("search method", s, "dichotomy, extrapolation")),
        }
    }
}

impl FromStr for LimitType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match normalize(s).as_str() {
            "expected_p2sig" => Ok(LimitType::ExpectedP2sig),
            "expected_p1sig" => Ok(LimitType::ExpectedP1sig),
            "expected_med" | "expected" => Ok(LimitType::ExpectedMed),
            "expected_m1sig" => Ok(LimitType::ExpectedM1sig),
            "expected_m2sig" => Ok(LimitType::ExpectedM2sig),
            "observed" => Ok(LimitType::Observed),
            _ => Err(unknown(
                "limit type",
                s,
                "expected_p2sig, expected_p1sig, expected_med, expected_m1sig, expected_m2sig, observed",
            )),
        }
    }
}

impl fmt::Display for LimitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LimitType::ExpectedP2sig => "expected +2 sigma",
            LimitType::ExpectedP1sig => "expected +1 sigma",
            LimitType::ExpectedMed => "expected median",
            LimitType::ExpectedM1sig => "expected -1 sigma",
            LimitType::ExpectedM2sig => "expected -2 sigma",
            LimitType::Observed => "observed",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantile_indices() {
        assert_eq!(LimitType::ExpectedP2sig.quantile_index(), Some(0));
        assert_eq!(LimitType::ExpectedMed.quantile_index(), Some(2));
        assert_eq!(LimitType::Observed.quantile_index(), None);
        assert_eq!(SignifType::ExpectedM2sig.quantile_index(), Some(4));
        assert_eq!(QUANTILE_FRACTIONS[2], 0.5);
    }

    #[test]
    fn test_automatic_combination() {
        let auto = CombinationMode::Automatic;
        assert!(auto.is_additive(SystStyle::Mclimit));
        assert!(auto.is_additive(SystStyle::Linear));
        assert!(!auto.is_additive(SystStyle::Exponential));
        assert!(!auto.is_additive(SystStyle::PolyExpo));
        assert!(CombinationMode::Additive.is_additive(SystStyle::PolyExpo));
        assert!(!CombinationMode::Multiplicative.is_additive(SystStyle::Linear));
    }

    #[test]
    fn test_from_str() {
        assert_eq!("PolyExpo".parse::<SystStyle>().unwrap(), SystStyle::PolyExpo);
        assert_eq!("gamma-jeffreys".parse::<StatStyle>().unwrap(), StatStyle::GammaJeffreys);
        assert_eq!("xoshiro".parse::<RngEngine>().unwrap(), RngEngine::Xoshiro256PlusPlus);
        assert_eq!("observed".parse::<LimitType>().unwrap(), LimitType::Observed);
        assert!(matches!("cubic".parse::<SystStyle>(), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_serde_names() {
        let s = serde_json::to_string(&StatStyle::GammaUniform).unwrap();
        assert_eq!(s, "\"gamma_uniform\"");
        let m: SearchMethod = serde_json::from_str("\"extrapolation\"").unwrap();
        assert_eq!(m, SearchMethod::Extrapolation);
    }

    #[test]
    fn test_gamma_shift() {
        assert_eq!(StatStyle::GammaHyper.gamma_shape_shift(), Some(0.0));
        assert_eq!(StatStyle::GammaUniform.gamma_shape_shift(), Some(1.0));
        assert_eq!(StatStyle::GammaJeffreys.gamma_shape_shift(), Some(0.5));
        assert_eq!(StatStyle::Normal.gamma_shape_shift(), None);
    }
}
