//! Statistical models for uncertain yields.

use tl_core::{Error, Result, StatStyle};

use crate::random::RandomSource;

/// Draws a varied yield from its nominal value and absolute statistical
/// uncertainty, according to one fixed [`StatStyle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct YieldSampler {
    style: StatStyle,
}

impl YieldSampler {
    /// Create a sampler for `style`.
    pub fn new(style: StatStyle) -> Self {
        Self { style }
    }

    /// Statistical model in use.
    pub fn style(&self) -> StatStyle {
        self.style
    }

    /// Draw a yield with mean `mean` and standard deviation `sigma`.
    ///
    /// Zero `sigma` returns `mean` without consuming randomness. Log-normal
    /// and gamma models fall back to the truncated normal when `mean == 0`.
    pub fn draw(&self, rng: &mut RandomSource, mean: f64, sigma: f64) -> Result<f64> {
        if !(mean.is_finite() && sigma.is_finite()) || mean < 0.0 || sigma < 0.0 {
            return Err(Error::UndefinedStatistic(format!(
                "cannot draw a yield with mean {mean} and sigma {sigma}"
            )));
        }
        if sigma == 0.0 {
            return Ok(mean);
        }
        match self.style {
            StatStyle::Normal => Ok(truncated_normal(rng, mean, sigma)),
            StatStyle::LogNormal => {
                if mean == 0.0 {
                    Ok(truncated_normal(rng, mean, sigma))
                } else {
                    rng.log_normal(mean, sigma)
                }
            }
            StatStyle::GammaHyper | StatStyle::GammaUniform | StatStyle::GammaJeffreys => {
                if mean == 0.0 {
                    return Ok(truncated_normal(rng, mean, sigma));
                }
                let shift = self.style.gamma_shape_shift().unwrap_or(0.0);
                rng.gamma(mean, sigma, shift)
            }
        }
    }

    /// Poisson-distributed event count with expectation `expected`.
    pub fn poisson(&self, rng: &mut RandomSource, expected: f64) -> Result<u64> {
        rng.poisson(expected)
    }
}

/// Gaussian resampled until non-negative. `mean >= 0` keeps the acceptance
/// rate at or above one half.
fn truncated_normal(rng: &mut RandomSource, mean: f64, sigma: f64) -> f64 {
    loop {
        let x = rng.gaus(mean, sigma);
        if x >= 0.0 {
            return x;
        }
    }
}
