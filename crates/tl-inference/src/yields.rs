//! Yields with statistical and asymmetric systematic uncertainties.

use std::fmt;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

/// A yield with absolute statistical and low/high systematic uncertainties.
///
/// Independent contributions add in quadrature. Used for bookkeeping and
/// reporting only; the toy engine never reads it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct YieldWithUncert {
    /// Central value.
    pub value: f64,
    stat: f64,
    syst_low: f64,
    syst_high: f64,
}

impl YieldWithUncert {
    /// Yield with a statistical uncertainty only.
    pub fn new(value: f64, stat: f64) -> Self {
        Self { value, stat: stat.abs(), syst_low: 0.0, syst_high: 0.0 }
    }

    /// Yield with statistical and low/high systematic uncertainties.
    pub fn with_syst(value: f64, stat: f64, syst_low: f64, syst_high: f64) -> Self {
        Self { value, stat: stat.abs(), syst_low: syst_low.abs(), syst_high: syst_high.abs() }
    }

    /// Statistical uncertainty.
    pub fn stat(&self) -> f64 {
        self.stat
    }

    /// Downward systematic uncertainty (absolute value).
    pub fn syst_low(&self) -> f64 {
        self.syst_low
    }

    /// Upward systematic uncertainty (absolute value).
    pub fn syst_high(&self) -> f64 {
        self.syst_high
    }

    /// Set the statistical uncertainty.
    pub fn set_stat(&mut self, stat: f64) {
        self.stat = stat.abs();
    }

    /// Set the downward systematic uncertainty; the sign is dropped.
    pub fn set_syst_low(&mut self, syst: f64) {
        self.syst_low = syst.abs();
    }

    /// Set the upward systematic uncertainty; the sign is dropped.
    pub fn set_syst_high(&mut self, syst: f64) {
        self.syst_high = syst.abs();
    }

    /// Scale value and every uncertainty by `factor`.
    pub fn rescale(&mut self, factor: f64) {
        self.value *= factor;
        self.stat *= factor.abs();
        self.syst_low *= factor.abs();
        self.syst_high *= factor.abs();
    }

    /// Statistical and downward systematic uncertainties in quadrature.
    pub fn total_low(&self) -> f64 {
        self.stat.hypot(self.syst_low)
    }

    /// Statistical and upward systematic uncertainties in quadrature.
    pub fn total_high(&self) -> f64 {
        self.stat.hypot(self.syst_high)
    }
}

impl AddAssign for YieldWithUncert {
    fn add_assign(&mut self, rhs: Self) {
        self.value += rhs.value;
        self.stat = self.stat.hypot(rhs.stat);
        self.syst_low = self.syst_low.hypot(rhs.syst_low);
        self.syst_high = self.syst_high.hypot(rhs.syst_high);
    }
}

impl Add for YieldWithUncert {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl std::iter::Sum for YieldWithUncert {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, y| acc + y)
    }
}

impl fmt::Display for YieldWithUncert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3} +- {:.3} (stat)", self.value, self.stat)?;
        if self.syst_low == self.syst_high {
            write!(f, " +- {:.3} (syst)", self.syst_high)
        } else {
            write!(f, " +{:.3} -{:.3} (syst)", self.syst_high, self.syst_low)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_quadrature_sum() {
        let a = YieldWithUncert::with_syst(10.0, 3.0, 1.0, 2.0);
        let b = YieldWithUncert::with_syst(5.0, 4.0, 0.0, 0.0);
        let c = a + b;
        assert_relative_eq!(c.value, 15.0);
        assert_relative_eq!(c.stat(), 5.0);
        assert_relative_eq!(c.syst_low(), 1.0);
        assert_relative_eq!(c.total_high(), (25.0f64 + 4.0).sqrt());
        let s: YieldWithUncert = [a, b].into_iter().sum();
        assert_eq!(s, c);
    }

    #[test]
    fn test_rescale_and_display() {
        let mut y = YieldWithUncert::with_syst(2.0, 0.5, -0.25, 0.25);
        y.rescale(2.0);
        assert_relative_eq!(y.value, 4.0);
        assert_relative_eq!(y.syst_low(), 0.5);
        assert_eq!(y.to_string(), "4.000 +- 1.000 (stat) +- 0.500 (syst)");
        y.set_syst_high(0.75);
        assert_eq!(y.to_string(), "4.000 +- 1.000 (stat) +0.750 -0.500 (syst)");
    }
}
