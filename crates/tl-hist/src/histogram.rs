//! Uniform-bin histogram with under/overflow.
//!
//! Bin numbering follows the usual convention: bin `0` is the underflow,
//! bins `1..=n_bins` cover `[x_min, x_max)`, bin `n_bins + 1` is the overflow.

use serde::{Deserialize, Serialize};
use tl_core::{Error, Result};

/// A 1D histogram with `n_bins` equal-width bins plus flow slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    /// Histogram name.
    pub name: String,
    n_bins: usize,
    x_min: f64,
    x_max: f64,
    /// Contents, length `n_bins + 2` (flows included).
    content: Vec<f64>,
    entries: u64,
}

impl Histogram {
    /// Create an empty histogram.
    ///
    /// A degenerate range (`x_max <= x_min`) is widened by one unit around
    /// `x_min`, so distributions collapsing to a point still bin correctly.
    pub fn new(name: impl Into<String>, n_bins: usize, x_min: f64, x_max: f64) -> Result<Self> {
        let name = name.into();
        if n_bins == 0 {
            return Err(Error::Validation(format!("histogram '{name}' needs at least one bin")));
        }
        if !(x_min.is_finite() && x_max.is_finite()) {
            return Err(Error::Validation(format!(
                "histogram '{name}' requires a finite range, got [{x_min}, {x_max}]"
            )));
        }
        let (x_min, x_max) = if x_max > x_min { (x_min, x_max) } else { (x_min - 0.5, x_min + 0.5) };
        Ok(Self { name, n_bins, x_min, x_max, content: vec![0.0; n_bins + 2], entries: 0 })
    }

    /// Number of regular bins.
    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    /// Lower edge of the first regular bin.
    pub fn x_min(&self) -> f64 {
        self.x_min
    }

    /// Upper edge of the last regular bin.
    pub fn x_max(&self) -> f64 {
        self.x_max
    }

    /// Width of every regular bin.
    pub fn bin_width(&self) -> f64 {
        (self.x_max - self.x_min) / self.n_bins as f64
    }

    /// Number of `fill` calls since creation or the last reset.
    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Bin index holding `x`. NaN goes to the underflow.
    pub fn find_bin(&self, x: f64) -> usize {
        if x.is_nan() || x < self.x_min {
            return 0;
        }
        if x >= self.x_max {
            return self.n_bins + 1;
        }
        let b = ((x - self.x_min) / self.bin_width()).floor() as usize;
        (b + 1).min(self.n_bins)
    }

    /// Add one entry at `x`.
    pub fn fill(&mut self, x: f64) {
        self.fill_weighted(x, 1.0);
    }

    /// Add `w` at `x`.
    pub fn fill_weighted(&mut self, x: f64, w: f64) {
        let b = self.find_bin(x);
        self.content[b] += w;
        self.entries += 1;
    }

    /// Content of bin `b` (0 for out-of-range indices).
    pub fn bin_content(&self, b: usize) -> f64 {
        self.content.get(b).copied().unwrap_or(0.0)
    }

    /// Contents including flow slots.
    pub fn contents(&self) -> &[f64] {
        &self.content
    }

    /// Lower edge of bin `b`; extends linearly for the flow slots.
    pub fn bin_low_edge(&self, b: usize) -> f64 {
        self.x_min + (b as f64 - 1.0) * self.bin_width()
    }

    /// Center of bin `b`.
    pub fn bin_center(&self, b: usize) -> f64 {
        self.bin_low_edge(b) + 0.5 * self.bin_width()
    }

    /// Sum of contents of bins `first..=last`, both clamped to the flow slots.
    pub fn integral(&self, first: usize, last: usize) -> f64 {
        let last = last.min(self.n_bins + 1);
        if first > last {
            return 0.0;
        }
        self.content[first..=last].iter().sum()
    }

    /// Sum of all contents, flows included.
    pub fn total(&self) -> f64 {
        self.content.iter().sum()
    }

    /// Multiply every content by `factor`.
    pub fn scale(&mut self, factor: f64) {
        for c in &mut self.content {
            *c *= factor;
        }
    }

    /// Clear contents and entries.
    pub fn reset(&mut self) {
        self.content.iter_mut().for_each(|c| *c = 0.0);
        self.entries = 0;
    }

    /// Add another histogram with identical binning.
    pub fn add(&mut self, other: &Histogram) -> Result<()> {
        if self.n_bins != other.n_bins || self.x_min != other.x_min || self.x_max != other.x_max {
            return Err(Error::Validation(format!(
                "cannot add histogram '{}' ({} bins on [{}, {}]) to '{}' ({} bins on [{}, {}])",
                other.name,
                other.n_bins,
                other.x_min,
                other.x_max,
                self.name,
                self.n_bins,
                self.x_min,
                self.x_max
            )));
        }
        for (a, b) in self.content.iter_mut().zip(&other.content) {
            *a += b;
        }
        self.entries += other.entries;
        Ok(())
    }

    /// Content-weighted mean of the regular bins' centers.
    pub fn mean(&self) -> f64 {
        let mut sw = 0.0;
        let mut swx = 0.0;
        for b in 1..=self.n_bins {
            let w = self.content[b];
            sw += w;
            swx += w * self.bin_center(b);
        }
        if sw > 0.0 { swx / sw } else { 0.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_find_bin_and_flows() {
        let h = Histogram::new("h", 10, 0.0, 10.0).unwrap();
        assert_eq!(h.find_bin(-0.1), 0);
        assert_eq!(h.find_bin(0.0), 1);
        assert_eq!(h.find_bin(9.999), 10);
        assert_eq!(h.find_bin(10.0), 11);
        assert_eq!(h.find_bin(f64::NAN), 0);
        assert_eq!(h.find_bin(f64::INFINITY), 11);
    }

    #[test]
    fn test_low_edge() {
        let h = Histogram::new("h", 4, -2.0, 2.0).unwrap();
        assert_relative_eq!(h.bin_low_edge(1), -2.0);
        assert_relative_eq!(h.bin_low_edge(4), 1.0);
        assert_relative_eq!(h.bin_low_edge(5), 2.0);
        assert_relative_eq!(h.bin_center(2), -0.5);
    }

    #[test]
    fn test_integral_scale() {
        let mut h = Histogram::new("h", 5, 0.0, 5.0).unwrap();
        for x in [-1.0, 0.5, 1.5, 1.5, 4.5, 7.0] {
            h.fill(x);
        }
        assert_eq!(h.entries(), 6);
        assert_relative_eq!(h.integral(0, 6), 6.0);
        assert_relative_eq!(h.integral(2, 100), 4.0);
        assert_relative_eq!(h.integral(3, 2), 0.0);
        h.scale(0.5);
        assert_relative_eq!(h.total(), 3.0);
        assert_relative_eq!(h.bin_content(2), 1.0);
        h.reset();
        assert_eq!(h.total(), 0.0);
        assert_eq!(h.entries(), 0);
    }

    #[test]
    fn test_degenerate_range_widened() {
        let mut h = Histogram::new("h", 10, 3.0, 3.0).unwrap();
        assert!(h.x_max() > h.x_min());
        h.fill(3.0);
        let b = h.find_bin(3.0);
        assert!(b >= 1 && b <= 10);
        assert_eq!(h.bin_content(b), 1.0);
    }

    #[test]
    fn test_invalid_definitions() {
        assert!(Histogram::new("h", 0, 0.0, 1.0).is_err());
        assert!(Histogram::new("h", 3, f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_add_requires_same_binning() {
        let mut a = Histogram::new("a", 3, 0.0, 3.0).unwrap();
        let mut b = Histogram::new("b", 3, 0.0, 3.0).unwrap();
        a.fill(0.5);
        b.fill(2.5);
        a.add(&b).unwrap();
        assert_eq!(a.bin_content(1), 1.0);
        assert_eq!(a.bin_content(3), 1.0);
        let c = Histogram::new("c", 4, 0.0, 3.0).unwrap();
        assert!(matches!(a.add(&c), Err(Error::Validation(_))));
    }

    #[test]
    fn test_mean() {
        let mut h = Histogram::new("h", 10, 0.0, 10.0).unwrap();
        h.fill(2.5);
        h.fill(4.5);
        assert_relative_eq!(h.mean(), 3.5);
    }

    proptest! {
        #[test]
        fn prop_fill_lands_in_its_bin(x in -20.0f64..20.0) {
            let mut h = Histogram::new("p", 40, -10.0, 10.0).unwrap();
            h.fill(x);
            let b = h.find_bin(x);
            prop_assert_eq!(h.bin_content(b), 1.0);
            if (1..=40).contains(&b) {
                prop_assert!(h.bin_low_edge(b) <= x + 1e-12);
                prop_assert!(x < h.bin_low_edge(b + 1) + 1e-12);
            }
        }
    }
}
