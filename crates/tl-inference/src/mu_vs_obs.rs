//! Linear interpolation of limits versus observed count.

/// Limits found at the smallest and largest observed counts seen so far.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MuVsObs {
    min: Option<(u64, f64)>,
    max: Option<(u64, f64)>,
}

impl MuVsObs {
    /// Empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the limit `mu` found at `obs`; only new extremes are kept.
    pub fn add(&mut self, obs: u64, mu: f64) {
        match (self.min, self.max) {
            (Some((lo, _)), Some((hi, _))) => {
                if obs < lo {
                    self.min = Some((obs, mu));
                } else if obs > hi {
                    self.max = Some((obs, mu));
                }
            }
            _ => {
                self.min = Some((obs, mu));
                self.max = Some((obs, mu));
            }
        }
    }

    /// Forget everything.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Linear interpolation (or extrapolation) at `obs`, floored at 0.001.
    /// `None` until two distinct counts have been recorded.
    pub fn interpolate(&self, obs: u64) -> Option<f64> {
        let ((o_min, mu_min), (o_max, mu_max)) = (self.min?, self.max?);
        if o_min == o_max {
            return None;
        }
        let distance = (obs as f64 - o_min as f64) / (o_max as f64 - o_min as f64);
        let mu = mu_min + distance * (mu_max - mu_min);
        Some(if mu < 0.0 { 0.001 } else { mu })
    }
}
