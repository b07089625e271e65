//! Background and signal samples with their systematic effects.

use tl_core::{Error, Result};
use tl_hist::Histogram;

use crate::algorithms::quantiles;
use crate::systematics::SystId;
use crate::yields::YieldWithUncert;

/// Effect of one nuisance parameter on one sample, as relative changes of the
/// yield at `-1σ` (`low`) and `+1σ` (`high`).
#[derive(Debug, Clone)]
pub struct SystEffect {
    /// Nuisance-parameter name.
    pub name: String,
    /// Nuisance-parameter id in the shared registry.
    pub id: SystId,
    /// Relative effect at `-1σ`.
    pub low: f64,
    /// Relative effect at `+1σ`.
    pub high: f64,
    distribution: Option<Histogram>,
}

impl SystEffect {
    fn new(name: &str, id: SystId, low: f64, high: f64) -> Self {
        Self { name: name.to_string(), id, low, high, distribution: None }
    }

    /// Upper edge of the scale-factor histogram range.
    fn distribution_max(&self) -> f64 {
        if self.high > self.low && self.high > 0.0 {
            (1.0 + self.high) * 2.0
        } else if self.low > self.high && self.low > 0.0 {
            (1.0 + self.low) * 2.0
        } else {
            2.0
        }
    }

    pub(crate) fn distribution_template(&self, sample: &str) -> Result<Histogram> {
        let name = format!("{sample}_{}", self.name).replace(' ', "_");
        Histogram::new(name, 100, 0.0, self.distribution_max())
    }

    /// Scale factors applied by the last `generate_distr_yield` run.
    pub fn distribution(&self) -> Option<&Histogram> {
        self.distribution.as_ref()
    }
}

/// One contribution to a channel's expected yield.
#[derive(Debug, Clone)]
pub struct Sample {
    name: String,
    display_name: String,
    nominal: f64,
    stat: f64,
    effects: Vec<SystEffect>,
    total_low: f64,
    total_high: f64,
    yield_histogram: Option<Histogram>,
}

impl Sample {
    /// Create a sample. `name` is the channel-qualified name, `display_name`
    /// the bare one.
    pub fn new(
        name: impl Into<String>,
        display_name: impl Into<String>,
        nominal: f64,
        stat: f64,
    ) -> Result<Self> {
        let name = name.into();
        if !(nominal.is_finite() && nominal >= 0.0) {
            return Err(Error::Validation(format!(
                "sample '{name}' needs a finite non-negative nominal yield, got {nominal}"
            )));
        }
        if !(stat.is_finite() && stat >= 0.0) {
            return Err(Error::Validation(format!(
                "sample '{name}' needs a finite non-negative statistical uncertainty, got {stat}"
            )));
        }
        Ok(Self {
            name,
            display_name: display_name.into(),
            nominal,
            stat,
            effects: Vec::new(),
            total_low: 0.0,
            total_high: 0.0,
            yield_histogram: None,
        })
    }

    /// Channel-qualified name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bare sample name.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Set the display name.
    pub fn set_display_name(&mut self, display_name: impl Into<String>) {
        self.display_name = display_name.into();
    }

    /// Nominal yield.
    pub fn nominal(&self) -> f64 {
        self.nominal
    }

    /// Absolute statistical uncertainty.
    pub fn stat(&self) -> f64 {
        self.stat
    }

    /// Systematic effects, in insertion order.
    pub fn effects(&self) -> &[SystEffect] {
        &self.effects
    }

    /// Attach a systematic effect. Effects with `low == high == 0` are ignored.
    pub fn add_syst(&mut self, name: &str, id: SystId, low: f64, high: f64) {
        if low == 0.0 && high == 0.0 {
            return;
        }
        self.effects.push(SystEffect::new(name, id, low, high));

        if low < 0.0 && low < high {
            self.total_low = -self.total_low.hypot(low);
        } else if high < 0.0 {
            self.total_low = -self.total_low.hypot(high);
        }
        if high > 0.0 && high > low {
            self.total_high = self.total_high.hypot(high);
        } else if low > 0.0 {
            self.total_high = self.total_high.hypot(low);
        }
    }

    /// Quadrature sum of the downward relative effects (non-positive).
    pub fn total_syst_low(&self) -> f64 {
        self.total_low
    }

    /// Quadrature sum of the upward relative effects (non-negative).
    pub fn total_syst_high(&self) -> f64 {
        self.total_high
    }

    /// Nominal yield with statistical and total systematic uncertainties.
    pub fn yield_with_uncert(&self) -> YieldWithUncert {
        YieldWithUncert::with_syst(
            self.nominal,
            self.stat,
            self.total_low * self.nominal,
            self.total_high * self.nominal,
        )
    }

    /// Scale-factor histogram of the effect named `syst`.
    pub fn syst_distribution(&self, syst: &str) -> Result<&Histogram> {
        let effect = self.effects.iter().find(|e| e.name == syst).ok_or_else(|| {
            Error::Lookup(format!("unknown systematic '{syst}' in sample '{}'", self.name))
        })?;
        effect.distribution().ok_or_else(|| {
            Error::Validation(format!(
                "no distribution for '{syst}' in sample '{}', generate yields first",
                self.name
            ))
        })
    }

    /// Yield distribution of the last `generate_distr_yield` run.
    pub fn yield_histogram(&self) -> Option<&Histogram> {
        self.yield_histogram.as_ref()
    }

    /// Median and ±1σ spread of the generated yield distribution.
    pub fn generated_yield(&self) -> Option<YieldWithUncert> {
        self.yield_histogram.as_ref().map(generated_from)
    }

    pub(crate) fn yield_template(&self) -> Result<Histogram> {
        Histogram::new(format!("{}_yield", self.name), 1000, 0.0, 5.0 * self.nominal)
    }

    pub(crate) fn effect_templates(&self) -> Result<Vec<Histogram>> {
        self.effects.iter().map(|e| e.distribution_template(&self.name)).collect()
    }

    pub(crate) fn store_generated(&mut self, yields: Histogram, effects: Vec<Histogram>) {
        self.yield_histogram = Some(yields);
        for (e, h) in self.effects.iter_mut().zip(effects) {
            e.distribution = Some(h);
        }
    }

    pub(crate) fn describe(&self) {
        log::info!("-> sample '{}': yield = {}", self.name, self.yield_with_uncert());
        for e in &self.effects {
            log::info!(" -- syst '{}' ({}): {}% {}%", e.name, e.id, e.high * 100.0, e.low * 100.0);
        }
        log::info!(
            " -- total syst: {}% {}% (syst)",
            self.total_high * 100.0,
            self.total_low * 100.0
        );
    }
}

/// Median with the distance to the ±1σ quantiles as asymmetric uncertainties.
pub(crate) fn generated_from(h: &Histogram) -> YieldWithUncert {
    let q = quantiles::quantiles(h);
    YieldWithUncert::with_syst(q[2], 0.0, q[1] - q[2], q[3] - q[2])
}
