//! Registry of nuisance parameters shared by every channel of a run.
//!
//! Each parameter is identified by name and interned to a stable integer id.
//! Once per pseudo-experiment [`SystematicSet::variate`] draws a new value in
//! sigmas for every parameter; all samples referring to that id see the same
//! draw, which is what correlates systematics across samples and channels.

use std::collections::HashMap;

use tl_core::{Error, Result, SystStyle};
use tl_hist::Histogram;
use tl_prob::RandomSource;

use crate::interp;

/// Stable integer id of a registered nuisance parameter.
pub type SystId = usize;

/// Draws are resampled until they fall within `±VARIATION_LIMIT` sigmas.
pub const VARIATION_LIMIT: f64 = 5.0;

/// Named nuisance parameters, their current draws and the scale-factor style.
#[derive(Debug, Clone)]
pub struct SystematicSet {
    style: SystStyle,
    names: Vec<String>,
    ids: HashMap<String, SystId>,
    variations: Vec<f64>,
    pulls: Histogram,
}

impl SystematicSet {
    /// Create an empty registry using `style` for scale factors.
    pub fn new(style: SystStyle) -> Result<Self> {
        Ok(Self {
            style,
            names: Vec::new(),
            ids: HashMap::new(),
            variations: Vec::new(),
            pulls: Histogram::new("syst_pulls", 240, -6.0, 6.0)?,
        })
    }

    /// Scale-factor style.
    pub fn style(&self) -> SystStyle {
        self.style
    }

    /// Register `name`, or return its id if already known.
    pub fn register(&mut self, name: &str) -> SystId {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = self.names.len();
        self.names.push(name.to_string());
        self.variations.push(0.0);
        self.ids.insert(name.to_string(), id);
        id
    }

    /// Number of registered parameters.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether no parameter is registered.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Id of `name`.
    pub fn id(&self, name: &str) -> Result<SystId> {
        self.ids
            .get(name)
            .copied()
            .ok_or_else(|| Error::Lookup(format!("unknown systematic '{name}'")))
    }

    /// Name of `id`.
    pub fn name(&self, id: SystId) -> Result<&str> {
        self.names
            .get(id)
            .map(String::as_str)
            .ok_or_else(|| Error::Lookup(format!("unknown systematic id {id}")))
    }

    /// Current draw of `id`, in sigmas.
    pub fn variation(&self, id: SystId) -> Result<f64> {
        self.variations
            .get(id)
            .copied()
            .ok_or_else(|| Error::Lookup(format!("unknown systematic id {id}")))
    }

    /// Current draw of `name`, in sigmas.
    pub fn variation_by_name(&self, name: &str) -> Result<f64> {
        self.variation(self.id(name)?)
    }

    /// Force the current draw of `id`.
    pub fn set_variation(&mut self, id: SystId, var: f64) -> Result<()> {
        let slot = self
            .variations
            .get_mut(id)
            .ok_or_else(|| Error::Lookup(format!("unknown systematic id {id}")))?;
        *slot = var;
        Ok(())
    }

    /// Draw a new value for every registered parameter.
    pub fn variate(&mut self, rng: &mut RandomSource) {
        for v in &mut self.variations {
            let var = loop {
                let x = rng.gaus(0.0, 1.0);
                if (-VARIATION_LIMIT..=VARIATION_LIMIT).contains(&x) {
                    break x;
                }
            };
            *v = var;
            self.pulls.fill(var);
        }
    }

    /// Scale factor of an effect `(low, high)` under the current draw of `id`.
    pub fn scale_factor(&self, id: SystId, low: f64, high: f64) -> Result<f64> {
        let var = self.variation(id)?;
        Ok(interp::scale_factor(self.style, var, low, high))
    }

    /// Histogram of every draw made so far.
    pub fn pulls(&self) -> &Histogram {
        &self.pulls
    }

    pub(crate) fn absorb_pulls(&mut self, other: &SystematicSet) -> Result<()> {
        self.pulls.add(&other.pulls)
    }

    pub(crate) fn clear_pulls(&mut self) {
        self.pulls.reset();
    }

    /// Log every parameter with its current draw.
    pub fn describe(&self) {
        log::info!("systematics ({} registered, style {:?})", self.len(), self.style);
        for (name, var) in self.names.iter().zip(&self.variations) {
            log::info!("  '{name}': var={var:.4} sigma");
        }
    }
}
