//! Operations shared by single channels and combinations: confidence level,
//! significance and CLs scans over the signal strength.

use tl_core::{ClsGenerator, Error, LimitType, Result, SignifType, Significance};
use tl_hist::{Graph, Histogram};
use tl_prob::math::significance_from_p_value;

use crate::algorithms::quantiles;

/// Default confidence level.
pub const DEFAULT_CONF_LEVEL: f64 = 0.95;

/// Check that `cl` lies strictly between 0 and 1.
pub fn validate_conf_level(cl: f64) -> Result<f64> {
    if cl > 0.0 && cl < 1.0 {
        Ok(cl)
    } else {
        Err(Error::Configuration(format!("confidence level must lie in (0, 1), got {cl}")))
    }
}

/// Histograms and graphs filled by limit searches and scans.
#[derive(Debug, Clone, Default)]
pub struct LimitDiagnostics {
    /// Distribution of limits over background-only pseudo-data.
    pub expected_mu: Option<Histogram>,
    /// CLs reached at each newly computed limit.
    pub cls_at_limit: Option<Histogram>,
    /// Limit versus observed count.
    pub mu_vs_obs: Option<Graph>,
    /// Last CLs scan over the signal strength.
    pub cls_vs_mu: Option<Graph>,
}

/// A counting analysis able to regenerate its test-statistic distributions.
pub trait HypothesisTest: ClsGenerator {
    /// Confidence level of exclusions.
    fn conf_level(&self) -> f64;

    /// Set the signal strength, dropping stale distributions.
    fn set_sig_strength(&mut self, mu: f64);

    /// Regenerate the LLR distributions with `nb_exp` pseudo-experiments.
    fn generate_distr_llr(&mut self, nb_exp: usize) -> Result<()>;

    /// Background-only p-value of the observed data.
    fn p_value_data(&self) -> Result<f64>;

    /// Normalized background-only LLR distribution.
    fn llr_b(&self) -> Result<&Histogram>;

    /// Normalized signal+background LLR distribution.
    fn llr_sb(&self) -> Result<&Histogram>;

    /// Diagnostics of the last searches.
    fn diagnostics(&self) -> &LimitDiagnostics;

    /// Mutable diagnostics.
    fn diagnostics_mut(&mut self) -> &mut LimitDiagnostics;

    /// Significance of the observed data, or the expected one under the
    /// signal+background hypothesis at strength `mu` for the requested band.
    fn significance(&mut self, kind: SignifType, nb_exp: usize, mu: f64) -> Result<Significance> {
        self.set_sig_strength(mu);
        self.generate_distr_llr(nb_exp)?;
        let p_value = match kind.quantile_index() {
            None => self.p_value_data()?,
            Some(q) => {
                let llr = quantiles(self.llr_sb()?)[q];
                let llr_b = self.llr_b()?;
                llr_b.integral(0, llr_b.find_bin(llr))
            }
        };
        let z = significance_from_p_value(p_value);
        log::info!("significance ({kind:?}): p-value={p_value}, Z={z}");
        Ok(Significance { p_value, z })
    }

    /// CLs at `steps` evenly spaced signal strengths in `[mu_min, mu_max]`,
    /// kept in [`LimitDiagnostics::cls_vs_mu`]. Does nothing unless
    /// `mu_min < mu_max` and `steps >= 2`.
    fn scan_cls_vs_mu(
        &mut self,
        mu_min: f64,
        mu_max: f64,
        steps: usize,
        nb_exp: usize,
        kind: LimitType,
    ) -> Result<()> {
        self.diagnostics_mut().cls_vs_mu = None;
        let valid = mu_min < mu_max && steps >= 2;
        if !valid {
            return Ok(());
        }
        log::info!("---> interval for mu=[{mu_min},{mu_max}], {steps} steps");
        let step = (mu_max - mu_min) / (steps - 1) as f64;
        let mut graph = Graph::new("cls_vs_mu");
        for i in 0..steps {
            let mu = mu_min + i as f64 * step;
            let cls = self.generate_for_cls(mu, nb_exp, kind)?;
            log::debug!("-> scanning for mu={mu}, CLs={cls}");
            graph.push(mu, cls);
        }
        self.diagnostics_mut().cls_vs_mu = Some(graph);
        Ok(())
    }
}
