//! A single counting channel: background samples, one signal sample and an
//! observed count.
//!
//! The test statistic is the log-likelihood ratio
//! `LLR(n) = 2 * ((S+B - B) - n * ln((S+B)/B))` with `S+B = B + mu * S`.
//! Its two terms depend only on the expected yields and are cached until the
//! yields or the signal strength change.
//!
//! Operations that consume randomness go through a [`ChannelSession`], which
//! binds the channel to the [`ToyEngine`] owning the random stream and the
//! nuisance parameters.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use tl_core::{
    ClsGenerator, Error, Exclusion, LimitType, Result, SearchMethod,
};
use tl_hist::{Graph, Histogram};

use crate::algorithms::{self, cls_from_llr_quantile, compute_cls, quantiles};
use crate::engine::{Accumulator, ToyContext, ToyEngine};
use crate::hypotest::{DEFAULT_CONF_LEVEL, HypothesisTest, LimitDiagnostics, validate_conf_level};
use crate::mu_vs_obs::MuVsObs;
use crate::sample::{self, Sample};
use crate::systematics::SystematicSet;
use crate::yields::YieldWithUncert;

/// Bins of the per-channel LLR distributions.
pub const LLR_BINS: usize = 1000;

#[derive(Debug, Clone, Copy)]
struct LlrTerms {
    log_ratio: f64,
    signal: f64,
}

/// Outcome of one pseudo-experiment in one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PseudoExperiment {
    /// Background-only count.
    pub n_b: u64,
    /// LLR of `n_b`.
    pub llr_b: f64,
    /// Signal+background count.
    pub n_sb: u64,
    /// LLR of `n_sb`.
    pub llr_sb: f64,
}

/// Count and LLR distributions under both hypotheses.
#[derive(Debug, Clone)]
pub struct ChannelHistograms {
    /// Background-only counts.
    pub distr_b: Histogram,
    /// Signal+background counts.
    pub distr_sb: Histogram,
    /// Background-only LLR.
    pub llr_b: Histogram,
    /// Signal+background LLR.
    pub llr_sb: Histogram,
}

impl ChannelHistograms {
    pub(crate) fn fill(&mut self, pe: &PseudoExperiment) {
        self.distr_b.fill(pe.n_b as f64);
        self.llr_b.fill(pe.llr_b);
        self.distr_sb.fill(pe.n_sb as f64);
        self.llr_sb.fill(pe.llr_sb);
    }

    pub(crate) fn scale(&mut self, factor: f64) {
        self.distr_b.scale(factor);
        self.distr_sb.scale(factor);
        self.llr_b.scale(factor);
        self.llr_sb.scale(factor);
    }
}

impl Accumulator for ChannelHistograms {
    fn merge(&mut self, other: &Self) -> Result<()> {
        self.distr_b.add(&other.distr_b)?;
        self.distr_sb.add(&other.distr_sb)?;
        self.llr_b.add(&other.llr_b)?;
        self.llr_sb.add(&other.llr_sb)
    }
}

#[derive(Debug, Clone)]
struct YieldHistograms {
    total: Histogram,
    samples: Vec<Histogram>,
    effects: Vec<Vec<Histogram>>,
}

impl Accumulator for YieldHistograms {
    fn merge(&mut self, other: &Self) -> Result<()> {
        self.total.add(&other.total)?;
        for (a, b) in self.samples.iter_mut().zip(&other.samples) {
            a.add(b)?;
        }
        for (a, b) in self.effects.iter_mut().zip(&other.effects) {
            for (ha, hb) in a.iter_mut().zip(b) {
                ha.add(hb)?;
            }
        }
        Ok(())
    }
}

/// One counting channel.
#[derive(Debug, Clone)]
pub struct Channel {
    name: String,
    display_name: String,
    backgrounds: Vec<Sample>,
    signal: Option<Sample>,
    yield_bkg: f64,
    sig_strength: f64,
    conf_level: f64,
    observed: u64,
    saved_observed: u64,
    llr_terms: OnceLock<LlrTerms>,
    histograms: Option<ChannelHistograms>,
    yield_bkg_histogram: Option<Histogram>,
    limits: BTreeMap<u64, f64>,
    mu_vs_obs: MuVsObs,
    diagnostics: LimitDiagnostics,
}

impl Channel {
    /// Empty channel with signal strength 1 and confidence level 0.95.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            backgrounds: Vec::new(),
            signal: None,
            yield_bkg: 0.0,
            sig_strength: 1.0,
            conf_level: DEFAULT_CONF_LEVEL,
            observed: 0,
            saved_observed: 0,
            llr_terms: OnceLock::new(),
            histograms: None,
            yield_bkg_histogram: None,
            limits: BTreeMap::new(),
            mu_vs_obs: MuVsObs::new(),
            diagnostics: LimitDiagnostics::default(),
        }
    }

    /// Channel name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Display name.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Set the display name.
    pub fn set_display_name(&mut self, display_name: impl Into<String>) {
        self.display_name = display_name.into();
    }

    /// Bind this channel to `engine` for operations needing randomness.
    pub fn session<'a>(&'a mut self, engine: &'a mut ToyEngine) -> ChannelSession<'a> {
        ChannelSession { channel: self, engine }
    }

    fn invalidate(&mut self) {
        self.llr_terms = OnceLock::new();
        self.histograms = None;
    }

    /// Add a background sample; returns its index.
    pub fn add_bkg_sample(&mut self, name: &str, nominal: f64, stat: f64) -> Result<usize> {
        let sample = Sample::new(format!("{}_{name}", self.name), name, nominal, stat)?;
        self.backgrounds.push(sample);
        self.yield_bkg += nominal;
        self.invalidate();
        Ok(self.backgrounds.len() - 1)
    }

    /// Attach a systematic to background `sample`, registering `syst` in
    /// `registry`. `up`/`down` are the relative effects at `+1σ`/`-1σ`.
    pub fn add_bkg_systematic(
        &mut self,
        registry: &mut SystematicSet,
        sample: usize,
        syst: &str,
        up: f64,
        down: f64,
    ) -> Result<()> {
        let n = self.backgrounds.len();
        let target = self.backgrounds.get_mut(sample).ok_or_else(|| {
            Error::Lookup(format!(
                "channel '{}' has no background sample {sample} ({n} defined)",
                self.name
            ))
        })?;
        let id = registry.register(syst);
        target.add_syst(syst, id, down, up);
        self.invalidate();
        Ok(())
    }

    /// Set the signal sample, replacing any previous one.
    pub fn set_sig_sample(&mut self, name: &str, nominal: f64, stat: f64) -> Result<()> {
        if self.signal.is_some() {
            log::warn!("channel '{}': replacing signal with '{name}'", self.name);
        }
        self.signal = Some(Sample::new(format!("{}_{name}", self.name), name, nominal, stat)?);
        self.invalidate();
        Ok(())
    }

    /// Attach a systematic to the signal sample.
    pub fn add_sig_systematic(
        &mut self,
        registry: &mut SystematicSet,
        syst: &str,
        up: f64,
        down: f64,
    ) -> Result<()> {
        let signal = self.signal.as_mut().ok_or_else(|| {
            Error::Lookup(format!("channel '{}' has no signal sample", self.name))
        })?;
        let id = registry.register(syst);
        signal.add_syst(syst, id, down, up);
        self.invalidate();
        Ok(())
    }

    /// Background samples.
    pub fn bkg_samples(&self) -> &[Sample] {
        &self.backgrounds
    }

    /// Mutable background sample `index`.
    pub fn bkg_sample_mut(&mut self, index: usize) -> Result<&mut Sample> {
        let name = &self.name;
        self.backgrounds
            .get_mut(index)
            .ok_or_else(|| Error::Lookup(format!("channel '{name}' has no background {index}")))
    }

    /// Signal sample, if set.
    pub fn sig_sample(&self) -> Option<&Sample> {
        self.signal.as_ref()
    }

    /// Mutable signal sample.
    pub fn sig_sample_mut(&mut self) -> Result<&mut Sample> {
        let name = &self.name;
        self.signal
            .as_mut()
            .ok_or_else(|| Error::Lookup(format!("channel '{name}' has no signal sample")))
    }

    fn bkg_by_name(&self, bkg: &str) -> Result<&Sample> {
        let full = format!("{}_{bkg}", self.name);
        self.backgrounds.iter().find(|s| s.name() == full).ok_or_else(|| {
            Error::Lookup(format!("unknown background sample '{bkg}' in channel '{}'", self.name))
        })
    }

    /// Signal strength `mu`.
    pub fn sig_strength(&self) -> f64 {
        self.sig_strength
    }

    /// Set the signal strength.
    pub fn set_sig_strength(&mut self, mu: f64) {
        self.sig_strength = mu;
        self.invalidate();
    }

    /// Expected background `B`.
    pub fn yield_bkg(&self) -> f64 {
        self.yield_bkg
    }

    /// Expected signal+background `S+B = B + mu * S`.
    pub fn yield_sb(&self) -> f64 {
        let s = self.signal.as_ref().map_or(0.0, Sample::nominal);
        self.yield_bkg + s * self.sig_strength
    }

    /// Total background with uncertainties added in quadrature.
    pub fn yield_bkg_with_uncert(&self) -> YieldWithUncert {
        self.backgrounds.iter().map(Sample::yield_with_uncert).sum()
    }

    /// Confidence level.
    pub fn conf_level(&self) -> f64 {
        self.conf_level
    }

    /// Set the confidence level; must lie in (0, 1).
    pub fn set_conf_level(&mut self, cl: f64) -> Result<()> {
        self.conf_level = validate_conf_level(cl)?;
        Ok(())
    }

    /// Observed count.
    pub fn observed(&self) -> u64 {
        self.observed
    }

    /// Set the observed count.
    pub fn set_observed(&mut self, n: u64) {
        self.observed = n;
    }

    /// Remember the observed count.
    pub fn save_observed(&mut self) {
        self.saved_observed = self.observed;
    }

    /// Restore the remembered observed count.
    pub fn restore_observed(&mut self) {
        self.observed = self.saved_observed;
    }

    /// Set the observed count to the integer part of the expected background.
    pub fn set_observed_to_bkg(&mut self) {
        self.observed = self.yield_bkg as u64;
    }

    /// Test statistic at `obs`.
    pub fn compute_llr(&self, obs: u64) -> Result<f64> {
        let (b, sb) = (self.yield_bkg, self.yield_sb());
        let valid = b > 0.0 && sb > 0.0;
        if !valid {
            return Err(Error::UndefinedStatistic(format!(
                "channel '{}': LLR needs positive yields, got B={b}, S+B={sb}",
                self.name
            )));
        }
        let t = self.llr_terms.get_or_init(|| LlrTerms { log_ratio: (sb / b).ln(), signal: sb - b });
        Ok(2.0 * (t.signal - obs as f64 * t.log_ratio))
    }

    /// Test statistic of the observed count.
    pub fn compute_llr_data(&self) -> Result<f64> {
        self.compute_llr(self.observed)
    }

    pub(crate) fn empty_histograms(&self) -> Result<(ChannelHistograms, f64, f64)> {
        let max_evt = (5.0 * self.yield_sb()) as u64 + 1;
        let llr_min = self.compute_llr(max_evt)?;
        let llr_max = 2.0 * self.compute_llr(0)?;
        let counts = |suffix: &str| {
            Histogram::new(
                format!("{}_{suffix}", self.name),
                max_evt as usize,
                -0.5,
                max_evt as f64 - 0.5,
            )
        };
        let llr = |suffix: &str| {
            Histogram::new(format!("{}_{suffix}", self.name), LLR_BINS, llr_min, llr_max)
        };
        let h = ChannelHistograms {
            distr_b: counts("DistrBg")?,
            distr_sb: counts("DistrSB")?,
            llr_b: llr("LLRb")?,
            llr_sb: llr("LLRsb")?,
        };
        Ok((h, llr_min, llr_max))
    }

    /// Drop the distributions and return the LLR range
    /// `[LLR(floor(5(S+B))+1), 2 LLR(0)]` of fresh, empty ones.
    pub fn init_distr_llr(&mut self) -> Result<(f64, f64)> {
        self.invalidate();
        let (h, llr_min, llr_max) = self.empty_histograms()?;
        self.histograms = Some(h);
        Ok((llr_min, llr_max))
    }

    pub(crate) fn set_histograms(&mut self, h: ChannelHistograms) {
        self.histograms = Some(h);
    }

    /// Distributions of the last generation.
    pub fn histograms(&self) -> Result<&ChannelHistograms> {
        self.histograms.as_ref().ok_or_else(|| {
            Error::Validation(format!(
                "no LLR distribution for channel '{}', generate distributions first",
                self.name
            ))
        })
    }

    /// Background-only yield draw and its Poisson count.
    pub(crate) fn pseudo_background(&self, ctx: &mut ToyContext<'_>) -> Result<(f64, u64)> {
        let mut expected = 0.0;
        for s in &self.backgrounds {
            expected += ctx.draw_sample(s, 1.0)?;
        }
        let n = ctx.poisson(expected)?;
        Ok((expected, n))
    }

    /// One pseudo-experiment under the current nuisance-parameter draws.
    pub fn pseudo_experiment(&self, ctx: &mut ToyContext<'_>) -> Result<PseudoExperiment> {
        let (mut expected, n_b) = self.pseudo_background(ctx)?;
        let llr_b = self.compute_llr(n_b)?;
        if let Some(sig) = &self.signal {
            expected += ctx.draw_sample(sig, self.sig_strength)?;
        }
        let n_sb = ctx.poisson(expected)?;
        let llr_sb = self.compute_llr(n_sb)?;
        Ok(PseudoExperiment { n_b, llr_b, n_sb, llr_sb })
    }

    /// Pseudo-data count under the current draws: background plus `mu` times
    /// the signal.
    pub(crate) fn pseudo_data(&self, ctx: &mut ToyContext<'_>, mu: f64) -> Result<u64> {
        let (mut expected, _) = self.pseudo_background(ctx)?;
        if mu != 0.0 {
            if let Some(sig) = &self.signal {
                expected += ctx.draw_sample(sig, mu)?;
            }
        }
        ctx.poisson(expected)
    }

    /// CLs at count `obs`.
    pub fn compute_cls(&self, obs: u64) -> Result<f64> {
        let h = self.histograms()?;
        Ok(compute_cls(&h.llr_sb, &h.llr_b, self.compute_llr(obs)?))
    }

    /// CLs of the observed count.
    pub fn compute_cls_data(&self) -> Result<f64> {
        self.compute_cls(self.observed)
    }

    /// Probability of counting at least `obs` events under background only.
    pub fn p_value(&self, obs: u64) -> Result<f64> {
        let h = &self.histograms()?.distr_b;
        Ok(h.integral(h.find_bin(obs as f64), h.n_bins() + 1))
    }

    /// Background-only p-value of the observed count.
    pub fn p_value_data(&self) -> Result<f64> {
        self.p_value(self.observed)
    }

    /// Largest observed count still excluded at the confidence level, `None`
    /// if even zero events are not excluded.
    pub fn find_obs_exclusion(&self) -> Result<Option<u64>> {
        let limit = (1.0 + 100.0 * self.yield_sb()) as u64;
        let target = 1.0 - self.conf_level;
        for obs in 0..limit {
            if self.compute_cls(obs)? > target {
                return Ok(obs.checked_sub(1));
            }
        }
        Ok(None)
    }

    /// Total background yield distribution of the last yield generation.
    pub fn yield_bkg_histogram(&self) -> Option<&Histogram> {
        self.yield_bkg_histogram.as_ref()
    }

    /// Median and ±1σ spread of the generated total background.
    pub fn generated_yield_bkg(&self) -> Option<YieldWithUncert> {
        self.yield_bkg_histogram.as_ref().map(sample::generated_from)
    }

    /// Generated yield distribution of background `bkg` (bare name).
    pub fn bkg_yield_distr(&self, bkg: &str) -> Result<&Histogram> {
        self.bkg_by_name(bkg)?.yield_histogram().ok_or_else(|| {
            Error::Validation(format!("no yield distribution for '{bkg}', generate yields first"))
        })
    }

    /// Scale factors applied by systematic `syst` to background `bkg`.
    pub fn bkg_syst_distr(&self, bkg: &str, syst: &str) -> Result<&Histogram> {
        self.bkg_by_name(bkg)?.syst_distribution(syst)
    }

    /// Scale factors applied by systematic `syst` to the signal.
    pub fn sig_syst_distr(&self, syst: &str) -> Result<&Histogram> {
        self.signal
            .as_ref()
            .ok_or_else(|| Error::Lookup(format!("channel '{}' has no signal sample", self.name)))?
            .syst_distribution(syst)
    }

    /// Limits found by the last expected-limit run, by observed count.
    pub fn limits(&self) -> &BTreeMap<u64, f64> {
        &self.limits
    }

    /// Limit-versus-count interpolation state.
    pub fn mu_vs_obs(&self) -> &MuVsObs {
        &self.mu_vs_obs
    }

    /// Diagnostics of the last searches.
    pub fn diagnostics(&self) -> &LimitDiagnostics {
        &self.diagnostics
    }

    /// Log samples and expected yields.
    pub fn describe(&self) {
        log::info!("-> channel '{}'", self.name);
        log::info!("--------- background ----------------");
        for s in &self.backgrounds {
            s.describe();
        }
        log::info!("---> total expected background = {}", self.yield_bkg);
        log::info!("----------- signal ------------------");
        if let Some(s) = &self.signal {
            s.describe();
        }
        log::info!("-> signal strength: mu = {}", self.sig_strength);
        log::info!("---> total expected background+mu*signal = {}", self.yield_sb());
        log::info!("---> observed yield in data = {}", self.observed);
    }
}

/// A [`Channel`] bound to the [`ToyEngine`] it draws from.
pub struct ChannelSession<'a> {
    channel: &'a mut Channel,
    engine: &'a mut ToyEngine,
}

impl<'a> ChannelSession<'a> {
    /// Bind `channel` to `engine`.
    pub fn new(channel: &'a mut Channel, engine: &'a mut ToyEngine) -> Self {
        Self { channel, engine }
    }

    /// The channel.
    pub fn channel(&self) -> &Channel {
        &*self.channel
    }

    /// The channel, mutably.
    pub fn channel_mut(&mut self) -> &mut Channel {
        &mut *self.channel
    }

    /// The engine.
    pub fn engine(&self) -> &ToyEngine {
        &*self.engine
    }

    /// Regenerate the four distributions with `nb_exp` pseudo-experiments,
    /// normalized to unit area. Zero pseudo-experiments leave them empty.
    pub fn generate_distr_llr(&mut self, nb_exp: usize) -> Result<()> {
        self.channel.invalidate();
        let (template, _, _) = self.channel.empty_histograms()?;
        if nb_exp == 0 {
            self.channel.set_histograms(template);
            return Ok(());
        }
        let channel = &*self.channel;
        let mut acc = self.engine.run(nb_exp, &template, |acc, ctx| {
            ctx.variate();
            let pe = channel.pseudo_experiment(ctx)?;
            acc.fill(&pe);
            Ok(())
        })?;
        acc.scale(1.0 / nb_exp as f64);
        self.channel.set_histograms(acc);
        Ok(())
    }

    /// Generate yield distributions: per sample, per systematic effect and the
    /// total background.
    pub fn generate_distr_yield(&mut self, nb_exp: usize) -> Result<()> {
        let channel = &*self.channel;
        let samples: Vec<&Sample> =
            channel.backgrounds.iter().chain(channel.signal.as_ref()).collect();
        let n_bkg = channel.backgrounds.len();
        let template = YieldHistograms {
            total: Histogram::new(
                format!("{}_YieldBg", channel.name),
                1000,
                0.0,
                5.0 * channel.yield_bkg,
            )?,
            samples: samples.iter().map(|s| s.yield_template()).collect::<Result<_>>()?,
            effects: samples.iter().map(|s| s.effect_templates()).collect::<Result<_>>()?,
        };

        let mut acc = if nb_exp == 0 {
            template
        } else {
            let mut acc = self.engine.run(nb_exp, &template, |acc, ctx| {
                ctx.variate();
                let mut expected = 0.0;
                for (i, s) in samples.iter().enumerate() {
                    let effects = &mut acc.effects[i];
                    let y = ctx.draw_sample_with(s, 1.0, |k, f| effects[k].fill(f))?;
                    acc.samples[i].fill(y);
                    if i < n_bkg {
                        expected += y;
                    }
                }
                acc.total.fill(expected);
                Ok(())
            })?;
            let norm = 1.0 / nb_exp as f64;
            acc.total.scale(norm);
            acc.samples.iter_mut().for_each(|h| h.scale(norm));
            acc
        };

        let mut effects = std::mem::take(&mut acc.effects).into_iter();
        let mut yields = std::mem::take(&mut acc.samples).into_iter();
        let channel = &mut *self.channel;
        for s in channel.backgrounds.iter_mut().chain(channel.signal.as_mut()) {
            if let (Some(y), Some(e)) = (yields.next(), effects.next()) {
                s.store_generated(y, e);
            }
        }
        channel.yield_bkg_histogram = Some(acc.total);
        Ok(())
    }

    /// New nuisance-parameter draws, then a pseudo-data count with signal
    /// strength `mu`, stored as the observed count.
    pub fn generate_pseudo_data(&mut self, mu: f64) -> Result<u64> {
        let mut ctx = self.engine.context();
        ctx.variate();
        let n = self.channel.pseudo_data(&mut ctx, mu)?;
        self.channel.observed = n;
        Ok(n)
    }

    /// Signal strength excluded at the confidence level.
    ///
    /// The search starts at `mu = 0.5` with step 3, at half the `hint` when
    /// one is given, or, for the observed limit, at the value interpolated
    /// from previously found limits (step 1.2), falling back to 1.
    pub fn sig_strength_exclusion(
        &mut self,
        kind: LimitType,
        nb_exp: usize,
        hint: Option<f64>,
        method: SearchMethod,
    ) -> Result<Exclusion> {
        let (mut mu, mut step) = (0.5, 3.0);
        if let Some(h) = hint {
            mu = h / 2.0;
        } else if kind.is_observed() {
            log::info!(
                "--------- searching mu for obs={} in channel '{}' ---------",
                self.channel.observed,
                self.channel.name
            );
            match self.channel.mu_vs_obs.interpolate(self.channel.observed) {
                Some(m) => {
                    mu = m;
                    step = 1.2;
                }
                None => mu = 1.0,
            }
        }
        let cl = self.channel.conf_level;
        algorithms::sig_strength_exclusion(self, mu, step, nb_exp, kind, cl, method)
    }

    /// Median expected limit over `nb_mu` background-only pseudo-data sets.
    ///
    /// Limits are memoized by observed count; the observed count is restored
    /// afterwards, on failure too.
    pub fn expected_sig_strength_exclusion(&mut self, nb_mu: usize, nb_exp: usize) -> Result<f64> {
        if nb_mu == 0 {
            return Err(Error::Validation("expected limits need at least one pseudo-data set".into()));
        }
        self.channel.save_observed();
        let result = self.expected_limits(nb_mu, nb_exp);
        self.channel.restore_observed();
        result
    }

    fn expected_limits(&mut self, nb_mu: usize, nb_exp: usize) -> Result<f64> {
        let target = 1.0 - self.channel.conf_level;
        self.channel.limits.clear();
        self.channel.mu_vs_obs.reset();
        self.channel.set_observed_to_bkg();
        let obs0 = self.channel.observed;
        let first =
            self.sig_strength_exclusion(LimitType::Observed, nb_exp, None, SearchMethod::Dichotomy)?;
        self.channel.limits.insert(obs0, first.mu);
        self.channel.mu_vs_obs.add(obs0, first.mu);

        let name = self.channel.name.clone();
        let mut expected_mu = Histogram::new(format!("{name}_mu"), 1000, 0.0, first.mu * 10.0)?;
        let mut cls_hist =
            Histogram::new(format!("{name}_CLs"), 1000, target * 0.8, target * 1.2)?;
        cls_hist.fill(first.cls);

        for _ in 0..nb_mu {
            let obs = {
                let mut ctx = self.engine.context();
                ctx.variate();
                self.channel.pseudo_background(&mut ctx)?.1
            };
            let mu = match self.channel.limits.get(&obs) {
                Some(&mu) => mu,
                None => {
                    self.channel.observed = obs;
                    let ex = self.sig_strength_exclusion(
                        LimitType::Observed,
                        nb_exp,
                        None,
                        SearchMethod::Dichotomy,
                    )?;
                    self.channel.limits.insert(obs, ex.mu);
                    self.channel.mu_vs_obs.add(obs, ex.mu);
                    cls_hist.fill(ex.cls);
                    ex.mu
                }
            };
            expected_mu.fill(mu);
        }
        expected_mu.scale(1.0 / nb_mu as f64);

        let points = self.channel.limits.iter().map(|(&o, &m)| (o as f64, m)).collect();
        let median = quantiles(&expected_mu)[2];
        log::info!("channel '{name}': median expected limit mu={median}");
        let diag = &mut self.channel.diagnostics;
        diag.expected_mu = Some(expected_mu);
        diag.cls_at_limit = Some(cls_hist);
        diag.mu_vs_obs = Some(Graph::from_points(format!("{name}_mu_vs_obs"), points));
        Ok(median)
    }
}

impl ClsGenerator for ChannelSession<'_> {
    fn generate_for_cls(&mut self, mu: f64, nb_exp: usize, kind: LimitType) -> Result<f64> {
        self.channel.set_sig_strength(mu);
        self.generate_distr_llr(nb_exp)?;
        if kind.is_observed() {
            return self.channel.compute_cls_data();
        }
        let h = self.channel.histograms()?;
        Ok(cls_from_llr_quantile(kind, &h.llr_sb, &h.llr_b))
    }
}

impl HypothesisTest for ChannelSession<'_> {
    fn conf_level(&self) -> f64 {
        self.channel.conf_level
    }

    fn set_sig_strength(&mut self, mu: f64) {
        self.channel.set_sig_strength(mu);
    }

    fn generate_distr_llr(&mut self, nb_exp: usize) -> Result<()> {
        ChannelSession::generate_distr_llr(self, nb_exp)
    }

    fn p_value_data(&self) -> Result<f64> {
        self.channel.p_value_data()
    }

    fn llr_b(&self) -> Result<&Histogram> {
        Ok(&self.channel.histograms()?.llr_b)
    }

    fn llr_sb(&self) -> Result<&Histogram> {
        Ok(&self.channel.histograms()?.llr_sb)
    }

    fn diagnostics(&self) -> &LimitDiagnostics {
        &self.channel.diagnostics
    }

    fn diagnostics_mut(&mut self) -> &mut LimitDiagnostics {
        &mut self.channel.diagnostics
    }
}
