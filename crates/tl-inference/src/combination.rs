//! Combination of counting channels sharing one [`ToyEngine`].
//!
//! Every pseudo-experiment draws the nuisance parameters once and sums the
//! per-channel LLR values under both hypotheses. Limits found for an observed
//! tuple of counts are memoized; each channel keeps a partition of
//! [`MuVsObs`] trackers keyed by the counts of all the other channels, used to
//! seed the search for the next tuple.

use std::collections::BTreeMap;

use tl_core::{ClsGenerator, Error, Exclusion, LimitType, Result, SearchMethod};
use tl_hist::{Graph, Histogram};

use crate::algorithms::{self, cls_from_llr_quantile, compute_cls, quantiles};
use crate::channel::{Channel, ChannelHistograms, ChannelSession};
use crate::engine::{Accumulator, EngineConfig, ToyEngine};
use crate::hypotest::{DEFAULT_CONF_LEVEL, HypothesisTest, LimitDiagnostics, validate_conf_level};
use crate::mu_vs_obs::MuVsObs;
use crate::observed::Observed;

/// Bins of the combined LLR distributions.
pub const COMBINED_LLR_BINS: usize = 10000;

/// Pseudo-experiments between two progress messages of the expected-limit loop.
const PROGRESS_EVERY: usize = 10000;

/// Running averages below this fall back to a seed of 1.
const MIN_AVERAGE_LIMIT: f64 = 1e-5;

/// Combined LLR distributions.
#[derive(Debug, Clone)]
pub struct CombinedLlr {
    /// Background-only summed LLR.
    pub llr_b: Histogram,
    /// Signal+background summed LLR.
    pub llr_sb: Histogram,
}

#[derive(Debug, Clone)]
struct CombinedHistograms {
    combined: CombinedLlr,
    channels: Vec<ChannelHistograms>,
}

impl Accumulator for CombinedHistograms {
    fn merge(&mut self, other: &Self) -> Result<()> {
        self.combined.llr_b.add(&other.combined.llr_b)?;
        self.combined.llr_sb.add(&other.combined.llr_sb)?;
        for (a, b) in self.channels.iter_mut().zip(&other.channels) {
            a.merge(b)?;
        }
        Ok(())
    }
}

/// Channels combined into one test statistic.
#[derive(Debug, Clone)]
pub struct Combination {
    engine: ToyEngine,
    channels: Vec<Channel>,
    conf_level: f64,
    sig_strength: f64,
    llr: Option<CombinedLlr>,
    limits: BTreeMap<Observed, f64>,
    partitions: Vec<BTreeMap<Observed, MuVsObs>>,
    sum_mu: f64,
    nb_mu: usize,
    diagnostics: LimitDiagnostics,
}

impl Combination {
    /// Empty combination on a fresh engine.
    pub fn new(config: EngineConfig) -> Result<Self> {
        Ok(Self::with_engine(ToyEngine::new(config)?))
    }

    /// Empty combination on `engine`.
    pub fn with_engine(engine: ToyEngine) -> Self {
        Self {
            engine,
            channels: Vec::new(),
            conf_level: DEFAULT_CONF_LEVEL,
            sig_strength: 1.0,
            llr: None,
            limits: BTreeMap::new(),
            partitions: Vec::new(),
            sum_mu: 0.0,
            nb_mu: 0,
            diagnostics: LimitDiagnostics::default(),
        }
    }

    /// The engine.
    pub fn engine(&self) -> &ToyEngine {
        &self.engine
    }

    /// The engine, mutably.
    pub fn engine_mut(&mut self) -> &mut ToyEngine {
        self.llr = None;
        &mut self.engine
    }

    /// Add an empty channel; returns its index.
    pub fn add_channel(&mut self, name: &str) -> Result<usize> {
        if self.channels.iter().any(|c| c.name() == name) {
            return Err(Error::Validation(format!("channel '{name}' already defined")));
        }
        let mut channel = Channel::new(name);
        channel.set_conf_level(self.conf_level)?;
        channel.set_sig_strength(self.sig_strength);
        self.channels.push(channel);
        self.partitions.push(BTreeMap::new());
        self.llr = None;
        Ok(self.channels.len() - 1)
    }

    /// Channels in insertion order.
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Number of channels.
    pub fn n_channels(&self) -> usize {
        self.channels.len()
    }

    /// Channel `index`.
    pub fn channel(&self, index: usize) -> Result<&Channel> {
        self.channels.get(index).ok_or_else(|| self.unknown_channel(index))
    }

    /// Index of the channel named `name`.
    pub fn channel_index(&self, name: &str) -> Result<usize> {
        self.channels
            .iter()
            .position(|c| c.name() == name)
            .ok_or_else(|| Error::Lookup(format!("unknown channel '{name}'")))
    }

    /// Channel named `name`.
    pub fn channel_by_name(&self, name: &str) -> Result<&Channel> {
        self.channel(self.channel_index(name)?)
    }

    /// Channel `index`, mutably. Drops the combined distributions.
    pub fn channel_mut(&mut self, index: usize) -> Result<&mut Channel> {
        let n = self.channels.len();
        self.llr = None;
        self.channels
            .get_mut(index)
            .ok_or_else(|| Error::Lookup(format!("no channel {index} ({n} defined)")))
    }

    fn unknown_channel(&self, index: usize) -> Error {
        Error::Lookup(format!("no channel {index} ({} defined)", self.channels.len()))
    }

    /// Channel `index` bound to the shared engine, for per-channel limits.
    pub fn channel_session(&mut self, index: usize) -> Result<ChannelSession<'_>> {
        let n = self.channels.len();
        self.llr = None;
        let channel = self
            .channels
            .get_mut(index)
            .ok_or_else(|| Error::Lookup(format!("no channel {index} ({n} defined)")))?;
        Ok(ChannelSession::new(channel, &mut self.engine))
    }

    /// Add a background sample to `channel`; returns the sample index.
    pub fn add_bkg_sample(
        &mut self,
        channel: usize,
        name: &str,
        nominal: f64,
        stat: f64,
    ) -> Result<usize> {
        self.channel_mut(channel)?.add_bkg_sample(name, nominal, stat)
    }

    /// Attach systematic `syst` to background `sample` of `channel`.
    pub fn add_bkg_systematic(
        &mut self,
        channel: usize,
        sample: usize,
        syst: &str,
        up: f64,
        down: f64,
    ) -> Result<()> {
        let n = self.channels.len();
        self.llr = None;
        let ch = self
            .channels
            .get_mut(channel)
            .ok_or_else(|| Error::Lookup(format!("no channel {channel} ({n} defined)")))?;
        ch.add_bkg_systematic(self.engine.systematics_mut(), sample, syst, up, down)
    }

    /// Set the signal sample of `channel`.
    pub fn set_sig_sample(&mut self, channel: usize, name: &str, nominal: f64, stat: f64) -> Result<()> {
        self.channel_mut(channel)?.set_sig_sample(name, nominal, stat)
    }

    /// Attach systematic `syst` to the signal of `channel`.
    pub fn add_sig_systematic(&mut self, channel: usize, syst: &str, up: f64, down: f64) -> Result<()> {
        let n = self.channels.len();
        self.llr = None;
        let ch = self
            .channels
            .get_mut(channel)
            .ok_or_else(|| Error::Lookup(format!("no channel {channel} ({n} defined)")))?;
        ch.add_sig_systematic(self.engine.systematics_mut(), syst, up, down)
    }

    /// Set the observed count of `channel`.
    pub fn set_observed(&mut self, channel: usize, n: u64) -> Result<()> {
        let n_ch = self.channels.len();
        self.channels
            .get_mut(channel)
            .ok_or_else(|| Error::Lookup(format!("no channel {channel} ({n_ch} defined)")))?
            .set_observed(n);
        Ok(())
    }

    /// Observed counts of every channel.
    pub fn observed(&self) -> Observed {
        Observed::new(self.channels.iter().map(Channel::observed))
    }

    fn apply_observed(&mut self, obs: &Observed) {
        for (c, ch) in self.channels.iter_mut().enumerate() {
            if let Some(n) = obs.get(c) {
                ch.set_observed(n);
            }
        }
    }

    /// Confidence level.
    pub fn conf_level(&self) -> f64 {
        self.conf_level
    }

    /// Set the confidence level of the combination and every channel.
    pub fn set_conf_level(&mut self, cl: f64) -> Result<()> {
        self.conf_level = validate_conf_level(cl)?;
        for ch in &mut self.channels {
            ch.set_conf_level(cl)?;
        }
        Ok(())
    }

    /// Signal strength.
    pub fn sig_strength(&self) -> f64 {
        self.sig_strength
    }

    /// Set the signal strength of every channel.
    pub fn set_sig_strength(&mut self, mu: f64) {
        self.sig_strength = mu;
        self.llr = None;
        for ch in &mut self.channels {
            ch.set_sig_strength(mu);
        }
    }

    /// Sum of the channels' LLR of their observed counts.
    pub fn compute_llr_data(&self) -> Result<f64> {
        self.channels.iter().map(Channel::compute_llr_data).sum()
    }

    fn empty_histograms(&self) -> Result<CombinedHistograms> {
        if self.channels.is_empty() {
            return Err(Error::Validation("combination has no channel".into()));
        }
        let (mut llr_min, mut llr_max) = (0.0, 0.0);
        let mut channels = Vec::with_capacity(self.channels.len());
        for ch in &self.channels {
            let (h, lo, hi) = ch.empty_histograms()?;
            llr_min += lo;
            llr_max += hi;
            channels.push(h);
        }
        let llr = |name: &str| Histogram::new(name, COMBINED_LLR_BINS, llr_min, llr_max);
        Ok(CombinedHistograms {
            combined: CombinedLlr { llr_b: llr("comb_LLRb")?, llr_sb: llr("comb_LLRsb")? },
            channels,
        })
    }

    /// Drop the distributions and install empty ones on the summed channel
    /// ranges; returns that range.
    pub fn init_distr_llr(&mut self) -> Result<(f64, f64)> {
        let h = self.empty_histograms()?;
        let range = (h.combined.llr_b.x_min(), h.combined.llr_b.x_max());
        self.store(h);
        Ok(range)
    }

    fn store(&mut self, h: CombinedHistograms) {
        for (ch, hist) in self.channels.iter_mut().zip(h.channels) {
            ch.set_histograms(hist);
        }
        self.llr = Some(h.combined);
    }

    /// Regenerate combined and per-channel distributions with `nb_exp`
    /// pseudo-experiments, normalized to unit area.
    pub fn generate_distr_llr(&mut self, nb_exp: usize) -> Result<()> {
        self.llr = None;
        let template = self.empty_histograms()?;
        if nb_exp == 0 {
            self.store(template);
            return Ok(());
        }
        let channels = &self.channels;
        let mut acc = self.engine.run(nb_exp, &template, |acc, ctx| {
            ctx.variate();
            let (mut llr_b, mut llr_sb) = (0.0, 0.0);
            for (ch, h) in channels.iter().zip(acc.channels.iter_mut()) {
                let pe = ch.pseudo_experiment(ctx)?;
                h.fill(&pe);
                llr_b += pe.llr_b;
                llr_sb += pe.llr_sb;
            }
            acc.combined.llr_b.fill(llr_b);
            acc.combined.llr_sb.fill(llr_sb);
            Ok(())
        })?;
        let norm = 1.0 / nb_exp as f64;
        acc.combined.llr_b.scale(norm);
        acc.combined.llr_sb.scale(norm);
        acc.channels.iter_mut().for_each(|h| h.scale(norm));
        self.store(acc);
        Ok(())
    }

    /// Combined distributions of the last generation.
    pub fn llr(&self) -> Result<&CombinedLlr> {
        self.llr.as_ref().ok_or_else(|| {
            Error::Validation("no combined LLR distribution, generate distributions first".into())
        })
    }

    /// CLs of the observed counts.
    pub fn compute_cls_data(&self) -> Result<f64> {
        let h = self.llr()?;
        Ok(compute_cls(&h.llr_sb, &h.llr_b, self.compute_llr_data()?))
    }

    /// Background-only p-value of the observed counts: mass of the combined
    /// background LLR from the underflow up to the bin of the data.
    pub fn p_value_data(&self) -> Result<f64> {
        let h = &self.llr()?.llr_b;
        Ok(h.integral(0, h.find_bin(self.compute_llr_data()?)))
    }

    /// Limits memoized by observed tuple.
    pub fn mu_vs_obs(&self) -> &BTreeMap<Observed, f64> {
        &self.limits
    }

    /// Interpolation partitions of `channel`, keyed by the other channels'
    /// counts.
    pub fn partitions(&self, channel: usize) -> Result<&BTreeMap<Observed, MuVsObs>> {
        self.partitions.get(channel).ok_or_else(|| self.unknown_channel(channel))
    }

    /// Average of the limits recorded so far, 1 when none or when tiny.
    pub fn average_limit(&self) -> f64 {
        if self.nb_mu == 0 {
            return 1.0;
        }
        let avg = self.sum_mu / self.nb_mu as f64;
        if avg < MIN_AVERAGE_LIMIT { 1.0 } else { avg }
    }

    /// Memoize `mu` for `obs` and feed every channel's partition.
    pub fn record_limit(&mut self, obs: Observed, mu: f64) {
        self.sum_mu += mu;
        self.nb_mu += 1;
        for (c, partition) in self.partitions.iter_mut().enumerate() {
            if let Some(n) = obs.get(c) {
                partition.entry(obs.masked(c)).or_default().add(n, mu);
            }
        }
        self.limits.insert(obs, mu);
    }

    /// Forget memoized limits, partitions and the running average.
    pub fn reset_limits(&mut self) {
        self.limits.clear();
        self.partitions.iter_mut().for_each(BTreeMap::clear);
        self.sum_mu = 0.0;
        self.nb_mu = 0;
    }

    /// First positive interpolation among the partitions containing `obs`.
    fn interpolated_mu(&self, obs: &Observed) -> Option<f64> {
        self.partitions.iter().enumerate().find_map(|(c, partition)| {
            let n = obs.get(c)?;
            let mu = partition.get(&obs.masked(c))?.interpolate(n)?;
            (mu > 0.0).then_some(mu)
        })
    }

    /// Signal strength excluded at the confidence level.
    ///
    /// Seeds as for a single channel, except that observed searches look up
    /// the partitions of every channel in turn and otherwise start from the
    /// running average of the limits found so far.
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
            let obs = self.observed();
            log::info!("--------- searching mu for obs={obs} ---------");
            match self.interpolated_mu(&obs) {
                Some(m) => {
                    mu = m;
                    step = 1.2;
                }
                None => mu = self.average_limit(),
            }
        }
        let cl = self.conf_level;
        algorithms::sig_strength_exclusion(self, mu, step, nb_exp, kind, cl, method)
    }

    /// Median expected limit over `nb_mu` background-only pseudo-data tuples.
    /// Observed counts are restored afterwards, on failure too.
    pub fn expected_sig_strength_exclusion(&mut self, nb_mu: usize, nb_exp: usize) -> Result<f64> {
        if nb_mu == 0 {
            return Err(Error::Validation("expected limits need at least one pseudo-data set".into()));
        }
        self.channels.iter_mut().for_each(Channel::save_observed);
        let result = self.expected_limits(nb_mu, nb_exp);
        self.channels.iter_mut().for_each(Channel::restore_observed);
        result
    }

    fn expected_limits(&mut self, nb_mu: usize, nb_exp: usize) -> Result<f64> {
        let target = 1.0 - self.conf_level;
        self.reset_limits();
        self.channels.iter_mut().for_each(Channel::set_observed_to_bkg);
        let obs0 = self.observed();
        let first =
            self.sig_strength_exclusion(LimitType::Observed, nb_exp, None, SearchMethod::Dichotomy)?;
        self.record_limit(obs0, first.mu);

        let mut expected_mu = Histogram::new("comb_mu", COMBINED_LLR_BINS, 0.0, first.mu * 10.0)?;
        let mut cls_hist = Histogram::new("comb_CLs", 1000, target * 0.8, target * 1.2)?;
        cls_hist.fill(first.cls);

        for i in 0..nb_mu {
            if i > 0 && i % PROGRESS_EVERY == 0 {
                log::info!("expected limits: {i} / {nb_mu} pseudo-data sets");
            }
            let obs = {
                let mut ctx = self.engine.context();
                ctx.variate();
                let mut counts = Vec::with_capacity(self.channels.len());
                for ch in &self.channels {
                    counts.push(ch.pseudo_data(&mut ctx, 0.0)?);
                }
                Observed::new(counts)
            };
            let mu = match self.limits.get(&obs) {
                Some(&mu) => mu,
                None => {
                    self.apply_observed(&obs);
                    let ex = self.sig_strength_exclusion(
                        LimitType::Observed,
                        nb_exp,
                        None,
                        SearchMethod::Dichotomy,
                    )?;
                    self.record_limit(obs, ex.mu);
                    cls_hist.fill(ex.cls);
                    ex.mu
                }
            };
            expected_mu.fill(mu);
        }
        expected_mu.scale(1.0 / nb_mu as f64);

        // x is the total count over channels
        let points = self
            .limits
            .iter()
            .map(|(obs, &mu)| ((0..obs.len()).filter_map(|c| obs.get(c)).sum::<u64>() as f64, mu))
            .collect();
        let median = quantiles(&expected_mu)[2];
        log::info!("combination: median expected limit mu={median} ({} distinct tuples)", self.limits.len());
        self.diagnostics.expected_mu = Some(expected_mu);
        self.diagnostics.cls_at_limit = Some(cls_hist);
        self.diagnostics.mu_vs_obs = Some(Graph::from_points("comb_mu_vs_obs", points));
        Ok(median)
    }

    /// Nuisance-parameter pulls drawn so far.
    pub fn pulls(&self) -> &Histogram {
        self.engine.systematics().pulls()
    }

    /// Log channels and nuisance parameters.
    pub fn describe(&self) {
        log::info!("=== combination of {} channels, CL={} ===", self.channels.len(), self.conf_level);
        for ch in &self.channels {
            ch.describe();
        }
        self.engine.systematics().describe();
    }
}

impl ClsGenerator for Combination {
    fn generate_for_cls(&mut self, mu: f64, nb_exp: usize, kind: LimitType) -> Result<f64> {
        self.set_sig_strength(mu);
        self.generate_distr_llr(nb_exp)?;
        if kind.is_observed() {
            return self.compute_cls_data();
        }
        let h = self.llr()?;
        Ok(cls_from_llr_quantile(kind, &h.llr_sb, &h.llr_b))
    }
}

impl HypothesisTest for Combination {
    fn conf_level(&self) -> f64 {
        self.conf_level
    }

    fn set_sig_strength(&mut self, mu: f64) {
        Combination::set_sig_strength(self, mu);
    }

    fn generate_distr_llr(&mut self, nb_exp: usize) -> Result<()> {
        Combination::generate_distr_llr(self, nb_exp)
    }

    fn p_value_data(&self) -> Result<f64> {
        Combination::p_value_data(self)
    }

    fn llr_b(&self) -> Result<&Histogram> {
        Ok(&self.llr()?.llr_b)
    }

    fn llr_sb(&self) -> Result<&Histogram> {
        Ok(&self.llr()?.llr_sb)
    }

    fn diagnostics(&self) -> &LimitDiagnostics {
        &self.diagnostics
    }

    fn diagnostics_mut(&mut self) -> &mut LimitDiagnostics {
        &mut self.diagnostics
    }
}
