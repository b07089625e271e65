//! JSON analysis description.
//!
//! ```json
//! {
//!   "combination": { "systematics": "linear", "statistics": "normal", "seed": 12345 },
//!   "confidence_level": 0.95,
//!   "channels": [
//!     {
//!       "name": "sr",
//!       "observed": 103,
//!       "backgrounds": [
//!         { "name": "ttbar", "nominal": 100.0, "stat": 10.0,
//!           "systematics": [{ "name": "lumi", "up": 0.05, "down": -0.05 }] }
//!       ],
//!       "signal": { "name": "stop", "nominal": 20.0 }
//!     }
//!   ]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tl_core::Result;

use crate::combination::Combination;
use crate::engine::EngineConfig;
use crate::hypotest::DEFAULT_CONF_LEVEL;

/// Engine settings of a combination.
pub type CombinationConfig = EngineConfig;

/// Relative effect of one nuisance parameter on one sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystematicConfig {
    /// Nuisance-parameter name, shared across samples and channels.
    pub name: String,
    /// Relative change at `+1σ`.
    pub up: f64,
    /// Relative change at `-1σ`.
    pub down: f64,
}

/// A background or signal sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleConfig {
    /// Sample name.
    pub name: String,
    /// Nominal yield.
    pub nominal: f64,
    /// Absolute statistical uncertainty.
    #[serde(default)]
    pub stat: f64,
    /// Systematic effects.
    #[serde(default)]
    pub systematics: Vec<SystematicConfig>,
    /// Name used in reports; defaults to `name`.
    #[serde(default)]
    pub display_name: Option<String>,
}

/// One counting channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Channel name, unique within the analysis.
    pub name: String,
    /// Name used in reports; defaults to `name`.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Background samples.
    #[serde(default)]
    pub backgrounds: Vec<SampleConfig>,
    /// Signal sample.
    pub signal: SampleConfig,
    /// Observed count.
    #[serde(default)]
    pub observed: u64,
}

/// Complete analysis: engine settings, confidence level and channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Engine settings.
    #[serde(default)]
    pub combination: CombinationConfig,
    /// Confidence level of exclusions.
    #[serde(default = "default_conf_level")]
    pub confidence_level: f64,
    /// Channels, in combination order.
    pub channels: Vec<ChannelConfig>,
}

fn default_conf_level() -> f64 {
    DEFAULT_CONF_LEVEL
}

impl AnalysisConfig {
    /// Parse a JSON description.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON description from `path`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

impl Combination {
    /// Build a combination from an analysis description.
    pub fn from_config(config: &AnalysisConfig) -> Result<Self> {
        let mut comb = Combination::new(config.combination)?;
        comb.set_conf_level(config.confidence_level)?;
        for ch in &config.channels {
            let c = comb.add_channel(&ch.name)?;
            for bkg in &ch.backgrounds {
                let s = comb.add_bkg_sample(c, &bkg.name, bkg.nominal, bkg.stat)?;
                if let Some(display) = &bkg.display_name {
                    comb.channel_mut(c)?.bkg_sample_mut(s)?.set_display_name(display.as_str());
                }
                for syst in &bkg.systematics {
                    comb.add_bkg_systematic(c, s, &syst.name, syst.up, syst.down)?;
                }
            }
            let sig = &ch.signal;
            comb.set_sig_sample(c, &sig.name, sig.nominal, sig.stat)?;
            if let Some(display) = &sig.display_name {
                comb.channel_mut(c)?.sig_sample_mut()?.set_display_name(display.as_str());
            }
            for syst in &sig.systematics {
                comb.add_sig_systematic(c, &syst.name, syst.up, syst.down)?;
            }
            if let Some(display) = &ch.display_name {
                comb.channel_mut(c)?.set_display_name(display.as_str());
            }
            comb.set_observed(c, ch.observed)?;
        }
        log::debug!(
            "built combination of {} channels, {} nuisance parameters",
            comb.n_channels(),
            comb.engine().systematics().len()
        );
        Ok(comb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tl_core::{Error, StatStyle, SystStyle};

    const JSON: &str = r#"{
        "combination": { "systematics": "exponential", "statistics": "log_normal", "seed": 7 },
        "confidence_level": 0.9,
        "channels": [
            {
                "name": "sr1",
                "display_name": "Signal region 1",
                "observed": 12,
                "backgrounds": [
                    { "name": "ttbar", "nominal": 10.0, "stat": 1.0,
                      "systematics": [{ "name": "lumi", "up": 0.05, "down": -0.05 }] },
                    { "name": "wjets", "nominal": 3.0, "display_name": "W+jets" }
                ],
                "signal": { "name": "stop", "nominal": 4.0,
                            "systematics": [{ "name": "lumi", "up": 0.05, "down": -0.05 }] }
            },
            {
                "name": "sr2",
                "observed": 2,
                "backgrounds": [{ "name": "ttbar", "nominal": 1.5, "stat": 0.3 }],
                "signal": { "name": "stop", "nominal": 2.0 }
            }
        ]
    }"#;

    #[test]
    fn test_parse_and_build() {
        let cfg = AnalysisConfig::from_json_str(JSON).unwrap();
        assert_eq!(cfg.combination.systematics, SystStyle::Exponential);
        assert_eq!(cfg.combination.statistics, StatStyle::LogNormal);
        assert!(!cfg.combination.parallel);

        let comb = Combination::from_config(&cfg).unwrap();
        assert_eq!(comb.n_channels(), 2);
        assert_eq!(comb.conf_level(), 0.9);
        assert_eq!(comb.engine().init_seed(), 7);
        assert_eq!(comb.engine().systematics().len(), 1);
        let sr1 = comb.channel_by_name("sr1").unwrap();
        assert_eq!(sr1.display_name(), "Signal region 1");
        assert_eq!(sr1.observed(), 12);
        assert_eq!(sr1.yield_bkg(), 13.0);
        assert_eq!(sr1.bkg_samples()[1].display_name(), "W+jets");
        assert_eq!(sr1.bkg_samples()[1].name(), "sr1_wjets");
        assert_eq!(comb.channel(1).unwrap().display_name(), "sr2");
    }

    #[test]
    fn test_defaults() {
        let cfg = AnalysisConfig::from_json_str(
            r#"{ "channels": [{ "name": "a", "signal": { "name": "s", "nominal": 1.0 } }] }"#,
        )
        .unwrap();
        assert_eq!(cfg.confidence_level, DEFAULT_CONF_LEVEL);
        assert_eq!(cfg.combination, CombinationConfig::default());
        assert_eq!(cfg.channels[0].observed, 0);
    }

    #[test]
    fn test_bad_input() {
        assert!(matches!(AnalysisConfig::from_json_str("{"), Err(Error::Json(_))));
        let bad_style = r#"{ "combination": { "systematics": "cubic" }, "channels": [] }"#;
        assert!(matches!(AnalysisConfig::from_json_str(bad_style), Err(Error::Json(_))));
        let cfg = AnalysisConfig::from_json_str(r#"{ "confidence_level": 1.2, "channels": [] }"#)
            .unwrap();
        assert!(matches!(Combination::from_config(&cfg), Err(Error::Configuration(_))));
        assert!(matches!(AnalysisConfig::from_path("/nonexistent/toylim.json"), Err(Error::Io(_))));
    }
}
