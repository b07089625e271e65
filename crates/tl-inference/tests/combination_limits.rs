//! Combined limits over several channels, built programmatically and from
//! JSON.

use std::io::Write;

use tl_core::{
    ClsGenerator, CombinationMode, LimitType, SearchMethod, SignifType, StatStyle, SystStyle,
};
use tl_inference::{AnalysisConfig, Combination, EngineConfig, HypothesisTest};

const ANALYSIS: &str = r#"{
    "combination": { "systematics": "poly_expo", "statistics": "gamma_uniform", "seed": 2718 },
    "confidence_level": 0.95,
    "channels": [
        {
            "name": "sr_low",
            "observed": 48,
            "backgrounds": [
                { "name": "ttbar", "nominal": 40.0, "stat": 3.0,
                  "systematics": [
                      { "name": "lumi", "up": 0.03, "down": -0.03 },
                      { "name": "jes", "up": 0.08, "down": -0.06 }
                  ] },
                { "name": "wjets", "nominal": 10.0, "stat": 2.0 }
            ],
            "signal": { "name": "stop", "nominal": 6.0, "stat": 0.5,
                        "systematics": [{ "name": "lumi", "up": 0.03, "down": -0.03 }] }
        },
        {
            "name": "sr_high",
            "observed": 3,
            "backgrounds": [
                { "name": "ttbar", "nominal": 4.0, "stat": 0.8,
                  "systematics": [{ "name": "jes", "up": 0.15, "down": -0.12 }] }
            ],
            "signal": { "name": "stop", "nominal": 5.0, "stat": 0.4,
                        "systematics": [{ "name": "lumi", "up": 0.03, "down": -0.03 }] }
        }
    ]
}"#;

fn two_channel_combination(parallel: bool) -> Combination {
    let mut comb = Combination::new(EngineConfig {
        systematics: SystStyle::Exponential,
        statistics: StatStyle::LogNormal,
        combination: CombinationMode::Automatic,
        seed: 1234,
        parallel,
        ..EngineConfig::default()
    })
    .unwrap();
    for (name, b, s, obs) in [("a", 12.0, 6.0, 11), ("b", 30.0, 6.0, 31)] {
        let c = comb.add_channel(name).unwrap();
        let k = comb.add_bkg_sample(c, "bkg", b, 0.1 * b).unwrap();
        comb.add_bkg_systematic(c, k, "lumi", 0.04, -0.04).unwrap();
        comb.set_sig_sample(c, "sig", s, 0.05 * s).unwrap();
        comb.add_sig_systematic(c, "lumi", 0.04, -0.04).unwrap();
        comb.set_observed(c, obs).unwrap();
    }
    comb
}

#[test]
fn combined_limit_is_tighter_than_each_channel() {
    let mut comb = two_channel_combination(false);
    let combined = comb
        .sig_strength_exclusion(LimitType::ExpectedMed, 10000, None, SearchMethod::Dichotomy)
        .unwrap();
    for c in 0..comb.n_channels() {
        let single = comb
            .channel_session(c)
            .unwrap()
            .sig_strength_exclusion(LimitType::ExpectedMed, 10000, None, SearchMethod::Dichotomy)
            .unwrap();
        assert!(combined.mu < single.mu, "combined {} vs channel {c}: {}", combined.mu, single.mu);
    }
}

#[test]
fn parallel_generation_is_reproducible() {
    let cls = |parallel| {
        let mut comb = two_channel_combination(parallel);
        comb.generate_for_cls(1.0, 20000, LimitType::Observed).unwrap()
    };
    let a = cls(true);
    assert_eq!(a, cls(true));
    let sequential = cls(false);
    assert!((a - sequential).abs() < 0.05, "parallel {a} vs sequential {sequential}");
}

#[test]
fn observed_limits_seed_from_partitions() {
    let mut comb = two_channel_combination(false);
    let first = comb
        .sig_strength_exclusion(LimitType::Observed, 5000, None, SearchMethod::Dichotomy)
        .unwrap();
    comb.record_limit(comb.observed(), first.mu);
    comb.set_observed(0, 15).unwrap();
    let second = comb
        .sig_strength_exclusion(LimitType::Observed, 5000, None, SearchMethod::Dichotomy)
        .unwrap();
    comb.record_limit(comb.observed(), second.mu);
    assert!(second.mu > first.mu, "{} then {}", first.mu, second.mu);
    assert_eq!(comb.mu_vs_obs().len(), 2);
    // both tuples share channel b's count, so channel a's partition holds one
    // line through the two limits
    let partition = comb.partitions(0).unwrap();
    assert_eq!(partition.len(), 1);
    let line = partition.values().next().unwrap();
    let mid = line.interpolate(13).unwrap();
    assert!(mid > first.mu && mid < second.mu, "mid={mid}");
}

#[test]
fn analysis_from_json_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(ANALYSIS.as_bytes()).unwrap();
    let cfg = AnalysisConfig::from_path(file.path()).unwrap();
    let mut comb = Combination::from_config(&cfg).unwrap();
    assert_eq!(comb.n_channels(), 2);
    assert_eq!(comb.engine().systematics().len(), 2);
    assert!(!comb.engine().additive());

    let sig = comb.significance(SignifType::Observed, 5000, 1.0).unwrap();
    assert!((0.0..=1.0).contains(&sig.p_value));

    let ex = comb
        .sig_strength_exclusion(LimitType::Observed, 5000, None, SearchMethod::Dichotomy)
        .unwrap();
    assert!(ex.mu > 0.0);

    let median = comb.expected_sig_strength_exclusion(5, 4000).unwrap();
    assert!(median > 0.0);
    assert_eq!(comb.channel(0).unwrap().observed(), 48);
    assert_eq!(comb.channel(1).unwrap().observed(), 3);
}
