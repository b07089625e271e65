use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use tl_core::{LimitType, SearchMethod, StatStyle, SystStyle};
use tl_inference::{Channel, Combination, EngineConfig, ToyEngine};

fn config(parallel: bool) -> EngineConfig {
    EngineConfig {
        systematics: SystStyle::Linear,
        statistics: StatStyle::Normal,
        seed: 42,
        parallel,
        ..EngineConfig::default()
    }
}

fn channel(engine: &mut ToyEngine) -> Channel {
    let mut ch = Channel::new("sr");
    let k = ch.add_bkg_sample("bkg", 100.0, 10.0).unwrap();
    ch.add_bkg_systematic(engine.systematics_mut(), k, "lumi", 0.03, -0.03).unwrap();
    ch.set_sig_sample("sig", 20.0, 2.0).unwrap();
    ch.set_observed(100);
    ch
}

fn combination(n_channels: usize, parallel: bool) -> Combination {
    let mut comb = Combination::new(config(parallel)).unwrap();
    for i in 0..n_channels {
        let c = comb.add_channel(&format!("sr{i}")).unwrap();
        let k = comb.add_bkg_sample(c, "bkg", 20.0 + 10.0 * i as f64, 2.0).unwrap();
        comb.add_bkg_systematic(c, k, "lumi", 0.03, -0.03).unwrap();
        comb.set_sig_sample(c, "sig", 5.0, 0.5).unwrap();
        comb.set_observed(c, 20 + 10 * i as u64).unwrap();
    }
    comb
}

fn bench_channel_llr(c: &mut Criterion) {
    let mut group = c.benchmark_group("channel/generate_distr_llr");
    for nb_exp in [1_000usize, 10_000, 100_000] {
        let mut engine = ToyEngine::new(config(false)).unwrap();
        let mut ch = channel(&mut engine);
        group.bench_with_input(BenchmarkId::new("nb_exp", nb_exp), &nb_exp, |b, &nb| {
            b.iter(|| ch.session(&mut engine).generate_distr_llr(black_box(nb)).unwrap())
        });
    }
    group.finish();
}

fn bench_combination_llr(c: &mut Criterion) {
    let mut group = c.benchmark_group("combination/generate_distr_llr");
    group.sample_size(20);
    for parallel in [false, true] {
        let mut comb = combination(4, parallel);
        group.bench_with_input(BenchmarkId::new("parallel", parallel), &parallel, |b, _| {
            b.iter(|| comb.generate_distr_llr(black_box(50_000)).unwrap())
        });
    }
    group.finish();
}

fn bench_observed_limit(c: &mut Criterion) {
    let mut group = c.benchmark_group("channel/sig_strength_exclusion");
    group.sample_size(10);
    for method in [SearchMethod::Dichotomy, SearchMethod::Extrapolation] {
        let mut engine = ToyEngine::new(config(false)).unwrap();
        let mut ch = channel(&mut engine);
        group.bench_with_input(BenchmarkId::new("method", format!("{method:?}")), &method, |b, &m| {
            b.iter(|| {
                black_box(
                    ch.session(&mut engine)
                        .sig_strength_exclusion(LimitType::Observed, 5_000, None, m)
                        .unwrap(),
                )
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_channel_llr, bench_combination_llr, bench_observed_limit);
criterion_main!(benches);
