//! Signal-strength root finding: solve `CLs(mu) = 1 - CL`.
//!
//! 1. Bracketing: from the seed, scale mu by a factor (10, halved on each
//!    change of direction) until CLs lands in `(0, 0.9]`.
//! 2. Second point: step mu by `mu_step` (inverted if the first CLs is
//!    already below target) and bracket again.
//! 3. Refinement: either iterated log-linear interpolation (dichotomy) or one
//!    log-linear extrapolation.

use tl_core::{ClsGenerator, Error, Exclusion, LimitType, Result, SearchMethod};

/// Cap on evaluations per bracketing or refinement loop.
pub const MAX_ITERATIONS: usize = 50;
/// Relative width of the mu bracket at which dichotomy stops.
pub const MU_PRECISION: f64 = 0.01;
/// Upper end of the CLs window accepted while bracketing.
pub const CLS_CEILING: f64 = 0.9;
/// Relative tolerance on the CLs target.
pub const CLS_TOLERANCE: f64 = 0.05;

const INITIAL_FACTOR: f64 = 10.0;
const NUDGE: f64 = 1.1;
const LINEAR_FALLBACK_CLS: f64 = 1e-5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    None,
    Up,
    Down,
}

fn in_window(cls: f64) -> bool {
    cls > 0.0 && cls <= CLS_CEILING
}

/// Move `mu` until the generator returns a usable CLs; returns that CLs.
/// When `avoid` is set, a trial equal to it is nudged by ×1.1 first.
#[allow(clippy::too_many_arguments)]
fn bracket<G: ClsGenerator + ?Sized>(
    generator: &mut G,
    mu: &mut f64,
    factor: &mut f64,
    nb_exp: usize,
    kind: LimitType,
    avoid: Option<f64>,
    label: &str,
) -> Result<f64> {
    let mut direction = Direction::None;
    let mut i = 0;
    loop {
        if i > MAX_ITERATIONS {
            log::warn!("still no correct value for CLs after {MAX_ITERATIONS} trials, aborting");
            return Err(Error::NonConvergence(format!(
                "no correct CLs value while scanning the {label} point (last mu={mu})"
            )));
        }
        if avoid == Some(*mu) {
            *mu *= NUDGE;
        }
        let cls = generator.generate_for_cls(*mu, nb_exp, kind)?;
        log::debug!("-> scanning {label} point: mu={mu}, CLs={cls}");
        if in_window(cls) {
            return Ok(cls);
        }
        if cls > CLS_CEILING {
            if direction == Direction::Down {
                *factor /= 2.0;
            }
            *mu *= *factor;
            direction = Direction::Up;
        } else {
            if direction == Direction::Up {
                *factor /= 2.0;
            }
            *mu /= *factor;
            direction = Direction::Down;
        }
        i += 1;
    }
}

/// Next trial between `(mu_min, cls_min)` and `(mu_max, cls_max)`: linear in
/// `(mu, ln CLs)`, or linear in `(mu, CLs)` toward zero when the upper CLs is
/// negligible or equal to the lower one. Clamped at 0.
fn next_trial(target: f64, mu_min: f64, cls_min: f64, mu_max: f64, cls_max: f64) -> f64 {
    let mu = if cls_max < LINEAR_FALLBACK_CLS || cls_max == cls_min {
        mu_min + (mu_max - mu_min) * (target - cls_min) / (-cls_min)
    } else {
        let (lmin, lmax) = (cls_min.ln(), cls_max.ln());
        mu_min + (mu_max - mu_min) * (target.ln() - lmin) / (lmax - lmin)
    };
    mu.max(0.0)
}

/// Signal strength at which CLs reaches `1 - conf_level`.
///
/// `mu0` seeds the search and `mu_step` sets the distance to the second
/// bracketing point. Fails with [`Error::NonConvergence`] when a loop exceeds
/// [`MAX_ITERATIONS`].
#[allow(clippy::too_many_arguments)]
pub fn sig_strength_exclusion<G: ClsGenerator + ?Sized>(
    generator: &mut G,
    mu0: f64,
    mu_step: f64,
    nb_exp: usize,
    kind: LimitType,
    conf_level: f64,
    method: SearchMethod,
) -> Result<Exclusion> {
    let target = 1.0 - conf_level;
    let mut factor = INITIAL_FACTOR;

    log::info!("---> searching for a reasonable mu interval, from {mu0}");
    let mut mu = mu0;
    let cls_first = bracket(generator, &mut mu, &mut factor, nb_exp, kind, None, "first")?;

    let step = if cls_first < target { 1.0 / mu_step } else { mu_step };
    let (mu_prev, cls_prev) = (mu, cls_first);
    mu *= step;
    let cls = bracket(generator, &mut mu, &mut factor, nb_exp, kind, Some(mu_prev), "second")?;

    let (mut mu_min, mut cls_min, mut mu_max, mut cls_max) =
        if mu_prev > mu { (mu, cls, mu_prev, cls_prev) } else { (mu_prev, cls_prev, mu, cls) };

    match method {
        SearchMethod::Extrapolation => {
            log::info!("---> extrapolating mu from references: {mu_min}, {mu_max}");
            let mu = next_trial(target, mu_min, cls_min, mu_max, cls_max);
            let cls = generator.generate_for_cls(mu, nb_exp, kind)?;
            log::info!("---> extrapolated mu={mu}, CLs={cls}");
            Ok(Exclusion { mu, cls })
        }
        SearchMethod::Dichotomy => {
            log::info!("---> log-dichotomy search with mu references: {mu_min}, {mu_max}");
            let (lo, hi) = (target * (1.0 - CLS_TOLERANCE), target * (1.0 + CLS_TOLERANCE));
            let mut i = 0;
            while (mu_max - mu_min) / mu_min > MU_PRECISION {
                if i > MAX_ITERATIONS {
                    log::warn!("no convergence of mu found after {MAX_ITERATIONS} trials, aborting");
                    return Err(Error::NonConvergence(format!(
                        "no convergence of mu within [{mu_min}, {mu_max}]"
                    )));
                }
                let mu = next_trial(target, mu_min, cls_min, mu_max, cls_max);
                let cls = generator.generate_for_cls(mu, nb_exp, kind)?;
                log::debug!("-> searching for mu={mu}, CLs={cls} (refs: {mu_min}, {mu_max})");
                if cls > lo && cls < hi {
                    log::info!("---> close enough to {target}, stopping at mu={mu}");
                    return Ok(Exclusion { mu, cls });
                }
                if cls > target {
                    if mu > mu_max {
                        (mu_min, cls_min) = (mu_max, cls_max);
                        (mu_max, cls_max) = (mu, cls);
                    } else {
                        (mu_min, cls_min) = (mu, cls);
                    }
                } else if mu < mu_min {
                    (mu_max, cls_max) = (mu_min, cls_min);
                    (mu_min, cls_min) = (mu, cls);
                } else {
                    (mu_max, cls_max) = (mu, cls);
                }
                i += 1;
            }
            let mu = (mu_min + mu_max) / 2.0;
            let cls = generator.generate_for_cls(mu, nb_exp, kind)?;
            log::info!("---> best mu={mu} +- {}, CLs={cls}", (mu_max - mu_min) / 2.0);
            Ok(Exclusion { mu, cls })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Closed-form CLs falling exponentially with mu, counting calls.
    struct Exponential {
        slope: f64,
        calls: usize,
        trials: Vec<f64>,
    }

    impl Exponential {
        fn new(slope: f64) -> Self {
            Self { slope, calls: 0, trials: Vec::new() }
        }
    }

    impl ClsGenerator for Exponential {
        fn generate_for_cls(&mut self, mu: f64, _nb_exp: usize, _kind: LimitType) -> Result<f64> {
            self.calls += 1;
            self.trials.push(mu);
            Ok((-self.slope * mu).exp())
        }
    }

    struct AlwaysUndefined;

    impl ClsGenerator for AlwaysUndefined {
        fn generate_for_cls(&mut self, _mu: f64, _nb_exp: usize, _kind: LimitType) -> Result<f64> {
            Ok(-1.0)
        }
    }

    #[test]
    fn test_dichotomy_converges() {
        let mut g = Exponential::new(1.0);
        let ex = sig_strength_exclusion(
            &mut g,
            0.5,
            3.0,
            0,
            LimitType::Observed,
            0.95,
            SearchMethod::Dichotomy,
        )
        .unwrap();
        let exact = -(0.05f64).ln();
        assert!((ex.cls - 0.05).abs() < 0.05 * CLS_TOLERANCE + 1e-3, "cls={}", ex.cls);
        assert_relative_eq!(ex.mu, exact, max_relative = 0.05);
    }

    #[test]
    fn test_extrapolation_is_exact_for_log_linear_cls() {
        let mut g = Exponential::new(2.0);
        let ex = sig_strength_exclusion(
            &mut g,
            0.5,
            3.0,
            0,
            LimitType::ExpectedMed,
            0.95,
            SearchMethod::Extrapolation,
        )
        .unwrap();
        assert_relative_eq!(ex.mu, -(0.05f64).ln() / 2.0, epsilon = 1e-9);
        assert_relative_eq!(ex.cls, 0.05, epsilon = 1e-9);
    }

    #[test]
    fn test_degenerate_step_is_nudged() {
        let mut g = Exponential::new(1.0);
        let ex = sig_strength_exclusion(
            &mut g,
            1.0,
            1.0,
            0,
            LimitType::Observed,
            0.95,
            SearchMethod::Dichotomy,
        )
        .unwrap();
        // second trial moved away from the first one
        assert_eq!(g.trials[0], 1.0);
        assert_relative_eq!(g.trials[1], 1.1);
        assert!(g.calls < 2 * (MAX_ITERATIONS + 1) + MAX_ITERATIONS + 2);
        assert!(ex.mu > 0.0);
    }

    #[test]
    fn test_bracketing_gives_up() {
        let err = sig_strength_exclusion(
            &mut AlwaysUndefined,
            1.0,
            3.0,
            0,
            LimitType::Observed,
            0.95,
            SearchMethod::Dichotomy,
        )
        .unwrap_err();
        assert!(matches!(err, Error::NonConvergence(_)));
    }

    #[test]
    fn test_bracketing_walks_up_from_tiny_seed() {
        let mut g = Exponential::new(1.0);
        let ex = sig_strength_exclusion(
            &mut g,
            1e-4,
            3.0,
            0,
            LimitType::Observed,
            0.95,
            SearchMethod::Dichotomy,
        )
        .unwrap();
        assert!(g.trials[1] > g.trials[0]);
        assert_relative_eq!(ex.mu, -(0.05f64).ln(), max_relative = 0.05);
    }

    #[test]
    fn test_next_trial_linear_fallback() {
        // cls_max negligible: straight line through (mu_min, cls_min) toward zero
        let mu = next_trial(0.05, 1.0, 0.1, 3.0, 0.0);
        assert_relative_eq!(mu, 1.0 + 2.0 * (0.05 - 0.1) / -0.1);
        assert_eq!(next_trial(0.05, 0.1, 0.01, 2.0, 0.001), 0.0);
    }
}
