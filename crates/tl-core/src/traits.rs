//! Core traits for toylim
//!
//! The signal-strength search only needs something that can regenerate the
//! test-statistic distributions at a given signal strength and report CLs.
//! Channels and combinations implement it; tests can plug in closed-form
//! stand-ins.

use crate::Result;
use crate::types::LimitType;

/// Source of CLs values as a function of the signal strength.
pub trait ClsGenerator {
    /// Set the signal strength to `mu`, regenerate the distributions with
    /// `nb_exp` pseudo-experiments and return the CLs value for `kind`.
    ///
    /// A negative return value means CLs is undefined at this point.
    fn generate_for_cls(&mut self, mu: f64, nb_exp: usize, kind: LimitType) -> Result<f64>;
}

impl<G: ClsGenerator + ?Sized> ClsGenerator for &mut G {
    fn generate_for_cls(&mut self, mu: f64, nb_exp: usize, kind: LimitType) -> Result<f64> {
        (**self).generate_for_cls(mu, nb_exp, kind)
    }
}
