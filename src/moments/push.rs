//! Push a single weighted observation into an accumulator slot.
//!
//! Push is Combine against a one-point operand (weight `w`, mean `x`, all
//! higher moments zero). There is no second numerical path:
//! `push_value(acc, w, x)` and `combine_moments(acc, [w, x, 0, …])` execute
//! the same instructions on the same inputs.
use crate::moments::{
    binomial::BinomialTable,
    combine::{combine_comoments, combine_moments},
    source::{CoSingleton, Singleton},
};
use ndarray::{ArrayViewMut1, ArrayViewMut2};

/// Add observation `value` with weight `weight` to a univariate slot.
#[inline]
pub fn push_value(acc: ArrayViewMut1<'_, f64>, weight: f64, value: f64, binom: &BinomialTable) {
    combine_moments(acc, &Singleton { weight, value }, binom);
}

/// Add the pair `(x, y)` with weight `weight` to a bivariate slot.
#[inline]
pub fn push_pair(
    acc: ArrayViewMut2<'_, f64>, weight: f64, x: f64, y: f64, binom: &BinomialTable,
) {
    combine_comoments(acc, &CoSingleton { weight, x, y }, binom);
}
