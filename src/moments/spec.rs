//! Moment order configuration and accumulator layout.
//!
//! A [`MomentSpec`] fixes, at construction time, whether an accumulator tracks
//! one variable or two and how many moment orders it carries. Everything else
//! (trailing array shape, recurrence depth, binomial table size) is derived
//! from it.
//!
//! Layout
//! ------
//! - Univariate, order `p`: trailing axis of length `p + 1`.
//!   `[0]` weight, `[1]` mean, `[k]` = `w · E[(X − m)^k]` for `k ≥ 2`.
//! - Bivariate, orders `(p, q)`: trailing axes `(p + 1, q + 1)`.
//!   `[0, 0]` weight, `[1, 0]` mean of X, `[0, 1]` mean of Y,
//!   `[i, j]` = `w · E[(X − mX)^i (Y − mY)^j]` for `i + j ≥ 2`.
use crate::moments::errors::{MomentError, MomentResult};

/// Index of the total weight in a univariate slot.
pub const WEIGHT: usize = 0;
/// Index of the mean in a univariate slot.
pub const MEAN: usize = 1;

/// Order configuration of a moment accumulator.
///
/// - `order`: highest moment order tracked for the first (or only) variable.
/// - `order1`: highest order for the second variable; `None` for univariate.
///
/// Invariant: every order is at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MomentSpec {
    order: usize,
    order1: Option<usize>,
}

impl MomentSpec {
    /// Univariate accumulator of the given order.
    ///
    /// # Errors
    /// - [`MomentError::InvalidOrder`] if `order == 0`.
    pub fn univariate(order: usize) -> MomentResult<Self> {
        validate_order(order)?;
        Ok(MomentSpec { order, order1: None })
    }

    /// Bivariate co-moment accumulator with orders `(order0, order1)`.
    ///
    /// # Errors
    /// - [`MomentError::InvalidOrder`] if either order is zero.
    pub fn bivariate(order0: usize, order1: usize) -> MomentResult<Self> {
        validate_order(order0)?;
        validate_order(order1)?;
        Ok(MomentSpec { order: order0, order1: Some(order1) })
    }

    /// Infer a spec from the trailing `mom_ndim` axes of an existing array.
    ///
    /// # Errors
    /// - [`MomentError::MissingMomentAxes`] if `shape` is too short or
    ///   `mom_ndim` is not 1 or 2.
    /// - [`MomentError::InvalidOrder`] if a trailing axis has length < 2.
    pub fn from_shape(shape: &[usize], mom_ndim: usize) -> MomentResult<Self> {
        if !(1..=2).contains(&mom_ndim) || shape.len() < mom_ndim {
            return Err(MomentError::MissingMomentAxes { ndim: shape.len(), mom_ndim });
        }
        let trailing = &shape[shape.len() - mom_ndim..];
        match trailing {
            [m] => MomentSpec::univariate(m.saturating_sub(1)),
            [m0, m1] => MomentSpec::bivariate(m0.saturating_sub(1), m1.saturating_sub(1)),
            _ => Err(MomentError::MissingMomentAxes { ndim: shape.len(), mom_ndim }),
        }
    }

    /// Highest order of the first variable.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Highest order of the second variable, if any.
    pub fn order1(&self) -> Option<usize> {
        self.order1
    }

    pub fn is_bivariate(&self) -> bool {
        self.order1.is_some()
    }

    /// Number of trailing moment axes (1 or 2).
    pub fn mom_ndim(&self) -> usize {
        if self.is_bivariate() { 2 } else { 1 }
    }

    /// Trailing moment shape: `[order + 1]` or `[order0 + 1, order1 + 1]`.
    pub fn mom_shape(&self) -> Vec<usize> {
        match self.order1 {
            None => vec![self.order + 1],
            Some(order1) => vec![self.order + 1, order1 + 1],
        }
    }

    /// Largest order across both variables; sizes the binomial table.
    pub fn max_order(&self) -> usize {
        self.order.max(self.order1.unwrap_or(0))
    }

    /// Full accumulator shape for a given batch shape.
    pub fn full_shape(&self, batch_shape: &[usize]) -> Vec<usize> {
        let mut shape = batch_shape.to_vec();
        shape.extend(self.mom_shape());
        shape
    }
}

impl std::fmt::Display for MomentSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.order1 {
            None => write!(f, "moments(order={})", self.order),
            Some(order1) => write!(f, "comoments(order={}, {})", self.order, order1),
        }
    }
}

fn validate_order(order: usize) -> MomentResult<()> {
    if order == 0 {
        return Err(MomentError::InvalidOrder {
            order,
            reason: "at least the mean (order 1) must be tracked.",
        });
    }
    Ok(())
}
