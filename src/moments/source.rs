//! Read-only operands for the Combine kernel.
//!
//! Purpose
//! -------
//! Abstract "the second accumulator" of a merge so that a single generic
//! recurrence serves every caller:
//! - a slot of an existing accumulator array (`ArrayView1` / `ArrayView2`),
//! - a single weighted observation ([`Singleton`] / [`CoSingleton`]), which
//!   is how Push is expressed,
//! - a weight-scaled operand ([`Scaled`]), used to remove a previously
//!   merged group (`factor = -1`) or to replay it several times.
//!
//! Invariants & assumptions
//! ------------------------
//! - `central(k)` is only queried for `k ≥ 2` (`central(i, j)` for
//!   `i + j ≥ 2`) and returns the *weight-scaled* central moment.
//! - A singleton has every higher central moment equal to exactly `0.0`, so
//!   pushing an observation and combining with its one-point accumulator
//!   feed bit-identical operands into the recurrence.
use ndarray::{ArrayView1, ArrayView2};

/// Univariate operand: weight, mean and weight-scaled central moments.
pub trait MomentSource {
    fn weight(&self) -> f64;
    fn mean(&self) -> f64;
    /// `w · E[(X − m)^k]`, `k ≥ 2`.
    fn central(&self, k: usize) -> f64;
}

/// Bivariate operand: weight, both means and weight-scaled co-moments.
pub trait CoMomentSource {
    fn weight(&self) -> f64;
    fn mean_x(&self) -> f64;
    fn mean_y(&self) -> f64;
    /// `w · E[(X − mX)^i (Y − mY)^j]`, `i + j ≥ 2`.
    fn central(&self, i: usize, j: usize) -> f64;
}

impl MomentSource for ArrayView1<'_, f64> {
    #[inline]
    fn weight(&self) -> f64 {
        self[0]
    }

    #[inline]
    fn mean(&self) -> f64 {
        self[1]
    }

    #[inline]
    fn central(&self, k: usize) -> f64 {
        self[k]
    }
}

impl CoMomentSource for ArrayView2<'_, f64> {
    #[inline]
    fn weight(&self) -> f64 {
        self[[0, 0]]
    }

    #[inline]
    fn mean_x(&self) -> f64 {
        self[[1, 0]]
    }

    #[inline]
    fn mean_y(&self) -> f64 {
        self[[0, 1]]
    }

    #[inline]
    fn central(&self, i: usize, j: usize) -> f64 {
        self[[i, j]]
    }
}

/// One weighted observation of a single variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Singleton {
    pub weight: f64,
    pub value: f64,
}

impl MomentSource for Singleton {
    #[inline]
    fn weight(&self) -> f64 {
        self.weight
    }

    #[inline]
    fn mean(&self) -> f64 {
        self.value
    }

    #[inline]
    fn central(&self, _k: usize) -> f64 {
        0.0
    }
}

/// One weighted observation of a pair `(x, y)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoSingleton {
    pub weight: f64,
    pub x: f64,
    pub y: f64,
}

impl CoMomentSource for CoSingleton {
    #[inline]
    fn weight(&self) -> f64 {
        self.weight
    }

    #[inline]
    fn mean_x(&self) -> f64 {
        self.x
    }

    #[inline]
    fn mean_y(&self) -> f64 {
        self.y
    }

    #[inline]
    fn central(&self, _i: usize, _j: usize) -> f64 {
        0.0
    }
}

/// An operand whose weight and weight-scaled moments are multiplied by
/// `factor`; means are left unchanged.
///
/// `factor = -1.0` subtracts a group that was previously merged in. An
/// integer `factor = n` is equivalent to merging the operand `n` times.
pub struct Scaled<'a, S: ?Sized> {
    inner: &'a S,
    factor: f64,
}

impl<'a, S: ?Sized> Scaled<'a, S> {
    pub fn new(inner: &'a S, factor: f64) -> Self {
        Scaled { inner, factor }
    }
}

impl<S: MomentSource + ?Sized> MomentSource for Scaled<'_, S> {
    #[inline]
    fn weight(&self) -> f64 {
        self.factor * self.inner.weight()
    }

    #[inline]
    fn mean(&self) -> f64 {
        self.inner.mean()
    }

    #[inline]
    fn central(&self, k: usize) -> f64 {
        self.factor * self.inner.central(k)
    }
}

impl<S: CoMomentSource + ?Sized> CoMomentSource for Scaled<'_, S> {
    #[inline]
    fn weight(&self) -> f64 {
        self.factor * self.inner.weight()
    }

    #[inline]
    fn mean_x(&self) -> f64 {
        self.inner.mean_x()
    }

    #[inline]
    fn mean_y(&self) -> f64 {
        self.inner.mean_y()
    }

    #[inline]
    fn central(&self, i: usize, j: usize) -> f64 {
        self.factor * self.inner.central(i, j)
    }
}
