//! moments — per-slot central moment kernels, layout, and the owned wrapper.
//!
//! Purpose
//! -------
//! Provide the numerical core of the crate: the weight-scaled accumulator
//! layout, the pairwise Combine recurrence (which Push reuses for a single
//! observation), raw/central conversion, input validation, and the
//! [`CentralMoments`] wrapper that carries a spec alongside its data.
//!
//! Key behaviors
//! -------------
//! - [`spec`]: [`MomentSpec`] describes the trailing moment axes
//!   (`order + 1`, or `(order0 + 1, order1 + 1)` for co-moments).
//! - [`combine`]: the Combine kernels, generic over [`MomentSource`] /
//!   [`CoMomentSource`] so that accumulators, single observations and
//!   scaled (including negated) accumulators share one code path.
//! - [`push`]: Push as Combine with a one-point source.
//! - [`convert`]: [`central_to_raw`] / [`raw_to_central`] per slot and per
//!   array, and [`moments_to_comoments`].
//! - [`binomial`]: the [`BinomialTable`] shared by the kernels.
//! - [`validation`] and [`errors`]: shape checks and [`MomentError`].
//!
//! Invariants & assumptions
//! ------------------------
//! - Slot 0 holds the total weight `w >= 0`, slot 1 the mean, slot `k >= 2`
//!   the sum `w · E[(X - m)^k]`. Co-moment slot `[0, 0]` is the weight,
//!   `[1, 0]` / `[0, 1]` the means, `[i, j]` the co-moment sums.
//! - An all-zero slot is the empty accumulator and the identity of Combine.
//! - Kernels allocate nothing; binomial coefficients come from a table built
//!   once per driver call.
//!
//! Conventions
//! -----------
//! - Kernels take 1-D / 2-D `ndarray` views; the batched drivers live in
//!   [`crate::reduction`].
//! - Moments are population (weight-normalized) quantities; no small-sample
//!   bias correction is applied anywhere.

pub mod binomial;
pub mod central;
pub mod combine;
pub mod convert;
pub mod errors;
pub mod push;
pub mod source;
pub mod spec;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::binomial::BinomialTable;
pub use self::central::CentralMoments;
pub use self::combine::{combine_comoments, combine_moments};
pub use self::convert::{central_to_raw, moments_to_comoments, raw_to_central};
pub use self::errors::{MomentError, MomentResult};
pub use self::push::{push_pair, push_value};
pub use self::source::{CoMomentSource, CoSingleton, MomentSource, Scaled, Singleton};
pub use self::spec::MomentSpec;

// ---- Optional convenience prelude -----------------------------------------

pub mod prelude {
    pub use super::{
        BinomialTable, CentralMoments, MomentError, MomentResult, MomentSpec, central_to_raw,
        raw_to_central,
    };
}
