//! rust_moments — numerically stable, vectorized central moments and
//! co-moments.
//!
//! Purpose
//! -------
//! Accumulate weighted central moments of one variable, or central
//! co-moments of two, without catastrophic cancellation, over arbitrary
//! batches of independent accumulators. Accumulators can be merged pairwise,
//! reduced along axes, rolled over windows, converted to raw moments, and
//! resampled (bootstrap and jackknife).
//!
//! Key behaviors
//! -------------
//! - [`moments`]: the accumulator layout ([`MomentSpec`]), the Combine and
//!   Push kernels, raw/central conversion, errors, and the owned
//!   [`CentralMoments`] wrapper.
//! - [`reduction`]: array drivers over `batch_shape ++ mom_shape` arrays
//!   ([`push`], [`push_batch`], [`combine`], [`reduce`], grouped, cumulative
//!   and rolling variants) with in-place `*_into` forms.
//! - [`resample`]: seeded frequency tables ([`resample_weights`],
//!   [`random_freq`], [`jackknife_freq`]) and their replay through the
//!   drivers.
//!
//! Invariants & assumptions
//! ------------------------
//! - Batch slots are fully independent: no driver reads one slot while
//!   writing another, and NaN in one slot never reaches another.
//! - Every driver validates its inputs completely before writing; an `Err`
//!   leaves in-place targets unchanged.
//! - Combine is associative and commutative up to floating-point rounding;
//!   the empty (all-zero) accumulator is its identity.
//!
//! Conventions
//! -----------
//! - All numeric data is `f64`. Array arguments are `ndarray` dynamic views;
//!   results are owned `ArrayD<f64>`.
//! - Logging goes through the `log` facade; the crate installs no logger.
//! - The `parallel` cargo feature enables `rayon`-backed slot kernels and
//!   tree reductions, selected per call through [`ExecOptions`].
//!
//! Testing notes
//! -------------
//! - Unit tests sit next to each module; end-to-end properties
//!   (associativity, partition equivalence, raw/central round trips) are in
//!   `tests/integration_moments_pipeline.rs`.

pub mod moments;
pub mod reduction;
pub mod resample;

// ---- Re-exports (primary public surface) ----------------------------------

pub use crate::moments::{
    CentralMoments, MomentError, MomentResult, MomentSpec, central_to_raw, moments_to_comoments,
    raw_to_central,
};
pub use crate::reduction::{
    ExecOptions, ReduceStrategy, combine, combine_into, cumulative, push, push_batch,
    push_batch_into, push_into, reduce, reduce_grouped, reduce_vals, rolling_data, rolling_vals,
    scale, scale_into, single_point, subtract, subtract_into, zeros,
};
pub use crate::resample::{
    ResampleError, ResampleOpts, ResampleResult, freq_to_indices, indices_to_freq, jackknife_data,
    jackknife_freq, jackknife_vals, random_freq, random_indices, resample_data, resample_vals,
    resample_weights,
};

// ---- Optional convenience prelude -----------------------------------------
//
//     use rust_moments::prelude::*;

pub mod prelude {
    pub use super::{
        CentralMoments, ExecOptions, MomentError, MomentResult, MomentSpec, ReduceStrategy,
        ResampleError, ResampleOpts, ResampleResult, central_to_raw, combine, combine_into,
        push, push_batch, push_batch_into, push_into, raw_to_central, reduce, resample_weights,
        zeros,
    };
}
