//! reduction — vectorized drivers over batched accumulator arrays.
//!
//! Purpose
//! -------
//! Lift the per-slot moment kernels in [`crate::moments`] to whole arrays of
//! shape `batch_shape ++ mom_shape`. Each batch index is an independent
//! slot; drivers broadcast per-slot inputs over the batch, fold sample axes
//! into slots, and collapse, group, accumulate or roll along batch axes.
//!
//! Key behaviors
//! -------------
//! - [`batch`]: [`zeros`], [`single_point`], [`push`] / [`push_into`],
//!   [`push_batch`] / [`push_batch_into`], [`combine`] / [`combine_into`],
//!   [`subtract`] / [`subtract_into`], [`scale`] / [`scale_into`].
//! - [`reduce`](mod@reduce): [`reduce()`], [`reduce_vals`],
//!   [`reduce_grouped`], [`cumulative`].
//! - [`rolling`]: [`rolling_data`], [`rolling_vals`].
//! - [`options`]: [`ExecOptions`] and [`ReduceStrategy`].
//!
//! Invariants & assumptions
//! ------------------------
//! - Drivers validate completely before writing; an `Err` leaves in-place
//!   targets untouched.
//! - Per-slot recurrence order is deterministic and independent of
//!   parallelism: Push folds samples in input order; Combine along an axis
//!   follows the configured [`ReduceStrategy`].
//!
//! Conventions
//! -----------
//! - All array arguments are dynamic-dimension views (`ArrayViewD<f64>`);
//!   outputs are owned `ArrayD<f64>`.
//! - Logging goes through the `log` facade: `debug!` for driver-level
//!   summaries, `trace!` for per-call details, `warn!` when parallel
//!   execution is requested but not compiled in.
//!
//! Testing notes
//! -------------
//! - Each submodule carries unit tests; cross-module properties
//!   (associativity, partition equivalence, push/combine identity) live in
//!   the crate's integration tests.

pub mod batch;
pub mod options;
pub mod reduce;
pub mod rolling;
pub(crate) mod slots;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::batch::{
    combine, combine_into, push, push_batch, push_batch_into, push_into, scale, scale_into,
    single_point, subtract, subtract_into, zeros,
};
pub use self::options::{ExecOptions, ReduceStrategy};
pub use self::reduce::{cumulative, reduce, reduce_grouped, reduce_vals};
pub use self::rolling::{rolling_data, rolling_vals};
