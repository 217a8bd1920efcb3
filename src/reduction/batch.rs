//! reduction::batch — vectorized Push and Combine over batches of slots.
//!
//! Purpose
//! -------
//! Apply the per-slot kernels to every slot of an accumulator array of shape
//! `batch_shape ++ mom_shape`, broadcasting per-slot inputs (weights, `x`,
//! `y`) over the batch shape.
//!
//! Key behaviors
//! -------------
//! - Every mutating driver comes in two forms: `*_into` updates a mutable
//!   view in place; the plain form copies its input and returns the result.
//! - [`push_batch_into`] folds a whole sample axis into each slot, visiting
//!   samples in input order so that each slot's recurrence is a pure
//!   streaming accumulation.
//! - [`combine_into`] merges two accumulator arrays of identical shape.
//!   [`subtract_into`] removes a previously merged array through a `-1`
//!   scaled merge, and [`scale_into`] multiplies every slot's weight (and
//!   weight-scaled moments) by a non-negative factor.
//!
//! Invariants & assumptions
//! ------------------------
//! - Validation (shape, broadcast, second variable, negative weights) runs
//!   to completion before the first slot is written. An `Err` return leaves
//!   the caller's array untouched.
//! - Slots never read each other; a NaN observation poisons only its slot.
//!
//! Conventions
//! -----------
//! - Per-slot inputs are `ArrayViewD<f64>`; callers holding fixed-dimension
//!   arrays pass `a.view().into_dyn()`. A scalar is a zero-dimensional view.
//! - `y` is required for bivariate specs and rejected otherwise.
use crate::{
    moments::{
        binomial::BinomialTable,
        errors::{MomentError, MomentResult},
        spec::MomentSpec,
        validation::{
            validate_accumulator_weights, validate_axis, validate_removal, validate_same_shape,
            validate_second_variable, validate_weights,
        },
    },
    reduction::{
        options::ExecOptions,
        slots::{
            Slot, SlotLayout, SlotMut, check_broadcast, combine_slot, for_each_slot, push_slot,
            without_axis,
        },
    },
};
use log::{debug, trace};
use ndarray::{ArrayD, ArrayViewD, ArrayViewMutD, Axis, Zip};

/// Empty accumulators (all zeros) for the given batch shape.
pub fn zeros(spec: MomentSpec, batch_shape: &[usize]) -> ArrayD<f64> {
    SlotLayout::from_batch(batch_shape, spec).zeros()
}

/// One-point accumulators: slot `i` holds observation `x[i]` with weight
/// `weights[i]`. The batch shape is the shape of `x`; `weights` and `y`
/// broadcast to it.
///
/// # Errors
/// - Broadcast, second-variable and negative-weight errors as for
///   [`push_into`].
pub fn single_point(
    spec: MomentSpec, weights: ArrayViewD<'_, f64>, x: ArrayViewD<'_, f64>,
    y: Option<ArrayViewD<'_, f64>>,
) -> MomentResult<ArrayD<f64>> {
    let mut out = zeros(spec, x.shape());
    push_into(out.view_mut(), spec, weights, x, y, &ExecOptions::default())?;
    Ok(out)
}

/// Push one observation per slot, in place.
///
/// Parameters
/// ----------
/// - `acc`: accumulator array `batch_shape ++ mom_shape`, updated in place.
/// - `spec`: moment configuration of `acc`.
/// - `weights`, `x`, `y`: per-slot inputs broadcastable to `batch_shape`.
///   `y` must be `Some` exactly when `spec` is bivariate.
/// - `opts`: execution options.
///
/// # Errors
/// - [`MomentError::MomentShapeMismatch`] / `MissingMomentAxes` for a bad
///   accumulator, [`MomentError::NotBroadcastable`] for an input, the
///   second-variable variants, and [`MomentError::NegativeWeight`].
pub fn push_into(
    mut acc: ArrayViewMutD<'_, f64>, spec: MomentSpec, weights: ArrayViewD<'_, f64>,
    x: ArrayViewD<'_, f64>, y: Option<ArrayViewD<'_, f64>>, opts: &ExecOptions,
) -> MomentResult<()> {
    let opts = opts.resolve();
    let layout = SlotLayout::new(acc.shape(), spec)?;
    validate_second_variable(&spec, y.is_some())?;
    validate_weights(&weights)?;
    let binom = layout.binomials();
    trace!("push into {} slots ({spec})", layout.n_slots());
    push_validated(&mut acc, &layout, weights, x, y, &binom, &opts)
}

/// Copy-mode [`push_into`]: returns a new accumulator array.
pub fn push(
    acc: ArrayViewD<'_, f64>, spec: MomentSpec, weights: ArrayViewD<'_, f64>,
    x: ArrayViewD<'_, f64>, y: Option<ArrayViewD<'_, f64>>, opts: &ExecOptions,
) -> MomentResult<ArrayD<f64>> {
    let mut out = acc.to_owned();
    push_into(out.view_mut(), spec, weights, x, y, opts)?;
    Ok(out)
}

/// Push a whole sample axis per slot, in place.
///
/// `x` carries the samples along `axis`; with that axis removed its shape
/// must broadcast onto the batch shape. `weights` and `y` broadcast onto the
/// full shape of `x`. Within each slot the samples are folded in index order.
///
/// # Errors
/// - [`MomentError::AxisOutOfRange`] if `axis >= x.ndim()`.
/// - The errors of [`push_into`].
pub fn push_batch_into(
    mut acc: ArrayViewMutD<'_, f64>, spec: MomentSpec, weights: ArrayViewD<'_, f64>,
    x: ArrayViewD<'_, f64>, y: Option<ArrayViewD<'_, f64>>, axis: usize, opts: &ExecOptions,
) -> MomentResult<()> {
    let opts = opts.resolve();
    let layout = SlotLayout::new(acc.shape(), spec)?;
    validate_second_variable(&spec, y.is_some())?;
    validate_axis(axis, x.ndim())?;
    check_broadcast("x", &without_axis(x.shape(), axis), layout.batch_shape())?;
    let weights_full = broadcast_to_samples("weights", &weights, &x)?;
    let y_full = match &y {
        Some(y) => Some(broadcast_to_samples("y", y, &x)?),
        None => None,
    };
    validate_weights(&weights)?;

    let nsamp = x.len_of(Axis(axis));
    let binom = layout.binomials();
    debug!("push_batch: {nsamp} samples into {} slots ({spec})", layout.n_slots());
    for i in 0..nsamp {
        push_validated(
            &mut acc,
            &layout,
            weights_full.index_axis(Axis(axis), i),
            x.index_axis(Axis(axis), i),
            y_full.as_ref().map(|y| y.index_axis(Axis(axis), i)),
            &binom,
            &opts,
        )?;
    }
    Ok(())
}

/// Copy-mode [`push_batch_into`].
pub fn push_batch(
    acc: ArrayViewD<'_, f64>, spec: MomentSpec, weights: ArrayViewD<'_, f64>,
    x: ArrayViewD<'_, f64>, y: Option<ArrayViewD<'_, f64>>, axis: usize, opts: &ExecOptions,
) -> MomentResult<ArrayD<f64>> {
    let mut out = acc.to_owned();
    push_batch_into(out.view_mut(), spec, weights, x, y, axis, opts)?;
    Ok(out)
}

/// Merge `other` into `acc` slot by slot, in place.
///
/// # Errors
/// - Accumulator shape errors for `acc`, and
///   [`MomentError::OperandShapeMismatch`] if the shapes differ.
/// - [`MomentError::NegativeWeight`] if a slot of `other` has negative
///   weight; removal goes through [`subtract_into`].
pub fn combine_into(
    mut acc: ArrayViewMutD<'_, f64>, other: ArrayViewD<'_, f64>, spec: MomentSpec,
    opts: &ExecOptions,
) -> MomentResult<()> {
    let opts = opts.resolve();
    let layout = SlotLayout::new(acc.shape(), spec)?;
    validate_same_shape(acc.shape(), other.shape())?;
    validate_accumulator_weights(&other, &spec)?;
    let binom = layout.binomials();
    combine_validated(&mut acc, &other, &layout, 1.0, &binom, &opts);
    Ok(())
}

/// Copy-mode [`combine_into`].
pub fn combine(
    acc: ArrayViewD<'_, f64>, other: ArrayViewD<'_, f64>, spec: MomentSpec, opts: &ExecOptions,
) -> MomentResult<ArrayD<f64>> {
    let mut out = acc.to_owned();
    combine_into(out.view_mut(), other, spec, opts)?;
    Ok(out)
}

/// Remove `other`, previously merged into `acc`, slot by slot, in place.
///
/// Slots whose weight drops to exactly zero become the empty accumulator.
///
/// # Errors
/// - The shape errors of [`combine_into`] and its check on `other`.
/// - [`MomentError::RemovalExceedsWeight`] if a slot of `other` weighs more
///   than the matching slot of `acc`.
pub fn subtract_into(
    mut acc: ArrayViewMutD<'_, f64>, other: ArrayViewD<'_, f64>, spec: MomentSpec,
    opts: &ExecOptions,
) -> MomentResult<()> {
    let opts = opts.resolve();
    let layout = SlotLayout::new(acc.shape(), spec)?;
    validate_same_shape(acc.shape(), other.shape())?;
    validate_accumulator_weights(&other, &spec)?;
    validate_removal(&acc.view(), &other, &spec)?;
    let binom = layout.binomials();
    trace!("subtract from {} slots ({spec})", layout.n_slots());
    combine_validated(&mut acc, &other, &layout, -1.0, &binom, &opts);
    Ok(())
}

/// Copy-mode [`subtract_into`].
pub fn subtract(
    acc: ArrayViewD<'_, f64>, other: ArrayViewD<'_, f64>, spec: MomentSpec, opts: &ExecOptions,
) -> MomentResult<ArrayD<f64>> {
    let mut out = acc.to_owned();
    subtract_into(out.view_mut(), other, spec, opts)?;
    Ok(out)
}

/// Multiply the weight of every slot by `factor`, in place.
///
/// The weight-scaled moments scale along with the weight and the means are
/// kept, so the normalized statistics do not change. `factor = 0` empties
/// every slot.
///
/// # Errors
/// - [`MomentError::InvalidScale`] unless `factor` is finite and `>= 0`.
/// - Accumulator shape errors for `acc`.
pub fn scale_into(
    mut acc: ArrayViewMutD<'_, f64>, spec: MomentSpec, factor: f64, opts: &ExecOptions,
) -> MomentResult<()> {
    if !(factor.is_finite() && factor >= 0.0) {
        return Err(MomentError::InvalidScale { factor });
    }
    let opts = opts.resolve();
    let layout = SlotLayout::new(acc.shape(), spec)?;
    let binom = layout.binomials();
    // Merging a scaled copy into empty slots copies it verbatim.
    let source = acc.to_owned();
    acc.fill(0.0);
    combine_validated(&mut acc, &source.view(), &layout, factor, &binom, &opts);
    Ok(())
}

/// Copy-mode [`scale_into`].
pub fn scale(
    acc: ArrayViewD<'_, f64>, spec: MomentSpec, factor: f64, opts: &ExecOptions,
) -> MomentResult<ArrayD<f64>> {
    let mut out = acc.to_owned();
    scale_into(out.view_mut(), spec, factor, opts)?;
    Ok(out)
}

/// Push with every check already done; only broadcasting can still fail.
pub(crate) fn push_validated(
    acc: &mut ArrayViewMutD<'_, f64>, layout: &SlotLayout, weights: ArrayViewD<'_, f64>,
    x: ArrayViewD<'_, f64>, y: Option<ArrayViewD<'_, f64>>, binom: &BinomialTable,
    opts: &ExecOptions,
) -> MomentResult<()> {
    let has_y = y.is_some();
    // Univariate slots ignore `y`; zipping `x` in its place keeps one loop.
    let y = match &y {
        Some(y) => y.view(),
        None => x.view(),
    };
    let w_lifted = layout.lift(weights);
    let x_lifted = layout.lift(x.view());
    let y_lifted = layout.lift(y);
    let w = layout.broadcast("weights", &w_lifted)?;
    let x = layout.broadcast("x", &x_lifted)?;
    let y = layout.broadcast("y", &y_lifted)?;
    let batch_ndim = layout.batch_ndim();

    for_each_slot!(
        opts,
        Zip::from(acc.exact_chunks_mut(layout.chunk())).and(&w).and(&x).and(&y),
        |chunk, &w, &x, &y| {
            let y = if has_y { Some(y) } else { None };
            push_slot(SlotMut::from_chunk(chunk, batch_ndim), w, x, y, binom);
        }
    );
    Ok(())
}

/// Merge `src` scaled by `factor` into `acc`; shapes already checked.
pub(crate) fn combine_validated(
    acc: &mut ArrayViewMutD<'_, f64>, src: &ArrayViewD<'_, f64>, layout: &SlotLayout, factor: f64,
    binom: &BinomialTable, opts: &ExecOptions,
) {
    let batch_ndim = layout.batch_ndim();
    let chunk = layout.chunk();
    for_each_slot!(
        opts,
        Zip::from(acc.exact_chunks_mut(chunk.clone())).and(src.exact_chunks(chunk)),
        |dst, src| {
            let src = Slot::from_chunk(src, batch_ndim);
            combine_slot(SlotMut::from_chunk(dst, batch_ndim), &src, factor, binom);
        }
    );
}

fn broadcast_to_samples<'b>(
    name: &'static str, values: &'b ArrayViewD<'_, f64>, x: &ArrayViewD<'_, f64>,
) -> MomentResult<ArrayViewD<'b, f64>> {
    values.broadcast(x.raw_dim()).ok_or_else(|| MomentError::NotBroadcastable {
        name,
        from: values.shape().to_vec(),
        to: x.shape().to_vec(),
    })
}
