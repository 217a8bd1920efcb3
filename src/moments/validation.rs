//! moments::validation — up-front checks shared by every accumulator driver.
//!
//! Purpose
//! -------
//! Centralize the shape and domain checks that must pass *before* any slot
//! is mutated, so that drivers can fail fast without partial writes.
//!
//! Key behaviors
//! -------------
//! - [`validate_accumulator`] checks the trailing moment axes against a
//!   [`MomentSpec`] and returns the leading batch shape.
//! - [`validate_weights`] rejects negative weights, reporting the first
//!   offender in logical (row-major) order. [`validate_accumulator_weights`]
//!   applies the same check to the weight entries of an accumulator array,
//!   and [`validate_removal`] guards subtraction against over-removal.
//! - [`validate_second_variable`], [`validate_axis`] and
//!   [`validate_same_shape`] cover the remaining shape family.
//!
//! Conventions
//! -----------
//! - All functions return [`MomentResult`] and never panic on user input.
//! - NaN weights are not rejected; they propagate per slot.
use crate::moments::{
    errors::{MomentError, MomentResult},
    spec::MomentSpec,
};
use ndarray::{ArrayViewD, Axis};

/// Check the trailing axes of `shape` against `spec` and return the batch
/// shape (the leading axes).
///
/// # Errors
/// - [`MomentError::MissingMomentAxes`] if `shape` has fewer axes than the
///   `MomentSpec` moment axes.
/// - [`MomentError::MomentShapeMismatch`] if the trailing axes differ from
///   [`MomentSpec::mom_shape`].
pub fn validate_accumulator<'a>(shape: &'a [usize], spec: &MomentSpec) -> MomentResult<&'a [usize]> {
    let mom_ndim = spec.mom_ndim();
    if shape.len() < mom_ndim {
        return Err(MomentError::MissingMomentAxes { ndim: shape.len(), mom_ndim });
    }
    let (batch, trailing) = shape.split_at(shape.len() - mom_ndim);
    let expected = spec.mom_shape();
    if trailing != expected.as_slice() {
        return Err(MomentError::MomentShapeMismatch { expected, actual: trailing.to_vec() });
    }
    Ok(batch)
}

/// Reject negative weights.
///
/// # Errors
/// - [`MomentError::NegativeWeight`] carrying the row-major index of the
///   first negative entry.
pub fn validate_weights(weights: &ArrayViewD<'_, f64>) -> MomentResult<()> {
    match weights.iter().enumerate().find(|(_, w)| **w < 0.0) {
        Some((index, &weight)) => Err(MomentError::NegativeWeight { index, weight }),
        None => Ok(()),
    }
}

/// Batch-shaped view of the weight entries of an accumulator array whose
/// shape has already been checked against `spec`.
pub(crate) fn weight_component<'a>(
    acc: ArrayViewD<'a, f64>, spec: &MomentSpec,
) -> ArrayViewD<'a, f64> {
    let batch_ndim = acc.ndim() - spec.mom_ndim();
    let mut weights = acc;
    for _ in 0..spec.mom_ndim() {
        weights = weights.index_axis_move(Axis(batch_ndim), 0);
    }
    weights
}

/// Reject accumulator arrays holding a negative total weight in any slot.
///
/// # Errors
/// - Shape errors as [`validate_accumulator`].
/// - [`MomentError::NegativeWeight`] with the row-major batch position of
///   the first offending slot.
pub fn validate_accumulator_weights(acc: &ArrayViewD<'_, f64>, spec: &MomentSpec) -> MomentResult<()> {
    validate_accumulator(acc.shape(), spec)?;
    validate_weights(&weight_component(acc.view(), spec))
}

/// Check that removing `removed` from `acc` slot by slot leaves no negative
/// weight. Both arrays must already share one validated shape.
///
/// # Errors
/// - [`MomentError::RemovalExceedsWeight`] for the first slot, in row-major
///   batch order, whose removed weight exceeds its current weight.
pub fn validate_removal(
    acc: &ArrayViewD<'_, f64>, removed: &ArrayViewD<'_, f64>, spec: &MomentSpec,
) -> MomentResult<()> {
    let held = weight_component(acc.view(), spec);
    let taken = weight_component(removed.view(), spec);
    match held.iter().zip(taken.iter()).enumerate().find(|(_, (w, r))| **r > **w) {
        Some((index, (&weight, &removed))) => {
            Err(MomentError::RemovalExceedsWeight { index, weight, removed })
        }
        None => Ok(()),
    }
}

/// Check that `y` values are given exactly when `spec` is bivariate.
pub fn validate_second_variable(spec: &MomentSpec, has_y: bool) -> MomentResult<()> {
    match (spec.is_bivariate(), has_y) {
        (true, false) => Err(MomentError::MissingSecondVariable),
        (false, true) => Err(MomentError::UnexpectedSecondVariable),
        _ => Ok(()),
    }
}

/// Check that `axis < ndim`.
pub fn validate_axis(axis: usize, ndim: usize) -> MomentResult<()> {
    if axis >= ndim {
        return Err(MomentError::AxisOutOfRange { axis, ndim });
    }
    Ok(())
}

/// Check that two accumulator operands have identical shapes.
pub fn validate_same_shape(left: &[usize], right: &[usize]) -> MomentResult<()> {
    if left != right {
        return Err(MomentError::OperandShapeMismatch {
            left: left.to_vec(),
            right: right.to_vec(),
        });
    }
    Ok(())
}
