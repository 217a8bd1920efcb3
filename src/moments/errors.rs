//! moments::errors — shape and domain errors for moment accumulators.
//!
//! Purpose
//! -------
//! Provide the error enum and result alias shared by the moment kernels,
//! the vectorized drivers in `reduction`, and the owned
//! [`CentralMoments`](crate::moments::CentralMoments) wrapper.
//!
//! Key behaviors
//! -------------
//! - Define [`MomentError`] and [`MomentResult`] as the canonical error and
//!   result types for every operation that touches an accumulator array.
//! - Group variants into two families: *shape* errors (order, trailing
//!   moment axes, operand or broadcast mismatches, axis and label ranges)
//!   and *domain* errors (negative weights or scale factors, over-removal).
//!   Callers can classify a value with [`MomentError::is_shape_error`] /
//!   [`MomentError::is_domain_error`].
//! - Attach `Display` messages that embed the offending payload.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every public driver validates before mutating. A returned error means
//!   the caller's accumulator was left untouched.
//! - Numeric degeneracy (zero-weight reads, NaN inputs) is *not* an error;
//!   it propagates as NaN per slot.
//!
//! Conventions
//! -----------
//! - Shapes are reported as `Vec<usize>` in row-major axis order.
//! - Axis indices are 0-based and refer to the array named in the variant.
//!
//! Testing notes
//! -------------
//! - Unit tests check the family classifiers and that `Display` embeds the
//!   payload of representative variants.

/// Result alias for moment operations that may produce [`MomentError`].
pub type MomentResult<T> = Result<T, MomentError>;

/// MomentError — failures raised by moment accumulation and combination.
///
/// Variants
/// --------
/// Shape family:
/// - `InvalidOrder { order, reason }`
///   A requested moment order is unusable (e.g. `order == 0`).
/// - `MissingMomentAxes { ndim, mom_ndim }`
///   The array has fewer axes than the `MomentSpec` moment axes.
/// - `MomentShapeMismatch { expected, actual }`
///   The trailing moment axes do not match `order + 1`.
/// - `OperandShapeMismatch { left, right }`
///   Two accumulators passed to a binary operation differ in shape.
/// - `NotBroadcastable { name, from, to }`
///   An input array cannot be broadcast onto the batch shape.
/// - `AxisOutOfRange { axis, ndim }`
///   A reduction or sample axis does not exist.
/// - `MissingSecondVariable` / `UnexpectedSecondVariable`
///   The presence of `y` values disagrees with the `MomentSpec`.
/// - `GroupOutOfRange { index, group, ngroup }`
///   A group label points outside `0..ngroup`.
/// - `LengthMismatch { name, expected, actual }`
///   A 1-D side input (labels, frequencies) has the wrong length.
/// - `InvalidWindow { window }`
///   A rolling window of zero observations was requested.
///
/// Domain family:
/// - `NegativeWeight { index, weight }`
///   A pushed observation or merged operand carries a weight below zero;
///   `index` is the flat row-major position of the first offender in the
///   weight array as given.
/// - `InvalidScale { factor }`
///   A scale factor is negative or not finite.
/// - `RemovalExceedsWeight { index, weight, removed }`
///   Subtracting an accumulator would leave a slot with negative weight.
#[derive(Debug, Clone, PartialEq)]
pub enum MomentError {
    // ---- Shape ----
    InvalidOrder { order: usize, reason: &'static str },
    MissingMomentAxes { ndim: usize, mom_ndim: usize },
    MomentShapeMismatch { expected: Vec<usize>, actual: Vec<usize> },
    OperandShapeMismatch { left: Vec<usize>, right: Vec<usize> },
    NotBroadcastable { name: &'static str, from: Vec<usize>, to: Vec<usize> },
    AxisOutOfRange { axis: usize, ndim: usize },
    MissingSecondVariable,
    UnexpectedSecondVariable,
    GroupOutOfRange { index: usize, group: usize, ngroup: usize },
    LengthMismatch { name: &'static str, expected: usize, actual: usize },
    InvalidWindow { window: usize },

    // ---- Domain ----
    NegativeWeight { index: usize, weight: f64 },
    InvalidScale { factor: f64 },
    RemovalExceedsWeight { index: usize, weight: f64, removed: f64 },
}

impl MomentError {
    /// `true` for every variant in the shape family.
    pub fn is_shape_error(&self) -> bool {
        !self.is_domain_error()
    }

    /// `true` for variants describing invalid numeric inputs.
    pub fn is_domain_error(&self) -> bool {
        matches!(
            self,
            MomentError::NegativeWeight { .. }
                | MomentError::InvalidScale { .. }
                | MomentError::RemovalExceedsWeight { .. }
        )
    }
}

impl std::error::Error for MomentError {}

impl std::fmt::Display for MomentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Shape ----
            MomentError::InvalidOrder { order, reason } => {
                write!(f, "Invalid moment order {order}: {reason}")
            }
            MomentError::MissingMomentAxes { ndim, mom_ndim } => {
                write!(f, "Array has {ndim} axes but {mom_ndim} trailing moment axes are required.")
            }
            MomentError::MomentShapeMismatch { expected, actual } => {
                write!(f, "Moment axes mismatch: expected trailing shape {expected:?}, got {actual:?}")
            }
            MomentError::OperandShapeMismatch { left, right } => {
                write!(f, "Accumulator shapes differ: {left:?} vs {right:?}")
            }
            MomentError::NotBroadcastable { name, from, to } => {
                write!(f, "Cannot broadcast `{name}` from shape {from:?} to {to:?}")
            }
            MomentError::AxisOutOfRange { axis, ndim } => {
                write!(f, "Axis {axis} is out of range for {ndim} available axes.")
            }
            MomentError::MissingSecondVariable => {
                write!(f, "Bivariate moments require `y` values, none were given.")
            }
            MomentError::UnexpectedSecondVariable => {
                write!(f, "Univariate moments do not accept `y` values.")
            }
            MomentError::GroupOutOfRange { index, group, ngroup } => {
                write!(f, "Group label {group} at index {index} is outside 0..{ngroup}")
            }
            MomentError::LengthMismatch { name, expected, actual } => {
                write!(f, "`{name}` length mismatch: expected {expected}, got {actual}")
            }
            MomentError::InvalidWindow { window } => {
                write!(f, "Rolling window must hold at least one observation; got {window}")
            }
            // ---- Domain ----
            MomentError::NegativeWeight { index, weight } => {
                write!(f, "Weight at flat index {index} is negative: {weight}")
            }
            MomentError::InvalidScale { factor } => {
                write!(f, "Scale factor must be finite and non-negative; got {factor}")
            }
            MomentError::RemovalExceedsWeight { index, weight, removed } => {
                write!(f, "Cannot remove weight {removed} from slot {index} holding {weight}")
            }
        }
    }
}
