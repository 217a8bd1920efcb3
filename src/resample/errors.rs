//! resample::errors — failures raised while building or replaying
//! resampling frequency tables.
//!
//! Purpose
//! -------
//! Provide [`ResampleError`] and [`ResampleResult`] for the bootstrap and
//! jackknife drivers. Errors of the underlying accumulator drivers are
//! wrapped through `From<MomentError>` so `?` works across both layers.
//!
//! Conventions
//! -----------
//! - `rep` indices refer to rows of a `(nrep, ndat)` frequency or index
//!   table; `index` refers to columns (observations).
use crate::moments::errors::MomentError;

/// Result alias for resampling operations.
pub type ResampleResult<T> = Result<T, ResampleError>;

/// ResampleError — invalid resampling configuration or tables.
///
/// Variants
/// --------
/// - `InvalidReplicates { nrep }`
///   Zero replicates were requested.
/// - `InvalidSampleSize { nsamp, ndat }`
///   Sampling without replacement asked for more draws than observations.
/// - `EmptyData`
///   There are no observations to resample.
/// - `FreqShapeMismatch { expected, actual }`
///   The frequency table does not have one column per observation.
/// - `IndexOutOfRange { rep, value, ndat }`
///   An index table entry is not a valid observation index.
/// - `NegativeFrequency { rep, index, value }`
///   A frequency table entry is negative.
/// - `NonIntegerFrequency { rep, index, value }`
///   A count is required but the entry is not a whole number.
/// - `UnequalReplicateSizes { rep, expected, actual }`
///   Replicate `rep` draws a different number of samples than replicate 0.
/// - `Moment(MomentError)`
///   Propagated accumulator error (shape, axis, weights).
#[derive(Debug, Clone, PartialEq)]
pub enum ResampleError {
    InvalidReplicates { nrep: usize },
    InvalidSampleSize { nsamp: usize, ndat: usize },
    EmptyData,
    FreqShapeMismatch { expected: usize, actual: usize },
    IndexOutOfRange { rep: usize, value: usize, ndat: usize },
    NegativeFrequency { rep: usize, index: usize, value: f64 },
    NonIntegerFrequency { rep: usize, index: usize, value: f64 },
    UnequalReplicateSizes { rep: usize, expected: usize, actual: usize },
    Moment(MomentError),
}

impl std::error::Error for ResampleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResampleError::Moment(err) => Some(err),
            _ => None,
        }
    }
}

impl std::fmt::Display for ResampleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResampleError::InvalidReplicates { nrep } => {
                write!(f, "Number of replicates must be positive; got {nrep}")
            }
            ResampleError::InvalidSampleSize { nsamp, ndat } => {
                write!(f, "Cannot draw {nsamp} samples without replacement from {ndat} observations.")
            }
            ResampleError::EmptyData => write!(f, "No observations to resample."),
            ResampleError::FreqShapeMismatch { expected, actual } => {
                write!(f, "Frequency table has {actual} columns, expected {expected} (one per observation)")
            }
            ResampleError::IndexOutOfRange { rep, value, ndat } => {
                write!(f, "Replicate {rep} references observation {value}, outside 0..{ndat}")
            }
            ResampleError::NegativeFrequency { rep, index, value } => {
                write!(f, "Negative frequency {value} at replicate {rep}, observation {index}")
            }
            ResampleError::NonIntegerFrequency { rep, index, value } => {
                write!(f, "Frequency {value} at replicate {rep}, observation {index} is not a count")
            }
            ResampleError::UnequalReplicateSizes { rep, expected, actual } => {
                write!(f, "Replicate {rep} draws {actual} samples, expected {expected}")
            }
            ResampleError::Moment(err) => write!(f, "Accumulator error: {err}"),
        }
    }
}

impl From<MomentError> for ResampleError {
    fn from(err: MomentError) -> Self {
        ResampleError::Moment(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    // Purpose
    // -------
    // Ensure moment errors convert and remain reachable as the source.
    //
    // Given
    // -----
    // - `MomentError::AxisOutOfRange { axis: 3, ndim: 2 }`.
    //
    // Expect
    // ------
    // - `From` yields `ResampleError::Moment`; `source()` is `Some` and the
    //   message embeds the inner message.
    fn resample_error_wraps_moment_error() {
        // Arrange
        let inner = MomentError::AxisOutOfRange { axis: 3, ndim: 2 };

        // Act
        let err: ResampleError = inner.clone().into();

        // Assert
        assert_eq!(err, ResampleError::Moment(inner.clone()));
        assert!(err.source().is_some());
        assert!(err.to_string().contains(&inner.to_string()));
    }
}
