//! resample — bootstrap and jackknife replicates of central moments.
//!
//! Purpose
//! -------
//! Build frequency tables and replay data or accumulators through them to
//! produce one accumulator per replicate.
//!
//! Key behaviors
//! -------------
//! - [`freq`]: seeded index and frequency tables ([`random_indices`],
//!   [`random_freq`], [`indices_to_freq`], [`freq_to_indices`],
//!   [`jackknife_freq`], [`resample_weights`]).
//! - [`replay`]: [`resample_data`], [`resample_vals`], [`jackknife_data`],
//!   [`jackknife_vals`].
//! - [`options`]: [`ResampleOpts`] for drawing tables.
//!
//! Conventions
//! -----------
//! - Frequency tables have shape `(nrep, ndat)` and hold non-negative `f64`
//!   multipliers.
//! - Errors are [`ResampleError`]; accumulator errors arrive wrapped in
//!   [`ResampleError::Moment`].

pub mod errors;
pub mod freq;
pub mod options;
pub mod replay;

pub use self::errors::{ResampleError, ResampleResult};
pub use self::freq::{
    freq_to_indices, indices_to_freq, jackknife_freq, random_freq, random_indices, resample_weights,
};
pub use self::options::ResampleOpts;
pub use self::replay::{jackknife_data, jackknife_vals, resample_data, resample_vals};
