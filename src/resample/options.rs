//! resample::options — configuration of random resampling draws.
//!
//! [`ResampleOpts`] bundles the replicate count, the per-replicate sample
//! size, the RNG seed and the replacement policy. A fixed `seed` makes every
//! draw reproducible (`ChaCha8Rng::seed_from_u64`); `None` seeds from OS
//! entropy.
use crate::resample::errors::{ResampleError, ResampleResult};

/// ResampleOpts — how bootstrap replicates are drawn.
///
/// Fields
/// ------
/// - `nrep`: number of replicates (rows of the frequency table).
/// - `nsamp`: draws per replicate; `None` means one per observation.
/// - `seed`: RNG seed; `None` draws from OS entropy.
/// - `replace`: sample with (`true`, classical bootstrap) or without
///   replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResampleOpts {
    pub nrep: usize,
    pub nsamp: Option<usize>,
    pub seed: Option<u64>,
    pub replace: bool,
}

impl ResampleOpts {
    /// Bootstrap with replacement, `nrep` replicates of full size.
    pub fn new(nrep: usize) -> Self {
        ResampleOpts { nrep, ..ResampleOpts::default() }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_nsamp(mut self, nsamp: usize) -> Self {
        self.nsamp = Some(nsamp);
        self
    }

    pub fn with_replace(mut self, replace: bool) -> Self {
        self.replace = replace;
        self
    }

    /// Check the options against `ndat` observations and return the
    /// per-replicate sample size.
    ///
    /// # Errors
    /// - [`ResampleError::InvalidReplicates`] if `nrep == 0`.
    /// - [`ResampleError::EmptyData`] if `ndat == 0`.
    /// - [`ResampleError::InvalidSampleSize`] if sampling without replacement
    ///   asks for more than `ndat` draws.
    pub fn validate(&self, ndat: usize) -> ResampleResult<usize> {
        if self.nrep == 0 {
            return Err(ResampleError::InvalidReplicates { nrep: self.nrep });
        }
        if ndat == 0 {
            return Err(ResampleError::EmptyData);
        }
        let nsamp = self.nsamp.unwrap_or(ndat);
        if !self.replace && nsamp > ndat {
            return Err(ResampleError::InvalidSampleSize { nsamp, ndat });
        }
        Ok(nsamp)
    }
}

impl Default for ResampleOpts {
    fn default() -> Self {
        ResampleOpts { nrep: 100, nsamp: None, seed: None, replace: true }
    }
}
