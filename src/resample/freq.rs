//! resample::freq — bootstrap and jackknife frequency tables.
//!
//! Purpose
//! -------
//! Build the `(nrep, ndat)` tables that drive replay: entry `[r, s]` is how
//! many times observation `s` enters replicate `r`.
//!
//! Key behaviors
//! -------------
//! - [`random_indices`] draws `(nrep, nsamp)` observation indices with or
//!   without replacement from a `ChaCha8Rng`.
//! - [`indices_to_freq`] counts an index table into a frequency table;
//!   [`random_freq`] composes the two. [`freq_to_indices`] expands a table
//!   of whole counts back into indices, optionally shuffled per row.
//! - [`jackknife_freq`] is the leave-one-out table (`1` everywhere except a
//!   zero diagonal).
//! - [`resample_weights`] is the seeded full-size bootstrap table as `f64`
//!   multipliers.
//!
//! Conventions
//! -----------
//! - Frequencies are stored as `f64` so they can scale weights directly.
//! - Draws are reproducible for a fixed seed and crate version; `seed: None`
//!   seeds from OS entropy.
use crate::resample::{
    errors::{ResampleError, ResampleResult},
    options::ResampleOpts,
};
use log::debug;
use ndarray::{Array2, ArrayView2};
use rand::{
    Rng, SeedableRng,
    seq::{SliceRandom, index::sample},
};
use rand_chacha::ChaCha8Rng;

fn make_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    }
}

/// Random observation indices of shape `(nrep, nsamp)`.
///
/// # Errors
/// - The errors of [`ResampleOpts::validate`].
pub fn random_indices(ndat: usize, opts: &ResampleOpts) -> ResampleResult<Array2<usize>> {
    let nsamp = opts.validate(ndat)?;
    let mut rng = make_rng(opts.seed);
    let mut indices = Array2::<usize>::zeros((opts.nrep, nsamp));
    for mut row in indices.rows_mut() {
        if opts.replace {
            row.iter_mut().for_each(|idx| *idx = rng.gen_range(0..ndat));
        } else {
            let drawn = sample(&mut rng, ndat, nsamp);
            row.iter_mut().zip(drawn.iter()).for_each(|(idx, d)| *idx = d);
        }
    }
    debug!("drew {} x {nsamp} indices from {ndat} observations", opts.nrep);
    Ok(indices)
}

/// Count an index table into a `(nrep, ndat)` frequency table.
///
/// # Errors
/// - [`ResampleError::EmptyData`] if `ndat == 0`.
/// - [`ResampleError::IndexOutOfRange`] for an index `>= ndat`.
pub fn indices_to_freq(indices: ArrayView2<'_, usize>, ndat: usize) -> ResampleResult<Array2<f64>> {
    if ndat == 0 {
        return Err(ResampleError::EmptyData);
    }
    let mut freq = Array2::<f64>::zeros((indices.nrows(), ndat));
    for (rep, row) in indices.rows().into_iter().enumerate() {
        for &value in row {
            if value >= ndat {
                return Err(ResampleError::IndexOutOfRange { rep, value, ndat });
            }
            freq[[rep, value]] += 1.0;
        }
    }
    Ok(freq)
}

/// Expand a frequency table of whole counts into an index table.
///
/// Row `r` of the output lists observation `s` exactly `freq[r, s]` times,
/// in increasing order unless `shuffle` is set, in which case each row is
/// shuffled with a `ChaCha8Rng` seeded from `seed`.
///
/// # Errors
/// - [`ResampleError::InvalidReplicates`] / [`ResampleError::NegativeFrequency`]
///   as for replay.
/// - [`ResampleError::NonIntegerFrequency`] for a fractional or non-finite
///   entry.
/// - [`ResampleError::UnequalReplicateSizes`] if the row sums differ.
pub fn freq_to_indices(
    freq: ArrayView2<'_, f64>, shuffle: bool, seed: Option<u64>,
) -> ResampleResult<Array2<usize>> {
    validate_freq(&freq, freq.ncols())?;
    let mut nsamp = None;
    for (rep, row) in freq.rows().into_iter().enumerate() {
        let mut total = 0;
        for (index, &value) in row.iter().enumerate() {
            if !value.is_finite() || value.fract() != 0.0 {
                return Err(ResampleError::NonIntegerFrequency { rep, index, value });
            }
            total += value as usize;
        }
        match nsamp {
            None => nsamp = Some(total),
            Some(expected) if expected != total => {
                return Err(ResampleError::UnequalReplicateSizes { rep, expected, actual: total });
            }
            Some(_) => {}
        }
    }

    let nsamp = nsamp.unwrap_or(0);
    let mut rng = make_rng(seed);
    let mut indices = Array2::<usize>::zeros((freq.nrows(), nsamp));
    for (mut out, row) in indices.rows_mut().into_iter().zip(freq.rows()) {
        let mut drawn: Vec<usize> = row
            .iter()
            .enumerate()
            .flat_map(|(s, &count)| std::iter::repeat(s).take(count as usize))
            .collect();
        if shuffle {
            drawn.shuffle(&mut rng);
        }
        out.iter_mut().zip(drawn).for_each(|(idx, s)| *idx = s);
    }
    Ok(indices)
}

/// Random bootstrap frequency table of shape `(nrep, ndat)`.
///
/// # Errors
/// - The errors of [`ResampleOpts::validate`].
pub fn random_freq(ndat: usize, opts: &ResampleOpts) -> ResampleResult<Array2<f64>> {
    let indices = random_indices(ndat, opts)?;
    indices_to_freq(indices.view(), ndat)
}

/// Leave-one-out frequency table of shape `(ndat, ndat)`.
///
/// # Errors
/// - [`ResampleError::EmptyData`] if `ndat == 0`.
pub fn jackknife_freq(ndat: usize) -> ResampleResult<Array2<f64>> {
    if ndat == 0 {
        return Err(ResampleError::EmptyData);
    }
    Ok(Array2::from_shape_fn((ndat, ndat), |(r, s)| if r == s { 0.0 } else { 1.0 }))
}

/// Seeded bootstrap weights: `(n_resample, n_obs)` frequency multipliers,
/// each row summing to `n_obs`.
///
/// # Errors
/// - [`ResampleError::InvalidReplicates`] if `n_resample == 0`.
/// - [`ResampleError::EmptyData`] if `n_obs == 0`.
pub fn resample_weights(
    n_obs: usize, n_resample: usize, seed: Option<u64>,
) -> ResampleResult<Array2<f64>> {
    let opts = ResampleOpts { nrep: n_resample, nsamp: None, seed, replace: true };
    random_freq(n_obs, &opts)
}

/// Check a frequency table against `ndat` observations.
pub(crate) fn validate_freq(freq: &ArrayView2<'_, f64>, ndat: usize) -> ResampleResult<()> {
    if freq.ncols() != ndat {
        return Err(ResampleError::FreqShapeMismatch { expected: ndat, actual: freq.ncols() });
    }
    if freq.nrows() == 0 {
        return Err(ResampleError::InvalidReplicates { nrep: 0 });
    }
    if let Some(((rep, index), &value)) = freq.indexed_iter().find(|(_, v)| **v < 0.0) {
        return Err(ResampleError::NegativeFrequency { rep, index, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Axis, array};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Reproducibility and row sums of seeded draws.
    // - Without-replacement draws being permutations.
    // - Index counting, jackknife layout and table validation.
    // - Expanding count tables back into indices.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Ensure seeded weights are reproducible and sum to `n_obs` per row.
    //
    // Given
    // -----
    // - `resample_weights(7, 20, Some(42))` drawn twice, and with seed 43.
    //
    // Expect
    // ------
    // - The two seed-42 tables are identical; every row sums to 7; the
    //   seed-43 table differs.
    fn resample_weights_reproducible_and_row_sums() {
        // Act
        let a = resample_weights(7, 20, Some(42)).unwrap();
        let b = resample_weights(7, 20, Some(42)).unwrap();
        let c = resample_weights(7, 20, Some(43)).unwrap();

        // Assert
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.dim(), (20, 7));
        assert!(a.sum_axis(Axis(1)).iter().all(|&s| s == 7.0));
    }

    #[test]
    // Purpose
    // -------
    // Check sampling without replacement draws distinct indices.
    //
    // Given
    // -----
    // - `ndat = 6`, full-size draws without replacement, 5 replicates.
    //
    // Expect
    // ------
    // - Every frequency entry equals 1.
    fn random_freq_without_replacement_is_permutation() {
        // Arrange
        let opts = ResampleOpts::new(5).with_seed(1).with_replace(false);

        // Act
        let freq = random_freq(6, &opts).unwrap();

        // Assert
        assert!(freq.iter().all(|&f| f == 1.0));
    }

    #[test]
    // Purpose
    // -------
    // Verify index counting, the jackknife table and table validation.
    //
    // Given
    // -----
    // - Indices `[[0, 0, 2], [1, 2, 3]]` with `ndat = 4`; an index equal to
    //   `ndat`; a negative frequency.
    //
    // Expect
    // ------
    // - Counted rows `[2, 0, 1, 0]` and `[0, 1, 1, 1]`; `IndexOutOfRange`;
    //   `NegativeFrequency`; jackknife has a zero diagonal.
    fn frequency_tables_count_and_validate() {
        // Arrange
        let indices = array![[0usize, 0, 2], [1, 2, 3]];
        let bad = array![[0usize, 4]];
        let negative = array![[1.0, -1.0]];

        // Act
        let freq = indices_to_freq(indices.view(), 4).unwrap();
        let out_of_range = indices_to_freq(bad.view(), 4);
        let jack = jackknife_freq(3).unwrap();

        // Assert
        assert_eq!(freq, array![[2.0, 0.0, 1.0, 0.0], [0.0, 1.0, 1.0, 1.0]]);
        assert_eq!(out_of_range, Err(ResampleError::IndexOutOfRange { rep: 0, value: 4, ndat: 4 }));
        assert_eq!(jack, array![[0.0, 1.0, 1.0], [1.0, 0.0, 1.0], [1.0, 1.0, 0.0]]);
        assert_eq!(
            validate_freq(&negative.view(), 2),
            Err(ResampleError::NegativeFrequency { rep: 0, index: 1, value: -1.0 })
        );
        assert_eq!(
            validate_freq(&negative.view(), 3),
            Err(ResampleError::FreqShapeMismatch { expected: 3, actual: 2 })
        );
    }

    #[test]
    // Purpose
    // -------
    // Check that count tables expand back into matching index tables.
    //
    // Given
    // -----
    // - A seeded `(8, 5)` bootstrap table; the table `[[2, 0, 1], [0, 3, 0]]`;
    //   tables with a fractional entry and with unequal row sums.
    //
    // Expect
    // ------
    // - Shuffled indices count back to the seeded table; the unshuffled
    //   expansion is sorted per row; the bad tables are rejected.
    fn freq_to_indices_inverts_counting() {
        // Arrange
        let freq = random_freq(5, &ResampleOpts::new(8).with_seed(11)).unwrap();
        let small = array![[2.0, 0.0, 1.0], [0.0, 3.0, 0.0]];
        let fractional = array![[1.5, 0.5]];
        let unequal = array![[1.0, 1.0], [0.0, 1.0]];

        // Act
        let shuffled = freq_to_indices(freq.view(), true, Some(3)).unwrap();
        let sorted = freq_to_indices(small.view(), false, None).unwrap();

        // Assert
        assert_eq!(shuffled.dim(), (8, 5));
        assert_eq!(indices_to_freq(shuffled.view(), 5).unwrap(), freq);
        assert_eq!(sorted, array![[0usize, 0, 2], [1, 1, 1]]);
        assert_eq!(
            freq_to_indices(fractional.view(), false, None),
            Err(ResampleError::NonIntegerFrequency { rep: 0, index: 0, value: 1.5 })
        );
        assert_eq!(
            freq_to_indices(unequal.view(), false, None),
            Err(ResampleError::UnequalReplicateSizes { rep: 1, expected: 2, actual: 1 })
        );
    }
}
