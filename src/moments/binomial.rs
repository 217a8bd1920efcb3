//! Binomial coefficient lookup table for the moment recurrences.
//!
//! Purpose
//! -------
//! Precompute `C(n, k)` for `0 ≤ k ≤ n ≤ max_order` once per driver call so
//! that the per-slot Combine and conversion kernels only do table lookups.
//!
//! Conventions
//! -----------
//! - Coefficients come from `statrs::function::factorial::binomial`, which
//!   rounds the factorial ratio to the nearest integer; the table therefore
//!   holds exact integers for every order this crate supports.
//! - Storage is a dense lower-triangular `Array2<f64>`; `C(n, k)` with
//!   `k > n` reads as `0.0`.
use ndarray::Array2;
use statrs::function::factorial::binomial;

/// Dense table of binomial coefficients `C(n, k)` for `n, k ≤ max_order`.
#[derive(Debug, Clone, PartialEq)]
pub struct BinomialTable {
    table: Array2<f64>,
}

impl BinomialTable {
    /// Build the table for all `n ≤ max_order`.
    pub fn new(max_order: usize) -> Self {
        let size = max_order + 1;
        let table = Array2::from_shape_fn((size, size), |(n, k)| {
            if k > n { 0.0 } else { binomial(n as u64, k as u64) }
        });
        BinomialTable { table }
    }

    /// Largest `n` stored.
    pub fn max_order(&self) -> usize {
        self.table.nrows() - 1
    }

    /// `C(n, k)`. Panics if `n` exceeds [`BinomialTable::max_order`].
    #[inline]
    pub fn get(&self, n: usize, k: usize) -> f64 {
        self.table[[n, k]]
    }
}
