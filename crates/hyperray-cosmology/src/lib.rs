//! Background cosmology lookup table.
//!
//! Production of the table (fitting it from a background-cosmology solve)
//! is an external collaborator's job; this crate owns only its shape and
//! its lookups, since the geodesic integrator needs `(da/dt)[t]` at every
//! step.

use std::fs;
use std::path::Path;

use hyperray_kernels::{hermite_cubic, linear_interpolate};
use thiserror::Error;

/// Errors loading or querying a [`CosmologyTable`].
#[derive(Error, Debug)]
pub enum CosmologyError {
    #[error("I/O error reading cosmology table: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed cosmology table row {0}: {1:?}")]
    MalformedRow(usize, String),

    #[error("cosmology table columns have mismatched lengths")]
    MismatchedColumns,

    #[error("cosmology table has fewer than two rows")]
    TooShort,
}

/// Four equal-length arrays tabulating the background expansion: conformal
/// time `t`, scale factor `a(t)`, its time derivative `da/dt`, and
/// conformal time as a function of `a` (the same `t` column, re-sorted by
/// `a` for inversion).
#[derive(Clone, Debug)]
pub struct CosmologyTable {
    t: Vec<f64>,
    a: Vec<f64>,
    dadt: Vec<f64>,
    a_sorted: Vec<f64>,
    t_by_a: Vec<f64>,
}

impl CosmologyTable {
    /// Builds a table directly from its columns. `t` and `a` must both be
    /// monotone increasing.
    pub fn from_columns(t: Vec<f64>, a: Vec<f64>, dadt: Vec<f64>) -> Result<Self, CosmologyError> {
        if t.len() != a.len() || t.len() != dadt.len() {
            return Err(CosmologyError::MismatchedColumns);
        }
        if t.len() < 2 {
            return Err(CosmologyError::TooShort);
        }
        let mut order: Vec<usize> = (0..a.len()).collect();
        order.sort_by(|&i, &j| a[i].partial_cmp(&a[j]).unwrap_or(std::cmp::Ordering::Equal));
        let a_sorted = order.iter().map(|&i| a[i]).collect();
        let t_by_a = order.iter().map(|&i| t[i]).collect();
        Ok(CosmologyTable { t, a, dadt, a_sorted, t_by_a })
    }

    /// Loads a whitespace-separated plain-text table, one row per sample,
    /// columns `t a dadt` in that order. Blank lines and lines starting
    /// with `#` are skipped, matching the other flat external inputs in
    /// this system (the parameter file, the trajectory/statistics
    /// writers).
    pub fn load(path: &Path) -> Result<Self, CosmologyError> {
        let text = fs::read_to_string(path)?;
        let mut t = Vec::new();
        let mut a = Vec::new();
        let mut dadt = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let cols: Vec<&str> = line.split_whitespace().collect();
            if cols.len() != 3 {
                return Err(CosmologyError::MalformedRow(lineno, line.to_string()));
            }
            let parse = |s: &str| {
                s.parse::<f64>()
                    .map_err(|_| CosmologyError::MalformedRow(lineno, line.to_string()))
            };
            t.push(parse(cols[0])?);
            a.push(parse(cols[1])?);
            dadt.push(parse(cols[2])?);
        }
        Self::from_columns(t, a, dadt)
    }

    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    /// Scale factor `a` at conformal time `t`, linearly interpolated.
    pub fn a_at_t(&self, t: f64) -> f64 {
        linear_interpolate(&self.t, &self.a, t)
    }

    /// `da/dt` at conformal time `t`, using the tabulated derivative column
    /// blended by cubic Hermite interpolation against `a(t)` so the result
    /// stays consistent with `a_at_t`'s slope.
    pub fn dadt_at_t(&self, t: f64) -> f64 {
        hermite_cubic(&self.t, &self.dadt, &self.second_derivative_estimate(), t)
    }

    /// Conformal time `t` at scale factor `a`, by inverting the table
    /// (sorted by `a`).
    pub fn t_at_a(&self, a: f64) -> f64 {
        linear_interpolate(&self.a_sorted, &self.t_by_a, a)
    }

    /// Conformal time at scale factor `a` — an alias for [`Self::t_at_a`]
    /// kept as a separate name for call sites that think in terms of `a`
    /// rather than inverting a table. Currently unused outside tests; kept
    /// for the homogeneous-reference distance computation to reach for
    /// once it needs an `a`-indexed rather than `t`-indexed lookup.
    pub fn conformal_time_at_a(&self, a: f64) -> f64 {
        self.t_at_a(a)
    }

    /// A crude second-derivative estimate of `dadt` with respect to `t`,
    /// used only to give [`hermite_cubic`] a slope to work with; central
    /// differences in the interior, one-sided at the ends.
    fn second_derivative_estimate(&self) -> Vec<f64> {
        hyperray_kernels::derive(&self.t, &self.dadt)
    }
}
