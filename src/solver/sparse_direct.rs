//! Sparse LU backend on faer.
//!
//! The default backend. Island systems are mostly zeros: each node row holds
//! its neighbours and each supply adds one branch row and column.

use super::cpu::check_dimensions;
use crate::error::{Result, TrainerError};
use crate::sparse::CsrMatrix;
use faer::prelude::*;
use faer::sparse::{SparseColMat, Triplet};

#[derive(Debug, Clone, Copy, Default)]
pub struct SparseLuSolver;

impl SparseLuSolver {
    pub fn new() -> Self {
        Self
    }
}

impl super::LinearSolver for SparseLuSolver {
    fn name(&self) -> &'static str {
        "sparse-lu"
    }

    fn solve_real(&self, a: &CsrMatrix, b: &[f64]) -> Result<Vec<f64>> {
        solve_real_sparse_lu(a, b)
    }
}

/// Copy a CSR matrix into faer's column-major sparse form.
fn to_faer(a: &CsrMatrix) -> Result<SparseColMat<usize, f64>> {
    let triplets = a
        .entries()
        .map(|(row, col, value)| {
            if value.is_finite() {
                Ok(Triplet::new(row, col, value))
            } else {
                Err(TrainerError::Solve(format!("non-finite stamp at ({row}, {col})")))
            }
        })
        .collect::<Result<Vec<_>>>()?;
    SparseColMat::try_new_from_triplets(a.nrows, a.ncols, &triplets)
        .map_err(|e| TrainerError::Solve(format!("sparse matrix build failed: {e:?}")))
}

/// Factor `a` and solve for a single right-hand side.
///
/// A failed factorization or a non-finite result is reported as
/// [`TrainerError::Singular`] so the caller can fall back to rank-revealing
/// elimination.
pub fn solve_real_sparse_lu(a: &CsrMatrix, b: &[f64]) -> Result<Vec<f64>> {
    check_dimensions(a, b)?;
    if a.nrows == 0 {
        return Ok(Vec::new());
    }

    let lu = to_faer(a)?
        .sp_lu()
        .map_err(|e| TrainerError::Singular(format!("sparse LU factorization failed: {e:?}")))?;
    let x = lu.solve(faer::Mat::<f64>::from_fn(b.len(), 1, |i, _| b[i]));

    (0..b.len())
        .map(|i| x[(i, 0)])
        .map(|xi| {
            if xi.is_finite() {
                Ok(xi)
            } else {
                Err(TrainerError::Singular("sparse LU produced a non-finite solution".into()))
            }
        })
        .collect()
}
