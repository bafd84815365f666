//! Linear system solvers.

pub mod cpu;
pub mod sparse_direct;

use crate::error::Result;
use crate::sparse::CsrMatrix;

/// A solver for real linear systems Ax = b.
///
/// Implementations report a structurally or numerically singular matrix as
/// [`TrainerError::Singular`](crate::error::TrainerError::Singular) so the
/// caller can fall back to rank-revealing elimination.
pub trait LinearSolver {
    fn name(&self) -> &'static str;

    fn solve_real(&self, a: &CsrMatrix, b: &[f64]) -> Result<Vec<f64>>;
}
