//! CPU direct solver using Gaussian elimination with partial pivoting.
//!
//! Converts CSR to dense; island systems on a trainer board are small.
//! Also hosts the rank-revealing elimination used for degenerate systems
//! (loops of supplies), which tells a redundant system apart from a
//! contradictory one.

use crate::error::{Result, TrainerError};
use crate::sparse::CsrMatrix;

/// Pivots below this (relative to the largest entry of their column) count
/// as zero.
pub const DEFAULT_PIVOT_TOLERANCE: f64 = 1e-12;

/// CPU-based dense direct solver.
#[derive(Debug, Clone, Copy)]
pub struct CpuSolver {
    pivot_tolerance: f64,
}

impl CpuSolver {
    pub fn new() -> Self {
        Self {
            pivot_tolerance: DEFAULT_PIVOT_TOLERANCE,
        }
    }

    pub fn with_pivot_tolerance(pivot_tolerance: f64) -> Self {
        Self { pivot_tolerance }
    }
}

impl Default for CpuSolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of rank-revealing elimination.
#[derive(Debug, Clone)]
pub struct Echelon {
    /// A solution with every pivot-free unknown fixed to 0.
    pub x: Vec<f64>,
    pub rank: usize,
    /// Largest right-hand side left in the rows with no pivot. Zero (up to
    /// rounding) for a consistent system.
    pub residual: f64,
}

pub(crate) fn check_dimensions(a: &CsrMatrix, b: &[f64]) -> Result<()> {
    if a.ncols != a.nrows || b.len() != a.nrows {
        return Err(TrainerError::Solve(format!(
            "dimension mismatch: matrix is {}x{}, rhs length is {}",
            a.nrows,
            a.ncols,
            b.len()
        )));
    }
    Ok(())
}

fn augmented(a: &CsrMatrix, b: &[f64]) -> Vec<Vec<f64>> {
    a.to_dense()
        .into_iter()
        .zip(b)
        .map(|(mut row, &bi)| {
            row.push(bi);
            row
        })
        .collect()
}

/// Largest magnitude in each column of `a`.
fn column_scales(a: &CsrMatrix) -> Vec<f64> {
    let mut scales = vec![0.0_f64; a.ncols];
    for (_, c, v) in a.entries() {
        scales[c] = scales[c].max(v.abs());
    }
    scales
}

/// Row-reduce `[A | b]`, skipping columns with no usable pivot.
///
/// A pivot is judged against its own column, so a node tied to the rest of
/// the circuit only through very large resistances keeps its pivot next to
/// unit source rows.
pub fn eliminate_rank_revealing(a: &CsrMatrix, b: &[f64], pivot_tolerance: f64) -> Result<Echelon> {
    check_dimensions(a, b)?;
    let n = a.nrows;
    let column_tol: Vec<f64> = column_scales(a).into_iter().map(|s| pivot_tolerance * s).collect();
    let mut aug = augmented(a, b);
    let mut pivots: Vec<usize> = Vec::with_capacity(n);

    for col in 0..n {
        let row = pivots.len();
        if row == n {
            break;
        }
        let (max_row, max_val) = (row..n)
            .map(|i| (i, aug[i][col].abs()))
            .fold((row, 0.0), |best, cur| if cur.1 > best.1 { cur } else { best });
        if max_val <= column_tol[col] {
            continue;
        }
        aug.swap(row, max_row);
        let pivot = aug[row][col];
        for i in (row + 1)..n {
            let factor = aug[i][col] / pivot;
            if factor == 0.0 {
                continue;
            }
            aug[i][col] = 0.0;
            for j in (col + 1)..=n {
                aug[i][j] -= factor * aug[row][j];
            }
        }
        pivots.push(col);
    }

    let rank = pivots.len();
    let residual = aug[rank..].iter().fold(0.0_f64, |acc, row| acc.max(row[n].abs()));

    let mut x = vec![0.0; n];
    for (row, &col) in pivots.iter().enumerate().rev() {
        let mut sum = aug[row][n];
        for j in (col + 1)..n {
            sum -= aug[row][j] * x[j];
        }
        x[col] = sum / aug[row][col];
    }

    Ok(Echelon { x, rank, residual })
}

impl super::LinearSolver for CpuSolver {
    fn name(&self) -> &'static str {
        "dense"
    }

    fn solve_real(&self, a: &CsrMatrix, b: &[f64]) -> Result<Vec<f64>> {
        let echelon = eliminate_rank_revealing(a, b, self.pivot_tolerance)?;
        if echelon.rank < a.nrows {
            return Err(TrainerError::Singular(format!(
                "singular matrix: rank {} of {}",
                echelon.rank, a.nrows
            )));
        }
        Ok(echelon.x)
    }
}
