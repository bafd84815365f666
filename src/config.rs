//! Engine configuration.
//!
//! Defaults match the original 10 x 10 trainer board. A TOML file can
//! override any field:
//!
//! ```toml
//! rows = 12
//! cols = 16
//! solver = "dense"
//! pivot_tolerance = 1e-12
//! consistency_tolerance = 1e-9
//! ```

use crate::error::{Result, TrainerError};
use crate::solver::cpu::{CpuSolver, DEFAULT_PIVOT_TOLERANCE};
use crate::solver::sparse_direct::SparseLuSolver;
use crate::solver::LinearSolver;
use serde::Deserialize;
use std::path::Path;

/// Largest number of rows or columns a board may have.
pub const MAX_BOARD_SIDE: u32 = 1024;

/// Linear backend used for island systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SolverKind {
    /// Dense Gaussian elimination with partial pivoting.
    Dense,
    /// Sparse LU factorization.
    #[default]
    SparseLu,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainerConfig {
    pub rows: u32,
    pub cols: u32,
    pub solver: SolverKind,
    /// Relative pivot threshold for rank-revealing elimination.
    pub pivot_tolerance: f64,
    /// Largest residual of any circuit equation, relative to the size of
    /// its terms, tolerated before supplies are declared inconsistent.
    pub consistency_tolerance: f64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            rows: 10,
            cols: 10,
            solver: SolverKind::SparseLu,
            pivot_tolerance: DEFAULT_PIVOT_TOLERANCE,
            consistency_tolerance: 1e-9,
        }
    }
}

impl TrainerConfig {
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: TrainerConfig = toml::from_str(input).map_err(|e| TrainerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.rows == 0 || self.cols == 0 {
            return Err(TrainerError::Config(format!(
                "board must have at least one cell, got {}x{}",
                self.rows, self.cols
            )));
        }
        if self.rows > MAX_BOARD_SIDE || self.cols > MAX_BOARD_SIDE {
            return Err(TrainerError::Config(format!(
                "board sides are limited to {MAX_BOARD_SIDE} cells, got {}x{}",
                self.rows, self.cols
            )));
        }
        for (name, value) in [
            ("pivot_tolerance", self.pivot_tolerance),
            ("consistency_tolerance", self.consistency_tolerance),
        ] {
            if !(value > 0.0 && value < 1.0) {
                return Err(TrainerError::Config(format!("{name} must lie strictly between 0 and 1, got {value}")));
            }
        }
        Ok(())
    }

    pub fn linear_solver(&self) -> Box<dyn LinearSolver> {
        match self.solver {
            SolverKind::Dense => Box::new(CpuSolver::with_pivot_tolerance(self.pivot_tolerance)),
            SolverKind::SparseLu => Box::new(SparseLuSolver::new()),
        }
    }
}
