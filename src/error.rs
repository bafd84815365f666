use crate::ir::Cell;
use thiserror::Error;

/// Kind tag of a rejected topology request, as reported to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopologyErrorKind {
    OccupiedCell,
    NonColinearWire,
    OutOfBounds,
    InvalidComponentValue,
}

/// A rejected placement or wiring request. The board is left unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TopologyError {
    #[error("cell {0} already holds a component")]
    OccupiedCell(Cell),

    #[error("wire {a} -> {b} must be a straight horizontal or vertical run")]
    NonColinearWire { a: Cell, b: Cell },

    #[error("cell {cell} is outside the {rows}x{cols} board")]
    OutOfBounds { cell: Cell, rows: u32, cols: u32 },

    #[error("{component} at {cell} has invalid value {value}")]
    InvalidComponentValue {
        cell: Cell,
        component: &'static str,
        value: f64,
    },
}

impl TopologyError {
    pub fn kind(&self) -> TopologyErrorKind {
        match self {
            TopologyError::OccupiedCell(_) => TopologyErrorKind::OccupiedCell,
            TopologyError::NonColinearWire { .. } => TopologyErrorKind::NonColinearWire,
            TopologyError::OutOfBounds { .. } => TopologyErrorKind::OutOfBounds,
            TopologyError::InvalidComponentValue { .. } => TopologyErrorKind::InvalidComponentValue,
        }
    }

    /// The cell the UI should highlight, if any.
    pub fn cell(&self) -> Option<Cell> {
        match self {
            TopologyError::OccupiedCell(cell)
            | TopologyError::OutOfBounds { cell, .. }
            | TopologyError::InvalidComponentValue { cell, .. } => Some(*cell),
            TopologyError::NonColinearWire { b, .. } => Some(*b),
        }
    }
}

#[derive(Debug, Error)]
pub enum TrainerError {
    #[error("Topology error: {0}")]
    Topology(#[from] TopologyError),

    #[error("Invalid component value: {0}")]
    InvalidComponentValue(String),

    #[error("Inconsistent sources: {0}")]
    InconsistentSource(String),

    #[error("Singular system: {0}")]
    Singular(String),

    #[error("Solve error: {0}")]
    Solve(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TrainerError>;
