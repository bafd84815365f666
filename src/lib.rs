//! Circuit trainer engine.
//!
//! Models a grid trainer board: components and wires are placed on cells,
//! the board is resolved into electrical nodes, solved by modified nodal
//! analysis and read back through a two-probe meter.

pub mod analysis;
pub mod board;
pub mod compiler;
pub mod config;
pub mod engine;
pub mod error;
pub mod ir;
pub mod measure;
pub mod output;
pub mod parser;
pub mod resolver;
pub mod session;
pub mod solver;
pub mod sparse;
pub mod stats;

pub use engine::Engine;
pub use error::{Result, TopologyError, TrainerError};
pub use measure::{MeasurementResult, UndefinedMeasurement};
pub use session::Session;
