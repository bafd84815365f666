//! The topology and measurement engine.
//!
//! Owns the board and a lazily computed [`Solution`]. Every mutation that
//! actually changes the board drops the cached solution; the next
//! measurement resolves nodes, builds the model and solves it again.

use crate::analysis::{dc, Solution};
use crate::board::Board;
use crate::compiler;
use crate::config::TrainerConfig;
use crate::error::{Result, TopologyError};
use crate::ir::{Cell, Component, MeterMode, Probe};
use crate::measure::{self, MeasurementResult};
use crate::resolver::{self, NodeId};
use crate::solver::LinearSolver;
use crate::stats::Stats;
use std::time::Instant;

pub struct Engine {
    board: Board,
    config: TrainerConfig,
    solver: Box<dyn LinearSolver>,
    cache: Option<Solution>,
    stats: Stats,
}

impl Default for Engine {
    fn default() -> Self {
        let config = TrainerConfig::default();
        Self {
            board: Board::new(config.rows, config.cols),
            solver: config.linear_solver(),
            config,
            cache: None,
            stats: Stats::new(),
        }
    }
}

impl Engine {
    pub fn new(config: TrainerConfig) -> Result<Self> {
        config.validate()?;
        tracing::debug!(rows = config.rows, cols = config.cols, solver = ?config.solver, "engine created");
        Ok(Self {
            board: Board::new(config.rows, config.cols),
            solver: config.linear_solver(),
            config,
            cache: None,
            stats: Stats::new(),
        })
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// True if a solution for the current topology is cached.
    pub fn is_solved(&self) -> bool {
        self.cache.is_some()
    }

    pub fn place_component(&mut self, cell: Cell, component: Component) -> std::result::Result<(), TopologyError> {
        self.board.place_component(cell, component)?;
        self.invalidate("place");
        Ok(())
    }

    pub fn clear_component(&mut self, cell: Cell) -> std::result::Result<Option<Component>, TopologyError> {
        let removed = self.board.clear_component(cell)?;
        if removed.is_some() {
            self.invalidate("clear");
        }
        Ok(removed)
    }

    /// Wire two cells. `Ok(false)` if they were already wired.
    pub fn connect(&mut self, a: Cell, b: Cell) -> std::result::Result<bool, TopologyError> {
        let added = self.board.connect(a, b)?;
        if added {
            self.invalidate("connect");
        }
        Ok(added)
    }

    pub fn disconnect(&mut self, a: Cell, b: Cell) -> std::result::Result<bool, TopologyError> {
        let removed = self.board.disconnect(a, b)?;
        if removed {
            self.invalidate("disconnect");
        }
        Ok(removed)
    }

    /// Read the meter between two probes, solving first if the topology
    /// changed since the last reading.
    pub fn measure(
        &mut self,
        a: Probe,
        b: Probe,
        mode: MeterMode,
    ) -> std::result::Result<MeasurementResult, TopologyError> {
        self.board.check_bounds(a.cell)?;
        self.board.check_bounds(b.cell)?;
        self.stats.measurements += 1;
        self.ensure_solved();
        let start = Instant::now();
        let result = match &self.cache {
            Some(solution) => measure::measure(solution, a, b, mode),
            None => MeasurementResult::invalid(mode),
        };
        self.stats.add_phase("measure", start.elapsed());
        Ok(result)
    }

    /// The solution for the current topology.
    pub fn solution(&mut self) -> &Solution {
        self.ensure_solved()
    }

    /// Electrical node a probe touches in the current topology.
    pub fn node_of(&mut self, probe: Probe) -> Option<NodeId> {
        self.ensure_solved().partition.node_of_probe(probe)
    }

    fn invalidate(&mut self, cause: &'static str) {
        if self.cache.take().is_some() {
            self.stats.invalidations += 1;
            tracing::debug!(cause, revision = self.board.revision(), "solution invalidated");
        }
    }

    fn ensure_solved(&mut self) -> &Solution {
        let solution = match self.cache.take() {
            Some(cached) => {
                self.stats.cache_hits += 1;
                cached
            }
            None => solve_board(&self.board, self.solver.as_ref(), &self.config, &mut self.stats),
        };
        self.cache.insert(solution)
    }
}

fn solve_board(board: &Board, solver: &dyn LinearSolver, config: &TrainerConfig, stats: &mut Stats) -> Solution {
    let _span = tracing::info_span!("solve", revision = board.revision(), solver = solver.name()).entered();
    stats.solves += 1;

    let start = Instant::now();
    let partition = resolver::resolve(board);
    stats.add_phase("resolve", start.elapsed());

    let start = Instant::now();
    let model = compiler::build(board, partition.clone());
    stats.add_phase("build", start.elapsed());
    let model = match model {
        Ok(model) => model,
        Err(e) => {
            tracing::warn!(error = %e, "circuit model rejected");
            return Solution::invalid(partition, e);
        }
    };

    let start = Instant::now();
    let solution = dc::run(model, solver, config, Some(stats));
    stats.add_phase("solve", start.elapsed());
    solution
}
