//! DC operating point analysis.
//!
//! Solves each island of the circuit separately:
//!
//! 1. Islands without a supply carry no current and stay at 0 V (open
//!    circuit); no matrix is built for them.
//! 2. Other islands are stamped into an MNA system and handed to the
//!    configured linear solver.
//! 3. If that solver reports a singular matrix (a loop made only of
//!    supplies), the island is re-solved by rank-revealing elimination. A
//!    consistent loop (equal supplies in parallel) is accepted; a
//!    contradictory one invalidates the whole solution.
//!
//! Resistor currents are derived afterwards as (V_a - V_b) / R.

use super::Solution;
use crate::compiler::{self, CircuitModel, Island, MnaSystem};
use crate::config::TrainerConfig;
use crate::error::{Result, TrainerError};
use crate::solver::cpu;
use crate::solver::LinearSolver;
use crate::stats::Stats;

/// Run DC operating point analysis on a built model.
///
/// Never fails: electrical contradictions are recorded as the solution's
/// `fault` so the session can carry on.
pub fn run(
    model: CircuitModel,
    solver: &dyn LinearSolver,
    config: &TrainerConfig,
    mut stats: Option<&mut Stats>,
) -> Solution {
    let _span = tracing::info_span!(
        "dc_analysis",
        nodes = model.partition.node_count(),
        elements = model.elements.len()
    )
    .entered();

    let islands = compiler::islands(&model);
    let mut solution = Solution::zeroed(model);

    for island in &islands {
        if let Err(e) = solve_island(&mut solution, island, solver, config, stats.as_deref_mut()) {
            tracing::warn!(error = %e, "solution marked invalid");
            solution.fault = Some(e);
            break;
        }
    }

    solution.derive_resistor_currents();
    solution
}

fn solve_island(
    solution: &mut Solution,
    island: &Island,
    solver: &dyn LinearSolver,
    config: &TrainerConfig,
    mut stats: Option<&mut Stats>,
) -> Result<()> {
    if !island.has_source {
        tracing::debug!(nodes = island.nodes.len(), "island without supply, treated as open circuit");
        if let Some(s) = stats.as_deref_mut() {
            s.islands_skipped += 1;
        }
        return Ok(());
    }

    for &idx in &island.elements {
        let e = &solution.elements[idx];
        if e.is_source() && e.node_a == e.node_b && e.value.abs() > config.consistency_tolerance {
            return Err(TrainerError::InconsistentSource(format!(
                "supply at {} is shorted across its own terminals",
                e.cell
            )));
        }
    }

    let system = compiler::compile(&solution.elements, island);
    let x = solve_system(&system, solver, config, stats.as_deref_mut())?;

    for (row, node) in system.nodes.iter().enumerate() {
        solution.node_voltages[node.index()] = x[row];
    }
    let n_nodes = system.nodes.len();
    for (k, &idx) in system.branches.iter().enumerate() {
        solution.element_currents[idx] = x[n_nodes + k];
    }

    if let Some(s) = stats {
        s.islands_solved += 1;
    }
    Ok(())
}

fn solve_system(
    system: &MnaSystem,
    solver: &dyn LinearSolver,
    config: &TrainerConfig,
    mut stats: Option<&mut Stats>,
) -> Result<Vec<f64>> {
    if let Some(s) = stats.as_deref_mut() {
        s.linear_solves += 1;
    }
    let tolerance = config.consistency_tolerance;

    let reason = match solver.solve_real(&system.g, &system.b) {
        Ok(x) if system.g.relative_residual(&x, &system.b) <= tolerance => return Ok(x),
        Ok(_) => "residual above tolerance".to_string(),
        Err(TrainerError::Singular(msg)) => msg,
        Err(e) => return Err(e),
    };

    tracing::debug!(solver = solver.name(), %reason, size = system.size, "falling back to rank-revealing elimination");
    if let Some(s) = stats {
        s.degenerate_fallbacks += 1;
    }

    let echelon = cpu::eliminate_rank_revealing(&system.g, &system.b, config.pivot_tolerance)?;
    let residual = system.g.relative_residual(&echelon.x, &system.b);
    if residual > tolerance {
        return Err(TrainerError::InconsistentSource(format!(
            "supplies force conflicting potentials (mismatch {:.3})",
            echelon.residual
        )));
    }
    Ok(echelon.x)
}
