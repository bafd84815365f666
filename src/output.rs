//! Result output formatting: meter lines and solution CSV.

use crate::analysis::Solution;
use crate::error::{Result, TopologyError};
use crate::ir::{MeterMode, Probe};
use crate::measure::MeasurementResult;
use crate::resolver::NodeId;
use crate::session::Outcome;
use std::io::Write;

/// Write one meter reading the way the trainer display shows it.
///
/// ```text
/// VOLTAGE r0c2.a -> r0c2.b: 3.00 V
/// CURRENT r0c2.a -> r0c2.b: 3.00 mA
/// CURRENT r0c0 -> r0c0: N/A (probes on the same node)
/// VOLTAGE r0c0 -> r1c0: INVALID (...)
/// ```
pub fn write_measurement<W: Write>(
    a: Probe,
    b: Probe,
    result: &MeasurementResult,
    fault: Option<&str>,
    writer: &mut W,
) -> Result<()> {
    write!(writer, "{} {} -> {}: ", result.mode, a, b)?;
    if !result.valid {
        match fault {
            Some(reason) => writeln!(writer, "INVALID ({})", reason)?,
            None => writeln!(writer, "INVALID")?,
        }
        return Ok(());
    }
    match (result.mode, result.undefined) {
        (MeterMode::Current, Some(reason)) => writeln!(writer, "N/A ({})", reason)?,
        (MeterMode::Current, None) => writeln!(writer, "{:.2} mA", result.current_ma())?,
        (MeterMode::Voltage, _) => writeln!(writer, "{:.2} V", result.voltage)?,
    }
    Ok(())
}

/// Write the full solution as CSV.
///
/// Format:
/// ```csv
/// Variable,Value
/// V(r0c0),9
/// V(r0c4),6
/// I(V@r1c0),-0.003
/// I(R@r0c2),0.003
/// ```
///
/// Only nodes touching an element are listed; every other point sits at
/// 0 V or floats with its island. An invalid solution writes the header
/// and a single `Status,INVALID` row.
pub fn write_solution_csv<W: Write>(solution: &Solution, writer: &mut W) -> Result<()> {
    writeln!(writer, "Variable,Value")?;
    if !solution.is_valid() {
        writeln!(writer, "Status,INVALID")?;
        return Ok(());
    }

    let mut nodes: Vec<NodeId> = solution
        .elements
        .iter()
        .flat_map(|e| [e.node_a, e.node_b])
        .collect();
    nodes.sort();
    nodes.dedup();
    for node in nodes {
        writeln!(writer, "V({}),{}", solution.partition.label(node), solution.voltage(node))?;
    }
    for (element, current) in solution.elements.iter().zip(&solution.element_currents) {
        writeln!(writer, "I({}),{}", element.name(), current)?;
    }
    Ok(())
}

/// Write a rejected request for the user, as the trainer's alert did.
pub fn write_topology_error<W: Write>(line: usize, error: &TopologyError, writer: &mut W) -> Result<()> {
    match error.cell() {
        Some(cell) => writeln!(writer, "line {}: rejected at {}: {}", line, cell, error)?,
        None => writeln!(writer, "line {}: rejected: {}", line, error)?,
    }
    Ok(())
}

/// Short echo of a non-measurement outcome, for verbose runs.
pub fn describe(outcome: &Outcome) -> Option<String> {
    match outcome {
        Outcome::Placed { cell, component } => Some(format!("placed {} at {}", component.kind_name(), cell)),
        Outcome::Cleared { cell, removed: Some(c) } => Some(format!("cleared {} at {}", c.kind_name(), cell)),
        Outcome::Wired { a, b, added: true } => Some(format!("wired {} - {}", a, b)),
        Outcome::Unwired { a, b, removed: true } => Some(format!("unwired {} - {}", a, b)),
        Outcome::ConnectionStarted(cell) => Some(format!("connecting from {}", cell)),
        Outcome::ConnectionCancelled(cell) => Some(format!("connection at {} cancelled", cell)),
        Outcome::ProbeArmed(probe) => Some(format!("probe at {}", probe)),
        Outcome::ModeChanged(mode) => Some(format!("meter set to {}", mode)),
        _ => None,
    }
}
