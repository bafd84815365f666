//! Meter readings between two probe points.

use crate::analysis::Solution;
use crate::ir::{MeterMode, Probe, Terminal};
use crate::resolver::NodeId;
use std::fmt;

/// Why a current reading has no physical answer. Not an error: the request
/// was well formed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndefinedMeasurement {
    /// Both probes touch the same node.
    SameNode,
    /// No element sits directly between the probe nodes.
    NoSpanningElement,
    /// Several elements sit between the probe nodes; the meter cannot tell
    /// which branch it is reading.
    MultipleSpanningElements,
}

impl fmt::Display for UndefinedMeasurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UndefinedMeasurement::SameNode => write!(f, "probes on the same node"),
            UndefinedMeasurement::NoSpanningElement => write!(f, "no element between probes"),
            UndefinedMeasurement::MultipleSpanningElements => write!(f, "more than one element between probes"),
        }
    }
}

/// What the meter shows after a two-probe measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasurementResult {
    pub mode: MeterMode,
    /// Potential of probe A over probe B, in volts.
    pub voltage: f64,
    /// Current from probe A's node through the spanning element into probe
    /// B's node, in amperes.
    pub current: f64,
    /// False when the circuit itself is contradictory. Voltage and current
    /// are NaN in that case.
    pub valid: bool,
    /// Set in current mode when `current` is not applicable.
    pub undefined: Option<UndefinedMeasurement>,
}

impl MeasurementResult {
    pub fn invalid(mode: MeterMode) -> Self {
        Self {
            mode,
            voltage: f64::NAN,
            current: f64::NAN,
            valid: false,
            undefined: None,
        }
    }

    /// The value for the active mode: volts or amperes.
    pub fn reading(&self) -> f64 {
        match self.mode {
            MeterMode::Voltage => self.voltage,
            MeterMode::Current => self.current,
        }
    }

    pub fn current_ma(&self) -> f64 {
        self.current * 1e3
    }
}

/// Measure between two probes on a solved circuit.
///
/// Probes that touch no known point read as the reference node; callers
/// check bounds beforehand.
pub fn measure(solution: &Solution, a: Probe, b: Probe, mode: MeterMode) -> MeasurementResult {
    let _span = tracing::info_span!("measure", %a, %b, %mode).entered();

    if !solution.is_valid() {
        return MeasurementResult::invalid(mode);
    }

    let partition = &solution.partition;
    let na = partition.node_of_probe(a).unwrap_or(partition.reference());
    let nb = partition.node_of_probe(b).unwrap_or(partition.reference());

    if na == nb {
        return MeasurementResult {
            mode,
            voltage: 0.0,
            current: 0.0,
            valid: true,
            undefined: (mode == MeterMode::Current).then_some(UndefinedMeasurement::SameNode),
        };
    }

    let voltage = solution.voltage(na) - solution.voltage(nb);
    let (current, undefined) = match component_current(solution, a, b, na, nb) {
        Ok(i) => (i, None),
        Err(reason) => (0.0, Some(reason)),
    };

    let result = MeasurementResult {
        mode,
        voltage,
        current,
        valid: true,
        undefined: if mode == MeterMode::Current { undefined } else { None },
    };
    tracing::debug!(voltage, current, from = %na, to = %nb, "measured");
    result
}

/// Current through the element between the two probes, signed in the
/// `from` to `to` direction.
///
/// Probes on the two terminals of one component read that component, even
/// when other elements join the same pair of nodes. Otherwise exactly one
/// element must span the nodes.
fn component_current(
    solution: &Solution,
    a: Probe,
    b: Probe,
    from: NodeId,
    to: NodeId,
) -> Result<f64, UndefinedMeasurement> {
    if let Some(current) = named_component_current(solution, a, b) {
        return Ok(current);
    }
    spanning_current(solution, from, to)
}

fn named_component_current(solution: &Solution, a: Probe, b: Probe) -> Option<f64> {
    let (ta, tb) = (a.terminal?, b.terminal?);
    if a.cell != b.cell || ta == tb {
        return None;
    }
    let (_, &current) = solution
        .elements
        .iter()
        .zip(&solution.element_currents)
        .find(|(e, _)| e.cell == a.cell)?;
    Some(if ta == Terminal::A { current } else { -current })
}

fn spanning_current(solution: &Solution, from: NodeId, to: NodeId) -> Result<f64, UndefinedMeasurement> {
    let mut spanning = solution
        .elements
        .iter()
        .zip(&solution.element_currents)
        .filter(|(e, _)| e.spans(from, to));

    let (element, &current) = spanning.next().ok_or(UndefinedMeasurement::NoSpanningElement)?;
    if spanning.next().is_some() {
        return Err(UndefinedMeasurement::MultipleSpanningElements);
    }
    Ok(if element.node_a == from { current } else { -current })
}
