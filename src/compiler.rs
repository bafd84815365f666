//! Circuit model builder and MNA (Modified Nodal Analysis) compiler.
//!
//! [`build`] turns placed components into a list of circuit elements over
//! resolved nodes. [`islands`] splits that list into independently solvable
//! groups and [`compile`] stamps one island into a sparse MNA system.
//!
//! # MNA System
//!
//! For n non-reference nodes and m supplies the system is (n+m) x (n+m):
//!
//! ```text
//! [G] * [x] = [b]
//! ```
//!
//! where x = [node_voltages; source_currents].
//!
//! # Stamps
//!
//! - **Resistor** with conductance g between nodes i,j:
//!   G(i,i) += g, G(j,j) += g, G(i,j) -= g, G(j,i) -= g
//! - **Supply** V from node i (+) to node j (-), branch k at row n+k:
//!   - G(i, n+k) += 1, G(n+k, i) += 1
//!   - G(j, n+k) -= 1, G(n+k, j) -= 1
//!   - b(n+k) = V
//!
//! Stamps on the island's reference node are omitted.

use crate::board::Board;
use crate::error::{Result, TrainerError};
use crate::ir::{Cell, Component, Terminal};
use crate::resolver::{DisjointSet, NodeId, Partition, Point};
use crate::sparse::CsrMatrix;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// `value` is the fixed potential of `node_a` over `node_b`, in volts.
    VoltageSource,
    /// `value` is the conductance, in siemens.
    Conductance,
}

/// A component resolved onto electrical nodes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircuitElement {
    /// Cell the component occupies.
    pub cell: Cell,
    pub node_a: NodeId,
    pub node_b: NodeId,
    pub kind: ElementKind,
    pub value: f64,
}

impl CircuitElement {
    pub fn is_source(&self) -> bool {
        self.kind == ElementKind::VoltageSource
    }

    /// Name used in reports, e.g. `R@r0c2` or `V@r1c0`.
    pub fn name(&self) -> String {
        match self.kind {
            ElementKind::VoltageSource => format!("V@{}", self.cell),
            ElementKind::Conductance => format!("R@{}", self.cell),
        }
    }

    /// True if the element sits between `a` and `b`, in either direction.
    pub fn spans(&self, a: NodeId, b: NodeId) -> bool {
        (self.node_a == a && self.node_b == b) || (self.node_a == b && self.node_b == a)
    }
}

/// Elements plus the partition their node ids refer to.
#[derive(Debug, Clone)]
pub struct CircuitModel {
    pub partition: Partition,
    pub elements: Vec<CircuitElement>,
}

/// Build the element list for `board` on top of a resolved partition.
///
/// Wire segments placed in cells are shorts: their terminal nodes are merged
/// (a second union pass) before any element is emitted.
pub fn build(board: &Board, partition: Partition) -> Result<CircuitModel> {
    let _span = tracing::debug_span!("build", components = board.component_count()).entered();

    let terminal_nodes = |partition: &Partition, cell: Cell| -> Result<(NodeId, NodeId)> {
        let a = partition.node_of(Point::Terminal(cell, Terminal::A));
        let b = partition.node_of(Point::Terminal(cell, Terminal::B));
        match (a, b) {
            (Some(a), Some(b)) => Ok((a, b)),
            _ => Err(TrainerError::Solve(format!(
                "component at {} has unresolved terminals",
                cell
            ))),
        }
    };

    let mut shorts = Vec::new();
    for (cell, component) in board.components() {
        if let Component::WireSegment = component {
            shorts.push(terminal_nodes(&partition, cell)?);
        }
    }
    let partition = if shorts.is_empty() {
        partition
    } else {
        tracing::debug!(segments = shorts.len(), "merging wire segment shorts");
        partition.merge(&shorts)
    };

    let mut elements = Vec::with_capacity(board.component_count());
    for (cell, component) in board.components() {
        let (node_a, node_b) = terminal_nodes(&partition, cell)?;
        let (kind, value) = match *component {
            Component::Supply { voltage } => (ElementKind::VoltageSource, voltage),
            Component::Resistor { resistance } => {
                if resistance == 0.0 || !resistance.is_finite() {
                    return Err(TrainerError::InvalidComponentValue(format!(
                        "resistor at {} has resistance {}",
                        cell, resistance
                    )));
                }
                (ElementKind::Conductance, 1.0 / resistance)
            }
            Component::WireSegment => continue,
        };
        elements.push(CircuitElement {
            cell,
            node_a,
            node_b,
            kind,
            value,
        });
    }

    Ok(CircuitModel { partition, elements })
}

/// A set of nodes connected through elements, solvable on its own.
#[derive(Debug, Clone)]
pub struct Island {
    pub nodes: Vec<NodeId>,
    /// Indices into [`CircuitModel::elements`].
    pub elements: Vec<usize>,
    /// Node held at 0 V while solving this island.
    pub reference: NodeId,
    pub has_source: bool,
}

/// Group elements into islands.
///
/// The island holding the model's reference node is grounded there; any
/// other island is grounded at the negative terminal of its first supply.
pub fn islands(model: &CircuitModel) -> Vec<Island> {
    let n = model.partition.node_count();
    let mut sets = DisjointSet::new(n);
    for e in &model.elements {
        sets.union(e.node_a.index(), e.node_b.index());
    }

    let mut by_root: HashMap<usize, usize> = HashMap::new();
    let mut out: Vec<Island> = Vec::new();
    for (idx, e) in model.elements.iter().enumerate() {
        let root = sets.find(e.node_a.index());
        let slot = *by_root.entry(root).or_insert_with(|| {
            out.push(Island {
                nodes: Vec::new(),
                elements: Vec::new(),
                reference: e.node_b,
                has_source: false,
            });
            out.len() - 1
        });
        let island = &mut out[slot];
        if e.is_source() && !island.has_source {
            island.has_source = true;
            island.reference = e.node_b;
        }
        island.elements.push(idx);
    }

    let global_ref = model.partition.reference();
    for node in 0..n {
        if let Some(&slot) = by_root.get(&sets.find(node)) {
            out[slot].nodes.push(NodeId::new(node as u32));
        }
    }
    for island in &mut out {
        if island.nodes.contains(&global_ref) {
            island.reference = global_ref;
        }
    }
    out
}

/// The compiled MNA system of one island.
#[derive(Debug, Clone)]
pub struct MnaSystem {
    pub g: CsrMatrix,
    pub b: Vec<f64>,
    pub size: usize,
    /// Matrix row -> node, for the first `nodes.len()` rows.
    pub nodes: Vec<NodeId>,
    /// Branch k (row `nodes.len() + k`) -> element index.
    pub branches: Vec<usize>,
}

/// Stamp one island into an MNA system.
pub fn compile(elements: &[CircuitElement], island: &Island) -> MnaSystem {
    let nodes: Vec<NodeId> = island
        .nodes
        .iter()
        .copied()
        .filter(|&n| n != island.reference)
        .collect();
    let node_index: HashMap<NodeId, usize> = nodes.iter().enumerate().map(|(i, n)| (*n, i)).collect();
    let branches: Vec<usize> = island
        .elements
        .iter()
        .copied()
        .filter(|&i| elements[i].is_source())
        .collect();

    let n_nodes = nodes.len();
    let size = n_nodes + branches.len();
    let mut triplets: Vec<(usize, usize, f64)> = Vec::new();
    let mut b = vec![0.0; size];

    for &idx in &island.elements {
        let e = &elements[idx];
        let ni = node_index.get(&e.node_a).copied();
        let nj = node_index.get(&e.node_b).copied();
        match e.kind {
            ElementKind::Conductance => {
                let g = e.value;
                if let Some(i) = ni {
                    triplets.push((i, i, g));
                }
                if let Some(j) = nj {
                    triplets.push((j, j, g));
                }
                if let (Some(i), Some(j)) = (ni, nj) {
                    triplets.push((i, j, -g));
                    triplets.push((j, i, -g));
                }
            }
            ElementKind::VoltageSource => {
                let Some(k) = branches.iter().position(|&br| br == idx) else {
                    continue;
                };
                let bk = n_nodes + k;
                if let Some(i) = ni {
                    triplets.push((i, bk, 1.0));
                    triplets.push((bk, i, 1.0));
                }
                if let Some(j) = nj {
                    triplets.push((j, bk, -1.0));
                    triplets.push((bk, j, -1.0));
                }
                b[bk] = e.value;
            }
        }
    }

    MnaSystem {
        g: CsrMatrix::from_triplets(size, size, &triplets),
        b,
        size,
        nodes,
        branches,
    }
}
