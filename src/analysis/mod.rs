//! Analysis engine: turns a circuit model into a cached [`Solution`].

pub mod dc;

use crate::compiler::{CircuitElement, CircuitModel, ElementKind};
use crate::error::TrainerError;
use crate::resolver::{NodeId, Partition};

/// Node voltages and element currents for one topology revision.
///
/// A solution with a `fault` is invalid: measurements against it report
/// `valid: false` instead of a number.
#[derive(Debug)]
pub struct Solution {
    pub partition: Partition,
    pub elements: Vec<CircuitElement>,
    /// Indexed by [`NodeId::index`]; the reference node is 0 V.
    pub node_voltages: Vec<f64>,
    /// Indexed like `elements`; current flowing from `node_a` through the
    /// element into `node_b`.
    pub element_currents: Vec<f64>,
    pub fault: Option<TrainerError>,
}

impl Solution {
    /// All-zero solution over `model`, the starting point of every solve.
    pub fn zeroed(model: CircuitModel) -> Self {
        let n = model.partition.node_count();
        let m = model.elements.len();
        Self {
            partition: model.partition,
            elements: model.elements,
            node_voltages: vec![0.0; n],
            element_currents: vec![0.0; m],
            fault: None,
        }
    }

    /// A solution that could not be computed at all.
    pub fn invalid(partition: Partition, fault: TrainerError) -> Self {
        let n = partition.node_count();
        Self {
            partition,
            elements: Vec::new(),
            node_voltages: vec![0.0; n],
            element_currents: Vec::new(),
            fault: Some(fault),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.fault.is_none()
    }

    pub fn voltage(&self, node: NodeId) -> f64 {
        self.node_voltages.get(node.index()).copied().unwrap_or(0.0)
    }

    /// Net current leaving `node` through all elements. Zero for every node
    /// of a valid solution (Kirchhoff's current law).
    pub fn net_current_out(&self, node: NodeId) -> f64 {
        self.elements
            .iter()
            .zip(&self.element_currents)
            .map(|(e, &i)| {
                let mut out = 0.0;
                if e.node_a == node {
                    out += i;
                }
                if e.node_b == node {
                    out -= i;
                }
                out
            })
            .sum()
    }

    /// Fill resistor currents from node voltages: (V_a - V_b) * g.
    pub(crate) fn derive_resistor_currents(&mut self) {
        for (e, current) in self.elements.iter().zip(self.element_currents.iter_mut()) {
            if e.kind == ElementKind::Conductance {
                let va = self.node_voltages[e.node_a.index()];
                let vb = self.node_voltages[e.node_b.index()];
                *current = (va - vb) * e.value;
            }
        }
    }
}
