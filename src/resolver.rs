//! Node resolver.
//!
//! Collapses the board into electrical nodes: union-find over every cell
//! junction and every component terminal, joined along wires. A component's
//! two terminals are never joined to each other here; a resistor or supply is
//! not a short.

use crate::board::Board;
use crate::ir::{Cell, Probe, Terminal};
use std::collections::HashMap;
use std::fmt;

/// A point on the board that carries a potential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Point {
    /// The junction of a cell; wires meet here when the cell is empty.
    Junction(Cell),
    /// One terminal of the component occupying a cell.
    Terminal(Cell, Terminal),
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Point::Junction(cell) => write!(f, "{}", cell),
            Point::Terminal(cell, t) => write!(f, "{}.{}", cell, t),
        }
    }
}

/// Identifier of an electrical node within one [`Partition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn new(id: u32) -> Self {
        NodeId(id)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Disjoint-set forest with path halving and union by rank.
#[derive(Debug, Clone)]
pub(crate) struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    pub(crate) fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
            rank: vec![0; size],
        }
    }

    pub(crate) fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Returns `false` if `a` and `b` were already in the same set.
    pub(crate) fn union(&mut self, a: usize, b: usize) -> bool {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
        true
    }

    /// Dense labels `0..k` numbered by first appearance of each root.
    pub(crate) fn labels(&mut self) -> (Vec<u32>, usize) {
        let mut root_label: HashMap<usize, u32> = HashMap::new();
        let mut labels = Vec::with_capacity(self.parent.len());
        for i in 0..self.parent.len() {
            let root = self.find(i);
            let next = root_label.len() as u32;
            labels.push(*root_label.entry(root).or_insert(next));
        }
        let count = root_label.len();
        (labels, count)
    }
}

/// A partition of board points into electrical nodes.
///
/// Always derived from a board snapshot and never mutated in place; merging
/// produces a new partition.
#[derive(Debug, Clone)]
pub struct Partition {
    points: Vec<Point>,
    index: HashMap<Point, usize>,
    node_of_point: Vec<NodeId>,
    node_count: usize,
    reference: NodeId,
}

impl Partition {
    fn from_sets(points: Vec<Point>, sets: &mut DisjointSet, reference_point: Option<Point>) -> Self {
        let index: HashMap<Point, usize> = points.iter().enumerate().map(|(i, p)| (*p, i)).collect();
        let (labels, node_count) = sets.labels();
        let node_of_point: Vec<NodeId> = labels.into_iter().map(NodeId).collect();
        let reference = reference_point
            .and_then(|p| index.get(&p))
            .map(|&i| node_of_point[i])
            .unwrap_or(NodeId(0));
        Self {
            points,
            index,
            node_of_point,
            node_count,
            reference,
        }
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// The 0 V node: the first supply's negative terminal, or node 0 if the
    /// board has no supply (an arbitrary choice with no electrical meaning).
    pub fn reference(&self) -> NodeId {
        self.reference
    }

    pub fn node_of(&self, point: Point) -> Option<NodeId> {
        self.index.get(&point).map(|&i| self.node_of_point[i])
    }

    /// Node touched by a probe. A bare probe on an occupied cell lands on the
    /// component's `A` terminal; any probe on an empty cell lands on its
    /// junction. `None` only for cells off the board.
    pub fn node_of_probe(&self, probe: Probe) -> Option<NodeId> {
        let terminal = probe.terminal.unwrap_or(Terminal::A);
        self.node_of(Point::Terminal(probe.cell, terminal))
            .or_else(|| self.node_of(Point::Junction(probe.cell)))
    }

    /// Points belonging to `node`, in board order.
    pub fn points_of(&self, node: NodeId) -> impl Iterator<Item = Point> + '_ {
        self.points
            .iter()
            .zip(&self.node_of_point)
            .filter(move |(_, n)| **n == node)
            .map(|(p, _)| *p)
    }

    /// Human-readable node name: the first point the node contains.
    pub fn label(&self, node: NodeId) -> String {
        self.points_of(node)
            .next()
            .map(|p| p.to_string())
            .unwrap_or_else(|| node.to_string())
    }

    /// A coarser partition in which each pair of nodes is joined.
    pub fn merge(&self, pairs: &[(NodeId, NodeId)]) -> Partition {
        let mut nodes = DisjointSet::new(self.node_count);
        for &(a, b) in pairs {
            nodes.union(a.index(), b.index());
        }
        let (labels, node_count) = nodes.labels();
        let node_of_point = self
            .node_of_point
            .iter()
            .map(|n| NodeId(labels[n.index()]))
            .collect();
        Partition {
            points: self.points.clone(),
            index: self.index.clone(),
            node_of_point,
            node_count,
            reference: NodeId(labels[self.reference.index()]),
        }
    }
}

/// Point a wire end attaches to at `at` when the wire runs to `other`.
pub fn attach_point(board: &Board, at: Cell, other: Cell) -> Point {
    if board.component_at(at).is_some() {
        Point::Terminal(at, Terminal::facing(at, other))
    } else {
        Point::Junction(at)
    }
}

/// Resolve the board into electrical nodes.
pub fn resolve(board: &Board) -> Partition {
    let _span = tracing::debug_span!("resolve", revision = board.revision()).entered();

    let mut points: Vec<Point> = Vec::with_capacity(board.cell_count() + 2 * board.component_count());
    points.extend(board.cells().map(Point::Junction));
    for (cell, _) in board.components() {
        points.push(Point::Terminal(cell, Terminal::A));
        points.push(Point::Terminal(cell, Terminal::B));
    }
    let index: HashMap<Point, usize> = points.iter().enumerate().map(|(i, p)| (*p, i)).collect();

    let mut sets = DisjointSet::new(points.len());
    for wire in board.wires() {
        let pa = attach_point(board, wire.a(), wire.b());
        let pb = attach_point(board, wire.b(), wire.a());
        if let (Some(&ia), Some(&ib)) = (index.get(&pa), index.get(&pb)) {
            sets.union(ia, ib);
        }
    }

    let reference_point = board
        .components()
        .find(|(_, c)| c.is_supply())
        .map(|(cell, _)| Point::Terminal(cell, Terminal::B));

    let partition = Partition::from_sets(points, &mut sets, reference_point);
    tracing::debug!(nodes = partition.node_count(), reference = %partition.reference(), "resolved nodes");
    partition
}
