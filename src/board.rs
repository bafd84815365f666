//! Grid topology store.
//!
//! Holds which component sits in which cell and the explicit wire links
//! between cells. Pure data: nothing here is derived from electrical
//! analysis, and every mutation either applies completely or not at all.

use crate::error::TopologyError;
use crate::ir::{Cell, Component};
use std::collections::{BTreeMap, BTreeSet};

/// An undirected wire link, stored with the smaller cell first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Wire {
    a: Cell,
    b: Cell,
}

impl Wire {
    pub fn new(a: Cell, b: Cell) -> Self {
        if a <= b {
            Self { a, b }
        } else {
            Self { a: b, b: a }
        }
    }

    pub fn a(&self) -> Cell {
        self.a
    }

    pub fn b(&self) -> Cell {
        self.b
    }

    pub fn is_horizontal(&self) -> bool {
        self.a.row == self.b.row
    }
}

/// The trainer board: a fixed `rows x cols` grid of cells.
#[derive(Debug, Clone)]
pub struct Board {
    rows: u32,
    cols: u32,
    components: BTreeMap<Cell, Component>,
    /// Symmetric adjacency: `b` is in `links[a]` iff `a` is in `links[b]`.
    links: BTreeMap<Cell, BTreeSet<Cell>>,
    revision: u64,
}

impl Board {
    pub fn new(rows: u32, cols: u32) -> Self {
        Self {
            rows,
            cols,
            components: BTreeMap::new(),
            links: BTreeMap::new(),
            revision: 0,
        }
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    /// Incremented by every call that changed the topology.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn contains(&self, cell: Cell) -> bool {
        cell.row < self.rows && cell.col < self.cols
    }

    pub fn check_bounds(&self, cell: Cell) -> Result<(), TopologyError> {
        if self.contains(cell) {
            Ok(())
        } else {
            Err(TopologyError::OutOfBounds {
                cell,
                rows: self.rows,
                cols: self.cols,
            })
        }
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.rows).flat_map(move |row| (0..self.cols).map(move |col| Cell::new(row, col)))
    }

    pub fn cell_count(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    pub fn component_at(&self, cell: Cell) -> Option<&Component> {
        self.components.get(&cell)
    }

    /// Placed components in row-major cell order.
    pub fn components(&self) -> impl Iterator<Item = (Cell, &Component)> {
        self.components.iter().map(|(cell, c)| (*cell, c))
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty() && self.links.is_empty()
    }

    pub fn place_component(&mut self, cell: Cell, component: Component) -> Result<(), TopologyError> {
        self.check_bounds(cell)?;
        if self.components.contains_key(&cell) {
            return Err(TopologyError::OccupiedCell(cell));
        }
        if let Some(value) = component.invalid_value() {
            return Err(TopologyError::InvalidComponentValue {
                cell,
                component: component.kind_name(),
                value,
            });
        }
        self.components.insert(cell, component);
        self.revision += 1;
        Ok(())
    }

    /// Removes and returns the component in `cell`; `None` if it was empty.
    pub fn clear_component(&mut self, cell: Cell) -> Result<Option<Component>, TopologyError> {
        self.check_bounds(cell)?;
        let removed = self.components.remove(&cell);
        if removed.is_some() {
            self.revision += 1;
        }
        Ok(removed)
    }

    /// Links two cells. Returns `false` if they were already linked.
    pub fn connect(&mut self, a: Cell, b: Cell) -> Result<bool, TopologyError> {
        self.check_bounds(a)?;
        self.check_bounds(b)?;
        if !a.is_straight_run_to(b) {
            return Err(TopologyError::NonColinearWire { a, b });
        }
        if self.is_connected(a, b) {
            return Ok(false);
        }
        self.links.entry(a).or_default().insert(b);
        self.links.entry(b).or_default().insert(a);
        self.revision += 1;
        Ok(true)
    }

    /// Removes the link between two cells. Returns `false` if there was none.
    pub fn disconnect(&mut self, a: Cell, b: Cell) -> Result<bool, TopologyError> {
        self.check_bounds(a)?;
        self.check_bounds(b)?;
        if !self.is_connected(a, b) {
            return Ok(false);
        }
        self.unlink(a, b);
        self.unlink(b, a);
        self.revision += 1;
        Ok(true)
    }

    fn unlink(&mut self, from: Cell, to: Cell) {
        if let Some(set) = self.links.get_mut(&from) {
            set.remove(&to);
            if set.is_empty() {
                self.links.remove(&from);
            }
        }
    }

    pub fn is_connected(&self, a: Cell, b: Cell) -> bool {
        self.links.get(&a).is_some_and(|set| set.contains(&b))
    }

    pub fn neighbors(&self, cell: Cell) -> impl Iterator<Item = Cell> + '_ {
        self.links.get(&cell).into_iter().flat_map(|set| set.iter().copied())
    }

    /// Every wire exactly once, in sorted order.
    pub fn wires(&self) -> impl Iterator<Item = Wire> + '_ {
        self.links
            .iter()
            .flat_map(|(a, set)| set.iter().filter(move |b| a < *b).map(move |b| Wire::new(*a, *b)))
    }

    pub fn wire_count(&self) -> usize {
        self.wires().count()
    }

    /// Places a component without the value check, to reach the model
    /// builder's own guards.
    #[cfg(test)]
    pub(crate) fn insert_unchecked(&mut self, cell: Cell, component: Component) {
        self.components.insert(cell, component);
        self.revision += 1;
    }
}
