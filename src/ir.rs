//! Trainer intermediate representation.
//!
//! Board coordinates, placeable components, probe points and the command
//! stream that the script parser produces for a [`Session`](crate::session::Session).

use std::fmt;

/// Supply voltage used when a script places a supply without a value (the
/// trainer's 9 V battery).
pub const DEFAULT_SUPPLY_VOLTAGE: f64 = 9.0;

/// A grid coordinate on the trainer board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell {
    pub row: u32,
    pub col: u32,
}

impl Cell {
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// True if the two cells are distinct and share a row or a column.
    pub fn is_straight_run_to(self, other: Cell) -> bool {
        self != other && (self.row == other.row || self.col == other.col)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}c{}", self.row, self.col)
    }
}

/// One of the two connection points of a placed component.
///
/// For a supply, `A` is the positive terminal and `B` the negative one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Terminal {
    A,
    B,
}

impl Terminal {
    pub fn other(self) -> Terminal {
        match self {
            Terminal::A => Terminal::B,
            Terminal::B => Terminal::A,
        }
    }

    /// Terminal a wire attaches to when it reaches the component at `at`
    /// coming from `from`. Arrivals from the left or from above land on `A`,
    /// arrivals from the right or from below land on `B`.
    pub fn facing(at: Cell, from: Cell) -> Terminal {
        if from.row < at.row || (from.row == at.row && from.col < at.col) {
            Terminal::A
        } else {
            Terminal::B
        }
    }
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Terminal::A => write!(f, "a"),
            Terminal::B => write!(f, "b"),
        }
    }
}

/// A component placed into a single board cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Component {
    /// Ideal DC voltage source; `A` sits `voltage` volts above `B`.
    Supply { voltage: f64 },
    Resistor { resistance: f64 },
    /// Zero-resistance jumper occupying a cell; shorts its two terminals.
    WireSegment,
}

impl Component {
    pub fn supply(voltage: f64) -> Self {
        Component::Supply { voltage }
    }

    pub fn resistor(resistance: f64) -> Self {
        Component::Resistor { resistance }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Component::Supply { .. } => "supply",
            Component::Resistor { .. } => "resistor",
            Component::WireSegment => "wire segment",
        }
    }

    pub fn is_supply(&self) -> bool {
        matches!(self, Component::Supply { .. })
    }

    /// Returns the offending value if the component cannot be placed.
    ///
    /// Resistances must be finite and strictly positive, supply voltages
    /// finite.
    pub fn invalid_value(&self) -> Option<f64> {
        match *self {
            Component::Supply { voltage } if !voltage.is_finite() => Some(voltage),
            Component::Resistor { resistance } if !(resistance.is_finite() && resistance > 0.0) => {
                Some(resistance)
            }
            _ => None,
        }
    }
}

/// What the meter reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MeterMode {
    #[default]
    Voltage,
    Current,
}

impl fmt::Display for MeterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeterMode::Voltage => write!(f, "VOLTAGE"),
            MeterMode::Current => write!(f, "CURRENT"),
        }
    }
}

/// Where a meter probe touches the board.
///
/// A bare cell probe on an occupied cell touches the component's `A`
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Probe {
    pub cell: Cell,
    pub terminal: Option<Terminal>,
}

impl Probe {
    pub fn cell(cell: Cell) -> Self {
        Self { cell, terminal: None }
    }

    pub fn terminal(cell: Cell, terminal: Terminal) -> Self {
        Self {
            cell,
            terminal: Some(terminal),
        }
    }
}

impl From<Cell> for Probe {
    fn from(cell: Cell) -> Self {
        Probe::cell(cell)
    }
}

impl fmt::Display for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.terminal {
            Some(t) => write!(f, "{}.{}", self.cell, t),
            None => write!(f, "{}", self.cell),
        }
    }
}

/// One event of a trainer session script.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Place { cell: Cell, component: Component },
    Clear { cell: Cell },
    Wire { a: Cell, b: Cell },
    Unwire { a: Cell, b: Cell },
    /// A click with the wiring tool (two-click wire gesture).
    Click { cell: Cell },
    Probe(Probe),
    Mode(MeterMode),
    ResetProbes,
    DumpSolution,
}

/// A parsed session script.
#[derive(Debug, Clone, Default)]
pub struct Script {
    pub commands: Vec<Command>,
}
