//! Interaction state machine between a UI (or a script) and the [`Engine`].
//!
//! The UI never shares cell references with the engine. It reports
//! gestures, the session turns them into complete engine commands.

use crate::engine::Engine;
use crate::error::TopologyError;
use crate::ir::{Cell, Command, Component, MeterMode, Probe};
use crate::measure::MeasurementResult;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    /// First click of a wire gesture landed on `start`.
    Connecting { start: Cell },
    /// One probe placed, waiting for the second.
    Probing { first: Probe },
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Connecting { start } => write!(f, "connecting from {start}"),
            SessionState::Probing { first } => write!(f, "probing from {first}"),
        }
    }
}

/// What a session event did.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Placed { cell: Cell, component: Component },
    Cleared { cell: Cell, removed: Option<Component> },
    Wired { a: Cell, b: Cell, added: bool },
    Unwired { a: Cell, b: Cell, removed: bool },
    ConnectionStarted(Cell),
    ConnectionCancelled(Cell),
    ProbeArmed(Probe),
    Measured { a: Probe, b: Probe, result: MeasurementResult },
    ModeChanged(MeterMode),
    ProbesReset,
    /// The caller asked for the full solution; read it from the engine.
    SolutionRequested,
}

pub struct Session {
    engine: Engine,
    state: SessionState,
    mode: MeterMode,
}

impl Session {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            state: SessionState::Idle,
            mode: MeterMode::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn mode(&self) -> MeterMode {
        self.mode
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    pub fn into_engine(self) -> Engine {
        self.engine
    }

    pub fn on_component_placed(&mut self, cell: Cell, component: Component) -> Result<(), TopologyError> {
        self.engine.place_component(cell, component)
    }

    pub fn on_wire_requested(&mut self, a: Cell, b: Cell) -> Result<bool, TopologyError> {
        self.engine.connect(a, b)
    }

    /// A click with the wiring tool.
    ///
    /// The second click always ends the gesture, even when the wire is
    /// rejected; the error is returned for the UI to report.
    pub fn on_cell_clicked(&mut self, cell: Cell) -> Result<Outcome, TopologyError> {
        self.engine.board().check_bounds(cell)?;
        match self.state {
            SessionState::Connecting { start } if start == cell => {
                self.state = SessionState::Idle;
                Ok(Outcome::ConnectionCancelled(cell))
            }
            SessionState::Connecting { start } => {
                self.state = SessionState::Idle;
                let added = self.engine.connect(start, cell)?;
                Ok(Outcome::Wired { a: start, b: cell, added })
            }
            SessionState::Idle | SessionState::Probing { .. } => {
                if let SessionState::Probing { first } = self.state {
                    tracing::debug!(%first, "pending probe dropped by wiring click");
                }
                self.state = SessionState::Connecting { start: cell };
                Ok(Outcome::ConnectionStarted(cell))
            }
        }
    }

    /// Place a meter probe. The second probe takes a reading in the
    /// current mode and returns the session to idle.
    pub fn on_probe_selected(&mut self, probe: Probe) -> Result<Option<MeasurementResult>, TopologyError> {
        self.engine.board().check_bounds(probe.cell)?;
        match self.state {
            SessionState::Probing { first } => {
                self.state = SessionState::Idle;
                self.engine.measure(first, probe, self.mode).map(Some)
            }
            SessionState::Idle | SessionState::Connecting { .. } => {
                if let SessionState::Connecting { start } = self.state {
                    tracing::debug!(%start, "pending wire dropped by probe");
                }
                self.state = SessionState::Probing { first: probe };
                Ok(None)
            }
        }
    }

    /// Switch the meter. A half-placed probe pair is discarded.
    pub fn on_mode_changed(&mut self, mode: MeterMode) {
        self.mode = mode;
        if matches!(self.state, SessionState::Probing { .. }) {
            self.state = SessionState::Idle;
        }
    }

    /// Timeout hook: forget any pending probe.
    pub fn reset_probes(&mut self) {
        if matches!(self.state, SessionState::Probing { .. }) {
            self.state = SessionState::Idle;
        }
    }

    /// Dispatch one script command.
    pub fn apply(&mut self, command: &Command) -> Result<Outcome, TopologyError> {
        let _span = tracing::debug_span!("command", state = %self.state).entered();
        match *command {
            Command::Place { cell, component } => {
                self.on_component_placed(cell, component)?;
                Ok(Outcome::Placed { cell, component })
            }
            Command::Clear { cell } => {
                let removed = self.engine.clear_component(cell)?;
                Ok(Outcome::Cleared { cell, removed })
            }
            Command::Wire { a, b } => {
                let added = self.on_wire_requested(a, b)?;
                Ok(Outcome::Wired { a, b, added })
            }
            Command::Unwire { a, b } => {
                let removed = self.engine.disconnect(a, b)?;
                Ok(Outcome::Unwired { a, b, removed })
            }
            Command::Click { cell } => self.on_cell_clicked(cell),
            Command::Probe(probe) => {
                let first = match self.state {
                    SessionState::Probing { first } => Some(first),
                    _ => None,
                };
                match (first, self.on_probe_selected(probe)?) {
                    (Some(a), Some(result)) => Ok(Outcome::Measured { a, b: probe, result }),
                    _ => Ok(Outcome::ProbeArmed(probe)),
                }
            }
            Command::Mode(mode) => {
                self.on_mode_changed(mode);
                Ok(Outcome::ModeChanged(mode))
            }
            Command::ResetProbes => {
                self.reset_probes();
                Ok(Outcome::ProbesReset)
            }
            Command::DumpSolution => Ok(Outcome::SolutionRequested),
        }
    }
}
