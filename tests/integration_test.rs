//! End-to-end tests for the circuit trainer engine.

use approx::assert_abs_diff_eq;
use circuit_trainer::board::Board;
use circuit_trainer::config::{SolverKind, TrainerConfig};
use circuit_trainer::engine::Engine;
use circuit_trainer::ir::{Cell, Component, MeterMode, Probe, Terminal};
use circuit_trainer::output;
use circuit_trainer::parser;
use circuit_trainer::resolver::NodeId;
use circuit_trainer::session::{Outcome, Session};
use circuit_trainer::{MeasurementResult, UndefinedMeasurement};

fn c(row: u32, col: u32) -> Cell {
    Cell::new(row, col)
}

fn term(row: u32, col: u32, t: Terminal) -> Probe {
    Probe::terminal(c(row, col), t)
}

fn engine_with(solver: SolverKind) -> Engine {
    Engine::new(TrainerConfig {
        solver,
        ..TrainerConfig::default()
    })
    .expect("default config is valid")
}

/// Run a script and collect every meter reading.
fn run_script(script: &str) -> (Session, Vec<MeasurementResult>) {
    let script = parser::parse(script).expect("parse failed");
    let mut session = Session::new(Engine::default());
    let mut readings = Vec::new();
    for command in &script.commands {
        if let Ok(Outcome::Measured { result, .. }) = session.apply(command) {
            readings.push(result);
        }
    }
    (session, readings)
}

/// 9 V supply at r1c0, 1k at r0c2, 2k at r1c4, closed along row 2.
const SERIES_LOOP: &str = "\
* series loop
place 1 0 supply 9
place 0 2 resistor 1k
place 1 4 resistor 2k
wire 0 0 1 0
wire 0 0 0 2
wire 0 2 0 4
wire 0 4 1 4
wire 1 4 2 4
wire 2 4 2 0
wire 2 0 1 0
";

/// Unbalanced bridge: 9 V between rows 0 and 9, 1k and 3k down column 3,
/// 2k and 4k down column 7, 5k across row 4.
const BRIDGE: &str = "\
place 4 0 supply 9
place 2 3 resistor 1k
place 6 3 resistor 3k
place 2 7 resistor 2k
place 6 7 resistor 4k
place 4 5 resistor 5k
wire 0 0 4 0
wire 4 0 9 0
wire 0 0 0 3
wire 0 3 0 7
wire 0 3 2 3
wire 2 3 4 3
wire 4 3 6 3
wire 6 3 9 3
wire 0 7 2 7
wire 2 7 4 7
wire 4 7 6 7
wire 6 7 9 7
wire 4 3 4 5
wire 4 5 4 7
wire 9 0 9 3
wire 9 3 9 7
";

fn scripted_engine(solver: SolverKind, source: &str) -> Engine {
    let script = parser::parse(source).expect("parse failed");
    let mut session = Session::new(engine_with(solver));
    for command in &script.commands {
        session.apply(command).expect("script is well formed");
    }
    session.into_engine()
}

fn series_engine(solver: SolverKind) -> Engine {
    scripted_engine(solver, SERIES_LOOP)
}

fn assert_kcl_everywhere(e: &mut Engine) {
    let solution = e.solution();
    assert!(solution.is_valid(), "fault: {:?}", solution.fault);
    for node in 0..solution.partition.node_count() {
        let net = solution.net_current_out(NodeId::new(node as u32));
        assert_abs_diff_eq!(net, 0.0, epsilon = 1e-12);
    }
}

// ── Series law ────────────────────────────────────────────────────

#[test]
fn test_series_loop_readings() {
    for solver in [SolverKind::SparseLu, SolverKind::Dense] {
        let mut e = series_engine(solver);

        let r1 = e
            .measure(term(0, 2, Terminal::A), term(0, 2, Terminal::B), MeterMode::Current)
            .unwrap();
        assert!(r1.valid);
        assert_abs_diff_eq!(r1.voltage, 3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(r1.current, 0.003, epsilon = 1e-12);

        let r2 = e
            .measure(term(1, 4, Terminal::A), term(1, 4, Terminal::B), MeterMode::Current)
            .unwrap();
        assert_abs_diff_eq!(r2.voltage, 6.0, epsilon = 1e-9);
        assert_abs_diff_eq!(r2.current, 0.003, epsilon = 1e-12);

        let supply = e
            .measure(term(1, 0, Terminal::A), term(1, 0, Terminal::B), MeterMode::Voltage)
            .unwrap();
        assert_abs_diff_eq!(supply.voltage, 9.0, epsilon = 1e-9);
    }
}

#[test]
fn test_series_loop_from_script_probes() {
    let script = format!(
        "{SERIES_LOOP}\
probe 0 2 a
probe 0 2 b
mode current
probe 1 4 a
probe 1 4 b
"
    );
    let (_, readings) = run_script(&script);
    assert_eq!(readings.len(), 2);
    assert_eq!(readings[0].mode, MeterMode::Voltage);
    assert_abs_diff_eq!(readings[0].reading(), 3.0, epsilon = 1e-9);
    assert_eq!(readings[1].mode, MeterMode::Current);
    assert_abs_diff_eq!(readings[1].current_ma(), 3.0, epsilon = 1e-9);
}

// ── Kirchhoff ─────────────────────────────────────────────────────

#[test]
fn test_current_conservation_at_every_node() {
    for solver in [SolverKind::SparseLu, SolverKind::Dense] {
        let mut e = series_engine(solver);
        // A 330R branch in parallel with the 2k.
        e.connect(c(0, 4), c(0, 6)).unwrap();
        e.connect(c(0, 6), c(1, 6)).unwrap();
        e.place_component(c(1, 6), Component::resistor(330.0)).unwrap();
        e.connect(c(1, 6), c(2, 6)).unwrap();
        e.connect(c(2, 6), c(2, 4)).unwrap();
        assert_kcl_everywhere(&mut e);
    }
}

#[test]
fn test_unbalanced_bridge() {
    // Nodal equations for the two middle nodes give
    // 46 L - 6 R = 270 and 19 R - 4 L = 90.
    let right = 5220.0 / 850.0;
    let left = (270.0 + 6.0 * right) / 46.0;

    let mut voltages = Vec::new();
    for solver in [SolverKind::SparseLu, SolverKind::Dense] {
        let mut e = scripted_engine(solver, BRIDGE);
        assert_kcl_everywhere(&mut e);

        let supply = e.measure(c(0, 0).into(), c(9, 0).into(), MeterMode::Voltage).unwrap();
        assert_abs_diff_eq!(supply.voltage, 9.0, epsilon = 1e-9);
        let l = e.measure(c(4, 3).into(), c(9, 7).into(), MeterMode::Voltage).unwrap();
        assert_abs_diff_eq!(l.voltage, left, epsilon = 1e-9);
        let r = e.measure(c(4, 7).into(), c(9, 3).into(), MeterMode::Voltage).unwrap();
        assert_abs_diff_eq!(r.voltage, right, epsilon = 1e-9);

        let across = e
            .measure(term(4, 5, Terminal::A), term(4, 5, Terminal::B), MeterMode::Current)
            .unwrap();
        assert_eq!(across.undefined, None);
        assert_abs_diff_eq!(across.voltage, left - right, epsilon = 1e-9);
        assert_abs_diff_eq!(across.current, (left - right) / 5e3, epsilon = 1e-12);
        assert!(across.current > 1e-5);

        // Only the 5k joins the two middle nodes.
        let bare = e.measure(c(4, 3).into(), c(4, 7).into(), MeterMode::Current).unwrap();
        assert_eq!(bare.undefined, None);
        assert_abs_diff_eq!(bare.current, across.current, epsilon = 1e-15);

        voltages.push(e.solution().node_voltages.clone());
    }
    for (sparse, dense) in voltages[0].iter().zip(&voltages[1]) {
        assert_abs_diff_eq!(*sparse, *dense, epsilon = 1e-9);
    }
}

// ── Measurement semantics ─────────────────────────────────────────

#[test]
fn test_same_node_probe_reads_exact_zero() {
    let mut e = series_engine(SolverKind::Dense);
    for mode in [MeterMode::Voltage, MeterMode::Current] {
        let r = e.measure(c(0, 0).into(), c(1, 0).into(), mode).unwrap();
        assert_eq!(r.voltage, 0.0);
        assert_eq!(r.current, 0.0);
        assert!(r.valid);
    }
    let r = e.measure(c(2, 4).into(), c(2, 0).into(), MeterMode::Current).unwrap();
    assert_eq!(r.voltage, 0.0);
    assert_eq!(r.undefined, Some(UndefinedMeasurement::SameNode));
}

#[test]
fn test_empty_board_reads_zero_everywhere() {
    let mut e = Engine::default();
    for (a, b) in [(c(0, 0), c(9, 9)), (c(3, 4), c(3, 4)), (c(5, 0), c(0, 5))] {
        for mode in [MeterMode::Voltage, MeterMode::Current] {
            let r = e.measure(a.into(), b.into(), mode).unwrap();
            assert!(r.valid);
            assert_eq!(r.voltage, 0.0);
            assert_eq!(r.current, 0.0);
        }
    }
}

#[test]
fn test_parallel_resistors_share_their_nodes() {
    let mut e = Engine::default();
    e.place_component(c(1, 0), Component::supply(9.0)).unwrap();
    e.place_component(c(0, 3), Component::resistor(1e3)).unwrap();
    e.place_component(c(0, 7), Component::resistor(1e3)).unwrap();
    for (a, b) in [
        (c(0, 0), c(1, 0)),
        (c(2, 0), c(1, 0)),
        (c(0, 0), c(0, 3)),
        (c(0, 3), c(0, 5)),
        (c(0, 5), c(2, 5)),
        (c(2, 5), c(2, 0)),
        (c(0, 5), c(0, 7)),
        (c(0, 7), c(0, 9)),
        (c(0, 9), c(0, 0)),
    ] {
        e.connect(a, b).unwrap();
    }

    // Both resistors and the supply join the top rail to the return rail.
    let r = e.measure(c(0, 0).into(), c(2, 5).into(), MeterMode::Current).unwrap();
    assert!(r.valid);
    assert_abs_diff_eq!(r.voltage, 9.0, epsilon = 1e-9);
    assert_eq!(r.current, 0.0);
    assert_eq!(r.undefined, Some(UndefinedMeasurement::MultipleSpanningElements));

    // Touching one resistor's own terminals picks it out.
    let r1 = e
        .measure(term(0, 3, Terminal::A), term(0, 3, Terminal::B), MeterMode::Current)
        .unwrap();
    assert_eq!(r1.undefined, None);
    assert_abs_diff_eq!(r1.current_ma(), 9.0, epsilon = 1e-9);
    // The 1k at r0c7 is wired the other way round.
    let r2 = e
        .measure(term(0, 7, Terminal::A), term(0, 7, Terminal::B), MeterMode::Current)
        .unwrap();
    assert_abs_diff_eq!(r2.voltage, -9.0, epsilon = 1e-9);
    assert_abs_diff_eq!(r2.current_ma(), -9.0, epsilon = 1e-9);

    // The supply still delivers both branch currents.
    let solution = e.solution();
    let supply_idx = solution.elements.iter().position(|el| el.is_source()).unwrap();
    assert_abs_diff_eq!(solution.element_currents[supply_idx], -0.018, epsilon = 1e-12);
}

#[test]
fn test_wire_segment_shorts_cell() {
    let mut e = series_engine(SolverKind::SparseLu);
    assert_eq!(e.clear_component(c(1, 4)).unwrap(), Some(Component::resistor(2e3)));
    e.place_component(c(1, 4), Component::WireSegment).unwrap();
    let r = e
        .measure(term(0, 2, Terminal::A), term(0, 2, Terminal::B), MeterMode::Current)
        .unwrap();
    assert_abs_diff_eq!(r.voltage, 9.0, epsilon = 1e-9);
    assert_abs_diff_eq!(r.current_ma(), 9.0, epsilon = 1e-9);

    // With the 2k gone the 1k is the supply's only load.
    let bare = e.measure(c(0, 0).into(), c(0, 4).into(), MeterMode::Current).unwrap();
    assert_eq!(bare.undefined, Some(UndefinedMeasurement::MultipleSpanningElements));
}

#[test]
fn test_conflicting_sources_invalidate_measurement() {
    let script = "\
place 1 0 supply 9
place 1 2 supply 5
wire 0 0 1 0
wire 1 0 2 0
wire 0 2 1 2
wire 1 2 2 2
wire 0 0 0 2
wire 2 0 2 2
probe 0 0
probe 2 2
";
    let (mut session, readings) = run_script(script);
    assert_eq!(readings.len(), 1);
    assert!(!readings[0].valid);
    assert!(readings[0].voltage.is_nan());

    // Lifting the second supply's positive wire makes the board consistent.
    assert!(session.engine_mut().disconnect(c(0, 0), c(0, 2)).unwrap());
    let r = session
        .engine_mut()
        .measure(c(0, 0).into(), c(2, 2).into(), MeterMode::Voltage)
        .unwrap();
    assert!(r.valid);
    assert_abs_diff_eq!(r.voltage, 9.0, epsilon = 1e-9);
}

// ── Topology properties ───────────────────────────────────────────

#[test]
fn test_connect_is_idempotent_and_symmetric() {
    let mut once = Board::new(4, 4);
    once.connect(c(0, 0), c(0, 3)).unwrap();

    let mut twice = Board::new(4, 4);
    twice.connect(c(0, 0), c(0, 3)).unwrap();
    assert!(!twice.connect(c(0, 0), c(0, 3)).unwrap());

    let mut reversed = Board::new(4, 4);
    reversed.connect(c(0, 3), c(0, 0)).unwrap();

    let wires = |b: &Board| b.wires().collect::<Vec<_>>();
    assert_eq!(wires(&once), wires(&twice));
    assert_eq!(wires(&once), wires(&reversed));
    assert_eq!(once.revision(), twice.revision());
}

#[test]
fn test_solution_reused_until_topology_changes() {
    let mut e = series_engine(SolverKind::SparseLu);
    for _ in 0..5 {
        e.measure(c(0, 0).into(), c(2, 0).into(), MeterMode::Voltage).unwrap();
    }
    assert_eq!(e.stats().solves, 1);
    assert_eq!(e.stats().cache_hits, 4);

    assert!(e.disconnect(c(2, 4), c(2, 0)).unwrap());
    // Bare probes land on the A terminals of the 1k and the 2k.
    let r = e.measure(c(0, 2).into(), c(1, 4).into(), MeterMode::Current).unwrap();
    assert_eq!(e.stats().solves, 2);
    // Open loop: the 1k carries no current and drops nothing.
    assert_eq!(r.undefined, None);
    assert_abs_diff_eq!(r.current, 0.0, epsilon = 1e-12);
    assert_abs_diff_eq!(r.voltage, 0.0, epsilon = 1e-9);
}

#[test]
fn test_rejected_requests_leave_board_unchanged() {
    let script = "\
place 0 0 resistor 100
place 0 0 supply
wire 0 0 1 1
click 3 3
click 4 4
place 99 0 wire
place 1 1 resistor 0
";
    let parsed = parser::parse(script).unwrap();
    let mut session = Session::new(Engine::default());
    let errors = parsed
        .commands
        .iter()
        .filter(|cmd| session.apply(cmd).is_err())
        .count();
    assert_eq!(errors, 5);
    let board = session.engine().board();
    assert_eq!(board.component_count(), 1);
    assert_eq!(board.wire_count(), 0);
    assert_eq!(board.revision(), 1);
}

// ── Output ────────────────────────────────────────────────────────

#[test]
fn test_solution_csv() {
    let mut e = series_engine(SolverKind::SparseLu);
    let mut buf = Vec::new();
    output::write_solution_csv(e.solution(), &mut buf).unwrap();
    let csv = String::from_utf8(buf).unwrap();
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("Variable,Value"));
    let value = |name: &str| -> f64 {
        csv.lines()
            .find_map(|l| l.strip_prefix(name).and_then(|rest| rest.strip_prefix(',')))
            .unwrap_or_else(|| panic!("{name} missing from:\n{csv}"))
            .parse()
            .unwrap()
    };
    assert_abs_diff_eq!(value("V(r0c0)"), 9.0, epsilon = 1e-9);
    assert_abs_diff_eq!(value("V(r0c4)"), 6.0, epsilon = 1e-9);
    assert_abs_diff_eq!(value("I(R@r0c2)"), 0.003, epsilon = 1e-12);
    assert_abs_diff_eq!(value("I(V@r1c0)"), -0.003, epsilon = 1e-12);
    // Three nodes plus three elements.
    assert_eq!(csv.lines().count(), 1 + 3 + 3);
}
