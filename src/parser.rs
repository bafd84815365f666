//! Session script parser.
//!
//! Parses a line-oriented trainer script into a [`Script`] of commands.
//!
//! # Supported syntax
//!
//! ```text
//! * comment line
//! place ROW COL supply [VOLTS]     (defaults to the 9 V battery)
//! place ROW COL resistor OHMS
//! place ROW COL wire               (wire segment occupying the cell)
//! clear ROW COL
//! wire R1 C1 R2 C2
//! unwire R1 C1 R2 C2
//! click ROW COL                    (one click of the wiring tool)
//! probe ROW COL [A|B]
//! mode VOLTAGE|CURRENT
//! reset                            (drop a pending probe)
//! solution                         (dump node voltages and currents)
//! .END
//! ```
//!
//! Keywords are case-insensitive. Values support engineering suffixes: T, G,
//! MEG, K, M, U, N, P, F (case-insensitive).

use nom::branch::alt;
use nom::bytes::complete::tag_no_case;
use nom::character::complete::{space0, space1, u32 as dec_u32};
use nom::combinator::{map, opt, value};
use nom::number::complete::double;
use nom::sequence::preceded;
use nom::IResult;
use nom::Parser;

use crate::error::{Result, TrainerError};
use crate::ir::{Cell, Command, Component, MeterMode, Probe, Script, Terminal, DEFAULT_SUPPLY_VOLTAGE};

/// Parse a session script.
pub fn parse(input: &str) -> Result<Script> {
    let mut commands = Vec::new();

    for (line_num, raw_line) in input.lines().enumerate() {
        let line = raw_line.trim();

        if line.is_empty() || line.starts_with('*') {
            continue;
        }

        let keyword = line.split_whitespace().next().unwrap_or_default().to_ascii_lowercase();
        if keyword == ".end" {
            break;
        }
        let args = line[keyword.len()..].trim_start();

        let parsed = match keyword.as_str() {
            "place" => parse_place(args),
            "clear" => complete(args, cell).map(|cell| Command::Clear { cell }),
            "wire" => complete(args, cell_pair).map(|(a, b)| Command::Wire { a, b }),
            "unwire" => complete(args, cell_pair).map(|(a, b)| Command::Unwire { a, b }),
            "click" => complete(args, cell).map(|cell| Command::Click { cell }),
            "probe" => complete(args, probe).map(Command::Probe),
            "mode" => complete(args, meter_mode).map(Command::Mode),
            "reset" => complete(args, |i| Ok((i, ()))).map(|_| Command::ResetProbes),
            "solution" => complete(args, |i| Ok((i, ()))).map(|_| Command::DumpSolution),
            _ => {
                return Err(TrainerError::Parse(format!(
                    "line {}: unknown command '{}': {}",
                    line_num + 1,
                    keyword,
                    raw_line
                )));
            }
        };
        commands.push(parsed.map_err(|e| parse_err(line_num, raw_line, &e))?);
    }

    Ok(Script { commands })
}

fn parse_err(line_num: usize, raw_line: &str, detail: &str) -> TrainerError {
    TrainerError::Parse(format!("line {}: {} in: {}", line_num + 1, detail, raw_line))
}

/// Run `parser` over the whole argument string; trailing text is an error.
fn complete<'a, O>(
    args: &'a str,
    mut parser: impl FnMut(&'a str) -> IResult<&'a str, O>,
) -> std::result::Result<O, String> {
    let (rest, out) = parser(args).map_err(|_| "malformed arguments".to_string())?;
    let (rest, _) = space0::<&str, nom::error::Error<&str>>(rest).map_err(|_| "malformed arguments".to_string())?;
    if !rest.is_empty() {
        return Err(format!("unexpected trailing input '{}'", rest));
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Engineering suffix value parser
// ---------------------------------------------------------------------------

/// Parse a numeric value with optional engineering suffix.
/// Handles: 10k, 4.7, 1MEG, 1e3, -3.3, etc.
fn eng_value(input: &str) -> IResult<&str, f64> {
    let (rest, num) = double(input)?;
    let (rest, suffix) = opt(eng_suffix).parse(rest)?;
    let multiplier = suffix.unwrap_or(1.0);
    Ok((rest, num * multiplier))
}

/// Match an engineering suffix and return its multiplier.
fn eng_suffix(input: &str) -> IResult<&str, f64> {
    // MEG before M
    alt((
        map(tag_no_case("MEG"), |_: &str| 1e6),
        map(tag_no_case("T"), |_: &str| 1e12),
        map(tag_no_case("G"), |_: &str| 1e9),
        map(tag_no_case("K"), |_: &str| 1e3),
        map(tag_no_case("M"), |_: &str| 1e-3),
        map(tag_no_case("U"), |_: &str| 1e-6),
        map(tag_no_case("N"), |_: &str| 1e-9),
        map(tag_no_case("P"), |_: &str| 1e-12),
        map(tag_no_case("F"), |_: &str| 1e-15),
    ))
    .parse(input)
}

// ---------------------------------------------------------------------------
// Token parsers
// ---------------------------------------------------------------------------

/// `ROW COL`
fn cell(input: &str) -> IResult<&str, Cell> {
    map((dec_u32, space1, dec_u32), |(row, _, col)| Cell::new(row, col)).parse(input)
}

/// `R1 C1 R2 C2`
fn cell_pair(input: &str) -> IResult<&str, (Cell, Cell)> {
    map((cell, space1, cell), |(a, _, b)| (a, b)).parse(input)
}

fn terminal(input: &str) -> IResult<&str, Terminal> {
    alt((value(Terminal::A, tag_no_case("a")), value(Terminal::B, tag_no_case("b")))).parse(input)
}

/// `ROW COL [A|B]`
fn probe(input: &str) -> IResult<&str, Probe> {
    map((cell, opt(preceded(space1, terminal))), |(cell, terminal)| Probe { cell, terminal }).parse(input)
}

fn meter_mode(input: &str) -> IResult<&str, MeterMode> {
    alt((
        value(MeterMode::Voltage, tag_no_case("voltage")),
        value(MeterMode::Current, tag_no_case("current")),
    ))
    .parse(input)
}

// ---------------------------------------------------------------------------
// place
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
enum PlaceKind {
    Supply,
    Resistor,
    Wire,
}

fn place_kind(input: &str) -> IResult<&str, PlaceKind> {
    alt((
        value(PlaceKind::Supply, tag_no_case("supply")),
        value(PlaceKind::Resistor, tag_no_case("resistor")),
        value(PlaceKind::Wire, tag_no_case("wire")),
    ))
    .parse(input)
}

/// Parse the arguments of: place ROW COL KIND [VALUE]
fn parse_place(args: &str) -> std::result::Result<Command, String> {
    let (cell, kind, amount) = complete(args, |i| {
        map(
            (cell, space1, place_kind, opt(preceded(space1, eng_value))),
            |(cell, _, kind, amount)| (cell, kind, amount),
        )
        .parse(i)
    })
    .map_err(|e| format!("failed to parse placement: {}", e))?;

    let component = match (kind, amount) {
        (PlaceKind::Supply, voltage) => Component::supply(voltage.unwrap_or(DEFAULT_SUPPLY_VOLTAGE)),
        (PlaceKind::Resistor, Some(resistance)) => Component::resistor(resistance),
        (PlaceKind::Resistor, None) => return Err("resistor needs a resistance".to_string()),
        (PlaceKind::Wire, None) => Component::WireSegment,
        (PlaceKind::Wire, Some(_)) => return Err("wire segment takes no value".to_string()),
    };
    Ok(Command::Place { cell, component })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn single(line: &str) -> Command {
        let script = parse(line).unwrap();
        assert_eq!(script.commands.len(), 1, "{line}");
        script.commands[0].clone()
    }

    // ---- Engineering suffix tests ----

    #[test]
    fn test_eng_value_plain_number() {
        let (rest, val) = eng_value("100").unwrap();
        assert_eq!(rest, "");
        assert!((val - 100.0).abs() < 1e-12);
    }

    #[test]
    fn test_eng_value_kilo() {
        let (_, val) = eng_value("4.7k").unwrap();
        assert!((val - 4_700.0).abs() < 1e-6);
    }

    #[test]
    fn test_eng_value_mega_before_milli() {
        let (_, meg) = eng_value("1MEG").unwrap();
        let (_, milli) = eng_value("1m").unwrap();
        assert!((meg - 1e6).abs() < 1e-3);
        assert!((milli - 1e-3).abs() < 1e-15);
    }

    #[test]
    fn test_eng_value_scientific_notation() {
        let (_, val) = eng_value("2.2e3").unwrap();
        assert!((val - 2200.0).abs() < 1e-9);
    }

    // ---- Placement tests ----

    #[test]
    fn test_parse_resistor() {
        match single("place 0 2 resistor 1k") {
            Command::Place { cell, component } => {
                assert_eq!(cell, Cell::new(0, 2));
                assert_eq!(component, Component::resistor(1000.0));
            }
            other => panic!("expected Place, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_supply_default_voltage() {
        assert_eq!(
            single("PLACE 1 0 Supply"),
            Command::Place {
                cell: Cell::new(1, 0),
                component: Component::supply(9.0)
            }
        );
        assert_eq!(
            single("place 1 0 supply 5"),
            Command::Place {
                cell: Cell::new(1, 0),
                component: Component::supply(5.0)
            }
        );
    }

    #[test]
    fn test_parse_wire_segment() {
        assert_eq!(
            single("place 3 3 wire"),
            Command::Place {
                cell: Cell::new(3, 3),
                component: Component::WireSegment
            }
        );
        assert!(parse("place 3 3 wire 5").is_err());
    }

    #[test]
    fn test_resistor_requires_value() {
        let err = parse("place 0 0 resistor").unwrap_err();
        assert!(err.to_string().contains("resistance"), "{err}");
    }

    // ---- Wiring and probe tests ----

    #[test]
    fn test_parse_wire_and_unwire() {
        assert_eq!(
            single("wire 0 0 0 4"),
            Command::Wire {
                a: Cell::new(0, 0),
                b: Cell::new(0, 4)
            }
        );
        assert_eq!(
            single("unwire 2 1 5 1"),
            Command::Unwire {
                a: Cell::new(2, 1),
                b: Cell::new(5, 1)
            }
        );
    }

    #[test]
    fn test_parse_probe_with_terminal() {
        assert_eq!(single("probe 4 5"), Command::Probe(Probe::cell(Cell::new(4, 5))));
        assert_eq!(
            single("probe 4 5 B"),
            Command::Probe(Probe::terminal(Cell::new(4, 5), Terminal::B))
        );
        assert!(parse("probe 4 5 c").is_err());
    }

    #[test]
    fn test_parse_mode_reset_solution() {
        let script = parse("mode current\nmode VOLTAGE\nreset\nsolution\nclick 1 1\nclear 1 1").unwrap();
        assert_eq!(
            script.commands,
            vec![
                Command::Mode(MeterMode::Current),
                Command::Mode(MeterMode::Voltage),
                Command::ResetProbes,
                Command::DumpSolution,
                Command::Click { cell: Cell::new(1, 1) },
                Command::Clear { cell: Cell::new(1, 1) },
            ]
        );
    }

    // ---- Script structure tests ----

    #[test]
    fn test_comments_blank_lines_and_end() {
        let script = "\
* series loop
place 1 0 supply

wire 0 0 1 0
.END
wire 9 9 9 0
";
        assert_eq!(parse(script).unwrap().commands.len(), 2);
    }

    #[test]
    fn test_error_reports_line_number() {
        let err = parse("place 0 0 supply\nwire 0 0 x 1").unwrap_err();
        assert!(err.to_string().contains("line 2"), "{err}");
        let err = parse("\n\nfrobnicate 1 2").unwrap_err();
        assert!(err.to_string().contains("line 3"), "{err}");
        assert!(err.to_string().contains("frobnicate"), "{err}");
    }

    #[test]
    fn test_trailing_input_rejected() {
        assert!(parse("clear 1 1 1").is_err());
        assert!(parse("reset now").is_err());
    }
}
