use circuit_trainer::config::{SolverKind, TrainerConfig};
use circuit_trainer::engine::Engine;
use circuit_trainer::ir::Command;
use circuit_trainer::output;
use circuit_trainer::parser;
use circuit_trainer::session::{Outcome, Session};
use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;

/// Grid circuit trainer: build a board from a script and read the meter
#[derive(Parser)]
#[command(name = "circuit-trainer", version)]
struct Cli {
    /// Session script to run
    script: PathBuf,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Board rows (overrides the config file)
    #[arg(long)]
    rows: Option<u32>,

    /// Board columns (overrides the config file)
    #[arg(long)]
    cols: Option<u32>,

    /// Linear solver backend
    #[arg(long, value_enum)]
    solver: Option<SolverKind>,

    /// Echo every accepted command
    #[arg(short, long)]
    verbose: bool,

    /// Print performance stats to stderr
    #[arg(long)]
    stats: bool,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &cli.config {
        Some(path) => TrainerConfig::load(path).unwrap_or_else(|e| {
            eprintln!("Error loading {}: {}", path.display(), e);
            std::process::exit(1);
        }),
        None => TrainerConfig::default(),
    };
    if let Some(rows) = cli.rows {
        config.rows = rows;
    }
    if let Some(cols) = cli.cols {
        config.cols = cols;
    }
    if let Some(solver) = cli.solver {
        config.solver = solver;
    }

    let engine = Engine::new(config).unwrap_or_else(|e| {
        eprintln!("{}", e);
        std::process::exit(1);
    });

    let input = std::fs::read_to_string(&cli.script).unwrap_or_else(|e| {
        eprintln!("Error reading {}: {}", cli.script.display(), e);
        std::process::exit(1);
    });

    let script = parser::parse(&input).unwrap_or_else(|e| {
        eprintln!("{}", e);
        std::process::exit(1);
    });

    let mut session = Session::new(engine);
    let mut stdout = io::stdout().lock();
    let mut stderr = io::stderr();

    for (index, command) in script.commands.iter().enumerate() {
        let outcome = match session.apply(command) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::debug!(?command, "command rejected");
                output::write_topology_error(index + 1, &e, &mut stderr).unwrap_or_else(exit_on_output_error);
                continue;
            }
        };
        report(&mut session, command, &outcome, cli.verbose, &mut stdout).unwrap_or_else(exit_on_output_error);
    }

    if let Err(e) = stdout.flush() {
        exit_on_output_error(e.into());
    }
    if cli.stats {
        session.engine().stats().display();
    }
}

fn report<W: Write>(
    session: &mut Session,
    command: &Command,
    outcome: &Outcome,
    verbose: bool,
    out: &mut W,
) -> circuit_trainer::Result<()> {
    match outcome {
        Outcome::Measured { a, b, result } => {
            let fault = if result.valid {
                None
            } else {
                session.engine_mut().solution().fault.as_ref().map(|f| f.to_string())
            };
            output::write_measurement(*a, *b, result, fault.as_deref(), out)
        }
        Outcome::SolutionRequested => output::write_solution_csv(session.engine_mut().solution(), out),
        other => {
            if verbose {
                if let Some(line) = output::describe(other) {
                    writeln!(out, "{}", line)?;
                }
            } else {
                tracing::trace!(?command, "applied");
            }
            Ok(())
        }
    }
}

fn exit_on_output_error(e: circuit_trainer::TrainerError) {
    eprintln!("Output error: {}", e);
    std::process::exit(1);
}
