//! Logic Bridge - run one query against an interactive logic engine.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use logic_bridge::config::ConfigLoader;
use logic_bridge::display;
use logic_bridge::{Backend, Session, SessionError};

#[derive(Parser)]
#[command(
    name = "logic-bridge",
    about = "Query XSB, SWI, ECLiPSe or Flora-2 through one interface",
    version
)]
struct Cli {
    /// Engine to run (xsb, swi, eclipse, flora2).
    backend: Backend,

    /// Goal to evaluate.
    query: String,

    /// Source files to load before querying.
    #[arg(short, long = "consult", value_name = "FILE")]
    consult: Vec<PathBuf>,

    /// Engine executable, overriding the configuration.
    #[arg(short, long, value_name = "PATH")]
    executable: Option<PathBuf>,

    /// Configuration file, instead of the default search paths.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print one JSON object per solution.
    #[arg(long)]
    json: bool,

    /// Stop after this many solutions.
    #[arg(short, long)]
    limit: Option<usize>,

    /// Do not truncate long terms.
    #[arg(long)]
    raw: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn run(cli: &Cli) -> Result<(), SessionError> {
    let loader = cli
        .config
        .clone()
        .map_or_else(ConfigLoader::new, ConfigLoader::with_path);
    let config = loader.load()?;

    let mut options = config.options_for(cli.backend).clone();
    if let Some(executable) = &cli.executable {
        options.executable = Some(executable.clone());
    }

    let mut session = Session::open(cli.backend, options)?;
    if !cli.json {
        display::print_session_start(session.backend(), session.pid());
    }

    for path in &cli.consult {
        session.consult_file(path)?;
        if !cli.json {
            display::print_consulted(&path.display().to_string());
        }
    }

    let limit = cli.limit.unwrap_or(usize::MAX);
    let mut count = 0;
    let limited;
    {
        let mut solutions = session.query(&cli.query)?;
        for solution in solutions.by_ref().take(limit) {
            let solution = solution?;
            count += 1;
            if cli.json {
                if let Err(e) = display::print_solution_json(&solution) {
                    tracing::warn!(error = %e, "Failed to serialize solution");
                }
            } else {
                display::print_solution(count, &solution, cli.raw);
            }
        }
        limited = count == limit && solutions.may_have_more();
        if limited {
            solutions.stop()?;
        }
    }

    if !cli.json {
        display::print_summary(count, limited);
    }
    tracing::info!(stats = ?session.stats(), "Query finished");
    session.close();
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            display::print_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
