//! # Strata CLI
//!
//! Layered settings resolution from the command line.
//!
//! ## Startup sequence
//!
//! 1. Parse CLI arguments (clap handles `--help` / `--version` early-exit).
//! 2. Initialise the tracing subscriber, including the (empty) JSON-lines
//!    sink registry.
//! 3. Resolve the CLI configuration (project, settings and secrets paths).
//! 4. Build the [`OutputManager`].
//! 5. Dispatch to the appropriate command handler.
//! 6. Translate any [`CliError`] into a user-facing message and exit code.
//!
//! ## Exit codes
//!
//! | Code | Meaning                    |
//! |------|----------------------------|
//! |  0   | Success                    |
//! |  1   | Internal / system error    |
//! |  2   | User / input error         |
//! |  3   | Setting not found          |
//! |  4   | Settings or template error |

use std::process::ExitCode;

use clap::Parser;
use strata_adapters::JsonFileSinks;
use tracing::{debug, info, instrument};

use crate::{
    cli::{Cli, Commands},
    config::AppConfig,
    error::{CliError, CliResult},
    logging::init_logging,
    output::OutputManager,
};

mod cli;
mod commands;
mod config;
mod error;
mod logging;
mod output;

fn main() -> ExitCode {
    // ── 1. Parse arguments ────────────────────────────────────────────────
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version are reported as "errors" by clap.
            let code = if e.use_stderr() { 2 } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    // ── 2. Initialise tracing ─────────────────────────────────────────────
    let sinks = JsonFileSinks::new();
    if let Err(e) = init_logging(&cli.global, &sinks) {
        eprintln!("Failed to initialise logging: {e}");
        return ExitCode::from(1);
    }

    debug!(
        verbose = cli.global.verbose,
        quiet = cli.global.quiet,
        no_color = cli.global.no_color,
        "CLI started"
    );

    let verbose = cli.global.verbose > 0;

    // ── 3. Resolve configuration ──────────────────────────────────────────
    let config = match AppConfig::resolve(&cli.global) {
        Ok(cfg) => cfg,
        Err(e) => return handle_error(e, verbose),
    };
    debug!(?config, "Configuration resolved");

    // ── 4. Build output manager ───────────────────────────────────────────
    let output = OutputManager::new(&cli.global);
    debug!(
        format = ?output.format(),
        color = output.supports_color(),
        "Output configured"
    );

    // ── 5. Dispatch + 6. Error handling ──────────────────────────────────
    match run(cli.command, &config, &output, sinks) {
        Ok(()) => {
            info!("Strata completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => handle_error(e, verbose),
    }
}

/// Dispatch to the correct command handler.
#[instrument(skip_all)]
fn run(
    command: Commands,
    config: &AppConfig,
    output: &OutputManager,
    sinks: JsonFileSinks,
) -> CliResult<()> {
    match command {
        Commands::Get(args) => commands::get::execute(&args, config, output, sinks),
        Commands::List => commands::list::execute(config, output, sinks),
        Commands::Layers => commands::layers::execute(config, output, sinks),
        Commands::Init(args) => commands::init::execute(&args, config, output),
        Commands::Completions(args) => commands::completions::execute(&args),
    }
}

/// Translate a `CliError` into a user message and an appropriate exit code.
fn handle_error(err: CliError, verbose: bool) -> ExitCode {
    err.log();

    // Written straight to stderr so the message survives a redirected stdout.
    let msg = if std::io::IsTerminal::is_terminal(&std::io::stderr()) {
        err.format_colored(verbose)
    } else {
        err.format_plain(verbose)
    };
    eprint!("{msg}");

    ExitCode::from(err.exit_code())
}

// ── tests ─────────────────────────────────────────────────────────────────────
