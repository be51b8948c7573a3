#![warn(clippy::all, clippy::pedantic, clippy::nursery, rust_2018_idioms)]
#![forbid(unsafe_code)]

use anyhow::Context;
use clap::error::ErrorKind;
use clap::Parser;
use cli::Args;
use echoping::config::defaults::PROBE_INTERVAL;
use echoping::driver::run_trials;
use echoping::{Error, ProbeConfig, Session};
use std::io;
use std::process::ExitCode;

mod cli;

/// Exit status for an invalid command line.
const EXIT_BAD_CONFIG: u8 = 1;

/// Exit status when the target cannot be resolved or the socket opened.
const EXIT_SETUP_FAILED: u8 = 2;

/// Exit status when results cannot be written.
const EXIT_OUTPUT_FAILED: u8 = 3;

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            // help and version go to stdout, usage errors to stderr
            let _ = err.print();
            return ExitCode::from(parse_error_code(&err));
        }
    };
    configure_logging(&args);
    let config = match make_config(&args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err:#}");
            return ExitCode::from(EXIT_BAD_CONFIG);
        }
    };
    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(run_error_code(&err))
        }
    }
}

fn parse_error_code(err: &clap::Error) -> u8 {
    match err.kind() {
        ErrorKind::DisplayHelp
        | ErrorKind::DisplayVersion
        | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => 0,
        _ => EXIT_BAD_CONFIG,
    }
}

fn run_error_code(err: &anyhow::Error) -> u8 {
    let fatal = err
        .chain()
        .any(|cause| cause.downcast_ref::<Error>().is_some_and(Error::is_fatal));
    if fatal {
        EXIT_SETUP_FAILED
    } else {
        EXIT_OUTPUT_FAILED
    }
}

fn configure_logging(args: &Args) {
    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(&args.log_filter)
            .with_writer(std::io::stderr)
            .compact()
            .init();
    }
}

fn make_config(args: &Args) -> anyhow::Result<ProbeConfig> {
    let timeout = humantime::parse_duration(&args.timeout)
        .with_context(|| format!("invalid timeout: {}", args.timeout))?;
    Ok(ProbeConfig::new(
        args.address.as_deref().unwrap_or_default(),
        args.count,
        args.identifier,
        timeout,
    )?)
}

/// Open a session and run every trial against it.
///
/// The session, and with it the socket, is dropped on every exit path from
/// here.
fn run(config: &ProbeConfig) -> anyhow::Result<()> {
    let mut session = Session::open(config)
        .with_context(|| format!("failed to start session for {}", config.target()))?;
    let stdout = io::stdout();
    run_trials(&mut session, config, &mut stdout.lock(), PROBE_INTERVAL)
        .context("failed to write results")
}
