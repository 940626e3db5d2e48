//! Step display brightness and gamma through `xrandr`.
//!
//! Reads the last applied values from the state document
//! (`$XDG_CONFIG_HOME/xrandrctl/outputs.json` by default), adjusts the
//! requested outputs, runs the display tool once per output, and writes the
//! document back.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::debug;
use xrandrctl::core::selector::parse_selectors;
use xrandrctl::dispatch::{self, RunOptions, RunReport};
use xrandrctl::error::ControlError;
use xrandrctl::exit_codes;
use xrandrctl::io::config::{default_config_path, load_effective_config};
use xrandrctl::io::executor::{DryRunRunner, XrandrRunner};
use xrandrctl::io::state_store::StateStore;
use xrandrctl::logging;

const INSTRUCTIONS_HELP: &str = "\
Instructions:
  [OUTPUT|ALIAS|all] FLAG...   flags apply to the name before them;
                               flags with no name apply to every output
Flags:
  --brighter  --dimmer  --redder  --bluer  --reset  --from-file <PATH>
With no instructions, the stored values are re-applied to every output.
Options must come before the first instruction.";

#[derive(Parser, Debug)]
#[command(
    name = "xrandrctl",
    version,
    about = "Step display brightness and gamma through xrandr",
    after_help = INSTRUCTIONS_HELP
)]
struct Cli {
    /// State document to read and update.
    #[arg(long, value_name = "PATH")]
    state: Option<PathBuf>,

    /// Config file (TOML). Missing file means defaults.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print the display tool invocations instead of running them; nothing is written.
    #[arg(long)]
    dry_run: bool,

    /// Output names or aliases, each followed by adjustment flags.
    #[arg(
        value_name = "INSTRUCTION",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    instructions: Vec<String>,
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let cfg = load_effective_config(cli.config.as_deref(), default_config_path().ok())?;
    let state_path = cfg.resolve_state_path(cli.state.as_deref())?;
    debug!(state = %state_path.display(), "state path resolved");

    let selectors = match parse_selectors(&cli.instructions) {
        Ok(selectors) => selectors,
        Err(err) => return Ok(report_fatal(&err)),
    };
    let mut store = match StateStore::load(&state_path) {
        Ok(store) => store,
        Err(err) => return Ok(report_fatal(&err)),
    };

    let options = RunOptions {
        defaults: cfg.defaults,
        persist: !cli.dry_run,
    };
    let report = if cli.dry_run {
        let runner = DryRunRunner {
            program: cfg.program.clone(),
        };
        dispatch::run(&mut store, &selectors, &runner, &options)
    } else {
        let runner = XrandrRunner::from_config(&cfg);
        dispatch::run(&mut store, &selectors, &runner, &options)
    };

    Ok(summarize(&report))
}

fn report_fatal(err: &ControlError) -> i32 {
    eprintln!("error: {}", err);
    exit_codes::for_error(err)
}

/// Print every failure of the run and pick the exit code.
fn summarize(report: &RunReport) -> i32 {
    if report.is_success() {
        return exit_codes::OK;
    }
    for failure in report.failures.iter().chain(&report.persist_error) {
        eprintln!("error: {}", failure);
    }
    eprintln!(
        "{} failure(s); {} entr{} applied",
        report.failures.len() + usize::from(report.persist_error.is_some()),
        report.applied.len(),
        if report.applied.len() == 1 { "y" } else { "ies" }
    );
    match &report.persist_error {
        Some(err) => exit_codes::for_error(err),
        None => exit_codes::FAILED,
    }
}
