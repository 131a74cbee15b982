//! hellojs - Main Entry Point
//!
//! Evaluates the JavaScript given as the only argument, with `rand`,
//! `srand` and `system` available to it.

use anyhow::Context;
use clap::Parser;
use hellojs_runtime::{HostConfig, HostError};
use std::ffi::OsString;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: hellojs CODE
CODE can be any JS code. It can also use these functions:
  rand() - return a pseudorandom number
  srand(seed) - seed the random number generator
  system(cmd) - run a command
";

/// Environment variable holding the log filter
const LOG_ENV: &str = "HELLOJS_LOG";

#[derive(Debug, Parser)]
#[command(name = "hellojs", disable_help_flag = true, disable_version_flag = true)]
struct Cli {
    /// JavaScript source to evaluate
    #[arg(allow_hyphen_values = true)]
    code: OsString,
}

/// Parse the command line, or `None` unless it holds exactly one argument
/// after the program name. A literal `--` counts as an argument but is never
/// taken as CODE.
fn parse_args<I>(args: I) -> Option<Cli>
where
    I: IntoIterator<Item = OsString>,
{
    let args: Vec<OsString> = args.into_iter().collect();
    if args.len() != 2 || args[1] == "--" {
        return None;
    }
    Cli::try_parse_from(args).ok()
}

fn main() -> ExitCode {
    // Anything but exactly one argument gets the usage text, before the
    // engine is touched.
    let Some(cli) = parse_args(std::env::args_os()) else {
        eprint!("{USAGE}");
        return ExitCode::FAILURE;
    };

    let config = match setup() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("hellojs: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    // Arguments that are not valid UTF-8 are evaluated with replacement
    // characters, like any other text the engine is handed.
    let code = cli.code.to_string_lossy();
    match hellojs_runtime::run(&config, &code) {
        Ok(value) => {
            tracing::debug!(?value, "Script completed");
            ExitCode::SUCCESS
        }
        Err(HostError::Script(err)) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
        Err(err @ HostError::Init(_)) => {
            tracing::debug!(%err, "Engine initialization failed");
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("hellojs: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize logging and load configuration
fn setup() -> anyhow::Result<HostConfig> {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to install log subscriber: {err}"))?;

    HostConfig::from_env().context("invalid configuration")
}
