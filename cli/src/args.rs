use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "convsched", version)]
#[command(about = "Inspect and run live-migration convergence schedules")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub(crate) enum Command {
    /// Print a summary of a configuration message
    Show {
        /// JSON configuration message; omit or pass '-' to read stdin
        file: Option<PathBuf>,
    },
    /// Drive a simulated migration with the schedule
    Run {
        /// JSON configuration message; omit or pass '-' to read stdin
        file: Option<PathBuf>,
        #[command(flatten)]
        overrides: RunOverrides,
    },
}

/// Command-line values that take precedence over `[simulation]` config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Args)]
pub(crate) struct RunOverrides {
    /// Number of monitor ticks before giving up
    #[arg(long, value_name = "N")]
    pub(crate) iterations: Option<u32>,
    /// Tick after which the simulated migration stops making progress
    #[arg(long, value_name = "N")]
    pub(crate) stall_from: Option<u32>,
    /// Wait for the monitor interval between ticks
    #[arg(long)]
    pub(crate) realtime: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Input {
    Stdin,
    File(PathBuf),
}

impl From<Option<PathBuf>> for Input {
    fn from(file: Option<PathBuf>) -> Self {
        match file {
            Some(path) if path.as_os_str() != "-" => Input::File(path),
            _ => Input::Stdin,
        }
    }
}
