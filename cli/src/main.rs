//! convsched CLI - hosts the outer monitoring loop for a convergence schedule.
//!
//! # Architecture
//!
//! The binary owns everything the library crates deliberately leave out:
//! reading the configuration message, pacing ticks, and terminating the
//! process.
//!
//! ```text
//! main() -> read message -> ConvergenceMonitor::tick() per interval -> SimulatedMigration
//!                                   |
//!                                   v
//!                   Reporter (stdout records) | ProcessExit::exit()
//! ```
//!
//! Stdout carries only newline-delimited JSON records for the host; logs go
//! to stderr.

mod args;
mod sim;

use anyhow::{Context, Result};
use clap::Parser;
use std::{
    fs,
    io::{self, Read, Stdout},
    time::Duration,
};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use convsched_config::{ConvschedConfig, SimulationConfig};
use convsched_core::{ConvergenceMonitor, MigrationController, ProcessExit, Reporter, TickOutcome};
use convsched_types::status::StatusData;
use convsched_types::{ConvergenceScheduleConfiguration, ENVELOPE_VERSION, ErrorCode};

use args::{Cli, Command, Input, RunOverrides};
use sim::{MigrationState, SimulatedMigration};

/// Shortest tick accepted by the realtime pacer.
const MIN_TICK: Duration = Duration::from_millis(1);

fn init_tracing(default_filter: Option<&str>) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter.unwrap_or("info")))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_ansi(false).with_writer(io::stderr))
        .with(env_filter)
        .init();
}

enum RunResult {
    Finished,
    Exit(ProcessExit),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let (config, config_warning) = match ConvschedConfig::load() {
        Ok(config) => (config, None),
        Err(err) => (None, Some(err.to_string())),
    };
    init_tracing(config.as_ref().and_then(ConvschedConfig::log_filter));
    if let Some(warning) = config_warning {
        tracing::warn!("{warning}; using defaults");
    }

    let cli = Cli::parse();

    let version = config
        .as_ref()
        .and_then(ConvschedConfig::report_version)
        .unwrap_or(ENVELOPE_VERSION);
    let mut reporter = Reporter::with_version(io::stdout(), version);

    let result = match cli.command {
        Command::Show { file } => show(&Input::from(file), &mut reporter)?,
        Command::Run { file, overrides } => {
            let simulation = resolve_simulation(config.as_ref(), &overrides);
            run(&Input::from(file), simulation, &mut reporter).await?
        }
    };

    match result {
        RunResult::Finished => Ok(()),
        RunResult::Exit(exit) => exit.exit(),
    }
}

fn resolve_simulation(
    config: Option<&ConvschedConfig>,
    overrides: &RunOverrides,
) -> SimulationConfig {
    let mut simulation = config.map(ConvschedConfig::simulation).unwrap_or_default();
    if let Some(iterations) = overrides.iterations {
        simulation.iterations = iterations;
    }
    if let Some(stall_from) = overrides.stall_from {
        simulation.stall_from = stall_from;
    }
    simulation.realtime |= overrides.realtime;
    simulation
}

fn read_input(input: &Input) -> Result<Vec<u8>> {
    match input {
        Input::Stdin => {
            let mut buf = Vec::new();
            io::stdin()
                .read_to_end(&mut buf)
                .context("failed to read configuration from stdin")?;
            Ok(buf)
        }
        Input::File(path) => fs::read(path)
            .with_context(|| format!("failed to read configuration from {}", path.display())),
    }
}

/// Reads and decodes the configuration message, or aborts with one error record.
fn load_configuration(
    input: &Input,
    reporter: &mut Reporter<Stdout>,
) -> Result<ConvergenceScheduleConfiguration, ProcessExit> {
    let bytes = read_input(input)
        .map_err(|err| reporter.abort(ErrorCode::MissingParameters, &format!("{err:#}")))?;
    ConvergenceScheduleConfiguration::decode(&bytes)
        .map_err(|err| reporter.abort(ErrorCode::MalformedParameters, &err.to_string()))
}

fn show(input: &Input, reporter: &mut Reporter<Stdout>) -> Result<RunResult> {
    let config = match load_configuration(input, reporter) {
        Ok(config) => config,
        Err(exit) => return Ok(RunResult::Exit(exit)),
    };
    let schedule = config.schedule();

    println!("schedule:         {schedule}");
    println!("monitor interval: {:?}", config.monitor_interval());
    println!("stalling items:   {}", schedule.remaining());
    println!("post-copy:        {}", schedule.has_postcopy());
    Ok(RunResult::Finished)
}

async fn run(
    input: &Input,
    simulation: SimulationConfig,
    reporter: &mut Reporter<Stdout>,
) -> Result<RunResult> {
    let config = match load_configuration(input, reporter) {
        Ok(config) => config,
        Err(exit) => return Ok(RunResult::Exit(exit)),
    };

    let mut monitor = ConvergenceMonitor::new(config);
    let interval = monitor.monitor_interval();
    let iterations = simulation.iterations;
    let mut ticker = simulation.realtime.then(|| {
        let mut ticker = tokio::time::interval(interval.max(MIN_TICK));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        ticker
    });
    let mut migration = SimulatedMigration::new(simulation, interval);

    tracing::info!(
        schedule = %monitor.schedule(),
        ?interval,
        iterations,
        "Starting simulated migration"
    );

    for _ in 0..iterations {
        if let Some(ticker) = ticker.as_mut() {
            ticker.tick().await;
        }

        migration.advance();
        if migration.is_finished() {
            break;
        }

        let iteration = migration.progress().iteration;
        match monitor.tick(iteration, &mut migration) {
            Ok(TickOutcome::Applied(action)) => reporter.status(StatusData {
                iteration,
                action: action.to_string(),
                progress: migration.progress(),
            }),
            Ok(TickOutcome::Idle | TickOutcome::Exhausted) => {}
            Err(err) => {
                return Ok(RunResult::Exit(reporter.abort(err.error_code(), &err.to_string())));
            }
        }

        if migration.state() == MigrationState::Aborted {
            let details =
                format!("convergence schedule aborted migration at iteration {iteration}");
            return Ok(RunResult::Exit(reporter.abort(ErrorCode::MigrationAborted, &details)));
        }
    }

    // Post-copy started on the last tick still finishes.
    if migration.state() == MigrationState::PostCopy {
        migration.advance();
    }
    if migration.state() == MigrationState::Completed {
        let progress = migration.progress();
        tracing::info!(
            iteration = progress.iteration,
            elapsed = ?progress.elapsed,
            "Migration completed"
        );
        return Ok(RunResult::Finished);
    }

    let details = format!(
        "migration still {} after {iterations} ticks ({}% transferred)",
        migration.state(),
        migration.progress().percentage()
    );
    Ok(RunResult::Exit(reporter.abort(ErrorCode::MigrationFailed, &details)))
}
