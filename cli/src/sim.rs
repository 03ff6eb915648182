//! Simulated migration controller used by `convsched run`.
//!
//! Each tick transfers `bandwidth` bytes until the migration stalls at
//! `stall_from`; from then on only the iteration counter advances. A stalled
//! migration still converges once the allowed downtime is long enough to
//! flush what remains, and post-copy always completes on the following tick.

use std::fmt;
use std::time::Duration;

use convsched_config::SimulationConfig;
use convsched_core::MigrationController;
use convsched_types::ProgressSnapshot;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MigrationState {
    Running,
    PostCopy,
    Completed,
    Aborted,
}

impl fmt::Display for MigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MigrationState::Running => "running",
            MigrationState::PostCopy => "post-copy",
            MigrationState::Completed => "completed",
            MigrationState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub(crate) enum SimulationError {
    #[error("migration is {state}, cannot {operation}")]
    NotRunning {
        state: MigrationState,
        operation: &'static str,
    },
    #[error("downtime must not be negative: {0}ms")]
    NegativeDowntime(i64),
}

#[derive(Debug)]
pub(crate) struct SimulatedMigration {
    config: SimulationConfig,
    tick_length: Duration,
    ticks: u32,
    iteration: i64,
    processed: u64,
    downtime_ms: Option<u64>,
    state: MigrationState,
}

impl SimulatedMigration {
    pub(crate) fn new(config: SimulationConfig, tick_length: Duration) -> Self {
        Self {
            config,
            tick_length,
            ticks: 0,
            iteration: 0,
            processed: 0,
            downtime_ms: None,
            state: MigrationState::Running,
        }
    }

    pub(crate) fn state(&self) -> MigrationState {
        self.state
    }

    pub(crate) fn is_finished(&self) -> bool {
        matches!(
            self.state,
            MigrationState::Completed | MigrationState::Aborted
        )
    }

    fn remaining(&self) -> u64 {
        self.config.data_total.saturating_sub(self.processed)
    }

    /// Bytes that fit in the currently allowed downtime window.
    fn downtime_capacity(&self) -> u64 {
        let Some(downtime_ms) = self.downtime_ms else {
            return 0;
        };
        let capacity = u128::from(self.config.bandwidth) * u128::from(downtime_ms) / 1000;
        u64::try_from(capacity).unwrap_or(u64::MAX)
    }

    /// Advances the simulated migration by one monitor tick.
    pub(crate) fn advance(&mut self) {
        match self.state {
            MigrationState::Completed | MigrationState::Aborted => return,
            MigrationState::PostCopy => {
                self.processed = self.config.data_total;
                self.state = MigrationState::Completed;
                return;
            }
            MigrationState::Running => {}
        }

        self.ticks += 1;
        if self.ticks <= self.config.stall_from {
            self.processed = self
                .processed
                .saturating_add(self.config.bandwidth)
                .min(self.config.data_total);
        } else {
            self.iteration += 1;
        }

        if self.remaining() <= self.downtime_capacity() || self.remaining() == 0 {
            self.processed = self.config.data_total;
            self.state = MigrationState::Completed;
        }
    }

    fn ensure_running(&self, operation: &'static str) -> Result<(), SimulationError> {
        if self.state == MigrationState::Running {
            Ok(())
        } else {
            Err(SimulationError::NotRunning {
                state: self.state,
                operation,
            })
        }
    }
}

impl MigrationController for SimulatedMigration {
    type Error = SimulationError;

    fn set_downtime(&mut self, downtime_ms: i64) -> Result<(), Self::Error> {
        self.ensure_running("set downtime")?;
        let downtime = u64::try_from(downtime_ms)
            .map_err(|_err| SimulationError::NegativeDowntime(downtime_ms))?;
        tracing::info!(downtime_ms = downtime, "Simulated downtime updated");
        self.downtime_ms = Some(downtime);
        Ok(())
    }

    fn start_post_copy(&mut self) -> Result<(), Self::Error> {
        self.ensure_running("start post-copy")?;
        tracing::info!("Simulated migration switched to post-copy");
        self.state = MigrationState::PostCopy;
        Ok(())
    }

    fn abort(&mut self) -> Result<(), Self::Error> {
        if self.state == MigrationState::Completed {
            return Err(SimulationError::NotRunning {
                state: self.state,
                operation: "abort",
            });
        }
        tracing::info!("Simulated migration aborted");
        self.state = MigrationState::Aborted;
        Ok(())
    }

    fn progress(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            iteration: self.iteration,
            data_total: self.config.data_total,
            data_processed: self.processed,
            data_remaining: self.remaining(),
            elapsed: self.tick_length.saturating_mul(self.ticks),
        }
    }
}
