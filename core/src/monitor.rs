//! Drives a convergence schedule from the monitoring loop.

use std::time::Duration;

use convsched_types::{ConvergenceAction, ConvergenceSchedule, ConvergenceScheduleConfiguration};

use crate::dispatch::{DispatchError, MigrationController, execute};

/// Result of one monitoring tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The front stalling item is not due yet.
    Idle,
    /// A stalling action was popped and executed.
    Applied(ConvergenceAction),
    /// No stalling items remain; nothing will fire again.
    Exhausted,
}

/// Single owner of a schedule for the lifetime of one migration.
///
/// Init actions run once, in order, before the first stalling evaluation. An
/// init action that fails is not attempted again; the error is returned and
/// the next tick resumes with the following init action.
#[derive(Debug, Clone)]
pub struct ConvergenceMonitor {
    schedule: ConvergenceSchedule,
    monitor_interval: Duration,
    init_cursor: usize,
}

impl ConvergenceMonitor {
    #[must_use]
    pub fn new(config: ConvergenceScheduleConfiguration) -> Self {
        let (schedule, monitor_interval) = config.into_parts();
        Self::from_schedule(schedule, monitor_interval)
    }

    #[must_use]
    pub fn from_schedule(schedule: ConvergenceSchedule, monitor_interval: Duration) -> Self {
        Self {
            schedule,
            monitor_interval,
            init_cursor: 0,
        }
    }

    #[must_use]
    pub fn schedule(&self) -> &ConvergenceSchedule {
        &self.schedule
    }

    #[must_use]
    pub fn monitor_interval(&self) -> Duration {
        self.monitor_interval
    }

    #[must_use]
    pub fn init_done(&self) -> bool {
        self.init_cursor >= self.schedule.init().len()
    }

    /// Runs every init action not yet attempted.
    pub fn apply_init<C>(&mut self, controller: &mut C) -> Result<(), DispatchError<C::Error>>
    where
        C: MigrationController + ?Sized,
    {
        while let Some(action) = self.schedule.init().get(self.init_cursor) {
            self.init_cursor += 1;
            tracing::info!(%action, "Applying init action");
            execute(action, controller)?;
        }
        Ok(())
    }

    /// Feeds one iteration sample into the schedule.
    ///
    /// Pops and executes at most one stalling action. A popped action whose
    /// execution fails is consumed all the same.
    pub fn tick<C>(
        &mut self,
        iteration: i64,
        controller: &mut C,
    ) -> Result<TickOutcome, DispatchError<C::Error>>
    where
        C: MigrationController + ?Sized,
    {
        self.apply_init(controller)?;

        if self.schedule.is_exhausted() {
            return Ok(TickOutcome::Exhausted);
        }
        let Some(action) = self.schedule.pop_action(iteration) else {
            tracing::debug!(
                iteration,
                remaining = self.schedule.remaining(),
                "No stalling action due"
            );
            return Ok(TickOutcome::Idle);
        };

        tracing::info!(
            %action,
            iteration,
            remaining = self.schedule.remaining(),
            "Applying stalling action"
        );
        if let Err(err) = execute(&action, controller) {
            tracing::warn!(%action, "Stalling action failed: {err}");
            return Err(err);
        }
        Ok(TickOutcome::Applied(action))
    }

    /// Operator-triggered abort, bypassing the schedule.
    pub fn abort<C>(&mut self, controller: &mut C) -> Result<(), DispatchError<C::Error>>
    where
        C: MigrationController + ?Sized,
    {
        tracing::info!("Operator abort requested");
        execute(&ConvergenceAction::abort(), controller)
    }
}
