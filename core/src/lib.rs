//! Convergence logic for convsched.
//!
//! This crate executes convergence actions against a migration controller,
//! drives a schedule from the monitoring loop, and writes the host-facing
//! status and error records. It never terminates the process itself: the
//! abort path hands back a [`ProcessExit`] for the outermost loop to act on.

pub mod dispatch;
pub mod monitor;
pub mod report;

#[cfg(test)]
mod test_support;

pub use dispatch::{DispatchError, MigrationController, execute};
pub use monitor::{ConvergenceMonitor, TickOutcome};
pub use report::{ABORT_EXIT_STATUS, ProcessExit, Reporter, abort, report, try_report};
