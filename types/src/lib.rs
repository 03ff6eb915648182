//! Core domain types for convsched.
//!
//! This crate contains the convergence schedule model, the host-facing status
//! envelopes and the progress snapshot. No async, no process control: the
//! only IO is decoding from a caller-supplied reader.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

mod interval;
mod progress;
mod schedule;
pub mod status;

pub use interval::{DurationError, parse_duration};
pub use progress::ProgressSnapshot;
pub use schedule::{
    ACTION_ABORT, ACTION_ENABLE_POST_COPY, ACTION_SET_DOWNTIME, ActionName, ConvergenceAction,
    ConvergenceItem, ConvergenceSchedule, ConvergenceScheduleConfiguration, DecodeError,
    EmptyActionNameError,
};
pub use status::{ENVELOPE_VERSION, ErrorCode, describe};
