//! In-memory migration controller for unit tests.

use convsched_types::ProgressSnapshot;
use thiserror::Error;

use crate::MigrationController;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Call {
    SetDowntime(i64),
    StartPostCopy,
    Abort,
}

#[derive(Debug, Error)]
#[error("{0}")]
pub(crate) struct ControllerFailure(pub(crate) String);

#[derive(Debug, Default)]
pub(crate) struct RecordingController {
    pub(crate) calls: Vec<Call>,
    pub(crate) fail_with: Option<String>,
}

impl RecordingController {
    pub(crate) fn failing(message: &str) -> Self {
        Self {
            calls: Vec::new(),
            fail_with: Some(message.to_owned()),
        }
    }

    fn record(&mut self, call: Call) -> Result<(), ControllerFailure> {
        self.calls.push(call);
        match &self.fail_with {
            Some(message) => Err(ControllerFailure(message.clone())),
            None => Ok(()),
        }
    }
}

impl MigrationController for RecordingController {
    type Error = ControllerFailure;

    fn set_downtime(&mut self, downtime_ms: i64) -> Result<(), Self::Error> {
        self.record(Call::SetDowntime(downtime_ms))
    }

    fn start_post_copy(&mut self) -> Result<(), Self::Error> {
        self.record(Call::StartPostCopy)
    }

    fn abort(&mut self) -> Result<(), Self::Error> {
        self.record(Call::Abort)
    }

    fn progress(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            iteration: self.calls.len() as i64,
            ..ProgressSnapshot::default()
        }
    }
}
