//! Host-facing status and error records.
//!
//! The sink is the last line of communication with the host process: each
//! record is serialized in full, then written with a single `write_all` and a
//! trailing newline. `report` swallows write failures since there is nowhere
//! left to send them; `try_report` returns them.

use std::io::{self, Write};

use convsched_types::status::{ErrorMessage, StatusData, StatusMessage};
use convsched_types::{ENVELOPE_VERSION, ErrorCode};
use serde::Serialize;

/// Exit status used when the host process is aborted.
pub const ABORT_EXIT_STATUS: i32 = 1;

/// Request to terminate the hosting process.
///
/// Returned by the abort path instead of exiting in place; only the
/// outermost control loop should call [`ProcessExit::exit`].
#[must_use = "the outermost loop must terminate the process"]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    status: i32,
}

impl ProcessExit {
    pub const fn abort() -> Self {
        Self {
            status: ABORT_EXIT_STATUS,
        }
    }

    #[must_use]
    pub const fn status(self) -> i32 {
        self.status
    }

    pub fn exit(self) -> ! {
        std::process::exit(self.status)
    }
}

fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Serializes `record` and writes it as one newline-terminated line.
pub fn write_record<W, T>(sink: &mut W, record: &T) -> io::Result<()>
where
    W: Write + ?Sized,
    T: Serialize,
{
    let mut line = serde_json::to_vec(record)?;
    line.push(b'\n');
    sink.write_all(&line)?;
    sink.flush()
}

/// Writes records stamped with a fixed envelope version.
#[derive(Debug)]
pub struct Reporter<W> {
    sink: W,
    version: String,
}

impl<W: Write> Reporter<W> {
    pub fn new(sink: W) -> Self {
        Self::with_version(sink, ENVELOPE_VERSION)
    }

    pub fn with_version(sink: W, version: impl Into<String>) -> Self {
        Self {
            sink,
            version: version.into(),
        }
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn sink_mut(&mut self) -> &mut W {
        &mut self.sink
    }

    pub fn into_inner(self) -> W {
        self.sink
    }

    pub fn try_report(&mut self, code: ErrorCode, details: &str) -> io::Result<()> {
        let message = ErrorMessage::new(self.version.as_str(), code, details, unix_now());
        write_record(&mut self.sink, &message)
    }

    pub fn report(&mut self, code: ErrorCode, details: &str) {
        if let Err(err) = self.try_report(code, details) {
            tracing::debug!(code = code.code(), "Dropped error record: {err}");
        }
    }

    /// Status records share the error path's swallow-on-failure contract.
    pub fn status(&mut self, status: StatusData) {
        let message = StatusMessage::new(self.version.as_str(), status, unix_now());
        if let Err(err) = write_record(&mut self.sink, &message) {
            tracing::debug!("Dropped status record: {err}");
        }
    }

    /// Reports `code` and hands back the request to terminate.
    pub fn abort(&mut self, code: ErrorCode, details: &str) -> ProcessExit {
        tracing::error!(code = code.code(), %details, "Aborting: {}", code.describe());
        self.report(code, details);
        ProcessExit::abort()
    }
}

pub fn try_report<W: Write>(sink: W, code: ErrorCode, details: &str) -> io::Result<()> {
    Reporter::new(sink).try_report(code, details)
}

/// Writes one error record; write failures are discarded.
pub fn report<W: Write>(sink: W, code: ErrorCode, details: &str) {
    Reporter::new(sink).report(code, details);
}

pub fn abort<W: Write>(sink: W, code: ErrorCode, details: &str) -> ProcessExit {
    Reporter::new(sink).abort(code, details)
}
