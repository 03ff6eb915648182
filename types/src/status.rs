//! Status and error envelopes written to the host process.
//!
//! Every record shares a small header (`version`, `contentType`) flattened
//! into the top-level JSON object.

use serde::{Deserialize, Serialize};

use crate::ProgressSnapshot;

/// Envelope version stamped on every outgoing record.
pub const ENVELOPE_VERSION: &str = "0.1";

/// Closed set of error codes understood by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    None = 0,
    Unknown = 1,
    MalformedParameters = 2,
    MissingParameters = 3,
    MigrationFailed = 4,
    MigrationAborted = 5,
    VMDisappeared = 6,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 7] = [
        ErrorCode::None,
        ErrorCode::Unknown,
        ErrorCode::MalformedParameters,
        ErrorCode::MissingParameters,
        ErrorCode::MigrationFailed,
        ErrorCode::MigrationAborted,
        ErrorCode::VMDisappeared,
    ];

    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }

    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|candidate| candidate.code() == code)
    }

    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            ErrorCode::None => "none",
            ErrorCode::Unknown => "unexpected error",
            ErrorCode::MalformedParameters => "malformed parameters",
            ErrorCode::MissingParameters => "missing parameters",
            ErrorCode::MigrationFailed => "libvirt migration failed",
            ErrorCode::MigrationAborted => "migration aborted",
            ErrorCode::VMDisappeared => "VM disappeared",
        }
    }
}

/// Human-readable text for a raw wire code; codes outside the table map to `"unknown"`.
#[must_use]
pub fn describe(code: i32) -> &'static str {
    ErrorCode::from_code(code).map_or("unknown", ErrorCode::describe)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Error,
    Status,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    pub version: String,
    pub content_type: ContentType,
}

impl Header {
    #[must_use]
    pub fn new(version: impl Into<String>, content_type: ContentType) -> Self {
        Self {
            version: version.into(),
            content_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorData {
    pub code: i32,
    pub message: String,
    pub details: String,
}

/// `{version, contentType: "error", timestamp, error: {code, message, details}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    #[serde(flatten)]
    pub header: Header,
    pub timestamp: i64,
    pub error: ErrorData,
}

impl ErrorMessage {
    /// `timestamp` is unix seconds; the caller owns the clock.
    #[must_use]
    pub fn new(
        version: impl Into<String>,
        code: ErrorCode,
        details: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            header: Header::new(version, ContentType::Error),
            timestamp,
            error: ErrorData {
                code: code.code(),
                message: code.describe().to_owned(),
                details: details.into(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusData {
    pub iteration: i64,
    pub action: String,
    pub progress: ProgressSnapshot,
}

/// Progress notice emitted when a convergence action has been applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    #[serde(flatten)]
    pub header: Header,
    pub timestamp: i64,
    pub status: StatusData,
}

impl StatusMessage {
    #[must_use]
    pub fn new(version: impl Into<String>, status: StatusData, timestamp: i64) -> Self {
        Self {
            header: Header::new(version, ContentType::Status),
            timestamp,
            status,
        }
    }
}
