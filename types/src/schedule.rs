//! Convergence schedule data model.
//!
//! A schedule is decoded once from an untrusted JSON message at migration
//! start and then only ever shrinks: the monitoring loop pops at most one
//! stalling item per call, strictly from the front.

use std::collections::VecDeque;
use std::fmt;
use std::io::Read;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ── Action names ─────────────────────────────────────────────

/// Wire name of the abort action.
pub const ACTION_ABORT: &str = "abort";
/// Wire name of the post-copy switch action.
pub const ACTION_ENABLE_POST_COPY: &str = "postcopy";
/// Wire name of the downtime adjustment action.
pub const ACTION_SET_DOWNTIME: &str = "setDowntime";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("convergence action name must not be empty")]
pub struct EmptyActionNameError;

/// Name of a convergence action, resolved once at decode time.
///
/// Names outside the recognized set are kept as [`ActionName::Unknown`] so a
/// newer schedule still decodes; they are rejected when executed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ActionName {
    Abort,
    EnablePostCopy,
    SetDowntime,
    Unknown(String),
}

impl ActionName {
    pub fn parse(value: impl Into<String>) -> Result<Self, EmptyActionNameError> {
        let value = value.into();
        if value.is_empty() {
            return Err(EmptyActionNameError);
        }
        Ok(match value.as_str() {
            ACTION_ABORT => Self::Abort,
            ACTION_ENABLE_POST_COPY => Self::EnablePostCopy,
            ACTION_SET_DOWNTIME => Self::SetDowntime,
            _ => Self::Unknown(value),
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Abort => ACTION_ABORT,
            Self::EnablePostCopy => ACTION_ENABLE_POST_COPY,
            Self::SetDowntime => ACTION_SET_DOWNTIME,
            Self::Unknown(name) => name,
        }
    }

    #[must_use]
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl TryFrom<String> for ActionName {
    type Error = EmptyActionNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl TryFrom<&str> for ActionName {
    type Error = EmptyActionNameError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ActionName> for String {
    fn from(value: ActionName) -> Self {
        match value {
            ActionName::Unknown(name) => name,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for ActionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Actions and items ────────────────────────────────────────

/// A named corrective operation plus its declarative parameters.
///
/// Parameters are not validated here; arity and format are checked when the
/// action is executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvergenceAction {
    name: ActionName,
    #[serde(default)]
    params: Vec<String>,
}

impl ConvergenceAction {
    #[must_use]
    pub fn new(name: ActionName, params: Vec<String>) -> Self {
        Self { name, params }
    }

    #[must_use]
    pub fn abort() -> Self {
        Self::new(ActionName::Abort, Vec::new())
    }

    #[must_use]
    pub fn enable_post_copy() -> Self {
        Self::new(ActionName::EnablePostCopy, Vec::new())
    }

    /// Downtime is carried as text, exactly as it would arrive on the wire.
    #[must_use]
    pub fn set_downtime(downtime_ms: i64) -> Self {
        Self::new(ActionName::SetDowntime, vec![downtime_ms.to_string()])
    }

    #[must_use]
    pub fn name(&self) -> &ActionName {
        &self.name
    }

    #[must_use]
    pub fn params(&self) -> &[String] {
        &self.params
    }

    #[must_use]
    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }
}

impl fmt::Display for ConvergenceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.params.join(", "))
    }
}

/// "Apply `action` once the observed iteration exceeds `limit`."
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvergenceItem {
    action: ConvergenceAction,
    limit: i64,
}

impl ConvergenceItem {
    #[must_use]
    pub fn new(action: ConvergenceAction, limit: i64) -> Self {
        Self { action, limit }
    }

    #[must_use]
    pub fn action(&self) -> &ConvergenceAction {
        &self.action
    }

    #[must_use]
    pub fn limit(&self) -> i64 {
        self.limit
    }

    #[must_use]
    pub fn is_due(&self, iteration: i64) -> bool {
        self.limit < iteration
    }

    #[must_use]
    pub fn into_action(self) -> ConvergenceAction {
        self.action
    }
}

impl fmt::Display for ConvergenceItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.action, self.limit)
    }
}

// ── Schedule ─────────────────────────────────────────────────

#[derive(Debug, Error)]
#[error("invalid convergence schedule: {0}")]
pub struct DecodeError(#[from] serde_json::Error);

/// One-shot init actions plus the ordered stalling steps.
///
/// Both lists must be present on the wire; either may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvergenceSchedule {
    init: Vec<ConvergenceAction>,
    stalling: VecDeque<ConvergenceItem>,
}

impl ConvergenceSchedule {
    #[must_use]
    pub fn new(init: Vec<ConvergenceAction>, stalling: Vec<ConvergenceItem>) -> Self {
        Self {
            init,
            stalling: stalling.into(),
        }
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn load<R: Read>(reader: R) -> Result<Self, DecodeError> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    #[must_use]
    pub fn init(&self) -> &[ConvergenceAction] {
        &self.init
    }

    pub fn stalling(&self) -> impl ExactSizeIterator<Item = &ConvergenceItem> {
        self.stalling.iter()
    }

    /// Number of stalling items not yet popped.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.stalling.len()
    }

    /// No stalling action will ever fire again.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.stalling.is_empty()
    }

    #[must_use]
    pub fn peek(&self) -> Option<&ConvergenceItem> {
        self.stalling.front()
    }

    /// Whether any remaining stalling item switches to post-copy.
    ///
    /// Scans the current contents, so the answer changes as items are popped.
    #[must_use]
    pub fn has_postcopy(&self) -> bool {
        self.stalling
            .iter()
            .any(|item| item.action.name == ActionName::EnablePostCopy)
    }

    /// Pops the front stalling action if its limit is below `iteration`.
    ///
    /// Advances by at most one item per call even when later limits are also
    /// exceeded; callers poll once per monitoring tick. An exhausted schedule
    /// yields `None`.
    pub fn pop_action(&mut self, iteration: i64) -> Option<ConvergenceAction> {
        if !self.stalling.front()?.is_due(iteration) {
            return None;
        }
        self.stalling.pop_front().map(ConvergenceItem::into_action)
    }
}

impl fmt::Display for ConvergenceSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{ init=[")?;
        write_joined(f, self.init.iter())?;
        f.write_str("] stalling=[")?;
        write_joined(f, self.stalling.iter())?;
        f.write_str("] }")
    }
}

fn write_joined<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    items: impl Iterator<Item = T>,
) -> fmt::Result {
    for (index, item) in items.enumerate() {
        if index > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

// ── Configuration message ────────────────────────────────────

/// A schedule plus the cadence at which the external monitor samples progress.
///
/// The interval is stored, not enforced; pacing belongs to the monitoring loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvergenceScheduleConfiguration {
    schedule: ConvergenceSchedule,
    #[serde(with = "crate::interval::wire")]
    monitor_interval: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ConfigurationMessage {
    configuration: ConvergenceScheduleConfiguration,
}

impl ConvergenceScheduleConfiguration {
    #[must_use]
    pub fn new(schedule: ConvergenceSchedule, monitor_interval: Duration) -> Self {
        Self {
            schedule,
            monitor_interval,
        }
    }

    /// Decodes a `{"configuration": {...}}` envelope.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let message: ConfigurationMessage = serde_json::from_slice(bytes)?;
        Ok(message.configuration)
    }

    pub fn load<R: Read>(reader: R) -> Result<Self, DecodeError> {
        let message: ConfigurationMessage = serde_json::from_reader(reader)?;
        Ok(message.configuration)
    }

    /// Encodes back into the `{"configuration": {...}}` envelope.
    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        let message = ConfigurationMessage {
            configuration: self.clone(),
        };
        serde_json::to_vec(&message)
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
    pub fn into_parts(self) -> (ConvergenceSchedule, Duration) {
        (self.schedule, self.monitor_interval)
    }
}
