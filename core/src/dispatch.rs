//! Action dispatch onto a migration controller.
//!
//! The dispatcher is stateless: each call validates the action's parameters
//! and performs at most one controller call. Nothing is retried here.

use std::num::ParseIntError;

use convsched_types::{ActionName, ConvergenceAction, ErrorCode, ProgressSnapshot};
use thiserror::Error;

/// Capability surface of the hypervisor-facing migration controller.
///
/// Calls are treated as synchronous and blocking; the dispatcher never times
/// out or cancels them.
pub trait MigrationController {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Sets the maximum tolerated downtime, in milliseconds.
    fn set_downtime(&mut self, downtime_ms: i64) -> Result<(), Self::Error>;
    fn start_post_copy(&mut self) -> Result<(), Self::Error>;
    fn abort(&mut self) -> Result<(), Self::Error>;
    fn progress(&self) -> ProgressSnapshot;
}

#[derive(Debug, Error)]
pub enum DispatchError<E> {
    #[error("action {action} requires parameter {index}")]
    MissingParameters { action: ActionName, index: usize },
    #[error("action {action} got malformed parameter {value:?}: {source}")]
    MalformedParameters {
        action: ActionName,
        value: String,
        #[source]
        source: ParseIntError,
    },
    #[error("unknown convergence action: {name}")]
    UnknownAction { name: String },
    #[error("migration controller failed: {0}")]
    Actuator(#[source] E),
}

impl<E> DispatchError<E> {
    /// Error code to surface to the host when this failure ends the migration.
    #[must_use]
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::MissingParameters { .. } => ErrorCode::MissingParameters,
            Self::MalformedParameters { .. } => ErrorCode::MalformedParameters,
            Self::UnknownAction { .. } => ErrorCode::Unknown,
            Self::Actuator(_) => ErrorCode::MigrationFailed,
        }
    }

    /// The controller's own error, if the failure came from the controller.
    pub fn into_actuator(self) -> Option<E> {
        match self {
            Self::Actuator(err) => Some(err),
            _ => None,
        }
    }
}

/// Executes a single convergence action against `controller`.
pub fn execute<C>(
    action: &ConvergenceAction,
    controller: &mut C,
) -> Result<(), DispatchError<C::Error>>
where
    C: MigrationController + ?Sized,
{
    tracing::debug!(%action, "Dispatching convergence action");
    match action.name() {
        ActionName::SetDowntime => {
            let downtime = parse_downtime::<C::Error>(action)?;
            controller
                .set_downtime(downtime)
                .map_err(DispatchError::Actuator)
        }
        ActionName::EnablePostCopy => controller.start_post_copy().map_err(DispatchError::Actuator),
        ActionName::Abort => controller.abort().map_err(DispatchError::Actuator),
        ActionName::Unknown(name) => Err(DispatchError::UnknownAction { name: name.clone() }),
    }
}

fn parse_downtime<E>(action: &ConvergenceAction) -> Result<i64, DispatchError<E>> {
    let raw = action
        .param(0)
        .ok_or_else(|| DispatchError::MissingParameters {
            action: action.name().clone(),
            index: 0,
        })?;
    raw.parse::<i64>()
        .map_err(|source| DispatchError::MalformedParameters {
            action: action.name().clone(),
            value: raw.to_owned(),
            source,
        })
}
