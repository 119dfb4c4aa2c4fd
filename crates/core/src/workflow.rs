//! Workflow transition rules and generated transition notes.
//!
//! The log itself lives in storage; this module decides which status a
//! requested transition lands on, what the log entry says about it, and
//! the ordering/staleness checks the append step runs inside its
//! transaction.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::status::StepStatus;
use crate::types::{DbId, Timestamp};

/// Maximum length for a reopen reason.
pub const MAX_REOPEN_REASON_LENGTH: usize = 2_000;

/// What a caller is asking the workflow to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    Assign,
    Unassign,
    Start,
    Complete,
    Reopen,
}

/// One entry to be appended to a case's workflow log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    pub case_id: DbId,
    pub step_status: StepStatus,
    pub recipient_user_id: Option<DbId>,
    pub sending_user_id: DbId,
    pub note: String,
    pub reopen_reason: Option<String>,
    /// The latest entry id the caller based this transition on.
    pub expected_latest_id: DbId,
}

/// Resolve the status a transition lands on from the current status.
///
/// Requests that would leave the case where it already is fail with
/// `Conflict`; requests that are illegal from the current status fail with
/// `Validation`.
pub fn next_status(kind: TransitionKind, current: StepStatus) -> Result<StepStatus, CoreError> {
    use StepStatus::*;

    match (kind, current) {
        (TransitionKind::Assign, Completed) => Err(CoreError::Validation(
            "Case is already completed and cannot be assigned".into(),
        )),
        (TransitionKind::Assign, _) => Ok(NotStarted),

        (TransitionKind::Unassign, Completed) => Err(CoreError::Validation(
            "Case is already completed and cannot be unassigned".into(),
        )),
        (TransitionKind::Unassign, Unassigned) => {
            Err(CoreError::Conflict("Case is already unassigned".into()))
        }
        (TransitionKind::Unassign, _) => Ok(Unassigned),

        (TransitionKind::Start, NotStarted) => Ok(InProgress),
        (TransitionKind::Start, InProgress) => {
            Err(CoreError::Conflict("Case is already in progress".into()))
        }
        (TransitionKind::Start, other) => Err(CoreError::Validation(format!(
            "Cannot start a case that is {}",
            other.phrase()
        ))),

        (TransitionKind::Complete, InProgress) => Ok(Completed),
        (TransitionKind::Complete, Completed) => {
            Err(CoreError::Conflict("Case is already completed".into()))
        }
        (TransitionKind::Complete, other) => Err(CoreError::Validation(format!(
            "Cannot complete a case that is {}",
            other.phrase()
        ))),

        (TransitionKind::Reopen, Completed) => Ok(InProgress),
        (TransitionKind::Reopen, other) => Err(CoreError::Validation(format!(
            "Only completed cases can be reopened; case is {}",
            other.phrase()
        ))),
    }
}

/// Validate and normalise a reopen reason. Reopening requires one.
pub fn validate_reopen_reason(reason: Option<&str>) -> Result<String, CoreError> {
    let reason = reason.map(str::trim).unwrap_or_default();
    if reason.is_empty() {
        return Err(CoreError::Validation(
            "A reason is required to reopen a completed case".into(),
        ));
    }
    if reason.chars().count() > MAX_REOPEN_REASON_LENGTH {
        return Err(CoreError::Validation(format!(
            "Reopen reason exceeds maximum length of {MAX_REOPEN_REASON_LENGTH} characters"
        )));
    }
    Ok(reason.to_string())
}

/// Human-readable note stored with every log entry.
pub fn transition_note(
    kind: TransitionKind,
    previous: Option<StepStatus>,
    next: StepStatus,
    actor: &str,
    recipient: Option<&str>,
) -> String {
    let action = match (kind, recipient) {
        (TransitionKind::Assign, Some(r)) => format!("Assigned to {r} by {actor}"),
        (TransitionKind::Assign, None) => format!("Assigned by {actor}"),
        (TransitionKind::Unassign, _) => format!("Unassigned by {actor}"),
        (TransitionKind::Start, _) => format!("Started by {actor}"),
        (TransitionKind::Complete, _) => format!("Completed by {actor}"),
        (TransitionKind::Reopen, _) => format!("Reopened by {actor}"),
    };
    match previous {
        Some(prev) => format!("{action} ({} -> {})", prev.phrase(), next.phrase()),
        None => format!("{action} ({})", next.phrase()),
    }
}

/// Fail with `Conflict` when the latest entry moved since the caller read it.
pub fn check_expected_latest(
    case_id: DbId,
    expected: DbId,
    actual: Option<DbId>,
) -> Result<(), CoreError> {
    match actual {
        Some(id) if id == expected => Ok(()),
        Some(id) => Err(CoreError::Conflict(format!(
            "Case {case_id} was updated by another request (expected entry {expected}, found {id}); reload and retry"
        ))),
        None => Err(CoreError::Conflict(format!(
            "Case {case_id} has no current workflow entry; reload and retry"
        ))),
    }
}

/// Timestamp for a new entry: never earlier than the entry it supersedes.
pub fn next_entry_timestamp(previous: Option<Timestamp>, now: Timestamp) -> Timestamp {
    match previous {
        Some(prev) if prev > now => prev,
        _ => now,
    }
}
