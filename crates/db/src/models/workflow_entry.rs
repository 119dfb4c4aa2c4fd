//! Workflow log entry model.

use medreview_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `workflow_entries` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WorkflowEntry {
    pub id: DbId,
    pub case_id: DbId,
    pub step_status_id: i16,
    pub recipient_user_id: Option<DbId>,
    pub sending_user_id: Option<DbId>,
    pub note: String,
    pub reopen_reason: Option<String>,
    pub is_latest: bool,
    pub entry_at: Timestamp,
    pub created_at: Timestamp,
}

/// Result of trying to append to a case's log.
#[derive(Debug)]
pub enum AppendOutcome {
    Appended(WorkflowEntry),
    /// The caller's expected latest entry is no longer latest.
    Stale { actual_latest_id: Option<DbId> },
}
