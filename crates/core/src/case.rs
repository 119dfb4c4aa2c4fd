//! Read-only case snapshots handed to the decision functions.

use serde::Serialize;

use crate::status::{CaseType, StepStatus};
use crate::types::DbId;

/// First abstraction seat on a record.
pub const SEAT_ONE: i16 = 1;

/// Second abstraction seat on a record.
pub const SEAT_TWO: i16 = 2;

/// A case together with the state of its latest workflow entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseSnapshot {
    pub case_id: DbId,
    pub case_type: CaseType,
    pub record_id: DbId,
    /// Abstraction seat (1 or 2); `None` for other case types.
    pub seat: Option<i16>,
    pub status: StepStatus,
    pub assignee_id: Option<DbId>,
    pub latest_entry_id: DbId,
}

impl CaseSnapshot {
    pub fn is_completed(&self) -> bool {
        self.status == StepStatus::Completed
    }
}

/// The other abstraction seat on the same record.
pub fn paired_seat(seat: i16) -> i16 {
    if seat == SEAT_ONE {
        SEAT_TWO
    } else {
        SEAT_ONE
    }
}
