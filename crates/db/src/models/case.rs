//! Case entity model, the case-plus-latest-entry view, and DTOs.

use medreview_core::case::CaseSnapshot;
use medreview_core::error::CoreError;
use medreview_core::status::{CaseType, StepStatus};
use medreview_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `cases` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Case {
    pub id: DbId,
    pub record_id: DbId,
    pub case_type_id: i16,
    pub seat: Option<i16>,
    pub due_date: Option<Timestamp>,
    pub content_updated_at: Timestamp,
    pub attested_by: Option<DbId>,
    pub attested_at: Option<Timestamp>,
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for opening a new case on a record.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCase {
    pub record_id: DbId,
    pub case_type_id: i16,
    pub seat: Option<i16>,
    pub due_date: Option<Timestamp>,
}

/// A case joined with its latest workflow entry and lookup names.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CaseView {
    pub id: DbId,
    pub record_id: DbId,
    pub case_type_id: i16,
    pub case_type_name: String,
    pub seat: Option<i16>,
    pub due_date: Option<Timestamp>,
    pub content_updated_at: Timestamp,
    pub attested_by: Option<DbId>,
    pub attested_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub step_status_id: i16,
    pub status_name: String,
    pub assignee_id: Option<DbId>,
    pub latest_entry_id: DbId,
    pub status_changed_at: Timestamp,
}

impl CaseView {
    pub fn case_type(&self) -> Result<CaseType, CoreError> {
        CaseType::from_id(self.case_type_id).ok_or_else(|| {
            CoreError::Internal(format!(
                "Case {} has unknown case type id {}",
                self.id, self.case_type_id
            ))
        })
    }

    pub fn status(&self) -> Result<StepStatus, CoreError> {
        StepStatus::from_id(self.step_status_id).ok_or_else(|| {
            CoreError::Internal(format!(
                "Case {} has unknown step status id {}",
                self.id, self.step_status_id
            ))
        })
    }

    /// Convert to the value the decision functions work on.
    pub fn to_snapshot(&self) -> Result<CaseSnapshot, CoreError> {
        Ok(CaseSnapshot {
            case_id: self.id,
            case_type: self.case_type()?,
            record_id: self.record_id,
            seat: self.seat,
            status: self.status()?,
            assignee_id: self.assignee_id,
            latest_entry_id: self.latest_entry_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn view(case_type_id: i16, step_status_id: i16) -> CaseView {
        let now = Utc::now();
        CaseView {
            id: 7,
            record_id: 3,
            case_type_id,
            case_type_name: String::new(),
            seat: Some(1),
            due_date: None,
            content_updated_at: now,
            attested_by: None,
            attested_at: None,
            created_at: now,
            step_status_id,
            status_name: String::new(),
            assignee_id: Some(11),
            latest_entry_id: 70,
            status_changed_at: now,
        }
    }

    #[test]
    fn snapshot_carries_latest_entry_state() {
        let s = view(1, 3).to_snapshot().unwrap();
        assert_eq!(s.case_type, CaseType::Abstraction);
        assert_eq!(s.status, StepStatus::InProgress);
        assert_eq!(s.assignee_id, Some(11));
        assert_eq!(s.latest_entry_id, 70);
    }

    #[test]
    fn unknown_ids_are_internal_errors() {
        assert!(matches!(view(99, 3).to_snapshot(), Err(CoreError::Internal(_))));
        assert!(matches!(view(1, 99).to_snapshot(), Err(CoreError::Internal(_))));
    }
}
