//! Adverse-event finding model.

use medreview_core::irr::FindingKey;
use medreview_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `adverse_event_findings` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Finding {
    pub id: DbId,
    pub case_id: DbId,
    pub trigger_id: DbId,
    pub adverse_event_type_id: Option<DbId>,
    pub harm_category_id: Option<DbId>,
    pub present_on_admission: Option<bool>,
    pub description: Option<String>,
    pub position: i32,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Finding {
    pub fn key(&self) -> FindingKey {
        FindingKey {
            finding_id: self.id,
            trigger_id: self.trigger_id,
            adverse_event_type_id: self.adverse_event_type_id,
            harm_category_id: self.harm_category_id,
            present_on_admission: self.present_on_admission,
        }
    }
}
