//! Record (patient encounter) model.

use medreview_core::assignment::RecordFacts;
use medreview_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `records` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Record {
    pub id: DbId,
    pub external_ref: String,
    pub supporting_file_count: i32,
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Record {
    pub fn facts(&self) -> RecordFacts {
        RecordFacts {
            has_supporting_files: self.supporting_file_count > 0,
        }
    }
}

/// DTO for registering a record.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRecord {
    pub external_ref: String,
    pub supporting_file_count: Option<i32>,
}
