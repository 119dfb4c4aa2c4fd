//! IRR match record model.

use medreview_core::findings::MatchSides;
use medreview_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `irr_matches` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct IrrMatch {
    pub id: DbId,
    pub consensus_case_id: DbId,
    pub abstractor_one_finding_id: Option<DbId>,
    pub abstractor_two_finding_id: Option<DbId>,
    pub is_match: Option<bool>,
    pub position: i32,
    pub consensus_is_match: Option<bool>,
    pub selected_finding_id: Option<DbId>,
    pub comment: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl IrrMatch {
    pub fn sides(&self) -> MatchSides {
        MatchSides {
            match_id: self.id,
            abstractor_one_finding_id: self.abstractor_one_finding_id,
            abstractor_two_finding_id: self.abstractor_two_finding_id,
        }
    }

    pub fn has_both_sides(&self) -> bool {
        self.abstractor_one_finding_id.is_some() && self.abstractor_two_finding_id.is_some()
    }
}
