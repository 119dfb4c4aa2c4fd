//! Query-string parameter types for case listing.

use medreview_core::query::{CaseField, CaseFilter, Page, SortDirection, SortExpr};
use medreview_core::status::{CaseType, StepStatus};
use medreview_core::types::{DbId, Timestamp};
use serde::Deserialize;

/// `GET /cases` query parameters.
///
/// ```text
/// ?case_type=abstraction&status=IN_PROGRESS&assignee_id=7
///  &created_from=2026-01-01T00:00:00Z&sort=due_date&direction=desc
///  &limit=50&offset=0
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct CaseListParams {
    pub case_type: Option<CaseType>,
    pub status: Option<StepStatus>,
    pub assignee_id: Option<DbId>,
    pub record_id: Option<DbId>,
    pub created_from: Option<Timestamp>,
    pub created_to: Option<Timestamp>,
    pub sort: Option<CaseField>,
    pub direction: Option<SortDirection>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl CaseListParams {
    pub fn filter(&self) -> CaseFilter {
        CaseFilter {
            case_type: self.case_type,
            status: self.status,
            assignee_id: self.assignee_id,
            record_id: self.record_id,
            created_from: self.created_from,
            created_to: self.created_to,
        }
    }

    pub fn sort(&self) -> SortExpr {
        match self.sort {
            Some(field) => SortExpr {
                field,
                direction: self.direction.unwrap_or_default(),
            },
            None => SortExpr::default(),
        }
    }

    pub fn page(&self) -> Page {
        Page::new(self.limit, self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medreview_core::query::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};

    #[test]
    fn test_defaults_sort_by_case_id() {
        let params = CaseListParams::default();
        assert_eq!(params.sort(), SortExpr::default());
        assert_eq!(params.page().limit, DEFAULT_PAGE_LIMIT);
        assert!(params.filter().is_empty());
    }

    #[test]
    fn test_sort_direction_applies_only_with_field() {
        let params = CaseListParams {
            sort: Some(CaseField::DueDate),
            direction: Some(SortDirection::Desc),
            limit: Some(10_000),
            ..Default::default()
        };
        assert_eq!(params.sort().field, CaseField::DueDate);
        assert_eq!(params.sort().direction, SortDirection::Desc);
        assert_eq!(params.page().limit, MAX_PAGE_LIMIT);
    }
}
