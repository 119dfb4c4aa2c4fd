//! Case filter / sort / pagination expressions.
//!
//! Callers describe which cases they want as a small expression tree; the
//! storage adapter compiles it into a parameterized query. Nothing here
//! knows about SQL.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::status::{CaseType, StepStatus};
use crate::types::{DbId, Timestamp};

/// Default page size when the caller does not ask for one.
pub const DEFAULT_PAGE_LIMIT: i64 = 50;

/// Upper bound on page size.
pub const MAX_PAGE_LIMIT: i64 = 500;

/// Filterable / sortable attributes of a case and its latest workflow entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseField {
    CaseId,
    CaseType,
    RecordId,
    Status,
    AssigneeId,
    CreatedAt,
    DueDate,
    StatusChangedAt,
}

/// A typed operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Id(DbId),
    CaseType(CaseType),
    Status(StepStatus),
    Time(Timestamp),
}

impl CaseField {
    /// Whether `value` has the operand type this field compares against.
    pub fn accepts(self, value: &FilterValue) -> bool {
        matches!(
            (self, value),
            (Self::CaseId | Self::RecordId | Self::AssigneeId, FilterValue::Id(_))
                | (Self::CaseType, FilterValue::CaseType(_))
                | (Self::Status, FilterValue::Status(_))
                | (
                    Self::CreatedAt | Self::DueDate | Self::StatusChangedAt,
                    FilterValue::Time(_)
                )
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterExpr {
    /// Matches every case.
    All,
    And(Vec<FilterExpr>),
    Or(Vec<FilterExpr>),
    Not(Box<FilterExpr>),
    Eq(CaseField, FilterValue),
    In(CaseField, Vec<FilterValue>),
    AtLeast(CaseField, FilterValue),
    AtMost(CaseField, FilterValue),
    IsNull(CaseField),
}

impl FilterExpr {
    /// Check that every comparison uses an operand of the field's type.
    pub fn validate(&self) -> Result<(), CoreError> {
        match self {
            Self::All | Self::IsNull(_) => Ok(()),
            Self::And(items) | Self::Or(items) => items.iter().try_for_each(Self::validate),
            Self::Not(inner) => inner.validate(),
            Self::Eq(field, value) | Self::AtLeast(field, value) | Self::AtMost(field, value) => {
                check_operand(*field, value)
            }
            Self::In(field, values) => {
                if values.is_empty() {
                    return Err(CoreError::Validation(format!(
                        "Filter on {field:?} has an empty value list"
                    )));
                }
                values.iter().try_for_each(|v| check_operand(*field, v))
            }
        }
    }
}

fn check_operand(field: CaseField, value: &FilterValue) -> Result<(), CoreError> {
    if field.accepts(value) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Filter value {value:?} does not fit field {field:?}"
        )))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortExpr {
    pub field: CaseField,
    #[serde(default)]
    pub direction: SortDirection,
}

impl Default for SortExpr {
    fn default() -> Self {
        Self {
            field: CaseField::CaseId,
            direction: SortDirection::Asc,
        }
    }
}

/// Clamped pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        Self {
            limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT),
            offset: offset.unwrap_or(0).max(0),
        }
    }
}

/// The caller-facing case filter (query string or bulk request body).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseFilter {
    pub case_type: Option<CaseType>,
    pub status: Option<StepStatus>,
    pub assignee_id: Option<DbId>,
    pub record_id: Option<DbId>,
    pub created_from: Option<Timestamp>,
    pub created_to: Option<Timestamp>,
}

impl CaseFilter {
    /// True when no criterion is set.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Reject contradictory criteria.
    pub fn validate(&self) -> Result<(), CoreError> {
        if let (Some(from), Some(to)) = (self.created_from, self.created_to) {
            if from > to {
                return Err(CoreError::Validation(format!(
                    "created_from ({from}) is after created_to ({to})"
                )));
            }
        }
        Ok(())
    }

    /// Lower this filter into an expression tree (conjunction of set criteria).
    pub fn to_expr(&self) -> FilterExpr {
        let mut parts = Vec::new();
        if let Some(t) = self.case_type {
            parts.push(FilterExpr::Eq(CaseField::CaseType, FilterValue::CaseType(t)));
        }
        if let Some(s) = self.status {
            parts.push(FilterExpr::Eq(CaseField::Status, FilterValue::Status(s)));
        }
        if let Some(a) = self.assignee_id {
            parts.push(FilterExpr::Eq(CaseField::AssigneeId, FilterValue::Id(a)));
        }
        if let Some(r) = self.record_id {
            parts.push(FilterExpr::Eq(CaseField::RecordId, FilterValue::Id(r)));
        }
        if let Some(from) = self.created_from {
            parts.push(FilterExpr::AtLeast(CaseField::CreatedAt, FilterValue::Time(from)));
        }
        if let Some(to) = self.created_to {
            parts.push(FilterExpr::AtMost(CaseField::CreatedAt, FilterValue::Time(to)));
        }
        match parts.len() {
            0 => FilterExpr::All,
            1 => parts.remove(0),
            _ => FilterExpr::And(parts),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn empty_filter_lowers_to_all() {
        assert!(CaseFilter::default().is_empty());
        assert_eq!(CaseFilter::default().to_expr(), FilterExpr::All);
    }

    #[test]
    fn single_criterion_is_not_wrapped() {
        let f = CaseFilter {
            assignee_id: Some(4),
            ..Default::default()
        };
        assert_eq!(
            f.to_expr(),
            FilterExpr::Eq(CaseField::AssigneeId, FilterValue::Id(4))
        );
    }

    #[test]
    fn multiple_criteria_become_conjunction() {
        let f = CaseFilter {
            case_type: Some(CaseType::Abstraction),
            status: Some(StepStatus::NotStarted),
            ..Default::default()
        };
        match f.to_expr() {
            FilterExpr::And(parts) => assert_eq!(parts.len(), 2),
            other => panic!("expected And, got {other:?}"),
        }
        assert!(f.to_expr().validate().is_ok());
    }

    #[test]
    fn inverted_date_range_rejected() {
        let now = Utc::now();
        let f = CaseFilter {
            created_from: Some(now),
            created_to: Some(now - Duration::days(1)),
            ..Default::default()
        };
        assert!(f.validate().is_err());
    }

    #[test]
    fn mistyped_operand_rejected() {
        let e = FilterExpr::Eq(CaseField::Status, FilterValue::Id(3));
        assert!(e.validate().is_err());
        let e = FilterExpr::Not(Box::new(FilterExpr::In(CaseField::RecordId, vec![])));
        assert!(e.validate().is_err());
    }

    #[test]
    fn page_is_clamped() {
        assert_eq!(Page::new(None, None), Page { limit: DEFAULT_PAGE_LIMIT, offset: 0 });
        assert_eq!(Page::new(Some(10_000), Some(-5)), Page { limit: MAX_PAGE_LIMIT, offset: 0 });
        assert_eq!(Page::new(Some(0), Some(20)).limit, 1);
    }
}
