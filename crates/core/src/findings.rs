//! Adverse-event findings and consensus match decisions.
//!
//! Abstractors record findings on their own case while it is open; the
//! consensus reviewer later annotates the generated match records. Both
//! inputs are validated here before anything is persisted.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;
use crate::status::StepStatus;
use crate::types::DbId;

/// Maximum findings one abstraction case may carry.
pub const MAX_FINDINGS_PER_CASE: usize = 200;

/// Maximum length of a finding description.
pub const MAX_DESCRIPTION_LENGTH: u64 = 4000;

/// Maximum length of a consensus comment.
pub const MAX_COMMENT_LENGTH: u64 = 2000;

/// One finding as submitted by an abstractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct FindingInput {
    #[validate(range(min = 1))]
    pub trigger_id: DbId,
    pub adverse_event_type_id: Option<DbId>,
    pub harm_category_id: Option<DbId>,
    pub present_on_admission: Option<bool>,
    #[validate(length(max = MAX_DESCRIPTION_LENGTH))]
    pub description: Option<String>,
}

/// Validate a whole submission.
pub fn validate_findings(findings: &[FindingInput]) -> Result<(), CoreError> {
    if findings.len() > MAX_FINDINGS_PER_CASE {
        return Err(CoreError::Validation(format!(
            "A case may carry at most {MAX_FINDINGS_PER_CASE} findings, got {}",
            findings.len()
        )));
    }
    for (idx, finding) in findings.iter().enumerate() {
        finding
            .validate()
            .map_err(|e| CoreError::Validation(format!("findings[{idx}]: {e}")))?;
    }
    Ok(())
}

/// Content may be written while the case is open with its assignee.
///
/// `NOT_STARTED` is accepted because the first submission starts the work.
pub fn check_content_editable(case_id: DbId, status: StepStatus) -> Result<(), CoreError> {
    match status {
        StepStatus::NotStarted | StepStatus::InProgress => Ok(()),
        StepStatus::Completed => Err(CoreError::Validation(format!(
            "Case {case_id} is completed; reopen it before editing"
        ))),
        StepStatus::Unassigned => Err(CoreError::Validation(format!(
            "Case {case_id} is unassigned and cannot be edited"
        ))),
    }
}

/// The two sides of a stored match record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchSides {
    pub match_id: DbId,
    pub abstractor_one_finding_id: Option<DbId>,
    pub abstractor_two_finding_id: Option<DbId>,
}

impl MatchSides {
    fn has_both_sides(&self) -> bool {
        self.abstractor_one_finding_id.is_some() && self.abstractor_two_finding_id.is_some()
    }

    fn contains(&self, finding_id: DbId) -> bool {
        self.abstractor_one_finding_id == Some(finding_id)
            || self.abstractor_two_finding_id == Some(finding_id)
    }
}

/// A consensus reviewer's annotation of one match record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct MatchDecision {
    pub match_id: DbId,
    pub consensus_is_match: Option<bool>,
    pub selected_finding_id: Option<DbId>,
    #[validate(length(max = MAX_COMMENT_LENGTH))]
    pub comment: Option<String>,
}

/// Check one decision against the match record it annotates.
pub fn check_match_decision(decision: &MatchDecision, sides: &MatchSides) -> Result<(), CoreError> {
    decision
        .validate()
        .map_err(|e| CoreError::Validation(format!("match {}: {e}", decision.match_id)))?;

    if decision.match_id != sides.match_id {
        return Err(CoreError::Internal(format!(
            "Decision for match {} checked against match {}",
            decision.match_id, sides.match_id
        )));
    }
    if decision.consensus_is_match.is_some() && !sides.has_both_sides() {
        return Err(CoreError::Validation(format!(
            "Match {} has only one side; agreement cannot be overridden",
            sides.match_id
        )));
    }
    if let Some(selected) = decision.selected_finding_id {
        if !sides.contains(selected) {
            return Err(CoreError::Validation(format!(
                "Finding {selected} is not part of match {}",
                sides.match_id
            )));
        }
    }
    Ok(())
}
