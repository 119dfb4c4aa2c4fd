//! Single-case assignment decisions.
//!
//! [`resolve_assignment`] runs every business rule for moving a case to a
//! new reviewer against snapshots supplied by the caller. The caller
//! re-reads those snapshots inside the same transaction that appends the
//! resulting log entry, so completed-case protection holds at the point of
//! mutation.

use serde::Serialize;

use crate::authorization::AuthorizationContext;
use crate::case::CaseSnapshot;
use crate::error::CoreError;
use crate::roles::{required_product, required_role};
use crate::status::{CaseType, StepStatus};
use crate::types::DbId;
use crate::workflow::{next_status, TransitionKind};

/// Facts about the parent record that eligibility depends on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordFacts {
    pub has_supporting_files: bool,
}

/// Outcome of a successful assignment check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignmentDecision {
    pub case_id: DbId,
    pub next_status: StepStatus,
    pub previous_assignee: Option<DbId>,
    pub new_assignee: Option<DbId>,
}

impl AssignmentDecision {
    /// Answers recorded by a previous assignee are discarded on hand-over.
    pub fn clears_answers(&self) -> bool {
        self.previous_assignee.is_some()
    }
}

/// Case-type-specific eligibility of a prospective assignee.
///
/// All types need an active user with the type's role and product. Peer
/// review additionally needs an external credential and supporting files
/// already attached to the record.
pub fn check_eligibility(
    case_type: CaseType,
    assignee: &AuthorizationContext,
    record: RecordFacts,
) -> Result<(), CoreError> {
    if !assignee.is_active {
        return Err(CoreError::Validation(format!(
            "User {} is inactive and cannot be assigned",
            assignee.user_id
        )));
    }
    let role = required_role(case_type);
    if !assignee.has_role(role) {
        return Err(CoreError::Validation(format!(
            "User {} lacks the '{role}' role required for {case_type} cases",
            assignee.user_id
        )));
    }
    let product = required_product(case_type);
    if !assignee.has_product(product) {
        return Err(CoreError::Validation(format!(
            "User {} is not entitled to the '{product}' product",
            assignee.user_id
        )));
    }
    if case_type == CaseType::PeerReview {
        if !assignee.has_credential() {
            return Err(CoreError::Validation(format!(
                "User {} has no credential on file; peer review requires one",
                assignee.user_id
            )));
        }
        if !record.has_supporting_files {
            return Err(CoreError::Validation(
                "Peer review cannot be assigned before supporting files are attached to the record"
                    .into(),
            ));
        }
    }
    Ok(())
}

/// Reject a hand-over that would seat the same reviewer on both abstraction seats.
pub fn check_pairing(
    case: &CaseSnapshot,
    new_assignee: DbId,
    sibling: Option<&CaseSnapshot>,
) -> Result<(), CoreError> {
    if !case.case_type.is_paired() {
        return Ok(());
    }
    match sibling {
        Some(s) if s.assignee_id == Some(new_assignee) => Err(CoreError::Validation(format!(
            "User {new_assignee} already holds the paired abstraction case {} on record {}",
            s.case_id, case.record_id
        ))),
        _ => Ok(()),
    }
}

/// Fail when a caller's claimed case type disagrees with the stored one.
pub fn check_claimed_case_type(case: &CaseSnapshot, claimed: CaseType) -> Result<(), CoreError> {
    if case.case_type == claimed {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Case {} is a {} case, not {claimed}",
            case.case_id, case.case_type
        )))
    }
}

/// Decide whether `case` may be handed to `assignee`.
pub fn resolve_assignment(
    case: &CaseSnapshot,
    assignee: &AuthorizationContext,
    sibling: Option<&CaseSnapshot>,
    record: RecordFacts,
) -> Result<AssignmentDecision, CoreError> {
    let next = next_status(TransitionKind::Assign, case.status)?;

    if case.assignee_id == Some(assignee.user_id) {
        return Err(CoreError::Validation(format!(
            "Case {} is already assigned to user {}",
            case.case_id, assignee.user_id
        )));
    }

    check_eligibility(case.case_type, assignee, record)?;
    check_pairing(case, assignee.user_id, sibling)?;

    Ok(AssignmentDecision {
        case_id: case.case_id,
        next_status: next,
        previous_assignee: case.assignee_id,
        new_assignee: Some(assignee.user_id),
    })
}

/// Decide whether `case` may be returned to the unassigned pool.
pub fn resolve_unassignment(case: &CaseSnapshot) -> Result<AssignmentDecision, CoreError> {
    let next = next_status(TransitionKind::Unassign, case.status)?;
    Ok(AssignmentDecision {
        case_id: case.case_id,
        next_status: next,
        previous_assignee: case.assignee_id,
        new_assignee: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::{SEAT_ONE, SEAT_TWO};
    use crate::roles::*;
    use assert_matches::assert_matches;

    fn abstractor(id: DbId) -> AuthorizationContext {
        AuthorizationContext {
            user_id: id,
            is_active: true,
            role: ROLE_ABSTRACTOR.into(),
            products: vec![PRODUCT_ABSTRACTION.into()],
            credential_id: None,
        }
    }

    fn peer_reviewer(id: DbId, credential: Option<&str>) -> AuthorizationContext {
        AuthorizationContext {
            user_id: id,
            is_active: true,
            role: ROLE_PEER_REVIEWER.into(),
            products: vec![PRODUCT_PEER_REVIEW.into()],
            credential_id: credential.map(String::from),
        }
    }

    fn case(id: DbId, case_type: CaseType, seat: Option<i16>, status: StepStatus, assignee: Option<DbId>) -> CaseSnapshot {
        CaseSnapshot {
            case_id: id,
            case_type,
            record_id: 100,
            seat,
            status,
            assignee_id: assignee,
            latest_entry_id: id * 10,
        }
    }

    #[test]
    fn assigns_unassigned_case() {
        let c = case(1, CaseType::Abstraction, Some(SEAT_ONE), StepStatus::Unassigned, None);
        let d = resolve_assignment(&c, &abstractor(7), None, RecordFacts::default()).unwrap();
        assert_eq!(d.next_status, StepStatus::NotStarted);
        assert_eq!(d.new_assignee, Some(7));
        assert!(!d.clears_answers());
    }

    #[test]
    fn reassignment_clears_previous_answers() {
        let c = case(1, CaseType::Abstraction, Some(SEAT_ONE), StepStatus::InProgress, Some(3));
        let d = resolve_assignment(&c, &abstractor(7), None, RecordFacts::default()).unwrap();
        assert_eq!(d.previous_assignee, Some(3));
        assert!(d.clears_answers());
        assert_eq!(d.next_status, StepStatus::NotStarted);
    }

    #[test]
    fn same_assignee_rejected() {
        let c = case(1, CaseType::Abstraction, Some(SEAT_ONE), StepStatus::NotStarted, Some(7));
        assert_matches!(
            resolve_assignment(&c, &abstractor(7), None, RecordFacts::default()),
            Err(CoreError::Validation(msg)) if msg.contains("already assigned")
        );
    }

    #[test]
    fn completed_case_rejected() {
        let c = case(1, CaseType::Physician, None, StepStatus::Completed, Some(3));
        assert_matches!(
            resolve_assignment(&c, &abstractor(7), None, RecordFacts::default()),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn inactive_user_rejected() {
        let c = case(1, CaseType::Abstraction, Some(SEAT_ONE), StepStatus::Unassigned, None);
        let mut u = abstractor(7);
        u.is_active = false;
        assert!(resolve_assignment(&c, &u, None, RecordFacts::default()).is_err());
    }

    #[test]
    fn wrong_role_rejected() {
        let c = case(1, CaseType::Physician, None, StepStatus::Unassigned, None);
        assert_matches!(
            resolve_assignment(&c, &abstractor(7), None, RecordFacts::default()),
            Err(CoreError::Validation(msg)) if msg.contains("physician")
        );
    }

    #[test]
    fn missing_product_rejected() {
        let c = case(1, CaseType::Abstraction, Some(SEAT_ONE), StepStatus::Unassigned, None);
        let mut u = abstractor(7);
        u.products.clear();
        assert!(resolve_assignment(&c, &u, None, RecordFacts::default()).is_err());
    }

    #[test]
    fn pairing_conflict_rejected() {
        let c = case(1, CaseType::Abstraction, Some(SEAT_ONE), StepStatus::NotStarted, Some(3));
        let sibling = case(2, CaseType::Abstraction, Some(SEAT_TWO), StepStatus::NotStarted, Some(7));
        assert_matches!(
            resolve_assignment(&c, &abstractor(7), Some(&sibling), RecordFacts::default()),
            Err(CoreError::Validation(msg)) if msg.contains("paired")
        );
    }

    #[test]
    fn pairing_ignored_for_single_review_types() {
        let c = case(1, CaseType::Consensus, None, StepStatus::Unassigned, None);
        let other = case(2, CaseType::Abstraction, Some(SEAT_ONE), StepStatus::Completed, Some(7));
        assert!(check_pairing(&c, 7, Some(&other)).is_ok());
    }

    #[test]
    fn peer_review_needs_credential_and_files() {
        let c = case(1, CaseType::PeerReview, None, StepStatus::Unassigned, None);
        let files = RecordFacts { has_supporting_files: true };

        assert!(resolve_assignment(&c, &peer_reviewer(7, None), None, files).is_err());
        assert!(resolve_assignment(&c, &peer_reviewer(7, Some("LIC-1")), None, RecordFacts::default()).is_err());
        assert!(resolve_assignment(&c, &peer_reviewer(7, Some("LIC-1")), None, files).is_ok());
    }

    #[test]
    fn claimed_type_must_match() {
        let c = case(1, CaseType::Abstraction, Some(SEAT_ONE), StepStatus::Unassigned, None);
        assert!(check_claimed_case_type(&c, CaseType::Abstraction).is_ok());
        assert!(check_claimed_case_type(&c, CaseType::Consensus).is_err());
    }

    #[test]
    fn unassign_rules() {
        let c = case(1, CaseType::Abstraction, Some(SEAT_ONE), StepStatus::InProgress, Some(3));
        let d = resolve_unassignment(&c).unwrap();
        assert_eq!(d.next_status, StepStatus::Unassigned);
        assert!(d.clears_answers());

        let c = case(1, CaseType::Abstraction, Some(SEAT_ONE), StepStatus::Unassigned, None);
        assert_matches!(resolve_unassignment(&c), Err(CoreError::Conflict(_)));
    }
}
