//! Single-case assignment, unassignment and reopen.

use medreview_core::assignment::{
    check_claimed_case_type, resolve_assignment, resolve_unassignment, AssignmentDecision,
};
use medreview_core::status::CaseType;
use medreview_core::types::DbId;
use medreview_core::workflow::{
    check_expected_latest, next_status, transition_note, validate_reopen_reason, NewEntry,
    TransitionKind,
};
use medreview_db::models::user::UserAccess;
use medreview_db::models::workflow_entry::WorkflowEntry;
use medreview_db::repositories::{CaseRepo, RecordRepo, UserRepo};
use medreview_events::{EventBus, ReviewEvent, ReviewEventKind};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use super::transition::{append_entry, clear_answers, lock_case, publish_all};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::CurrentUser;

/// Body of `POST /cases/{id}/assign`.
#[derive(Debug, Clone, Deserialize)]
pub struct AssignRequest {
    pub assignee_id: DbId,
    /// Latest workflow entry the caller saw; omitted means "whatever is current".
    pub expected_latest_id: Option<DbId>,
}

/// Body of `POST /cases/{id}/reassign`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReassignRequest {
    pub case_type: CaseType,
    pub assignee_id: DbId,
}

/// Body of `POST /cases/{id}/unassign`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnassignRequest {
    pub expected_latest_id: Option<DbId>,
}

/// Body of `POST /cases/{id}/reopen`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReopenRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AssignmentOutcome {
    pub decision: AssignmentDecision,
    pub entry: WorkflowEntry,
    /// Findings or consensus decisions discarded with the previous assignee.
    pub cleared_answers: u64,
}

/// Load a prospective assignee's access view.
pub async fn load_assignee(pool: &PgPool, user_id: DbId) -> AppResult<UserAccess> {
    UserRepo::find_access(pool, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User", user_id))
}

/// `AssignCase`: hand a case to a reviewer.
pub async fn assign_case(
    pool: &PgPool,
    bus: &EventBus,
    actor: &CurrentUser,
    case_id: DbId,
    input: &AssignRequest,
) -> AppResult<AssignmentOutcome> {
    actor.ctx.require_assignment_manager()?;
    let assignee = load_assignee(pool, input.assignee_id).await?;
    let (outcome, event) =
        assign_one(pool, actor, &assignee, case_id, None, input.expected_latest_id).await?;
    publish_all(bus, vec![event]);
    Ok(outcome)
}

/// `ReassignCase`: as [`assign_case`], but the caller states the case type
/// it believes it is acting on and a mismatch is rejected.
pub async fn reassign_case(
    pool: &PgPool,
    bus: &EventBus,
    actor: &CurrentUser,
    case_id: DbId,
    input: &ReassignRequest,
) -> AppResult<AssignmentOutcome> {
    actor.ctx.require_assignment_manager()?;
    let assignee = load_assignee(pool, input.assignee_id).await?;
    let (outcome, event) =
        assign_one(pool, actor, &assignee, case_id, Some(input.case_type), None).await?;
    publish_all(bus, vec![event]);
    Ok(outcome)
}

/// One committed assignment plus the event to publish for it.
///
/// The caller is responsible for authorizing `actor`. Bulk reassignment
/// drives every planned item through here.
pub(crate) async fn assign_one(
    pool: &PgPool,
    actor: &CurrentUser,
    assignee: &UserAccess,
    case_id: DbId,
    claimed: Option<CaseType>,
    expected_latest_id: Option<DbId>,
) -> AppResult<(AssignmentOutcome, ReviewEvent)> {
    let mut tx = pool.begin().await?;
    let locked = lock_case(pool, &mut tx, case_id).await?;
    let case = &locked.snapshot;

    if let Some(claimed) = claimed {
        check_claimed_case_type(case, claimed)?;
    }
    if let Some(expected) = expected_latest_id {
        check_expected_latest(case_id, expected, Some(case.latest_entry_id))?;
    }

    let record = RecordRepo::find_by_id(pool, case.record_id)
        .await?
        .ok_or_else(|| AppError::not_found("Record", case.record_id))?;

    let decision = resolve_assignment(
        case,
        &assignee.to_authorization_context(),
        locked.sibling.as_ref(),
        record.facts(),
    )?;

    let note = transition_note(
        TransitionKind::Assign,
        Some(case.status),
        decision.next_status,
        &actor.username,
        Some(&assignee.username),
    );
    let entry = append_entry(
        &mut tx,
        &NewEntry {
            case_id,
            step_status: decision.next_status,
            recipient_user_id: decision.new_assignee,
            sending_user_id: actor.user_id(),
            note,
            reopen_reason: None,
            expected_latest_id: case.latest_entry_id,
        },
    )
    .await?;

    let cleared_answers = if decision.clears_answers() {
        clear_answers(&mut tx, case.case_type, case_id).await?
    } else {
        0
    };

    tx.commit().await?;

    tracing::info!(
        case_id,
        record_id = case.record_id,
        case_type = %case.case_type,
        assignee_id = assignee.id,
        previous_assignee_id = ?decision.previous_assignee,
        cleared_answers,
        actor_id = actor.user_id(),
        "Case assigned",
    );

    let event = ReviewEvent::new(ReviewEventKind::CaseAssigned, case_id)
        .with_record(case.record_id)
        .with_actor(actor.user_id())
        .with_recipient(assignee.id, assignee.email.clone())
        .with_due_date(locked.view.due_date)
        .with_payload(serde_json::json!({
            "case_type": case.case_type,
            "previous_assignee_id": decision.previous_assignee,
        }));

    Ok((
        AssignmentOutcome {
            decision,
            entry,
            cleared_answers,
        },
        event,
    ))
}

/// Return a case to the unassigned pool.
pub async fn unassign_case(
    pool: &PgPool,
    bus: &EventBus,
    actor: &CurrentUser,
    case_id: DbId,
    input: &UnassignRequest,
) -> AppResult<AssignmentOutcome> {
    actor.ctx.require_assignment_manager()?;

    let mut tx = pool.begin().await?;
    let locked = lock_case(pool, &mut tx, case_id).await?;
    let case = &locked.snapshot;
    if let Some(expected) = input.expected_latest_id {
        check_expected_latest(case_id, expected, Some(case.latest_entry_id))?;
    }

    let decision = resolve_unassignment(case)?;
    let note = transition_note(
        TransitionKind::Unassign,
        Some(case.status),
        decision.next_status,
        &actor.username,
        None,
    );
    let entry = append_entry(
        &mut tx,
        &NewEntry {
            case_id,
            step_status: decision.next_status,
            recipient_user_id: None,
            sending_user_id: actor.user_id(),
            note,
            reopen_reason: None,
            expected_latest_id: case.latest_entry_id,
        },
    )
    .await?;
    let cleared_answers = if decision.clears_answers() {
        clear_answers(&mut tx, case.case_type, case_id).await?
    } else {
        0
    };
    tx.commit().await?;

    tracing::info!(
        case_id,
        previous_assignee_id = ?decision.previous_assignee,
        cleared_answers,
        actor_id = actor.user_id(),
        "Case unassigned",
    );

    publish_all(
        bus,
        vec![ReviewEvent::new(ReviewEventKind::CaseUnassigned, case_id)
            .with_record(case.record_id)
            .with_actor(actor.user_id())
            .with_payload(serde_json::json!({
                "previous_assignee_id": decision.previous_assignee,
            }))],
    );

    Ok(AssignmentOutcome {
        decision,
        entry,
        cleared_answers,
    })
}

/// Send a completed case back to IN_PROGRESS with a recorded reason.
///
/// The case stays with its assignee, attestation is cleared and the
/// assignee is notified.
pub async fn reopen_case(
    pool: &PgPool,
    bus: &EventBus,
    actor: &CurrentUser,
    case_id: DbId,
    input: &ReopenRequest,
) -> AppResult<WorkflowEntry> {
    actor.ctx.require_assignment_manager()?;
    let reason = validate_reopen_reason(input.reason.as_deref())?;

    let mut tx = pool.begin().await?;
    let locked = lock_case(pool, &mut tx, case_id).await?;
    let case = &locked.snapshot;

    let next = next_status(TransitionKind::Reopen, case.status)?;
    let note = transition_note(
        TransitionKind::Reopen,
        Some(case.status),
        next,
        &actor.username,
        None,
    );
    let entry = append_entry(
        &mut tx,
        &NewEntry {
            case_id,
            step_status: next,
            recipient_user_id: case.assignee_id,
            sending_user_id: actor.user_id(),
            note,
            reopen_reason: Some(reason.clone()),
            expected_latest_id: case.latest_entry_id,
        },
    )
    .await?;
    CaseRepo::clear_attestation(&mut tx, case_id).await?;
    tx.commit().await?;

    tracing::info!(case_id, actor_id = actor.user_id(), "Case reopened");

    let mut event = ReviewEvent::new(ReviewEventKind::CaseReopened, case_id)
        .with_record(case.record_id)
        .with_actor(actor.user_id())
        .with_due_date(locked.view.due_date)
        .with_payload(serde_json::json!({ "reason": reason }));
    if let Some(assignee_id) = case.assignee_id {
        if let Some(assignee) = UserRepo::find_by_id(pool, assignee_id).await? {
            event = event.with_recipient(assignee.id, assignee.email);
        }
    }
    publish_all(bus, vec![event]);

    Ok(entry)
}
