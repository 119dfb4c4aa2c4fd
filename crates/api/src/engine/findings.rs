//! Abstraction findings submission and IRR match generation.

use medreview_core::case::{CaseSnapshot, SEAT_ONE};
use medreview_core::concurrency::check_version;
use medreview_core::error::CoreError;
use medreview_core::findings::{check_content_editable, validate_findings, FindingInput};
use medreview_core::irr::{irr_score_of, match_findings, FindingKey, IrrScore};
use medreview_core::status::{CaseType, StepStatus};
use medreview_core::types::{DbId, Timestamp};
use medreview_core::workflow::{next_status, transition_note, NewEntry, TransitionKind};
use medreview_db::models::finding::Finding;
use medreview_db::repositories::{CaseRepo, FindingRepo, IrrMatchRepo};
use medreview_events::{EventBus, ReviewEvent, ReviewEventKind};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use super::transition::{append_entry, lock_case, publish_all, Tx};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::CurrentUser;

/// Body of `PUT /cases/{id}/findings`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitFindings {
    /// Mark the case completed after saving.
    #[serde(default)]
    pub complete: bool,
    /// `content_updated_at` as last read by the client.
    pub client_version: Timestamp,
    pub findings: Vec<FindingInput>,
}

#[derive(Debug, Serialize)]
pub struct FindingsOutcome {
    pub case_id: DbId,
    pub status: StepStatus,
    pub content_version: Timestamp,
    pub findings: Vec<Finding>,
    /// Set when this submission completed the second seat and match
    /// records were generated on the record's consensus case.
    pub irr: Option<GeneratedIrr>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedIrr {
    pub consensus_case_id: DbId,
    pub match_count: usize,
    pub score: IrrScore,
}

/// Status bookkeeping shared by findings and consensus submissions.
pub(crate) struct Progress {
    pub status: StepStatus,
    pub latest_entry_id: DbId,
    pub events: Vec<ReviewEvent>,
}

/// Append the implicit start and, when asked, the completion entry.
pub(crate) async fn advance_after_save(
    tx: &mut Tx<'_>,
    actor: &CurrentUser,
    case: &CaseSnapshot,
    complete: bool,
) -> AppResult<Progress> {
    let mut progress = Progress {
        status: case.status,
        latest_entry_id: case.latest_entry_id,
        events: Vec::new(),
    };

    if progress.status == StepStatus::NotStarted {
        let next = next_status(TransitionKind::Start, progress.status)?;
        let entry = append_entry(
            tx,
            &NewEntry {
                case_id: case.case_id,
                step_status: next,
                recipient_user_id: case.assignee_id,
                sending_user_id: actor.user_id(),
                note: transition_note(TransitionKind::Start, Some(progress.status), next, &actor.username, None),
                reopen_reason: None,
                expected_latest_id: progress.latest_entry_id,
            },
        )
        .await?;
        progress.status = next;
        progress.latest_entry_id = entry.id;
        progress.events.push(
            ReviewEvent::new(ReviewEventKind::CaseStarted, case.case_id)
                .with_record(case.record_id)
                .with_actor(actor.user_id()),
        );
    }

    if complete {
        let next = next_status(TransitionKind::Complete, progress.status)?;
        let entry = append_entry(
            tx,
            &NewEntry {
                case_id: case.case_id,
                step_status: next,
                recipient_user_id: case.assignee_id,
                sending_user_id: actor.user_id(),
                note: transition_note(TransitionKind::Complete, Some(progress.status), next, &actor.username, None),
                reopen_reason: None,
                expected_latest_id: progress.latest_entry_id,
            },
        )
        .await?;
        CaseRepo::set_attestation(tx, case.case_id, actor.user_id()).await?;
        progress.status = next;
        progress.latest_entry_id = entry.id;
        progress.events.push(
            ReviewEvent::new(ReviewEventKind::CaseCompleted, case.case_id)
                .with_record(case.record_id)
                .with_actor(actor.user_id()),
        );
    }

    Ok(progress)
}

/// Bump the content version, failing `Conflict` if another write won.
pub(crate) async fn bump_content_version(
    tx: &mut Tx<'_>,
    case_id: DbId,
    expected: Timestamp,
) -> AppResult<Timestamp> {
    CaseRepo::touch_content(tx, case_id, expected)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Conflict(format!(
                "Case {case_id} was modified by another request; reload the case and retry"
            )))
        })
}

/// `SubmitAbstractionFindings`: replace the case's findings, optionally
/// completing it.
///
/// All validation runs before the first write; the whole submission is
/// one transaction.
pub async fn submit_findings(
    pool: &PgPool,
    bus: &EventBus,
    actor: &CurrentUser,
    case_id: DbId,
    input: &SubmitFindings,
) -> AppResult<FindingsOutcome> {
    validate_findings(&input.findings)?;

    let mut tx = pool.begin().await?;
    let locked = lock_case(pool, &mut tx, case_id).await?;
    let case = &locked.snapshot;

    if case.case_type != CaseType::Abstraction {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Case {case_id} is a {} case; findings are recorded on abstraction cases",
            case.case_type
        ))));
    }
    actor.ctx.require_case_editor(case_id, case.assignee_id)?;
    check_content_editable(case_id, case.status)?;
    check_version(case_id, input.client_version, locked.view.content_updated_at)?;

    let findings =
        FindingRepo::replace_for_case(&mut tx, case_id, actor.user_id(), &input.findings).await?;
    let content_version =
        bump_content_version(&mut tx, case_id, locked.view.content_updated_at).await?;

    let mut progress = advance_after_save(&mut tx, actor, case, input.complete).await?;

    let mut irr = None;
    if progress.status == StepStatus::Completed {
        if let Some(sibling) = locked.sibling.as_ref().filter(|s| s.is_completed()) {
            irr = generate_irr(&mut tx, case, &findings, sibling).await?;
        }
    }

    tx.commit().await?;

    tracing::info!(
        case_id,
        finding_count = findings.len(),
        status = %progress.status,
        actor_id = actor.user_id(),
        "Findings saved",
    );

    if let Some(generated) = &irr {
        progress.events.push(
            ReviewEvent::new(ReviewEventKind::IrrGenerated, generated.consensus_case_id)
                .with_record(case.record_id)
                .with_actor(actor.user_id())
                .with_payload(serde_json::json!({
                    "match_count": generated.match_count,
                    "matched": generated.score.matched,
                    "compared": generated.score.compared,
                    "score": generated.score.score,
                })),
        );
    }
    publish_all(bus, progress.events);

    Ok(FindingsOutcome {
        case_id,
        status: progress.status,
        content_version,
        findings,
        irr,
    })
}

/// Match both seats' findings onto the record's consensus case.
///
/// Runs at most once per consensus case: existing match records are left
/// alone, so a reopened-and-recompleted seat does not re-match.
async fn generate_irr(
    tx: &mut Tx<'_>,
    case: &CaseSnapshot,
    own_findings: &[Finding],
    sibling: &CaseSnapshot,
) -> AppResult<Option<GeneratedIrr>> {
    let Some(consensus) =
        CaseRepo::find_record_case(tx, case.record_id, CaseType::Consensus.id()).await?
    else {
        tracing::warn!(
            record_id = case.record_id,
            "Both abstraction seats completed but the record has no consensus case",
        );
        return Ok(None);
    };

    if IrrMatchRepo::exists_for_case(tx, consensus.id).await? {
        tracing::debug!(consensus_case_id = consensus.id, "Match records already exist");
        return Ok(None);
    }

    let own: Vec<FindingKey> = own_findings.iter().map(Finding::key).collect();
    let other: Vec<FindingKey> = FindingRepo::list_by_case_tx(tx, sibling.case_id)
        .await?
        .iter()
        .map(Finding::key)
        .collect();

    let (seat_one, seat_two) = if case.seat == Some(SEAT_ONE) {
        (own, other)
    } else {
        (other, own)
    };

    let pairs = match_findings(&seat_one, &seat_two);
    let created = IrrMatchRepo::create_batch(tx, consensus.id, &pairs).await?;
    let score = irr_score_of(&pairs);

    tracing::info!(
        consensus_case_id = consensus.id,
        record_id = case.record_id,
        match_count = created.len(),
        score = ?score.score,
        "IRR match records generated",
    );

    Ok(Some(GeneratedIrr {
        consensus_case_id: consensus.id,
        match_count: created.len(),
        score,
    }))
}
