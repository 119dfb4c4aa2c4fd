//! Building blocks shared by the engine operations.

use medreview_core::case::CaseSnapshot;
use medreview_core::error::CoreError;
use medreview_core::status::CaseType;
use medreview_core::types::DbId;
use medreview_core::workflow::{check_expected_latest, NewEntry};
use medreview_db::models::case::CaseView;
use medreview_db::models::workflow_entry::{AppendOutcome, WorkflowEntry};
use medreview_db::repositories::{CaseRepo, FindingRepo, IrrMatchRepo, WorkflowRepo};
use medreview_events::{EventBus, ReviewEvent};
use sqlx::PgPool;

use crate::error::{AppError, AppResult};

pub type Tx<'a> = sqlx::Transaction<'a, sqlx::Postgres>;

/// A case and, for paired case types, the case on the other seat, both locked.
#[derive(Debug)]
pub struct LockedCase {
    pub view: CaseView,
    pub snapshot: CaseSnapshot,
    pub sibling: Option<CaseSnapshot>,
}

/// Lock a case for a transition.
///
/// The `cases` row is locked first and the latest entry read afterwards,
/// so a transaction that waited on another writer sees the log that writer
/// committed. Paired cases lock every seat on the record in case id order,
/// so two transactions touching the same record always queue in the same
/// order. Record and case type never change after creation, which makes
/// the unlocked pre-read safe to route on.
pub async fn lock_case(pool: &PgPool, tx: &mut Tx<'_>, case_id: DbId) -> AppResult<LockedCase> {
    let unlocked = CaseRepo::find_view(pool, case_id)
        .await?
        .ok_or_else(|| AppError::not_found("Case", case_id))?;
    let case_type = unlocked.case_type()?;

    let locked_ids = if case_type.is_paired() {
        CaseRepo::lock_record_rows(tx, unlocked.record_id, case_type.id()).await?
    } else {
        CaseRepo::lock_row(tx, case_id).await?.into_iter().collect()
    };
    if !locked_ids.contains(&case_id) {
        return Err(moved(case_id));
    }

    let views = CaseRepo::list_views_tx(tx, &locked_ids).await?;
    if views.len() != locked_ids.len() {
        return Err(moved(case_id));
    }

    let mut view = None;
    let mut sibling = None;
    for seat in views {
        if seat.id == case_id {
            view = Some(seat);
        } else if sibling.is_none() {
            sibling = Some(seat.to_snapshot()?);
        }
    }
    let view = view.ok_or_else(|| moved(case_id))?;
    let snapshot = view.to_snapshot()?;
    Ok(LockedCase {
        view,
        snapshot,
        sibling,
    })
}

fn moved(case_id: DbId) -> AppError {
    AppError::Core(CoreError::Conflict(format!(
        "Case {case_id} changed while it was being locked; reload and retry"
    )))
}

/// Append a log entry; a moved latest entry becomes `Conflict`.
pub async fn append_entry(tx: &mut Tx<'_>, entry: &NewEntry) -> AppResult<WorkflowEntry> {
    match WorkflowRepo::append(tx, entry).await? {
        AppendOutcome::Appended(row) => Ok(row),
        AppendOutcome::Stale { actual_latest_id } => {
            let err = check_expected_latest(entry.case_id, entry.expected_latest_id, actual_latest_id)
                .err()
                .unwrap_or_else(|| {
                    CoreError::Conflict(format!(
                        "Case {} was updated by another request; reload and retry",
                        entry.case_id
                    ))
                });
            Err(err.into())
        }
    }
}

/// Discard the answers a previous assignee recorded. Returns the rows touched.
pub async fn clear_answers(tx: &mut Tx<'_>, case_type: CaseType, case_id: DbId) -> AppResult<u64> {
    let cleared = match case_type {
        CaseType::Abstraction => FindingRepo::soft_delete_for_case(tx, case_id).await?,
        CaseType::Consensus => IrrMatchRepo::clear_decisions(tx, case_id).await?,
        CaseType::Physician | CaseType::PeerReview => 0,
    };
    Ok(cleared)
}

/// Publish events collected during a committed transaction.
pub fn publish_all(bus: &EventBus, events: Vec<ReviewEvent>) {
    for event in events {
        tracing::debug!(case_id = event.case_id, event = event.kind.as_str(), "Publishing review event");
        bus.publish(event);
    }
}
