//! `BulkReassign`: plan over a filtered candidate set, then execute item
//! by item through the single-case assignment path.
//!
//! Items commit independently. The first failing item stops the run and
//! is reported with its case, record and the number of items already
//! committed; nothing after it is attempted.

use std::collections::HashMap;

use medreview_core::bulk_reassignment::{
    plan_bulk_reassignment, resolve_category, validate_request, BulkPlan, BulkTargets,
};
use medreview_core::case::CaseSnapshot;
use medreview_core::error::CoreError;
use medreview_core::query::CaseFilter;
use medreview_core::types::DbId;
use medreview_db::models::case::CaseView;
use medreview_db::models::user::UserAccess;
use medreview_db::repositories::CaseRepo;
use medreview_events::EventBus;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use super::assignment::{assign_one, load_assignee};
use super::transition::publish_all;
use crate::error::{core_from_sqlx, AppError, AppResult};
use crate::middleware::auth::CurrentUser;

/// Body of `POST /cases/bulk-reassign`.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkReassignRequest {
    pub filter: CaseFilter,
    pub assignee_one: DbId,
    pub assignee_two: Option<DbId>,
    /// Return the plan without executing it.
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
pub struct BulkOutcome {
    pub plan: BulkPlan,
    pub executed: bool,
    pub committed: usize,
}

pub async fn bulk_reassign(
    pool: &PgPool,
    bus: &EventBus,
    actor: &CurrentUser,
    max_cases: usize,
    input: &BulkReassignRequest,
) -> AppResult<BulkOutcome> {
    actor.ctx.require_assignment_manager()?;

    let targets = BulkTargets {
        assignee_one: input.assignee_one,
        assignee_two: input.assignee_two,
    };
    validate_request(&input.filter, targets)?;
    let expr = input.filter.to_expr();
    expr.validate()?;

    // Resolve reviewers before any work so an unknown id fails cleanly.
    let mut assignees: HashMap<DbId, UserAccess> = HashMap::new();
    for user_id in std::iter::once(targets.assignee_one).chain(targets.assignee_two) {
        assignees.insert(user_id, load_assignee(pool, user_id).await?);
    }

    let rows = CaseRepo::list_candidates(pool, &expr, max_cases as i64 + 1).await?;
    if rows.len() > max_cases {
        return Err(AppError::Core(CoreError::Validation(format!(
            "The filter matched more than {max_cases} cases; narrow it and retry"
        ))));
    }
    let candidates = to_snapshots(&rows)?;
    let category = resolve_category(&input.filter, &candidates, targets)?;

    let mut record_cases: HashMap<DbId, Vec<CaseSnapshot>> = HashMap::new();
    if category.is_paired() {
        let mut record_ids: Vec<DbId> = candidates.iter().map(|c| c.record_id).collect();
        record_ids.sort_unstable();
        record_ids.dedup();
        for view in CaseRepo::list_by_records(pool, &record_ids, category.id()).await? {
            record_cases
                .entry(view.record_id)
                .or_default()
                .push(view.to_snapshot()?);
        }
    }

    let plan = plan_bulk_reassignment(category, &candidates, &record_cases, targets)?;

    for record_id in &plan.swapped_records {
        tracing::warn!(record_id, "Bulk reassignment swapped reviewer seats on record");
    }
    for skipped in &plan.skipped {
        tracing::warn!(
            case_id = skipped.case_id,
            record_id = skipped.record_id,
            reason = ?skipped.reason,
            "Bulk reassignment skipped case",
        );
    }
    tracing::info!(
        category = %category,
        candidates = candidates.len(),
        planned = plan.assignments.len(),
        skipped = plan.skipped.len(),
        dry_run = input.dry_run,
        actor_id = actor.user_id(),
        "Bulk reassignment planned",
    );

    if input.dry_run {
        return Ok(BulkOutcome {
            plan,
            executed: false,
            committed: 0,
        });
    }

    let mut committed = 0;
    for item in &plan.assignments {
        let assignee = assignees
            .get(&item.to_user_id)
            .ok_or_else(|| AppError::InternalError(format!("Unplanned target {}", item.to_user_id)))?;

        match assign_one(pool, actor, assignee, item.case_id, Some(category), None).await {
            Ok((_, event)) => {
                publish_all(bus, vec![event]);
                committed += 1;
            }
            Err(err) => {
                tracing::warn!(
                    case_id = item.case_id,
                    record_id = item.record_id,
                    committed,
                    error = %err,
                    "Bulk reassignment stopped at failing item",
                );
                return Err(into_batch_error(err, item.case_id, item.record_id, committed));
            }
        }
    }

    tracing::info!(committed, actor_id = actor.user_id(), "Bulk reassignment completed");

    Ok(BulkOutcome {
        plan,
        executed: true,
        committed,
    })
}

fn to_snapshots(rows: &[CaseView]) -> Result<Vec<CaseSnapshot>, CoreError> {
    rows.iter().map(CaseView::to_snapshot).collect()
}

/// Attach bulk context to an item failure.
fn into_batch_error(err: AppError, case_id: DbId, record_id: DbId, committed: usize) -> AppError {
    let core = match err {
        AppError::Core(core) => core,
        AppError::Database(e) => core_from_sqlx(e, "Case", case_id),
        AppError::BadRequest(msg) => CoreError::Validation(msg),
        AppError::InternalError(msg) => CoreError::Internal(msg),
    };
    AppError::Core(core.in_batch(case_id, record_id, committed))
}
