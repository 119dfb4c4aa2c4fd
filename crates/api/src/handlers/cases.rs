//! Handlers for case reads: listing, detail and workflow history.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;

use medreview_core::error::CoreError;
use medreview_core::types::DbId;
use medreview_db::models::case::CaseView;
use medreview_db::repositories::{CaseRepo, WorkflowRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::CurrentUser;
use crate::query::CaseListParams;
use crate::response::{DataResponse, PageResponse};
use crate::state::AppState;

/* --------------------------------------------------------------------------
Helpers
-------------------------------------------------------------------------- */

/// Load a case, failing 404 if missing.
pub(crate) async fn ensure_case(pool: &sqlx::PgPool, case_id: DbId) -> AppResult<CaseView> {
    CaseRepo::find_view(pool, case_id)
        .await?
        .ok_or_else(|| AppError::not_found("Case", case_id))
}

/// Managers see every case; everybody else sees the cases they hold.
pub(crate) fn ensure_can_view(user: &CurrentUser, case: &CaseView) -> AppResult<()> {
    if user.ctx.can_manage_assignments() || user.ctx.can_edit_case(case.assignee_id) {
        Ok(())
    } else {
        Err(AppError::Core(CoreError::Forbidden(format!(
            "User {} may not view case {}",
            user.user_id(),
            case.id
        ))))
    }
}

/* --------------------------------------------------------------------------
Handlers
-------------------------------------------------------------------------- */

/// GET /cases
///
/// Filtered, sorted, paginated listing. Non-managers are limited to their
/// own cases regardless of the `assignee_id` they ask for.
pub async fn list_cases(
    user: CurrentUser,
    State(state): State<AppState>,
    Query(params): Query<CaseListParams>,
) -> AppResult<impl IntoResponse> {
    let mut filter = params.filter();
    if !user.ctx.can_manage_assignments() {
        filter.assignee_id = Some(user.user_id());
    }
    filter.validate()?;
    let expr = filter.to_expr();
    expr.validate()?;

    let page = params.page();
    let sort = params.sort();
    let cases = CaseRepo::list_views(&state.pool, &expr, sort, page).await?;
    let total = CaseRepo::count(&state.pool, &expr).await?;

    tracing::debug!(count = cases.len(), total, user_id = user.user_id(), "Listed cases");

    Ok(Json(PageResponse {
        data: cases,
        total,
        limit: page.limit,
        offset: page.offset,
    }))
}

/// GET /cases/{id}
///
/// A case with the state of its latest workflow entry.
pub async fn get_case(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(case_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let case = ensure_case(&state.pool, case_id).await?;
    ensure_can_view(&user, &case)?;
    Ok(Json(DataResponse { data: case }))
}

/// GET /cases/{id}/workflow
///
/// Full workflow history, newest first.
pub async fn list_workflow(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(case_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let case = ensure_case(&state.pool, case_id).await?;
    ensure_can_view(&user, &case)?;
    let entries = WorkflowRepo::list_by_case(&state.pool, case_id).await?;
    Ok(Json(DataResponse { data: entries }))
}

/// GET /cases/{id}/workflow/latest
pub async fn latest_workflow(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(case_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let case = ensure_case(&state.pool, case_id).await?;
    ensure_can_view(&user, &case)?;
    let entry = WorkflowRepo::find_latest(&state.pool, case_id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Internal(format!(
                "Case {case_id} has no latest workflow entry"
            )))
        })?;
    Ok(Json(DataResponse { data: entry }))
}
