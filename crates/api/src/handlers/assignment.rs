//! Handlers for assignment transitions.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;

use medreview_core::types::DbId;

use crate::engine::assignment::{
    assign_case, reassign_case, reopen_case, unassign_case, AssignRequest, ReassignRequest,
    ReopenRequest, UnassignRequest,
};
use crate::engine::bulk::{bulk_reassign, BulkReassignRequest};
use crate::error::AppResult;
use crate::middleware::rbac::RequireAssignmentManager;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /cases/{id}/assign
pub async fn assign(
    RequireAssignmentManager(user): RequireAssignmentManager,
    State(state): State<AppState>,
    Path(case_id): Path<DbId>,
    Json(input): Json<AssignRequest>,
) -> AppResult<impl IntoResponse> {
    let outcome = assign_case(&state.pool, &state.event_bus, &user, case_id, &input).await?;
    Ok(Json(DataResponse { data: outcome }))
}

/// POST /cases/{id}/reassign
///
/// Like `assign`, but the body names the case type the caller expects.
pub async fn reassign(
    RequireAssignmentManager(user): RequireAssignmentManager,
    State(state): State<AppState>,
    Path(case_id): Path<DbId>,
    Json(input): Json<ReassignRequest>,
) -> AppResult<impl IntoResponse> {
    let outcome = reassign_case(&state.pool, &state.event_bus, &user, case_id, &input).await?;
    Ok(Json(DataResponse { data: outcome }))
}

/// POST /cases/{id}/unassign
pub async fn unassign(
    RequireAssignmentManager(user): RequireAssignmentManager,
    State(state): State<AppState>,
    Path(case_id): Path<DbId>,
    input: Option<Json<UnassignRequest>>,
) -> AppResult<impl IntoResponse> {
    let input = input.map(|Json(i)| i).unwrap_or_default();
    let outcome = unassign_case(&state.pool, &state.event_bus, &user, case_id, &input).await?;
    Ok(Json(DataResponse { data: outcome }))
}

/// POST /cases/{id}/reopen
pub async fn reopen(
    RequireAssignmentManager(user): RequireAssignmentManager,
    State(state): State<AppState>,
    Path(case_id): Path<DbId>,
    Json(input): Json<ReopenRequest>,
) -> AppResult<impl IntoResponse> {
    let entry = reopen_case(&state.pool, &state.event_bus, &user, case_id, &input).await?;
    Ok(Json(DataResponse { data: entry }))
}

/// POST /cases/bulk-reassign
///
/// Returns the plan (and, unless `dry_run`, how many items committed).
pub async fn bulk(
    RequireAssignmentManager(user): RequireAssignmentManager,
    State(state): State<AppState>,
    Json(input): Json<BulkReassignRequest>,
) -> AppResult<impl IntoResponse> {
    let outcome = bulk_reassign(
        &state.pool,
        &state.event_bus,
        &user,
        state.config.max_bulk_cases,
        &input,
    )
    .await?;
    Ok(Json(DataResponse { data: outcome }))
}
