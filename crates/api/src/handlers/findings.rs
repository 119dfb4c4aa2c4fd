//! Handlers for abstraction findings.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use medreview_core::types::{DbId, Timestamp};
use medreview_db::models::finding::Finding;
use medreview_db::repositories::FindingRepo;

use crate::engine::findings::{submit_findings, SubmitFindings};
use crate::error::AppResult;
use crate::handlers::cases::{ensure_can_view, ensure_case};
use crate::middleware::auth::CurrentUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Findings together with the content version to echo back on save.
#[derive(Debug, Serialize)]
pub struct FindingsView {
    pub case_id: DbId,
    pub content_version: Timestamp,
    pub findings: Vec<Finding>,
}

/// GET /cases/{id}/findings
pub async fn get_findings(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(case_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let case = ensure_case(&state.pool, case_id).await?;
    ensure_can_view(&user, &case)?;
    let findings = FindingRepo::list_by_case(&state.pool, case_id).await?;
    Ok(Json(DataResponse {
        data: FindingsView {
            case_id,
            content_version: case.content_updated_at,
            findings,
        },
    }))
}

/// PUT /cases/{id}/findings
pub async fn put_findings(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(case_id): Path<DbId>,
    Json(input): Json<SubmitFindings>,
) -> AppResult<impl IntoResponse> {
    let outcome = submit_findings(&state.pool, &state.event_bus, &user, case_id, &input).await?;
    Ok(Json(DataResponse { data: outcome }))
}
