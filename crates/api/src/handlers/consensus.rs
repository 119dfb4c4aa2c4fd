//! Handlers for consensus match records.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;

use medreview_core::types::DbId;

use crate::engine::consensus::{list_matches, submit_matches, SubmitMatches};
use crate::error::AppResult;
use crate::handlers::cases::{ensure_can_view, ensure_case};
use crate::middleware::auth::CurrentUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /cases/{id}/matches
///
/// Match records for a consensus case plus the IRR score.
pub async fn get_matches(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(case_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let case = ensure_case(&state.pool, case_id).await?;
    ensure_can_view(&user, &case)?;
    let outcome = list_matches(&state.pool, case_id).await?;
    Ok(Json(DataResponse { data: outcome }))
}

/// PUT /cases/{id}/matches
pub async fn put_matches(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(case_id): Path<DbId>,
    Json(input): Json<SubmitMatches>,
) -> AppResult<impl IntoResponse> {
    let outcome = submit_matches(&state.pool, &state.event_bus, &user, case_id, &input).await?;
    Ok(Json(DataResponse { data: outcome }))
}
