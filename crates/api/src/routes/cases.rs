//! Route definitions for the `/cases` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{assignment, cases, consensus, findings};
use crate::state::AppState;

/// Routes mounted at `/cases`.
///
/// ```text
/// GET    /                        -> list_cases
/// POST   /bulk-reassign           -> bulk
/// GET    /{id}                    -> get_case
/// GET    /{id}/workflow           -> list_workflow
/// GET    /{id}/workflow/latest    -> latest_workflow
/// POST   /{id}/assign             -> assign
/// POST   /{id}/reassign           -> reassign
/// POST   /{id}/unassign           -> unassign
/// POST   /{id}/reopen             -> reopen
/// GET    /{id}/findings           -> get_findings
/// PUT    /{id}/findings           -> put_findings
/// GET    /{id}/matches            -> get_matches
/// PUT    /{id}/matches            -> put_matches
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(cases::list_cases))
        .route("/bulk-reassign", post(assignment::bulk))
        .route("/{id}", get(cases::get_case))
        .route("/{id}/workflow", get(cases::list_workflow))
        .route("/{id}/workflow/latest", get(cases::latest_workflow))
        .route("/{id}/assign", post(assignment::assign))
        .route("/{id}/reassign", post(assignment::reassign))
        .route("/{id}/unassign", post(assignment::unassign))
        .route("/{id}/reopen", post(assignment::reopen))
        .route(
            "/{id}/findings",
            get(findings::get_findings).put(findings::put_findings),
        )
        .route(
            "/{id}/matches",
            get(consensus::get_matches).put(consensus::put_matches),
        )
}
