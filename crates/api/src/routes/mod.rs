pub mod cases;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /cases                                 list (filter, sort, paginate)
/// /cases/bulk-reassign                   bulk reassignment (POST, manager)
/// /cases/{id}                            case with latest entry
/// /cases/{id}/workflow                   history, newest first
/// /cases/{id}/workflow/latest            latest entry
/// /cases/{id}/assign                     assign (POST, manager)
/// /cases/{id}/reassign                   reassign with claimed type (POST, manager)
/// /cases/{id}/unassign                   unassign (POST, manager)
/// /cases/{id}/reopen                     reopen completed case (POST, manager)
/// /cases/{id}/findings                   get, replace (abstraction)
/// /cases/{id}/matches                    get, annotate (consensus)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/cases", cases::router())
}
