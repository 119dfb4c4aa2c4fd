//! Role-based access control (RBAC) extractors.
//!
//! Each extractor wraps [`CurrentUser`] and rejects requests whose
//! authorization context does not grant the capability.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::auth::CurrentUser;
use crate::error::AppError;
use crate::state::AppState;

/// Requires a user who may move work between reviewers (manager or admin).
///
/// ```ignore
/// async fn bulk(RequireAssignmentManager(user): RequireAssignmentManager) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireAssignmentManager(pub CurrentUser);

impl FromRequestParts<AppState> for RequireAssignmentManager {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        user.ctx.require_assignment_manager()?;
        Ok(RequireAssignmentManager(user))
    }
}
