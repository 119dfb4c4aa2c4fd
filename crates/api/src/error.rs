use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use medreview_core::error::{CoreError, ErrorKind};
use medreview_core::types::DbId;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `medreview_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Shorthand for the common "entity not found" case.
    pub fn not_found(entity: &'static str, id: DbId) -> Self {
        AppError::Core(CoreError::NotFound { entity, id })
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => classify_core_error(core),
            AppError::Database(err) => classify_sqlx_error(err),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::Internal.code(),
        "An internal error occurred".to_string(),
    )
}

/// Map a domain error through its [`ErrorKind`].
///
/// A bulk failure keeps its case/record context in the message and takes
/// its status from the item error it wraps.
fn classify_core_error(err: &CoreError) -> (StatusCode, &'static str, String) {
    let kind = err.kind();
    if kind == ErrorKind::Internal {
        tracing::error!(error = %err, "Internal core error");
        let (status, code, sanitized) = internal();
        // A bulk failure still reports where it stopped; only the cause is hidden.
        let message = match err {
            CoreError::BatchItem {
                case_id,
                record_id,
                committed,
                ..
            } => format!(
                "Bulk operation stopped at case {case_id} (record {record_id}) after {committed} committed item(s): {sanitized}"
            ),
            _ => sanitized,
        };
        return (status, code, message);
    }
    let status = match kind {
        ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let message = match err {
        CoreError::NotFound { entity, id } => format!("{entity} with id {id} not found"),
        CoreError::Validation(msg)
        | CoreError::Conflict(msg)
        | CoreError::Unauthorized(msg)
        | CoreError::Forbidden(msg)
        | CoreError::Internal(msg) => msg.clone(),
        CoreError::BatchItem { .. } => err.to_string(),
    };
    (status, kind.code(), message)
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique constraint violations (constraint name starting with `uq_`) map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) => {
            if let Some(constraint) = unique_violation(err) {
                return (
                    StatusCode::CONFLICT,
                    "CONFLICT",
                    duplicate_message(constraint),
                );
            }
            tracing::error!(error = %db_err, "Database error");
            internal()
        }
        other => {
            tracing::error!(error = %other, "Database error");
            internal()
        }
    }
}

/// Read a sqlx error as a domain error, with the same rules as the HTTP
/// mapping. Used where the failure has to travel inside a [`CoreError`],
/// such as a failed bulk item.
///
/// `RowNotFound` is attributed to `entity`/`id`.
pub(crate) fn core_from_sqlx(err: sqlx::Error, entity: &'static str, id: DbId) -> CoreError {
    if matches!(err, sqlx::Error::RowNotFound) {
        return CoreError::NotFound { entity, id };
    }
    if let Some(constraint) = unique_violation(&err) {
        return CoreError::Conflict(duplicate_message(constraint));
    }
    CoreError::Internal(format!("Database error: {err}"))
}

/// Name of the `uq_*` constraint a PostgreSQL unique violation (23505) hit.
fn unique_violation(err: &sqlx::Error) -> Option<&str> {
    let sqlx::Error::Database(db_err) = err else {
        return None;
    };
    if db_err.code().as_deref() != Some("23505") {
        return None;
    }
    db_err.constraint().filter(|c| c.starts_with("uq_"))
}

fn duplicate_message(constraint: &str) -> String {
    format!("Duplicate value violates unique constraint: {constraint}")
}
