use serde::Serialize;

use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),

    /// The first failing item of a bulk operation. Items before it are
    /// already committed; items after it were never attempted.
    #[error("Bulk operation stopped at case {case_id} (record {record_id}) after {committed} committed item(s): {source}")]
    BatchItem {
        case_id: DbId,
        record_id: DbId,
        committed: usize,
        #[source]
        source: Box<CoreError>,
    },
}

/// Machine-readable error classification shared by every surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    Internal,
}

impl ErrorKind {
    /// Stable code string used in JSON error bodies.
    pub fn code(self) -> &'static str {
        match self {
            Self::BadRequest => "BAD_REQUEST",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::Internal => "INTERNAL_ERROR",
        }
    }
}

impl CoreError {
    /// Classify this error. A wrapped bulk failure reports its source's kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Validation(_) => ErrorKind::BadRequest,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::Internal(_) => ErrorKind::Internal,
            Self::BatchItem { source, .. } => source.kind(),
        }
    }

    /// Wrap an item-level failure with the bulk context it occurred in.
    pub fn in_batch(self, case_id: DbId, record_id: DbId, committed: usize) -> Self {
        Self::BatchItem {
            case_id,
            record_id,
            committed,
            source: Box::new(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_is_bad_request() {
        assert_eq!(CoreError::Validation("x".into()).kind(), ErrorKind::BadRequest);
        assert_eq!(ErrorKind::BadRequest.code(), "BAD_REQUEST");
    }

    #[test]
    fn batch_item_reports_source_kind() {
        let err = CoreError::Conflict("stale".into()).in_batch(7, 3, 2);
        assert_eq!(err.kind(), ErrorKind::Conflict);
        let msg = err.to_string();
        assert!(msg.contains("case 7"));
        assert!(msg.contains("record 3"));
        assert!(msg.contains("2 committed"));
    }

    #[test]
    fn nested_batch_kind_resolves_to_innermost() {
        let err = CoreError::NotFound { entity: "User", id: 9 }
            .in_batch(1, 1, 0)
            .in_batch(2, 2, 0);
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
