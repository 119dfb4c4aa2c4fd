//! Repository for the append-only `workflow_entries` log.

use chrono::Utc;
use medreview_core::types::{DbId, Timestamp};
use medreview_core::workflow::{next_entry_timestamp, NewEntry};
use sqlx::PgPool;

use crate::models::workflow_entry::{AppendOutcome, WorkflowEntry};

/// Column list shared across queries.
const COLUMNS: &str = "id, case_id, step_status_id, recipient_user_id, sending_user_id, \
    note, reopen_reason, is_latest, entry_at, created_at";

/// Appends transitions and reads case history.
pub struct WorkflowRepo;

impl WorkflowRepo {
    /// Append `entry` as the case's new latest entry.
    ///
    /// Locks the current latest row, verifies it is the one the caller based
    /// its decision on, clears its latest flag and inserts the new row with
    /// a timestamp no earlier than its predecessor. The partial unique index
    /// `uq_workflow_entries_latest` backs the single-latest rule if two
    /// writers ever get past the lock.
    pub async fn append(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        entry: &NewEntry,
    ) -> Result<AppendOutcome, sqlx::Error> {
        let current: Option<(DbId, Timestamp)> = sqlx::query_as(
            "SELECT id, entry_at FROM workflow_entries \
             WHERE case_id = $1 AND is_latest \
             FOR UPDATE",
        )
        .bind(entry.case_id)
        .fetch_optional(&mut **tx)
        .await?;

        let (latest_id, latest_at) = match current {
            Some((id, at)) if id == entry.expected_latest_id => (id, at),
            other => {
                return Ok(AppendOutcome::Stale {
                    actual_latest_id: other.map(|(id, _)| id),
                })
            }
        };

        sqlx::query("UPDATE workflow_entries SET is_latest = FALSE WHERE id = $1")
            .bind(latest_id)
            .execute(&mut **tx)
            .await?;

        let entry_at = next_entry_timestamp(Some(latest_at), Utc::now());
        let query = format!(
            "INSERT INTO workflow_entries \
                (case_id, step_status_id, recipient_user_id, sending_user_id, note, reopen_reason, is_latest, entry_at) \
             VALUES ($1, $2, $3, $4, $5, $6, TRUE, $7) \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, WorkflowEntry>(&query)
            .bind(entry.case_id)
            .bind(entry.step_status.id())
            .bind(entry.recipient_user_id)
            .bind(entry.sending_user_id)
            .bind(&entry.note)
            .bind(&entry.reopen_reason)
            .bind(entry_at)
            .fetch_one(&mut **tx)
            .await?;

        Ok(AppendOutcome::Appended(row))
    }

    /// The case's current entry.
    pub async fn find_latest(
        pool: &PgPool,
        case_id: DbId,
    ) -> Result<Option<WorkflowEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM workflow_entries WHERE case_id = $1 AND is_latest"
        );
        sqlx::query_as::<_, WorkflowEntry>(&query)
            .bind(case_id)
            .fetch_optional(pool)
            .await
    }

    /// Full history, newest first.
    pub async fn list_by_case(
        pool: &PgPool,
        case_id: DbId,
    ) -> Result<Vec<WorkflowEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM workflow_entries \
             WHERE case_id = $1 \
             ORDER BY entry_at DESC, id DESC"
        );
        sqlx::query_as::<_, WorkflowEntry>(&query)
            .bind(case_id)
            .fetch_all(pool)
            .await
    }
}
