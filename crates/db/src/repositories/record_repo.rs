//! Repository for the `records` table.

use medreview_core::types::DbId;
use sqlx::PgPool;

use crate::models::record::{CreateRecord, Record};

const COLUMNS: &str =
    "id, external_ref, supporting_file_count, deleted_at, created_at, updated_at";

pub struct RecordRepo;

impl RecordRepo {
    pub async fn create(pool: &PgPool, input: &CreateRecord) -> Result<Record, sqlx::Error> {
        let query = format!(
            "INSERT INTO records (external_ref, supporting_file_count) \
             VALUES ($1, COALESCE($2, 0)) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Record>(&query)
            .bind(&input.external_ref)
            .bind(input.supporting_file_count)
            .fetch_one(pool)
            .await
    }

    /// Find a record by ID. Excludes soft-deleted rows.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Record>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM records WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Record>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Update the supporting file count maintained by the upload pipeline.
    pub async fn set_supporting_file_count(
        pool: &PgPool,
        id: DbId,
        count: i32,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE records SET supporting_file_count = $2 WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(count)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
