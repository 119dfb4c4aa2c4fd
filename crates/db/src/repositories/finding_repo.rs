//! Repository for `adverse_event_findings`.

use medreview_core::findings::FindingInput;
use medreview_core::types::DbId;
use sqlx::PgPool;

use crate::models::finding::Finding;

const COLUMNS: &str = "id, case_id, trigger_id, adverse_event_type_id, harm_category_id, \
    present_on_admission, description, position, created_by, created_at, updated_at";

pub struct FindingRepo;

impl FindingRepo {
    /// Live findings for a case in submission order.
    pub async fn list_by_case(pool: &PgPool, case_id: DbId) -> Result<Vec<Finding>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM adverse_event_findings \
             WHERE case_id = $1 AND deleted_at IS NULL \
             ORDER BY position, id"
        );
        sqlx::query_as::<_, Finding>(&query)
            .bind(case_id)
            .fetch_all(pool)
            .await
    }

    /// Same as [`Self::list_by_case`], inside an open transaction.
    pub async fn list_by_case_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        case_id: DbId,
    ) -> Result<Vec<Finding>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM adverse_event_findings \
             WHERE case_id = $1 AND deleted_at IS NULL \
             ORDER BY position, id"
        );
        sqlx::query_as::<_, Finding>(&query)
            .bind(case_id)
            .fetch_all(&mut **tx)
            .await
    }

    /// Replace a case's findings with `inputs`, soft-deleting the old set.
    pub async fn replace_for_case(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        case_id: DbId,
        user_id: DbId,
        inputs: &[FindingInput],
    ) -> Result<Vec<Finding>, sqlx::Error> {
        Self::soft_delete_for_case(tx, case_id).await?;

        let query = format!(
            "INSERT INTO adverse_event_findings \
                (case_id, trigger_id, adverse_event_type_id, harm_category_id, \
                 present_on_admission, description, position, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        let mut created = Vec::with_capacity(inputs.len());
        for (position, input) in inputs.iter().enumerate() {
            let finding = sqlx::query_as::<_, Finding>(&query)
                .bind(case_id)
                .bind(input.trigger_id)
                .bind(input.adverse_event_type_id)
                .bind(input.harm_category_id)
                .bind(input.present_on_admission)
                .bind(&input.description)
                .bind(position as i32)
                .bind(user_id)
                .fetch_one(&mut **tx)
                .await?;
            created.push(finding);
        }
        Ok(created)
    }

    /// Soft-delete every live finding on a case. Returns the number removed.
    pub async fn soft_delete_for_case(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        case_id: DbId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE adverse_event_findings SET deleted_at = NOW() \
             WHERE case_id = $1 AND deleted_at IS NULL",
        )
        .bind(case_id)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }
}
