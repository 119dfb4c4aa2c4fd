//! Repository for the `cases` table and the case-plus-latest-entry view.

use medreview_core::query::{FilterExpr, Page, SortExpr};
use medreview_core::status::StepStatus;
use medreview_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::filter::{bind_all, compile, order_by};
use crate::models::case::{Case, CaseView, CreateCase};

/// Column list shared across `cases` queries.
const COLUMNS: &str = "id, record_id, case_type_id, seat, due_date, content_updated_at, \
    attested_by, attested_at, deleted_at, created_at, updated_at";

/// Case joined with its latest workflow entry. Aliases `c` and `w` are
/// what [`crate::filter::column`] refers to.
const VIEW_SELECT: &str = "SELECT c.id, c.record_id, c.case_type_id, ct.name AS case_type_name, \
        c.seat, c.due_date, c.content_updated_at, c.attested_by, c.attested_at, c.created_at, \
        w.step_status_id, ss.name AS status_name, w.recipient_user_id AS assignee_id, \
        w.id AS latest_entry_id, w.entry_at AS status_changed_at \
     FROM cases c \
     JOIN workflow_entries w ON w.case_id = c.id AND w.is_latest \
     JOIN case_types ct ON ct.id = c.case_type_id \
     JOIN step_statuses ss ON ss.id = w.step_status_id";

/// Note on the log entry every case starts with.
const INITIAL_NOTE: &str = "Created (unassigned)";

/// Provides case reads, locking reads for transitions, and content writes.
pub struct CaseRepo;

impl CaseRepo {
    // -----------------------------------------------------------------------
    // Create / read
    // -----------------------------------------------------------------------

    /// Insert a case together with its initial UNASSIGNED log entry.
    pub async fn create(pool: &PgPool, input: &CreateCase) -> Result<Case, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO cases (record_id, case_type_id, seat, due_date) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        let case = sqlx::query_as::<_, Case>(&query)
            .bind(input.record_id)
            .bind(input.case_type_id)
            .bind(input.seat)
            .bind(input.due_date)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO workflow_entries (case_id, step_status_id, note) VALUES ($1, $2, $3)",
        )
        .bind(case.id)
        .bind(StepStatus::Unassigned.id())
        .bind(INITIAL_NOTE)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(case)
    }

    /// Find a case row by ID. Excludes soft-deleted cases.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Case>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM cases WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Case>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a case with its latest entry.
    pub async fn find_view(pool: &PgPool, id: DbId) -> Result<Option<CaseView>, sqlx::Error> {
        let query = format!("{VIEW_SELECT} WHERE c.id = $1 AND c.deleted_at IS NULL");
        sqlx::query_as::<_, CaseView>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// All cases of one type on the given records, ordered by record then case id.
    pub async fn list_by_records(
        pool: &PgPool,
        record_ids: &[DbId],
        case_type_id: i16,
    ) -> Result<Vec<CaseView>, sqlx::Error> {
        let query = format!(
            "{VIEW_SELECT} \
             WHERE c.record_id = ANY($1) AND c.case_type_id = $2 AND c.deleted_at IS NULL \
             ORDER BY c.record_id, c.id"
        );
        sqlx::query_as::<_, CaseView>(&query)
            .bind(record_ids)
            .bind(case_type_id)
            .fetch_all(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Filtered listing
    // -----------------------------------------------------------------------

    /// List cases matching `expr`, sorted and paginated.
    pub async fn list_views(
        pool: &PgPool,
        expr: &FilterExpr,
        sort: SortExpr,
        page: Page,
    ) -> Result<Vec<CaseView>, sqlx::Error> {
        let filter = compile(expr, 1);
        let limit_idx = filter.binds.len() + 1;
        let query = format!(
            "{VIEW_SELECT} WHERE c.deleted_at IS NULL AND {where_sql} {order} \
             LIMIT ${limit_idx} OFFSET ${offset_idx}",
            where_sql = filter.sql,
            order = order_by(sort),
            offset_idx = limit_idx + 1,
        );
        bind_all(sqlx::query_as::<_, CaseView>(&query), &filter.binds)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(pool)
            .await
    }

    /// Count cases matching `expr`.
    pub async fn count(pool: &PgPool, expr: &FilterExpr) -> Result<i64, sqlx::Error> {
        let filter = compile(expr, 1);
        let query = format!(
            "SELECT COUNT(*) FROM cases c \
             JOIN workflow_entries w ON w.case_id = c.id AND w.is_latest \
             WHERE c.deleted_at IS NULL AND {}",
            filter.sql
        );
        let row: (i64,) = bind_all(sqlx::query_as(&query), &filter.binds)
            .fetch_one(pool)
            .await?;
        Ok(row.0)
    }

    /// Candidate cases for a bulk operation in case id order, capped at `limit` rows.
    pub async fn list_candidates(
        pool: &PgPool,
        expr: &FilterExpr,
        limit: i64,
    ) -> Result<Vec<CaseView>, sqlx::Error> {
        let filter = compile(expr, 1);
        let query = format!(
            "{VIEW_SELECT} WHERE c.deleted_at IS NULL AND {} ORDER BY c.id LIMIT ${}",
            filter.sql,
            filter.binds.len() + 1
        );
        bind_all(sqlx::query_as::<_, CaseView>(&query), &filter.binds)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Transaction steps
    // -----------------------------------------------------------------------

    /// Lock a case row for the rest of the transaction.
    ///
    /// Every transition takes this lock before reading the latest entry, so
    /// writers on one case queue here and each reads the log only after the
    /// previous writer committed. Returns `None` if the case is gone.
    pub async fn lock_row(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: DbId,
    ) -> Result<Option<DbId>, sqlx::Error> {
        let row: Option<(DbId,)> = sqlx::query_as(
            "SELECT id FROM cases WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(row.map(|(id,)| id))
    }

    /// Lock every case row of one type on a record, in case id order so that
    /// concurrent transactions acquire the locks in the same sequence.
    /// Returns the locked ids.
    pub async fn lock_record_rows(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        record_id: DbId,
        case_type_id: i16,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        let rows: Vec<(DbId,)> = sqlx::query_as(
            "SELECT id FROM cases \
             WHERE record_id = $1 AND case_type_id = $2 AND deleted_at IS NULL \
             ORDER BY id FOR UPDATE",
        )
        .bind(record_id)
        .bind(case_type_id)
        .fetch_all(&mut **tx)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Case views for `ids` in id order, read inside a transaction.
    pub async fn list_views_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        ids: &[DbId],
    ) -> Result<Vec<CaseView>, sqlx::Error> {
        let query = format!(
            "{VIEW_SELECT} WHERE c.id = ANY($1) AND c.deleted_at IS NULL ORDER BY c.id"
        );
        sqlx::query_as::<_, CaseView>(&query)
            .bind(ids)
            .fetch_all(&mut **tx)
            .await
    }

    /// First case of one type on a record, read inside a transaction.
    pub async fn find_record_case(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        record_id: DbId,
        case_type_id: i16,
    ) -> Result<Option<CaseView>, sqlx::Error> {
        let query = format!(
            "{VIEW_SELECT} \
             WHERE c.record_id = $1 AND c.case_type_id = $2 AND c.deleted_at IS NULL \
             ORDER BY c.id LIMIT 1"
        );
        sqlx::query_as::<_, CaseView>(&query)
            .bind(record_id)
            .bind(case_type_id)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Bump the content version only if it still equals `expected`.
    ///
    /// Returns the new version, or `None` when another write got there first.
    pub async fn touch_content(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: DbId,
        expected: Timestamp,
    ) -> Result<Option<Timestamp>, sqlx::Error> {
        let row: Option<(Timestamp,)> = sqlx::query_as(
            "UPDATE cases \
             SET content_updated_at = GREATEST(NOW(), content_updated_at + INTERVAL '1 microsecond') \
             WHERE id = $1 AND content_updated_at = $2 AND deleted_at IS NULL \
             RETURNING content_updated_at",
        )
        .bind(id)
        .bind(expected)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(row.map(|(ts,)| ts))
    }

    /// Record who attested the completed content.
    pub async fn set_attestation(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: DbId,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE cases SET attested_by = $2, attested_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(user_id)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Drop attestation data (on reopen).
    pub async fn clear_attestation(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE cases SET attested_by = NULL, attested_at = NULL \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
