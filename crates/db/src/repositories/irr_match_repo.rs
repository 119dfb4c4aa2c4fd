//! Repository for `irr_matches`.

use medreview_core::findings::MatchDecision;
use medreview_core::irr::MatchPair;
use medreview_core::types::DbId;
use sqlx::PgPool;

use crate::models::irr_match::IrrMatch;

const COLUMNS: &str = "id, consensus_case_id, abstractor_one_finding_id, abstractor_two_finding_id, \
    is_match, position, consensus_is_match, selected_finding_id, comment, created_at, updated_at";

pub struct IrrMatchRepo;

impl IrrMatchRepo {
    /// Whether match records were already generated for a consensus case.
    pub async fn exists_for_case(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        consensus_case_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let row: (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM irr_matches WHERE consensus_case_id = $1)",
        )
        .bind(consensus_case_id)
        .fetch_one(&mut **tx)
        .await?;
        Ok(row.0)
    }

    /// Insert one record per pair or singleton, keeping matcher output order.
    pub async fn create_batch(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        consensus_case_id: DbId,
        pairs: &[MatchPair],
    ) -> Result<Vec<IrrMatch>, sqlx::Error> {
        let query = format!(
            "INSERT INTO irr_matches \
                (consensus_case_id, abstractor_one_finding_id, abstractor_two_finding_id, is_match, position) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        let mut created = Vec::with_capacity(pairs.len());
        for (position, pair) in pairs.iter().enumerate() {
            let row = sqlx::query_as::<_, IrrMatch>(&query)
                .bind(consensus_case_id)
                .bind(pair.abstractor_one_finding_id)
                .bind(pair.abstractor_two_finding_id)
                .bind(pair.is_match)
                .bind(position as i32)
                .fetch_one(&mut **tx)
                .await?;
            created.push(row);
        }
        Ok(created)
    }

    /// Match records for a consensus case in matcher order.
    pub async fn list_by_case(
        pool: &PgPool,
        consensus_case_id: DbId,
    ) -> Result<Vec<IrrMatch>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM irr_matches WHERE consensus_case_id = $1 ORDER BY position"
        );
        sqlx::query_as::<_, IrrMatch>(&query)
            .bind(consensus_case_id)
            .fetch_all(pool)
            .await
    }

    /// Match records for a consensus case, locked for annotation.
    pub async fn lock_by_case(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        consensus_case_id: DbId,
    ) -> Result<Vec<IrrMatch>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM irr_matches WHERE consensus_case_id = $1 \
             ORDER BY position FOR UPDATE"
        );
        sqlx::query_as::<_, IrrMatch>(&query)
            .bind(consensus_case_id)
            .fetch_all(&mut **tx)
            .await
    }

    /// Store a consensus decision. The matcher's own columns are never touched.
    pub async fn apply_decision(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        consensus_case_id: DbId,
        decision: &MatchDecision,
    ) -> Result<Option<IrrMatch>, sqlx::Error> {
        let query = format!(
            "UPDATE irr_matches SET \
                consensus_is_match = $3, \
                selected_finding_id = $4, \
                comment = $5 \
             WHERE id = $1 AND consensus_case_id = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, IrrMatch>(&query)
            .bind(decision.match_id)
            .bind(consensus_case_id)
            .bind(decision.consensus_is_match)
            .bind(decision.selected_finding_id)
            .bind(&decision.comment)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Drop every consensus decision on a case (when it changes hands).
    pub async fn clear_decisions(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        consensus_case_id: DbId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE irr_matches SET consensus_is_match = NULL, selected_finding_id = NULL, comment = NULL \
             WHERE consensus_case_id = $1 \
               AND (consensus_is_match IS NOT NULL OR selected_finding_id IS NOT NULL OR comment IS NOT NULL)",
        )
        .bind(consensus_case_id)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }
}
