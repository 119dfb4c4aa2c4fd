//! Consensus match decisions.

use std::collections::{HashMap, HashSet};

use medreview_core::concurrency::check_version;
use medreview_core::error::CoreError;
use medreview_core::findings::{check_content_editable, check_match_decision, MatchDecision};
use medreview_core::irr::{irr_score, IrrScore};
use medreview_core::status::{CaseType, StepStatus};
use medreview_core::types::{DbId, Timestamp};
use medreview_db::models::irr_match::IrrMatch;
use medreview_db::repositories::{CaseRepo, IrrMatchRepo};
use medreview_events::EventBus;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use super::findings::{advance_after_save, bump_content_version};
use super::transition::{lock_case, publish_all};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::CurrentUser;

/// Body of `PUT /cases/{id}/matches`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitMatches {
    #[serde(default)]
    pub complete: bool,
    pub client_version: Timestamp,
    #[serde(default)]
    pub decisions: Vec<MatchDecision>,
}

#[derive(Debug, Serialize)]
pub struct MatchesOutcome {
    pub case_id: DbId,
    pub status: StepStatus,
    pub content_version: Timestamp,
    pub matches: Vec<IrrMatch>,
    pub irr: IrrScore,
}

/// Agreement over stored match records. Consensus annotations do not
/// change the score; it reflects what the two abstractors recorded.
pub fn score_matches(matches: &[IrrMatch]) -> IrrScore {
    irr_score(
        matches
            .iter()
            .map(|m| (m.has_both_sides(), m.is_match == Some(true))),
    )
}

/// Match records of a consensus case with their IRR score.
pub async fn list_matches(pool: &PgPool, case_id: DbId) -> AppResult<MatchesOutcome> {
    let view = CaseRepo::find_view(pool, case_id)
        .await?
        .ok_or_else(|| AppError::not_found("Case", case_id))?;
    if view.case_type()? != CaseType::Consensus {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Case {case_id} is not a consensus case"
        ))));
    }
    let matches = IrrMatchRepo::list_by_case(pool, case_id).await?;
    Ok(MatchesOutcome {
        case_id,
        status: view.status()?,
        content_version: view.content_updated_at,
        irr: score_matches(&matches),
        matches,
    })
}

/// `SubmitConsensusMatches`: annotate match records, optionally completing
/// the consensus case.
pub async fn submit_matches(
    pool: &PgPool,
    bus: &EventBus,
    actor: &CurrentUser,
    case_id: DbId,
    input: &SubmitMatches,
) -> AppResult<MatchesOutcome> {
    let mut seen = HashSet::new();
    if let Some(dup) = input.decisions.iter().find(|d| !seen.insert(d.match_id)) {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Match {} appears more than once in the submission",
            dup.match_id
        ))));
    }

    let mut tx = pool.begin().await?;
    let locked = lock_case(pool, &mut tx, case_id).await?;
    let case = &locked.snapshot;

    if case.case_type != CaseType::Consensus {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Case {case_id} is a {} case; match decisions are recorded on consensus cases",
            case.case_type
        ))));
    }
    actor.ctx.require_case_editor(case_id, case.assignee_id)?;
    check_content_editable(case_id, case.status)?;
    check_version(case_id, input.client_version, locked.view.content_updated_at)?;

    let stored: HashMap<DbId, IrrMatch> = IrrMatchRepo::lock_by_case(&mut tx, case_id)
        .await?
        .into_iter()
        .map(|m| (m.id, m))
        .collect();

    for decision in &input.decisions {
        let record = stored
            .get(&decision.match_id)
            .ok_or_else(|| AppError::not_found("IrrMatch", decision.match_id))?;
        check_match_decision(decision, &record.sides())?;
    }

    for decision in &input.decisions {
        IrrMatchRepo::apply_decision(&mut tx, case_id, decision)
            .await?
            .ok_or_else(|| AppError::not_found("IrrMatch", decision.match_id))?;
    }

    let content_version =
        bump_content_version(&mut tx, case_id, locked.view.content_updated_at).await?;
    let progress = advance_after_save(&mut tx, actor, case, input.complete).await?;

    tx.commit().await?;

    tracing::info!(
        case_id,
        decision_count = input.decisions.len(),
        status = %progress.status,
        actor_id = actor.user_id(),
        "Consensus decisions saved",
    );
    publish_all(bus, progress.events);

    let matches = IrrMatchRepo::list_by_case(pool, case_id).await?;
    Ok(MatchesOutcome {
        case_id,
        status: progress.status,
        content_version,
        irr: score_matches(&matches),
        matches,
    })
}
