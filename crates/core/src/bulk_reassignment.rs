//! Bulk reassignment planning.
//!
//! Turns a candidate case set plus one or two target reviewers into an
//! ordered list of single-case reassignments. Abstraction records are the
//! interesting part: their two seats must never end up with the same
//! reviewer, so records that carry more than one candidate, or whose
//! sibling seat is already held by a target, are planned as a unit
//! ("constrained"). Everything else is split evenly between the targets.
//!
//! The plan is pure data. Execution goes through the single-case
//! assignment path one item at a time and stops at the first failure.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use crate::case::{CaseSnapshot, SEAT_ONE, SEAT_TWO};
use crate::error::CoreError;
use crate::query::CaseFilter;
use crate::status::CaseType;
use crate::types::DbId;

/// Default cap on the number of candidate cases one bulk request may touch.
pub const DEFAULT_MAX_BULK_CASES: usize = 1000;

/// The reviewers a bulk request hands work to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BulkTargets {
    pub assignee_one: DbId,
    pub assignee_two: Option<DbId>,
}

impl BulkTargets {
    fn contains(&self, user_id: Option<DbId>) -> bool {
        user_id.is_some_and(|u| u == self.assignee_one || Some(u) == self.assignee_two)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Completed when the plan was computed.
    Completed,
    /// Already held by the reviewer the plan would give it to.
    AlreadyAssigned,
    /// With a single target, the paired seat on the record is (or will be)
    /// held by that target.
    PairedSeatHeld,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedCase {
    pub case_id: DbId,
    pub record_id: DbId,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedAssignment {
    pub case_id: DbId,
    pub record_id: DbId,
    pub from_user_id: Option<DbId>,
    pub to_user_id: DbId,
    /// Planned as part of a whole-record unit rather than the even split.
    pub constrained: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkPlan {
    pub category: CaseType,
    pub targets: BulkTargets,
    pub assignments: Vec<PlannedAssignment>,
    /// Records on which the two targets' seats were swapped.
    pub swapped_records: Vec<DbId>,
    pub skipped: Vec<SkippedCase>,
}

/// Validate the request shape before any candidate is loaded.
pub fn validate_request(
    filter: &CaseFilter,
    targets: BulkTargets,
) -> Result<(), CoreError> {
    if filter.is_empty() {
        return Err(CoreError::Validation(
            "Bulk reassignment requires at least one filter criterion".into(),
        ));
    }
    filter.validate()?;
    if targets.assignee_two == Some(targets.assignee_one) {
        return Err(CoreError::Validation(
            "The two target reviewers must be different users".into(),
        ));
    }
    if targets.assignee_two.is_some() && filter.case_type.is_some_and(|t| !t.is_paired()) {
        return Err(CoreError::Validation(
            "A second reviewer can only be given for abstraction cases".into(),
        ));
    }
    Ok(())
}

/// Resolve which single case category the candidate set belongs to.
pub fn resolve_category(
    filter: &CaseFilter,
    candidates: &[CaseSnapshot],
    targets: BulkTargets,
) -> Result<CaseType, CoreError> {
    let types: BTreeSet<i16> = candidates.iter().map(|c| c.case_type.id()).collect();
    let category = match (filter.case_type, types.len()) {
        (_, 0) => {
            return Err(CoreError::Validation(
                "The filter matched no cases".into(),
            ))
        }
        (Some(t), 1) if candidates[0].case_type == t => t,
        (None, 1) => candidates[0].case_type,
        _ => {
            let names: Vec<&str> = types
                .iter()
                .filter_map(|id| CaseType::from_id(*id))
                .map(CaseType::label)
                .collect();
            return Err(CoreError::Validation(format!(
                "The filter matched more than one case category ({}); narrow it by case_type",
                names.join(", ")
            )));
        }
    };
    if targets.assignee_two.is_some() && !category.is_paired() {
        return Err(CoreError::Validation(format!(
            "{category} cases support a single reviewer only"
        )));
    }
    Ok(category)
}

/// Compute the reassignment plan.
///
/// `record_cases` holds, per record id, every case of the candidates'
/// category on that record (candidates and non-candidates alike), so
/// sibling seats outside the filter are visible.
pub fn plan_bulk_reassignment(
    category: CaseType,
    candidates: &[CaseSnapshot],
    record_cases: &HashMap<DbId, Vec<CaseSnapshot>>,
    targets: BulkTargets,
) -> Result<BulkPlan, CoreError> {
    let mut plan = BulkPlan {
        category,
        targets,
        assignments: Vec::new(),
        swapped_records: Vec::new(),
        skipped: Vec::new(),
    };

    let mut by_record: BTreeMap<DbId, Vec<&CaseSnapshot>> = BTreeMap::new();
    for case in candidates {
        if case.is_completed() {
            plan.skipped.push(SkippedCase {
                case_id: case.case_id,
                record_id: case.record_id,
                reason: SkipReason::Completed,
            });
            continue;
        }
        by_record.entry(case.record_id).or_default().push(case);
    }

    if by_record.is_empty() {
        return Err(CoreError::Validation(
            "No matching case is open for reassignment".into(),
        ));
    }

    for cases in by_record.values_mut() {
        cases.sort_by_key(|c| c.case_id);
    }

    match (category.is_paired(), targets.assignee_two) {
        (true, Some(two)) => plan_paired_two(&mut plan, &by_record, record_cases, targets.assignee_one, two),
        (true, None) => plan_paired_one(&mut plan, &by_record, record_cases, targets.assignee_one),
        (false, None) => plan_single(&mut plan, &by_record, targets.assignee_one),
        (false, Some(_)) => {
            return Err(CoreError::Validation(format!(
                "{category} cases support a single reviewer only"
            )))
        }
    }

    Ok(plan)
}

/// Seat of an abstraction case, falling back to its position on the record.
fn effective_seat(case: &CaseSnapshot, position: usize) -> i16 {
    case.seat.unwrap_or(if position == 0 { SEAT_ONE } else { SEAT_TWO })
}

fn seats_on_record<'a>(
    record_id: DbId,
    candidates: &[&'a CaseSnapshot],
    record_cases: &'a HashMap<DbId, Vec<CaseSnapshot>>,
) -> Vec<&'a CaseSnapshot> {
    let mut seats: Vec<&CaseSnapshot> = record_cases
        .get(&record_id)
        .map(|cases| cases.iter().collect())
        .unwrap_or_default();
    for c in candidates {
        if !seats.iter().any(|s| s.case_id == c.case_id) {
            seats.push(c);
        }
    }
    seats.sort_by_key(|c| c.case_id);
    seats
}

fn push_assignment(plan: &mut BulkPlan, case: &CaseSnapshot, to: DbId, constrained: bool) {
    if case.assignee_id == Some(to) {
        plan.skipped.push(SkippedCase {
            case_id: case.case_id,
            record_id: case.record_id,
            reason: SkipReason::AlreadyAssigned,
        });
    } else {
        plan.assignments.push(PlannedAssignment {
            case_id: case.case_id,
            record_id: case.record_id,
            from_user_id: case.assignee_id,
            to_user_id: to,
            constrained,
        });
    }
}

fn plan_paired_two(
    plan: &mut BulkPlan,
    by_record: &BTreeMap<DbId, Vec<&CaseSnapshot>>,
    record_cases: &HashMap<DbId, Vec<CaseSnapshot>>,
    one: DbId,
    two: DbId,
) {
    let targets = plan.targets;
    let mut pool: Vec<&CaseSnapshot> = Vec::new();

    for (&record_id, cands) in by_record {
        let seats = seats_on_record(record_id, cands, record_cases);
        let sibling_held_by_target = seats.iter().any(|s| {
            !cands.iter().any(|c| c.case_id == s.case_id) && targets.contains(s.assignee_id)
        });

        if cands.len() <= 1 && !sibling_held_by_target {
            let case = cands[0];
            if targets.contains(case.assignee_id) {
                plan.skipped.push(SkippedCase {
                    case_id: case.case_id,
                    record_id,
                    reason: SkipReason::AlreadyAssigned,
                });
            } else {
                pool.push(case);
            }
            continue;
        }

        // Constrained: seat one goes to reviewer one, seat two to reviewer
        // two, unless a target already sits in the other's seat.
        let holder = |seat: i16| {
            seats
                .iter()
                .enumerate()
                .find(|(pos, s)| effective_seat(s, *pos) == seat)
                .and_then(|(_, s)| s.assignee_id)
        };
        let swap = holder(SEAT_ONE) == Some(two) || holder(SEAT_TWO) == Some(one);
        let (seat_one_to, seat_two_to) = if swap { (two, one) } else { (one, two) };
        if swap {
            plan.swapped_records.push(record_id);
        }

        for (pos, seat_case) in seats.iter().enumerate() {
            if !cands.iter().any(|c| c.case_id == seat_case.case_id) {
                continue;
            }
            let to = if effective_seat(seat_case, pos) == SEAT_ONE {
                seat_one_to
            } else {
                seat_two_to
            };
            push_assignment(plan, seat_case, to, true);
        }
    }

    // Even split of the unconstrained remainder, in case id order.
    pool.sort_by_key(|c| c.case_id);
    let first_half = pool.len().div_ceil(2);
    for (idx, case) in pool.into_iter().enumerate() {
        let to = if idx < first_half { one } else { two };
        push_assignment(plan, case, to, false);
    }
}

fn plan_paired_one(
    plan: &mut BulkPlan,
    by_record: &BTreeMap<DbId, Vec<&CaseSnapshot>>,
    record_cases: &HashMap<DbId, Vec<CaseSnapshot>>,
    target: DbId,
) {
    for (&record_id, cands) in by_record {
        let seats = seats_on_record(record_id, cands, record_cases);
        let target_seated = seats.iter().any(|s| s.assignee_id == Some(target));

        let mut placed = target_seated;
        for case in cands {
            if case.assignee_id == Some(target) {
                plan.skipped.push(SkippedCase {
                    case_id: case.case_id,
                    record_id,
                    reason: SkipReason::AlreadyAssigned,
                });
            } else if placed {
                plan.skipped.push(SkippedCase {
                    case_id: case.case_id,
                    record_id,
                    reason: SkipReason::PairedSeatHeld,
                });
            } else {
                push_assignment(plan, case, target, cands.len() > 1);
                placed = true;
            }
        }
    }
}

fn plan_single(plan: &mut BulkPlan, by_record: &BTreeMap<DbId, Vec<&CaseSnapshot>>, target: DbId) {
    for cands in by_record.values() {
        for case in cands {
            push_assignment(plan, case, target, false);
        }
    }
}
