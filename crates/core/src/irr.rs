//! Inter-rater (IRR) matching of two abstractors' adverse-event findings.
//!
//! The pairing is greedy and depends on the first reviewer's list order:
//! each of their findings takes the best remaining candidate from the
//! second reviewer that shares its `(trigger, event type)` key. It is not
//! a maximum-weight matching.

use std::collections::HashMap;

use serde::Serialize;

use crate::types::DbId;

/// Candidate score when harm category and present-on-admission both agree.
pub const SCORE_EXACT: u8 = 0;

/// Candidate score when only the harm category agrees.
pub const SCORE_HARM_ONLY: u8 = 1;

/// Candidate score when the harm category differs.
pub const SCORE_MISMATCH: u8 = 2;

/// The attributes of a finding that matching looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindingKey {
    pub finding_id: DbId,
    pub trigger_id: DbId,
    pub adverse_event_type_id: Option<DbId>,
    pub harm_category_id: Option<DbId>,
    pub present_on_admission: Option<bool>,
}

impl FindingKey {
    fn bucket(&self) -> (DbId, Option<DbId>) {
        (self.trigger_id, self.adverse_event_type_id)
    }
}

/// One outcome of matching: a pair, or a singleton from either side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MatchPair {
    pub abstractor_one_finding_id: Option<DbId>,
    pub abstractor_two_finding_id: Option<DbId>,
    /// `Some` only when both sides are present.
    pub is_match: Option<bool>,
}

impl MatchPair {
    pub fn has_both_sides(&self) -> bool {
        self.abstractor_one_finding_id.is_some() && self.abstractor_two_finding_id.is_some()
    }
}

/// Score a second-reviewer candidate against a first-reviewer finding.
pub fn score(first: &FindingKey, candidate: &FindingKey) -> u8 {
    let harm_equal = first.harm_category_id == candidate.harm_category_id;
    let poa_equal = first.present_on_admission == candidate.present_on_admission;
    match (harm_equal, poa_equal) {
        (true, true) => SCORE_EXACT,
        (true, false) => SCORE_HARM_ONLY,
        _ => SCORE_MISMATCH,
    }
}

/// Pair two reviewers' findings.
///
/// Output order: first-reviewer findings in their input order (paired or
/// singleton), then unconsumed second-reviewer findings in their input
/// order.
pub fn match_findings(first: &[FindingKey], second: &[FindingKey]) -> Vec<MatchPair> {
    let mut buckets: HashMap<(DbId, Option<DbId>), Vec<&FindingKey>> = HashMap::new();
    for candidate in second {
        buckets.entry(candidate.bucket()).or_default().push(candidate);
    }

    let mut pairs = Vec::with_capacity(first.len() + second.len());

    for finding in first {
        let chosen = buckets
            .get_mut(&finding.bucket())
            .filter(|bucket| !bucket.is_empty())
            .map(|bucket| {
                let mut best_idx = 0;
                let mut best_score = u8::MAX;
                for (idx, candidate) in bucket.iter().enumerate() {
                    let s = score(finding, candidate);
                    if s < best_score {
                        best_idx = idx;
                        best_score = s;
                        if s == SCORE_EXACT {
                            break;
                        }
                    }
                }
                (bucket.remove(best_idx), best_score)
            });

        pairs.push(match chosen {
            Some((candidate, s)) => MatchPair {
                abstractor_one_finding_id: Some(finding.finding_id),
                abstractor_two_finding_id: Some(candidate.finding_id),
                is_match: Some(s == SCORE_EXACT),
            },
            None => MatchPair {
                abstractor_one_finding_id: Some(finding.finding_id),
                abstractor_two_finding_id: None,
                is_match: None,
            },
        });
    }

    // Leftovers, in the second reviewer's original order.
    for candidate in second {
        let still_open = buckets
            .get(&candidate.bucket())
            .is_some_and(|bucket| bucket.iter().any(|c| c.finding_id == candidate.finding_id));
        if still_open {
            pairs.push(MatchPair {
                abstractor_one_finding_id: None,
                abstractor_two_finding_id: Some(candidate.finding_id),
                is_match: None,
            });
        }
    }

    pairs
}

/// Agreement summary for a consensus case.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IrrScore {
    pub matched: usize,
    pub compared: usize,
    /// `matched / compared`; `None` when nothing was compared.
    pub score: Option<f64>,
}

/// Compute the IRR score from per-record `(has both sides, is match)` flags.
pub fn irr_score<I>(records: I) -> IrrScore
where
    I: IntoIterator<Item = (bool, bool)>,
{
    let (matched, compared) = records
        .into_iter()
        .filter(|(both, _)| *both)
        .fold((0usize, 0usize), |(m, c), (_, is_match)| {
            (m + usize::from(is_match), c + 1)
        });
    let score = (compared > 0).then(|| matched as f64 / compared as f64);
    IrrScore {
        matched,
        compared,
        score,
    }
}

/// IRR score straight from match outcomes.
pub fn irr_score_of(pairs: &[MatchPair]) -> IrrScore {
    irr_score(
        pairs
            .iter()
            .map(|p| (p.has_both_sides(), p.is_match == Some(true))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f(id: DbId, trigger: DbId, ae: Option<DbId>, harm: Option<DbId>, poa: Option<bool>) -> FindingKey {
        FindingKey {
            finding_id: id,
            trigger_id: trigger,
            adverse_event_type_id: ae,
            harm_category_id: harm,
            present_on_admission: poa,
        }
    }

    #[test]
    fn identical_lists_score_one() {
        let a = vec![
            f(1, 10, Some(100), Some(5), Some(true)),
            f(2, 11, Some(101), Some(6), Some(false)),
            f(3, 12, Some(102), None, None),
        ];
        let b = vec![
            f(21, 10, Some(100), Some(5), Some(true)),
            f(22, 11, Some(101), Some(6), Some(false)),
            f(23, 12, Some(102), None, None),
        ];
        let pairs = match_findings(&a, &b);
        assert_eq!(pairs.len(), 3);
        assert!(pairs.iter().all(|p| p.is_match == Some(true)));
        let irr = irr_score_of(&pairs);
        assert_eq!(irr.matched, 3);
        assert_eq!(irr.compared, 3);
        assert_eq!(irr.score, Some(1.0));
    }

    #[test]
    fn harm_difference_is_a_non_match() {
        let a = vec![f(1, 10, Some(100), Some(1), Some(true))];
        let b = vec![f(2, 10, Some(100), Some(2), Some(true))];
        let pairs = match_findings(&a, &b);
        assert_eq!(
            pairs,
            vec![MatchPair {
                abstractor_one_finding_id: Some(1),
                abstractor_two_finding_id: Some(2),
                is_match: Some(false),
            }]
        );
        assert_eq!(irr_score_of(&pairs).score, Some(0.0));
    }

    #[test]
    fn leftovers_become_singletons_on_both_sides() {
        let a = vec![
            f(1, 10, Some(100), Some(1), Some(true)),
            f(2, 10, Some(100), Some(1), Some(true)),
        ];
        let b = vec![
            f(21, 10, Some(100), Some(1), Some(true)),
            f(22, 20, Some(200), Some(1), Some(true)),
        ];
        let pairs = match_findings(&a, &b);
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[0].abstractor_two_finding_id, Some(21));
        assert_eq!(pairs[0].is_match, Some(true));
        assert_eq!(
            pairs[1],
            MatchPair {
                abstractor_one_finding_id: Some(2),
                abstractor_two_finding_id: None,
                is_match: None,
            }
        );
        assert_eq!(
            pairs[2],
            MatchPair {
                abstractor_one_finding_id: None,
                abstractor_two_finding_id: Some(22),
                is_match: None,
            }
        );
        assert_eq!(irr_score_of(&pairs).score, Some(1.0));
    }

    #[test]
    fn both_null_attributes_count_as_equal() {
        let a = vec![f(1, 10, None, None, None)];
        let b = vec![f(2, 10, None, None, None)];
        assert_eq!(match_findings(&a, &b)[0].is_match, Some(true));
    }

    #[test]
    fn event_type_is_part_of_the_key() {
        let a = vec![f(1, 10, Some(100), None, None)];
        let b = vec![f(2, 10, None, None, None)];
        let pairs = match_findings(&a, &b);
        assert_eq!(pairs.len(), 2);
        assert!(pairs.iter().all(|p| !p.has_both_sides()));
        assert_eq!(irr_score_of(&pairs).score, None);
    }

    #[test]
    fn best_candidate_wins_over_earlier_worse_one() {
        let a = vec![f(1, 10, Some(100), Some(1), Some(true))];
        let b = vec![
            f(21, 10, Some(100), Some(9), Some(false)),
            f(22, 10, Some(100), Some(1), Some(false)),
            f(23, 10, Some(100), Some(1), Some(true)),
        ];
        let pairs = match_findings(&a, &b);
        assert_eq!(pairs[0].abstractor_two_finding_id, Some(23));
        assert_eq!(pairs[0].is_match, Some(true));
        // 21 and 22 are left over, in input order.
        assert_eq!(pairs[1].abstractor_two_finding_id, Some(21));
        assert_eq!(pairs[2].abstractor_two_finding_id, Some(22));
    }

    #[test]
    fn ties_take_the_earliest_candidate() {
        let a = vec![f(1, 10, Some(100), Some(1), Some(true))];
        let b = vec![
            f(21, 10, Some(100), Some(1), Some(false)),
            f(22, 10, Some(100), Some(1), None),
        ];
        let pairs = match_findings(&a, &b);
        assert_eq!(pairs[0].abstractor_two_finding_id, Some(21));
        assert_eq!(pairs[0].is_match, Some(false));
    }

    #[test]
    fn greedy_order_dependence_is_preserved() {
        // A1 would be a partial match for B1 and an exact match for nothing;
        // A2 is exact for B1. A1 goes first and consumes B1.
        let a = vec![
            f(1, 10, Some(100), Some(1), Some(false)),
            f(2, 10, Some(100), Some(1), Some(true)),
        ];
        let b = vec![f(21, 10, Some(100), Some(1), Some(true))];
        let pairs = match_findings(&a, &b);
        assert_eq!(pairs[0].abstractor_two_finding_id, Some(21));
        assert_eq!(pairs[0].is_match, Some(false));
        assert_eq!(pairs[1].abstractor_two_finding_id, None);
    }

    #[test]
    fn empty_inputs() {
        assert!(match_findings(&[], &[]).is_empty());
        let b = vec![f(21, 10, None, None, None)];
        let pairs = match_findings(&[], &b);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].abstractor_one_finding_id, None);
    }

    #[test]
    fn score_levels() {
        let base = f(1, 10, None, Some(1), Some(true));
        assert_eq!(score(&base, &f(2, 10, None, Some(1), Some(true))), SCORE_EXACT);
        assert_eq!(score(&base, &f(2, 10, None, Some(1), None)), SCORE_HARM_ONLY);
        assert_eq!(score(&base, &f(2, 10, None, Some(2), Some(true))), SCORE_MISMATCH);
    }
}
