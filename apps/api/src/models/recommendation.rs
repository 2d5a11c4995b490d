//! Scoring output types.

use std::collections::BTreeSet;

use serde::Serialize;
use uuid::Uuid;

/// The result of scoring one profile against one catalog entity. Built once,
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub entity_id: Uuid,
    /// Weighted similarity in [0, 1].
    pub score: f64,
    /// Required skills the profile covers.
    pub matching_skills: BTreeSet<String>,
    /// Required skills the profile lacks.
    pub skill_gaps: BTreeSet<String>,
    /// One human-readable reason per contributing factor, strongest first.
    pub explanation: Vec<String>,
    /// Course scoring only: which of the caller-supplied aggregate gaps this
    /// entity's curriculum would close.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill_gaps_addressed: Option<BTreeSet<String>>,
}

/// Orders results by score descending, breaking ties by ascending entity id
/// so equal scores always rank the same way.
pub fn rank(results: &mut Vec<MatchResult>) {
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.entity_id.cmp(&b.entity_id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: u128, score: f64) -> MatchResult {
        MatchResult {
            entity_id: Uuid::from_u128(id),
            score,
            matching_skills: BTreeSet::new(),
            skill_gaps: BTreeSet::new(),
            explanation: vec![],
            skill_gaps_addressed: None,
        }
    }

    #[test]
    fn test_rank_orders_by_score_descending() {
        let mut results = vec![result(1, 0.2), result(2, 0.9), result(3, 0.5)];
        rank(&mut results);
        let ids: Vec<u128> = results.iter().map(|r| r.entity_id.as_u128()).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn test_rank_breaks_ties_by_ascending_id() {
        let mut results = vec![result(9, 0.5), result(3, 0.5), result(7, 0.5)];
        rank(&mut results);
        let ids: Vec<u128> = results.iter().map(|r| r.entity_id.as_u128()).collect();
        assert_eq!(ids, vec![3, 7, 9]);
    }
}
