//! Ranking comparator
//!
//! Rankings arrive already ordered. Comparison is positional and performs no
//! tie resolution of its own. The one place rankings are produced locally
//! (`rank_descending`) breaks ties by group name, ascending.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::Serialize;

/// True when the two orderings differ at any position or in length
pub fn rankings_differ(original: &[String], dp: &[String]) -> bool {
    original.len() != dp.len() || original.iter().zip(dp).any(|(a, b)| a != b)
}

/// Position of one group in both rankings (0 = highest value)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankShift {
    pub name: String,
    pub original_position: usize,
    pub dp_position: usize,
}

impl RankShift {
    pub fn moved(&self) -> bool {
        self.original_position != self.dp_position
    }
}

/// Per-group positions, in original-ranking order; groups missing from the DP ranking are skipped
pub fn rank_shifts(original: &[String], dp: &[String]) -> Vec<RankShift> {
    let dp_positions: HashMap<&str, usize> = dp
        .iter()
        .enumerate()
        .map(|(position, name)| (name.as_str(), position))
        .collect();

    original
        .iter()
        .enumerate()
        .filter_map(|(original_position, name)| {
            dp_positions.get(name.as_str()).map(|&dp_position| RankShift {
                name: name.clone(),
                original_position,
                dp_position,
            })
        })
        .collect()
}

/// Whether `ranking` names exactly the groups in `names`, each once
pub fn is_permutation_of<'a>(ranking: &[String], names: impl IntoIterator<Item = &'a str>) -> bool {
    let expected: Vec<&str> = names.into_iter().collect();
    let expected_set: HashSet<&str> = expected.iter().copied().collect();
    let ranking_set: HashSet<&str> = ranking.iter().map(String::as_str).collect();

    ranking.len() == expected.len() && ranking_set.len() == ranking.len() && ranking_set == expected_set
}

/// Names ordered by descending value, ties broken by name ascending
pub fn rank_descending<'a>(values: impl IntoIterator<Item = (&'a str, f64)>) -> Vec<String> {
    let mut entries: Vec<(&str, f64)> = values.into_iter().collect();
    entries.sort_by(|(name_a, a), (name_b, b)| {
        b.partial_cmp(a)
            .unwrap_or(Ordering::Equal)
            .then_with(|| name_a.cmp(name_b))
    });
    entries.into_iter().map(|(name, _)| name.to_string()).collect()
}
