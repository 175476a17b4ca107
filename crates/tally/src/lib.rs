//! XP allocation normalization and per-cell tallying.
//!
//! Everything here is pure and non-suspending: no store, no clock, no
//! randomness. `dlb-engine` is the only caller, but the functions are
//! generic over the idea-key type so this crate carries no dependency
//! on the engine's entity types.
use dlb_core::Xp;
use std::collections::HashMap;
use std::hash::Hash;

mod normalize;
pub use normalize::normalize_allocations;

/// Outcome of tallying one completed cell.
#[derive(Debug, Clone)]
pub struct CellResult<K> {
    /// Ideas with the maximum XP total (all tied winners advance together).
    pub winners: Vec<K>,
    /// Every other idea in the cell.
    pub losers: Vec<K>,
    /// XP total per idea, including zero-vote ideas.
    pub totals: HashMap<K, Xp>,
}

/// Tallies one cell's votes per spec §4.4.
///
/// `idea_ids` is the complete set of ideas competing in the cell;
/// `votes` is every `(idea, xp)` row cast by any participant. An idea
/// absent from `votes` is assumed to have received zero XP.
///
/// If `votes` is empty (cell closed on timeout with no votes at all),
/// every idea in the cell is treated as advancing and nothing is
/// eliminated, per spec §4.4's no-vote rule.
pub fn tally_cell<K>(idea_ids: &[K], votes: &[(K, Xp)]) -> CellResult<K>
where
    K: Eq + Hash + Clone,
{
    let mut totals: HashMap<K, Xp> = idea_ids.iter().cloned().map(|k| (k, 0)).collect();
    if votes.is_empty() {
        return CellResult {
            winners: idea_ids.to_vec(),
            losers: Vec::new(),
            totals,
        };
    }
    for (idea, xp) in votes {
        *totals.entry(idea.clone()).or_insert(0) += xp;
    }
    let max = totals.values().copied().max().unwrap_or(0);
    let (winners, losers): (Vec<K>, Vec<K>) = idea_ids
        .iter()
        .cloned()
        .partition(|k| totals.get(k).copied().unwrap_or(0) == max);
    CellResult {
        winners,
        losers,
        totals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s1_single_cell_majority_winner() {
        // spec.md S1: 5 members, 5 ideas, cellSize=5.
        let ideas = ["I1", "I2", "I3", "I4", "I5"];
        let votes = [
            ("I1", 10), // V1
            ("I2", 10), // V2
            ("I1", 6),  // V3
            ("I2", 4),  // V3
            ("I1", 5),  // V4
            ("I3", 5),  // V4
            ("I1", 10), // V5
        ];
        let result = tally_cell(&ideas, &votes);
        assert_eq!(result.totals[&"I1"], 31);
        assert_eq!(result.totals[&"I2"], 14);
        assert_eq!(result.totals[&"I3"], 5);
        assert_eq!(result.totals[&"I4"], 0);
        assert_eq!(result.totals[&"I5"], 0);
        assert_eq!(result.winners, vec!["I1"]);
        let mut losers = result.losers.clone();
        losers.sort();
        assert_eq!(losers, vec!["I2", "I3", "I4", "I5"]);
    }

    #[test]
    fn s4_tie_both_advance() {
        let ideas = ["I1", "I2", "I3"];
        let votes = [("I1", 5), ("I2", 5), ("I3", 0)];
        let result = tally_cell(&ideas, &votes);
        let mut winners = result.winners.clone();
        winners.sort();
        assert_eq!(winners, vec!["I1", "I2"]);
        assert_eq!(result.losers, vec!["I3"]);
    }

    #[test]
    fn s5_timeout_with_no_votes_advances_everyone() {
        let ideas = ["I1", "I2", "I3", "I4", "I5"];
        let votes: [(&str, Xp); 0] = [];
        let result = tally_cell(&ideas, &votes);
        assert_eq!(result.winners.len(), 5);
        assert!(result.losers.is_empty());
    }

    /// `tally_cell` is a pure function of its inputs: re-tallying the
    /// same cell (as would happen if a Scheduler retry raced the
    /// completion flip and read the same rows twice) must not change
    /// the outcome.
    #[test]
    fn tally_cell_is_idempotent_over_the_same_inputs() {
        let ideas = ["I1", "I2", "I3"];
        let votes = [("I1", 5), ("I2", 5), ("I3", 0)];
        let first = tally_cell(&ideas, &votes);
        let second = tally_cell(&ideas, &votes);
        assert_eq!(first.totals, second.totals);
        assert_eq!(first.winners, second.winners);
        assert_eq!(first.losers, second.losers);
    }
}
