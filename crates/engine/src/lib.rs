//! Cell Processor, Tier Controller, Up-Pollination Engine and Phase
//! State Machine: the deliberation orchestration core (spec §2.5–2.8,
//! §4.5–4.8).
//!
//! Every suspending function here takes `&Store` (never `&mut`) and
//! mutates through a single conditional update or a `transact` block —
//! there is no in-process lock anywhere in this crate, per spec §9's
//! "database-as-mutex" note. Concurrent callers racing the same
//! transition simply see the loser's conditional update affect zero
//! rows and return `Ok(None)` / `Ok(false)`.
//!
//! ## Submodules
//!
//! - [`cell`] — `process_cell_results`: the idempotent cell-completion flip and tally
//! - [`tier`] — `check_tier_completion` / `try_advance_continuous_flow_tier`
//! - [`phase`] — `start_voting` / `start_challenge_round`
//! - [`pollination`] — `upvote_comment` and cross-cell comment spread
//! - [`error`] — [`EngineError`], the engine's one error type
mod cell;
mod error;
mod phase;
mod pollination;
mod tier;

pub use cell::process_cell_results;
pub use cell::CellOutcome;
pub use error::EngineError;
pub use phase::force_close;
pub use phase::start_challenge_round;
pub use phase::start_voting;
pub use phase::submission_triggers_met;
pub use pollination::upvote_comment;
pub use tier::check_tier_completion;
pub use tier::try_advance_continuous_flow_tier;
pub use tier::TierOutcome;

use dlb_assign::Assigner;
use dlb_core::Id;
use dlb_model::AllocationMode;
use dlb_model::Cell;
use dlb_model::Deliberation;
use dlb_store::Store;
use std::time::SystemTime;

/// Outcome of a single cell completing, including whatever the Tier
/// Controller decided to do about it (spec §4.5 step 6: "Call the Tier
/// Controller ... to consider advancement").
#[derive(Debug, Clone)]
pub struct CompletionOutcome {
    pub cell: CellOutcome,
    pub tier: TierOutcome,
}

/// Closes and tallies a cell, then hands the result to the Tier
/// Controller in the mode appropriate to `deliberation.allocation_mode()`.
/// This is the single entry point callers (the `castVote` handler that
/// just received the last vote, or the Scheduler processing a timed-out
/// cell) should use instead of calling [`process_cell_results`] and the
/// tier functions separately — spec §4.5 describes them as one
/// sequential operation.
pub async fn complete_cell(
    store: &Store,
    assigner: &Assigner,
    deliberation: &Deliberation,
    cell: Id<Cell>,
    now: SystemTime,
) -> Result<Option<CompletionOutcome>, EngineError> {
    let Some(outcome) = process_cell_results(store, cell, now).await? else {
        return Ok(None);
    };

    let tier_outcome = match deliberation.allocation_mode() {
        AllocationMode::Batch => {
            check_tier_completion(store, assigner, deliberation, outcome.tier).await?
        }
        AllocationMode::Fcfs => {
            try_advance_continuous_flow_tier(store, assigner, deliberation, outcome.tier).await?
        }
    };

    Ok(Some(CompletionOutcome {
        cell: outcome,
        tier: tier_outcome,
    }))
}

#[cfg(test)]
mod two_tier_tests {
    /// Scenario S2: 10 ideas split across two tier-1 cells of 5, each
    /// cell's winner advances, and the two tier-1 winners face off in
    /// one tier-2 cell to produce the champion. Exercises the Voting
    /// Tally and Cell Assigner together across a tier boundary, without
    /// a database.
    #[test]
    fn s2_two_tiers_narrow_ten_ideas_to_one_champion() {
        let ideas: Vec<&str> = vec!["I1", "I2", "I3", "I4", "I5", "I6", "I7", "I8", "I9", "I10"];
        let cell_a = &ideas[0..5];
        let cell_b = &ideas[5..10];

        let votes_a = [("I1", 20), ("I2", 5), ("I3", 3), ("I4", 1), ("I5", 1)];
        let result_a = dlb_tally::tally_cell(cell_a, &votes_a);
        assert_eq!(result_a.winners, vec!["I1"]);

        let votes_b = [("I6", 2), ("I7", 18), ("I8", 4), ("I9", 3), ("I10", 3)];
        let result_b = dlb_tally::tally_cell(cell_b, &votes_b);
        assert_eq!(result_b.winners, vec!["I7"]);

        let tier2_ideas: Vec<&str> = result_a.winners.into_iter().chain(result_b.winners).collect();
        assert_eq!(tier2_ideas, vec!["I1", "I7"]);

        let tier2_groups = dlb_assign::partition_evenly(&tier2_ideas, 1);
        assert_eq!(tier2_groups, vec![vec!["I1", "I7"]]);

        let votes_final = [("I1", 4), ("I7", 11)];
        let champion = dlb_tally::tally_cell(&tier2_groups[0], &votes_final);
        assert_eq!(champion.winners, vec!["I7"]);
    }
}
