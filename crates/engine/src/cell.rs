use crate::EngineError;
use dlb_core::Id;
use dlb_core::TierNo;
use dlb_core::Xp;
use dlb_model::Cell;
use dlb_model::CellStatus;
use dlb_model::Idea;
use dlb_model::IdeaStatus;
use dlb_store::Store;
use dlb_store::StoreError;
use dlb_store::Transaction;
use std::time::SystemTime;

/// Outcome of a completed cell (spec §4.5's `{winnerIds, loserIds}`).
#[derive(Debug, Clone)]
pub struct CellOutcome {
    pub cell: Id<Cell>,
    pub tier: TierNo,
    pub winners: Vec<Id<Idea>>,
    pub losers: Vec<Id<Idea>>,
}

/// Closes a cell and tallies its votes. Returns `None` if another
/// worker already completed it (spec §4.5 step 1's idempotent flip).
///
/// Steps 1-5 of spec §4.5 run inside one `transact` block: the
/// completion flip, the idea/vote reads, the idea-status writes, and
/// prediction resolution are all one transaction, so a cell can never
/// be observed COMPLETED with its votes not yet visible (spec §5's
/// causal-ordering guarantee).
pub async fn process_cell_results(
    store: &Store,
    cell: Id<Cell>,
    now: SystemTime,
) -> Result<Option<CellOutcome>, EngineError> {
    store
        .transact(move |txn| Box::pin(async move {
            let flipped = txn
                .execute(
                    "UPDATE cells SET status = $1, completed_at = $2 \
                     WHERE id = $3 AND status = $4",
                    &[
                        &CellStatus::Completed.to_string(),
                        &now,
                        &cell.inner(),
                        &CellStatus::Voting.to_string(),
                    ],
                )
                .await?;
            if flipped == 0 {
                return Ok(None);
            }

            let tier_row = txn
                .query_opt("SELECT tier FROM cells WHERE id = $1", &[&cell.inner()])
                .await?
                .ok_or_else(|| StoreError::NotFound(format!("cell {cell}")))?;
            let tier = tier_row.get::<_, i32>(0) as TierNo;

            let idea_rows = txn
                .query(
                    "SELECT idea_id FROM cell_ideas WHERE cell_id = $1",
                    &[&cell.inner()],
                )
                .await?;
            let idea_ids: Vec<Id<Idea>> = idea_rows
                .iter()
                .map(|row| Id::from(row.get::<_, uuid::Uuid>(0)))
                .collect();

            let vote_rows = txn
                .query(
                    "SELECT idea_id, member_id, xp_points FROM votes WHERE cell_id = $1",
                    &[&cell.inner()],
                )
                .await?;
            let votes: Vec<(Id<Idea>, Xp)> = vote_rows
                .iter()
                .map(|row| {
                    (
                        Id::from(row.get::<_, uuid::Uuid>(0)),
                        row.get::<_, i32>(2) as Xp,
                    )
                })
                .collect();
            let mut distinct_voters: std::collections::HashMap<Id<Idea>, std::collections::HashSet<uuid::Uuid>> =
                std::collections::HashMap::new();
            for row in &vote_rows {
                let idea: Id<Idea> = Id::from(row.get::<_, uuid::Uuid>(0));
                let voter: uuid::Uuid = row.get(1);
                distinct_voters.entry(idea).or_default().insert(voter);
            }

            let result = dlb_tally::tally_cell(&idea_ids, &votes);

            // Accrue this cell's XP and distinct-voter counts onto each
            // idea's running totals (spec §2's Cell Processor: "updates
            // idea aggregates").
            for idea in &idea_ids {
                let xp = result.totals.get(idea).copied().unwrap_or(0);
                let voters = distinct_voters.get(idea).map(|s| s.len()).unwrap_or(0) as i32;
                if xp > 0 || voters > 0 {
                    txn.execute(
                        "UPDATE ideas SET total_xp = total_xp + $1, total_votes = total_votes + $2 \
                         WHERE id = $3",
                        &[&(xp as i32), &voters, &idea.inner()],
                    )
                    .await?;
                }
            }

            for winner in &result.winners {
                txn.execute(
                    "UPDATE ideas SET status = $1, tier = $2 WHERE id = $3",
                    &[&IdeaStatus::Advancing.to_string(), &(tier as i32), &winner.inner()],
                )
                .await?;
            }
            for loser in &result.losers {
                if tier == 1 {
                    txn.execute(
                        "UPDATE ideas SET status = $1, losses = losses + 1 WHERE id = $2",
                        &[&IdeaStatus::Eliminated.to_string(), &loser.inner()],
                    )
                    .await?;
                } else {
                    txn.execute(
                        "UPDATE ideas SET status = $1 WHERE id = $2",
                        &[&IdeaStatus::Eliminated.to_string(), &loser.inner()],
                    )
                    .await?;
                }
            }

            resolve_predictions(txn, cell, tier, &result.winners).await?;

            Ok(Some(CellOutcome {
                cell,
                tier,
                winners: result.winners,
                losers: result.losers,
            }))
        }))
        .await
        .map_err(EngineError::from)
}

/// Resolves predictions targeting ideas in this cell at the cell's
/// tier (spec §4.5 step 5). Runs inside the same transaction as the
/// rest of cell completion.
async fn resolve_predictions(
    txn: &Transaction<'_>,
    cell: Id<Cell>,
    tier: TierNo,
    winners: &[Id<Idea>],
) -> Result<(), StoreError> {
    let rows = txn
        .query(
            "SELECT p.member_id, p.predicted_idea_id FROM predictions p
             JOIN cell_ideas ci ON ci.idea_id = p.predicted_idea_id
             WHERE ci.cell_id = $1 AND p.tier_predicted_at = $2 AND p.won_immediate IS NULL",
            &[&cell.inner(), &(tier as i32)],
        )
        .await?;
    for row in rows {
        let member: uuid::Uuid = row.get(0);
        let predicted: uuid::Uuid = row.get(1);
        let won = winners.iter().any(|w| w.inner() == predicted);
        txn.execute(
            "UPDATE predictions SET won_immediate = $1 \
             WHERE member_id = $2 AND predicted_idea_id = $3 AND tier_predicted_at = $4",
            &[&won, &member, &predicted, &(tier as i32)],
        )
        .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_outcome_carries_tier_and_split() {
        let outcome = CellOutcome {
            cell: Id::default(),
            tier: 1,
            winners: vec![Id::default()],
            losers: vec![Id::default(), Id::default()],
        };
        assert_eq!(outcome.tier, 1);
        assert_eq!(outcome.winners.len(), 1);
        assert_eq!(outcome.losers.len(), 2);
    }
}
