use crate::EngineError;
use dlb_assign::Assigner;
use dlb_assign::ConflictEvent;
use dlb_core::Id;
use dlb_core::TierNo;
use dlb_model::Deliberation;
use dlb_model::Idea;
use dlb_model::IdeaStatus;
use dlb_model::Member;
use dlb_model::Phase;
use dlb_store::Store;
use std::collections::HashMap;
use std::time::Duration;
use std::time::SystemTime;

/// What happened when a tier was checked for completion (spec §4.6).
#[derive(Debug, Clone)]
pub enum TierOutcome {
    /// A single idea remained; it was crowned.
    Champion(Id<Idea>),
    /// Advancing ideas formed one or more cells at the next tier.
    Advanced {
        tier: TierNo,
        cells: Vec<Id<dlb_model::Cell>>,
        conflicts: Vec<ConflictEvent>,
    },
    /// Voting cells at this tier are still open; nothing to do yet.
    StillVoting,
}

/// Batch-mode tier completion check (spec §4.6 step 1-2).
pub async fn check_tier_completion(
    store: &Store,
    assigner: &Assigner,
    deliberation: &Deliberation,
    tier: TierNo,
) -> Result<TierOutcome, EngineError> {
    let open_count = count_voting_cells(store, deliberation.id(), tier).await?;
    if open_count > 0 {
        return Ok(TierOutcome::StillVoting);
    }

    let advancing = advancing_ideas(store, deliberation.id(), tier).await?;
    if advancing.len() == 1 {
        crown(store, deliberation, advancing[0]).await?;
        return Ok(TierOutcome::Champion(advancing[0]));
    }
    if advancing.is_empty() {
        return Ok(TierOutcome::StillVoting);
    }

    let next_tier = tier + 1;

    // Gate assignment behind the conditional tier bump (spec §9): two
    // workers racing to close the last two tier-`T` cells must not both
    // form tier-`T+1` cells. Only the one that wins `current_tier`'s
    // conditional update proceeds; the loser treats the tier as already
    // advanced by its sibling and reports nothing further to do.
    let won = advance_tier(store, deliberation.id(), tier, next_tier).await?;
    if !won {
        return Ok(TierOutcome::StillVoting);
    }

    let members = current_members(store, deliberation.id()).await?;
    let authors = idea_authors(store, &advancing).await?;
    let deadline = SystemTime::now() + Duration::from_millis(deliberation.voting_timeout_ms());

    let (cells, conflicts) = assigner
        .batch_assign_next_tier(deliberation, next_tier, advancing, members, &authors, deadline)
        .await?;

    Ok(TierOutcome::Advanced {
        tier: next_tier,
        cells,
        conflicts,
    })
}

/// What [`continuous_flow_decision`] says to do next for a
/// continuous-flow tier (spec §4.6 step 3, scenario S3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContinuousFlowAction<T> {
    /// Enough ADVANCING ideas have accumulated: open a cell for `ideas`.
    FormCell(Vec<T>),
    /// The lower tier has no cells left open and one idea survives.
    Crown(T),
    /// Nothing to do yet.
    StillVoting,
}

/// Pure decision behind continuous-flow tier advancement: given how
/// many ideas are ADVANCING at this tier, how many tier-`T` cells are
/// still VOTING, and the configured cell size, decides whether to form
/// a full cell, crown a lone survivor, form an undersized final cell,
/// or wait. Kept separate from the database calls so scenario S3 is
/// unit-testable without a connection.
pub fn continuous_flow_decision<T: Copy>(
    advancing: &[T],
    open_count: i64,
    cell_size: usize,
) -> ContinuousFlowAction<T> {
    if advancing.len() >= cell_size {
        return ContinuousFlowAction::FormCell(advancing[..cell_size].to_vec());
    }
    if open_count == 0 {
        if advancing.len() == 1 {
            return ContinuousFlowAction::Crown(advancing[0]);
        }
        if advancing.len() >= 2 {
            return ContinuousFlowAction::FormCell(advancing.to_vec());
        }
    }
    ContinuousFlowAction::StillVoting
}

/// Continuous-flow tier advancement (spec §4.6 step 3): called after
/// every cell completion. Opens a tier `T+1` cell once enough
/// ADVANCING ideas have accumulated at tier `T`, or crowns the sole
/// survivor once the lower tier has no cells left open.
pub async fn try_advance_continuous_flow_tier(
    store: &Store,
    assigner: &Assigner,
    deliberation: &Deliberation,
    tier: TierNo,
) -> Result<TierOutcome, EngineError> {
    let advancing = advancing_ideas(store, deliberation.id(), tier).await?;
    let open_count = count_voting_cells(store, deliberation.id(), tier).await?;
    let cell_size = deliberation.cell_size();

    match continuous_flow_decision(&advancing, open_count, cell_size) {
        ContinuousFlowAction::FormCell(ideas) => {
            let next_tier = tier + 1;
            let deadline = SystemTime::now() + Duration::from_millis(deliberation.voting_timeout_ms());
            let cell = assigner
                .open_cell_for_ideas(deliberation, next_tier, ideas, deadline)
                .await?;
            Ok(TierOutcome::Advanced {
                tier: next_tier,
                cells: vec![cell],
                conflicts: Vec::new(),
            })
        }
        ContinuousFlowAction::Crown(idea) => {
            crown(store, deliberation, idea).await?;
            Ok(TierOutcome::Champion(idea))
        }
        ContinuousFlowAction::StillVoting => Ok(TierOutcome::StillVoting),
    }
}

/// The pure decision behind [`crown`]: who (if anyone) gets deposed,
/// what status the new champion takes, and which phase the
/// deliberation moves to. Kept separate from the database calls so the
/// rolling-mode rematch logic (spec §4.8 challenge round, scenario S6)
/// is unit-testable without a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrownPlan {
    pub depose: Option<Id<Idea>>,
    pub champion_status: IdeaStatus,
    pub next_phase: Phase,
}

/// Computes the crowning outcome for `winner`, given the deliberation's
/// current champion (if any) and whether rolling/accumulation mode is
/// enabled.
///
/// Handles both the deliberation's first crowning (`previous_champion`
/// is `None`) and a rolling-mode rematch: if a *different* idea already
/// held the title, it is deposed — "if challenger wins ... the previous
/// champion becomes DEFENDING→ELIMINATED" — while a champion that
/// successfully defends against `winner == previous_champion` is not
/// deposed at all. While rolling mode keeps a deliberation ACCUMULATING
/// rather than COMPLETED, the champion's own status is DEFENDING, not
/// WINNER, since it is still open to challenge.
pub fn crown_plan(
    previous_champion: Option<Id<Idea>>,
    winner: Id<Idea>,
    accumulation_enabled: bool,
) -> CrownPlan {
    let next_phase = if accumulation_enabled {
        Phase::Accumulating
    } else {
        Phase::Completed
    };
    let champion_status = if next_phase == Phase::Accumulating {
        IdeaStatus::Defending
    } else {
        IdeaStatus::Winner
    };
    let depose = previous_champion.filter(|previous| *previous != winner);
    CrownPlan {
        depose,
        champion_status,
        next_phase,
    }
}

/// Crowns `idea` as champion, per spec §4.6 "Final-showdown" and §4.8's
/// `VOTING → {COMPLETED, ACCUMULATING}` transitions. Computes the plan
/// with [`crown_plan`] and then issues the conditional updates it
/// names.
async fn crown(
    store: &Store,
    deliberation: &Deliberation,
    idea: Id<Idea>,
) -> Result<(), EngineError> {
    let plan = crown_plan(
        deliberation.champion_id(),
        idea,
        deliberation.accumulation_enabled(),
    );

    if let Some(previous) = plan.depose {
        store
            .conditional_update(
                "UPDATE ideas SET status = $1, is_champion = FALSE \
                 WHERE id = $2 AND is_champion = TRUE",
                &[&IdeaStatus::Eliminated.to_string(), &previous.inner()],
            )
            .await?;
    }

    store
        .conditional_update(
            "UPDATE ideas SET status = $1, is_champion = TRUE WHERE id = $2",
            &[&plan.champion_status.to_string(), &idea.inner()],
        )
        .await?;

    let now = SystemTime::now();
    store
        .conditional_update(
            "UPDATE deliberations SET phase = $1, champion_id = $2, completed_at = $3, \
             accumulation_started_at = $6 WHERE id = $4 AND phase = $5",
            &[
                &plan.next_phase.to_string(),
                &idea.inner(),
                &(if plan.next_phase == Phase::Completed {
                    Some(now)
                } else {
                    None
                }),
                &deliberation.id().inner(),
                &Phase::Voting.to_string(),
                &(if plan.next_phase == Phase::Accumulating {
                    Some(now)
                } else {
                    None
                }),
            ],
        )
        .await?;
    Ok(())
}

async fn advance_tier(
    store: &Store,
    deliberation: Id<Deliberation>,
    from: TierNo,
    to: TierNo,
) -> Result<bool, EngineError> {
    Ok(store
        .conditional_update(
            "UPDATE deliberations SET current_tier = $1 WHERE id = $2 AND current_tier = $3",
            &[&(to as i32), &deliberation.inner(), &(from as i32)],
        )
        .await?)
}

async fn count_voting_cells(
    store: &Store,
    deliberation: Id<Deliberation>,
    tier: TierNo,
) -> Result<i64, EngineError> {
    let row = store
        .query_opt(
            "SELECT count(*) FROM cells WHERE deliberation_id = $1 AND tier = $2 AND status = $3",
            &[
                &deliberation.inner(),
                &(tier as i32),
                &dlb_model::CellStatus::Voting.to_string(),
            ],
        )
        .await?;
    Ok(row.map(|r| r.get::<_, i64>(0)).unwrap_or(0))
}

async fn advancing_ideas(
    store: &Store,
    deliberation: Id<Deliberation>,
    tier: TierNo,
) -> Result<Vec<Id<Idea>>, EngineError> {
    let rows = store
        .query(
            "SELECT id FROM ideas WHERE deliberation_id = $1 AND tier = $2 AND status = $3",
            &[
                &deliberation.inner(),
                &(tier as i32),
                &IdeaStatus::Advancing.to_string(),
            ],
        )
        .await?;
    Ok(rows
        .iter()
        .map(|row| Id::from(row.get::<_, uuid::Uuid>(0)))
        .collect())
}

async fn current_members(
    store: &Store,
    deliberation: Id<Deliberation>,
) -> Result<Vec<Id<Member>>, EngineError> {
    let rows = store
        .query(
            "SELECT member_id FROM memberships WHERE deliberation_id = $1",
            &[&deliberation.inner()],
        )
        .await?;
    Ok(rows
        .iter()
        .map(|row| Id::from(row.get::<_, uuid::Uuid>(0)))
        .collect())
}

async fn idea_authors(
    store: &Store,
    ideas: &[Id<Idea>],
) -> Result<HashMap<Id<Idea>, Id<Member>>, EngineError> {
    let mut map = HashMap::with_capacity(ideas.len());
    for idea in ideas {
        if let Some(row) = store
            .query_opt("SELECT author_id FROM ideas WHERE id = $1", &[&idea.inner()])
            .await?
        {
            map.insert(*idea, Id::from(row.get::<_, uuid::Uuid>(0)));
        }
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crown_plan_first_crowning_has_nothing_to_depose() {
        let winner = Id::<Idea>::default();
        let plan = crown_plan(None, winner, false);
        assert_eq!(plan.depose, None);
        assert_eq!(plan.champion_status, IdeaStatus::Winner);
        assert_eq!(plan.next_phase, Phase::Completed);
    }

    /// Scenario S6: a challenger beats the sitting champion in a
    /// rolling-mode rematch. The previous champion is deposed and the
    /// deliberation stays ACCUMULATING, open to the next challenge.
    #[test]
    fn crown_plan_rolling_rematch_deposes_previous_champion() {
        let previous = Id::<Idea>::default();
        let winner = Id::<Idea>::default();
        let plan = crown_plan(Some(previous), winner, true);
        assert_eq!(plan.depose, Some(previous));
        assert_eq!(plan.champion_status, IdeaStatus::Defending);
        assert_eq!(plan.next_phase, Phase::Accumulating);
    }

    /// Scenario S6: the sitting champion successfully defends. It must
    /// not depose itself.
    #[test]
    fn crown_plan_successful_defense_does_not_depose_itself() {
        let champion = Id::<Idea>::default();
        let plan = crown_plan(Some(champion), champion, true);
        assert_eq!(plan.depose, None);
        assert_eq!(plan.champion_status, IdeaStatus::Defending);
        assert_eq!(plan.next_phase, Phase::Accumulating);
    }

    /// Calling `crown_plan` again with the outcome of the first call
    /// (the now-reigning champion as both `previous` and `winner`)
    /// must keep producing a no-depose plan — the crowning decision is
    /// idempotent under repeated application.
    #[test]
    fn crown_plan_is_idempotent_once_champion_is_settled() {
        let champion = Id::<Idea>::default();
        let first = crown_plan(None, champion, false);
        assert_eq!(first.depose, None);
        let second = crown_plan(Some(champion), champion, false);
        assert_eq!(second, first);
    }

    /// Scenario S3: enough ADVANCING ideas have accumulated to fill a
    /// full cell, even while other tier cells are still VOTING.
    #[test]
    fn continuous_flow_forms_cell_once_threshold_reached() {
        let advancing = vec![1, 2, 3, 4, 5, 6];
        let action = continuous_flow_decision(&advancing, 3, 5);
        assert_eq!(action, ContinuousFlowAction::FormCell(vec![1, 2, 3, 4, 5]));
    }

    /// Scenario S3: below threshold and other cells are still open —
    /// nothing to do yet.
    #[test]
    fn continuous_flow_still_voting_below_threshold_with_open_cells() {
        let advancing = vec![1, 2];
        let action = continuous_flow_decision(&advancing, 2, 5);
        assert_eq!(action, ContinuousFlowAction::StillVoting);
    }

    /// Scenario S3: the lower tier has drained (no cells left open) and
    /// exactly one idea survived — it's the champion.
    #[test]
    fn continuous_flow_crowns_sole_survivor_when_tier_drains() {
        let advancing = vec![42];
        let action = continuous_flow_decision(&advancing, 0, 5);
        assert_eq!(action, ContinuousFlowAction::Crown(42));
    }

    /// Scenario S3: the lower tier has drained with two or more
    /// leftover ideas, too few to fill a full cell — they form one
    /// undersized final cell rather than waiting forever.
    #[test]
    fn continuous_flow_forms_undersized_final_cell_when_tier_drains() {
        let advancing = vec![7, 8, 9];
        let action = continuous_flow_decision(&advancing, 0, 5);
        assert_eq!(action, ContinuousFlowAction::FormCell(vec![7, 8, 9]));
    }

    /// A single idea with no open cells and nothing else incoming must
    /// be crowned rather than left StillVoting forever.
    #[test]
    fn continuous_flow_does_not_stall_with_one_survivor_and_no_open_cells() {
        let advancing = vec![1];
        let action = continuous_flow_decision(&advancing, 0, 5);
        assert_ne!(action, ContinuousFlowAction::StillVoting);
    }
}
