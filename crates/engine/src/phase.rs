use crate::EngineError;
use dlb_assign::Assigner;
use dlb_core::BENCH_AFTER_LOSSES;
use dlb_core::Id;
use dlb_model::Deliberation;
use dlb_model::Idea;
use dlb_model::IdeaStatus;
use dlb_model::Member;
use dlb_model::Phase;
use dlb_store::Store;
use std::collections::HashMap;
use std::time::Duration;
use std::time::SystemTime;

/// Evaluates the SUBMISSION→VOTING triggers of spec §4.8: idea goal,
/// participant goal, or submission deadline elapsed.
pub fn submission_triggers_met(
    deliberation: &Deliberation,
    idea_count: u32,
    participant_count: u32,
    now: SystemTime,
) -> bool {
    if let Some(goal) = deliberation.idea_goal() {
        if idea_count >= goal {
            return true;
        }
    }
    if let Some(goal) = deliberation.participant_goal() {
        if participant_count >= goal {
            return true;
        }
    }
    if let Some(deadline) = deliberation.submission_ends_at() {
        if now >= deadline {
            return true;
        }
    }
    false
}

/// `SUBMISSION → VOTING`: an atomic conditional update followed by
/// tier-1 assignment. Concurrent triggers are coalesced by the
/// conditional update — only the winner runs assignment (spec §4.8).
pub async fn start_voting(
    store: &Store,
    assigner: &Assigner,
    deliberation: &Deliberation,
) -> Result<bool, EngineError> {
    let won = store
        .conditional_update(
            "UPDATE deliberations SET phase = $1, current_tier = 1 WHERE id = $2 AND phase = $3",
            &[
                &Phase::Voting.to_string(),
                &deliberation.id().inner(),
                &Phase::Submission.to_string(),
            ],
        )
        .await?;
    if !won {
        return Ok(false);
    }

    let ideas = submitted_ideas(store, deliberation.id()).await?;
    let members = current_members(store, deliberation.id()).await?;
    let authors = idea_authors(store, &ideas).await?;
    let deadline = SystemTime::now() + Duration::from_millis(deliberation.voting_timeout_ms());

    assigner
        .batch_assign_tier1(deliberation, ideas, members, &authors, deadline)
        .await?;
    Ok(true)
}

/// `ACCUMULATING → VOTING` (challenge round): re-tags the champion and
/// challengers IN_VOTING at tier 1 and opens a cell for them, bumping
/// `challengeRound`. Ideas with `losses >= 2` are BENCHED and excluded
/// (spec §4.8).
pub async fn start_challenge_round(
    store: &Store,
    assigner: &Assigner,
    deliberation: &Deliberation,
) -> Result<Option<Id<dlb_model::Cell>>, EngineError> {
    let won = store
        .conditional_update(
            "UPDATE deliberations SET phase = $1, current_tier = 1, challenge_round = challenge_round + 1 \
             WHERE id = $2 AND phase = $3",
            &[
                &Phase::Voting.to_string(),
                &deliberation.id().inner(),
                &Phase::Accumulating.to_string(),
            ],
        )
        .await?;
    if !won {
        return Ok(None);
    }

    bench_repeat_losers(store, deliberation.id()).await?;

    let champion = deliberation.champion_id();
    let challengers = pending_ideas(store, deliberation.id()).await?;

    let mut contenders: Vec<Id<Idea>> = challengers;
    if let Some(champion) = champion {
        contenders.insert(0, champion);
    }

    for idea in &contenders {
        store
            .conditional_update(
                "UPDATE ideas SET status = $1, tier = 1 WHERE id = $2",
                &[&IdeaStatus::InVoting.to_string(), &idea.inner()],
            )
            .await?;
    }

    let deadline = SystemTime::now() + Duration::from_millis(deliberation.voting_timeout_ms());
    let cell = assigner
        .open_cell_for_ideas(deliberation, 1, contenders, deadline)
        .await?;
    Ok(Some(cell))
}

/// `forceClose(deliberationId, callerId)` (spec §6): closes every
/// still-open cell at the deliberation's current tier and runs each
/// through the same completion path a last vote or a Scheduler
/// timeout would, so forcing a close never bypasses tallying or tier
/// advancement — it only short-circuits the wait for remaining votes.
pub async fn force_close(
    store: &Store,
    assigner: &Assigner,
    deliberation: &Deliberation,
) -> Result<Vec<crate::CompletionOutcome>, EngineError> {
    let tier = deliberation.current_tier();
    let cells = open_cells_at_tier(store, deliberation.id(), tier).await?;
    let now = SystemTime::now();
    let mut outcomes = Vec::with_capacity(cells.len());
    for cell in cells {
        if let Some(outcome) = crate::complete_cell(store, assigner, deliberation, cell, now).await? {
            outcomes.push(outcome);
        }
    }
    Ok(outcomes)
}

async fn open_cells_at_tier(
    store: &Store,
    deliberation: Id<Deliberation>,
    tier: dlb_core::TierNo,
) -> Result<Vec<Id<dlb_model::Cell>>, EngineError> {
    let rows = store
        .query(
            "SELECT id FROM cells WHERE deliberation_id = $1 AND tier = $2 AND status = $3",
            &[
                &deliberation.inner(),
                &(tier as i32),
                &dlb_model::CellStatus::Voting.to_string(),
            ],
        )
        .await?;
    Ok(rows
        .iter()
        .map(|row| Id::from(row.get::<_, uuid::Uuid>(0)))
        .collect())
}

async fn bench_repeat_losers(store: &Store, deliberation: Id<Deliberation>) -> Result<(), EngineError> {
    store
        .conditional_update(
            "UPDATE ideas SET status = $1 \
             WHERE deliberation_id = $2 AND losses >= $3 AND status != $1",
            &[
                &IdeaStatus::Benched.to_string(),
                &deliberation.inner(),
                &(BENCH_AFTER_LOSSES as i32),
            ],
        )
        .await?;
    Ok(())
}

async fn submitted_ideas(
    store: &Store,
    deliberation: Id<Deliberation>,
) -> Result<Vec<Id<Idea>>, EngineError> {
    let rows = store
        .query(
            "SELECT id FROM ideas WHERE deliberation_id = $1 AND status = $2",
            &[&deliberation.inner(), &IdeaStatus::Submitted.to_string()],
        )
        .await?;
    Ok(rows
        .iter()
        .map(|row| Id::from(row.get::<_, uuid::Uuid>(0)))
        .collect())
}

async fn pending_ideas(
    store: &Store,
    deliberation: Id<Deliberation>,
) -> Result<Vec<Id<Idea>>, EngineError> {
    let rows = store
        .query(
            "SELECT id FROM ideas WHERE deliberation_id = $1 AND status = $2",
            &[&deliberation.inner(), &IdeaStatus::Pending.to_string()],
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

    fn deliberation_with(
        idea_goal: Option<u32>,
        participant_goal: Option<u32>,
        submission_ends_at: Option<SystemTime>,
    ) -> Deliberation {
        Deliberation::new(
            Id::default(),
            "q".into(),
            None,
            None,
            5,
            10,
            dlb_model::AllocationMode::Batch,
            false,
            submission_ends_at,
            30_000,
            None,
            None,
            idea_goal,
            participant_goal,
        )
    }

    #[test]
    fn idea_goal_triggers_start() {
        let deliberation = deliberation_with(Some(5), None, None);
        assert!(submission_triggers_met(&deliberation, 5, 0, SystemTime::now()));
        assert!(!submission_triggers_met(&deliberation, 4, 0, SystemTime::now()));
    }

    #[test]
    fn submission_deadline_triggers_start() {
        let past = SystemTime::now() - Duration::from_secs(1);
        let deliberation = deliberation_with(None, None, Some(past));
        assert!(submission_triggers_met(&deliberation, 0, 0, SystemTime::now()));
    }

    #[test]
    fn no_trigger_met_keeps_submission_open() {
        let future = SystemTime::now() + Duration::from_secs(3600);
        let deliberation = deliberation_with(Some(100), Some(100), Some(future));
        assert!(!submission_triggers_met(&deliberation, 1, 1, SystemTime::now()));
    }
}
