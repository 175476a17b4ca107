//! Cell Assigner: partitions ideas and voters into cells under
//! author-conflict and size constraints (spec §4.3).
//!
//! - [`partition_evenly`] / [`assign_members`] / [`next_batch_index`] —
//!   pure partitioning logic, testable without a database
//! - [`Assigner`] — the async shell wrapping these with `dlb-store` calls
//! - [`ConflictEvent`] — a recorded author-conflict relaxation
mod partition;

pub use partition::assign_members;
pub use partition::next_batch_index;
pub use partition::partition_evenly;
pub use partition::RelaxedConflict;

use dlb_core::BatchNo;
use dlb_core::Id;
use dlb_core::TierNo;
use dlb_model::Cell;
use dlb_model::Deliberation;
use dlb_model::Idea;
use dlb_model::IdeaStatus;
use dlb_model::Member;
use dlb_store::Store;
use dlb_store::StoreError;
use rand::seq::SliceRandom;
use std::collections::HashSet;
use std::time::SystemTime;

/// A relaxed author-conflict recorded during assignment — supplemental
/// to spec §4.3, which names "a conflict event" as the audit trail for
/// a relaxed rule but doesn't give it a shape.
#[derive(Debug, Clone, Copy)]
pub struct ConflictEvent {
    pub cell: Id<Cell>,
    pub participant: Id<Member>,
}

/// Wraps the pure partitioning functions with the `dlb-store` calls
/// needed to persist a cell and flip idea status atomically (spec
/// §4.3 step 5).
pub struct Assigner {
    store: Store,
}

impl Assigner {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Batch-mode tier-1 assignment: partitions every submitted idea
    /// and current member into `ceil(members / cellSize)` cells and
    /// persists each one.
    pub async fn batch_assign_tier1(
        &self,
        deliberation: &Deliberation,
        mut ideas: Vec<Id<Idea>>,
        mut members: Vec<Id<Member>>,
        idea_authors: &std::collections::HashMap<Id<Idea>, Id<Member>>,
        voting_deadline: SystemTime,
    ) -> Result<(Vec<Id<Cell>>, Vec<ConflictEvent>), StoreError> {
        let cell_size = deliberation.cell_size();
        let num_cells = dlb_core::ceil_div(members.len(), cell_size).max(1);

        ideas.shuffle(&mut rand::rng());
        members.shuffle(&mut rand::rng());

        let idea_groups = partition_evenly(&ideas, num_cells);
        self.form_cells(deliberation, 1, idea_groups, members, idea_authors, voting_deadline)
            .await
    }

    /// Tier `T+1` batch assignment: either a final-showdown cell (if
    /// the advancing idea count fits in one cell) or another round of
    /// partitioned cells (spec §4.3 "Tier T+1 batch").
    pub async fn batch_assign_next_tier(
        &self,
        deliberation: &Deliberation,
        tier: TierNo,
        mut advancing: Vec<Id<Idea>>,
        mut members: Vec<Id<Member>>,
        idea_authors: &std::collections::HashMap<Id<Idea>, Id<Member>>,
        voting_deadline: SystemTime,
    ) -> Result<(Vec<Id<Cell>>, Vec<ConflictEvent>), StoreError> {
        let cell_size = deliberation.cell_size();
        advancing.shuffle(&mut rand::rng());
        members.shuffle(&mut rand::rng());

        let idea_groups = if advancing.len() <= cell_size {
            vec![advancing]
        } else {
            let num_cells = dlb_core::ceil_div(advancing.len(), cell_size).max(1);
            partition_evenly(&advancing, num_cells)
        };
        self.form_cells(deliberation, tier, idea_groups, members, idea_authors, voting_deadline)
            .await
    }

    /// Opens a tier cell populated with `ideas` but no participants yet
    /// (spec §4.6's FCFS tier advancement: the Tier Controller opens
    /// the cell; voters join it afterward through `enter_fcfs`).
    pub async fn open_cell_for_ideas(
        &self,
        deliberation: &Deliberation,
        tier: TierNo,
        ideas: Vec<Id<Idea>>,
        voting_deadline: SystemTime,
    ) -> Result<Id<Cell>, StoreError> {
        let existing = self.existing_batches(deliberation.id(), tier).await?;
        let batch = next_batch_index(&existing);
        let cell = Cell::open(deliberation.id(), tier, batch, Some(voting_deadline));
        self.persist_cell(&cell, &ideas, &[]).await?;
        for idea in &ideas {
            self.claim_idea(*idea, tier).await?;
        }
        Ok(cell.id())
    }

    async fn form_cells(
        &self,
        deliberation: &Deliberation,
        tier: TierNo,
        idea_groups: Vec<Vec<Id<Idea>>>,
        members: Vec<Id<Member>>,
        idea_authors: &std::collections::HashMap<Id<Idea>, Id<Member>>,
        voting_deadline: SystemTime,
    ) -> Result<(Vec<Id<Cell>>, Vec<ConflictEvent>), StoreError> {
        let cell_size = deliberation.cell_size();
        let author_sets: Vec<HashSet<Id<Member>>> = idea_groups
            .iter()
            .map(|group| {
                group
                    .iter()
                    .filter_map(|idea| idea_authors.get(idea).copied())
                    .collect()
            })
            .collect();
        let (member_groups, relaxed) = assign_members(&members, &author_sets, cell_size);

        let mut cell_ids = Vec::with_capacity(idea_groups.len());
        for (batch, (cell_ideas, cell_members)) in
            idea_groups.into_iter().zip(member_groups).enumerate()
        {
            let cell = Cell::open(deliberation.id(), tier, batch as BatchNo, Some(voting_deadline));
            let cell_id = cell.id();
            self.persist_cell(&cell, &cell_ideas, &cell_members).await?;
            for idea in &cell_ideas {
                self.claim_idea(*idea, tier).await?;
            }
            cell_ids.push(cell_id);
        }

        let conflicts = relaxed
            .into_iter()
            .map(|r| ConflictEvent {
                cell: cell_ids[r.cell_index],
                participant: r.member,
            })
            .collect();

        Ok((cell_ids, conflicts))
    }

    /// Persists a cell with its idea set and participant set in one
    /// transaction (spec §4.3 step 5).
    async fn persist_cell(
        &self,
        cell: &Cell,
        ideas: &[Id<Idea>],
        members: &[Id<Member>],
    ) -> Result<(), StoreError> {
        let ideas = ideas.to_vec();
        let members = members.to_vec();
        let cell = cell.clone();
        self.store
            .transact(move |txn| {
                let ideas = ideas.clone();
                let members = members.clone();
                let cell = cell.clone();
                Box::pin(async move {
                    txn.execute(
                        "INSERT INTO cells (id, deliberation_id, tier, batch, status, voting_deadline) \
                         VALUES ($1, $2, $3, $4, $5, $6)",
                        &[
                            &cell.id().inner(),
                            &cell.deliberation().inner(),
                            &(cell.tier() as i32),
                            &(cell.batch() as i32),
                            &cell.status().to_string(),
                            &cell.voting_deadline(),
                        ],
                    )
                    .await?;
                    for idea in &ideas {
                        txn.execute(
                            "INSERT INTO cell_ideas (cell_id, idea_id) VALUES ($1, $2)",
                            &[&cell.id().inner(), &idea.inner()],
                        )
                        .await?;
                    }
                    for member in &members {
                        txn.execute(
                            "INSERT INTO cell_participants (cell_id, member_id) VALUES ($1, $2)",
                            &[&cell.id().inner(), &member.inner()],
                        )
                        .await?;
                    }
                    Ok(())
                })
            })
            .await
    }

    /// Claims an idea for a cell at `tier`: the conditional update
    /// that makes concurrent cell creation race-free (spec §4.3
    /// "enforced by conditional update of idea status ... gated by
    /// idempotency"). Zero affected rows means another cell already
    /// claimed this idea; the caller should drop it from the cell.
    async fn claim_idea(&self, idea: Id<Idea>, tier: TierNo) -> Result<bool, StoreError> {
        self.store
            .conditional_update(
                "UPDATE ideas SET status = $1, tier = $2 \
                 WHERE id = $3 AND status IN ($4, $5) AND tier < $2",
                &[
                    &IdeaStatus::InVoting.to_string(),
                    &(tier as i32),
                    &idea.inner(),
                    &IdeaStatus::Submitted.to_string(),
                    &IdeaStatus::Advancing.to_string(),
                ],
            )
            .await
    }

    /// Continuous-flow entry (spec §4.3 "Continuous-flow (FCFS) mode"):
    /// finds an open tier-`T` cell with spare capacity and no author
    /// conflict for `member`; if none exists, opens a new cell by
    /// dequeuing the next `cellSize` eligible ideas.
    pub async fn enter_fcfs(
        &self,
        deliberation: &Deliberation,
        tier: TierNo,
        member: Id<Member>,
        voting_timeout: std::time::Duration,
    ) -> Result<Option<Id<Cell>>, StoreError> {
        if let Some(cell) = self
            .find_open_cell(deliberation.id(), tier, member, deliberation.cell_size())
            .await?
        {
            self.store
                .insert_unique(
                    "INSERT INTO cell_participants (cell_id, member_id) VALUES ($1, $2) \
                     ON CONFLICT DO NOTHING",
                    &[&cell.inner(), &member.inner()],
                )
                .await?;
            return Ok(Some(cell));
        }

        let eligible_status = if tier == 1 {
            IdeaStatus::Submitted
        } else {
            IdeaStatus::Advancing
        };
        let rows = self
            .store
            .query(
                "SELECT id FROM ideas WHERE deliberation_id = $1 AND status = $2 \
                 ORDER BY id LIMIT $3",
                &[
                    &deliberation.id().inner(),
                    &eligible_status.to_string(),
                    &(deliberation.cell_size() as i64),
                ],
            )
            .await?;
        if rows.is_empty() {
            return Ok(None);
        }
        let ideas: Vec<Id<Idea>> = rows
            .iter()
            .map(|row| row.get::<_, uuid::Uuid>(0).into())
            .collect();

        let existing_batches = self.existing_batches(deliberation.id(), tier).await?;
        let batch = next_batch_index(&existing_batches);
        let deadline = SystemTime::now() + voting_timeout;
        let cell = Cell::open(deliberation.id(), tier, batch, Some(deadline));
        self.persist_cell(&cell, &ideas, &[member]).await?;
        for idea in &ideas {
            self.claim_idea(*idea, tier).await?;
        }
        Ok(Some(cell.id()))
    }

    async fn find_open_cell(
        &self,
        deliberation: Id<Deliberation>,
        tier: TierNo,
        member: Id<Member>,
        cell_size: usize,
    ) -> Result<Option<Id<Cell>>, StoreError> {
        let rows = self
            .store
            .query(
                "SELECT c.id FROM cells c
                 WHERE c.deliberation_id = $1 AND c.tier = $2 AND c.status = $3
                   AND (SELECT count(*) FROM cell_participants p WHERE p.cell_id = c.id) < $4
                   AND NOT EXISTS (
                       SELECT 1 FROM cell_ideas ci
                       JOIN ideas i ON i.id = ci.idea_id
                       WHERE ci.cell_id = c.id AND i.author_id = $5
                   )
                 ORDER BY (SELECT count(*) FROM cell_participants p WHERE p.cell_id = c.id) ASC
                 LIMIT 1",
                &[
                    &deliberation.inner(),
                    &(tier as i32),
                    &IdeaStatus::InVoting.to_string(),
                    &(cell_size as i64),
                    &member.inner(),
                ],
            )
            .await?;
        Ok(rows
            .first()
            .map(|row| Id::<Cell>::from(row.get::<_, uuid::Uuid>(0))))
    }

    async fn existing_batches(
        &self,
        deliberation: Id<Deliberation>,
        tier: TierNo,
    ) -> Result<Vec<BatchNo>, StoreError> {
        let rows = self
            .store
            .query(
                "SELECT batch FROM cells WHERE deliberation_id = $1 AND tier = $2",
                &[&deliberation.inner(), &(tier as i32)],
            )
            .await?;
        Ok(rows.iter().map(|row| row.get::<_, i32>(0) as BatchNo).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_event_carries_cell_and_participant() {
        let cell = Id::<Cell>::default();
        let member = Id::<Member>::default();
        let event = ConflictEvent {
            cell,
            participant: member,
        };
        assert_eq!(event.cell.inner(), cell.inner());
        assert_eq!(event.participant.inner(), member.inner());
    }
}
