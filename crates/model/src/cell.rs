use crate::Deliberation;
use crate::Idea;
use crate::Member;
use dlb_core::BatchNo;
use dlb_core::Id;
use dlb_core::TierNo;
use std::time::SystemTime;

/// A cell's lifecycle: open for voting, or closed and immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "client", serde(rename_all = "snake_case"))]
pub enum CellStatus {
    Voting,
    Completed,
}

impl std::fmt::Display for CellStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Voting => "voting",
            Self::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for CellStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "voting" => Ok(Self::Voting),
            "completed" => Ok(Self::Completed),
            other => Err(format!("unknown cell status: {other}")),
        }
    }
}

/// A tier/batch grouping of ideas and voters: the unit of local XP
/// voting. Membership (`CellIdea`, `CellParticipant`) is persisted as
/// separate join rows so cell formation can insert them in bulk inside
/// one transaction (spec §4.3 step 5).
#[derive(Debug, Clone)]
pub struct Cell {
    id: Id<Cell>,
    deliberation: Id<Deliberation>,
    tier: TierNo,
    batch: BatchNo,
    status: CellStatus,
    voting_deadline: Option<SystemTime>,
    completed_at: Option<SystemTime>,
}

impl Cell {
    pub fn open(
        deliberation: Id<Deliberation>,
        tier: TierNo,
        batch: BatchNo,
        voting_deadline: Option<SystemTime>,
    ) -> Self {
        Self {
            id: Id::default(),
            deliberation,
            tier,
            batch,
            status: CellStatus::Voting,
            voting_deadline,
            completed_at: None,
        }
    }

    pub fn id(&self) -> Id<Cell> {
        self.id
    }
    pub fn deliberation(&self) -> Id<Deliberation> {
        self.deliberation
    }
    pub fn tier(&self) -> TierNo {
        self.tier
    }
    pub fn batch(&self) -> BatchNo {
        self.batch
    }
    pub fn status(&self) -> CellStatus {
        self.status
    }
    pub fn voting_deadline(&self) -> Option<SystemTime> {
        self.voting_deadline
    }
    pub fn completed_at(&self) -> Option<SystemTime> {
        self.completed_at
    }
    pub fn is_completed(&self) -> bool {
        self.status == CellStatus::Completed
    }

    pub fn complete(&mut self, now: SystemTime) {
        self.status = CellStatus::Completed;
        self.completed_at = Some(now);
    }
}

impl dlb_core::Unique<Cell> for Cell {
    fn id(&self) -> Id<Cell> {
        self.id
    }
}

/// Join row: one idea competing in one cell.
#[derive(Debug, Clone, Copy)]
pub struct CellIdea {
    cell: Id<Cell>,
    idea: Id<Idea>,
}

impl CellIdea {
    pub fn new(cell: Id<Cell>, idea: Id<Idea>) -> Self {
        Self { cell, idea }
    }
    pub fn cell(&self) -> Id<Cell> {
        self.cell
    }
    pub fn idea(&self) -> Id<Idea> {
        self.idea
    }
}

/// Join row: one voter assigned to one cell. Unique per `(cell,
/// member)` — the primitive that makes "at most once per cell"
/// enforceable without an in-process lock.
#[derive(Debug, Clone, Copy)]
pub struct CellParticipant {
    cell: Id<Cell>,
    member: Id<Member>,
    author_conflict: bool,
}

impl CellParticipant {
    pub fn new(cell: Id<Cell>, member: Id<Member>, author_conflict: bool) -> Self {
        Self {
            cell,
            member,
            author_conflict,
        }
    }
    pub fn cell(&self) -> Id<Cell> {
        self.cell
    }
    pub fn member(&self) -> Id<Member> {
        self.member
    }
    /// True when this assignment relaxed the author-conflict rule
    /// (spec §4.3: recorded as a soft violation, not rejected).
    pub fn has_author_conflict(&self) -> bool {
        self.author_conflict
    }
}

#[cfg(feature = "database")]
impl Cell {
    /// Rehydrates a `Cell` from a `SELECT * FROM cells` row.
    pub fn from_row(row: &dlb_store::Row) -> Self {
        Self {
            id: Id::from(row.get::<_, uuid::Uuid>("id")),
            deliberation: Id::from(row.get::<_, uuid::Uuid>("deliberation_id")),
            tier: row.get::<_, i32>("tier") as TierNo,
            batch: row.get::<_, i32>("batch") as BatchNo,
            status: row.get::<_, String>("status").parse().expect("valid status"),
            voting_deadline: row.get("voting_deadline"),
            completed_at: row.get("completed_at"),
        }
    }
}

#[cfg(feature = "database")]
mod schema {
    use super::*;
    use dlb_store::Schema;
    use dlb_store::CELLS;
    use dlb_store::CELL_IDEAS;
    use dlb_store::CELL_PARTICIPANTS;
    use dlb_store::DELIBERATIONS;
    use dlb_store::IDEAS;

    impl Schema for Cell {
        fn name() -> &'static str {
            CELLS
        }
        fn creates() -> &'static str {
            const_format::concatcp!(
                "CREATE TABLE IF NOT EXISTS ",
                CELLS,
                " (
                    id                UUID PRIMARY KEY,
                    deliberation_id   UUID NOT NULL REFERENCES ",
                DELIBERATIONS,
                "(id) ON DELETE CASCADE,
                    tier              INTEGER NOT NULL,
                    batch             INTEGER NOT NULL,
                    status            TEXT NOT NULL,
                    voting_deadline   TIMESTAMPTZ,
                    completed_at      TIMESTAMPTZ
                );"
            )
        }
        fn indices() -> &'static str {
            const_format::concatcp!(
                "CREATE INDEX IF NOT EXISTS idx_cells_deliberation_tier_status ON ",
                CELLS,
                " (deliberation_id, tier, status);"
            )
        }
    }

    impl Schema for CellIdea {
        fn name() -> &'static str {
            CELL_IDEAS
        }
        fn creates() -> &'static str {
            const_format::concatcp!(
                "CREATE TABLE IF NOT EXISTS ",
                CELL_IDEAS,
                " (
                    cell_id   UUID NOT NULL REFERENCES ",
                CELLS,
                "(id) ON DELETE CASCADE,
                    idea_id   UUID NOT NULL REFERENCES ",
                IDEAS,
                "(id) ON DELETE CASCADE,
                    PRIMARY KEY (cell_id, idea_id)
                );"
            )
        }
        fn indices() -> &'static str {
            const_format::concatcp!(
                "CREATE INDEX IF NOT EXISTS idx_cell_ideas_idea ON ",
                CELL_IDEAS,
                " (idea_id);"
            )
        }
    }

    impl Schema for CellParticipant {
        fn name() -> &'static str {
            CELL_PARTICIPANTS
        }
        fn creates() -> &'static str {
            const_format::concatcp!(
                "CREATE TABLE IF NOT EXISTS ",
                CELL_PARTICIPANTS,
                " (
                    cell_id           UUID NOT NULL REFERENCES ",
                CELLS,
                "(id) ON DELETE CASCADE,
                    member_id         UUID NOT NULL,
                    author_conflict   BOOLEAN NOT NULL DEFAULT FALSE,
                    PRIMARY KEY (cell_id, member_id)
                );"
            )
        }
        fn indices() -> &'static str {
            const_format::concatcp!(
                "CREATE INDEX IF NOT EXISTS idx_cell_participants_member ON ",
                CELL_PARTICIPANTS,
                " (member_id);"
            )
        }
    }
}
