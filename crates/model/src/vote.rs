use crate::Cell;
use crate::Idea;
use crate::Member;
use dlb_core::Id;
use dlb_core::Xp;

/// One voter's XP allocation to one idea in one cell. A voter submits
/// one row per idea they fund; the sum across a single `(cell,
/// member)` must equal the cell's XP budget exactly (spec §3, §4.4).
#[derive(Debug, Clone, Copy)]
pub struct Vote {
    cell: Id<Cell>,
    member: Id<Member>,
    idea: Id<Idea>,
    xp_points: Xp,
}

impl Vote {
    pub fn new(cell: Id<Cell>, member: Id<Member>, idea: Id<Idea>, xp_points: Xp) -> Self {
        Self {
            cell,
            member,
            idea,
            xp_points,
        }
    }
    pub fn cell(&self) -> Id<Cell> {
        self.cell
    }
    pub fn member(&self) -> Id<Member> {
        self.member
    }
    pub fn idea(&self) -> Id<Idea> {
        self.idea
    }
    pub fn xp_points(&self) -> Xp {
        self.xp_points
    }
}

#[cfg(feature = "database")]
mod schema {
    use super::*;
    use dlb_store::Schema;
    use dlb_store::CELLS;
    use dlb_store::IDEAS;
    use dlb_store::VOTES;

    impl Schema for Vote {
        fn name() -> &'static str {
            VOTES
        }
        fn creates() -> &'static str {
            const_format::concatcp!(
                "CREATE TABLE IF NOT EXISTS ",
                VOTES,
                " (
                    cell_id     UUID NOT NULL REFERENCES ",
                CELLS,
                "(id) ON DELETE CASCADE,
                    member_id   UUID NOT NULL,
                    idea_id     UUID NOT NULL REFERENCES ",
                IDEAS,
                "(id) ON DELETE CASCADE,
                    xp_points   INTEGER NOT NULL,
                    PRIMARY KEY (cell_id, member_id, idea_id)
                );"
            )
        }
        fn indices() -> &'static str {
            const_format::concatcp!(
                "CREATE INDEX IF NOT EXISTS idx_votes_cell_idea ON ",
                VOTES,
                " (cell_id, idea_id);"
            )
        }
    }
}
