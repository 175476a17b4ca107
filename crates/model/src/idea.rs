use crate::Deliberation;
use crate::IdeaStatus;
use crate::Member;
use dlb_core::Id;
use dlb_core::Losses;
use dlb_core::TierNo;
use dlb_core::Xp;

/// A submission and its status as it competes through tiers.
#[derive(Debug, Clone)]
pub struct Idea {
    id: Id<Idea>,
    deliberation: Id<Deliberation>,
    author: Id<Member>,
    text: String,
    status: IdeaStatus,
    tier: TierNo,
    total_xp: Xp,
    total_votes: u32,
    losses: Losses,
    is_champion: bool,
    is_new: bool,
}

impl Idea {
    pub fn submit(deliberation: Id<Deliberation>, author: Id<Member>, text: String) -> Self {
        Self {
            id: Id::default(),
            deliberation,
            author,
            text,
            status: IdeaStatus::Submitted,
            tier: 0,
            total_xp: 0,
            total_votes: 0,
            losses: 0,
            is_champion: false,
            is_new: false,
        }
    }

    /// An idea submitted while a deliberation is already in VOTING or
    /// ACCUMULATING (spec §3: `isNew`).
    pub fn submit_late(deliberation: Id<Deliberation>, author: Id<Member>, text: String) -> Self {
        let mut idea = Self::submit(deliberation, author, text);
        idea.is_new = true;
        idea.status = IdeaStatus::Pending;
        idea
    }

    pub fn id(&self) -> Id<Idea> {
        self.id
    }
    pub fn deliberation(&self) -> Id<Deliberation> {
        self.deliberation
    }
    pub fn author(&self) -> Id<Member> {
        self.author
    }
    pub fn text(&self) -> &str {
        &self.text
    }
    pub fn status(&self) -> IdeaStatus {
        self.status
    }
    pub fn tier(&self) -> TierNo {
        self.tier
    }
    pub fn total_xp(&self) -> Xp {
        self.total_xp
    }
    pub fn total_votes(&self) -> u32 {
        self.total_votes
    }
    pub fn losses(&self) -> Losses {
        self.losses
    }
    pub fn is_champion(&self) -> bool {
        self.is_champion
    }
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn set_status(&mut self, status: IdeaStatus) {
        self.status = status;
    }
    pub fn set_tier(&mut self, tier: TierNo) {
        self.tier = tier;
    }
    pub fn accrue_xp(&mut self, xp: Xp, voters: u32) {
        self.total_xp += xp;
        self.total_votes += voters;
    }
    pub fn record_loss(&mut self) {
        self.losses += 1;
    }
    pub fn crown(&mut self) {
        self.is_champion = true;
        self.status = IdeaStatus::Winner;
    }
    pub fn depose(&mut self) {
        self.is_champion = false;
        self.status = IdeaStatus::Defending;
    }
    pub fn clear_new(&mut self) {
        self.is_new = false;
    }
}

impl dlb_core::Unique<Idea> for Idea {
    fn id(&self) -> Id<Idea> {
        self.id
    }
}

#[cfg(feature = "database")]
impl Idea {
    /// Rehydrates an `Idea` from a `SELECT * FROM ideas` row.
    pub fn from_row(row: &dlb_store::Row) -> Self {
        Self {
            id: Id::from(row.get::<_, uuid::Uuid>("id")),
            deliberation: Id::from(row.get::<_, uuid::Uuid>("deliberation_id")),
            author: Id::from(row.get::<_, uuid::Uuid>("author_id")),
            text: row.get("text"),
            status: row.get::<_, String>("status").parse().expect("valid status"),
            tier: row.get::<_, i32>("tier") as TierNo,
            total_xp: row.get::<_, i32>("total_xp") as Xp,
            total_votes: row.get::<_, i32>("total_votes") as u32,
            losses: row.get::<_, i32>("losses") as Losses,
            is_champion: row.get("is_champion"),
            is_new: row.get("is_new"),
        }
    }
}

#[cfg(feature = "database")]
mod schema {
    use super::*;
    use dlb_store::Schema;
    use dlb_store::DELIBERATIONS;
    use dlb_store::IDEAS;

    impl Schema for Idea {
        fn name() -> &'static str {
            IDEAS
        }
        fn creates() -> &'static str {
            const_format::concatcp!(
                "CREATE TABLE IF NOT EXISTS ",
                IDEAS,
                " (
                    id                UUID PRIMARY KEY,
                    deliberation_id   UUID NOT NULL REFERENCES ",
                DELIBERATIONS,
                "(id) ON DELETE CASCADE,
                    author_id         UUID NOT NULL,
                    text              TEXT NOT NULL,
                    status            TEXT NOT NULL,
                    tier              INTEGER NOT NULL DEFAULT 0,
                    total_xp          INTEGER NOT NULL DEFAULT 0,
                    total_votes       INTEGER NOT NULL DEFAULT 0,
                    losses            INTEGER NOT NULL DEFAULT 0,
                    is_champion       BOOLEAN NOT NULL DEFAULT FALSE,
                    is_new            BOOLEAN NOT NULL DEFAULT FALSE
                );"
            )
        }
        fn indices() -> &'static str {
            const_format::concatcp!(
                "CREATE INDEX IF NOT EXISTS idx_ideas_deliberation_tier_status ON ",
                IDEAS,
                " (deliberation_id, tier, status);"
            )
        }
    }
}
