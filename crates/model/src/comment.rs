use crate::Cell;
use crate::Idea;
use crate::Member;
use dlb_core::Id;
use dlb_core::TierNo;

/// Cell discussion, with the up-pollination bookkeeping (spec §4.7)
/// carried on the row itself rather than in a side table: `spreadCount`
/// and `reachTier` only ever grow, so no separate audit trail is
/// needed to prove monotonicity.
#[derive(Debug, Clone)]
pub struct Comment {
    id: Id<Comment>,
    cell: Id<Cell>,
    member: Id<Member>,
    idea: Option<Id<Idea>>,
    text: String,
    upvote_count: u32,
    spread_count: u32,
    reach_tier: TierNo,
    is_removed: bool,
    reply_to: Option<Id<Comment>>,
}

impl Comment {
    pub fn post(
        cell: Id<Cell>,
        member: Id<Member>,
        idea: Option<Id<Idea>>,
        text: String,
        reply_to: Option<Id<Comment>>,
        tier: TierNo,
    ) -> Self {
        Self {
            id: Id::default(),
            cell,
            member,
            idea,
            text,
            upvote_count: 0,
            spread_count: 0,
            reach_tier: tier,
            is_removed: false,
            reply_to,
        }
    }

    pub fn id(&self) -> Id<Comment> {
        self.id
    }
    pub fn cell(&self) -> Id<Cell> {
        self.cell
    }
    pub fn member(&self) -> Id<Member> {
        self.member
    }
    pub fn idea(&self) -> Option<Id<Idea>> {
        self.idea
    }
    pub fn text(&self) -> &str {
        &self.text
    }
    pub fn upvote_count(&self) -> u32 {
        self.upvote_count
    }
    pub fn spread_count(&self) -> u32 {
        self.spread_count
    }
    pub fn reach_tier(&self) -> TierNo {
        self.reach_tier
    }
    pub fn is_removed(&self) -> bool {
        self.is_removed
    }
    pub fn reply_to(&self) -> Option<Id<Comment>> {
        self.reply_to
    }

    pub fn record_upvote(&mut self) {
        self.upvote_count += 1;
    }

    /// Applies an up-pollination pass: spread count only grows, reach
    /// tier only climbs (spec §4.7 ordering guarantee).
    pub fn spread_to(&mut self, tier: TierNo) {
        self.spread_count += 1;
        self.reach_tier = self.reach_tier.max(tier);
    }

    pub fn remove(&mut self) {
        self.is_removed = true;
    }
}

impl dlb_core::Unique<Comment> for Comment {
    fn id(&self) -> Id<Comment> {
        self.id
    }
}

/// Unique per `(comment, member)`: the constraint that makes
/// `upvoteComment` idempotent (spec §6).
#[derive(Debug, Clone, Copy)]
pub struct CommentUpvote {
    comment: Id<Comment>,
    member: Id<Member>,
}

impl CommentUpvote {
    pub fn new(comment: Id<Comment>, member: Id<Member>) -> Self {
        Self { comment, member }
    }
    pub fn comment(&self) -> Id<Comment> {
        self.comment
    }
    pub fn member(&self) -> Id<Member> {
        self.member
    }
}

#[cfg(feature = "database")]
impl Comment {
    /// Rehydrates a `Comment` from a `SELECT * FROM comments` row.
    pub fn from_row(row: &dlb_store::Row) -> Self {
        Self {
            id: Id::from(row.get::<_, uuid::Uuid>("id")),
            cell: Id::from(row.get::<_, uuid::Uuid>("cell_id")),
            member: Id::from(row.get::<_, uuid::Uuid>("member_id")),
            idea: row.get::<_, Option<uuid::Uuid>>("idea_id").map(Id::from),
            text: row.get("text"),
            upvote_count: row.get::<_, i32>("upvote_count") as u32,
            spread_count: row.get::<_, i32>("spread_count") as u32,
            reach_tier: row.get::<_, i32>("reach_tier") as TierNo,
            is_removed: row.get("is_removed"),
            reply_to: row
                .get::<_, Option<uuid::Uuid>>("reply_to_id")
                .map(Id::from),
        }
    }
}

#[cfg(feature = "database")]
mod schema {
    use super::*;
    use dlb_store::Schema;
    use dlb_store::CELLS;
    use dlb_store::COMMENTS;
    use dlb_store::COMMENT_UPVOTES;
    use dlb_store::IDEAS;

    impl Schema for Comment {
        fn name() -> &'static str {
            COMMENTS
        }
        fn creates() -> &'static str {
            const_format::concatcp!(
                "CREATE TABLE IF NOT EXISTS ",
                COMMENTS,
                " (
                    id             UUID PRIMARY KEY,
                    cell_id        UUID NOT NULL REFERENCES ",
                CELLS,
                "(id) ON DELETE CASCADE,
                    member_id      UUID NOT NULL,
                    idea_id        UUID REFERENCES ",
                IDEAS,
                "(id) ON DELETE CASCADE,
                    text           TEXT NOT NULL,
                    upvote_count   INTEGER NOT NULL DEFAULT 0,
                    spread_count   INTEGER NOT NULL DEFAULT 0,
                    reach_tier     INTEGER NOT NULL DEFAULT 0,
                    is_removed     BOOLEAN NOT NULL DEFAULT FALSE,
                    reply_to_id    UUID
                );"
            )
        }
        fn indices() -> &'static str {
            const_format::concatcp!(
                "CREATE INDEX IF NOT EXISTS idx_comments_idea_upvotes ON ",
                COMMENTS,
                " (idea_id, upvote_count DESC);"
            )
        }
    }

    impl Schema for CommentUpvote {
        fn name() -> &'static str {
            COMMENT_UPVOTES
        }
        fn creates() -> &'static str {
            const_format::concatcp!(
                "CREATE TABLE IF NOT EXISTS ",
                COMMENT_UPVOTES,
                " (
                    comment_id   UUID NOT NULL REFERENCES ",
                COMMENTS,
                "(id) ON DELETE CASCADE,
                    member_id    UUID NOT NULL,
                    PRIMARY KEY (comment_id, member_id)
                );"
            )
        }
        fn indices() -> &'static str {
            ""
        }
    }
}
