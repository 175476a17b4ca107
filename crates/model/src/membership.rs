use crate::Deliberation;
use dlb_core::Id;
use std::time::SystemTime;

/// Marker type for a voter/participant identity. The engine never owns
/// account data — a `Member` is just the opaque ID an external auth
/// system hands back (spec §1 Non-goals).
pub struct Member;

/// A voter's join record for a deliberation. Joining is idempotent:
/// enforced by a unique constraint on `(deliberation, member)`.
#[derive(Debug, Clone)]
pub struct Membership {
    id: Id<Membership>,
    deliberation: Id<Deliberation>,
    member: Id<Member>,
    joined_at: SystemTime,
}

impl Membership {
    pub fn new(deliberation: Id<Deliberation>, member: Id<Member>, joined_at: SystemTime) -> Self {
        Self {
            id: Id::default(),
            deliberation,
            member,
            joined_at,
        }
    }

    pub fn id(&self) -> Id<Membership> {
        self.id
    }
    pub fn deliberation(&self) -> Id<Deliberation> {
        self.deliberation
    }
    pub fn member(&self) -> Id<Member> {
        self.member
    }
    pub fn joined_at(&self) -> SystemTime {
        self.joined_at
    }
}

impl dlb_core::Unique<Membership> for Membership {
    fn id(&self) -> Id<Membership> {
        self.id
    }
}

#[cfg(feature = "database")]
mod schema {
    use super::*;
    use dlb_store::Schema;
    use dlb_store::DELIBERATIONS;
    use dlb_store::MEMBERSHIPS;

    impl Schema for Membership {
        fn name() -> &'static str {
            MEMBERSHIPS
        }
        fn creates() -> &'static str {
            const_format::concatcp!(
                "CREATE TABLE IF NOT EXISTS ",
                MEMBERSHIPS,
                " (
                    id                UUID PRIMARY KEY,
                    deliberation_id   UUID NOT NULL REFERENCES ",
                DELIBERATIONS,
                "(id) ON DELETE CASCADE,
                    member_id         UUID NOT NULL,
                    joined_at         TIMESTAMPTZ NOT NULL,
                    UNIQUE (deliberation_id, member_id)
                );"
            )
        }
        fn indices() -> &'static str {
            const_format::concatcp!(
                "CREATE INDEX IF NOT EXISTS idx_memberships_deliberation ON ",
                MEMBERSHIPS,
                " (deliberation_id);"
            )
        }
    }
}
