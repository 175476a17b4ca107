use crate::Member;
use dlb_core::Id;
use dlb_core::Unique;

/// Persisted, revocable record a bearer token refers to.
#[derive(Debug, Clone)]
pub struct Session {
    id: Id<Session>,
    user: Id<Member>,
    hash: Vec<u8>,
    expires: std::time::SystemTime,
    revoked: bool,
}

impl Unique<Session> for Session {
    fn id(&self) -> Id<Session> {
        self.id
    }
}

impl Session {
    pub fn new(user: Id<Member>, hash: Vec<u8>) -> Self {
        Self {
            id: Id::default(),
            user,
            hash,
            expires: std::time::SystemTime::now() + crate::Crypto::duration(),
            revoked: false,
        }
    }
    pub fn user(&self) -> Id<Member> {
        self.user
    }
    pub fn hash(&self) -> &[u8] {
        &self.hash
    }
    pub fn expires_at(&self) -> std::time::SystemTime {
        self.expires
    }
    pub fn is_revoked(&self) -> bool {
        self.revoked
    }
    pub fn revoke(&mut self) {
        self.revoked = true;
    }
}

#[cfg(feature = "database")]
mod schema {
    use super::*;
    use dlb_store::Schema;

    const SESSIONS: &str = "sessions";

    impl Schema for Session {
        fn name() -> &'static str {
            SESSIONS
        }
        fn creates() -> &'static str {
            const_format::concatcp!(
                "CREATE TABLE IF NOT EXISTS ",
                SESSIONS,
                " (
                    id          UUID PRIMARY KEY,
                    member_id   UUID NOT NULL,
                    token_hash  BYTEA NOT NULL,
                    expires_at  TIMESTAMPTZ NOT NULL,
                    revoked     BOOLEAN NOT NULL DEFAULT FALSE
                );"
            )
        }
        fn indices() -> &'static str {
            const_format::concatcp!(
                "CREATE INDEX IF NOT EXISTS idx_sessions_token ON ",
                SESSIONS,
                " (token_hash);
                 CREATE INDEX IF NOT EXISTS idx_sessions_expires ON ",
                SESSIONS,
                " (expires_at) WHERE NOT revoked;"
            )
        }
    }
}
