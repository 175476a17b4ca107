use crate::Phase;
use dlb_core::BatchNo;
use dlb_core::Id;
use dlb_core::TierNo;
use dlb_core::Xp;
use std::time::SystemTime;

/// How ideas and voters are packed into cells (spec §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "client", serde(rename_all = "snake_case"))]
pub enum AllocationMode {
    Batch,
    Fcfs,
}

impl std::fmt::Display for AllocationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Batch => "batch",
            Self::Fcfs => "fcfs",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for AllocationMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "batch" => Ok(Self::Batch),
            "fcfs" => Ok(Self::Fcfs),
            other => Err(format!("unknown allocation mode: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Both allocation modes must survive a `to_string()` → `parse()`
    /// round trip unchanged, since this is exactly what happens writing
    /// a row to `deliberations.allocation_mode` and rehydrating it
    /// afterward.
    #[test]
    fn every_allocation_mode_round_trips_through_its_string_form() {
        for mode in [AllocationMode::Batch, AllocationMode::Fcfs] {
            let round_tripped: AllocationMode = mode.to_string().parse().expect("valid mode");
            assert_eq!(round_tripped, mode);
        }
    }

    #[test]
    fn unknown_allocation_mode_string_is_rejected() {
        assert!("not_a_mode".parse::<AllocationMode>().is_err());
    }
}

/// The top-level tournament: a question, its tier/cell configuration,
/// and its position in the phase state machine.
#[derive(Debug, Clone)]
pub struct Deliberation {
    id: Id<Deliberation>,
    creator: Id<crate::Member>,
    question: String,
    description: Option<String>,
    organization: Option<String>,
    phase: Phase,
    current_tier: TierNo,
    cell_size: usize,
    xp_budget: Xp,
    allocation_mode: AllocationMode,
    accumulation_enabled: bool,
    submission_ends_at: Option<SystemTime>,
    voting_timeout_ms: u64,
    second_vote_timeout_ms: Option<u64>,
    accumulation_timeout_ms: Option<u64>,
    idea_goal: Option<u32>,
    participant_goal: Option<u32>,
    champion_id: Option<Id<crate::Idea>>,
    challenge_round: BatchNo,
    completed_at: Option<SystemTime>,
    halted_at: Option<SystemTime>,
    accumulation_started_at: Option<SystemTime>,
}

impl Deliberation {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        creator: Id<crate::Member>,
        question: String,
        description: Option<String>,
        organization: Option<String>,
        cell_size: usize,
        xp_budget: Xp,
        allocation_mode: AllocationMode,
        accumulation_enabled: bool,
        submission_ends_at: Option<SystemTime>,
        voting_timeout_ms: u64,
        second_vote_timeout_ms: Option<u64>,
        accumulation_timeout_ms: Option<u64>,
        idea_goal: Option<u32>,
        participant_goal: Option<u32>,
    ) -> Self {
        Self {
            id: Id::default(),
            creator,
            question,
            description,
            organization,
            phase: Phase::Submission,
            current_tier: 1,
            cell_size,
            xp_budget,
            allocation_mode,
            accumulation_enabled,
            submission_ends_at,
            voting_timeout_ms,
            second_vote_timeout_ms,
            accumulation_timeout_ms,
            idea_goal,
            participant_goal,
            champion_id: None,
            challenge_round: 0,
            completed_at: None,
            halted_at: None,
            accumulation_started_at: None,
        }
    }

    pub fn id(&self) -> Id<Deliberation> {
        self.id
    }
    pub fn creator(&self) -> Id<crate::Member> {
        self.creator
    }
    pub fn is_creator(&self, member: Id<crate::Member>) -> bool {
        self.creator == member
    }
    pub fn question(&self) -> &str {
        &self.question
    }
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
    pub fn organization(&self) -> Option<&str> {
        self.organization.as_deref()
    }
    pub fn phase(&self) -> Phase {
        self.phase
    }
    pub fn current_tier(&self) -> TierNo {
        self.current_tier
    }
    pub fn cell_size(&self) -> usize {
        self.cell_size
    }
    pub fn xp_budget(&self) -> Xp {
        self.xp_budget
    }
    pub fn allocation_mode(&self) -> AllocationMode {
        self.allocation_mode
    }
    pub fn is_continuous_flow(&self) -> bool {
        self.allocation_mode == AllocationMode::Fcfs
    }
    pub fn accumulation_enabled(&self) -> bool {
        self.accumulation_enabled
    }
    pub fn submission_ends_at(&self) -> Option<SystemTime> {
        self.submission_ends_at
    }
    pub fn voting_timeout_ms(&self) -> u64 {
        self.voting_timeout_ms
    }
    pub fn second_vote_timeout_ms(&self) -> Option<u64> {
        self.second_vote_timeout_ms
    }
    pub fn accumulation_timeout_ms(&self) -> Option<u64> {
        self.accumulation_timeout_ms
    }
    pub fn idea_goal(&self) -> Option<u32> {
        self.idea_goal
    }
    pub fn participant_goal(&self) -> Option<u32> {
        self.participant_goal
    }
    pub fn champion_id(&self) -> Option<Id<crate::Idea>> {
        self.champion_id
    }
    pub fn challenge_round(&self) -> BatchNo {
        self.challenge_round
    }
    pub fn completed_at(&self) -> Option<SystemTime> {
        self.completed_at
    }
    pub fn halted_at(&self) -> Option<SystemTime> {
        self.halted_at
    }
    pub fn is_halted(&self) -> bool {
        self.halted_at.is_some()
    }
    pub fn accumulation_started_at(&self) -> Option<SystemTime> {
        self.accumulation_started_at
    }
    /// Deadline for the current ACCUMULATING window, if one is running
    /// (spec §4.8 "ACCUMULATING → VOTING ... when ...
    /// `accumulationTimeoutMs` elapses").
    pub fn accumulation_ends_at(&self) -> Option<SystemTime> {
        let started = self.accumulation_started_at?;
        let timeout = self.accumulation_timeout_ms?;
        Some(started + std::time::Duration::from_millis(timeout))
    }
}

impl dlb_core::Unique<Deliberation> for Deliberation {
    fn id(&self) -> Id<Deliberation> {
        self.id
    }
}

#[cfg(feature = "database")]
impl Deliberation {
    /// Rehydrates a `Deliberation` from a `SELECT * FROM deliberations`
    /// row. Column order must match [`schema::Deliberation::creates`].
    pub fn from_row(row: &dlb_store::Row) -> Self {
        Self {
            id: Id::from(row.get::<_, uuid::Uuid>("id")),
            creator: Id::from(row.get::<_, uuid::Uuid>("creator_id")),
            question: row.get("question"),
            description: row.get("description"),
            organization: row.get("organization"),
            phase: row.get::<_, String>("phase").parse().expect("valid phase"),
            current_tier: row.get::<_, i32>("current_tier") as TierNo,
            cell_size: row.get::<_, i32>("cell_size") as usize,
            xp_budget: row.get::<_, i32>("xp_budget") as Xp,
            allocation_mode: row
                .get::<_, String>("allocation_mode")
                .parse()
                .expect("valid allocation mode"),
            accumulation_enabled: row.get("accumulation_enabled"),
            submission_ends_at: row.get("submission_ends_at"),
            voting_timeout_ms: row.get::<_, i64>("voting_timeout_ms") as u64,
            second_vote_timeout_ms: row
                .get::<_, Option<i64>>("second_vote_timeout_ms")
                .map(|v| v as u64),
            accumulation_timeout_ms: row
                .get::<_, Option<i64>>("accumulation_timeout_ms")
                .map(|v| v as u64),
            idea_goal: row.get::<_, Option<i32>>("idea_goal").map(|v| v as u32),
            participant_goal: row
                .get::<_, Option<i32>>("participant_goal")
                .map(|v| v as u32),
            champion_id: row
                .get::<_, Option<uuid::Uuid>>("champion_id")
                .map(Id::from),
            challenge_round: row.get::<_, i32>("challenge_round") as BatchNo,
            completed_at: row.get("completed_at"),
            halted_at: row.get("halted_at"),
            accumulation_started_at: row.get("accumulation_started_at"),
        }
    }
}

#[cfg(feature = "database")]
mod schema {
    use super::*;
    use dlb_store::Schema;
    use dlb_store::DELIBERATIONS;

    impl Schema for Deliberation {
        fn name() -> &'static str {
            DELIBERATIONS
        }
        fn creates() -> &'static str {
            const_format::concatcp!(
                "CREATE TABLE IF NOT EXISTS ",
                DELIBERATIONS,
                " (
                    id                      UUID PRIMARY KEY,
                    creator_id              UUID NOT NULL,
                    question                TEXT NOT NULL,
                    description             TEXT,
                    organization            TEXT,
                    phase                   TEXT NOT NULL,
                    current_tier            INTEGER NOT NULL,
                    cell_size               INTEGER NOT NULL,
                    xp_budget               INTEGER NOT NULL,
                    allocation_mode         TEXT NOT NULL,
                    accumulation_enabled    BOOLEAN NOT NULL,
                    submission_ends_at      TIMESTAMPTZ,
                    voting_timeout_ms       BIGINT NOT NULL,
                    second_vote_timeout_ms  BIGINT,
                    accumulation_timeout_ms BIGINT,
                    idea_goal               INTEGER,
                    participant_goal        INTEGER,
                    champion_id             UUID,
                    challenge_round         INTEGER NOT NULL DEFAULT 0,
                    completed_at            TIMESTAMPTZ,
                    halted_at               TIMESTAMPTZ,
                    accumulation_started_at TIMESTAMPTZ
                );"
            )
        }
        fn indices() -> &'static str {
            const_format::concatcp!(
                "CREATE INDEX IF NOT EXISTS idx_deliberations_phase ON ",
                DELIBERATIONS,
                " (phase);"
            )
        }
    }
}
