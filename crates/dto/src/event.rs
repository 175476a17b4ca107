use dlb_core::BatchNo;
use dlb_core::Id;
use dlb_core::TierNo;
use dlb_model::Cell;
use dlb_model::Deliberation;
use dlb_model::Idea;
use dlb_model::Phase;
use serde::Serialize;

/// Events emitted to the external notification sink (spec §6
/// "Outputs emitted"). The engine never delivers these itself — it
/// only produces the value; an external notification dispatcher (out
/// of scope per spec §1) consumes it.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationEvent {
    CellCompleted {
        deliberation_id: Id<Deliberation>,
        cell_id: Id<Cell>,
        tier: TierNo,
        winner_ids: Vec<Id<Idea>>,
        loser_ids: Vec<Id<Idea>>,
    },
    TierAdvanced {
        deliberation_id: Id<Deliberation>,
        tier: TierNo,
        cell_ids: Vec<Id<Cell>>,
    },
    ChampionDeclared {
        deliberation_id: Id<Deliberation>,
        idea_id: Id<Idea>,
        challenge_round: BatchNo,
    },
    PhaseChanged {
        deliberation_id: Id<Deliberation>,
        phase: Phase,
    },
    ChallengeRoundStarted {
        deliberation_id: Id<Deliberation>,
        challenge_round: BatchNo,
        cell_id: Id<Cell>,
    },
}

/// Tag identifying which kind of domain event an [`AuditRecord`]
/// describes (spec §6 "Optional audit records ... INIT, IDEA, CELL,
/// VOTE, TIER, PHASE, CHAMPION").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    Init,
    Idea,
    Cell,
    Vote,
    Tier,
    Phase,
    Champion,
}

/// A small tagged payload fed to an external chain recorder (spec §6).
/// The engine itself never talks to a chain; it only shapes this
/// record and hands it to whatever recorder the caller wires in,
/// identified by a [`dlb_fingerprint`] tag rather than a raw UUID so
/// the on-chain record doesn't leak internal row identifiers.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    pub kind: AuditKind,
    pub deliberation_id: Id<Deliberation>,
    pub tag: String,
    pub detail: String,
}

impl AuditRecord {
    pub fn new(
        kind: AuditKind,
        deliberation_id: Id<Deliberation>,
        tag: String,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            deliberation_id,
            tag,
            detail: detail.into(),
        }
    }
}
