use dlb_core::Id;
use dlb_core::TierNo;
use dlb_core::Xp;
use dlb_model::AllocationMode;
use dlb_model::Cell;
use dlb_model::Comment;
use dlb_model::Deliberation;
use dlb_model::Idea;
use dlb_model::IdeaStatus;
use dlb_model::Phase;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct IdeaResponse {
    pub id: Id<Idea>,
    pub deliberation_id: Id<Deliberation>,
    pub text: String,
    pub status: IdeaStatus,
    pub tier: TierNo,
    pub total_xp: Xp,
    pub total_votes: u32,
    pub is_champion: bool,
    pub is_new: bool,
}

impl From<&Idea> for IdeaResponse {
    fn from(idea: &Idea) -> Self {
        Self {
            id: idea.id(),
            deliberation_id: idea.deliberation(),
            text: idea.text().to_owned(),
            status: idea.status(),
            tier: idea.tier(),
            total_xp: idea.total_xp(),
            total_votes: idea.total_votes(),
            is_champion: idea.is_champion(),
            is_new: idea.is_new(),
        }
    }
}

/// `enterVoting` response: `{cellId, ideas[]} | null` (spec §6). The
/// `null` case is represented by the handler returning `204 No
/// Content` rather than this type, since every field here is required
/// once a cell has actually been assigned.
#[derive(Debug, Serialize)]
pub struct EnterVotingResponse {
    pub cell_id: Id<Cell>,
    pub tier: TierNo,
    pub ideas: Vec<IdeaResponse>,
}

#[derive(Debug, Serialize)]
pub struct DeliberationResponse {
    pub id: Id<Deliberation>,
    pub creator_id: Id<dlb_model::Member>,
    pub question: String,
    pub description: Option<String>,
    pub organization: Option<String>,
    pub phase: Phase,
    pub current_tier: TierNo,
    pub cell_size: usize,
    pub xp_budget: Xp,
    pub allocation_mode: AllocationMode,
    pub accumulation_enabled: bool,
    pub champion_id: Option<Id<Idea>>,
    pub challenge_round: u32,
}

impl From<&Deliberation> for DeliberationResponse {
    fn from(d: &Deliberation) -> Self {
        Self {
            id: d.id(),
            creator_id: d.creator(),
            question: d.question().to_owned(),
            description: d.description().map(str::to_owned),
            organization: d.organization().map(str::to_owned),
            phase: d.phase(),
            current_tier: d.current_tier(),
            cell_size: d.cell_size(),
            xp_budget: d.xp_budget(),
            allocation_mode: d.allocation_mode(),
            accumulation_enabled: d.accumulation_enabled(),
            champion_id: d.champion_id(),
            challenge_round: d.challenge_round(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: Id<Comment>,
    pub cell_id: Id<Cell>,
    pub idea_id: Option<Id<Idea>>,
    pub text: String,
    pub upvote_count: u32,
    pub spread_count: u32,
    pub reach_tier: TierNo,
}

impl From<&Comment> for CommentResponse {
    fn from(c: &Comment) -> Self {
        Self {
            id: c.id(),
            cell_id: c.cell(),
            idea_id: c.idea(),
            text: c.text().to_owned(),
            upvote_count: c.upvote_count(),
            spread_count: c.spread_count(),
            reach_tier: c.reach_tier(),
        }
    }
}

/// `castVote`'s immediate acknowledgment; `triggered_completion` is
/// true when this was the last outstanding vote in the cell and it
/// flipped to COMPLETED as a result (spec §6: "if all participants
/// have voted, triggers `processCellResults`").
#[derive(Debug, Serialize)]
pub struct CastVoteResponse {
    pub cell_id: Id<Cell>,
    pub triggered_completion: bool,
}

/// Bare-ID acknowledgment for `submitIdea` / `postComment`, which spec
/// §6 specifies as returning just the new row's id.
#[derive(Debug, Serialize)]
pub struct IdResponse {
    pub id: uuid::Uuid,
}

/// A stable error code + human message, per spec §7: "User-visible
/// failures include a stable code ... and a human message."
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}
