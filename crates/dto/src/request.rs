use dlb_core::Id;
use dlb_core::Xp;
use dlb_model::Comment;
use dlb_model::Deliberation;
use dlb_model::Idea;
use serde::Deserialize;

/// `submitIdea(deliberationId, authorId, text)` (spec §6).
#[derive(Debug, Deserialize)]
pub struct SubmitIdeaRequest {
    pub deliberation_id: Id<Deliberation>,
    pub text: String,
}

/// `joinDeliberation(deliberationId, userId)`.
#[derive(Debug, Deserialize)]
pub struct JoinDeliberationRequest {
    pub deliberation_id: Id<Deliberation>,
}

/// `enterVoting(deliberationId, userId)`. The userId itself is carried
/// by the caller's bearer session, not this body.
#[derive(Debug, Deserialize)]
pub struct EnterVotingRequest {
    pub deliberation_id: Id<Deliberation>,
}

/// One line of a `castVote` allocation vector.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct XpAllocation {
    pub idea_id: Id<Idea>,
    pub xp: u32,
}

/// `castVote(cellId, userId, allocations[{ideaId, xp}])`. `xp` values
/// need not sum to the cell's budget; [`dlb_tally::normalize_allocations`]
/// is applied before the rows are written (spec §4.4).
#[derive(Debug, Deserialize)]
pub struct CastVoteRequest {
    pub allocations: Vec<XpAllocation>,
}

/// `postComment(cellId, userId, text, ideaId?, replyToId?)`.
#[derive(Debug, Deserialize)]
pub struct PostCommentRequest {
    pub text: String,
    pub idea_id: Option<Id<Idea>>,
    pub reply_to_id: Option<Id<Comment>>,
}

/// `upvoteComment(commentId, userId)` has no body beyond the path and
/// caller identity; nothing to deserialize.
#[derive(Debug, Deserialize, Default)]
pub struct UpvoteCommentRequest {}

/// `triggerStartVoting(deliberationId, callerId)`, creator-only.
#[derive(Debug, Deserialize, Default)]
pub struct TriggerStartVotingRequest {}

/// `forceClose(deliberationId, callerId)`, creator-only.
#[derive(Debug, Deserialize, Default)]
pub struct ForceCloseRequest {}

/// A spectator champion pick, not named as a top-level verb in spec §6
/// but required to populate the `Prediction` rows spec §3 and §4.5
/// step 5 describe.
#[derive(Debug, Deserialize)]
pub struct SubmitPredictionRequest {
    pub predicted_idea_id: Id<Idea>,
}

/// Deliberation-creation parameters. Spec §6 treats creation as an
/// external concern but must still shape the `Deliberation` fields of
/// §3 somehow; this is that shape.
#[derive(Debug, Deserialize)]
pub struct CreateDeliberationRequest {
    pub question: String,
    pub description: Option<String>,
    pub organization: Option<String>,
    #[serde(default = "default_cell_size")]
    pub cell_size: usize,
    #[serde(default = "default_xp_budget")]
    pub xp_budget: Xp,
    #[serde(default)]
    pub continuous_flow: bool,
    #[serde(default)]
    pub accumulation_enabled: bool,
    pub submission_ends_at_ms: Option<u64>,
    #[serde(default = "default_voting_timeout_ms")]
    pub voting_timeout_ms: u64,
    pub second_vote_timeout_ms: Option<u64>,
    pub accumulation_timeout_ms: Option<u64>,
    pub idea_goal: Option<u32>,
    pub participant_goal: Option<u32>,
}

fn default_cell_size() -> usize {
    dlb_core::DEFAULT_CELL_SIZE
}
fn default_xp_budget() -> Xp {
    dlb_core::DEFAULT_XP_BUDGET
}
fn default_voting_timeout_ms() -> u64 {
    30_000
}
