//! HTTP handlers for the inputs of spec §6, grouped the way the
//! reference architecture's own `hosting::handlers` module is: one
//! function per verb, each pulling its dependencies out of
//! `web::Data`, validating just enough to return a precise error, and
//! otherwise delegating straight to `dlb-engine`/`dlb-assign`.
use crate::error::respond;
use crate::state::AppState;
use actix_web::web;
use actix_web::HttpResponse;
use actix_web::Responder;
use dlb_auth::Auth;
use dlb_core::Id;
use dlb_dto::request::CastVoteRequest;
use dlb_dto::request::CreateDeliberationRequest;
use dlb_dto::request::EnterVotingRequest;
use dlb_dto::request::ForceCloseRequest;
use dlb_dto::request::JoinDeliberationRequest;
use dlb_dto::request::PostCommentRequest;
use dlb_dto::request::SubmitIdeaRequest;
use dlb_dto::request::SubmitPredictionRequest;
use dlb_dto::request::TriggerStartVotingRequest;
use dlb_dto::request::UpvoteCommentRequest;
use dlb_dto::response::CastVoteResponse;
use dlb_dto::response::DeliberationResponse;
use dlb_dto::response::EnterVotingResponse;
use dlb_dto::response::IdResponse;
use dlb_dto::response::IdeaResponse;
use dlb_engine::EngineError;
use dlb_model::Cell;
use dlb_model::Comment;
use dlb_model::Deliberation;
use dlb_model::Idea;
use dlb_model::Member;
use dlb_model::Membership;
use dlb_store::Store;
use std::time::Duration;
use std::time::SystemTime;

type HandlerResult = Result<HttpResponse, EngineError>;

fn ok(result: HandlerResult) -> HttpResponse {
    match result {
        Ok(response) => response,
        Err(err) => respond(err),
    }
}

async fn fetch_deliberation(store: &Store, id: Id<Deliberation>) -> Result<Deliberation, EngineError> {
    store
        .query_opt("SELECT * FROM deliberations WHERE id = $1", &[&id.inner()])
        .await?
        .map(|row| Deliberation::from_row(&row))
        .ok_or_else(|| EngineError::NotFound(format!("deliberation {id}")))
}

async fn fetch_cell(store: &Store, id: Id<Cell>) -> Result<Cell, EngineError> {
    store
        .query_opt("SELECT * FROM cells WHERE id = $1", &[&id.inner()])
        .await?
        .map(|row| Cell::from_row(&row))
        .ok_or_else(|| EngineError::NotFound(format!("cell {id}")))
}

async fn fetch_comment(store: &Store, id: Id<Comment>) -> Result<Comment, EngineError> {
    store
        .query_opt("SELECT * FROM comments WHERE id = $1", &[&id.inner()])
        .await?
        .map(|row| Comment::from_row(&row))
        .ok_or_else(|| EngineError::NotFound(format!("comment {id}")))
}

async fn cell_ideas(store: &Store, cell: Id<Cell>) -> Result<Vec<IdeaResponse>, EngineError> {
    let rows = store
        .query(
            "SELECT i.* FROM ideas i JOIN cell_ideas ci ON ci.idea_id = i.id WHERE ci.cell_id = $1",
            &[&cell.inner()],
        )
        .await?;
    Ok(rows.iter().map(Idea::from_row).map(|idea| IdeaResponse::from(&idea)).collect())
}

// ---------------------------------------------------------------------
// Deliberations
// ---------------------------------------------------------------------

pub async fn create_deliberation(
    state: web::Data<AppState>,
    auth: Auth,
    body: web::Json<CreateDeliberationRequest>,
) -> impl Responder {
    ok(create_deliberation_inner(state, auth, body.into_inner()).await)
}

async fn create_deliberation_inner(
    state: web::Data<AppState>,
    auth: Auth,
    body: CreateDeliberationRequest,
) -> HandlerResult {
    let creator: Id<Member> = auth.user().cast();
    let allocation_mode = if body.continuous_flow {
        dlb_model::AllocationMode::Fcfs
    } else {
        dlb_model::AllocationMode::Batch
    };
    let deliberation = Deliberation::new(
        creator,
        body.question,
        body.description,
        body.organization,
        body.cell_size,
        body.xp_budget,
        allocation_mode,
        body.accumulation_enabled,
        body.submission_ends_at_ms.map(|ms| SystemTime::now() + Duration::from_millis(ms)),
        body.voting_timeout_ms,
        body.second_vote_timeout_ms,
        body.accumulation_timeout_ms,
        body.idea_goal,
        body.participant_goal,
    );

    state
        .store
        .insert_unique(
            "INSERT INTO deliberations (
                id, creator_id, question, description, organization, phase, current_tier,
                cell_size, xp_budget, allocation_mode, accumulation_enabled, submission_ends_at,
                voting_timeout_ms, second_vote_timeout_ms, accumulation_timeout_ms,
                idea_goal, participant_goal, challenge_round
             ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,0)",
            &[
                &deliberation.id().inner(),
                &deliberation.creator().inner(),
                &deliberation.question(),
                &deliberation.description(),
                &deliberation.organization(),
                &deliberation.phase().to_string(),
                &(deliberation.current_tier() as i32),
                &(deliberation.cell_size() as i32),
                &(deliberation.xp_budget() as i32),
                &deliberation.allocation_mode().to_string(),
                &deliberation.accumulation_enabled(),
                &deliberation.submission_ends_at(),
                &(deliberation.voting_timeout_ms() as i64),
                &deliberation.second_vote_timeout_ms().map(|v| v as i64),
                &deliberation.accumulation_timeout_ms().map(|v| v as i64),
                &deliberation.idea_goal().map(|v| v as i32),
                &deliberation.participant_goal().map(|v| v as i32),
            ],
        )
        .await?;

    Ok(HttpResponse::Created().json(DeliberationResponse::from(&deliberation)))
}

pub async fn get_deliberation(state: web::Data<AppState>, path: web::Path<uuid::Uuid>) -> impl Responder {
    ok(get_deliberation_inner(state, path.into_inner()).await)
}

async fn get_deliberation_inner(state: web::Data<AppState>, id: uuid::Uuid) -> HandlerResult {
    let deliberation = fetch_deliberation(&state.store, Id::from(id)).await?;
    Ok(HttpResponse::Ok().json(DeliberationResponse::from(&deliberation)))
}

pub async fn submit_idea(
    state: web::Data<AppState>,
    auth: Auth,
    path: web::Path<uuid::Uuid>,
    body: web::Json<SubmitIdeaRequest>,
) -> impl Responder {
    ok(submit_idea_inner(state, auth, path.into_inner(), body.into_inner()).await)
}

async fn submit_idea_inner(
    state: web::Data<AppState>,
    auth: Auth,
    deliberation_id: uuid::Uuid,
    body: SubmitIdeaRequest,
) -> HandlerResult {
    let deliberation = fetch_deliberation(&state.store, Id::from(deliberation_id)).await?;
    let author: Id<Member> = auth.user().cast();

    let idea = match deliberation.phase() {
        dlb_model::Phase::Submission => Idea::submit(deliberation.id(), author, body.text),
        dlb_model::Phase::Voting | dlb_model::Phase::Accumulating => {
            Idea::submit_late(deliberation.id(), author, body.text)
        }
        dlb_model::Phase::Completed => {
            return Err(EngineError::precondition(
                "DELIBERATION_COMPLETED",
                "deliberation has already completed",
            ));
        }
    };

    state
        .store
        .insert_unique(
            "INSERT INTO ideas (
                id, deliberation_id, author_id, text, status, tier, total_xp, total_votes,
                losses, is_champion, is_new
             ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)",
            &[
                &idea.id().inner(),
                &idea.deliberation().inner(),
                &idea.author().inner(),
                &idea.text(),
                &idea.status().to_string(),
                &(idea.tier() as i32),
                &(idea.total_xp() as i32),
                &(idea.total_votes() as i32),
                &(idea.losses() as i32),
                &idea.is_champion(),
                &idea.is_new(),
            ],
        )
        .await?;

    Ok(HttpResponse::Created().json(IdResponse { id: idea.id().inner() }))
}

pub async fn join_deliberation(
    state: web::Data<AppState>,
    auth: Auth,
    path: web::Path<uuid::Uuid>,
    _body: web::Json<JoinDeliberationRequest>,
) -> impl Responder {
    ok(join_deliberation_inner(state, auth, path.into_inner()).await)
}

async fn join_deliberation_inner(
    state: web::Data<AppState>,
    auth: Auth,
    deliberation_id: uuid::Uuid,
) -> HandlerResult {
    let deliberation = fetch_deliberation(&state.store, Id::from(deliberation_id)).await?;
    let member: Id<Member> = auth.user().cast();
    let membership = Membership::new(deliberation.id(), member, SystemTime::now());
    state
        .store
        .insert_unique(
            "INSERT INTO memberships (id, deliberation_id, member_id, joined_at) \
             VALUES ($1, $2, $3, $4) ON CONFLICT (deliberation_id, member_id) DO NOTHING",
            &[
                &membership.id().inner(),
                &membership.deliberation().inner(),
                &membership.member().inner(),
                &membership.joined_at(),
            ],
        )
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn enter_voting(
    state: web::Data<AppState>,
    auth: Auth,
    path: web::Path<uuid::Uuid>,
    _body: web::Json<EnterVotingRequest>,
) -> impl Responder {
    ok(enter_voting_inner(state, auth, path.into_inner()).await)
}

async fn enter_voting_inner(
    state: web::Data<AppState>,
    auth: Auth,
    deliberation_id: uuid::Uuid,
) -> HandlerResult {
    let deliberation = fetch_deliberation(&state.store, Id::from(deliberation_id)).await?;
    if deliberation.phase() != dlb_model::Phase::Voting
        && deliberation.phase() != dlb_model::Phase::Accumulating
    {
        return Err(EngineError::precondition(
            "WRONG_PHASE",
            "deliberation is not accepting voters",
        ));
    }
    let member: Id<Member> = auth.user().cast();
    let tier = deliberation.current_tier();

    let cell_id = if deliberation.is_continuous_flow() {
        let timeout = Duration::from_millis(deliberation.voting_timeout_ms());
        state
            .assigner
            .enter_fcfs(&deliberation, tier, member, timeout)
            .await?
    } else {
        let row = state
            .store
            .query_opt(
                "SELECT cp.cell_id FROM cell_participants cp
                 JOIN cells c ON c.id = cp.cell_id
                 WHERE c.deliberation_id = $1 AND c.tier = $2 AND cp.member_id = $3",
                &[&deliberation.id().inner(), &(tier as i32), &member.inner()],
            )
            .await?;
        row.map(|r| Id::<Cell>::from(r.get::<_, uuid::Uuid>(0)))
    };

    let Some(cell_id) = cell_id else {
        return Ok(HttpResponse::NoContent().finish());
    };

    let ideas = cell_ideas(&state.store, cell_id).await?;
    Ok(HttpResponse::Ok().json(EnterVotingResponse {
        cell_id,
        tier,
        ideas,
    }))
}

pub async fn trigger_start_voting(
    state: web::Data<AppState>,
    auth: Auth,
    path: web::Path<uuid::Uuid>,
    _body: web::Json<TriggerStartVotingRequest>,
) -> impl Responder {
    ok(trigger_start_voting_inner(state, auth, path.into_inner()).await)
}

async fn trigger_start_voting_inner(
    state: web::Data<AppState>,
    auth: Auth,
    deliberation_id: uuid::Uuid,
) -> HandlerResult {
    let deliberation = fetch_deliberation(&state.store, Id::from(deliberation_id)).await?;
    require_creator(&deliberation, &auth)?;
    if deliberation.phase() != dlb_model::Phase::Submission {
        return Err(EngineError::precondition(
            "WRONG_PHASE",
            "deliberation is not in the submission phase",
        ));
    }
    let started = dlb_engine::start_voting(&state.store, &state.assigner, &deliberation).await?;
    if !started {
        return Err(EngineError::conflict("ALREADY_STARTED"));
    }
    Ok(HttpResponse::NoContent().finish())
}

pub async fn force_close(
    state: web::Data<AppState>,
    auth: Auth,
    path: web::Path<uuid::Uuid>,
    _body: web::Json<ForceCloseRequest>,
) -> impl Responder {
    ok(force_close_inner(state, auth, path.into_inner()).await)
}

async fn force_close_inner(
    state: web::Data<AppState>,
    auth: Auth,
    deliberation_id: uuid::Uuid,
) -> HandlerResult {
    let deliberation = fetch_deliberation(&state.store, Id::from(deliberation_id)).await?;
    require_creator(&deliberation, &auth)?;
    if deliberation.phase() != dlb_model::Phase::Voting {
        return Err(EngineError::precondition(
            "WRONG_PHASE",
            "deliberation has no open voting round",
        ));
    }
    let outcomes = dlb_engine::force_close(&state.store, &state.assigner, &deliberation).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "closedCells": outcomes.len() })))
}

pub async fn submit_prediction(
    state: web::Data<AppState>,
    auth: Auth,
    path: web::Path<uuid::Uuid>,
    body: web::Json<SubmitPredictionRequest>,
) -> impl Responder {
    ok(submit_prediction_inner(state, auth, path.into_inner(), body.into_inner()).await)
}

async fn submit_prediction_inner(
    state: web::Data<AppState>,
    auth: Auth,
    deliberation_id: uuid::Uuid,
    body: SubmitPredictionRequest,
) -> HandlerResult {
    let deliberation = fetch_deliberation(&state.store, Id::from(deliberation_id)).await?;
    let member: Id<Member> = auth.user().cast();
    state
        .store
        .insert_unique(
            "INSERT INTO predictions (member_id, deliberation_id, tier_predicted_at, predicted_idea_id) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (member_id, deliberation_id, tier_predicted_at) DO NOTHING",
            &[
                &member.inner(),
                &deliberation.id().inner(),
                &(deliberation.current_tier() as i32),
                &body.predicted_idea_id.inner(),
            ],
        )
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

fn require_creator(deliberation: &Deliberation, auth: &Auth) -> Result<(), EngineError> {
    let caller: Id<Member> = auth.user().cast();
    if deliberation.is_creator(caller) {
        Ok(())
    } else {
        Err(EngineError::precondition(
            "NOT_CREATOR",
            "only the deliberation's creator may perform this action",
        ))
    }
}

// ---------------------------------------------------------------------
// Cells
// ---------------------------------------------------------------------

pub async fn cast_vote(
    state: web::Data<AppState>,
    auth: Auth,
    path: web::Path<uuid::Uuid>,
    body: web::Json<CastVoteRequest>,
) -> impl Responder {
    ok(cast_vote_inner(state, auth, path.into_inner(), body.into_inner()).await)
}

async fn cast_vote_inner(
    state: web::Data<AppState>,
    auth: Auth,
    cell_id: uuid::Uuid,
    body: CastVoteRequest,
) -> HandlerResult {
    let cell = fetch_cell(&state.store, Id::from(cell_id)).await?;
    if cell.status() != dlb_model::CellStatus::Voting {
        return Err(EngineError::precondition("CELL_NOT_VOTING", "cell is not open for voting"));
    }
    let deliberation = fetch_deliberation(&state.store, cell.deliberation()).await?;
    let member: Id<Member> = auth.user().cast();

    let is_participant = state
        .store
        .query_opt(
            "SELECT 1 FROM cell_participants WHERE cell_id = $1 AND member_id = $2",
            &[&cell.id().inner(), &member.inner()],
        )
        .await?
        .is_some();
    if !is_participant {
        return Err(EngineError::precondition(
            "NOT_A_PARTICIPANT",
            "caller is not assigned to this cell",
        ));
    }

    let already_voted = state
        .store
        .query_opt(
            "SELECT 1 FROM votes WHERE cell_id = $1 AND member_id = $2",
            &[&cell.id().inner(), &member.inner()],
        )
        .await?
        .is_some();
    if already_voted {
        return Err(EngineError::precondition("ALREADY_VOTED", "voter already voted in this cell"));
    }

    let allocations: Vec<_> = body.allocations.into_iter().filter(|a| a.xp > 0).collect();
    if allocations.is_empty() {
        return Err(EngineError::precondition(
            "EMPTY_ALLOCATION",
            "at least one positive XP allocation is required",
        ));
    }

    let cell_idea_ids: std::collections::HashSet<uuid::Uuid> = state
        .store
        .query("SELECT idea_id FROM cell_ideas WHERE cell_id = $1", &[&cell.id().inner()])
        .await?
        .iter()
        .map(|row| row.get::<_, uuid::Uuid>(0))
        .collect();
    if allocations.iter().any(|a| !cell_idea_ids.contains(&a.idea_id.inner())) {
        return Err(EngineError::precondition(
            "UNKNOWN_IDEA",
            "allocation targets an idea not competing in this cell",
        ));
    }

    let raw: Vec<u32> = allocations.iter().map(|a| a.xp).collect();
    let normalized = dlb_tally::normalize_allocations(&raw, deliberation.xp_budget());

    for (allocation, xp) in allocations.iter().zip(normalized) {
        state
            .store
            .insert_unique(
                "INSERT INTO votes (cell_id, member_id, idea_id, xp_points) VALUES ($1, $2, $3, $4)",
                &[&cell.id().inner(), &member.inner(), &allocation.idea_id.inner(), &(xp as i32)],
            )
            .await?;
    }

    let participant_count: i64 = state
        .store
        .query_opt(
            "SELECT count(*) FROM cell_participants WHERE cell_id = $1",
            &[&cell.id().inner()],
        )
        .await?
        .map(|r| r.get(0))
        .unwrap_or(0);
    let voted_count: i64 = state
        .store
        .query_opt(
            "SELECT count(DISTINCT member_id) FROM votes WHERE cell_id = $1",
            &[&cell.id().inner()],
        )
        .await?
        .map(|r| r.get(0))
        .unwrap_or(0);

    let triggered_completion = voted_count >= participant_count;
    if triggered_completion {
        dlb_engine::complete_cell(&state.store, &state.assigner, &deliberation, cell.id(), SystemTime::now())
            .await?;
    }

    Ok(HttpResponse::Ok().json(CastVoteResponse {
        cell_id: cell.id(),
        triggered_completion,
    }))
}

pub async fn post_comment(
    state: web::Data<AppState>,
    auth: Auth,
    path: web::Path<uuid::Uuid>,
    body: web::Json<PostCommentRequest>,
) -> impl Responder {
    ok(post_comment_inner(state, auth, path.into_inner(), body.into_inner()).await)
}

async fn post_comment_inner(
    state: web::Data<AppState>,
    auth: Auth,
    cell_id: uuid::Uuid,
    body: PostCommentRequest,
) -> HandlerResult {
    let cell = fetch_cell(&state.store, Id::from(cell_id)).await?;
    let member: Id<Member> = auth.user().cast();
    let comment = Comment::post(cell.id(), member, body.idea_id, body.text, body.reply_to_id, cell.tier());

    state
        .store
        .insert_unique(
            "INSERT INTO comments (
                id, cell_id, member_id, idea_id, text, upvote_count, spread_count,
                reach_tier, is_removed, reply_to_id
             ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)",
            &[
                &comment.id().inner(),
                &comment.cell().inner(),
                &comment.member().inner(),
                &comment.idea().map(|i| i.inner()),
                &comment.text(),
                &(comment.upvote_count() as i32),
                &(comment.spread_count() as i32),
                &(comment.reach_tier() as i32),
                &comment.is_removed(),
                &comment.reply_to().map(|c| c.inner()),
            ],
        )
        .await?;

    Ok(HttpResponse::Created().json(IdResponse { id: comment.id().inner() }))
}

// ---------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------

pub async fn upvote_comment(
    state: web::Data<AppState>,
    auth: Auth,
    path: web::Path<uuid::Uuid>,
    _body: web::Json<UpvoteCommentRequest>,
) -> impl Responder {
    ok(upvote_comment_inner(state, auth, path.into_inner()).await)
}

async fn upvote_comment_inner(
    state: web::Data<AppState>,
    auth: Auth,
    comment_id: uuid::Uuid,
) -> HandlerResult {
    let comment = fetch_comment(&state.store, Id::from(comment_id)).await?;
    let cell = fetch_cell(&state.store, comment.cell()).await?;
    let deliberation = fetch_deliberation(&state.store, cell.deliberation()).await?;
    let member: Id<Member> = auth.user().cast();

    let _spread = dlb_engine::upvote_comment(
        &state.store,
        comment.id(),
        member,
        deliberation.cell_size(),
        cell.tier(),
    )
    .await?;

    Ok(HttpResponse::NoContent().finish())
}
