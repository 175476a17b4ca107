//! Startup schema migration: one `CREATE TABLE IF NOT EXISTS` /
//! `CREATE INDEX IF NOT EXISTS` pair per persisted entity, run once
//! before the server starts accepting connections.
use dlb_auth::Session;
use dlb_model::Cell;
use dlb_model::CellIdea;
use dlb_model::CellParticipant;
use dlb_model::Comment;
use dlb_model::CommentUpvote;
use dlb_model::Deliberation;
use dlb_model::Idea;
use dlb_model::Membership;
use dlb_model::Prediction;
use dlb_model::Vote;
use dlb_store::Schema;
use tokio_postgres::Client;

pub async fn run(client: &Client) -> Result<(), dlb_store::StoreError> {
    dlb_store::migrate(
        client,
        &[
            Deliberation::creates(),
            Deliberation::indices(),
            Idea::creates(),
            Idea::indices(),
            Cell::creates(),
            Cell::indices(),
            CellIdea::creates(),
            CellIdea::indices(),
            CellParticipant::creates(),
            CellParticipant::indices(),
            Vote::creates(),
            Vote::indices(),
            Comment::creates(),
            Comment::indices(),
            CommentUpvote::creates(),
            CommentUpvote::indices(),
            Prediction::creates(),
            Prediction::indices(),
            Membership::creates(),
            Membership::indices(),
            Session::creates(),
            Session::indices(),
        ],
    )
    .await
}
