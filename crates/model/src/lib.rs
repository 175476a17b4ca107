//! Persisted domain entities for the deliberation engine.
//!
//! Plain data types with no suspending behavior of their own — the
//! tally, assignment, and orchestration crates operate on these by
//! value and push every mutation back through `dlb-store`.
//!
//! ## Tournament State
//!
//! - [`Deliberation`] — the top-level tournament: phase, tier, timing config
//! - [`Idea`] — a submission and its status as it moves through tiers
//! - [`Cell`] — a tier/batch grouping of ideas and voters
//! - [`CellIdea`] / [`CellParticipant`] — cell membership join rows
//!
//! ## Voting & Discussion
//!
//! - [`Vote`] — one voter's XP allocation to one idea in one cell
//! - [`Comment`] / [`CommentUpvote`] — cell discussion and its up-pollination state
//! - [`Prediction`] — a spectator's champion pick and its resolution
//!
//! ## Membership
//!
//! - [`Membership`] — a voter's join record for a deliberation
mod cell;
mod comment;
mod deliberation;
mod idea;
mod membership;
mod phase;
mod prediction;
mod status;
mod vote;

pub use cell::Cell;
pub use cell::CellIdea;
pub use cell::CellParticipant;
pub use cell::CellStatus;
pub use comment::Comment;
pub use comment::CommentUpvote;
pub use deliberation::AllocationMode;
pub use deliberation::Deliberation;
pub use idea::Idea;
pub use membership::Member;
pub use membership::Membership;
pub use phase::Phase;
pub use prediction::Prediction;
pub use status::IdeaStatus;
pub use vote::Vote;
