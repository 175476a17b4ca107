/// Table for deliberations (question, phase, tier, timing config).
#[rustfmt::skip]
pub const DELIBERATIONS:     &str = "deliberations";
/// Table for submitted ideas and their tournament status.
#[rustfmt::skip]
pub const IDEAS:             &str = "ideas";
/// Table for cells (tier/batch groupings of ideas and voters).
#[rustfmt::skip]
pub const CELLS:             &str = "cells";
/// Join table: which ideas compete in which cell.
#[rustfmt::skip]
pub const CELL_IDEAS:        &str = "cell_ideas";
/// Join table: which voters are assigned to which cell.
#[rustfmt::skip]
pub const CELL_PARTICIPANTS: &str = "cell_participants";
/// Table for XP allocation rows.
#[rustfmt::skip]
pub const VOTES:             &str = "votes";
/// Table for cell comments.
#[rustfmt::skip]
pub const COMMENTS:          &str = "comments";
/// Table for comment upvotes, unique per (comment, voter).
#[rustfmt::skip]
pub const COMMENT_UPVOTES:   &str = "comment_upvotes";
/// Table for spectator champion predictions.
#[rustfmt::skip]
pub const PREDICTIONS:       &str = "predictions";
/// Table for deliberation membership (join events).
#[rustfmt::skip]
pub const MEMBERSHIPS:       &str = "memberships";
