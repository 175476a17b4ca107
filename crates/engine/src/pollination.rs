use crate::EngineError;
use dlb_core::up_pollination_threshold;
use dlb_core::Id;
use dlb_core::TierNo;
use dlb_core::UP_POLLINATION_FANOUT_CAP;
use dlb_model::Comment;
use dlb_model::Member;
use dlb_store::Store;

/// Records an upvote and, if it crosses the up-pollination threshold,
/// spreads the comment to every other VOTING cell sharing its idea and
/// every higher-tier cell that inherited that idea (spec §4.7).
///
/// Idempotent: the upvote insert is a unique `(comment, member)` row,
/// and only the insert that crosses the threshold performs the spread.
pub async fn upvote_comment(
    store: &Store,
    comment: Id<Comment>,
    member: Id<Member>,
    cell_size: usize,
    current_tier: TierNo,
) -> Result<bool, EngineError> {
    let inserted = store
        .conditional_update(
            "INSERT INTO comment_upvotes (comment_id, member_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
            &[&comment.inner(), &member.inner()],
        )
        .await?;
    if !inserted {
        return Ok(false);
    }

    let row = store
        .query_opt(
            "UPDATE comments SET upvote_count = upvote_count + 1 \
             WHERE id = $1 RETURNING upvote_count, idea_id, reach_tier",
            &[&comment.inner()],
        )
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("comment {comment}")))?;

    let upvotes: i32 = row.get(0);
    let idea: Option<uuid::Uuid> = row.get(1);
    let threshold = up_pollination_threshold(cell_size);

    if upvotes as usize != threshold {
        // Only the upvote that causes the crossing spreads; before or
        // long after crossing, nothing further happens here.
        return Ok(false);
    }
    let Some(idea) = idea else {
        return Ok(false);
    };

    spread(store, comment, idea, current_tier).await?;
    Ok(true)
}

/// Propagates a comment to other cells sharing `idea`: other VOTING
/// cells with the same idea, and higher-tier cells that idea advanced
/// into. Capped at `UP_POLLINATION_FANOUT_CAP` targets per pass (spec
/// §9 "Cross-cell read fan-out").
async fn spread(
    store: &Store,
    comment: Id<Comment>,
    idea: uuid::Uuid,
    current_tier: TierNo,
) -> Result<(), EngineError> {
    let targets = store
        .query(
            "SELECT DISTINCT c.id, c.tier FROM cells c
             JOIN cell_ideas ci ON ci.cell_id = c.id
             WHERE ci.idea_id = $1 AND c.status = 'voting'
             LIMIT $2",
            &[&idea, &(UP_POLLINATION_FANOUT_CAP as i64)],
        )
        .await?;

    let mut reach = current_tier;
    for row in &targets {
        let tier: i32 = row.get(1);
        reach = reach.max(tier as TierNo);
    }

    store
        .conditional_update(
            "UPDATE comments SET spread_count = spread_count + 1, \
             reach_tier = GREATEST(reach_tier, $1) WHERE id = $2",
            &[&(reach as i32), &comment.inner()],
        )
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_matches_spec_default() {
        assert_eq!(up_pollination_threshold(5), 3);
    }
}
