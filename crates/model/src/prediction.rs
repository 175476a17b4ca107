use crate::Deliberation;
use crate::Idea;
use crate::Member;
use dlb_core::Id;
use dlb_core::TierNo;

/// A spectator's champion pick, made at a given tier and resolved once
/// that tier's cells complete (spec §4.5 step 5) and again at final
/// crowning.
#[derive(Debug, Clone)]
pub struct Prediction {
    member: Id<Member>,
    deliberation: Id<Deliberation>,
    tier_predicted_at: TierNo,
    predicted_idea: Id<Idea>,
    won_immediate: Option<bool>,
    idea_became_champion: Option<bool>,
}

impl Prediction {
    pub fn new(
        member: Id<Member>,
        deliberation: Id<Deliberation>,
        tier_predicted_at: TierNo,
        predicted_idea: Id<Idea>,
    ) -> Self {
        Self {
            member,
            deliberation,
            tier_predicted_at,
            predicted_idea,
            won_immediate: None,
            idea_became_champion: None,
        }
    }

    pub fn member(&self) -> Id<Member> {
        self.member
    }
    pub fn deliberation(&self) -> Id<Deliberation> {
        self.deliberation
    }
    pub fn tier_predicted_at(&self) -> TierNo {
        self.tier_predicted_at
    }
    pub fn predicted_idea(&self) -> Id<Idea> {
        self.predicted_idea
    }
    pub fn won_immediate(&self) -> Option<bool> {
        self.won_immediate
    }
    pub fn idea_became_champion(&self) -> Option<bool> {
        self.idea_became_champion
    }

    pub fn resolve_immediate(&mut self, winners: &[Id<Idea>]) {
        self.won_immediate = Some(winners.contains(&self.predicted_idea));
    }
    pub fn resolve_champion(&mut self, champion: Id<Idea>) {
        self.idea_became_champion = Some(self.predicted_idea == champion);
    }
}

#[cfg(feature = "database")]
mod schema {
    use super::*;
    use dlb_store::Schema;
    use dlb_store::DELIBERATIONS;
    use dlb_store::IDEAS;
    use dlb_store::PREDICTIONS;

    impl Schema for Prediction {
        fn name() -> &'static str {
            PREDICTIONS
        }
        fn creates() -> &'static str {
            const_format::concatcp!(
                "CREATE TABLE IF NOT EXISTS ",
                PREDICTIONS,
                " (
                    member_id             UUID NOT NULL,
                    deliberation_id       UUID NOT NULL REFERENCES ",
                DELIBERATIONS,
                "(id) ON DELETE CASCADE,
                    tier_predicted_at     INTEGER NOT NULL,
                    predicted_idea_id     UUID NOT NULL REFERENCES ",
                IDEAS,
                "(id) ON DELETE CASCADE,
                    won_immediate         BOOLEAN,
                    idea_became_champion  BOOLEAN,
                    PRIMARY KEY (member_id, deliberation_id, tier_predicted_at)
                );"
            )
        }
        fn indices() -> &'static str {
            const_format::concatcp!(
                "CREATE INDEX IF NOT EXISTS idx_predictions_idea ON ",
                PREDICTIONS,
                " (predicted_idea_id);"
            )
        }
    }
}
