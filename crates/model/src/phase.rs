/// A deliberation's position in the SUBMISSION → VOTING → (COMPLETED |
/// ACCUMULATING → VOTING …) state machine (spec §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "client", serde(rename_all = "snake_case"))]
pub enum Phase {
    Submission,
    Voting,
    Accumulating,
    Completed,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Submission => "submission",
            Self::Voting => "voting",
            Self::Accumulating => "accumulating",
            Self::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Phase {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "submission" => Ok(Self::Submission),
            "voting" => Ok(Self::Voting),
            "accumulating" => Ok(Self::Accumulating),
            "completed" => Ok(Self::Completed),
            other => Err(format!("unknown phase: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every phase must survive a `to_string()` → `parse()` round trip
    /// unchanged, since this is exactly what happens writing a row to
    /// `deliberations.phase` and rehydrating it afterward.
    #[test]
    fn every_phase_round_trips_through_its_string_form() {
        let all = [
            Phase::Submission,
            Phase::Voting,
            Phase::Accumulating,
            Phase::Completed,
        ];
        for phase in all {
            let round_tripped: Phase = phase.to_string().parse().expect("valid phase");
            assert_eq!(round_tripped, phase);
        }
    }

    #[test]
    fn unknown_phase_string_is_rejected() {
        assert!("not_a_phase".parse::<Phase>().is_err());
    }
}
