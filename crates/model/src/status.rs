/// An idea's status as it competes through tiers (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "client", serde(rename_all = "snake_case"))]
pub enum IdeaStatus {
    Submitted,
    InVoting,
    Advancing,
    Winner,
    Defending,
    Eliminated,
    Pending,
    Benched,
    Retired,
}

impl std::fmt::Display for IdeaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Submitted => "submitted",
            Self::InVoting => "in_voting",
            Self::Advancing => "advancing",
            Self::Winner => "winner",
            Self::Defending => "defending",
            Self::Eliminated => "eliminated",
            Self::Pending => "pending",
            Self::Benched => "benched",
            Self::Retired => "retired",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for IdeaStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "submitted" => Ok(Self::Submitted),
            "in_voting" => Ok(Self::InVoting),
            "advancing" => Ok(Self::Advancing),
            "winner" => Ok(Self::Winner),
            "defending" => Ok(Self::Defending),
            "eliminated" => Ok(Self::Eliminated),
            "pending" => Ok(Self::Pending),
            "benched" => Ok(Self::Benched),
            "retired" => Ok(Self::Retired),
            other => Err(format!("unknown idea status: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every status must survive a `to_string()` → `parse()` round
    /// trip unchanged, since this is exactly what happens writing a row
    /// to `ideas.status` and rehydrating it afterward.
    #[test]
    fn every_status_round_trips_through_its_string_form() {
        let all = [
            IdeaStatus::Submitted,
            IdeaStatus::InVoting,
            IdeaStatus::Advancing,
            IdeaStatus::Winner,
            IdeaStatus::Defending,
            IdeaStatus::Eliminated,
            IdeaStatus::Pending,
            IdeaStatus::Benched,
            IdeaStatus::Retired,
        ];
        for status in all {
            let round_tripped: IdeaStatus = status.to_string().parse().expect("valid status");
            assert_eq!(round_tripped, status);
        }
    }

    #[test]
    fn unknown_status_string_is_rejected() {
        assert!("not_a_status".parse::<IdeaStatus>().is_err());
    }
}
