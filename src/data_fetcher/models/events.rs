use serde::{Deserialize, Serialize};

use super::common::{TeamRef, null_as_default};

/// One item of the `fixtures/events` feed
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FixtureEvent {
    #[serde(default, deserialize_with = "null_as_default")]
    pub team: TeamRef,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl FixtureEvent {
    /// Whether the event counts as a goal for its team.
    ///
    /// The provider files missed penalties under the Goal type too, and VAR
    /// reviews ("Goal cancelled") under their own type; neither is a goal.
    pub fn is_goal(&self) -> bool {
        let missed = self
            .detail
            .as_deref()
            .is_some_and(|detail| detail.eq_ignore_ascii_case("Missed Penalty"));
        self.kind.as_deref() == Some("Goal") && !missed
    }

    pub fn is_goal_for(&self, team_id: i64) -> bool {
        self.team.id == Some(team_id) && self.is_goal()
    }
}

/// Counts goal events credited to `team_id`
pub fn count_goals_for(events: &[FixtureEvent], team_id: Option<i64>) -> u32 {
    let Some(team_id) = team_id else {
        return 0;
    };
    let count = events.iter().filter(|e| e.is_goal_for(team_id)).count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// One item of the `fixtures/lineups` feed; only the team matters here
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LineupEntry {
    #[serde(default, deserialize_with = "null_as_default")]
    pub team: TeamRef,
    #[serde(default)]
    pub formation: Option<String>,
}
