use serde::{Deserialize, Serialize};

use super::common::{TeamRef, null_as_default};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FixtureInfo {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FixtureTeams {
    #[serde(default, deserialize_with = "null_as_default")]
    pub home: TeamRef,
    #[serde(default, deserialize_with = "null_as_default")]
    pub away: TeamRef,
}

/// The parts of a `fixtures` item the notification job relies on
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FixtureSummary {
    #[serde(default, deserialize_with = "null_as_default")]
    pub fixture: FixtureInfo,
    #[serde(default, deserialize_with = "null_as_default")]
    pub teams: FixtureTeams,
}

impl FixtureSummary {
    pub fn id(&self) -> Option<i64> {
        self.fixture.id
    }

    /// True when `is_favorite` accepts either side's team id
    pub fn involves_any<F>(&self, is_favorite: F) -> bool
    where
        F: FnMut(i64) -> bool,
    {
        [self.teams.home.id, self.teams.away.id]
            .into_iter()
            .flatten()
            .any(is_favorite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn test_fixture_summary_from_upstream_shape() {
        let item = json!({
            "fixture": {
                "id": 1035037,
                "date": "2024-01-15T20:00:00+00:00",
                "status": {"short": "1H"}
            },
            "league": {"id": 39},
            "teams": {
                "home": {"id": 33, "name": "Manchester United", "winner": null},
                "away": {"id": 40, "name": "Liverpool", "winner": null}
            },
            "goals": {"home": 1, "away": 0}
        });

        let summary: FixtureSummary = serde_json::from_value(item).unwrap();
        assert_eq!(summary.id(), Some(1035037));
        assert_eq!(summary.teams.home.id, Some(33));
        assert_eq!(summary.teams.away.display_name(), "Liverpool");
    }

    #[test]
    fn test_fixture_summary_with_null_sections() {
        let summary: FixtureSummary =
            serde_json::from_value(json!({"fixture": null, "teams": {"home": null}})).unwrap();
        assert_eq!(summary.id(), None);
        assert_eq!(summary.teams.home, TeamRef::default());
    }

    #[test]
    fn test_involves_any() {
        let summary: FixtureSummary = serde_json::from_value(json!({
            "fixture": {"id": 1},
            "teams": {"home": {"id": 10}, "away": {"id": 20}}
        }))
        .unwrap();
        let favorites: HashSet<i64> = [20].into_iter().collect();
        assert!(summary.involves_any(|id| favorites.contains(&id)));
        assert!(!summary.involves_any(|id| id == 30));
    }
}
