//! Team schedule lookup with a chain of progressively looser queries

use tracing::{debug, info, instrument};

use super::core::{ApiPayload, FetchOptions, UpstreamClient};
use crate::constants::schedule::{LAST_FIXTURES, NEXT_FIXTURES};
use crate::error::AppError;

/// Query for `/api/team-schedule`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleQuery {
    pub team: i64,
    pub date: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Builds the ordered parameter sets to try for a team schedule.
///
/// The provider often returns nothing for a season that has not been
/// published yet, so looser queries follow the season lookup.
pub fn schedule_attempts(query: &ScheduleQuery, season: i32) -> Vec<Vec<(&'static str, String)>> {
    let team = query.team.to_string();
    let mut attempts = vec![
        vec![("team", team.clone()), ("season", season.to_string())],
        vec![("team", team.clone()), ("next", NEXT_FIXTURES.to_string())],
    ];

    if let Some(date) = &query.date {
        attempts.push(vec![("team", team.clone()), ("date", date.clone())]);
    } else if let (Some(from), Some(to)) = (&query.from, &query.to) {
        attempts.push(vec![
            ("team", team.clone()),
            ("from", from.clone()),
            ("to", to.clone()),
        ]);
    }

    attempts.push(vec![("team", team.clone()), ("season", (season + 1).to_string())]);
    attempts.push(vec![("team", team), ("last", LAST_FIXTURES.to_string())]);
    attempts
}

impl UpstreamClient {
    /// Fetches a team's fixtures, walking [`schedule_attempts`] until one
    /// returns a non-empty list.
    ///
    /// A quota rejection stops the walk and is returned. When every step was
    /// unavailable the result is unavailable; otherwise it is the last empty
    /// result.
    #[instrument(skip(self), fields(team = query.team))]
    pub async fn team_schedule(
        &self,
        query: &ScheduleQuery,
        season: i32,
        options: FetchOptions,
    ) -> Result<ApiPayload, AppError> {
        let mut last_empty: Option<ApiPayload> = None;

        for params in schedule_attempts(query, season) {
            let borrowed: Vec<(&str, &str)> =
                params.iter().map(|(k, v)| (*k, v.as_str())).collect();
            let payload = self.fetch("fixtures", &borrowed, options).await?;

            if payload.has_items() {
                info!(
                    "Found {} fixtures for team {} with {:?}",
                    payload.response_items().len(),
                    query.team,
                    borrowed
                );
                return Ok(payload);
            }

            debug!("No fixtures for team {} with {:?}", query.team, borrowed);
            if !payload.is_unavailable() {
                last_empty = Some(payload);
            }
        }

        Ok(last_empty.unwrap_or_else(ApiPayload::unavailable))
    }
}
