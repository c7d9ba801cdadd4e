//! Per-fixture counters used to detect new goals and lineups between job runs.
//!
//! State only moves forward: goal counters never decrease and the lineup flag
//! flips once. Nothing is persisted, so a restart forgets every fixture.

use std::collections::HashMap;
use tracing::{debug, info};

use crate::data_fetcher::models::{
    FixtureEvent, FixtureSummary, LineupEntry, TeamRef, count_goals_for,
};

/// Which side of a fixture a team plays on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Home,
    Away,
}

/// A side whose goal count went up since the previous check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalUpdate {
    pub fixture_id: i64,
    pub side: Side,
    pub team: TeamRef,
    /// Aggregate goal count for the side after this update
    pub goals: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureState {
    pub fixture_id: i64,
    pub home: TeamRef,
    pub away: TeamRef,
    pub home_goals: u32,
    pub away_goals: u32,
    pub lineup_notified: bool,
}

impl FixtureState {
    /// Baseline for a fixture seen for the first time.
    ///
    /// Starts at 0-0 whatever the current score, so goals scored before the
    /// first observation are never announced.
    pub fn new(fixture_id: i64, home: TeamRef, away: TeamRef) -> Self {
        Self {
            fixture_id,
            home,
            away,
            home_goals: 0,
            away_goals: 0,
            lineup_notified: false,
        }
    }

    /// Compares goal counts from one events snapshot with the stored counters.
    ///
    /// Yields at most one update per side, however many goals were scored
    /// since the last check; the update carries the new aggregate.
    pub fn record_goals(&mut self, events: &[FixtureEvent]) -> Vec<GoalUpdate> {
        let fresh_home = count_goals_for(events, self.home.id);
        let fresh_away = count_goals_for(events, self.away.id);
        let mut updates = Vec::new();

        if fresh_home > self.home_goals {
            self.home_goals = fresh_home;
            updates.push(self.goal_update(Side::Home));
        }
        if fresh_away > self.away_goals {
            self.away_goals = fresh_away;
            updates.push(self.goal_update(Side::Away));
        }

        if updates.is_empty() {
            debug!(
                "Fixture {}: no new goals ({}-{})",
                self.fixture_id, self.home_goals, self.away_goals
            );
        } else {
            info!(
                "Fixture {}: goal count now {}-{}",
                self.fixture_id, self.home_goals, self.away_goals
            );
        }
        updates
    }

    fn goal_update(&self, side: Side) -> GoalUpdate {
        let (team, goals) = match side {
            Side::Home => (&self.home, self.home_goals),
            Side::Away => (&self.away, self.away_goals),
        };
        GoalUpdate {
            fixture_id: self.fixture_id,
            side,
            team: team.clone(),
            goals,
        }
    }

    /// Flips the lineup flag on the first non-empty lineup list and returns
    /// every team in it. Returns nothing once the flag is set or while the
    /// list is still empty.
    pub fn record_lineups(&mut self, lineups: &[LineupEntry]) -> Vec<TeamRef> {
        if self.lineup_notified || lineups.is_empty() {
            return Vec::new();
        }
        self.lineup_notified = true;
        info!("Fixture {}: lineups announced", self.fixture_id);
        lineups.iter().map(|entry| entry.team.clone()).collect()
    }
}

/// Owns the state of every fixture observed by the notification job
#[derive(Debug, Default)]
pub struct FixtureTracker {
    states: HashMap<i64, FixtureState>,
}

impl FixtureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the state for `fixture`, creating the baseline on first sight.
    /// Fixtures without an id cannot be tracked and yield `None`.
    pub fn observe(&mut self, fixture: &FixtureSummary) -> Option<&mut FixtureState> {
        let fixture_id = fixture.id()?;
        let state = self.states.entry(fixture_id).or_insert_with(|| {
            debug!("Tracking new fixture {}", fixture_id);
            FixtureState::new(
                fixture_id,
                fixture.teams.home.clone(),
                fixture.teams.away.clone(),
            )
        });
        Some(state)
    }

    pub fn get(&self, fixture_id: i64) -> Option<&FixtureState> {
        self.states.get(&fixture_id)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
