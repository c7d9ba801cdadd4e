pub mod common;
pub mod events;
pub mod fixtures;

pub use common::{TeamRef, parse_items};
pub use events::{FixtureEvent, LineupEntry, count_goals_for};
pub use fixtures::{FixtureInfo, FixtureSummary, FixtureTeams};
