pub mod date_logic;
pub mod http_client;
pub mod team_aliases;
pub mod team_schedule;
pub mod urls;
mod core;
mod fetch_utils;

// Re-export URL utilities
pub use urls::*;
// Re-export the client and its payload types
pub use core::{ApiPayload, FetchOptions, PayloadSource, UpstreamClient};
pub use team_schedule::ScheduleQuery;
