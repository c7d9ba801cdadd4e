pub mod api;
pub mod cache;
pub mod models;
pub mod rate_governor;

pub use api::{ApiPayload, FetchOptions, PayloadSource, UpstreamClient};
pub use cache::CachePools;
pub use rate_governor::{RateGovernor, RateSnapshot};
