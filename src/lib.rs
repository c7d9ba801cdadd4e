//! Football fixtures relay library
//!
//! Provides a caching, quota-aware client over a football fixtures API, a
//! client-facing JSON API built on axum, and a background job that turns
//! goal and lineup changes into Web Push notifications.
//!
//! # Examples
//!
//! ```rust,no_run
//! use matchday_relay::{AppError, Config};
//! use matchday_relay::server::{AppState, create_router, serve};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), AppError> {
//!     let config = Config::load().await?;
//!     let state = AppState::from_config(&config)?;
//!
//!     let listener = tokio::net::TcpListener::bind(("127.0.0.1", config.port)).await?;
//!     serve(listener, create_router(state)).await
//! }
//! ```

pub mod config;
pub mod constants;
pub mod data_fetcher;
pub mod error;
pub mod notifications;
pub mod server;
pub mod testing_utils;

// Re-export commonly used types for convenience
pub use config::Config;
pub use data_fetcher::{
    ApiPayload, CachePools, FetchOptions, PayloadSource, RateGovernor, UpstreamClient,
};
pub use error::AppError;
pub use notifications::{NotificationDispatcher, NotificationJob, PushService};
pub use server::{AppState, create_router};

/// Current version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
