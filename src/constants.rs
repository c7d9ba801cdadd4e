//! Application-wide constants and configuration values
//!
//! This module centralizes all magic numbers and configuration constants
//! to improve maintainability and make the codebase more configurable.

/// Default timeout for HTTP requests in seconds
pub const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 30;

/// Maximum number of idle connections per host in the HTTP client pool
pub const HTTP_POOL_MAX_IDLE_PER_HOST: usize = 16;

/// Default upstream fixtures API
pub const DEFAULT_API_BASE_URL: &str = "https://v3.football.api-sports.io";

/// Default listening port for the client-facing HTTP surface
pub const DEFAULT_PORT: u16 = 3001;

/// Header carrying the upstream API key
pub const API_KEY_HEADER: &str = "x-apisports-key";

/// Header honored for quota bypass (loopback + configured token only)
pub const QUOTA_BYPASS_HEADER: &str = "x-quota-bypass";

/// Default log file name
pub const LOG_FILE_NAME: &str = "matchday_relay.log";

/// Cache TTL (Time To Live) values in seconds
pub mod cache_ttl {
    /// Per-fixture detail: events, lineups, live statistics (2 minutes)
    pub const VOLATILE_SECONDS: u64 = 120;

    /// Fixture lists by date and other list endpoints (10 minutes)
    pub const FIXTURE_LIST_SECONDS: u64 = 600;

    /// Mostly-static team metadata (7 days)
    pub const TEAM_METADATA_SECONDS: u64 = 7 * 24 * 60 * 60;

    /// Interval between sweeps of expired cache entries
    pub const SWEEP_INTERVAL_SECONDS: u64 = 60;

    /// Default LRU cap per cache pool
    pub const DEFAULT_CAPACITY: usize = 1000;
}

/// Upstream quota defaults (the provider's published ceiling)
pub mod rate_limit {
    /// Requests admitted per window
    pub const DEFAULT_REQUESTS: u32 = 8;

    /// Window length in seconds
    pub const DEFAULT_WINDOW_SECONDS: u64 = 60;
}

/// Notification job tuning
pub mod notify {
    /// Default interval between notification scans (2 minutes)
    pub const DEFAULT_INTERVAL_SECONDS: u64 = 120;

    /// Delay before the first scan after startup
    pub const INITIAL_DELAY_SECONDS: u64 = 5;

    /// Maximum concurrent push deliveries per dispatch
    pub const MAX_CONCURRENT_DELIVERIES: usize = 8;

    /// Capacity of the failed-delivery retry buffer
    pub const RETRY_BUFFER_CAPACITY: usize = 256;

    /// Time-to-live handed to the push service, in seconds
    pub const PUSH_TTL_SECONDS: u32 = 3600;

    /// Default VAPID subject claim
    pub const DEFAULT_VAPID_SUBJECT: &str = "mailto:matchday@localhost";
}

/// Team search tuning
pub mod search {
    /// Queries shorter than this return an empty list without an upstream call
    pub const MIN_QUERY_CHARS: usize = 3;
}

/// Team schedule fallback tuning
pub mod schedule {
    /// Upcoming fixtures requested when the season lookup is empty
    pub const NEXT_FIXTURES: u32 = 10;

    /// Recent fixtures requested as the last resort
    pub const LAST_FIXTURES: u32 = 15;
}

/// Environment variable names
pub mod env_vars {
    /// Upstream API key (required)
    pub const API_KEY: &str = "FOOTBALL_API_KEY";

    /// VAPID public key, base64url
    pub const VAPID_PUBLIC_KEY: &str = "VAPID_PUBLIC_KEY";

    /// VAPID private key, base64url
    pub const VAPID_PRIVATE_KEY: &str = "VAPID_PRIVATE_KEY";

    /// VAPID subject (mailto: or https: URL)
    pub const VAPID_SUBJECT: &str = "VAPID_SUBJECT";

    /// Listening port
    pub const PORT: &str = "PORT";

    /// Upstream base URL override
    pub const API_BASE_URL: &str = "MATCHDAY_API_BASE_URL";

    /// HTTP timeout override in seconds
    pub const HTTP_TIMEOUT: &str = "MATCHDAY_HTTP_TIMEOUT";

    /// Notification scan interval override in seconds
    pub const NOTIFY_INTERVAL: &str = "MATCHDAY_NOTIFY_INTERVAL";

    /// Secret token enabling quota bypass for loopback callers
    pub const QUOTA_BYPASS_TOKEN: &str = "MATCHDAY_QUOTA_BYPASS_TOKEN";

    /// Log file path override
    pub const LOG_FILE: &str = "MATCHDAY_LOG_FILE";
}
