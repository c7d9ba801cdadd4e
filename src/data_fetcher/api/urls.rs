//! URL and cache-key building for upstream endpoints

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::constants::cache_ttl;

/// Builds the full upstream URL (without query string) for an endpoint.
///
/// # Example
/// ```
/// use matchday_relay::data_fetcher::api::build_endpoint_url;
///
/// let url = build_endpoint_url("https://v3.football.api-sports.io/", "fixtures/events");
/// assert_eq!(url, "https://v3.football.api-sports.io/fixtures/events");
/// ```
pub fn build_endpoint_url(base_url: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}

/// Builds a cache key from an endpoint and its query parameters.
///
/// Parameters are sorted by name first, so two logically identical parameter
/// sets always map to the same key whatever order they were given in. A
/// repeated name keeps all of its values, sorted, as a JSON array.
///
/// # Example
/// ```
/// use matchday_relay::data_fetcher::api::cache_key;
///
/// let a = cache_key("fixtures", &[("team", "33"), ("season", "2025")]);
/// let b = cache_key("fixtures", &[("season", "2025"), ("team", "33")]);
/// assert_eq!(a, b);
/// assert_eq!(a, r#"fixtures{"season":"2025","team":"33"}"#);
///
/// let repeated = cache_key("fixtures", &[("team", "40"), ("team", "33")]);
/// assert_eq!(repeated, r#"fixtures{"team":["33","40"]}"#);
/// ```
pub fn cache_key(endpoint: &str, params: &[(&str, &str)]) -> String {
    let mut grouped: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for &(name, value) in params {
        grouped.entry(name).or_default().push(value);
    }

    let encoded: Map<String, Value> = grouped
        .into_iter()
        .map(|(name, mut values)| {
            let value = if values.len() == 1 {
                Value::from(values[0])
            } else {
                values.sort_unstable();
                Value::from(values)
            };
            (name.to_string(), value)
        })
        .collect();
    format!("{endpoint}{}", Value::Object(encoded))
}

/// Builds the cache key for team metadata lookups
pub fn team_cache_key(team_id: i64) -> String {
    format!("team-{team_id}")
}

/// Content classes with distinct cache lifetimes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointClass {
    /// Per-fixture detail that changes during a match
    Volatile,
    /// Fixture lists and searches
    FixtureList,
    /// Mostly-static team metadata
    TeamMetadata,
}

impl EndpointClass {
    pub fn for_endpoint(endpoint: &str) -> Self {
        match endpoint.trim_matches('/') {
            "fixtures/events" | "fixtures/lineups" | "fixtures/statistics" => Self::Volatile,
            _ => Self::FixtureList,
        }
    }

    pub fn ttl(self) -> Duration {
        Duration::from_secs(match self {
            Self::Volatile => cache_ttl::VOLATILE_SECONDS,
            Self::FixtureList => cache_ttl::FIXTURE_LIST_SECONDS,
            Self::TeamMetadata => cache_ttl::TEAM_METADATA_SECONDS,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_without_params() {
        assert_eq!(cache_key("countries", &[]), "countries{}");
    }

    #[test]
    fn test_cache_key_distinguishes_endpoints_and_values() {
        let events = cache_key("fixtures/events", &[("fixture", "1")]);
        let lineups = cache_key("fixtures/lineups", &[("fixture", "1")]);
        let other = cache_key("fixtures/events", &[("fixture", "2")]);
        assert_ne!(events, lineups);
        assert_ne!(events, other);
    }

    #[test]
    fn test_cache_key_escapes_values() {
        let tricky = cache_key("teams", &[("search", "a\",\"b")]);
        let plain = cache_key("teams", &[("search", "a"), ("b", "")]);
        assert_ne!(tricky, plain);
    }

    #[test]
    fn test_cache_key_keeps_repeated_params() {
        let both = cache_key("fixtures", &[("team", "33"), ("team", "40")]);
        let swapped = cache_key("fixtures", &[("team", "40"), ("team", "33")]);
        let last_only = cache_key("fixtures", &[("team", "40")]);
        assert_eq!(both, swapped);
        assert_ne!(both, last_only);

        // A single value that looks like an array stays a string
        let literal = cache_key("fixtures", &[("team", r#"["33","40"]"#)]);
        assert_ne!(both, literal);
    }

    #[test]
    fn test_endpoint_classes() {
        assert_eq!(
            EndpointClass::for_endpoint("fixtures/events"),
            EndpointClass::Volatile
        );
        assert_eq!(
            EndpointClass::for_endpoint("/fixtures/statistics"),
            EndpointClass::Volatile
        );
        assert_eq!(
            EndpointClass::for_endpoint("fixtures"),
            EndpointClass::FixtureList
        );
        assert_eq!(EndpointClass::Volatile.ttl(), Duration::from_secs(120));
        assert_eq!(EndpointClass::FixtureList.ttl(), Duration::from_secs(600));
        assert_eq!(
            EndpointClass::TeamMetadata.ttl(),
            Duration::from_secs(604_800)
        );
    }

    #[test]
    fn test_build_endpoint_url_trims_slashes() {
        assert_eq!(
            build_endpoint_url("http://localhost:8080", "/fixtures"),
            "http://localhost:8080/fixtures"
        );
    }
}
