use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

/// Treats an explicit JSON `null` like a missing field.
///
/// The upstream API sends `null` for objects it has no data for yet, which
/// `#[serde(default)]` alone does not cover.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A team as referenced inside fixtures, events and lineups
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TeamRef {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
}

impl TeamRef {
    /// Team name with a neutral fallback for display in notifications
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or("The team")
    }
}

/// Parses each element of an upstream `response` array, skipping items that
/// do not match the expected shape instead of failing the whole batch.
pub fn parse_items<T: DeserializeOwned>(items: &[Value]) -> Vec<T> {
    items
        .iter()
        .filter_map(|item| match serde_json::from_value::<T>(item.clone()) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!("Skipping malformed upstream item: {}", e);
                None
            }
        })
        .collect()
}
