//! Date defaults, validation and season arithmetic

use chrono::{Datelike, NaiveDate, Utc};

use crate::error::AppError;

/// Month in which a new European football season is considered to start
pub const SEASON_START_MONTH: u32 = 7;

/// Today's date in UTC as `YYYY-MM-DD`, the format the provider expects.
pub fn today_utc() -> String {
    Utc::now().date_naive().format("%Y-%m-%d").to_string()
}

/// Resolves an optional `date` query value, defaulting to today (UTC).
///
/// A provided date must be a valid calendar date in `YYYY-MM-DD` form so that
/// garbage input never reaches the provider or the quota.
pub fn resolve_query_date(date: Option<&str>) -> Result<String, AppError> {
    match date.map(str::trim).filter(|d| !d.is_empty()) {
        None => Ok(today_utc()),
        Some(date) => {
            NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| {
                AppError::bad_request(format!("Invalid date '{date}', expected YYYY-MM-DD"))
            })?;
            Ok(date.to_string())
        }
    }
}

/// The provider labels a season by its starting year: a 2025/26 season is
/// `2025`. Dates before July belong to the season that started last year.
pub fn season_for_date(date: NaiveDate) -> i32 {
    if date.month() >= SEASON_START_MONTH {
        date.year()
    } else {
        date.year() - 1
    }
}

/// Season of today's date (UTC)
pub fn current_season() -> i32 {
    season_for_date(Utc::now().date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_season_for_date() {
        assert_eq!(season_for_date(date(2025, 8, 16)), 2025);
        assert_eq!(season_for_date(date(2026, 3, 1)), 2025);
        assert_eq!(season_for_date(date(2026, 6, 30)), 2025);
        assert_eq!(season_for_date(date(2026, 7, 1)), 2026);
    }

    #[test]
    fn test_resolve_query_date_defaults_to_today() {
        let today = resolve_query_date(None).unwrap();
        assert_eq!(today, today_utc());
        assert_eq!(resolve_query_date(Some("  ")).unwrap(), today_utc());
    }

    #[test]
    fn test_resolve_query_date_validates_format() {
        assert_eq!(resolve_query_date(Some("2024-01-15")).unwrap(), "2024-01-15");
        assert!(matches!(
            resolve_query_date(Some("2024-13-01")),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            resolve_query_date(Some("15/01/2024")),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_today_format() {
        let today = today_utc();
        assert_eq!(today.len(), 10);
        assert!(NaiveDate::parse_from_str(&today, "%Y-%m-%d").is_ok());
    }
}
