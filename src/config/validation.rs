use crate::error::AppError;
use std::path::Path;

/// Validates the configuration settings
///
/// # Validation Rules
/// - API base URL must be an absolute http(s) URL
/// - Rate limit requests, rate limit window and notify interval must be non-zero
/// - Cache capacity must be non-zero
/// - If a log file path is provided, it cannot be empty and its parent
///   directory must exist or be creatable
pub fn validate_config(
    api_base_url: &str,
    rate_limit_requests: u32,
    rate_limit_window_seconds: u64,
    notify_interval_seconds: u64,
    cache_capacity: usize,
    log_file_path: &Option<String>,
) -> Result<(), AppError> {
    if api_base_url.trim().is_empty() {
        return Err(AppError::config_error("API base URL cannot be empty"));
    }
    if !api_base_url.starts_with("http://") && !api_base_url.starts_with("https://") {
        return Err(AppError::config_error(format!(
            "API base URL must start with http:// or https://, got '{api_base_url}'"
        )));
    }

    if rate_limit_requests == 0 {
        return Err(AppError::config_error(
            "rate_limit_requests must be greater than zero",
        ));
    }
    if rate_limit_window_seconds == 0 {
        return Err(AppError::config_error(
            "rate_limit_window_seconds must be greater than zero",
        ));
    }
    if notify_interval_seconds == 0 {
        return Err(AppError::config_error(
            "notify_interval_seconds must be greater than zero",
        ));
    }
    if cache_capacity == 0 {
        return Err(AppError::config_error("cache_capacity must be greater than zero"));
    }

    if let Some(log_path) = log_file_path {
        if log_path.is_empty() {
            return Err(AppError::config_error("Log file path cannot be empty"));
        }

        if let Some(parent) = Path::new(log_path).parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::config_error(format!(
                    "Cannot create log directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    Ok(())
}
