//! Single-shot upstream GET with status and body classification

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, error, instrument};

use crate::constants::API_KEY_HEADER;
use crate::error::AppError;

/// Sends exactly one GET to the upstream API and parses the JSON body.
///
/// Exactly one attempt per call; each attempt costs a unit of upstream quota.
///
/// # Arguments
/// * `client` - HTTP client for making requests
/// * `url` - Endpoint URL without query string
/// * `api_key` - Upstream API key, sent as a header and never logged
/// * `params` - Query parameters
///
/// # Returns
/// * `Result<Value, AppError>` - Parsed JSON body or a classified error
#[instrument(skip(client, api_key))]
pub(super) async fn fetch_json(
    client: &Client,
    url: &str,
    api_key: &str,
    params: &[(&str, &str)],
) -> Result<Value, AppError> {
    let response = client
        .get(url)
        .header(API_KEY_HEADER, api_key)
        .query(params)
        .send()
        .await
        .map_err(|e| {
            error!("Request failed for URL {}: {}", url, e);
            if e.is_timeout() {
                AppError::network_timeout(url)
            } else if e.is_connect() {
                AppError::network_connection(url, e.to_string())
            } else {
                AppError::ApiFetch(e)
            }
        })?;

    let status = response.status();
    debug!("Response status: {status}");

    if !status.is_success() {
        let status_code = status.as_u16();
        let reason = status.canonical_reason().unwrap_or("Unknown error");

        error!("HTTP {} - {} (URL: {})", status_code, reason, url);

        return Err(match status_code {
            404 => AppError::api_not_found(url),
            429 => AppError::api_rate_limit(reason, url),
            400..=499 => AppError::api_client_error(status_code, reason, url),
            502 | 503 => AppError::api_service_unavailable(status_code, reason, url),
            _ => AppError::api_server_error(status_code, reason, url),
        });
    }

    let response_text = response.text().await.map_err(|e| {
        error!("Failed to read response text from URL {}: {}", url, e);
        AppError::ApiFetch(e)
    })?;

    debug!("Response length: {} bytes", response_text.len());

    if response_text.trim().is_empty() {
        return Err(AppError::api_no_data("Response body is empty", url));
    }

    let body = serde_json::from_str::<Value>(&response_text).map_err(|e| {
        error!("Failed to parse API response: {} (URL: {})", e, url);
        error!(
            "Response text (first 200 chars): {}",
            &response_text.chars().take(200).collect::<String>()
        );
        AppError::api_malformed_json(e.to_string(), url)
    })?;

    if let Some(message) = reported_errors(&body) {
        error!("API reported errors with a 200 status: {} (URL: {})", message, url);
        return Err(AppError::api_reported(message, url));
    }

    Ok(body)
}

/// The provider answers some failures (bad key, daily limit) with a 200 and a
/// populated `errors` field, as either an object or an array.
fn reported_errors(body: &Value) -> Option<String> {
    match body.get("errors")? {
        Value::Object(map) if !map.is_empty() => Some(
            map.iter()
                .map(|(field, message)| match message.as_str() {
                    Some(text) => format!("{field}: {text}"),
                    None => format!("{field}: {message}"),
                })
                .collect::<Vec<_>>()
                .join("; "),
        ),
        Value::Array(items) if !items.is_empty() => Some(
            items
                .iter()
                .map(|item| item.as_str().map_or_else(|| item.to_string(), str::to_string))
                .collect::<Vec<_>>()
                .join("; "),
        ),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_fetcher::api::http_client::create_test_http_client;
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header, method, path, query_param},
    };

    #[tokio::test]
    async fn test_fetch_json_sends_key_and_params() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fixtures"))
            .and(query_param("date", "2024-01-15"))
            .and(header("x-apisports-key", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": [1]})))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_http_client();
        let url = format!("{}/fixtures", mock_server.uri());
        let body = fetch_json(&client, &url, "secret", &[("date", "2024-01-15")])
            .await
            .unwrap();

        assert_eq!(body, json!({"response": [1]}));
    }

    #[tokio::test]
    async fn test_fetch_json_maps_status_codes() {
        let mock_server = MockServer::start().await;
        let routes = [
            ("/missing", 404),
            ("/limited", 429),
            ("/down", 503),
            ("/broken", 500),
        ];
        for (route, status) in routes {
            Mock::given(method("GET"))
                .and(path(route))
                .respond_with(ResponseTemplate::new(status))
                .mount(&mock_server)
                .await;
        }

        let client = create_test_http_client();
        let uri = mock_server.uri();

        let err = fetch_json(&client, &format!("{uri}/missing"), "k", &[]).await.unwrap_err();
        assert!(matches!(err, AppError::ApiNotFound { .. }));
        let err = fetch_json(&client, &format!("{uri}/limited"), "k", &[]).await.unwrap_err();
        assert!(matches!(err, AppError::ApiRateLimit { .. }));
        let err = fetch_json(&client, &format!("{uri}/down"), "k", &[]).await.unwrap_err();
        assert!(matches!(err, AppError::ApiServiceUnavailable { status: 503, .. }));
        let err = fetch_json(&client, &format!("{uri}/broken"), "k", &[]).await.unwrap_err();
        assert!(matches!(err, AppError::ApiServerError { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_fetch_json_rejects_bad_bodies() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/empty"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/html"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&mock_server)
            .await;

        let client = create_test_http_client();
        let uri = mock_server.uri();

        let err = fetch_json(&client, &format!("{uri}/empty"), "k", &[]).await.unwrap_err();
        assert!(matches!(err, AppError::ApiNoData { .. }));
        let err = fetch_json(&client, &format!("{uri}/html"), "k", &[]).await.unwrap_err();
        assert!(matches!(err, AppError::ApiMalformedJson { .. }));
    }

    #[tokio::test]
    async fn test_fetch_json_treats_error_envelope_as_failure() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fixtures"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "errors": {"requests": "You have reached the request limit for the day"},
                "response": []
            })))
            .mount(&mock_server)
            .await;

        let client = create_test_http_client();
        let url = format!("{}/fixtures", mock_server.uri());
        let err = fetch_json(&client, &url, "k", &[]).await.unwrap_err();
        assert!(matches!(err, AppError::ApiReported { .. }));
        assert!(err.to_string().contains("request limit"));
    }

    #[test]
    fn test_reported_errors_shapes() {
        assert_eq!(reported_errors(&json!({"errors": [], "response": []})), None);
        assert_eq!(reported_errors(&json!({"errors": {}})), None);
        assert_eq!(reported_errors(&json!({"response": []})), None);
        assert_eq!(
            reported_errors(&json!({"errors": {"token": "Invalid key"}})),
            Some("token: Invalid key".to_string())
        );
        assert_eq!(
            reported_errors(&json!({"errors": ["first", "second"]})),
            Some("first; second".to_string())
        );
    }

    #[tokio::test]
    async fn test_fetch_json_connection_refused() {
        let client = create_test_http_client();
        // Port 9 (discard) is closed on test machines
        let err = fetch_json(&client, "http://127.0.0.1:9/fixtures", "k", &[])
            .await
            .unwrap_err();
        assert!(err.is_upstream_failure());
    }
}
