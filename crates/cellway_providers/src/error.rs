use cellway_core::RoutingError;
use serde::Deserialize;

const POINT_NOT_FOUND_MESSAGE: &str = "Cannot find point";
const NO_CONNECTION_MESSAGE: &str = "Connection between locations not found";

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Extracts `message` from a JSON error body, falling back to the raw text.
pub fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|body| body.message)
        .unwrap_or_else(|| body.trim().to_string())
}

/// Maps a provider message to a user correctable error when it names one.
pub fn classify_message(message: &str) -> Option<RoutingError> {
    if message.contains(POINT_NOT_FOUND_MESSAGE) {
        Some(RoutingError::PointNotFound(message.to_string()))
    } else if message.contains(NO_CONNECTION_MESSAGE) {
        Some(RoutingError::NoRoute(message.to_string()))
    } else {
        None
    }
}

pub fn classify_http_status(provider: &str, status: u16, message: &str) -> RoutingError {
    if let Some(error) = classify_message(message) {
        return error;
    }

    match status {
        401 | 403 => RoutingError::ConfigError(format!(
            "{provider} authentication failed ({status}), check the API key"
        )),
        429 => RoutingError::ProviderError(format!("{provider} rate limit exceeded")),
        500.. => RoutingError::ProviderError(format!(
            "{provider} unavailable ({status}): {message}"
        )),
        _ => RoutingError::ProviderError(format!(
            "{provider} rejected the request ({status}): {message}"
        )),
    }
}

pub fn classify_transport_error(provider: &str, error: &reqwest::Error) -> RoutingError {
    if error.is_timeout() {
        RoutingError::Timeout(format!("{provider} request timed out"))
    } else if let Some(status) = error.status() {
        classify_http_status(provider, status.as_u16(), &error.to_string())
    } else {
        RoutingError::ProviderError(format!("{provider} request failed: {error}"))
    }
}
