use super::{ErrorCategory, HubError};
use tracing::{error, warn};

/// Logs an error with appropriate severity based on the error type.
///
/// # Arguments
/// * `error` - The HubError to log
/// * `context` - Additional context about where/how the error occurred
pub fn log_error(error: &HubError, context: &str) {
    match error {
        HubError::HttpError { status, message } => {
            if status.is_server_error() {
                error!("{} - HTTP error {}: {}", context, status, message);
            } else {
                warn!("{} - HTTP error {}: {}", context, status, message);
            }
        }
        HubError::Api { service, message, status } => {
            warn!(service = %service, status = ?status, "{} - API error: {}", context, message);
        }
        HubError::NetworkError(msg) => {
            warn!("{} - Network error: {}", context, msg);
        }
        HubError::Validation { kind, message } => {
            warn!("{} - Validation failed: {} - {}", context, kind, message);
        }
        HubError::Wallet { kind, message } => {
            warn!("{} - Wallet error: {} - {}", context, kind, message);
        }
        other => match other.category() {
            ErrorCategory::Internal => error!("{} - Internal error: {}", context, other),
            _ => error!("{} - Unexpected error: {}", context, other),
        },
    }
}

/// Converts a reqwest error to a HubError with additional context.
///
/// # Arguments
/// * `error` - The reqwest error to convert
/// * `context` - Additional context about the request that failed
pub fn handle_reqwest_error(error: reqwest::Error, context: &str) -> HubError {
    if error.is_timeout() {
        HubError::NetworkError(format!("{}: Request timed out - {}", context, error))
    } else if let Some(status) = error.status() {
        HubError::HttpError {
            status,
            message: format!("{}: {}", context, error),
        }
    } else if error.is_decode() {
        HubError::api("Jupiter", format!("{}: Failed to parse response - {}", context, error), None)
    } else {
        HubError::NetworkError(format!("{}: {}", context, error))
    }
}

/// Handles errors that should not occur in production.
/// Logs the error and returns a HubError::InternalError.
pub fn handle_unexpected_error<E: std::fmt::Display>(error: E, context: &str) -> HubError {
    let message = format!("{}: {}", context, error);
    error!("Unexpected error: {}", message);
    HubError::InternalError(message)
}
