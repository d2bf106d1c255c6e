//! Maps raw request failures onto [`ErrorCategory`].
//!
//! Classification is a pure function: every input yields exactly one
//! [`ClassifiedError`], falling back to [`ErrorCategory::Other`] with the
//! original error preserved as its source.

use crate::error::{ClassifiedError, ErrorCategory, RequestError};
use crate::graphql::{GraphQlError, GraphQlResponse};
use std::error::Error as StdError;
use std::sync::Arc;

const AUTH_PATTERNS: &[&str] = &[
    "unauthorized",
    "unauthenticated",
    "authentication",
    "invalid token",
    "invalid api key",
    "forbidden",
    "permission denied",
];

const RATE_LIMIT_PATTERNS: &[&str] = &["rate limit", "too many requests", "throttl"];

const NETWORK_PATTERNS: &[&str] = &[
    "connection refused",
    "connection reset",
    "econnrefused",
    "econnreset",
    "enotfound",
    "dns error",
    "failed to lookup address",
    "network is unreachable",
    "broken pipe",
];

const TIMEOUT_PATTERNS: &[&str] = &["timed out", "timeout", "etimedout", "deadline exceeded"];

const NOT_FOUND_PATTERNS: &[&str] = &["not found", "does not exist", "no such", "could not find"];

const SCHEMA_PATTERNS: &[&str] = &[
    "cannot query field",
    "unknown argument",
    "unknown type",
    "syntax error",
    "validation",
    "expected type",
    "field required",
];

fn matches_any(message: &str, patterns: &[&str]) -> bool {
    let message = message.to_ascii_lowercase();
    patterns.iter().any(|p| message.contains(p))
}

/// Category implied by free-form error text, in classification priority order.
fn category_from_message(message: &str) -> Option<ErrorCategory> {
    if matches_any(message, AUTH_PATTERNS) {
        Some(ErrorCategory::Auth)
    } else if matches_any(message, RATE_LIMIT_PATTERNS) {
        Some(ErrorCategory::RateLimit)
    } else if matches_any(message, NETWORK_PATTERNS) {
        Some(ErrorCategory::Network)
    } else if matches_any(message, TIMEOUT_PATTERNS) {
        Some(ErrorCategory::Timeout)
    } else if matches_any(message, NOT_FOUND_PATTERNS) {
        Some(ErrorCategory::NotFound)
    } else if matches_any(message, SCHEMA_PATTERNS) {
        Some(ErrorCategory::Schema)
    } else {
        None
    }
}

/// Category implied by a GraphQL `extensions.code`.
fn category_from_code(code: &str) -> Option<ErrorCategory> {
    match code.to_ascii_uppercase().as_str() {
        "UNAUTHENTICATED" | "FORBIDDEN" | "PERMISSION_DENIED" => Some(ErrorCategory::Auth),
        "RATE_LIMITED" | "THROTTLED" => Some(ErrorCategory::RateLimit),
        "NOT_FOUND" => Some(ErrorCategory::NotFound),
        "GRAPHQL_VALIDATION_FAILED" | "GRAPHQL_PARSE_FAILED" => Some(ErrorCategory::Schema),
        _ => None,
    }
}

fn classify_graphql_errors(errors: &[GraphQlError]) -> Option<ErrorCategory> {
    errors.iter().find_map(|error| {
        error
            .code()
            .and_then(category_from_code)
            .or_else(|| category_from_message(&error.message))
    })
}

fn status_category(status: u16, body: &str) -> ErrorCategory {
    match status {
        401 | 403 => ErrorCategory::Auth,
        429 => ErrorCategory::RateLimit,
        s if s >= 500 => ErrorCategory::Server,
        400..=499 => {
            // 4xx bodies often carry GraphQL errors that say more than the status.
            let messages: Vec<GraphQlError> = serde_json::from_str::<GraphQlResponse>(body)
                .ok()
                .and_then(|response| response.errors)
                .unwrap_or_else(|| vec![GraphQlError::new(body)]);
            let text = messages
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join(" ");

            if matches_any(&text, NOT_FOUND_PATTERNS) {
                ErrorCategory::NotFound
            } else if matches_any(&text, SCHEMA_PATTERNS) {
                ErrorCategory::Schema
            } else {
                ErrorCategory::Client
            }
        }
        _ => ErrorCategory::Other,
    }
}

fn transport_category(error: &reqwest::Error) -> ErrorCategory {
    if let Some(status) = error.status() {
        return status_category(status.as_u16(), "");
    }
    if error.is_connect() {
        return ErrorCategory::Network;
    }
    if error.is_timeout() {
        return ErrorCategory::Timeout;
    }
    if error.is_decode() {
        return ErrorCategory::Format;
    }

    // reqwest hides hyper/io detail in the source chain
    let mut current: Option<&(dyn StdError + 'static)> = Some(error);
    while let Some(err) = current {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            if let Some(category) = io_category(io) {
                return category;
            }
        }
        if let Some(category) = category_from_message(&err.to_string()) {
            return category;
        }
        current = err.source();
    }
    ErrorCategory::Other
}

fn io_category(error: &std::io::Error) -> Option<ErrorCategory> {
    use std::io::ErrorKind;
    match error.kind() {
        ErrorKind::ConnectionRefused
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::NotConnected
        | ErrorKind::BrokenPipe
        | ErrorKind::AddrNotAvailable => Some(ErrorCategory::Network),
        ErrorKind::TimedOut => Some(ErrorCategory::Timeout),
        ErrorKind::InvalidData | ErrorKind::UnexpectedEof => Some(ErrorCategory::Format),
        _ => None,
    }
}

/// Classify a failure from a single GraphQL request.
pub fn classify(error: RequestError) -> ClassifiedError {
    let (category, message, code) = match &error {
        RequestError::Status { status, body, .. } => {
            let category = status_category(*status, body);
            (
                category,
                format!("DeepSource API returned HTTP {status}"),
                Some(format!("HTTP_{status}")),
            )
        }
        RequestError::Transport(e) => {
            let category = transport_category(e);
            (category, format!("Request to DeepSource failed: {e}"), None)
        }
        RequestError::GraphQl(errors) => {
            let category = classify_graphql_errors(errors).unwrap_or(ErrorCategory::Other);
            let code = errors.iter().find_map(|e| e.code()).map(str::to_string);
            (category, error.to_string(), code)
        }
        RequestError::Decode(e) => (
            ErrorCategory::Format,
            format!("Could not parse DeepSource response: {e}"),
            None,
        ),
        RequestError::EmptyResponse => (
            ErrorCategory::Format,
            "DeepSource response contained no data".to_string(),
            None,
        ),
    };

    let mut classified = ClassifiedError::new(category, message);
    if let Some(code) = code {
        classified = classified.with_code(code);
    }
    match &error {
        RequestError::Status {
            status,
            retry_after,
            ..
        } => {
            classified = classified.with_metadata("status", *status);
            if let Some(wait) = retry_after {
                classified = classified.with_metadata("retry_after_secs", wait.as_secs());
            }
        }
        RequestError::GraphQl(errors) => {
            if let Ok(value) = serde_json::to_value(errors) {
                classified = classified.with_metadata("graphql_errors", value);
            }
        }
        _ => {}
    }
    classified.with_source(error)
}

/// Category for an arbitrary error, walking its source chain.
pub fn category_of(error: &(dyn StdError + 'static)) -> ErrorCategory {
    let mut current: Option<&(dyn StdError + 'static)> = Some(error);
    while let Some(err) = current {
        if let Some(classified) = err.downcast_ref::<ClassifiedError>() {
            return classified.category();
        }
        if let Some(request) = err.downcast_ref::<RequestError>() {
            return match request {
                RequestError::Status { status, body, .. } => status_category(*status, body),
                RequestError::Transport(e) => transport_category(e),
                RequestError::GraphQl(errors) => {
                    classify_graphql_errors(errors).unwrap_or(ErrorCategory::Other)
                }
                RequestError::Decode(_) | RequestError::EmptyResponse => ErrorCategory::Format,
            };
        }
        if let Some(e) = err.downcast_ref::<reqwest::Error>() {
            return transport_category(e);
        }
        if err.downcast_ref::<serde_json::Error>().is_some() {
            return ErrorCategory::Format;
        }
        if let Some(category) = err.downcast_ref::<std::io::Error>().and_then(io_category) {
            return category;
        }
        current = err.source();
    }
    category_from_message(&error.to_string()).unwrap_or(ErrorCategory::Other)
}

/// Classify any boxed error, keeping it as the source.
///
/// Already-classified errors are returned unchanged.
pub fn classify_boxed(error: Box<dyn StdError + Send + Sync + 'static>) -> ClassifiedError {
    let error = match error.downcast::<ClassifiedError>() {
        Ok(classified) => return *classified,
        Err(other) => other,
    };
    let error = match error.downcast::<RequestError>() {
        Ok(request) => return classify(*request),
        Err(other) => other,
    };

    let category = category_of(error.as_ref());
    let message = error.to_string();
    ClassifiedError::new(category, message).with_shared_source(Arc::from(error))
}
