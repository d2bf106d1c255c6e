//! Error types for the DeepSource SDK.

use crate::graphql::GraphQlError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Result type for SDK operations.
pub type DeepSourceResult<T> = Result<T, ClassifiedError>;

/// Category of a failed request, used to drive retry and reporting decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    /// Credentials missing, invalid or lacking permission.
    Auth,
    /// Connection-level failure (DNS, refused, reset).
    Network,
    /// Upstream responded with a 5xx status.
    Server,
    /// Upstream rejected the request with a 4xx status.
    Client,
    /// Request exceeded the configured timeout.
    Timeout,
    /// Upstream asked us to slow down.
    RateLimit,
    /// Query does not match the upstream GraphQL schema.
    Schema,
    /// Requested resource does not exist.
    NotFound,
    /// Response body could not be parsed or mapped.
    Format,
    /// Anything else.
    Other,
}

impl ErrorCategory {
    pub const ALL: [ErrorCategory; 10] = [
        Self::Auth,
        Self::Network,
        Self::Server,
        Self::Client,
        Self::Timeout,
        Self::RateLimit,
        Self::Schema,
        Self::NotFound,
        Self::Format,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auth => "AUTH",
            Self::Network => "NETWORK",
            Self::Server => "SERVER",
            Self::Client => "CLIENT",
            Self::Timeout => "TIMEOUT",
            Self::RateLimit => "RATE_LIMIT",
            Self::Schema => "SCHEMA",
            Self::NotFound => "NOT_FOUND",
            Self::Format => "FORMAT",
            Self::Other => "OTHER",
        }
    }

    /// Categories that usually clear up on their own.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Network | Self::Server | Self::Timeout | Self::RateLimit
        )
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown error category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for ErrorCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Code attached to errors produced by cancellation.
pub const CANCELLED_CODE: &str = "CANCELLED";

/// A request failure enriched with a category.
///
/// Built once per failed attempt and not mutated afterwards; the `with_*`
/// methods consume the value and are only used while constructing it.
#[derive(Debug, Clone)]
pub struct ClassifiedError {
    category: ErrorCategory,
    message: String,
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
    metadata: BTreeMap<String, serde_json::Value>,
    code: Option<String>,
}

impl ClassifiedError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            source: None,
            metadata: BTreeMap::new(),
            code: None,
        }
    }

    /// Error surfaced when the caller abandons a request.
    pub fn cancelled() -> Self {
        Self::new(ErrorCategory::Other, "Request was cancelled").with_code(CANCELLED_CODE)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::NotFound, message)
    }

    pub fn format(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Format, message)
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    pub fn with_shared_source(
        mut self,
        source: Arc<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn metadata(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.metadata
    }

    /// The underlying error this one was classified from.
    pub fn original_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    /// Server-provided wait hint, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        self.metadata
            .get("retry_after_secs")
            .and_then(|v| v.as_u64())
            .map(Duration::from_secs)
    }

    pub fn is_cancelled(&self) -> bool {
        self.code.as_deref() == Some(CANCELLED_CODE)
    }
}

impl fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.category, self.message)
    }
}

impl std::error::Error for ClassifiedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<deepsource_core::PaginationError> for ClassifiedError {
    fn from(error: deepsource_core::PaginationError) -> Self {
        Self::new(ErrorCategory::Client, error.to_string()).with_source(error)
    }
}

/// A raw failure from a single GraphQL request, before classification.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// Upstream responded with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status {
        status: u16,
        body: String,
        retry_after: Option<Duration>,
    },

    /// The request never produced a response.
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Upstream answered with a GraphQL `errors` array.
    #[error("GraphQL error: {}", summarize_graphql_errors(.0))]
    GraphQl(Vec<GraphQlError>),

    /// Response body was not valid GraphQL JSON.
    #[error("Invalid response body: {0}")]
    Decode(#[source] serde_json::Error),

    /// Response had neither `data` nor `errors`.
    #[error("Response contained no data")]
    EmptyResponse,
}

fn summarize_graphql_errors(errors: &[GraphQlError]) -> String {
    if errors.is_empty() {
        return "unknown error".to_string();
    }
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors raised while building a client.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("API key is required")]
    MissingApiKey,

    #[error("Invalid API key format")]
    InvalidApiKey,

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid retry configuration: {0}")]
    InvalidRetry(String),

    #[error("Failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}
