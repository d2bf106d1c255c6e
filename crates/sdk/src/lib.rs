//! # DeepSource SDK
//!
//! Resilient Rust client for the DeepSource GraphQL API.
//!
//! Every request failure is classified into an [`ErrorCategory`]; transient
//! categories are retried with exponential backoff and jitter.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use deepsource_sdk::{DeepSourceClient, DeepSourceResult, ProjectKey};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = DeepSourceClient::builder()
//!     .api_key("dsp_your_api_key")
//!     .build()?;
//!
//! let projects = client.projects().list().await?;
//! println!("Found {} projects", projects.len());
//!
//! let run = client
//!     .runs()
//!     .recent_for_branch(&ProjectKey::from("your-project-dsn"), "main")
//!     .await?;
//! println!("Latest run: {:?}", run.status);
//! # Ok(())
//! # }
//! ```
//!
//! ## Retry and cancellation
//!
//! ```rust,no_run
//! use deepsource_sdk::{DeepSourceClient, ErrorCategory, RetryConfig};
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! # fn example() -> Result<(), deepsource_sdk::ConfigError> {
//! let shutdown = CancellationToken::new();
//! let client = DeepSourceClient::builder()
//!     .api_key("dsp_your_api_key")
//!     .retry_config(
//!         RetryConfig::default()
//!             .with_max_attempts(5)
//!             .with_delays(Duration::from_millis(500), Duration::from_secs(10))
//!             .with_retryable([ErrorCategory::Server, ErrorCategory::RateLimit]),
//!     )
//!     .cancellation(shutdown.clone())
//!     .build()?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod classifier;
pub mod client;
pub mod config;
pub mod error;
pub mod graphql;
pub mod retry;
pub mod transport;

// Re-export main client
pub use client::{DeepSourceClient, DeepSourceClientBuilder};
pub use config::{ClientConfig, RetryConfig, DEFAULT_ENDPOINT};
pub use error::{ClassifiedError, ConfigError, DeepSourceResult, ErrorCategory, RequestError};
pub use retry::{RetryAttempt, RetryPolicy};
pub use transport::{HttpTransport, RequestExecutor, RetryingExecutor};

// Re-export API filter types
pub use api::{IssueFilter, MutationOutcome, RunFilter};

// Re-export core records for convenience
pub use deepsource_core::{
    AnalysisRun, ComplianceReport, Issue, IssueCategory, IssueSeverity, MetricKey,
    MetricShortcode, Page, PageInfo, Pagination, Project, ProjectKey, ReportType,
    RepositoryMetric, RunStatus, VulnerabilityOccurrence,
};
