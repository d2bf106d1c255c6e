//! Transport layer for the DeepSource SDK.
//!
//! Domain APIs talk to a [`RequestExecutor`]; the direct [`HttpTransport`]
//! and the [`RetryingExecutor`] wrapper both implement it and are chosen
//! when the client is built.

pub mod http;
pub mod retrying;

pub use http::HttpTransport;
pub use retrying::RetryingExecutor;

use crate::error::DeepSourceResult;
use crate::graphql::GraphQlRequest;

/// Executes one logical GraphQL request and returns its `data` object.
#[async_trait::async_trait]
pub trait RequestExecutor: Send + Sync {
    async fn execute(&self, request: &GraphQlRequest) -> DeepSourceResult<serde_json::Value>;
}
