//! Main client for the DeepSource SDK.

use crate::api::*;
use crate::config::{ClientConfig, RetryConfig, DEFAULT_ENDPOINT};
use crate::error::{ClassifiedError, ConfigError, DeepSourceResult};
use crate::graphql::GraphQlRequest;
use crate::retry::RetryPolicy;
use crate::transport::{HttpTransport, RequestExecutor, RetryingExecutor};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use url::Url;

/// Main client for interacting with the DeepSource API.
#[derive(Clone)]
pub struct DeepSourceClient {
    executor: Arc<dyn RequestExecutor>,
}

impl DeepSourceClient {
    /// Create a new client builder.
    pub fn builder() -> DeepSourceClientBuilder {
        DeepSourceClientBuilder::new()
    }

    /// Create a client from configuration.
    ///
    /// Requests always run behind a [`RetryingExecutor`] so `cancel` aborts
    /// them, even when `max_attempts` is 1.
    pub fn from_config(
        config: ClientConfig,
        cancel: CancellationToken,
    ) -> Result<Self, ConfigError> {
        config.retry_config.validate()?;
        let retry_config = Arc::new(config.retry_config.clone());
        let http: Arc<dyn RequestExecutor> = Arc::new(HttpTransport::new(Arc::new(config))?);

        let executor: Arc<dyn RequestExecutor> = Arc::new(
            RetryingExecutor::new(http, RetryPolicy::new(retry_config)).with_cancellation(cancel),
        );

        Ok(Self { executor })
    }

    /// Create a client over any executor.
    pub fn with_executor(executor: Arc<dyn RequestExecutor>) -> Self {
        Self { executor }
    }

    /// Get the projects API.
    pub fn projects(&self) -> ProjectsApi<'_> {
        ProjectsApi::new(self)
    }

    /// Get the issues API.
    pub fn issues(&self) -> IssuesApi<'_> {
        IssuesApi::new(self)
    }

    /// Get the analysis runs API.
    pub fn runs(&self) -> RunsApi<'_> {
        RunsApi::new(self)
    }

    /// Get the quality metrics API.
    pub fn metrics(&self) -> MetricsApi<'_> {
        MetricsApi::new(self)
    }

    /// Get the reports API.
    pub fn compliance(&self) -> ComplianceApi<'_> {
        ComplianceApi::new(self)
    }

    /// Get the dependency vulnerabilities API.
    pub fn vulnerabilities(&self) -> VulnerabilitiesApi<'_> {
        VulnerabilitiesApi::new(self)
    }

    /// Execute `request` and map its `data` object onto `T`.
    pub(crate) async fn query<T: DeserializeOwned>(
        &self,
        request: GraphQlRequest,
    ) -> DeepSourceResult<T> {
        let span = tracing::debug_span!("graphql_request", operation = request.label());
        async {
            let data = self.executor.execute(&request).await?;
            serde_json::from_value(data).map_err(|e| {
                ClassifiedError::format(format!(
                    "Unexpected response shape for {}: {e}",
                    request.label()
                ))
                .with_source(e)
            })
        }
        .instrument(span)
        .await
    }
}

/// Builder for creating a DeepSourceClient.
pub struct DeepSourceClientBuilder {
    endpoint: Option<String>,
    api_key: Option<String>,
    timeout: Duration,
    retry_config: RetryConfig,
    cancel: CancellationToken,
}

impl DeepSourceClientBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            timeout: Duration::from_secs(30),
            retry_config: RetryConfig::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Set the GraphQL endpoint. Defaults to the public DeepSource API.
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = Some(url.into());
        self
    }

    /// Set the API key for authentication.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry configuration.
    pub fn retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    /// Abort pending requests and backoff waits when `token` is cancelled.
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<DeepSourceClient, ConfigError> {
        let api_key = self.api_key.ok_or(ConfigError::MissingApiKey)?;
        let endpoint = Url::parse(self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT))?;

        let config = ClientConfig {
            endpoint,
            api_key,
            timeout: self.timeout,
            retry_config: self.retry_config,
        };

        DeepSourceClient::from_config(config, self.cancel)
    }
}

impl Default for DeepSourceClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
