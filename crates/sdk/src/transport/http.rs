//! HTTP transport for the DeepSource GraphQL endpoint.

use crate::classifier::classify;
use crate::config::ClientConfig;
use crate::error::{ConfigError, DeepSourceResult, RequestError};
use crate::graphql::{GraphQlRequest, GraphQlResponse};
use crate::transport::RequestExecutor;
use reqwest::{header, Client, Response};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Sends single GraphQL requests; performs no retries.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    config: Arc<ClientConfig>,
}

impl HttpTransport {
    /// Create a new HTTP transport with the given configuration.
    pub fn new(config: Arc<ClientConfig>) -> Result<Self, ConfigError> {
        if config.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }

        let mut headers = header::HeaderMap::new();
        let mut auth = header::HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|_| ConfigError::InvalidApiKey)?;
        auth.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth);

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("deepsource-mcp/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send one request and return the raw outcome, unclassified.
    pub async fn send(&self, request: &GraphQlRequest) -> Result<serde_json::Value, RequestError> {
        debug!(
            endpoint = %self.config.endpoint,
            operation = request.label(),
            "GraphQL request"
        );

        let response = self
            .client
            .post(self.config.endpoint.clone())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = retry_after(&response);
            let body = response.text().await.unwrap_or_default();
            return Err(RequestError::Status {
                status: status.as_u16(),
                body,
                retry_after,
            });
        }

        let body = response.bytes().await?;
        let parsed: GraphQlResponse =
            serde_json::from_slice(&body).map_err(RequestError::Decode)?;

        if let Some(errors) = parsed.errors.filter(|errors| !errors.is_empty()) {
            return Err(RequestError::GraphQl(errors));
        }

        match parsed.data {
            Some(data) if !data.is_null() => Ok(data),
            _ => Err(RequestError::EmptyResponse),
        }
    }
}

/// `Retry-After` in delta-seconds form.
fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[async_trait::async_trait]
impl RequestExecutor for HttpTransport {
    async fn execute(&self, request: &GraphQlRequest) -> DeepSourceResult<serde_json::Value> {
        self.send(request).await.map_err(classify)
    }
}
