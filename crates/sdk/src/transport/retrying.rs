//! Retrying wrapper around any [`RequestExecutor`].

use crate::error::{ClassifiedError, DeepSourceResult};
use crate::graphql::GraphQlRequest;
use crate::retry::{RetryAttempt, RetryPolicy};
use crate::transport::RequestExecutor;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Re-executes transient failures according to a [`RetryPolicy`].
///
/// Attempt counters live on the stack of each `execute` call, so concurrent
/// requests through one executor never share retry state.
#[derive(Clone)]
pub struct RetryingExecutor {
    inner: Arc<dyn RequestExecutor>,
    policy: RetryPolicy,
    cancel: CancellationToken,
}

impl RetryingExecutor {
    pub fn new(inner: Arc<dyn RequestExecutor>, policy: RetryPolicy) -> Self {
        Self {
            inner,
            policy,
            cancel: CancellationToken::new(),
        }
    }

    /// Abort in-flight attempts and backoff waits when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait::async_trait]
impl RequestExecutor for RetryingExecutor {
    async fn execute(&self, request: &GraphQlRequest) -> DeepSourceResult<serde_json::Value> {
        let mut attempt: u32 = 1;
        let mut history: Vec<RetryAttempt> = Vec::new();

        loop {
            if self.cancel.is_cancelled() {
                return Err(ClassifiedError::cancelled());
            }

            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(ClassifiedError::cancelled()),
                outcome = self.inner.execute(request) => outcome,
            };

            let err = match outcome {
                Ok(data) => {
                    if attempt > 1 {
                        debug!(
                            operation = request.label(),
                            attempts = attempt,
                            "Request succeeded after retry"
                        );
                    }
                    return Ok(data);
                }
                Err(err) => err,
            };

            if !self.policy.should_retry(err.category(), attempt) {
                if attempt > 1 {
                    error!(
                        operation = request.label(),
                        attempts = attempt,
                        category = %err.category(),
                        error = %err,
                        "Request failed after retries"
                    );
                } else {
                    debug!(
                        operation = request.label(),
                        category = %err.category(),
                        "Request failed without retry"
                    );
                }
                let retries = serde_json::to_value(&history).unwrap_or_default();
                return Err(err
                    .with_metadata("attempts", attempt)
                    .with_metadata("retries", retries));
            }

            let delay = self.policy.delay_for(&err, attempt);
            warn!(
                operation = request.label(),
                attempt,
                max_attempts = self.policy.config().max_attempts,
                category = %err.category(),
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Retrying request"
            );
            history.push(RetryAttempt {
                attempt,
                delay_ms: delay.as_millis() as u64,
                category: err.category(),
            });

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(ClassifiedError::cancelled()),
                _ = tokio::time::sleep(delay) => {}
            }

            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClientConfig, RetryConfig};
    use crate::error::ErrorCategory;
    use crate::transport::HttpTransport;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Replays scripted outcomes, then repeats the fallback.
    struct ScriptedExecutor {
        script: Mutex<VecDeque<DeepSourceResult<serde_json::Value>>>,
        fallback: ErrorCategory,
        calls: AtomicU32,
    }

    impl ScriptedExecutor {
        fn new(
            script: Vec<DeepSourceResult<serde_json::Value>>,
            fallback: ErrorCategory,
        ) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                fallback,
                calls: AtomicU32::new(0),
            })
        }

        fn failing(category: ErrorCategory) -> Arc<Self> {
            Self::new(Vec::new(), category)
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl RequestExecutor for ScriptedExecutor {
        async fn execute(&self, _request: &GraphQlRequest) -> DeepSourceResult<serde_json::Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Err(ClassifiedError::new(self.fallback, "scripted failure")))
        }
    }

    fn config(max_attempts: u32) -> RetryConfig {
        RetryConfig::default()
            .with_max_attempts(max_attempts)
            .with_jitter(false)
            .with_delays(Duration::from_millis(100), Duration::from_secs(2))
    }

    fn executor(inner: Arc<ScriptedExecutor>, config: RetryConfig) -> RetryingExecutor {
        RetryingExecutor::new(inner, RetryPolicy::new(Arc::new(config)))
    }

    fn request() -> GraphQlRequest {
        GraphQlRequest::new("query { viewer { email } }", json!({}))
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_failure_makes_exactly_max_attempts() {
        let inner = ScriptedExecutor::failing(ErrorCategory::Network);
        let retrying = executor(inner.clone(), config(3));

        let error = retrying.execute(&request()).await.unwrap_err();

        assert_eq!(inner.calls(), 3);
        assert_eq!(error.category(), ErrorCategory::Network);
        assert_eq!(error.metadata()["attempts"], 3);
        assert_eq!(error.metadata()["retries"].as_array().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_server_errors() {
        let inner = ScriptedExecutor::new(
            vec![
                Err(ClassifiedError::new(ErrorCategory::Server, "503")),
                Err(ClassifiedError::new(ErrorCategory::Server, "503")),
                Ok(json!({"ok": true})),
            ],
            ErrorCategory::Server,
        );
        let retrying = executor(inner.clone(), config(3));

        let data = retrying.execute(&request()).await.unwrap();

        assert_eq!(data["ok"], true);
        assert_eq!(inner.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_fails_immediately() {
        for category in [
            ErrorCategory::Auth,
            ErrorCategory::NotFound,
            ErrorCategory::Format,
            ErrorCategory::Schema,
        ] {
            let inner = ScriptedExecutor::failing(category);
            let retrying = executor(inner.clone(), config(5));

            let error = retrying.execute(&request()).await.unwrap_err();

            assert_eq!(inner.calls(), 1, "{category} was retried");
            assert_eq!(error.category(), category);
            assert_eq!(error.metadata()["attempts"], 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_attempt_config_never_retries() {
        let inner = ScriptedExecutor::failing(ErrorCategory::Timeout);
        let retrying = executor(inner.clone(), config(1));

        retrying.execute(&request()).await.unwrap_err();
        assert_eq!(inner.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_waits_between_attempts() {
        let inner = ScriptedExecutor::failing(ErrorCategory::Network);
        let retrying = executor(inner.clone(), config(3));

        let started = tokio::time::Instant::now();
        retrying.execute(&request()).await.unwrap_err();

        // 100ms after attempt 1, 200ms after attempt 2.
        assert_eq!(started.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_during_backoff() {
        let inner = ScriptedExecutor::failing(ErrorCategory::Network);
        let token = CancellationToken::new();
        let retrying = executor(
            inner.clone(),
            config(5).with_delays(Duration::from_secs(10), Duration::from_secs(10)),
        )
        .with_cancellation(token.clone());

        let handle = tokio::spawn(async move { retrying.execute(&request()).await });
        tokio::time::sleep(Duration::from_secs(1)).await;
        token.cancel();

        let error = handle.await.unwrap().unwrap_err();
        assert!(error.is_cancelled());
        assert_eq!(error.category(), ErrorCategory::Other);
        assert_eq!(inner.calls(), 1);
    }

    /// Never answers; counts how many requests were started.
    #[derive(Default)]
    struct HangingExecutor {
        calls: AtomicU32,
    }

    #[async_trait::async_trait]
    impl RequestExecutor for HangingExecutor {
        async fn execute(&self, _request: &GraphQlRequest) -> DeepSourceResult<serde_json::Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_while_request_in_flight() {
        for max_attempts in [1, 3] {
            let inner = Arc::new(HangingExecutor::default());
            let token = CancellationToken::new();
            let retrying = RetryingExecutor::new(
                inner.clone(),
                RetryPolicy::new(Arc::new(config(max_attempts))),
            )
            .with_cancellation(token.clone());

            let handle = tokio::spawn(async move { retrying.execute(&request()).await });
            tokio::time::sleep(Duration::from_millis(50)).await;
            token.cancel();

            let error = handle.await.unwrap().unwrap_err();
            assert!(error.is_cancelled());
            assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_start() {
        let inner = ScriptedExecutor::failing(ErrorCategory::Network);
        let token = CancellationToken::new();
        token.cancel();
        let retrying = executor(inner.clone(), config(3)).with_cancellation(token);

        let error = retrying.execute(&request()).await.unwrap_err();
        assert!(error.is_cancelled());
        assert_eq!(inner.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_requests_count_independently() {
        let inner = ScriptedExecutor::failing(ErrorCategory::Server);
        let retrying = Arc::new(executor(inner.clone(), config(3)));

        let a = {
            let retrying = retrying.clone();
            tokio::spawn(async move { retrying.execute(&request()).await })
        };
        let b = {
            let retrying = retrying.clone();
            tokio::spawn(async move { retrying.execute(&request()).await })
        };

        let a = a.await.unwrap().unwrap_err();
        let b = b.await.unwrap().unwrap_err();

        assert_eq!(a.metadata()["attempts"], 3);
        assert_eq!(b.metadata()["attempts"], 3);
        assert_eq!(inner.calls(), 6);
    }

    #[tokio::test]
    async fn test_retries_over_http() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"ok": 1}})))
            .mount(&server)
            .await;

        let endpoint = url::Url::parse(&format!("{}/graphql/", server.uri())).unwrap();
        let http = HttpTransport::new(Arc::new(ClientConfig::new(endpoint, "key"))).unwrap();
        let retrying = RetryingExecutor::new(
            Arc::new(http),
            RetryPolicy::new(Arc::new(
                config(3).with_delays(Duration::from_millis(1), Duration::from_millis(5)),
            )),
        );

        let data = retrying.execute(&request()).await.unwrap();
        assert_eq!(data["ok"], 1);
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }
}
