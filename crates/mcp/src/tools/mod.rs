pub mod compliance;
pub mod issues;
pub mod metrics;
pub mod projects;
mod registry;
pub mod runs;
pub mod vulnerabilities;

pub use compliance::ComplianceReportTool;
pub use issues::ProjectIssuesTool;
pub use metrics::{QualityMetricsTool, UpdateMetricSettingTool, UpdateMetricThresholdTool};
pub use projects::ProjectsTool;
pub use registry::{Tool, ToolInput, ToolRegistry};
pub use runs::{ProjectRunsTool, RecentRunIssuesTool, RunTool};
pub use vulnerabilities::DependencyVulnerabilitiesTool;

use crate::error::McpResult;
use deepsource_core::{Pagination, ProjectKey};
use deepsource_sdk::DeepSourceClient;

/// Hint appended to paginated results
pub(crate) const PAGINATION_USAGE: &str = "Pass page_info.end_cursor as `after` (with `first`) for the next page, \
     or page_info.start_cursor as `before` (with `last`) for the previous one.";

/// Register every DeepSource tool against `client`
pub fn register_all(registry: &mut ToolRegistry, client: &DeepSourceClient) -> McpResult<()> {
    registry.register(ProjectsTool::new(client.clone()))?;
    registry.register(ProjectIssuesTool::new(client.clone()))?;
    registry.register(ProjectRunsTool::new(client.clone()))?;
    registry.register(RunTool::new(client.clone()))?;
    registry.register(RecentRunIssuesTool::new(client.clone()))?;
    registry.register(DependencyVulnerabilitiesTool::new(client.clone()))?;
    registry.register(QualityMetricsTool::new(client.clone()))?;
    registry.register(UpdateMetricThresholdTool::new(client.clone()))?;
    registry.register(UpdateMetricSettingTool::new(client.clone()))?;
    registry.register(ComplianceReportTool::new(client.clone()))?;
    Ok(())
}

pub(crate) fn validate_project_key(key: &ProjectKey) -> Result<(), String> {
    if key.as_str().trim().is_empty() {
        Err("projectKey must not be empty".to_string())
    } else {
        Ok(())
    }
}

pub(crate) fn validate_pagination(pagination: &Pagination) -> Result<(), String> {
    pagination.validate().map_err(|e| e.to_string())
}

#[cfg(test)]
pub(crate) mod testing {
    use deepsource_sdk::graphql::GraphQlRequest;
    use deepsource_sdk::{DeepSourceClient, DeepSourceResult, RequestExecutor};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Serves scripted GraphQL `data` payloads in order; the last one repeats.
    pub struct ScriptedExecutor {
        responses: Mutex<VecDeque<DeepSourceResult<serde_json::Value>>>,
        pub requests: Mutex<Vec<GraphQlRequest>>,
    }

    impl ScriptedExecutor {
        pub fn new(responses: Vec<DeepSourceResult<serde_json::Value>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        pub fn operations(&self) -> Vec<String> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .map(|r| r.label().to_string())
                .collect()
        }

        pub fn last_variables(&self) -> serde_json::Value {
            self.requests
                .lock()
                .unwrap()
                .last()
                .map(|r| r.variables.clone())
                .unwrap_or_default()
        }
    }

    #[async_trait::async_trait]
    impl RequestExecutor for ScriptedExecutor {
        async fn execute(&self, request: &GraphQlRequest) -> DeepSourceResult<serde_json::Value> {
            self.requests.lock().unwrap().push(request.clone());
            let mut responses = self.responses.lock().unwrap();
            if responses.len() > 1 {
                responses.pop_front().unwrap()
            } else {
                responses.front().cloned().unwrap()
            }
        }
    }

    pub fn client(executor: &Arc<ScriptedExecutor>) -> DeepSourceClient {
        DeepSourceClient::with_executor(executor.clone())
    }

    /// Viewer payload with one GitHub project keyed `dsn-demo`
    pub fn viewer() -> serde_json::Value {
        serde_json::json!({
            "viewer": {
                "accounts": {"edges": [{"node": {
                    "login": "acme",
                    "repositories": {"edges": [{"node": {
                        "id": "UmVwb3NpdG9yeTox",
                        "name": "demo",
                        "dsn": "dsn-demo",
                        "defaultBranch": "main",
                        "isPrivate": false,
                        "isActivated": true,
                        "vcsProvider": "GITHUB",
                        "vcsUrl": "https://github.com/acme/demo"
                    }}]}
                }}]}
            }
        })
    }

    /// An analysis run node as returned by the API
    pub fn run_node(uid: &str, branch: &str) -> serde_json::Value {
        serde_json::json!({
            "id": format!("run-{uid}"),
            "runUid": uid,
            "commitOid": "0a1b2c3d",
            "branchName": branch,
            "baseOid": "ffeeddcc",
            "status": "SUCCESS",
            "createdAt": "2024-06-01T12:00:00Z",
            "updatedAt": "2024-06-01T12:05:00Z",
            "finishedAt": "2024-06-01T12:05:00Z",
            "summary": {
                "occurrencesIntroduced": 2,
                "occurrencesResolved": 0,
                "occurrencesSuppressed": 0,
                "occurrenceDistributionByAnalyzer": [{"analyzerShortcode": "rust", "introduced": 2}],
                "occurrenceDistributionByCategory": [{"category": "BUG_RISK", "introduced": 2}]
            }
        })
    }
}
