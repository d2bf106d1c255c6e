// Dependency vulnerability tool

use crate::tools::{validate_pagination, validate_project_key, Tool, ToolInput, PAGINATION_USAGE};
use deepsource_core::{PageInfo, Pagination, ProjectKey, VulnerabilityOccurrence};
use deepsource_sdk::DeepSourceClient;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Lists vulnerable dependencies detected in a project
pub struct DependencyVulnerabilitiesTool {
    client: DeepSourceClient,
}

impl DependencyVulnerabilitiesTool {
    pub fn new(client: DeepSourceClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DependencyVulnerabilitiesInput {
    /// Project key from deepsource_projects
    pub project_key: ProjectKey,
    #[serde(flatten)]
    pub pagination: Pagination,
}

impl ToolInput for DependencyVulnerabilitiesInput {
    fn validate(&self) -> Result<(), String> {
        validate_project_key(&self.project_key)?;
        validate_pagination(&self.pagination)
    }
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct DependencyVulnerabilitiesOutput {
    pub vulnerabilities: Vec<VulnerabilityOccurrence>,
    /// Occurrences on this page with a fixed version available
    pub fixable_count: usize,
    pub page_info: PageInfo,
    pub total_count: Option<u64>,
    pub usage: String,
}

#[async_trait::async_trait]
impl Tool for DependencyVulnerabilitiesTool {
    type Input = DependencyVulnerabilitiesInput;
    type Output = DependencyVulnerabilitiesOutput;

    fn name(&self) -> &'static str {
        "deepsource_dependency_vulnerabilities"
    }

    fn description(&self) -> &'static str {
        "List vulnerable dependencies detected in a DeepSource project, with \
         severity, reachability and fix availability. Supports cursor pagination."
    }

    async fn call(
        &self,
        input: DependencyVulnerabilitiesInput,
    ) -> anyhow::Result<DependencyVulnerabilitiesOutput> {
        let page = self
            .client
            .vulnerabilities()
            .list(&input.project_key, &input.pagination)
            .await?;

        Ok(DependencyVulnerabilitiesOutput {
            fixable_count: page.items.iter().filter(|o| o.has_fix()).count(),
            vulnerabilities: page.items,
            page_info: page.page_info,
            total_count: page.total_count,
            usage: PAGINATION_USAGE.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{client, viewer, ScriptedExecutor};
    use crate::tools::ToolRegistry;
    use deepsource_sdk::{ClassifiedError, ErrorCategory};
    use serde_json::json;

    #[tokio::test]
    async fn test_lists_vulnerabilities() {
        let executor = ScriptedExecutor::new(vec![
            Ok(viewer()),
            Ok(json!({"repository": {"dependencyVulnerabilityOccurrences": {
                "totalCount": 1,
                "pageInfo": {"hasNextPage": true, "hasPreviousPage": false,
                             "startCursor": "v0", "endCursor": "v0"},
                "edges": [{"node": {
                    "id": "dvo-1",
                    "reachability": "UNREACHABLE",
                    "fixability": "UPGRADE_AVAILABLE",
                    "package": {"name": "lodash", "ecosystem": "npm"},
                    "packageVersion": {"version": "4.17.15"},
                    "vulnerability": {
                        "identifier": "GHSA-p6mc-m468-83gw",
                        "severity": "CRITICAL",
                        "fixedVersions": ["4.17.19"]
                    }
                }}]
            }}})),
        ]);
        let mut registry = ToolRegistry::new();
        registry
            .register(DependencyVulnerabilitiesTool::new(client(&executor)))
            .unwrap();

        let result = registry
            .dispatch(
                "deepsource_dependency_vulnerabilities",
                Some(json!({"projectKey": "dsn-demo", "first": 1})),
            )
            .await;

        assert!(!result.is_error, "{:?}", result.text());
        let output = result.structured_content.unwrap();
        assert_eq!(output["vulnerabilities"][0]["package"]["name"], "lodash");
        assert_eq!(output["fixable_count"], 1);
        assert_eq!(output["page_info"]["has_next_page"], true);
    }

    #[tokio::test]
    async fn test_rate_limit_error_carries_hint() {
        let executor = ScriptedExecutor::new(vec![Err(ClassifiedError::new(
            ErrorCategory::RateLimit,
            "Too many requests",
        ))]);
        let mut registry = ToolRegistry::new();
        registry
            .register(DependencyVulnerabilitiesTool::new(client(&executor)))
            .unwrap();

        let result = registry
            .dispatch(
                "deepsource_dependency_vulnerabilities",
                Some(json!({"projectKey": "dsn-demo"})),
            )
            .await;

        assert!(result.is_error);
        assert!(result.text().unwrap().contains("rate limiting"));
        assert_eq!(result.structured_content.unwrap()["category"], "RATE_LIMIT");
    }
}
