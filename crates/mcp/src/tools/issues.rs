// Project issues tool

use crate::tools::{validate_pagination, validate_project_key, Tool, ToolInput, PAGINATION_USAGE};
use deepsource_core::{Issue, PageInfo, Pagination, ProjectKey};
use deepsource_sdk::{DeepSourceClient, IssueFilter};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Lists issues currently open in a project
pub struct ProjectIssuesTool {
    client: DeepSourceClient,
}

impl ProjectIssuesTool {
    pub fn new(client: DeepSourceClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectIssuesInput {
    /// Project key from deepsource_projects
    pub project_key: ProjectKey,
    /// Only issues in this file path
    #[serde(default)]
    pub path: Option<String>,
    /// Only issues raised by these analyzers (e.g. "python", "rust")
    #[serde(default)]
    pub analyzer_in: Option<Vec<String>>,
    /// Only issues carrying these tags
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(flatten)]
    pub pagination: Pagination,
}

impl ToolInput for ProjectIssuesInput {
    fn validate(&self) -> Result<(), String> {
        validate_project_key(&self.project_key)?;
        validate_pagination(&self.pagination)
    }
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ProjectIssuesOutput {
    pub issues: Vec<Issue>,
    pub page_info: PageInfo,
    pub total_count: Option<u64>,
    pub usage: String,
}

#[async_trait::async_trait]
impl Tool for ProjectIssuesTool {
    type Input = ProjectIssuesInput;
    type Output = ProjectIssuesOutput;

    fn name(&self) -> &'static str {
        "deepsource_project_issues"
    }

    fn description(&self) -> &'static str {
        "List issues found by DeepSource in a project, optionally filtered by \
         file path, analyzer and tags. Supports cursor pagination."
    }

    async fn call(&self, input: ProjectIssuesInput) -> anyhow::Result<ProjectIssuesOutput> {
        let filter = IssueFilter {
            pagination: input.pagination,
            path: input.path,
            analyzers: input.analyzer_in.unwrap_or_default(),
            tags: input.tags.unwrap_or_default(),
        };
        let page = self.client.issues().list(&input.project_key, &filter).await?;

        Ok(ProjectIssuesOutput {
            issues: page.items,
            page_info: page.page_info,
            total_count: page.total_count,
            usage: PAGINATION_USAGE.to_string(),
        })
    }
}
