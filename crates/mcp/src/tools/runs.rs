// Analysis run tools

use crate::tools::{validate_pagination, validate_project_key, Tool, ToolInput, PAGINATION_USAGE};
use deepsource_core::{AnalysisRun, Issue, PageInfo, Pagination, ProjectKey};
use deepsource_sdk::{DeepSourceClient, RunFilter};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Lists analysis runs of a project
pub struct ProjectRunsTool {
    client: DeepSourceClient,
}

impl ProjectRunsTool {
    pub fn new(client: DeepSourceClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRunsInput {
    /// Project key from deepsource_projects
    pub project_key: ProjectKey,
    /// Only runs in which these analyzers reported occurrences; applied to
    /// the fetched page, so filtered pages can be short
    #[serde(default)]
    pub analyzer_in: Option<Vec<String>>,
    #[serde(flatten)]
    pub pagination: Pagination,
}

impl ToolInput for ProjectRunsInput {
    fn validate(&self) -> Result<(), String> {
        validate_project_key(&self.project_key)?;
        validate_pagination(&self.pagination)
    }
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ProjectRunsOutput {
    pub runs: Vec<AnalysisRun>,
    pub page_info: PageInfo,
    pub total_count: Option<u64>,
    pub usage: String,
}

#[async_trait::async_trait]
impl Tool for ProjectRunsTool {
    type Input = ProjectRunsInput;
    type Output = ProjectRunsOutput;

    fn name(&self) -> &'static str {
        "deepsource_project_runs"
    }

    fn description(&self) -> &'static str {
        "List analysis runs of a DeepSource project, most recent first, with \
         per-run occurrence summaries. Supports cursor pagination. The analyzerIn \
         filter is applied to each fetched page: a filtered page may hold fewer \
         runs than requested, keep paging with page_info, and total_count is null."
    }

    async fn call(&self, input: ProjectRunsInput) -> anyhow::Result<ProjectRunsOutput> {
        let filter = RunFilter {
            pagination: input.pagination,
            analyzers: input.analyzer_in.unwrap_or_default(),
        };
        let page = self.client.runs().list(&input.project_key, &filter).await?;

        Ok(ProjectRunsOutput {
            runs: page.items,
            page_info: page.page_info,
            total_count: page.total_count,
            usage: PAGINATION_USAGE.to_string(),
        })
    }
}

/// Fetches a single analysis run
pub struct RunTool {
    client: DeepSourceClient,
}

impl RunTool {
    pub fn new(client: DeepSourceClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RunInput {
    /// Run UID or commit OID of the run
    pub run_identifier: String,
}

impl ToolInput for RunInput {
    fn validate(&self) -> Result<(), String> {
        if self.run_identifier.trim().is_empty() {
            return Err("runIdentifier must not be empty".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct RunOutput {
    pub run: AnalysisRun,
}

#[async_trait::async_trait]
impl Tool for RunTool {
    type Input = RunInput;
    type Output = RunOutput;

    fn name(&self) -> &'static str {
        "deepsource_run"
    }

    fn description(&self) -> &'static str {
        "Get a single DeepSource analysis run by its run UID or commit OID."
    }

    async fn call(&self, input: RunInput) -> anyhow::Result<RunOutput> {
        let run = self.client.runs().get(&input.run_identifier).await?;
        Ok(RunOutput { run })
    }
}

/// Issues raised by the latest run on a branch
pub struct RecentRunIssuesTool {
    client: DeepSourceClient,
}

impl RecentRunIssuesTool {
    pub fn new(client: DeepSourceClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecentRunIssuesInput {
    /// Project key from deepsource_projects
    pub project_key: ProjectKey,
    /// Branch whose most recent run is inspected
    pub branch_name: String,
    #[serde(flatten)]
    pub pagination: Pagination,
}

impl ToolInput for RecentRunIssuesInput {
    fn validate(&self) -> Result<(), String> {
        validate_project_key(&self.project_key)?;
        if self.branch_name.trim().is_empty() {
            return Err("branchName must not be empty".to_string());
        }
        validate_pagination(&self.pagination)
    }
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct RecentRunIssuesOutput {
    pub run: AnalysisRun,
    pub issues: Vec<Issue>,
    pub page_info: PageInfo,
    pub total_count: Option<u64>,
    pub usage: String,
}

#[async_trait::async_trait]
impl Tool for RecentRunIssuesTool {
    type Input = RecentRunIssuesInput;
    type Output = RecentRunIssuesOutput;

    fn name(&self) -> &'static str {
        "deepsource_recent_run_issues"
    }

    fn description(&self) -> &'static str {
        "Find the most recent analysis run on a branch and list the issues it \
         reported. Supports cursor pagination over the issues."
    }

    async fn call(&self, input: RecentRunIssuesInput) -> anyhow::Result<RecentRunIssuesOutput> {
        let runs = self.client.runs();
        let run = runs
            .recent_for_branch(&input.project_key, &input.branch_name)
            .await?;
        let page = runs.issues_in_run(&run.run_uid, &input.pagination).await?;

        Ok(RecentRunIssuesOutput {
            run,
            issues: page.items,
            page_info: page.page_info,
            total_count: page.total_count,
            usage: PAGINATION_USAGE.to_string(),
        })
    }
}
