//! Analysis runs API.

use super::issues::IssueNode;
use super::{repository_variables, require_repository, PAGE_INFO_FIELDS, RUN_FIELDS};
use crate::client::DeepSourceClient;
use crate::error::{ClassifiedError, DeepSourceResult};
use crate::graphql::{merge_variables, pagination_variables, Connection, GraphQlRequest};
use chrono::{DateTime, Utc};
use deepsource_core::{
    AnalysisRun, AnalyzerDistribution, CategoryDistribution, Issue, IssueCategory, Page,
    Pagination, ProjectKey, RunStatus, RunSummary, MAX_PAGE_SIZE,
};
use serde::Deserialize;
use tracing::{debug, warn};

/// Pages scanned when looking for the latest run on a branch.
const MAX_BRANCH_SCAN_PAGES: usize = 10;

/// Filters for listing a project's runs.
#[derive(Debug, Clone, Default)]
pub struct RunFilter {
    pub pagination: Pagination,
    /// Keep only runs in which one of these analyzers reported occurrences.
    pub analyzers: Vec<String>,
}

fn list_runs_query() -> String {
    format!(
        r#"
query projectRuns(
  $login: String!, $name: String!, $provider: VCSProvider!,
  $first: Int, $after: String, $last: Int, $before: String
) {{
  repository(login: $login, name: $name, vcsProvider: $provider) {{
    analysisRuns(first: $first, after: $after, last: $last, before: $before) {{
      {PAGE_INFO_FIELDS}
      edges {{ node {{ {RUN_FIELDS} }} }}
    }}
  }}
}}
"#
    )
}

fn get_run_query() -> String {
    format!(
        r#"
query run($runUid: UUID, $commitOid: String) {{
  run(runUid: $runUid, commitOid: $commitOid) {{
    {RUN_FIELDS}
  }}
}}
"#
    )
}

/// Occurrences fetched per request when walking a check's occurrences.
const OCCURRENCES_PER_PAGE: u32 = 100;

/// Follow-up pages fetched per check before giving up on the rest.
const MAX_OCCURRENCE_PAGES: usize = 50;

const OCCURRENCE_FIELDS: &str = r#"
    id
    path
    beginLine
    endLine
    issue {
      shortcode
      title
      category
      severity
      description
      tags
      analyzer { shortcode }
    }
"#;

fn run_issues_query() -> String {
    format!(
        r#"
query runIssues($runUid: UUID!) {{
  run(runUid: $runUid) {{
    runUid
    checks {{
      edges {{
        node {{
          id
          analyzer {{ shortcode }}
          occurrences(first: {OCCURRENCES_PER_PAGE}) {{
            {PAGE_INFO_FIELDS}
            edges {{ node {{ {OCCURRENCE_FIELDS} }} }}
          }}
        }}
      }}
    }}
  }}
}}
"#
    )
}

fn check_occurrences_query() -> String {
    format!(
        r#"
query checkOccurrences($checkId: ID!, $after: String) {{
  node(id: $checkId) {{
    ... on Check {{
      occurrences(first: {OCCURRENCES_PER_PAGE}, after: $after) {{
        {PAGE_INFO_FIELDS}
        edges {{ node {{ {OCCURRENCE_FIELDS} }} }}
      }}
    }}
  }}
}}
"#
    )
}

/// Runs API for analysis runs of a project.
pub struct RunsApi<'a> {
    client: &'a DeepSourceClient,
}

impl<'a> RunsApi<'a> {
    pub(crate) fn new(client: &'a DeepSourceClient) -> Self {
        Self { client }
    }

    /// List a page of a project's runs, most recent first.
    ///
    /// The analyzer filter applies to the fetched page, so a filtered page
    /// may hold fewer runs than requested. Its `page_info` still addresses
    /// the unfiltered window and `total_count` is dropped.
    pub async fn list(&self, key: &ProjectKey, filter: &RunFilter) -> DeepSourceResult<Page<AnalysisRun>> {
        filter.pagination.validate()?;
        let project = self.client.projects().get(key).await?;
        let mut page = self.fetch_page(key, &project, &filter.pagination).await?;

        if !filter.analyzers.is_empty() {
            page.items
                .retain(|run| run.involves_any_analyzer(&filter.analyzers));
            page.total_count = None;
        }
        Ok(page)
    }

    /// Get a run by its run UID or commit OID.
    pub async fn get(&self, run_uid_or_commit_oid: &str) -> DeepSourceResult<AnalysisRun> {
        let id = run_uid_or_commit_oid.trim();
        let variables = if uuid::Uuid::parse_str(id).is_ok() {
            serde_json::json!({ "runUid": id })
        } else {
            serde_json::json!({ "commitOid": id })
        };
        let request = GraphQlRequest::new(get_run_query(), variables).operation("run");

        let response: RunResponse<RunNode> = self.client.query(request).await?;
        let run = response.run.ok_or_else(|| {
            ClassifiedError::not_found(format!("Run '{id}' was not found"))
                .with_metadata("run", id)
        })?;
        Ok(run.into())
    }

    /// Most recent run on `branch`.
    pub async fn recent_for_branch(&self, key: &ProjectKey, branch: &str) -> DeepSourceResult<AnalysisRun> {
        let project = self.client.projects().get(key).await?;
        let mut pagination = Pagination::first(MAX_PAGE_SIZE);
        let mut latest: Option<AnalysisRun> = None;

        for page_number in 1..=MAX_BRANCH_SCAN_PAGES {
            let page = self.fetch_page(key, &project, &pagination).await?;
            for run in page.items {
                if run.branch_name.as_deref() != Some(branch) {
                    continue;
                }
                if latest.as_ref().map_or(true, |l| run.created_at > l.created_at) {
                    latest = Some(run);
                }
            }

            match page.page_info.end_cursor {
                Some(cursor) if page.page_info.has_next_page => {
                    pagination = Pagination::first(MAX_PAGE_SIZE).after(cursor);
                }
                _ => break,
            }
            debug!(project = %key, branch, page = page_number, "Scanning next page of runs");
        }

        latest.ok_or_else(|| {
            ClassifiedError::not_found(format!(
                "No analysis runs found for branch '{branch}' in project '{key}'"
            ))
            .with_metadata("project_key", key.as_str())
            .with_metadata("branch", branch)
        })
    }

    /// Issue occurrences reported in a run.
    pub async fn issues_in_run(&self, run_uid: &str, pagination: &Pagination) -> DeepSourceResult<Page<Issue>> {
        pagination.validate()?;
        let request = GraphQlRequest::new(run_issues_query(), serde_json::json!({ "runUid": run_uid }))
            .operation("runIssues");

        let response: RunResponse<RunChecks> = self.client.query(request).await?;
        let run = response.run.ok_or_else(|| {
            ClassifiedError::not_found(format!("Run '{run_uid}' was not found"))
                .with_metadata("run", run_uid)
        })?;

        let mut issues: Vec<Issue> = Vec::new();
        let mut reported: u64 = 0;
        for check in run.checks.nodes() {
            let analyzer = check.analyzer.map(|a| a.shortcode);
            let mut occurrences = check.occurrences;
            reported += occurrences.total_count.unwrap_or(0);

            for page_number in 1.. {
                let page_info = occurrences.page_info.clone().unwrap_or_default();
                issues.extend(occurrences.nodes().map(|node| {
                    let mut issue = node.into_issue();
                    if issue.analyzer.is_none() {
                        issue.analyzer = analyzer.clone();
                    }
                    issue
                }));

                let has_next = page_info.has_next_page;
                let cursor = page_info.end_cursor.filter(|_| has_next);
                let (Some(check_id), Some(cursor)) = (check.id.as_deref(), cursor) else {
                    break;
                };
                if page_number > MAX_OCCURRENCE_PAGES {
                    warn!(run_uid, check = check_id, pages = page_number, "Occurrence listing truncated");
                    break;
                }
                debug!(run_uid, check = check_id, page = page_number, "Fetching next page of occurrences");
                occurrences = self.check_occurrences(check_id, &cursor).await?;
            }
        }

        let fetched = issues.len() as u64;
        let mut page = Page::from_items(issues, pagination)?;
        if reported > fetched {
            page.total_count = Some(reported);
        }
        Ok(page)
    }

    async fn check_occurrences(&self, check_id: &str, after: &str) -> DeepSourceResult<Connection<IssueNode>> {
        let variables = serde_json::json!({ "checkId": check_id, "after": after });
        let request =
            GraphQlRequest::new(check_occurrences_query(), variables).operation("checkOccurrences");

        let response: NodeResponse = self.client.query(request).await?;
        response.node.map(|check| check.occurrences).ok_or_else(|| {
            ClassifiedError::not_found(format!("Check '{check_id}' was not found"))
                .with_metadata("check", check_id)
        })
    }

    async fn fetch_page(
        &self,
        key: &ProjectKey,
        project: &deepsource_core::Project,
        pagination: &Pagination,
    ) -> DeepSourceResult<Page<AnalysisRun>> {
        let variables = merge_variables(repository_variables(project), pagination_variables(pagination));
        let request = GraphQlRequest::new(list_runs_query(), variables).operation("projectRuns");

        let response: RepositoryResponse = self.client.query(request).await?;
        let repository = require_repository(response.repository, key)?;
        Ok(repository.analysis_runs.into_page(AnalysisRun::from))
    }
}

#[derive(Debug, Deserialize)]
struct RepositoryResponse {
    repository: Option<RepositoryRuns>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryRuns {
    analysis_runs: Connection<RunNode>,
}

#[derive(Debug, Deserialize)]
struct RunResponse<T> {
    run: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunNode {
    id: String,
    run_uid: String,
    commit_oid: String,
    branch_name: Option<String>,
    base_oid: Option<String>,
    status: RunStatus,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    summary: Option<SummaryNode>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryNode {
    #[serde(default)]
    occurrences_introduced: Option<u64>,
    #[serde(default)]
    occurrences_resolved: Option<u64>,
    #[serde(default)]
    occurrences_suppressed: Option<u64>,
    #[serde(default)]
    occurrence_distribution_by_analyzer: Option<Vec<AnalyzerCount>>,
    #[serde(default)]
    occurrence_distribution_by_category: Option<Vec<CategoryCount>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzerCount {
    analyzer_shortcode: String,
    #[serde(default)]
    introduced: u64,
}

#[derive(Debug, Deserialize)]
struct CategoryCount {
    category: IssueCategory,
    #[serde(default)]
    introduced: u64,
}

impl From<RunNode> for AnalysisRun {
    fn from(node: RunNode) -> Self {
        let summary = node.summary.unwrap_or_default();
        Self {
            id: node.id,
            run_uid: node.run_uid,
            commit_oid: node.commit_oid,
            branch_name: node.branch_name,
            base_oid: node.base_oid,
            status: node.status,
            created_at: node.created_at,
            updated_at: node.updated_at,
            finished_at: node.finished_at,
            summary: RunSummary {
                occurrences_introduced: summary.occurrences_introduced.unwrap_or(0),
                occurrences_resolved: summary.occurrences_resolved.unwrap_or(0),
                occurrences_suppressed: summary.occurrences_suppressed.unwrap_or(0),
                by_analyzer: summary
                    .occurrence_distribution_by_analyzer
                    .unwrap_or_default()
                    .into_iter()
                    .map(|d| AnalyzerDistribution {
                        analyzer: d.analyzer_shortcode,
                        introduced: d.introduced,
                    })
                    .collect(),
                by_category: summary
                    .occurrence_distribution_by_category
                    .unwrap_or_default()
                    .into_iter()
                    .map(|d| CategoryDistribution {
                        category: d.category,
                        introduced: d.introduced,
                    })
                    .collect(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct RunChecks {
    checks: Connection<CheckNode>,
}

#[derive(Debug, Deserialize)]
struct CheckNode {
    #[serde(default)]
    id: Option<String>,
    analyzer: Option<CheckAnalyzer>,
    occurrences: Connection<IssueNode>,
}

#[derive(Debug, Deserialize)]
struct NodeResponse {
    node: Option<CheckOccurrences>,
}

#[derive(Debug, Deserialize)]
struct CheckOccurrences {
    occurrences: Connection<IssueNode>,
}

#[derive(Debug, Deserialize)]
struct CheckAnalyzer {
    shortcode: String,
}
