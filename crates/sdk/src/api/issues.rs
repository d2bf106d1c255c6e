//! Issues API.

use super::{repository_variables, require_repository, PAGE_INFO_FIELDS};
use crate::client::DeepSourceClient;
use crate::error::DeepSourceResult;
use crate::graphql::{merge_variables, pagination_variables, Connection, GraphQlRequest};
use deepsource_core::{Issue, IssueCategory, IssueSeverity, Page, Pagination, ProjectKey};
use serde::Deserialize;

/// Filters for listing a project's issues.
#[derive(Debug, Clone, Default)]
pub struct IssueFilter {
    pub pagination: Pagination,
    /// Only issues in this file path.
    pub path: Option<String>,
    /// Only issues raised by these analyzer shortcodes.
    pub analyzers: Vec<String>,
    pub tags: Vec<String>,
}

fn list_issues_query() -> String {
    format!(
        r#"
query projectIssues(
  $login: String!, $name: String!, $provider: VCSProvider!,
  $first: Int, $after: String, $last: Int, $before: String,
  $path: String, $analyzerIn: [String], $tags: [String]
) {{
  repository(login: $login, name: $name, vcsProvider: $provider) {{
    issues(
      first: $first, after: $after, last: $last, before: $before,
      path: $path, analyzerIn: $analyzerIn, tags: $tags
    ) {{
      {PAGE_INFO_FIELDS}
      edges {{
        node {{
          id
          status
          path
          beginLine
          endLine
          tags
          issue {{
            shortcode
            title
            category
            severity
            description
            analyzer {{ shortcode }}
          }}
        }}
      }}
    }}
  }}
}}
"#
    )
}

/// Issues API for the occurrences currently open in a project.
pub struct IssuesApi<'a> {
    client: &'a DeepSourceClient,
}

impl<'a> IssuesApi<'a> {
    pub(crate) fn new(client: &'a DeepSourceClient) -> Self {
        Self { client }
    }

    /// List a page of a project's issues.
    pub async fn list(&self, key: &ProjectKey, filter: &IssueFilter) -> DeepSourceResult<Page<Issue>> {
        filter.pagination.validate()?;
        let project = self.client.projects().get(key).await?;

        let variables = merge_variables(
            merge_variables(
                repository_variables(&project),
                pagination_variables(&filter.pagination),
            ),
            serde_json::json!({
                "path": filter.path,
                "analyzerIn": (!filter.analyzers.is_empty()).then_some(&filter.analyzers),
                "tags": (!filter.tags.is_empty()).then_some(&filter.tags),
            }),
        );
        let request = GraphQlRequest::new(list_issues_query(), variables).operation("projectIssues");

        let response: RepositoryResponse = self.client.query(request).await?;
        let repository = require_repository(response.repository, key)?;
        Ok(repository.issues.into_page(IssueNode::into_issue))
    }
}

#[derive(Debug, Deserialize)]
struct RepositoryResponse {
    repository: Option<RepositoryIssues>,
}

#[derive(Debug, Deserialize)]
struct RepositoryIssues {
    issues: Connection<IssueNode>,
}

/// An issue occurrence as returned by the `issues` connection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct IssueNode {
    id: String,
    status: Option<String>,
    path: Option<String>,
    begin_line: Option<u32>,
    end_line: Option<u32>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    issue: IssueDefinition,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IssueDefinition {
    shortcode: String,
    title: String,
    category: IssueCategory,
    severity: IssueSeverity,
    description: Option<String>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    analyzer: Option<AnalyzerRef>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnalyzerRef {
    shortcode: String,
}

impl IssueNode {
    pub(crate) fn into_issue(self) -> Issue {
        let tags = self
            .tags
            .or(self.issue.tags)
            .unwrap_or_default();
        Issue {
            id: self.id,
            shortcode: self.issue.shortcode,
            title: self.issue.title,
            category: self.issue.category,
            severity: self.issue.severity,
            status: self.status,
            description: self.issue.description,
            analyzer: self.issue.analyzer.map(|a| a.shortcode),
            path: self.path,
            begin_line: self.begin_line,
            end_line: self.end_line,
            tags,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::projects::tests::viewer_payload;
    use crate::client::tests::{client_with, StaticExecutor};
    use crate::error::ErrorCategory;
    use serde_json::json;

    fn issues_payload() -> serde_json::Value {
        json!({
            "repository": {
                "issues": {
                    "totalCount": 42,
                    "pageInfo": {
                        "hasNextPage": true,
                        "hasPreviousPage": false,
                        "startCursor": "YXJyYXljb25uZWN0aW9uOjA=",
                        "endCursor": "YXJyYXljb25uZWN0aW9uOjE="
                    },
                    "edges": [
                        {"node": {
                            "id": "T2NjdXJyZW5jZTox",
                            "status": "OPEN",
                            "path": "src/main.rs",
                            "beginLine": 10,
                            "endLine": 12,
                            "tags": ["security"],
                            "issue": {
                                "shortcode": "RS-E1021",
                                "title": "Potential panic",
                                "category": "BUG_RISK",
                                "severity": "MAJOR",
                                "description": "Calling unwrap on None",
                                "analyzer": {"shortcode": "rust"}
                            }
                        }},
                        {"node": {
                            "id": "T2NjdXJyZW5jZToy",
                            "status": "OPEN",
                            "path": "src/lib.rs",
                            "beginLine": 3,
                            "endLine": 3,
                            "issue": {
                                "shortcode": "RS-W1000",
                                "title": "Unused import",
                                "category": "ANTI_PATTERN",
                                "severity": "MINOR",
                                "tags": ["cleanup"]
                            }
                        }}
                    ]
                }
            }
        })
    }

    #[tokio::test]
    async fn test_list_maps_issues_and_page_info() {
        let executor = StaticExecutor::new(vec![Ok(viewer_payload()), Ok(issues_payload())]);
        let client = client_with(executor.clone());

        let filter = IssueFilter {
            pagination: Pagination::first(2),
            path: Some("src".to_string()),
            analyzers: vec!["rust".to_string()],
            tags: Vec::new(),
        };
        let page = client
            .issues()
            .list(&ProjectKey::from("dsn-demo"), &filter)
            .await
            .unwrap();

        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total_count, Some(42));
        assert!(page.page_info.has_next_page);

        let first = &page.items[0];
        assert_eq!(first.shortcode, "RS-E1021");
        assert_eq!(first.category, IssueCategory::BugRisk);
        assert_eq!(first.severity, IssueSeverity::Major);
        assert_eq!(first.analyzer.as_deref(), Some("rust"));
        assert_eq!(first.begin_line, Some(10));
        assert_eq!(page.items[1].tags, vec!["cleanup".to_string()]);

        let variables = executor.last_variables();
        assert_eq!(variables["login"], "acme");
        assert_eq!(variables["name"], "demo");
        assert_eq!(variables["provider"], "GITHUB");
        assert_eq!(variables["first"], 2);
        assert_eq!(variables["path"], "src");
        assert_eq!(variables["analyzerIn"], json!(["rust"]));
        assert!(variables["tags"].is_null());
    }

    #[tokio::test]
    async fn test_invalid_pagination_is_rejected_before_any_request() {
        let executor = StaticExecutor::ok(viewer_payload());
        let client = client_with(executor.clone());

        let filter = IssueFilter {
            pagination: Pagination::first(500),
            ..Default::default()
        };
        let error = client
            .issues()
            .list(&ProjectKey::from("dsn-demo"), &filter)
            .await
            .unwrap_err();

        assert_eq!(error.category(), ErrorCategory::Client);
        assert_eq!(executor.request_count(), 0);
    }

    #[tokio::test]
    async fn test_null_repository_is_not_found() {
        let executor =
            StaticExecutor::new(vec![Ok(viewer_payload()), Ok(json!({"repository": null}))]);
        let client = client_with(executor);

        let error = client
            .issues()
            .list(&ProjectKey::from("dsn-demo"), &IssueFilter::default())
            .await
            .unwrap_err();

        assert_eq!(error.category(), ErrorCategory::NotFound);
    }
}
