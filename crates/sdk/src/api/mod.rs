//! Domain APIs of the DeepSource GraphQL schema.

mod compliance;
mod issues;
mod metrics;
mod projects;
mod runs;
mod vulnerabilities;

pub use compliance::ComplianceApi;
pub use issues::{IssueFilter, IssuesApi};
pub use metrics::{MetricsApi, MutationOutcome};
pub use projects::ProjectsApi;
pub use runs::{RunFilter, RunsApi};
pub use vulnerabilities::VulnerabilitiesApi;

use crate::error::{ClassifiedError, DeepSourceResult};
use deepsource_core::{Project, ProjectKey};

/// Variables addressing a repository in project-scoped queries.
pub(crate) fn repository_variables(project: &Project) -> serde_json::Value {
    serde_json::json!({
        "login": project.repository.login,
        "name": project.name,
        "provider": project.repository.provider.as_str(),
    })
}

/// Unwrap a `repository` field that the API returned as null.
pub(crate) fn require_repository<T>(repository: Option<T>, key: &ProjectKey) -> DeepSourceResult<T> {
    repository.ok_or_else(|| {
        ClassifiedError::not_found(format!("Repository for project '{key}' was not found"))
            .with_metadata("project_key", key.as_str())
    })
}

/// Query fragment for the fields of an analysis run.
pub(crate) const RUN_FIELDS: &str = r#"
    id
    runUid
    commitOid
    branchName
    baseOid
    status
    createdAt
    updatedAt
    finishedAt
    summary {
      occurrencesIntroduced
      occurrencesResolved
      occurrencesSuppressed
      occurrenceDistributionByAnalyzer { analyzerShortcode introduced }
      occurrenceDistributionByCategory { category introduced }
    }
"#;

/// Query fragment for a connection's page info.
pub(crate) const PAGE_INFO_FIELDS: &str =
    "totalCount pageInfo { hasNextPage hasPreviousPage startCursor endCursor }";
