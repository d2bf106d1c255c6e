use chrono::{DateTime, Utc};
use schemars::{JsonSchema, Schema, SchemaGenerator};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Project key as issued by DeepSource (the repository DSN)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ProjectKey(pub String);

impl ProjectKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ProjectKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for ProjectKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Version control provider hosting a repository
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VcsProvider {
    Github,
    Gitlab,
    Bitbucket,
    Ads,
    GithubEnterprise,
    Gsr,
    Other(String),
}

impl VcsProvider {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Github => "GITHUB",
            Self::Gitlab => "GITLAB",
            Self::Bitbucket => "BITBUCKET",
            Self::Ads => "ADS",
            Self::GithubEnterprise => "GITHUB_ENTERPRISE",
            Self::Gsr => "GSR",
            Self::Other(tag) => tag,
        }
    }
}

impl From<String> for VcsProvider {
    fn from(tag: String) -> Self {
        match tag.to_ascii_uppercase().as_str() {
            "GITHUB" => Self::Github,
            "GITLAB" => Self::Gitlab,
            "BITBUCKET" => Self::Bitbucket,
            "ADS" => Self::Ads,
            "GITHUB_ENTERPRISE" => Self::GithubEnterprise,
            "GSR" => Self::Gsr,
            _ => Self::Other(tag),
        }
    }
}

impl From<VcsProvider> for String {
    fn from(provider: VcsProvider) -> Self {
        provider.as_str().to_string()
    }
}

// Serialized as a bare tag, so the schema is that of a string.
impl JsonSchema for VcsProvider {
    fn schema_name() -> Cow<'static, str> {
        "VcsProvider".into()
    }

    fn json_schema(generator: &mut SchemaGenerator) -> Schema {
        String::json_schema(generator)
    }
}

impl std::fmt::Display for VcsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Repository coordinates backing a DeepSource project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProjectRepository {
    /// Opaque repository ID, required by mutations
    pub id: String,
    /// Owning account login (organization or user)
    pub login: String,
    pub provider: VcsProvider,
    pub default_branch: Option<String>,
    pub is_private: bool,
    pub is_activated: bool,
    pub url: Option<String>,
}

/// A repository activated on DeepSource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Project {
    pub key: ProjectKey,
    pub name: String,
    pub repository: ProjectRepository,
}

/// Severity assigned to an issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueSeverity {
    Critical,
    Major,
    Minor,
    #[serde(other)]
    Unknown,
}

/// Category assigned to an issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCategory {
    AntiPattern,
    BugRisk,
    Performance,
    Security,
    Coverage,
    Typecheck,
    Secrets,
    Style,
    Documentation,
    #[serde(other)]
    Unknown,
}

/// A single issue occurrence reported by an analyzer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Issue {
    pub id: String,
    pub shortcode: String,
    pub title: String,
    pub category: IssueCategory,
    pub severity: IssueSeverity,
    pub status: Option<String>,
    pub description: Option<String>,
    pub analyzer: Option<String>,
    pub path: Option<String>,
    pub begin_line: Option<u32>,
    pub end_line: Option<u32>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Status of an analysis run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Pending,
    Success,
    Failure,
    Timeout,
    Cancel,
    Ready,
    Skipped,
}

impl RunStatus {
    /// Whether the run has stopped producing results
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Introduced occurrences attributed to one analyzer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AnalyzerDistribution {
    pub analyzer: String,
    pub introduced: u64,
}

/// Introduced occurrences attributed to one issue category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CategoryDistribution {
    pub category: IssueCategory,
    pub introduced: u64,
}

/// Occurrence counts for an analysis run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RunSummary {
    pub occurrences_introduced: u64,
    pub occurrences_resolved: u64,
    pub occurrences_suppressed: u64,
    #[serde(default)]
    pub by_analyzer: Vec<AnalyzerDistribution>,
    #[serde(default)]
    pub by_category: Vec<CategoryDistribution>,
}

/// One analysis run over a commit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisRun {
    pub id: String,
    pub run_uid: String,
    pub commit_oid: String,
    pub branch_name: Option<String>,
    pub base_oid: Option<String>,
    pub status: RunStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub summary: RunSummary,
}

impl AnalysisRun {
    /// Whether any analyzer in `shortcodes` reported on this run
    pub fn involves_any_analyzer(&self, shortcodes: &[String]) -> bool {
        self.summary
            .by_analyzer
            .iter()
            .any(|d| shortcodes.iter().any(|s| s.eq_ignore_ascii_case(&d.analyzer)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vcs_provider_roundtrip_known_and_unknown() {
        let github: VcsProvider = serde_json::from_str("\"GITHUB\"").unwrap();
        assert_eq!(github, VcsProvider::Github);
        assert_eq!(serde_json::to_string(&github).unwrap(), "\"GITHUB\"");

        let other: VcsProvider = serde_json::from_str("\"GITEA\"").unwrap();
        assert_eq!(other, VcsProvider::Other("GITEA".to_string()));
        assert_eq!(serde_json::to_string(&other).unwrap(), "\"GITEA\"");
    }

    #[test]
    fn test_issue_enums_tolerate_unknown_tags() {
        let severity: IssueSeverity = serde_json::from_str("\"BLOCKER\"").unwrap();
        assert_eq!(severity, IssueSeverity::Unknown);

        let category: IssueCategory = serde_json::from_str("\"BUG_RISK\"").unwrap();
        assert_eq!(category, IssueCategory::BugRisk);
    }

    #[test]
    fn test_run_status_terminal() {
        assert!(!RunStatus::Pending.is_terminal());
        assert!(RunStatus::Success.is_terminal());
        assert!(RunStatus::Timeout.is_terminal());
    }

    #[test]
    fn test_run_involves_analyzer() {
        let run = AnalysisRun {
            id: "1".to_string(),
            run_uid: "uid".to_string(),
            commit_oid: "abc".to_string(),
            branch_name: Some("main".to_string()),
            base_oid: None,
            status: RunStatus::Success,
            created_at: Utc::now(),
            updated_at: None,
            finished_at: None,
            summary: RunSummary {
                by_analyzer: vec![AnalyzerDistribution {
                    analyzer: "python".to_string(),
                    introduced: 3,
                }],
                ..Default::default()
            },
        };

        assert!(run.involves_any_analyzer(&["Python".to_string()]));
        assert!(!run.involves_any_analyzer(&["go".to_string()]));
    }
}
