use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Report kinds served by the DeepSource reports API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportType {
    #[serde(rename = "OWASP_TOP_10")]
    OwaspTop10,
    #[serde(rename = "SANS_TOP_25")]
    SansTop25,
    MisraC,
    CodeCoverage,
    CodeHealthTrend,
    IssueDistribution,
    IssuesPrevented,
    IssueTrends,
}

impl ReportType {
    pub const ALL: [ReportType; 8] = [
        Self::OwaspTop10,
        Self::SansTop25,
        Self::MisraC,
        Self::CodeCoverage,
        Self::CodeHealthTrend,
        Self::IssueDistribution,
        Self::IssuesPrevented,
        Self::IssueTrends,
    ];

    /// Security standards that report per-category issue statistics
    pub fn is_compliance(&self) -> bool {
        matches!(self, Self::OwaspTop10 | Self::SansTop25 | Self::MisraC)
    }

    /// Field on the `reports` GraphQL object that serves this report
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::OwaspTop10 => "owaspTop10",
            Self::SansTop25 => "sansTop25",
            Self::MisraC => "misraC",
            Self::CodeCoverage => "codeCoverage",
            Self::CodeHealthTrend => "codeHealthTrend",
            Self::IssueDistribution => "issueDistribution",
            Self::IssuesPrevented => "issuesPrevented",
            Self::IssueTrends => "issueTrends",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OwaspTop10 => "OWASP_TOP_10",
            Self::SansTop25 => "SANS_TOP_25",
            Self::MisraC => "MISRA_C",
            Self::CodeCoverage => "CODE_COVERAGE",
            Self::CodeHealthTrend => "CODE_HEALTH_TREND",
            Self::IssueDistribution => "ISSUE_DISTRIBUTION",
            Self::IssuesPrevented => "ISSUES_PREVENTED",
            Self::IssueTrends => "ISSUE_TRENDS",
        }
    }
}

impl std::fmt::Display for ReportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overall outcome of a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    Passing,
    Failing,
    Noop,
}

/// Occurrence counts split by severity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SeverityCounts {
    pub critical: u64,
    pub major: u64,
    pub minor: u64,
    pub total: u64,
}

/// Issue statistics for one category of a security standard (e.g. `A03` for OWASP)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SecurityIssueStat {
    pub key: String,
    pub title: String,
    pub occurrence: SeverityCounts,
}

/// A point in a report's historical trend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReportTrend {
    pub label: Option<String>,
    pub value: Option<f64>,
    pub change_percentage: Option<f64>,
}

/// Compliance or insight report for a repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ComplianceReport {
    pub key: ReportType,
    pub title: String,
    pub current_value: Option<f64>,
    pub status: Option<ReportStatus>,
    #[serde(default)]
    pub security_issue_stats: Vec<SecurityIssueStat>,
    #[serde(default)]
    pub trends: Vec<ReportTrend>,
}

impl ComplianceReport {
    /// Sum of all occurrences across the report's categories
    pub fn total_occurrences(&self) -> SeverityCounts {
        self.security_issue_stats
            .iter()
            .fold(SeverityCounts::default(), |mut acc, stat| {
                acc.critical += stat.occurrence.critical;
                acc.major += stat.occurrence.major;
                acc.minor += stat.occurrence.minor;
                acc.total += stat.occurrence.total;
                acc
            })
    }
}
