//! Compliance and insight reports API.

use super::{repository_variables, require_repository};
use crate::client::DeepSourceClient;
use crate::error::{ClassifiedError, DeepSourceResult};
use crate::graphql::GraphQlRequest;
use deepsource_core::{
    ComplianceReport, ProjectKey, ReportStatus, ReportTrend, ReportType, SecurityIssueStat,
    SeverityCounts,
};
use serde::Deserialize;

fn report_query(report: ReportType) -> String {
    let field = report.field_name();
    let stats = if report.is_compliance() {
        "securityIssueStats { key title occurrence { critical major minor total } }"
    } else {
        ""
    };
    format!(
        r#"
query complianceReport($login: String!, $name: String!, $provider: VCSProvider!) {{
  repository(login: $login, name: $name, vcsProvider: $provider) {{
    reports {{
      {field} {{
        key
        title
        currentValue
        status
        {stats}
        trends {{ label value changePercentage }}
      }}
    }}
  }}
}}
"#
    )
}

/// Reports API for compliance standards and code-health insights.
pub struct ComplianceApi<'a> {
    client: &'a DeepSourceClient,
}

impl<'a> ComplianceApi<'a> {
    pub(crate) fn new(client: &'a DeepSourceClient) -> Self {
        Self { client }
    }

    /// Fetch one report for a project.
    pub async fn report(&self, key: &ProjectKey, report: ReportType) -> DeepSourceResult<ComplianceReport> {
        let project = self.client.projects().get(key).await?;
        let request = GraphQlRequest::new(report_query(report), repository_variables(&project))
            .operation("complianceReport");

        let response: RepositoryResponse = self.client.query(request).await?;
        let repository = require_repository(response.repository, key)?;

        let node = repository
            .reports
            .and_then(|mut reports| reports.remove(report.field_name()))
            .flatten()
            .ok_or_else(|| {
                ClassifiedError::not_found(format!(
                    "Report {report} is not available for project '{key}'"
                ))
                .with_metadata("report_type", report.as_str())
            })?;

        Ok(node.into_report(report))
    }
}

#[derive(Debug, Deserialize)]
struct RepositoryResponse {
    repository: Option<RepositoryReports>,
}

#[derive(Debug, Deserialize)]
struct RepositoryReports {
    reports: Option<std::collections::HashMap<String, Option<ReportNode>>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportNode {
    title: Option<String>,
    current_value: Option<f64>,
    status: Option<ReportStatus>,
    #[serde(default)]
    security_issue_stats: Option<Vec<StatNode>>,
    #[serde(default)]
    trends: Option<Vec<TrendNode>>,
}

#[derive(Debug, Deserialize)]
struct StatNode {
    key: String,
    title: String,
    occurrence: Option<SeverityCounts>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrendNode {
    label: Option<String>,
    value: Option<f64>,
    change_percentage: Option<f64>,
}

impl ReportNode {
    fn into_report(self, report: ReportType) -> ComplianceReport {
        ComplianceReport {
            key: report,
            title: self.title.unwrap_or_else(|| report.to_string()),
            current_value: self.current_value,
            status: self.status,
            security_issue_stats: self
                .security_issue_stats
                .unwrap_or_default()
                .into_iter()
                .map(|stat| SecurityIssueStat {
                    key: stat.key,
                    title: stat.title,
                    occurrence: stat.occurrence.unwrap_or_default(),
                })
                .collect(),
            trends: self
                .trends
                .unwrap_or_default()
                .into_iter()
                .map(|trend| ReportTrend {
                    label: trend.label,
                    value: trend.value,
                    change_percentage: trend.change_percentage,
                })
                .collect(),
        }
    }
}
