// Compliance report tool

use crate::tools::{validate_project_key, Tool, ToolInput};
use deepsource_core::{ComplianceReport, ProjectKey, ReportType, SeverityCounts};
use deepsource_sdk::DeepSourceClient;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Fetches a compliance or code health report
pub struct ComplianceReportTool {
    client: DeepSourceClient,
}

impl ComplianceReportTool {
    pub fn new(client: DeepSourceClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceReportInput {
    /// Project key from deepsource_projects
    pub project_key: ProjectKey,
    pub report_type: ReportType,
}

impl ToolInput for ComplianceReportInput {
    fn validate(&self) -> Result<(), String> {
        validate_project_key(&self.project_key)
    }
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ComplianceReportOutput {
    pub report: ComplianceReport,
    /// Occurrences summed over all security categories
    pub totals: SeverityCounts,
    pub usage: String,
}

#[async_trait::async_trait]
impl Tool for ComplianceReportTool {
    type Input = ComplianceReportInput;
    type Output = ComplianceReportOutput;

    fn name(&self) -> &'static str {
        "deepsource_compliance_report"
    }

    fn description(&self) -> &'static str {
        "Get a DeepSource report for a project: security standards (OWASP Top 10, \
         SANS Top 25, MISRA-C) or code health reports such as coverage and issue trends."
    }

    async fn call(&self, input: ComplianceReportInput) -> anyhow::Result<ComplianceReportOutput> {
        let report = self
            .client
            .compliance()
            .report(&input.project_key, input.report_type)
            .await?;

        let usage = if input.report_type.is_compliance() {
            "security_issue_stats breaks occurrences down per category of the standard; \
             use deepsource_project_issues to inspect individual occurrences."
        } else {
            "trends compares the current value with earlier periods."
        };
        Ok(ComplianceReportOutput {
            totals: report.total_occurrences(),
            report,
            usage: usage.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{client, viewer, ScriptedExecutor};
    use crate::tools::ToolRegistry;
    use serde_json::json;

    #[tokio::test]
    async fn test_owasp_report() {
        let executor = ScriptedExecutor::new(vec![
            Ok(viewer()),
            Ok(json!({"repository": {"reports": {"owaspTop10": {
                "key": "OWASP_TOP_10",
                "title": "OWASP Top 10",
                "currentValue": 2.0,
                "status": "FAILING",
                "securityIssueStats": [
                    {"key": "A03", "title": "Injection",
                     "occurrence": {"critical": 1, "major": 1, "minor": 0, "total": 2}}
                ],
                "trends": []
            }}}})),
        ]);
        let mut registry = ToolRegistry::new();
        registry
            .register(ComplianceReportTool::new(client(&executor)))
            .unwrap();

        let result = registry
            .dispatch(
                "deepsource_compliance_report",
                Some(json!({"projectKey": "dsn-demo", "reportType": "OWASP_TOP_10"})),
            )
            .await;

        assert!(!result.is_error, "{:?}", result.text());
        let output = result.structured_content.unwrap();
        assert_eq!(output["report"]["status"], "FAILING");
        assert_eq!(output["totals"]["total"], 2);
    }

    #[tokio::test]
    async fn test_unknown_report_type_is_rejected() {
        let executor = ScriptedExecutor::new(vec![Ok(viewer())]);
        let mut registry = ToolRegistry::new();
        registry
            .register(ComplianceReportTool::new(client(&executor)))
            .unwrap();

        let result = registry
            .dispatch(
                "deepsource_compliance_report",
                Some(json!({"projectKey": "dsn-demo", "reportType": "PCI_DSS"})),
            )
            .await;

        assert!(result.is_error);
        assert_eq!(result.structured_content.unwrap()["category"], "CLIENT");
    }
}
