//! Quality metrics API.

use super::{repository_variables, require_repository};
use crate::client::DeepSourceClient;
use crate::error::{ClassifiedError, DeepSourceResult};
use crate::graphql::{merge_variables, GraphQlRequest};
use deepsource_core::{
    MetricDirection, MetricItem, MetricKey, MetricShortcode, ProjectKey, RepositoryMetric,
    ThresholdStatus,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::info;

const LIST_METRICS: &str = r#"
query qualityMetrics(
  $login: String!, $name: String!, $provider: VCSProvider!,
  $shortcodeIn: [MetricShortcode]
) {
  repository(login: $login, name: $name, vcsProvider: $provider) {
    id
    metrics(shortcodeIn: $shortcodeIn) {
      name
      shortcode
      description
      positiveDirection
      unit
      minValueAllowed
      maxValueAllowed
      isReported
      isThresholdEnforced
      items {
        id
        key
        threshold
        latestValue
        latestValueDisplay
        thresholdStatus
      }
    }
  }
}
"#;

const SET_THRESHOLD: &str = r#"
mutation setRepositoryMetricThreshold($input: SetRepositoryMetricThresholdInput!) {
  setRepositoryMetricThreshold(input: $input) {
    ok
  }
}
"#;

const UPDATE_SETTING: &str = r#"
mutation updateRepositoryMetricSetting($input: UpdateRepositoryMetricSettingInput!) {
  updateRepositoryMetricSetting(input: $input) {
    ok
  }
}
"#;

/// Result of a metric mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MutationOutcome {
    pub ok: bool,
}

/// Metrics API for repository quality metrics.
pub struct MetricsApi<'a> {
    client: &'a DeepSourceClient,
}

impl<'a> MetricsApi<'a> {
    pub(crate) fn new(client: &'a DeepSourceClient) -> Self {
        Self { client }
    }

    /// List quality metrics, optionally restricted to `shortcodes`.
    pub async fn list(
        &self,
        key: &ProjectKey,
        shortcodes: &[MetricShortcode],
    ) -> DeepSourceResult<Vec<RepositoryMetric>> {
        let project = self.client.projects().get(key).await?;
        let shortcode_in: Option<Vec<&str>> = (!shortcodes.is_empty())
            .then(|| shortcodes.iter().map(MetricShortcode::as_str).collect());

        let variables = merge_variables(
            repository_variables(&project),
            serde_json::json!({ "shortcodeIn": shortcode_in }),
        );
        let request = GraphQlRequest::new(LIST_METRICS, variables).operation("qualityMetrics");

        let response: RepositoryResponse = self.client.query(request).await?;
        let repository = require_repository(response.repository, key)?;
        Ok(repository.metrics.into_iter().map(RepositoryMetric::from).collect())
    }

    /// Set or clear (`None`) the threshold of one metric item.
    pub async fn set_threshold(
        &self,
        key: &ProjectKey,
        shortcode: MetricShortcode,
        metric_key: &MetricKey,
        threshold: Option<f64>,
    ) -> DeepSourceResult<MutationOutcome> {
        if shortcode == MetricShortcode::Unknown {
            return Err(unknown_shortcode());
        }
        if let Some(value) = threshold.filter(|v| !v.is_finite()) {
            return Err(ClassifiedError::new(
                crate::error::ErrorCategory::Client,
                format!("Threshold must be a finite number, got {value}"),
            ));
        }
        let project = self.client.projects().get(key).await?;

        let variables = serde_json::json!({
            "input": {
                "repositoryId": project.repository.id,
                "metricShortcode": shortcode.as_str(),
                "metricKey": metric_key.as_str(),
                "thresholdValue": threshold,
            }
        });
        let request = GraphQlRequest::new(SET_THRESHOLD, variables)
            .operation("setRepositoryMetricThreshold");

        let response: SetThresholdResponse = self.client.query(request).await?;
        info!(
            project = %key,
            metric = %shortcode,
            metric_key = metric_key.as_str(),
            ok = response.set_repository_metric_threshold.ok,
            "Metric threshold updated"
        );
        Ok(response.set_repository_metric_threshold)
    }

    /// Change whether a metric is reported and whether its threshold is enforced.
    pub async fn update_setting(
        &self,
        key: &ProjectKey,
        shortcode: MetricShortcode,
        is_reported: bool,
        is_threshold_enforced: bool,
    ) -> DeepSourceResult<MutationOutcome> {
        if shortcode == MetricShortcode::Unknown {
            return Err(unknown_shortcode());
        }
        let project = self.client.projects().get(key).await?;

        let variables = serde_json::json!({
            "input": {
                "repositoryId": project.repository.id,
                "metricShortcode": shortcode.as_str(),
                "isReported": is_reported,
                "isThresholdEnforced": is_threshold_enforced,
            }
        });
        let request = GraphQlRequest::new(UPDATE_SETTING, variables)
            .operation("updateRepositoryMetricSetting");

        let response: UpdateSettingResponse = self.client.query(request).await?;
        info!(
            project = %key,
            metric = %shortcode,
            is_reported,
            is_threshold_enforced,
            ok = response.update_repository_metric_setting.ok,
            "Metric setting updated"
        );
        Ok(response.update_repository_metric_setting)
    }
}

fn unknown_shortcode() -> ClassifiedError {
    ClassifiedError::new(
        crate::error::ErrorCategory::Client,
        "Unknown metric shortcode",
    )
}

#[derive(Debug, Deserialize)]
struct RepositoryResponse {
    repository: Option<RepositoryMetrics>,
}

#[derive(Debug, Deserialize)]
struct RepositoryMetrics {
    #[serde(default)]
    metrics: Vec<MetricNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetricNode {
    name: String,
    shortcode: MetricShortcode,
    description: Option<String>,
    positive_direction: MetricDirection,
    unit: Option<String>,
    min_value_allowed: Option<f64>,
    max_value_allowed: Option<f64>,
    #[serde(default)]
    is_reported: bool,
    #[serde(default)]
    is_threshold_enforced: bool,
    #[serde(default)]
    items: Vec<MetricItemNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetricItemNode {
    id: String,
    key: String,
    threshold: Option<f64>,
    latest_value: Option<f64>,
    latest_value_display: Option<String>,
    threshold_status: Option<ThresholdStatus>,
}

impl From<MetricNode> for RepositoryMetric {
    fn from(node: MetricNode) -> Self {
        let direction = node.positive_direction;
        Self {
            name: node.name,
            shortcode: node.shortcode,
            description: node.description,
            positive_direction: direction,
            unit: node.unit,
            min_value_allowed: node.min_value_allowed,
            max_value_allowed: node.max_value_allowed,
            is_reported: node.is_reported,
            is_threshold_enforced: node.is_threshold_enforced,
            items: node
                .items
                .into_iter()
                .map(|item| {
                    let mut metric_item = MetricItem {
                        id: item.id,
                        key: MetricKey::new(item.key),
                        threshold: item.threshold,
                        latest_value: item.latest_value,
                        latest_value_display: item.latest_value_display,
                        threshold_status: ThresholdStatus::Unknown,
                    };
                    metric_item.threshold_status = item
                        .threshold_status
                        .unwrap_or_else(|| metric_item.evaluate(direction));
                    metric_item
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetThresholdResponse {
    set_repository_metric_threshold: MutationOutcome,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateSettingResponse {
    update_repository_metric_setting: MutationOutcome,
}
