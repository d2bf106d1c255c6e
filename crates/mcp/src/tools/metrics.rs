// Quality metric tools

use crate::tools::{validate_project_key, Tool, ToolInput};
use deepsource_core::{MetricKey, MetricShortcode, ProjectKey, RepositoryMetric};
use deepsource_sdk::DeepSourceClient;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Lists quality metrics of a project
pub struct QualityMetricsTool {
    client: DeepSourceClient,
}

impl QualityMetricsTool {
    pub fn new(client: DeepSourceClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QualityMetricsInput {
    /// Project key from deepsource_projects
    pub project_key: ProjectKey,
    /// Only these metrics (e.g. ["LCV", "DDP"])
    #[serde(default)]
    pub shortcode_in: Option<Vec<MetricShortcode>>,
}

impl ToolInput for QualityMetricsInput {
    fn validate(&self) -> Result<(), String> {
        validate_project_key(&self.project_key)?;
        if let Some(shortcodes) = &self.shortcode_in {
            check_shortcodes(shortcodes)?;
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct QualityMetricsOutput {
    pub metrics: Vec<RepositoryMetric>,
    /// Metric items currently failing their threshold, as `SHORTCODE/KEY`
    pub failing: Vec<String>,
    pub usage: String,
}

#[async_trait::async_trait]
impl Tool for QualityMetricsTool {
    type Input = QualityMetricsInput;
    type Output = QualityMetricsOutput;

    fn name(&self) -> &'static str {
        "deepsource_quality_metrics"
    }

    fn description(&self) -> &'static str {
        "Get quality metrics (coverage, duplication, documentation) of a DeepSource \
         project with their latest values, thresholds and pass/fail status."
    }

    async fn call(&self, input: QualityMetricsInput) -> anyhow::Result<QualityMetricsOutput> {
        let shortcodes = input.shortcode_in.unwrap_or_default();
        let metrics = self
            .client
            .metrics()
            .list(&input.project_key, &shortcodes)
            .await?;

        let failing = metrics
            .iter()
            .flat_map(|m| {
                m.failing_items()
                    .map(move |item| format!("{}/{}", m.shortcode, item.key.as_str()))
            })
            .collect();

        Ok(QualityMetricsOutput {
            metrics,
            failing,
            usage: "Use deepsource_update_metric_threshold to change a threshold and \
                    deepsource_update_metric_setting to toggle reporting or enforcement."
                .to_string(),
        })
    }
}

/// Sets or clears the threshold of a metric
pub struct UpdateMetricThresholdTool {
    client: DeepSourceClient,
}

impl UpdateMetricThresholdTool {
    pub fn new(client: DeepSourceClient) -> Self {
        Self { client }
    }
}

fn default_metric_key() -> MetricKey {
    MetricKey::aggregate()
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMetricThresholdInput {
    /// Project key from deepsource_projects
    pub project_key: ProjectKey,
    pub metric_shortcode: MetricShortcode,
    /// Language key of the metric item; defaults to AGGREGATE
    #[serde(default = "default_metric_key")]
    pub metric_key: MetricKey,
    /// New threshold; null removes it
    #[serde(default)]
    pub threshold_value: Option<f64>,
}

impl ToolInput for UpdateMetricThresholdInput {
    fn validate(&self) -> Result<(), String> {
        validate_project_key(&self.project_key)?;
        check_shortcodes(&[self.metric_shortcode])?;
        if self.metric_key.as_str().trim().is_empty() {
            return Err("metricKey must not be empty".to_string());
        }
        match self.threshold_value {
            Some(value) if !value.is_finite() => {
                Err(format!("thresholdValue must be a finite number, got {value}"))
            }
            Some(value) if self.metric_shortcode.is_percentage() && !(0.0..=100.0).contains(&value) => {
                Err(format!(
                    "thresholdValue for {} must be between 0 and 100, got {value}",
                    self.metric_shortcode
                ))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct MetricMutationOutput {
    pub ok: bool,
    pub message: String,
}

#[async_trait::async_trait]
impl Tool for UpdateMetricThresholdTool {
    type Input = UpdateMetricThresholdInput;
    type Output = MetricMutationOutput;

    fn name(&self) -> &'static str {
        "deepsource_update_metric_threshold"
    }

    fn description(&self) -> &'static str {
        "Set or remove the threshold of a quality metric in a DeepSource project."
    }

    async fn call(&self, input: UpdateMetricThresholdInput) -> anyhow::Result<MetricMutationOutput> {
        let outcome = self
            .client
            .metrics()
            .set_threshold(
                &input.project_key,
                input.metric_shortcode,
                &input.metric_key,
                input.threshold_value,
            )
            .await?;

        let target = format!("{}/{}", input.metric_shortcode, input.metric_key.as_str());
        let message = match (outcome.ok, input.threshold_value) {
            (false, _) => format!("DeepSource did not update the threshold of {target}"),
            (true, Some(value)) => format!("Threshold of {target} set to {value}"),
            (true, None) => format!("Threshold of {target} removed"),
        };
        Ok(MetricMutationOutput {
            ok: outcome.ok,
            message,
        })
    }
}

/// Toggles reporting and threshold enforcement of a metric
pub struct UpdateMetricSettingTool {
    client: DeepSourceClient,
}

impl UpdateMetricSettingTool {
    pub fn new(client: DeepSourceClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMetricSettingInput {
    /// Project key from deepsource_projects
    pub project_key: ProjectKey,
    pub metric_shortcode: MetricShortcode,
    /// Whether the metric is reported on analysis runs
    pub is_reported: bool,
    /// Whether a failing threshold fails the run
    pub is_threshold_enforced: bool,
}

impl ToolInput for UpdateMetricSettingInput {
    fn validate(&self) -> Result<(), String> {
        validate_project_key(&self.project_key)?;
        check_shortcodes(&[self.metric_shortcode])
    }
}

#[async_trait::async_trait]
impl Tool for UpdateMetricSettingTool {
    type Input = UpdateMetricSettingInput;
    type Output = MetricMutationOutput;

    fn name(&self) -> &'static str {
        "deepsource_update_metric_setting"
    }

    fn description(&self) -> &'static str {
        "Change whether a quality metric is reported and whether its threshold \
         is enforced in a DeepSource project."
    }

    async fn call(&self, input: UpdateMetricSettingInput) -> anyhow::Result<MetricMutationOutput> {
        let outcome = self
            .client
            .metrics()
            .update_setting(
                &input.project_key,
                input.metric_shortcode,
                input.is_reported,
                input.is_threshold_enforced,
            )
            .await?;

        let message = if outcome.ok {
            format!(
                "{}: reported={}, threshold enforced={}",
                input.metric_shortcode, input.is_reported, input.is_threshold_enforced
            )
        } else {
            format!("DeepSource did not update the settings of {}", input.metric_shortcode)
        };
        Ok(MetricMutationOutput {
            ok: outcome.ok,
            message,
        })
    }
}

fn check_shortcodes(shortcodes: &[MetricShortcode]) -> Result<(), String> {
    if shortcodes.contains(&MetricShortcode::Unknown) {
        return Err("unknown metric shortcode; expected one of LCV, BCV, DCV, DDP, SCV, TCV, CMP"
            .to_string());
    }
    Ok(())
}
