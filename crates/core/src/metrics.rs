use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Quality metric identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricShortcode {
    /// Line coverage
    Lcv,
    /// Branch coverage
    Bcv,
    /// Documentation coverage
    Dcv,
    /// Duplicate code percentage
    Ddp,
    /// Statement coverage
    Scv,
    /// Total coverage
    Tcv,
    /// Composite coverage
    Cmp,
    #[serde(other)]
    Unknown,
}

impl MetricShortcode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lcv => "LCV",
            Self::Bcv => "BCV",
            Self::Dcv => "DCV",
            Self::Ddp => "DDP",
            Self::Scv => "SCV",
            Self::Tcv => "TCV",
            Self::Cmp => "CMP",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Metrics whose values are percentages
    pub fn is_percentage(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl std::fmt::Display for MetricShortcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Language scope of a metric item; `AGGREGATE` covers the whole repository
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct MetricKey(pub String);

impl MetricKey {
    pub const AGGREGATE: &'static str = "AGGREGATE";

    pub fn aggregate() -> Self {
        Self(Self::AGGREGATE.to_string())
    }

    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which way a metric improves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricDirection {
    Upward,
    Downward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThresholdStatus {
    Passing,
    Failing,
    #[serde(other)]
    Unknown,
}

/// Latest value of a metric for one key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MetricItem {
    pub id: String,
    pub key: MetricKey,
    pub threshold: Option<f64>,
    pub latest_value: Option<f64>,
    pub latest_value_display: Option<String>,
    pub threshold_status: ThresholdStatus,
}

impl MetricItem {
    /// Recompute the threshold status from the raw values.
    ///
    /// Returns `Unknown` when either the threshold or the latest value is missing.
    pub fn evaluate(&self, direction: MetricDirection) -> ThresholdStatus {
        match (self.threshold, self.latest_value) {
            (Some(threshold), Some(value)) => {
                let passing = match direction {
                    MetricDirection::Upward => value >= threshold,
                    MetricDirection::Downward => value <= threshold,
                };
                if passing {
                    ThresholdStatus::Passing
                } else {
                    ThresholdStatus::Failing
                }
            }
            _ => ThresholdStatus::Unknown,
        }
    }
}

/// A quality metric tracked for a repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RepositoryMetric {
    pub name: String,
    pub shortcode: MetricShortcode,
    pub description: Option<String>,
    pub positive_direction: MetricDirection,
    pub unit: Option<String>,
    pub min_value_allowed: Option<f64>,
    pub max_value_allowed: Option<f64>,
    pub is_reported: bool,
    pub is_threshold_enforced: bool,
    pub items: Vec<MetricItem>,
}

impl RepositoryMetric {
    /// Items whose threshold is currently failing
    pub fn failing_items(&self) -> impl Iterator<Item = &MetricItem> {
        self.items
            .iter()
            .filter(|item| item.threshold_status == ThresholdStatus::Failing)
    }

    /// Check a prospective threshold against the metric's allowed range
    pub fn validate_threshold(&self, threshold: f64) -> Result<(), String> {
        if let Some(min) = self.min_value_allowed {
            if threshold < min {
                return Err(format!(
                    "threshold {threshold} is below the minimum {min} for {}",
                    self.shortcode
                ));
            }
        }
        if let Some(max) = self.max_value_allowed {
            if threshold > max {
                return Err(format!(
                    "threshold {threshold} is above the maximum {max} for {}",
                    self.shortcode
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(threshold: Option<f64>, latest: Option<f64>) -> MetricItem {
        MetricItem {
            id: "item-1".to_string(),
            key: MetricKey::aggregate(),
            threshold,
            latest_value: latest,
            latest_value_display: None,
            threshold_status: ThresholdStatus::Unknown,
        }
    }

    #[test]
    fn test_shortcode_serde() {
        let code: MetricShortcode = serde_json::from_str("\"LCV\"").unwrap();
        assert_eq!(code, MetricShortcode::Lcv);
        assert_eq!(serde_json::to_string(&MetricShortcode::Ddp).unwrap(), "\"DDP\"");

        let unknown: MetricShortcode = serde_json::from_str("\"XYZ\"").unwrap();
        assert_eq!(unknown, MetricShortcode::Unknown);
    }

    #[test]
    fn test_metric_key_normalizes_case() {
        assert_eq!(MetricKey::new("python").as_str(), "PYTHON");
        assert_eq!(MetricKey::aggregate().as_str(), "AGGREGATE");
    }

    #[test]
    fn test_evaluate_threshold_direction() {
        assert_eq!(
            item(Some(80.0), Some(85.0)).evaluate(MetricDirection::Upward),
            ThresholdStatus::Passing
        );
        assert_eq!(
            item(Some(80.0), Some(75.0)).evaluate(MetricDirection::Upward),
            ThresholdStatus::Failing
        );
        assert_eq!(
            item(Some(5.0), Some(7.5)).evaluate(MetricDirection::Downward),
            ThresholdStatus::Failing
        );
        assert_eq!(
            item(None, Some(7.5)).evaluate(MetricDirection::Downward),
            ThresholdStatus::Unknown
        );
    }

    #[test]
    fn test_validate_threshold_range() {
        let metric = RepositoryMetric {
            name: "Line Coverage".to_string(),
            shortcode: MetricShortcode::Lcv,
            description: None,
            positive_direction: MetricDirection::Upward,
            unit: Some("%".to_string()),
            min_value_allowed: Some(0.0),
            max_value_allowed: Some(100.0),
            is_reported: true,
            is_threshold_enforced: false,
            items: vec![item(Some(80.0), Some(60.0))],
        };

        assert!(metric.validate_threshold(50.0).is_ok());
        assert!(metric.validate_threshold(-1.0).is_err());
        assert!(metric.validate_threshold(101.0).is_err());
        assert_eq!(metric.failing_items().count(), 0);
    }
}
