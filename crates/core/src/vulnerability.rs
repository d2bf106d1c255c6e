use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VulnerabilitySeverity {
    None,
    Low,
    Medium,
    High,
    Critical,
    #[serde(other)]
    Unknown,
}

impl VulnerabilitySeverity {
    /// Ordering rank; unrecognized severities sort below `None`
    fn rank(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::None => 1,
            Self::Low => 2,
            Self::Medium => 3,
            Self::High => 4,
            Self::Critical => 5,
        }
    }
}

impl PartialOrd for VulnerabilitySeverity {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VulnerabilitySeverity {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
}

/// Whether vulnerable code is reachable from the project's own code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Reachability {
    Reachable,
    Unreachable,
    #[serde(other)]
    Unknown,
}

/// How the vulnerability can be remediated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Fixability {
    Error,
    Unfixable,
    Generating,
    Possible,
    ManualFixAvailable,
    AutoFixAvailable,
    #[serde(other)]
    Unknown,
}

/// Dependency affected by a vulnerability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PackageRef {
    pub name: String,
    pub ecosystem: String,
    pub version: Option<String>,
    pub purl: Option<String>,
}

/// Advisory details for a vulnerability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Vulnerability {
    pub identifier: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub summary: Option<String>,
    pub severity: VulnerabilitySeverity,
    pub cvss_v3_base_score: Option<f64>,
    #[serde(default)]
    pub fixed_versions: Vec<String>,
}

/// A vulnerable dependency version found in a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VulnerabilityOccurrence {
    pub id: String,
    pub package: PackageRef,
    pub vulnerability: Vulnerability,
    pub reachability: Reachability,
    pub fixability: Fixability,
}

impl VulnerabilityOccurrence {
    /// Fixed versions exist upstream for this advisory
    pub fn has_fix(&self) -> bool {
        !self.vulnerability.fixed_versions.is_empty()
    }
}
