//! Dependency vulnerabilities API.

use super::{repository_variables, require_repository, PAGE_INFO_FIELDS};
use crate::client::DeepSourceClient;
use crate::error::DeepSourceResult;
use crate::graphql::{merge_variables, pagination_variables, Connection, GraphQlRequest};
use deepsource_core::{
    Fixability, PackageRef, Page, Pagination, ProjectKey, Reachability, Vulnerability,
    VulnerabilityOccurrence, VulnerabilitySeverity,
};
use serde::Deserialize;

fn list_vulnerabilities_query() -> String {
    format!(
        r#"
query dependencyVulnerabilities(
  $login: String!, $name: String!, $provider: VCSProvider!,
  $first: Int, $after: String, $last: Int, $before: String
) {{
  repository(login: $login, name: $name, vcsProvider: $provider) {{
    dependencyVulnerabilityOccurrences(
      first: $first, after: $after, last: $last, before: $before
    ) {{
      {PAGE_INFO_FIELDS}
      edges {{
        node {{
          id
          reachability
          fixability
          package {{ name ecosystem purl }}
          packageVersion {{ version }}
          vulnerability {{
            identifier
            aliases
            summary
            severity
            cvssV3BaseScore
            fixedVersions
          }}
        }}
      }}
    }}
  }}
}}
"#
    )
}

/// Vulnerabilities API for a project's dependency advisories.
pub struct VulnerabilitiesApi<'a> {
    client: &'a DeepSourceClient,
}

impl<'a> VulnerabilitiesApi<'a> {
    pub(crate) fn new(client: &'a DeepSourceClient) -> Self {
        Self { client }
    }

    /// List a page of vulnerable dependency occurrences.
    pub async fn list(
        &self,
        key: &ProjectKey,
        pagination: &Pagination,
    ) -> DeepSourceResult<Page<VulnerabilityOccurrence>> {
        pagination.validate()?;
        let project = self.client.projects().get(key).await?;

        let variables = merge_variables(repository_variables(&project), pagination_variables(pagination));
        let request = GraphQlRequest::new(list_vulnerabilities_query(), variables)
            .operation("dependencyVulnerabilities");

        let response: RepositoryResponse = self.client.query(request).await?;
        let repository = require_repository(response.repository, key)?;
        Ok(repository
            .dependency_vulnerability_occurrences
            .into_page(VulnerabilityOccurrence::from))
    }
}

#[derive(Debug, Deserialize)]
struct RepositoryResponse {
    repository: Option<RepositoryVulnerabilities>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryVulnerabilities {
    dependency_vulnerability_occurrences: Connection<OccurrenceNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OccurrenceNode {
    id: String,
    reachability: Option<Reachability>,
    fixability: Option<Fixability>,
    package: PackageNode,
    package_version: Option<PackageVersionNode>,
    vulnerability: VulnerabilityNode,
}

#[derive(Debug, Deserialize)]
struct PackageNode {
    name: String,
    ecosystem: String,
    purl: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PackageVersionNode {
    version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VulnerabilityNode {
    identifier: String,
    #[serde(default)]
    aliases: Option<Vec<String>>,
    summary: Option<String>,
    severity: Option<VulnerabilitySeverity>,
    cvss_v3_base_score: Option<f64>,
    #[serde(default)]
    fixed_versions: Option<Vec<String>>,
}

impl From<OccurrenceNode> for VulnerabilityOccurrence {
    fn from(node: OccurrenceNode) -> Self {
        Self {
            id: node.id,
            package: PackageRef {
                name: node.package.name,
                ecosystem: node.package.ecosystem,
                version: node.package_version.and_then(|v| v.version),
                purl: node.package.purl,
            },
            vulnerability: Vulnerability {
                identifier: node.vulnerability.identifier,
                aliases: node.vulnerability.aliases.unwrap_or_default(),
                summary: node.vulnerability.summary,
                severity: node
                    .vulnerability
                    .severity
                    .unwrap_or(VulnerabilitySeverity::Unknown),
                cvss_v3_base_score: node.vulnerability.cvss_v3_base_score,
                fixed_versions: node.vulnerability.fixed_versions.unwrap_or_default(),
            },
            reachability: node.reachability.unwrap_or(Reachability::Unknown),
            fixability: node.fixability.unwrap_or(Fixability::Unknown),
        }
    }
}
