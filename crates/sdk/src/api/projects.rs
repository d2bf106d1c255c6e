//! Projects API.

use crate::client::DeepSourceClient;
use crate::error::{ClassifiedError, DeepSourceResult};
use crate::graphql::{Connection, GraphQlRequest, PageInfoDto};
use deepsource_core::{Project, ProjectKey, ProjectRepository, VcsProvider};
use serde::Deserialize;
use tracing::{debug, warn};

/// Repositories fetched per request for each account.
const REPOSITORIES_PER_PAGE: u32 = 100;

/// Follow-up pages fetched per account before giving up on the rest.
const MAX_REPOSITORY_PAGES: usize = 50;

const REPOSITORY_FIELDS: &str = r#"
    pageInfo { hasNextPage endCursor }
    edges {
      node {
        id
        name
        dsn
        defaultBranch
        isPrivate
        isActivated
        vcsProvider
        vcsUrl
      }
    }
"#;

fn list_projects_query() -> String {
    format!(
        r#"
query viewerProjects {{
  viewer {{
    email
    accounts {{
      edges {{
        node {{
          login
          vcsProvider
          repositories(first: {REPOSITORIES_PER_PAGE}) {{ {REPOSITORY_FIELDS} }}
        }}
      }}
    }}
  }}
}}
"#
    )
}

fn account_repositories_query() -> String {
    format!(
        r#"
query accountRepositories($login: String!, $provider: VCSProvider!, $after: String) {{
  account(login: $login, vcsProvider: $provider) {{
    repositories(first: {REPOSITORIES_PER_PAGE}, after: $after) {{ {REPOSITORY_FIELDS} }}
  }}
}}
"#
    )
}

/// Projects API for the repositories visible to the API key.
pub struct ProjectsApi<'a> {
    client: &'a DeepSourceClient,
}

impl<'a> ProjectsApi<'a> {
    pub(crate) fn new(client: &'a DeepSourceClient) -> Self {
        Self { client }
    }

    /// List all projects across the viewer's accounts.
    ///
    /// Each account's repositories are followed page by page.
    pub async fn list(&self) -> DeepSourceResult<Vec<Project>> {
        let request = GraphQlRequest::new(list_projects_query(), serde_json::json!({}))
            .operation("viewerProjects");
        let response: ViewerResponse = self.client.query(request).await?;

        let Some(viewer) = response.viewer else {
            return Ok(Vec::new());
        };

        let mut projects = Vec::new();
        for account in viewer.accounts.nodes() {
            let mut provider = account.vcs_provider;
            let page_info = account.repositories.page_info.clone().unwrap_or_default();
            for repo in account.repositories.nodes() {
                if provider.is_none() {
                    provider = Some(repo.vcs_provider.clone());
                }
                projects.extend(repo.into_project(&account.login));
            }
            if let Some(provider) = provider {
                self.follow_repositories(&account.login, &provider, page_info, &mut projects)
                    .await?;
            }
        }

        Ok(projects)
    }

    async fn follow_repositories(
        &self,
        login: &str,
        provider: &VcsProvider,
        mut page_info: PageInfoDto,
        projects: &mut Vec<Project>,
    ) -> DeepSourceResult<()> {
        for page_number in 1.. {
            let has_next = page_info.has_next_page;
            let Some(cursor) = page_info.end_cursor.take().filter(|_| has_next) else {
                break;
            };
            if page_number > MAX_REPOSITORY_PAGES {
                warn!(login, pages = page_number, "Repository listing truncated");
                break;
            }
            debug!(login, page = page_number, "Fetching next page of repositories");

            let variables = serde_json::json!({
                "login": login,
                "provider": provider.as_str(),
                "after": cursor,
            });
            let request = GraphQlRequest::new(account_repositories_query(), variables)
                .operation("accountRepositories");
            let response: AccountResponse = self.client.query(request).await?;
            let Some(account) = response.account else {
                break;
            };

            page_info = account.repositories.page_info.clone().unwrap_or_default();
            projects.extend(
                account
                    .repositories
                    .nodes()
                    .filter_map(|repo| repo.into_project(login)),
            );
        }
        Ok(())
    }

    /// Get a project by its key.
    pub async fn get(&self, key: &ProjectKey) -> DeepSourceResult<Project> {
        self.list()
            .await?
            .into_iter()
            .find(|project| &project.key == key)
            .ok_or_else(|| {
                ClassifiedError::not_found(format!("Project '{key}' was not found"))
                    .with_metadata("project_key", key.as_str())
            })
    }
}

#[derive(Debug, Deserialize)]
struct ViewerResponse {
    viewer: Option<Viewer>,
}

#[derive(Debug, Deserialize)]
struct Viewer {
    accounts: Connection<Account>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Account {
    login: String,
    #[serde(default)]
    vcs_provider: Option<VcsProvider>,
    repositories: Connection<RepositoryNode>,
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    account: Option<AccountRepositories>,
}

#[derive(Debug, Deserialize)]
struct AccountRepositories {
    repositories: Connection<RepositoryNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryNode {
    id: String,
    name: String,
    dsn: Option<String>,
    default_branch: Option<String>,
    #[serde(default)]
    is_private: bool,
    #[serde(default)]
    is_activated: bool,
    vcs_provider: VcsProvider,
    vcs_url: Option<String>,
}

impl RepositoryNode {
    /// Repositories without a DSN are not analyzable and have no key.
    fn into_project(self, login: &str) -> Option<Project> {
        let key = self.dsn.filter(|dsn| !dsn.is_empty())?;
        Some(Project {
            key: ProjectKey::new(key),
            name: self.name,
            repository: ProjectRepository {
                id: self.id,
                login: login.to_string(),
                provider: self.vcs_provider,
                default_branch: self.default_branch,
                is_private: self.is_private,
                is_activated: self.is_activated,
                url: self.vcs_url,
            },
        })
    }
}
