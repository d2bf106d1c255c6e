// Project listing tool

use crate::tools::{Tool, ToolInput};
use deepsource_core::Project;
use deepsource_sdk::DeepSourceClient;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Lists the DeepSource projects the API key can access
pub struct ProjectsTool {
    client: DeepSourceClient,
}

impl ProjectsTool {
    pub fn new(client: DeepSourceClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ProjectsInput {}

impl ToolInput for ProjectsInput {}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ProjectsOutput {
    pub projects: Vec<Project>,
    pub total_count: usize,
    pub usage: String,
}

#[async_trait::async_trait]
impl Tool for ProjectsTool {
    type Input = ProjectsInput;
    type Output = ProjectsOutput;

    fn name(&self) -> &'static str {
        "deepsource_projects"
    }

    fn description(&self) -> &'static str {
        "List all DeepSource projects accessible with the configured API key. \
         Each project's `key` is the projectKey expected by the other tools."
    }

    async fn call(&self, _input: ProjectsInput) -> anyhow::Result<ProjectsOutput> {
        let projects = self.client.projects().list().await?;
        Ok(ProjectsOutput {
            total_count: projects.len(),
            projects,
            usage: "Use a project's `key` as projectKey in the other deepsource_* tools."
                .to_string(),
        })
    }
}
