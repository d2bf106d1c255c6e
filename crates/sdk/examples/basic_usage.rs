//! Basic SDK usage example.
//!
//! Lists the projects visible to an API key and the latest run on each
//! project's default branch.
//!
//! Run with: DEEPSOURCE_API_KEY=... cargo run --example basic_usage

use deepsource_sdk::{DeepSourceClient, RetryConfig};
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let api_key = std::env::var("DEEPSOURCE_API_KEY")?;
    let client = DeepSourceClient::builder()
        .api_key(api_key)
        .timeout(Duration::from_secs(30))
        .retry_config(RetryConfig::default().with_max_attempts(5))
        .build()?;

    let projects = client.projects().list().await?;
    println!("Found {} projects", projects.len());

    for project in projects.iter().take(5) {
        let branch = project.repository.default_branch.as_deref().unwrap_or("main");
        match client.runs().recent_for_branch(&project.key, branch).await {
            Ok(run) => println!(
                "  {} ({}): {:?} on {} at {}",
                project.name, project.key, run.status, branch, run.created_at
            ),
            Err(err) => println!("  {} ({}): {}", project.name, project.key, err),
        }
    }

    Ok(())
}
