// Server configuration: defaults, TOML file, environment, command line

use anyhow::{bail, Context, Result};
use deepsource_sdk::{ClientConfig, ErrorCategory, RetryConfig, DEFAULT_ENDPOINT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Configuration file read when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "deepsource-mcp.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub deepsource: DeepSourceConfig,
    pub retry: RetrySettings,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeepSourceConfig {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub api_url: String,
    pub timeout_secs: u64,
}

impl Default for DeepSourceConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter: bool,
    /// Retryable category tags; transient categories when unset
    pub categories: Option<Vec<String>>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            jitter: true,
            categories: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives, e.g. `debug` or `deepsource_sdk=trace`
    pub level: Option<String>,
    pub file: Option<PathBuf>,
}

/// Command-line overrides, applied after the environment
#[derive(Debug, Clone, Default, clap::Args)]
pub struct CliOverrides {
    /// DeepSource GraphQL endpoint
    #[arg(long)]
    pub api_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Maximum attempts per request, including the first
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Log filter directives
    #[arg(long)]
    pub log_level: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl ServerConfig {
    /// Load the TOML file at `path`, or the default file when present.
    ///
    /// An explicit path must exist; the default one may be absent.
    pub fn from_file(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        if !path.exists() {
            if required {
                bail!("Configuration file not found: {}", path.display());
            }
            tracing::debug!("Configuration file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse configuration file {}", path.display()))
    }

    /// Full layering: defaults, file, process environment, command line
    pub fn load(path: Option<&Path>, cli: &CliOverrides) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env(|name| std::env::var(name).ok())?;
        config.apply_cli(cli);
        Ok(config)
    }

    /// Override fields from environment variables looked up through `lookup`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = var("DEEPSOURCE_API_KEY") {
            self.deepsource.api_key = Some(key);
        }
        if let Some(url) = var("DEEPSOURCE_API_URL") {
            self.deepsource.api_url = url;
        }
        if let Some(secs) = var("DEEPSOURCE_TIMEOUT_SECS") {
            self.deepsource.timeout_secs = parse_var("DEEPSOURCE_TIMEOUT_SECS", &secs)?;
        }
        if let Some(attempts) = var("RETRY_MAX_ATTEMPTS") {
            self.retry.max_attempts = parse_var("RETRY_MAX_ATTEMPTS", &attempts)?;
        }
        if let Some(ms) = var("RETRY_BASE_DELAY_MS") {
            self.retry.base_delay_ms = parse_var("RETRY_BASE_DELAY_MS", &ms)?;
        }
        if let Some(ms) = var("RETRY_MAX_DELAY_MS") {
            self.retry.max_delay_ms = parse_var("RETRY_MAX_DELAY_MS", &ms)?;
        }
        if let Some(jitter) = var("RETRY_JITTER") {
            self.retry.jitter = parse_bool("RETRY_JITTER", &jitter)?;
        }
        if let Some(categories) = var("RETRY_CATEGORIES") {
            self.retry.categories = Some(
                categories
                    .split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(String::from)
                    .collect(),
            );
        }
        if let Some(level) = var("LOG_LEVEL") {
            self.logging.level = Some(level);
        }
        if let Some(file) = var("LOG_FILE") {
            self.logging.file = Some(PathBuf::from(file));
        }
        Ok(())
    }

    pub fn apply_cli(&mut self, cli: &CliOverrides) {
        if let Some(url) = &cli.api_url {
            self.deepsource.api_url = url.clone();
        }
        if let Some(secs) = cli.timeout_secs {
            self.deepsource.timeout_secs = secs;
        }
        if let Some(attempts) = cli.max_attempts {
            self.retry.max_attempts = attempts;
        }
        if let Some(level) = &cli.log_level {
            self.logging.level = Some(level.clone());
        }
        if let Some(file) = &cli.log_file {
            self.logging.file = Some(file.clone());
        }
    }

    /// Retry settings as the SDK's validated `RetryConfig`
    pub fn retry_config(&self) -> Result<RetryConfig> {
        let mut retry = RetryConfig::default()
            .with_max_attempts(self.retry.max_attempts)
            .with_delays(
                Duration::from_millis(self.retry.base_delay_ms),
                Duration::from_millis(self.retry.max_delay_ms),
            )
            .with_jitter(self.retry.jitter);

        if let Some(tags) = &self.retry.categories {
            let categories = tags
                .iter()
                .map(|tag| tag.parse::<ErrorCategory>())
                .collect::<Result<Vec<_>, _>>()
                .context("Invalid RETRY_CATEGORIES")?;
            retry = retry.with_retryable(categories);
        }

        retry.validate().context("Invalid retry configuration")?;
        Ok(retry)
    }

    /// Build the SDK client configuration; fails without an API key
    pub fn client_config(&self) -> Result<ClientConfig> {
        let api_key = self
            .deepsource
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .context("DEEPSOURCE_API_KEY is required")?;
        let endpoint = Url::parse(&self.deepsource.api_url)
            .with_context(|| format!("Invalid DeepSource API URL: {}", self.deepsource.api_url))?;
        if self.deepsource.timeout_secs == 0 {
            bail!("DEEPSOURCE_TIMEOUT_SECS must be greater than zero");
        }

        let mut config = ClientConfig::new(endpoint, api_key);
        config.timeout = Duration::from_secs(self.deepsource.timeout_secs);
        config.retry_config = self.retry_config()?;
        Ok(config)
    }
}

fn parse_var<T>(name: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("Invalid {name}: '{value}'"))
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => bail!("Invalid {name}: '{value}' (expected true or false)"),
    }
}
