//! Configuration settings for agentgraph.

use crate::error::{AgentGraphError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable holding the model API key.
pub const ENV_API_KEY: &str = "OPEN_API_KEY";
/// Environment variable holding the model deployment name.
pub const ENV_DEPLOYMENT: &str = "DEPLOYMENT_NAME";
/// Environment variable holding the model endpoint base URL.
pub const ENV_BASE_URL: &str = "BASE_URL";
/// Environment variable holding the model API version.
pub const ENV_API_VERSION: &str = "API_VERSION";
/// Environment variable holding the web search API key.
pub const ENV_SEARCH_API_KEY: &str = "TAVILY_API_KEY";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub model: ModelSettings,
    pub agent: AgentSettings,
    pub search: SearchSettings,
    pub sandbox: SandboxSettings,
    pub sql: SqlSettings,
    pub serve: ServeSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for application data (databases, generated files).
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.agentgraph".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Chat model connection settings.
///
/// Credentials are usually supplied through the environment; values present
/// in the environment take precedence over the config file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelSettings {
    /// API key. Prefer `OPEN_API_KEY` over storing it in the file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Deployment name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment: Option<String>,
    /// Endpoint base URL, e.g. `https://my-resource.openai.azure.com`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// API version, e.g. `2024-08-01-preview`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    /// Sampling temperature.
    pub temperature: f32,
    /// HTTP timeout for a single model call, in seconds.
    pub timeout_secs: u64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            deployment: None,
            endpoint: None,
            api_version: None,
            temperature: 0.0,
            timeout_secs: 300,
        }
    }
}

impl ModelSettings {
    /// Overlay values found through `lookup` (normally the process environment).
    pub fn overlay<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty(ENV_API_KEY) {
            self.api_key = Some(v);
        }
        if let Some(v) = non_empty(ENV_DEPLOYMENT) {
            self.deployment = Some(v);
        }
        if let Some(v) = non_empty(ENV_BASE_URL) {
            self.endpoint = Some(v);
        }
        if let Some(v) = non_empty(ENV_API_VERSION) {
            self.api_version = Some(v);
        }
    }

    /// Names of the required values that are missing.
    pub fn missing(&self) -> Vec<&'static str> {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());

        let mut missing = Vec::new();
        if !present(&self.api_key) {
            missing.push(ENV_API_KEY);
        }
        if !present(&self.deployment) {
            missing.push(ENV_DEPLOYMENT);
        }
        if !present(&self.endpoint) {
            missing.push(ENV_BASE_URL);
        }
        if !present(&self.api_version) {
            missing.push(ENV_API_VERSION);
        }
        missing
    }

    /// Check that every required value is present and the endpoint is a URL.
    pub fn validate(&self) -> Result<()> {
        let missing = self.missing();
        if !missing.is_empty() {
            return Err(AgentGraphError::Config(format!(
                "missing model configuration: {}. Set them in the environment or a .env file.",
                missing.join(", ")
            )));
        }

        if let Some(endpoint) = &self.endpoint {
            url::Url::parse(endpoint).map_err(|e| {
                AgentGraphError::Config(format!("{} is not a valid URL ({}): {}", ENV_BASE_URL, e, endpoint))
            })?;
        }

        Ok(())
    }
}

/// Agent loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Step cap for single-agent graphs.
    pub recursion_limit: usize,
    /// Step cap for the researcher / chart generator workflow.
    pub collaboration_recursion_limit: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            recursion_limit: crate::graph::DEFAULT_RECURSION_LIMIT,
            collaboration_recursion_limit: 150,
        }
    }
}

/// Web search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Search API endpoint.
    pub endpoint: String,
    /// API key. Prefer `TAVILY_API_KEY`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Default number of results per query.
    pub max_results: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api.tavily.com/search".to_string(),
            api_key: None,
            max_results: 5,
        }
    }
}

/// Python sandbox settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxSettings {
    /// Interpreter to run code with.
    pub interpreter: String,
    /// Working directory for executed code; generated files land here.
    pub workdir: String,
    /// Wall-clock limit for one execution, in seconds.
    pub timeout_secs: u64,
    /// File extensions reported as generated images.
    pub image_extensions: Vec<String>,
}

impl Default for SandboxSettings {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            workdir: "~/.agentgraph/files".to_string(),
            timeout_secs: 60,
            image_extensions: ["png", "jpg", "jpeg", "svg"].iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// SQL toolkit settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SqlSettings {
    /// Path to the SQLite database.
    pub database_path: String,
    /// Reject anything but read statements.
    pub read_only: bool,
    /// Sample rows shown with each table schema.
    pub sample_rows: usize,
    /// Row cap suggested to the agent.
    pub top_k: usize,
}

impl Default for SqlSettings {
    fn default() -> Self {
        Self {
            database_path: "~/.agentgraph/agentgraph.db".to_string(),
            read_only: true,
            sample_rows: 3,
            top_k: 10,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServeSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7860,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    ///
    /// Environment values are overlaid on whatever the file contains.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let mut settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Settings::default()
        };

        settings.overlay_env(|name| std::env::var(name).ok());
        Ok(settings)
    }

    /// Overlay environment-provided credentials.
    pub fn overlay_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(ENV_SEARCH_API_KEY).filter(|k| !k.trim().is_empty()) {
            self.search.api_key = Some(key);
        }
        self.model.overlay(lookup);
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| AgentGraphError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("agentgraph")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded sandbox working directory.
    pub fn sandbox_dir(&self) -> PathBuf {
        Self::expand_path(&self.sandbox.workdir)
    }

    /// Get the expanded SQLite database path.
    pub fn sql_path(&self) -> PathBuf {
        Self::expand_path(&self.sql.database_path)
    }
}
