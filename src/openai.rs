//! Azure OpenAI client configuration with sensible defaults.

use crate::config::ModelSettings;
use crate::error::{AgentGraphError, Result};
use async_openai::{config::AzureConfig, Client};
use std::time::Duration;

/// Create an Azure OpenAI client from model settings.
///
/// Missing values are passed through as empty strings; callers that need an
/// eager check should run [`ModelSettings::validate`] first.
pub fn create_client(settings: &ModelSettings) -> Result<Client<AzureConfig>> {
    create_client_with_timeout(settings, Duration::from_secs(settings.timeout_secs))
}

/// Create an Azure OpenAI client with a custom timeout.
pub fn create_client_with_timeout(settings: &ModelSettings, timeout: Duration) -> Result<Client<AzureConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AgentGraphError::Config(format!("Failed to create HTTP client: {}", e)))?;

    let config = AzureConfig::new()
        .with_api_base(settings.endpoint.clone().unwrap_or_default())
        .with_api_key(settings.api_key.clone().unwrap_or_default())
        .with_deployment_id(settings.deployment.clone().unwrap_or_default())
        .with_api_version(settings.api_version.clone().unwrap_or_default());

    Ok(Client::with_config(config).with_http_client(http_client))
}
