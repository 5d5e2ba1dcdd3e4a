//! Web search through the Tavily API.

use super::{required_str, Tool};
use crate::config::{SearchSettings, ENV_SEARCH_API_KEY};
use crate::error::{AgentGraphError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, instrument};

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

/// One search result.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub content: String,
}

/// The `web_search` tool.
pub struct WebSearchTool {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    max_results: usize,
}

impl WebSearchTool {
    pub fn new(settings: &SearchSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AgentGraphError::Search(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            api_key: settings.api_key.clone(),
            max_results: settings.max_results,
        })
    }

    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AgentGraphError::Search(format!("{} is not set", ENV_SEARCH_API_KEY)))?;

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&SearchRequest {
                api_key,
                query,
                max_results: self.max_results,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentGraphError::Search(format!("{}: {}", status, body.trim())));
        }

        let parsed: SearchResponse = response.json().await?;
        debug!("Search returned {} results", parsed.results.len());
        Ok(parsed.results)
    }
}

fn format_hits(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return "No results found.".to_string();
    }

    hits.iter()
        .enumerate()
        .map(|(i, h)| format!("{}. {}\n   {}\n   {}", i + 1, h.title, h.url, h.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for current information. Use simple queries without date parameters."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                }
            },
            "required": ["query"]
        })
    }

    async fn call(&self, args: Value) -> Result<String> {
        let query = required_str(&args, "query")?;
        match self.search(query).await {
            Ok(hits) => Ok(format_hits(&hits)),
            Err(e) => Ok(format!("Search failed: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Json, Router};

    async fn fake_tavily() -> String {
        let app = Router::new().route(
            "/search",
            post(|Json(body): Json<Value>| async move {
                Json(json!({
                    "query": body["query"],
                    "results": [
                        { "title": "GDP", "url": "https://example.org/gdp", "content": "UK GDP grew.", "score": 0.9 }
                    ]
                }))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/search", addr)
    }

    #[tokio::test]
    async fn test_search_formats_hits() {
        let settings = SearchSettings {
            endpoint: fake_tavily().await,
            api_key: Some("tvly-test".to_string()),
            ..SearchSettings::default()
        };
        let tool = WebSearchTool::new(&settings).unwrap();

        let out = tool.call(json!({ "query": "uk gdp" })).await.unwrap();
        assert!(out.starts_with("1. GDP\n   https://example.org/gdp"), "{}", out);
    }

    #[tokio::test]
    async fn test_missing_key_reports_failure_text() {
        let tool = WebSearchTool::new(&SearchSettings::default()).unwrap();
        let out = tool.call(json!({ "query": "anything" })).await.unwrap();
        assert!(out.starts_with("Search failed:"));
        assert!(out.contains(ENV_SEARCH_API_KEY));
    }

    #[test]
    fn test_format_no_hits() {
        assert_eq!(format_hits(&[]), "No results found.");
    }
}
