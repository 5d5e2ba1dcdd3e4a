//! Configuration module for agentgraph.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{
    make_system_prompt, CollaborationPrompts, DeveloperPrompts, Prompts, ReactPrompts, SqlPrompts,
};
pub use settings::{
    AgentSettings, GeneralSettings, ModelSettings, PromptSettings, SandboxSettings, SearchSettings,
    ServeSettings, Settings, SqlSettings, ENV_API_KEY, ENV_API_VERSION, ENV_BASE_URL,
    ENV_DEPLOYMENT, ENV_SEARCH_API_KEY,
};
