//! Single agent with web search.

use super::react::create_react_agent;
use crate::config::Prompts;
use crate::error::Result;
use crate::graph::CompiledGraph;
use crate::message::MessagesState;
use crate::model::ChatModel;
use crate::tools::{Tool, ToolBox};
use std::collections::HashMap;
use std::sync::Arc;

/// React agent bound to a search tool, with today's date in its prompt.
pub fn create_research_agent(
    model: Arc<dyn ChatModel>,
    search: Arc<dyn Tool>,
    prompts: &Prompts,
) -> Result<CompiledGraph<MessagesState>> {
    let vars = HashMap::from([(
        "today".to_string(),
        chrono::Local::now().format("%Y-%m-%d").to_string(),
    )]);
    let prompt = prompts.render_with_custom(&prompts.react.research, &vars);

    create_react_agent(model, ToolBox::new().with_shared(search), Some(prompt))
}
