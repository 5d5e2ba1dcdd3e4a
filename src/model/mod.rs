//! Chat model abstraction.
//!
//! Agents talk to a [`ChatModel`]; [`AzureChatModel`] is the production
//! implementation and [`ScriptedModel`] replays canned replies for tests and
//! offline runs.

mod azure;
mod scripted;

pub use azure::AzureChatModel;
pub use scripted::ScriptedModel;

use crate::error::Result;
use crate::message::Message;
use crate::tools::ToolSpec;
use async_trait::async_trait;

/// A chat-completion model that may answer with tool calls.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send the conversation and the available tools, get one AI message back.
    async fn invoke(&self, messages: &[Message], tools: &[ToolSpec]) -> Result<Message>;

    /// Short identifier for logs.
    fn name(&self) -> &str;
}
