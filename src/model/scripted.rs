//! A model that replays canned replies.

use super::ChatModel;
use crate::error::{AgentGraphError, Result};
use crate::message::Message;
use crate::tools::ToolSpec;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replays a fixed list of AI messages in order and records every request.
///
/// Used by tests and by the offline demos; running out of replies is an error.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Message>>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedModel {
    pub fn new(replies: impl IntoIterator<Item = Message>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Conversations received so far, one entry per call.
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Replies not yet consumed.
    pub fn remaining(&self) -> usize {
        self.replies.lock().map(|r| r.len()).unwrap_or_default()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn invoke(&self, messages: &[Message], _tools: &[ToolSpec]) -> Result<Message> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(messages.to_vec());
        }

        self.replies
            .lock()
            .map_err(|_| AgentGraphError::Model("scripted model poisoned".to_string()))?
            .pop_front()
            .ok_or_else(|| AgentGraphError::Model("scripted model has no replies left".to_string()))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
