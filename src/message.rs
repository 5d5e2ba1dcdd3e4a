//! Chat messages carried through agent graphs.
//!
//! A [`MessagesState`] is the ordered message list every agent workflow
//! threads through its nodes. Nodes only ever append to it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role tag of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    Human,
    Ai,
    Tool,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::Human => write!(f, "human"),
            Role::Ai => write!(f, "ai"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-assigned call id, echoed back in the tool message.
    pub id: String,
    /// Name of the tool to run.
    pub name: String,
    /// Raw JSON arguments as produced by the model.
    pub arguments: String,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

impl fmt::Display for ToolCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}

/// A single message record: role tag plus text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Optional author name (e.g. the agent that produced a handed-off message).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Tool calls requested by an AI message. Empty for every other role.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// For tool messages, the id of the call being answered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }

    pub fn human(content: impl Into<String>) -> Self {
        Self::with_role(Role::Human, content)
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self::with_role(Role::Ai, content)
    }

    /// An AI message that requests tool calls.
    pub fn ai_with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::with_role(Role::Ai, content)
        }
    }

    /// A tool result answering `tool_call_id`.
    pub fn tool(tool_call_id: impl Into<String>, name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            tool_call_id: Some(tool_call_id.into()),
            ..Self::with_role(Role::Tool, content)
        }
    }

    /// Set the author name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Whether this message asks for at least one tool call.
    pub fn has_tool_calls(&self) -> bool {
        self.role == Role::Ai && !self.tool_calls.is_empty()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "[{} {}] {}", self.role, name, self.content)?,
            None => write!(f, "[{}] {}", self.role, self.content)?,
        }
        for call in &self.tool_calls {
            write!(f, "\n  -> {}", call)?;
        }
        Ok(())
    }
}

/// Graph state holding an append-only message list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessagesState {
    pub messages: Vec<Message>,
}

impl MessagesState {
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    /// State seeded with a single human message.
    pub fn from_human(content: impl Into<String>) -> Self {
        Self::new(vec![Message::human(content)])
    }

    /// Append messages, keeping order.
    pub fn extend(&mut self, messages: impl IntoIterator<Item = Message>) {
        self.messages.extend(messages);
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Text of the last message, or empty when there are none.
    pub fn last_content(&self) -> &str {
        self.messages.last().map(|m| m.content.as_str()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_tool_calls_only_for_ai() {
        let call = ToolCall::new("1", "db_connect", "{}");
        assert!(Message::ai_with_tool_calls("", vec![call.clone()]).has_tool_calls());
        assert!(!Message::ai("done").has_tool_calls());

        let mut human = Message::human("hi");
        human.tool_calls.push(call);
        assert!(!human.has_tool_calls());
    }

    #[test]
    fn test_state_appends_in_order() {
        let mut state = MessagesState::from_human("first");
        state.push(Message::ai("second"));
        state.extend([Message::human("third")]);

        let contents: Vec<_> = state.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["first", "second", "third"]);
        assert_eq!(state.last_content(), "third");
    }

    #[test]
    fn test_message_serializes_role_lowercase() {
        let json = serde_json::to_value(Message::tool("call_1", "triple_number", "45")).unwrap();
        assert_eq!(json["role"], "tool");
        assert_eq!(json["tool_call_id"], "call_1");
        assert!(json.get("tool_calls").is_none());
    }

    #[test]
    fn test_tool_call_display() {
        let call = ToolCall::new("1", "triple_number", r#"{"number": 5}"#);
        assert_eq!(call.to_string(), r#"triple_number({"number": 5})"#);
    }
}
