//! Azure OpenAI chat deployment.

use super::ChatModel;
use crate::config::ModelSettings;
use crate::error::{AgentGraphError, Result};
use crate::message::{Message, Role, ToolCall};
use crate::openai::create_client;
use crate::tools::ToolSpec;
use async_openai::config::AzureConfig;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs, ChatCompletionTool,
    ChatCompletionToolType, CreateChatCompletionRequestArgs, FunctionCall, FunctionObject,
};
use async_openai::Client;
use async_trait::async_trait;
use tracing::debug;

/// Chat model backed by an Azure OpenAI deployment.
///
/// Construction never fails. Missing credentials surface as a configuration
/// error on the first [`ChatModel::invoke`].
pub struct AzureChatModel {
    settings: ModelSettings,
    client: Option<Client<AzureConfig>>,
}

impl AzureChatModel {
    pub fn new(settings: ModelSettings) -> Self {
        let client = if settings.validate().is_ok() {
            create_client(&settings).ok()
        } else {
            None
        };
        Self { settings, client }
    }

    fn client(&self) -> Result<&Client<AzureConfig>> {
        match &self.client {
            Some(client) => Ok(client),
            None => {
                self.settings.validate()?;
                Err(AgentGraphError::Config("Failed to create model client".to_string()))
            }
        }
    }
}

#[async_trait]
impl ChatModel for AzureChatModel {
    async fn invoke(&self, messages: &[Message], tools: &[ToolSpec]) -> Result<Message> {
        let client = self.client()?;

        let request_messages = messages
            .iter()
            .map(to_request_message)
            .collect::<Result<Vec<_>>>()?;

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(self.settings.deployment.clone().unwrap_or_default())
            .messages(request_messages)
            .temperature(self.settings.temperature);
        if !tools.is_empty() {
            args.tools(tools.iter().map(to_tool_definition).collect::<Vec<_>>());
        }
        let request = args.build().map_err(|e| AgentGraphError::Model(e.to_string()))?;

        debug!("Calling model with {} messages, {} tools", messages.len(), tools.len());

        let response = client
            .chat()
            .create(request)
            .await
            .map_err(|e| AgentGraphError::OpenAI(format!("Chat completion failed: {}", e)))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentGraphError::Model("No response from model".to_string()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| ToolCall::new(call.id, call.function.name, call.function.arguments))
            .collect();

        Ok(Message::ai_with_tool_calls(
            choice.message.content.unwrap_or_default(),
            tool_calls,
        ))
    }

    fn name(&self) -> &str {
        self.settings.deployment.as_deref().unwrap_or("azure")
    }
}

fn to_request_message(message: &Message) -> Result<ChatCompletionRequestMessage> {
    let build_err = |e: async_openai::error::OpenAIError| AgentGraphError::Model(e.to_string());

    let request = match message.role {
        Role::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(message.content.clone())
            .build()
            .map_err(build_err)?
            .into(),
        Role::Human => {
            let mut args = ChatCompletionRequestUserMessageArgs::default();
            args.content(message.content.clone());
            if let Some(name) = &message.name {
                args.name(name.clone());
            }
            args.build().map_err(build_err)?.into()
        }
        Role::Ai => {
            let mut args = ChatCompletionRequestAssistantMessageArgs::default();
            if !message.content.is_empty() {
                args.content(message.content.clone());
            }
            if let Some(name) = &message.name {
                args.name(name.clone());
            }
            if !message.tool_calls.is_empty() {
                args.tool_calls(
                    message
                        .tool_calls
                        .iter()
                        .map(|call| ChatCompletionMessageToolCall {
                            id: call.id.clone(),
                            r#type: ChatCompletionToolType::Function,
                            function: FunctionCall {
                                name: call.name.clone(),
                                arguments: call.arguments.clone(),
                            },
                        })
                        .collect::<Vec<_>>(),
                );
            }
            args.build().map_err(build_err)?.into()
        }
        Role::Tool => ChatCompletionRequestToolMessageArgs::default()
            .tool_call_id(message.tool_call_id.clone().unwrap_or_default())
            .content(message.content.clone())
            .build()
            .map_err(build_err)?
            .into(),
    };

    Ok(request)
}

fn to_tool_definition(spec: &ToolSpec) -> ChatCompletionTool {
    ChatCompletionTool {
        r#type: ChatCompletionToolType::Function,
        function: FunctionObject {
            name: spec.name.clone(),
            description: Some(spec.description.clone()),
            parameters: Some(spec.parameters.clone()),
            strict: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_settings_fail_on_first_use() {
        let model = AzureChatModel::new(ModelSettings::default());
        let err = model.invoke(&[Message::human("hi")], &[]).await.unwrap_err();
        let text = err.to_string();
        assert!(text.contains("OPEN_API_KEY"), "{}", text);
        assert!(text.contains("DEPLOYMENT_NAME"), "{}", text);
    }

    #[test]
    fn test_tool_message_conversion() {
        let msg = Message::tool("call_1", "db_connect", "15");
        let converted = to_request_message(&msg).unwrap();
        assert!(matches!(converted, ChatCompletionRequestMessage::Tool(_)));
    }

    #[test]
    fn test_ai_message_with_calls_conversion() {
        let msg = Message::ai_with_tool_calls("", vec![ToolCall::new("c1", "triple_number", r#"{"x":5}"#)]);
        match to_request_message(&msg).unwrap() {
            ChatCompletionRequestMessage::Assistant(assistant) => {
                let calls = assistant.tool_calls.unwrap();
                assert_eq!(calls[0].function.name, "triple_number");
            }
            other => panic!("unexpected message {:?}", other),
        }
    }
}
