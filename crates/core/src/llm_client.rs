use crate::dialogue::{ChatContext, ChatRole, ToolInvocation, ToolSpec};
use anyhow::{Context, Result, anyhow};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        ChatCompletionTool, ChatCompletionToolArgs, CreateChatCompletionRequestArgs,
        CreateChatCompletionResponse, FunctionObjectArgs,
    },
};
use async_trait::async_trait;

/// Represents a tool call requested by the LLM.
pub type ToolCall = async_openai::types::ChatCompletionMessageToolCall;

/// Represents the two possible outcomes of one LLM turn.
#[derive(Debug, Clone)]
pub enum LLMAction {
    /// The LLM decided to respond directly with text.
    TextResponse(String),
    /// The LLM decided to call one or more tools.
    ToolCall(Vec<ToolCall>),
}

/// Token counts reported alongside a completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

#[derive(Debug, Clone)]
pub struct LLMResponse {
    pub action: LLMAction,
    pub usage: Option<TokenUsage>,
}

/// A generic client for interacting with an LLM.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Makes a single, non-streaming call to the LLM to decide on the next action.
    ///
    /// When `tools` is empty the model can only answer with text.
    async fn decide_action(
        &self,
        messages: Vec<ChatCompletionRequestMessage>,
        tools: Vec<ChatCompletionTool>,
    ) -> Result<LLMResponse>;
}

/// An implementation of `LLMClient` for any OpenAI-compatible API.
pub struct OpenAICompatibleClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAICompatibleClient {
    /// Creates a new client for an OpenAI-compatible service.
    ///
    /// # Arguments
    ///
    /// * `config` - The configuration for the OpenAI client, including API key and base URL.
    /// * `model` - The specific model identifier to use for chat completions (e.g., "gpt-4o-mini").
    pub fn new(config: OpenAIConfig, model: String) -> Self {
        Self {
            client: Client::with_config(config),
            model,
        }
    }
}

#[async_trait]
impl LLMClient for OpenAICompatibleClient {
    async fn decide_action(
        &self,
        messages: Vec<ChatCompletionRequestMessage>,
        tools: Vec<ChatCompletionTool>,
    ) -> Result<LLMResponse> {
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model).messages(messages);
        if !tools.is_empty() {
            args.tools(tools).tool_choice("auto");
        }
        let request = args.build()?;

        let response: CreateChatCompletionResponse = self.client.chat().create(request).await?;
        let usage = response.usage.as_ref().map(|u| TokenUsage {
            prompt_tokens: u64::from(u.prompt_tokens),
            completion_tokens: u64::from(u.completion_tokens),
        });
        let choice = response
            .choices
            .first()
            .context("No response choice from LLM")?;

        let action = match (&choice.message.tool_calls, &choice.message.content) {
            (Some(tool_calls), _) if !tool_calls.is_empty() => {
                LLMAction::ToolCall(tool_calls.clone())
            }
            (_, Some(content)) => LLMAction::TextResponse(content.clone()),
            _ => {
                return Err(anyhow!(
                    "LLM response had neither text content nor tool calls."
                ));
            }
        };
        Ok(LLMResponse { action, usage })
    }
}

/// Builds the request messages for one turn: the stage instructions, any
/// turn-specific instructions, then the conversation so far.
pub fn build_messages(
    instructions: &str,
    turn_instructions: Option<&str>,
    chat_ctx: &ChatContext,
) -> Result<Vec<ChatCompletionRequestMessage>> {
    let mut messages: Vec<ChatCompletionRequestMessage> = vec![
        ChatCompletionRequestSystemMessageArgs::default()
            .content(instructions.to_string())
            .build()?
            .into(),
    ];
    for msg in chat_ctx.messages() {
        let message = match msg.role {
            ChatRole::System => ChatCompletionRequestSystemMessageArgs::default()
                .content(msg.content.clone())
                .build()?
                .into(),
            ChatRole::User => ChatCompletionRequestUserMessageArgs::default()
                .content(msg.content.clone())
                .build()?
                .into(),
            ChatRole::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                .content(msg.content.clone())
                .build()?
                .into(),
        };
        messages.push(message);
    }
    if let Some(extra) = turn_instructions {
        messages.push(
            ChatCompletionRequestSystemMessageArgs::default()
                .content(extra.to_string())
                .build()?
                .into(),
        );
    }
    Ok(messages)
}

/// Converts a stage's tool into the OpenAI function-calling format.
pub fn to_chat_tool(spec: &ToolSpec) -> Result<ChatCompletionTool> {
    Ok(ChatCompletionToolArgs::default()
        .function(
            FunctionObjectArgs::default()
                .name(spec.name)
                .description(spec.description)
                .parameters(spec.parameters.clone())
                .build()?,
        )
        .build()?)
}

/// Converts a model tool call into an invocation for the session.
///
/// Arguments that are not valid JSON are passed on as a JSON string so the
/// stage rejects them and the learner is asked again.
pub fn to_invocation(call: &ToolCall) -> ToolInvocation {
    let arguments = serde_json::from_str(&call.function.arguments)
        .unwrap_or_else(|_| serde_json::Value::String(call.function.arguments.clone()));
    ToolInvocation::new(call.function.name.clone(), arguments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_openai::types::{ChatCompletionToolType, FunctionCall};
    use serde_json::json;

    fn tool_call(name: &str, arguments: &str) -> ToolCall {
        ToolCall {
            id: "call_1".to_string(),
            r#type: ChatCompletionToolType::Function,
            function: FunctionCall {
                name: name.to_string(),
                arguments: arguments.to_string(),
            },
        }
    }

    #[test]
    fn test_build_messages_orders_instructions_and_history() {
        let mut ctx = ChatContext::empty();
        ctx.push(ChatRole::Assistant, "Hi! What is your goal?");
        ctx.push(ChatRole::User, "I need English for work.");

        let messages = build_messages("Be Englishly.", Some("Say goodbye."), &ctx).unwrap();
        assert_eq!(messages.len(), 4);
        assert!(matches!(messages[0], ChatCompletionRequestMessage::System(_)));
        assert!(matches!(messages[1], ChatCompletionRequestMessage::Assistant(_)));
        assert!(matches!(messages[2], ChatCompletionRequestMessage::User(_)));
        assert!(matches!(messages[3], ChatCompletionRequestMessage::System(_)));

        let messages = build_messages("Be Englishly.", None, &ChatContext::empty()).unwrap();
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn test_to_chat_tool() {
        let spec = ToolSpec {
            name: "set_level",
            description: "Record the level.",
            parameters: json!({"type": "object", "properties": {"level": {"type": "string"}}}),
        };
        let tool = to_chat_tool(&spec).unwrap();
        assert_eq!(tool.function.name, "set_level");
        assert_eq!(tool.function.parameters, Some(spec.parameters));
    }

    #[test]
    fn test_to_invocation_parses_arguments() {
        let invocation = to_invocation(&tool_call("set_level", r#"{"level": "65%"}"#));
        assert_eq!(invocation.name, "set_level");
        assert_eq!(invocation.arguments, json!({"level": "65%"}));

        let invocation = to_invocation(&tool_call("set_level", "not json"));
        assert_eq!(invocation.arguments, json!("not json"));
    }
}
