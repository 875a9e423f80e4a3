//! Text-console dialogue layer.
//!
//! Stands in for the speech pipeline during local runs: coach turns are printed
//! instead of spoken and learner turns are read as lines of text. Turn
//! generation and tool extraction use an OpenAI-compatible chat model.

use anyhow::Result;
use async_trait::async_trait;
use englishly_core::{
    dialogue::{
        ChatContext, ChatRole, DialogueLayer, ReplyRequest, StageActivation, ToolInvocation,
        ToolSpec,
    },
    llm_client::{LLMAction, LLMClient, LLMResponse, build_messages, to_chat_tool, to_invocation},
    metrics::{MetricsEvent, MetricsSink},
};
use std::sync::{Arc, OnceLock};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, warn};

#[derive(Default)]
struct DialogueState {
    instructions: String,
    tool: Option<ToolSpec>,
    chat_ctx: ChatContext,
}

pub struct ConsoleDialogue {
    llm: Arc<dyn LLMClient>,
    state: Mutex<DialogueState>,
    output: Mutex<Box<dyn AsyncWrite + Send + Unpin>>,
    metrics: OnceLock<MetricsSink>,
}

impl ConsoleDialogue {
    pub fn new(llm: Arc<dyn LLMClient>, output: Box<dyn AsyncWrite + Send + Unpin>) -> Self {
        Self {
            llm,
            state: Mutex::new(DialogueState::default()),
            output: Mutex::new(output),
            metrics: OnceLock::new(),
        }
    }

    /// Routes LLM token usage into the session's metrics channel.
    pub fn attach_metrics(&self, sink: MetricsSink) {
        if self.metrics.set(sink).is_err() {
            warn!("Metrics sink already attached; ignoring.");
        }
    }

    /// Handles one line typed by the learner.
    ///
    /// Returns the tool call when the model decides the active stage's goal is
    /// met; otherwise prints the model's reply and returns `None`.
    pub async fn user_turn(&self, text: &str) -> Result<Option<ToolInvocation>> {
        let (instructions, tool, chat_ctx) = {
            let mut state = self.state.lock().await;
            state.chat_ctx.push(ChatRole::User, text);
            (
                state.instructions.clone(),
                state.tool.clone(),
                state.chat_ctx.clone(),
            )
        };

        let tools = match &tool {
            Some(spec) => vec![to_chat_tool(spec)?],
            None => Vec::new(),
        };
        let messages = build_messages(&instructions, None, &chat_ctx)?;
        let response = self.llm.decide_action(messages, tools).await?;

        match self.record_usage(response) {
            LLMAction::TextResponse(reply) => {
                self.speak(&reply).await?;
                Ok(None)
            }
            LLMAction::ToolCall(calls) => {
                if calls.len() > 1 {
                    warn!(count = calls.len(), "Model requested several tools; using the first.");
                }
                Ok(calls.first().map(to_invocation))
            }
        }
    }

    fn record_usage(&self, response: LLMResponse) -> LLMAction {
        if let (Some(usage), Some(sink)) = (response.usage, self.metrics.get()) {
            sink.record(MetricsEvent::Llm {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
            });
        }
        response.action
    }

    async fn speak(&self, text: &str) -> Result<()> {
        {
            let mut output = self.output.lock().await;
            output
                .write_all(format!("Englishly: {}\n", text).as_bytes())
                .await?;
            output.flush().await?;
        }
        self.state
            .lock()
            .await
            .chat_ctx
            .push(ChatRole::Assistant, text);
        Ok(())
    }
}

#[async_trait]
impl DialogueLayer for ConsoleDialogue {
    async fn activate(&self, activation: StageActivation) -> Result<()> {
        debug!(tool = %activation.tool.name, "Activating stage instructions");
        let mut state = self.state.lock().await;
        state.instructions = activation.instructions;
        state.tool = Some(activation.tool);
        state.chat_ctx = activation.chat_ctx;
        Ok(())
    }

    async fn say(&self, text: &str, _allow_interruptions: bool) -> Result<()> {
        self.speak(text).await
    }

    async fn generate_reply(&self, request: ReplyRequest) -> Result<()> {
        let (instructions, chat_ctx) = {
            let state = self.state.lock().await;
            (state.instructions.clone(), state.chat_ctx.clone())
        };
        let messages = build_messages(&instructions, request.instructions.as_deref(), &chat_ctx)?;
        let response = self.llm.decide_action(messages, Vec::new()).await?;

        match self.record_usage(response) {
            LLMAction::TextResponse(reply) => self.speak(&reply).await,
            LLMAction::ToolCall(_) => {
                warn!("Model requested a tool while generating a scripted turn; ignoring.");
                Ok(())
            }
        }
    }

    /// Only logs the request. Console turns are awaited to completion, so no
    /// speech is ever in progress when it arrives.
    async fn interrupt(&self) -> Result<()> {
        debug!("Interrupt requested");
        Ok(())
    }

    async fn chat_context(&self) -> ChatContext {
        self.state.lock().await.chat_ctx.clone()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_openai::types::{
        ChatCompletionRequestMessage, ChatCompletionTool, ChatCompletionToolType, FunctionCall,
    };
    use englishly_core::llm_client::{ToolCall, TokenUsage};
    use englishly_core::metrics::UsageRecorder;
    use serde_json::json;
    use std::collections::VecDeque;
    use tokio::io::AsyncReadExt;

    /// An `LLMClient` that replays queued actions and records how many tools each request offered.
    #[derive(Default)]
    pub(crate) struct ScriptedLlm {
        actions: std::sync::Mutex<VecDeque<LLMAction>>,
        pub(crate) offered_tools: std::sync::Mutex<Vec<usize>>,
    }

    impl ScriptedLlm {
        pub(crate) fn new(actions: Vec<LLMAction>) -> Self {
            Self {
                actions: std::sync::Mutex::new(actions.into()),
                offered_tools: std::sync::Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn text(reply: &str) -> LLMAction {
            LLMAction::TextResponse(reply.to_string())
        }

        pub(crate) fn tool(name: &str, arguments: serde_json::Value) -> LLMAction {
            LLMAction::ToolCall(vec![ToolCall {
                id: format!("call_{}", name),
                r#type: ChatCompletionToolType::Function,
                function: FunctionCall {
                    name: name.to_string(),
                    arguments: arguments.to_string(),
                },
            }])
        }
    }

    #[async_trait]
    impl LLMClient for ScriptedLlm {
        async fn decide_action(
            &self,
            _messages: Vec<ChatCompletionRequestMessage>,
            tools: Vec<ChatCompletionTool>,
        ) -> Result<LLMResponse> {
            self.offered_tools.lock().unwrap().push(tools.len());
            let action = self
                .actions
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| anyhow::anyhow!("script exhausted"))?;
            Ok(LLMResponse {
                action,
                usage: Some(TokenUsage {
                    prompt_tokens: 10,
                    completion_tokens: 2,
                }),
            })
        }
    }

    fn activation() -> StageActivation {
        StageActivation {
            instructions: "Ask for the learner's level.".to_string(),
            tool: ToolSpec {
                name: "set_level",
                description: "Record the level.",
                parameters: json!({"type": "object"}),
            },
            chat_ctx: ChatContext::empty(),
        }
    }

    #[tokio::test]
    async fn test_user_turn_prints_text_reply() {
        let llm = Arc::new(ScriptedLlm::new(vec![ScriptedLlm::text("How are you today?")]));
        let (writer, mut reader) = tokio::io::duplex(1024);
        let dialogue = ConsoleDialogue::new(llm.clone(), Box::new(writer));
        dialogue.activate(activation()).await.unwrap();

        let call = dialogue.user_turn("Hello!").await.unwrap();
        assert!(call.is_none());
        assert_eq!(*llm.offered_tools.lock().unwrap(), vec![1]);

        let ctx = dialogue.chat_context().await;
        assert_eq!(ctx.len(), 2);
        assert_eq!(ctx.messages()[0].role, ChatRole::User);
        assert_eq!(ctx.messages()[1].content, "How are you today?");

        drop(dialogue);
        let mut printed = String::new();
        reader.read_to_string(&mut printed).await.unwrap();
        assert_eq!(printed, "Englishly: How are you today?\n");
    }

    #[tokio::test]
    async fn test_user_turn_returns_tool_invocation_and_records_usage() {
        let llm = Arc::new(ScriptedLlm::new(vec![ScriptedLlm::tool(
            "set_level",
            json!({"level": "80%"}),
        )]));
        let dialogue = ConsoleDialogue::new(llm, Box::new(tokio::io::sink()));
        let recorder = UsageRecorder::spawn();
        dialogue.attach_metrics(recorder.sink());
        dialogue.activate(activation()).await.unwrap();

        let call = dialogue.user_turn("I speak well.").await.unwrap().unwrap();
        assert_eq!(call.name, "set_level");
        assert_eq!(call.arguments, json!({"level": "80%"}));

        let summary = recorder.finish().await;
        assert_eq!(summary.llm_prompt_tokens, 10);
        assert_eq!(summary.llm_completion_tokens, 2);
    }

    #[tokio::test]
    async fn test_generate_reply_offers_no_tools() {
        let llm = Arc::new(ScriptedLlm::new(vec![ScriptedLlm::text("Goodbye and good luck!")]));
        let dialogue = ConsoleDialogue::new(llm.clone(), Box::new(tokio::io::sink()));
        dialogue.activate(activation()).await.unwrap();

        dialogue
            .generate_reply(ReplyRequest::closing("Say goodbye."))
            .await
            .unwrap();

        assert_eq!(*llm.offered_tools.lock().unwrap(), vec![0]);
        let ctx = dialogue.chat_context().await;
        assert_eq!(ctx.messages()[0].content, "Goodbye and good luck!");
    }
}
