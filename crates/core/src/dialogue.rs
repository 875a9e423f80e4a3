//! Dialogue Layer Contract
//!
//! Speech-to-text, the language model and text-to-speech sit behind the
//! [`DialogueLayer`] trait. The session only asks it to speak, to generate turns
//! from instructions, and to stop speaking; the layer reports completed
//! extractions back as [`ToolInvocation`]s.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Who produced a message in the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// The conversation so far, carried from one stage into the next.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatContext {
    messages: Vec<ChatMessage>,
}

impl ChatContext {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn push(&mut self, role: ChatRole, content: impl Into<String>) {
        self.messages.push(ChatMessage {
            role,
            content: content.into(),
        });
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// A tool the model may call once the active stage's goal is satisfied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    /// JSON Schema of the tool's arguments.
    pub parameters: serde_json::Value,
}

/// A tool call extracted by the dialogue layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub name: String,
    pub arguments: serde_json::Value,
}

impl ToolInvocation {
    pub fn new(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// Everything the dialogue layer needs when a new stage becomes active.
#[derive(Debug, Clone, PartialEq)]
pub struct StageActivation {
    pub instructions: String,
    pub tool: ToolSpec,
    pub chat_ctx: ChatContext,
}

/// A request for the dialogue layer to produce one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyRequest {
    /// Extra instructions for this turn only; `None` uses the active stage's instructions.
    pub instructions: Option<String>,
    /// Whether the learner may cut the turn off by speaking.
    pub allow_interruptions: bool,
}

impl ReplyRequest {
    /// The opening turn of a stage. The learner cannot interrupt it.
    pub fn opening() -> Self {
        Self {
            instructions: None,
            allow_interruptions: false,
        }
    }

    /// The final goodbye of the session. The learner cannot interrupt it.
    pub fn closing(instructions: impl Into<String>) -> Self {
        Self {
            instructions: Some(instructions.into()),
            allow_interruptions: false,
        }
    }

    /// A follow-up turn asking the learner for information the stage still needs.
    pub fn reprompt(instructions: impl Into<String>) -> Self {
        Self {
            instructions: Some(instructions.into()),
            allow_interruptions: true,
        }
    }
}

/// The external speech/model pipeline that produces conversational turns.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DialogueLayer: Send + Sync {
    /// Installs the instructions, tool and carried-over context of a newly active stage.
    async fn activate(&self, activation: StageActivation) -> Result<()>;

    /// Speaks `text` verbatim.
    async fn say(&self, text: &str, allow_interruptions: bool) -> Result<()>;

    /// Generates and speaks one turn.
    async fn generate_reply(&self, request: ReplyRequest) -> Result<()>;

    /// Stops any turn currently being generated or spoken.
    async fn interrupt(&self) -> Result<()>;

    /// A snapshot of the conversation so far.
    async fn chat_context(&self) -> ChatContext;
}
