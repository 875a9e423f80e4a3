//! Conversation Stages
//!
//! A session moves through four stages in a fixed order: intake, proficiency
//! check, scenario roleplay and feedback. Every stage owns one instructions
//! string and exactly one tool. When the dialogue layer calls that tool, the
//! stage writes the captured values into the [`LearnerProfile`] and hands off to
//! its successor together with a short bridging utterance.

use crate::dialogue::{ChatContext, DialogueLayer, ReplyRequest, ToolInvocation, ToolSpec};
use crate::error::TransitionError;
use crate::profile::LearnerProfile;
use crate::prompts::StagePrompts;
use anyhow::Result;
use schemars::{JsonSchema, schema_for};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Identifies one of the four stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StageKind {
    Intake,
    Proficiency,
    Scenario,
    Feedback,
}

impl StageKind {
    /// Every stage in the order a session visits them.
    pub const ORDER: [StageKind; 4] = [
        StageKind::Intake,
        StageKind::Proficiency,
        StageKind::Scenario,
        StageKind::Feedback,
    ];

    /// The stage that follows this one, or `None` for the terminal stage.
    pub fn next(self) -> Option<StageKind> {
        match self {
            StageKind::Intake => Some(StageKind::Proficiency),
            StageKind::Proficiency => Some(StageKind::Scenario),
            StageKind::Scenario => Some(StageKind::Feedback),
            StageKind::Feedback => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.next().is_none()
    }

    /// The name of the single tool this stage exposes.
    pub fn tool_name(self) -> &'static str {
        match self {
            StageKind::Intake => "set_user_profile",
            StageKind::Proficiency => "set_level",
            StageKind::Scenario => "set_scenario",
            StageKind::Feedback => "end_session",
        }
    }

    fn tool_description(self) -> &'static str {
        match self {
            StageKind::Intake => {
                "Record the learner's English learning goal and background once both are known."
            }
            StageKind::Proficiency => {
                "Record the learner's estimated English proficiency level (out of 100%)."
            }
            StageKind::Scenario => "Record the practice scenario once the roleplay is complete.",
            StageKind::Feedback => {
                "Record the learner's strengths and areas to improve, then end the session."
            }
        }
    }

    fn instructions(self, prompts: &StagePrompts) -> &str {
        match self {
            StageKind::Intake => &prompts.intake,
            StageKind::Proficiency => &prompts.proficiency,
            StageKind::Scenario => &prompts.scenario,
            StageKind::Feedback => &prompts.feedback,
        }
    }
}

// --- Captured Arguments ---

#[derive(Deserialize, JsonSchema, Debug, Clone, PartialEq, Eq)]
pub struct UserProfileArgs {
    #[schemars(description = "The learner's English learning goal, e.g. job, travel or study")]
    pub goal: String,
    #[schemars(description = "The learner's background, e.g. student, doctor or engineer")]
    pub background: String,
}

#[derive(Deserialize, JsonSchema, Debug, Clone, PartialEq, Eq)]
pub struct LevelArgs {
    #[schemars(description = "The estimated proficiency level, e.g. '70%'")]
    pub level: String,
}

#[derive(Deserialize, JsonSchema, Debug, Clone, PartialEq, Eq)]
pub struct ScenarioArgs {
    #[schemars(description = "The scenario that was practiced, e.g. 'job interview roleplay'")]
    pub scenario: String,
}

#[derive(Deserialize, JsonSchema, Debug, Clone, PartialEq, Eq)]
pub struct FeedbackArgs {
    #[schemars(description = "What the learner did well")]
    pub strengths: String,
    #[schemars(description = "What the learner should work on next")]
    pub areas_to_improve: String,
}

/// Validated arguments of a stage's tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capture {
    UserProfile(UserProfileArgs),
    Level(LevelArgs),
    Scenario(ScenarioArgs),
    Feedback(FeedbackArgs),
}

/// The result of a stage's transition.
///
/// `next` is the successor to install, or `None` once the terminal stage has
/// completed. For a non-terminal handoff `utterance` is spoken before the
/// successor's opening turn; for the terminal stage it holds the instructions
/// of the closing turn.
#[derive(Debug)]
pub struct Handoff {
    pub next: Option<Stage>,
    pub utterance: String,
}

/// The live unit of the conversation. At most one exists per session at a time.
#[derive(Debug)]
pub struct Stage {
    kind: StageKind,
    instructions: String,
    chat_ctx: ChatContext,
    prompts: Arc<StagePrompts>,
}

impl Stage {
    fn new(kind: StageKind, prompts: Arc<StagePrompts>, chat_ctx: ChatContext) -> Self {
        Self {
            kind,
            instructions: kind.instructions(&prompts).to_string(),
            chat_ctx,
            prompts,
        }
    }

    /// Creates the first stage of a session.
    pub fn intake(prompts: Arc<StagePrompts>, chat_ctx: ChatContext) -> Self {
        Self::new(StageKind::Intake, prompts, chat_ctx)
    }

    pub fn kind(&self) -> StageKind {
        self.kind
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    /// The conversation carried over from the previous stage.
    pub fn chat_ctx(&self) -> &ChatContext {
        &self.chat_ctx
    }

    /// The tool the dialogue layer calls when this stage's goal is met.
    pub fn tool_spec(&self) -> ToolSpec {
        let parameters = match self.kind {
            StageKind::Intake => schema_for!(UserProfileArgs),
            StageKind::Proficiency => schema_for!(LevelArgs),
            StageKind::Scenario => schema_for!(ScenarioArgs),
            StageKind::Feedback => schema_for!(FeedbackArgs),
        };
        ToolSpec {
            name: self.kind.tool_name(),
            description: self.kind.tool_description(),
            parameters: parameters.into(),
        }
    }

    /// Triggers the stage's opening turn. The learner cannot interrupt it.
    pub async fn on_enter(&self, dialogue: &dyn DialogueLayer) -> Result<()> {
        dialogue.generate_reply(ReplyRequest::opening()).await
    }

    /// Checks that `call` targets this stage's tool and carries every required value.
    pub fn capture(&self, call: &ToolInvocation) -> Result<Capture, TransitionError> {
        let expected = self.kind.tool_name();
        if call.name != expected {
            return Err(TransitionError::UnexpectedTool {
                stage: self.kind,
                expected,
                called: call.name.clone(),
            });
        }

        match self.kind {
            StageKind::Intake => {
                let args: UserProfileArgs = parse_args(expected, call)?;
                require("goal", &args.goal)?;
                require("background", &args.background)?;
                Ok(Capture::UserProfile(args))
            }
            StageKind::Proficiency => {
                let args: LevelArgs = parse_args(expected, call)?;
                require("level", &args.level)?;
                Ok(Capture::Level(args))
            }
            StageKind::Scenario => {
                let args: ScenarioArgs = parse_args(expected, call)?;
                require("scenario", &args.scenario)?;
                Ok(Capture::Scenario(args))
            }
            StageKind::Feedback => {
                let args: FeedbackArgs = parse_args(expected, call)?;
                require("strengths", &args.strengths)?;
                require("areas_to_improve", &args.areas_to_improve)?;
                Ok(Capture::Feedback(args))
            }
        }
    }

    /// Writes the captured values into `profile` and hands off to the next stage.
    ///
    /// Consumes the stage: a transition fires at most once per stage instance.
    /// The successor is built with `chat_ctx`, the conversation as it stands at
    /// the moment of handoff.
    pub fn transition(
        self,
        profile: &mut LearnerProfile,
        capture: Capture,
        chat_ctx: ChatContext,
    ) -> Handoff {
        let prompts = self.prompts;
        let successor =
            |kind: StageKind| Some(Stage::new(kind, Arc::clone(&prompts), chat_ctx.clone()));

        match capture {
            Capture::UserProfile(args) => {
                info!(goal = %args.goal, background = %args.background, "User profile captured");
                profile.goal = Some(args.goal);
                profile.background = Some(args.background);
                Handoff {
                    next: successor(StageKind::Proficiency),
                    utterance: "Thanks! Let's assess your English level now.".to_string(),
                }
            }
            Capture::Level(args) => {
                info!(level = %args.level, "Proficiency level captured");
                let utterance = format!(
                    "Got it! Your level is estimated at {}. Let's move on.",
                    args.level
                );
                profile.level = Some(args.level);
                Handoff {
                    next: successor(StageKind::Scenario),
                    utterance,
                }
            }
            Capture::Scenario(args) => {
                info!(scenario = %args.scenario, "Scenario captured");
                let utterance = format!("Great! You've completed the {} practice.", args.scenario);
                profile.scenario = Some(args.scenario);
                Handoff {
                    next: successor(StageKind::Feedback),
                    utterance,
                }
            }
            Capture::Feedback(args) => {
                info!(
                    strengths = %args.strengths,
                    areas_to_improve = %args.areas_to_improve,
                    "Feedback captured"
                );
                profile.strengths = Some(args.strengths);
                profile.areas_to_improve = Some(args.areas_to_improve);
                Handoff {
                    next: None,
                    utterance: prompts.farewell.clone(),
                }
            }
        }
    }
}

fn parse_args<T: DeserializeOwned>(
    tool: &'static str,
    call: &ToolInvocation,
) -> Result<T, TransitionError> {
    serde_json::from_value(call.arguments.clone())
        .map_err(|source| TransitionError::InvalidArguments { tool, source })
}

fn require(field: &'static str, value: &str) -> Result<(), TransitionError> {
    if value.trim().is_empty() {
        Err(TransitionError::IncompleteCapture { field })
    } else {
        Ok(())
    }
}
