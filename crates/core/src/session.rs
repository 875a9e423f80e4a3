//! Coaching Session Orchestrator
//!
//! A [`CoachSession`] owns the learner profile and the stage sequencer for one
//! room. It is driven from a single logical thread: the dialogue layer reports
//! each completed extraction through [`CoachSession::handle_tool_call`], and
//! every call runs to completion before the next one is accepted. The profile
//! has a single writer, the active stage, and is never locked.

use crate::dialogue::{ChatContext, DialogueLayer, ReplyRequest, StageActivation, ToolInvocation};
use crate::error::TransitionError;
use crate::metrics::{MetricsSink, UsageRecorder, UsageSummary};
use crate::profile::LearnerProfile;
use crate::prompts::StagePrompts;
use crate::report::{CONTENT_TYPE, Report};
use crate::room::RoomTransport;
use crate::sequencer::Sequencer;
use crate::stage::{Stage, StageKind};
use crate::storage::ReportStore;
use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info, warn};

/// The bucket reports are stored in unless configured otherwise.
pub const DEFAULT_REPORT_BUCKET: &str = "englishly-reports";
/// The prefix of every report key unless configured otherwise.
pub const DEFAULT_REPORT_KEY_PREFIX: &str = "english_feedback_report";

/// The external collaborators a session talks to.
#[derive(Clone)]
pub struct SessionDeps {
    pub dialogue: Arc<dyn DialogueLayer>,
    pub store: Arc<dyn ReportStore>,
    pub room: Arc<dyn RoomTransport>,
}

/// Per-deployment settings for a session.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub prompts: Arc<StagePrompts>,
    pub report_bucket: String,
    pub report_key_prefix: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            prompts: Arc::new(StagePrompts::default()),
            report_bucket: DEFAULT_REPORT_BUCKET.to_string(),
            report_key_prefix: DEFAULT_REPORT_KEY_PREFIX.to_string(),
        }
    }
}

/// What became of a tool call reported by the dialogue layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The captured values were incomplete; the stage stays active and re-asks.
    Rejected(String),
    /// The handoff succeeded and the given stage is now active.
    Advanced(StageKind),
    /// The terminal stage completed and the room has been torn down.
    Finished,
}

pub struct CoachSession {
    deps: SessionDeps,
    settings: SessionSettings,
    profile: LearnerProfile,
    sequencer: Sequencer,
    usage: UsageRecorder,
    finalized: bool,
}

impl CoachSession {
    /// Creates a session with an empty profile and starts its usage recorder.
    ///
    /// Must be called within a tokio runtime.
    pub fn new(deps: SessionDeps, settings: SessionSettings) -> Self {
        Self {
            deps,
            settings,
            profile: LearnerProfile::new(),
            sequencer: Sequencer::new(),
            usage: UsageRecorder::spawn(),
            finalized: false,
        }
    }

    /// A sink the dialogue layer can report usage events to.
    pub fn metrics_sink(&self) -> MetricsSink {
        self.usage.sink()
    }

    pub fn profile(&self) -> &LearnerProfile {
        &self.profile
    }

    pub fn active_stage(&self) -> Option<StageKind> {
        self.sequencer.active().map(Stage::kind)
    }

    /// Every stage that has been active so far, in order.
    pub fn visited_stages(&self) -> &[StageKind] {
        self.sequencer.visited()
    }

    /// True once finalization has completed and the room has been deleted.
    pub fn is_finished(&self) -> bool {
        self.finalized
    }

    /// Connects to the room and installs the intake stage.
    pub async fn start(&mut self) -> Result<()> {
        self.deps.room.connect().await?;
        info!(room = %self.deps.room.room_name(), "Connected to room. Starting intake.");

        let intake = Stage::intake(Arc::clone(&self.settings.prompts), ChatContext::empty());
        self.install(intake, None).await
    }

    /// Applies a tool call from the dialogue layer to the active stage.
    ///
    /// Incomplete or mismatched captures are answered with a re-eliciting turn
    /// and reported as [`TurnOutcome::Rejected`]. Calls arriving when no stage is
    /// active are protocol errors.
    pub async fn handle_tool_call(&mut self, call: ToolInvocation) -> Result<TurnOutcome> {
        let stage = self
            .sequencer
            .active()
            .ok_or(TransitionError::NoActiveStage)?;
        let kind = stage.kind();
        let capture = match stage.capture(&call) {
            Ok(capture) => capture,
            Err(e) if e.is_capture_fault() => {
                warn!(stage = ?kind, tool = %call.name, error = %e, "Rejected tool call");
                let reason = e.to_string();
                self.deps
                    .dialogue
                    .generate_reply(ReplyRequest::reprompt(format!(
                        "The information could not be recorded ({}). Ask the learner for what is still missing.",
                        reason
                    )))
                    .await?;
                return Ok(TurnOutcome::Rejected(reason));
            }
            Err(e) => return Err(e.into()),
        };

        if kind.is_terminal() {
            // Stop overlapping speech before the closing remarks. The stage stays
            // active if this fails.
            self.deps.dialogue.interrupt().await?;
        }
        let stage = self
            .sequencer
            .take_active()
            .ok_or(TransitionError::NoActiveStage)?;

        let chat_ctx = self.deps.dialogue.chat_context().await;
        let handoff = stage.transition(&mut self.profile, capture, chat_ctx);

        match handoff.next {
            Some(next) => {
                let kind = next.kind();
                self.install(next, Some(&handoff.utterance)).await?;
                Ok(TurnOutcome::Advanced(kind))
            }
            None => {
                self.finalize(&handoff.utterance).await?;
                Ok(TurnOutcome::Finished)
            }
        }
    }

    /// Stops the usage recorder and logs the session's usage summary.
    pub async fn shutdown(self) -> UsageSummary {
        let summary = self.usage.finish().await;
        info!(%summary, "Usage");
        summary
    }

    async fn install(&mut self, stage: Stage, utterance: Option<&str>) -> Result<()> {
        let stage = self.sequencer.install(stage)?;
        info!(stage = ?stage.kind(), "Stage active");

        self.deps
            .dialogue
            .activate(StageActivation {
                instructions: stage.instructions().to_string(),
                tool: stage.tool_spec(),
                chat_ctx: stage.chat_ctx().clone(),
            })
            .await?;
        if let Some(utterance) = utterance {
            self.deps.dialogue.say(utterance, true).await?;
        }
        stage.on_enter(self.deps.dialogue.as_ref()).await
    }

    async fn finalize(&mut self, closing_instructions: &str) -> Result<()> {
        let room = self.deps.room.room_name();
        let report = Report::compile(&self.profile);
        self.store_report(&report, &room).await;

        self.deps
            .dialogue
            .generate_reply(ReplyRequest::closing(closing_instructions))
            .await?;

        self.deps.room.delete_room(&room).await?;
        self.finalized = true;
        info!(%room, "Session finished and room deleted.");
        Ok(())
    }

    /// Hands the report to the store. Failures are logged, never propagated.
    async fn store_report(&self, report: &Report, room: &str) {
        let key = Report::object_key(&self.settings.report_key_prefix, room);
        let body = match report.to_json_bytes() {
            Ok(body) => body,
            Err(e) => {
                error!(%key, error = %e, "Failed to serialize report");
                return;
            }
        };

        match self
            .deps
            .store
            .put(&self.settings.report_bucket, &key, body, CONTENT_TYPE)
            .await
        {
            Ok(()) => info!(bucket = %self.settings.report_bucket, %key, "Report uploaded"),
            Err(e) => error!(%key, error = ?e, "Failed to upload report"),
        }
    }
}
