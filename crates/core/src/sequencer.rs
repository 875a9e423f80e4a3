//! Stage Sequencer
//!
//! Holds the single active stage slot and enforces the handoff protocol: at most
//! one stage is active, and stages are installed strictly in
//! [`StageKind::ORDER`], each exactly once.

use crate::error::TransitionError;
use crate::stage::{Stage, StageKind};

#[derive(Debug, Default)]
pub struct Sequencer {
    active: Option<Stage>,
    visited: Vec<StageKind>,
}

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `stage` the active stage.
    ///
    /// Fails if a stage is still active or if `stage` is not the direct
    /// successor of the last installed stage.
    pub fn install(&mut self, stage: Stage) -> Result<&Stage, TransitionError> {
        let previous = self.visited.last().copied();
        let expected = match previous {
            None => Some(StageKind::Intake),
            Some(kind) => kind.next(),
        };
        if self.active.is_some() || expected != Some(stage.kind()) {
            return Err(TransitionError::OutOfOrder {
                previous,
                next: stage.kind(),
            });
        }

        self.visited.push(stage.kind());
        Ok(&*self.active.insert(stage))
    }

    pub fn active(&self) -> Option<&Stage> {
        self.active.as_ref()
    }

    /// Removes the active stage so its transition can consume it.
    pub fn take_active(&mut self) -> Option<Stage> {
        self.active.take()
    }

    /// The kinds of every stage installed so far, in order.
    pub fn visited(&self) -> &[StageKind] {
        &self.visited
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::{ChatContext, ToolInvocation};
    use crate::profile::LearnerProfile;
    use crate::prompts::StagePrompts;
    use serde_json::json;
    use std::sync::Arc;

    fn calls() -> Vec<ToolInvocation> {
        vec![
            ToolInvocation::new(
                "set_user_profile",
                json!({"goal": "study", "background": "student"}),
            ),
            ToolInvocation::new("set_level", json!({"level": "40%"})),
            ToolInvocation::new("set_scenario", json!({"scenario": "university admission"})),
            ToolInvocation::new(
                "end_session",
                json!({"strengths": "fluency", "areas_to_improve": "prepositions"}),
            ),
        ]
    }

    #[test]
    fn test_progression_is_monotonic() {
        let mut sequencer = Sequencer::new();
        let mut profile = LearnerProfile::new();
        let prompts = Arc::new(StagePrompts::default());

        sequencer
            .install(Stage::intake(prompts, ChatContext::empty()))
            .unwrap();

        for call in calls() {
            assert!(sequencer.active().is_some());
            let capture = sequencer.active().unwrap().capture(&call).unwrap();
            let stage = sequencer.take_active().unwrap();
            let handoff = stage.transition(&mut profile, capture, ChatContext::empty());
            if let Some(next) = handoff.next {
                sequencer.install(next).unwrap();
            }
        }

        assert_eq!(sequencer.visited(), StageKind::ORDER);
        assert!(sequencer.active().is_none());
    }

    #[test]
    fn test_install_rejects_second_active_stage() {
        let mut sequencer = Sequencer::new();
        let prompts = Arc::new(StagePrompts::default());

        sequencer
            .install(Stage::intake(prompts.clone(), ChatContext::empty()))
            .unwrap();
        let err = sequencer
            .install(Stage::intake(prompts, ChatContext::empty()))
            .unwrap_err();

        assert!(matches!(
            err,
            TransitionError::OutOfOrder {
                previous: Some(StageKind::Intake),
                next: StageKind::Intake
            }
        ));
        assert_eq!(sequencer.visited(), [StageKind::Intake]);
    }

    #[test]
    fn test_install_rejects_revisit() {
        let mut sequencer = Sequencer::new();
        let prompts = Arc::new(StagePrompts::default());
        let mut profile = LearnerProfile::new();

        sequencer
            .install(Stage::intake(prompts.clone(), ChatContext::empty()))
            .unwrap();
        let stage = sequencer.take_active().unwrap();
        let capture = stage.capture(&calls()[0]).unwrap();
        stage.transition(&mut profile, capture, ChatContext::empty());

        // Intake already ran; only Proficiency may follow.
        let err = sequencer
            .install(Stage::intake(prompts, ChatContext::empty()))
            .unwrap_err();
        assert!(matches!(err, TransitionError::OutOfOrder { .. }));
        assert!(sequencer.active().is_none());
    }
}
