//! Errors raised by the stage state machine.

use crate::stage::StageKind;

/// A fault in the handoff protocol or in the arguments captured for a transition.
///
/// Capture faults (`UnexpectedTool`, `InvalidArguments`, `IncompleteCapture`) leave
/// the active stage and the learner profile untouched so the dialogue layer can
/// re-elicit the missing information.
#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    #[error("No stage is active")]
    NoActiveStage,
    #[error("Tool '{called}' is not available in the {stage:?} stage (expected '{expected}')")]
    UnexpectedTool {
        stage: StageKind,
        expected: &'static str,
        called: String,
    },
    #[error("Invalid arguments for tool '{tool}': {source}")]
    InvalidArguments {
        tool: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("Missing value for '{field}'")]
    IncompleteCapture { field: &'static str },
    #[error("Stage {next:?} cannot follow {previous:?}")]
    OutOfOrder {
        previous: Option<StageKind>,
        next: StageKind,
    },
}

impl TransitionError {
    /// Whether the fault came from the captured arguments rather than the protocol itself.
    pub fn is_capture_fault(&self) -> bool {
        matches!(
            self,
            TransitionError::UnexpectedTool { .. }
                | TransitionError::InvalidArguments { .. }
                | TransitionError::IncompleteCapture { .. }
        )
    }
}
