//! Englishly Coaching Core
//!
//! The conversation state machine behind a voice English-tutoring session: four
//! stages (intake, proficiency check, scenario roleplay, feedback) hand control
//! to one another, accumulate a [`profile::LearnerProfile`] and, at the end,
//! store a bilingual report. Speech, the language model, storage and the room
//! transport are reached through narrow traits so the state machine runs
//! unchanged against real services or in-memory fakes.

pub mod dialogue;
pub mod error;
pub mod llm_client;
pub mod metrics;
pub mod profile;
pub mod prompts;
pub mod report;
pub mod room;
pub mod sequencer;
pub mod session;
pub mod stage;
pub mod storage;

pub use error::TransitionError;
pub use session::{CoachSession, SessionDeps, SessionSettings, TurnOutcome};
