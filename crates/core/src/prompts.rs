//! Stage Instructions
//!
//! Each stage drives the dialogue layer with a fixed instructions string. The
//! built-in defaults carry the coach persona; a deployment can override any of
//! them with markdown files in a prompts directory.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::info;

const INTAKE: &str = "\
Your name is Englishly.
You are an English-speaking AI coach.
Start with a friendly introduction.
Ask the user about their English learning goal (e.g., job, travel, study).
Then ask about their background (e.g., student, doctor, engineer).
After collecting both, call set_user_profile with the goal and background.
Only speak English. If the user uses another language, gently remind them to use English.";

const PROFICIENCY: &str = "\
Ask the user a few simple English questions to evaluate their speaking proficiency.
Based on their answers, estimate their proficiency level (out of 100%).
Do not explain the levels.
When ready, call set_level with the estimated level.";

const SCENARIO: &str = "\
Based on the user's goal and level, pick a suitable practice scenario:
- Job interview based on their background
- University admission
- Business meeting
- Travel conversation

Announce the scenario and start a short roleplay session.
Ask 2-3 scenario-based questions.
Then call set_scenario with the scenario you practiced.";

const FEEDBACK: &str = "\
Provide feedback based on the user's overall performance:
- Proficiency score
- Strengths
- Areas to improve

Present the report in English and Arabic.
After giving the report, call end_session with the strengths and areas to improve.";

const FAREWELL: &str = "Say goodbye and wish the learner good luck.";

/// The instructions for every stage plus the closing turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagePrompts {
    pub intake: String,
    pub proficiency: String,
    pub scenario: String,
    pub feedback: String,
    pub farewell: String,
}

impl Default for StagePrompts {
    fn default() -> Self {
        Self {
            intake: INTAKE.to_string(),
            proficiency: PROFICIENCY.to_string(),
            scenario: SCENARIO.to_string(),
            feedback: FEEDBACK.to_string(),
            farewell: FAREWELL.to_string(),
        }
    }
}

impl StagePrompts {
    /// Loads prompts from a directory, keeping the default for any file that is absent.
    ///
    /// Recognised files are `intake.md`, `proficiency.md`, `scenario.md`,
    /// `feedback.md` and `farewell.md`. Other files are ignored.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let mut prompts = Self::default();
        for entry in fs::read_dir(dir)
            .with_context(|| format!("Failed to read prompts directory {}", dir.display()))?
        {
            let path = entry?.path();
            if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("md") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let slot = match stem {
                "intake" => &mut prompts.intake,
                "proficiency" => &mut prompts.proficiency,
                "scenario" => &mut prompts.scenario,
                "feedback" => &mut prompts.feedback,
                "farewell" => &mut prompts.farewell,
                _ => continue,
            };
            *slot = fs::read_to_string(&path)?.trim().to_string();
            info!(prompt = %stem, "Loaded prompt override");
        }
        Ok(prompts)
    }
}
