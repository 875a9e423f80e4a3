use serde::{Deserialize, Serialize};

/// Learner attributes accumulated across the stages of one session.
///
/// Each field is owned by exactly one stage and written once, by that stage's
/// transition. Later stages only ever observe values written before them, which
/// the fixed stage order guarantees. The profile is owned by the session and
/// mutated only by the single active stage, so it needs no locking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnerProfile {
    /// Why the learner wants to improve their English (job, travel, study).
    pub goal: Option<String>,
    /// The learner's background or occupation.
    pub background: Option<String>,
    /// Estimated proficiency, usually a percentage.
    pub level: Option<String>,
    /// The roleplay scenario that was practiced.
    pub scenario: Option<String>,
    pub strengths: Option<String>,
    pub areas_to_improve: Option<String>,
}

impl LearnerProfile {
    /// Creates an empty profile for a new session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks if every attribute has been captured.
    pub fn is_complete(&self) -> bool {
        [
            &self.goal,
            &self.background,
            &self.level,
            &self.scenario,
            &self.strengths,
            &self.areas_to_improve,
        ]
        .iter()
        .all(|field| field.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_profile_is_empty() {
        let profile = LearnerProfile::new();
        assert_eq!(profile, LearnerProfile::default());
        assert!(profile.goal.is_none());
        assert!(!profile.is_complete());
    }

    #[test]
    fn test_is_complete() {
        let mut profile = LearnerProfile {
            goal: Some("travel".into()),
            background: Some("student".into()),
            level: Some("55%".into()),
            scenario: Some("airport check-in".into()),
            strengths: Some("vocabulary".into()),
            areas_to_improve: None,
        };
        assert!(!profile.is_complete());

        profile.areas_to_improve = Some("articles".into());
        assert!(profile.is_complete());
    }
}
