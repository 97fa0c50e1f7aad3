//! Learner profile types.
//!
//! All classification fields are closed enumerations: the level, the goal tags
//! and the persona are fixed sets, and anything outside them is rejected at the
//! serde boundary. The profile itself is created exactly once per onboarding
//! run and only replaced by re-onboarding.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Self-assessed English proficiency level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnglishLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl EnglishLevel {
    /// All selectable levels, in the order the onboarding step presents them.
    pub const ALL: [EnglishLevel; 3] = [
        EnglishLevel::Beginner,
        EnglishLevel::Intermediate,
        EnglishLevel::Advanced,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EnglishLevel::Beginner => "Beginner",
            EnglishLevel::Intermediate => "Intermediate",
            EnglishLevel::Advanced => "Advanced",
        }
    }

    /// Vocabulary guidance injected into the system instruction for this level.
    pub fn instruction(&self) -> &'static str {
        match self {
            EnglishLevel::Beginner => {
                "Use very basic vocabulary (CEFR A1/A2), short sentences, and speak slowly."
            }
            EnglishLevel::Intermediate => {
                "Use moderate vocabulary (CEFR B1/B2), some idioms, and natural sentence structures."
            }
            EnglishLevel::Advanced => {
                "Use complex vocabulary (CEFR C1/C2), sophisticated idioms, and academic or nuanced structures."
            }
        }
    }

    /// Short description shown on the level-selection cards.
    pub fn description(&self) -> &'static str {
        match self {
            EnglishLevel::Beginner => "I know some words and basic phrases.",
            EnglishLevel::Intermediate => "I can hold a basic conversation.",
            EnglishLevel::Advanced => "I want to polish my professional skills.",
        }
    }
}

impl fmt::Display for EnglishLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnglishLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Beginner" => Ok(EnglishLevel::Beginner),
            "Intermediate" => Ok(EnglishLevel::Intermediate),
            "Advanced" => Ok(EnglishLevel::Advanced),
            other => Err(format!("Unknown English level: '{}'", other)),
        }
    }
}

/// Learning goal tags selectable during onboarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LearningGoal {
    #[serde(rename = "Speaking Fluency")]
    SpeakingFluency,
    Vocabulary,
    Grammar,
    #[serde(rename = "Business English")]
    BusinessEnglish,
    #[serde(rename = "Exam Practice")]
    ExamPractice,
}

impl LearningGoal {
    /// All selectable goals, in presentation order.
    pub const ALL: [LearningGoal; 5] = [
        LearningGoal::SpeakingFluency,
        LearningGoal::Vocabulary,
        LearningGoal::Grammar,
        LearningGoal::BusinessEnglish,
        LearningGoal::ExamPractice,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LearningGoal::SpeakingFluency => "Speaking Fluency",
            LearningGoal::Vocabulary => "Vocabulary",
            LearningGoal::Grammar => "Grammar",
            LearningGoal::BusinessEnglish => "Business English",
            LearningGoal::ExamPractice => "Exam Practice",
        }
    }
}

impl fmt::Display for LearningGoal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LearningGoal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Speaking Fluency" => Ok(LearningGoal::SpeakingFluency),
            "Vocabulary" => Ok(LearningGoal::Vocabulary),
            "Grammar" => Ok(LearningGoal::Grammar),
            "Business English" => Ok(LearningGoal::BusinessEnglish),
            "Exam Practice" => Ok(LearningGoal::ExamPractice),
            other => Err(format!("Unknown learning goal: '{}'", other)),
        }
    }
}

/// Named personality configuration applied to the conversational AI.
///
/// A single persona exists today; the enum keeps the field a closed set so
/// adding personas later is a pure extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PersonaType {
    Emma,
}

/// Static configuration for a persona: display name, card description, and
/// the instruction text spliced into the system prompt.
#[derive(Debug, Clone, Copy)]
pub struct PersonaConfig {
    pub name: &'static str,
    pub description: &'static str,
    pub instruction: &'static str,
}

impl PersonaType {
    pub fn config(&self) -> PersonaConfig {
        match self {
            PersonaType::Emma => PersonaConfig {
                name: "Emma",
                description: "A funny, friendly, and familiar companion who makes learning \
                              feel like chatting with a best friend.",
                instruction: "Act as Emma, a funny, friendly, and familiar English companion. \
                              Use warm, casual language, make light jokes, use emojis, and \
                              treat the user like a close friend. Be encouraging but maintain \
                              a humorous and witty personality.",
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.config().name
    }
}

/// The learner profile produced by onboarding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    /// Display name entered in onboarding step 1 (always non-empty)
    pub name: String,

    /// Self-assessed proficiency level
    pub level: EnglishLevel,

    /// Selected goal tags (non-empty after onboarding completion)
    pub goals: Vec<LearningGoal>,

    /// Active persona
    pub persona: PersonaType,

    /// Consecutive-day practice streak
    pub streak: u32,

    /// When the profile was last (re)created
    pub last_active: DateTime<Utc>,
}

impl UserProfile {
    /// Goals joined for prompt interpolation, e.g. "Speaking Fluency, Grammar".
    pub fn goals_joined(&self) -> String {
        self.goals
            .iter()
            .map(|g| g.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_round_trip() {
        for level in EnglishLevel::ALL {
            assert_eq!(level.as_str().parse::<EnglishLevel>().unwrap(), level);
        }
        assert!("Fluent".parse::<EnglishLevel>().is_err());
    }

    #[test]
    fn test_goal_round_trip() {
        for goal in LearningGoal::ALL {
            assert_eq!(goal.as_str().parse::<LearningGoal>().unwrap(), goal);
        }
        assert!("Pronunciation".parse::<LearningGoal>().is_err());
    }

    #[test]
    fn test_goal_serde_uses_display_names() {
        let json = serde_json::to_string(&LearningGoal::SpeakingFluency).unwrap();
        assert_eq!(json, "\"Speaking Fluency\"");
        let parsed: LearningGoal = serde_json::from_str("\"Business English\"").unwrap();
        assert_eq!(parsed, LearningGoal::BusinessEnglish);
    }

    #[test]
    fn test_goals_joined() {
        let profile = UserProfile {
            name: "Mina".to_string(),
            level: EnglishLevel::Intermediate,
            goals: vec![LearningGoal::SpeakingFluency, LearningGoal::Grammar],
            persona: PersonaType::Emma,
            streak: 0,
            last_active: Utc::now(),
        };
        assert_eq!(profile.goals_joined(), "Speaking Fluency, Grammar");
    }

    #[test]
    fn test_persona_config() {
        let config = PersonaType::Emma.config();
        assert_eq!(config.name, "Emma");
        assert!(config.instruction.contains("Emma"));
    }
}
