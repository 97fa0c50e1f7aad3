//! Message log entry types shared by the text chat and the live voice bridge.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Model,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Model => "model",
        }
    }

    /// Upper-cased tag used when flattening a transcript for analysis.
    pub fn transcript_tag(&self) -> &'static str {
        match self {
            MessageRole::User => "USER",
            MessageRole::Model => "MODEL",
        }
    }
}

/// A structured annotation of a language mistake in user input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correction {
    /// The incorrect part of the user's input
    pub original: String,

    /// The corrected version
    pub corrected: String,

    /// Brief explanation of why it was wrong
    pub explanation: String,
}

/// One entry in a session's append-only message log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique id within the session
    pub id: String,

    pub role: MessageRole,

    pub text: String,

    pub timestamp: DateTime<Utc>,

    /// Correction attached to a model reply, if the user's input had a mistake
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correction: Option<Correction>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: MessageRole::User,
            text: text.into(),
            timestamp: Utc::now(),
            correction: None,
        }
    }

    pub fn model(text: impl Into<String>, correction: Option<Correction>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: MessageRole::Model,
            text: text.into(),
            timestamp: Utc::now(),
            correction,
        }
    }
}

/// End-of-session structured analysis of a transcript.
///
/// Field names follow the upstream response schema, which uses camelCase for
/// the compound fields. The report is returned to the caller and never
/// persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    /// Encouraging analysis of the session
    pub summary: String,

    /// Specific error patterns found
    pub mistakes: Vec<String>,

    /// Tips to improve vocabulary
    #[serde(rename = "vocabularyTips")]
    pub vocabulary_tips: Vec<String>,

    /// Key new words or phrases learned
    #[serde(rename = "newWords")]
    pub new_words: Vec<String>,

    /// Overall correctness score (1-100)
    pub score: u8,

    /// Flow and naturalness score (1-100)
    #[serde(rename = "fluencyScore")]
    pub fluency_score: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_ids_are_unique() {
        let a = ChatMessage::user("hello");
        let b = ChatMessage::user("hello");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&MessageRole::User).unwrap(), "\"user\"");
        assert_eq!(serde_json::to_string(&MessageRole::Model).unwrap(), "\"model\"");
    }

    #[test]
    fn test_correction_omitted_when_absent() {
        let msg = ChatMessage::model("hi there", None);
        let json = serde_json::to_string(&msg).unwrap();
        assert!(!json.contains("correction"));

        let msg = ChatMessage::model(
            "almost!",
            Some(Correction {
                original: "I has".to_string(),
                corrected: "I have".to_string(),
                explanation: "Use 'have' with 'I'.".to_string(),
            }),
        );
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("correction"));
    }

    #[test]
    fn test_report_parses_upstream_field_names() {
        let json = r#"{
            "summary": "Nice work",
            "mistakes": ["tense agreement"],
            "vocabularyTips": ["try synonyms for 'good'"],
            "newWords": ["resilient"],
            "score": 82,
            "fluencyScore": 77
        }"#;
        let report: SessionReport = serde_json::from_str(json).unwrap();
        assert_eq!(report.vocabulary_tips.len(), 1);
        assert_eq!(report.new_words, vec!["resilient"]);
        assert_eq!(report.fluency_score, 77);
    }
}
