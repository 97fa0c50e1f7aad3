//! HTTP client for the upstream text-completion endpoint.
//!
//! Requests ask for `application/json` responses constrained by a response
//! schema, so the reply body's inner text is itself a JSON document:
//! `{reply, correction?}` for chat turns and the fixed report shape for
//! session analysis. The schema is part of the hosted API's contract and is
//! mirrored here, not invented.

use crate::chat::message::{ChatMessage, Correction, SessionReport};
use crate::config::UpstreamConfig;
use crate::upstream::UpstreamError;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// Structured reply returned for one chat turn.
#[derive(Debug, Clone, Deserialize)]
pub struct StructuredReply {
    /// The natural conversational response to the user
    pub reply: String,

    /// Present when the user's input contained a language mistake
    #[serde(default)]
    pub correction: Option<Correction>,
}

/// One role-tagged content block in a completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub role: Option<String>,
    pub parts: Vec<TextPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextPart {
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

/// Client for the structured-completion endpoint.
pub struct CompletionClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl CompletionClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, String> {
        let mut builder = reqwest::Client::builder();
        if config.request_timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.request_timeout_secs));
        }
        let http = builder
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.chat_model.clone(),
        })
    }

    /// Request a structured reply for one chat turn.
    ///
    /// The full prior history is forwarded role-tagged, followed by the new
    /// user message. No retry on failure.
    pub async fn chat_reply(
        &self,
        system_instruction: &str,
        history: &[ChatMessage],
        message: &str,
    ) -> Result<StructuredReply, UpstreamError> {
        let mut contents: Vec<Content> = history
            .iter()
            .map(|m| Content {
                role: Some(m.role.as_str().to_string()),
                parts: vec![TextPart {
                    text: m.text.clone(),
                }],
            })
            .collect();
        contents.push(Content {
            role: Some("user".to_string()),
            parts: vec![TextPart {
                text: message.to_string(),
            }],
        });

        let text = self
            .generate(Some(system_instruction), contents, Self::reply_schema())
            .await?;
        Self::parse_reply(&text)
    }

    /// Request the end-of-session report for a flattened transcript.
    pub async fn session_report(&self, transcript: &str) -> Result<SessionReport, UpstreamError> {
        let prompt = format!(
            "Analyze this English learning session. Focus on mistakes made, new words used, \
             and give a score out of 100 for correctness and fluency:\n\n{}",
            transcript
        );
        let contents = vec![Content {
            role: Some("user".to_string()),
            parts: vec![TextPart { text: prompt }],
        }];

        let text = self.generate(None, contents, Self::report_schema()).await?;
        serde_json::from_str(&text)
            .map_err(|e| UpstreamError::Contract(format!("Invalid session report: {}", e)))
    }

    async fn generate(
        &self,
        system_instruction: Option<&str>,
        contents: Vec<Content>,
        response_schema: serde_json::Value,
    ) -> Result<String, UpstreamError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        let request = GenerateContentRequest {
            system_instruction: system_instruction.map(|text| Content {
                role: None,
                parts: vec![TextPart {
                    text: text.to_string(),
                }],
            }),
            contents,
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema,
            },
        };

        debug!(model = %self.model, "Sending completion request");

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status(status.as_u16(), body));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::Contract(format!("Invalid response body: {}", e)))?;

        Self::extract_text(parsed)
    }

    /// Pull the inner JSON text out of the first candidate.
    fn extract_text(response: GenerateContentResponse) -> Result<String, UpstreamError> {
        response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| UpstreamError::Contract("Response contained no candidates".to_string()))
    }

    /// Parse the inner reply document of a chat turn.
    pub fn parse_reply(text: &str) -> Result<StructuredReply, UpstreamError> {
        serde_json::from_str(text)
            .map_err(|e| UpstreamError::Contract(format!("Invalid structured reply: {}", e)))
    }

    /// Response schema for chat turns: `{reply, correction?}`.
    fn reply_schema() -> serde_json::Value {
        json!({
            "type": "OBJECT",
            "properties": {
                "reply": {
                    "type": "STRING",
                    "description": "The natural conversational response to the user."
                },
                "correction": {
                    "type": "OBJECT",
                    "properties": {
                        "original": {
                            "type": "STRING",
                            "description": "The incorrect part of the user's input."
                        },
                        "corrected": {
                            "type": "STRING",
                            "description": "The corrected version."
                        },
                        "explanation": {
                            "type": "STRING",
                            "description": "Brief explanation of why it was wrong."
                        }
                    },
                    "nullable": true
                }
            },
            "required": ["reply"]
        })
    }

    /// Response schema for session reports.
    fn report_schema() -> serde_json::Value {
        json!({
            "type": "OBJECT",
            "properties": {
                "summary": {
                    "type": "STRING",
                    "description": "A detailed but encouraging analysis of the session."
                },
                "mistakes": {
                    "type": "ARRAY",
                    "items": { "type": "STRING" },
                    "description": "Specific patterns of errors found."
                },
                "vocabularyTips": {
                    "type": "ARRAY",
                    "items": { "type": "STRING" },
                    "description": "Tips to improve vocabulary."
                },
                "newWords": {
                    "type": "ARRAY",
                    "items": { "type": "STRING" },
                    "description": "Key new words or phrases learned."
                },
                "score": {
                    "type": "INTEGER",
                    "description": "Overall correctness score (1-100)"
                },
                "fluencyScore": {
                    "type": "INTEGER",
                    "description": "Flow and naturalness score (1-100)"
                }
            },
            "required": ["summary", "mistakes", "vocabularyTips", "newWords", "score", "fluencyScore"]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reply_with_correction() {
        // The contract the stubbed endpoint honors for input "I has a dog":
        // the correction's `original` is a substring of the user's text.
        let input = "I has a dog";
        let stubbed = r#"{
            "reply": "Dogs are the best! What's yours called?",
            "correction": {
                "original": "I has",
                "corrected": "I have",
                "explanation": "Use 'have' with the pronoun 'I'."
            }
        }"#;

        let reply = CompletionClient::parse_reply(stubbed).unwrap();
        let correction = reply.correction.expect("correction should be present");
        assert!(input.contains(&correction.original));
        assert_eq!(correction.corrected, "I have");
    }

    #[test]
    fn test_parse_reply_without_correction() {
        let reply = CompletionClient::parse_reply(r#"{"reply": "Sounds great!"}"#).unwrap();
        assert!(reply.correction.is_none());

        // Explicit null is the schema's way of saying "no mistake found".
        let reply =
            CompletionClient::parse_reply(r#"{"reply": "Nice!", "correction": null}"#).unwrap();
        assert!(reply.correction.is_none());
    }

    #[test]
    fn test_parse_reply_requires_reply_field() {
        assert!(CompletionClient::parse_reply(r#"{"correction": null}"#).is_err());
        assert!(CompletionClient::parse_reply("not json").is_err());
    }

    #[test]
    fn test_extract_text_from_candidates() {
        let body = r#"{
            "candidates": [
                { "content": { "role": "model", "parts": [ { "text": "{\"reply\":\"hi\"}" } ] } }
            ]
        }"#;
        let parsed: GenerateContentResponse = serde_json::from_str(body).unwrap();
        let text = CompletionClient::extract_text(parsed).unwrap();
        assert_eq!(text, "{\"reply\":\"hi\"}");
    }

    #[test]
    fn test_extract_text_empty_candidates() {
        let parsed: GenerateContentResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert!(matches!(
            CompletionClient::extract_text(parsed),
            Err(UpstreamError::Contract(_))
        ));
    }

    #[test]
    fn test_reply_schema_requires_reply() {
        let schema = CompletionClient::reply_schema();
        assert_eq!(schema["required"][0], "reply");
        assert_eq!(schema["properties"]["correction"]["nullable"], true);
    }
}
