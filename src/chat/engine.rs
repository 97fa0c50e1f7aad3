//! # Chat Orchestration Engine
//!
//! Assembles the system instruction from the learner profile, forwards each
//! turn (full prior history plus the new message) to the remote completion
//! endpoint, and appends both sides of the exchange to the session log.
//! Failures are logged at the call site and surfaced without retry.

use crate::chat::message::{ChatMessage, SessionReport};
use crate::chat::session::ChatSession;
use crate::profile::model::UserProfile;
use crate::upstream::completion::CompletionClient;
use crate::upstream::UpstreamError;
use std::sync::Arc;
use tracing::{error, info};

/// Base system prompt shared by the text chat and the live voice session.
pub const SYSTEM_PROMPT_BASE: &str = "\
You are an AI English Conversation Companion. Your primary goal is to help the user improve their English.

Core Rules:
1. Engage in natural conversation based on the user's provided persona and level.
2. Monitor the user's input for grammar, spelling, or word choice errors.
3. Provide a natural conversational reply AND, if needed, a gentle correction.
4. Your response must follow a specific JSON structure.";

pub struct ChatEngine {
    client: Arc<CompletionClient>,
}

impl ChatEngine {
    pub fn new(client: Arc<CompletionClient>) -> Self {
        Self { client }
    }

    /// Build the per-profile system instruction for text chat turns.
    pub fn system_instruction(profile: &UserProfile) -> String {
        let persona = profile.persona.config();
        format!(
            "{base}\n\
             Persona: {persona}\n\
             Level: {level}\n\
             User Name: {name}\n\
             User Goal: {goals}\n\n\
             Guidelines:\n\
             - Respond naturally as the persona.\n\
             - If the user makes a mistake, pinpoint the exact phrase and provide a brief correction.\n\
             - Adapt your vocabulary to the user's level.",
            base = SYSTEM_PROMPT_BASE,
            persona = persona.instruction,
            level = profile.level.instruction(),
            name = profile.name,
            goals = profile.goals_joined(),
        )
    }

    /// Build the system instruction for a live voice session.
    pub fn live_instruction(profile: &UserProfile) -> String {
        let persona = profile.persona.config();
        format!(
            "{base}\n\
             Personality: {persona}\n\
             User Name: {name}\n\
             Level: {level}\n\
             Goals: {goals}\n\
             Speak naturally, be funny and familiar, and keep the conversation flowing.",
            base = SYSTEM_PROMPT_BASE,
            persona = persona.instruction,
            name = profile.name,
            level = profile.level.as_str(),
            goals = profile.goals_joined(),
        )
    }

    /// Issue the opening greeting for a fresh session.
    ///
    /// Fires only when the log is empty, so repeated calls cannot duplicate
    /// the greeting; a non-empty log returns `None` without touching the
    /// upstream endpoint.
    pub async fn greet(
        &self,
        profile: &UserProfile,
        session: &ChatSession,
    ) -> Result<Option<ChatMessage>, UpstreamError> {
        if !session.is_empty() {
            return Ok(None);
        }

        let instruction = format!(
            "Initiate conversation. Welcome {} to our session with your funny and friendly personality.",
            profile.name
        );
        let reply = self
            .client
            .chat_reply(&Self::system_instruction(profile), &[], &instruction)
            .await?;

        let message = ChatMessage::model(reply.reply, None);
        if let Err(e) = session.append(message.clone()) {
            error!("Failed to record greeting: {}", e);
        }

        info!(session_id = %session.session_id, "Greeting issued");
        Ok(Some(message))
    }

    /// Handle one user turn: append the user message, request a structured
    /// reply over the full history, append and return both log entries.
    ///
    /// On upstream failure the user message stays in the log and the error is
    /// returned without retry.
    pub async fn send_message(
        &self,
        profile: &UserProfile,
        session: &ChatSession,
        text: &str,
    ) -> Result<Vec<ChatMessage>, UpstreamError> {
        let history = session.history();
        let user_message = ChatMessage::user(text);
        if let Err(e) = session.append(user_message.clone()) {
            error!("Failed to record user message: {}", e);
        }

        let reply = match self
            .client
            .chat_reply(&Self::system_instruction(profile), &history, text)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                error!(session_id = %session.session_id, "Chat completion failed: {}", e);
                return Err(e);
            }
        };

        let model_message = ChatMessage::model(reply.reply, reply.correction);
        if let Err(e) = session.append(model_message.clone()) {
            error!("Failed to record model reply: {}", e);
        }

        Ok(vec![user_message, model_message])
    }

    /// Produce the end-of-session report from the full transcript.
    pub async fn summarize(&self, session: &ChatSession) -> Result<SessionReport, UpstreamError> {
        let transcript = Self::flatten_transcript(&session.history());
        self.client.session_report(&transcript).await
    }

    /// Flatten a message log into `ROLE: text` lines for analysis.
    pub fn flatten_transcript(history: &[ChatMessage]) -> String {
        history
            .iter()
            .map(|m| format!("{}: {}", m.role.transcript_tag(), m.text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
