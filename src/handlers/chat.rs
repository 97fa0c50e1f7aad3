//! Handlers for the text conversation: session lifecycle, message turns, and
//! the end-of-session report.

use crate::{error::AppError, state::AppState};
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
}

/// Start a conversation session.
///
/// Requires a completed onboarding. The opening greeting fires here, on the
/// one transition where the log is empty, so re-fetching the session later can
/// never issue a second greeting. A failed greeting degrades to an empty log
/// rather than failing session creation.
pub async fn create_session(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let profile = state.profiles.get().ok_or_else(|| {
        AppError::BadRequest("Complete onboarding before starting a session".to_string())
    })?;

    let session = state
        .chat_sessions
        .create_session(None)
        .map_err(AppError::BadRequest)?;

    let messages = match state.chat_engine.greet(&profile, &session).await {
        Ok(Some(greeting)) => vec![greeting],
        Ok(None) => Vec::new(),
        Err(e) => {
            error!(session_id = %session.session_id, "Greeting failed: {}", e);
            Vec::new()
        }
    };

    info!(session_id = %session.session_id, "Chat session created");
    Ok(HttpResponse::Created().json(json!({
        "session_id": session.session_id,
        "messages": messages
    })))
}

pub async fn get_messages(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let session = state
        .chat_sessions
        .get_session(&path)
        .ok_or_else(|| AppError::NotFound(format!("Unknown session '{}'", path)))?;

    Ok(HttpResponse::Ok().json(json!({
        "session_id": session.session_id,
        "messages": session.history()
    })))
}

/// One user turn: forwards the full history plus the new message upstream and
/// returns both new log entries (user message, structured model reply).
pub async fn send_message(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<SendMessageRequest>,
) -> Result<HttpResponse, AppError> {
    let text = body.text.trim();
    if text.is_empty() {
        return Err(AppError::ValidationError("Message cannot be empty".to_string()));
    }

    let profile = state.profiles.get().ok_or_else(|| {
        AppError::BadRequest("Complete onboarding before chatting".to_string())
    })?;

    let session = state
        .chat_sessions
        .get_session(&path)
        .ok_or_else(|| AppError::NotFound(format!("Unknown session '{}'", path)))?;

    let messages = state
        .chat_engine
        .send_message(&profile, &session, text)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "session_id": session.session_id,
        "messages": messages
    })))
}

/// Clear the message log for a fresh run. The profile is untouched.
pub async fn restart_session(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let session = state
        .chat_sessions
        .get_session(&path)
        .ok_or_else(|| AppError::NotFound(format!("Unknown session '{}'", path)))?;

    session.restart();
    info!(session_id = %session.session_id, "Session restarted");

    Ok(HttpResponse::Ok().json(json!({
        "session_id": session.session_id,
        "messages": session.history()
    })))
}

/// Produce the end-of-session report from the full transcript. A failed
/// analysis call propagates as an upstream error; nothing is persisted.
pub async fn session_summary(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let session = state
        .chat_sessions
        .get_session(&path)
        .ok_or_else(|| AppError::NotFound(format!("Unknown session '{}'", path)))?;

    if session.is_empty() {
        return Err(AppError::BadRequest(
            "Cannot summarize an empty session".to_string(),
        ));
    }

    let report = state.chat_engine.summarize(&session).await?;

    Ok(HttpResponse::Ok().json(json!({
        "session_id": session.session_id,
        "report": report
    })))
}

pub async fn end_session(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    if !state.chat_sessions.remove_session(&path) {
        return Err(AppError::NotFound(format!("Unknown session '{}'", path)));
    }

    info!(session_id = %path.as_str(), "Session ended");
    Ok(HttpResponse::Ok().json(json!({
        "status": "success"
    })))
}
