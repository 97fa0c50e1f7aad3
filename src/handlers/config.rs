use crate::{error::AppError, state::AppState};
use actix_web::{web, HttpResponse};
use serde_json::json;

/// Render the runtime-visible configuration. The API key is reported only as
/// present/absent, never echoed.
fn config_body(config: &crate::config::AppConfig) -> serde_json::Value {
    json!({
        "server": {
            "host": config.server.host,
            "port": config.server.port
        },
        "upstream": {
            "base_url": config.upstream.base_url,
            "ws_url": config.upstream.ws_url,
            "chat_model": config.upstream.chat_model,
            "live_model": config.upstream.live_model,
            "voice": config.upstream.voice,
            "request_timeout_secs": config.upstream.request_timeout_secs,
            "api_key_configured": !config.upstream.api_key.is_empty()
        },
        "audio": {
            "input_sample_rate": config.audio.input_sample_rate,
            "output_sample_rate": config.audio.output_sample_rate,
            "channels": config.audio.channels,
            "bit_depth": config.audio.bit_depth,
            "max_frame_bytes": config.audio.max_frame_bytes
        },
        "performance": {
            "max_chat_sessions": config.performance.max_chat_sessions,
            "max_onboarding_drafts": config.performance.max_onboarding_drafts,
            "transcript_window": config.performance.transcript_window
        }
    })
}

pub async fn get_config(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let config = state.get_config();

    Ok(HttpResponse::Ok().json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "config": config_body(&config)
    })))
}

pub async fn update_config(
    state: web::Data<AppState>,
    body: web::Json<serde_json::Value>,
) -> Result<HttpResponse, AppError> {
    let json_str = serde_json::to_string(&body.into_inner())?;

    let mut current_config = state.get_config();
    current_config.update_from_json(&json_str)?;

    state
        .update_config(current_config.clone())
        .map_err(AppError::ValidationError)?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "message": "Configuration updated successfully",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "updated_config": config_body(&current_config)
    })))
}
