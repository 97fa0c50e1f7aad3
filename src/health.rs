use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::json;

pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let metrics = state.get_metrics_snapshot();
    let config = state.get_config();
    let uptime_seconds = state.get_uptime_seconds();

    let call_usage = if config.performance.max_chat_sessions > 0 {
        state.chat_sessions.active_session_count() as f64
            / config.performance.max_chat_sessions as f64
    } else {
        0.0
    };

    let load_status = if call_usage > 0.9 {
        "high_load"
    } else if call_usage > 0.7 {
        "moderate_load"
    } else {
        "normal"
    };

    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_seconds,
        "service": {
            "name": "fluentify-backend",
            "version": env!("CARGO_PKG_VERSION"),
            "host": config.server.host,
            "port": config.server.port
        },
        "metrics": {
            "total_requests": metrics.request_count,
            "total_errors": metrics.error_count,
            "error_rate": if metrics.request_count > 0 {
                metrics.error_count as f64 / metrics.request_count as f64
            } else {
                0.0
            },
            "active_live_calls": metrics.active_live_calls
        },
        "upstream": {
            "chat_model": config.upstream.chat_model,
            "live_model": config.upstream.live_model,
            "voice": config.upstream.voice,
            "api_key_configured": !config.upstream.api_key.is_empty()
        },
        "sessions": {
            "status": load_status,
            "onboarded": state.profiles.is_onboarded(),
            "active_chat_sessions": state.chat_sessions.active_session_count(),
            "max_chat_sessions": config.performance.max_chat_sessions,
            "active_onboarding_drafts": state.onboarding.active_draft_count()
        }
    }))
}

pub async fn detailed_metrics(state: web::Data<AppState>) -> HttpResponse {
    let metrics = state.get_metrics_snapshot();
    let uptime_seconds = state.get_uptime_seconds();

    let mut endpoint_stats = Vec::new();
    for (endpoint, metric) in metrics.endpoint_metrics.iter() {
        endpoint_stats.push(json!({
            "endpoint": endpoint,
            "request_count": metric.request_count,
            "error_count": metric.error_count,
            "error_rate": metric.error_rate(),
            "average_duration_ms": metric.average_duration_ms(),
            "total_duration_ms": metric.total_duration_ms
        }));
    }

    HttpResponse::Ok().json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_seconds,
        "overall": {
            "total_requests": metrics.request_count,
            "total_errors": metrics.error_count,
            "error_rate": if metrics.request_count > 0 {
                metrics.error_count as f64 / metrics.request_count as f64
            } else {
                0.0
            },
            "active_live_calls": metrics.active_live_calls,
            "live_turns_completed": metrics.live_turns_completed,
            "requests_per_second": if uptime_seconds > 0 {
                metrics.request_count as f64 / uptime_seconds as f64
            } else {
                0.0
            }
        },
        "endpoints": endpoint_stats,
        "capacity": {
            "max_chat_sessions": state.get_config().performance.max_chat_sessions,
            "max_onboarding_drafts": state.get_config().performance.max_onboarding_drafts
        }
    }))
}
