//! # Fluentify Backend - Main Application Entry Point
//!
//! HTTP + WebSocket backend for the Fluentify language-learning companion.
//! The browser client is a thin rendering layer; everything stateful lives
//! here:
//!
//! ## Application Architecture:
//! - **config**: layered configuration (TOML file + environment variables)
//! - **state**: shared application state, metrics, and service handles
//! - **profile**: the persisted learner profile and its single-file store
//! - **onboarding**: the 3-step wizard producing a profile
//! - **chat**: conversation sessions and orchestration against the remote
//!   completion endpoint
//! - **upstream**: clients for the hosted AI endpoints (completion + live
//!   voice)
//! - **audio / live**: PCM plumbing and the live-call state (playback
//!   scheduling, transcript accumulation)
//! - **websocket**: the browser-facing live voice bridge at `/ws/live`
//! - **handlers / middleware / health / error**: the REST surface and its
//!   ambient plumbing

mod audio;
mod chat;
mod config;
mod error;
mod handlers;
mod health;
mod live;
mod middleware;
mod onboarding;
mod profile;
mod state;
mod upstream;
mod websocket;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::Result;
use config::AppConfig;
use state::AppState;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, warn};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Global shutdown flag set by the signal handler task.
static SHUTDOWN_SIGNAL: AtomicBool = AtomicBool::new(false);

#[actix_web::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    init_tracing()?;

    let config = AppConfig::load()?;
    config.validate()?;

    info!("Starting fluentify-backend v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration loaded: {}:{}",
        config.server.host, config.server.port
    );

    if config.upstream.api_key.is_empty() {
        warn!("No upstream API key configured; AI calls will fail until GEMINI_API_KEY is set");
    }

    let app_state = AppState::new(config.clone())?;
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    setup_signal_handlers();

    info!("Starting HTTP server on {}", bind_addr);

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(cors)
            .wrap(TracingLogger::default())
            .wrap(middleware::RequestMetrics)
            .wrap(middleware::RequestLog)
            .service(
                web::scope("/api/v1")
                    .route("/health", web::get().to(health::health_check))
                    .route("/metrics", web::get().to(health::detailed_metrics))
                    .route("/config", web::get().to(handlers::get_config))
                    .route("/config", web::put().to(handlers::update_config))
                    .route("/profile", web::get().to(handlers::get_profile))
                    .route("/onboarding/options", web::get().to(handlers::onboarding_options))
                    .route("/onboarding", web::post().to(handlers::begin_onboarding))
                    .route("/onboarding/{draft_id}/name", web::post().to(handlers::set_name))
                    .route("/onboarding/{draft_id}/level", web::post().to(handlers::set_level))
                    .route("/onboarding/{draft_id}/goals", web::post().to(handlers::toggle_goal))
                    .route("/onboarding/{draft_id}/back", web::post().to(handlers::step_back))
                    .route(
                        "/onboarding/{draft_id}/complete",
                        web::post().to(handlers::complete_onboarding),
                    )
                    .route("/sessions", web::post().to(handlers::create_session))
                    .route(
                        "/sessions/{session_id}/messages",
                        web::get().to(handlers::get_messages),
                    )
                    .route(
                        "/sessions/{session_id}/messages",
                        web::post().to(handlers::send_message),
                    )
                    .route(
                        "/sessions/{session_id}/restart",
                        web::post().to(handlers::restart_session),
                    )
                    .route(
                        "/sessions/{session_id}/summary",
                        web::post().to(handlers::session_summary),
                    )
                    .route(
                        "/sessions/{session_id}",
                        web::delete().to(handlers::end_session),
                    ),
            )
            .route("/ws/live", web::get().to(websocket::live_websocket))
            .route("/health", web::get().to(health::health_check))
    })
    .bind(&bind_addr)?
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    tokio::select! {
        result = server_task => {
            match result {
                Ok(server_result) => {
                    if let Err(e) = server_result {
                        error!("Server error: {}", e);
                    }
                }
                Err(e) => {
                    error!("Server task error: {}", e);
                }
            }
        }
        _ = wait_for_shutdown() => {
            info!("Shutdown signal received, stopping server...");
            server_handle.stop(true).await;
        }
    }

    info!("Server stopped gracefully");
    Ok(())
}

fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fluentify_backend=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

/// Install SIGTERM/SIGINT handlers that flip the shutdown flag.
fn setup_signal_handlers() {
    tokio::spawn(async {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler");
        let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
            .expect("Failed to install SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }

        SHUTDOWN_SIGNAL.store(true, Ordering::SeqCst);
    });
}

async fn wait_for_shutdown() {
    while !SHUTDOWN_SIGNAL.load(Ordering::SeqCst) {
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    }
}
