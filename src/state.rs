//! # Application State Management
//!
//! Shared state handed to every HTTP request handler and WebSocket actor:
//! the runtime-updatable configuration, request metrics, and the handles to
//! the profile store, onboarding drafts, chat sessions, and the upstream
//! completion client. All mutable pieces sit behind `Arc<RwLock<..>>` so
//! concurrent requests can read without blocking each other.

use crate::chat::engine::ChatEngine;
use crate::chat::session::ChatSessionManager;
use crate::config::AppConfig;
use crate::onboarding::OnboardingManager;
use crate::profile::store::ProfileStore;
use crate::upstream::completion::CompletionClient;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

#[derive(Clone)]
pub struct AppState {
    /// Application configuration (can be updated at runtime)
    pub config: Arc<RwLock<AppConfig>>,

    /// Request/session metrics
    pub metrics: Arc<RwLock<AppMetrics>>,

    /// When the server started
    pub start_time: Instant,

    /// Persisted learner profile
    pub profiles: Arc<ProfileStore>,

    /// In-flight onboarding drafts
    pub onboarding: Arc<OnboardingManager>,

    /// Active conversation sessions
    pub chat_sessions: Arc<ChatSessionManager>,

    /// Orchestration against the upstream completion endpoint
    pub chat_engine: Arc<ChatEngine>,
}

/// Counters collected across all requests and live calls.
#[derive(Debug, Default)]
pub struct AppMetrics {
    /// Total HTTP requests processed since start
    pub request_count: u64,

    /// Total errored requests since start
    pub error_count: u64,

    /// Currently open live voice calls
    pub active_live_calls: u32,

    /// Completed live voice turns since start
    pub live_turns_completed: u64,

    /// Per-endpoint statistics, keyed by "METHOD /path"
    pub endpoint_metrics: HashMap<String, EndpointMetric>,
}

/// Statistics for one endpoint.
#[derive(Debug, Default, Clone)]
pub struct EndpointMetric {
    pub request_count: u64,
    pub total_duration_ms: u64,
    pub error_count: u64,
}

impl AppState {
    /// Build the shared state from a validated configuration.
    ///
    /// Loads the persisted profile (if any) and constructs the upstream
    /// completion client; a client build failure is a startup error.
    pub fn new(config: AppConfig) -> Result<Self> {
        let completion_client = CompletionClient::new(&config.upstream)
            .map_err(|e| anyhow::anyhow!("Failed to build completion client: {}", e))?;

        let profiles = Arc::new(ProfileStore::open(&config.storage.profile_path));
        let onboarding = Arc::new(OnboardingManager::new(
            config.performance.max_onboarding_drafts,
        ));
        let chat_sessions = Arc::new(ChatSessionManager::new(
            config.performance.max_chat_sessions,
        ));
        let chat_engine = Arc::new(ChatEngine::new(Arc::new(completion_client)));

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            metrics: Arc::new(RwLock::new(AppMetrics::default())),
            start_time: Instant::now(),
            profiles,
            onboarding,
            chat_sessions,
            chat_engine,
        })
    }

    /// Get a copy of the current configuration.
    pub fn get_config(&self) -> AppConfig {
        self.config.read().unwrap().clone()
    }

    /// Replace the configuration after validation.
    pub fn update_config(&self, new_config: AppConfig) -> Result<(), String> {
        match new_config.validate() {
            Ok(_) => {
                *self.config.write().unwrap() = new_config;
                Ok(())
            }
            Err(e) => Err(e.to_string()),
        }
    }

    pub fn increment_request_count(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.request_count += 1;
    }

    pub fn increment_error_count(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.error_count += 1;
    }

    /// Record one finished request against its endpoint bucket.
    pub fn record_endpoint_request(&self, endpoint: &str, duration_ms: u64, is_error: bool) {
        let mut metrics = self.metrics.write().unwrap();
        let endpoint_metric = metrics
            .endpoint_metrics
            .entry(endpoint.to_string())
            .or_default();

        endpoint_metric.request_count += 1;
        endpoint_metric.total_duration_ms += duration_ms;
        if is_error {
            endpoint_metric.error_count += 1;
        }
    }

    pub fn increment_active_calls(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.active_live_calls += 1;
    }

    pub fn decrement_active_calls(&self) {
        let mut metrics = self.metrics.write().unwrap();
        if metrics.active_live_calls > 0 {
            metrics.active_live_calls -= 1;
        }
    }

    pub fn record_turn_completed(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.live_turns_completed += 1;
    }

    /// Consistent snapshot for the metrics endpoint.
    pub fn get_metrics_snapshot(&self) -> AppMetrics {
        let metrics = self.metrics.read().unwrap();
        AppMetrics {
            request_count: metrics.request_count,
            error_count: metrics.error_count,
            active_live_calls: metrics.active_live_calls,
            live_turns_completed: metrics.live_turns_completed,
            endpoint_metrics: metrics.endpoint_metrics.clone(),
        }
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl EndpointMetric {
    pub fn average_duration_ms(&self) -> f64 {
        if self.request_count > 0 {
            self.total_duration_ms as f64 / self.request_count as f64
        } else {
            0.0
        }
    }

    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_state() -> AppState {
        let mut config = AppConfig::default();
        config.storage.profile_path = std::env::temp_dir()
            .join(format!("fluentify-state-{}", uuid::Uuid::new_v4()))
            .join("profile.json")
            .to_string_lossy()
            .into_owned();
        AppState::new(config).unwrap()
    }

    #[test]
    fn test_metrics_counters() {
        let state = test_state();
        state.increment_request_count();
        state.increment_request_count();
        state.increment_error_count();
        state.record_turn_completed();

        let snapshot = state.get_metrics_snapshot();
        assert_eq!(snapshot.request_count, 2);
        assert_eq!(snapshot.error_count, 1);
        assert_eq!(snapshot.live_turns_completed, 1);
    }

    #[test]
    fn test_active_calls_never_underflow() {
        let state = test_state();
        state.decrement_active_calls();
        assert_eq!(state.get_metrics_snapshot().active_live_calls, 0);

        state.increment_active_calls();
        state.decrement_active_calls();
        assert_eq!(state.get_metrics_snapshot().active_live_calls, 0);
    }

    #[test]
    fn test_endpoint_metrics_accumulate() {
        let state = test_state();
        state.record_endpoint_request("POST /api/v1/sessions", 100, false);
        state.record_endpoint_request("POST /api/v1/sessions", 300, true);

        let snapshot = state.get_metrics_snapshot();
        let metric = &snapshot.endpoint_metrics["POST /api/v1/sessions"];
        assert_eq!(metric.request_count, 2);
        assert_eq!(metric.average_duration_ms(), 200.0);
        assert_eq!(metric.error_rate(), 0.5);
    }

    #[test]
    fn test_update_config_validates() {
        let state = test_state();
        let mut bad = state.get_config();
        bad.server.port = 0;
        assert!(state.update_config(bad).is_err());

        let mut good = state.get_config();
        good.upstream.voice = "Puck".to_string();
        assert!(state.update_config(good).is_ok());
        assert_eq!(state.get_config().upstream.voice, "Puck");
    }
}
