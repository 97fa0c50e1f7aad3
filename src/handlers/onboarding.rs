//! Handlers driving the 3-step onboarding wizard over REST.

use crate::onboarding::OnboardingWizard;
use crate::profile::model::{EnglishLevel, LearningGoal};
use crate::{error::AppError, state::AppState};
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct NameRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct LevelRequest {
    pub level: EnglishLevel,
}

#[derive(Debug, Deserialize)]
pub struct GoalRequest {
    pub goal: LearningGoal,
}

fn draft_body(wizard: &OnboardingWizard) -> serde_json::Value {
    json!({
        "draft_id": wizard.draft_id,
        "step": wizard.step().as_str(),
        "name": wizard.name(),
        "level": wizard.level(),
        "goals": wizard.goals()
    })
}

fn draft_error(message: String) -> AppError {
    if message.starts_with("Unknown onboarding draft") {
        AppError::NotFound(message)
    } else {
        AppError::ValidationError(message)
    }
}

/// The choices the wizard steps render: levels with their card descriptions
/// and the selectable goal tags.
pub async fn onboarding_options() -> HttpResponse {
    let levels: Vec<_> = EnglishLevel::ALL
        .iter()
        .map(|level| {
            json!({
                "value": level,
                "description": level.description()
            })
        })
        .collect();
    let goals: Vec<_> = LearningGoal::ALL.to_vec();

    HttpResponse::Ok().json(json!({
        "levels": levels,
        "goals": goals
    }))
}

pub async fn begin_onboarding(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let wizard = state.onboarding.begin().map_err(AppError::BadRequest)?;
    info!(draft_id = %wizard.draft_id, "Onboarding started");
    Ok(HttpResponse::Created().json(draft_body(&wizard)))
}

pub async fn set_name(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<NameRequest>,
) -> Result<HttpResponse, AppError> {
    let wizard = state
        .onboarding
        .update(&path, |w| w.set_name(&body.name))
        .map_err(draft_error)?;
    Ok(HttpResponse::Ok().json(draft_body(&wizard)))
}

pub async fn set_level(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<LevelRequest>,
) -> Result<HttpResponse, AppError> {
    let wizard = state
        .onboarding
        .update(&path, |w| w.set_level(body.level))
        .map_err(draft_error)?;
    Ok(HttpResponse::Ok().json(draft_body(&wizard)))
}

pub async fn toggle_goal(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<GoalRequest>,
) -> Result<HttpResponse, AppError> {
    let wizard = state
        .onboarding
        .update(&path, |w| w.toggle_goal(body.goal))
        .map_err(draft_error)?;
    Ok(HttpResponse::Ok().json(draft_body(&wizard)))
}

pub async fn step_back(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let wizard = state
        .onboarding
        .update(&path, |w| w.back())
        .map_err(draft_error)?;
    Ok(HttpResponse::Ok().json(draft_body(&wizard)))
}

/// Validate the draft, persist the finished profile, and return it.
pub async fn complete_onboarding(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let profile = state.onboarding.complete(&path).map_err(draft_error)?;
    state.profiles.save(&profile).map_err(AppError::Internal)?;

    info!(name = %profile.name, level = %profile.level, "Onboarding completed");
    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "profile": profile
    })))
}
