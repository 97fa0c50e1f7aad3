//! Profile read endpoint backing the dashboard view.

use crate::{error::AppError, state::AppState};
use actix_web::{web, HttpResponse};
use serde_json::json;

pub async fn get_profile(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let profile = state.profiles.get().ok_or_else(|| {
        AppError::NotFound("No profile found; complete onboarding first".to_string())
    })?;

    let persona = profile.persona.config();
    Ok(HttpResponse::Ok().json(json!({
        "profile": profile,
        "persona": {
            "name": persona.name,
            "description": persona.description
        }
    })))
}
