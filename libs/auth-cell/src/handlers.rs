use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    Json,
};
use serde_json::{json, Value};
use tracing::debug;

use shared_models::auth::SessionUser;
use shared_models::error::AppError;
use sync_cell::{CalendarFilter, ClinicContext};

use crate::models::{LoginRequest, SessionResponse};
use crate::services::session::SessionService;

#[axum::debug_handler]
pub async fn login(
    State(ctx): State<Arc<ClinicContext>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    let service = SessionService::new(ctx.clone());

    let user = service.login(request.username.trim(), &request.password).await?;

    Ok(Json(json!({
        "user": user,
        "filter": ctx.session.filter(),
        "message": format!("Добро пожаловать, {}!", user.name)
    })))
}

#[axum::debug_handler]
pub async fn logout(State(ctx): State<Arc<ClinicContext>>) -> Result<Json<Value>, AppError> {
    SessionService::new(ctx).logout()?;
    Ok(Json(json!({ "success": true })))
}

pub async fn get_session(State(ctx): State<Arc<ClinicContext>>) -> Json<SessionResponse> {
    let user = SessionService::new(ctx.clone()).current();

    Json(SessionResponse {
        authenticated: user.is_some(),
        user,
        filter: ctx.session.filter(),
    })
}

#[axum::debug_handler]
pub async fn set_filter(
    State(ctx): State<Arc<ClinicContext>>,
    Extension(user): Extension<SessionUser>,
    Json(filter): Json<CalendarFilter>,
) -> Result<Json<CalendarFilter>, AppError> {
    debug!("{} switched calendar filter to {:?}", user.username, filter);
    ctx.session.set_filter(filter);
    Ok(Json(filter))
}
