use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde_json::{json, Value};

use shared_models::auth::SessionUser;
use shared_models::error::AppError;
use sync_cell::ClinicContext;

use crate::models::AddDoctorRequest;
use crate::services::DoctorRosterService;

pub async fn list_doctors(
    State(ctx): State<Arc<ClinicContext>>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<Value>, AppError> {
    let doctors = DoctorRosterService::new(ctx).list(&user)?;

    Ok(Json(json!({
        "doctors": doctors,
        "total": doctors.len()
    })))
}

#[axum::debug_handler]
pub async fn add_doctor(
    State(ctx): State<Arc<ClinicContext>>,
    Extension(user): Extension<SessionUser>,
    Json(request): Json<AddDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    let doctor = DoctorRosterService::new(ctx).add(&user, request).await?;

    Ok(Json(json!({
        "success": true,
        "doctor": doctor,
        "message": "Врач добавлен"
    })))
}

#[axum::debug_handler]
pub async fn remove_doctor(
    State(ctx): State<Arc<ClinicContext>>,
    Extension(user): Extension<SessionUser>,
    Path(login): Path<String>,
) -> Result<Json<Value>, AppError> {
    DoctorRosterService::new(ctx).remove(&user, &login).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Врач удалён"
    })))
}
