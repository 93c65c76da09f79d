use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{json, Value};

use shared_models::error::AppError;
use sync_cell::ClinicContext;

use crate::models::PatientSearchQuery;
use crate::services::PatientDirectoryService;

pub async fn search_patients(
    State(ctx): State<Arc<ClinicContext>>,
    Query(query): Query<PatientSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let patients = PatientDirectoryService::new(ctx).search(query.search.as_deref());

    Ok(Json(json!({
        "patients": patients,
        "total": patients.len()
    })))
}

pub async fn patient_history(
    State(ctx): State<Arc<ClinicContext>>,
    Path(phone): Path<String>,
) -> Result<Json<Value>, AppError> {
    let history = PatientDirectoryService::new(ctx).history(&phone)?;

    Ok(Json(json!(history)))
}
