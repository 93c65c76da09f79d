use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Extension, Path, Query, State},
    http::{header, HeaderMap},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};

use shared_models::auth::SessionUser;
use shared_models::error::AppError;
use shared_models::time::{format_instant, parse_instant};
use sync_cell::ClinicContext;

use crate::models::{AppointmentDraft, AttachmentQuery, CalendarQuery, CalendarSettings, NewAppointmentQuery};
use crate::services::attachments::attach_file;
use crate::services::booking::{next_slot_start, AppointmentBookingService};
use crate::services::calendar::{project, CalendarWindow};

fn parse_bound(raw: Option<&str>, name: &str) -> Result<Option<chrono::DateTime<Utc>>, AppError> {
    match raw.map(str::trim).filter(|raw| !raw.is_empty()) {
        Some(raw) => parse_instant(raw)
            .map(Some)
            .ok_or_else(|| AppError::Validation(format!("Invalid {} date-time: {}", name, raw))),
        None => Ok(None),
    }
}

pub async fn get_calendar(
    State(ctx): State<Arc<ClinicContext>>,
    Extension(user): Extension<SessionUser>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<Value>, AppError> {
    let window = CalendarWindow {
        from: parse_bound(query.from.as_deref(), "from")?,
        to: parse_bound(query.to.as_deref(), "to")?,
    };
    let filter = ctx.session.filter();

    let events = ctx
        .appointments
        .read(|appointments| project(appointments, &user, filter, window));

    Ok(Json(json!({
        "events": events,
        "filter": filter,
        "total": events.len()
    })))
}

pub async fn get_calendar_settings() -> Json<CalendarSettings> {
    Json(CalendarSettings::default())
}

/// Blank form for a new appointment.
pub async fn new_appointment(
    Query(query): Query<NewAppointmentQuery>,
) -> Result<Json<Value>, AppError> {
    let start = match parse_bound(query.at.as_deref(), "at")? {
        Some(selected) => selected,
        None => next_slot_start(Utc::now()),
    };

    Ok(Json(json!({
        "dateTime": format_instant(start),
        "room": "1",
        "files": []
    })))
}

#[axum::debug_handler]
pub async fn create_appointment(
    State(ctx): State<Arc<ClinicContext>>,
    Extension(user): Extension<SessionUser>,
    Json(mut draft): Json<AppointmentDraft>,
) -> Result<Json<Value>, AppError> {
    draft.id = None;
    let outcome = AppointmentBookingService::new(ctx).save(&user, draft).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": outcome.appointment,
        "created": outcome.created,
        "patientSynced": outcome.patient_synced,
        "message": "Запись сохранена"
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(ctx): State<Arc<ClinicContext>>,
    Extension(user): Extension<SessionUser>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let appointment = AppointmentBookingService::new(ctx).open_for_edit(&user, &appointment_id)?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(ctx): State<Arc<ClinicContext>>,
    Extension(user): Extension<SessionUser>,
    Path(appointment_id): Path<String>,
    Json(mut draft): Json<AppointmentDraft>,
) -> Result<Json<Value>, AppError> {
    draft.id = Some(appointment_id);
    let outcome = AppointmentBookingService::new(ctx).save(&user, draft).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": outcome.appointment,
        "created": outcome.created,
        "patientSynced": outcome.patient_synced,
        "message": "Запись сохранена"
    })))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(ctx): State<Arc<ClinicContext>>,
    Extension(user): Extension<SessionUser>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    AppointmentBookingService::new(ctx).delete(&user, &appointment_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Запись удалена"
    })))
}

/// Encodes an uploaded file for inclusion in an appointment's `files`.
pub async fn upload_attachment(
    Query(query): Query<AttachmentQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let name = query
        .name
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| AppError::Validation("File name is required".to_string()))?;
    let mime_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    Ok(Json(json!(attach_file(&name, mime_type, &body))))
}
