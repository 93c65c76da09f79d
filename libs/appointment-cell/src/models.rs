use chrono::{DateTime, Duration, DurationRound, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_models::error::AppError;
use shared_models::time::{self, parse_instant};
use shared_models::{Appointment, AttachedFile, Room, Stored};

/// Appointment form as submitted. Every field is optional on the wire so a
/// missing value becomes a validation error rather than a decoding failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentDraft {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub middle_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub date_time: String,
    #[serde(default)]
    pub room: Option<Room>,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub files: Vec<AttachedFile>,
}

/// A draft that passed validation, whitespace trimmed.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidDraft {
    pub id: Option<String>,
    pub last_name: String,
    pub first_name: String,
    pub middle_name: String,
    pub phone: String,
    pub date_time: DateTime<Utc>,
    pub room: Room,
    pub comment: String,
    pub files: Vec<AttachedFile>,
}

impl AppointmentDraft {
    pub fn validate(self) -> Result<ValidDraft, AppointmentError> {
        let last_name = self.last_name.trim();
        let first_name = self.first_name.trim();
        let phone = self.phone.trim();
        let date_time = self.date_time.trim();

        if last_name.is_empty() || first_name.is_empty() || phone.is_empty() || date_time.is_empty() {
            return Err(AppointmentError::Validation(
                "Last name, first name, phone and date-time are required".to_string(),
            ));
        }

        // Stored with whole seconds, so keep only those.
        let date_time = parse_instant(date_time)
            .map(|instant| instant.duration_trunc(Duration::seconds(1)).unwrap_or(instant))
            .ok_or_else(|| AppointmentError::Validation(format!("Invalid date-time: {}", date_time)))?;
        let room = self
            .room
            .ok_or_else(|| AppointmentError::Validation("Room is required".to_string()))?;

        Ok(ValidDraft {
            id: self.id.map(|id| id.trim().to_string()).filter(|id| !id.is_empty()),
            last_name: last_name.to_string(),
            first_name: first_name.to_string(),
            middle_name: self.middle_name.trim().to_string(),
            phone: phone.to_string(),
            date_time,
            room,
            comment: self.comment.trim().to_string(),
            files: self.files,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveOutcome {
    pub appointment: Stored<Appointment>,
    pub created: bool,
    /// False when the appointment was written but the patient record was not.
    pub patient_synced: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CalendarQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewAppointmentQuery {
    pub at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttachmentQuery {
    pub name: Option<String>,
}

/// Event as handed to the calendar widget.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    #[serde(with = "time::flexible")]
    pub start: DateTime<Utc>,
    #[serde(with = "time::flexible")]
    pub end: DateTime<Utc>,
    pub background_color: String,
    pub border_color: String,
    pub extended_props: Stored<Appointment>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RoomLegend {
    pub room: Room,
    pub color: &'static str,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CalendarSettings {
    pub initial_view: &'static str,
    pub slot_minutes: i64,
    pub slot_min_time: &'static str,
    pub slot_max_time: &'static str,
    /// 0 is Sunday.
    pub business_days: Vec<u8>,
    pub rooms: Vec<RoomLegend>,
}

#[derive(Debug, Error)]
pub enum AppointmentError {
    #[error("{0}")]
    Validation(String),

    #[error("Room {room} is already booked at {start}")]
    Conflict { room: Room, start: String },

    #[error("Only the creator or an administrator may change this appointment")]
    PermissionDenied,

    #[error("Appointment {0} not found")]
    NotFound(String),

    #[error("Invalid attachment: {0}")]
    InvalidAttachment(String),

    #[error("Store error: {0}")]
    Store(String),
}

impl From<AppointmentError> for AppError {
    fn from(e: AppointmentError) -> Self {
        match e {
            AppointmentError::Validation(_) | AppointmentError::InvalidAttachment(_) => {
                AppError::Validation(e.to_string())
            }
            AppointmentError::Conflict { .. } => AppError::Conflict(e.to_string()),
            AppointmentError::PermissionDenied => AppError::Permission(e.to_string()),
            AppointmentError::NotFound(_) => AppError::NotFound(e.to_string()),
            AppointmentError::Store(_) => AppError::RemoteWrite(e.to_string()),
        }
    }
}
