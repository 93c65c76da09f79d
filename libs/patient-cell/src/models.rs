use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_models::error::AppError;
use shared_models::time;
use shared_models::{Appointment, Patient, Room, Stored};

pub const UNKNOWN_DOCTOR: &str = "Неизвестно";
pub const UNKNOWN_DOCTOR_COLOR: &str = "#666";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatientSearchQuery {
    pub search: Option<String>,
}

/// Which way an upsert went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created(String),
    Updated(String),
}

impl UpsertOutcome {
    pub fn patient_id(&self) -> &str {
        match self {
            UpsertOutcome::Created(id) | UpsertOutcome::Updated(id) => id,
        }
    }
}

/// One past or upcoming appointment as listed in a patient's history.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Visit {
    pub appointment_id: String,
    #[serde(with = "time::flexible")]
    pub date_time: DateTime<Utc>,
    pub room: Room,
    pub doctor_name: String,
    pub doctor_color: String,
    pub comment: String,
    pub file_count: usize,
}

impl From<&Stored<Appointment>> for Visit {
    fn from(appointment: &Stored<Appointment>) -> Self {
        Self {
            appointment_id: appointment.id.clone(),
            date_time: appointment.date_time,
            room: appointment.room,
            doctor_name: non_empty_or(&appointment.doctor_name, UNKNOWN_DOCTOR),
            doctor_color: non_empty_or(&appointment.doctor_color, UNKNOWN_DOCTOR_COLOR),
            comment: appointment.comment.clone(),
            file_count: appointment.files.len(),
        }
    }
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

/// Directory entry: the patient plus their most recent appointment, if any.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientCard {
    #[serde(flatten)]
    pub patient: Stored<Patient>,
    pub full_name: String,
    pub last_appointment: Option<Visit>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientHistory {
    pub phone: String,
    pub patient: Option<Stored<Patient>>,
    pub visits: Vec<Visit>,
}

#[derive(Debug, Error)]
pub enum PatientError {
    #[error("No appointments for {0}")]
    NoHistory(String),

    #[error("Store error: {0}")]
    Store(String),
}

impl From<PatientError> for AppError {
    fn from(e: PatientError) -> Self {
        match e {
            PatientError::NoHistory(_) => AppError::NotFound(e.to_string()),
            PatientError::Store(_) => AppError::RemoteWrite(e.to_string()),
        }
    }
}
