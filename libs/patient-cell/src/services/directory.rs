use std::cmp::Reverse;
use std::sync::Arc;

use tracing::debug;

use shared_models::{Appointment, Stored};
use sync_cell::ClinicContext;

use crate::models::{PatientCard, PatientError, PatientHistory, Visit};

pub struct PatientDirectoryService {
    ctx: Arc<ClinicContext>,
}

impl PatientDirectoryService {
    pub fn new(ctx: Arc<ClinicContext>) -> Self {
        Self { ctx }
    }

    /// Patients whose last or first name contains `query` (any case) or whose
    /// phone contains it verbatim, ordered by last name.
    pub fn search(&self, query: Option<&str>) -> Vec<PatientCard> {
        let query = query.map(str::trim).filter(|q| !q.is_empty());
        let lower = query.map(str::to_lowercase);

        let mut patients: Vec<_> = self.ctx.patients.read(|patients| {
            patients
                .iter()
                .filter(|patient| match (query, lower.as_deref()) {
                    (Some(raw), Some(lower)) => {
                        patient.last_name.to_lowercase().contains(lower)
                            || patient.first_name.to_lowercase().contains(lower)
                            || patient.phone.contains(raw)
                    }
                    _ => true,
                })
                .cloned()
                .collect()
        });
        patients.sort_by_cached_key(|patient| sort_key(&patient.last_name));

        debug!("Patient search {:?} matched {}", query, patients.len());

        self.ctx.appointments.read(|appointments| {
            patients
                .into_iter()
                .map(|patient| {
                    let last_appointment = visits_for(appointments, &patient.phone)
                        .first()
                        .map(|latest| Visit::from(*latest));
                    PatientCard {
                        full_name: patient.full_name(),
                        patient,
                        last_appointment,
                    }
                })
                .collect()
        })
    }

    /// Every appointment booked for `phone`, newest first.
    pub fn history(&self, phone: &str) -> Result<PatientHistory, PatientError> {
        let visits: Vec<Visit> = self.ctx.appointments.read(|appointments| {
            visits_for(appointments, phone).into_iter().map(Visit::from).collect()
        });

        if visits.is_empty() {
            return Err(PatientError::NoHistory(phone.to_string()));
        }

        Ok(PatientHistory {
            phone: phone.to_string(),
            patient: self.ctx.patients.find(|patient| patient.phone == phone),
            visits,
        })
    }
}

/// Case-folded last name with ё read as е, so Ёлкин files between Елагин and Жуков.
fn sort_key(last_name: &str) -> String {
    last_name.to_lowercase().replace('ё', "е")
}

fn visits_for<'a>(appointments: &'a [Stored<Appointment>], phone: &str) -> Vec<&'a Stored<Appointment>> {
    let mut matching: Vec<_> = appointments
        .iter()
        .filter(|appointment| appointment.phone == phone)
        .collect();
    matching.sort_by_key(|appointment| Reverse(appointment.date_time));
    matching
}
