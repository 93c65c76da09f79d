use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};

use shared_database::collections;
use shared_models::time::format_instant;
use shared_models::{Appointment, Patient, Stored};
use sync_cell::ClinicContext;

use crate::models::{PatientError, UpsertOutcome};

/// Keeps the patient directory in step with saved appointments, keyed by phone.
pub struct PatientUpsertService {
    ctx: Arc<ClinicContext>,
}

impl PatientUpsertService {
    pub fn new(ctx: Arc<ClinicContext>) -> Self {
        Self { ctx }
    }

    /// Refreshes the patient with the appointment's phone, or creates one.
    ///
    /// The lookup runs against the local mirror and the update overwrites
    /// whatever the store holds, so two desks saving the same phone at once
    /// can still interleave.
    pub async fn upsert(&self, appointment: &Appointment) -> Result<UpsertOutcome, PatientError> {
        let visit = format_instant(appointment.date_time);
        let existing = self
            .ctx
            .patients
            .find(|patient| patient.phone == appointment.phone);

        match existing {
            Some(patient) => {
                debug!("Updating patient {} for {}", patient.id, appointment.phone);
                self.ctx
                    .store
                    .update(
                        collections::PATIENTS,
                        &patient.id,
                        json!({
                            "lastName": appointment.last_name,
                            "firstName": appointment.first_name,
                            "middleName": appointment.middle_name,
                            "lastVisit": visit
                        }),
                    )
                    .await
                    .map_err(|e| PatientError::Store(e.to_string()))?;

                let updated = Stored::new(
                    patient.id.clone(),
                    Patient {
                        last_name: appointment.last_name.clone(),
                        first_name: appointment.first_name.clone(),
                        middle_name: appointment.middle_name.clone(),
                        last_visit: appointment.date_time,
                        ..patient.record
                    },
                );
                self.await_echo(updated).await;

                Ok(UpsertOutcome::Updated(patient.id))
            }
            None => {
                let patient = Patient {
                    last_name: appointment.last_name.clone(),
                    first_name: appointment.first_name.clone(),
                    middle_name: appointment.middle_name.clone(),
                    phone: appointment.phone.clone(),
                    first_visit: appointment.date_time,
                    last_visit: appointment.date_time,
                };

                let id = self
                    .ctx
                    .store
                    .create(collections::PATIENTS, json!(patient))
                    .await
                    .map_err(|e| PatientError::Store(e.to_string()))?;

                info!("New patient {} ({})", id, appointment.phone);
                self.await_echo(Stored::new(id.clone(), patient)).await;

                Ok(UpsertOutcome::Created(id))
            }
        }
    }

    /// Waits for the store to echo the write so the next lookup by phone on
    /// this desk finds it; applies it locally if the echo is late.
    async fn await_echo(&self, written: Stored<Patient>) {
        let visible = self
            .ctx
            .patients
            .wait_for(
                |patients| {
                    patients.iter().any(|p| {
                        p.id == written.id && p.phone == written.phone && p.last_visit == written.last_visit
                    })
                },
                self.ctx.echo_timeout(),
            )
            .await;

        if !visible {
            warn!("Store has not echoed patient {} yet, applying it locally", written.id);
            self.ctx.patients.upsert_local(written);
        }
    }
}
