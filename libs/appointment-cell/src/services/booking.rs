use std::sync::Arc;

use chrono::{DateTime, Duration, DurationRound, Timelike, Utc};
use serde_json::json;
use tracing::{debug, error, info, warn};

use patient_cell::PatientUpsertService;
use shared_database::collections;
use shared_models::auth::SessionUser;
use shared_models::time::{format_instant, SLOT_MINUTES};
use shared_models::{Appointment, Stored};
use sync_cell::ClinicContext;

use crate::models::{AppointmentDraft, AppointmentError, SaveOutcome, ValidDraft};
use crate::services::conflict::has_overlap;

/// Admins may edit anything; doctors only what they booked themselves.
pub fn can_edit(user: &SessionUser, appointment: &Appointment) -> bool {
    user.is_admin() || appointment.created_by == user.username
}

/// Default start for a new appointment: `now` moved up to the next slot
/// boundary, seconds dropped.
pub fn next_slot_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let minute_start = now
        .duration_trunc(Duration::minutes(1))
        .unwrap_or(now);
    let minute = i64::from(minute_start.minute());
    let rounded = (minute + SLOT_MINUTES - 1) / SLOT_MINUTES * SLOT_MINUTES;
    minute_start + Duration::minutes(rounded - minute)
}

pub struct AppointmentBookingService {
    ctx: Arc<ClinicContext>,
}

impl AppointmentBookingService {
    pub fn new(ctx: Arc<ClinicContext>) -> Self {
        Self { ctx }
    }

    /// Creates or updates an appointment, then brings the patient directory up to date.
    pub async fn save(&self, user: &SessionUser, draft: AppointmentDraft) -> Result<SaveOutcome, AppointmentError> {
        let draft = draft.validate()?;

        // Check and write under one gate so two saves on this desk cannot
        // both pass the overlap check.
        let _gate = self.ctx.lock_writes().await;

        let existing = match draft.id.as_deref() {
            Some(id) => {
                let existing = self
                    .ctx
                    .appointments
                    .get(id)
                    .ok_or_else(|| AppointmentError::NotFound(id.to_string()))?;
                self.ensure_editable(user, &existing)?;
                Some(existing)
            }
            None => None,
        };

        let taken = self.ctx.appointments.read(|appointments| {
            has_overlap(appointments, draft.date_time, draft.room, draft.id.as_deref())
        });
        if taken {
            return Err(AppointmentError::Conflict {
                room: draft.room,
                start: format_instant(draft.date_time),
            });
        }

        let appointment = build_appointment(user, draft, existing.as_ref());
        let record = json!(appointment);

        let (id, created) = match existing {
            Some(existing) => {
                debug!("Updating appointment {}", existing.id);
                self.ctx
                    .store
                    .update(collections::APPOINTMENTS, &existing.id, record)
                    .await
                    .map_err(|e| {
                        error!("Failed to update appointment {}: {}", existing.id, e);
                        AppointmentError::Store(e.to_string())
                    })?;
                (existing.id, false)
            }
            None => {
                let id = self
                    .ctx
                    .store
                    .create(collections::APPOINTMENTS, record)
                    .await
                    .map_err(|e| {
                        error!("Failed to create appointment: {}", e);
                        AppointmentError::Store(e.to_string())
                    })?;
                (id, true)
            }
        };

        let saved = Stored::new(id, appointment);
        self.await_echo(&saved).await;

        info!(
            "{} {} appointment {} in room {} at {}",
            user.username,
            if created { "created" } else { "updated" },
            saved.id,
            saved.room,
            saved.date_time
        );

        // The appointment stays even if the patient write fails.
        let patient_synced = match PatientUpsertService::new(self.ctx.clone()).upsert(&saved).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Appointment {} saved but patient record not updated: {}", saved.id, e);
                false
            }
        };

        Ok(SaveOutcome {
            appointment: saved,
            created,
            patient_synced,
        })
    }

    /// Loads an appointment into the edit form, if `user` may change it.
    pub fn open_for_edit(&self, user: &SessionUser, id: &str) -> Result<Stored<Appointment>, AppointmentError> {
        let appointment = self
            .ctx
            .appointments
            .get(id)
            .ok_or_else(|| AppointmentError::NotFound(id.to_string()))?;
        self.ensure_editable(user, &appointment)?;
        Ok(appointment)
    }

    pub async fn delete(&self, user: &SessionUser, id: &str) -> Result<(), AppointmentError> {
        let _gate = self.ctx.lock_writes().await;

        let appointment = self
            .ctx
            .appointments
            .get(id)
            .ok_or_else(|| AppointmentError::NotFound(id.to_string()))?;
        self.ensure_editable(user, &appointment)?;

        self.ctx
            .store
            .delete(collections::APPOINTMENTS, id)
            .await
            .map_err(|e| {
                error!("Failed to delete appointment {}: {}", id, e);
                AppointmentError::Store(e.to_string())
            })?;

        let gone = self
            .ctx
            .appointments
            .wait_for(|appointments| appointments.iter().all(|a| a.id != id), self.ctx.echo_timeout())
            .await;
        if !gone {
            warn!("Store has not confirmed deletion of {} yet, dropping it locally", id);
            self.ctx.appointments.remove_local(id);
        }

        info!("{} deleted appointment {}", user.username, id);
        Ok(())
    }

    /// Keeps the write gate until the mirror holds `saved`, so the next
    /// overlap check on this desk sees it.
    async fn await_echo(&self, saved: &Stored<Appointment>) {
        let visible = self
            .ctx
            .appointments
            .wait_for(
                |appointments| {
                    appointments.iter().any(|a| {
                        a.id == saved.id
                            && a.room == saved.room
                            && a.date_time == saved.date_time
                            && a.phone == saved.phone
                    })
                },
                self.ctx.echo_timeout(),
            )
            .await;

        if !visible {
            warn!("Store has not echoed appointment {} yet, applying it locally", saved.id);
            self.ctx.appointments.upsert_local(saved.clone());
        }
    }

    fn ensure_editable(&self, user: &SessionUser, appointment: &Stored<Appointment>) -> Result<(), AppointmentError> {
        if can_edit(user, appointment) {
            Ok(())
        } else {
            warn!(
                "{} may not change appointment {} created by {}",
                user.username, appointment.id, appointment.created_by
            );
            Err(AppointmentError::PermissionDenied)
        }
    }
}

/// New records belong to `user`; edits keep the original author and creation time.
fn build_appointment(user: &SessionUser, draft: ValidDraft, existing: Option<&Stored<Appointment>>) -> Appointment {
    let (created_by, doctor_name, doctor_color, created_at) = match existing {
        Some(existing) => (
            existing.created_by.clone(),
            existing.doctor_name.clone(),
            existing.doctor_color.clone(),
            existing.created_at.or_else(|| Some(Utc::now())),
        ),
        None => (
            user.username.clone(),
            user.name.clone(),
            user.color.clone(),
            Some(Utc::now()),
        ),
    };

    Appointment {
        last_name: draft.last_name,
        first_name: draft.first_name,
        middle_name: draft.middle_name,
        phone: draft.phone,
        date_time: draft.date_time,
        room: draft.room,
        comment: draft.comment,
        files: draft.files,
        created_by,
        doctor_name,
        doctor_color,
        created_at,
    }
}
