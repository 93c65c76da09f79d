use std::sync::Arc;

use rand::seq::SliceRandom;
use serde_json::json;
use tracing::{debug, info};

use shared_database::collections;
use shared_models::auth::{DoctorAccount, Role, SessionUser, ADMIN_LOGIN};
use sync_cell::ClinicContext;

use crate::models::{AddDoctorRequest, DoctorError, DoctorSummary};

/// Colors handed out to newly added doctors.
pub const DOCTOR_PALETTE: [&str; 7] = [
    "#2563eb", "#10b981", "#f59e0b", "#8b5cf6", "#ec4899", "#06b6d4", "#f97316",
];

pub struct DoctorRosterService {
    ctx: Arc<ClinicContext>,
}

impl DoctorRosterService {
    pub fn new(ctx: Arc<ClinicContext>) -> Self {
        Self { ctx }
    }

    pub fn list(&self, user: &SessionUser) -> Result<Vec<DoctorSummary>, DoctorError> {
        ensure_admin(user)?;
        Ok(self
            .ctx
            .doctors
            .read(|accounts| accounts.iter().map(DoctorSummary::from).collect()))
    }

    pub async fn add(&self, user: &SessionUser, request: AddDoctorRequest) -> Result<DoctorSummary, DoctorError> {
        ensure_admin(user)?;

        let name = request.name.trim();
        let login = request.login.trim();
        let password = request.password.trim();
        if name.is_empty() || login.is_empty() || password.is_empty() {
            return Err(DoctorError::MissingFields);
        }

        if self.ctx.doctors.get(login).is_some() {
            return Err(DoctorError::LoginTaken(login.to_string()));
        }

        let color = DOCTOR_PALETTE
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(DOCTOR_PALETTE[0]);

        let account = DoctorAccount {
            password: password.to_string(),
            role: Role::Doctor,
            name: name.to_string(),
            color: color.to_string(),
        };

        debug!("Adding doctor {} ({})", login, name);
        self.ctx
            .store
            .set(collections::DOCTORS, login, json!(account))
            .await
            .map_err(|e| DoctorError::Store(e.to_string()))?;

        info!("{} added doctor {}", user.username, login);
        Ok(DoctorSummary {
            login: login.to_string(),
            name: account.name,
            role: account.role,
            color: account.color,
            removable: true,
        })
    }

    pub async fn remove(&self, user: &SessionUser, login: &str) -> Result<(), DoctorError> {
        ensure_admin(user)?;

        if login == ADMIN_LOGIN {
            return Err(DoctorError::BuiltInAdmin);
        }
        if self.ctx.doctors.get(login).is_none() {
            return Err(DoctorError::NotFound(login.to_string()));
        }

        self.ctx
            .store
            .delete(collections::DOCTORS, login)
            .await
            .map_err(|e| DoctorError::Store(e.to_string()))?;

        info!("{} removed doctor {}", user.username, login);
        Ok(())
    }
}

fn ensure_admin(user: &SessionUser) -> Result<(), DoctorError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(DoctorError::NotAdmin)
    }
}
