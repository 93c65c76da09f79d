use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

use shared_database::{collections, Subscription};
use shared_models::auth::default_roster;

use crate::context::ClinicContext;

#[derive(Debug, Clone, Serialize)]
pub struct CollectionStatus {
    pub collection: String,
    pub records: usize,
    pub version: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncStatus {
    pub remote_configured: bool,
    pub collections: Vec<CollectionStatus>,
}

pub struct SyncService {
    ctx: Arc<ClinicContext>,
}

impl SyncService {
    pub fn new(ctx: Arc<ClinicContext>) -> Self {
        Self { ctx }
    }

    /// Writes the default roster when the doctors collection is empty.
    /// Returns whether anything was written.
    pub async fn seed_doctors(&self) -> Result<bool> {
        let existing = self.ctx.store.read_once(collections::DOCTORS).await?;
        if !existing.is_empty() {
            debug!("Doctors collection already holds {} accounts", existing.len());
            return Ok(false);
        }

        info!("Doctors collection is empty, writing default roster");
        for (login, account) in default_roster() {
            self.ctx
                .store
                .set(collections::DOCTORS, &login, json!(account))
                .await?;
        }

        Ok(true)
    }

    /// Connects every mirror to its collection. Each mirror is populated
    /// with the current state before this returns for stores that deliver
    /// the first snapshot synchronously.
    pub async fn start(&self) -> Result<Vec<Subscription>> {
        let store = &self.ctx.store;

        let subscriptions = vec![
            store
                .subscribe(collections::APPOINTMENTS, self.ctx.appointments.callback())
                .await?,
            store
                .subscribe(collections::PATIENTS, self.ctx.patients.callback())
                .await?,
            store
                .subscribe(collections::DOCTORS, self.ctx.doctors.callback())
                .await?,
        ];

        info!("Subscribed to {} collections", subscriptions.len());
        Ok(subscriptions)
    }

    pub fn status(&self) -> SyncStatus {
        let entry = |collection: &str, records: usize, version: u64| CollectionStatus {
            collection: collection.to_string(),
            records,
            version,
        };

        SyncStatus {
            remote_configured: self.ctx.config.is_configured(),
            collections: vec![
                entry(
                    self.ctx.appointments.collection(),
                    self.ctx.appointments.len(),
                    self.ctx.appointments.version(),
                ),
                entry(
                    self.ctx.patients.collection(),
                    self.ctx.patients.len(),
                    self.ctx.patients.version(),
                ),
                entry(
                    self.ctx.doctors.collection(),
                    self.ctx.doctors.len(),
                    self.ctx.doctors.version(),
                ),
            ],
        }
    }
}
